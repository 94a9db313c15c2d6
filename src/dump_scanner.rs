//! Text-dump front end.
//!
//! Consumes the human-readable output of the external dump utility line by
//! line and accumulates canonical records with a small state machine. The
//! dump is free-form text, so this path is tolerant: a marker line whose
//! value does not parse is skipped and the field simply stays unset. Only
//! the external tool failing outright is an error, and that is handled
//! before any line reaches the scanner.

use crate::corrections;
use crate::elements::{
    self, ALIEN_ELEMENT_KEY, IE_POLICY_ACTION, IE_RULE_TYPE, IE_TARGET_TYPE, SAV_ENTERPRISE_ID,
};
use crate::model::{MappingEntry, VerdictRecord};
use chrono::NaiveDateTime;
use regex::Regex;

const RECORD_START_MARKER: &str = "--- Data Record";
const TIMESTAMP_MARKER: &str = "observationTimeMilliseconds";
const MAPPING_LIST_MARKER: &str = "subTemplateList";
const MAPPING_ENTRY_MARKER: &str = "+--- STL Record";
const INTERFACE_MARKER: &str = "+ ingressInterface";
const PREFIX_MARKER: &str = "+ sourceIPv4Prefix";
const PREFIX_LENGTH_MARKER: &str = "+ sourceIPv4PrefixLength";

const DUMP_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Scanner position within the dump structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Before the first record start marker.
    Idle,
    /// Inside a record, before its mapping list.
    InRecord,
    /// The record's mapping list has started, no entry open yet.
    InMappingSection,
    /// Inside one mapping entry.
    InMappingEntry,
}

/// What a single dump line means, decided before any state is touched.
/// Field kinds carry already-parsed values; a marker line whose value does
/// not parse classifies as `Other` and is skipped.
#[derive(Debug, Clone, PartialEq)]
enum LineKind {
    RecordStart,
    Timestamp(i64),
    RuleType(u8),
    TargetType(u8),
    PolicyAction(u8),
    MappingListStart,
    MappingEntryStart,
    InterfaceId(u32),
    SourcePrefix(String),
    PrefixLength(u8),
    Other,
}

/// One mapping entry under construction. Only entries that observed an
/// interface identifier are ever attached to a record.
#[derive(Debug, Default, Clone)]
struct MappingDraft {
    interface_id: Option<u32>,
    source_prefix: Option<String>,
    prefix_length: Option<u8>,
}

impl MappingDraft {
    fn seal(self) -> Option<MappingEntry> {
        let interface_id = self.interface_id?;
        Some(MappingEntry {
            interface_id,
            source_prefix: self.source_prefix.unwrap_or_else(|| "0.0.0.0".to_string()),
            prefix_length: self.prefix_length.unwrap_or(0),
        })
    }
}

/// Compiled line-shape patterns, built once per scanner.
struct ScanPatterns {
    timestamp: Regex,
    hex_byte: Regex,
    int_value: Regex,
    prefix_value: Regex,
    rule_type_marker: String,
    target_type_marker: String,
    policy_action_marker: String,
}

impl ScanPatterns {
    fn new() -> Self {
        Self {
            timestamp: Regex::new(r"(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3})")
                .expect("timestamp pattern"),
            hex_byte: Regex::new(r"0x([0-9a-fA-F]{2})\b").expect("hex byte pattern"),
            int_value: Regex::new(r": (\d+)").expect("int value pattern"),
            prefix_value: Regex::new(r": ([\d.]+)").expect("prefix value pattern"),
            rule_type_marker: format!("({SAV_ENTERPRISE_ID}/{IE_RULE_TYPE})"),
            target_type_marker: format!("({SAV_ENTERPRISE_ID}/{IE_TARGET_TYPE})"),
            policy_action_marker: format!("({SAV_ENTERPRISE_ID}/{IE_POLICY_ACTION})"),
        }
    }

    /// Map one dump line to its kind; first match wins. The prefix-length
    /// pattern is tested before the source-prefix pattern because the
    /// prefix label is a substring of the length label.
    fn classify(&self, line: &str) -> LineKind {
        if line.contains(RECORD_START_MARKER) {
            return LineKind::RecordStart;
        }
        if line.contains(TIMESTAMP_MARKER) {
            return self
                .parse_timestamp(line)
                .map_or(LineKind::Other, LineKind::Timestamp);
        }
        if line.contains(ALIEN_ELEMENT_KEY) {
            let value = self.parse_element_byte(line);
            if line.contains(&self.rule_type_marker) {
                return value.map_or(LineKind::Other, LineKind::RuleType);
            }
            if line.contains(&self.target_type_marker) {
                return value.map_or(LineKind::Other, LineKind::TargetType);
            }
            if line.contains(&self.policy_action_marker) {
                return value.map_or(LineKind::Other, LineKind::PolicyAction);
            }
            return LineKind::Other;
        }
        if line.contains(MAPPING_LIST_MARKER) && line.contains("count:") {
            return LineKind::MappingListStart;
        }
        if line.contains(MAPPING_ENTRY_MARKER) {
            return LineKind::MappingEntryStart;
        }
        if line.contains(INTERFACE_MARKER) {
            return self
                .capture_int(line)
                .map_or(LineKind::Other, LineKind::InterfaceId);
        }
        if line.contains(PREFIX_LENGTH_MARKER) {
            return self
                .capture_int(line)
                .and_then(|v| u8::try_from(v).ok())
                .map_or(LineKind::Other, LineKind::PrefixLength);
        }
        if line.contains(PREFIX_MARKER) {
            return self
                .capture_prefix(line)
                .map_or(LineKind::Other, LineKind::SourcePrefix);
        }
        LineKind::Other
    }

    fn parse_timestamp(&self, line: &str) -> Option<i64> {
        let captures = self.timestamp.captures(line)?;
        let text = captures.get(1)?.as_str();
        // The dump prints naive wall-clock time; the export convention is UTC.
        let parsed = NaiveDateTime::parse_from_str(text, DUMP_TIMESTAMP_FORMAT).ok()?;
        Some(parsed.and_utc().timestamp_millis())
    }

    fn parse_element_byte(&self, line: &str) -> Option<u8> {
        let captures = self.hex_byte.captures(line)?;
        corrections::decode_element_hex(captures.get(0)?.as_str()).ok()
    }

    fn capture_int(&self, line: &str) -> Option<u32> {
        let captures = self.int_value.captures(line)?;
        captures.get(1)?.as_str().parse().ok()
    }

    fn capture_prefix(&self, line: &str) -> Option<String> {
        let captures = self.prefix_value.captures(line)?;
        Some(captures.get(1)?.as_str().to_string())
    }
}

/// Line-by-line scanner over the textual dump. Owns the whole accumulator
/// for one decoding pass: the sealed records, the open record, the open
/// mapping entry and the sequence counter.
pub(crate) struct DumpScanner {
    patterns: ScanPatterns,
    state: ScanState,
    records: Vec<VerdictRecord>,
    current_record: Option<VerdictRecord>,
    current_mapping: Option<MappingDraft>,
    next_record_id: u32,
}

impl DumpScanner {
    pub(crate) fn new() -> Self {
        Self {
            patterns: ScanPatterns::new(),
            state: ScanState::Idle,
            records: Vec::new(),
            current_record: None,
            current_mapping: None,
            next_record_id: 1,
        }
    }

    /// Scan a complete dump and return the sealed records in encounter order.
    pub(crate) fn scan(input: &str) -> Vec<VerdictRecord> {
        let mut scanner = Self::new();
        for line in input.lines() {
            scanner.push_line(line);
        }
        scanner.finish()
    }

    /// Feed one dump line through the state machine.
    pub(crate) fn push_line(&mut self, line: &str) {
        match self.patterns.classify(line) {
            LineKind::RecordStart => {
                self.seal_record();
                self.current_record = Some(VerdictRecord::open(self.next_record_id));
                self.next_record_id += 1;
                self.state = ScanState::InRecord;
            }
            LineKind::Timestamp(millis) => {
                if let Some(record) = self.current_record.as_mut() {
                    record.timestamp = Some(millis);
                }
            }
            LineKind::RuleType(code) => {
                if let Some(record) = self.current_record.as_mut() {
                    record.rule_type = Some(code);
                    record.rule_type_name = Some(elements::rule_type_name(code));
                }
            }
            LineKind::TargetType(code) => {
                if let Some(record) = self.current_record.as_mut() {
                    record.target_type = Some(code);
                }
            }
            LineKind::PolicyAction(code) => {
                if let Some(record) = self.current_record.as_mut() {
                    record.policy_action = Some(code);
                }
            }
            LineKind::MappingListStart => {
                // Mapping sections only exist inside a record; a stray list
                // marker before the first record is noise.
                if self.state == ScanState::InRecord {
                    self.state = ScanState::InMappingSection;
                }
            }
            LineKind::MappingEntryStart => {
                if matches!(
                    self.state,
                    ScanState::InMappingSection | ScanState::InMappingEntry
                ) {
                    self.flush_mapping();
                    self.current_mapping = Some(MappingDraft::default());
                    self.state = ScanState::InMappingEntry;
                }
            }
            LineKind::InterfaceId(raw) => {
                if let Some(mapping) = self.current_mapping.as_mut() {
                    mapping.interface_id = Some(corrections::interface_from_display(raw));
                }
            }
            LineKind::SourcePrefix(raw) => {
                if let Some(mapping) = self.current_mapping.as_mut() {
                    mapping.source_prefix = Some(corrections::reverse_prefix_octets(&raw));
                }
            }
            LineKind::PrefixLength(len) => {
                if let Some(mapping) = self.current_mapping.as_mut() {
                    mapping.prefix_length = Some(len);
                }
            }
            LineKind::Other => {}
        }
    }

    /// Seal whatever is still open and return the accumulated records.
    pub(crate) fn finish(mut self) -> Vec<VerdictRecord> {
        self.seal_record();
        self.records
    }

    /// Attach the open mapping to the open record if it ever observed an
    /// interface identifier; discard it otherwise.
    fn flush_mapping(&mut self) {
        if let Some(draft) = self.current_mapping.take() {
            match (draft.seal(), self.current_record.as_mut()) {
                (Some(entry), Some(record)) => record.rules.push(entry),
                (Some(_), None) => {}
                (None, _) => {
                    tracing::debug!("discarding mapping entry without interface identifier");
                }
            }
        }
    }

    fn seal_record(&mut self) {
        self.flush_mapping();
        if let Some(record) = self.current_record.take() {
            self.records.push(record);
        }
        self.state = ScanState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocklist_dump() -> String {
        [
            "--- Message Header ---",
            "--- Data Record 1 ---",
            "  observationTimeMilliseconds       : 2025-12-10 12:28:38.000",
            "  _alienInformationElement         (6871/1) : 0x01",
            "  _alienInformationElement         (6871/2) : 0x01",
            "  _alienInformationElement         (6871/4) : 0x01",
            "  subTemplateList                   : count: 1",
            "  +--- STL Record 1 ---",
            "  + ingressInterface                : 520093696",
            "  + sourceIPv4Prefix                : 100.2.0.192",
            "  + sourceIPv4PrefixLength          : 24",
        ]
        .join("\n")
    }

    #[test]
    fn blocklist_record_decodes_end_to_end() {
        let records = DumpScanner::scan(&blocklist_dump());
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.record_id, 1);
        assert_eq!(record.timestamp, Some(1_765_369_718_000));
        assert_eq!(record.rule_type, Some(1));
        assert_eq!(record.rule_type_name, Some("blocklist"));
        assert_eq!(record.target_type, Some(1));
        assert_eq!(record.policy_action, Some(1));

        assert_eq!(record.rules.len(), 1);
        let rule = &record.rules[0];
        assert_eq!(rule.interface_id, 31);
        assert_eq!(rule.source_prefix, "192.0.2.100");
        assert_eq!(rule.prefix_length, 24);
    }

    #[test]
    fn prefix_correction_is_applied_exactly_once() {
        let records = DumpScanner::scan(&blocklist_dump());
        let corrected = &records[0].rules[0].source_prefix;

        // Reversing the output reproduces the raw dump value; the output
        // itself must not equal the raw value (double application would).
        assert_ne!(corrected, "100.2.0.192");
        assert_eq!(
            crate::corrections::reverse_prefix_octets(corrected),
            "100.2.0.192"
        );
    }

    #[test]
    fn out_of_enumeration_rule_type_is_unknown() {
        let dump = [
            "--- Data Record 1 ---",
            "  _alienInformationElement         (6871/1) : 0x63",
        ]
        .join("\n");

        let records = DumpScanner::scan(&dump);
        assert_eq!(records[0].rule_type, Some(0x63));
        assert_eq!(records[0].rule_type_name, Some("unknown"));
    }

    #[test]
    fn record_ids_are_sequential_without_gaps() {
        let dump = [
            "--- Data Record 1 ---",
            "--- Data Record 2 ---",
            "--- Data Record 3 ---",
        ]
        .join("\n");

        let records = DumpScanner::scan(&dump);
        let ids: Vec<u32> = records.iter().map(|r| r.record_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn mapping_without_interface_is_discarded() {
        let dump = [
            "--- Data Record 1 ---",
            "  subTemplateList                   : count: 1",
            "  +--- STL Record 1 ---",
            "  + sourceIPv4Prefix                : 100.2.0.192",
            "  + sourceIPv4PrefixLength          : 24",
        ]
        .join("\n");

        let records = DumpScanner::scan(&dump);
        assert_eq!(records.len(), 1);
        assert!(records[0].rules.is_empty());
    }

    #[test]
    fn open_mapping_attaches_to_its_own_record_on_seal() {
        let dump = [
            "--- Data Record 1 ---",
            "  subTemplateList                   : count: 1",
            "  +--- STL Record 1 ---",
            "  + ingressInterface                : 16777216",
            "--- Data Record 2 ---",
        ]
        .join("\n");

        let records = DumpScanner::scan(&dump);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].rules.len(), 1);
        assert_eq!(records[0].rules[0].interface_id, 1);
        assert!(records[1].rules.is_empty());
    }

    #[test]
    fn consecutive_entry_markers_flush_the_complete_entry() {
        let dump = [
            "--- Data Record 1 ---",
            "  subTemplateList                   : count: 2",
            "  +--- STL Record 1 ---",
            "  + ingressInterface                : 16777216",
            "  + sourceIPv4Prefix                : 1.0.0.10",
            "  + sourceIPv4PrefixLength          : 8",
            "  +--- STL Record 2 ---",
            "  + ingressInterface                : 33554432",
            "  + sourceIPv4Prefix                : 2.0.0.10",
            "  + sourceIPv4PrefixLength          : 16",
        ]
        .join("\n");

        let records = DumpScanner::scan(&dump);
        assert_eq!(records[0].rules.len(), 2);
        assert_eq!(records[0].rules[0].interface_id, 1);
        assert_eq!(records[0].rules[0].source_prefix, "10.0.0.1");
        assert_eq!(records[0].rules[0].prefix_length, 8);
        assert_eq!(records[0].rules[1].interface_id, 2);
        assert_eq!(records[0].rules[1].source_prefix, "10.0.0.2");
        assert_eq!(records[0].rules[1].prefix_length, 16);
    }

    #[test]
    fn prefix_length_line_does_not_clobber_the_prefix() {
        // The prefix label is a substring of the length label; the length
        // line must classify as a length, not as a second prefix.
        let patterns = ScanPatterns::new();
        assert_eq!(
            patterns.classify("  + sourceIPv4PrefixLength          : 24"),
            LineKind::PrefixLength(24)
        );
        assert_eq!(
            patterns.classify("  + sourceIPv4Prefix                : 100.2.0.192"),
            LineKind::SourcePrefix("100.2.0.192".to_string())
        );
    }

    #[test]
    fn malformed_values_are_skipped_not_fatal() {
        let dump = [
            "--- Data Record 1 ---",
            "  observationTimeMilliseconds       : not-a-timestamp",
            "  _alienInformationElement         (6871/1) : 0xGG",
            "  subTemplateList                   : count: 1",
            "  +--- STL Record 1 ---",
            "  + ingressInterface                : twelve",
        ]
        .join("\n");

        let records = DumpScanner::scan(&dump);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, None);
        assert_eq!(records[0].rule_type, None);
        assert_eq!(records[0].rule_type_name, None);
        assert!(records[0].rules.is_empty());
    }

    #[test]
    fn field_lines_before_any_record_are_ignored() {
        let dump = [
            "  _alienInformationElement         (6871/1) : 0x01",
            "  +--- STL Record 1 ---",
            "  + ingressInterface                : 16777216",
        ]
        .join("\n");

        assert!(DumpScanner::scan(&dump).is_empty());
    }

    #[test]
    fn empty_input_yields_no_records() {
        assert!(DumpScanner::scan("").is_empty());
    }

    #[test]
    fn scanning_twice_is_deterministic() {
        let dump = blocklist_dump();
        assert_eq!(DumpScanner::scan(&dump), DumpScanner::scan(&dump));
    }
}
