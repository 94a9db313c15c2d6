//! Line-oriented object export front end.
//!
//! Consumes one self-contained JSON object per line: either a template
//! definition (recorded for information only) or a data record keyed by its
//! template identifier. This input is machine generated, so unlike the dump
//! scanner the extractor is strict: the first undecodable line fails the
//! run, naming the offending line.

use crate::corrections;
use crate::elements::{
    self, ALIEN_ELEMENT_KEY, MAIN_TEMPLATE_KEY, MAPPING_TEMPLATE_KEY, TEMPLATE_RECORD_KEY,
};
use crate::error::{DecodeError, Result};
use crate::model::{MappingEntry, VerdictRecord};
use chrono::NaiveDateTime;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

const EXPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.fZ";

/// JSON value with objects kept as ordered key/value lists.
///
/// `serde_json::Map` collapses repeated keys, but a data record repeats the
/// enterprise element key and the meaning of each occurrence is positional,
/// so both encounter order and duplicates must survive parsing.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<RawValue>),
    Object(Vec<(String, RawValue)>),
}

impl RawValue {
    fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for RawValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RawValueVisitor;

        impl<'de> Visitor<'de> for RawValueVisitor {
            type Value = RawValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any JSON value")
            }

            fn visit_unit<E>(self) -> std::result::Result<RawValue, E> {
                Ok(RawValue::Null)
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<RawValue, E> {
                Ok(RawValue::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<RawValue, E> {
                Ok(RawValue::Number(value.into()))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<RawValue, E> {
                Ok(RawValue::Number(value.into()))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<RawValue, E> {
                serde_json::Number::from_f64(value)
                    .map(RawValue::Number)
                    .ok_or_else(|| E::custom("non-finite number"))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<RawValue, E> {
                Ok(RawValue::String(value.to_owned()))
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<RawValue, E> {
                Ok(RawValue::String(value))
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<RawValue, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(RawValue::Array(items))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<RawValue, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut pairs = Vec::new();
                while let Some(entry) = map.next_entry::<String, RawValue>()? {
                    pairs.push(entry);
                }
                Ok(RawValue::Object(pairs))
            }
        }

        deserializer.deserialize_any(RawValueVisitor)
    }
}

fn malformed(line: usize, message: impl Into<String>) -> DecodeError {
    DecodeError::MalformedLine {
        line,
        message: message.into(),
    }
}

/// Extractor over the object export. Owns the accumulator for one decoding
/// pass: the records, the informational template registry and the sequence
/// counter.
pub(crate) struct LineObjectExtractor {
    records: Vec<VerdictRecord>,
    templates: HashMap<String, RawValue>,
    next_record_id: u32,
}

impl LineObjectExtractor {
    pub(crate) fn new() -> Self {
        Self {
            records: Vec::new(),
            templates: HashMap::new(),
            next_record_id: 1,
        }
    }

    /// Extract every data record from a complete export, in encounter order.
    pub(crate) fn extract(input: &str) -> Result<Vec<VerdictRecord>> {
        let mut extractor = Self::new();
        for (index, line) in input.lines().enumerate() {
            extractor.push_line(index + 1, line)?;
        }
        Ok(extractor.finish())
    }

    pub(crate) fn push_line(&mut self, line_no: usize, line: &str) -> Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        let value: RawValue = serde_json::from_str(line)
            .map_err(|err| malformed(line_no, err.to_string()))?;
        let RawValue::Object(pairs) = value else {
            return Err(malformed(line_no, "expected a JSON object"));
        };

        // Template definitions never become records.
        if pairs
            .iter()
            .any(|(key, _)| key.starts_with(TEMPLATE_RECORD_KEY))
        {
            self.register_templates(&pairs);
            return Ok(());
        }

        for (key, value) in &pairs {
            if key.starts_with(MAIN_TEMPLATE_KEY) {
                let record = self.build_record(line_no, value)?;
                self.records.push(record);
            }
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> Vec<VerdictRecord> {
        self.records
    }

    fn register_templates(&mut self, pairs: &[(String, RawValue)]) {
        for (key, value) in pairs {
            if let Some(rest) = key.strip_prefix(TEMPLATE_RECORD_KEY) {
                let template_id = rest.split('(').next().unwrap_or(rest).to_string();
                tracing::debug!(template = %template_id, "registered template definition");
                self.templates.insert(template_id, value.clone());
            }
        }
    }

    fn build_record(&mut self, line_no: usize, value: &RawValue) -> Result<VerdictRecord> {
        let RawValue::Object(fields) = value else {
            return Err(malformed(line_no, "data record value is not an object"));
        };

        let mut record = VerdictRecord::open(self.next_record_id);
        self.next_record_id += 1;

        if let Some((_, value)) = fields
            .iter()
            .find(|(key, _)| key == "observationTimeMilliseconds")
        {
            let text = value
                .as_str()
                .ok_or_else(|| malformed(line_no, "timestamp is not a string"))?;
            let millis = parse_export_timestamp(text)
                .ok_or_else(|| malformed(line_no, format!("cannot parse timestamp {text:?}")))?;
            record.timestamp = Some(millis);
        }

        // The enterprise element occurrences are positional:
        // ruleType, targetType, policyAction.
        let element_values: Vec<Option<u8>> = fields
            .iter()
            .filter(|(key, _)| key == ALIEN_ELEMENT_KEY)
            .map(|(_, payload)| decode_element(line_no, payload))
            .collect::<Result<Vec<_>>>()?;

        if element_values.len() >= 3 {
            record.rule_type = element_values[0];
            record.target_type = element_values[1];
            record.policy_action = element_values[2];
            record.rule_type_name = Some(match record.rule_type {
                Some(code) => elements::rule_type_name(code),
                None => "unknown",
            });
        }

        for (key, value) in fields {
            if key.starts_with(MAPPING_TEMPLATE_KEY) {
                if let RawValue::Array(items) = value {
                    for item in items {
                        record.rules.push(build_mapping(line_no, item)?);
                    }
                }
            }
        }

        Ok(record)
    }
}

/// Decode one enterprise element payload; a payload that does not yield
/// exactly one byte becomes an absent value, not a guess.
fn decode_element(line_no: usize, payload: &RawValue) -> Result<Option<u8>> {
    let text = payload
        .as_str()
        .ok_or_else(|| malformed(line_no, "enterprise element payload is not a string"))?;
    Ok(corrections::decode_element_base64(text).ok())
}

fn build_mapping(line_no: usize, item: &RawValue) -> Result<MappingEntry> {
    let RawValue::Object(fields) = item else {
        return Err(malformed(line_no, "mapping entry is not an object"));
    };
    let lookup = |name: &str| {
        fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    };

    // Missing sub-fields default to zero values.
    let raw_interface = match lookup("ingressInterface") {
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| malformed(line_no, "ingressInterface is not a 32-bit integer"))?,
        None => 0,
    };
    let raw_prefix = match lookup("sourceIPv4Prefix") {
        Some(value) => value
            .as_str()
            .ok_or_else(|| malformed(line_no, "sourceIPv4Prefix is not a string"))?
            .to_owned(),
        None => "0.0.0.0".to_string(),
    };
    let prefix_length = match lookup("sourceIPv4PrefixLength") {
        Some(value) => value
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .ok_or_else(|| malformed(line_no, "sourceIPv4PrefixLength is not a prefix length"))?,
        None => 0,
    };

    Ok(MappingEntry {
        interface_id: corrections::interface_from_display(raw_interface),
        source_prefix: corrections::reverse_prefix_octets(&raw_prefix),
        prefix_length,
    })
}

fn parse_export_timestamp(text: &str) -> Option<i64> {
    let parsed = NaiveDateTime::parse_from_str(text, EXPORT_TIMESTAMP_FORMAT).ok()?;
    Some(parsed.and_utc().timestamp_millis())
}
