//! Canonical SAV record model and the emitted batch structure.
//!
//! Both front ends accumulate into these types; nothing here depends on
//! which front end produced the records. The serde renames define the
//! emitted JSON shape, so field order and names are load-bearing.

use chrono::Utc;
use serde::Serialize;

/// Fixed IP version of the emitted batch; only IPv4 prefixes are modeled.
pub(crate) const IP_VERSION: u8 = 4;

/// One interface/prefix binding attached to a verdict record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MappingEntry {
    pub(crate) interface_id: u32,
    pub(crate) source_prefix: String,
    pub(crate) prefix_length: u8,
}

/// One decoded SAV policy decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VerdictRecord {
    pub(crate) record_id: u32,
    pub(crate) timestamp: Option<i64>,
    pub(crate) rule_type: Option<u8>,
    pub(crate) rule_type_name: Option<&'static str>,
    pub(crate) target_type: Option<u8>,
    pub(crate) policy_action: Option<u8>,
    pub(crate) rules: Vec<MappingEntry>,
}

impl VerdictRecord {
    /// Open a fresh record carrying nothing but its sequence number.
    pub(crate) fn open(record_id: u32) -> Self {
        Self {
            record_id,
            timestamp: None,
            rule_type: None,
            rule_type_name: None,
            target_type: None,
            policy_action: None,
            rules: Vec::new(),
        }
    }
}

/// Final emitted structure: the accumulated records plus batch metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecordBatch {
    pub(crate) total_records: usize,
    pub(crate) records: Vec<VerdictRecord>,
    pub(crate) generated_at: i64,
    pub(crate) ip_version: u8,
}

impl RecordBatch {
    /// Wrap records as-is, stamped with the current wall-clock time. No
    /// reordering or filtering happens here.
    pub(crate) fn wrap(records: Vec<VerdictRecord>) -> Self {
        Self::with_generated_at(records, Utc::now().timestamp())
    }

    pub(crate) fn with_generated_at(records: Vec<VerdictRecord>, generated_at: i64) -> Self {
        Self {
            total_records: records.len(),
            records,
            generated_at,
            ip_version: IP_VERSION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sample_record() -> VerdictRecord {
        VerdictRecord {
            record_id: 1,
            timestamp: Some(1_765_369_718_000),
            rule_type: Some(1),
            rule_type_name: Some("blocklist"),
            target_type: Some(1),
            policy_action: Some(1),
            rules: vec![MappingEntry {
                interface_id: 31,
                source_prefix: "192.0.2.100".to_string(),
                prefix_length: 24,
            }],
        }
    }

    #[test]
    fn batch_counts_and_version_are_derived() {
        let batch = RecordBatch::with_generated_at(vec![sample_record()], 1_765_369_720);
        assert_eq!(batch.total_records, 1);
        assert_eq!(batch.ip_version, 4);
        assert_eq!(batch.generated_at, 1_765_369_720);
    }

    #[test]
    fn batch_serializes_to_the_wire_shape() {
        let batch = RecordBatch::with_generated_at(vec![sample_record()], 1_765_369_720);
        let value = serde_json::to_value(&batch).unwrap();

        assert_eq!(
            value,
            json!({
                "totalRecords": 1,
                "records": [{
                    "recordId": 1,
                    "timestamp": 1_765_369_718_000_i64,
                    "ruleType": 1,
                    "ruleTypeName": "blocklist",
                    "targetType": 1,
                    "policyAction": 1,
                    "rules": [{
                        "interfaceId": 31,
                        "sourcePrefix": "192.0.2.100",
                        "prefixLength": 24
                    }]
                }],
                "generatedAt": 1_765_369_720,
                "ipVersion": 4
            })
        );
    }

    #[test]
    fn absent_optional_fields_serialize_as_null() {
        let batch = RecordBatch::with_generated_at(vec![VerdictRecord::open(1)], 0);
        let value = serde_json::to_value(&batch).unwrap();
        let record = &value["records"][0];

        assert_eq!(record["timestamp"], Value::Null);
        assert_eq!(record["ruleType"], Value::Null);
        assert_eq!(record["ruleTypeName"], Value::Null);
        assert_eq!(record["targetType"], Value::Null);
        assert_eq!(record["policyAction"], Value::Null);
        assert_eq!(record["rules"], json!([]));
    }

    #[test]
    fn empty_batch_is_well_formed() {
        let batch = RecordBatch::with_generated_at(Vec::new(), 7);
        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value["totalRecords"], 0);
        assert_eq!(value["records"], json!([]));
    }

    #[test]
    fn batch_round_trips_through_a_file() {
        let batch = RecordBatch::with_generated_at(vec![sample_record()], 1_765_369_720);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        std::fs::write(&path, serde_json::to_string_pretty(&batch).unwrap()).unwrap();
        let reread: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(reread, serde_json::to_value(&batch).unwrap());
    }
}
