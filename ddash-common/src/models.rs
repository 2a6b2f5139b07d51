//! Data models shared between services
//!
//! These records originate in external systems (customs declaration exports,
//! the automation flow log) and are only loosely typed. Every struct keeps the
//! fields it does not know about in `extra` so a record survives a
//! deserialize/serialize cycle unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::lenient;
use crate::reconcile::{classify, ShipmentStatus};

/// Inbound declaration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arrival {
    #[serde(
        rename = "MRN",
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub mrn: Option<String>,

    #[serde(rename = "DECLARATIONID", default, skip_serializing_if = "Option::is_none")]
    pub declaration_id: Option<Value>,

    #[serde(
        rename = "COMMERCIALREFERENCE",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub commercial_reference: Option<Value>,

    #[serde(rename = "TOTAL_PACKAGES", default, skip_serializing_if = "Option::is_none")]
    pub total_packages: Option<Value>,

    #[serde(rename = "GDSREL_DATETIME", default, skip_serializing_if = "Option::is_none")]
    pub release_datetime: Option<Value>,

    /// Remaining undeclared package balance
    #[serde(
        default,
        deserialize_with = "lenient::opt_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub saldo: Option<i64>,

    #[serde(rename = "Outbounds", default, deserialize_with = "lenient::vec_or_empty")]
    pub outbounds: Vec<Outbound>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Arrival {
    /// Derived reconciliation status
    pub fn status(&self) -> ShipmentStatus {
        classify(self.saldo, Some(self.outbounds.len() as i64))
    }
}

/// Export declaration linked to an arrival through `document_precedent`.
/// Nothing reads these fields; they are carried through as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outbound {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mrn: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre_total_des_conditionnements: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_de_declaration: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_precedent: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One operator annotation on an MRN
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub saldo: Option<i64>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub outbounds_count: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TrackingEntry {
    /// Fill server-owned fields the client left out: `timestamp` is stamped
    /// with `now`, and `status` is derived from `saldo`/`outbounds_count`
    /// when a saldo is present.
    pub fn complete_with(&mut self, now: impl FnOnce() -> String) {
        if self.timestamp.is_none() {
            self.timestamp = Some(Value::String(now()));
        }

        if self.status.is_none() && self.saldo.is_some() {
            let status = classify(self.saldo, self.outbounds_count);
            self.status = Some(Value::String(status.as_str().to_string()));
        }
    }
}

/// All annotations for one MRN, newest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingRecord {
    #[serde(
        rename = "MRN",
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub mrn: Option<String>,

    #[serde(default)]
    pub tracking_records: Vec<TrackingEntry>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Root document of the tracking store file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingFile {
    #[serde(default)]
    pub records: Vec<TrackingRecord>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TrackingFile {
    /// Prepend `entry` to the record for `mrn`, creating the record at the end
    /// of the list when the MRN is new. Returns `true` when a record was created.
    pub fn prepend_entry(&mut self, mrn: &str, entry: TrackingEntry) -> bool {
        match self.records.iter_mut().find(|r| r.mrn.as_deref() == Some(mrn)) {
            Some(record) => {
                record.tracking_records.insert(0, entry);
                false
            }
            None => {
                self.records.push(TrackingRecord {
                    mrn: Some(mrn.to_string()),
                    tracking_records: vec![entry],
                    extra: Map::new(),
                });
                true
            }
        }
    }

    /// Entries for `mrn`, empty when the MRN has never been tracked
    pub fn entries_for(&self, mrn: &str) -> &[TrackingEntry] {
        self.records
            .iter()
            .find(|r| r.mrn.as_deref() == Some(mrn))
            .map(|r| r.tracking_records.as_slice())
            .unwrap_or(&[])
    }
}

/// One execution of the external automation workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowRun {
    #[serde(
        rename = "runId",
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub run_id: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    #[serde(
        rename = "fileRef",
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_ref: Option<String>,

    #[serde(
        rename = "projectName",
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub project_name: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,

    /// RFC 3339 string or epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,

    #[serde(rename = "Steps", default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Value>,

    #[serde(rename = "finalResult", default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arrival_keeps_unknown_fields() {
        let raw = json!({
            "MRN": "24BE000001",
            "saldo": 3,
            "Outbounds": [],
            "GROSSMASS": 1250.5
        });
        let arrival: Arrival = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(arrival.mrn.as_deref(), Some("24BE000001"));
        assert_eq!(arrival.extra["GROSSMASS"], json!(1250.5));
        assert_eq!(serde_json::to_value(&arrival).unwrap(), raw);
    }

    #[test]
    fn test_arrival_status_uses_outbound_count() {
        let arrival: Arrival = serde_json::from_value(json!({
            "MRN": "A",
            "saldo": 2,
            "Outbounds": [{"mrn": "O1"}]
        }))
        .unwrap();
        assert_eq!(arrival.status(), ShipmentStatus::Error);
    }

    #[test]
    fn test_arrival_without_outbounds_field() {
        let arrival: Arrival = serde_json::from_value(json!({"saldo": 5})).unwrap();
        assert!(arrival.outbounds.is_empty());
        assert_eq!(arrival.status(), ShipmentStatus::Waiting);
    }

    #[test]
    fn test_complete_with_stamps_and_derives_status() {
        let mut entry = TrackingEntry {
            saldo: Some(0),
            outbounds_count: Some(2),
            ..Default::default()
        };
        entry.complete_with(|| "2024-01-01T00:00:00.000Z".to_string());
        assert_eq!(entry.timestamp, Some(json!("2024-01-01T00:00:00.000Z")));
        assert_eq!(entry.status, Some(json!("complete")));
    }

    #[test]
    fn test_complete_with_keeps_client_values() {
        let mut entry = TrackingEntry {
            status: Some(json!("resolved")),
            saldo: Some(4),
            timestamp: Some(json!("client-time")),
            ..Default::default()
        };
        entry.complete_with(|| "server-time".to_string());
        assert_eq!(entry.status, Some(json!("resolved")));
        assert_eq!(entry.timestamp, Some(json!("client-time")));
    }

    #[test]
    fn test_complete_with_no_saldo_leaves_status_empty() {
        let mut entry = TrackingEntry::default();
        entry.complete_with(|| "t".to_string());
        assert!(entry.status.is_none());
    }

    #[test]
    fn test_prepend_entry_creates_then_prepends() {
        let mut file = TrackingFile::default();
        let first = TrackingEntry {
            note: Some(json!("first")),
            ..Default::default()
        };
        let second = TrackingEntry {
            note: Some(json!("second")),
            ..Default::default()
        };

        assert!(file.prepend_entry("X", first));
        assert!(!file.prepend_entry("X", second));

        let entries = file.entries_for("X");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].note, Some(json!("second")));
        assert_eq!(file.records.len(), 1);
    }

    #[test]
    fn test_new_mrn_appended_to_end() {
        let mut file = TrackingFile::default();
        file.prepend_entry("A", TrackingEntry::default());
        file.prepend_entry("B", TrackingEntry::default());
        assert_eq!(file.records[1].mrn.as_deref(), Some("B"));
    }

    #[test]
    fn test_entries_for_unknown_mrn() {
        assert!(TrackingFile::default().entries_for("nope").is_empty());
    }

    #[test]
    fn test_tracking_file_wire_shape() {
        let mut file = TrackingFile::default();
        file.prepend_entry(
            "X",
            TrackingEntry {
                user: Some(json!("ops@example.com")),
                note: Some(json!("a")),
                ..Default::default()
            },
        );
        let value = serde_json::to_value(&file).unwrap();
        assert_eq!(
            value,
            json!({"records": [{"MRN": "X", "tracking_records": [
                {"user": "ops@example.com", "note": "a"}
            ]}]})
        );
    }

    #[test]
    fn test_flow_run_field_names() {
        let run: FlowRun = serde_json::from_value(json!({
            "runId": "r1",
            "fileRef": "f.pdf",
            "projectName": "Import",
            "status": "success",
            "timestamp": "2024-03-01T10:00:00Z",
            "Steps": [{"name": "extract"}],
            "finalResult": "ok",
            "sender": "x@y.z"
        }))
        .unwrap();
        assert_eq!(run.run_id.as_deref(), Some("r1"));
        assert_eq!(run.file_ref.as_deref(), Some("f.pdf"));
        assert_eq!(run.steps, Some(json!([{"name": "extract"}])));
        assert_eq!(run.extra["sender"], json!("x@y.z"));
    }

    #[test]
    fn test_arrival_tolerates_loose_types() {
        let raw = json!({
            "MRN": 24001,
            "saldo": 0.0,
            "TOTAL_PACKAGES": "12",
            "Outbounds": [
                {"mrn": "O1", "nombre_total_des_conditionnements": "12"},
                {"mrn": 7, "nombre_total_des_conditionnements": 3.5}
            ]
        });
        let arrival: Arrival = serde_json::from_value(raw).unwrap();
        assert_eq!(arrival.mrn.as_deref(), Some("24001"));
        assert_eq!(arrival.saldo, Some(0));
        assert_eq!(arrival.total_packages, Some(json!("12")));
        assert_eq!(arrival.outbounds.len(), 2);
        assert_eq!(
            arrival.outbounds[0].nombre_total_des_conditionnements,
            Some(json!("12"))
        );
        assert_eq!(arrival.status(), ShipmentStatus::Complete);
    }

    #[test]
    fn test_arrival_uninterpretable_saldo_is_unknown() {
        let arrival: Arrival = serde_json::from_value(json!({
            "MRN": "A",
            "saldo": {"value": 3},
            "Outbounds": null
        }))
        .unwrap();
        assert_eq!(arrival.saldo, None);
        assert!(arrival.outbounds.is_empty());
        assert_eq!(arrival.status(), ShipmentStatus::Unknown);
    }

    #[test]
    fn test_arrival_string_saldo() {
        let arrival: Arrival =
            serde_json::from_value(json!({"saldo": "3", "Outbounds": [{}]})).unwrap();
        assert_eq!(arrival.saldo, Some(3));
        assert_eq!(arrival.status(), ShipmentStatus::Error);
    }

    #[test]
    fn test_tracking_entry_tolerates_loose_types() {
        let mut entry: TrackingEntry = serde_json::from_value(json!({
            "note": 42,
            "user": {"email": "ops@example.com"},
            "saldo": "3",
            "outbounds_count": 0.0
        }))
        .unwrap();
        assert_eq!(entry.note, Some(json!(42)));
        assert_eq!(entry.saldo, Some(3));
        assert_eq!(entry.outbounds_count, Some(0));

        entry.complete_with(|| "t".to_string());
        assert_eq!(entry.status, Some(json!("waiting")));
    }

    #[test]
    fn test_tracking_entry_keeps_client_timestamp_shape() {
        let raw = json!({"note": "a", "timestamp": 1_709_287_200_000i64});
        let entry: TrackingEntry = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&entry).unwrap(), raw);
    }

    #[test]
    fn test_tracking_file_keeps_extra_keys() {
        let raw = json!({
            "version": 2,
            "records": [
                {"MRN": "X", "tracking_records": [{"note": "a"}], "owner": "ops"},
                {"tracking_records": [], "orphan": true}
            ]
        });
        let file: TrackingFile = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(file.extra["version"], json!(2));
        assert_eq!(file.records[0].extra["owner"], json!("ops"));
        assert!(file.records[1].mrn.is_none());
        assert_eq!(serde_json::to_value(&file).unwrap(), raw);
    }

    #[test]
    fn test_prepend_keeps_extra_keys() {
        let mut file: TrackingFile = serde_json::from_value(json!({
            "version": 2,
            "records": [{"MRN": "X", "tracking_records": [], "owner": "ops"}]
        }))
        .unwrap();
        file.prepend_entry("X", TrackingEntry::default());
        file.prepend_entry("Y", TrackingEntry::default());

        let value = serde_json::to_value(&file).unwrap();
        assert_eq!(value["version"], json!(2));
        assert_eq!(value["records"][0]["owner"], json!("ops"));
        assert_eq!(value["records"][1]["MRN"], json!("Y"));
    }

    #[test]
    fn test_numeric_mrn_record_is_matched() {
        let file: TrackingFile = serde_json::from_value(json!({
            "records": [{"MRN": 12345, "tracking_records": [{"note": "n"}]}]
        }))
        .unwrap();
        assert_eq!(file.entries_for("12345").len(), 1);
    }

    #[test]
    fn test_flow_run_tolerates_loose_types() {
        let run: FlowRun = serde_json::from_value(json!({
            "id": 42,
            "runId": null,
            "fileRef": "f.pdf",
            "projectName": 7,
            "status": ["pending"],
            "Steps": "none"
        }))
        .unwrap();
        assert_eq!(run.id.as_deref(), Some("42"));
        assert!(run.run_id.is_none());
        assert_eq!(run.project_name.as_deref(), Some("7"));
        assert!(run.status.is_none());
        assert_eq!(run.steps, Some(json!("none")));
    }
}
