//! Provenance records.
//!
//! Every successful mutation appends exactly one [`AuditRecord`] to the
//! object's log. Records are never edited; the log is serialized as the
//! reserved `AUDIT` datastream.

use serde::{Deserialize, Serialize};

use dor_types::Timestamp;

/// Process type recorded for mutations made through the management API.
pub const MANAGEMENT_PROCESS: &str = "Fedora API-M";

/// A single provenance entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// `AUDREC{n}`, assigned by the owning object.
    pub id: String,
    pub process_type: String,
    /// Name of the operation, e.g. `addDatastream`.
    pub action: String,
    /// Datastream or disseminator the operation touched.
    pub component_id: Option<String>,
    /// Identity of the caller.
    pub responsibility: String,
    pub date: Timestamp,
    pub justification: String,
}

impl AuditRecord {
    /// A management-API record with an unassigned id.
    pub fn management(
        action: impl Into<String>,
        component_id: Option<String>,
        responsibility: impl Into<String>,
        date: Timestamp,
        justification: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            process_type: MANAGEMENT_PROCESS.to_string(),
            action: action.into(),
            component_id,
            responsibility: responsibility.into(),
            date,
            justification: justification.into(),
        }
    }

    /// Numeric part of an `AUDREC{n}` id.
    pub fn ordinal(&self) -> Option<u64> {
        self.id.strip_prefix("AUDREC")?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_parses_audrec_ids() {
        let mut record = AuditRecord::management(
            "addDatastream",
            Some("DS1".into()),
            "fedoraAdmin",
            Timestamp::from_millis(0),
            "",
        );
        assert_eq!(record.ordinal(), None);
        record.id = "AUDREC12".into();
        assert_eq!(record.ordinal(), Some(12));
        record.id = "REC1".into();
        assert_eq!(record.ordinal(), None);
    }

    #[test]
    fn management_records_carry_process_type() {
        let record =
            AuditRecord::management("purgeObject", None, "alice", Timestamp::from_millis(0), "x");
        assert_eq!(record.process_type, MANAGEMENT_PROCESS);
        assert!(record.component_id.is_none());
    }
}
