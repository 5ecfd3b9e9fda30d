use std::collections::HashSet;

use dor_types::is_reserved_datastream_id;

use crate::object::DigitalObject;

/// Result of checking an object's structural invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntegrityReport {
    pub datastream_count: usize,
    pub disseminator_count: usize,
    pub violations: Vec<Violation>,
}

impl IntegrityReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violation descriptions joined into one message.
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| format!("{}: {}", v.component, v.description))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// Component id, or `"object"` for object-level problems.
    pub component: String,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    MissingPid,
    ReservedId,
    EmptyHistory,
    ControlGroupMismatch,
    DuplicateVersionId,
    DanglingBinding,
}

/// Object graph invariant checker.
pub struct IntegrityValidator;

impl IntegrityValidator {
    /// Check every structural invariant of `object`. Bindings with an empty
    /// datastream id are resolved against `default_target`.
    pub fn validate(object: &DigitalObject, default_target: &str) -> IntegrityReport {
        let mut violations = Vec::new();
        let mut push = |component: &str, kind: ViolationKind, description: String| {
            violations.push(Violation {
                component: component.to_string(),
                kind,
                description,
            });
        };

        if object.pid().is_none() {
            push("object", ViolationKind::MissingPid, "object has no pid".into());
        }

        for ds in object.datastreams() {
            if is_reserved_datastream_id(&ds.id) {
                push(&ds.id, ViolationKind::ReservedId, "reserved datastream id".into());
            }
            if ds.is_empty() {
                push(&ds.id, ViolationKind::EmptyHistory, "datastream has no versions".into());
            }
            let mut seen = HashSet::new();
            for v in ds.versions() {
                if v.control_group() != ds.control_group {
                    push(
                        &ds.id,
                        ViolationKind::ControlGroupMismatch,
                        format!(
                            "version {} carries {} content in a {} datastream",
                            v.version_id,
                            v.control_group(),
                            ds.control_group
                        ),
                    );
                }
                if !seen.insert(v.version_id.as_str()) {
                    push(
                        &ds.id,
                        ViolationKind::DuplicateVersionId,
                        format!("version id {} repeats", v.version_id),
                    );
                }
            }
        }

        for diss in object.disseminators() {
            if diss.is_empty() {
                push(&diss.id, ViolationKind::EmptyHistory, "disseminator has no versions".into());
            }
            let mut seen = HashSet::new();
            for v in diss.versions() {
                if !seen.insert(v.version_id.as_str()) {
                    push(
                        &diss.id,
                        ViolationKind::DuplicateVersionId,
                        format!("version id {} repeats", v.version_id),
                    );
                }
                for binding in &v.binding_map.bindings {
                    let target = binding.resolved_datastream_id(default_target);
                    if !object.has_datastream(target) {
                        push(
                            &diss.id,
                            ViolationKind::DanglingBinding,
                            format!(
                                "version {} binds key {} to missing datastream {target}",
                                v.version_id, binding.bind_key
                            ),
                        );
                    }
                }
            }
        }

        IntegrityReport {
            datastream_count: object.datastream_ids().len(),
            disseminator_count: object.disseminator_ids().len(),
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastream::{Content, Datastream, DatastreamVersion};
    use crate::disseminator::{Binding, BindingMap, Disseminator, DisseminatorVersion};
    use dor_types::{ControlGroup, Pid, Timestamp};

    fn pid(s: &str) -> Pid {
        Pid::parse(s).unwrap()
    }

    fn object_with_dc() -> DigitalObject {
        let mut obj = DigitalObject::new(pid("demo:1"));
        let mut ds = Datastream::new("DC", ControlGroup::Inline);
        ds.push_version(DatastreamVersion::new(
            "DC.0",
            Timestamp::from_millis(1),
            Content::Inline(b"<dc/>".to_vec()),
        ))
        .unwrap();
        obj.put_datastream(ds);
        obj
    }

    fn diss(binding: Binding) -> Disseminator {
        let mut d = Disseminator::new("DISS1", pid("demo:bdef"));
        d.push_version(DisseminatorVersion {
            version_id: "DISS1.0".into(),
            label: String::new(),
            bmech_pid: pid("demo:bmech"),
            created: Timestamp::from_millis(1),
            binding_map: BindingMap::new(vec![binding]),
        })
        .unwrap();
        d
    }

    #[test]
    fn valid_object_passes() {
        let mut obj = object_with_dc();
        obj.put_disseminator(diss(Binding::new("K", "DC")));
        let report = IntegrityValidator::validate(&obj, "DC");
        assert!(report.is_valid(), "{}", report.summary());
        assert_eq!(report.datastream_count, 1);
        assert_eq!(report.disseminator_count, 1);
    }

    #[test]
    fn dangling_binding_detected() {
        let mut obj = object_with_dc();
        obj.put_disseminator(diss(Binding::new("K", "MISSING")));
        let report = IntegrityValidator::validate(&obj, "DC");
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].kind, ViolationKind::DanglingBinding);
    }

    #[test]
    fn implicit_binding_needs_default_target() {
        let mut obj = object_with_dc();
        obj.put_disseminator(diss(Binding::new("K", "")));
        assert!(IntegrityValidator::validate(&obj, "DC").is_valid());
        assert!(!IntegrityValidator::validate(&obj, "OTHER").is_valid());
    }

    #[test]
    fn missing_pid_and_empty_history_detected() {
        let mut obj = DigitalObject::default();
        obj.put_datastream(Datastream::new("EMPTY", ControlGroup::Managed));
        let kinds: Vec<_> = IntegrityValidator::validate(&obj, "DC")
            .violations
            .into_iter()
            .map(|v| v.kind)
            .collect();
        assert_eq!(kinds, [ViolationKind::MissingPid, ViolationKind::EmptyHistory]);
    }

    #[test]
    fn reserved_id_detected() {
        let mut obj = object_with_dc();
        let mut audit = Datastream::new("AUDIT", ControlGroup::Inline);
        audit
            .push_version(DatastreamVersion::new(
                "AUDIT.0",
                Timestamp::from_millis(1),
                Content::Inline(b"<a/>".to_vec()),
            ))
            .unwrap();
        obj.put_datastream(audit);
        let report = IntegrityValidator::validate(&obj, "DC");
        assert_eq!(report.violations[0].kind, ViolationKind::ReservedId);
    }
}
