//! Authorization gate for the digital object repository.
//!
//! Every repository call is checked by an [`Authorization`] implementation
//! before it touches the store. The gate only answers yes or no; it never
//! modifies the call.
//!
//! # Quick Start
//!
//! ```rust
//! use dor_gate::{Action, Authorization, CallContext, GateConfig, Policy, PolicyGate, PolicyRule, PolicyScope};
//!
//! let mut config = GateConfig::default();
//! config.policies.push(Policy {
//!     id: "read-only".into(),
//!     name: "Read only".into(),
//!     rules: vec![PolicyRule::ReadOnly],
//!     applies_to: PolicyScope::All,
//! });
//! let gate = PolicyGate::new(config).unwrap();
//! let ctx = CallContext::new("guest");
//! assert!(gate.enforce(&ctx, Action::GetObject, None, None).is_ok());
//! assert!(gate.enforce(&ctx, Action::Ingest, None, None).is_err());
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod policy;

pub use config::GateConfig;
pub use context::{Action, CallContext};
pub use error::{GateError, GateResult};
pub use gate::{Authorization, PermitAll, PolicyGate};
pub use policy::{Policy, PolicyRule, PolicyScope};

#[cfg(test)]
mod tests {
    use super::*;
    use dor_types::Pid;

    fn pid(s: &str) -> Pid {
        Pid::parse(s).unwrap()
    }

    fn admin_only() -> Policy {
        Policy {
            id: "admin-only".into(),
            name: "Administrators only".into(),
            rules: vec![PolicyRule::RequireRole("administrator".into())],
            applies_to: PolicyScope::All,
        }
    }

    // -----------------------------------------------------------------------
    // 1. Permit-all allows everything
    // -----------------------------------------------------------------------
    #[test]
    fn permit_all_allows_everything() {
        let ctx = CallContext::new("anyone");
        assert!(PermitAll
            .enforce(&ctx, Action::PurgeObject, Some(&pid("demo:1")), None)
            .is_ok());
    }

    // -----------------------------------------------------------------------
    // 2. Default configuration allows everything
    // -----------------------------------------------------------------------
    #[test]
    fn default_gate_allows() {
        let gate = PolicyGate::new(GateConfig::default()).unwrap();
        let ctx = CallContext::new("u");
        assert!(gate.enforce(&ctx, Action::Ingest, None, None).is_ok());
    }

    // -----------------------------------------------------------------------
    // 3. Required role
    // -----------------------------------------------------------------------
    #[test]
    fn required_role_is_enforced() {
        let mut config = GateConfig::default();
        config.policies.push(admin_only());
        let gate = PolicyGate::new(config).unwrap();

        let guest = CallContext::new("guest");
        let err = gate
            .enforce(&guest, Action::AddDatastream, Some(&pid("demo:1")), Some("DC"))
            .unwrap_err();
        assert!(err.to_string().contains("administrator"));
        assert!(err.to_string().contains("demo:1"));

        let admin = CallContext::new("root").with_role("administrator");
        assert!(gate
            .enforce(&admin, Action::AddDatastream, Some(&pid("demo:1")), Some("DC"))
            .is_ok());
    }

    // -----------------------------------------------------------------------
    // 4. Permissive mode skips policies
    // -----------------------------------------------------------------------
    #[test]
    fn permissive_mode_skips_policies() {
        let mut config = GateConfig::permissive();
        config.policies.push(admin_only());
        let gate = PolicyGate::new(config).unwrap();
        assert!(gate
            .enforce(&CallContext::new("guest"), Action::PurgeObject, None, None)
            .is_ok());
    }

    // -----------------------------------------------------------------------
    // 5. Subject-scoped policy
    // -----------------------------------------------------------------------
    #[test]
    fn subject_scope_only_affects_that_subject() {
        let mut config = GateConfig::default();
        config.policies.push(Policy {
            id: "robot".into(),
            name: "Robot is read only".into(),
            rules: vec![PolicyRule::ReadOnly],
            applies_to: PolicyScope::Subject("robot".into()),
        });
        let gate = PolicyGate::new(config).unwrap();
        assert!(gate
            .enforce(&CallContext::new("robot"), Action::ModifyObject, None, None)
            .is_err());
        assert!(gate
            .enforce(&CallContext::new("human"), Action::ModifyObject, None, None)
            .is_ok());
    }

    // -----------------------------------------------------------------------
    // 6. Policy hash tracks configuration
    // -----------------------------------------------------------------------
    #[test]
    fn policy_hash_changes_with_policies() {
        let plain = PolicyGate::new(GateConfig::default()).unwrap();
        let mut config = GateConfig::default();
        config.policies.push(admin_only());
        let strict = PolicyGate::new(config).unwrap();
        assert_ne!(plain.policy_hash(), [0u8; 32]);
        assert_ne!(plain.policy_hash(), strict.policy_hash());
    }

    // -----------------------------------------------------------------------
    // 7. Configuration loads from TOML
    // -----------------------------------------------------------------------
    #[test]
    fn config_from_toml() {
        let text = r#"
permissive = false

[[policies]]
id = "no-purge"
name = "No purges"
rules = [{ DenyActions = ["PurgeObject", "PurgeDatastream"] }]
applies_to = "All"
"#;
        let config: GateConfig = toml::from_str(text).unwrap();
        assert_eq!(config.default_policy, Policy::permissive());
        let gate = PolicyGate::new(config).unwrap();
        assert!(gate
            .enforce(&CallContext::new("u"), Action::PurgeDatastream, None, None)
            .is_err());
        assert!(gate
            .enforce(&CallContext::new("u"), Action::AddDatastream, None, None)
            .is_ok());
    }

    // -----------------------------------------------------------------------
    // 8. Policies serialize as JSON
    // -----------------------------------------------------------------------
    #[test]
    fn policy_json_roundtrip() {
        let policy = admin_only();
        let json = serde_json::to_string(&policy).unwrap();
        let back: Policy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);
    }
}
