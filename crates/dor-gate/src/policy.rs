use serde::{Deserialize, Serialize};
use tracing::debug;

use dor_types::Pid;

use crate::context::{Action, CallContext};

// ---------------------------------------------------------------------------
// Policy types
// ---------------------------------------------------------------------------

/// A named set of rules with a scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub name: String,
    pub rules: Vec<PolicyRule>,
    pub applies_to: PolicyScope,
}

impl Policy {
    /// A policy without rules; allows everything.
    pub fn permissive() -> Self {
        Self {
            id: "permissive".into(),
            name: "Permissive (allow all)".into(),
            rules: Vec::new(),
            applies_to: PolicyScope::All,
        }
    }

    /// Check whether this policy applies to a call.
    pub fn applies(&self, ctx: &CallContext, action: Action, pid: Option<&Pid>) -> bool {
        match &self.applies_to {
            PolicyScope::All => true,
            PolicyScope::Subject(subject) => ctx.subject == *subject,
            PolicyScope::Action(a) => action == *a,
            PolicyScope::Namespace(ns) => pid.is_some_and(|p| p.namespace() == ns),
        }
    }

    /// The first rule this call violates, as a reason.
    pub fn violation(
        &self,
        ctx: &CallContext,
        action: Action,
        component: Option<&str>,
    ) -> Option<String> {
        self.rules
            .iter()
            .find_map(|rule| rule.violation(ctx, action, component))
    }
}

/// Individual rule within a policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyRule {
    /// The caller must hold this role.
    RequireRole(String),
    /// Only calls that cannot change state.
    ReadOnly,
    /// Only these actions are allowed.
    AllowedActions(Vec<Action>),
    /// These actions are denied.
    DenyActions(Vec<Action>),
    /// Calls naming one of these components are denied.
    ProtectComponents(Vec<String>),
}

impl PolicyRule {
    fn violation(&self, ctx: &CallContext, action: Action, component: Option<&str>) -> Option<String> {
        match self {
            Self::RequireRole(role) => {
                (!ctx.has_role(role)).then(|| format!("policy requires role '{role}'"))
            }
            Self::ReadOnly => action
                .is_mutation()
                .then(|| format!("'{action}' is not allowed under a read-only policy")),
            Self::AllowedActions(allowed) => (!allowed.contains(&action))
                .then(|| format!("'{action}' is not in the allowed list")),
            Self::DenyActions(denied) => denied
                .contains(&action)
                .then(|| format!("'{action}' is denied by policy")),
            Self::ProtectComponents(ids) => component
                .filter(|c| action.is_mutation() && ids.iter().any(|id| id == c))
                .map(|c| format!("component '{c}' is protected")),
        }
    }
}

/// Scope controlling when a policy is evaluated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyScope {
    All,
    /// Calls made by one subject.
    Subject(String),
    /// Calls of one action.
    Action(Action),
    /// Calls on objects whose pid is in this namespace.
    Namespace(String),
}

/// First violation across every applicable policy, with the id of the
/// policy that produced it.
pub(crate) fn evaluate<'p>(
    policies: impl IntoIterator<Item = &'p Policy>,
    ctx: &CallContext,
    action: Action,
    pid: Option<&Pid>,
    component: Option<&str>,
) -> Option<(&'p str, String)> {
    for policy in policies {
        if !policy.applies(ctx, action, pid) {
            continue;
        }
        if let Some(reason) = policy.violation(ctx, action, component) {
            debug!(policy = %policy.id, action = %action, reason = %reason, "policy violated");
            return Some((policy.id.as_str(), reason));
        }
    }
    None
}
