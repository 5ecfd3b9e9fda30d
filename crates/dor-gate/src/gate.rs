use dor_crypto::ContentHasher;
use dor_types::Pid;
use tracing::{debug, warn};

use crate::config::GateConfig;
use crate::context::{Action, CallContext};
use crate::error::{GateError, GateResult};
use crate::policy::{self, Policy};

/// Yes/no decision consulted before every repository call.
///
/// Implementations must be cheap to call and free of side effects other
/// than logging.
pub trait Authorization: Send + Sync {
    /// `Ok(())` if the call may proceed. `component` is the datastream or
    /// disseminator id the call names, if any.
    fn enforce(
        &self,
        ctx: &CallContext,
        action: Action,
        pid: Option<&Pid>,
        component: Option<&str>,
    ) -> GateResult<()>;
}

/// Gate that allows every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct PermitAll;

impl Authorization for PermitAll {
    fn enforce(
        &self,
        _ctx: &CallContext,
        _action: Action,
        _pid: Option<&Pid>,
        _component: Option<&str>,
    ) -> GateResult<()> {
        Ok(())
    }
}

/// Rule-based gate over an ordered list of policies.
///
/// The default policy is evaluated first, then the configured policies in
/// order. The first violated rule denies the call.
pub struct PolicyGate {
    config: GateConfig,
    policy_hash: [u8; 32],
}

impl PolicyGate {
    pub fn new(config: GateConfig) -> GateResult<Self> {
        let policy_hash = Self::compute_policy_hash(&config)?;
        debug!(
            permissive = config.permissive,
            policies = config.policies.len() + 1,
            policy_hash = %ContentHasher::short_hex(&policy_hash),
            "policy gate configured"
        );
        Ok(Self {
            config,
            policy_hash,
        })
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// BLAKE3 hash of the active policy set.
    pub fn policy_hash(&self) -> [u8; 32] {
        self.policy_hash
    }

    fn policies(&self) -> impl Iterator<Item = &Policy> {
        std::iter::once(&self.config.default_policy).chain(&self.config.policies)
    }

    fn compute_policy_hash(config: &GateConfig) -> GateResult<[u8; 32]> {
        let policies: Vec<&Policy> = std::iter::once(&config.default_policy)
            .chain(&config.policies)
            .collect();
        ContentHasher::POLICY
            .hash_json(&policies)
            .map_err(|e| GateError::Config(e.to_string()))
    }
}

impl Authorization for PolicyGate {
    fn enforce(
        &self,
        ctx: &CallContext,
        action: Action,
        pid: Option<&Pid>,
        component: Option<&str>,
    ) -> GateResult<()> {
        if self.config.permissive {
            return Ok(());
        }
        match policy::evaluate(self.policies(), ctx, action, pid, component) {
            None => Ok(()),
            Some((policy_id, reason)) => {
                warn!(
                    subject = %ctx.subject,
                    action = %action,
                    pid = pid.map(Pid::as_str).unwrap_or("-"),
                    policy = policy_id,
                    "call denied"
                );
                Err(GateError::denied(action, pid, reason))
            }
        }
    }
}
