//! Escalation policy trait and default implementations
//!
//! When an action finds the session missing a permission, the dispatcher
//! asks an [`EscalationPolicy`] whether to prompt the user for it or fail
//! the action straight away.

use simple_graph_api::Permission;
use std::collections::BTreeSet;

/// Context provided to the escalation policy
#[derive(Debug)]
pub struct EscalationContext<'a> {
    /// Name of the action that needs the permission
    pub action: &'a str,
    /// Permissions the action needs and the session lacks
    pub missing: &'a BTreeSet<Permission>,
    /// Wire values currently granted
    pub granted: &'a BTreeSet<String>,
    /// Permissions the user declined earlier in this session
    pub previously_denied: &'a BTreeSet<Permission>,
}

impl EscalationContext<'_> {
    /// Every missing permission was already declined in this session
    pub fn all_previously_denied(&self) -> bool {
        !self.missing.is_empty() && self.missing.is_subset(self.previously_denied)
    }
}

/// Decision returned by an escalation policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationDecision {
    /// Ask the session provider for the missing permissions
    Escalate,
    /// Fail the action without prompting
    Deny(String),
}

/// Strategy trait for lazy permission escalation
///
/// # Example
///
/// ```rust
/// use simple_graph_engine::permission::{
///     EscalationContext, EscalationDecision, EscalationPolicy,
/// };
///
/// struct OnlyForPublish;
///
/// impl EscalationPolicy for OnlyForPublish {
///     fn decide(&self, ctx: &EscalationContext) -> EscalationDecision {
///         if ctx.missing.iter().all(|p| p.is_publish()) {
///             EscalationDecision::Escalate
///         } else {
///             EscalationDecision::Deny("read scopes are requested at login".into())
///         }
///     }
/// }
/// ```
pub trait EscalationPolicy: Send + Sync {
    fn decide(&self, ctx: &EscalationContext) -> EscalationDecision;
}

// ============================================================================
// Default Implementations
// ============================================================================

/// Default escalation policy
///
/// - Prompts for missing permissions
/// - Does not prompt again for permissions declined earlier in the
///   session; an explicit permission request or a new login resets that
#[derive(Debug, Default)]
pub struct DefaultEscalationPolicy;

impl EscalationPolicy for DefaultEscalationPolicy {
    fn decide(&self, ctx: &EscalationContext) -> EscalationDecision {
        if ctx.all_previously_denied() {
            EscalationDecision::Deny(format!(
                "{} declined earlier in this session",
                join(ctx.missing)
            ))
        } else {
            EscalationDecision::Escalate
        }
    }
}

/// Prompts every time, even after a denial
#[derive(Debug, Default)]
pub struct RepromptEscalationPolicy;

impl EscalationPolicy for RepromptEscalationPolicy {
    fn decide(&self, _ctx: &EscalationContext) -> EscalationDecision {
        EscalationDecision::Escalate
    }
}

/// Never prompts; permissions must be granted at login or through an
/// explicit request
#[derive(Debug, Default)]
pub struct NeverEscalatePolicy;

impl EscalationPolicy for NeverEscalatePolicy {
    fn decide(&self, ctx: &EscalationContext) -> EscalationDecision {
        EscalationDecision::Deny(format!(
            "escalation disabled: {} must be granted up front",
            join(ctx.missing)
        ))
    }
}

fn join(permissions: &BTreeSet<Permission>) -> String {
    permissions
        .iter()
        .map(|p| p.value())
        .collect::<Vec<_>>()
        .join(", ")
}
