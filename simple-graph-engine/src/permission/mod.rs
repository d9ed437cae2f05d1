//! Permission gating for dispatched actions
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Dispatcher                          │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌─────────────┐ │
//! │  │   Requirement    │  │      Policy      │  │   Session   │ │
//! │  │                  │  │                  │  │             │ │
//! │  │ action ─▶ scope  │─▶│ - Default        │─▶│ escalate    │ │
//! │  │                  │  │ - Reprompt       │  │ (additive)  │ │
//! │  │                  │  │ - NeverEscalate  │  │             │ │
//! │  └──────────────────┘  └──────────────────┘  └─────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Policy
//!
//! | Policy | Prompts | After a denial |
//! |--------|---------|----------------|
//! | Default | When missing | Fails without prompting until logout or an explicit request |
//! | Reprompt | When missing | Prompts again |
//! | NeverEscalate | Never | Fails |

pub mod policy;
pub mod requirement;

pub use policy::{
    DefaultEscalationPolicy, EscalationContext, EscalationDecision, EscalationPolicy,
    NeverEscalatePolicy, RepromptEscalationPolicy,
};
pub use requirement::{required_permission, requires_session, ME};
