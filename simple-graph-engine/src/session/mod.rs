//! Session state
//!
//! ```text
//! Uninitialized ──login──▶ Opening ──ok──▶ Open ──logout──▶ Closing ──▶ Closed
//!                            │                                           │
//!                            └──cancelled / denied──▶ Closed ◀───────────┘
//! ```
//!
//! The granted scope only grows while the session is open and is reset
//! when it closes.

mod manager;
mod state;

pub use manager::SessionManager;
pub use state::{PermissionsGranted, SessionClosed, SessionOpened, SessionPhase, SessionState};
