//! Core session gate and sanction engine for wardend
//!
//! The engine is host-agnostic: the daemon feeds it connect/disconnect
//! events, commands, and ticks, and applies the events it returns.

mod auth;
mod deadline;
mod engine;
mod error;
mod escalation;
mod events;
mod sanction;
mod session;

pub use auth::{CredentialHasher, HashingUnavailable, Sha256Hasher};
pub use deadline::DeadlineScheduler;
pub use engine::{LoginOutcome, MuteOutcome, SessionEngine};
pub use error::AuthError;
pub use escalation::{decide, BanTerm, SanctionDirective};
pub use events::{EngineEvent, KickReason};
pub use sanction::{
    ban_state, evaluate, is_banned, is_muted, mute_state, remaining, ModerationStatus,
    SanctionState, PERMANENT,
};
pub use session::{Session, SessionState};
