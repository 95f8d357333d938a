//! # authz-audit-types
//!
//! Data model for the security event telemetry core.
//!
//! Collaborators build one of the input structs in [`inputs`] and hand it
//! to the telemetry core, which stamps it with an id and an ingestion-time
//! timestamp and stores it as an immutable [`EventRecord`]. Nothing in this
//! crate performs I/O or holds shared state.

#![deny(unsafe_code)]

pub mod category;
pub mod error;
pub mod inputs;
pub mod record;
pub mod system;

pub use category::{Decision, EventCategory, ThreatLevel};
pub use error::{TypesError, TypesResult};
pub use inputs::{
    AuthorizationDecisionEvent, ConfigurationChangeEvent, PerformanceEvent, PolicySyncEvent,
    SystemEvent, UNKNOWN_ORIGIN,
};
pub use record::{
    AuthorizationDetails, ConfigurationChangeDetails, EventPayload, EventRecord,
    PerformanceDetails, PolicySyncDetails, SystemEventDetails, ViolationDetails,
    UNAUTHORIZED_ACCESS_ATTEMPT,
};
pub use system::{Severity, SystemEventKind};
