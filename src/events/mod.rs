//! Event infrastructure - naming registries, pattern matching, correlation
//! and the default host-event translator.

pub mod correlation;
pub mod pattern;
pub mod registry;
pub mod translation;

pub use correlation::CorrelationState;
pub use pattern::{EventPattern, PatternList, PatternSet};
pub use registry::{EventKind, NamingScheme};
pub use translation::{translate_host_event, Translation};
