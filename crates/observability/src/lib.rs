//! # plauderei-observability
//!
//! Structured Logging via tracing-subscriber fuer alle Plauderei-Binaries.

pub mod logging;

pub use logging::logging_initialisieren;
