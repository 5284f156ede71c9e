//! plauderei-core – Gemeinsame Typen, Personas und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Plauderei-Crates gemeinsam genutzt werden.

pub mod error;
pub mod persona;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{PlaudereiError, Result};
pub use persona::{PersonaKonfig, PersonaVerzeichnis};
pub use types::{AntwortId, BenutzerId, PersonaId, PlanStufe, SessionKey};
