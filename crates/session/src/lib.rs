//! plauderei-session – Duplex-Sessions zum Upstream-KI-Endpunkt
//!
//! Das [`relay::SessionRelay`] besitzt genau eine lebende Duplex-Verbindung
//! und entkoppelt den Sendepfad vom Empfangspfad ueber eine interne Queue.
//! Die [`registry::SessionRegistry`] ist die einzige Quelle der Wahrheit
//! fuer die Zuordnung SessionKey -> SessionRelay.

pub mod registry;
pub mod relay;

pub use registry::SessionRegistry;
pub use relay::{FragmentErgebnis, SessionRelay};

#[cfg(test)]
mod testhilfe;
