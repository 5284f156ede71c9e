//! plauderei-bridge – client-seitige Stream-Bruecke
//!
//! Die [`verbindung::StreamBruecke`] ist die transportunabhaengige State
//! Machine einer Client-Verbindung (mpsc-Kanaele rein und raus); der
//! [`tcp::BrueckenServer`] bindet sie an einen TCP-Listener mit dem
//! Frame-Codec des Protokoll-Crates.

pub mod tcp;
pub mod verbindung;

pub use tcp::BrueckenServer;
pub use verbindung::{BrueckenZustand, StreamBruecke};
