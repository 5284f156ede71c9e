//! plauderei-protocol – Nachrichtenformen und Wire-Format
//!
//! Definiert die transport-agnostischen Duplex-Nachrichten zwischen Client
//! und Server sowie das laengen-praefixierte JSON-Frame-Format fuer die
//! duenne TCP-Anbindung.

pub mod chat;
pub mod wire;

pub use chat::{AntwortNachricht, ClientNachricht, SetupNachricht};
pub use wire::{ClientCodec, FrameCodec, ServerCodec};
