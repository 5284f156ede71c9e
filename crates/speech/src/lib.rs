//! plauderei-speech – Sprach-Backend-Adapter und Text-Verarbeitung
//!
//! Stellt die schmalen Capability-Traits bereit, ueber die der Kern mit
//! konkreten Erkennungs-, Synthese- und KI-Backends spricht, sowie den
//! inkrementellen Satz-Segmentierer und die Primaer/Fallback-Synthese-Kette.

pub mod backend;
pub mod segment;
pub mod synthese;

pub use backend::{
    DuplexBackend, DuplexEmpfaenger, DuplexEreignis, DuplexKonfig, DuplexSender,
    GespraechsEintrag, GespraechsKontext, GespraechsRolle, Spracherkenner, Sprachsynthese,
    Vervollstaendiger,
};
pub use segment::SatzSegmentierer;
pub use synthese::SyntheseKette;
