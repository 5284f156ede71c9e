//! Turn-Verarbeitung und Plan-Dispatch
//!
//! Ein Turn ist ein abgeschlossener Austausch: der Client streamt Audio,
//! signalisiert das Eingabe-Ende, und der Server streamt Antwort-Fragmente
//! zurueck bis zum Abschluss-Signal. Wie der Turn verarbeitet wird haengt
//! von der Plan-Stufe des Benutzers ab:
//!
//! - Premium: Duplex-Relay zum Upstream-Endpunkt ([`PremiumStrategie`])
//! - Lite/Free/Unbestimmt: Erkennen-Vervollstaendigen-Synthetisieren-Kette
//!   ([`LiteStrategie`])
//! - Test: Wiedergabe eines Referenz-Audios ohne Upstream ([`TestStrategie`])

mod lite;
mod premium;
mod strategie;
mod testlauf;
mod verlauf;

pub use lite::LiteStrategie;
pub use premium::PremiumStrategie;
pub use strategie::{KontrollerVerteiler, TurnKontext, TurnStrategie};
pub use testlauf::TestStrategie;
pub use verlauf::{GespraechsVerlauf, VERLAUF_FENSTER};
