//! Backend-Adapter – Capability-Traits fuer Sprach- und KI-Backends
//!
//! Der Kern konsumiert Erkennung, Synthese und Turn-Vervollstaendigung
//! ausschliesslich ueber diese Traits; konkrete Backends (Cloud-APIs,
//! lokale Modelle, Test-Attrappen) leben ausserhalb des Kerns.
//!
//! ## Duplex-Modell
//! `DuplexBackend::oeffnen` liefert die Verbindung als getrenntes
//! Sende-/Empfangs-Paar. Der Sendepfad wird vom Relay unter dessen
//! Sende-Schloss benutzt; die Empfangshaelfte wandert exklusiv in die
//! Hintergrund-Empfangsschleife. Damit gibt es keinen geteilten
//! Verbindungszustand zwischen beiden Pfaden.

use async_trait::async_trait;

use plauderei_core::Result;

// ---------------------------------------------------------------------------
// Gespraechskontext (gepufferter Modus)
// ---------------------------------------------------------------------------

/// Rolle eines Gespraechs-Eintrags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GespraechsRolle {
    Benutzer,
    Assistent,
}

/// Ein Eintrag im Gespraechsverlauf
#[derive(Debug, Clone)]
pub struct GespraechsEintrag {
    pub rolle: GespraechsRolle,
    pub inhalt: String,
}

/// Kontext fuer eine gepufferte Turn-Vervollstaendigung
///
/// Enthaelt die System-Anweisung der Persona und die juengsten
/// Gespraechs-Eintraege (Rezenz-Fenster, keine Persistenz).
#[derive(Debug, Clone)]
pub struct GespraechsKontext {
    pub system_anweisung: String,
    pub sprache: String,
    pub eintraege: Vec<GespraechsEintrag>,
}

// ---------------------------------------------------------------------------
// Gepufferte Backends (Lite-Pfad)
// ---------------------------------------------------------------------------

/// Spracherkennung: Audio -> Text
///
/// Ein Versuch pro Turn; der Kern wiederholt fehlgeschlagene Erkennungen
/// nicht automatisch.
#[async_trait]
pub trait Spracherkenner: Send + Sync {
    async fn erkennen(&self, audio: &[u8], sprache: &str) -> Result<String>;
}

/// Sprachsynthese: Text -> Audio (PCM s16le, 24 kHz, mono)
///
/// Primaer- und Fallback-Backends implementieren dasselbe Interface;
/// die Fallback-Logik liegt in [`crate::synthese::SyntheseKette`].
#[async_trait]
pub trait Sprachsynthese: Send + Sync {
    async fn synthetisieren(&self, text: &str, sprache: &str, stimme: &str) -> Result<Vec<u8>>;
}

/// Gepufferte Turn-Vervollstaendigung: Gespraechskontext -> Antworttext
#[async_trait]
pub trait Vervollstaendiger: Send + Sync {
    async fn abschliessen(&self, kontext: &GespraechsKontext) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Duplex-Backend (Premium-Pfad)
// ---------------------------------------------------------------------------

/// Konfiguration einer Duplex-Verbindung zum Upstream-Endpunkt
#[derive(Debug, Clone)]
pub struct DuplexKonfig {
    /// System-Anweisung der Persona
    pub system_anweisung: String,
    /// Gewaehlte Synthese-Stimme
    pub stimme: String,
    /// Sprachcode der Session
    pub sprache: String,
}

/// Eingehendes Ereignis der Duplex-Verbindung
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplexEreignis {
    /// Ein Audio-Fragment der KI-Antwort
    Audio(Vec<u8>),
    /// Der Upstream hat den aktuellen Turn abgeschlossen
    TurnAbgeschlossen,
}

/// Sendehaelfte einer Duplex-Verbindung
#[async_trait]
pub trait DuplexSender: Send {
    /// Sendet einen Audio-Chunk; `turn_ende` markiert das Ende des Turns
    /// (Legacy-Modus) bzw. bleibt im echten Streaming-Modus false
    async fn senden(&mut self, audio: &[u8], turn_ende: bool) -> Result<()>;

    /// Schliesst die Verbindung sauber
    async fn schliessen(&mut self) -> Result<()>;
}

/// Empfangshaelfte einer Duplex-Verbindung
#[async_trait]
pub trait DuplexEmpfaenger: Send {
    /// Wartet auf das naechste Ereignis; `None` bedeutet Stream-Ende
    async fn naechstes(&mut self) -> Result<Option<DuplexEreignis>>;
}

/// Fabrik fuer Duplex-Verbindungen zum Upstream-KI-Endpunkt
#[async_trait]
pub trait DuplexBackend: Send + Sync {
    /// Oeffnet eine neue Verbindung mit der gegebenen Konfiguration
    async fn oeffnen(
        &self,
        konfig: &DuplexKonfig,
    ) -> Result<(Box<dyn DuplexSender>, Box<dyn DuplexEmpfaenger>)>;
}
