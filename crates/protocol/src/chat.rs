//! Chat-Protokoll – Duplex-Nachrichten zwischen Client und Server
//!
//! ## Design
//! - Tagged Enums fuer typsichere Nachrichtentypen
//! - JSON-Serialisierung via serde; Audio-Nutzdaten als Base64-String
//! - Die erste Client-Nachricht MUSS eine Setup-Nachricht sein
//!
//! ## Audio-Formate
//! Eingehend rohes PCM s16le, 16 kHz, mono; ausgehend PCM s16le, 24 kHz,
//! mono. Es findet kein Transcoding statt.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use plauderei_core::types::{AntwortId, BenutzerId, PersonaId, PlanStufe};

// ---------------------------------------------------------------------------
// Audio-Konstanten
// ---------------------------------------------------------------------------

/// Abtastrate eingehender Client-Audiodaten (Hz)
pub const EINGANGS_ABTASTRATE: u32 = 16_000;

/// Abtastrate ausgehender synthetisierter Audiodaten (Hz)
pub const AUSGANGS_ABTASTRATE: u32 = 24_000;

/// Bytes pro Sample (PCM s16le, mono)
pub const BYTES_PRO_SAMPLE: usize = 2;

// ---------------------------------------------------------------------------
// Base64-Kodierung fuer Audio-Nutzdaten
// ---------------------------------------------------------------------------

/// Serde-Helfer: `Vec<u8>` als Base64-String im JSON-Frame
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Session-Konfiguration – zwingend die erste Nachricht des Clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupNachricht {
    /// Benutzer-ID
    pub benutzer_id: BenutzerId,
    /// Optionaler Anzeigename (nur informativ)
    #[serde(default)]
    pub benutzer_name: Option<String>,
    /// Gewuenschte Persona
    pub persona: PersonaId,
    /// Sprachcode ("en", "ja", "vi", ...)
    pub sprache: String,
    /// Abo-Stufe; fehlende/unbekannte Werte sind `Unbestimmt`
    #[serde(default)]
    pub stufe: PlanStufe,
}

/// Alle Nachrichten die der Client senden kann
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "typ", rename_all = "snake_case")]
pub enum ClientNachricht {
    /// Session-Setup (erste Nachricht)
    Setup(SetupNachricht),
    /// Ein Audio-Chunk (PCM s16le, 16 kHz, mono)
    Audio {
        #[serde(with = "base64_bytes")]
        daten: Vec<u8>,
    },
    /// Ende der Eingabe – markiert die Turn-Grenze, kein Payload
    EingabeEnde,
    /// Reservierte Text-Nachricht (derzeit inert)
    Text { inhalt: String },
}

impl ClientNachricht {
    /// Name der Nachrichtenart fuer Logs und Fehlermeldungen
    pub fn art(&self) -> &'static str {
        match self {
            Self::Setup(_) => "setup",
            Self::Audio { .. } => "audio",
            Self::EingabeEnde => "eingabe_ende",
            Self::Text { .. } => "text",
        }
    }
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Ein Antwort-Fragment des Servers
///
/// Fragmente eines Turns tragen dieselbe `antwort_id` und werden in
/// Erzeugungsreihenfolge mit monoton steigendem Zeitstempel gesendet.
/// Genau ein Fragment pro Turn traegt `ist_final = true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntwortNachricht {
    /// ID des zugehoerigen Turns
    pub antwort_id: AntwortId,
    /// Sprachcode der Antwort
    pub sprache: String,
    /// Zeitstempel in Mikrosekunden seit Unix-Epoche
    pub zeitstempel: i64,
    /// Terminal-Flag: letztes Fragment dieses Turns
    pub ist_final: bool,
    /// Synthetisierte Audiodaten (PCM s16le, 24 kHz, mono); leer beim
    /// Terminal-Fragment oder bei Fehler-Antworten
    #[serde(with = "base64_bytes")]
    pub audio: Vec<u8>,
    /// Fehlertext falls der Turn fehlgeschlagen ist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fehler: Option<String>,
}

impl AntwortNachricht {
    /// Erstellt ein Audio-Fragment (nicht-terminal)
    pub fn fragment(antwort_id: AntwortId, sprache: &str, audio: Vec<u8>) -> Self {
        Self {
            antwort_id,
            sprache: sprache.to_string(),
            zeitstempel: Utc::now().timestamp_micros(),
            ist_final: false,
            audio,
            fehler: None,
        }
    }

    /// Erstellt das Terminal-Fragment eines Turns (leerer Payload)
    pub fn abschluss(antwort_id: AntwortId, sprache: &str) -> Self {
        Self {
            antwort_id,
            sprache: sprache.to_string(),
            zeitstempel: Utc::now().timestamp_micros(),
            ist_final: true,
            audio: Vec::new(),
            fehler: None,
        }
    }

    /// Erstellt eine terminale Fehler-Antwort
    pub fn fehlschlag(antwort_id: AntwortId, sprache: &str, fehler: impl Into<String>) -> Self {
        Self {
            antwort_id,
            sprache: sprache.to_string(),
            zeitstempel: Utc::now().timestamp_micros(),
            ist_final: true,
            audio: Vec::new(),
            fehler: Some(fehler.into()),
        }
    }
}
