//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use plauderei_core::persona::PersonaKonfig;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerKonfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Upstream/Turn-Einstellungen
    pub upstream: UpstreamEinstellungen,
    /// Audio-Einstellungen
    pub audio: AudioEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Zusaetzliche oder ueberschriebene Personas (Name -> Konfiguration);
    /// leer = nur die eingebauten Personas
    pub personas: HashMap<String, PersonaKonfig>,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Plauderei Server".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer den TCP-Listener
    pub bind_adresse: String,
    /// Port fuer den TCP-Listener
    pub tcp_port: u16,
    /// Maximale Frame-Groesse in Megabyte
    pub max_frame_mb: usize,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 9700,
            max_frame_mb: 4,
        }
    }
}

/// Upstream/Turn-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamEinstellungen {
    /// Poll-Intervall der Premium-Fragment-Schleife in Millisekunden
    pub poll_intervall_ms: u64,
    /// Frist fuer die Turn-Grenze nach abgeschlossenem Sendepfad in Sekunden
    pub turn_frist_sek: u64,
}

impl Default for UpstreamEinstellungen {
    fn default() -> Self {
        Self {
            poll_intervall_ms: 100,
            turn_frist_sek: 10,
        }
    }
}

/// Audio-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioEinstellungen {
    /// Pfad zum Referenz-Audio der Test-Stufe (PCM s16le, 24 kHz, mono);
    /// leer = eingebaute Stille
    pub test_referenz_pfad: Option<String>,
    /// Pause zwischen zwei Wiedergabe-Chunks der Test-Stufe in ms
    pub test_pause_ms: u64,
}

impl Default for AudioEinstellungen {
    fn default() -> Self {
        Self {
            test_referenz_pfad: None,
            test_pause_ms: 30,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerKonfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let konfig: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(konfig)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }

    /// Maximale Frame-Groesse in Bytes
    pub fn max_frame_bytes(&self) -> usize {
        self.netzwerk.max_frame_mb * 1024 * 1024
    }
}
