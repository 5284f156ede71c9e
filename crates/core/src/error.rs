//! Fehlertypen fuer Plauderei
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Untermodule koennen eigene Fehler definieren und via `#[from]` konvertieren.

use thiserror::Error;

/// Globaler Result-Alias fuer Plauderei
pub type Result<T> = std::result::Result<T, PlaudereiError>;

/// Alle moeglichen Fehler im Plauderei-System
#[derive(Debug, Error)]
pub enum PlaudereiError {
    // --- Upstream-Verbindung ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    #[error("Zeitlimit ueberschritten: {0}")]
    Zeitlimit(String),

    // --- Protokoll (Client-Seite) ---
    #[error("Protokollverletzung: {0}")]
    Protokoll(String),

    // --- Sprach-Backends ---
    #[error("Spracherkennung fehlgeschlagen: {0}")]
    Erkennung(String),

    #[error("Sprachsynthese fehlgeschlagen: {0}")]
    Synthese(String),

    #[error("Antwort-Erzeugung fehlgeschlagen: {0}")]
    Vervollstaendigung(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl PlaudereiError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler wiederholbar sein koennte
    ///
    /// Verbindungs- und Zeitlimit-Fehler verschwinden typischerweise beim
    /// naechsten Turn (das Relay wird neu aufgebaut); Protokoll- und
    /// Konfigurationsfehler nicht.
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(
            self,
            Self::Zeitlimit(_) | Self::Verbindung(_) | Self::Getrennt(_)
        )
    }
}
