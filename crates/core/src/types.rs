//! Gemeinsame Identifikationstypen fuer Plauderei
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen. Benutzer- und
//! Persona-IDs kommen vom Client und sind deshalb Strings, keine UUIDs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Vom Client vergebene Benutzer-ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BenutzerId(pub String);

impl BenutzerId {
    pub fn neu(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Gibt den inneren String zurueck
    pub fn inner(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BenutzerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// Name einer Persona (Charakter-Konfiguration)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonaId(pub String);

impl PersonaId {
    pub fn neu(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Gibt den inneren String zurueck
    pub fn inner(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PersonaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "persona:{}", self.0)
    }
}

/// Eindeutige Antwort-ID (eine pro Turn)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AntwortId(pub Uuid);

impl AntwortId {
    /// Erstellt eine neue zufaellige AntwortId
    pub fn neu() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AntwortId {
    fn default() -> Self {
        Self::neu()
    }
}

impl std::fmt::Display for AntwortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionKey
// ---------------------------------------------------------------------------

/// Schluessel einer Upstream-Session: (Benutzer, Persona)
///
/// Pro SessionKey existiert hoechstens ein lebendes SessionRelay.
/// Nach der Konstruktion unveraenderlich.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub benutzer: BenutzerId,
    pub persona: PersonaId,
}

impl SessionKey {
    pub fn neu(benutzer: BenutzerId, persona: PersonaId) -> Self {
        Self { benutzer, persona }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.benutzer.0, self.persona.0)
    }
}

// ---------------------------------------------------------------------------
// PlanStufe
// ---------------------------------------------------------------------------

/// Abo-Stufe des Benutzers – bestimmt die Verarbeitungsstrategie
///
/// Unbekannte oder fehlende Werte muessen auf die konservativste
/// (Nicht-Premium-)Strategie aufgeloest werden, daher ist `Unbestimmt`
/// der Default. Die Deserialisierung darf deshalb nie fehlschlagen;
/// `Deserialize` ist von Hand implementiert und faellt bei unbekannten
/// Wire-Werten auf `Unbestimmt` zurueck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStufe {
    #[default]
    Unbestimmt,
    Free,
    Lite,
    Premium,
    Test,
}

impl PlanStufe {
    /// Mappt den Wire-Wert auf eine Stufe.
    /// Unbekannte Werte werden konservativ als `Unbestimmt` behandelt.
    pub fn aus_text(wert: &str) -> Self {
        match wert {
            "free" => Self::Free,
            "lite" => Self::Lite,
            "premium" => Self::Premium,
            "test" => Self::Test,
            _ => Self::Unbestimmt,
        }
    }
}

impl<'de> Deserialize<'de> for PlanStufe {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wert = String::deserialize(deserializer)?;
        Ok(Self::aus_text(&wert))
    }
}

impl std::fmt::Display for PlanStufe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unbestimmt => "unbestimmt",
            Self::Free => "free",
            Self::Lite => "lite",
            Self::Premium => "premium",
            Self::Test => "test",
        };
        write!(f, "{s}")
    }
}
