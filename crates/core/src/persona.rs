//! Persona-Verzeichnis – Charakter-Konfigurationen fuer die KI
//!
//! Eine Persona buendelt eine System-Anweisung und eine Stimmen-Auswahl
//! pro Sprache. Das Verzeichnis ist nach dem Start unveraenderlich und
//! loest unbekannte Personas auf eine definierte Fallback-Persona auf.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::PersonaId;

/// Name der Fallback-Persona fuer unbekannte Anfragen
pub const FALLBACK_PERSONA: &str = "friend";

/// Stimme die verwendet wird wenn fuer eine Sprache keine hinterlegt ist
pub const FALLBACK_STIMME: &str = "Puck";

// ---------------------------------------------------------------------------
// PersonaKonfig
// ---------------------------------------------------------------------------

/// Statische Konfiguration einer Persona
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaKonfig {
    /// Anzeigename der Persona
    pub name: String,
    /// System-Anweisung fuer das Sprachmodell (opaker Text)
    pub system_anweisung: String,
    /// Stimmen-Auswahl pro Sprachcode ("en", "ja", "vi", ...)
    #[serde(default)]
    pub stimmen: HashMap<String, String>,
    /// Stimme wenn fuer die angefragte Sprache keine hinterlegt ist
    #[serde(default)]
    pub standard_stimme: Option<String>,
}

impl PersonaKonfig {
    /// Gibt die Stimme fuer einen Sprachcode zurueck, mit Fallback-Kette:
    /// Sprache -> standard_stimme -> globale Fallback-Stimme
    pub fn stimme_fuer(&self, sprache: &str) -> &str {
        self.stimmen
            .get(sprache)
            .or(self.standard_stimme.as_ref())
            .map(String::as_str)
            .unwrap_or(FALLBACK_STIMME)
    }
}

// ---------------------------------------------------------------------------
// PersonaVerzeichnis
// ---------------------------------------------------------------------------

/// Unveraenderliches Verzeichnis aller bekannten Personas
///
/// Wird einmal beim Start aufgebaut (eingebaute Standardwerte plus
/// optionale Konfigurations-Overrides) und danach nur noch gelesen.
#[derive(Debug, Clone)]
pub struct PersonaVerzeichnis {
    personas: HashMap<String, PersonaKonfig>,
}

impl PersonaVerzeichnis {
    /// Erstellt ein Verzeichnis aus den gegebenen Personas.
    /// Die Fallback-Persona wird ergaenzt falls sie fehlt.
    pub fn neu(mut personas: HashMap<String, PersonaKonfig>) -> Self {
        personas
            .entry(FALLBACK_PERSONA.to_string())
            .or_insert_with(standard_freund);
        Self { personas }
    }

    /// Erstellt das Verzeichnis mit den eingebauten Standard-Personas
    pub fn standard() -> Self {
        Self::neu(standard_personas())
    }

    /// Eingebaute Standard-Personas plus Konfigurations-Overrides
    ///
    /// Overrides mit gleichem Namen ersetzen die eingebaute Persona.
    pub fn standard_mit(overrides: HashMap<String, PersonaKonfig>) -> Self {
        let mut personas = standard_personas();
        personas.extend(overrides);
        Self::neu(personas)
    }

    /// Loest eine Persona-ID auf; unbekannte IDs fallen auf die
    /// Fallback-Persona zurueck
    pub fn aufloesen(&self, id: &PersonaId) -> &PersonaKonfig {
        self.personas.get(id.inner()).unwrap_or_else(|| {
            // neu() garantiert dass die Fallback-Persona existiert
            &self.personas[FALLBACK_PERSONA]
        })
    }

    /// Prueft ob eine Persona-ID direkt (ohne Fallback) bekannt ist
    pub fn ist_bekannt(&self, id: &PersonaId) -> bool {
        self.personas.contains_key(id.inner())
    }

    /// Anzahl der registrierten Personas
    pub fn anzahl(&self) -> usize {
        self.personas.len()
    }
}

impl Default for PersonaVerzeichnis {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Eingebaute Standard-Personas
// ---------------------------------------------------------------------------

fn standard_freund() -> PersonaKonfig {
    PersonaKonfig {
        name: "Juan".into(),
        system_anweisung: "You are Juan, a friendly and casual AI companion. \
You are helpful, witty, and engaging. You speak naturally with a friendly tone. \
Keep your responses concise and conversational."
            .into(),
        stimmen: HashMap::new(),
        standard_stimme: Some("Puck".into()),
    }
}

fn standard_personas() -> HashMap<String, PersonaKonfig> {
    let mut personas = HashMap::new();

    personas.insert("friend".to_string(), standard_freund());

    personas.insert(
        "parent".to_string(),
        PersonaKonfig {
            name: "Mother".into(),
            system_anweisung: "You are a caring parent figure. \
You are supportive, wise, and patient. You give good advice and care about the \
user's well-being. Speak with a warm and nurturing tone."
                .into(),
            stimmen: HashMap::new(),
            standard_stimme: Some("Aoede".into()),
        },
    );

    personas.insert(
        "sister".to_string(),
        PersonaKonfig {
            name: "Sister".into(),
            system_anweisung: "You are a playful younger sister. \
You are energetic, sometimes teasing, but affectionate. You like to share \
stories and ask questions. Speak with a lively and youthful tone."
                .into(),
            stimmen: HashMap::new(),
            standard_stimme: Some("Fenrir".into()),
        },
    );

    personas.insert(
        "teacher".to_string(),
        PersonaKonfig {
            name: "Aki".into(),
            system_anweisung: "You are Aki, a bilingual English tutor for \
Japanese learners. Your primary goal is to keep the learner speaking English \
while giving quick support in Japanese when needed. Default to English for \
most of the conversation. If the user sounds confused or speaks Japanese, \
prepend a very short Japanese scaffolding line in romaji (prefixed with \
\"JP:\") and then continue in English. Keep all responses concise and focused \
on speaking practice. Do not use emojis, markdown, or stage directions."
                .into(),
            stimmen: HashMap::new(),
            standard_stimme: Some("Aoede".into()),
        },
    );

    personas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_verzeichnis_enthaelt_alle_personas() {
        let verzeichnis = PersonaVerzeichnis::standard();
        assert_eq!(verzeichnis.anzahl(), 4);
        assert!(verzeichnis.ist_bekannt(&PersonaId::neu("friend")));
        assert!(verzeichnis.ist_bekannt(&PersonaId::neu("parent")));
        assert!(verzeichnis.ist_bekannt(&PersonaId::neu("sister")));
        assert!(verzeichnis.ist_bekannt(&PersonaId::neu("teacher")));
    }

    #[test]
    fn unbekannte_persona_faellt_auf_fallback_zurueck() {
        let verzeichnis = PersonaVerzeichnis::standard();
        let persona = verzeichnis.aufloesen(&PersonaId::neu("nicht_vorhanden"));
        assert_eq!(persona.name, "Juan");
    }

    #[test]
    fn fallback_persona_wird_ergaenzt() {
        let verzeichnis = PersonaVerzeichnis::neu(HashMap::new());
        assert!(verzeichnis.ist_bekannt(&PersonaId::neu(FALLBACK_PERSONA)));
    }

    #[test]
    fn stimmen_aufloesung_mit_fallback_kette() {
        let mut stimmen = HashMap::new();
        stimmen.insert("ja".to_string(), "ja-JP-Neural2-C".to_string());
        let persona = PersonaKonfig {
            name: "Test".into(),
            system_anweisung: String::new(),
            stimmen,
            standard_stimme: Some("Aoede".into()),
        };
        assert_eq!(persona.stimme_fuer("ja"), "ja-JP-Neural2-C");
        assert_eq!(persona.stimme_fuer("vi"), "Aoede");

        let ohne_standard = PersonaKonfig {
            name: "Test".into(),
            system_anweisung: String::new(),
            stimmen: HashMap::new(),
            standard_stimme: None,
        };
        assert_eq!(ohne_standard.stimme_fuer("en"), FALLBACK_STIMME);
    }
}
