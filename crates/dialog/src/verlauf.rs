//! In-Memory-Gespraechsverlauf fuer den Lite-Pfad

use dashmap::DashMap;

use plauderei_core::types::SessionKey;
use plauderei_speech::{GespraechsEintrag, GespraechsKontext, GespraechsRolle};

/// Anzahl der juengsten Eintraege die in den Vervollstaendigungs-Kontext
/// uebernommen werden
pub const VERLAUF_FENSTER: usize = 10;

/// Obergrenze der gespeicherten Eintraege pro Session
///
/// Aelteres wird verworfen, das Rezenz-Fenster bleibt davon unberuehrt.
const SPEICHER_KAPPUNG: usize = 2 * VERLAUF_FENSTER;

/// Gespraechsverlauf aller aktiven Sessions
///
/// Rein fluechtig: kein Persistenz-Layer, der Verlauf lebt und stirbt mit
/// dem Prozess bzw. mit [`GespraechsVerlauf::beenden`].
#[derive(Default)]
pub struct GespraechsVerlauf {
    eintraege: DashMap<SessionKey, Vec<GespraechsEintrag>>,
}

impl GespraechsVerlauf {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Haengt eine Benutzer-Aeusserung an den Verlauf an
    pub fn benutzer_eintrag(&self, key: &SessionKey, inhalt: &str) {
        self.anhaengen(key, GespraechsRolle::Benutzer, inhalt);
    }

    /// Haengt eine Assistenten-Antwort an den Verlauf an
    pub fn assistent_eintrag(&self, key: &SessionKey, inhalt: &str) {
        self.anhaengen(key, GespraechsRolle::Assistent, inhalt);
    }

    fn anhaengen(&self, key: &SessionKey, rolle: GespraechsRolle, inhalt: &str) {
        let mut eintraege = self.eintraege.entry(key.clone()).or_default();
        eintraege.push(GespraechsEintrag {
            rolle,
            inhalt: inhalt.to_string(),
        });
        if eintraege.len() > SPEICHER_KAPPUNG {
            let ueberhang = eintraege.len() - SPEICHER_KAPPUNG;
            eintraege.drain(..ueberhang);
        }
    }

    /// Baut den Vervollstaendigungs-Kontext aus dem Rezenz-Fenster
    pub fn kontext(
        &self,
        key: &SessionKey,
        system_anweisung: &str,
        sprache: &str,
    ) -> GespraechsKontext {
        let eintraege = self
            .eintraege
            .get(key)
            .map(|e| {
                let start = e.len().saturating_sub(VERLAUF_FENSTER);
                e[start..].to_vec()
            })
            .unwrap_or_default();
        GespraechsKontext {
            system_anweisung: system_anweisung.to_string(),
            sprache: sprache.to_string(),
            eintraege,
        }
    }

    /// Verwirft den Verlauf einer Session
    pub fn beenden(&self, key: &SessionKey) {
        self.eintraege.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plauderei_core::types::{BenutzerId, PersonaId};

    fn key(benutzer: &str) -> SessionKey {
        SessionKey {
            benutzer: BenutzerId(benutzer.to_string()),
            persona: PersonaId("friend".to_string()),
        }
    }

    #[test]
    fn kontext_enthaelt_eintraege_in_reihenfolge() {
        let verlauf = GespraechsVerlauf::neu();
        let k = key("anna");
        verlauf.benutzer_eintrag(&k, "hallo");
        verlauf.assistent_eintrag(&k, "hallo zurueck");

        let kontext = verlauf.kontext(&k, "sei freundlich", "de");
        assert_eq!(kontext.system_anweisung, "sei freundlich");
        assert_eq!(kontext.eintraege.len(), 2);
        assert_eq!(kontext.eintraege[0].rolle, GespraechsRolle::Benutzer);
        assert_eq!(kontext.eintraege[0].inhalt, "hallo");
        assert_eq!(kontext.eintraege[1].rolle, GespraechsRolle::Assistent);
    }

    #[test]
    fn rezenz_fenster_beschneidet_alte_eintraege() {
        let verlauf = GespraechsVerlauf::neu();
        let k = key("bernd");
        for i in 0..15 {
            verlauf.benutzer_eintrag(&k, &format!("nachricht {i}"));
        }

        let kontext = verlauf.kontext(&k, "", "de");
        assert_eq!(kontext.eintraege.len(), VERLAUF_FENSTER);
        assert_eq!(kontext.eintraege[0].inhalt, "nachricht 5");
        assert_eq!(kontext.eintraege[9].inhalt, "nachricht 14");
    }

    #[test]
    fn sessions_sind_voneinander_isoliert() {
        let verlauf = GespraechsVerlauf::neu();
        verlauf.benutzer_eintrag(&key("anna"), "nur fuer anna");

        let kontext = verlauf.kontext(&key("bernd"), "", "de");
        assert!(kontext.eintraege.is_empty());
    }

    #[test]
    fn beenden_verwirft_den_verlauf() {
        let verlauf = GespraechsVerlauf::neu();
        let k = key("anna");
        verlauf.benutzer_eintrag(&k, "hallo");
        verlauf.beenden(&k);

        assert!(verlauf.kontext(&k, "", "de").eintraege.is_empty());
    }
}
