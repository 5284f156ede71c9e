//! Satz-Segmentierer – inkrementelle Zerlegung eines wachsenden Textstroms
//!
//! Zerlegt den Antworttext der KI in sprechbare Satz-Einheiten, damit die
//! Synthese beginnen kann bevor der vollstaendige Text vorliegt. Das
//! Satzzeichen bleibt am vorangehenden Satz haengen; der unvollstaendige
//! Rest verbleibt im Puffer bis zum naechsten Zuwachs oder zum Flush.
//!
//! Nicht thread-safe – wird pro Turn single-threaded verwendet.

/// Satz-terminale Zeichen (ASCII und ostasiatische Breitformen)
const SATZ_TERMINALE: &[char] = &['.', '!', '?', ':', ';', '\n', '。', '！', '？'];

/// Inkrementeller Satz-Segmentierer
#[derive(Debug, Default)]
pub struct SatzSegmentierer {
    /// Unvollstaendiger Rest aus vorherigen Zuwaechsen
    puffer: String,
}

impl SatzSegmentierer {
    /// Erstellt einen leeren Segmentierer
    pub fn neu() -> Self {
        Self::default()
    }

    /// Verarbeitet einen Text-Zuwachs und gibt alle dadurch
    /// vervollstaendigten Saetze in Reihenfolge zurueck
    pub fn einspeisen(&mut self, zuwachs: &str) -> Vec<String> {
        self.puffer.push_str(zuwachs);

        let mut saetze = Vec::new();
        let mut rest = String::new();
        let mut aktuell = String::new();

        for zeichen in self.puffer.chars() {
            aktuell.push(zeichen);
            if SATZ_TERMINALE.contains(&zeichen) {
                let satz = aktuell.trim();
                if !satz.is_empty() {
                    saetze.push(satz.to_string());
                }
                aktuell.clear();
            }
        }
        rest.push_str(&aktuell);

        self.puffer = rest;
        saetze
    }

    /// Schliesst den Strom ab und gibt den verbleibenden Rest als letzten
    /// Satz zurueck (falls nach Trimmen nicht leer)
    pub fn abschliessen(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.puffer);
        let rest = rest.trim();
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }

    /// Gibt true zurueck wenn kein unvollstaendiger Rest gepuffert ist
    pub fn ist_leer(&self) -> bool {
        self.puffer.is_empty()
    }
}
