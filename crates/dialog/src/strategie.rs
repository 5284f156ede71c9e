//! Strategie-Schnittstelle und Plan-Dispatch

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use plauderei_core::{
    persona::PersonaKonfig,
    types::{PlanStufe, SessionKey},
    Result,
};
use plauderei_protocol::chat::AntwortNachricht;

// ---------------------------------------------------------------------------
// Turn-Kontext
// ---------------------------------------------------------------------------

/// Unveraenderlicher Kontext eines einzelnen Turns
///
/// Wird von der Bruecke beim Setup aufgebaut und fuer jeden Turn an die
/// ausgewaehlte Strategie uebergeben.
#[derive(Debug, Clone)]
pub struct TurnKontext {
    /// Session-Schluessel (Benutzer + Persona)
    pub key: SessionKey,
    /// Sprachcode des Clients (z.B. "de" oder "en")
    pub sprache: String,
    /// Aufgeloeste Persona-Konfiguration
    pub persona: PersonaKonfig,
}

// ---------------------------------------------------------------------------
// Strategie-Trait
// ---------------------------------------------------------------------------

/// Verarbeitet genau einen Turn
///
/// `audio_rx` liefert die Audio-Chunks des Clients und wird geschlossen
/// sobald der Client das Eingabe-Ende signalisiert. Antwort-Fragmente
/// gehen ueber `antwort_tx` zurueck; die Strategie sendet bei Erfolg als
/// letzte Nachricht genau ein Abschluss-Signal. Ein `Err` bedeutet, dass
/// noch kein Fragment ausgegeben wurde und der Aufrufer die terminale
/// Fehler-Antwort erzeugt.
#[async_trait]
pub trait TurnStrategie: Send + Sync {
    async fn turn_verarbeiten(
        &self,
        kontext: TurnKontext,
        audio_rx: mpsc::Receiver<Vec<u8>>,
        antwort_tx: mpsc::Sender<AntwortNachricht>,
    ) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Verteiler
// ---------------------------------------------------------------------------

/// Waehlt die Turn-Strategie anhand der Plan-Stufe
pub struct KontrollerVerteiler {
    premium: Arc<dyn TurnStrategie>,
    lite: Arc<dyn TurnStrategie>,
    test: Arc<dyn TurnStrategie>,
}

impl KontrollerVerteiler {
    pub fn neu(
        premium: Arc<dyn TurnStrategie>,
        lite: Arc<dyn TurnStrategie>,
        test: Arc<dyn TurnStrategie>,
    ) -> Self {
        Self { premium, lite, test }
    }

    /// Loest die Plan-Stufe zur zustaendigen Strategie auf
    ///
    /// Free und Unbestimmt fallen auf die Lite-Strategie zurueck, damit
    /// ein Client mit fehlendem oder unbekanntem Plan-Feld bedient wird
    /// statt abgewiesen zu werden.
    pub fn auswaehlen(&self, stufe: PlanStufe) -> Arc<dyn TurnStrategie> {
        match stufe {
            PlanStufe::Premium => Arc::clone(&self.premium),
            PlanStufe::Test => Arc::clone(&self.test),
            PlanStufe::Lite | PlanStufe::Free | PlanStufe::Unbestimmt => Arc::clone(&self.lite),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Markierung;

    #[async_trait]
    impl TurnStrategie for Markierung {
        async fn turn_verarbeiten(
            &self,
            _kontext: TurnKontext,
            _audio_rx: mpsc::Receiver<Vec<u8>>,
            _antwort_tx: mpsc::Sender<AntwortNachricht>,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn verteiler() -> (
        KontrollerVerteiler,
        Arc<dyn TurnStrategie>,
        Arc<dyn TurnStrategie>,
        Arc<dyn TurnStrategie>,
    ) {
        let premium: Arc<dyn TurnStrategie> = Arc::new(Markierung);
        let lite: Arc<dyn TurnStrategie> = Arc::new(Markierung);
        let test: Arc<dyn TurnStrategie> = Arc::new(Markierung);
        let v = KontrollerVerteiler::neu(
            Arc::clone(&premium),
            Arc::clone(&lite),
            Arc::clone(&test),
        );
        (v, premium, lite, test)
    }

    #[test]
    fn premium_stufe_waehlt_premium() {
        let (v, premium, _, _) = verteiler();
        assert!(Arc::ptr_eq(&v.auswaehlen(PlanStufe::Premium), &premium));
    }

    #[test]
    fn test_stufe_waehlt_testlauf() {
        let (v, _, _, test) = verteiler();
        assert!(Arc::ptr_eq(&v.auswaehlen(PlanStufe::Test), &test));
    }

    #[test]
    fn restliche_stufen_fallen_auf_lite_zurueck() {
        let (v, _, lite, _) = verteiler();
        for stufe in [PlanStufe::Lite, PlanStufe::Free, PlanStufe::Unbestimmt] {
            assert!(Arc::ptr_eq(&v.auswaehlen(stufe), &lite));
        }
    }
}
