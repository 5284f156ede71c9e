//! Lite-Strategie – gepufferte Erkennen/Vervollstaendigen/Synthetisieren-Kette
//!
//! Ohne Duplex-Upstream: das gesamte Turn-Audio wird gepuffert, einmal
//! erkannt, mit dem Gespraechsverlauf zu einer Antwort vervollstaendigt
//! und satzweise synthetisiert. Fehlgeschlagene Saetze werden
//! uebersprungen, damit eine Teilantwort beim Client ankommt.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use plauderei_core::{AntwortId, Result};
use plauderei_protocol::chat::AntwortNachricht;
use plauderei_speech::{SatzSegmentierer, Spracherkenner, SyntheseKette, Vervollstaendiger};

use crate::strategie::{TurnKontext, TurnStrategie};
use crate::verlauf::GespraechsVerlauf;

pub struct LiteStrategie {
    erkenner: Arc<dyn Spracherkenner>,
    vervollstaendiger: Arc<dyn Vervollstaendiger>,
    synthese: SyntheseKette,
    verlauf: Arc<GespraechsVerlauf>,
}

impl LiteStrategie {
    pub fn neu(
        erkenner: Arc<dyn Spracherkenner>,
        vervollstaendiger: Arc<dyn Vervollstaendiger>,
        synthese: SyntheseKette,
        verlauf: Arc<GespraechsVerlauf>,
    ) -> Self {
        Self {
            erkenner,
            vervollstaendiger,
            synthese,
            verlauf,
        }
    }
}

#[async_trait]
impl TurnStrategie for LiteStrategie {
    async fn turn_verarbeiten(
        &self,
        kontext: TurnKontext,
        mut audio_rx: mpsc::Receiver<Vec<u8>>,
        antwort_tx: mpsc::Sender<AntwortNachricht>,
    ) -> Result<()> {
        let mut puffer = Vec::new();
        while let Some(chunk) = audio_rx.recv().await {
            puffer.extend_from_slice(&chunk);
        }

        let antwort_id = AntwortId::neu();
        if puffer.is_empty() {
            let _ = antwort_tx
                .send(AntwortNachricht::abschluss(antwort_id, &kontext.sprache))
                .await;
            return Ok(());
        }

        // Fehler vor der ersten Ausgabe propagieren; die Bruecke erzeugt
        // daraus die terminale Fehler-Antwort
        let erkannt = self.erkenner.erkennen(&puffer, &kontext.sprache).await?;
        tracing::debug!(
            session = %kontext.key,
            zeichen = erkannt.len(),
            "Eingabe erkannt"
        );
        self.verlauf.benutzer_eintrag(&kontext.key, &erkannt);

        let gespraech = self.verlauf.kontext(
            &kontext.key,
            &kontext.persona.system_anweisung,
            &kontext.sprache,
        );
        let antwort_text = self.vervollstaendiger.abschliessen(&gespraech).await?;
        self.verlauf.assistent_eintrag(&kontext.key, &antwort_text);

        let stimme = kontext.persona.stimme_fuer(&kontext.sprache).to_string();
        let mut segmentierer = SatzSegmentierer::neu();
        let mut saetze = segmentierer.einspeisen(&antwort_text);
        if let Some(rest) = segmentierer.abschliessen() {
            saetze.push(rest);
        }

        for satz in saetze {
            let Some(audio) = self
                .synthese
                .synthetisieren(&satz, &kontext.sprache, &stimme)
                .await
            else {
                continue;
            };
            let nachricht = AntwortNachricht::fragment(antwort_id, &kontext.sprache, audio);
            if antwort_tx.send(nachricht).await.is_err() {
                return Ok(());
            }
        }

        let _ = antwort_tx
            .send(AntwortNachricht::abschluss(antwort_id, &kontext.sprache))
            .await;
        Ok(())
    }
}
