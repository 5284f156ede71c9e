//! Test-Strategie – Wiedergabe eines Referenz-Audios ohne Upstream
//!
//! Fuer End-to-End-Tests der Client-Pipeline: das Eingabe-Audio wird
//! verworfen und stattdessen ein festes Referenz-Audio in Chunks mit
//! kleinen Pausen gestreamt, damit der Client echtes Streaming-Verhalten
//! sieht.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use plauderei_core::{AntwortId, Result};
use plauderei_protocol::chat::{AntwortNachricht, AUSGANGS_ABTASTRATE, BYTES_PRO_SAMPLE};

use crate::strategie::{TurnKontext, TurnStrategie};

/// Chunk-Groesse der Wiedergabe: 100 ms Ausgangs-Audio
pub const STANDARD_CHUNK_BYTES: usize = AUSGANGS_ABTASTRATE as usize * BYTES_PRO_SAMPLE / 10;

/// Pause zwischen zwei Wiedergabe-Chunks
pub const STANDARD_CHUNK_PAUSE: Duration = Duration::from_millis(30);

pub struct TestStrategie {
    referenz: Arc<Vec<u8>>,
    chunk_bytes: usize,
    pause: Duration,
}

impl TestStrategie {
    pub fn neu(referenz: Vec<u8>) -> Self {
        Self {
            referenz: Arc::new(referenz),
            chunk_bytes: STANDARD_CHUNK_BYTES,
            pause: STANDARD_CHUNK_PAUSE,
        }
    }

    /// Eine Sekunde Stille als eingebautes Referenz-Audio
    ///
    /// Wird benutzt wenn keine Referenz-Datei konfiguriert ist.
    pub fn mit_eingebauter_stille() -> Self {
        Self::neu(vec![0u8; AUSGANGS_ABTASTRATE as usize * BYTES_PRO_SAMPLE])
    }

    /// Ueberschreibt Chunk-Groesse und Pause (Tests)
    pub fn mit_taktung(mut self, chunk_bytes: usize, pause: Duration) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self.pause = pause;
        self
    }

    /// Ueberschreibt nur die Pause zwischen zwei Chunks
    pub fn mit_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }
}

#[async_trait]
impl TurnStrategie for TestStrategie {
    async fn turn_verarbeiten(
        &self,
        kontext: TurnKontext,
        mut audio_rx: mpsc::Receiver<Vec<u8>>,
        antwort_tx: mpsc::Sender<AntwortNachricht>,
    ) -> Result<()> {
        // Eingabe vollstaendig abnehmen, der Inhalt ist egal
        while audio_rx.recv().await.is_some() {}

        let antwort_id = AntwortId::neu();
        for chunk in self.referenz.chunks(self.chunk_bytes) {
            let nachricht =
                AntwortNachricht::fragment(antwort_id, &kontext.sprache, chunk.to_vec());
            if antwort_tx.send(nachricht).await.is_err() {
                return Ok(());
            }
            tokio::time::sleep(self.pause).await;
        }

        let _ = antwort_tx
            .send(AntwortNachricht::abschluss(antwort_id, &kontext.sprache))
            .await;
        Ok(())
    }
}
