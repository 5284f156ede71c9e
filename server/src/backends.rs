//! Entwicklungs-Backends
//!
//! Der Kern spricht Erkennung, Synthese, Vervollstaendigung und Duplex
//! ausschliesslich ueber die Adapter-Traits; echte Upstream-Clients leben
//! ausserhalb dieses Repos. Diese Implementierungen degradieren den Server
//! zu einem lauffaehigen Entwicklungsmodus, in dem die gesamte Pipeline
//! (Bruecke, Registry, Strategien, Wire-Format) ohne Upstream-Zugang
//! end-to-end ausprobiert werden kann.

use async_trait::async_trait;
use tokio::sync::mpsc;

use plauderei_core::{PlaudereiError, Result};
use plauderei_protocol::chat::{AUSGANGS_ABTASTRATE, BYTES_PRO_SAMPLE};
use plauderei_speech::{
    DuplexBackend, DuplexEmpfaenger, DuplexEreignis, DuplexKonfig, DuplexSender,
    GespraechsKontext, GespraechsRolle, Spracherkenner, Sprachsynthese, Vervollstaendiger,
};

// ---------------------------------------------------------------------------
// Duplex-Echo (Premium-Pfad im Entwicklungsmodus)
// ---------------------------------------------------------------------------

/// Chunk-Groesse der Echo-Wiedergabe (100 ms Ausgangs-Audio)
const ECHO_CHUNK_BYTES: usize = AUSGANGS_ABTASTRATE as usize * BYTES_PRO_SAMPLE / 10;

/// Duplex-Backend das das Turn-Audio als Antwort zurueckspielt
///
/// Kein Upstream: der Sendepfad sammelt die Chunks, und bei der
/// Turn-Grenze gibt die Empfangshaelfte sie in Stuecken wieder aus,
/// gefolgt vom Turn-Abschluss.
pub struct EchoDuplexBackend;

struct EchoSender {
    ereignis_tx: mpsc::UnboundedSender<DuplexEreignis>,
    puffer: Vec<u8>,
}

struct EchoEmpfaenger {
    ereignis_rx: mpsc::UnboundedReceiver<DuplexEreignis>,
}

#[async_trait]
impl DuplexBackend for EchoDuplexBackend {
    async fn oeffnen(
        &self,
        konfig: &DuplexKonfig,
    ) -> Result<(Box<dyn DuplexSender>, Box<dyn DuplexEmpfaenger>)> {
        tracing::info!(
            stimme = %konfig.stimme,
            sprache = %konfig.sprache,
            "Echo-Duplex geoeffnet (Entwicklungsmodus, kein Upstream)"
        );
        let (ereignis_tx, ereignis_rx) = mpsc::unbounded_channel();
        Ok((
            Box::new(EchoSender {
                ereignis_tx,
                puffer: Vec::new(),
            }),
            Box::new(EchoEmpfaenger { ereignis_rx }),
        ))
    }
}

#[async_trait]
impl DuplexSender for EchoSender {
    async fn senden(&mut self, audio: &[u8], turn_ende: bool) -> Result<()> {
        self.puffer.extend_from_slice(audio);
        if turn_ende {
            let turn_audio = std::mem::take(&mut self.puffer);
            for chunk in turn_audio.chunks(ECHO_CHUNK_BYTES) {
                self.ereignis_tx
                    .send(DuplexEreignis::Audio(chunk.to_vec()))
                    .map_err(|_| PlaudereiError::Getrennt("Echo-Empfaenger weg".to_string()))?;
            }
            self.ereignis_tx
                .send(DuplexEreignis::TurnAbgeschlossen)
                .map_err(|_| PlaudereiError::Getrennt("Echo-Empfaenger weg".to_string()))?;
        }
        Ok(())
    }

    async fn schliessen(&mut self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl DuplexEmpfaenger for EchoEmpfaenger {
    async fn naechstes(&mut self) -> Result<Option<DuplexEreignis>> {
        Ok(self.ereignis_rx.recv().await)
    }
}

// ---------------------------------------------------------------------------
// Gepufferte Platzhalter (Lite-Pfad im Entwicklungsmodus)
// ---------------------------------------------------------------------------

/// Erkenner-Platzhalter: meldet nur den Umfang der Eingabe
pub struct PlatzhalterErkenner;

#[async_trait]
impl Spracherkenner for PlatzhalterErkenner {
    async fn erkennen(&self, audio: &[u8], sprache: &str) -> Result<String> {
        Ok(format!(
            "(Audioeingabe, {} Bytes, Sprache {})",
            audio.len(),
            sprache
        ))
    }
}

/// Vervollstaendiger-Platzhalter mit fester, satzweise segmentierbarer Antwort
pub struct PlatzhalterVervollstaendiger;

#[async_trait]
impl Vervollstaendiger for PlatzhalterVervollstaendiger {
    async fn abschliessen(&self, kontext: &GespraechsKontext) -> Result<String> {
        let benutzer_beitraege = kontext
            .eintraege
            .iter()
            .filter(|e| e.rolle == GespraechsRolle::Benutzer)
            .count();
        Ok(format!(
            "Ich habe dich gehoert. Das war deine Aeusserung Nummer {}. Erzaehl mir mehr!",
            benutzer_beitraege
        ))
    }
}

// ---------------------------------------------------------------------------
// Synthese-Platzhalter
// ---------------------------------------------------------------------------

/// Dauer pro Textzeichen in Millisekunden
const MS_PRO_ZEICHEN: usize = 40;

/// Maximale Dauer eines synthetisierten Satzes in Millisekunden
const MAX_SATZ_MS: usize = 2_000;

fn satz_dauer_samples(text: &str) -> usize {
    let ms = (text.chars().count() * MS_PRO_ZEICHEN).min(MAX_SATZ_MS);
    AUSGANGS_ABTASTRATE as usize * ms / 1_000
}

/// Primaer-Platzhalter: 440-Hz-Ton in Satzlaenge (PCM s16le, 24 kHz, mono)
pub struct TonSynthese;

#[async_trait]
impl Sprachsynthese for TonSynthese {
    async fn synthetisieren(&self, text: &str, _sprache: &str, _stimme: &str) -> Result<Vec<u8>> {
        let samples = satz_dauer_samples(text);
        let mut audio = Vec::with_capacity(samples * BYTES_PRO_SAMPLE);
        for i in 0..samples {
            let t = i as f32 / AUSGANGS_ABTASTRATE as f32;
            let wert = (t * 440.0 * std::f32::consts::TAU).sin();
            let sample = (wert * 0.2 * i16::MAX as f32) as i16;
            audio.extend_from_slice(&sample.to_le_bytes());
        }
        Ok(audio)
    }
}

/// Fallback-Platzhalter: Stille in Satzlaenge
pub struct StilleSynthese;

#[async_trait]
impl Sprachsynthese for StilleSynthese {
    async fn synthetisieren(&self, text: &str, _sprache: &str, _stimme: &str) -> Result<Vec<u8>> {
        Ok(vec![0u8; satz_dauer_samples(text) * BYTES_PRO_SAMPLE])
    }
}
