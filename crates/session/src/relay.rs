//! Session-Relay – eine lebende Duplex-Verbindung pro SessionKey
//!
//! Uebersetzt zwischen dem Ereignis-Modell der Upstream-Verbindung und
//! einem konsumenten-freundlichen Pull-Interface.
//!
//! ## Aufbau
//! - `verbinden()` ist idempotent; nur ein physischer Verbindungsaufbau
//!   unter dem Zustands-Schloss
//! - Eine Hintergrund-Empfangsschleife liest Upstream-Ereignisse und legt
//!   sie auf die Fragment-Queue (unbounded, Lesen zeitlich begrenzt)
//! - Der Sendepfad laeuft unter demselben Schloss und serialisiert damit
//!   alle Schreibzugriffe auf die Verbindung
//! - Bei jedem Lesefehler legt die Schleife genau einmal den Sentinel ab
//!   und terminiert; sie startet sich nie selbst neu
//!
//! Ein fehlgeschlagenes Relay wird vom Besitzer (Registry) verworfen und
//! beim naechsten Zugriff neu erzeugt – nie in unbekanntem Zustand
//! weiterverwendet.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use plauderei_core::{PlaudereiError, Result};
use plauderei_speech::backend::{
    DuplexBackend, DuplexEmpfaenger, DuplexEreignis, DuplexKonfig, DuplexSender,
};

// ---------------------------------------------------------------------------
// Queue-Eintraege
// ---------------------------------------------------------------------------

/// Eintrag der internen Fragment-Queue (Sentinel getrennt von Nutzdaten)
#[derive(Debug)]
enum QueueEintrag {
    Fragment(Vec<u8>),
    /// Sentinel: Turn-Grenze oder Stream-Ende
    TurnEnde,
}

/// Ergebnis eines zeitlich begrenzten Queue-Lesens
#[derive(Debug, PartialEq, Eq)]
pub enum FragmentErgebnis {
    /// Ein Audio-Fragment in Erzeugungsreihenfolge
    Fragment(Vec<u8>),
    /// Turn-Grenze erreicht (Sentinel gelesen oder Relay abgebaut)
    TurnEnde,
    /// Innerhalb der Frist kam kein Eintrag an
    Zeitlimit,
}

// ---------------------------------------------------------------------------
// SessionRelay
// ---------------------------------------------------------------------------

/// Verbindungszustand: Sendehaelfte plus laufende Empfangsschleife
struct Verbindung {
    sender: Box<dyn DuplexSender>,
    empfangs_task: JoinHandle<()>,
}

/// Besitzt eine Duplex-Verbindung zum Upstream-KI-Endpunkt
///
/// Die Fragment-Queue ist single-producer (Empfangsschleife) /
/// single-consumer (die Strategie die `fragment_abwarten` liest).
pub struct SessionRelay {
    backend: Arc<dyn DuplexBackend>,
    konfig: DuplexKonfig,
    /// Zustands- und Sende-Schloss: schuetzt Verbindungsaufbau und -abbau
    /// sowie jeden Schreibzugriff auf die Sendehaelfte
    verbindung: Mutex<Option<Verbindung>>,
    /// Konsumenten-Seite der Fragment-Queue
    fragment_rx: Mutex<Option<mpsc::UnboundedReceiver<QueueEintrag>>>,
}

impl SessionRelay {
    /// Erstellt ein Relay; die Verbindung wird erst bei `verbinden()` aufgebaut
    pub fn neu(backend: Arc<dyn DuplexBackend>, konfig: DuplexKonfig) -> Self {
        Self {
            backend,
            konfig,
            verbindung: Mutex::new(None),
            fragment_rx: Mutex::new(None),
        }
    }

    /// Baut die Upstream-Verbindung auf (idempotent)
    ///
    /// Konkurrierende Aufrufer sehen dieselbe Verbindung; es findet nur ein
    /// physischer Verbindungsaufbau statt. Schlaegt der Aufbau fehl, bleibt
    /// der Zustand leer und der Fehler wird propagiert – das Relay ist dann
    /// unbrauchbar und muss vom Besitzer ersetzt werden.
    pub async fn verbinden(&self) -> Result<()> {
        let mut verbindung = self.verbindung.lock().await;
        if verbindung.is_some() {
            return Ok(());
        }

        let (sender, empfaenger) = self.backend.oeffnen(&self.konfig).await?;

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let empfangs_task = tokio::spawn(empfangsschleife(empfaenger, queue_tx));

        *self.fragment_rx.lock().await = Some(queue_rx);
        *verbindung = Some(Verbindung {
            sender,
            empfangs_task,
        });

        tracing::debug!(sprache = %self.konfig.sprache, "Upstream-Verbindung aufgebaut");
        Ok(())
    }

    /// Sendet einen Audio-Chunk unter dem Sende-Schloss
    ///
    /// `turn_ende` markiert ob dieser Chunk den aktuellen Turn abschliesst
    /// (Legacy-Modus) oder mitten im Turn liegt (echtes Streaming).
    /// Darf erst nach erfolgreichem `verbinden()` aufgerufen werden.
    pub async fn audio_senden(&self, audio: &[u8], turn_ende: bool) -> Result<()> {
        let mut verbindung = self.verbindung.lock().await;
        let v = verbindung
            .as_mut()
            .ok_or_else(|| PlaudereiError::Getrennt("Relay ist nicht verbunden".into()))?;
        v.sender.senden(audio, turn_ende).await
    }

    /// Wartet hoechstens `frist` auf den naechsten Queue-Eintrag
    ///
    /// Das Zeitlimit ist ein weicher Fehlschlag: der Aufrufer beendet seine
    /// Fragment-Sequenz, es wird keine Exception propagiert. Ein bereits
    /// abgebautes Relay meldet `TurnEnde`, damit ein mit `schliessen()`
    /// rennender Konsument sauber terminiert.
    pub async fn fragment_abwarten(&self, frist: Duration) -> FragmentErgebnis {
        let mut rx_guard = self.fragment_rx.lock().await;
        let Some(rx) = rx_guard.as_mut() else {
            return FragmentErgebnis::TurnEnde;
        };

        match tokio::time::timeout(frist, rx.recv()).await {
            Ok(Some(QueueEintrag::Fragment(bytes))) => FragmentErgebnis::Fragment(bytes),
            Ok(Some(QueueEintrag::TurnEnde)) => FragmentErgebnis::TurnEnde,
            // Queue geschlossen: die Schleife hat vor dem Ende den Sentinel
            // abgelegt, dieser wurde bereits konsumiert
            Ok(None) => FragmentErgebnis::TurnEnde,
            Err(_) => FragmentErgebnis::Zeitlimit,
        }
    }

    /// Gibt true zurueck wenn eine Verbindung aufgebaut ist
    pub async fn ist_verbunden(&self) -> bool {
        self.verbindung.lock().await.is_some()
    }

    /// Gibt true zurueck wenn die Empfangsschleife terminiert ist
    ///
    /// Die Schleife terminiert nur bei Lesefehler oder Stream-Ende, nie bei
    /// einer normalen Turn-Grenze. Ein Besitzer der nach einem Turn `true`
    /// sieht, sollte das Relay evakuieren, damit der naechste Turn sauber
    /// neu verbindet.
    pub async fn empfang_beendet(&self) -> bool {
        match self.verbindung.lock().await.as_ref() {
            Some(v) => v.empfangs_task.is_finished(),
            None => true,
        }
    }

    /// Baut die Verbindung ab (idempotent)
    ///
    /// Bricht die Empfangsschleife ab, wartet auf ihr Ende (Abbruch gilt
    /// als normaler Ausgang) und gibt erst danach die Verbindung frei.
    /// Weitere Aufrufe sind No-ops.
    pub async fn schliessen(&self) {
        let mut verbindung = self.verbindung.lock().await;
        if let Some(mut v) = verbindung.take() {
            v.empfangs_task.abort();
            if let Err(e) = (&mut v.empfangs_task).await {
                if !e.is_cancelled() {
                    tracing::warn!(fehler = %e, "Empfangsschleife endete unsauber");
                }
            }
            if let Err(e) = v.sender.schliessen().await {
                tracing::debug!(fehler = %e, "Fehler beim Schliessen der Sendehaelfte");
            }
            tracing::debug!("Relay geschlossen");
        }
        self.fragment_rx.lock().await.take();
    }
}

// ---------------------------------------------------------------------------
// Empfangsschleife
// ---------------------------------------------------------------------------

/// Hintergrund-Schleife: Upstream-Ereignisse -> Fragment-Queue
///
/// Legt bei jedem Lesefehler und bei sauberem Stream-Ende genau einmal den
/// Sentinel ab (damit wartende Konsumenten nicht blockieren) und terminiert.
async fn empfangsschleife(
    mut empfaenger: Box<dyn DuplexEmpfaenger>,
    queue_tx: mpsc::UnboundedSender<QueueEintrag>,
) {
    loop {
        match empfaenger.naechstes().await {
            Ok(Some(DuplexEreignis::Audio(bytes))) => {
                if queue_tx.send(QueueEintrag::Fragment(bytes)).is_err() {
                    // Konsument weg – Relay wurde geschlossen
                    break;
                }
            }
            Ok(Some(DuplexEreignis::TurnAbgeschlossen)) => {
                tracing::debug!("Turn-Abschluss vom Upstream empfangen");
                if queue_tx.send(QueueEintrag::TurnEnde).is_err() {
                    break;
                }
            }
            Ok(None) => {
                tracing::debug!("Upstream-Stream beendet");
                let _ = queue_tx.send(QueueEintrag::TurnEnde);
                break;
            }
            Err(e) => {
                tracing::warn!(fehler = %e, "Lesefehler in der Empfangsschleife");
                let _ = queue_tx.send(QueueEintrag::TurnEnde);
                break;
            }
        }
    }
}
