//! Premium-Strategie – Duplex-Relay zum Upstream-Endpunkt
//!
//! Der Sendepfad laeuft als Hintergrund-Task, waehrend die Hauptschleife
//! Antwort-Fragmente aus dem Relay zieht. Ein kurzes Poll-Intervall
//! verschraenkt beides, damit ein Fehler im Sende-Task die Fragment-Schleife
//! nicht haengen laesst. Nach Abschluss des Sendepfads gilt zusaetzlich
//! eine Turn-Frist, falls der Upstream nie eine Turn-Grenze meldet.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use plauderei_core::{AntwortId, PlaudereiError, Result};
use plauderei_protocol::chat::AntwortNachricht;
use plauderei_session::{FragmentErgebnis, SessionRegistry, SessionRelay};

use crate::strategie::{TurnKontext, TurnStrategie};

/// Standard-Poll-Intervall der Fragment-Schleife
pub const STANDARD_POLL_INTERVALL: Duration = Duration::from_millis(100);

/// Standard-Frist fuer die Turn-Grenze nach abgeschlossenem Sendepfad
pub const STANDARD_TURN_FRIST: Duration = Duration::from_secs(10);

pub struct PremiumStrategie {
    registry: Arc<SessionRegistry>,
    poll_intervall: Duration,
    turn_frist: Duration,
}

impl PremiumStrategie {
    pub fn neu(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            poll_intervall: STANDARD_POLL_INTERVALL,
            turn_frist: STANDARD_TURN_FRIST,
        }
    }

    /// Ueberschreibt Poll-Intervall und Turn-Frist (Konfiguration/Tests)
    pub fn mit_zeiten(mut self, poll_intervall: Duration, turn_frist: Duration) -> Self {
        self.poll_intervall = poll_intervall;
        self.turn_frist = turn_frist;
        self
    }

    fn sende_task_starten(
        relay: Arc<SessionRelay>,
        mut audio_rx: mpsc::Receiver<Vec<u8>>,
    ) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            while let Some(chunk) = audio_rx.recv().await {
                relay.audio_senden(&chunk, false).await?;
            }
            // Eingabe-Ende des Clients: Turn-Grenze upstream markieren
            relay.audio_senden(&[], true).await?;
            Ok(())
        })
    }
}

#[async_trait]
impl TurnStrategie for PremiumStrategie {
    async fn turn_verarbeiten(
        &self,
        kontext: TurnKontext,
        audio_rx: mpsc::Receiver<Vec<u8>>,
        antwort_tx: mpsc::Sender<AntwortNachricht>,
    ) -> Result<()> {
        let relay = self
            .registry
            .holen_oder_anlegen(&kontext.key, &kontext.sprache)
            .await?;

        let antwort_id = AntwortId::neu();
        let mut sende_task = Some(Self::sende_task_starten(Arc::clone(&relay), audio_rx));

        let mut ausgegeben = false;
        let mut relay_fehler: Option<PlaudereiError> = None;
        let mut sende_fertig_seit: Option<Instant> = None;

        loop {
            match relay.fragment_abwarten(self.poll_intervall).await {
                FragmentErgebnis::Fragment(audio) => {
                    ausgegeben = true;
                    let nachricht =
                        AntwortNachricht::fragment(antwort_id, &kontext.sprache, audio);
                    if antwort_tx.send(nachricht).await.is_err() {
                        // Konsument weg, Bruecke bereits geschlossen
                        break;
                    }
                }
                FragmentErgebnis::TurnEnde => break,
                FragmentErgebnis::Zeitlimit => {
                    if sende_task.as_ref().is_some_and(|t| t.is_finished()) {
                        // is_finished() garantiert dass der await sofort liefert
                        match sende_task.take() {
                            Some(task) => match task.await {
                                Ok(Ok(())) => sende_fertig_seit = Some(Instant::now()),
                                Ok(Err(e)) => {
                                    relay_fehler = Some(e);
                                    break;
                                }
                                Err(e) => {
                                    relay_fehler = Some(PlaudereiError::intern(format!(
                                        "Sende-Task abgebrochen: {e}"
                                    )));
                                    break;
                                }
                            },
                            None => break,
                        }
                    }
                    if let Some(seit) = sende_fertig_seit {
                        if seit.elapsed() >= self.turn_frist {
                            tracing::warn!(
                                session = %kontext.key,
                                "Turn-Frist abgelaufen, keine Turn-Grenze vom Upstream"
                            );
                            break;
                        }
                    }
                }
            }
        }

        if let Some(task) = sende_task.take() {
            task.abort();
            let _ = task.await;
        }

        if let Some(fehler) = relay_fehler {
            // Defektes Relay evakuieren, der naechste Turn verbindet neu
            self.registry.entfernen(&kontext.key).await;
            if !ausgegeben {
                return Err(fehler);
            }
            tracing::warn!(
                session = %kontext.key,
                fehler = %fehler,
                "Relay-Fehler nach Teilausgabe, Session entfernt"
            );
        } else if relay.empfang_beendet().await {
            // Die Empfangsschleife terminiert nur bei Lesefehler oder
            // Stream-Ende; auch dann neu verbinden statt leer weiterlaufen
            self.registry.entfernen(&kontext.key).await;
        }

        let _ = antwort_tx
            .send(AntwortNachricht::abschluss(antwort_id, &kontext.sprache))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plauderei_core::{BenutzerId, PersonaId, PersonaVerzeichnis, SessionKey};
    use plauderei_speech::{
        DuplexBackend, DuplexEmpfaenger, DuplexEreignis, DuplexKonfig, DuplexSender,
    };

    /// Duplex-Attrappe: sammelt Chunks und echot sie bei der Turn-Grenze
    /// als ein Fragment zurueck, gefolgt vom Turn-Abschluss
    struct EchoBackend;

    struct EchoSender {
        tx: mpsc::UnboundedSender<DuplexEreignis>,
        puffer: Vec<u8>,
    }

    struct EchoEmpfaenger {
        rx: mpsc::UnboundedReceiver<DuplexEreignis>,
    }

    #[async_trait]
    impl DuplexBackend for EchoBackend {
        async fn oeffnen(
            &self,
            _konfig: &DuplexKonfig,
        ) -> Result<(Box<dyn DuplexSender>, Box<dyn DuplexEmpfaenger>)> {
            let (tx, rx) = mpsc::unbounded_channel();
            Ok((
                Box::new(EchoSender { tx, puffer: Vec::new() }),
                Box::new(EchoEmpfaenger { rx }),
            ))
        }
    }

    #[async_trait]
    impl DuplexSender for EchoSender {
        async fn senden(&mut self, audio: &[u8], turn_ende: bool) -> Result<()> {
            self.puffer.extend_from_slice(audio);
            if turn_ende {
                if !self.puffer.is_empty() {
                    let _ = self.tx.send(DuplexEreignis::Audio(std::mem::take(&mut self.puffer)));
                }
                let _ = self.tx.send(DuplexEreignis::TurnAbgeschlossen);
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
            Ok(self.rx.recv().await)
        }
    }

    /// Duplex-Attrappe die Eingaben annimmt aber nie etwas zuruecksendet
    struct StummesBackend;

    struct StummerSender {
        // Haelt den Kanal offen, damit der Empfaenger wartet statt endet
        _tx: mpsc::UnboundedSender<DuplexEreignis>,
    }

    #[async_trait]
    impl DuplexBackend for StummesBackend {
        async fn oeffnen(
            &self,
            _konfig: &DuplexKonfig,
        ) -> Result<(Box<dyn DuplexSender>, Box<dyn DuplexEmpfaenger>)> {
            let (tx, rx) = mpsc::unbounded_channel();
            Ok((
                Box::new(StummerSender { _tx: tx }),
                Box::new(EchoEmpfaenger { rx }),
            ))
        }
    }

    #[async_trait]
    impl DuplexSender for StummerSender {
        async fn senden(&mut self, _audio: &[u8], _turn_ende: bool) -> Result<()> {
            Ok(())
        }

        async fn schliessen(&mut self) -> Result<()> {
            Ok(())
        }
    }

    /// Backend dessen Verbindungsaufbau immer scheitert
    struct KaputtesBackend;

    #[async_trait]
    impl DuplexBackend for KaputtesBackend {
        async fn oeffnen(
            &self,
            _konfig: &DuplexKonfig,
        ) -> Result<(Box<dyn DuplexSender>, Box<dyn DuplexEmpfaenger>)> {
            Err(PlaudereiError::Verbindung("Upstream nicht erreichbar".to_string()))
        }
    }

    fn turn_kontext() -> TurnKontext {
        let personas = PersonaVerzeichnis::standard();
        let persona = personas.aufloesen(&PersonaId::neu("friend")).clone();
        TurnKontext {
            key: SessionKey::neu(BenutzerId::neu("anna"), PersonaId::neu("friend")),
            sprache: "de".to_string(),
            persona,
        }
    }

    fn strategie(backend: Arc<dyn plauderei_speech::DuplexBackend>) -> PremiumStrategie {
        let registry = Arc::new(SessionRegistry::neu(
            backend,
            Arc::new(PersonaVerzeichnis::standard()),
        ));
        PremiumStrategie::neu(registry)
            .mit_zeiten(Duration::from_millis(10), Duration::from_millis(500))
    }

    #[tokio::test]
    async fn turn_liefert_fragmente_und_abschluss() {
        let strategie = strategie(Arc::new(EchoBackend));
        let (audio_tx, audio_rx) = mpsc::channel(8);
        let (antwort_tx, mut antwort_rx) = mpsc::channel(8);

        audio_tx.send(vec![1, 2, 3]).await.unwrap();
        audio_tx.send(vec![4, 5]).await.unwrap();
        drop(audio_tx);

        strategie
            .turn_verarbeiten(turn_kontext(), audio_rx, antwort_tx)
            .await
            .unwrap();

        let fragment = antwort_rx.recv().await.unwrap();
        assert!(!fragment.ist_final);
        assert_eq!(fragment.audio, vec![1, 2, 3, 4, 5]);

        let abschluss = antwort_rx.recv().await.unwrap();
        assert!(abschluss.ist_final);
        assert!(abschluss.fehler.is_none());
        assert_eq!(abschluss.antwort_id, fragment.antwort_id);
        assert!(antwort_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn leerer_turn_liefert_nur_den_abschluss() {
        let strategie = strategie(Arc::new(EchoBackend));
        let (audio_tx, audio_rx) = mpsc::channel(8);
        let (antwort_tx, mut antwort_rx) = mpsc::channel(8);
        drop(audio_tx);

        strategie
            .turn_verarbeiten(turn_kontext(), audio_rx, antwort_tx)
            .await
            .unwrap();

        let abschluss = antwort_rx.recv().await.unwrap();
        assert!(abschluss.ist_final);
        assert!(antwort_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn fehlgeschlagener_verbindungsaufbau_propagiert() {
        let strategie = strategie(Arc::new(KaputtesBackend));
        let (audio_tx, audio_rx) = mpsc::channel(8);
        let (antwort_tx, mut antwort_rx) = mpsc::channel(8);
        drop(audio_tx);

        let ergebnis = strategie
            .turn_verarbeiten(turn_kontext(), audio_rx, antwort_tx)
            .await;
        assert!(ergebnis.is_err());
        assert!(antwort_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn zweiter_turn_nutzt_dieselbe_verbindung() {
        let registry = Arc::new(SessionRegistry::neu(
            Arc::new(EchoBackend),
            Arc::new(PersonaVerzeichnis::standard()),
        ));
        let strategie = PremiumStrategie::neu(Arc::clone(&registry))
            .mit_zeiten(Duration::from_millis(10), Duration::from_millis(500));

        for _ in 0..2 {
            let (audio_tx, audio_rx) = mpsc::channel(8);
            let (antwort_tx, mut antwort_rx) = mpsc::channel(8);
            audio_tx.send(vec![7]).await.unwrap();
            drop(audio_tx);
            strategie
                .turn_verarbeiten(turn_kontext(), audio_rx, antwort_tx)
                .await
                .unwrap();
            while antwort_rx.recv().await.is_some() {}
        }

        assert_eq!(registry.anzahl(), 1);
    }

    #[tokio::test]
    async fn stummer_upstream_beendet_den_turn_nach_der_frist() {
        let strategie = PremiumStrategie::neu(Arc::new(SessionRegistry::neu(
            Arc::new(StummesBackend),
            Arc::new(PersonaVerzeichnis::standard()),
        )))
        .mit_zeiten(Duration::from_millis(10), Duration::from_millis(50));

        let (audio_tx, audio_rx) = mpsc::channel(8);
        let (antwort_tx, mut antwort_rx) = mpsc::channel(8);
        audio_tx.send(vec![9, 9, 9]).await.unwrap();
        drop(audio_tx);

        // Der Upstream meldet weder Fragment noch Turn-Grenze; die
        // Turn-Frist muss den Turn trotzdem sauber beenden
        let ergebnis = tokio::time::timeout(
            Duration::from_secs(2),
            strategie.turn_verarbeiten(turn_kontext(), audio_rx, antwort_tx),
        )
        .await;
        assert!(ergebnis.is_ok(), "Turn haengt trotz Turn-Frist");
        ergebnis.unwrap().unwrap();

        let abschluss = antwort_rx.recv().await.unwrap();
        assert!(abschluss.ist_final);
        assert!(abschluss.fehler.is_none());
        assert!(abschluss.audio.is_empty());
        assert!(antwort_rx.recv().await.is_none());
    }
}
