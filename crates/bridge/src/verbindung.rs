//! Stream-Bruecke – State Machine einer Client-Verbindung
//!
//! Transportunabhaengig: Nachrichten kommen ueber einen mpsc-Kanal herein,
//! Antworten gehen ueber einen mpsc-Kanal hinaus. Der Transport-Adapter
//! (siehe [`crate::tcp`]) pumpt zwischen Kanaelen und Socket.
//!
//! ## State Machine
//! ```text
//! WartetAufSetup -> Streamen -> TurnGrenze -> (Streamen | Geschlossen)
//! ```
//! `Geschlossen` ist aus jedem Zustand erreichbar (Transportfehler oder
//! Verbindungsende). Der Duplex-Kanal bleibt ueber mehrere Turns offen.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use plauderei_core::{
    AntwortId, PersonaVerzeichnis, PlaudereiError, Result, SessionKey,
};
use plauderei_dialog::{GespraechsVerlauf, KontrollerVerteiler, TurnKontext, TurnStrategie};
use plauderei_protocol::chat::{AntwortNachricht, ClientNachricht};
use plauderei_session::SessionRegistry;

/// Kapazitaet des Audio-Kanals eines Turns (Backpressure zum Transport)
const TURN_PUFFER: usize = 64;

// ---------------------------------------------------------------------------
// Zustand
// ---------------------------------------------------------------------------

/// Zustand der Stream-Bruecke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrueckenZustand {
    /// Verbunden, wartet auf die Setup-Nachricht
    WartetAufSetup,
    /// Setup abgeschlossen, nimmt Audio-Chunks entgegen
    Streamen,
    /// Eingabe-Ende empfangen, Turn wird verarbeitet
    TurnGrenze,
    /// Verbindung beendet
    Geschlossen,
}

/// Laufender Turn: Audio-Zulauf plus Strategie-Task
struct AktiverTurn {
    audio_tx: mpsc::Sender<Vec<u8>>,
    task: JoinHandle<Result<()>>,
}

// ---------------------------------------------------------------------------
// StreamBruecke
// ---------------------------------------------------------------------------

/// Client-seitige State Machine
///
/// Eine Instanz wird pro Prozess aufgebaut und von allen Verbindungen
/// geteilt; der veraenderliche Zustand lebt in [`StreamBruecke::fahren`].
pub struct StreamBruecke {
    registry: Arc<SessionRegistry>,
    verteiler: Arc<KontrollerVerteiler>,
    personas: Arc<PersonaVerzeichnis>,
    verlauf: Arc<GespraechsVerlauf>,
}

impl StreamBruecke {
    pub fn neu(
        registry: Arc<SessionRegistry>,
        verteiler: Arc<KontrollerVerteiler>,
        personas: Arc<PersonaVerzeichnis>,
        verlauf: Arc<GespraechsVerlauf>,
    ) -> Self {
        Self {
            registry,
            verteiler,
            personas,
            verlauf,
        }
    }

    /// Faehrt die State Machine fuer eine Verbindung bis zum Ende
    ///
    /// Gibt `Err` nur bei einer Protokollverletzung zurueck (erste
    /// Nachricht ist kein Setup); der Client hat dann bereits eine
    /// terminale Fehler-Antwort erhalten. Turn-Fehler werden als
    /// terminale Fehler-Antworten gemeldet, die Bruecke bleibt fuer
    /// den naechsten Turn am Leben.
    pub async fn fahren(
        &self,
        mut eingang: mpsc::Receiver<ClientNachricht>,
        ausgang: mpsc::Sender<AntwortNachricht>,
    ) -> Result<()> {
        let setup = match eingang.recv().await {
            None => {
                tracing::debug!("Verbindung ohne Setup beendet");
                return Ok(());
            }
            Some(ClientNachricht::Setup(setup)) => setup,
            Some(andere) => {
                let fehler = PlaudereiError::Protokoll(format!(
                    "erste Nachricht muss das Setup sein, war {}",
                    andere.art()
                ));
                let nachricht = AntwortNachricht::fehlschlag(
                    AntwortId::neu(),
                    "",
                    fehler.to_string(),
                );
                let _ = ausgang.send(nachricht).await;
                return Err(fehler);
            }
        };

        let key = SessionKey::neu(setup.benutzer_id.clone(), setup.persona.clone());
        let kontext = TurnKontext {
            key: key.clone(),
            sprache: setup.sprache.clone(),
            persona: self.personas.aufloesen(&setup.persona).clone(),
        };
        let strategie = self.verteiler.auswaehlen(setup.stufe);

        tracing::info!(
            zustand = ?BrueckenZustand::Streamen,
            session = %key,
            name = setup.benutzer_name.as_deref().unwrap_or("-"),
            stufe = ?setup.stufe,
            sprache = %setup.sprache,
            "Bruecke aufgebaut"
        );

        let mut turn: Option<AktiverTurn> = None;

        while let Some(nachricht) = eingang.recv().await {
            match nachricht {
                ClientNachricht::Audio { daten } => {
                    if turn.is_none() {
                        turn = Some(self.turn_starten(&strategie, &kontext, &ausgang));
                    }
                    let aktiver = match turn.as_ref() {
                        Some(a) => a,
                        None => continue,
                    };
                    if aktiver.audio_tx.send(daten).await.is_err() {
                        // Strategie-Task vorzeitig beendet; Ergebnis einholen
                        if let Some(aktiver) = turn.take() {
                            self.turn_abschliessen(aktiver, &kontext, &ausgang).await;
                        }
                    }
                }
                ClientNachricht::EingabeEnde => {
                    tracing::debug!(session = %key, zustand = ?BrueckenZustand::TurnGrenze, "Turn-Grenze");
                    // Eingabe-Ende ohne Audio startet einen leeren Turn;
                    // jede Strategie ergibt dann ihren Leer-Abschluss
                    let aktiver = match turn.take() {
                        Some(a) => a,
                        None => self.turn_starten(&strategie, &kontext, &ausgang),
                    };
                    self.turn_abschliessen(aktiver, &kontext, &ausgang).await;
                }
                ClientNachricht::Text { inhalt } => {
                    // Reserviert, derzeit ohne Wirkung
                    tracing::trace!(
                        session = %key,
                        zeichen = inhalt.len(),
                        "Text-Nachricht ignoriert"
                    );
                }
                ClientNachricht::Setup(_) => {
                    tracing::warn!(session = %key, "Zweites Setup ignoriert");
                }
            }
        }

        // Transportende: laufenden Turn abbrechen, Session freigeben
        if let Some(aktiver) = turn.take() {
            aktiver.task.abort();
            let _ = aktiver.task.await;
        }
        self.registry.entfernen(&key).await;
        self.verlauf.beenden(&key);

        tracing::info!(session = %key, zustand = ?BrueckenZustand::Geschlossen, "Bruecke beendet");
        Ok(())
    }

    fn turn_starten(
        &self,
        strategie: &Arc<dyn TurnStrategie>,
        kontext: &TurnKontext,
        ausgang: &mpsc::Sender<AntwortNachricht>,
    ) -> AktiverTurn {
        let (audio_tx, audio_rx) = mpsc::channel(TURN_PUFFER);
        let strategie = Arc::clone(strategie);
        let kontext = kontext.clone();
        let ausgang = ausgang.clone();
        let task = tokio::spawn(async move {
            strategie.turn_verarbeiten(kontext, audio_rx, ausgang).await
        });
        AktiverTurn { audio_tx, task }
    }

    /// Wartet auf das Turn-Ende und meldet Fehler als terminale Antwort
    async fn turn_abschliessen(
        &self,
        aktiver: AktiverTurn,
        kontext: &TurnKontext,
        ausgang: &mpsc::Sender<AntwortNachricht>,
    ) {
        drop(aktiver.audio_tx);
        let fehler = match aktiver.task.await {
            Ok(Ok(())) => return,
            Ok(Err(fehler)) => {
                tracing::warn!(
                    session = %kontext.key,
                    fehler = %fehler,
                    wiederholbar = fehler.ist_wiederholbar(),
                    "Turn fehlgeschlagen"
                );
                fehler.to_string()
            }
            Err(join_fehler) => {
                tracing::error!(
                    session = %kontext.key,
                    fehler = %join_fehler,
                    "Turn-Task abgestuerzt"
                );
                "Interner Fehler bei der Turn-Verarbeitung".to_string()
            }
        };
        let nachricht =
            AntwortNachricht::fehlschlag(AntwortId::neu(), &kontext.sprache, fehler);
        let _ = ausgang.send(nachricht).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use plauderei_core::{BenutzerId, PersonaId, PlanStufe};
    use plauderei_protocol::chat::SetupNachricht;
    use plauderei_speech::{DuplexBackend, DuplexEmpfaenger, DuplexKonfig, DuplexSender};

    /// Backend das nie erreicht werden darf
    struct NieBackend;

    #[async_trait]
    impl DuplexBackend for NieBackend {
        async fn oeffnen(
            &self,
            _konfig: &DuplexKonfig,
        ) -> Result<(Box<dyn DuplexSender>, Box<dyn DuplexEmpfaenger>)> {
            Err(PlaudereiError::Verbindung("kein Upstream im Test".to_string()))
        }
    }

    /// Summiert die Eingabe-Bytes und antwortet mit einem Fragment
    struct ZaehlStrategie;

    #[async_trait]
    impl TurnStrategie for ZaehlStrategie {
        async fn turn_verarbeiten(
            &self,
            kontext: TurnKontext,
            mut audio_rx: mpsc::Receiver<Vec<u8>>,
            antwort_tx: mpsc::Sender<AntwortNachricht>,
        ) -> Result<()> {
            let mut bytes = 0usize;
            while let Some(chunk) = audio_rx.recv().await {
                bytes += chunk.len();
            }
            let id = AntwortId::neu();
            let _ = antwort_tx
                .send(AntwortNachricht::fragment(id, &kontext.sprache, vec![bytes as u8]))
                .await;
            let _ = antwort_tx
                .send(AntwortNachricht::abschluss(id, &kontext.sprache))
                .await;
            Ok(())
        }
    }

    /// Schlaegt immer fehl, ohne Ausgabe
    struct FehlerStrategie;

    #[async_trait]
    impl TurnStrategie for FehlerStrategie {
        async fn turn_verarbeiten(
            &self,
            _kontext: TurnKontext,
            mut audio_rx: mpsc::Receiver<Vec<u8>>,
            _antwort_tx: mpsc::Sender<AntwortNachricht>,
        ) -> Result<()> {
            while audio_rx.recv().await.is_some() {}
            Err(PlaudereiError::Verbindung("Upstream weg".to_string()))
        }
    }

    fn bruecke(strategie: Arc<dyn TurnStrategie>) -> Arc<StreamBruecke> {
        let personas = Arc::new(PersonaVerzeichnis::standard());
        let registry = Arc::new(SessionRegistry::neu(
            Arc::new(NieBackend),
            Arc::clone(&personas),
        ));
        let verteiler = Arc::new(KontrollerVerteiler::neu(
            Arc::clone(&strategie),
            Arc::clone(&strategie),
            strategie,
        ));
        Arc::new(StreamBruecke::neu(
            registry,
            verteiler,
            personas,
            Arc::new(GespraechsVerlauf::neu()),
        ))
    }

    fn setup_nachricht() -> ClientNachricht {
        ClientNachricht::Setup(SetupNachricht {
            benutzer_id: BenutzerId::neu("anna"),
            benutzer_name: Some("Anna".to_string()),
            persona: PersonaId::neu("friend"),
            sprache: "de".to_string(),
            stufe: PlanStufe::Lite,
        })
    }

    fn starten(
        bruecke: Arc<StreamBruecke>,
    ) -> (
        mpsc::Sender<ClientNachricht>,
        mpsc::Receiver<AntwortNachricht>,
        JoinHandle<Result<()>>,
    ) {
        let (ein_tx, ein_rx) = mpsc::channel(16);
        let (aus_tx, aus_rx) = mpsc::channel(16);
        let task = tokio::spawn(async move { bruecke.fahren(ein_rx, aus_tx).await });
        (ein_tx, aus_rx, task)
    }

    #[tokio::test]
    async fn erste_nachricht_muss_das_setup_sein() {
        let (ein_tx, mut aus_rx, task) = starten(bruecke(Arc::new(ZaehlStrategie)));

        ein_tx
            .send(ClientNachricht::Audio { daten: vec![1] })
            .await
            .unwrap();

        let antwort = aus_rx.recv().await.unwrap();
        assert!(antwort.ist_final);
        assert!(antwort.fehler.is_some());
        assert!(matches!(
            task.await.unwrap(),
            Err(PlaudereiError::Protokoll(_))
        ));
    }

    #[tokio::test]
    async fn mehrere_turns_ueber_eine_verbindung() {
        let (ein_tx, mut aus_rx, task) = starten(bruecke(Arc::new(ZaehlStrategie)));
        ein_tx.send(setup_nachricht()).await.unwrap();

        for erwartet in [3u8, 5u8] {
            ein_tx
                .send(ClientNachricht::Audio { daten: vec![0; erwartet as usize] })
                .await
                .unwrap();
            ein_tx.send(ClientNachricht::EingabeEnde).await.unwrap();

            let fragment = aus_rx.recv().await.unwrap();
            assert_eq!(fragment.audio, vec![erwartet]);
            assert!(aus_rx.recv().await.unwrap().ist_final);
        }

        drop(ein_tx);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn turn_fehler_liefert_terminale_antwort_und_bruecke_lebt_weiter() {
        let (ein_tx, mut aus_rx, task) = starten(bruecke(Arc::new(FehlerStrategie)));
        ein_tx.send(setup_nachricht()).await.unwrap();

        for _ in 0..2 {
            ein_tx
                .send(ClientNachricht::Audio { daten: vec![1, 2] })
                .await
                .unwrap();
            ein_tx.send(ClientNachricht::EingabeEnde).await.unwrap();

            let antwort = aus_rx.recv().await.unwrap();
            assert!(antwort.ist_final);
            assert!(antwort.fehler.is_some());
        }

        drop(ein_tx);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn text_und_zweites_setup_bleiben_wirkungslos() {
        let (ein_tx, mut aus_rx, task) = starten(bruecke(Arc::new(ZaehlStrategie)));
        ein_tx.send(setup_nachricht()).await.unwrap();

        ein_tx
            .send(ClientNachricht::Text { inhalt: "hallo".to_string() })
            .await
            .unwrap();
        ein_tx.send(setup_nachricht()).await.unwrap();
        ein_tx
            .send(ClientNachricht::Audio { daten: vec![0; 4] })
            .await
            .unwrap();
        ein_tx.send(ClientNachricht::EingabeEnde).await.unwrap();

        let fragment = aus_rx.recv().await.unwrap();
        assert_eq!(fragment.audio, vec![4]);
        assert!(aus_rx.recv().await.unwrap().ist_final);

        drop(ein_tx);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn verbindungsende_ohne_setup_ist_sauber() {
        let (ein_tx, mut aus_rx, task) = starten(bruecke(Arc::new(ZaehlStrategie)));
        drop(ein_tx);

        assert!(task.await.unwrap().is_ok());
        assert!(aus_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn eingabe_ende_ohne_audio_liefert_leeren_abschluss() {
        let (ein_tx, mut aus_rx, task) = starten(bruecke(Arc::new(ZaehlStrategie)));
        ein_tx.send(setup_nachricht()).await.unwrap();
        ein_tx.send(ClientNachricht::EingabeEnde).await.unwrap();

        // ZaehlStrategie ergibt ein 0-Byte-Fragment plus Abschluss
        let fragment = aus_rx.recv().await.unwrap();
        assert_eq!(fragment.audio, vec![0]);
        assert!(aus_rx.recv().await.unwrap().ist_final);

        drop(ein_tx);
        assert!(task.await.unwrap().is_ok());
    }
}
