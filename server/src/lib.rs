//! plauderei-server – Bibliotheks-Root
//!
//! Verdrahtet Konfiguration, Backends, Session-Registry, Strategie-Dispatch
//! und den TCP-Bruecken-Server. Oeffentlich fuer Integrationstests.

pub mod backends;
pub mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;

use plauderei_bridge::{BrueckenServer, StreamBruecke};
use plauderei_core::PersonaVerzeichnis;
use plauderei_dialog::{
    GespraechsVerlauf, KontrollerVerteiler, LiteStrategie, PremiumStrategie, TestStrategie,
    TurnStrategie,
};
use plauderei_session::SessionRegistry;
use plauderei_speech::{DuplexBackend, SyntheseKette};

use backends::{
    EchoDuplexBackend, PlatzhalterErkenner, PlatzhalterVervollstaendiger, StilleSynthese,
    TonSynthese,
};
use config::ServerKonfig;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub konfig: ServerKonfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(konfig: ServerKonfig) -> Self {
        Self { konfig }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Persona-Verzeichnis aufbauen (eingebaut + Konfiguration)
    /// 2. Backends, Registry und Strategien verdrahten
    /// 3. TCP-Bruecken-Server starten
    /// 4. Auf Ctrl-C warten und den Listener herunterfahren
    pub async fn starten(self) -> Result<()> {
        tracing::info!(
            server_name = %self.konfig.server.name,
            tcp = %self.konfig.tcp_bind_adresse(),
            personas = self.konfig.personas.len(),
            "Server startet"
        );

        let personas = Arc::new(PersonaVerzeichnis::standard_mit(
            self.konfig.personas.clone(),
        ));

        // Entwicklungs-Backends; echte Upstream-Clients docken ueber
        // dieselben Traits an
        let duplex: Arc<dyn DuplexBackend> = Arc::new(EchoDuplexBackend);
        let registry = Arc::new(SessionRegistry::neu(duplex, Arc::clone(&personas)));
        let verlauf = Arc::new(GespraechsVerlauf::neu());
        let synthese = SyntheseKette::neu(Arc::new(TonSynthese), Arc::new(StilleSynthese));

        let premium: Arc<dyn TurnStrategie> = Arc::new(
            PremiumStrategie::neu(Arc::clone(&registry)).mit_zeiten(
                Duration::from_millis(self.konfig.upstream.poll_intervall_ms),
                Duration::from_secs(self.konfig.upstream.turn_frist_sek),
            ),
        );
        let lite: Arc<dyn TurnStrategie> = Arc::new(LiteStrategie::neu(
            Arc::new(PlatzhalterErkenner),
            Arc::new(PlatzhalterVervollstaendiger),
            synthese,
            Arc::clone(&verlauf),
        ));
        let test: Arc<dyn TurnStrategie> = Arc::new(self.test_strategie()?);
        let verteiler = Arc::new(KontrollerVerteiler::neu(premium, lite, test));

        let bruecke = Arc::new(StreamBruecke::neu(registry, verteiler, personas, verlauf));
        let bind_addr: SocketAddr = self
            .konfig
            .tcp_bind_adresse()
            .parse()
            .with_context(|| format!("Ungueltige Bind-Adresse '{}'", self.konfig.tcp_bind_adresse()))?;
        let server = BrueckenServer::neu(bruecke, bind_addr, self.konfig.max_frame_bytes());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let server_task = tokio::spawn(server.starten(shutdown_rx));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        shutdown_tx.send(true)?;
        server_task.await??;
        Ok(())
    }

    /// Baut die Test-Strategie aus der konfigurierten Referenz-Datei
    /// oder der eingebauten Stille
    fn test_strategie(&self) -> Result<TestStrategie> {
        let pause = Duration::from_millis(self.konfig.audio.test_pause_ms);
        let strategie = match &self.konfig.audio.test_referenz_pfad {
            Some(pfad) => {
                let referenz = std::fs::read(pfad)
                    .with_context(|| format!("Referenz-Audio '{pfad}' nicht lesbar"))?;
                tracing::info!(pfad = %pfad, bytes = referenz.len(), "Referenz-Audio geladen");
                TestStrategie::neu(referenz)
            }
            None => TestStrategie::mit_eingebauter_stille(),
        };
        Ok(strategie.mit_pause(pause))
    }
}
