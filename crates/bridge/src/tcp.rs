//! TCP-Listener – bindet den Socket und pumpt Frames in die Bruecke
//!
//! Der `BrueckenServer` akzeptiert Verbindungen in einer Loop und startet
//! pro Verbindung einen tokio-Task. Der Task uebersetzt zwischen dem
//! Frame-Codec auf dem Socket und den mpsc-Kanaelen der
//! [`StreamBruecke`]; die State Machine selbst kennt keinen Transport.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::Framed;

use plauderei_protocol::wire::ServerCodec;

use crate::verbindung::StreamBruecke;

/// Kapazitaet der Kanaele zwischen Socket-Pumpe und Bruecke
const KANAL_PUFFER: usize = 64;

/// TCP-Server fuer Client-Verbindungen
pub struct BrueckenServer {
    bruecke: Arc<StreamBruecke>,
    bind_addr: SocketAddr,
    max_frame_bytes: usize,
}

impl BrueckenServer {
    pub fn neu(bruecke: Arc<StreamBruecke>, bind_addr: SocketAddr, max_frame_bytes: usize) -> Self {
        Self {
            bruecke,
            bind_addr,
            max_frame_bytes,
        }
    }

    /// Startet den Listener und akzeptiert Verbindungen
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt. Laufende
    /// Verbindungen beenden sich selbst sobald ihr Socket schliesst.
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.mit_listener(listener, shutdown_rx).await
    }

    /// Accept-Loop auf einem bereits gebundenen Listener
    ///
    /// Getrennt von [`BrueckenServer::starten`] damit Tests einen
    /// ephemeren Port binden und die Adresse vorher abfragen koennen.
    pub async fn mit_listener(
        self,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let lokale_addr = listener.local_addr()?;
        tracing::info!(adresse = %lokale_addr, "Bruecken-Server gestartet");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            tracing::debug!(peer = %peer_addr, "Verbindung akzeptiert");
                            let bruecke = Arc::clone(&self.bruecke);
                            let max_frame_bytes = self.max_frame_bytes;
                            tokio::spawn(async move {
                                verbindung_pumpen(bruecke, stream, peer_addr, max_frame_bytes).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Bruecken-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("Bruecken-Server gestoppt");
        Ok(())
    }

    /// Gibt die konfigurierte Bind-Adresse zurueck
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

/// Pumpt Frames zwischen Socket und Bruecken-Kanaelen
///
/// Endet wenn der Client schliesst, ein Frame-Fehler auftritt oder die
/// Bruecke ihren Ausgangskanal schliesst. Nach dem Eingabe-Ende werden
/// verbleibende Antworten noch ausgeliefert.
async fn verbindung_pumpen(
    bruecke: Arc<StreamBruecke>,
    stream: TcpStream,
    peer_addr: SocketAddr,
    max_frame_bytes: usize,
) {
    let mut framed = Framed::new(stream, ServerCodec::with_max_size(max_frame_bytes));

    let (ein_tx, ein_rx) = mpsc::channel(KANAL_PUFFER);
    let (aus_tx, mut aus_rx) = mpsc::channel(KANAL_PUFFER);

    let bruecken_task = tokio::spawn(async move { bruecke.fahren(ein_rx, aus_tx).await });

    let mut ein_tx = Some(ein_tx);
    loop {
        tokio::select! {
            frame = framed.next(), if ein_tx.is_some() => {
                match frame {
                    Some(Ok(nachricht)) => {
                        let Some(tx) = ein_tx.as_ref() else { break };
                        if tx.send(nachricht).await.is_err() {
                            // Bruecke beendet (Protokollverletzung)
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!(peer = %peer_addr, fehler = %e, "Frame-Fehler");
                        break;
                    }
                    None => {
                        // Client hat geschlossen; Eingang schliessen und
                        // restliche Antworten noch ausliefern
                        ein_tx = None;
                    }
                }
            }

            antwort = aus_rx.recv() => {
                match antwort {
                    Some(antwort) => {
                        if let Err(e) = framed.send(antwort).await {
                            tracing::warn!(peer = %peer_addr, fehler = %e, "Sende-Fehler");
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    drop(ein_tx);
    drop(aus_rx);
    match bruecken_task.await {
        Ok(Ok(())) => {}
        Ok(Err(fehler)) => {
            tracing::warn!(peer = %peer_addr, fehler = %fehler, "Bruecke mit Fehler beendet");
        }
        Err(join_fehler) => {
            tracing::error!(peer = %peer_addr, fehler = %join_fehler, "Bruecken-Task abgestuerzt");
        }
    }
    tracing::debug!(peer = %peer_addr, "Verbindung beendet");
}
