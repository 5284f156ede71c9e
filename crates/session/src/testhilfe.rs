//! Test-Attrappe fuer das Duplex-Backend
//!
//! Jede geoeffnete Verbindung liefert dem Test eine [`TestKontrolle`],
//! ueber die eingehende Ereignisse und Lesefehler injiziert und die
//! gesendeten Chunks beobachtet werden koennen.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use plauderei_core::{PlaudereiError, Result};
use plauderei_speech::backend::{
    DuplexBackend, DuplexEmpfaenger, DuplexEreignis, DuplexKonfig, DuplexSender,
};

type EreignisErgebnis = Result<Option<DuplexEreignis>>;

/// Steuerungs-Griff einer geoeffneten Test-Verbindung
pub struct TestKontrolle {
    ereignis_tx: mpsc::UnboundedSender<EreignisErgebnis>,
    /// Vom Relay gesendete Chunks: (Bytes, turn_ende)
    pub gesendet: mpsc::UnboundedReceiver<(Vec<u8>, bool)>,
}

impl TestKontrolle {
    /// Injiziert ein eingehendes Ereignis
    pub fn ereignis(&self, ereignis: DuplexEreignis) {
        let _ = self.ereignis_tx.send(Ok(Some(ereignis)));
    }

    /// Injiziert einen Lesefehler
    pub fn fehler(&self, grund: &str) {
        let _ = self.ereignis_tx.send(Err(PlaudereiError::Getrennt(grund.into())));
    }

    /// Beendet den Upstream-Stream sauber
    pub fn stream_ende(&self) {
        let _ = self.ereignis_tx.send(Ok(None));
    }
}

/// Duplex-Backend-Attrappe: reicht pro `oeffnen()` eine TestKontrolle heraus
pub struct TestBackend {
    kontrolle_tx: mpsc::UnboundedSender<TestKontrolle>,
    oeffnen_schlaegt_fehl: AtomicBool,
}

impl TestBackend {
    /// Erstellt Backend plus Empfaenger fuer die Kontroll-Griffe
    pub fn neu() -> (Arc<Self>, mpsc::UnboundedReceiver<TestKontrolle>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                kontrolle_tx: tx,
                oeffnen_schlaegt_fehl: AtomicBool::new(false),
            }),
            rx,
        )
    }

    /// Backend dessen `oeffnen()` immer fehlschlaegt
    pub fn mit_oeffnungs_fehler() -> (Arc<Self>, mpsc::UnboundedReceiver<TestKontrolle>) {
        let (backend, rx) = Self::neu();
        backend.oeffnen_schlaegt_fehl.store(true, Ordering::SeqCst);
        (backend, rx)
    }
}

#[async_trait]
impl DuplexBackend for TestBackend {
    async fn oeffnen(
        &self,
        _konfig: &DuplexKonfig,
    ) -> Result<(Box<dyn DuplexSender>, Box<dyn DuplexEmpfaenger>)> {
        if self.oeffnen_schlaegt_fehl.load(Ordering::SeqCst) {
            return Err(PlaudereiError::Verbindung(
                "Test-Backend verweigert den Aufbau".into(),
            ));
        }

        let (ereignis_tx, ereignis_rx) = mpsc::unbounded_channel();
        let (sende_tx, sende_rx) = mpsc::unbounded_channel();

        let _ = self.kontrolle_tx.send(TestKontrolle {
            ereignis_tx,
            gesendet: sende_rx,
        });

        Ok((
            Box::new(TestSender { tx: sende_tx }),
            Box::new(TestEmpfaenger { rx: ereignis_rx }),
        ))
    }
}

struct TestSender {
    tx: mpsc::UnboundedSender<(Vec<u8>, bool)>,
}

#[async_trait]
impl DuplexSender for TestSender {
    async fn senden(&mut self, audio: &[u8], turn_ende: bool) -> Result<()> {
        self.tx
            .send((audio.to_vec(), turn_ende))
            .map_err(|_| PlaudereiError::Getrennt("Test-Verbindung geschlossen".into()))
    }

    async fn schliessen(&mut self) -> Result<()> {
        Ok(())
    }
}

struct TestEmpfaenger {
    rx: mpsc::UnboundedReceiver<EreignisErgebnis>,
}

#[async_trait]
impl DuplexEmpfaenger for TestEmpfaenger {
    async fn naechstes(&mut self) -> Result<Option<DuplexEreignis>> {
        match self.rx.recv().await {
            Some(ergebnis) => ergebnis,
            None => Ok(None),
        }
    }
}
