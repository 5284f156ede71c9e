//! Session-Registry – einzige Quelle der Wahrheit fuer SessionKey -> Relay
//!
//! Erzwingt hoechstens ein lebendes Relay pro SessionKey, auch unter
//! konkurrierenden `holen_oder_anlegen`-Aufrufen: die Anlage laeuft unter
//! einem Schloss pro Schluessel statt unter einem globalen Lock, damit
//! unabhaengige Sessions sich nicht serialisieren.
//!
//! Der Zustand ist rein In-Memory und geht beim Prozess-Neustart verloren;
//! der Wiederaufbau beim naechsten Zugriff ist beabsichtigt, kein Fehler.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use plauderei_core::{PersonaVerzeichnis, Result, SessionKey};
use plauderei_speech::backend::{DuplexBackend, DuplexKonfig};

use crate::relay::SessionRelay;

/// Registry aller lebenden Session-Relays
pub struct SessionRegistry {
    backend: Arc<dyn DuplexBackend>,
    personas: Arc<PersonaVerzeichnis>,
    relays: DashMap<SessionKey, Arc<SessionRelay>>,
    /// Schloss pro Schluessel – verhindert doppelte Anlage unter Konkurrenz
    anlege_schloesser: DashMap<SessionKey, Arc<Mutex<()>>>,
}

impl SessionRegistry {
    pub fn neu(backend: Arc<dyn DuplexBackend>, personas: Arc<PersonaVerzeichnis>) -> Self {
        Self {
            backend,
            personas,
            relays: DashMap::new(),
            anlege_schloesser: DashMap::new(),
        }
    }

    /// Gibt das Relay fuer `key` zurueck; legt es bei Bedarf an und verbindet es
    ///
    /// Die Persona des Schluessels liefert System-Anweisung und Stimme fuer
    /// die Verbindungs-Konfiguration (unbekannte Personas fallen auf die
    /// Fallback-Persona zurueck). Schlaegt der Verbindungsaufbau fehl, wird
    /// nichts eingetragen und der Fehler propagiert.
    pub async fn holen_oder_anlegen(
        &self,
        key: &SessionKey,
        sprache: &str,
    ) -> Result<Arc<SessionRelay>> {
        // Schneller Pfad ohne Anlege-Schloss
        if let Some(relay) = self.relays.get(key) {
            return Ok(Arc::clone(&relay));
        }

        // Schloss-Arc herausklonen bevor gewartet wird, damit der
        // DashMap-Shard nicht ueber den await gehalten wird
        let schloss = Arc::clone(
            &self
                .anlege_schloesser
                .entry(key.clone())
                .or_default(),
        );
        let _anlage = schloss.lock().await;

        // Unter dem Schloss erneut pruefen – ein anderer Aufrufer kann
        // schneller gewesen sein
        if let Some(relay) = self.relays.get(key) {
            return Ok(Arc::clone(&relay));
        }

        let persona = self.personas.aufloesen(&key.persona);
        let konfig = DuplexKonfig {
            system_anweisung: persona.system_anweisung.clone(),
            stimme: persona.stimme_fuer(sprache).to_string(),
            sprache: sprache.to_string(),
        };

        let relay = Arc::new(SessionRelay::neu(Arc::clone(&self.backend), konfig));
        relay.verbinden().await?;

        self.relays.insert(key.clone(), Arc::clone(&relay));
        tracing::info!(session = %key, sprache = sprache, "Neues Session-Relay angelegt");
        Ok(relay)
    }

    /// Schliesst das Relay und entfernt den Eintrag (falls vorhanden)
    ///
    /// Wird bei Relay-Fehlern und beim expliziten Gespraechsende gerufen.
    pub async fn entfernen(&self, key: &SessionKey) {
        if let Some((_, relay)) = self.relays.remove(key) {
            relay.schliessen().await;
            tracing::info!(session = %key, "Session-Relay entfernt");
        }
        self.anlege_schloesser.remove(key);
    }

    /// Anzahl der lebenden Relays
    pub fn anzahl(&self) -> usize {
        self.relays.len()
    }
}
