//! Plauderei Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Server.

use anyhow::Result;
use plauderei_observability::logging_initialisieren;
use plauderei_server::{config::ServerKonfig, Server};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let konfig_pfad =
        std::env::var("PLAUDEREI_CONFIG").unwrap_or_else(|_| "config.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let konfig = ServerKonfig::laden(&konfig_pfad)?;

    // Logging initialisieren
    logging_initialisieren(&konfig.logging.level, &konfig.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        konfig = %konfig_pfad,
        "Plauderei Server wird initialisiert"
    );

    // Server starten
    let server = Server::neu(konfig);
    server.starten().await?;

    Ok(())
}
