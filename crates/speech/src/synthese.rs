//! Synthese-Kette – Primaer-Backend mit Fallback
//!
//! Versucht zuerst das primaere Synthese-Backend; schlaegt es fehl, wird
//! derselbe Text an das (qualitativ schlechtere) Fallback-Backend gegeben.
//! Schlagen beide fehl, wird der Satz uebersprungen statt den ganzen Turn
//! abzubrechen – Teilantworten sind besser als Totalausfall.

use std::sync::Arc;

use crate::backend::Sprachsynthese;

/// Primaer/Fallback-Kette fuer Sprachsynthese
#[derive(Clone)]
pub struct SyntheseKette {
    primaer: Arc<dyn Sprachsynthese>,
    fallback: Arc<dyn Sprachsynthese>,
}

impl SyntheseKette {
    pub fn neu(primaer: Arc<dyn Sprachsynthese>, fallback: Arc<dyn Sprachsynthese>) -> Self {
        Self { primaer, fallback }
    }

    /// Synthetisiert einen Satz; `None` wenn beide Backends fehlschlagen
    ///
    /// Das Fallback wird nur bei Fehlern des Primaer-Backends versucht.
    pub async fn synthetisieren(
        &self,
        text: &str,
        sprache: &str,
        stimme: &str,
    ) -> Option<Vec<u8>> {
        match self.primaer.synthetisieren(text, sprache, stimme).await {
            Ok(audio) => return Some(audio),
            Err(e) => {
                tracing::warn!(
                    fehler = %e,
                    sprache = sprache,
                    "Primaere Synthese fehlgeschlagen, versuche Fallback"
                );
            }
        }

        match self.fallback.synthetisieren(text, sprache, stimme).await {
            Ok(audio) => Some(audio),
            Err(e) => {
                tracing::warn!(
                    fehler = %e,
                    sprache = sprache,
                    "Fallback-Synthese ebenfalls fehlgeschlagen – Satz wird uebersprungen"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Sprachsynthese;
    use async_trait::async_trait;
    use plauderei_core::{PlaudereiError, Result};

    struct FesteSynthese(Vec<u8>);

    #[async_trait]
    impl Sprachsynthese for FesteSynthese {
        async fn synthetisieren(&self, _: &str, _: &str, _: &str) -> Result<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    struct KaputteSynthese;

    #[async_trait]
    impl Sprachsynthese for KaputteSynthese {
        async fn synthetisieren(&self, _: &str, _: &str, _: &str) -> Result<Vec<u8>> {
            Err(PlaudereiError::Synthese("Backend nicht erreichbar".into()))
        }
    }

    #[tokio::test]
    async fn primaer_wird_bevorzugt() {
        let kette = SyntheseKette::neu(
            Arc::new(FesteSynthese(vec![1, 1])),
            Arc::new(FesteSynthese(vec![2, 2])),
        );
        let audio = kette.synthetisieren("Hallo.", "en", "Puck").await;
        assert_eq!(audio, Some(vec![1, 1]));
    }

    #[tokio::test]
    async fn fallback_bei_primaer_fehler() {
        let kette = SyntheseKette::neu(
            Arc::new(KaputteSynthese),
            Arc::new(FesteSynthese(vec![2, 2])),
        );
        let audio = kette.synthetisieren("Hallo.", "en", "Puck").await;
        assert_eq!(audio, Some(vec![2, 2]));
    }

    #[tokio::test]
    async fn beide_kaputt_gibt_none() {
        let kette = SyntheseKette::neu(Arc::new(KaputteSynthese), Arc::new(KaputteSynthese));
        let audio = kette.synthetisieren("Hallo.", "en", "Puck").await;
        assert_eq!(audio, None);
    }
}
