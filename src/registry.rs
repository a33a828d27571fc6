//! Provider registration and selection.

use crate::credentials::{env_vars_for, Credentials};
use crate::error::{MediaGenError, Result};
use crate::provider::{Provider, ProviderId};
use crate::providers::{FalProvider, GatewayProvider, GoogleProvider, OpenAiProvider, XaiProvider};
use crate::request::ProviderSelector;
use std::sync::Arc;

/// The set of providers one [`crate::Router`] dispatches to.
///
/// Availability is a pure function of [`Credentials`], re-evaluated on every
/// selection, so changing keys between calls takes effect without restarting.
pub struct Registry {
    providers: Vec<Arc<dyn Provider>>,
}

impl Registry {
    /// Registers all built-in vendor providers.
    pub fn with_default_providers() -> Self {
        Self {
            providers: vec![
                Arc::new(GoogleProvider::new()),
                Arc::new(OpenAiProvider::new()),
                Arc::new(XaiProvider::new()),
                Arc::new(FalProvider::new()),
                Arc::new(GatewayProvider::new()),
            ],
        }
    }

    /// Builds a registry from an explicit provider set; used by library
    /// callers and tests substituting stub providers.
    pub fn from_providers(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { providers }
    }

    /// Returns the registered providers.
    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    /// Looks up a provider by id, ignoring availability.
    pub fn get(&self, id: ProviderId) -> Option<Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.id() == id).cloned()
    }

    /// Selects a provider for a call.
    ///
    /// Explicit selectors fail with [`MediaGenError::UnknownProvider`] or
    /// [`MediaGenError::ProviderUnavailable`]; auto-selection walks
    /// [`ProviderId::ALL`] in priority order regardless of registration
    /// order and fails with [`MediaGenError::NoProviderAvailable`].
    pub fn select(
        &self,
        selector: ProviderSelector,
        credentials: &Credentials,
    ) -> Result<Arc<dyn Provider>> {
        match selector_id(selector) {
            Some(id) => {
                let provider = self
                    .get(id)
                    .ok_or_else(|| MediaGenError::UnknownProvider(id.to_string()))?;
                if !credentials.has_key(id) {
                    return Err(MediaGenError::ProviderUnavailable {
                        provider: id.to_string(),
                        env_vars: env_vars_for(id).join(", "),
                    });
                }
                Ok(provider)
            }
            None => ProviderId::ALL
                .iter()
                .filter_map(|id| self.get(*id))
                .find(|p| credentials.has_key(p.id()))
                .ok_or(MediaGenError::NoProviderAvailable),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_default_providers()
    }
}

/// Maps a selector to a concrete id; `None` means auto.
fn selector_id(selector: ProviderSelector) -> Option<ProviderId> {
    match selector {
        ProviderSelector::Auto => None,
        ProviderSelector::Google => Some(ProviderId::Google),
        ProviderSelector::OpenAi => Some(ProviderId::OpenAi),
        ProviderSelector::Xai => Some(ProviderId::Xai),
        ProviderSelector::Fal => Some(ProviderId::Fal),
        ProviderSelector::Gateway => Some(ProviderId::Gateway),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(ids: &[ProviderId]) -> Credentials {
        ids.iter()
            .fold(Credentials::default(), |c, id| c.with_key(*id, "test-key"))
    }

    #[test]
    fn test_explicit_selection() {
        let registry = Registry::with_default_providers();
        let provider = registry
            .select(ProviderSelector::Fal, &creds(&[ProviderId::Fal]))
            .unwrap();
        assert_eq!(provider.id(), ProviderId::Fal);
    }

    #[test]
    fn test_explicit_selection_without_key() {
        let registry = Registry::with_default_providers();
        let err = registry
            .select(ProviderSelector::Xai, &Credentials::default())
            .unwrap_err();
        match err {
            MediaGenError::ProviderUnavailable { provider, env_vars } => {
                assert_eq!(provider, "xai");
                assert!(env_vars.contains("XAI_API_KEY"));
            }
            other => panic!("expected ProviderUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_auto_selection_priority() {
        let registry = Registry::with_default_providers();

        let provider = registry
            .select(
                ProviderSelector::Auto,
                &creds(&[ProviderId::Fal, ProviderId::OpenAi]),
            )
            .unwrap();
        assert_eq!(provider.id(), ProviderId::OpenAi, "openai precedes fal");

        let provider = registry
            .select(ProviderSelector::Auto, &creds(&ProviderId::ALL))
            .unwrap();
        assert_eq!(provider.id(), ProviderId::Google, "google comes first");
    }

    #[test]
    fn test_auto_selection_ignores_registration_order() {
        // Register in reverse priority order; auto-selection must still walk
        // the fixed priority list.
        let registry = Registry::from_providers(vec![
            Arc::new(crate::providers::GatewayProvider::new()),
            Arc::new(crate::providers::XaiProvider::new()),
            Arc::new(crate::providers::GoogleProvider::new()),
        ]);
        let provider = registry
            .select(
                ProviderSelector::Auto,
                &creds(&[ProviderId::Xai, ProviderId::Gateway, ProviderId::Google]),
            )
            .unwrap();
        assert_eq!(provider.id(), ProviderId::Google);
    }

    #[test]
    fn test_no_provider_available() {
        let registry = Registry::with_default_providers();
        let err = registry
            .select(ProviderSelector::Auto, &Credentials::default())
            .unwrap_err();
        assert!(matches!(err, MediaGenError::NoProviderAvailable));
    }

    #[test]
    fn test_unknown_provider() {
        let registry = Registry::from_providers(Vec::new());
        let err = registry
            .select(ProviderSelector::Google, &creds(&[ProviderId::Google]))
            .unwrap_err();
        assert!(matches!(err, MediaGenError::UnknownProvider(_)));
    }

    #[test]
    fn test_availability_not_cached() {
        let registry = Registry::with_default_providers();
        assert!(registry
            .select(ProviderSelector::Auto, &Credentials::default())
            .is_err());
        // Same registry, new credentials: selection must now succeed.
        assert!(registry
            .select(ProviderSelector::Auto, &creds(&[ProviderId::Fal]))
            .is_ok());
    }
}
