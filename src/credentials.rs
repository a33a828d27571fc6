//! API key resolution.
//!
//! Keys are read from the process environment once per top-level call and
//! threaded explicitly into every adapter, so adapters stay free of hidden
//! global state and availability reflects credential changes made between
//! calls in the same process.

use crate::provider::ProviderId;

/// Accepted environment variable names per vendor, first match wins.
pub(crate) fn env_vars_for(id: ProviderId) -> &'static [&'static str] {
    match id {
        ProviderId::Google => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        ProviderId::OpenAi => &["OPENAI_API_KEY"],
        ProviderId::Xai => &["XAI_API_KEY", "GROK_API_KEY"],
        ProviderId::Fal => &["FAL_KEY", "FAL_API_KEY"],
        ProviderId::Gateway => &["AI_GATEWAY_API_KEY", "GATEWAY_API_KEY"],
    }
}

/// Resolved API keys for every vendor.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    google: Option<String>,
    openai: Option<String>,
    xai: Option<String>,
    fal: Option<String>,
    gateway: Option<String>,
}

impl Credentials {
    /// Reads keys from the process environment.
    pub fn from_env() -> Self {
        let read = |id| {
            env_vars_for(id)
                .iter()
                .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        };
        Self {
            google: read(ProviderId::Google),
            openai: read(ProviderId::OpenAi),
            xai: read(ProviderId::Xai),
            fal: read(ProviderId::Fal),
            gateway: read(ProviderId::Gateway),
        }
    }

    /// Sets the key for one vendor; primarily for library callers and tests.
    pub fn with_key(mut self, id: ProviderId, key: impl Into<String>) -> Self {
        let slot = match id {
            ProviderId::Google => &mut self.google,
            ProviderId::OpenAi => &mut self.openai,
            ProviderId::Xai => &mut self.xai,
            ProviderId::Fal => &mut self.fal,
            ProviderId::Gateway => &mut self.gateway,
        };
        *slot = Some(key.into());
        self
    }

    /// Returns the key for one vendor, if any.
    pub fn key_for(&self, id: ProviderId) -> Option<&str> {
        match id {
            ProviderId::Google => self.google.as_deref(),
            ProviderId::OpenAi => self.openai.as_deref(),
            ProviderId::Xai => self.xai.as_deref(),
            ProviderId::Fal => self.fal.as_deref(),
            ProviderId::Gateway => self.gateway.as_deref(),
        }
    }

    /// Returns true if a key is present for the vendor.
    pub fn has_key(&self, id: ProviderId) -> bool {
        self.key_for(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_credentials_have_no_keys() {
        let creds = Credentials::default();
        assert!(!creds.has_key(ProviderId::Google));
        assert!(!creds.has_key(ProviderId::Gateway));
    }

    #[test]
    fn test_with_key_round_trip() {
        let creds = Credentials::default()
            .with_key(ProviderId::Xai, "xai-test")
            .with_key(ProviderId::Fal, "fal-test");
        assert_eq!(creds.key_for(ProviderId::Xai), Some("xai-test"));
        assert_eq!(creds.key_for(ProviderId::Fal), Some("fal-test"));
        assert!(!creds.has_key(ProviderId::OpenAi));
    }

    #[test]
    fn test_every_vendor_declares_env_vars() {
        for id in ProviderId::ALL {
            assert!(!env_vars_for(id).is_empty());
        }
    }
}
