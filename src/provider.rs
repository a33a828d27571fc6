//! Provider trait and adapter output types.

use crate::capabilities::ProviderCapabilities;
use crate::credentials::Credentials;
use crate::error::Result;
use crate::normalize::NormalizedRequest;
use crate::request::MediaKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identity of a registered provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Google (Gemini image, Veo video).
    Google,
    /// OpenAI (gpt-image, Sora).
    OpenAi,
    /// xAI (Grok Imagine).
    Xai,
    /// fal.ai queue API.
    Fal,
    /// Multi-vendor gateway.
    Gateway,
}

impl ProviderId {
    /// All provider ids in auto-selection priority order.
    pub const ALL: [ProviderId; 5] = [
        Self::Google,
        Self::OpenAi,
        Self::Xai,
        Self::Fal,
        Self::Gateway,
    ];

    /// Returns the id string used in CLI flags and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::OpenAi => "openai",
            Self::Xai => "xai",
            Self::Fal => "fal",
            Self::Gateway => "gateway",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request/response pattern an adapter uses for one media kind.
///
/// The branching between these is genuine protocol difference, not an
/// implementation detail: it determines batch semantics and failure
/// granularity (see the error policy on [`crate::MediaGenError`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallShape {
    /// One HTTP call returns the whole batch (URLs or inline bytes).
    /// Individual undecodable items are skipped; siblings survive.
    SyncBatch,
    /// Job creation plus bounded status polling; one terminal outcome.
    PollingJob,
    /// One full round-trip per item; the first failure aborts the batch.
    PerItemCall,
}

/// One media item produced by an adapter, before persistence.
#[derive(Debug, Clone)]
pub struct RawMedia {
    /// Media kind.
    pub kind: MediaKind,
    /// Provider that produced the item.
    pub provider: ProviderId,
    /// Vendor model id actually used.
    pub model: String,
    /// Ordinal position within the batch.
    pub index: usize,
    /// Source URL the bytes were downloaded from, if any.
    pub source_url: Option<String>,
    /// Raw media bytes.
    pub bytes: Vec<u8>,
    /// MIME type declared by the vendor, if any.
    pub mime_type: Option<String>,
}

/// A vendor integration.
///
/// Providers are stateless beyond their HTTP client; one instance serves the
/// whole process and every call receives its request and credentials
/// explicitly.
#[async_trait]
pub trait Provider: Send + Sync {
    /// This provider's identity.
    fn id(&self) -> ProviderId;

    /// Media kinds this provider can generate.
    fn kinds(&self) -> &'static [MediaKind];

    /// Declared capability limits.
    fn capabilities(&self) -> &ProviderCapabilities;

    /// The request/response pattern used for `kind`, if supported.
    fn shape(&self, kind: MediaKind) -> Option<CallShape>;

    /// Generates media for a pre-validated request.
    ///
    /// Returns items in batch order. Implementations may return fewer items
    /// than requested only under [`CallShape::SyncBatch`] item-skip semantics.
    async fn generate(
        &self,
        request: &NormalizedRequest,
        credentials: &Credentials,
    ) -> Result<Vec<RawMedia>>;
}

impl std::fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider").field("id", &self.id()).finish()
    }
}
