#![warn(missing_docs)]
//! mediagen - unified AI media generation (image + video).
//!
//! Dispatches prompts to one of several generative-media APIs (Google,
//! OpenAI, xAI, fal.ai, or a multi-vendor gateway), normalizes the
//! heterogeneous responses into a common result shape, and writes the
//! generated files to disk.
//!
//! # Quick start
//!
//! ```no_run
//! use mediagen::{GenerateOptions, ProviderSelector, Router};
//!
//! #[tokio::main]
//! async fn main() -> mediagen::Result<()> {
//!     let router = Router::new();
//!     let options = GenerateOptions::new()
//!         .with_provider(ProviderSelector::Google)
//!         .with_count(2);
//!     for item in router.generate("A golden retriever puppy", &options).await? {
//!         println!("{}", item.file_path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Videos
//!
//! ```no_run
//! use mediagen::{GenerateOptions, MediaKind, Router};
//!
//! #[tokio::main]
//! async fn main() -> mediagen::Result<()> {
//!     let options = GenerateOptions::new()
//!         .with_kind(MediaKind::Video)
//!         .with_duration(6)
//!         .with_start_frame("frame.png");
//!     let results = Router::new().generate("A cat playing with a ball", &options).await?;
//!     println!("{}", results[0].file_path.display());
//!     Ok(())
//! }
//! ```
//!
//! Provider selection defaults to [`ProviderSelector::Auto`], which picks
//! the first vendor whose API key environment variable is set, in a fixed
//! priority order (google, openai, xai, fal, gateway).

pub mod capabilities;
pub mod credentials;
mod error;
pub mod normalize;
pub mod provider;
pub mod providers;
pub mod registry;
mod request;
mod router;
pub mod validate;

pub use capabilities::{DurationRange, ProviderCapabilities};
pub use credentials::Credentials;
pub use error::{CapabilityViolation, MediaGenError, Result};
pub use normalize::{normalize, NormalizedRequest};
pub use provider::{CallShape, Provider, ProviderId, RawMedia};
pub use registry::Registry;
pub use request::{GenerateOptions, MediaKind, OutputFormat, ProviderSelector};
pub use router::{PersistedMedia, Router};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{MediaGenError, Result};
    pub use crate::request::{GenerateOptions, MediaKind, OutputFormat, ProviderSelector};
    pub use crate::router::{PersistedMedia, Router};
}
