pub mod error;
pub mod fetcher;
pub mod generator;
pub mod geo;
pub mod interfaces;
pub mod models;
pub mod parser;
pub mod settings;
pub mod utils;

// Re-export the main types for easier access
pub use error::{ConfigError, FetchError, GenerateError, RenderError};
pub use models::{Node, Origin, ProtocolHint, RawRecord, SourceKind, TemplateConfig};
pub use settings::Settings;
