// Configuration management module
// TOML settings for the embedder, the completion endpoint and retrieval defaults

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{CompletionConfig, Config, ConfigError, OllamaConfig, RetrievalConfig};

/// Resolve the data directory, falling back to `~/.docusense`
#[inline]
pub fn resolve_data_dir(
    data_dir: Option<std::path::PathBuf>,
) -> Result<std::path::PathBuf, ConfigError> {
    data_dir.map_or_else(Config::default_dir, Ok)
}
