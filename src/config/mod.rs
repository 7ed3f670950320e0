// Configuration management module
// Loads config.toml from the config directory and drives the interactive setup

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, DEFAULT_BOILERPLATE, ExtractionFailurePolicy, GenerationConfig,
    LibraryConfig, OllamaConfig, RetrievalConfig, SplitConfig,
};

/// Resolve the configuration directory, preferring an explicit override
#[inline]
pub fn resolve_config_dir(
    override_dir: Option<std::path::PathBuf>,
) -> Result<std::path::PathBuf, ConfigError> {
    override_dir.map_or_else(Config::default_dir, Ok)
}
