//! Shared configuration loader for the vmark markdown pipeline.
//!
//! `defaults/vmark.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`VmarkConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;
use vmark_markdown::{HardBreakStyle, PipelineConfig, PipelineOptions};

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../defaults/vmark.default.toml");

/// Name of the optional per-project configuration file.
pub const PROJECT_CONFIG_FILE: &str = "vmark.toml";

/// Top-level configuration consumed by vmark applications.
#[derive(Debug, Clone, Deserialize)]
pub struct VmarkConfig {
    pub pipeline: PipelineSection,
    pub markdown: MarkdownSection,
}

/// Sizing of the pipeline context.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    pub cache_capacity: usize,
    pub cache_min_bytes: usize,
    pub offload_threshold_bytes: usize,
    pub offload_enabled: bool,
    pub strict: bool,
}

impl From<&PipelineSection> for PipelineConfig {
    fn from(section: &PipelineSection) -> Self {
        PipelineConfig {
            cache_capacity: section.cache_capacity,
            cache_min_bytes: section.cache_min_bytes,
            offload_threshold_bytes: section.offload_threshold_bytes,
            offload_enabled: section.offload_enabled,
            strict: section.strict,
        }
    }
}

/// Per-call markdown options.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkdownSection {
    pub preserve_line_breaks: bool,
    pub hard_break_style: HardBreakStyle,
    pub explicit_options: bool,
}

impl MarkdownSection {
    /// Options to pass to parse and serialize calls.
    ///
    /// `None` unless explicit options are requested or a setting differs from
    /// its default, so that plain documents keep the fast parser.
    pub fn to_options(&self) -> Option<PipelineOptions> {
        let options = PipelineOptions {
            preserve_line_breaks: self.preserve_line_breaks,
            hard_break_style: self.hard_break_style,
        };
        if self.explicit_options || options != PipelineOptions::default() {
            Some(options)
        } else {
            None
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<VmarkConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<VmarkConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.pipeline.cache_capacity, 64);
        assert_eq!(config.pipeline.offload_threshold_bytes, 256 * 1024);
        assert!(!config.markdown.preserve_line_breaks);
        assert_eq!(config.markdown.hard_break_style, HardBreakStyle::Backslash);
    }

    #[test]
    fn defaults_match_the_library() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(
            PipelineConfig::from(&config.pipeline),
            PipelineConfig::default()
        );
        assert_eq!(config.markdown.to_options(), None);
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("markdown.hard_break_style", "trailing-spaces")
            .expect("override to apply")
            .set_override("pipeline.strict", true)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert!(config.pipeline.strict);
        assert_eq!(
            config.markdown.to_options(),
            Some(PipelineOptions {
                preserve_line_breaks: false,
                hard_break_style: HardBreakStyle::TrailingSpaces,
            })
        );
    }

    #[test]
    fn explicit_options_are_passed_even_when_default() {
        let config = Loader::new()
            .set_override("markdown.explicit_options", true)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(
            config.markdown.to_options(),
            Some(PipelineOptions::default())
        );
    }

    #[test]
    fn layers_user_files() {
        let path = std::env::temp_dir().join(format!(
            "vmark-config-test-{}.toml",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).expect("temp file");
        writeln!(file, "[pipeline]\ncache_capacity = 3").expect("write config");

        let config = Loader::new().with_file(&path).build().expect("config to build");
        std::fs::remove_file(&path).ok();
        assert_eq!(config.pipeline.cache_capacity, 3);
        assert_eq!(config.pipeline.cache_min_bytes, 4096);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = Loader::new()
            .with_file("/definitely/not/here/vmark.toml")
            .build();
        assert!(result.is_err());
        assert!(Loader::new()
            .with_optional_file("/definitely/not/here/vmark.toml")
            .build()
            .is_ok());
    }
}
