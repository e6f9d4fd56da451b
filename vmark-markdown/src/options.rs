//! Pipeline options and the runtime configuration of a [`crate::Pipeline`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How hard line breaks are written back to markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HardBreakStyle {
    /// `\` at the end of the line
    #[default]
    Backslash,
    /// Two spaces at the end of the line
    TrailingSpaces,
}

impl HardBreakStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            HardBreakStyle::Backslash => "backslash",
            HardBreakStyle::TrailingSpaces => "trailing-spaces",
        }
    }
}

impl fmt::Display for HardBreakStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HardBreakStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backslash" => Ok(HardBreakStyle::Backslash),
            "trailing-spaces" | "spaces" => Ok(HardBreakStyle::TrailingSpaces),
            other => Err(format!(
                "unknown hard break style '{other}' (expected 'backslash' or 'trailing-spaces')"
            )),
        }
    }
}

/// Explicit options for a single parse or serialize call.
///
/// Passing `None` instead of options is meaningful: only option-less parses
/// may take the fast parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Soft line breaks inside paragraphs become hard breaks.
    pub preserve_line_breaks: bool,
    pub hard_break_style: HardBreakStyle,
}

impl PipelineOptions {
    /// Stable textual form of the options, mixed into cache keys.
    pub fn cache_key(options: Option<&PipelineOptions>) -> String {
        match options {
            None => "none".to_string(),
            Some(options) => format!(
                "preserve_line_breaks={};hard_break_style={}",
                options.preserve_line_breaks, options.hard_break_style
            ),
        }
    }
}

/// Sizing and behaviour of a pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum number of cached syntax trees. Zero disables the cache.
    pub cache_capacity: usize,
    /// Sources shorter than this are never cached.
    pub cache_min_bytes: usize,
    /// Sources at least this long are parsed on the background worker.
    pub offload_threshold_bytes: usize,
    pub offload_enabled: bool,
    /// Turn conversion invariant violations into errors instead of warnings.
    pub strict: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            cache_capacity: 64,
            cache_min_bytes: 4096,
            offload_threshold_bytes: 256 * 1024,
            offload_enabled: true,
            strict: false,
        }
    }
}
