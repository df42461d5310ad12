/*!
 * Encode Options
 * Per-call configuration resolved by the encode context
 */

use super::errors::OptionsError;
use super::limits::{
    DEFAULT_MAX_DEPTH, ENV_HTML_ESCAPING, ENV_MAX_DEPTH, ENV_OMIT_EMPTY, ENV_SORT_MAP_KEYS,
    ENV_UTF8_COERCION,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Options applied to a single encode call
///
/// None of these are baked into a compiled plan, so one plan can be executed
/// with any combination of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EncodeOptions {
    /// Sort map keys by their escaped JSON form
    pub sort_map_keys: bool,
    /// Escape `<`, `>`, `&`, U+2028 and U+2029
    pub html_escaping: bool,
    /// Replace invalid UTF-8 in byte strings with U+FFFD
    pub utf8_coercion: bool,
    /// Maximum number of nested objects/arrays
    pub max_depth: usize,
    /// Treat every struct field as omit-if-empty
    pub omit_empty_default: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            sort_map_keys: true,
            html_escaping: true,
            utf8_coercion: true,
            max_depth: DEFAULT_MAX_DEPTH,
            omit_empty_default: false,
        }
    }
}

impl EncodeOptions {
    /// Throughput profile for callers that guarantee clean input
    pub const fn fast() -> Self {
        Self {
            sort_map_keys: false,
            html_escaping: false,
            utf8_coercion: false,
            max_depth: DEFAULT_MAX_DEPTH,
            omit_empty_default: false,
        }
    }

    pub const fn unsorted_maps(mut self) -> Self {
        self.sort_map_keys = false;
        self
    }

    pub const fn no_html_escaping(mut self) -> Self {
        self.html_escaping = false;
        self
    }

    pub const fn no_utf8_coercion(mut self) -> Self {
        self.utf8_coercion = false;
        self
    }

    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub const fn omit_empty_by_default(mut self) -> Self {
        self.omit_empty_default = true;
        self
    }

    /// Parse options from a JSON document; missing keys keep their defaults
    pub fn from_json_str(document: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(document)?)
    }

    /// Apply `PLANJSON_*` environment overrides
    pub fn with_env_overrides(self) -> Result<Self, OptionsError> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, OptionsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |variable: &'static str| -> Result<Option<bool>, OptionsError> {
            match lookup(variable) {
                None => Ok(None),
                Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => Ok(Some(true)),
                    "0" | "false" | "no" | "off" => Ok(Some(false)),
                    _ => {
                        warn!(variable, value = %value, "Rejected encode option override");
                        Err(OptionsError::Env { variable, value })
                    }
                },
            }
        };

        if let Some(v) = flag(ENV_SORT_MAP_KEYS)? {
            self.sort_map_keys = v;
        }
        if let Some(v) = flag(ENV_HTML_ESCAPING)? {
            self.html_escaping = v;
        }
        if let Some(v) = flag(ENV_UTF8_COERCION)? {
            self.utf8_coercion = v;
        }
        if let Some(v) = flag(ENV_OMIT_EMPTY)? {
            self.omit_empty_default = v;
        }
        if let Some(value) = lookup(ENV_MAX_DEPTH) {
            match value.trim().parse::<usize>() {
                Ok(depth) if depth > 0 => self.max_depth = depth,
                _ => {
                    warn!(variable = ENV_MAX_DEPTH, value = %value, "Rejected encode option override");
                    return Err(OptionsError::Env {
                        variable: ENV_MAX_DEPTH,
                        value,
                    });
                }
            }
        }
        Ok(self)
    }
}
