//! Documented TOML configuration files
//!
//! A config struct derives `Serialize`/`Deserialize` with `#[serde(default)]`
//! and registers its fields with [`documented_config!`]. On first load the
//! defaults are written out one key per line with the description as an
//! inline comment. `Option<T>` fields that are unset are written commented
//! out so users can see what is available.
//!
//! ```ignore
//! documented_config!(ClipperConfig {
//!     fields: [
//!         chunk_length, "Clip length in seconds",
//!     ],
//!     optional: [
//!         output_dir, "Default output directory",
//!     ],
//!     config_path: clipper_config_path(),
//! });
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata about a configuration field
#[derive(Debug, Clone)]
pub struct ConfigFieldMeta {
    pub name: &'static str,
    /// TOML-serialized default value, or None if serialization failed
    pub default_value: Option<String>,
    pub description: &'static str,
    pub is_optional: bool,
}

/// Implemented by the `documented_config!` macro.
pub trait DocumentedConfig: Sized + Default {
    fn field_metadata() -> Vec<ConfigFieldMeta>;

    fn is_optional_field_set(&self, field_name: &str) -> bool;

    /// TOML-serialized value for a specific field
    fn get_field_value(&self, field_name: &str) -> String;

    fn config_path() -> Result<PathBuf>;

    /// Render the config with one documented `key = value` line per field.
    fn to_documented_toml(&self) -> String {
        let mut output = String::new();

        for field in Self::field_metadata() {
            if field.is_optional && !self.is_optional_field_set(field.name) {
                // Skip fields we couldn't serialize a default for
                let Some(default_val) = &field.default_value else {
                    continue;
                };
                output.push_str(&format!(
                    "# {} = {}  # {}\n",
                    field.name, default_val, field.description
                ));
            } else {
                output.push_str(&format!(
                    "{} = {}  # {}\n",
                    field.name,
                    self.get_field_value(field.name),
                    field.description
                ));
            }
        }

        output
    }

    fn save_with_documentation(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        fs::write(path, self.to_documented_toml())
            .with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    /// Load from `path`, writing documented defaults first if it is missing.
    fn load_from_path_documented(path: PathBuf) -> Result<Self>
    where
        for<'de> Self: serde::de::Deserialize<'de>,
    {
        if !path.exists() {
            let config = Self::default();
            config.save_with_documentation(&path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Generate the [`DocumentedConfig`] implementation for a config struct.
///
/// `fields` are always written; `optional` fields must be `Option<T>`
/// with `T: Default + Serialize` and are commented out while `None`.
#[macro_export]
macro_rules! documented_config {
    (
        $config_name:ident {
            fields: [
                $($field:ident, $desc:expr),* $(,)?
            ],
            optional: [
                $($opt_field:ident, $opt_desc:expr),* $(,)?
            ],
            config_path: $path:expr $(,)?
        }
    ) => {
        impl $crate::common::config::DocumentedConfig for $config_name {
            fn field_metadata() -> Vec<$crate::common::config::ConfigFieldMeta> {
                let default_config = Self::default();
                vec![
                    $(
                        $crate::common::config::ConfigFieldMeta {
                            name: stringify!($field),
                            default_value: toml::Value::try_from(&default_config.$field)
                                .map(|v| v.to_string())
                                .ok(),
                            description: $desc,
                            is_optional: false,
                        },
                    )*
                    $(
                        $crate::common::config::ConfigFieldMeta {
                            name: stringify!($opt_field),
                            default_value: {
                                let inner_default = default_config.$opt_field.clone()
                                    .unwrap_or_default();
                                toml::Value::try_from(&inner_default)
                                    .map(|v| v.to_string())
                                    .ok()
                            },
                            description: $opt_desc,
                            is_optional: true,
                        },
                    )*
                ]
            }

            fn is_optional_field_set(&self, field_name: &str) -> bool {
                match field_name {
                    $(
                        stringify!($opt_field) => self.$opt_field.is_some(),
                    )*
                    _ => false,
                }
            }

            fn get_field_value(&self, field_name: &str) -> String {
                match field_name {
                    $(
                        stringify!($field) => {
                            toml::Value::try_from(&self.$field)
                                .map(|v| v.to_string())
                                .unwrap_or_else(|_| format!("{:?}", self.$field))
                        }
                    )*
                    $(
                        stringify!($opt_field) => {
                            let value = self.$opt_field.clone().unwrap_or_default();
                            toml::Value::try_from(&value)
                                .map(|v| v.to_string())
                                .unwrap_or_else(|_| "\"\"".to_string())
                        }
                    )*
                    _ => String::new(),
                }
            }

            fn config_path() -> anyhow::Result<std::path::PathBuf> {
                $path
            }
        }
    };
}
