//! Local CLI settings in `~/.cachet/config.toml`.
//!
//! Two keys are understood: `api-url` and `output`. Flags and environment
//! variables take precedence over both.

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Set a value
    Set {
        key: SettingKey,
        value: String,
    },

    /// Print a value
    Get { key: SettingKey },

    /// Print every value that is set
    Show,

    /// Delete the settings file
    Reset {
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SettingKey {
    /// Server base URL
    ApiUrl,
    /// Default output format (table, json, yaml)
    Output,
}

impl SettingKey {
    fn name(self) -> &'static str {
        match self {
            Self::ApiUrl => "api-url",
            Self::Output => "output",
        }
    }
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CliSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputFormat>,
}

impl CliSettings {
    fn set(&mut self, key: SettingKey, value: &str) -> Result<()> {
        match key {
            SettingKey::ApiUrl => {
                if !value.starts_with("http://") && !value.starts_with("https://") {
                    anyhow::bail!("api-url must start with http:// or https://");
                }
                self.api_url = Some(value.trim_end_matches('/').to_string());
            }
            SettingKey::Output => {
                let format = OutputFormat::from_str(value, true)
                    .map_err(|e| anyhow::anyhow!("invalid output format: {}", e))?;
                self.output = Some(format);
            }
        }
        Ok(())
    }

    fn get(&self, key: SettingKey) -> Option<String> {
        match key {
            SettingKey::ApiUrl => self.api_url.clone(),
            SettingKey::Output => self.output.map(|f| format!("{:?}", f).to_lowercase()),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }
}

fn settings_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".cachet").join("config.toml"))
}

/// Saved settings, or defaults when the file is missing or unreadable.
pub fn load_settings() -> CliSettings {
    settings_path()
        .and_then(|path| CliSettings::read(&path))
        .unwrap_or_default()
}

pub fn execute(cmd: ConfigCommands, format: OutputFormat) -> Result<()> {
    let path = settings_path()?;

    match cmd {
        ConfigCommands::Set { key, value } => {
            let mut settings = CliSettings::read(&path)?;
            settings.set(key, &value)?;
            settings.write(&path)?;
            match format {
                OutputFormat::Table => {
                    output::print_success(&format!("{} saved to {}", key.name(), path.display()));
                    Ok(())
                }
                _ => output::print_item(&settings, format),
            }
        }

        ConfigCommands::Get { key } => {
            let value = CliSettings::read(&path)?
                .get(key)
                .with_context(|| format!("{} is not set", key.name()))?;
            println!("{}", value);
            Ok(())
        }

        ConfigCommands::Show => {
            let settings = CliSettings::read(&path)?;
            if settings == CliSettings::default() {
                output::print_info("No settings saved.");
                return Ok(());
            }
            match format {
                OutputFormat::Table => {
                    output::print_header(&format!("Settings ({})", path.display()));
                    for key in SettingKey::value_variants() {
                        if let Some(value) = settings.get(*key) {
                            output::print_detail(key.name(), &value);
                        }
                    }
                    Ok(())
                }
                _ => output::print_item(&settings, format),
            }
        }

        ConfigCommands::Reset { force } => {
            if !force {
                output::print_info("This deletes all saved settings. Use --force to confirm.");
                return Ok(());
            }
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
            output::print_success("Settings reset");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("cachet-settings-{}", std::process::id()));
        let path = dir.join("config.toml");

        let mut settings = CliSettings::default();
        settings.set(SettingKey::ApiUrl, "http://cache:8080/").unwrap();
        settings.set(SettingKey::Output, "YAML").unwrap();
        settings.write(&path).unwrap();

        let loaded = CliSettings::read(&path).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(loaded.api_url.as_deref(), Some("http://cache:8080"));
        assert_eq!(loaded.output, Some(OutputFormat::Yaml));
        assert_eq!(loaded.get(SettingKey::Output).as_deref(), Some("yaml"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut settings = CliSettings::default();
        assert!(settings.set(SettingKey::ApiUrl, "cache:8080").is_err());
        assert!(settings.set(SettingKey::Output, "xml").is_err());
        assert_eq!(settings, CliSettings::default());
    }

    #[test]
    fn test_missing_file_reads_as_defaults() {
        let path = std::env::temp_dir().join("cachet-settings-absent/config.toml");
        assert_eq!(CliSettings::read(&path).unwrap(), CliSettings::default());
    }
}
