//! Configuration loading and persistence with atomic file operations.

use crate::schema::Config;
use slowmander_common::{Result, SlowmanderError, UserId};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable overriding `discord.token`.
pub const ENV_TOKEN: &str = "DISCORD_TOKEN";
/// Environment variable overriding `commands.default_prefix`.
pub const ENV_PREFIX: &str = "SLOWMANDER_PREFIX";
/// Environment variable overriding `discord.owner_ids`, comma separated.
pub const ENV_OWNERS: &str = "SLOWMANDER_OWNERS";
/// Environment variable overriding `logging.level`.
pub const ENV_LOG_LEVEL: &str = "SLOWMANDER_LOG_LEVEL";

/// On-disk configuration formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.yaml` or `.yml`
    Yaml,
    /// `.toml`
    Toml,
}

impl ConfigFormat {
    /// Detects the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            _ => Err(SlowmanderError::config(format!(
                "Unsupported configuration file extension: {}",
                path.display()
            ))),
        }
    }
}

/// Configuration loader with atomic file operations.
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path this loader reads from and writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads configuration from file, applies environment overrides from the
    /// process environment and validates the result.
    pub async fn load(&self) -> Result<Config> {
        self.load_with_env(|key| std::env::var(key).ok()).await
    }

    /// Like [`load`](Self::load) but reads overrides through `env`.
    pub async fn load_with_env<F>(&self, env: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        debug!(path = %self.path.display(), "Reading configuration file");
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SlowmanderError::config_with_source(
                format!("Failed to read configuration file {}", self.path.display()),
                e,
            )
        })?;

        let mut config = Self::parse(&content, ConfigFormat::from_path(&self.path)?)?;
        Self::apply_env_overrides(&mut config, env)?;
        config.validate()?;

        info!(
            path = %self.path.display(),
            owners = config.discord.owner_ids.len(),
            guilds = config.guilds.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parses configuration text in the given format.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Config> {
        match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| {
                SlowmanderError::config_with_source("Failed to parse YAML configuration", e)
            }),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| {
                SlowmanderError::config_with_source("Failed to parse TOML configuration", e)
            }),
        }
    }

    /// Applies environment variable overrides to `config`.
    pub fn apply_env_overrides<F>(config: &mut Config, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = env(ENV_TOKEN) {
            config.discord.token = token;
        }

        if let Some(prefix) = env(ENV_PREFIX) {
            config.commands.default_prefix = prefix;
        }

        if let Some(owners) = env(ENV_OWNERS) {
            config.discord.owner_ids = owners
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<UserId>().map_err(|_| {
                    SlowmanderError::invalid(ENV_OWNERS, format!("Failed to parse owner id '{s}'"))
                }))
                .collect::<Result<Vec<_>>>()?;
        }

        if let Some(level) = env(ENV_LOG_LEVEL) {
            config.logging.level = level;
        }

        Ok(())
    }

    /// Saves configuration to file atomically by writing a sibling temporary
    /// file and renaming it over the target.
    pub async fn save(&self, config: &Config) -> Result<()> {
        let content = match ConfigFormat::from_path(&self.path)? {
            ConfigFormat::Yaml => serde_yaml::to_string(config).map_err(|e| {
                SlowmanderError::config_with_source("Failed to serialize configuration", e)
            })?,
            ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| {
                SlowmanderError::config_with_source("Failed to serialize configuration", e)
            })?,
        };

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "Configuration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yaml")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")).unwrap(), ConfigFormat::Toml);
        assert!(ConfigFormat::from_path(Path::new("a.json")).is_err());
        assert!(ConfigFormat::from_path(Path::new("config")).is_err());
    }

    #[test]
    fn test_parse_yaml_fills_defaults() {
        let config = ConfigLoader::parse("discord:\n  token: abc\n", ConfigFormat::Yaml).unwrap();
        assert_eq!(config.discord.token, "abc");
        assert_eq!(config.commands.default_prefix, "!");
        assert!(config.guilds.is_empty());
    }

    #[test]
    fn test_parse_toml() {
        let text = r#"
[discord]
token = "abc"
owner_ids = [175928847299117063]

[commands]
default_prefix = "?"
"#;
        let config = ConfigLoader::parse(text, ConfigFormat::Toml).unwrap();
        assert_eq!(config.commands.default_prefix, "?");
        assert_eq!(config.discord.owner_ids, vec![UserId(175_928_847_299_117_063)]);
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let err = ConfigLoader::parse("discord: [", ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, SlowmanderError::Config { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        let env = env_from(&[
            (ENV_TOKEN, "from-env"),
            (ENV_PREFIX, "$"),
            (ENV_OWNERS, "175928847299117063, 987654321098765432,"),
            (ENV_LOG_LEVEL, "debug"),
        ]);
        ConfigLoader::apply_env_overrides(&mut config, env).unwrap();

        assert_eq!(config.discord.token, "from-env");
        assert_eq!(config.commands.default_prefix, "$");
        assert_eq!(config.discord.owner_ids.len(), 2);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_env_owner_parse_failure() {
        let mut config = Config::default();
        let env = env_from(&[(ENV_OWNERS, "not-a-number")]);
        let err = ConfigLoader::apply_env_overrides(&mut config, env).unwrap_err();
        assert!(matches!(err, SlowmanderError::Validation { .. }));
    }
}
