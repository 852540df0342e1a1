//! Configuration loading and defaults for lexcite.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::prompts::RUN_INSTRUCTIONS;
use crate::ui_text::ReplyLocale;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_POLL_INTERVAL_SECS: f64 = 2.0;
pub const DEFAULT_RUN_TIMEOUT_SECS: f64 = 120.0;
pub const DEFAULT_MESSAGE_RETRY_DELAY_SECS: f64 = 1.0;

// === Types ===

/// Raw polling configuration loaded from config files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollingConfig {
    pub interval_secs: Option<f64>,
    pub timeout_secs: Option<f64>,
    pub message_retry_delay_secs: Option<f64>,
}

/// Resolved run polling policy with defaults applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollingPolicy {
    /// Wait between two status checks.
    pub poll_interval: Duration,
    /// Wall-clock budget for a run to reach a terminal status.
    pub run_timeout: Duration,
    /// Wait before the single re-fetch of a completed run's messages.
    pub message_retry_delay: Duration,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs_f64(DEFAULT_POLL_INTERVAL_SECS),
            run_timeout: Duration::from_secs_f64(DEFAULT_RUN_TIMEOUT_SECS),
            message_retry_delay: Duration::from_secs_f64(DEFAULT_MESSAGE_RETRY_DELAY_SECS),
        }
    }
}

/// Resolved CLI configuration, including defaults and environment overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub api_key: Option<String>,
    pub assistant_id: Option<String>,
    pub base_url: Option<String>,
    /// Language of rendered footnotes: "es" or "en".
    pub locale: Option<String>,
    /// Replaces the built-in run instructions.
    pub instructions: Option<String>,
    pub polling: Option<PollingConfig>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    #[serde(flatten)]
    base: Config,
    profiles: Option<HashMap<String, Config>>,
}

// === Config Loading ===

impl Config {
    /// Load configuration from disk and merge with environment overrides.
    ///
    /// Credentials are not required here; `api_key()` and `assistant_id()`
    /// report their absence so startup can fail with a clear message.
    pub fn load(path: Option<PathBuf>, profile: Option<&str>) -> Result<Self> {
        let path = path.map_or_else(default_config_path, |p| Some(expand_pathbuf(p)));
        let mut config = match path.as_ref() {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                let parsed: ConfigFile = toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
                apply_profile(parsed, profile)?
            }
            _ => {
                if let Some(profile) = profile {
                    anyhow::bail!("Profile '{profile}' requested but no config file was found");
                }
                Config::default()
            }
        };

        apply_env_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Validate that configured fields are well-formed.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref key) = self.api_key
            && key.trim().is_empty()
        {
            anyhow::bail!("api_key cannot be empty string");
        }
        if let Some(ref id) = self.assistant_id
            && id.trim().is_empty()
        {
            anyhow::bail!("assistant_id cannot be empty string");
        }
        if let Some(locale) = self.locale.as_deref()
            && ReplyLocale::parse(locale).is_none()
        {
            anyhow::bail!("Invalid locale '{locale}': expected es or en.");
        }
        if let Some(polling) = &self.polling {
            for (name, value) in [
                ("polling.interval_secs", polling.interval_secs),
                ("polling.timeout_secs", polling.timeout_secs),
                (
                    "polling.message_retry_delay_secs",
                    polling.message_retry_delay_secs,
                ),
            ] {
                if let Some(value) = value
                    && !(value > 0.0 && Duration::try_from_secs_f64(value).is_ok())
                {
                    anyhow::bail!("Invalid {name} '{value}': expected a positive number of seconds.");
                }
            }
        }
        Ok(())
    }

    /// Read the API credential. Its absence is a fatal startup condition.
    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.clone()
            && !key.trim().is_empty()
        {
            return Ok(key);
        }
        anyhow::bail!(
            "API key not found. Set it using one of these methods:\n\
             1. Set OPENAI_API_KEY in the environment or in a .env file (recommended)\n\
             2. Add 'api_key = \"your-key\"' to ~/.lexcite/config.toml"
        )
    }

    /// Read the assistant identifier. Its absence is a fatal startup condition.
    pub fn assistant_id(&self) -> Result<String> {
        if let Some(id) = self.assistant_id.clone()
            && !id.trim().is_empty()
        {
            return Ok(id);
        }
        anyhow::bail!(
            "Assistant ID not found. Set ASSISTANT_ID in the environment or a .env file, \
             or add 'assistant_id = \"asst_...\"' to ~/.lexcite/config.toml"
        )
    }

    /// Return the gateway base URL (normalized, without a trailing `/v1`).
    #[must_use]
    pub fn base_url(&self) -> String {
        let base = self
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        normalize_base_url(&base)
    }

    #[must_use]
    pub fn locale(&self) -> ReplyLocale {
        self.locale
            .as_deref()
            .and_then(ReplyLocale::parse)
            .unwrap_or_default()
    }

    /// Instructions sent with every run.
    #[must_use]
    pub fn instructions(&self) -> String {
        self.instructions
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(RUN_INSTRUCTIONS)
            .to_string()
    }

    /// Resolve the effective polling policy with defaults applied.
    #[must_use]
    pub fn polling_policy(&self) -> PollingPolicy {
        let defaults = PollingPolicy::default();
        let Some(cfg) = &self.polling else {
            return defaults;
        };
        let secs = |value: Option<f64>, fallback: Duration| {
            value
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .filter(|duration| !duration.is_zero())
                .unwrap_or(fallback)
        };
        PollingPolicy {
            poll_interval: secs(cfg.interval_secs, defaults.poll_interval),
            run_timeout: secs(cfg.timeout_secs, defaults.run_timeout),
            message_retry_delay: secs(cfg.message_retry_delay_secs, defaults.message_retry_delay),
        }
    }
}

// === Defaults ===

pub fn default_config_path() -> Option<PathBuf> {
    env_config_path().or_else(home_config_path)
}

fn home_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".lexcite").join("config.toml"))
}

fn env_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("LEXCITE_CONFIG_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Some(expand_path(trimmed));
        }
    }
    None
}

fn expand_pathbuf(path: PathBuf) -> PathBuf {
    if let Some(raw) = path.to_str() {
        return expand_path(raw);
    }
    path
}

fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::tilde(path);
    PathBuf::from(expanded.as_ref())
}

// === Environment Overrides ===

fn apply_env_overrides(config: &mut Config) {
    if let Ok(value) = std::env::var("OPENAI_API_KEY") {
        config.api_key = Some(value);
    }
    if let Ok(value) = std::env::var("ASSISTANT_ID") {
        config.assistant_id = Some(value);
    }
    if let Ok(value) = std::env::var("OPENAI_BASE_URL") {
        config.base_url = Some(value);
    }
    if let Ok(value) = std::env::var("LEXCITE_LOCALE") {
        config.locale = Some(value);
    }
}

fn normalize_base_url(base: &str) -> String {
    base.trim()
        .trim_end_matches('/')
        .trim_end_matches("/v1")
        .to_string()
}

fn apply_profile(config: ConfigFile, profile: Option<&str>) -> Result<Config> {
    let Some(profile_name) = profile else {
        return Ok(config.base);
    };
    let profiles = config.profiles.as_ref();
    match profiles.and_then(|profiles| profiles.get(profile_name)) {
        Some(override_cfg) => Ok(merge_config(config.base, override_cfg.clone())),
        None => {
            let available = profiles
                .map(|profiles| {
                    let mut keys = profiles.keys().cloned().collect::<Vec<_>>();
                    keys.sort();
                    if keys.is_empty() {
                        "none".to_string()
                    } else {
                        keys.join(", ")
                    }
                })
                .unwrap_or_else(|| "none".to_string());
            anyhow::bail!("Profile '{profile_name}' not found. Available profiles: {available}")
        }
    }
}

fn merge_config(base: Config, override_cfg: Config) -> Config {
    Config {
        api_key: override_cfg.api_key.or(base.api_key),
        assistant_id: override_cfg.assistant_id.or(base.assistant_id),
        base_url: override_cfg.base_url.or(base.base_url),
        locale: override_cfg.locale.or(base.locale),
        instructions: override_cfg.instructions.or(base.instructions),
        polling: merge_polling(base.polling, override_cfg.polling),
    }
}

fn merge_polling(
    base: Option<PollingConfig>,
    override_cfg: Option<PollingConfig>,
) -> Option<PollingConfig> {
    match (base, override_cfg) {
        (Some(base), Some(override_cfg)) => Some(PollingConfig {
            interval_secs: override_cfg.interval_secs.or(base.interval_secs),
            timeout_secs: override_cfg.timeout_secs.or(base.timeout_secs),
            message_retry_delay_secs: override_cfg
                .message_retry_delay_secs
                .or(base.message_retry_delay_secs),
        }),
        (base, override_cfg) => override_cfg.or(base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::lock_test_env;
    use std::env;
    use std::ffi::OsString;

    const TRACKED_VARS: &[&str] = &[
        "OPENAI_API_KEY",
        "ASSISTANT_ID",
        "OPENAI_BASE_URL",
        "LEXCITE_LOCALE",
        "LEXCITE_CONFIG_PATH",
    ];

    /// Clears the tracked variables and restores them on drop.
    struct EnvGuard {
        saved: Vec<(&'static str, Option<OsString>)>,
    }

    impl EnvGuard {
        fn clean() -> Self {
            let saved = TRACKED_VARS
                .iter()
                .map(|name| (*name, env::var_os(name)))
                .collect();
            for name in TRACKED_VARS {
                // Safety: test-only environment mutation guarded by a global mutex.
                unsafe {
                    env::remove_var(name);
                }
            }
            Self { saved }
        }

        fn set(&self, name: &str, value: &str) {
            // Safety: test-only environment mutation guarded by a global mutex.
            unsafe {
                env::set_var(name, value);
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in self.saved.drain(..) {
                // Safety: test-only environment mutation guarded by a global mutex.
                unsafe {
                    match value {
                        Some(value) => env::set_var(name, value),
                        None => env::remove_var(name),
                    }
                }
            }
        }
    }

    #[test]
    fn env_overrides_file_values() -> Result<()> {
        let _lock = lock_test_env();
        let guard = EnvGuard::clean();
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "api_key = \"file-key\"\nassistant_id = \"asst_file\"\nlocale = \"en\"\n",
        )?;
        guard.set("ASSISTANT_ID", "asst_env");

        let config = Config::load(Some(path), None)?;
        assert_eq!(config.api_key()?, "file-key");
        assert_eq!(config.assistant_id()?, "asst_env");
        assert_eq!(config.locale(), ReplyLocale::En);
        Ok(())
    }

    #[test]
    fn missing_credentials_are_reported() -> Result<()> {
        let _lock = lock_test_env();
        let _guard = EnvGuard::clean();
        let dir = tempfile::tempdir()?;

        let config = Config::load(Some(dir.path().join("absent.toml")), None)?;
        let err = config.api_key().unwrap_err().to_string();
        assert!(err.contains("OPENAI_API_KEY"));
        let err = config.assistant_id().unwrap_err().to_string();
        assert!(err.contains("ASSISTANT_ID"));
        Ok(())
    }

    #[test]
    fn profile_overrides_base_values() -> Result<()> {
        let _lock = lock_test_env();
        let _guard = EnvGuard::clean();
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "assistant_id = \"asst_base\"\n\n[polling]\ninterval_secs = 3.0\n\n[profiles.staging]\nassistant_id = \"asst_staging\"\nbase_url = \"http://localhost:8080/v1/\"\n",
        )?;

        let config = Config::load(Some(path), Some("staging"))?;
        assert_eq!(config.assistant_id()?, "asst_staging");
        assert_eq!(config.base_url(), "http://localhost:8080");
        assert_eq!(config.polling_policy().poll_interval, Duration::from_secs(3));
        Ok(())
    }

    #[test]
    fn nonexistent_profile_error_lists_available() {
        let mut profiles = HashMap::new();
        profiles.insert("work".to_string(), Config::default());
        let config = ConfigFile {
            base: Config::default(),
            profiles: Some(profiles),
        };

        let err = apply_profile(config, Some("nonexistent")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Profile 'nonexistent' not found"));
        assert!(message.contains("work"));
    }

    #[test]
    fn polling_defaults_match_design_values() {
        let policy = Config::default().polling_policy();
        assert_eq!(policy.poll_interval, Duration::from_secs(2));
        assert_eq!(policy.run_timeout, Duration::from_secs(120));
        assert_eq!(policy.message_retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn invalid_values_rejected() {
        let config = Config {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            locale: Some("fr".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            polling: Some(PollingConfig {
                timeout_secs: Some(0.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            polling: Some(PollingConfig {
                timeout_secs: Some(1e20),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(
            config.polling_policy().run_timeout,
            PollingPolicy::default().run_timeout
        );
    }

    #[test]
    fn profile_polling_keeps_unset_base_fields() -> Result<()> {
        let _lock = lock_test_env();
        let _guard = EnvGuard::clean();
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[polling]\ninterval_secs = 3.0\n\n[profiles.slow]\n[profiles.slow.polling]\ntimeout_secs = 300.0\n",
        )?;

        let policy = Config::load(Some(path), Some("slow"))?.polling_policy();
        assert_eq!(policy.poll_interval, Duration::from_secs(3));
        assert_eq!(policy.run_timeout, Duration::from_secs(300));
        assert_eq!(
            policy.message_retry_delay,
            PollingPolicy::default().message_retry_delay
        );
        Ok(())
    }

    #[test]
    fn blank_instructions_fall_back_to_builtin() {
        let config = Config {
            instructions: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(config.instructions(), RUN_INSTRUCTIONS);
    }
}
