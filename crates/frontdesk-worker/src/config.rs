//! Layered configuration.
//!
//! Merge order (later overrides earlier): compiled defaults,
//! `/etc/frontdesk/frontdesk.toml`, the user config dir, `./frontdesk.toml`,
//! `GEMINI_API_KEY`, then `FRONTDESK_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FrontdeskConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

/// The messaging sidecar process.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_runtime")]
    pub runtime: String,
    #[serde(default = "default_entry")]
    pub entry: String,
    /// How long request/response commands may take.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            dir: default_provider_dir(),
            runtime: default_runtime(),
            entry: default_entry(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite file; defaults to the platform data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AiConfig {
    /// Without a key the simulated responder answers instead.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_ai_base_url(),
            timeout_secs: default_ai_timeout_secs(),
        }
    }
}

/// Delays used by auto-replies and session bootstrap, in milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    #[serde(default = "default_rule_reply_delay_ms")]
    pub rule_reply_delay_ms: u64,
    #[serde(default = "default_reply_jitter_min_ms")]
    pub reply_jitter_min_ms: u64,
    #[serde(default = "default_reply_jitter_max_ms")]
    pub reply_jitter_max_ms: u64,
    #[serde(default = "default_bootstrap_settle_ms")]
    pub bootstrap_settle_ms: u64,
    #[serde(default = "default_bootstrap_backoff_ms")]
    pub bootstrap_backoff_ms: u64,
    #[serde(default = "default_bootstrap_attempts")]
    pub bootstrap_attempts: u32,
    #[serde(default = "default_bootstrap_limit")]
    pub bootstrap_limit: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            rule_reply_delay_ms: default_rule_reply_delay_ms(),
            reply_jitter_min_ms: default_reply_jitter_min_ms(),
            reply_jitter_max_ms: default_reply_jitter_max_ms(),
            bootstrap_settle_ms: default_bootstrap_settle_ms(),
            bootstrap_backoff_ms: default_bootstrap_backoff_ms(),
            bootstrap_attempts: default_bootstrap_attempts(),
            bootstrap_limit: default_bootstrap_limit(),
        }
    }
}

fn default_provider_dir() -> PathBuf {
    PathBuf::from("provider")
}

fn default_runtime() -> String {
    "bun".to_string()
}

fn default_entry() -> String {
    "index.ts".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_ai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_ai_timeout_secs() -> u64 {
    30
}

fn default_rule_reply_delay_ms() -> u64 {
    1000
}

fn default_reply_jitter_min_ms() -> u64 {
    2000
}

fn default_reply_jitter_max_ms() -> u64 {
    4000
}

fn default_bootstrap_settle_ms() -> u64 {
    5000
}

fn default_bootstrap_backoff_ms() -> u64 {
    4000
}

fn default_bootstrap_attempts() -> u32 {
    3
}

fn default_bootstrap_limit() -> usize {
    50
}

pub fn load_config() -> Result<FrontdeskConfig, figment::Error> {
    build_figment(None).extract()
}

pub fn load_config_from_path(path: &Path) -> Result<FrontdeskConfig, figment::Error> {
    build_figment(Some(path)).extract()
}

/// Defaults plus one TOML string, no files or environment.
pub fn load_config_from_str(toml_content: &str) -> Result<FrontdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FrontdeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

fn build_figment(explicit: Option<&Path>) -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(FrontdeskConfig::default()));

    figment = match explicit {
        Some(path) => figment.merge(Toml::file(path)),
        None => figment
            .merge(Toml::file("/etc/frontdesk/frontdesk.toml"))
            .merge(Toml::file(
                ProjectDirs::from("com", "frontdesk", "frontdesk")
                    .map(|d| d.config_dir().join("frontdesk.toml"))
                    .unwrap_or_default(),
            ))
            .merge(Toml::file("frontdesk.toml")),
    };

    figment
        .merge(Env::raw().only(&["GEMINI_API_KEY"]).map(|_| "ai.api_key".into()))
        .merge(env_provider())
}

/// `FRONTDESK_AI_API_KEY` maps to `ai.api_key`, not `ai.api.key`, so only
/// the section prefix is turned into a dot.
fn env_provider() -> Env {
    Env::prefixed("FRONTDESK_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("provider_", "provider.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("dashboard_", "dashboard.", 1)
            .replacen("ai_", "ai.", 1)
            .replacen("timing_", "timing.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reply_contract() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.timing.rule_reply_delay_ms, 1000);
        assert_eq!(config.timing.bootstrap_attempts, 3);
        assert_eq!(config.timing.bootstrap_limit, 50);
        assert!(config.ai.api_key.is_none());
        assert_eq!(config.dashboard.bind, "127.0.0.1:3000");
    }

    #[test]
    fn toml_overrides_sections() {
        let config = load_config_from_str(
            r#"
            [ai]
            api_key = "k"
            model = "gemini-pro"

            [timing]
            bootstrap_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.ai.api_key.as_deref(), Some("k"));
        assert_eq!(config.ai.model, "gemini-pro");
        assert_eq!(config.timing.bootstrap_attempts, 5);
        assert_eq!(config.timing.reply_jitter_max_ms, 4000);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = load_config_from_str("[ai]\napi_kee = \"typo\"\n").unwrap_err();
        assert!(err.to_string().contains("api_kee"));
    }

    #[test]
    fn env_vars_map_to_sections() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FRONTDESK_AI_API_KEY", "from-env");
            jail.set_env("FRONTDESK_DASHBOARD_BIND", "0.0.0.0:8080");
            let config = load_config()?;
            assert_eq!(config.ai.api_key.as_deref(), Some("from-env"));
            assert_eq!(config.dashboard.bind, "0.0.0.0:8080");
            Ok(())
        });
    }

    #[test]
    fn gemini_key_is_a_fallback() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("GEMINI_API_KEY", "gemini");
            let config = load_config()?;
            assert_eq!(config.ai.api_key.as_deref(), Some("gemini"));

            jail.set_env("FRONTDESK_AI_API_KEY", "explicit");
            let config = load_config()?;
            assert_eq!(config.ai.api_key.as_deref(), Some("explicit"));
            Ok(())
        });
    }

    #[test]
    fn explicit_file_is_read() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[provider]\nruntime = \"node\"\n")?;
            let config = load_config_from_path(Path::new("custom.toml"))?;
            assert_eq!(config.provider.runtime, "node");
            Ok(())
        });
    }
}
