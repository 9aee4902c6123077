//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.water/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::Provider;
use crate::inference::providers::{DEFAULT_GEMINI_BASE_URL, DEFAULT_OPENROUTER_BASE_URL};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct WaterConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub gemini: EndpointConfig,
    #[serde(default)]
    pub openrouter: EndpointConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub default_provider: Option<String>,
    pub default_model: Option<String>,
    pub system_prompt: Option<String>,
    pub system_prompt_file: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EndpointConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    pub data_dir: Option<String>,
    pub simulated_latency_ms: Option<u64>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_OPENROUTER_MODEL: &str = "google/gemini-2.5-pro";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Water IA, an expert Roblox developer. \
    You write Luau scripts for Roblox Studio: server Scripts, LocalScripts and ModuleScripts. \
    Always put code in a single ```lua fenced block per script and say where in the Explorer it belongs \
    (ServerScriptService, StarterPlayerScripts, a Part, and so on). \
    Prefer modern APIs such as task.wait and Players:GetPlayers, validate everything the client sends, \
    and keep explanations short and practical.";

fn water_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".water"))
}

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub provider: Provider,
    pub model_name: String,
    pub system_prompt: String,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub openrouter_api_key: Option<String>,
    pub openrouter_base_url: String,
    /// `None` disables the client-side timeout.
    pub request_timeout: Option<Duration>,
    pub data_dir: PathBuf,
    pub simulated_latency: Duration,
}

/// Values given on the command line. `None` = flag not passed.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub data_dir: Option<PathBuf>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.water/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    water_dir().map(|d| d.join("config.toml"))
}

/// Load config from `~/.water/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `WaterConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<WaterConfig, ConfigError> {
    let Some(path) = config_path() else {
        warn!("Could not determine home directory, using default config");
        return Ok(WaterConfig::default());
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(WaterConfig::default());
    }

    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<WaterConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: WaterConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

const DEFAULT_CONFIG_FILE: &str = r#"# Water Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# default_provider = "gemini"        # "gemini" or "openrouter"
# default_model = "gemini-2.5-pro"
# request_timeout_secs = 120         # 0 disables the timeout
# system_prompt = "You are Water IA, an expert Roblox developer."
# system_prompt_file = "system.md"   # Path relative to ~/.water/

# [gemini]
# api_key = "..."                    # Or set GEMINI_API_KEY env var
# base_url = "https://generativelanguage.googleapis.com/v1beta"

# [openrouter]
# api_key = "sk-or-..."              # Or set OPENROUTER_API_KEY env var
# base_url = "https://openrouter.ai/api/v1"

# [storage]
# data_dir = "~/.water"              # Users, scripts and water.log live here
# simulated_latency_ms = 0           # Artificial delay on library/auth calls
"#;

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, DEFAULT_CONFIG_FILE) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config from the process environment.
pub fn resolve(config: &WaterConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with(config, cli, |key| std::env::var(key).ok())
}

/// Resolve the final config by collapsing: defaults → config file → env → CLI.
///
/// `env` looks up environment variables so tests can supply their own.
pub fn resolve_with(
    config: &WaterConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    // Provider: CLI → env → config → default
    let provider = cli
        .provider
        .clone()
        .or_else(|| env("WATER_PROVIDER").and_then(|s| parse_provider(&s)))
        .or_else(|| {
            config
                .general
                .default_provider
                .as_deref()
                .and_then(parse_provider)
        })
        .unwrap_or_default();

    // Model: CLI → env → config → per-provider default
    let model_name = cli
        .model
        .clone()
        .or_else(|| env("WATER_MODEL"))
        .or_else(|| config.general.default_model.clone())
        .unwrap_or_else(|| default_model(&provider).to_string());

    let system_prompt = resolve_system_prompt(config, water_dir().as_deref());

    let gemini_api_key = env("GEMINI_API_KEY").or_else(|| config.gemini.api_key.clone());
    let gemini_base_url = env("GEMINI_BASE_URL")
        .or_else(|| config.gemini.base_url.clone())
        .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string());

    let openrouter_api_key =
        env("OPENROUTER_API_KEY").or_else(|| config.openrouter.api_key.clone());
    let openrouter_base_url = env("OPENROUTER_BASE_URL")
        .or_else(|| config.openrouter.base_url.clone())
        .unwrap_or_else(|| DEFAULT_OPENROUTER_BASE_URL.to_string());

    // Data dir: CLI → env → config → ~/.water → ./.water
    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| env("WATER_DATA_DIR").map(|s| expand_home(&s)))
        .or_else(|| config.storage.data_dir.as_deref().map(expand_home))
        .or_else(water_dir)
        .unwrap_or_else(|| PathBuf::from(".water"));

    let timeout_secs = config
        .general
        .request_timeout_secs
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

    ResolvedConfig {
        provider,
        model_name,
        system_prompt,
        gemini_api_key,
        gemini_base_url,
        openrouter_api_key,
        openrouter_base_url,
        request_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        data_dir,
        simulated_latency: Duration::from_millis(
            config.storage.simulated_latency_ms.unwrap_or(0),
        ),
    }
}

pub fn default_model(provider: &Provider) -> &'static str {
    match provider {
        Provider::Gemini => DEFAULT_GEMINI_MODEL,
        Provider::OpenRouter => DEFAULT_OPENROUTER_MODEL,
    }
}

/// Accepts `gemini`, `openrouter`, `open-router` and `open_router`, any case.
fn parse_provider(name: &str) -> Option<Provider> {
    let normalized: String = name
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .collect::<String>()
        .to_ascii_lowercase();
    match normalized.as_str() {
        "gemini" => Some(Provider::Gemini),
        "openrouter" => Some(Provider::OpenRouter),
        _ => {
            warn!("Unknown provider '{name}', ignoring");
            None
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Resolves the system prompt: inline wins over file, both win over default.
/// `base` is the directory `system_prompt_file` is relative to.
fn resolve_system_prompt(config: &WaterConfig, base: Option<&Path>) -> String {
    if let Some(ref prompt) = config.general.system_prompt {
        return prompt.clone();
    }

    if let Some(ref file) = config.general.system_prompt_file
        && let Some(base) = base
    {
        let prompt_path = base.join(file);
        match fs::read_to_string(&prompt_path) {
            Ok(contents) => {
                let trimmed = contents.trim().to_string();
                if !trimmed.is_empty() {
                    info!("Loaded system prompt from {}", prompt_path.display());
                    return trimmed;
                }
                warn!("System prompt file is empty: {}", prompt_path.display());
            }
            Err(e) => {
                warn!(
                    "Failed to read system prompt file {}: {}",
                    prompt_path.display(),
                    e
                );
            }
        }
    }

    DEFAULT_SYSTEM_PROMPT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let resolved = resolve_with(&WaterConfig::default(), &CliOverrides::default(), no_env);
        assert_eq!(resolved.provider, Provider::Gemini);
        assert_eq!(resolved.model_name, DEFAULT_GEMINI_MODEL);
        assert_eq!(resolved.gemini_base_url, DEFAULT_GEMINI_BASE_URL);
        assert_eq!(resolved.request_timeout, Some(Duration::from_secs(120)));
        assert_eq!(resolved.simulated_latency, Duration::ZERO);
        assert!(resolved.gemini_api_key.is_none());
        assert!(resolved.system_prompt.starts_with("You are Water IA"));
    }

    #[test]
    fn test_default_model_follows_provider() {
        let cli = CliOverrides {
            provider: Some(Provider::OpenRouter),
            ..Default::default()
        };
        let resolved = resolve_with(&WaterConfig::default(), &cli, no_env);
        assert_eq!(resolved.model_name, DEFAULT_OPENROUTER_MODEL);
    }

    #[test]
    fn test_layering_file_then_env_then_cli() {
        let config: WaterConfig = toml::from_str(
            r#"
[general]
default_provider = "openrouter"
default_model = "file-model"

[gemini]
api_key = "file-key"

[storage]
data_dir = "/tmp/from-file"
"#,
        )
        .unwrap();

        // File only
        let resolved = resolve_with(&config, &CliOverrides::default(), no_env);
        assert_eq!(resolved.provider, Provider::OpenRouter);
        assert_eq!(resolved.model_name, "file-model");
        assert_eq!(resolved.gemini_api_key.as_deref(), Some("file-key"));
        assert_eq!(resolved.data_dir, PathBuf::from("/tmp/from-file"));

        // Env beats file
        let env = env_from(&[
            ("WATER_PROVIDER", "gemini"),
            ("WATER_MODEL", "env-model"),
            ("GEMINI_API_KEY", "env-key"),
            ("WATER_DATA_DIR", "/tmp/from-env"),
        ]);
        let resolved = resolve_with(&config, &CliOverrides::default(), &env);
        assert_eq!(resolved.provider, Provider::Gemini);
        assert_eq!(resolved.model_name, "env-model");
        assert_eq!(resolved.gemini_api_key.as_deref(), Some("env-key"));
        assert_eq!(resolved.data_dir, PathBuf::from("/tmp/from-env"));

        // CLI beats env
        let cli = CliOverrides {
            provider: Some(Provider::OpenRouter),
            model: Some("cli-model".to_string()),
            data_dir: Some(PathBuf::from("/tmp/from-cli")),
        };
        let resolved = resolve_with(&config, &cli, &env);
        assert_eq!(resolved.provider, Provider::OpenRouter);
        assert_eq!(resolved.model_name, "cli-model");
        assert_eq!(resolved.data_dir, PathBuf::from("/tmp/from-cli"));
    }

    #[test]
    fn test_unknown_provider_falls_through() {
        let env = env_from(&[("WATER_PROVIDER", "lmstudio")]);
        let resolved = resolve_with(&WaterConfig::default(), &CliOverrides::default(), env);
        assert_eq!(resolved.provider, Provider::Gemini);
    }

    #[test]
    fn test_provider_spellings() {
        assert_eq!(parse_provider("OpenRouter"), Some(Provider::OpenRouter));
        assert_eq!(parse_provider("open-router"), Some(Provider::OpenRouter));
        assert_eq!(parse_provider("GEMINI"), Some(Provider::Gemini));
        assert_eq!(parse_provider("claude"), None);
    }

    #[test]
    fn test_zero_timeout_disables_it() {
        let config = WaterConfig {
            general: GeneralConfig {
                request_timeout_secs: Some(0),
                ..Default::default()
            },
            storage: StorageConfig {
                simulated_latency_ms: Some(600),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = resolve_with(&config, &CliOverrides::default(), no_env);
        assert_eq!(resolved.request_timeout, None);
        assert_eq!(resolved.simulated_latency, Duration::from_millis(600));
    }

    #[test]
    fn test_sparse_toml_parses() {
        let config: WaterConfig = toml::from_str(
            r#"
[openrouter]
base_url = "http://localhost:9000"
"#,
        )
        .unwrap();
        assert_eq!(
            config.openrouter.base_url.as_deref(),
            Some("http://localhost:9000")
        );
        assert!(config.general.default_model.is_none());
        assert!(config.storage.data_dir.is_none());
    }

    #[test]
    fn test_generated_default_is_valid_toml() {
        let config: WaterConfig = toml::from_str(DEFAULT_CONFIG_FILE).unwrap();
        assert!(config.general.default_provider.is_none());
    }

    #[test]
    fn test_generate_and_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        generate_default_config(&path);
        assert!(path.exists());
        let config = load_config_from(&path).unwrap();
        assert!(config.gemini.api_key.is_none());

        fs::write(&path, "[general\nbroken").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_system_prompt_file_and_inline_precedence() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("system.md"), "  From file.  \n").unwrap();

        let mut config = WaterConfig {
            general: GeneralConfig {
                system_prompt_file: Some("system.md".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(resolve_system_prompt(&config, Some(dir.path())), "From file.");

        config.general.system_prompt = Some("Inline wins.".to_string());
        assert_eq!(resolve_system_prompt(&config, Some(dir.path())), "Inline wins.");

        config.general.system_prompt = None;
        config.general.system_prompt_file = Some("missing.md".to_string());
        assert_eq!(
            resolve_system_prompt(&config, Some(dir.path())),
            DEFAULT_SYSTEM_PROMPT
        );
    }
}
