use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub console: ConsoleConfig,
    pub fund: FundConfig,
    pub agents: AgentsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ConsoleConfig {
    pub greeting: String,
    pub concierge_checkout_url: String,
    pub addon_checkout_url: String,
    pub sheets_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct FundConfig {
    pub pro_fund_percentage: Decimal,
    pub pro_fund_threshold: Decimal,
    pub conversion_count_threshold: u64,
    pub time_window_days: u32,
}

#[derive(Clone, Debug)]
pub struct AgentsConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub support_agent_id: String,
    pub approval_agent_id: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub agents_base_url: Option<String>,
    pub agents_api_key: Option<String>,
    pub support_agent_id: Option<String>,
    pub approval_agent_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            console: ConsoleConfig {
                greeting: "Welcome to Corey Support! How can I help you today?".to_string(),
                concierge_checkout_url: "https://checkout.stripe.com/concierge-setup".to_string(),
                addon_checkout_url: "https://checkout.stripe.com/addon-pack".to_string(),
                sheets_url: None,
            },
            fund: FundConfig {
                pro_fund_percentage: Decimal::from(20),
                pro_fund_threshold: Decimal::from(120),
                conversion_count_threshold: 3,
                time_window_days: 14,
            },
            agents: AgentsConfig {
                base_url: "http://localhost:8090".to_string(),
                api_key: None,
                support_agent_id: "69988c23bf6ce2c35b435ab9".to_string(),
                approval_agent_id: "69988c245d2326ad4d26cbc6".to_string(),
                timeout_secs: 30,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("corey.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(console) = patch.console {
            if let Some(greeting) = console.greeting {
                self.console.greeting = greeting;
            }
            if let Some(concierge_checkout_url) = console.concierge_checkout_url {
                self.console.concierge_checkout_url = concierge_checkout_url;
            }
            if let Some(addon_checkout_url) = console.addon_checkout_url {
                self.console.addon_checkout_url = addon_checkout_url;
            }
            if let Some(sheets_url) = console.sheets_url {
                self.console.sheets_url = Some(sheets_url);
            }
        }

        if let Some(fund) = patch.fund {
            if let Some(pro_fund_percentage) = fund.pro_fund_percentage {
                self.fund.pro_fund_percentage = pro_fund_percentage;
            }
            if let Some(pro_fund_threshold) = fund.pro_fund_threshold {
                self.fund.pro_fund_threshold = pro_fund_threshold;
            }
            if let Some(conversion_count_threshold) = fund.conversion_count_threshold {
                self.fund.conversion_count_threshold = conversion_count_threshold;
            }
            if let Some(time_window_days) = fund.time_window_days {
                self.fund.time_window_days = time_window_days;
            }
        }

        if let Some(agents) = patch.agents {
            if let Some(base_url) = agents.base_url {
                self.agents.base_url = base_url;
            }
            if let Some(api_key_value) = agents.api_key {
                self.agents.api_key = Some(secret_value(api_key_value));
            }
            if let Some(support_agent_id) = agents.support_agent_id {
                self.agents.support_agent_id = support_agent_id;
            }
            if let Some(approval_agent_id) = agents.approval_agent_id {
                self.agents.approval_agent_id = approval_agent_id;
            }
            if let Some(timeout_secs) = agents.timeout_secs {
                self.agents.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COREY_CONSOLE_GREETING") {
            self.console.greeting = value;
        }
        if let Some(value) = read_env("COREY_CONSOLE_CONCIERGE_CHECKOUT_URL") {
            self.console.concierge_checkout_url = value;
        }
        if let Some(value) = read_env("COREY_CONSOLE_ADDON_CHECKOUT_URL") {
            self.console.addon_checkout_url = value;
        }
        if let Some(value) = read_env("COREY_CONSOLE_SHEETS_URL") {
            self.console.sheets_url = Some(value);
        }

        if let Some(value) = read_env("COREY_FUND_PERCENTAGE") {
            self.fund.pro_fund_percentage = parse_decimal("COREY_FUND_PERCENTAGE", &value)?;
        }
        if let Some(value) = read_env("COREY_FUND_THRESHOLD") {
            self.fund.pro_fund_threshold = parse_decimal("COREY_FUND_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("COREY_FUND_CONVERSION_THRESHOLD") {
            self.fund.conversion_count_threshold =
                parse_u64("COREY_FUND_CONVERSION_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("COREY_FUND_TIME_WINDOW_DAYS") {
            self.fund.time_window_days = parse_u32("COREY_FUND_TIME_WINDOW_DAYS", &value)?;
        }

        if let Some(value) = read_env("COREY_AGENTS_BASE_URL") {
            self.agents.base_url = value;
        }
        if let Some(value) = read_env("COREY_AGENTS_API_KEY") {
            self.agents.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("COREY_AGENTS_SUPPORT_AGENT_ID") {
            self.agents.support_agent_id = value;
        }
        if let Some(value) = read_env("COREY_AGENTS_APPROVAL_AGENT_ID") {
            self.agents.approval_agent_id = value;
        }
        if let Some(value) = read_env("COREY_AGENTS_TIMEOUT_SECS") {
            self.agents.timeout_secs = parse_u64("COREY_AGENTS_TIMEOUT_SECS", &value)?;
        }

        let log_level = read_env("COREY_LOGGING_LEVEL").or_else(|| read_env("COREY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("COREY_LOGGING_FORMAT").or_else(|| read_env("COREY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(base_url) = overrides.agents_base_url {
            self.agents.base_url = base_url;
        }
        if let Some(api_key) = overrides.agents_api_key {
            self.agents.api_key = Some(secret_value(api_key));
        }
        if let Some(support_agent_id) = overrides.support_agent_id {
            self.agents.support_agent_id = support_agent_id;
        }
        if let Some(approval_agent_id) = overrides.approval_agent_id {
            self.agents.approval_agent_id = approval_agent_id;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_fund(&self.fund)?;
        validate_agents(&self.agents)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("corey.toml"), PathBuf::from("config/corey.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_fund(fund: &FundConfig) -> Result<(), ConfigError> {
    if fund.pro_fund_percentage < Decimal::ZERO || fund.pro_fund_percentage > Decimal::from(100) {
        return Err(ConfigError::Validation(
            "fund.pro_fund_percentage must be in range 0..=100".to_string(),
        ));
    }

    if fund.pro_fund_threshold < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "fund.pro_fund_threshold must not be negative".to_string(),
        ));
    }

    if fund.time_window_days == 0 {
        return Err(ConfigError::Validation(
            "fund.time_window_days must be at least 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_agents(agents: &AgentsConfig) -> Result<(), ConfigError> {
    let base_url = agents.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "agents.base_url must start with http:// or https://".to_string(),
        ));
    }

    if agents.support_agent_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "agents.support_agent_id is required".to_string(),
        ));
    }
    if agents.approval_agent_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "agents.approval_agent_id is required".to_string(),
        ));
    }

    if let Some(api_key) = &agents.api_key {
        if api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "agents.api_key must not be blank when set".to_string(),
            ));
        }
    }

    if agents.timeout_secs == 0 || agents.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "agents.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    console: Option<ConsolePatch>,
    fund: Option<FundPatch>,
    agents: Option<AgentsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ConsolePatch {
    greeting: Option<String>,
    concierge_checkout_url: Option<String>,
    addon_checkout_url: Option<String>,
    sheets_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FundPatch {
    pro_fund_percentage: Option<Decimal>,
    pro_fund_threshold: Option<Decimal>,
    conversion_count_threshold: Option<u64>,
    time_window_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentsPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    support_agent_id: Option<String>,
    approval_agent_id: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate_cleanly() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;
        ensure(
            config.fund.pro_fund_percentage == Decimal::from(20),
            "default fund percentage should be 20",
        )?;
        ensure(config.fund.conversion_count_threshold == 3, "default conversion threshold is 3")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_COREY_API_KEY", "key-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("corey.toml");
            fs::write(
                &path,
                r#"
[agents]
api_key = "${TEST_COREY_API_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let api_key = config
                .agents
                .api_key
                .ok_or_else(|| "api key should be present".to_string())?;
            ensure(
                api_key.expose_secret() == "key-from-env",
                "api key should be loaded from environment",
            )
        })();

        clear_vars(&["TEST_COREY_API_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COREY_LOG_LEVEL", "warn");
        env::set_var("COREY_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warn log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["COREY_LOG_LEVEL", "COREY_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COREY_AGENTS_BASE_URL", "http://agents-from-env:8090");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("corey.toml");
            fs::write(
                &path,
                r#"
[agents]
base_url = "http://agents-from-file:8090"
support_agent_id = "support-from-file"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.agents.base_url == "http://agents-from-env:8090",
                "env base url should win over file and defaults",
            )?;
            ensure(
                config.agents.support_agent_id == "support-from-file",
                "file agent id should win over defaults",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")
        })();

        clear_vars(&["COREY_AGENTS_BASE_URL"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COREY_AGENTS_BASE_URL", "agents.example.com");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("agents.base_url")
            );
            ensure(has_message, "validation failure should mention agents.base_url")
        })();

        clear_vars(&["COREY_AGENTS_BASE_URL"]);
        result
    }

    #[test]
    fn fund_percentage_outside_range_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COREY_FUND_PERCENTAGE", "130");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected validation failure".to_string()),
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("pro_fund_percentage")
            );
            ensure(has_message, "validation failure should mention pro_fund_percentage")
        })();

        clear_vars(&["COREY_FUND_PERCENTAGE"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COREY_AGENTS_API_KEY", "corey-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("corey-secret-value"),
                "debug output should not contain the agent api key",
            )
        })();

        clear_vars(&["COREY_AGENTS_API_KEY"]);
        result
    }
}
