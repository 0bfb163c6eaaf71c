use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::client::EndpointSettings;
use crate::error::SpecError;
use crate::markdown::RenderOptions;

// Precedence: CLI > env > file > defaults.

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_API_KEY_ENV: &str = "API_KEY";

const ENV_PREFIX: &str = "SITESPEC_";

/// Resolved configuration for one invocation.
///
/// Built from three layers with precedence CLI > env > file > defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitespecConfig {
    pub model: String,
    pub api_base: String,
    /// Name of the environment variable holding the endpoint credential.
    pub api_key_env: String,
    /// Per-request timeout. When None the HTTP client's default applies.
    pub request_timeout_sec: Option<u64>,
    /// Escape HTML-significant characters when rendering generated text.
    pub escape_html: bool,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

/// Values given on the command line. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub request_timeout_sec: Option<u64>,
    pub escape_html: bool,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

/// TOML-deserializable config file representation. All fields optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    model: Option<String>,
    api_base: Option<String>,
    api_key_env: Option<String>,
    request_timeout_sec: Option<u64>,
    escape_html: Option<bool>,
    log_level: Option<String>,
    log_file: Option<PathBuf>,
}

/// Intermediate layer where every field is optional, used to merge sources.
#[derive(Debug, Default)]
struct ConfigLayer {
    model: Option<String>,
    api_base: Option<String>,
    api_key_env: Option<String>,
    request_timeout_sec: Option<u64>,
    escape_html: Option<bool>,
    log_level: Option<String>,
    log_file: Option<PathBuf>,
}

impl SitespecConfig {
    /// Load configuration with precedence: CLI > env > file > defaults.
    pub fn load(config_path: Option<&Path>, cli: &ConfigOverrides) -> anyhow::Result<Self> {
        Self::load_with_env(config_path, cli, real_env_var)
    }

    /// Internal constructor that accepts an env-var lookup function,
    /// enabling deterministic testing without process-global mutation.
    fn load_with_env(
        config_path: Option<&Path>,
        cli: &ConfigOverrides,
        env_fn: fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let file_layer = match config_path {
            Some(path) => load_file_layer(path)?,
            None => ConfigLayer::default(),
        };
        let env_layer = load_env_layer(env_fn)?;
        let cli_layer = cli_layer_from(cli);

        let merged = merge_layers(file_layer, env_layer, cli_layer);

        Ok(SitespecConfig {
            model: merged.model.unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            api_base: merged
                .api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_owned()),
            api_key_env: merged
                .api_key_env
                .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_owned()),
            request_timeout_sec: merged.request_timeout_sec,
            escape_html: merged.escape_html.unwrap_or(false),
            log_level: merged.log_level,
            log_file: merged.log_file,
        })
    }

    /// Reject values that would only fail later at request time.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.model.trim().is_empty() {
            return Err(SpecError::InvalidSetting {
                key: "model".to_owned(),
                value: self.model.clone(),
                reason: "must not be empty".to_owned(),
            });
        }
        if !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://")) {
            return Err(SpecError::InvalidSetting {
                key: "api_base".to_owned(),
                value: self.api_base.clone(),
                reason: "expected an http:// or https:// URL".to_owned(),
            });
        }
        if self.request_timeout_sec == Some(0) {
            return Err(SpecError::InvalidSetting {
                key: "request_timeout_sec".to_owned(),
                value: "0".to_owned(),
                reason: "must be greater than zero".to_owned(),
            });
        }
        Ok(())
    }

    pub fn endpoint_settings(&self) -> EndpointSettings {
        EndpointSettings {
            api_base: self.api_base.clone(),
            model: self.model.clone(),
            timeout: self.request_timeout_sec.map(Duration::from_secs),
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            escape_html: self.escape_html,
        }
    }

    /// Read the endpoint credential. Missing or empty is fatal for
    /// anything that talks to the endpoint.
    pub fn resolve_api_key(&self) -> Result<String, SpecError> {
        resolve_api_key_with(&self.api_key_env, |name| env::var(name).ok())
    }
}

fn resolve_api_key_with(
    var: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, SpecError> {
    lookup(var)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SpecError::MissingApiKey {
            var: var.to_owned(),
        })
}

fn load_file_layer(path: &Path) -> anyhow::Result<ConfigLayer> {
    let contents = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
    let fc: FileConfig = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))?;
    Ok(ConfigLayer {
        model: fc.model,
        api_base: fc.api_base,
        api_key_env: fc.api_key_env,
        request_timeout_sec: fc.request_timeout_sec,
        escape_html: fc.escape_html,
        log_level: fc.log_level,
        log_file: fc.log_file,
    })
}

fn real_env_var(suffix: &str) -> Option<String> {
    let key = format!("{ENV_PREFIX}{suffix}");
    env::var(&key).ok().filter(|v| !v.is_empty())
}

fn load_env_layer(env_fn: fn(&str) -> Option<String>) -> Result<ConfigLayer, SpecError> {
    Ok(ConfigLayer {
        model: env_fn("MODEL"),
        api_base: env_fn("API_BASE"),
        api_key_env: env_fn("API_KEY_ENV"),
        request_timeout_sec: parse_env(env_fn, "REQUEST_TIMEOUT_SEC")?,
        escape_html: parse_env(env_fn, "ESCAPE_HTML")?,
        log_level: env_fn("LOG_LEVEL"),
        log_file: env_fn("LOG_FILE").map(PathBuf::from),
    })
}

fn parse_env<T>(env_fn: fn(&str) -> Option<String>, suffix: &str) -> Result<Option<T>, SpecError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_fn(suffix) {
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|e| SpecError::ConfigEnvParseError {
                var: format!("{ENV_PREFIX}{suffix}"),
                detail: e.to_string(),
            }),
        None => Ok(None),
    }
}

fn cli_layer_from(cli: &ConfigOverrides) -> ConfigLayer {
    ConfigLayer {
        model: cli.model.clone(),
        api_base: cli.api_base.clone(),
        api_key_env: None,
        request_timeout_sec: cli.request_timeout_sec,
        escape_html: if cli.escape_html { Some(true) } else { None },
        log_level: cli.log_level.clone(),
        log_file: cli.log_file.clone(),
    }
}

/// Merge three layers. For each field, pick CLI first, then env, then file.
fn merge_layers(file: ConfigLayer, env: ConfigLayer, cli: ConfigLayer) -> ConfigLayer {
    ConfigLayer {
        model: cli.model.or(env.model).or(file.model),
        api_base: cli.api_base.or(env.api_base).or(file.api_base),
        api_key_env: cli.api_key_env.or(env.api_key_env).or(file.api_key_env),
        request_timeout_sec: cli
            .request_timeout_sec
            .or(env.request_timeout_sec)
            .or(file.request_timeout_sec),
        escape_html: cli.escape_html.or(env.escape_html).or(file.escape_html),
        log_level: cli.log_level.or(env.log_level).or(file.log_level),
        log_file: cli.log_file.or(env.log_file).or(file.log_file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_suffix: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_applied_when_nothing_set() {
        let cfg =
            SitespecConfig::load_with_env(None, &ConfigOverrides::default(), no_env).unwrap();
        assert_eq!(cfg.model, DEFAULT_MODEL);
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.api_key_env, "API_KEY");
        assert_eq!(cfg.request_timeout_sec, None);
        assert!(!cfg.escape_html);
        assert!(cfg.log_level.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn loads_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join("sitespec.toml");
        fs::write(
            &cfg_path,
            r#"
model = "gemini-2.5-pro"
api_base = "http://localhost:8080/v1beta"
api_key_env = "GEMINI_KEY"
request_timeout_sec = 120
escape_html = true
log_level = "debug"
log_file = "logs/sitespec.log"
"#,
        )
        .unwrap();

        let cfg = SitespecConfig::load_with_env(
            Some(&cfg_path),
            &ConfigOverrides::default(),
            no_env,
        )
        .unwrap();
        assert_eq!(cfg.model, "gemini-2.5-pro");
        assert_eq!(cfg.api_base, "http://localhost:8080/v1beta");
        assert_eq!(cfg.api_key_env, "GEMINI_KEY");
        assert_eq!(cfg.request_timeout_sec, Some(120));
        assert!(cfg.escape_html);
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.log_file, Some(PathBuf::from("logs/sitespec.log")));
    }

    #[test]
    fn full_precedence_chain() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join("sitespec.toml");
        fs::write(
            &cfg_path,
            r#"
model = "file-model"
api_base = "https://file.example/v1beta"
log_level = "warn"
"#,
        )
        .unwrap();

        fn fake_env(suffix: &str) -> Option<String> {
            match suffix {
                "MODEL" => Some("env-model".to_owned()),
                "API_BASE" => Some("https://env.example/v1beta".to_owned()),
                _ => None,
            }
        }

        let cli = ConfigOverrides {
            model: Some("cli-model".to_owned()),
            ..Default::default()
        };
        let cfg = SitespecConfig::load_with_env(Some(&cfg_path), &cli, fake_env).unwrap();

        assert_eq!(cfg.model, "cli-model", "CLI > env > file");
        assert_eq!(cfg.api_base, "https://env.example/v1beta", "env > file");
        assert_eq!(cfg.log_level.as_deref(), Some("warn"), "file used when no env/cli");
    }

    #[test]
    fn escape_flag_from_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join("sitespec.toml");
        fs::write(&cfg_path, "escape_html = false\n").unwrap();

        let cli = ConfigOverrides {
            escape_html: true,
            ..Default::default()
        };
        let cfg = SitespecConfig::load_with_env(Some(&cfg_path), &cli, no_env).unwrap();
        assert!(cfg.escape_html);
        assert!(cfg.render_options().escape_html);
    }

    #[test]
    fn invalid_env_var_returns_error() {
        fn fake_env(suffix: &str) -> Option<String> {
            (suffix == "REQUEST_TIMEOUT_SEC").then(|| "soon".to_owned())
        }

        let err = SitespecConfig::load_with_env(None, &ConfigOverrides::default(), fake_env)
            .unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Failed to parse environment variable"), "unexpected: {msg}");
        assert!(msg.contains("SITESPEC_REQUEST_TIMEOUT_SEC"), "unexpected: {msg}");
    }

    #[test]
    fn invalid_env_bool_returns_error() {
        fn fake_env(suffix: &str) -> Option<String> {
            (suffix == "ESCAPE_HTML").then(|| "yes".to_owned())
        }

        let err = SitespecConfig::load_with_env(None, &ConfigOverrides::default(), fake_env)
            .unwrap_err();
        assert!(format!("{err}").contains("SITESPEC_ESCAPE_HTML"));
    }

    #[test]
    fn unknown_toml_key_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join("sitespec.toml");
        fs::write(&cfg_path, "api_key = \"do-not-store-here\"\n").unwrap();

        let result =
            SitespecConfig::load_with_env(Some(&cfg_path), &ConfigOverrides::default(), no_env);
        assert!(result.is_err(), "unknown keys must be rejected");
    }

    #[test]
    fn missing_config_file_returns_error() {
        let result = SitespecConfig::load_with_env(
            Some(Path::new("/nonexistent/sitespec.toml")),
            &ConfigOverrides::default(),
            no_env,
        );
        let msg = format!("{}", result.unwrap_err());
        assert!(msg.contains("failed to read config file"), "unexpected: {msg}");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let base =
            SitespecConfig::load_with_env(None, &ConfigOverrides::default(), no_env).unwrap();

        let cfg = SitespecConfig {
            api_base: "generativelanguage.googleapis.com".to_owned(),
            ..base.clone()
        };
        assert!(matches!(
            cfg.validate(),
            Err(SpecError::InvalidSetting { ref key, .. }) if key == "api_base"
        ));

        let cfg = SitespecConfig {
            model: "  ".to_owned(),
            ..base.clone()
        };
        assert!(cfg.validate().is_err());

        let cfg = SitespecConfig {
            request_timeout_sec: Some(0),
            ..base
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn endpoint_settings_carry_timeout() {
        let cli = ConfigOverrides {
            request_timeout_sec: Some(45),
            ..Default::default()
        };
        let cfg = SitespecConfig::load_with_env(None, &cli, no_env).unwrap();
        let settings = cfg.endpoint_settings();
        assert_eq!(settings.timeout, Some(Duration::from_secs(45)));
        assert_eq!(settings.model, DEFAULT_MODEL);
    }

    #[test]
    fn api_key_missing_or_blank_is_fatal() {
        let err = resolve_api_key_with("API_KEY", |_| None).unwrap_err();
        assert_eq!(err.to_string(), "API_KEY environment variable not set.");

        let err = resolve_api_key_with("API_KEY", |_| Some("   ".to_owned())).unwrap_err();
        assert!(matches!(err, SpecError::MissingApiKey { .. }));
    }

    #[test]
    fn api_key_read_from_named_variable() {
        let key = resolve_api_key_with("GEMINI_KEY", |name| {
            (name == "GEMINI_KEY").then(|| "secret".to_owned())
        })
        .unwrap();
        assert_eq!(key, "secret");
    }
}
