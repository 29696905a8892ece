// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tenderboard_app::{local_offset_or_utc, parse_utc_offset};
use time::UtcOffset;
use tracing_subscriber::EnvFilter;
use url::Url;

pub const APP_NAME: &str = "tenderboard";
pub const CONFIG_PATH_ENV: &str = "TENDERBOARD_CONFIG_PATH";
pub const API_BASE_URL_ENV: &str = "TENDERBOARD_API_BASE_URL";

const CONFIG_VERSION: i64 = 1;
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TIMEOUT: &str = "15s";
const DEFAULT_REDIRECT_URL: &str = "https://redtender.operator.kg/admin/login/?next=/admin/";
const DEFAULT_SKELETON_CARDS: usize = 5;
const MAX_SKELETON_CARDS: i64 = 20;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub portal: Portal,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            portal: Portal::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Portal {
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub skeleton_cards: Option<i64>,
    pub utc_offset: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [api], [portal], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.api.base_url {
            http_url(base_url).with_context(|| format!("api.base_url in {}", path.display()))?;
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(redirect_url) = &self.portal.redirect_url {
            http_url(redirect_url)
                .with_context(|| format!("portal.redirect_url in {}", path.display()))?;
        }

        if let Some(cards) = self.ui.skeleton_cards
            && !(1..=MAX_SKELETON_CARDS).contains(&cards)
        {
            bail!(
                "ui.skeleton_cards in {} must be between 1 and {MAX_SKELETON_CARDS}, got {cards}",
                path.display()
            );
        }

        if let Some(offset) = &self.ui.utc_offset
            && parse_utc_offset(offset).is_none()
        {
            bail!(
                "ui.utc_offset in {} must look like +06:00 or -03:30, got {offset:?}",
                path.display()
            );
        }

        if let Some(level) = &self.log.level {
            EnvFilter::try_new(level).with_context(|| {
                format!("log.level in {} is not a valid filter: {level:?}", path.display())
            })?;
        }

        Ok(())
    }

    /// `TENDERBOARD_API_BASE_URL` wins over `[api].base_url`.
    pub fn api_base_url(&self) -> String {
        if let Ok(value) = env::var(API_BASE_URL_ENV)
            && !value.trim().is_empty()
        {
            return value.trim().to_owned();
        }
        self.api
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim()
            .to_owned()
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn redirect_url(&self) -> Result<Url> {
        http_url(
            self.portal
                .redirect_url
                .as_deref()
                .unwrap_or(DEFAULT_REDIRECT_URL),
        )
    }

    pub fn skeleton_cards(&self) -> usize {
        self.ui
            .skeleton_cards
            .and_then(|cards| usize::try_from(cards).ok())
            .unwrap_or(DEFAULT_SKELETON_CARDS)
    }

    /// Must be called before any other thread exists; the local offset is
    /// unavailable afterwards on most Unix platforms.
    pub fn utc_offset(&self) -> UtcOffset {
        self.ui
            .utc_offset
            .as_deref()
            .and_then(parse_utc_offset)
            .unwrap_or_else(local_offset_or_utc)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        match &self.log.file {
            Some(path) => Ok(PathBuf::from(path)),
            None => {
                let data_root = dirs::data_dir().ok_or_else(|| {
                    anyhow!("cannot resolve data directory; set [log].file in the config")
                })?;
                Ok(data_root.join(APP_NAME).join("tenderboard.log"))
            }
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# tenderboard config\n# Place this file at: {}\n\nversion = 1\n\n[api]\n# Overridden by {API_BASE_URL_ENV} when set.\nbase_url = \"{DEFAULT_API_BASE_URL}\"\n# <N>ms, <N>s or <N>m\ntimeout = \"{DEFAULT_TIMEOUT}\"\n\n[portal]\n# Every login, my bids, users, settings and card link opens this page.\nredirect_url = \"{DEFAULT_REDIRECT_URL}\"\n\n[ui]\nskeleton_cards = {DEFAULT_SKELETON_CARDS}\n# Optional. Default is the local offset, falling back to UTC.\n# utc_offset = \"+06:00\"\n\n[log]\n# RUST_LOG takes precedence when set.\nlevel = \"{DEFAULT_LOG_LEVEL}\"\n# Optional. Default is the platform data dir (for example ~/.local/share/tenderboard/tenderboard.log)\n# file = \"/absolute/path/to/tenderboard.log\"\n",
            path.display(),
        )
    }
}

fn http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid URL {raw:?}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("URL {raw:?} must use http or https");
    }
    Ok(url)
}

fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 15s)")
}

#[cfg(test)]
mod tests {
    use super::{API_BASE_URL_ENV, CONFIG_PATH_ENV, Config, parse_duration};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;
    use time::macros::offset;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.api_timeout()?, Duration::from_secs(15));
        assert_eq!(config.skeleton_cards(), 5);
        assert_eq!(config.log_level(), "info");
        assert_eq!(
            config.redirect_url()?.as_str(),
            "https://redtender.operator.kg/admin/login/?next=/admin/"
        );
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[api]\nbase_url = \"http://localhost:8000\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[api], [portal], [ui], and [log]"));
        Ok(())
    }

    #[test]
    fn v1_config_parses() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var(API_BASE_URL_ENV);
        }
        let (_temp, path) = write_config(
            "version = 1\n[api]\nbase_url = \"https://tenders.example.kg/\"\ntimeout = \"2500ms\"\n[portal]\nredirect_url = \"https://portal.example.kg/admin/\"\n[ui]\nskeleton_cards = 3\nutc_offset = \"+06:00\"\n[log]\nlevel = \"debug\"\nfile = \"/tmp/tenderboard-test.log\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.api_base_url(), "https://tenders.example.kg/");
        assert_eq!(config.api_timeout()?, Duration::from_millis(2500));
        assert_eq!(
            config.redirect_url()?.as_str(),
            "https://portal.example.kg/admin/"
        );
        assert_eq!(config.skeleton_cards(), 3);
        assert_eq!(config.utc_offset(), offset!(+6));
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.log_file()?, PathBuf::from("/tmp/tenderboard-test.log"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn non_http_urls_are_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[api]\nbase_url = \"ftp://files.example\"\n")?;
        let error = Config::load(&path).expect_err("ftp base url should fail");
        assert!(format!("{error:#}").contains("must use http or https"));

        let (_temp, path) = write_config("version = 1\n[portal]\nredirect_url = \"/admin/\"\n")?;
        let error = Config::load(&path).expect_err("relative redirect should fail");
        assert!(format!("{error:#}").contains("portal.redirect_url"));
        Ok(())
    }

    #[test]
    fn timeout_rejects_zero_and_garbage() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[api]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));

        let (_temp, path) = write_config("version = 1\n[api]\ntimeout = \"soon\"\n")?;
        let error = Config::load(&path).expect_err("garbage timeout should fail");
        assert!(error.to_string().contains("invalid duration"));
        Ok(())
    }

    #[test]
    fn skeleton_cards_and_offset_are_validated() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\nskeleton_cards = 0\n")?;
        let error = Config::load(&path).expect_err("zero cards should fail");
        assert!(error.to_string().contains("between 1 and 20"));

        let (_temp, path) = write_config("version = 1\n[ui]\nutc_offset = \"Asia/Bishkek\"\n")?;
        let error = Config::load(&path).expect_err("zone names are not offsets");
        assert!(error.to_string().contains("ui.utc_offset"));
        Ok(())
    }

    #[test]
    fn invalid_log_level_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[log]\nlevel = \"tenderboard=loud\"\n")?;
        let error = Config::load(&path).expect_err("bad filter should fail");
        assert!(error.to_string().contains("log.level"));
        Ok(())
    }

    #[test]
    fn base_url_env_override_wins() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) =
            write_config("version = 1\n[api]\nbase_url = \"http://from-config:8000\"\n")?;
        let config = Config::load(&path)?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(API_BASE_URL_ENV, " http://from-env:9000 ");
        }
        let resolved = config.api_base_url();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(API_BASE_URL_ENV);
        }
        assert_eq!(resolved, "http://from-env:9000");
        assert_eq!(config.api_base_url(), "http://from-config:8000");
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn default_path_uses_config_toml_suffix_when_no_env_override() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        let path = Config::default_path()?;
        assert!(path.ends_with("tenderboard/config.toml"));
        Ok(())
    }

    #[test]
    fn durations_parse_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("15s")?, Duration::from_secs(15));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        Ok(())
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        for section in ["version = 1", "[api]", "[portal]", "[ui]", "[log]"] {
            assert!(example.contains(section), "missing {section}");
        }

        std::fs::write(&path, example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.skeleton_cards(), 5);
        Ok(())
    }
}
