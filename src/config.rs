// src/config.rs

//! Server settings read from the environment (and `.env` via dotenv).

use std::{env, path::PathBuf, str::FromStr, time::Duration};
use crate::{
    device::DeviceMode,
    error::ConfigError,
    sync::{drift::DEFAULT_DRIFT_THRESHOLD_MS, state::DEFAULT_LATENCY_OFFSET_MS, EngineOptions},
};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5441";
const DEFAULT_INTIFACE_URL: &str = "ws://127.0.0.1:12345/buttplug";
const DEFAULT_SCAN_SECS: u64 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// `BIND_ADDR`
    pub bind_addr: String,
    /// `FUNSCRIPT_SHARE_PATH`, the directory funscripts are loaded from
    pub funscript_dir: PathBuf,
    /// `INTIFACE_URL`
    pub intiface_url: String,
    /// `DEVICE_MODE`: `linear` or `oscillate`
    pub device_mode: DeviceMode,
    /// `DEVICE_SCAN_SECS`
    pub scan_duration: Duration,
    /// `LATENCY_OFFSET_MS`
    pub latency_offset_ms: i64,
    /// `DRIFT_THRESHOLD_MS`
    pub drift_threshold_ms: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup; `from_env` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let funscript_dir = lookup("FUNSCRIPT_SHARE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("FUNSCRIPT_SHARE_PATH"))?;

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            funscript_dir,
            intiface_url: lookup("INTIFACE_URL").unwrap_or_else(|| DEFAULT_INTIFACE_URL.to_string()),
            device_mode: parse_or(&lookup, "DEVICE_MODE", DeviceMode::default())?,
            scan_duration: Duration::from_secs(parse_or(&lookup, "DEVICE_SCAN_SECS", DEFAULT_SCAN_SECS)?),
            latency_offset_ms: parse_or(&lookup, "LATENCY_OFFSET_MS", DEFAULT_LATENCY_OFFSET_MS as i64)?,
            drift_threshold_ms: parse_or(&lookup, "DRIFT_THRESHOLD_MS", DEFAULT_DRIFT_THRESHOLD_MS)?,
        })
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            latency_offset_ms: self.latency_offset_ms,
            drift_threshold_ms: self.drift_threshold_ms,
            ..EngineOptions::default()
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_share_path_is_set() {
        let settings = settings(&[("FUNSCRIPT_SHARE_PATH", "/srv/scripts")]).unwrap();
        assert_eq!(settings.funscript_dir, PathBuf::from("/srv/scripts"));
        assert_eq!(settings.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(settings.intiface_url, DEFAULT_INTIFACE_URL);
        assert_eq!(settings.device_mode, DeviceMode::Linear);
        assert_eq!(settings.scan_duration, Duration::from_secs(3));
        assert_eq!(settings.latency_offset_ms, 50);
        assert_eq!(settings.drift_threshold_ms, 200);
    }

    #[test]
    fn share_path_is_required() {
        assert!(matches!(settings(&[]), Err(ConfigError::Missing("FUNSCRIPT_SHARE_PATH"))));
        assert!(settings(&[("FUNSCRIPT_SHARE_PATH", " ")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let settings = settings(&[
            ("FUNSCRIPT_SHARE_PATH", "/srv/scripts"),
            ("DEVICE_MODE", "oscillate"),
            ("LATENCY_OFFSET_MS", "120"),
            ("DRIFT_THRESHOLD_MS", "350"),
        ])
        .unwrap();
        assert_eq!(settings.device_mode, DeviceMode::Oscillate);
        let options = settings.engine_options();
        assert_eq!(options.latency_offset_ms, 120);
        assert_eq!(options.drift_threshold_ms, 350);
    }

    #[test]
    fn invalid_numbers_name_the_key() {
        let err = settings(&[("FUNSCRIPT_SHARE_PATH", "/srv"), ("LATENCY_OFFSET_MS", "fast")]).unwrap_err();
        match err {
            ConfigError::Invalid { key, value } => {
                assert_eq!(key, "LATENCY_OFFSET_MS");
                assert_eq!(value, "fast");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
