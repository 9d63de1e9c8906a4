use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LighthouseConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub startup: StartupConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout_seconds: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            request_timeout_seconds: None,
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SyncConfig {
    pub interval_seconds: u64,
    pub project_id: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 5,
            project_id: None,
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(1))
    }
}

/// Cool-down windows applied after a hallucination check completes.
///
/// A check discovered by a poll tick waits `poll_cooldown_ms` before the
/// trace is eligible again; a check started right after a submission
/// waits the shorter `submission_cooldown_ms`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VerificationConfig {
    pub poll_cooldown_ms: u64,
    pub submission_cooldown_ms: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            poll_cooldown_ms: 5000,
            submission_cooldown_ms: 1000,
        }
    }
}

impl VerificationConfig {
    pub fn poll_cooldown(&self) -> Duration {
        Duration::from_millis(self.poll_cooldown_ms)
    }

    pub fn submission_cooldown(&self) -> Duration {
        Duration::from_millis(self.submission_cooldown_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StartupConfig {
    pub probe_attempts: usize,
    pub probe_delay_ms: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            probe_attempts: 5,
            probe_delay_ms: 500,
        }
    }
}

impl LighthouseConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .build()?;
        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = LighthouseConfig::load("/nonexistent/lighthouse-test-config").unwrap();
        assert_eq!(config.sync.interval_seconds, 5);
        assert_eq!(config.verification.poll_cooldown_ms, 5000);
        assert_eq!(config.verification.submission_cooldown_ms, 1000);
        assert_eq!(config.backend.base_url, "http://localhost:8080/api");
        assert!(config.backend.request_timeout().is_none());
        assert!(config.sync.project_id.is_none());
    }

    #[test]
    fn test_partial_file_overrides_only_given_sections() {
        let dir = std::env::temp_dir().join(format!("lighthouse-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lighthouse.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[backend]
base_url = "http://backend:9000/api"
request_timeout_seconds = 12

[verification]
poll_cooldown_ms = 250
submission_cooldown_ms = 50
"#
        )
        .unwrap();

        let config = LighthouseConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.backend.base_url, "http://backend:9000/api");
        assert_eq!(config.backend.request_timeout(), Some(Duration::from_secs(12)));
        assert_eq!(config.verification.poll_cooldown(), Duration::from_millis(250));
        assert_eq!(config.verification.submission_cooldown(), Duration::from_millis(50));
        assert_eq!(config.sync.interval_seconds, 5);
        assert_eq!(config.service.log_level, "info");

        std::fs::remove_dir_all(&dir).ok();
    }
}
