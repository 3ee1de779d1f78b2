//! `miner.ron` loading.
//!
//! Every field has a default, so a partial file (or no file) is fine.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use engine_logging::engine_info;
use miner_core::MiningParams;
use miner_engine::{ClientSettings, EngineConfig, PollSettings};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub start_timeout_secs: u64,
    /// Where results are downloaded; `None` skips the download.
    pub download_dir: Option<PathBuf>,
    pub log_to_file: bool,
    pub params: MiningParams,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        Self {
            base_url: client.base_url,
            poll_interval_ms: PollSettings::default().cadence.as_millis() as u64,
            request_timeout_secs: client.request_timeout.as_secs(),
            start_timeout_secs: client.start_timeout.as_secs(),
            download_dir: Some(PathBuf::from("results")),
            log_to_file: true,
            params: MiningParams::default(),
        }
    }
}

impl AppConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            client: ClientSettings {
                base_url: self.base_url.clone(),
                request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
                start_timeout: Duration::from_secs(self.start_timeout_secs.max(1)),
                ..ClientSettings::default()
            },
            poll: PollSettings {
                cadence: Duration::from_millis(self.poll_interval_ms.max(10)),
            },
        }
    }
}

/// Reads the config at `path`. A missing file yields the defaults.
pub fn load(path: &Path) -> anyhow::Result<AppConfig> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(AppConfig::default());
        }
        Err(err) => return Err(err).context("reading config file"),
    };
    let config = ron::from_str(&content).context("parsing config file")?;
    engine_info!("Loaded config from {:?}", path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use miner_core::SearchStrategy;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load(&temp.path().join("miner.ron")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("miner.ron");
        fs::write(
            &path,
            r#"(
                base_url: "http://miner.local:9000/",
                download_dir: None,
                params: (n_trials: 25, search_strategy: mcts),
            )"#,
        )
        .unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.base_url, "http://miner.local:9000/");
        assert_eq!(config.download_dir, None);
        assert_eq!(config.params.n_trials, 25);
        assert_eq!(config.params.search_strategy, SearchStrategy::Mcts);
        assert_eq!(config.params.min_pattern_size, 5);
        assert_eq!(config.poll_interval_ms, 250);
    }

    #[test]
    fn saved_config_reads_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("miner.ron");
        let mut original = AppConfig::default();
        original.poll_interval_ms = 500;
        original.params.max_pattern_size = 12;
        let text = ron::ser::to_string_pretty(&original, ron::ser::PrettyConfig::new()).unwrap();
        fs::write(&path, text).unwrap();

        assert_eq!(load(&path).unwrap(), original);
    }

    #[test]
    fn broken_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("miner.ron");
        fs::write(&path, "(base_url: ").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn engine_config_uses_configured_cadence() {
        let config = AppConfig {
            poll_interval_ms: 1000,
            ..AppConfig::default()
        };
        let engine = config.engine_config();
        assert_eq!(engine.poll.cadence, Duration::from_millis(1000));
        assert_eq!(engine.client.base_url, config.base_url);
    }
}
