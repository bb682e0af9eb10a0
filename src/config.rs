//! Configuration for articast.
//!
//! Loaded from TOML with per-section defaults; a missing file yields the
//! default configuration, invalid TOML is an error.

use crate::defaults;
use crate::job::Voice;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub broker: BrokerConfig,
    pub files: FilesConfig,
    pub tts: TtsConfig,
    pub worker: WorkerConfig,
}

/// Broker connection configuration (job queue and job store)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker URL, e.g. `redis://127.0.0.1/`
    pub url: String,
    /// Queue key job ids are published to
    pub queue: String,
    /// Stable consumer name; unacknowledged deliveries are recovered under
    /// this name after a crash, so it must survive restarts
    pub consumer: String,
}

/// Artifact and podcast file layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilesConfig {
    /// Directory for per-article cached audio
    pub articles_dir: PathBuf,
    /// Directory for assembled podcasts
    pub podcasts_dir: PathBuf,
    /// Jingle clip inserted around and between articles
    pub jingle: PathBuf,
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TtsConfig {
    /// Synthesis engine command
    pub piper_bin: String,
    /// Model file per voice; a worker loads one model per entry at startup
    pub voices: BTreeMap<Voice, PathBuf>,
    /// Voice used when a submission doesn't specify one
    pub default_voice: Voice,
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Consume loops per worker process (each with its own connections and models)
    pub workers: usize,
    /// Seconds to block on the queue before re-checking for shutdown
    pub consume_timeout_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1/".to_string(),
            queue: defaults::QUEUE_KEY.to_string(),
            consumer: default_consumer_name(),
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            articles_dir: PathBuf::from("files/articles"),
            podcasts_dir: PathBuf::from("files/podcasts"),
            jingle: PathBuf::from("jingles/default_jingle.mp3"),
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        let mut voices = BTreeMap::new();
        for voice in Voice::ALL {
            voices.insert(
                voice,
                PathBuf::from(format!("models/{}.onnx", voice.as_str().to_lowercase())),
            );
        }
        Self {
            piper_bin: defaults::PIPER_BIN.to_string(),
            voices,
            default_voice: Voice::default(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            consume_timeout_secs: defaults::CONSUME_TIMEOUT_SECS,
        }
    }
}

/// Stable per-host consumer name.
///
/// Falls back to "worker" when the hostname isn't exported; override
/// `broker.consumer` when running several worker hosts against one broker.
fn default_consumer_name() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "worker".to_string())
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - ARTICAST_BROKER_URL → broker.url
    /// - ARTICAST_CONSUMER → broker.consumer
    /// - ARTICAST_PIPER_BIN → tts.piper_bin
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("ARTICAST_BROKER_URL")
            && !url.is_empty()
        {
            self.broker.url = url;
        }

        if let Ok(consumer) = std::env::var("ARTICAST_CONSUMER")
            && !consumer.is_empty()
        {
            self.broker.consumer = consumer;
        }

        if let Ok(piper) = std::env::var("ARTICAST_PIPER_BIN")
            && !piper.is_empty()
        {
            self.tts.piper_bin = piper;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/articast/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("articast")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_articast_env() {
        remove_env("ARTICAST_BROKER_URL");
        remove_env("ARTICAST_CONSUMER");
        remove_env("ARTICAST_PIPER_BIN");
    }

    #[test]
    fn default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.broker.url, "redis://127.0.0.1/");
        assert_eq!(config.broker.queue, "articast:jobs");
        assert_eq!(config.files.articles_dir, PathBuf::from("files/articles"));
        assert_eq!(config.files.podcasts_dir, PathBuf::from("files/podcasts"));
        assert_eq!(config.tts.piper_bin, "piper");
        assert_eq!(config.tts.default_voice, Voice::Female1);
        assert_eq!(config.tts.voices.len(), Voice::ALL.len());
        assert_eq!(config.worker.workers, 1);
        assert_eq!(config.worker.consume_timeout_secs, 5);
    }

    #[test]
    fn load_parses_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [broker]
            url = "redis://broker.internal/"
            queue = "podcast:jobs"
            consumer = "worker-a"

            [files]
            articles_dir = "/var/lib/articast/articles"
            podcasts_dir = "/var/lib/articast/podcasts"
            jingle = "/var/lib/articast/jingle.wav"

            [tts]
            piper_bin = "/usr/local/bin/piper"
            default_voice = "Male1"

            [tts.voices]
            Male1 = "/models/male1.onnx"

            [worker]
            workers = 3
            consume_timeout_secs = 2
            "#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.broker.url, "redis://broker.internal/");
        assert_eq!(config.broker.queue, "podcast:jobs");
        assert_eq!(config.broker.consumer, "worker-a");
        assert_eq!(config.tts.default_voice, Voice::Male1);
        assert_eq!(
            config.tts.voices.get(&Voice::Male1),
            Some(&PathBuf::from("/models/male1.onnx"))
        );
        assert_eq!(config.worker.workers, 3);
    }

    #[test]
    fn load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [broker]
            url = "redis://elsewhere/"
            "#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.broker.url, "redis://elsewhere/");
        assert_eq!(config.broker.queue, "articast:jobs");
        assert_eq!(config.worker.workers, 1);
    }

    #[test]
    fn load_invalid_toml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "broker = [not toml").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn load_or_default_missing_file_gives_defaults() {
        let config = Config::load_or_default(Path::new("/nonexistent/articast.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn env_overrides_apply() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_articast_env();

        set_env("ARTICAST_BROKER_URL", "redis://override/");
        set_env("ARTICAST_CONSUMER", "worker-override");
        set_env("ARTICAST_PIPER_BIN", "/opt/piper");

        let config = Config::default().with_env_overrides();
        assert_eq!(config.broker.url, "redis://override/");
        assert_eq!(config.broker.consumer, "worker-override");
        assert_eq!(config.tts.piper_bin, "/opt/piper");

        clear_articast_env();
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_articast_env();

        set_env("ARTICAST_BROKER_URL", "");
        let config = Config::default().with_env_overrides();
        assert_eq!(config.broker.url, "redis://127.0.0.1/");

        clear_articast_env();
    }

    #[test]
    fn default_path_ends_with_config_toml() {
        let path = Config::default_path();
        assert!(path.ends_with("articast/config.toml"));
    }
}
