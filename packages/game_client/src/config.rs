use anyhow::{Context, Result};
use game_feed::{
    DEFAULT_FEED_CAPACITY, DEFAULT_REPLAY_ENTRIES, DEFAULT_STREAM_CAPACITY, FeedConfig,
    StreamConfig,
};
use game_session::{DEFAULT_HISTORY_LIMIT, DEFAULT_REFRESH_INTERVAL, SessionConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// =============================================================================
// Unified config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
// Three equivalent ways to configure:
//
//   config.toml:     [feed]
//                    max_entries = 2000
//
//   env var:         GAMEFEED_FEED__MAX_ENTRIES=2000   (double underscore = nesting)
//
//   (single underscore stays within field names: GAMEFEED_RENDER__REFRESH_INTERVAL_MS)

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub feed: FeedFileConfig,
    #[serde(default)]
    pub streams: StreamsFileConfig,
    #[serde(default)]
    pub render: RenderFileConfig,
    /// Sessions opened at startup (`[[sessions]]` in config.toml).
    #[serde(default)]
    pub sessions: Vec<SessionTarget>,
}

/// Main transcript tunables (lives under `[feed]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedFileConfig {
    #[serde(default = "default_feed_entries")]
    pub max_entries: usize,
    /// Elements re-rendered when a session gains focus.
    #[serde(default = "default_replay_entries")]
    pub replay_entries: usize,
    #[serde(default = "default_history_entries")]
    pub history_entries: usize,
}

impl Default for FeedFileConfig {
    fn default() -> Self {
        Self {
            max_entries: default_feed_entries(),
            replay_entries: default_replay_entries(),
            history_entries: default_history_entries(),
        }
    }
}

/// Sub-channel tunables (lives under `[streams]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamsFileConfig {
    #[serde(default = "default_stream_entries")]
    pub max_entries: usize,
    #[serde(default = "default_subscribed")]
    pub subscribed: Vec<String>,
}

impl Default for StreamsFileConfig {
    fn default() -> Self {
        Self {
            max_entries: default_stream_entries(),
            subscribed: default_subscribed(),
        }
    }
}

/// Rendering cadence (lives under `[render]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RenderFileConfig {
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

impl Default for RenderFileConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

/// A game to connect to.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionTarget {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SessionTarget {
    /// Parse `host:port` or `host:port=name`.
    pub fn parse(s: &str) -> Result<Self> {
        let (addr, name) = match s.split_once('=') {
            Some((addr, name)) if !name.trim().is_empty() => (addr, Some(name.trim().to_string())),
            Some((addr, _)) => (addr, None),
            None => (s, None),
        };
        let (host, port) = addr
            .rsplit_once(':')
            .with_context(|| format!("Expected host:port, got '{addr}'"))?;
        if host.is_empty() {
            anyhow::bail!("Missing host in '{addr}'");
        }
        let port = port
            .parse::<u16>()
            .with_context(|| format!("Invalid port in '{addr}'"))?;
        Ok(Self {
            host: host.to_string(),
            port,
            name,
        })
    }
}

/// clap value parser for `--connect`.
pub fn parse_target(s: &str) -> std::result::Result<SessionTarget, String> {
    SessionTarget::parse(s).map_err(|e| format!("{e:#}"))
}

fn default_feed_entries() -> usize {
    DEFAULT_FEED_CAPACITY
}
fn default_replay_entries() -> usize {
    DEFAULT_REPLAY_ENTRIES
}
fn default_history_entries() -> usize {
    DEFAULT_HISTORY_LIMIT
}
fn default_stream_entries() -> usize {
    DEFAULT_STREAM_CAPACITY
}
fn default_subscribed() -> Vec<String> {
    StreamConfig::default().subscribed
}
fn default_refresh_interval_ms() -> u64 {
    DEFAULT_REFRESH_INTERVAL.as_millis() as u64
}

/// Build a figment that layers: defaults → config.toml → GAMEFEED_* env vars.
///
/// Env vars use double-underscore for nesting into sections:
///   `GAMEFEED_FEED__MAX_ENTRIES=2000`  →  `feed.max_entries = 2000`
pub fn load_config(data_dir: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(data_dir.join("config.toml")))
        .merge(Env::prefixed("GAMEFEED_").split("__"))
}

// =============================================================================
// Runtime config (derived from FileConfig, handed to every session)
// =============================================================================

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub feed: FeedConfig,
    pub streams: StreamConfig,
    pub history_limit: usize,
    pub refresh_interval: Duration,
    pub sessions: Vec<SessionTarget>,
}

impl ClientConfig {
    pub fn from_file(fc: &FileConfig) -> Self {
        Self {
            feed: FeedConfig {
                capacity: fc.feed.max_entries,
                replay: fc.feed.replay_entries,
            },
            streams: StreamConfig {
                capacity: fc.streams.max_entries,
                subscribed: fc.streams.subscribed.clone(),
            },
            history_limit: fc.feed.history_entries,
            // Zero would spin the render tick
            refresh_interval: Duration::from_millis(fc.render.refresh_interval_ms.max(1)),
            sessions: fc.sessions.clone(),
        }
    }

    /// Session settings for one target.
    pub fn session(&self, target: &SessionTarget) -> SessionConfig {
        SessionConfig {
            host: target.host.clone(),
            port: target.port,
            name: target.name.clone(),
            feed: self.feed,
            streams: self.streams.clone(),
            history_limit: self.history_limit,
            refresh_interval: self.refresh_interval,
        }
    }
}

// =============================================================================
// Directory layout (taken from --data-dir, never from figment)
// =============================================================================

#[derive(Clone, Debug)]
pub struct DataDir {
    pub path: PathBuf,
}

impl DataDir {
    pub fn new(custom_dir: Option<PathBuf>) -> Result<Self> {
        let path = match custom_dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .context("Could not find home directory")?
                .join(".gamefeed"),
        };

        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create data directory: {:?}", path))?;

        info!("Data directory: {}", path.display());

        Ok(Self { path })
    }

    pub fn config_toml_path(&self) -> PathBuf {
        self.path.join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── defaults ────────────────────────────────────────────────────────

    #[test]
    fn test_feed_file_config_defaults() {
        let d = FeedFileConfig::default();
        assert_eq!(d.max_entries, 1000);
        assert_eq!(d.replay_entries, 100);
        assert_eq!(d.history_entries, 100);
    }

    #[test]
    fn test_streams_file_config_defaults() {
        let d = StreamsFileConfig::default();
        assert_eq!(d.max_entries, 500);
        assert_eq!(
            d.subscribed,
            vec!["thoughts", "logons", "death", "familiar", "atmospherics"]
        );
    }

    #[test]
    fn test_render_file_config_defaults() {
        assert_eq!(RenderFileConfig::default().refresh_interval_ms, 16);
    }

    // ── ClientConfig::from_file ─────────────────────────────────────────

    #[test]
    fn test_client_config_from_file() {
        let fc = FileConfig {
            feed: FeedFileConfig {
                max_entries: 20,
                replay_entries: 5,
                history_entries: 3,
            },
            streams: StreamsFileConfig {
                max_entries: 7,
                subscribed: vec!["thoughts".into()],
            },
            render: RenderFileConfig {
                refresh_interval_ms: 0,
            },
            sessions: vec![],
        };
        let cc = ClientConfig::from_file(&fc);
        assert_eq!(cc.feed.capacity, 20);
        assert_eq!(cc.feed.replay, 5);
        assert_eq!(cc.history_limit, 3);
        assert_eq!(cc.streams.capacity, 7);
        assert_eq!(cc.streams.subscribed, vec!["thoughts"]);
        assert_eq!(cc.refresh_interval, Duration::from_millis(1));
    }

    #[test]
    fn test_session_config_carries_tunables() {
        let cc = ClientConfig::from_file(&FileConfig::default());
        let target = SessionTarget::parse("example.org:4000=mal").unwrap();
        let sc = cc.session(&target);
        assert_eq!(sc.host, "example.org");
        assert_eq!(sc.port, 4000);
        assert_eq!(sc.name.as_deref(), Some("mal"));
        assert_eq!(sc.feed.capacity, 1000);
        assert_eq!(sc.refresh_interval, Duration::from_millis(16));
    }

    // ── SessionTarget::parse ────────────────────────────────────────────

    #[test]
    fn test_parse_target() {
        assert_eq!(
            SessionTarget::parse("localhost:4000").unwrap(),
            SessionTarget {
                host: "localhost".into(),
                port: 4000,
                name: None,
            }
        );
        assert_eq!(
            SessionTarget::parse("localhost:4000=mal")
                .unwrap()
                .name
                .as_deref(),
            Some("mal")
        );
        assert!(SessionTarget::parse("localhost:4000=").unwrap().name.is_none());
    }

    #[test]
    fn test_parse_target_rejects_garbage() {
        assert!(SessionTarget::parse("localhost").is_err());
        assert!(SessionTarget::parse(":4000").is_err());
        assert!(SessionTarget::parse("localhost:notaport").is_err());
        assert!(SessionTarget::parse("localhost:70000").is_err());
    }

    // ── DataDir ─────────────────────────────────────────────────────────

    #[test]
    fn test_data_dir_with_custom_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("nested");
        let dir = DataDir::new(Some(nested.clone())).unwrap();
        assert_eq!(dir.path, nested);
        assert!(nested.exists());
        assert_eq!(dir.config_toml_path(), nested.join("config.toml"));
    }

    // ── load_config ─────────────────────────────────────────────────────

    #[test]
    fn test_load_config_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let fc: FileConfig = load_config(tmp.path()).extract().unwrap();
        assert_eq!(fc.feed.max_entries, 1000);
        assert_eq!(fc.streams.max_entries, 500);
        assert!(fc.sessions.is_empty());
    }

    #[test]
    fn test_load_config_toml_sets_values() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "[feed]\nmax_entries = 50\n\n[streams]\nsubscribed = [\"death\"]\n",
        )
        .unwrap();
        let fc: FileConfig = load_config(tmp.path()).extract().unwrap();
        assert_eq!(fc.feed.max_entries, 50);
        assert_eq!(fc.feed.replay_entries, 100);
        assert_eq!(fc.streams.subscribed, vec!["death"]);
    }

    #[test]
    fn test_load_config_sessions() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "[[sessions]]\nhost = \"a.example\"\nport = 4000\nname = \"mal\"\n\n\
             [[sessions]]\nhost = \"b.example\"\nport = 4001\n",
        )
        .unwrap();
        let fc: FileConfig = load_config(tmp.path()).extract().unwrap();
        assert_eq!(fc.sessions.len(), 2);
        assert_eq!(fc.sessions[0].name.as_deref(), Some("mal"));
        assert!(fc.sessions[1].name.is_none());
    }
}
