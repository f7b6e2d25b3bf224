use clap::Parser;
use lib_live::simulator::MIN_TICK;
use lib_live::{SessionLimits, SimulationSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_CONFIG_FILE: &str = "server_live.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Live match simulator and real-time score server", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "LIVE_PORT", help = "Port to listen on for HTTP and WebSocket clients.")]
    pub port: Option<u16>,

    #[clap(long, env = "LIVE_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "LIVE_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "LIVE_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error). RUST_LOG wins if set.")]
    pub log_level: Option<String>,

    #[clap(long, env = "REDIS_URL", help = "Redis URL for the shared cache and pub/sub. In-process when absent.")]
    pub redis_url: Option<String>,

    #[clap(long, env = "DATABASE_URL", help = "PostgreSQL URL for the durable store. In-process when absent.")]
    pub database_url: Option<String>,

    #[clap(long, env = "LIVE_DB_POOL_SIZE", help = "Maximum pooled PostgreSQL connections.")]
    pub db_pool_size: Option<usize>,

    #[clap(long, env = "LIVE_RUN_SIMULATOR", help = "Run the match simulator in this process (false = hub only).")]
    pub run_simulator: Option<bool>,

    #[clap(long, env = "LIVE_MATCH_COUNT", help = "Number of concurrent matches to simulate.")]
    pub match_count: Option<usize>,

    #[clap(long, env = "LIVE_MATCH_DURATION", help = "Simulated minutes per match.")]
    pub match_duration: Option<u32>,

    #[clap(long, env = "LIVE_TICK_MS", help = "Wall-clock milliseconds per simulated minute.")]
    pub tick_ms: Option<u64>,

    #[clap(long, env = "LIVE_SUBSTITUTION_AFTER", help = "Minute after which substitutions may happen.")]
    pub substitution_after: Option<u32>,

    #[clap(long, env = "LIVE_SEED", help = "Seed for reproducible simulations.")]
    pub seed: Option<u64>,

    #[clap(long, env = "LIVE_WRITE_TIMEOUT_MS", help = "Timeout in milliseconds for each cache/store write of a tick.")]
    pub write_timeout_ms: Option<u64>,

    #[clap(long, env = "LIVE_CHAT_COOLDOWN_MS", help = "Minimum milliseconds between two chat messages of one viewer.")]
    pub chat_cooldown_ms: Option<u64>,

    #[clap(long, env = "LIVE_CHAT_MAX_LEN", help = "Maximum chat message length in characters.")]
    pub chat_max_len: Option<usize>,

    #[clap(long, env = "LIVE_TYPING_TIMEOUT_MS", help = "Milliseconds after which a typing signal clears itself.")]
    pub typing_timeout_ms: Option<u64>,

    #[clap(long, env = "LIVE_RELAY_RETRY_MS", help = "Delay in milliseconds before a room relay resubscribes to its feed.")]
    pub relay_retry_ms: Option<u64>,
}

impl Config {
    fn defaults() -> Config {
        let simulation = SimulationSettings::default();
        let limits = SessionLimits::default();
        Config {
            port: Some(3000),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            db_pool_size: Some(8),
            run_simulator: Some(true),
            match_count: Some(simulation.match_count),
            match_duration: Some(simulation.match_duration),
            tick_ms: Some(simulation.tick.as_millis() as u64),
            substitution_after: Some(simulation.substitution_after),
            write_timeout_ms: Some(simulation.write_timeout.as_millis() as u64),
            chat_cooldown_ms: Some(limits.chat_cooldown.as_millis() as u64),
            chat_max_len: Some(limits.chat_max_len),
            typing_timeout_ms: Some(limits.typing_timeout.as_millis() as u64),
            relay_retry_ms: Some(5000),
            ..Default::default()
        }
    }

    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            redis_url: other.redis_url.or(self.redis_url),
            database_url: other.database_url.or(self.database_url),
            db_pool_size: other.db_pool_size.or(self.db_pool_size),
            run_simulator: other.run_simulator.or(self.run_simulator),
            match_count: other.match_count.or(self.match_count),
            match_duration: other.match_duration.or(self.match_duration),
            tick_ms: other.tick_ms.or(self.tick_ms),
            substitution_after: other.substitution_after.or(self.substitution_after),
            seed: other.seed.or(self.seed),
            write_timeout_ms: other.write_timeout_ms.or(self.write_timeout_ms),
            chat_cooldown_ms: other.chat_cooldown_ms.or(self.chat_cooldown_ms),
            chat_max_len: other.chat_max_len.or(self.chat_max_len),
            typing_timeout_ms: other.typing_timeout_ms.or(self.typing_timeout_ms),
            relay_retry_ms: other.relay_retry_ms.or(self.relay_retry_ms),
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(3000)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn run_simulator(&self) -> bool {
        self.run_simulator.unwrap_or(true)
    }

    pub fn relay_retry(&self) -> Duration {
        Duration::from_millis(self.relay_retry_ms.unwrap_or(5000))
    }

    pub fn simulation_settings(&self) -> SimulationSettings {
        let defaults = SimulationSettings::default();
        SimulationSettings {
            match_count: self.match_count.unwrap_or(defaults.match_count),
            match_duration: self.match_duration.unwrap_or(defaults.match_duration),
            tick: self.tick_ms.map(Duration::from_millis).unwrap_or(defaults.tick).max(MIN_TICK),
            substitution_after: self.substitution_after.unwrap_or(defaults.substitution_after),
            write_timeout: self.write_timeout_ms.map(Duration::from_millis).unwrap_or(defaults.write_timeout),
            seed: self.seed,
        }
    }

    pub fn session_limits(&self) -> SessionLimits {
        let defaults = SessionLimits::default();
        SessionLimits {
            chat_cooldown: self.chat_cooldown_ms.map(Duration::from_millis).unwrap_or(defaults.chat_cooldown),
            chat_max_len: self.chat_max_len.unwrap_or(defaults.chat_max_len),
            typing_timeout: self.typing_timeout_ms.map(Duration::from_millis).unwrap_or(defaults.typing_timeout),
        }
    }
}

/// Reads a JSON config file. Missing or broken files are reported and skipped.
fn read_config_file(path: &Path) -> Option<Config> {
    if !path.exists() {
        info!("Config file not found at {}. Using defaults and environment/CLI variables.", path.display());
        return None;
    }
    match fs::read_to_string(path) {
        Ok(config_str) => match serde_json::from_str::<Config>(&config_str) {
            Ok(file_config) => Some(file_config),
            Err(e) => {
                warn!("Failed to parse config file {}: {}. Falling back to other sources.", path.display(), e);
                None
            }
        },
        Err(e) => {
            warn!("Failed to read config file {}: {}. Falling back to other sources.", path.display(), e);
            None
        }
    }
}

/// Defaults, then the config file, then environment variables and CLI flags.
pub fn resolve_config(cli_args: Config) -> Config {
    let config_file_path = cli_args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = Config::defaults();
    if let Some(file_config) = read_config_file(&config_file_path) {
        current_config = current_config.merge(file_config);
    }
    current_config.merge(cli_args)
}

pub fn load_config() -> Config {
    resolve_config(Config::parse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_fill_every_gap() {
        let config = resolve_config(Config {
            config_path: Some(PathBuf::from("/definitely/not/here.conf")),
            ..Default::default()
        });
        assert_eq!(config.port(), 3000);
        assert!(config.run_simulator());
        assert_eq!(config.simulation_settings(), SimulationSettings::default());
        assert_eq!(config.session_limits(), SessionLimits::default());
        assert_eq!(config.relay_retry(), Duration::from_millis(5000));
        assert_eq!(config.redis_url, None);
    }

    #[test]
    fn cli_beats_file_beats_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"port": 4000, "tickMs": 250, "matchCount": 2, "runSimulator": false}}"#).unwrap();

        let config = resolve_config(Config {
            config_path: Some(file.path().to_path_buf()),
            port: Some(5000),
            ..Default::default()
        });
        assert_eq!(config.port(), 5000);
        assert!(!config.run_simulator());
        let settings = config.simulation_settings();
        assert_eq!(settings.tick, Duration::from_millis(250));
        assert_eq!(settings.match_count, 2);
        assert_eq!(settings.match_duration, 90);
    }

    #[test]
    fn zero_tick_is_raised_to_the_minimum() {
        let config = resolve_config(Config {
            config_path: Some(PathBuf::from("/definitely/not/here.conf")),
            tick_ms: Some(0),
            ..Default::default()
        });
        assert_eq!(config.simulation_settings().tick, MIN_TICK);
    }

    #[test]
    fn broken_file_is_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let config = resolve_config(Config {
            config_path: Some(file.path().to_path_buf()),
            ..Default::default()
        });
        assert_eq!(config.port(), 3000);
    }
}
