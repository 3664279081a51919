use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub game: GameConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    pub levels_path: String,
    /// How long a released word stays on screen before it is cleared
    pub feedback_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let server = ServerConfig {
            host: lookup("HOST")
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .context("PORT must be a number")?,
            frontend_dir: lookup("FRONTEND_DIR")
                .unwrap_or_else(|| "../frontend".to_string()),
        };

        let game = GameConfig {
            levels_path: lookup("LEVELS_PATH")
                .unwrap_or_else(|| "./levels.json".to_string()),
            feedback_delay_ms: lookup("FEEDBACK_DELAY_MS")
                .unwrap_or_else(|| "500".to_string())
                .parse()
                .context("FEEDBACK_DELAY_MS must be a number of milliseconds")?,
        };

        Ok(Config { server, game })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn feedback_delay(&self) -> Duration {
        Duration::from_millis(self.game.feedback_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server_addr(), "0.0.0.0:3000");
        assert_eq!(config.server.frontend_dir, "../frontend");
        assert_eq!(config.game.levels_path, "./levels.json");
        assert_eq!(config.feedback_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("FEEDBACK_DELAY_MS", "250"),
        ])
        .unwrap();
        assert_eq!(config.server_addr(), "127.0.0.1:8080");
        assert_eq!(config.game.feedback_delay_ms, 250);
    }

    #[test]
    fn test_invalid_port() {
        let err = config_from(&[("PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("PORT must be a number"));
    }
}
