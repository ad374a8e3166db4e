use eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::types::{Dimensions, JointState};

/// Environment variable selecting the configuration file.
pub const CONFIG_PATH_ENV: &str = "CRANE_CONFIG";
/// Environment variable overriding `backend.url`.
pub const BACKEND_URL_ENV: &str = "CRANE_BACKEND_URL";

pub const DEFAULT_CONFIG_PATH: &str = "config/crane.toml";
pub const DEFAULT_BACKEND_URL: &str = "ws://127.0.0.1:8000/ws";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CraneConfig {
    pub name: String,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub dimensions: Dimensions,
    #[serde(default)]
    pub motion: MotionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Where the console connects
    pub url: String,
    pub connect_timeout_ms: u64,
    /// Where the simulated backend listens
    pub bind_addr: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            connect_timeout_ms: 5000,
            bind_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

impl BackendConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Maximum joint speeds, in each joint's unit per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointSpeeds {
    pub swing: f64,   // deg/s
    pub lift: f64,    // m/s
    pub elbow: f64,   // deg/s
    pub wrist: f64,   // deg/s
    pub gripper: f64, // fraction/s
}

impl Default for JointSpeeds {
    fn default() -> Self {
        Self {
            swing: 10.0,
            lift: 0.1,
            elbow: 10.0,
            wrist: 10.0,
            gripper: 0.05,
        }
    }
}

impl JointSpeeds {
    /// Same ordering as `JointState::to_array`
    pub fn to_array(&self) -> [f64; 5] {
        [self.swing, self.lift, self.elbow, self.wrist, self.gripper]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionConfig {
    pub max_speeds: JointSpeeds,
    pub tick_ms: u64,
    /// State the simulated crane starts in
    #[serde(default)]
    pub initial_state: JointState,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            max_speeds: JointSpeeds::default(),
            tick_ms: 100,
            initial_state: JointState::default(),
        }
    }
}

impl MotionConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for CraneConfig {
    fn default() -> Self {
        Self {
            name: "crane".to_string(),
            backend: BackendConfig::default(),
            dimensions: Dimensions::default(),
            motion: MotionConfig::default(),
        }
    }
}

impl CraneConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: CraneConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path`, or `$CRANE_CONFIG`, or the default location; fall back to
    /// built-in defaults when no file exists. `$CRANE_BACKEND_URL` wins over the file.
    pub fn load_from_env(path: Option<&str>) -> Result<Self> {
        let path = path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok());

        let mut config = match path {
            Some(path) => Self::load_from_file(&path)
                .map_err(|e| eyre::eyre!("Failed to load config {}: {}", path, e))?,
            None if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load_from_file(DEFAULT_CONFIG_PATH)?
            }
            None => Self::default(),
        };

        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            config.backend.url = url;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.dimensions.validate()?;

        if !self.backend.url.starts_with("ws://") && !self.backend.url.starts_with("wss://") {
            return Err(eyre::eyre!(
                "Backend URL must use ws:// or wss://, got {}",
                self.backend.url
            ));
        }

        if self.motion.tick_ms == 0 {
            return Err(eyre::eyre!("motion.tick_ms must be greater than zero"));
        }

        for (name, speed) in JointState::FIELD_NAMES
            .into_iter()
            .zip(self.motion.max_speeds.to_array())
        {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(eyre::eyre!(
                    "Max speed for {} must be positive, got {}",
                    name,
                    speed
                ));
            }
        }

        self.motion
            .initial_state
            .validate(&self.dimensions)
            .map_err(|e| eyre::eyre!("Invalid motion.initial_state: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name = "test crane"

[backend]
url = "ws://localhost:9000/ws"
connect_timeout_ms = 250
bind_addr = "0.0.0.0:9000"

[dimensions]
base = { radius = 0.6, height = 0.5 }
column = { width = 0.3, height = 3.0, depth = 0.3 }
upper_arm = { width = 1.2, height = 0.5, depth = 0.2 }
upper_spacer = { width = 0.1, height = 0.4, depth = 0.1 }
lower_arm = { width = 0.8, height = 0.15, depth = 0.15 }
lower_spacer = { width = 0.05, height = 0.1, depth = 0.05 }
gripper = { width = 0.2, height = 0.1, depth = 0.1 }

[motion]
tick_ms = 50
max_speeds = { swing = 20.0, lift = 0.2, elbow = 15.0, wrist = 15.0, gripper = 0.1 }
"#;

    #[test]
    fn test_parse_sample() {
        let config: CraneConfig = toml::from_str(SAMPLE).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.backend.connect_timeout(), Duration::from_millis(250));
        assert_eq!(config.dimensions.lift_max(), 3.0);
        assert_eq!(config.motion.max_speeds.swing, 20.0);
        assert_eq!(config.motion.initial_state, JointState::default());
    }

    #[test]
    fn test_sections_default() {
        let config: CraneConfig = toml::from_str("name = \"bare\"").unwrap();
        assert_eq!(config.backend.url, DEFAULT_BACKEND_URL);
        assert_eq!(config.dimensions, Dimensions::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = CraneConfig::default();
        config.backend.url = "http://localhost".to_string();
        assert!(config.validate().is_err());

        let mut config = CraneConfig::default();
        config.motion.tick_ms = 0;
        assert!(config.validate().is_err());

        let mut config = CraneConfig::default();
        config.motion.max_speeds.lift = -1.0;
        assert!(config.validate().is_err());

        let mut config = CraneConfig::default();
        config.motion.initial_state.lift = 10.0;
        assert!(config.validate().is_err());
    }
}
