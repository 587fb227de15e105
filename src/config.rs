use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use cvdn_sim::CameraConfig;
use serde::Deserialize;
use tracing::{debug, info};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub dataset: DatasetSettings,
    pub navigation: NavigationSettings,
    pub simulator: SimulatorSettings,
    pub replan: ReplanSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetSettings {
    pub splits: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavigationSettings {
    pub connectivity_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorSettings {
    pub camera_width: u32,
    pub camera_height: u32,
    pub camera_vfov_deg: f64,
}

impl SimulatorSettings {
    pub fn camera(&self) -> CameraConfig {
        CameraConfig {
            width: self.camera_width,
            height: self.camera_height,
            vfov: self.camera_vfov_deg.to_radians(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplanSettings {
    /// Commands a single message may issue before replanning gives up.
    pub max_steps_per_message: usize,
}

/// Loads settings from built-in defaults, `config/default.toml` if present,
/// an optional user file, and `CVDN__SECTION__KEY` environment variables, in
/// increasing priority.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder()
        .set_default("dataset.splits", vec!["train", "val_seen", "val_unseen"])?
        .set_default("navigation.connectivity_dir", "connectivity")?
        .set_default("simulator.camera_width", 640_i64)?
        .set_default("simulator.camera_height", 480_i64)?
        .set_default("simulator.camera_vfov_deg", 60.0)?
        .set_default("replan.max_steps_per_message", 100_i64)?
        .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(false));

    if let Some(path) = path {
        info!("Loading configuration from {}", path.display());
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
    }

    let settings: Settings = builder
        .add_source(Environment::with_prefix("CVDN").separator("__"))
        .build()?
        .try_deserialize()?;
    debug!(?settings, "Configuration loaded");
    Ok(settings)
}
