//! Replay client configuration.
use std::env;
use std::path::PathBuf;

use map_runtime::UpdaterConfig;

/// Replay configuration assembled from the environment.
#[derive(Clone, Debug)]
pub struct MapReplayConfig {
    pub updater: UpdaterConfig,
    /// Directory holding `faces.ron` and `animations.ron`.
    pub data_dir: Option<PathBuf>,
    /// Face catalog; overrides `data_dir`. Without either, every face starts
    /// as a placeholder.
    pub faces_file: Option<PathBuf>,
    pub animations_file: Option<PathBuf>,
    pub script_file: PathBuf,
    pub session_id: Option<String>,
}

impl Default for MapReplayConfig {
    fn default() -> Self {
        Self {
            updater: UpdaterConfig::default(),
            data_dir: None,
            faces_file: None,
            animations_file: None,
            script_file: PathBuf::from("session.ron"),
            session_id: None,
        }
    }
}

impl MapReplayConfig {
    /// Construct configuration from environment variables.
    ///
    /// Environment variables:
    /// - `MAP_DATA_DIR` - content directory (optional)
    /// - `MAP_FACES_FILE` - face catalog RON file (optional)
    /// - `MAP_ANIMATIONS_FILE` - animation catalog RON file (optional)
    /// - `MAP_SCRIPT_FILE` - recorded session to replay (default: `session.ron`)
    /// - `MAP_SESSION_ID` - log directory name (default: timestamp based)
    ///
    /// Updater tunables are read by [`UpdaterConfig::from_env`].
    pub fn from_env() -> Self {
        let mut config = Self {
            updater: UpdaterConfig::from_env(),
            ..Self::default()
        };

        config.data_dir = read_env::<PathBuf>("MAP_DATA_DIR");
        config.faces_file = read_env::<PathBuf>("MAP_FACES_FILE");
        config.animations_file = read_env::<PathBuf>("MAP_ANIMATIONS_FILE");
        if let Some(script) = read_env::<PathBuf>("MAP_SCRIPT_FILE") {
            config.script_file = script;
        }
        config.session_id = read_env::<String>("MAP_SESSION_ID").filter(|id| !id.is_empty());

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
