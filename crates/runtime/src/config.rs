//! Updater configuration structures and loaders.
use std::env;

use map_core::MapConfig;

/// Tunables of a [`crate::MapUpdater`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdaterConfig {
    /// How far outside the viewport protocol coordinates may reach.
    pub coord_margin: i32,
    /// Capacity of each event bus topic.
    pub event_buffer_size: usize,
    /// Seed for random animation start frames; `None` seeds from entropy.
    pub animation_seed: Option<u64>,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            coord_margin: MapConfig::DEFAULT_COORD_MARGIN,
            event_buffer_size: 100,
            animation_seed: None,
        }
    }
}

impl UpdaterConfig {
    /// Construct configuration from process environment variables.
    ///
    /// - `MAP_COORD_MARGIN` - accepted distance outside the viewport (default: 15)
    /// - `MAP_EVENT_BUFFER` - event bus capacity per topic (default: 100)
    /// - `MAP_ANIMATION_SEED` - fixed seed for random animations (default: entropy)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(margin) = read_env::<i32>("MAP_COORD_MARGIN") {
            config.coord_margin = margin.max(0);
        }

        if let Some(capacity) = read_env::<usize>("MAP_EVENT_BUFFER") {
            config.event_buffer_size = capacity.max(1);
        }

        config.animation_seed = read_env::<u64>("MAP_ANIMATION_SEED");

        config
    }

    pub fn map_config(&self) -> MapConfig {
        MapConfig::with_coord_margin(self.coord_margin)
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol() {
        let config = UpdaterConfig::default();
        assert_eq!(config.coord_margin, 15);
        assert_eq!(config.map_config().coord_margin, 15);
        assert!(config.animation_seed.is_none());
    }

    #[test]
    fn negative_margin_is_clamped() {
        let config = UpdaterConfig {
            coord_margin: -4,
            ..UpdaterConfig::default()
        };
        assert_eq!(config.map_config().coord_margin, 0);
    }
}
