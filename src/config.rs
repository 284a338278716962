//! Runtime configuration
//!
//! Every tunable the playback loop, effects, audio and save system consume.
//! Defaults mirror typical visual-novel pacing.

use crate::assets::AssetPaths;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// URL of the script JSON fed to the engine at startup.
    pub script_url: String,
    pub paths: AssetPaths,

    /// Delay per revealed character; zero disables the typewriter.
    pub typewriter_interval: Duration,
    pub background_fade: Duration,
    pub character_fade: Duration,

    /// Poll interval while paused.
    pub pause_poll: Duration,
    /// Yield between loop iterations to keep the host responsive.
    pub iteration_delay: Duration,
    /// How long auto mode lingers on a settled dialogue before advancing.
    pub auto_advance_delay: Duration,

    pub bgm_volume: f32,
    pub se_volume: f32,
    /// SE filename (under the `se/` directory) played on choice selection.
    pub choice_se: Option<String>,

    pub save_prefix: String,
    pub save_slots: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            script_url: "assets/data/script.json".to_string(),
            paths: AssetPaths::default(),
            typewriter_interval: Duration::from_millis(50),
            background_fade: Duration::from_millis(300),
            character_fade: Duration::from_millis(200),
            pause_poll: Duration::from_millis(100),
            iteration_delay: Duration::from_millis(50),
            auto_advance_delay: Duration::from_millis(1500),
            bgm_volume: 0.5,
            se_volume: 0.7,
            choice_se: Some("click.mp3".to_string()),
            save_prefix: "avg_save_".to_string(),
            save_slots: 10,
        }
    }
}
