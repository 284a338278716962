//! Scene director
//!
//! Applies a node's asset deltas — background, character portrait, BGM,
//! sound effect — to the presentation layers before any text is revealed.
//! Asset failures degrade locally: the element stays as it was, a warning is
//! logged, and narrative progression continues.

use crate::assets::{AssetCache, AssetKind, AssetPaths};
use crate::audio::AudioCoordinator;
use crate::effects::fade::Fade;
use crate::node::Node;
use crate::surface::{BackgroundSurface, CharacterSurface};
use log::warn;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct SceneDirector {
    assets: Arc<AssetCache>,
    audio: Arc<AudioCoordinator>,
    background: Arc<dyn BackgroundSurface>,
    character: Arc<dyn CharacterSurface>,
    paths: AssetPaths,
    background_fade: Fade,
    character_fade: Fade,
    current_background: Mutex<String>,
    current_character: Mutex<String>,
}

impl SceneDirector {
    pub fn new(
        assets: Arc<AssetCache>,
        audio: Arc<AudioCoordinator>,
        background: Arc<dyn BackgroundSurface>,
        character: Arc<dyn CharacterSurface>,
        paths: AssetPaths,
        background_fade: Duration,
        character_fade: Duration,
    ) -> Self {
        Self {
            assets,
            audio,
            background,
            character,
            paths,
            background_fade: Fade::new(background_fade),
            character_fade: Fade::new(character_fade),
            current_background: Mutex::new(String::new()),
            current_character: Mutex::new(String::new()),
        }
    }

    /// Synchronize every presentation layer with `node`. Completes before
    /// the caller reveals text; audio requests are issued here but their
    /// playback outcome is best-effort.
    pub async fn apply(&self, node: &Node) {
        self.apply_background(node).await;
        self.apply_character(node).await;

        if let Some(bgm) = node.bgm() {
            self.audio.play_bgm(&self.paths.bgm(bgm), true).await;
        }
        if let Some(se) = node.sound_effect() {
            self.audio.play_se(&self.paths.se(se)).await;
        }
    }

    async fn apply_background(&self, node: &Node) {
        let Some(name) = node.background() else {
            // Empty background field means "no change", not "clear".
            return;
        };
        let url = self.paths.background(name);
        if *self.current_background.lock().expect("scene lock poisoned") == url {
            return;
        }

        match self.assets.get(&url, AssetKind::Image).await {
            Ok(_) => {
                self.background_fade.fade_out(&*self.background).await;
                self.background.set_image(&url);
                *self.current_background.lock().expect("scene lock poisoned") = url;
                self.background_fade.fade_in(&*self.background).await;
            }
            Err(e) => warn!("background load failed, keeping current: {e}"),
        }
    }

    async fn apply_character(&self, node: &Node) {
        let Some(name) = node.character() else {
            // A node without a character clears the portrait layer.
            let had_character = {
                let mut current = self.current_character.lock().expect("scene lock poisoned");
                let had = !current.is_empty();
                current.clear();
                had
            };
            if had_character {
                self.character_fade.fade_out(&*self.character).await;
                self.character.clear();
            }
            return;
        };

        let url = self.paths.character(name, node.expression());
        let previous = {
            let current = self.current_character.lock().expect("scene lock poisoned");
            current.clone()
        };
        if previous == url {
            return;
        }

        match self.assets.get(&url, AssetKind::Image).await {
            Ok(_) => {
                if !previous.is_empty() {
                    self.character_fade.fade_out(&*self.character).await;
                }
                self.character.set_image(&url);
                *self.current_character.lock().expect("scene lock poisoned") = url;
                self.character_fade.fade_in(&*self.character).await;
            }
            Err(e) => warn!("character load failed, keeping current: {e}"),
        }
    }

    /// Empty both visual layers and stop the music (end node and
    /// return-to-title).
    pub async fn clear(&self) {
        self.background.clear();
        self.character_fade.fade_out(&*self.character).await;
        self.character.clear();
        self.audio.stop_bgm();
        self.current_background
            .lock()
            .expect("scene lock poisoned")
            .clear();
        self.current_character
            .lock()
            .expect("scene lock poisoned")
            .clear();
    }
}
