//! Presentation capability traits
//!
//! The orchestrator and the effect primitives are host-UI-agnostic: a
//! concrete target environment (DOM, TUI, game-engine scene graph) supplies
//! implementations of these traits, and tests supply fakes. Each surface
//! exposes the minimal capability its consumer needs.

use crate::effects::fade::FadeTarget;
use crate::node::Choice;
use async_trait::async_trait;

/// Receives partial and full text writes from the typewriter.
pub trait TextSink: Send + Sync {
    fn set_text(&self, text: &str);
}

/// The dialogue box: speaker label plus the text body.
pub trait DialogueSurface: TextSink {
    fn show(&self);
    fn hide(&self);
    fn set_speaker(&self, speaker: &str);
    /// Empty the box and hide it.
    fn clear(&self);
}

/// The scene background layer.
pub trait BackgroundSurface: FadeTarget {
    /// Swap the displayed image. The asset behind `url` has already been
    /// loaded through the cache when this is called.
    fn set_image(&self, url: &str);
    fn clear(&self);
}

/// The character portrait layer.
pub trait CharacterSurface: FadeTarget {
    fn set_image(&self, url: &str);
    fn clear(&self);
}

/// Presents an ordered choice list and resolves with the selected 0-based
/// index. The returned index must be within the presented list.
#[async_trait]
pub trait ChoiceSurface: Send + Sync {
    async fn pick(&self, choices: &[Choice]) -> usize;
    fn clear(&self);
}

/// Source of dialogue acknowledgements (click / advance key). Resolves once
/// per user acknowledgement.
#[async_trait]
pub trait InputSource: Send + Sync {
    async fn wait_advance(&self);
}
