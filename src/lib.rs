//! # kamishibai
//!
//! Client-side playback runtime for node-based visual novels. The runtime
//! owns pacing and presentation: it drives a single cooperative run loop
//! over the nodes a narrative engine hands back, reveals dialogue through a
//! typewriter effect, presents choices, fades scene art in and out, gates
//! audio behind the host's unlock gesture, and snapshots engine state into
//! versioned save slots.
//!
//! The narrative engine itself (node graph, variables, branching) sits
//! behind the [`engine::NarrativeEngine`] trait; [`script::ScriptEngine`]
//! is a complete in-process implementation of it. Everything the runtime
//! touches in the host environment — surfaces, input, audio output, asset
//! transport, persistence — is likewise a trait, so the same loop runs
//! against a DOM, a TUI, or the fakes in the test suite.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use kamishibai::{Game, RuntimeConfig, ScriptEngine};
//!
//! let game = Game::builder(RuntimeConfig::default())
//!     .engine(Box::new(ScriptEngine::new()))
//!     .fetcher(my_fetcher)
//!     .audio_backend(my_audio)
//!     .background(my_background)
//!     .character(my_character)
//!     .dialogue(my_dialogue)
//!     .choices(my_choices)
//!     .input(my_input)
//!     .build()?;
//!
//! // On the first user gesture:
//! game.audio().unlock().await;
//!
//! // Runs until an end node, a dead end, or a stop request.
//! game.start().await?;
//! ```

pub mod assets;
pub mod audio;
pub mod config;
pub mod effects;
pub mod engine;
pub mod error;
pub mod game;
pub mod node;
pub mod save;
pub mod scene;
pub mod script;
pub mod state;
pub mod surface;

pub use assets::{Asset, AssetCache, AssetError, AssetFetcher, AssetKind, AssetPaths, FsAssetFetcher};
pub use audio::{AudioBackend, AudioCoordinator, AudioError};
pub use config::RuntimeConfig;
pub use effects::{Fade, FadeTarget, Typewriter};
pub use engine::{EngineError, NarrativeEngine};
pub use error::RuntimeError;
pub use game::{Game, GameBuilder, MissingComponent};
pub use node::{Choice, Node, NodeError, NodeType};
pub use save::{
    DirectorySaveStore, MemorySaveStore, SaveCoordinator, SaveRecord, SaveStore, SlotSummary,
    StoreError, QUICK_SLOT,
};
pub use scene::SceneDirector;
pub use script::{Script, ScriptEngine};
pub use state::{LoopPhase, PlaybackState};
pub use surface::{
    BackgroundSurface, CharacterSurface, ChoiceSurface, DialogueSurface, InputSource, TextSink,
};
