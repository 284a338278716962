//! Playback orchestrator
//!
//! [`Game`] ties the engine boundary, presentation surfaces, effects, audio
//! and saves together into one cooperative run loop. The loop owns the
//! engine cursor: it fetches the current node, synchronizes the scene,
//! dispatches on the node type, waits on the user (or engine transition),
//! advances, and yields between iterations. There is never more than one
//! loop instance; waits race against an explicit stop signal so halting
//! never depends on user activity, and the loop publishes its exit through
//! [`LoopPhase`] so quick-load can restart deterministically.

use crate::assets::{AssetCache, AssetFetcher, AssetKind};
use crate::audio::{AudioBackend, AudioCoordinator};
use crate::config::RuntimeConfig;
use crate::effects::typewriter::Typewriter;
use crate::engine::NarrativeEngine;
use crate::error::RuntimeError;
use crate::node::{Node, NodeType};
use crate::save::{MemorySaveStore, QUICK_SLOT, SaveCoordinator, SaveStore};
use crate::scene::SceneDirector;
use crate::state::{LoopPhase, PlaybackState};
use crate::surface::{
    BackgroundSurface, CharacterSurface, ChoiceSurface, DialogueSurface, InputSource,
};
use log::{error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::time::sleep;

/// A required component was not registered on the builder.
#[derive(Debug, Error)]
#[error("game is missing its {0}")]
pub struct MissingComponent(pub &'static str);

/// Explicit construction of the runtime: every collaborator is injected, so
/// each can be faked in isolation.
pub struct GameBuilder {
    config: RuntimeConfig,
    engine: Option<Box<dyn NarrativeEngine>>,
    fetcher: Option<Arc<dyn AssetFetcher>>,
    audio_backend: Option<Arc<dyn AudioBackend>>,
    save_store: Option<Arc<dyn SaveStore>>,
    background: Option<Arc<dyn BackgroundSurface>>,
    character: Option<Arc<dyn CharacterSurface>>,
    dialogue: Option<Arc<dyn DialogueSurface>>,
    choices: Option<Arc<dyn ChoiceSurface>>,
    input: Option<Arc<dyn InputSource>>,
}

impl GameBuilder {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            engine: None,
            fetcher: None,
            audio_backend: None,
            save_store: None,
            background: None,
            character: None,
            dialogue: None,
            choices: None,
            input: None,
        }
    }

    pub fn engine(mut self, engine: Box<dyn NarrativeEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn audio_backend(mut self, backend: Arc<dyn AudioBackend>) -> Self {
        self.audio_backend = Some(backend);
        self
    }

    /// Defaults to an in-memory store when not set.
    pub fn save_store(mut self, store: Arc<dyn SaveStore>) -> Self {
        self.save_store = Some(store);
        self
    }

    pub fn background(mut self, surface: Arc<dyn BackgroundSurface>) -> Self {
        self.background = Some(surface);
        self
    }

    pub fn character(mut self, surface: Arc<dyn CharacterSurface>) -> Self {
        self.character = Some(surface);
        self
    }

    pub fn dialogue(mut self, surface: Arc<dyn DialogueSurface>) -> Self {
        self.dialogue = Some(surface);
        self
    }

    pub fn choices(mut self, surface: Arc<dyn ChoiceSurface>) -> Self {
        self.choices = Some(surface);
        self
    }

    pub fn input(mut self, input: Arc<dyn InputSource>) -> Self {
        self.input = Some(input);
        self
    }

    pub fn build(self) -> Result<Game, MissingComponent> {
        let engine = self.engine.ok_or(MissingComponent("engine"))?;
        let fetcher = self.fetcher.ok_or(MissingComponent("asset fetcher"))?;
        let audio_backend = self
            .audio_backend
            .ok_or(MissingComponent("audio backend"))?;
        let background = self.background.ok_or(MissingComponent("background surface"))?;
        let character = self.character.ok_or(MissingComponent("character surface"))?;
        let dialogue = self.dialogue.ok_or(MissingComponent("dialogue surface"))?;
        let choices = self.choices.ok_or(MissingComponent("choice surface"))?;
        let input = self.input.ok_or(MissingComponent("input source"))?;
        let save_store = self
            .save_store
            .unwrap_or_else(|| Arc::new(MemorySaveStore::new()));

        let config = self.config;
        let assets = Arc::new(AssetCache::new(fetcher));
        let audio = Arc::new(AudioCoordinator::new(
            audio_backend,
            config.bgm_volume,
            config.se_volume,
        ));
        let scene = Arc::new(SceneDirector::new(
            assets.clone(),
            audio.clone(),
            background,
            character,
            config.paths.clone(),
            config.background_fade,
            config.character_fade,
        ));
        let saves = Arc::new(SaveCoordinator::new(
            save_store,
            config.save_prefix.clone(),
            config.save_slots,
        ));
        let typewriter = Typewriter::shared(config.typewriter_interval);

        Ok(Game {
            engine: Arc::new(Mutex::new(engine)),
            assets,
            audio,
            scene,
            dialogue,
            choices,
            input,
            typewriter,
            saves,
            state: Arc::new(PlaybackState::new()),
            config: Arc::new(config),
        })
    }
}

enum Flow {
    Continue,
    Stop,
}

enum Ack {
    Acknowledged,
    Interrupted,
}

/// The playback state machine. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Game {
    engine: Arc<Mutex<Box<dyn NarrativeEngine>>>,
    assets: Arc<AssetCache>,
    audio: Arc<AudioCoordinator>,
    scene: Arc<SceneDirector>,
    dialogue: Arc<dyn DialogueSurface>,
    choices: Arc<dyn ChoiceSurface>,
    input: Arc<dyn InputSource>,
    typewriter: Arc<Typewriter>,
    saves: Arc<SaveCoordinator>,
    state: Arc<PlaybackState>,
    config: Arc<RuntimeConfig>,
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game").finish_non_exhaustive()
    }
}

impl Game {
    pub fn builder(config: RuntimeConfig) -> GameBuilder {
        GameBuilder::new(config)
    }

    /// The audio coordinator, so the host can wire its unlock gesture and
    /// volume controls.
    pub fn audio(&self) -> &Arc<AudioCoordinator> {
        &self.audio
    }

    pub fn saves(&self) -> &Arc<SaveCoordinator> {
        &self.saves
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    pub fn loop_phase(&self) -> LoopPhase {
        self.state.phase()
    }

    fn lock_engine(&self) -> MutexGuard<'_, Box<dyn NarrativeEngine>> {
        self.engine.lock().expect("engine lock poisoned")
    }

    /// Initialize (once) and enter the run loop. Resolves when the loop
    /// terminates: end node, dead end, stop request, or a fatal engine
    /// protocol error (which is also the returned error).
    pub async fn start(&self) -> Result<(), RuntimeError> {
        if !self.state.is_running() {
            self.init().await?;
        }
        self.run_loop().await
    }

    async fn init(&self) -> Result<(), RuntimeError> {
        self.lock_engine().init()?;

        let script = self
            .assets
            .get(&self.config.script_url, AssetKind::Json)
            .await?;
        let json = script
            .as_json()
            .ok_or_else(|| RuntimeError::ScriptNotJson(self.config.script_url.clone()))?
            .to_string();
        self.lock_engine().load_script(&json)?;

        self.state.set_running(true);
        Ok(())
    }

    async fn run_loop(&self) -> Result<(), RuntimeError> {
        if !self.state.begin_loop() {
            return Err(RuntimeError::AlreadyRunning);
        }

        let result = self.run_inner().await;
        if let Err(e) = &result {
            error!("playback stopped: {e}");
        }
        self.state.set_running(false);
        self.state.publish_exit();
        result
    }

    async fn run_inner(&self) -> Result<(), RuntimeError> {
        while self.state.is_running() {
            if self.state.is_paused() {
                // Bounded poll keeps the loop responsive to resume without
                // fetching nodes while the menu is up.
                sleep(self.config.pause_poll).await;
                continue;
            }

            let node = self
                .lock_engine()
                .current_node()
                .ok_or(RuntimeError::NoCurrentNode)?;
            node.validate()?;

            // Assets settle before any text is revealed.
            self.scene.apply(&node).await;

            let flow = match node.kind {
                NodeType::Dialogue => self.play_dialogue(&node).await?,
                NodeType::Scene => self.advance_past(&node)?,
                NodeType::Choice => self.play_choice(&node).await?,
                NodeType::End => {
                    info!("reached end node '{}'", node.id);
                    self.clear_presentation().await;
                    Flow::Stop
                }
            };
            if let Flow::Stop = flow {
                break;
            }

            sleep(self.config.iteration_delay).await;
        }
        Ok(())
    }

    async fn play_dialogue(&self, node: &Node) -> Result<Flow, RuntimeError> {
        self.dialogue.show();
        self.dialogue.set_speaker(&node.speaker);

        let ack = if self.state.skip_mode() {
            // Fast-forward: full text at once, advance after a brief beat.
            self.dialogue.set_text(&node.text);
            tokio::select! {
                _ = self.state.stop_requested() => Ack::Interrupted,
                _ = sleep(self.config.iteration_delay) => Ack::Acknowledged,
            }
        } else {
            let reveal = {
                let typewriter = self.typewriter.clone();
                let sink = self.dialogue.clone();
                let text = node.text.clone();
                tokio::spawn(async move { typewriter.reveal(&text, &*sink).await })
            };

            // The reveal raises its typing flag on first poll. Input must
            // not be consumed before the task has observably started (or
            // already finished, for instant reveals): an acknowledgement
            // buffered across the node boundary has to hit the skip path,
            // not advance past text nobody has seen.
            while !self.typewriter.is_typing() && !reveal.is_finished() {
                tokio::task::yield_now().await;
            }

            let ack = self.wait_acknowledge().await;

            // Settle the reveal before anything else runs: at most one
            // typewriter is ever active.
            if let Ack::Interrupted = ack {
                self.typewriter.skip();
            }
            let _ = reveal.await;
            ack
        };

        match ack {
            Ack::Interrupted => Ok(Flow::Stop),
            Ack::Acknowledged => self.advance_past(node),
        }
    }

    /// One acknowledgement while the typewriter is active skips to the full
    /// text; an acknowledgement on settled text advances. Auto mode
    /// acknowledges by itself once the text has settled for a while.
    async fn wait_acknowledge(&self) -> Ack {
        loop {
            tokio::select! {
                _ = self.state.stop_requested() => return Ack::Interrupted,
                _ = self.input.wait_advance() => {
                    if self.typewriter.is_typing() {
                        self.typewriter.skip();
                    } else {
                        return Ack::Acknowledged;
                    }
                }
                _ = self.auto_advance_elapsed() => {
                    if self.state.auto_mode() && !self.typewriter.is_typing() {
                        return Ack::Acknowledged;
                    }
                }
            }
        }
    }

    /// Pends until auto mode is engaged, then runs out the auto-advance
    /// delay. Rebuilt on every acknowledgement iteration, so engaging auto
    /// mode while the wait is already parked on input takes effect without
    /// any other branch firing first.
    async fn auto_advance_elapsed(&self) {
        self.state.auto_engaged().await;
        sleep(self.config.auto_advance_delay).await;
    }

    fn advance_past(&self, node: &Node) -> Result<Flow, RuntimeError> {
        match node.next_node() {
            Some(next) => {
                self.lock_engine().goto_node(next)?;
                Ok(Flow::Continue)
            }
            None => {
                info!("node '{}' has no successor, stopping playback", node.id);
                Ok(Flow::Stop)
            }
        }
    }

    async fn play_choice(&self, node: &Node) -> Result<Flow, RuntimeError> {
        let index = tokio::select! {
            _ = self.state.stop_requested() => {
                self.choices.clear();
                return Ok(Flow::Stop);
            }
            index = self.choices.pick(&node.choices) => index,
        };

        if index >= node.choices.len() {
            warn!(
                "choice surface returned index {index} for {} choices, ignoring",
                node.choices.len()
            );
            return Ok(Flow::Continue);
        }

        if let Some(se) = &self.config.choice_se {
            self.audio.play_se(&self.config.paths.se(se)).await;
        }
        self.choices.clear();
        self.lock_engine().select_choice(index)?;
        Ok(Flow::Continue)
    }

    async fn clear_presentation(&self) {
        self.dialogue.clear();
        self.choices.clear();
        self.scene.clear().await;
    }

    /// Synchronous interrupt: jump the active typewriter to the full text.
    /// Does nothing when no reveal is active — advancing past settled text
    /// is the input source's business.
    pub fn advance(&self) {
        if self.typewriter.is_typing() {
            self.typewriter.skip();
        }
    }

    /// Pausing blocks the loop from fetching the next node; it does not
    /// cancel in-flight effects. The menu overlay is a host concern.
    pub fn pause(&self) {
        self.state.set_paused(true);
    }

    pub fn resume(&self) {
        self.state.set_paused(false);
    }

    pub fn toggle_pause(&self) -> bool {
        let paused = !self.state.is_paused();
        self.state.set_paused(paused);
        paused
    }

    pub fn toggle_auto(&self) -> bool {
        let auto = self.state.toggle_auto();
        info!("auto mode: {auto}");
        auto
    }

    pub fn toggle_skip(&self) -> bool {
        let skip = self.state.toggle_skip();
        info!("skip mode: {skip}");
        skip
    }

    /// Snapshot the engine into the quick slot. `false` on any failure.
    pub fn quick_save(&self) -> bool {
        let blob = match self.lock_engine().save_state() {
            Ok(blob) => blob,
            Err(e) => {
                error!("quick save failed: {e}");
                return false;
            }
        };
        let saved = self.saves.save(QUICK_SLOT, &blob);
        if saved {
            info!("game saved");
        }
        saved
    }

    /// Restore the quick slot and restart the run loop from the restored
    /// position. The current loop is halted first and its exit awaited, so
    /// a restored node can never race an already-dispatched one.
    pub async fn quick_load(&self) -> bool {
        let Some(record) = self.saves.load(QUICK_SLOT) else {
            return false;
        };

        let was_running = self.state.phase() == LoopPhase::Running;
        if was_running {
            self.state.set_running(false);
            self.state.loop_exited().await;
        }

        if let Err(e) = self.lock_engine().load_state(&record.state) {
            error!("quick load failed: {e}");
            if was_running {
                self.resume_loop();
            }
            return false;
        }

        info!("game loaded");
        self.resume_loop();
        true
    }

    fn resume_loop(&self) {
        self.state.set_running(true);
        let game = self.clone();
        tokio::spawn(async move {
            if let Err(e) = game.run_loop().await {
                error!("playback stopped after load: {e}");
            }
        });
    }

    /// Hard reset: stop the loop, clear every presentation layer and the
    /// asset cache, reset the engine to its initial script state, discard
    /// the playback flags.
    pub async fn return_to_title(&self) {
        self.state.set_running(false);
        self.state.loop_exited().await;

        self.clear_presentation().await;
        self.assets.clear();
        self.lock_engine().reset();
        self.state.reset();
    }
}
