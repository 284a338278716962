//! Shared fakes for the integration tests: an in-memory asset fetcher,
//! recording surfaces, a scripted choice picker and a channel-driven input
//! source. Everything records what the runtime did to it.

use async_trait::async_trait;
use kamishibai::{
    Asset, AssetError, AssetFetcher, AssetKind, AudioBackend, AudioError, BackgroundSurface,
    CharacterSurface, Choice, ChoiceSurface, DialogueSurface, EngineError, FadeTarget,
    InputSource, NarrativeEngine, Node, RuntimeConfig, TextSink,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Millisecond-scale pacing so whole playthroughs finish in well under a
/// second of wall time.
pub fn fast_config(script_url: &str) -> RuntimeConfig {
    RuntimeConfig {
        script_url: script_url.to_string(),
        typewriter_interval: Duration::ZERO,
        background_fade: Duration::ZERO,
        character_fade: Duration::ZERO,
        pause_poll: Duration::from_millis(1),
        iteration_delay: Duration::from_millis(1),
        auto_advance_delay: Duration::from_millis(10),
        ..RuntimeConfig::default()
    }
}

/// Polls `condition` until it holds or two seconds elapse.
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Serves assets from a map and records every URL that reached it.
pub struct MapFetcher {
    entries: Mutex<HashMap<String, String>>,
    pub fetched: Mutex<Vec<String>>,
}

impl MapFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            fetched: Mutex::new(Vec::new()),
        })
    }

    pub fn insert(&self, url: &str, body: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetFetcher for MapFetcher {
    async fn fetch(&self, url: &str, kind: AssetKind) -> Result<Asset, AssetError> {
        self.fetched.lock().unwrap().push(url.to_string());
        let body = self
            .entries
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());

        match kind {
            AssetKind::Json => {
                let value = serde_json::from_str(&body)
                    .map_err(|e| AssetError::decode(url, e.to_string()))?;
                Ok(Asset::Json(Arc::new(value)))
            }
            AssetKind::Image | AssetKind::Audio => {
                Ok(Asset::Bytes(Arc::new(body.into_bytes())))
            }
        }
    }
}

/// Fadeable image layer that remembers the last image set on it.
#[derive(Default)]
pub struct FakeLayer {
    pub image: Mutex<Option<String>>,
    opacity: Mutex<f32>,
}

impl FakeLayer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn image(&self) -> Option<String> {
        self.image.lock().unwrap().clone()
    }
}

impl FadeTarget for FakeLayer {
    fn opacity(&self) -> f32 {
        *self.opacity.lock().unwrap()
    }
    fn set_opacity(&self, value: f32) {
        *self.opacity.lock().unwrap() = value;
    }
}

impl BackgroundSurface for FakeLayer {
    fn set_image(&self, url: &str) {
        *self.image.lock().unwrap() = Some(url.to_string());
    }
    fn clear(&self) {
        *self.image.lock().unwrap() = None;
    }
}

impl CharacterSurface for FakeLayer {
    fn set_image(&self, url: &str) {
        *self.image.lock().unwrap() = Some(url.to_string());
    }
    fn clear(&self) {
        *self.image.lock().unwrap() = None;
    }
}

/// Dialogue box recording speaker and every text write.
#[derive(Default)]
pub struct FakeDialogue {
    pub texts: Mutex<Vec<String>>,
    pub speaker: Mutex<String>,
    pub visible: Mutex<bool>,
}

impl FakeDialogue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn last_text(&self) -> String {
        self.texts.lock().unwrap().last().cloned().unwrap_or_default()
    }

    pub fn is_visible(&self) -> bool {
        *self.visible.lock().unwrap()
    }
}

impl TextSink for FakeDialogue {
    fn set_text(&self, text: &str) {
        self.texts.lock().unwrap().push(text.to_string());
    }
}

impl DialogueSurface for FakeDialogue {
    fn show(&self) {
        *self.visible.lock().unwrap() = true;
    }
    fn hide(&self) {
        *self.visible.lock().unwrap() = false;
    }
    fn set_speaker(&self, speaker: &str) {
        *self.speaker.lock().unwrap() = speaker.to_string();
    }
    fn clear(&self) {
        self.texts.lock().unwrap().push(String::new());
        *self.visible.lock().unwrap() = false;
    }
}

/// Resolves picks from a pre-scripted list of indices; once the list is
/// exhausted, `pick` pends forever (nobody is at the controls).
pub struct ScriptedChoices {
    picks: Mutex<Vec<usize>>,
    pub presented: Mutex<Vec<Vec<String>>>,
    pub cleared: AtomicUsize,
}

impl ScriptedChoices {
    pub fn new(picks: Vec<usize>) -> Arc<Self> {
        Arc::new(Self {
            picks: Mutex::new(picks),
            presented: Mutex::new(Vec::new()),
            cleared: AtomicUsize::new(0),
        })
    }

    pub fn cleared(&self) -> usize {
        self.cleared.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChoiceSurface for ScriptedChoices {
    async fn pick(&self, choices: &[Choice]) -> usize {
        self.presented
            .lock()
            .unwrap()
            .push(choices.iter().map(|c| c.text.clone()).collect());
        let next = {
            let mut picks = self.picks.lock().unwrap();
            if picks.is_empty() { None } else { Some(picks.remove(0)) }
        };
        match next {
            Some(index) => index,
            None => std::future::pending().await,
        }
    }

    fn clear(&self) {
        self.cleared.fetch_add(1, Ordering::SeqCst);
    }
}

/// Input source fed by a channel; acknowledgements queue up until the loop
/// consumes them. When the sender is gone, waits pend forever.
pub struct ChannelInput {
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<()>>,
}

impl ChannelInput {
    pub fn new() -> (mpsc::UnboundedSender<()>, Arc<Self>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Arc::new(Self {
                rx: tokio::sync::Mutex::new(rx),
            }),
        )
    }
}

#[async_trait]
impl InputSource for ChannelInput {
    async fn wait_advance(&self) {
        let mut rx = self.rx.lock().await;
        if rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

/// Records every backend call in order.
#[derive(Default)]
pub struct RecordingAudio {
    pub bgm_starts: Mutex<Vec<String>>,
    pub se_starts: Mutex<Vec<String>>,
    playing: Mutex<bool>,
}

impl RecordingAudio {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn bgm_starts(&self) -> Vec<String> {
        self.bgm_starts.lock().unwrap().clone()
    }

    pub fn se_starts(&self) -> Vec<String> {
        self.se_starts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioBackend for RecordingAudio {
    async fn play_bgm(&self, url: &str, _looping: bool, _volume: f32) -> Result<(), AudioError> {
        self.bgm_starts.lock().unwrap().push(url.to_string());
        *self.playing.lock().unwrap() = true;
        Ok(())
    }

    fn stop_bgm(&self) {
        *self.playing.lock().unwrap() = false;
    }

    fn bgm_playing(&self) -> bool {
        *self.playing.lock().unwrap()
    }

    fn set_bgm_volume(&self, _volume: f32) {}

    async fn play_se(&self, url: &str, _volume: f32) -> Result<(), AudioError> {
        self.se_starts.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Delegating engine wrapper that counts node fetches, so tests can assert
/// how many loop iterations actually dispatched.
pub struct CountingEngine<E> {
    inner: E,
    pub node_fetches: Arc<AtomicUsize>,
}

impl<E: NarrativeEngine> CountingEngine<E> {
    pub fn new(inner: E) -> (Arc<AtomicUsize>, Self) {
        let counter = Arc::new(AtomicUsize::new(0));
        (
            counter.clone(),
            Self {
                inner,
                node_fetches: counter,
            },
        )
    }
}

impl<E: NarrativeEngine> NarrativeEngine for CountingEngine<E> {
    fn init(&mut self) -> Result<(), EngineError> {
        self.inner.init()
    }
    fn load_script(&mut self, json: &str) -> Result<(), EngineError> {
        self.inner.load_script(json)
    }
    fn current_node(&self) -> Option<Node> {
        self.node_fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.current_node()
    }
    fn goto_node(&mut self, id: &str) -> Result<(), EngineError> {
        self.inner.goto_node(id)
    }
    fn select_choice(&mut self, index: usize) -> Result<(), EngineError> {
        self.inner.select_choice(index)
    }
    fn go_back(&mut self) -> Result<(), EngineError> {
        self.inner.go_back()
    }
    fn can_go_back(&self) -> bool {
        self.inner.can_go_back()
    }
    fn set_variable(&mut self, name: &str, value: i32) -> Result<(), EngineError> {
        self.inner.set_variable(name, value)
    }
    fn get_variable(&self, name: &str) -> i32 {
        self.inner.get_variable(name)
    }
    fn save_state(&self) -> Result<String, EngineError> {
        self.inner.save_state()
    }
    fn load_state(&mut self, blob: &str) -> Result<(), EngineError> {
        self.inner.load_state(blob)
    }
    fn reset(&mut self) {
        self.inner.reset()
    }
    fn shutdown(&mut self) {
        self.inner.shutdown()
    }
}
