//! Scripted factory and recording controller used by the unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::watch;

use crate::factory::{Controller, ControllerFactory, FactoryOutcome, PreloadMode, VideoSource};
use crate::feed::{VideoEntry, VideoId};

/// Scripted result for a video id
#[derive(Debug, Clone)]
pub(crate) enum Script {
    Succeed,
    Fail(String),
    NotApplicable,
}

#[derive(Default)]
struct Shared {
    calls: Mutex<Vec<(VideoId, PreloadMode)>>,
    scripts: Mutex<HashMap<VideoId, Script>>,
    gates: Mutex<HashMap<VideoId, watch::Receiver<bool>>>,
    releases: AtomicUsize,
}

/// Factory whose outcome is scripted per id; succeeds by default
#[derive(Clone, Default)]
pub(crate) struct ScriptedFactory {
    shared: Arc<Shared>,
}

/// Holds a video's factory call in flight until opened
pub(crate) struct Gate {
    tx: watch::Sender<bool>,
}

impl Gate {
    pub(crate) fn open(&self) {
        let _ = self.tx.send(true);
    }
}

impl ScriptedFactory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(&self, id: &str, script: Script) {
        self.shared
            .scripts
            .lock()
            .unwrap()
            .insert(VideoId::new(id), script);
    }

    /// Block calls for `id` until the returned gate is opened
    pub(crate) fn hold(&self, id: &str) -> Gate {
        let (tx, rx) = watch::channel(false);
        self.shared.gates.lock().unwrap().insert(VideoId::new(id), rx);
        Gate { tx }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.shared.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_for(&self, id: &str) -> usize {
        self.shared
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called.as_str() == id)
            .count()
    }

    pub(crate) fn called_ids(&self) -> Vec<String> {
        self.shared
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.to_string())
            .collect()
    }

    pub(crate) fn release_count(&self) -> usize {
        self.shared.releases.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ControllerFactory for ScriptedFactory {
    async fn create(&self, entry: &VideoEntry, source: &VideoSource) -> FactoryOutcome {
        self.shared
            .calls
            .lock()
            .unwrap()
            .push((entry.id.clone(), source.mode()));

        let gate = self.shared.gates.lock().unwrap().get(&entry.id).cloned();
        if let Some(mut rx) = gate {
            let _ = rx.wait_for(|open| *open).await;
        }

        let script = self
            .shared
            .scripts
            .lock()
            .unwrap()
            .get(&entry.id)
            .cloned()
            .unwrap_or(Script::Succeed);

        match script {
            Script::Succeed => {
                let thumbnail = match source.mode() {
                    PreloadMode::Thumbnail => Some(Bytes::from(format!("frame:{}", entry.id))),
                    PreloadMode::Playback => None,
                };
                FactoryOutcome::Created(Box::new(RecordingController {
                    shared: Arc::clone(&self.shared),
                    playing: false,
                    thumbnail,
                }))
            }
            Script::Fail(reason) => FactoryOutcome::Failed(reason),
            Script::NotApplicable => FactoryOutcome::NotApplicable,
        }
    }
}

/// Controller that counts releases on the factory it came from
pub(crate) struct RecordingController {
    shared: Arc<Shared>,
    playing: bool,
    thumbnail: Option<Bytes>,
}

impl RecordingController {
    /// Controller not tied to any factory
    pub(crate) fn detached() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            playing: false,
            thumbnail: None,
        }
    }
}

impl Controller for RecordingController {
    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn thumbnail(&self) -> Option<Bytes> {
        self.thumbnail.clone()
    }

    fn release(&mut self) {
        self.playing = false;
        self.shared.releases.fetch_add(1, Ordering::SeqCst);
    }
}
