use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::fsutil;
use crate::role::Role;

use super::{
    Error, EventStream, MediaPipeline, PipelineEvent, PipelineState, PropertyValue, Result,
};

/// A recorded sequence of pipeline observations.
///
/// ```json
/// {
///   "frames": [
///     { "properties": { "video-sink": { "frames-rendered": 100, "frames-dropped": 2 } } },
///     { "properties": { "video-sink": { "frames-rendered": 160, "frames-dropped": 2 } },
///       "events": [ { "type": "end-of-stream" } ] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct Trace {
    pub frames: Vec<ReplayFrame>,
}

impl Trace {
    /// Loads a JSON trace from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TraceOpen`] if the file cannot be opened and
    /// [`Error::TraceParse`] if it is not a valid trace.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = fsutil::open_file_reader(path)?;
        serde_json::from_reader(reader).map_err(|source| Error::TraceParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// One step of a [`Trace`].
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct ReplayFrame {
    /// Property tables per role.
    ///
    /// A role listed here has its whole table replaced; `null` removes the
    /// backing element. Roles not listed keep their previous values.
    #[serde(default)]
    pub properties: BTreeMap<Role, Option<BTreeMap<String, PropertyValue>>>,
    /// Events delivered when the frame is applied, in order.
    #[serde(default)]
    pub events: Vec<PipelineEvent>,
}

#[derive(Debug)]
struct Inner {
    frames: VecDeque<ReplayFrame>,
    elements: HashMap<Role, BTreeMap<String, PropertyValue>>,
    events_tx: Option<UnboundedSender<PipelineEvent>>,
    subscribed: bool,
    state: PipelineState,
    finished: bool,
    driver: Option<JoinHandle<()>>,
}

impl Inner {
    fn send(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events_tx {
            if tx.send(event).is_err() {
                log::trace!("replay event dropped: subscriber gone");
            }
        }
    }

    fn change_state(&mut self, new: PipelineState) {
        let old = std::mem::replace(&mut self.state, new);
        self.send(PipelineEvent::StateChanged {
            source: "pipeline0".to_owned(),
            top_level: true,
            old,
            new,
        });
    }
}

/// A [`MediaPipeline`] that plays back a [`Trace`].
///
/// Applying a frame makes its property tables current and delivers its events.
/// After the last frame an [`PipelineEvent::EndOfStream`] is delivered once.
///
/// With a frame period, the first frame is applied when the pipeline starts
/// playing and the remaining ones are applied by a background task, offset by
/// half a period so that every sampling tick observes exactly one frame.
/// Without a period, frames are applied only through [`ReplayPipeline::step`].
///
/// Clones share the same playback state.
#[derive(Debug, Clone)]
pub struct ReplayPipeline {
    inner: Arc<Mutex<Inner>>,
    period: Option<Duration>,
}

impl ReplayPipeline {
    pub fn new(trace: Trace, period: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                frames: trace.frames.into(),
                elements: HashMap::new(),
                events_tx: None,
                subscribed: false,
                state: PipelineState::Null,
                finished: false,
                driver: None,
            })),
            period,
        }
    }

    /// Creates a pipeline whose frames are applied only by [`ReplayPipeline::step`].
    pub fn manual(trace: Trace) -> Self {
        Self::new(trace, None)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies the next frame.
    ///
    /// Returns `false` once the trace is exhausted; the first such call delivers
    /// the end-of-stream event.
    pub fn step(&self) -> bool {
        let mut inner = self.lock();
        let Some(frame) = inner.frames.pop_front() else {
            if !inner.finished {
                inner.finished = true;
                inner.send(PipelineEvent::EndOfStream);
            }
            return false;
        };

        for (role, table) in frame.properties {
            match table {
                Some(table) => {
                    inner.elements.insert(role, table);
                }
                None => {
                    inner.elements.remove(&role);
                }
            }
        }
        for event in frame.events {
            inner.send(event);
        }
        true
    }

    /// Returns the number of frames not yet applied.
    pub fn remaining_frames(&self) -> usize {
        self.lock().frames.len()
    }

    pub fn state(&self) -> PipelineState {
        self.lock().state
    }

    fn spawn_driver(&self, period: Duration) -> JoinHandle<()> {
        let pipeline = self.clone();
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period + period / 2;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                interval.tick().await;
                if !pipeline.step() {
                    break;
                }
            }
        })
    }
}

impl MediaPipeline for ReplayPipeline {
    fn property(&self, role: Role, name: &str) -> Result<PropertyValue> {
        let inner = self.lock();
        let table = inner
            .elements
            .get(&role)
            .ok_or(Error::UnavailableRole(role))?;
        table
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownProperty {
                role,
                property: name.to_owned(),
            })
    }

    fn subscribe(&mut self) -> Result<EventStream> {
        let mut inner = self.lock();
        if inner.subscribed {
            return Err(Error::AlreadySubscribed);
        }
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        inner.events_tx = Some(tx);
        inner.subscribed = true;
        Ok(rx)
    }

    fn set_state(&mut self, state: PipelineState) -> Result<()> {
        if state != PipelineState::Playing {
            let mut inner = self.lock();
            if let Some(driver) = inner.driver.take() {
                driver.abort();
            }
            inner.change_state(state);
            return Ok(());
        }

        {
            let mut inner = self.lock();
            if inner.state == PipelineState::Playing {
                return Ok(());
            }
            if inner.frames.is_empty() {
                return Err(Error::StateChange {
                    state,
                    reason: "replay trace has no frames".to_owned(),
                });
            }
            inner.change_state(state);
        }

        self.step();
        if let Some(period) = self.period {
            let driver = self.spawn_driver(period);
            self.lock().driver = Some(driver);
        }
        Ok(())
    }

    fn teardown(&mut self) {
        let mut inner = self.lock();
        if let Some(driver) = inner.driver.take() {
            driver.abort();
        }
        inner.events_tx = None;
        inner.elements.clear();
        inner.frames.clear();
    }
}
