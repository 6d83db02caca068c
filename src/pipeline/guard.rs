use super::{EventStream, MediaPipeline, PipelineState, Result};

/// Scoped ownership of a running pipeline.
///
/// Releasing sets the pipeline to [`PipelineState::Null`] and tears it down.
/// This happens exactly once: either through [`PipelineGuard::release`] or,
/// on any other exit path including unwinding, when the guard is dropped.
#[derive(Debug)]
pub struct PipelineGuard<P: MediaPipeline> {
    pipeline: P,
    released: bool,
}

impl<P: MediaPipeline> PipelineGuard<P> {
    /// Subscribes to the pipeline's events and sets it to `Playing`.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's error if subscribing or starting fails. A pipeline
    /// that failed to start has already been released when this returns.
    pub fn start(mut pipeline: P) -> Result<(Self, EventStream)> {
        let events = pipeline.subscribe()?;
        let mut guard = Self {
            pipeline,
            released: false,
        };
        log::info!("Setting pipeline to play.");
        guard.pipeline.set_state(PipelineState::Playing)?;
        Ok((guard, events))
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Stops and tears down the pipeline. Subsequent calls do nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = self.pipeline.set_state(PipelineState::Null) {
            log::error!("failed to stop pipeline: {err}");
        }
        self.pipeline.teardown();
        log::debug!("pipeline released");
    }
}

impl<P: MediaPipeline> Drop for PipelineGuard<P> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Error, PropertyValue};
    use crate::role::Role;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct Calls {
        states: Vec<PipelineState>,
        teardowns: usize,
    }

    #[derive(Debug)]
    struct RecordingPipeline {
        calls: Arc<Mutex<Calls>>,
        fail_start: bool,
    }

    impl MediaPipeline for RecordingPipeline {
        fn property(&self, role: Role, _name: &str) -> Result<PropertyValue> {
            Err(Error::UnavailableRole(role))
        }

        fn subscribe(&mut self) -> Result<EventStream> {
            let (_tx, rx) = tokio::sync::mpsc::unbounded_channel();
            Ok(rx)
        }

        fn set_state(&mut self, state: PipelineState) -> Result<()> {
            self.calls.lock().unwrap().states.push(state);
            if self.fail_start && state == PipelineState::Playing {
                return Err(Error::StateChange {
                    state,
                    reason: "refused".to_owned(),
                });
            }
            Ok(())
        }

        fn teardown(&mut self) {
            self.calls.lock().unwrap().teardowns += 1;
        }
    }

    fn recording(fail_start: bool) -> (RecordingPipeline, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        (
            RecordingPipeline {
                calls: Arc::clone(&calls),
                fail_start,
            },
            calls,
        )
    }

    #[test]
    fn test_release_runs_exactly_once() {
        let (pipeline, calls) = recording(false);
        let (mut guard, _events) = PipelineGuard::start(pipeline).unwrap();

        guard.release();
        guard.release();
        assert!(guard.is_released());
        drop(guard);

        let calls = calls.lock().unwrap();
        assert_eq!(
            calls.states,
            vec![PipelineState::Playing, PipelineState::Null]
        );
        assert_eq!(calls.teardowns, 1);
    }

    #[test]
    fn test_drop_releases() {
        let (pipeline, calls) = recording(false);
        let (guard, _events) = PipelineGuard::start(pipeline).unwrap();

        drop(guard);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.states.last(), Some(&PipelineState::Null));
        assert_eq!(calls.teardowns, 1);
    }

    #[test]
    fn test_failed_start_still_releases() {
        let (pipeline, calls) = recording(true);

        let err = PipelineGuard::start(pipeline).unwrap_err();

        assert!(matches!(err, Error::StateChange { .. }));
        let calls = calls.lock().unwrap();
        assert_eq!(
            calls.states,
            vec![PipelineState::Playing, PipelineState::Null]
        );
        assert_eq!(calls.teardowns, 1);
    }
}
