//! In-memory capture source driven by hand.
//!
//! Tests (and demos) push frames through a [`ScriptedHandle`] while a
//! recording pipeline consumes them, exercising the same channel contract
//! as the real screen capturer.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use clipcast_core::{CaptureRegion, Frame, StreamConfig};
use tokio::sync::mpsc;
use tracing::debug;

use crate::CaptureSource;

/// A [`CaptureSource`] whose frames are pushed manually.
pub struct ScriptedSource {
    shared: Arc<Mutex<Option<mpsc::Sender<Frame>>>>,
    /// Channel capacity override; defaults to the session's queue depth.
    capacity: Option<usize>,
}

/// Producer half of a [`ScriptedSource`]; push frames from any thread.
#[derive(Clone)]
pub struct ScriptedHandle {
    shared: Arc<Mutex<Option<mpsc::Sender<Frame>>>>,
}

impl ScriptedSource {
    pub fn new() -> (Self, ScriptedHandle) {
        let shared = Arc::new(Mutex::new(None));
        (
            Self { shared: Arc::clone(&shared), capacity: None },
            ScriptedHandle { shared },
        )
    }

    /// Like [`new`](Self::new) but with a fixed channel capacity, for tests
    /// that queue many frames before the consumer runs.
    pub fn with_capacity(capacity: usize) -> (Self, ScriptedHandle) {
        let (mut source, handle) = Self::new();
        source.capacity = Some(capacity);
        (source, handle)
    }
}

impl ScriptedHandle {
    /// Push one frame. Returns `false` if the source is not capturing or
    /// the queue is full (the frame is dropped, as a live source would).
    pub fn push(&self, frame: Frame) -> bool {
        let guard = self.shared.lock().expect("scripted source lock");
        match guard.as_ref() {
            Some(tx) => match tx.try_send(frame) {
                Ok(()) => true,
                Err(_) => {
                    debug!("scripted source: frame dropped (queue full or closed)");
                    false
                }
            },
            None => false,
        }
    }

    /// True once the source has started capturing.
    pub fn is_capturing(&self) -> bool {
        self.shared.lock().expect("scripted source lock").is_some()
    }

    /// End the frame stream without going through `stop_capture`, as a
    /// source that hits end-of-stream on its own would.
    pub fn finish(&self) {
        self.shared.lock().expect("scripted source lock").take();
    }

    /// Push one frame, waiting for queue space. Panics if not capturing.
    pub async fn push_wait(&self, frame: Frame) {
        let tx = {
            let guard = self.shared.lock().expect("scripted source lock");
            guard.clone().expect("scripted source not capturing")
        };
        tx.send(frame).await.expect("scripted source channel closed");
    }
}

#[async_trait]
impl CaptureSource for ScriptedSource {
    async fn start_capture(
        &mut self,
        _region: &CaptureRegion,
        config: &StreamConfig,
    ) -> anyhow::Result<mpsc::Receiver<Frame>> {
        let mut guard = self.shared.lock().expect("scripted source lock");
        anyhow::ensure!(guard.is_none(), "capture already running");

        let capacity = self.capacity.unwrap_or(config.queue_depth.max(1) as usize);
        let (tx, rx) = mpsc::channel(capacity);
        *guard = Some(tx);
        Ok(rx)
    }

    async fn stop_capture(&mut self) -> anyhow::Result<()> {
        // Dropping the sender closes the channel once queued frames drain.
        self.shared.lock().expect("scripted source lock").take();
        Ok(())
    }
}
