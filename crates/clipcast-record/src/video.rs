//! Incremental video recording: capture source → ingest task → sample sink.

use std::path::{Path, PathBuf};

use clipcast_capture::CaptureSource;
use clipcast_core::{CaptureError, CaptureRegion, CaptureSettings, StreamConfig};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::ingest::{self, SampleSink, VideoIngestReport};
use crate::mp4::Mp4Writer;

/// Builds the sink for a session: output path, pixel dimensions, stream
/// configuration.
type SinkFactory<S> =
    Box<dyn Fn(&Path, u32, u32, &StreamConfig) -> Result<S, CaptureError> + Send>;

/// One-session video recorder.
///
/// ```text
/// Idle ──start──► Recording ──stop──► Completed(path)
///                     │                  Failed(err)
///                     └─stop, 0 frames─► Idle  (NoFrames, reusable)
/// ```
///
/// `start` is rejected outside `Idle`. After a session completed or failed,
/// `stop` replays the terminal result without touching the encoder again.
///
/// Generic over the [`SampleSink`] receiving the frames; [`new`](Self::new)
/// wires up the H.264/MP4 writer.
pub struct VideoRecorder<S: SampleSink = Mp4Writer> {
    source: Box<dyn CaptureSource>,
    make_sink: SinkFactory<S>,
    state: State<S>,
}

enum State<S: SampleSink> {
    Idle,
    Recording {
        ingest: JoinHandle<VideoIngestReport<S>>,
    },
    Completed { output: PathBuf },
    Failed { error: CaptureError },
}

impl VideoRecorder {
    pub fn new(source: Box<dyn CaptureSource>) -> Self {
        Self::with_sink(source, Mp4Writer::create)
    }
}

impl<S: SampleSink> VideoRecorder<S> {
    /// A recorder writing into sinks built by `make_sink`, one per session.
    pub fn with_sink(
        source: Box<dyn CaptureSource>,
        make_sink: impl Fn(&Path, u32, u32, &StreamConfig) -> Result<S, CaptureError>
            + Send
            + 'static,
    ) -> Self {
        Self { source, make_sink: Box::new(make_sink), state: State::Idle }
    }

    /// Configure the capture source and start listening for frames.
    ///
    /// The sink is bound to `output` and the region's pixel dimensions,
    /// but writes nothing until the first complete frame arrives.
    pub async fn start(
        &mut self,
        region: &CaptureRegion,
        settings: &CaptureSettings,
        output: PathBuf,
    ) -> Result<(), CaptureError> {
        if !matches!(self.state, State::Idle) {
            return Err(CaptureError::SessionActive);
        }

        let config = StreamConfig::for_video(settings);
        let sink =
            (self.make_sink)(&output, region.pixel_width(), region.pixel_height(), &config)?;

        let frames = self
            .source
            .start_capture(region, &config)
            .await
            .map_err(|e| CaptureError::source(format!("{e:#}")))?;

        info!(
            "video recording started: {}×{} → {}",
            region.pixel_width(),
            region.pixel_height(),
            output.display()
        );
        let ingest = tokio::spawn(ingest::run_video_ingest(frames, sink));
        self.state = State::Recording { ingest };
        Ok(())
    }

    /// Stop capturing, flush the sink, and return the output path.
    ///
    /// Fails with [`CaptureError::NoFrames`] (and leaves no file) when no
    /// complete frame was ever accepted; the recorder is then reusable.
    pub async fn stop(&mut self) -> Result<PathBuf, CaptureError> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => Err(CaptureError::NoSession),
            State::Completed { output } => {
                self.state = State::Completed { output: output.clone() };
                Ok(output)
            }
            State::Failed { error } => {
                self.state = State::Failed { error: error.clone() };
                Err(error)
            }
            State::Recording { ingest } => {
                let result = self.finish(ingest).await;
                self.state = match &result {
                    Ok(path) => State::Completed { output: path.clone() },
                    Err(CaptureError::NoFrames) => State::Idle,
                    Err(e) => State::Failed { error: e.clone() },
                };
                result
            }
        }
    }

    async fn finish(
        &mut self,
        ingest: JoinHandle<VideoIngestReport<S>>,
    ) -> Result<PathBuf, CaptureError> {
        // Stop the source first; only once it acknowledges is the frame
        // channel guaranteed to close, letting the ingest task hand the
        // sink back with no further callbacks in flight.
        if let Err(e) = self.source.stop_capture().await {
            ingest.abort();
            return Err(CaptureError::source(format!("{e:#}")));
        }

        let report = ingest
            .await
            .map_err(|e| CaptureError::save_failed(format!("ingest task failed: {e}")))?;
        if !report.started {
            return Err(CaptureError::NoFrames);
        }
        debug!(
            "video ingest accepted {} frames ({} dropped under backpressure)",
            report.accepted, report.dropped
        );

        // The sink may block while flushing; keep it off the executor.
        let sink = report.sink;
        tokio::task::spawn_blocking(move || sink.finalize())
            .await
            .map_err(|e| CaptureError::save_failed(format!("finalize task failed: {e}")))?
    }
}
