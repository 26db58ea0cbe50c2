//! X11 screen capture via GStreamer `ximagesrc`.
//!
//! `ximagesrc` crops to the region's pixel rectangle directly
//! (startx/starty/endx/endy), so no downstream crop element is needed.
//! `videorate drop-only=true` enforces the configured minimum frame
//! interval without duplicating frames.

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use clipcast_core::{CaptureRegion, Frame, FrameStatus, StreamConfig};
use gstreamer::prelude::*;
use gstreamer_app::{AppSink, AppSinkCallbacks};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::CaptureSource;

/// Captures one display region as a frame stream. Open with
/// [`ScreenCapturer::new`], then drive through the [`CaptureSource`] trait.
#[derive(Default)]
pub struct ScreenCapturer {
    running: Option<Running>,
}

struct Running {
    pipeline: gstreamer::Pipeline,
    bus_watcher: tokio::task::JoinHandle<()>,
}

impl ScreenCapturer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CaptureSource for ScreenCapturer {
    async fn start_capture(
        &mut self,
        region: &CaptureRegion,
        config: &StreamConfig,
    ) -> anyhow::Result<mpsc::Receiver<Frame>> {
        anyhow::ensure!(self.running.is_none(), "capture already running");

        gstreamer::init().context("GStreamer init")?;

        let (pipeline, frame_rx) = build_pipeline(region, config)?;
        pipeline
            .set_state(gstreamer::State::Playing)
            .context("GStreamer set Playing")?;

        // Watch the bus for errors / EOS in a background task. Holds only a
        // weak reference so teardown in `stop_capture` can release the
        // pipeline (and with it the frame channel) promptly.
        let pipeline_weak = pipeline.downgrade();
        let bus = pipeline.bus().context("pipeline bus")?;
        let bus_watcher = tokio::task::spawn_blocking(move || loop {
            match bus.timed_pop(gstreamer::ClockTime::from_mseconds(500)) {
                Some(msg) => match msg.view() {
                    gstreamer::MessageView::Eos(_) => {
                        info!("capture pipeline EOS");
                        break;
                    }
                    gstreamer::MessageView::Error(e) => {
                        error!("capture pipeline error: {}", e.error());
                        break;
                    }
                    _ => {}
                },
                None => {
                    if pipeline_weak.upgrade().is_none() {
                        break;
                    }
                }
            }
        });

        info!(
            "screen capture started: {} on display {} (scale {})",
            region.source_rect, region.display_id, region.scale_factor
        );
        self.running = Some(Running { pipeline, bus_watcher });
        Ok(frame_rx)
    }

    async fn stop_capture(&mut self) -> anyhow::Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        let pipeline = running.pipeline;
        // State changes can block on the streaming thread; keep them off
        // the async executor. Dropping the pipeline releases the appsink
        // callbacks, which closes the frame channel.
        tokio::task::spawn_blocking(move || {
            let _ = pipeline.set_state(gstreamer::State::Null);
            drop(pipeline);
        })
        .await
        .context("capture teardown task")?;

        // The bus watcher notices the dropped pipeline and exits on its own.
        drop(running.bus_watcher);
        info!("screen capture stopped");
        Ok(())
    }
}

fn build_pipeline(
    region: &CaptureRegion,
    config: &StreamConfig,
) -> anyhow::Result<(gstreamer::Pipeline, mpsc::Receiver<Frame>)> {
    let (startx, starty) = region.pixel_origin();
    let w = region.pixel_width().max(1);
    let h = region.pixel_height().max(1);
    let endx = startx + w - 1;
    let endy = starty + h - 1;
    let fps = config.frames_per_second();
    let format = config.pixel_format;

    let desc = format!(
        "ximagesrc display-name=\":0.{screen}\" use-damage=false show-pointer={cursor} \
             startx={startx} starty={starty} endx={endx} endy={endy} do-timestamp=true \
         ! videoconvert \
         ! videorate drop-only=true \
         ! video/x-raw,format={fmt},framerate={fps}/1 \
         ! appsink name=sink max-buffers={depth} drop=true sync=false emit-signals=false",
        screen = region.display_id,
        cursor = config.shows_cursor,
        fmt = format.caps_name(),
        depth = config.queue_depth.max(1),
    );
    debug!("capture pipeline: {}", desc);

    let pipeline = gstreamer::parse::launch(&desc)
        .context("Parsing capture pipeline")?
        .downcast::<gstreamer::Pipeline>()
        .map_err(|_| anyhow::anyhow!("Expected Pipeline element"))?;

    let appsink: AppSink = pipeline
        .by_name("sink")
        .context("Finding appsink 'sink'")?
        .downcast::<AppSink>()
        .map_err(|_| anyhow::anyhow!("Expected AppSink"))?;

    let (frame_tx, frame_rx) = mpsc::channel::<Frame>(config.queue_depth.max(1) as usize);

    appsink.set_callbacks(
        AppSinkCallbacks::builder()
            .new_sample(move |sink| {
                let sample = sink.pull_sample().map_err(|_| gstreamer::FlowError::Eos)?;
                let buffer = sample.buffer().ok_or(gstreamer::FlowError::Error)?;
                let pts = buffer
                    .pts()
                    .map(|t| std::time::Duration::from_nanos(t.nseconds()))
                    .unwrap_or_default();
                let map = buffer.map_readable().map_err(|_| gstreamer::FlowError::Error)?;

                let frame = Frame {
                    data: Bytes::copy_from_slice(map.as_slice()),
                    width: w,
                    height: h,
                    pts,
                    // ximagesrc always delivers full screen content.
                    status: FrameStatus::Complete,
                    format,
                };

                if frame_tx.blocking_send(frame).is_err() {
                    return Err(gstreamer::FlowError::Flushing);
                }
                Ok(gstreamer::FlowSuccess::Ok)
            })
            .build(),
    );

    Ok((pipeline, frame_rx))
}
