//! Buffering GIF recording: frames accumulate in memory for the session's
//! lifetime, then one batch transform + encode runs on `stop`.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clipcast_capture::CaptureSource;
use clipcast_core::{CaptureError, CaptureRegion, CaptureSettings, StreamConfig};
use image::codecs::gif::{GifEncoder, Repeat};
use image::RgbaImage;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::ingest;
use crate::scale;

/// One-session looping-GIF recorder.
///
/// Same lifecycle as [`VideoRecorder`](crate::VideoRecorder): `start` only
/// from `Idle`, a zero-frame `stop` restores `Idle`, and terminal results
/// replay on repeated `stop` calls.
///
/// The frame buffer grows linearly with recording length and rate; this is
/// sized for bounded clips, not open-ended sessions.
pub struct GifRecorder {
    source: Box<dyn CaptureSource>,
    state: State,
}

enum State {
    Idle,
    Recording {
        ingest: JoinHandle<Vec<RgbaImage>>,
        frame_delay: Duration,
        max_width: u32,
    },
    Completed { output: PathBuf },
    Failed { error: CaptureError },
}

impl GifRecorder {
    pub fn new(source: Box<dyn CaptureSource>) -> Self {
        Self { source, state: State::Idle }
    }

    /// Configure the capture source (cursor always on, rate from
    /// `gif_frame_rate`), reset the frame buffer, and start listening.
    pub async fn start(
        &mut self,
        region: &CaptureRegion,
        settings: &CaptureSettings,
    ) -> Result<(), CaptureError> {
        if !matches!(self.state, State::Idle) {
            return Err(CaptureError::SessionActive);
        }

        let config = StreamConfig::for_gif(settings);
        let frames = self
            .source
            .start_capture(region, &config)
            .await
            .map_err(|e| CaptureError::source(format!("{e:#}")))?;

        info!(
            "GIF recording started: {}×{} at {} fps",
            region.pixel_width(),
            region.pixel_height(),
            config.frames_per_second()
        );
        self.state = State::Recording {
            ingest: tokio::spawn(ingest::run_gif_ingest(frames)),
            frame_delay: settings.gif_frame_delay(),
            max_width: settings.gif_max_width,
        };
        Ok(())
    }

    /// Stop capturing, batch-encode the buffered frames to `output`, and
    /// return the path.
    ///
    /// An empty buffer fails with [`CaptureError::NoFrames`] before any
    /// file I/O; the recorder is then reusable.
    pub async fn stop(&mut self, output: PathBuf) -> Result<PathBuf, CaptureError> {
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
            State::Recording { ingest, frame_delay, max_width } => {
                let result = self.finish(ingest, frame_delay, max_width, output).await;
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
        ingest: JoinHandle<Vec<RgbaImage>>,
        frame_delay: Duration,
        max_width: u32,
        output: PathBuf,
    ) -> Result<PathBuf, CaptureError> {
        // Source shutdown closes the frame channel; joining the ingest task
        // is the synchronization point that hands the buffer over.
        if let Err(e) = self.source.stop_capture().await {
            ingest.abort();
            return Err(CaptureError::source(format!("{e:#}")));
        }
        let frames = ingest
            .await
            .map_err(|e| CaptureError::save_failed(format!("ingest task failed: {e}")))?;
        if frames.is_empty() {
            return Err(CaptureError::NoFrames);
        }

        info!("encoding {} frames to {}", frames.len(), output.display());
        tokio::task::spawn_blocking(move || {
            encode_gif(frames, frame_delay, max_width, &output).map(|_| output)
        })
        .await
        .map_err(|e| CaptureError::save_failed(format!("encode task failed: {e}")))?
    }
}

/// Batch-encode `frames` into a looping GIF at `output`.
///
/// Frames wider than `max_width` are downscaled to one common target size
/// derived from the first frame; a frame that fails the transform is
/// dropped rather than aborting the encode.
fn encode_gif(
    frames: Vec<RgbaImage>,
    frame_delay: Duration,
    max_width: u32,
    output: &Path,
) -> Result<(), CaptureError> {
    let (first_w, first_h) = frames[0].dimensions();
    let processed: Vec<RgbaImage> = if first_w > max_width {
        let (target_w, target_h) = scale::capped_size(first_w, first_h, max_width);
        let before = frames.len();
        let scaled: Vec<RgbaImage> = frames
            .iter()
            .filter_map(|frame| scale::downscale(frame, target_w, target_h))
            .collect();
        if scaled.len() < before {
            warn!("{} frames failed to downscale and were dropped", before - scaled.len());
        }
        if scaled.is_empty() {
            return Err(CaptureError::save_failed("every frame failed to downscale"));
        }
        scaled
    } else {
        frames
    };

    let file = File::create(output)
        .map_err(|e| CaptureError::save_failed(format!("create {}: {e}", output.display())))?;
    let mut encoder = GifEncoder::new_with_speed(BufWriter::new(file), 10);
    encoder
        .set_repeat(Repeat::Infinite)
        .map_err(|e| CaptureError::save_failed(format!("set GIF loop count: {e}")))?;

    let delay = image::Delay::from_saturating_duration(frame_delay);
    for (i, image) in processed.into_iter().enumerate() {
        let frame = image::Frame::from_parts(image, 0, 0, delay);
        encoder
            .encode_frame(frame)
            .map_err(|e| CaptureError::save_failed(format!("encode GIF frame {i}: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_downscaled_looping_gif() {
        let frames: Vec<RgbaImage> = (0..3)
            .map(|i| RgbaImage::from_pixel(1280, 720, image::Rgba([i * 60, 0, 200, 255])))
            .collect();
        let out = std::env::temp_dir().join("clipcast_encode_gif_test.gif");

        encode_gif(frames, Duration::from_millis(100), 640, &out).expect("encode");

        use image::AnimationDecoder;
        let decoder =
            image::codecs::gif::GifDecoder::new(std::io::BufReader::new(File::open(&out).unwrap()))
                .expect("decode");
        let decoded = decoder.into_frames().collect_frames().expect("frames");
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0].buffer().dimensions(), (640, 360));
        assert_eq!(decoded[0].delay().numer_denom_ms().0, 100);

        let _ = std::fs::remove_file(&out);
    }

    #[test]
    fn narrow_frames_keep_their_size() {
        let frames = vec![RgbaImage::from_pixel(320, 200, image::Rgba([9, 9, 9, 255])); 2];
        let out = std::env::temp_dir().join("clipcast_encode_gif_narrow_test.gif");

        encode_gif(frames, Duration::from_millis(50), 640, &out).expect("encode");

        use image::AnimationDecoder;
        let decoder =
            image::codecs::gif::GifDecoder::new(std::io::BufReader::new(File::open(&out).unwrap()))
                .expect("decode");
        let decoded = decoder.into_frames().collect_frames().expect("frames");
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].buffer().dimensions(), (320, 200));

        let _ = std::fs::remove_file(&out);
    }

    #[test]
    fn unwritable_destination_reports_save_failed() {
        let frames = vec![RgbaImage::new(8, 8)];
        let result = encode_gif(
            frames,
            Duration::from_millis(100),
            640,
            Path::new("/nonexistent-dir/clipcast.gif"),
        );
        assert!(matches!(result, Err(CaptureError::SaveFailed { .. })));
    }
}
