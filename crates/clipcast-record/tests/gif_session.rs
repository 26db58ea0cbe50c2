//! End-to-end GIF sessions over a scripted capture source.

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use clipcast_capture::ScriptedSource;
use clipcast_core::{CaptureError, CaptureRegion, CaptureSettings, Frame, FrameStatus, PixelFormat, Rect};
use clipcast_record::GifRecorder;

fn region(width: f64, height: f64) -> CaptureRegion {
    CaptureRegion::new(Rect::new(0.0, 0.0, width, height), 0, 1.0)
}

fn bgra_frame(width: u32, height: u32, pts_ms: u64, shade: u8) -> Frame {
    Frame {
        data: Bytes::from(vec![shade; (width * height * 4) as usize]),
        width,
        height,
        pts: Duration::from_millis(pts_ms),
        status: FrameStatus::Complete,
        format: PixelFormat::Bgra,
    }
}

fn temp_gif(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("clipcast_{name}.gif"))
}

#[tokio::test]
async fn wide_session_downscales_to_max_width() {
    let (source, handle) = ScriptedSource::with_capacity(16);
    let mut recorder = GifRecorder::new(Box::new(source));
    let settings = CaptureSettings { gif_frame_rate: 10, gif_max_width: 640, ..Default::default() };

    recorder.start(&region(1280.0, 720.0), &settings).await.unwrap();
    for i in 0..5u64 {
        handle.push_wait(bgra_frame(1280, 720, i * 100, (i * 40) as u8)).await;
    }

    let out = temp_gif("wide_session");
    let path = recorder.stop(out.clone()).await.expect("stop");
    assert_eq!(path, out);

    use image::AnimationDecoder;
    let decoder = image::codecs::gif::GifDecoder::new(std::io::BufReader::new(
        std::fs::File::open(&out).unwrap(),
    ))
    .expect("decode");
    let frames = decoder.into_frames().collect_frames().expect("frames");
    assert_eq!(frames.len(), 5);
    for frame in &frames {
        assert_eq!(frame.buffer().dimensions(), (640, 360));
        // Per-frame delay is 1 / gif_frame_rate.
        assert_eq!(frame.delay().numer_denom_ms().0, 100);
    }

    let _ = std::fs::remove_file(&out);
}

#[tokio::test]
async fn zero_frame_session_reports_no_frames_and_stays_reusable() {
    let (source, handle) = ScriptedSource::with_capacity(4);
    let mut recorder = GifRecorder::new(Box::new(source));
    let settings = CaptureSettings::default();
    let out = temp_gif("zero_frames");

    recorder.start(&region(64.0, 64.0), &settings).await.unwrap();
    let err = recorder.stop(out.clone()).await.unwrap_err();
    assert_eq!(err, CaptureError::NoFrames);
    assert!(!out.exists(), "NoFrames must not touch the filesystem");

    // Idle restored: a fresh session on the same recorder works.
    recorder.start(&region(64.0, 64.0), &settings).await.unwrap();
    handle.push_wait(bgra_frame(64, 64, 0, 128)).await;
    let path = recorder.stop(out.clone()).await.expect("second session");
    assert!(path.exists());

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn repeated_stop_replays_the_terminal_result() {
    let (source, handle) = ScriptedSource::with_capacity(4);
    let mut recorder = GifRecorder::new(Box::new(source));
    let settings = CaptureSettings::default();

    recorder.start(&region(32.0, 32.0), &settings).await.unwrap();
    handle.push_wait(bgra_frame(32, 32, 0, 7)).await;

    let out = temp_gif("idempotent_stop");
    let first = recorder.stop(out.clone()).await.expect("stop");

    // Remove the file: a second stop must not re-run the encoder.
    std::fs::remove_file(&first).unwrap();
    let second = recorder.stop(temp_gif("other_path")).await.expect("replayed stop");
    assert_eq!(first, second);
    assert!(!second.exists());
}

#[tokio::test]
async fn start_rejected_while_recording() {
    let (source, _handle) = ScriptedSource::with_capacity(4);
    let mut recorder = GifRecorder::new(Box::new(source));
    let settings = CaptureSettings::default();

    recorder.start(&region(32.0, 32.0), &settings).await.unwrap();
    let err = recorder.start(&region(32.0, 32.0), &settings).await.unwrap_err();
    assert_eq!(err, CaptureError::SessionActive);
}

#[tokio::test]
async fn stop_without_session_is_an_error() {
    let (source, _handle) = ScriptedSource::new();
    let mut recorder = GifRecorder::new(Box::new(source));
    let err = recorder.stop(temp_gif("never_started")).await.unwrap_err();
    assert_eq!(err, CaptureError::NoSession);
}

#[tokio::test]
async fn frame_order_is_preserved_end_to_end() {
    let (source, handle) = ScriptedSource::with_capacity(8);
    let mut recorder = GifRecorder::new(Box::new(source));
    let settings = CaptureSettings { gif_max_width: 640, ..Default::default() };

    recorder.start(&region(2.0, 2.0), &settings).await.unwrap();
    // Encode an index into the blue channel of each 2×2 BGRA frame.
    for i in 0..4u8 {
        let mut frame = bgra_frame(2, 2, i as u64 * 100, 0);
        frame.data = Bytes::from(vec![i * 50, 0, 0, 255].repeat(4));
        handle.push_wait(frame).await;
    }

    let out = temp_gif("frame_order");
    recorder.stop(out.clone()).await.expect("stop");

    use image::AnimationDecoder;
    let decoder = image::codecs::gif::GifDecoder::new(std::io::BufReader::new(
        std::fs::File::open(&out).unwrap(),
    ))
    .expect("decode");
    let frames = decoder.into_frames().collect_frames().expect("frames");
    assert_eq!(frames.len(), 4);
    let blues: Vec<u8> = frames.iter().map(|f| f.buffer().get_pixel(0, 0).0[2]).collect();
    let mut sorted = blues.clone();
    sorted.sort_unstable();
    assert_eq!(blues, sorted, "frames must come out in arrival order");
    assert!(blues.windows(2).all(|w| w[0] < w[1]), "shades must be distinct: {blues:?}");

    let _ = std::fs::remove_file(&out);
}
