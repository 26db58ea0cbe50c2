//! clipcast-record — the dual-format recording pipelines.
//!
//! ```text
//! capture source ──► frame channel ──► ingest task ──┬─► Mp4Writer (incremental)
//!                                                    └─► frame buffer ──► GIF encode on stop
//! ```
//!
//! Two execution contexts exist per session: the control context, which
//! awaits `start`/`stop` on a recorder, and the delivery context, a spawned
//! ingest task that consumes frames serially. The two meet only at `stop`,
//! after the capture source has acknowledged shutdown, when the ingest
//! task's join handle hands its state back to the controller.
//!
//! Screenshots bypass the session machinery entirely: [`screenshot::capture`]
//! takes the first complete frame and writes a PNG.

mod ingest;

pub mod gif;
pub mod mp4;
pub mod scale;
pub mod screenshot;
pub mod video;

pub use gif::GifRecorder;
pub use ingest::SampleSink;
pub use mp4::Mp4Writer;
pub use video::VideoRecorder;
