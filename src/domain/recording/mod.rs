//! Recording value objects

mod chunks;
mod duration;
mod elapsed;
mod format;
mod payload;

pub use chunks::{ChunkBuffer, ChunkSink};
pub use duration::{Duration, DEFAULT_CHUNK_INTERVAL_MS};
pub use elapsed::Elapsed;
pub use format::AudioFormat;
pub use payload::Recording;
