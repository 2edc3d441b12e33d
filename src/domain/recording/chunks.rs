//! Ordered buffer of encoded chunks

use std::sync::{Arc, Mutex, MutexGuard};

/// Chunks delivered by the encoder, kept in arrival order.
///
/// The buffer is owned by the session resources; encoders only get a
/// [`ChunkSink`] so they can append but never read or clear.
#[derive(Debug, Clone, Default)]
pub struct ChunkBuffer {
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
}

/// Append-only handle given to an encoder
#[derive(Debug, Clone)]
pub struct ChunkSink {
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
}

fn lock(chunks: &Mutex<Vec<Vec<u8>>>) -> MutexGuard<'_, Vec<Vec<u8>>> {
    // A panicking producer cannot leave a Vec half-pushed
    chunks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an append handle for an encoder
    pub fn sink(&self) -> ChunkSink {
        ChunkSink {
            chunks: Arc::clone(&self.chunks),
        }
    }

    /// Number of buffered chunks
    pub fn len(&self) -> usize {
        lock(&self.chunks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total buffered bytes
    pub fn byte_len(&self) -> usize {
        lock(&self.chunks).iter().map(Vec::len).sum()
    }

    /// Discard everything buffered
    pub fn clear(&self) {
        lock(&self.chunks).clear();
    }

    /// Concatenate all chunks in arrival order and empty the buffer
    pub fn drain(&self) -> Vec<u8> {
        let chunks = std::mem::take(&mut *lock(&self.chunks));
        let mut out = Vec::with_capacity(chunks.iter().map(Vec::len).sum());
        for chunk in chunks {
            out.extend_from_slice(&chunk);
        }
        out
    }
}

impl ChunkSink {
    /// Append one chunk. Empty chunks are dropped.
    pub fn push(&self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        lock(&self.chunks).push(chunk);
    }
}
