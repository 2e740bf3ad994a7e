use super::codec::float_to_pcm16;

/// Accumulates device buffers of arbitrary size and emits fixed-size PCM16 chunks.
///
/// Input devices deliver whatever buffer size the backend chooses; the relay
/// protocol is easier to pace with uniform chunks, so samples are held until a
/// full chunk is available. Leftovers stay buffered for the next push.
#[derive(Debug)]
pub struct SampleChunker {
    chunk_size: usize,
    pending: Vec<f32>,
}

impl SampleChunker {
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            pending: Vec::with_capacity(chunk_size * 2),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of samples waiting for a full chunk.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Push float samples and return every chunk completed by them, in order.
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<i16>> {
        self.pending.extend_from_slice(samples);

        let mut chunks = Vec::new();
        while self.pending.len() >= self.chunk_size {
            let chunk: Vec<f32> = self.pending.drain(..self.chunk_size).collect();
            chunks.push(float_to_pcm16(&chunk));
        }
        chunks
    }

    /// Drop any partially accumulated samples (used when capture restarts).
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emits_fixed_chunks() {
        let mut chunker = SampleChunker::new(4);
        assert!(chunker.push(&[0.0; 3]).is_empty());
        assert_eq!(chunker.pending(), 3);

        let chunks = chunker.push(&[0.5; 6]);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() == 4));
        assert_eq!(chunker.pending(), 1);
    }

    #[test]
    fn test_preserves_sample_order() {
        let mut chunker = SampleChunker::new(2);
        let chunks = chunker.push(&[-1.0, 0.0, 1.0, 0.0]);
        assert_eq!(chunks, vec![vec![i16::MIN, 0], vec![i16::MAX, 0]]);
    }

    #[test]
    fn test_reset_discards_partial_chunk() {
        let mut chunker = SampleChunker::new(4);
        chunker.push(&[0.1, 0.2]);
        chunker.reset();
        assert_eq!(chunker.pending(), 0);
        assert!(chunker.push(&[0.1, 0.2]).is_empty());
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        let chunker = SampleChunker::new(0);
        assert_eq!(chunker.chunk_size(), 1);
    }
}
