//! Bounded sample buffer for one recording.
//!
//! Overwrites the oldest audio when full, so a runaway hold never grows
//! memory: the last `max_recording_secs` of speech are what gets
//! transcribed.

// ---------------------------------------------------------------------------
// CaptureBuffer
// ---------------------------------------------------------------------------

/// Fixed-capacity ring of mono f32 samples.
#[derive(Debug)]
pub struct CaptureBuffer {
    data: Vec<f32>,
    capacity: usize,
    /// Index of the oldest sample when the ring has wrapped.
    head: usize,
    wrapped: bool,
}

impl CaptureBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            head: 0,
            wrapped: false,
        }
    }

    /// Samples currently held.
    pub fn len(&self) -> usize {
        if self.wrapped {
            self.capacity
        } else {
            self.data.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seconds of audio held at `sample_rate`.
    pub fn duration_secs(&self, sample_rate: u32) -> f32 {
        self.len() as f32 / sample_rate.max(1) as f32
    }

    /// Append samples, overwriting the oldest on overflow.
    pub fn push_slice(&mut self, samples: &[f32]) {
        for &s in samples {
            if self.data.len() < self.capacity {
                self.data.push(s);
            } else {
                self.data[self.head] = s;
                self.head = (self.head + 1) % self.capacity;
                self.wrapped = true;
            }
        }
    }

    /// Take the buffered audio in chronological order, leaving the buffer
    /// empty.
    pub fn drain(&mut self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len());
        if self.wrapped {
            out.extend_from_slice(&self.data[self.head..]);
            out.extend_from_slice(&self.data[..self.head]);
        } else {
            out.extend_from_slice(&self.data);
        }
        self.clear();
        out
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.head = 0;
        self.wrapped = false;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_samples_in_order() {
        let mut buf = CaptureBuffer::new(8);
        buf.push_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.drain(), vec![1.0, 2.0, 3.0]);
        assert!(buf.is_empty());
    }

    #[test]
    fn overflow_keeps_the_newest_samples() {
        let mut buf = CaptureBuffer::new(4);
        buf.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.drain(), vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn clear_resets_the_wrap_state() {
        let mut buf = CaptureBuffer::new(2);
        buf.push_slice(&[1.0, 2.0, 3.0]);
        buf.clear();
        assert!(buf.is_empty());
        buf.push_slice(&[7.0]);
        assert_eq!(buf.drain(), vec![7.0]);
    }

    #[test]
    fn duration_tracks_sample_rate() {
        let mut buf = CaptureBuffer::new(32_000);
        buf.push_slice(&vec![0.0; 8_000]);
        assert!((buf.duration_secs(16_000) - 0.5).abs() < f32::EPSILON);
    }
}
