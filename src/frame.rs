//! Decoded frames and the bounded retention buffer.
//!
//! - `Frame`: one decoded RGB24 frame with its capture index.
//! - `FrameRetentionBuffer`: FIFO of the most recent frames, capped at
//!   `fps * retention_secs` entries. It is the processing session's memory
//!   ceiling for decoded media; nothing downstream of detection reads it yet.

use std::collections::VecDeque;

use anyhow::{anyhow, Result};

/// Default retention span in seconds.
pub const DEFAULT_RETENTION_SECS: f64 = 30.0;

/// Upper bound on slots reserved up front; the buffer grows past it on demand.
const PREALLOC_FRAMES: usize = 300;

/// One decoded RGB24 frame.
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Zero-based position in the video's capture order.
    pub index: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: u64) -> Self {
        Self {
            data,
            width,
            height,
            index,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn timestamp_secs(&self, fps: f64) -> f64 {
        if fps > 0.0 {
            self.index as f64 / fps
        } else {
            0.0
        }
    }

    pub(crate) fn byte_len(&self) -> usize {
        self.data.len()
    }
}

/// Bounded FIFO of recently decoded frames.
pub struct FrameRetentionBuffer {
    buffer: VecDeque<Frame>,
    max_frames: usize,
}

impl FrameRetentionBuffer {
    /// Buffer holding `retention_secs` worth of frames at `fps`.
    pub fn for_video(fps: f64, retention_secs: f64) -> Result<Self> {
        if !(fps > 0.0) || !fps.is_finite() {
            return Err(anyhow!("fps must be positive, got {}", fps));
        }
        if !(retention_secs > 0.0) {
            return Err(anyhow!(
                "retention must be positive, got {}s",
                retention_secs
            ));
        }
        let max_frames = ((fps * retention_secs).round() as usize).max(1);
        Ok(Self::with_capacity(max_frames))
    }

    pub fn with_capacity(max_frames: usize) -> Self {
        let max_frames = max_frames.max(1);
        Self {
            buffer: VecDeque::with_capacity(max_frames.min(PREALLOC_FRAMES)),
            max_frames,
        }
    }

    /// Append a frame, evicting the oldest ones once the cap is exceeded.
    pub fn push(&mut self, frame: Frame) {
        self.buffer.push_back(frame);
        while self.buffer.len() > self.max_frames {
            self.buffer.pop_front();
        }
    }

    /// Most recently pushed frame.
    pub fn latest(&self) -> Option<&Frame> {
        self.buffer.back()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_frames
    }

    /// Memory usage estimate.
    pub fn memory_bytes(&self) -> usize {
        self.buffer.iter().map(|f| f.byte_len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: u64) -> Frame {
        Frame::new(vec![0u8; 12], 2, 2, index)
    }

    #[test]
    fn capacity_is_fps_times_retention() {
        let buf = FrameRetentionBuffer::for_video(25.0, DEFAULT_RETENTION_SECS).unwrap();
        assert_eq!(buf.capacity(), 750);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut buf = FrameRetentionBuffer::with_capacity(3);
        for i in 0..5 {
            buf.push(frame(i));
        }

        assert_eq!(buf.len(), 3);
        let indices: Vec<u64> = buf.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![2, 3, 4]);
        assert_eq!(buf.latest().map(|f| f.index), Some(4));
        assert_eq!(buf.memory_bytes(), 36);
    }

    #[test]
    fn never_exceeds_bound() {
        let mut buf = FrameRetentionBuffer::for_video(10.0, 1.0).unwrap();
        for i in 0..1000 {
            buf.push(frame(i));
            assert!(buf.len() <= buf.capacity());
        }
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn huge_retention_reserves_little_and_still_evicts() {
        let mut buf = FrameRetentionBuffer::for_video(30.0, 1e12).unwrap();
        assert_eq!(buf.capacity(), 30_000_000_000_000);
        assert!(buf.buffer.capacity() <= 2 * PREALLOC_FRAMES);
        for i in 0..10 {
            buf.push(frame(i));
        }
        assert_eq!(buf.len(), 10);

        let mut small = FrameRetentionBuffer::with_capacity(usize::MAX);
        small.push(frame(0));
        assert_eq!(small.latest().map(|f| f.index), Some(0));
    }

    #[test]
    fn rejects_invalid_fps() {
        assert!(FrameRetentionBuffer::for_video(0.0, 30.0).is_err());
        assert!(FrameRetentionBuffer::for_video(f64::NAN, 30.0).is_err());
        assert!(FrameRetentionBuffer::for_video(30.0, 0.0).is_err());
    }

    #[test]
    fn timestamp_uses_fps() {
        assert_eq!(frame(60).timestamp_secs(30.0), 2.0);
        assert_eq!(frame(60).timestamp_secs(0.0), 0.0);
    }
}
