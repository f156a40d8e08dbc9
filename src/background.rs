// The captured reference frame ("what the room looks like without you").

use crate::types::FrameBuffer;
use std::sync::Arc;

/// Holds at most one background frame.
///
/// Each capture swaps in a freshly allocated buffer, so any [`snapshot`](Self::snapshot)
/// handed out earlier keeps seeing the complete old frame, never a half-copied one.
#[derive(Default)]
pub struct BackgroundStore {
    frame: Option<Arc<FrameBuffer>>,
}

impl BackgroundStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep-copy `frame` in, replacing whatever was there (a retake, never a merge).
    pub fn capture(&mut self, frame: &FrameBuffer) {
        self.frame = Some(Arc::new(frame.clone()));
    }

    /// Back to passthrough: no background, no keying.
    pub fn clear(&mut self) {
        self.frame = None;
    }

    pub fn is_populated(&self) -> bool {
        self.frame.is_some()
    }

    pub fn get(&self) -> Option<&FrameBuffer> {
        self.frame.as_deref()
    }

    /// Shared handle for readers on other threads (e.g. the scene assistant).
    pub fn snapshot(&self) -> Option<Arc<FrameBuffer>> {
        self.frame.clone()
    }
}
