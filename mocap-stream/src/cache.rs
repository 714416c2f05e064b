//! Latest-wins pose hand-off between the receive thread and the host
//!
//! The receive thread pushes every decoded pose; the host drains the queue
//! once per frame and keeps only the newest. Poses the host never looked at
//! are dropped, since an animation feed only cares about the current sample.

use crate::pose::Pose;
use crossbeam_queue::SegQueue;

/// Unbounded lock-free pose queue
#[derive(Default)]
pub struct PoseCache {
    queue: SegQueue<Pose>,
}

impl PoseCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
        }
    }

    /// Append a pose in arrival order
    pub fn push(&self, pose: Pose) {
        self.queue.push(pose);
    }

    /// Pop the oldest pending pose
    pub fn fetch_next(&self) -> Option<Pose> {
        self.queue.pop()
    }

    /// Drain the backlog and return only the newest pose
    ///
    /// Never blocks. `None` when nothing arrived since the last fetch.
    pub fn fetch_latest(&self) -> Option<Pose> {
        let mut latest = None;
        while let Some(pose) = self.queue.pop() {
            latest = Some(pose);
        }
        latest
    }

    /// Number of poses waiting
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True if no pose is waiting
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
