//! Frame worklist
//!
//! A frame accumulates the input values gathered for one pending activation
//! of a node. The worklist is a FIFO of node ids with a side table of
//! frames: merging into an existing frame keeps its place in line, a new
//! frame joins at the tail, and a deferred frame is re-queued at the tail.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::types::NodeId;

/// Input values gathered for one node activation (key -> value)
pub type Frame = HashMap<String, serde_json::Value>;

/// Insertion-ordered set of pending frames, one per node id
#[derive(Debug, Clone, Default)]
pub struct FrameQueue {
    order: VecDeque<NodeId>,
    frames: HashMap<NodeId, Frame>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `value` into the frame for `id` under `key`
    pub fn add(&mut self, id: &str, key: &str, value: serde_json::Value) {
        self.frame_mut(id).insert(key.to_string(), value);
    }

    /// Make sure `id` has a frame, creating an empty one at the tail
    pub fn ensure(&mut self, id: &str) {
        self.frame_mut(id);
    }

    fn frame_mut(&mut self, id: &str) -> &mut Frame {
        if !self.frames.contains_key(id) {
            self.order.push_back(id.to_string());
        }
        self.frames.entry(id.to_string()).or_default()
    }

    /// Take the earliest inserted frame off the queue
    pub fn pop(&mut self) -> Option<(NodeId, Frame)> {
        while let Some(id) = self.order.pop_front() {
            if let Some(frame) = self.frames.remove(&id) {
                return Some((id, frame));
            }
        }
        None
    }

    /// Put a frame back at the tail, unchanged
    pub fn defer(&mut self, id: NodeId, frame: Frame) {
        if self.frames.insert(id.clone(), frame).is_none() {
            self.order.push_back(id);
        }
    }

    /// Drop the frame for `id`, if any
    pub fn remove(&mut self, id: &str) -> Option<Frame> {
        let frame = self.frames.remove(id)?;
        self.order.retain(|queued| queued != id);
        Some(frame)
    }

    pub fn get(&self, id: &str) -> Option<&Frame> {
        self.frames.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.frames.contains_key(id)
    }

    /// Deep copy of the frames whose ids are in `ids`, keeping queue order
    pub fn restricted(&self, ids: &HashSet<&str>) -> FrameQueue {
        let mut copy = FrameQueue::new();
        for id in &self.order {
            if !ids.contains(id.as_str()) {
                continue;
            }
            if let Some(frame) = self.frames.get(id) {
                copy.order.push_back(id.clone());
                copy.frames.insert(id.clone(), frame.clone());
            }
        }
        copy
    }

    /// Pending node ids in queue order
    pub fn pending(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|id| self.frames.contains_key(id.as_str()))
            .map(|id| id.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
