use std::collections::{HashMap, VecDeque};
use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::FrameId;

/// How a page access was made. Recorded for future policy use; victim
/// selection does not currently distinguish access types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessType {
    #[default]
    Unknown,
    Lookup,
    Scan,
    Index,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReplacerError {
    #[error("Frame {0} is out of range for replacer capacity {1}")]
    FrameOutOfRange(FrameId, usize),

    #[error("Replacer is at capacity ({0})")]
    CapacityExceeded(usize),

    #[error("Frame {0} is not tracked by the replacer")]
    FrameUntracked(FrameId),

    #[error("Frame {0} is not evictable")]
    FrameNotEvictable(FrameId),
}

/// Per-frame access record.
///
/// `history` keeps at most `k` logical timestamps, oldest at the front.
/// With the history bounded to `k`, the front entry is the k-th most
/// recent access once the frame has been seen `k` times.
struct LruKNode {
    history: VecDeque<u64>,
    is_evictable: bool,
}

impl LruKNode {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            is_evictable: false,
        }
    }
}

struct ReplacerState {
    node_store: HashMap<FrameId, LruKNode>,
    current_timestamp: u64,
    curr_size: usize,
    evictable_size: usize,
}

/// LRU-K page replacement policy
///
/// The victim is the evictable frame whose k-th most recent access lies
/// furthest in the past. Frames with fewer than k recorded accesses have
/// infinite backward k-distance and are preferred; ties among those fall
/// back to classic LRU on the oldest retained access.
///
/// The replacer latches its own state, so it is safe to share across
/// threads independently of the buffer pool.
pub struct LruKReplacer {
    state: Mutex<ReplacerState>,
    replacer_size: usize,
    k: usize,
}

impl LruKReplacer {
    /// Create a replacer tracking up to `num_frames` frames with policy
    /// parameter `k` (k = 1 degenerates to classic LRU).
    pub fn new(num_frames: usize, k: usize) -> Self {
        Self {
            state: Mutex::new(ReplacerState {
                node_store: HashMap::with_capacity(num_frames),
                current_timestamp: 0,
                curr_size: 0,
                evictable_size: 0,
            }),
            replacer_size: num_frames,
            k: k.max(1),
        }
    }

    /// Record an access to a frame, creating its node on first sight
    pub fn record_access(
        &self,
        frame_id: FrameId,
        _access_type: AccessType,
    ) -> Result<(), ReplacerError> {
        if frame_id as usize >= self.replacer_size {
            return Err(ReplacerError::FrameOutOfRange(frame_id, self.replacer_size));
        }

        let mut state = self.state.lock();
        state.current_timestamp += 1;
        let now = state.current_timestamp;

        if !state.node_store.contains_key(&frame_id) {
            if state.curr_size >= self.replacer_size {
                return Err(ReplacerError::CapacityExceeded(self.replacer_size));
            }
            state.node_store.insert(frame_id, LruKNode::new());
            state.curr_size += 1;
        }

        let k = self.k;
        let node = state
            .node_store
            .get_mut(&frame_id)
            .ok_or(ReplacerError::FrameUntracked(frame_id))?;
        node.history.push_back(now);
        if node.history.len() > k {
            node.history.pop_front();
        }

        Ok(())
    }

    /// Toggle whether a frame may be chosen as a victim
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) -> Result<(), ReplacerError> {
        let mut state = self.state.lock();
        let node = state
            .node_store
            .get_mut(&frame_id)
            .ok_or(ReplacerError::FrameUntracked(frame_id))?;

        let was_evictable = node.is_evictable;
        node.is_evictable = evictable;

        if was_evictable && !evictable {
            state.evictable_size -= 1;
        } else if !was_evictable && evictable {
            state.evictable_size += 1;
        }

        Ok(())
    }

    /// Select and remove the victim frame, or None if nothing is evictable
    pub fn evict(&self) -> Option<FrameId> {
        let mut state = self.state.lock();
        state.current_timestamp += 1;
        let now = state.current_timestamp;

        let mut victim: Option<(u64, u64, FrameId)> = None;
        for (&frame_id, node) in state.node_store.iter() {
            if !node.is_evictable {
                continue;
            }
            // Every access ticks the clock, so the history is never empty
            let Some(&oldest) = node.history.front() else {
                continue;
            };
            let oldest_age = now - oldest;
            let k_distance = if node.history.len() < self.k {
                u64::MAX
            } else {
                oldest_age
            };
            if victim.map_or(true, |(d, a, _)| (k_distance, oldest_age) > (d, a)) {
                victim = Some((k_distance, oldest_age, frame_id));
            }
        }

        let (_, _, frame_id) = victim?;
        state.node_store.remove(&frame_id);
        state.curr_size -= 1;
        state.evictable_size -= 1;
        Some(frame_id)
    }

    /// Drop a frame's record outright. No-op when untracked; pinned
    /// (non-evictable) frames must be unpinned first.
    pub fn remove(&self, frame_id: FrameId) -> Result<(), ReplacerError> {
        let mut state = self.state.lock();
        let Some(node) = state.node_store.get(&frame_id) else {
            return Ok(());
        };
        if !node.is_evictable {
            return Err(ReplacerError::FrameNotEvictable(frame_id));
        }

        state.node_store.remove(&frame_id);
        state.curr_size -= 1;
        state.evictable_size -= 1;
        Ok(())
    }

    /// Number of frames currently eligible for eviction
    pub fn size(&self) -> usize {
        self.state.lock().evictable_size
    }
}
