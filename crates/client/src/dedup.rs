// Deduplication index: identities already materialized in the transcript.
//
// No eviction. The index lives exactly as long as the transcript it mirrors
// and is cleared together with it on a full refresh.

use std::collections::HashSet;

use chatsync_common::MessageId;

#[derive(Debug, Clone, Default)]
pub struct DedupIndex {
    seen: HashSet<MessageId>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, id: &MessageId) -> bool {
        self.seen.contains(id)
    }

    /// Record an identity. Returns `false` if it was already present.
    pub fn add(&mut self, id: MessageId) -> bool {
        self.seen.insert(id)
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
