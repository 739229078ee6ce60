// Merge engine: the single owner of transcript, dedup index, cursors and
// pagination flags.
//
// Batches flow in one direction: dedup → position → insert → cursors.
// Each entry point applies a whole batch; `ReplaceAll` resets everything
// before repopulating. Batches are trusted to be sorted oldest-first and the
// mode alone decides where a batch lands relative to existing content.

use chatsync_common::{LoadOlderRequest, Message, MessageId, Timestamp};
use tracing::{debug, info, warn};

use crate::cursor::CursorTracker;
use crate::dedup::DedupIndex;
use crate::pagination::{PaginationController, PaginationState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Initial load or full refresh.
    ReplaceAll,
    /// Live delivery at the newest end.
    AppendLive,
    /// A page of older history at the oldest end.
    PrependOlder,
}

/// Where the consumer should put the inserted rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertPosition {
    /// Drop every rendered row, then append.
    ReplaceAll,
    /// Append after the last rendered row.
    Append,
    /// Insert, in order, before the row with this identity.
    Before(MessageId),
}

/// What a merge did, for the renderer and the scroll anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertPlan {
    pub generation: u64,
    pub mode: MergeMode,
    pub position: InsertPosition,
    /// Rows to materialize, oldest first.
    pub inserted: Vec<Message>,
    /// Messages dropped as duplicates.
    pub suppressed: usize,
    /// Size of the incoming batch, duplicates included.
    pub batch_len: usize,
}

impl InsertPlan {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
    }
}

/// Ordered, oldest-first sequence of materialized messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn first(&self) -> Option<&Message> {
        self.messages.first()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn ids(&self) -> Vec<MessageId> {
        self.messages.iter().map(|m| m.id.clone()).collect()
    }

    /// Whether comparable timestamps never decrease from first to last.
    /// Unparsable timestamps are skipped.
    pub fn is_chronological(&self) -> bool {
        let mut previous: Option<&Timestamp> = None;
        for timestamp in self.messages.iter().map(|m| &m.timestamp) {
            if !timestamp.is_comparable() {
                continue;
            }
            if previous.is_some_and(|prev| timestamp.is_before(prev)) {
                return false;
            }
            previous = Some(timestamp);
        }
        true
    }

    fn clear(&mut self) {
        self.messages.clear();
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    fn prepend(&mut self, batch: Vec<Message>) {
        self.messages.splice(0..0, batch);
    }
}

#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    transcript: Transcript,
    dedup: DedupIndex,
    cursors: CursorTracker,
    pagination: PaginationController,
    generation: u64,
}

impl MergeEngine {
    pub fn new(page_limit: usize, initial_limit: usize) -> Self {
        Self {
            pagination: PaginationController::new(page_limit, initial_limit),
            ..Self::default()
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn dedup(&self) -> &DedupIndex {
        &self.dedup
    }

    pub fn cursors(&self) -> &CursorTracker {
        &self.cursors
    }

    pub fn pagination(&self) -> &PaginationController {
        &self.pagination
    }

    pub fn pagination_state(&self) -> PaginationState {
        self.pagination.state()
    }

    /// Transcript generation; bumped on every `ReplaceAll`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn merge(&mut self, batch: Vec<Message>, mode: MergeMode) -> InsertPlan {
        match mode {
            MergeMode::ReplaceAll => self.replace_all(batch),
            MergeMode::AppendLive => self.append_live(batch),
            MergeMode::PrependOlder => self.prepend_older(batch),
        }
    }

    /// Try to enter loading-older against the current oldest cursor.
    pub fn request_older(&mut self) -> Option<LoadOlderRequest> {
        self.pagination.begin(self.cursors.oldest(), self.generation)
    }

    /// Undo `request_older` when the request could not be sent.
    pub fn abandon_older_request(&mut self) {
        self.pagination.abandon();
    }

    /// Match an incoming older-page response to its request. `false` means
    /// the response is stale and must not be merged.
    pub fn claim_older_response(&mut self) -> bool {
        self.pagination.claim_response(self.generation)
    }

    /// A full refresh is on its way; stop paging against the old transcript.
    pub fn begin_refresh(&mut self) {
        self.pagination.begin_refresh();
    }

    fn replace_all(&mut self, batch: Vec<Message>) -> InsertPlan {
        let batch_len = batch.len();
        self.generation += 1;
        self.dedup.clear();
        self.transcript.clear();
        self.cursors.reset();
        self.cursors.observe(&batch);

        let mut inserted = Vec::with_capacity(batch_len);
        let mut suppressed = 0;
        for message in batch {
            if self.dedup.add(message.id.clone()) {
                self.transcript.push(message.clone());
                inserted.push(message);
            } else {
                suppressed += 1;
            }
        }

        self.pagination.complete_initial_load(batch_len);
        info!(
            generation = self.generation,
            messages = inserted.len(),
            has_more_older = self.pagination.has_more_older(),
            "transcript replaced"
        );

        InsertPlan {
            generation: self.generation,
            mode: MergeMode::ReplaceAll,
            position: InsertPosition::ReplaceAll,
            inserted,
            suppressed,
            batch_len,
        }
    }

    fn append_live(&mut self, batch: Vec<Message>) -> InsertPlan {
        let batch_len = batch.len();
        let mut inserted = Vec::with_capacity(batch_len);
        let mut suppressed = 0;
        for message in batch {
            if !self.dedup.add(message.id.clone()) {
                debug!(id = %message.id, "duplicate live message suppressed");
                suppressed += 1;
                continue;
            }
            self.cursors.observe_one(&message.timestamp);
            self.transcript.push(message.clone());
            inserted.push(message);
        }

        InsertPlan {
            generation: self.generation,
            mode: MergeMode::AppendLive,
            position: InsertPosition::Append,
            inserted,
            suppressed,
            batch_len,
        }
    }

    fn prepend_older(&mut self, batch: Vec<Message>) -> InsertPlan {
        let batch_len = batch.len();
        let position = match self.transcript.first() {
            Some(first) => InsertPosition::Before(first.id.clone()),
            None => InsertPosition::Append,
        };

        // Bounds come from the whole page, duplicates included, so the
        // oldest cursor keeps walking back even through an all-duplicate page.
        let oldest_before = self.cursors.oldest().cloned();
        self.cursors.observe(&batch);
        let cursor_advanced = self.cursors.oldest() != oldest_before.as_ref();

        let mut inserted = Vec::with_capacity(batch_len);
        let mut suppressed = 0;
        for message in batch {
            if self.dedup.add(message.id.clone()) {
                inserted.push(message);
            } else {
                suppressed += 1;
            }
        }
        if suppressed > 0 {
            debug!(suppressed, "duplicate older messages suppressed");
        }
        self.transcript.prepend(inserted.clone());

        if batch_len > 0 && !cursor_advanced {
            warn!(
                batch_len,
                "older page did not move the oldest cursor, treating history as exhausted"
            );
        }
        self.pagination.finish_page(batch_len, cursor_advanced);
        if !self.pagination.has_more_older() {
            info!(batch_len, "reached the beginning of chat history");
        }

        InsertPlan {
            generation: self.generation,
            mode: MergeMode::PrependOlder,
            position,
            inserted,
            suppressed,
            batch_len,
        }
    }
}
