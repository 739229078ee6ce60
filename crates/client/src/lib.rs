// chatsync-client library entry point: the sync engine and its drivers.

pub mod config;
pub mod cursor;
pub mod dedup;
pub mod heartbeat;
pub mod merge;
pub mod pagination;
pub mod runtime;
pub mod script;
pub mod scroll;
pub mod session;
pub mod transport;
pub mod view;

pub use config::SyncConfig;
pub use merge::{InsertPlan, InsertPosition, MergeEngine, MergeMode};
pub use scroll::{ScrollAction, ViewportMetrics};
pub use session::{SessionState, SyncSession};
pub use transport::{ChannelTransport, ChatTransport};
pub use view::{SimulatedView, TranscriptView};
