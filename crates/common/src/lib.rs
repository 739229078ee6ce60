// chatsync-common: wire types and stateless helpers shared by chatsync crates.

pub mod display;
pub mod protocol;
pub mod timestamp;
pub mod types;

pub use protocol::events::{ClientEvent, LoadOlderRequest, RefreshRequest, ServerEvent, SyncStatus};
pub use timestamp::Timestamp;
pub use types::{Message, MessageId};
