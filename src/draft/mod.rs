//! Draft persistence: explicit save and restore of the in-progress session.

pub mod storage;
pub mod store;

pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{AttachmentPolicy, DRAFT_KEY, DraftStore, SaveReport};
