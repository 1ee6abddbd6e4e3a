/// Staged, unpublished edits awaiting an apply.
pub mod changeset;
/// Event index binding the posting store and the expiration table.
pub mod event;
/// Deadline-ordered expiration table.
pub mod expire;
/// Index manager: maintenance task and snapshot dump/load.
pub mod manager;
/// Immutable posting-list versions.
pub mod posting;
/// Concurrent term-to-posting-list store.
pub mod store;

pub use event::EventIndex;
pub use expire::ExpireTable;
pub use manager::IndexManager;
pub use posting::{Posting, PostingList};
pub use store::PostingStore;
