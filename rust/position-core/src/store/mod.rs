// rust/position-core/src/store/mod.rs

//! Keyed row sources for the batch generator.
//!
//! Two backends implement [`BackingStore`]: [`SqlStore`] over a SQLite table
//! and [`ShardedTableStore`] over a shard directory written by
//! [`crate::shards::ShardedFileStore`].

mod sharded;
mod sqlite;
mod traits;

pub use sharded::ShardedTableStore;
pub use sqlite::SqlStore;
pub use traits::{BackingStore, KeyRange};
