pub mod error;
pub mod guard;
pub mod manager;
pub mod replacer;

pub use error::BufferPoolError;
pub use guard::{PageGuard, ReadPageGuard, WritePageGuard};
pub use manager::BufferPoolManager;
pub use replacer::{AccessType, LruKReplacer, ReplacerError};
