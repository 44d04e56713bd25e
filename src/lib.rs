// Export public modules
pub mod common;
pub mod storage;

// Re-export key items for convenient access
pub use storage::buffer::BufferPoolManager;
pub use storage::buffer::BufferPoolError;
pub use storage::buffer::{AccessType, LruKReplacer, ReplacerError};
pub use storage::buffer::{PageGuard, ReadPageGuard, WritePageGuard};
pub use storage::disk::{DiskManager, DiskManagerError};
