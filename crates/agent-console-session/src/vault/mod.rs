//! Session vault backends.

#[cfg(feature = "file")]
mod file;
#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "file")]
pub use file::FileVault;
#[cfg(feature = "memory")]
pub use memory::MemoryVault;
