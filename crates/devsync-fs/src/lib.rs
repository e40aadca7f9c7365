//! Filesystem primitives for devsync
//!
//! Provides root-relative path handling, format-agnostic config loading,
//! atomic writes and the advisory session lock.

pub mod config;
pub mod error;
pub mod io;
pub mod lock;
pub mod path;

pub use config::{ConfigFormat, ConfigStore};
pub use error::{Error, Result};
pub use lock::SessionLock;
pub use path::{NormalizedPath, RelativePath};
