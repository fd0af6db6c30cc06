//! Core ODB container module.
//!
//! ```text
//! raw bytes ─► container::load_container ─► sections + offset table
//!                                             │
//!              objects::KindTable::decode_at ◄┘  (on demand, per index)
//! ```

pub mod codec;
pub mod container;
pub mod format;
pub mod iter;
pub mod objects;
pub mod stream;
pub mod types;

pub use codec::crypto::{KeyProvider, KeyTable};
pub use container::{Container, LoadOptions, load_container};
pub use objects::{KindTable, ObjectBody, ObjectKind, OdbObject};
pub use types::error::{OdbError, Result};
pub use types::models::{Advisory, DigestScope, FormatTag, OptimizationFlags};
