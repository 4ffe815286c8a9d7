//! Rune Compose - compose descriptors as a typed entity graph
//!
//! Reads Docker Compose style documents into a [`Compose`] descriptor whose
//! services reference networks, volumes, secrets, environment entries and
//! each other, and writes descriptors back out in one canonical shape.
//!
//! - Permissive decoding of every shape a field may take
//! - Referential integrity under mutation
//! - Canonical encoding and content hashing

pub mod commons;
pub mod compose;
pub mod error;
pub mod translator;

pub use compose::{Compose, ComposeParser};
pub use error::{ComposeError, Result};
pub use translator::Translator;
