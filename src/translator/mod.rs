//! Conversion between compose trees and descriptors
//!
//! [`Translator::decode`] accepts every shape the compose format allows for a
//! field; [`Translator::encode`] always emits one canonical shape. A tree is a
//! [`serde_yaml::Value`], which is format-agnostic: JSON documents parse into
//! it as well.

mod decode;
mod encode;
mod shape;

use crate::compose::Compose;
use crate::error::Result;
use serde_yaml::Value;

/// Stateless compose tree translator
pub struct Translator;

impl Translator {
    /// Build a descriptor from a parsed compose tree.
    ///
    /// Fails with [`ComposeError::MissingServices`](crate::ComposeError::MissingServices)
    /// when the tree has no `services` mapping, and with
    /// [`ComposeError::InvalidArgument`](crate::ComposeError::InvalidArgument) when a
    /// service has both an image and a build or a secret has more than one
    /// source.
    pub fn decode(input: &Value) -> Result<Compose> {
        decode::decode(input)
    }

    /// Render a descriptor as a canonical compose tree
    pub fn encode(compose: &Compose) -> Value {
        encode::encode(compose)
    }
}
