//! Building blocks shared by every compose entity
//!
//! Identifier generation, the ordered unique collection that backs every
//! entity group, attribute-value pairs and the unit types used by policies.

pub mod entity_set;
pub mod id;
pub mod key_value;
pub mod units;

pub use entity_set::{Entity, EntitySet};
pub use key_value::{Env, KeyValue};
pub use units::{ByteUnit, ByteValue, Delay, TimeUnit};
