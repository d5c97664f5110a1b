//! Serialize `Arc<T>` fields as their contents.
//!
//! Use with `#[serde(serialize_with = "crate::utils::serde_arc::serialize")]` so
//! shared plan data can be written out without enabling serde's `rc` feature.

use serde::{Serialize, Serializer};
use std::sync::Arc;

pub fn serialize<S, T>(value: &Arc<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize + ?Sized,
{
    value.as_ref().serialize(serializer)
}
