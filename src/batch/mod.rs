//! Batch key composition.
//!
//! A loader compiled for batch size `n` holds one statement per rung of a
//! [`BatchLadder`]; at load time [`BatchDescriptor::initialize`] picks the largest
//! rung that can be filled entirely with real pending keys.

pub mod composer;
pub mod errors;
pub mod key_queue;
pub mod ladder;

pub use composer::{BatchDescriptor, BatchSelection};
pub use errors::BatchConfigError;
pub use key_queue::{InMemoryKeyQueue, PendingKeyQueue};
pub use ladder::{
    BatchLadder, BatchLadderKind, DoublingLadder, FixedLadder, LegacyLadder, LinearLadder,
};
