//! Agent event protocol: type + payload + timestamp.
//!
//! This crate defines the wire shape of a single agent event. It does not
//! depend on the core; the core's emitter port carries these values and UI
//! adapters serialize them with `to_value` / serde.

pub mod event;

pub use event::{Event, EventPayload};
