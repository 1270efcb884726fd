// src/events/mod.rs

//! Live build events from the buck daemon.
//!
//! - [`message`] defines the `EngineEvent` union and its wire decoding.
//! - [`client`] owns the shared connection and per-subscriber streams.

pub mod client;
pub mod message;

pub use client::{EventStream, EventStreamClient, EventSubscription, EVENTS_PATH};
pub use message::{ConsoleLevel, EngineEvent};
