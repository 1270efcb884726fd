// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`invocation`] describes one buck call and its captured output.
//! - [`env`] snapshots the launch environment buck children inherit.
//! - [`backend`] provides the `EngineBackend` trait and the real
//!   `ProcessBackend`; tests replace it with a fake.
//! - [`stream`] runs long-lived calls and relays their output line by line.
//! - [`runner`] owns `CommandRunner`, which builds invocations and routes
//!   run-to-completion calls through the concurrency pool.

pub mod backend;
pub mod env;
pub mod invocation;
pub mod runner;
pub mod stream;

pub use backend::{EngineBackend, ProcessBackend};
pub use invocation::{CommandOutput, Invocation};
pub use runner::{CommandRunner, RunOptions};
pub use stream::{OutputChunk, OutputStream};
