//! Protocol types and data models.
//!
//! This module contains all the type definitions for the task protocol:
//! parts, messages, tasks, artifacts, agent cards, and JSON-RPC structures.

mod agent;
mod jsonrpc;
mod message;
mod part;
mod task;

pub use agent::*;
pub use jsonrpc::*;
pub use message::*;
pub use part::*;
pub use task::*;
