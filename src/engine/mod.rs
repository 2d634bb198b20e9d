//! Event-driven dashboard engine with deterministic replay semantics.
//!
//! Architecture:
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  User input  │────►│    Driver    │────►│   Reducer    │
//! │  + timers    │     │ (one thread) │     │  (pure fn)   │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!        ▲                                         │
//!        │             ┌──────────────┐     ┌──────────────┐
//!        └─────────────│   Commands   │◄────│  View state  │
//!                      │ (timers/log) │     │  (hashed)    │
//!                      └──────────────┘     └──────────────┘
//! ```
//!
//! Two drivers exist: [`crate::session::Session`] runs in virtual time for
//! tests and scripted replays, [`crate::runtime::Runtime`] runs on tokio
//! timers for the interactive binary.

pub mod events;
pub mod reducer;
pub mod state;

use crate::logging;
use events::Command;

/// Forward a `Command::Log` to the structured logger. Other commands are
/// left to the driver.
pub fn emit_log(cmd: &Command) {
    if let Command::Log {
        level,
        domain,
        event,
        fields,
    } = cmd
    {
        logging::log(*level, *domain, event, fields.clone());
    }
}
