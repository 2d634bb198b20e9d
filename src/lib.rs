//! Moonshot dashboard engine: the stateful core behind the causal-alpha
//! dashboard. Simulated async actions, a bounded swarm terminal and the view
//! state they mutate, driven either in virtual time or on tokio timers.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod hypothesis;
pub mod logging;
pub mod runtime;
pub mod scheduler;
pub mod script;
pub mod session;
pub mod terminal;
pub mod view;
