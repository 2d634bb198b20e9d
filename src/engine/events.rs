//! Events fed into the reducer and commands it hands back to the driver.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::logging::{Domain, Level};

/// Epoch milliseconds
pub type Timestamp = u64;

/// Identifies one scheduled timer. Never reused within a session.
pub type Ticket = u64;

/// The four simulated async actions, in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Generate,
    Simulate,
    Evolve,
    Deploy,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Generate,
        ActionKind::Simulate,
        ActionKind::Evolve,
        ActionKind::Deploy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Generate => "generate",
            ActionKind::Simulate => "simulate",
            ActionKind::Evolve => "evolve",
            ActionKind::Deploy => "deploy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generate" | "gen" => Some(ActionKind::Generate),
            "simulate" | "sim" | "omniverse" => Some(ActionKind::Simulate),
            "evolve" | "evo" => Some(ActionKind::Evolve),
            "deploy" | "paper" => Some(ActionKind::Deploy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    User(UserEvent),
    Timer { ts: Timestamp, ticket: Ticket },
    Sys(SysEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserEvent {
    Invoke { ts: Timestamp, action: ActionKind },
    SelectTool { ts: Timestamp, tool: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SysEvent {
    /// Arms the chatter timer
    Boot { ts: Timestamp },
    /// Cancels everything outstanding; the session accepts nothing after it
    Teardown { ts: Timestamp },
}

impl Event {
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Event::User(UserEvent::Invoke { ts, .. }) => *ts,
            Event::User(UserEvent::SelectTool { ts, .. }) => *ts,
            Event::Timer { ts, .. } => *ts,
            Event::Sys(SysEvent::Boot { ts }) => *ts,
            Event::Sys(SysEvent::Teardown { ts }) => *ts,
        }
    }

    pub fn invoke(ts: Timestamp, action: ActionKind) -> Self {
        Event::User(UserEvent::Invoke { ts, action })
    }

    pub fn select(ts: Timestamp, tool: &str) -> Self {
        Event::User(UserEvent::SelectTool {
            ts,
            tool: tool.to_string(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::User(UserEvent::Invoke { .. }) => "invoke",
            Event::User(UserEvent::SelectTool { .. }) => "select_tool",
            Event::Timer { .. } => "timer",
            Event::Sys(SysEvent::Boot { .. }) => "boot",
            Event::Sys(SysEvent::Teardown { .. }) => "teardown",
        }
    }
}

/// Side effects requested by the reducer. Drivers execute them in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Deliver `Event::Timer { ticket }` after `delay_ms`
    Schedule { ticket: Ticket, delay_ms: u64 },
    /// Drop a scheduled timer; firing it later must be a no-op
    Cancel { ticket: Ticket },
    /// A line was appended to the terminal
    Append { line: String },
    /// View state changed in a way the user can see
    Render,
    Log {
        level: Level,
        domain: Domain,
        event: &'static str,
        fields: Map<String, Value>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse() {
        assert_eq!(ActionKind::parse("Generate"), Some(ActionKind::Generate));
        assert_eq!(ActionKind::parse(" sim "), Some(ActionKind::Simulate));
        assert_eq!(ActionKind::parse("paper"), Some(ActionKind::Deploy));
        assert_eq!(ActionKind::parse("launch"), None);
        for a in ActionKind::ALL {
            assert_eq!(ActionKind::parse(a.as_str()), Some(a));
        }
    }

    #[test]
    fn test_event_timestamp() {
        assert_eq!(Event::invoke(42, ActionKind::Deploy).timestamp(), 42);
        assert_eq!(Event::Timer { ts: 7, ticket: 1 }.timestamp(), 7);
        assert_eq!(Event::Sys(SysEvent::Teardown { ts: 9 }).timestamp(), 9);
    }

    #[test]
    fn test_event_json_shape() {
        let ev = Event::invoke(1, ActionKind::Evolve);
        let s = serde_json::to_string(&ev).unwrap();
        assert!(s.contains("\"kind\":\"user\""));
        assert!(s.contains("\"action\":\"evolve\""));
    }
}
