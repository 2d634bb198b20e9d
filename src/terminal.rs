//! Agent swarm terminal: a bounded, newest-first buffer of display lines.
//!
//! Lines are stored already formatted (`[HH:MM:SS] <source>: <message>`).
//! No timestamp is kept beside them; once appended a line is never touched
//! again, only evicted.

use std::collections::VecDeque;

use chrono::{Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::events::Timestamp;

/// Which wall clock the `[HH:MM:SS]` prefix is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockZone {
    Local,
    Utc,
}

impl ClockZone {
    pub fn from_env() -> Self {
        match std::env::var("CLOCK_TZ").as_deref() {
            Ok("utc") | Ok("UTC") => ClockZone::Utc,
            _ => ClockZone::Local,
        }
    }
}

/// `HH:MM:SS` for an epoch-millisecond timestamp.
pub fn stamp(ts: Timestamp, zone: ClockZone) -> String {
    let ms = ts as i64;
    let formatted = match zone {
        ClockZone::Utc => Utc
            .timestamp_millis_opt(ms)
            .single()
            .map(|t| t.format("%H:%M:%S").to_string()),
        ClockZone::Local => Local
            .timestamp_millis_opt(ms)
            .single()
            .map(|t| t.format("%H:%M:%S").to_string()),
    };
    formatted.unwrap_or_else(|| "--:--:--".to_string())
}

/// Full terminal line: `[HH:MM:SS] <source>: <message>`.
pub fn line(ts: Timestamp, zone: ClockZone, source: &str, message: &str) -> String {
    format!("[{}] {}: {}", stamp(ts, zone), source, message)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogBuffer {
    cap: usize,
    entries: VecDeque<String>,
    /// Lines ever appended, including evicted ones
    appended: u64,
}

impl LogBuffer {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            cap,
            entries: VecDeque::with_capacity(cap + 1),
            appended: 0,
        }
    }

    /// Buffer pre-filled with `lines`, given newest first (display order).
    pub fn seeded<'a>(cap: usize, lines: impl IntoIterator<Item = &'a str>) -> Self {
        let lines: Vec<&str> = lines.into_iter().collect();
        let mut buf = Self::new(cap);
        for l in lines.into_iter().rev() {
            buf.append(l.to_string());
        }
        buf
    }

    pub fn append(&mut self, entry: String) {
        self.entries.push_front(entry);
        self.entries.truncate(self.cap);
        self.appended += 1;
    }

    /// Newest first.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn latest(&self) -> Option<&str> {
        self.entries.front().map(String::as_str)
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.entries.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn appended(&self) -> u64 {
        self.appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_is_newest_first() {
        let mut buf = LogBuffer::new(4);
        buf.append("a".into());
        buf.append("b".into());
        assert_eq!(buf.entries().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(buf.latest(), Some("b"));
    }

    #[test]
    fn test_cap_invariant() {
        for cap in [1usize, 3, 8, 12] {
            for n in 0..30usize {
                let mut buf = LogBuffer::new(cap);
                for i in 0..n {
                    buf.append(format!("line-{}", i));
                }
                assert_eq!(buf.len(), n.min(cap));
                let expected: Vec<String> =
                    (0..n).rev().take(cap).map(|i| format!("line-{}", i)).collect();
                let got: Vec<String> = buf.entries().map(String::from).collect();
                assert_eq!(got, expected, "cap={} n={}", cap, n);
                assert_eq!(buf.appended(), n as u64);
            }
        }
    }

    #[test]
    fn test_zero_cap_coerced() {
        let mut buf = LogBuffer::new(0);
        buf.append("x".into());
        assert_eq!(buf.cap(), 1);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn test_seeded_order() {
        let mut buf = LogBuffer::seeded(3, ["newest", "middle", "oldest"]);
        assert_eq!(buf.entries().collect::<Vec<_>>(), vec!["newest", "middle", "oldest"]);

        buf.append("next".into());
        assert_eq!(buf.entries().collect::<Vec<_>>(), vec!["next", "newest", "middle"]);
    }

    #[test]
    fn test_utc_stamp() {
        // 2026-02-14T14:51:03Z
        let ts = 1_771_080_663_000;
        assert_eq!(stamp(ts, ClockZone::Utc), "14:51:03");
        assert_eq!(
            line(ts, ClockZone::Utc, "CausalForge", "ok"),
            "[14:51:03] CausalForge: ok"
        );
    }
}
