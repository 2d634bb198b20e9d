//! Plain-text rendering of the dashboard for terminal sessions.

use std::fmt::Write;

use crate::catalog::{ToolDescriptor, DEFAULT_TOOL, METRIC_CARDS, PAPER_TRADING_TOOL};
use crate::engine::state::DashboardState;
use crate::hypothesis::CausalHypothesis;

/// Equity points shown on the paper-trading tab
const EQUITY_TAIL: usize = 6;

pub fn render(state: &DashboardState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "MOONSHOT · LIVE · {}", state.revision.as_str().to_uppercase());

    let cards: Vec<String> = METRIC_CARDS
        .iter()
        .map(|c| format!("{} {}", c.value, c.label))
        .collect();
    let _ = writeln!(out, "{}", cards.join("  |  "));
    let _ = writeln!(out);

    for tool in state.revision.tools() {
        let marker = if tool.id == state.active_tool { '▶' } else { ' ' };
        let _ = writeln!(out, " {} {}", marker, tool.display_name);
    }
    let _ = writeln!(out);

    let tabs: Vec<String> = state
        .revision
        .tools()
        .iter()
        .map(|t| {
            if t.id == state.active_tool {
                format!("[{}]", t.tab_label())
            } else {
                t.tab_label().to_string()
            }
        })
        .collect();
    let _ = writeln!(out, "{}", tabs.join(" "));

    if let Some(tool) = state.revision.find_tool(&state.active_tool) {
        render_panel(&mut out, state, tool);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "AGENT SWARM TERMINAL");
    for line in state.terminal.entries() {
        let _ = writeln!(out, "  {}", line);
    }
    out
}

fn render_panel(out: &mut String, state: &DashboardState, tool: &ToolDescriptor) {
    let _ = writeln!(out, "── {} — LIVE", tool.display_name);
    match tool.id {
        DEFAULT_TOOL => {
            let label = if state.is_generating {
                "AGENT SWARM THINKING..."
            } else {
                "GENERATE NEW ALPHA"
            };
            let _ = writeln!(out, "   [{}]", label);
            if let Some(h) = &state.hypothesis {
                let _ = writeln!(out, "   {}% PERSISTENCE SCORE", h.persistence_pct());
                let _ = writeln!(out, "   Causal edge: {}", h.edge);
                let _ = writeln!(out, "   {}", dag_line(h));
            }
            if let Some(s) = &state.scenario {
                let _ = writeln!(out, "   Omniverse: {}", s.narrative);
            }
            if let Some(e) = &state.evolved {
                let _ = writeln!(
                    out,
                    "   Evolved: {} ({}%)",
                    e.edge,
                    (e.persistence * 100.0).round() as u32
                );
            }
        }
        PAPER_TRADING_TOOL => {
            let points = state.equity.points();
            let start = points.len().saturating_sub(EQUITY_TAIL);
            for p in &points[start..] {
                let _ = writeln!(out, "   t={:<4} ${:.0}", p.time, p.pnl);
            }
        }
        _ => {
            let _ = writeln!(
                out,
                "   {} coming in Phase 3 (full production integration)",
                tool.display_name
            );
        }
    }
}

/// `A ─▶ B ─▶ C`
pub fn dag_line(h: &CausalHypothesis) -> String {
    h.nodes.join(" ─▶ ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Revision;

    #[test]
    fn test_render_default_view() {
        let state = DashboardState::new(Revision::Classic);
        let text = render(&state);
        assert!(text.contains("▶ CausalForge Engine"));
        assert!(text.contains("GENERATE NEW ALPHA"));
        assert!(text.contains("94% PERSISTENCE"));
        let forge = text.find("CausalForge: New causal edge validated").unwrap();
        let teleporter = text.find("Liquidity Teleporter: Zero-impact path").unwrap();
        assert!(forge < teleporter);
        assert!(!text.contains("Paper Trading Desk"));
    }

    #[test]
    fn test_render_placeholder_and_paper_tab() {
        let mut state = DashboardState::new(Revision::Extended);
        state.active_tool = "shadowcrowd".into();
        assert!(render(&state).contains("coming in Phase 3"));

        state.active_tool = PAPER_TRADING_TOOL.into();
        assert!(render(&state).contains("t=0    $1000000"));
    }

    #[test]
    fn test_dag_line() {
        let h = Revision::Extended.candidates()[0].to_hypothesis();
        assert_eq!(
            dag_line(&h),
            "Options Skew ─▶ HFT Flow ─▶ Liquidity ─▶ Unwind ─▶ Drawdown"
        );
    }
}
