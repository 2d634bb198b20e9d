//! Line-oriented command language shared by the interactive console and
//! scripted sessions.
//!
//! ```text
//! generate            # also: simulate, evolve, deploy
//! select evoalpha
//! wait 1800           # virtual sessions only
//! settle              # run until no action is pending
//! show
//! quit
//! ```

use anyhow::{anyhow, bail, Result};

use crate::catalog::{Revision, PAPER_TRADING_TOOL};
use crate::engine::events::ActionKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    Invoke(ActionKind),
    Select(String),
    Wait(u64),
    Settle,
    Show,
    Quit,
}

/// Parse one line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ScriptStep>> {
    let line = match line.split_once('#') {
        Some((before, _)) => before,
        None => line,
    }
    .trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let head = parts.next().unwrap_or_default().to_ascii_lowercase();
    let arg = parts.next();
    if parts.next().is_some() {
        bail!("too many arguments: {}", line);
    }

    let step = match (head.as_str(), arg) {
        ("select", Some(tool)) => ScriptStep::Select(tool.to_string()),
        ("select", None) => bail!("select needs a tool id"),
        ("wait", Some(ms)) => ScriptStep::Wait(
            ms.parse()
                .map_err(|e| anyhow!("bad wait duration {:?}: {}", ms, e))?,
        ),
        ("wait", None) => bail!("wait needs a duration in ms"),
        ("settle", None) => ScriptStep::Settle,
        ("show", None) => ScriptStep::Show,
        ("quit", None) | ("exit", None) => ScriptStep::Quit,
        (other, None) => match ActionKind::parse(other) {
            Some(action) => ScriptStep::Invoke(action),
            None => bail!("unknown command: {}", other),
        },
        (other, Some(_)) => bail!("{} takes no argument", other),
    };
    Ok(Some(step))
}

/// Parse a whole script, reporting the first bad line by number.
pub fn parse_script(src: &str) -> Result<Vec<ScriptStep>> {
    let mut steps = Vec::new();
    for (i, line) in src.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(step)) => steps.push(step),
            Ok(None) => {}
            Err(e) => bail!("line {}: {}", i + 1, e),
        }
    }
    Ok(steps)
}

/// Built-in walk through the whole action chain. The paper-trading tab is
/// only selected where the revision has one.
pub fn demo_script(revision: Revision) -> String {
    let mut src = String::from(
        "# full action chain\n\
         generate\n\
         generate        # ignored while thinking\n\
         settle\n\
         simulate\n\
         evolve\n\
         settle\n",
    );
    if revision.find_tool(PAPER_TRADING_TOOL).is_some() {
        src.push_str("select papertrading\n");
    }
    src.push_str("deploy\ndeploy\nsettle\nshow\nquit\n");
    src
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_actions() {
        assert_eq!(parse_line("generate").unwrap(), Some(ScriptStep::Invoke(ActionKind::Generate)));
        assert_eq!(parse_line("  DEPLOY ").unwrap(), Some(ScriptStep::Invoke(ActionKind::Deploy)));
    }

    #[test]
    fn test_parse_args_and_comments() {
        assert_eq!(parse_line("select evoalpha").unwrap(), Some(ScriptStep::Select("evoalpha".into())));
        assert_eq!(parse_line("wait 1800 # generate delay").unwrap(), Some(ScriptStep::Wait(1800)));
        assert_eq!(parse_line("# nothing").unwrap(), None);
        assert_eq!(parse_line("").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_line("launch").is_err());
        assert!(parse_line("wait soon").is_err());
        assert!(parse_line("select").is_err());
        assert!(parse_line("deploy now").is_err());
        assert!(parse_line("select a b").is_err());
    }

    #[test]
    fn test_parse_script_reports_line() {
        let err = parse_script("generate\nsettle\nbogus\n").unwrap_err();
        assert!(err.to_string().starts_with("line 3:"));
        let steps = parse_script("generate\n\nsettle\nquit\n").unwrap();
        assert_eq!(steps.len(), 3);
    }
}
