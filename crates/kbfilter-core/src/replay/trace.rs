// Kbfilter Replay - Trace Parser
// Line-oriented keystroke traces: `<t_ms> <code>[:e0|:e1](+|-) ...`

use std::path::Path;
use std::time::Duration;

use crate::input::{KeyboardInputData, KEY_E0, KEY_E1};

/// Errors that can occur when reading a trace
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: timestamp goes backwards")]
    OutOfOrder { line: usize },
}

/// One batch of events delivered together at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct TraceBatch {
    /// 1-based source line
    pub line: usize,
    /// Offset from the start of the trace
    pub at: Duration,
    pub events: Vec<KeyboardInputData>,
}

/// Read and parse a trace file
pub fn load_trace<P: AsRef<Path>>(path: P) -> Result<Vec<TraceBatch>, TraceError> {
    let content = std::fs::read_to_string(path)?;
    parse_trace(&content)
}

/// Parse trace text.
///
/// Blank lines and `#` comments are skipped. Timestamps must not decrease.
pub fn parse_trace(content: &str) -> Result<Vec<TraceBatch>, TraceError> {
    let mut batches: Vec<TraceBatch> = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let text = raw.split('#').next().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }

        let mut fields = text.split_whitespace();
        let stamp = fields.next().unwrap_or_default();
        let at_ms: u64 = stamp.parse().map_err(|_| TraceError::Syntax {
            line,
            message: format!("invalid timestamp '{}'", stamp),
        })?;
        let at = Duration::from_millis(at_ms);

        if batches.last().is_some_and(|prev| at < prev.at) {
            return Err(TraceError::OutOfOrder { line });
        }

        let events = fields
            .map(|field| parse_event(field).ok_or_else(|| TraceError::Syntax {
                line,
                message: format!("invalid event '{}'", field),
            }))
            .collect::<Result<Vec<_>, _>>()?;

        if events.is_empty() {
            return Err(TraceError::Syntax {
                line,
                message: "batch has no events".to_string(),
            });
        }

        batches.push(TraceBatch { line, at, events });
    }

    Ok(batches)
}

/// Parse `0x1e+`, `30-`, `0x1d:e0+`
fn parse_event(field: &str) -> Option<KeyboardInputData> {
    let (body, release) = if let Some(body) = field.strip_suffix('+') {
        (body, false)
    } else if let Some(body) = field.strip_suffix('-') {
        (body, true)
    } else {
        return None;
    };

    let (code_text, prefix) = match body.split_once(':') {
        Some((code, "e0")) => (code, KEY_E0),
        Some((code, "e1")) => (code, KEY_E1),
        Some(_) => return None,
        None => (body, 0),
    };

    let code = parse_code(code_text)?;
    let event = if release {
        KeyboardInputData::release(code)
    } else {
        KeyboardInputData::press(code)
    };
    Some(event.with_flags(prefix))
}

fn parse_code(text: &str) -> Option<u16> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::KEY_BREAK;

    #[test]
    fn test_parse_single_batch() {
        let batches = parse_trace("150 0x1e+ 0x1e-").unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].at, Duration::from_millis(150));
        assert_eq!(
            batches[0].events,
            vec![KeyboardInputData::press(0x1E), KeyboardInputData::release(0x1E)]
        );
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let text = "# glitchy A key\n\n0 30+   # first press\n10 30+\n";
        let batches = parse_trace(text).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].line, 4);
        assert_eq!(batches[1].events[0].make_code, 30);
    }

    #[test]
    fn test_extended_prefix() {
        let batches = parse_trace("0 0x1d:e0- 0x45:e1+").unwrap();
        assert_eq!(batches[0].events[0].flags, KEY_BREAK | KEY_E0);
        assert_eq!(batches[0].events[1].flags, KEY_E1);
    }

    #[test]
    fn test_bad_event_reports_line() {
        let err = parse_trace("0 0x1e+\n5 0x1e").unwrap_err();
        match err {
            TraceError::Syntax { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("0x1e"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_prefix_rejected() {
        assert!(parse_trace("0 0x1e:e2+").is_err());
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        assert!(matches!(
            parse_trace("soon 0x1e+"),
            Err(TraceError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn test_timestamps_must_not_decrease() {
        assert!(matches!(
            parse_trace("100 0x1e+\n50 0x1e-"),
            Err(TraceError::OutOfOrder { line: 2 })
        ));
        assert!(parse_trace("100 0x1e+\n100 0x1e-").is_ok());
    }

    #[test]
    fn test_batch_without_events_rejected() {
        assert!(matches!(
            parse_trace("100"),
            Err(TraceError::Syntax { line: 1, .. })
        ));
    }
}
