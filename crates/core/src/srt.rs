//! SubRip (`.srt`) subtitle format.
//!
//! ```text
//! 1
//! 00:00:01,000 --> 00:00:03,500
//! first line
//!
//! 2
//! 00:00:04,000 --> 00:00:06,000
//! second line
//! ```

use std::fmt::Write as _;
use std::time::Duration;

/// One timed subtitle cue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleCue {
    /// 1-based position in the track.
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

impl SubtitleCue {
    pub fn new(index: usize, start: Duration, end: Duration, text: impl Into<String>) -> Self {
        Self { index, start, end, text: text.into() }
    }
}

/// Malformed SubRip input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {reason}")]
pub struct SrtError {
    pub line: usize,
    pub reason: String,
}

impl SrtError {
    fn new(line: usize, reason: impl Into<String>) -> Self {
        Self { line, reason: reason.into() }
    }
}

/// Render cues as SubRip text.
///
/// Cues are renumbered from 1 in slice order. Blank lines inside cue text
/// would end the cue early, so they are dropped.
pub fn compose(cues: &[SubtitleCue]) -> String {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        let text: Vec<&str> = cue.text.lines().filter(|l| !l.trim().is_empty()).collect();
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_timestamp(cue.start),
            format_timestamp(cue.end),
            text.join("\n")
        );
    }
    out
}

/// Parse SubRip text into cues, in file order.
///
/// Accepts CRLF line endings, a leading byte order mark, `.` as the
/// millisecond separator and trailing cue settings after the end timestamp.
pub fn parse(input: &str) -> Result<Vec<SubtitleCue>, SrtError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut lines = input.lines().map(|l| l.trim_end_matches('\r')).enumerate().peekable();
    let mut cues = Vec::new();

    loop {
        while lines.next_if(|(_, l)| l.trim().is_empty()).is_some() {}

        let Some((n, index_line)) = lines.next() else {
            break;
        };
        let index = index_line
            .trim()
            .parse::<usize>()
            .map_err(|_| SrtError::new(n + 1, format!("expected cue number, found {index_line:?}")))?;

        let (n, timing) = lines
            .next()
            .ok_or_else(|| SrtError::new(n + 2, "missing timing line"))?;
        let (start, end) = parse_timing(timing).ok_or_else(|| SrtError::new(n + 1, format!("bad timing {timing:?}")))?;

        let mut text = Vec::new();
        while let Some((_, line)) = lines.next_if(|(_, l)| !l.trim().is_empty()) {
            text.push(line);
        }

        cues.push(SubtitleCue { index, start, end, text: text.join("\n") });
    }

    Ok(cues)
}

fn parse_timing(line: &str) -> Option<(Duration, Duration)> {
    let (start, rest) = line.split_once("-->")?;
    let end = rest.split_whitespace().next()?;
    Some((parse_timestamp(start.trim())?, parse_timestamp(end)?))
}

/// Parse `HH:MM:SS,mmm` (or `HH:MM:SS.mmm`).
pub fn parse_timestamp(ts: &str) -> Option<Duration> {
    let (hms, frac) = ts.split_once([',', '.'])?;
    let mut parts = hms.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }

    if frac.is_empty() || frac.len() > 3 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let millis: u64 = frac.parse().ok()?;
    let millis = millis * 10u64.pow(3 - frac.len() as u32);

    let total = hours
        .checked_mul(3600)?
        .checked_add(minutes * 60 + seconds)?
        .checked_mul(1000)?
        .checked_add(millis)?;
    Some(Duration::from_millis(total))
}

/// Format a duration as `HH:MM:SS,mmm`.
pub fn format_timestamp(d: Duration) -> String {
    let total_ms = d.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(ms(0)), "00:00:00,000");
        assert_eq!(format_timestamp(ms(3_723_045)), "01:02:03,045");
        assert_eq!(format_timestamp(Duration::from_secs(100 * 3600)), "100:00:00,000");
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("01:02:03,045"), Some(ms(3_723_045)));
        assert_eq!(parse_timestamp("00:00:01.5"), Some(ms(1_500)));
        assert_eq!(parse_timestamp("00:61:00,000"), None);
        assert_eq!(parse_timestamp("00:00:00"), None);
        assert_eq!(parse_timestamp("aa:00:00,000"), None);
    }

    #[test]
    fn test_parse_timestamp_overflow() {
        assert_eq!(parse_timestamp("99999999999999:00:00,000"), None);
        assert_eq!(parse_timestamp("18446744073709551615:00:00,000"), None);

        let err = parse("1\n99999999999999:00:00,000 --> 99999999999999:00:01,000\nx\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_compose() {
        let cues = vec![
            SubtitleCue::new(1, ms(1_000), ms(3_500), "hello there"),
            SubtitleCue::new(2, ms(4_000), ms(6_000), "two\nlines"),
        ];
        assert_eq!(
            compose(&cues),
            "1\n00:00:01,000 --> 00:00:03,500\nhello there\n\n2\n00:00:04,000 --> 00:00:06,000\ntwo\nlines\n\n"
        );
    }

    #[test]
    fn test_compose_then_parse() {
        let cues = vec![
            SubtitleCue::new(1, ms(0), ms(2_160), "a trade-off between space"),
            SubtitleCue::new(2, ms(2_160), ms(5_000), "and time\nacross lines"),
            SubtitleCue::new(3, ms(3_600_000), ms(3_601_001), "[Music]"),
        ];
        assert_eq!(parse(&compose(&cues)).unwrap(), cues);
    }

    #[test]
    fn test_parse_crlf_bom_and_settings() {
        let input = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,000 X1:40 X2:600\r\nHi\r\n\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nBye\r\n";
        let cues = parse(input).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0], SubtitleCue::new(1, ms(1_000), ms(2_000), "Hi"));
        assert_eq!(cues[1].text, "Bye");
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("\n\n  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_errors_report_line() {
        let err = parse("1\n00:00:01,000 --> 00:00:02,000\nok\n\nnot-a-number\n").unwrap_err();
        assert_eq!(err.line, 5);

        let err = parse("1\n00:00:01 -> 00:00:02\n").unwrap_err();
        assert_eq!(err.line, 2);

        let err = parse("1\n").unwrap_err();
        assert_eq!(err.line, 2);
    }
}
