//! Parser for the timestamped `.lrc` lyric format.

use std::sync::Arc;
use std::time::Duration;

/// Extension used for companion lyric files
pub const LRC_EXTENSION: &str = "lrc";

/// A single line of lyrics with timing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    /// Offset from the start of the track
    pub time: Duration,
    /// Line text, trimmed and never empty
    pub text: String,
}

impl LyricLine {
    pub fn new(time: Duration, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
        }
    }
}

/// Parsed lyrics sorted by start time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lyrics {
    pub lines: Vec<LyricLine>,
}

impl Lyrics {
    /// Parse LRC text.
    ///
    /// Malformed lines and lines without text are skipped, so this never fails;
    /// garbage input simply yields empty lyrics.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut lines: Vec<LyricLine> = input.lines().filter_map(parse_lyric_line).collect();

        // Stable: equal timestamps keep file order
        lines.sort_by_key(|l| l.time);

        Self { lines }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Convert into a shared, immutable line sequence
    #[must_use]
    pub fn into_shared(self) -> Arc<[LyricLine]> {
        self.lines.into()
    }
}

/// Index of the last line whose start time is at or before `position`.
///
/// `lines` must be sorted by time. Among duplicate timestamps the last one wins.
#[must_use]
pub fn active_line_index(lines: &[LyricLine], position: Duration) -> Option<usize> {
    lines
        .partition_point(|line| line.time <= position)
        .checked_sub(1)
}

/// Parse a lyric line like `[01:02.50]Hello world`
fn parse_lyric_line(line: &str) -> Option<LyricLine> {
    let rest = line.trim_start().strip_prefix('[')?;
    let end = rest.find(']')?;
    let time = parse_timestamp(&rest[..end])?;

    let text = rest[end + 1..].trim();
    if text.is_empty() {
        return None;
    }

    Some(LyricLine::new(time, text))
}

/// Parse a timestamp like `mm:ss`, `mm:ss.xx` or `mm:ss.xxx`
fn parse_timestamp(s: &str) -> Option<Duration> {
    let (minutes, rest) = s.split_once(':')?;
    let (seconds, fraction) = match rest.split_once('.') {
        Some((seconds, fraction)) => (seconds, Some(fraction)),
        None => (rest, None),
    };

    if minutes.is_empty() || !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if seconds.len() != 2 || !seconds.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;

    let millis = match fraction {
        None => 0,
        Some(f) if (2..=3).contains(&f.len()) && f.bytes().all(|b| b.is_ascii_digit()) => {
            let value: u64 = f.parse().ok()?;
            // Two digits are hundredths: right-pad to milliseconds
            if f.len() == 2 { value * 10 } else { value }
        }
        Some(_) => return None,
    };

    let total = minutes
        .checked_mul(60_000)?
        .checked_add(seconds * 1000)?
        .checked_add(millis)?;

    Some(Duration::from_millis(total))
}
