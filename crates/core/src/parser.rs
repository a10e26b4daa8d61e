//! Parsers for the streamed output of the external tools.
//!
//! All functions are pure and look at a single line at a time.

use once_cell::sync::Lazy;
use regex_lite::Regex;

static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Duration: (\d{2}):(\d{2}):(\d{2})\.(\d{2})").expect("valid duration regex")
});

static ELAPSED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"size=.*time=(\d{2}):(\d{2}):(\d{2})\.(\d{2})").expect("valid elapsed regex")
});

static CHECKSUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"checksum == ([0-9A-Fa-f]+)").expect("valid checksum regex"));

const KEY_MARKER: &str = "hex:";
const KEY_NOT_FOUND: &str = "notfound";
const TAGGING_MARKER: &str = "Progress:";
const COVER_MARKER: &str = "adding";

/// A `HH:MM:SS.CC` timestamp as printed by ffmpeg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub centiseconds: u64,
}

impl Timestamp {
    /// Whole seconds; centiseconds are dropped.
    pub fn total_seconds(&self) -> u64 {
        self.hours * 3600 + self.minutes * 60 + self.seconds
    }
}

fn parse_timestamp(re: &Regex, line: &str) -> Option<Timestamp> {
    let caps = re.captures(line)?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    Some(Timestamp {
        hours: field(1)?,
        minutes: field(2)?,
        seconds: field(3)?,
        centiseconds: field(4)?,
    })
}

/// Total length of the input, printed once near the start of a transcode.
pub fn parse_duration(line: &str) -> Option<Timestamp> {
    parse_timestamp(&DURATION, line)
}

/// Position reached so far, printed repeatedly while transcoding.
pub fn parse_elapsed(line: &str) -> Option<Timestamp> {
    parse_timestamp(&ELAPSED, line)
}

/// `floor(elapsed * 100 / total)`, capped at 100.
///
/// Returns `None` when `total_seconds` is 0.
pub fn percent_from_elapsed(elapsed_seconds: u64, total_seconds: u64) -> Option<u8> {
    if total_seconds == 0 {
        return None;
    }
    let percent = elapsed_seconds.saturating_mul(100) / total_seconds;
    Some(percent.min(100) as u8)
}

/// Decryption key reported by the cracking tool.
///
/// The key follows a `hex:` marker. A `notfound` report or an empty value
/// yields `None`.
pub fn parse_key_token(line: &str) -> Option<String> {
    let (_, rest) = line.split_once(KEY_MARKER)?;
    let key = rest.trim();
    if key.is_empty() || key.contains(KEY_NOT_FOUND) {
        return None;
    }
    Some(key.to_string())
}

/// Percentage from a tagger line such as `Progress: =====>  42% |`.
pub fn parse_tagging_progress(line: &str) -> Option<u8> {
    if !line.contains(TAGGING_MARKER) {
        return None;
    }
    let (before, _) = line.split_once('%')?;
    let value = before.split_whitespace().last()?.parse::<u32>().ok()?;
    Some(value.min(100) as u8)
}

/// Content checksum that ffprobe prints for AAX files.
pub fn parse_checksum(line: &str) -> Option<String> {
    CHECKSUM
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Whether the cover tool reported that it is writing the artwork.
pub fn is_cover_adding(line: &str) -> bool {
    line.contains(COVER_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        let line = "  Duration: 01:02:03.45, start: 0.000000, bitrate: 63 kb/s";
        let ts = parse_duration(line).unwrap();
        assert_eq!(
            ts,
            Timestamp {
                hours: 1,
                minutes: 2,
                seconds: 3,
                centiseconds: 45
            }
        );
        assert_eq!(ts.total_seconds(), 3723);
    }

    #[test]
    fn test_parse_duration_ignores_other_lines() {
        assert!(parse_duration("Stream #0:0(eng): Audio: aac (LC)").is_none());
        assert!(parse_duration("Duration: N/A, bitrate: N/A").is_none());
    }

    #[test]
    fn test_parse_elapsed() {
        let line = "size=   10240kB time=00:10:00.50 bitrate= 139.8kbits/s speed= 312x";
        let ts = parse_elapsed(line).unwrap();
        assert_eq!(ts.total_seconds(), 600);
        assert_eq!(ts.centiseconds, 50);

        // The duration header is not a progress line
        assert!(parse_elapsed("  Duration: 01:02:03.45").is_none());
    }

    #[test]
    fn test_percent_from_elapsed() {
        assert_eq!(percent_from_elapsed(30, 120), Some(25));
        assert_eq!(percent_from_elapsed(0, 100), Some(0));
        assert_eq!(percent_from_elapsed(1, 3), Some(33));
        assert_eq!(percent_from_elapsed(130, 120), Some(100));
        assert_eq!(percent_from_elapsed(10, 0), None);
    }

    #[test]
    fn test_parse_key_token() {
        assert_eq!(
            parse_key_token("result  1a2b3c4d  hex:cafed00d\n").as_deref(),
            Some("cafed00d")
        );
        assert_eq!(parse_key_token("1a2b3c4d  <notfound>  hex:<notfound>"), None);
        assert_eq!(parse_key_token("hex:   "), None);
        assert_eq!(parse_key_token("statistics"), None);
    }

    #[test]
    fn test_parse_tagging_progress() {
        assert_eq!(
            parse_tagging_progress("Started writing to temp file.\rProgress: =====>  42% |"),
            Some(42)
        );
        assert_eq!(parse_tagging_progress("Progress: 100%"), Some(100));
        assert_eq!(parse_tagging_progress("Progress: ==>  4x% |"), None);
        assert_eq!(parse_tagging_progress("Progress: no percentage"), None);
        assert_eq!(parse_tagging_progress("42% done"), None);
    }

    #[test]
    fn test_parse_checksum() {
        let line = "[aax @ 0x7f8] file checksum == 0A1B2C3D4E5F60718293A4B5C6D7E8F901234567";
        assert_eq!(
            parse_checksum(line).as_deref(),
            Some("0a1b2c3d4e5f60718293a4b5c6d7e8f901234567")
        );
        assert!(parse_checksum("[aax @ 0x7f8] ==== Encrypted CODEC ====").is_none());
    }

    #[test]
    fn test_is_cover_adding() {
        assert!(is_cover_adding("adding cover.jpg to book.m4b"));
        assert!(!is_cover_adding("done"));
    }
}
