//! Testing utilities for pipeline and supervisor tests.
//!
//! [`MockToolRunner`] stands in for the external tools, so whole jobs can
//! run without ffmpeg, rcrack or the tagging tools being installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use aax2m4b_core::testing::{fixtures, MockToolRunner, ToolScript};
//!
//! let runner = MockToolRunner::new();
//! runner
//!     .script("ffprobe", ToolScript::lines([fixtures::checksum_line("0a1b2c")]))
//!     .await;
//! runner
//!     .script("rcrack", ToolScript::lines([fixtures::rcrack_hit("0a1b2c", "cafed00d")]))
//!     .await;
//!
//! // Use in ConversionPipeline::new(Arc::new(runner.clone()), ...)
//! ```

mod mock_tool_runner;

pub use mock_tool_runner::{MockToolRunner, ToolScript};

/// Output lines in the shape the real tools print them.
pub mod fixtures {
    fn clock(seconds: u64) -> String {
        format!(
            "{:02}:{:02}:{:02}.00",
            seconds / 3600,
            (seconds / 60) % 60,
            seconds % 60
        )
    }

    /// ffprobe's report of the AAX content checksum.
    pub fn checksum_line(checksum: &str) -> String {
        format!("[aax @ 0x55d0c3a4e2c0] file checksum == {}", checksum)
    }

    /// ffmpeg/ffprobe header line with the input duration.
    pub fn duration_line(seconds: u64) -> String {
        format!(
            "  Duration: {}, start: 0.000000, bitrate: 63 kb/s",
            clock(seconds)
        )
    }

    /// ffmpeg progress line after `seconds` of output.
    pub fn elapsed_line(seconds: u64) -> String {
        format!(
            "size=    {:>4}kB time={} bitrate=  69.9kbits/s speed= 300x",
            seconds * 8,
            clock(seconds)
        )
    }

    /// rcrack result line for a recovered key.
    pub fn rcrack_hit(checksum: &str, key: &str) -> String {
        format!("{}  {}  hex:{}", checksum, key, key)
    }

    /// rcrack result line when the table does not hold the checksum.
    pub fn rcrack_miss(checksum: &str) -> String {
        format!("{}  <notfound>  hex:<notfound>", checksum)
    }

    /// AtomicParsley progress bar line.
    pub fn tagging_progress(percent: u8) -> String {
        let bar = "=".repeat(usize::from(percent / 5));
        format!("Progress: {:<21} {}% |", format!("{}>", bar), percent)
    }

}
