//! Output formatting
//!
//! Results go to stdout one per line; status messages go to stderr.

use crate::cli::args::VerbosityLevel;
use crate::core::video_info::Format;
use crate::platform::cipher::CipherEvent;
use std::time::Duration;

/// Output formatter for ryt-cipher
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("ℹ️  {}", message);
        }
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("✅ {}", message);
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("⚠️  {}", message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("❌ {}", message);
    }

    /// Print debug message
    pub fn debug(&self, message: &str) {
        if self.verbosity == VerbosityLevel::Verbose {
            eprintln!("🐛 {}", message);
        }
    }

    /// Print one deciphered token or URL
    pub fn print_result(&self, value: &str) {
        println!("{}", value);
    }

    /// Print a format's final URL, with details in verbose mode
    pub fn print_format(&self, format: &Format, video_id: &str) {
        println!("{}", format_line(format));
        if self.verbosity == VerbosityLevel::Verbose && !video_id.is_empty() {
            eprintln!("  📋 {}", format.default_filename(video_id));
        }
    }

    /// Print the recorded decision trail
    pub fn print_trace(&self, events: &[CipherEvent]) {
        for line in trace_lines(events) {
            eprintln!("{}", line);
        }
    }

    /// Print a run summary
    pub fn print_summary(&self, deciphered: usize, failed: usize, duration: Duration) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }
        if failed == 0 {
            self.success(&format!(
                "Deciphered {} in {}",
                plural(deciphered, "signature"),
                format_duration(duration)
            ));
        } else {
            self.warning(&format!(
                "Deciphered {}, {} failed ({})",
                plural(deciphered, "signature"),
                failed,
                format_duration(duration)
            ));
        }
    }
}

/// `itag=18 <url>`
fn format_line(format: &Format) -> String {
    format!("itag={} {}", format.itag, format.url)
}

/// Numbered trace lines for a list of events
fn trace_lines(events: &[CipherEvent]) -> Vec<String> {
    events
        .iter()
        .enumerate()
        .map(|(i, event)| format!("🔎 {:>3}. {}", i + 1, event))
        .collect()
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// Format duration as human-readable string
fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        return format!("{}ms", millis);
    }

    let total_seconds = duration.as_secs();
    if total_seconds < 60 {
        format!("{}s", total_seconds)
    } else {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        if seconds == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m {}s", minutes, seconds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::cipher::{ExtractionStage, OpKind};

    #[test]
    fn test_output_formatter_verbosity_levels() {
        let formatter = OutputFormatter::new(VerbosityLevel::Normal);
        assert_eq!(formatter.verbosity(), VerbosityLevel::Normal);

        let formatter = OutputFormatter::new(VerbosityLevel::Quiet);
        assert_eq!(formatter.verbosity(), VerbosityLevel::Quiet);
    }

    #[test]
    fn test_format_line() {
        let format = Format {
            itag: 18,
            url: "https://r1.example/v?sig=abc".to_string(),
            ..Format::default()
        };
        assert_eq!(format_line(&format), "itag=18 https://r1.example/v?sig=abc");
    }

    #[test]
    fn test_trace_lines() {
        let events = vec![
            CipherEvent::PatternTried {
                stage: ExtractionStage::EntryName,
                index: 0,
                name: "set-encode-cs".to_string(),
                matched: false,
            },
            CipherEvent::Classified {
                helper: "wR".to_string(),
                kind: Some(OpKind::Reverse),
            },
        ];
        let lines = trace_lines(&events);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("🔎   1. "));
        assert!(lines[1].contains("wR"));
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "signature"), "1 signature");
        assert_eq!(plural(0, "signature"), "0 signatures");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
    }
}
