//! Progress and ETA accounting for a scan.
//!
//! The same counter shape serves three denominations: bytes for the overall
//! scan, file counts for the per-directory indicator, and chunk counts for
//! the per-file indicator. All accounting is owned by the traversal driver
//! and mutated in place; nothing here is shared across threads.

use std::time::Instant;

/// A counter over a fixed total.
#[derive(Clone, Copy, Debug)]
pub struct Progress {
    /// Total number of units expected.
    pub total: u64,

    /// Units finished so far.
    pub current: u64,
}

impl Progress {
    /// Create a counter over `total` units, starting at zero.
    pub fn new(total: u64) -> Self {
        Self { total, current: 0 }
    }

    /// Counter rendering with the current value right-aligned to the total's
    /// width: `  3/120`.
    pub fn string(&self) -> String {
        let total = self.total.to_string();
        format!("{:>width$}/{total}", self.current, width = total.len())
    }

    /// Percent rendering to three decimal places: ` 80.785%`.
    pub fn percent(&self) -> String {
        let ratio = self.current as f64 / self.total.max(1) as f64;
        format!("{:>7.3}%", ratio * 100.0)
    }
}

/// Remaining-work accounting for the time-remaining estimate.
///
/// `left` is decremented for every byte accounted (hashed or skipped), while
/// `processed` and `time_taken` only grow for bytes that actually went
/// through the hash pipeline, so the estimate reflects real throughput.
#[derive(Clone, Copy, Debug)]
pub struct Eta {
    /// Bytes left to account for.
    pub left: u64,

    /// Bytes processed through hashing.
    pub processed: u64,

    /// Wall seconds spent hashing.
    pub time_taken: f64,
}

impl Eta {
    /// Create remaining-work accounting over `left` bytes.
    pub fn new(left: u64) -> Self {
        Self {
            left,
            processed: 0,
            time_taken: 0.0,
        }
    }

    /// Estimated time remaining: elapsed time per processed byte,
    /// extrapolated over the bytes left.
    pub fn string(&self) -> String {
        let processed = self.processed.max(1);
        time_str_short(self.time_taken / processed as f64 * self.left as f64)
    }
}

/// Total wall time of the run, rendered at exit.
#[derive(Debug)]
pub struct TotalTime {
    start: Instant,
}

impl TotalTime {
    /// Start the clock.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Long-form rendering of the elapsed time.
    pub fn string(&self) -> String {
        time_str(self.start.elapsed().as_secs_f64())
    }
}

/// Long-form time rendering: `0 days 1 hour 2 minutes 3 seconds 45 milliseconds`.
fn time_str(seconds: f64) -> String {
    let ms = (seconds * 1_000.0).round() as u64;
    let (seconds, ms) = (ms / 1_000, ms % 1_000);
    let (minutes, seconds) = (seconds / 60, seconds % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    let (days, hours) = (hours / 24, hours % 24);
    format!(
        "{days} {} {hours} {} {minutes} {} {seconds} {} {ms} {}",
        plural(days, "day"),
        plural(hours, "hour"),
        plural(minutes, "minute"),
        plural(seconds, "second"),
        plural(ms, "millisecond"),
    )
}

/// Short-form time rendering: `01h 02m 03s`, dropping leading zero units.
fn time_str_short(seconds: f64) -> String {
    let seconds = seconds.round() as u64;
    let (minutes, seconds) = (seconds / 60, seconds % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{hours:02}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes:02}m {seconds:02}s")
    } else {
        format!("{seconds:02}s")
    }
}

fn plural(n: u64, word: &str) -> String {
    if n == 1 {
        word.to_owned()
    } else {
        format!("{word}s")
    }
}
