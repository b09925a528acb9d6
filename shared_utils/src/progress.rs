//! Progress Bar Module
//!
//! `indicatif` bar factory shared by the batch tools. Quiet mode hides every
//! bar created afterwards, which keeps scripted runs free of terminal noise.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub const PROGRESS_CHARS: &str = "█▓░";
pub const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
pub const BATCH_TEMPLATE: &str = "{spinner:.green} {prefix:.cyan.bold} ▕{bar:35.green/black}▏ {percent:>3}% • {pos}/{len} • ⏱️ {elapsed_precise} (ETA: {eta}) • {msg}";

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_quiet_mode(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::Relaxed);
}

pub fn is_quiet_mode() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

pub fn create_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);

    if is_quiet_mode() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return pb;
    }

    match ProgressStyle::default_bar().template(BATCH_TEMPLATE) {
        Ok(style) => pb.set_style(
            style
                .progress_chars(PROGRESS_CHARS)
                .tick_chars(SPINNER_CHARS),
        ),
        Err(e) => tracing::warn!(error = %e, "Invalid progress bar template, using default style"),
    }
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(61)), "1m 1s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn test_bar_length_matches_total() {
        let pb = create_progress_bar(42, "Converting");
        assert_eq!(pb.length(), Some(42));
        pb.inc(2);
        assert_eq!(pb.position(), 2);
        pb.finish_and_clear();
    }
}
