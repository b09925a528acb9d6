//! Report Module
//!
//! End-of-run summary printing for batch operations.

use crate::batch::BatchCounts;
use crate::progress::format_duration;
use console::style;
use std::time::Duration;

/// One-line plain summary, also used as the final tracing event.
pub fn summary_line(counts: &BatchCounts, cancelled: bool) -> String {
    let status = if cancelled { "Cancelled" } else { "Complete" };
    format!(
        "{}: {} succeeded, {} failed (total: {})",
        status, counts.succeeded, counts.failed, counts.total
    )
}

pub fn print_summary_report(
    counts: &BatchCounts,
    duration: Duration,
    operation_name: &str,
    cancelled: bool,
) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  📊 {:<57}║", format!("{} Summary Report", operation_name));
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  📁 Units Processed:    {:>10}                           ║", counts.total);
    println!(
        "║  ✅ Succeeded:          {:>10}                           ║",
        style(counts.succeeded).green()
    );
    println!(
        "║  ❌ Failed:             {:>10}                           ║",
        if counts.failed > 0 {
            style(counts.failed).red()
        } else {
            style(counts.failed)
        }
    );
    println!(
        "║  📈 Success Rate:       {:>9.1}%                           ║",
        counts.success_rate()
    );
    println!(
        "║  ⏱️  Total Time:         {:>10}                           ║",
        format_duration(duration)
    );
    println!("╚══════════════════════════════════════════════════════════════╝");

    if cancelled {
        println!(
            "{}",
            style("⚠️  Run cancelled: units after the cancellation point were not started").yellow()
        );
    }
}
