//! Shifts command: shows the configured shift buckets.

use std::fmt::Write;

use anyhow::Result;
use fleet_core::ShiftSchedule;

/// Formats the schedule as a table, one row per bucket.
pub fn format_shifts(schedule: &ShiftSchedule) -> String {
    let mut output = String::new();
    writeln!(output, "SHIFTS").unwrap();
    writeln!(output, "──────").unwrap();
    for bucket in schedule.buckets() {
        writeln!(output, "{:<12}{}", bucket.name, bucket.label()).unwrap();
    }
    output
}

/// Runs the shifts command.
pub fn run(schedule: &ShiftSchedule, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(schedule)?);
    } else {
        print!("{}", format_shifts(schedule));
    }
    Ok(())
}
