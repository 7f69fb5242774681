//! Normalize command: turns one raw start/end pair into a canonical interval.

use anyhow::{Context, Result};
use fleet_core::normalize::{Span, parse_calendar_day};
use fleet_core::record::RENDER_FORMAT;
use fleet_core::{NormalizerConfig, normalize_with};

/// Parses and resolves a single record's times.
pub fn normalize_pair(day: &str, start: &str, end: &str, config: &NormalizerConfig) -> Result<Span> {
    let day = parse_calendar_day(day)?;
    Ok(normalize_with(start, end, day, config)?)
}

#[allow(clippy::cast_precision_loss)]
pub fn format_span(span: &Span) -> String {
    let minutes = (span.end - span.start).num_seconds() as f64 / 60.0;
    format!(
        "start:   {}\nend:     {}\nminutes: {minutes}\n",
        span.start.format(RENDER_FORMAT),
        span.end.format(RENDER_FORMAT),
    )
}

/// Runs the normalize command.
pub fn run(day: &str, start: &str, end: &str, config: &NormalizerConfig) -> Result<()> {
    let span = normalize_pair(day, start, end, config).context("could not normalize record")?;
    print!("{}", format_span(&span));
    Ok(())
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    #[test]
    fn test_overnight_pair() {
        let span = normalize_pair("15/01/2025", "23:30", "00:15", &NormalizerConfig::default()).unwrap();
        assert_snapshot!(format_span(&span), @r"
        start:   15/01/2025 23:30:00
        end:     16/01/2025 00:15:00
        minutes: 45
        ");
    }

    #[test]
    fn test_missing_time_is_an_error() {
        let err = normalize_pair("15/01/2025", "nan", "10:00", &NormalizerConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "start time is missing");
    }

    #[test]
    fn test_configured_sentinel_is_missing() {
        let config = NormalizerConfig {
            sentinels: vec!["folga".to_string()],
            ..NormalizerConfig::default()
        };
        let err = normalize_pair("15/01/2025", "08:00", "folga", &config).unwrap_err();
        assert_eq!(err.to_string(), "end time is missing");
    }

    #[test]
    fn test_bad_day_is_an_error() {
        assert!(normalize_pair("tomorrow", "08:00", "10:00", &NormalizerConfig::default()).is_err());
    }
}
