//! Allocate command: runs the full pipeline on one company-period document.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use fleet_core::normalize::parse_calendar_day;
use fleet_core::{
    CompanyId, PeriodInput, RawWorkRecord, ReportPeriod, VehicleDayTotals, VehicleId,
    allocate_period, normalize_records, rollup,
};
use serde::Deserialize;

use super::report::{ReportData, format_report, format_report_json};
use crate::Config;

/// One company's extracted rows for one period.
#[derive(Debug, Deserialize)]
pub struct PeriodDocument {
    pub company: CompanyId,
    pub period: ReportPeriod,

    #[serde(default)]
    pub work_records: Vec<RawWorkRecord>,

    #[serde(default)]
    pub vehicle_totals: Vec<TotalsRow>,
}

/// A vehicle-day totals row as extracted from the fuel sheet.
#[derive(Debug, Deserialize)]
pub struct TotalsRow {
    pub vehicle_id: String,
    pub day: String,
    pub distance: f64,
    pub fuel: f64,
}

impl PeriodDocument {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid period document")
    }

    /// Typed vehicle totals; a malformed row rejects the whole document.
    pub fn vehicle_totals(&self) -> Result<Vec<VehicleDayTotals>> {
        self.vehicle_totals
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let vehicle_id = VehicleId::new(row.vehicle_id.trim())
                    .with_context(|| format!("vehicle totals row {index}"))?;
                let calendar_day = parse_calendar_day(&row.day)
                    .with_context(|| format!("vehicle totals row {index}"))?;
                Ok(VehicleDayTotals {
                    vehicle_id,
                    calendar_day,
                    total_distance: row.distance,
                    total_fuel_volume: row.fuel,
                })
            })
            .collect()
    }
}

/// Normalizes, allocates and rolls up a document.
pub fn build_report(document: &PeriodDocument, config: &Config) -> Result<ReportData> {
    let batch = normalize_records(&document.work_records, &config.normalizer());

    let outside = batch
        .intervals
        .iter()
        .filter(|i| !document.period.contains(i.calendar_day))
        .count();
    if outside > 0 {
        tracing::warn!(
            period = %document.period,
            records = outside,
            "work records fall outside the report period"
        );
    }

    let input = PeriodInput {
        company: document.company.clone(),
        period: document.period,
        intervals: batch.intervals,
        totals: document.vehicle_totals()?,
    };

    let allocation_config = config.allocation();
    let allocation = allocate_period(&input, &allocation_config);
    let rollup = rollup(&allocation, &allocation_config).context("period rollups do not reconcile")?;

    Ok(ReportData {
        allocation,
        rollup,
        excluded: batch.excluded,
        start_format: batch.start_format,
        end_format: batch.end_format,
        precision: config.precision,
    })
}

/// Runs the allocate command.
pub fn run(path: &Path, json: bool, strict: bool, config: &Config) -> Result<()> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let document = PeriodDocument::parse(&content)?;
    let data = build_report(&document, config)?;

    if json {
        let output = format_report_json(&data)?;
        println!("{output}");
    } else {
        let output = format_report(&data);
        print!("{output}");
    }

    let failed = data.allocation.failures.len();
    if strict && failed > 0 {
        anyhow::bail!("{failed} group(s) failed to allocate");
    }

    Ok(())
}
