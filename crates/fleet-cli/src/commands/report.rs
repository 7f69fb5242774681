//! Report rendering for allocated periods.
//!
//! Renders the company summary, motorist consolidation, shift totals and
//! everything that was left out (unassigned vehicle-days, excluded records,
//! failed groups) as human-readable text or JSON.

use std::fmt::Write;

use anyhow::Result;
use fleet_core::distribute::round_to;
use fleet_core::normalize::{DetectedFormat, ExcludedRecord};
use fleet_core::reconcile::DriverShare;
use fleet_core::{PeriodAllocation, PeriodRollup};
use serde::Serialize;

/// Decimal places used for shift proportions.
const PROPORTION_PRECISION: u32 = 4;

/// Everything needed to render one period's report.
#[derive(Debug)]
pub struct ReportData {
    pub allocation: PeriodAllocation,
    pub rollup: PeriodRollup,
    pub excluded: Vec<ExcludedRecord>,
    pub start_format: Option<DetectedFormat>,
    pub end_format: Option<DetectedFormat>,
    pub precision: u32,
}

// ========== Number Formatting ==========

/// Formats an amount with exactly `precision` decimals.
pub fn format_amount(value: f64, precision: u32) -> String {
    format!("{:.*}", precision as usize, round_to(value, precision))
}

fn heading(output: &mut String, title: &str) {
    writeln!(output).unwrap();
    writeln!(output, "{title}").unwrap();
    writeln!(output, "{}", "─".repeat(title.chars().count())).unwrap();
}

// ========== Human-Readable Output ==========

/// Formats the human-readable report output.
pub fn format_report(data: &ReportData) -> String {
    let mut output = String::new();
    let p = data.precision;
    let summary = &data.rollup.summary;

    writeln!(output, "FLEET REPORT: {} {}", summary.company, summary.period).unwrap();

    if data.allocation.vehicle_days.is_empty()
        && data.allocation.unassigned.is_empty()
        && data.allocation.failures.is_empty()
    {
        writeln!(output).unwrap();
        writeln!(output, "No work records or vehicle totals in this period.").unwrap();
        if !data.excluded.is_empty() {
            writeln!(output, "{} work record(s) could not be read.", data.excluded.len()).unwrap();
        }
        return output;
    }

    heading(&mut output, "SUMMARY");
    writeln!(output, "{:<15}{:>12}", "Distance:", format_amount(summary.totals.distance, p)).unwrap();
    writeln!(output, "{:<15}{:>12}", "Fuel:", format_amount(summary.totals.fuel, p)).unwrap();
    writeln!(output, "{:<15}{:>12}", "Distance/fuel:", format_amount(summary.efficiency, p)).unwrap();
    writeln!(output, "{:<15}{:>12}", "Motorists:", summary.motorists).unwrap();
    writeln!(output, "{:<15}{:>12}", "Vehicle-days:", summary.vehicle_days).unwrap();

    heading(&mut output, "MOTORISTS");
    writeln!(
        output,
        "{:<10}{:>12}{:>10}{:>6}{:>10}{:>11}{:>12}{:>12}",
        "Driver", "Distance", "Fuel", "Days", "Per day", "Dist/fuel", "Period dist", "Period fuel"
    )
    .unwrap();
    for motorist in &data.rollup.motorists {
        let (period_distance, period_fuel) = motorist.period_share.map_or_else(
            || ("-".to_string(), "-".to_string()),
            |share| (format_amount(share.distance, p), format_amount(share.fuel, p)),
        );
        writeln!(
            output,
            "{:<10}{:>12}{:>10}{:>6}{:>10}{:>11}{:>12}{:>12}",
            motorist.driver_id.as_str(),
            format_amount(motorist.totals.distance, p),
            format_amount(motorist.totals.fuel, p),
            motorist.days_worked,
            format_amount(motorist.average_distance_per_day, p),
            format_amount(motorist.efficiency, p),
            period_distance,
            period_fuel,
        )
        .unwrap();
    }

    heading(&mut output, "MOST DRIVEN");
    writeln!(output, "{:<10}{:<12}{:<12}{:>12}", "Driver", "Shift", "Vehicle", "Distance").unwrap();
    for motorist in &data.rollup.motorists {
        let shift = motorist.top_shift.as_ref().map_or("-", |top| top.name.as_str());
        let (vehicle, distance) = motorist.top_vehicle.as_ref().map_or_else(
            || ("-", "-".to_string()),
            |top| (top.name.as_str(), format_amount(top.distance, p)),
        );
        writeln!(
            output,
            "{:<10}{:<12}{:<12}{:>12}",
            motorist.driver_id.as_str(),
            shift,
            vehicle,
            distance
        )
        .unwrap();
    }

    heading(&mut output, "SHIFTS");
    writeln!(
        output,
        "{:<12}{:<14}{:>8}{:>12}{:>10}{:>11}",
        "Shift", "Hours", "Minutes", "Distance", "Fuel", "Dist/fuel"
    )
    .unwrap();
    for shift in &data.rollup.shifts {
        writeln!(
            output,
            "{:<12}{:<14}{:>8.0}{:>12}{:>10}{:>11}",
            shift.name,
            shift.hours,
            shift.minutes,
            format_amount(shift.totals.distance, p),
            format_amount(shift.totals.fuel, p),
            format_amount(shift.efficiency, p),
        )
        .unwrap();
    }

    if !data.allocation.unassigned.is_empty() {
        heading(&mut output, "UNASSIGNED VEHICLE-DAYS");
        for row in &data.allocation.unassigned {
            writeln!(
                output,
                "  {} on {}: {} distance, {} fuel",
                row.vehicle_id,
                row.calendar_day.format("%d/%m/%Y"),
                format_amount(row.total_distance, p),
                format_amount(row.total_fuel_volume, p),
            )
            .unwrap();
        }
    }

    if !data.excluded.is_empty() {
        heading(&mut output, "EXCLUDED RECORDS");
        for record in &data.excluded {
            writeln!(
                output,
                "  record {}: driver {}, vehicle {}, day {}: {}",
                record.index, record.driver_id, record.vehicle_id, record.day, record.error
            )
            .unwrap();
        }
    }

    if !data.allocation.failures.is_empty() {
        heading(&mut output, "FAILED GROUPS");
        for failure in &data.allocation.failures {
            writeln!(output, "  {}: {}", failure.key, failure.error).unwrap();
        }
    }

    output
}

// ========== JSON Output ==========

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub company: String,
    pub period: String,
    pub precision: u32,
    pub formats: JsonFormats,
    pub summary: JsonSummary,
    pub motorists: Vec<JsonMotorist>,
    pub shifts: Vec<JsonShift>,
    pub work_shifts: Vec<JsonWorkShift>,
    pub unassigned: Vec<JsonVehicleDay>,
    pub excluded: Vec<JsonExcluded>,
    pub failures: Vec<JsonFailure>,
}

#[derive(Debug, Serialize)]
pub struct JsonFormats {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JsonSummary {
    pub distance: f64,
    pub fuel: f64,
    pub distance_per_fuel: f64,
    pub motorists: usize,
    pub vehicle_days: usize,
    pub unassigned_distance: f64,
    pub unassigned_fuel: f64,
}

#[derive(Debug, Serialize)]
pub struct JsonMotorist {
    pub driver_id: String,
    pub distance: f64,
    pub fuel: f64,
    pub days_worked: usize,
    pub average_distance_per_day: f64,
    pub distance_per_fuel: f64,
    pub period_distance: Option<f64>,
    pub period_fuel: Option<f64>,
    pub top_shift: Option<String>,
    pub top_shift_distance: Option<f64>,
    pub top_vehicle: Option<String>,
    pub top_vehicle_distance: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct JsonShift {
    pub name: String,
    pub hours: String,
    pub minutes: f64,
    pub distance: f64,
    pub fuel: f64,
    pub distance_per_fuel: f64,
}

#[derive(Debug, Serialize)]
pub struct JsonWorkShift {
    pub driver_id: String,
    pub vehicle_id: String,
    pub day: String,
    pub start: String,
    pub end: String,
    pub minutes: f64,
    pub distance: f64,
    pub fuel: f64,
    pub buckets: Vec<JsonBucketShare>,
}

#[derive(Debug, Serialize)]
pub struct JsonBucketShare {
    pub bucket: String,
    pub worked_from: Option<String>,
    pub worked_to: Option<String>,
    pub minutes: f64,
    pub proportion: f64,
    pub distance: f64,
    pub fuel: f64,
    pub distance_per_fuel: f64,
}

#[derive(Debug, Serialize)]
pub struct JsonVehicleDay {
    pub vehicle_id: String,
    pub day: String,
    pub distance: f64,
    pub fuel: f64,
}

#[derive(Debug, Serialize)]
pub struct JsonExcluded {
    pub index: usize,
    pub driver_id: String,
    pub vehicle_id: String,
    pub day: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct JsonFailure {
    pub group: String,
    pub error: String,
}

fn json_work_shift(driver: &DriverShare, p: u32) -> JsonWorkShift {
    let interval = &driver.interval;
    JsonWorkShift {
        driver_id: interval.driver_id.to_string(),
        vehicle_id: interval.vehicle_id.to_string(),
        day: interval.calendar_day.format("%Y-%m-%d").to_string(),
        start: interval.render_start(),
        end: interval.render_end(),
        minutes: round_to(driver.minutes, p),
        distance: round_to(driver.share.distance, p),
        fuel: round_to(driver.share.fuel, p),
        buckets: driver
            .shifts
            .iter()
            .map(|shift| JsonBucketShare {
                bucket: shift.bucket.clone(),
                worked_from: shift.first_start.map(|t| t.format("%H:%M").to_string()),
                worked_to: shift.last_end.map(|t| t.format("%H:%M").to_string()),
                minutes: round_to(shift.minutes, p),
                proportion: if driver.minutes > 0.0 {
                    round_to(shift.minutes / driver.minutes, PROPORTION_PRECISION)
                } else {
                    1.0
                },
                distance: round_to(shift.share.distance, p),
                fuel: round_to(shift.share.fuel, p),
                distance_per_fuel: round_to(shift.share.efficiency(), p),
            })
            .collect(),
    }
}

/// Formats report data as JSON.
pub fn format_report_json(data: &ReportData) -> Result<String> {
    let p = data.precision;
    let summary = &data.rollup.summary;

    let report = JsonReport {
        company: summary.company.to_string(),
        period: summary.period.to_string(),
        precision: p,
        formats: JsonFormats {
            start: data.start_format.map(|f| f.to_string()),
            end: data.end_format.map(|f| f.to_string()),
        },
        summary: JsonSummary {
            distance: round_to(summary.totals.distance, p),
            fuel: round_to(summary.totals.fuel, p),
            distance_per_fuel: round_to(summary.efficiency, p),
            motorists: summary.motorists,
            vehicle_days: summary.vehicle_days,
            unassigned_distance: round_to(summary.unassigned.distance, p),
            unassigned_fuel: round_to(summary.unassigned.fuel, p),
        },
        motorists: data
            .rollup
            .motorists
            .iter()
            .map(|m| JsonMotorist {
                driver_id: m.driver_id.to_string(),
                distance: round_to(m.totals.distance, p),
                fuel: round_to(m.totals.fuel, p),
                days_worked: m.days_worked,
                average_distance_per_day: round_to(m.average_distance_per_day, p),
                distance_per_fuel: round_to(m.efficiency, p),
                period_distance: m.period_share.map(|s| round_to(s.distance, p)),
                period_fuel: m.period_share.map(|s| round_to(s.fuel, p)),
                top_shift: m.top_shift.as_ref().map(|t| t.name.clone()),
                top_shift_distance: m.top_shift.as_ref().map(|t| round_to(t.distance, p)),
                top_vehicle: m.top_vehicle.as_ref().map(|t| t.name.clone()),
                top_vehicle_distance: m.top_vehicle.as_ref().map(|t| round_to(t.distance, p)),
            })
            .collect(),
        shifts: data
            .rollup
            .shifts
            .iter()
            .map(|s| JsonShift {
                name: s.name.clone(),
                hours: s.hours.clone(),
                minutes: round_to(s.minutes, p),
                distance: round_to(s.totals.distance, p),
                fuel: round_to(s.totals.fuel, p),
                distance_per_fuel: round_to(s.efficiency, p),
            })
            .collect(),
        work_shifts: data
            .allocation
            .driver_shares()
            .map(|driver| json_work_shift(driver, p))
            .collect(),
        unassigned: data
            .allocation
            .unassigned
            .iter()
            .map(|row| JsonVehicleDay {
                vehicle_id: row.vehicle_id.to_string(),
                day: row.calendar_day.format("%Y-%m-%d").to_string(),
                distance: round_to(row.total_distance, p),
                fuel: round_to(row.total_fuel_volume, p),
            })
            .collect(),
        excluded: data
            .excluded
            .iter()
            .map(|r| JsonExcluded {
                index: r.index,
                driver_id: r.driver_id.clone(),
                vehicle_id: r.vehicle_id.clone(),
                day: r.day.clone(),
                error: r.error.to_string(),
            })
            .collect(),
        failures: data
            .allocation
            .failures
            .iter()
            .map(|f| JsonFailure {
                group: f.key.to_string(),
                error: f.error.to_string(),
            })
            .collect(),
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use fleet_core::{
        AllocationConfig, CompanyId, DriverId, PeriodInput, ReportPeriod, VehicleDayTotals,
        VehicleId, WorkInterval, allocate_period, rollup,
    };
    use insta::assert_snapshot;

    use super::*;

    fn at(d: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, d)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn work(driver: &str, vehicle: &str, start: NaiveDateTime, end: NaiveDateTime) -> WorkInterval {
        WorkInterval::new(
            DriverId::new(driver).unwrap(),
            VehicleId::new(vehicle).unwrap(),
            start.date(),
            start,
            end,
        )
    }

    fn totals(vehicle: &str, d: u32, distance: f64, fuel: f64) -> VehicleDayTotals {
        VehicleDayTotals {
            vehicle_id: VehicleId::new(vehicle).unwrap(),
            calendar_day: NaiveDate::from_ymd_opt(2025, 1, d).unwrap(),
            total_distance: distance,
            total_fuel_volume: fuel,
        }
    }

    fn report_data(intervals: Vec<WorkInterval>, rows: Vec<VehicleDayTotals>) -> ReportData {
        let config = AllocationConfig::default();
        let input = PeriodInput {
            company: CompanyId::new("ACME").unwrap(),
            period: ReportPeriod::new(2025, 1).unwrap(),
            intervals,
            totals: rows,
        };
        let allocation = allocate_period(&input, &config);
        let rollup = rollup(&allocation, &config).unwrap();
        ReportData {
            allocation,
            rollup,
            excluded: Vec::new(),
            start_format: None,
            end_format: None,
            precision: config.precision,
        }
    }

    fn shared_vehicle_day() -> ReportData {
        report_data(
            vec![
                work("000001", "V1", at(15, 8, 0), at(15, 11, 20)),
                work("000002", "V1", at(15, 13, 0), at(15, 14, 40)),
            ],
            vec![totals("V1", 15, 900.0, 90.0), totals("V2", 16, 300.0, 30.0)],
        )
    }

    // ========== Number Formatting Tests ==========

    #[test]
    fn test_format_amount_pads_decimals() {
        assert_eq!(format_amount(600.0, 2), "600.00");
        assert_eq!(format_amount(33.336, 2), "33.34");
        assert_eq!(format_amount(7.25, 0), "7");
        assert_eq!(format_amount(1.5, 3), "1.500");
    }

    // ========== Integration Tests (Snapshot) ==========

    #[test]
    fn test_report_empty_period() {
        let data = report_data(vec![], vec![]);
        let output = format_report(&data);
        assert_snapshot!(output, @r"
        FLEET REPORT: ACME 2025-01

        No work records or vehicle totals in this period.
        ");
    }

    #[test]
    fn test_report_shared_vehicle_day() {
        let data = shared_vehicle_day();
        let output = format_report(&data);
        assert_snapshot!(output, @r"
        FLEET REPORT: ACME 2025-01

        SUMMARY
        ───────
        Distance:           1200.00
        Fuel:                120.00
        Distance/fuel:        10.00
        Motorists:                2
        Vehicle-days:             1

        MOTORISTS
        ─────────
        Driver        Distance      Fuel  Days   Per day  Dist/fuel Period dist Period fuel
        000001          600.00     60.00     1    600.00      10.00      800.00       80.00
        000002          300.00     30.00     1    300.00      10.00      400.00       40.00

        MOST DRIVEN
        ───────────
        Driver    Shift       Vehicle         Distance
        000001    Manhã       V1                600.00
        000002    Intervalo   V1                300.00

        SHIFTS
        ──────
        Shift       Hours          Minutes    Distance      Fuel  Dist/fuel
        Madrugada   00:00-05:59          0        0.00      0.00       0.00
        Manhã       06:00-11:59        200      600.00     60.00      10.00
        Intervalo   12:00-13:59         60      180.00     18.00      10.00
        Tarde       14:00-19:59         40      120.00     12.00      10.00
        Noite       20:00-23:59          0        0.00      0.00       0.00

        UNASSIGNED VEHICLE-DAYS
        ───────────────────────
          V2 on 16/01/2025: 300.00 distance, 30.00 fuel
        ");
    }

    #[test]
    fn test_report_lists_failures() {
        let data = report_data(
            vec![work("000001", "V1", at(15, 8, 0), at(15, 9, 0))],
            vec![totals("V1", 15, -10.0, 1.0)],
        );
        let output = format_report(&data);
        assert!(output.contains("FAILED GROUPS"));
        assert!(output.contains("  vehicle V1 on 2025-01-15: total must be non-negative, got -10"));
        assert!(output.contains("  company ACME for 2025-01: 1 upstream group(s) failed"));
    }

    #[test]
    fn test_report_json_output() {
        let data = shared_vehicle_day();
        let output = format_report_json(&data).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(json["company"], "ACME");
        assert_eq!(json["period"], "2025-01");
        assert_eq!(json["summary"]["distance"], 1200.0);
        assert_eq!(json["summary"]["unassigned_fuel"], 30.0);
        assert_eq!(json["motorists"][0]["driver_id"], "000001");
        assert_eq!(json["motorists"][0]["period_distance"], 800.0);
        assert_eq!(json["motorists"][0]["top_shift"], "Manhã");
        assert_eq!(json["motorists"][0]["top_shift_distance"], 600.0);
        assert_eq!(json["motorists"][1]["top_shift"], "Intervalo");
        assert_eq!(json["motorists"][1]["top_vehicle"], "V1");
        assert_eq!(json["motorists"][1]["top_vehicle_distance"], 300.0);
        assert_eq!(json["shifts"][1]["name"], "Manhã");
        assert_eq!(json["unassigned"][0]["day"], "2025-01-16");
        assert_eq!(json["failures"].as_array().unwrap().len(), 0);

        let afternoon = &json["work_shifts"][1];
        assert_eq!(afternoon["start"], "15/01/2025 13:00:00");
        assert_eq!(afternoon["buckets"][0]["bucket"], "Intervalo");
        assert_eq!(afternoon["buckets"][0]["worked_from"], "13:00");
        assert_eq!(afternoon["buckets"][0]["proportion"], 0.6);
        assert_eq!(afternoon["buckets"][1]["worked_to"], "14:40");
        assert_eq!(afternoon["buckets"][1]["distance"], 120.0);
    }
}
