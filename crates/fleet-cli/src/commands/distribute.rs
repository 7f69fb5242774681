//! Distribute command: runs the proportional distributor directly.

use std::fmt::Write;

use anyhow::{Context, Result};
use fleet_core::distribute;
use fleet_core::distribute::Share;

use super::report::format_amount;

/// Parses `ID=WEIGHT` member arguments, keeping their order.
pub fn parse_members(args: &[String]) -> Result<Vec<(String, f64)>> {
    args.iter()
        .map(|arg| {
            let (id, weight) = arg
                .split_once('=')
                .with_context(|| format!("expected ID=WEIGHT, got {arg:?}"))?;
            let id = id.trim();
            if id.is_empty() {
                anyhow::bail!("member ID cannot be empty in {arg:?}");
            }
            let weight: f64 = weight
                .trim()
                .parse()
                .with_context(|| format!("invalid weight in {arg:?}"))?;
            Ok((id.to_string(), weight))
        })
        .collect()
}

pub fn format_shares(shares: &[Share<String>], total: f64, precision: u32) -> String {
    let width = shares.iter().map(|s| s.member.chars().count()).max().unwrap_or(0).max(5);
    let mut output = String::new();
    for share in shares {
        writeln!(output, "{:<width$}  {}", share.member, format_amount(share.amount, precision)).unwrap();
    }
    writeln!(output, "{:<width$}  {}", "total", format_amount(total, precision)).unwrap();
    output
}

/// Runs the distribute command.
pub fn run(total: f64, precision: u32, members: &[String]) -> Result<()> {
    let members = parse_members(members)?;
    let shares = distribute(total, &members, precision).context("distribution failed")?;
    print!("{}", format_shares(&shares, total, precision));
    Ok(())
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_members() {
        let members = parse_members(&args(&["004521=480", " B = 45.5 "])).unwrap();
        assert_eq!(members, [("004521".to_string(), 480.0), ("B".to_string(), 45.5)]);
    }

    #[test]
    fn test_parse_members_rejects_malformed() {
        assert!(parse_members(&args(&["A"])).is_err());
        assert!(parse_members(&args(&["=3"])).is_err());
        assert!(parse_members(&args(&["A=lots"])).is_err());
    }

    #[test]
    fn test_format_residual_split() {
        let members = parse_members(&args(&["A=1", "B=1", "C=1"])).unwrap();
        let shares = distribute(100.0, &members, 2).unwrap();
        assert_snapshot!(format_shares(&shares, 100.0, 2), @r"
        A      33.34
        B      33.33
        C      33.33
        total  100.00
        ");
    }
}
