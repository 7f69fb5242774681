//! Proportional distribution with residual correction.
//!
//! # Algorithm Summary
//!
//! 1. Validate the total, the weights and the precision
//! 2. Split the total by weight (equally when every weight is zero)
//! 3. Round each share to the working precision
//! 4. Push the rounding residual onto the largest share
//! 5. Verify the shares add back up to the total

use serde::Serialize;

use crate::error::{AllocationError, DistributionError};
use crate::reconcile::Reconciler;
use crate::types::{GroupKey, Quantities, Quantity};

/// Decimal places used when none are configured.
pub const DEFAULT_PRECISION: u32 = 2;

/// Largest supported precision; `10^9` still fits the rounding scale exactly.
pub const MAX_PRECISION: u32 = 9;

fn scale(precision: u32) -> f64 {
    f64::from(10_u32.pow(precision.min(MAX_PRECISION)))
}

/// The smallest visible amount at `precision`, `10^-precision`.
pub fn tolerance(precision: u32) -> f64 {
    1.0 / scale(precision)
}

/// Rounds half away from zero to `precision` decimal places.
///
/// Values too large to scale have no fractional digits left and come back
/// unchanged.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let scale = scale(precision);
    let scaled = value * scale;
    if scaled.is_finite() {
        scaled.round() / scale
    } else {
        value
    }
}

/// One member's portion of a single total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share<K> {
    pub member: K,
    pub amount: f64,
}

/// Distributes `total` across weighted members.
///
/// The returned shares are in input order, rounded to `precision` decimal
/// places, and add up to `total` within `10^-precision`.
///
/// # Example
///
/// ```
/// use fleet_core::distribute::distribute;
///
/// let shares = distribute(100.0, &[("a", 1.0), ("b", 1.0), ("c", 1.0)], 2).unwrap();
/// let amounts: Vec<f64> = shares.iter().map(|s| s.amount).collect();
/// assert_eq!(amounts, [33.34, 33.33, 33.33]);
/// ```
pub fn distribute<K: Clone>(
    total: f64,
    members: &[(K, f64)],
    precision: u32,
) -> Result<Vec<Share<K>>, DistributionError> {
    distribute_in(&GroupKey::Unkeyed, None, total, members, precision)
}

/// Like [`distribute`], naming the group and quantity in any reconciliation
/// error.
pub fn distribute_in<K: Clone>(
    group: &GroupKey,
    quantity: Option<Quantity>,
    total: f64,
    members: &[(K, f64)],
    precision: u32,
) -> Result<Vec<Share<K>>, DistributionError> {
    validate(total, members, precision)?;

    let weights: Vec<f64> = members.iter().map(|(_, weight)| *weight).collect();
    let amounts = split(total, &weights, precision);

    Reconciler::new(precision).check(group, quantity, total, amounts.iter().copied())?;

    Ok(members
        .iter()
        .zip(amounts)
        .map(|((member, _), amount)| Share {
            member: member.clone(),
            amount,
        })
        .collect())
}

fn validate<K>(total: f64, members: &[(K, f64)], precision: u32) -> Result<(), AllocationError> {
    if precision > MAX_PRECISION {
        return Err(AllocationError::PrecisionOutOfRange {
            precision,
            max: MAX_PRECISION,
        });
    }
    if !total.is_finite() {
        return Err(AllocationError::NonFiniteTotal { total });
    }
    if total < 0.0 {
        return Err(AllocationError::NegativeTotal { total });
    }
    if let Some((index, &(_, weight))) = members
        .iter()
        .enumerate()
        .find(|(_, (_, weight))| !weight.is_finite() || *weight < 0.0)
    {
        return Err(AllocationError::InvalidWeight { index, weight });
    }
    if members.is_empty() && total != 0.0 {
        return Err(AllocationError::EmptyGroup { total });
    }
    Ok(())
}

/// Rounded shares with the residual folded into the largest one.
#[allow(clippy::cast_precision_loss)]
fn split(total: f64, weights: &[f64], precision: u32) -> Vec<f64> {
    // Relative to the largest weight, so neither the sum nor the product overflows.
    let largest_weight = weights.iter().copied().fold(0.0, f64::max);

    let raw: Vec<f64> = if largest_weight > 0.0 {
        let relative: Vec<f64> = weights.iter().map(|w| w / largest_weight).collect();
        let relative_sum: f64 = relative.iter().sum();
        relative.iter().map(|r| total * (r / relative_sum)).collect()
    } else if total == 0.0 {
        vec![0.0; weights.len()]
    } else {
        tracing::debug!(total, members = weights.len(), "no weight to split by, splitting equally");
        vec![total / weights.len() as f64; weights.len()]
    };

    let mut shares: Vec<f64> = raw.iter().map(|&r| round_to(r, precision)).collect();

    let residual = total - shares.iter().sum::<f64>();
    if round_to(residual, precision) != 0.0 {
        let mut largest = 0;
        for (index, &share) in shares.iter().enumerate() {
            if share > shares[largest] {
                largest = index;
            }
        }
        shares[largest] = round_to(shares[largest] + residual, precision);
    }

    shares
}

/// A set of members sharing both quantities of one group.
#[derive(Debug, Clone)]
pub struct AllocationGroup<K> {
    pub key: GroupKey,

    /// Members and their weights (worked minutes), in output order.
    pub members: Vec<(K, f64)>,

    pub totals: Quantities,
}

/// A member's distance and fuel portions of its group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributedShare<K> {
    pub member_id: K,
    pub distance_share: f64,
    pub fuel_share: f64,
}

impl<K> DistributedShare<K> {
    pub const fn quantities(&self) -> Quantities {
        Quantities::new(self.distance_share, self.fuel_share)
    }
}

impl<K: Clone> AllocationGroup<K> {
    pub const fn new(key: GroupKey, members: Vec<(K, f64)>, totals: Quantities) -> Self {
        Self {
            key,
            members,
            totals,
        }
    }

    /// Distributes distance and fuel by the same weights.
    pub fn distribute(&self, precision: u32) -> Result<Vec<DistributedShare<K>>, DistributionError> {
        let distance = distribute_in(
            &self.key,
            Some(Quantity::Distance),
            self.totals.distance,
            &self.members,
            precision,
        )?;
        let fuel = distribute_in(
            &self.key,
            Some(Quantity::Fuel),
            self.totals.fuel,
            &self.members,
            precision,
        )?;

        Ok(distance
            .into_iter()
            .zip(fuel)
            .map(|(d, f)| DistributedShare {
                member_id: d.member,
                distance_share: d.amount,
                fuel_share: f.amount,
            })
            .collect())
    }
}
