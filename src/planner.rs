//! Liquidity planning: price-to-bin mapping, deposit ranges, and amount
//! validation.
//!
//! Everything in this module is pure. A price maps to a discrete bin id
//! through `price = (1 + bin_step / 10_000) ^ bin_id`, so the mapping is
//! strictly monotonic in price; the caller picks the rounding direction for
//! the boundary bin. Ranges widen symmetrically for two-sided deposits and
//! away from the active bin for one-sided deposits.

use crate::dlmm::constants::{BASIS_POINT_MAX, MAX_BIN_ID, MIN_BIN_ID};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures for range and amount planning.
///
/// These are rejected synchronously, before any network interaction.
#[derive(Error, Debug, PartialEq)]
pub enum PlanError {
    #[error("price {0} is not a positive finite number")]
    InvalidPrice(f64),

    #[error("bin step must be nonzero")]
    ZeroBinStep,

    #[error("bin id {0} is outside the supported range")]
    BinOutOfRange(i64),

    #[error("range [{min}, {max}] is inverted")]
    InvertedRange { min: i32, max: i32 },

    #[error("both deposit budgets are zero")]
    EmptyBudget,

    #[error("one-sided-{side} strategy requires a zero opposite-side budget (got {amount})")]
    ConflictingOneSidedBudget { side: char, amount: u64 },

    #[error("fee of {fee_bps} bps is not representable for bin step {bin_step}")]
    FeeNotRepresentable { fee_bps: u16, bin_step: u16 },
}

/// Rounding direction when a price falls between two bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

/// Curve shape of a deposit distribution. The shape itself is interpreted
/// on-chain; the client only forwards it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyShape {
    Spot,
    Curve,
    BidAsk,
}

/// Which side(s) of the active bin a deposit funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyBalance {
    Balanced,
    Imbalanced,
    OneSidedX,
    OneSidedY,
}

/// Full strategy selection for a liquidity deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyKind {
    pub shape: StrategyShape,
    pub balance: StrategyBalance,
}

/// A contiguous range of price bins. `min_bin_id <= max_bin_id` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinRange {
    pub min_bin_id: i32,
    pub max_bin_id: i32,
}

impl BinRange {
    pub fn new(min_bin_id: i32, max_bin_id: i32) -> Result<Self, PlanError> {
        if min_bin_id > max_bin_id {
            return Err(PlanError::InvertedRange {
                min: min_bin_id,
                max: max_bin_id,
            });
        }
        check_bin_id(min_bin_id as i64)?;
        check_bin_id(max_bin_id as i64)?;
        Ok(Self {
            min_bin_id,
            max_bin_id,
        })
    }

    /// Number of bins covered, inclusive of both ends.
    pub fn width(&self) -> u32 {
        (self.max_bin_id - self.min_bin_id) as u32 + 1
    }
}

fn check_bin_id(id: i64) -> Result<i32, PlanError> {
    if id < MIN_BIN_ID as i64 || id > MAX_BIN_ID as i64 {
        return Err(PlanError::BinOutOfRange(id));
    }
    Ok(id as i32)
}

/// Map a price to its bin id.
///
/// Monotonic: a higher price never yields a lower id. `rounding` selects
/// which of the two neighbouring bins wins when the price falls between
/// bin boundaries.
pub fn bin_id_from_price(price: f64, bin_step: u16, rounding: Rounding) -> Result<i32, PlanError> {
    if bin_step == 0 {
        return Err(PlanError::ZeroBinStep);
    }
    if !price.is_finite() || price <= 0.0 {
        return Err(PlanError::InvalidPrice(price));
    }
    let base = 1.0 + f64::from(bin_step) / f64::from(BASIS_POINT_MAX);
    let raw = price.ln() / base.ln();
    let id = match rounding {
        Rounding::Down => raw.floor(),
        Rounding::Up => raw.ceil(),
    };
    check_bin_id(id as i64)
}

/// Price at the lower edge of a bin.
pub fn price_of_bin(bin_id: i32, bin_step: u16) -> f64 {
    let base = 1.0 + f64::from(bin_step) / f64::from(BASIS_POINT_MAX);
    base.powi(bin_id)
}

/// Widen the active bin into a deposit range.
///
/// Two-sided strategies spread `interval_width` bins on each side of the
/// active bin. One-sided strategies keep the active bin as the boundary and
/// extend twice the interval away from it, on the funded side only.
pub fn plan_range(
    active_id: i32,
    interval_width: u32,
    balance: StrategyBalance,
) -> Result<BinRange, PlanError> {
    let active = i64::from(active_id);
    let width = i64::from(interval_width);
    let (min, max) = match balance {
        StrategyBalance::Balanced | StrategyBalance::Imbalanced => {
            (active - width, active + width)
        }
        StrategyBalance::OneSidedX => (active, active + 2 * width),
        StrategyBalance::OneSidedY => (active - 2 * width, active),
    };
    BinRange::new(check_bin_id(min)?, check_bin_id(max)?)
}

/// Validate and split the deposit budgets for a strategy.
///
/// Balanced and imbalanced strategies pass both budgets through unchanged;
/// the per-bin distribution is computed on-chain. One-sided strategies
/// require the opposite-side budget to be exactly zero.
pub fn plan_amounts(
    kind: StrategyKind,
    budget_x: u64,
    budget_y: u64,
) -> Result<(u64, u64), PlanError> {
    if budget_x == 0 && budget_y == 0 {
        return Err(PlanError::EmptyBudget);
    }
    match kind.balance {
        StrategyBalance::OneSidedX if budget_y != 0 => Err(PlanError::ConflictingOneSidedBudget {
            side: 'X',
            amount: budget_y,
        }),
        StrategyBalance::OneSidedY if budget_x != 0 => Err(PlanError::ConflictingOneSidedBudget {
            side: 'Y',
            amount: budget_x,
        }),
        _ => Ok((budget_x, budget_y)),
    }
}

/// Derive the fee base factor from a target fee in basis points.
///
/// The program stores the base fee as `bin_step * base_factor / 10^8`, so
/// the factor is only representable when `fee_bps * 10_000` divides evenly
/// by the bin step and the quotient fits a u16.
pub fn base_factor_from_fee_bps(bin_step: u16, fee_bps: u16) -> Result<u16, PlanError> {
    if bin_step == 0 {
        return Err(PlanError::ZeroBinStep);
    }
    let scaled = u32::from(fee_bps) * BASIS_POINT_MAX;
    let quotient = scaled / u32::from(bin_step);
    if quotient == 0
        || quotient > u32::from(u16::MAX)
        || quotient * u32::from(bin_step) != scaled
    {
        return Err(PlanError::FeeNotRepresentable { fee_bps, bin_step });
    }
    Ok(quotient as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bin_id_round_trips_unit_price() {
        // price 1.0 sits exactly on bin 0 for every step
        assert_eq!(bin_id_from_price(1.0, 100, Rounding::Down).unwrap(), 0);
        assert_eq!(bin_id_from_price(1.0, 1, Rounding::Up).unwrap(), 0);
    }

    #[test]
    fn bin_id_rejects_bad_inputs() {
        assert_eq!(
            bin_id_from_price(2.0, 0, Rounding::Down),
            Err(PlanError::ZeroBinStep)
        );
        assert!(matches!(
            bin_id_from_price(0.0, 100, Rounding::Down),
            Err(PlanError::InvalidPrice(_))
        ));
        assert!(matches!(
            bin_id_from_price(f64::NAN, 100, Rounding::Down),
            Err(PlanError::InvalidPrice(_))
        ));
        assert!(matches!(
            bin_id_from_price(1e300, 1, Rounding::Down),
            Err(PlanError::BinOutOfRange(_))
        ));
    }

    #[test]
    fn one_sided_x_range_extends_upward() {
        let active = bin_id_from_price(2.0, 100, Rounding::Down).unwrap();
        let range = plan_range(active, 10, StrategyBalance::OneSidedX).unwrap();
        assert_eq!(range.min_bin_id, active);
        assert_eq!(range.max_bin_id, active + 20);
        assert_eq!(range.width(), 21);
    }

    #[test]
    fn one_sided_y_range_extends_downward() {
        let range = plan_range(50, 4, StrategyBalance::OneSidedY).unwrap();
        assert_eq!(range.min_bin_id, 42);
        assert_eq!(range.max_bin_id, 50);
    }

    #[test]
    fn balanced_range_is_symmetric() {
        let range = plan_range(-7, 3, StrategyBalance::Balanced).unwrap();
        assert_eq!(range.min_bin_id, -10);
        assert_eq!(range.max_bin_id, -4);
    }

    #[test]
    fn range_near_extremes_is_rejected() {
        assert!(matches!(
            plan_range(MAX_BIN_ID, 10, StrategyBalance::OneSidedX),
            Err(PlanError::BinOutOfRange(_))
        ));
    }

    #[test]
    fn one_sided_amounts_enforce_zero_opposite_budget() {
        let kind = StrategyKind {
            shape: StrategyShape::Spot,
            balance: StrategyBalance::OneSidedX,
        };
        assert_eq!(plan_amounts(kind, 100, 0).unwrap(), (100, 0));
        assert_eq!(
            plan_amounts(kind, 100, 5),
            Err(PlanError::ConflictingOneSidedBudget {
                side: 'X',
                amount: 5
            })
        );

        let kind_y = StrategyKind {
            shape: StrategyShape::BidAsk,
            balance: StrategyBalance::OneSidedY,
        };
        assert_eq!(plan_amounts(kind_y, 0, 7).unwrap(), (0, 7));
        assert_eq!(
            plan_amounts(kind_y, 3, 7),
            Err(PlanError::ConflictingOneSidedBudget {
                side: 'Y',
                amount: 3
            })
        );
    }

    #[test]
    fn empty_budgets_are_rejected() {
        let kind = StrategyKind {
            shape: StrategyShape::Curve,
            balance: StrategyBalance::Balanced,
        };
        assert_eq!(plan_amounts(kind, 0, 0), Err(PlanError::EmptyBudget));
    }

    #[test]
    fn launch_scenario_one_sided_x() {
        // price 2.0, interval 10, one-sided X, budgets (100e9, 0)
        let bin_step = 100;
        let active = bin_id_from_price(2.0, bin_step, Rounding::Down).unwrap();
        let range = plan_range(active, 10, StrategyBalance::OneSidedX).unwrap();
        assert_eq!(range.min_bin_id, active);
        assert_eq!(range.max_bin_id, active + 20);

        let kind = StrategyKind {
            shape: StrategyShape::Spot,
            balance: StrategyBalance::OneSidedX,
        };
        let amounts = plan_amounts(kind, 100_000_000_000, 0).unwrap();
        assert_eq!(amounts, (100_000_000_000, 0));
    }

    #[test]
    fn base_factor_matches_known_tier() {
        // 10 bps fee on a 100 bps step
        assert_eq!(base_factor_from_fee_bps(100, 10).unwrap(), 1_000);
        assert_eq!(base_factor_from_fee_bps(1, 1).unwrap(), 10_000);
    }

    #[test]
    fn base_factor_rejects_unrepresentable_fees() {
        assert_eq!(
            base_factor_from_fee_bps(0, 10),
            Err(PlanError::ZeroBinStep)
        );
        // 7 bps on a 3 bps step does not divide evenly
        assert!(matches!(
            base_factor_from_fee_bps(3, 7),
            Err(PlanError::FeeNotRepresentable { .. })
        ));
        assert!(matches!(
            base_factor_from_fee_bps(100, 0),
            Err(PlanError::FeeNotRepresentable { .. })
        ));
        // quotient would exceed u16::MAX
        assert!(matches!(
            base_factor_from_fee_bps(1, 100),
            Err(PlanError::FeeNotRepresentable { .. })
        ));
    }

    proptest! {
        // Prices stay within the representable bin range for the smallest step.
        #[test]
        fn bin_mapping_is_monotonic(
            p1 in 0.02f64..50.0,
            p2 in 0.02f64..50.0,
            step in 1u16..=400,
        ) {
            let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
            let lo_id = bin_id_from_price(lo, step, Rounding::Down).unwrap();
            let hi_id = bin_id_from_price(hi, step, Rounding::Down).unwrap();
            prop_assert!(lo_id <= hi_id);
        }

        #[test]
        fn rounding_up_never_undershoots(
            price in 0.02f64..50.0,
            step in 1u16..=400,
        ) {
            let down = bin_id_from_price(price, step, Rounding::Down).unwrap();
            let up = bin_id_from_price(price, step, Rounding::Up).unwrap();
            prop_assert!(up == down || up == down + 1);
        }
    }
}
