//! Daily allocation of a monthly delta
//!
//! All functions are pure and exact: the returned allocations always cover
//! every day of the month, are ordered by date and sum to exactly `delta`.

use std::collections::BTreeMap;

use minetally_domain::{
    AllocationMethod, DailyAllocation, MinetallyError, ReportingMonth, Result,
};
use rust_decimal::{Decimal, RoundingStrategy};

/// Allocate `delta` across `month` with the given method.
///
/// `previous` is only consulted for [`AllocationMethod::Custom`], whose manual
/// values are carried over.
pub fn allocate(
    method: AllocationMethod,
    month: ReportingMonth,
    delta: Decimal,
    rounding_dp: u32,
    previous: &[DailyAllocation],
) -> Vec<DailyAllocation> {
    match method {
        AllocationMethod::SpreadDaily => spread_daily(month, delta, rounding_dp),
        AllocationMethod::MonthEnd => month_end(month, delta),
        AllocationMethod::Custom => carry_custom(month, delta, previous),
    }
}

/// Equal rounded share per day; the last day takes the remainder.
pub fn spread_daily(month: ReportingMonth, delta: Decimal, rounding_dp: u32) -> Vec<DailyAllocation> {
    let days = month.days_in_month();
    let share = (delta / Decimal::from(days))
        .round_dp_with_strategy(rounding_dp, RoundingStrategy::MidpointAwayFromZero);
    let remainder = delta - share * Decimal::from(days - 1);

    month
        .days()
        .map(|date| {
            let value = if date == month.last_day() { remainder } else { share };
            DailyAllocation::new(date, value)
        })
        .collect()
}

pub fn month_end(month: ReportingMonth, delta: Decimal) -> Vec<DailyAllocation> {
    month
        .days()
        .map(|date| {
            let value = if date == month.last_day() { delta } else { Decimal::ZERO };
            DailyAllocation::new(date, value)
        })
        .collect()
}

/// Keep manual values for days inside the month and fold whatever no longer
/// matches `delta` into the last day.
pub fn carry_custom(
    month: ReportingMonth,
    delta: Decimal,
    previous: &[DailyAllocation],
) -> Vec<DailyAllocation> {
    let manual: BTreeMap<_, _> = previous
        .iter()
        .filter(|a| month.contains(a.date))
        .map(|a| (a.date, a.allocated_value))
        .collect();

    let mut allocations: Vec<DailyAllocation> = month
        .days()
        .map(|date| DailyAllocation::new(date, manual.get(&date).copied().unwrap_or_default()))
        .collect();

    let sum: Decimal = allocations.iter().map(|a| a.allocated_value).sum();
    if let Some(last) = allocations.last_mut() {
        last.allocated_value += delta - sum;
    }
    allocations
}

/// Check a manually edited allocation set and normalise it to one entry per
/// day of the month.
pub fn validate_custom(
    month: ReportingMonth,
    delta: Decimal,
    allocations: &[DailyAllocation],
) -> Result<Vec<DailyAllocation>> {
    let mut by_date = BTreeMap::new();
    for allocation in allocations {
        if !month.contains(allocation.date) {
            return Err(MinetallyError::InvalidInput(format!(
                "allocation date {} is outside {month}",
                allocation.date
            )));
        }
        if by_date.insert(allocation.date, allocation.allocated_value).is_some() {
            return Err(MinetallyError::InvalidInput(format!(
                "duplicate allocation for {}",
                allocation.date
            )));
        }
    }

    let sum: Decimal = by_date.values().copied().sum();
    if sum != delta {
        return Err(MinetallyError::InvalidInput(format!(
            "allocations sum to {sum} but the delta is {delta}"
        )));
    }

    Ok(month
        .days()
        .map(|date| DailyAllocation::new(date, by_date.get(&date).copied().unwrap_or_default()))
        .collect())
}
