use std::collections::{BTreeMap, BTreeSet};

use super::error::{
    ValidationError, non_negative, rate_percent, start_year_in_range, within, years_in_range,
};
use super::types::{
    AfterTaxResult, AllocationLeg, LegTerminalValue, LegValue, MixedAllocationInput,
    MixedProjectionResult, MixedYearSnapshot, NamedProjection, NamedProjectionResult,
    ProjectionInput, ProjectionResult, TaxedYearSnapshot, YearlySnapshot,
};

pub const MONTHS_PER_YEAR: u32 = 12;
pub const MAX_SIMULATION_YEARS: u32 = 100;
/// Hard cap shared by every month-stepped loop.
pub const MAX_SIMULATION_MONTHS: u32 = MAX_SIMULATION_YEARS * MONTHS_PER_YEAR;
pub const ALLOCATION_TOLERANCE: f64 = 0.01;

/// Month-stepped compounding with one snapshot per simulated year.
///
/// Monthly rates are the annual percentages divided by twelve (simple, not
/// geometric). Each month the contribution lands first and the whole balance
/// then grows. With `adjust_for_inflation` the yearly snapshot is deflated by
/// `(1 + monthly_inflation)^elapsed_months`.
pub fn simulate_compound_growth(input: &ProjectionInput) -> Result<ProjectionResult, ValidationError> {
    validate_projection(input)?;

    let monthly_rate = input.annual_rate_percent / 100.0 / MONTHS_PER_YEAR as f64;
    let monthly_inflation = input.inflation_rate_percent / 100.0 / MONTHS_PER_YEAR as f64;
    let total_months = input.years * MONTHS_PER_YEAR;

    let mut value = input.principal;
    let mut contributions = input.principal;
    let mut yearly = Vec::with_capacity(input.years as usize);

    for month in 1..=total_months {
        value += input.monthly_contribution;
        contributions += input.monthly_contribution;
        value *= 1.0 + monthly_rate;

        if month % MONTHS_PER_YEAR == 0 {
            let year_index = (month / MONTHS_PER_YEAR) as i32;
            let inflation_adjusted_value = if input.adjust_for_inflation {
                value / (1.0 + monthly_inflation).powi(month as i32)
            } else {
                value
            };
            yearly.push(YearlySnapshot {
                year: input.start_year + year_index,
                total_investment: contributions,
                investment_value: value,
                inflation_adjusted_value,
            });
        }
    }

    projection_from_snapshots(yearly)
}

fn validate_projection(input: &ProjectionInput) -> Result<(), ValidationError> {
    non_negative("principal", input.principal)?;
    non_negative("monthlyContribution", input.monthly_contribution)?;
    rate_percent("annualRatePercent", input.annual_rate_percent)?;
    rate_percent("inflationRatePercent", input.inflation_rate_percent)?;
    years_in_range(input.years, MAX_SIMULATION_YEARS)?;
    start_year_in_range(input.start_year)?;
    Ok(())
}

fn projection_from_snapshots(
    yearly: Vec<YearlySnapshot>,
) -> Result<ProjectionResult, ValidationError> {
    let Some(last) = yearly.last().copied() else {
        return Err(ValidationError::EmptyProjection);
    };
    Ok(ProjectionResult {
        yearly_projections: yearly,
        final_investment_value: last.investment_value,
        total_contributions: last.total_investment,
        total_growth: last.investment_value - last.total_investment,
    })
}

/// Splits principal and contributions across weighted legs, compounds each
/// leg at its own return (always inflation-adjusted) and merges the legs
/// year by year.
pub fn simulate_mixed_allocation(
    input: &MixedAllocationInput,
) -> Result<MixedProjectionResult, ValidationError> {
    non_negative("principal", input.principal)?;
    non_negative("monthlyContribution", input.monthly_contribution)?;
    rate_percent("inflationRatePercent", input.inflation_rate_percent)?;
    years_in_range(input.years, MAX_SIMULATION_YEARS)?;
    start_year_in_range(input.start_year)?;
    validate_allocation(&input.legs)?;

    let mut legs = Vec::with_capacity(input.legs.len());
    for leg in &input.legs {
        let share = leg.percentage / 100.0;
        let result = simulate_compound_growth(&ProjectionInput {
            principal: input.principal * share,
            monthly_contribution: input.monthly_contribution * share,
            annual_rate_percent: leg.expected_return_percent,
            years: input.years,
            inflation_rate_percent: input.inflation_rate_percent,
            adjust_for_inflation: true,
            start_year: input.start_year,
        })?;
        legs.push((leg, result));
    }

    let mut yearly = Vec::with_capacity(input.years as usize);
    for index in 0..input.years as usize {
        let mut row = MixedYearSnapshot {
            year: input.start_year + index as i32 + 1,
            total_investment: 0.0,
            investment_value: 0.0,
            inflation_adjusted_value: 0.0,
            breakdown: BTreeMap::new(),
        };
        for (leg, result) in &legs {
            // Every leg ran for the same number of years.
            let snapshot = &result.yearly_projections[index];
            row.total_investment += snapshot.total_investment;
            row.investment_value += snapshot.investment_value;
            row.inflation_adjusted_value += snapshot.inflation_adjusted_value;
            row.breakdown.insert(
                leg.kind.clone(),
                LegValue {
                    value: snapshot.investment_value,
                    adjusted_value: snapshot.inflation_adjusted_value,
                },
            );
        }
        yearly.push(row);
    }

    let Some(last) = yearly.last() else {
        return Err(ValidationError::EmptyProjection);
    };
    let final_investment_value = last.investment_value;
    let total_contributions = last.total_investment;

    let breakdown = legs
        .iter()
        .map(|(leg, result)| LegTerminalValue {
            kind: leg.kind.clone(),
            percentage: leg.percentage,
            value: result.final_investment_value,
        })
        .collect();

    Ok(MixedProjectionResult {
        yearly_projections: yearly,
        final_investment_value,
        total_contributions,
        total_growth: final_investment_value - total_contributions,
        breakdown,
    })
}

pub fn validate_allocation(legs: &[AllocationLeg]) -> Result<(), ValidationError> {
    if legs.is_empty() {
        return Err(ValidationError::EmptyAllocation);
    }

    let mut seen = BTreeSet::new();
    let mut total = 0.0;
    for leg in legs {
        within("percentage", leg.percentage, 0.0, 100.0)?;
        rate_percent("expectedReturnPercent", leg.expected_return_percent)?;
        if !seen.insert(leg.kind.as_str()) {
            return Err(ValidationError::DuplicateLeg(leg.kind.clone()));
        }
        total += leg.percentage;
    }

    if (total - 100.0).abs() > ALLOCATION_TOLERANCE {
        return Err(ValidationError::AllocationSum { total });
    }
    Ok(())
}

/// Taxes each year's growth (never the contributions) at `tax_rate_percent`.
///
/// A losing year has negative growth and therefore a negative tax, which is
/// kept as a credit.
pub fn apply_after_tax_adjustment(
    result: &ProjectionResult,
    tax_rate_percent: f64,
) -> Result<AfterTaxResult, ValidationError> {
    within("taxRatePercent", tax_rate_percent, 0.0, 100.0)?;
    if result.yearly_projections.is_empty() {
        return Err(ValidationError::EmptyProjection);
    }

    let tax_rate = tax_rate_percent / 100.0;
    let mut previous: Option<&YearlySnapshot> = None;
    let mut yearly = Vec::with_capacity(result.yearly_projections.len());

    for snapshot in &result.yearly_projections {
        let (previous_value, contribution) = match previous {
            Some(prev) => (
                prev.investment_value,
                snapshot.total_investment - prev.total_investment,
            ),
            None => (0.0, snapshot.total_investment),
        };
        let growth = snapshot.investment_value - previous_value - contribution;
        let tax_amount = growth * tax_rate;
        yearly.push(TaxedYearSnapshot {
            snapshot: *snapshot,
            growth,
            tax_amount,
            after_tax_value: snapshot.investment_value - tax_amount,
        });
        previous = Some(snapshot);
    }

    let final_after_tax_value = yearly
        .last()
        .map(|year| year.after_tax_value)
        .unwrap_or(result.final_investment_value);

    Ok(AfterTaxResult {
        yearly_projections: yearly,
        final_investment_value: result.final_investment_value,
        total_contributions: result.total_contributions,
        total_growth: result.total_growth,
        final_after_tax_value,
        total_tax_paid: result.final_investment_value - final_after_tax_value,
    })
}

pub fn compare_projections(
    scenarios: &[NamedProjection],
) -> Result<Vec<NamedProjectionResult>, ValidationError> {
    if scenarios.is_empty() {
        return Err(ValidationError::NoScenarios);
    }
    scenarios
        .iter()
        .map(|scenario| {
            Ok(NamedProjectionResult {
                name: scenario.name.clone(),
                result: simulate_compound_growth(&scenario.input)?,
            })
        })
        .collect()
}
