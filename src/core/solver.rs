use super::engine::{MAX_SIMULATION_MONTHS, MONTHS_PER_YEAR};
use super::error::{
    ValidationError, non_negative, positive, rate_percent, start_year_in_range,
};
use super::types::{FireInputs, FirePlan, FireTimeline, WithdrawalInput, WithdrawalStrategy};
use super::withdrawal::simulate_withdrawal;

/// Length of the decumulation run attached to a FIRE plan.
pub const RETIREMENT_HORIZON_YEARS: u32 = 50;

/// Capital needed so that `withdrawal_rate_percent` of it covers
/// `annual_expenses` grown by the safety margin.
pub fn fire_number(
    annual_expenses: f64,
    withdrawal_rate_percent: f64,
    safety_margin_percent: f64,
) -> Result<f64, ValidationError> {
    non_negative("annualExpenses", annual_expenses)?;
    positive("withdrawalRatePercent", withdrawal_rate_percent)?;
    non_negative("safetyMarginPercent", safety_margin_percent)?;

    let safety_factor = 1.0 + safety_margin_percent / 100.0;
    Ok(annual_expenses * safety_factor / (withdrawal_rate_percent / 100.0))
}

#[derive(Debug, Clone, Copy)]
struct TargetSearch {
    months: u32,
    reached: bool,
}

fn months_to_target(
    current_savings: f64,
    target: f64,
    annual_savings: f64,
    expected_return_percent: f64,
) -> TargetSearch {
    let monthly_rate = expected_return_percent / 100.0 / MONTHS_PER_YEAR as f64;
    let monthly_savings = annual_savings / MONTHS_PER_YEAR as f64;

    let mut savings = current_savings;
    let mut months = 0;
    while savings < target && months < MAX_SIMULATION_MONTHS {
        savings = savings * (1.0 + monthly_rate) + monthly_savings;
        months += 1;
    }

    TargetSearch {
        months,
        reached: savings >= target,
    }
}

/// Fractional years until savings reach `fire_number`.
///
/// Stops at the simulation horizon, so a return of exactly 100.0 means the
/// target was never reached. [`fire_timeline`] reports that explicitly.
pub fn years_to_fire(
    current_savings: f64,
    fire_number: f64,
    annual_savings: f64,
    expected_return_percent: f64,
) -> Result<f64, ValidationError> {
    validate_accumulation(current_savings, fire_number, annual_savings, expected_return_percent)?;
    let search = months_to_target(
        current_savings,
        fire_number,
        annual_savings,
        expected_return_percent,
    );
    Ok(search.months as f64 / MONTHS_PER_YEAR as f64)
}

fn validate_accumulation(
    current_savings: f64,
    fire_number: f64,
    annual_savings: f64,
    expected_return_percent: f64,
) -> Result<(), ValidationError> {
    non_negative("currentSavings", current_savings)?;
    non_negative("fireNumber", fire_number)?;
    non_negative("annualSavings", annual_savings)?;
    rate_percent("expectedReturnPercent", expected_return_percent)?;
    Ok(())
}

pub fn fire_timeline(inputs: &FireInputs) -> Result<FireTimeline, ValidationError> {
    non_negative("currentAge", inputs.current_age)?;
    let target = fire_number(
        inputs.annual_expenses,
        inputs.withdrawal_rate_percent,
        inputs.safety_margin_percent,
    )?;
    validate_accumulation(
        inputs.current_savings,
        target,
        inputs.annual_savings,
        inputs.expected_return_percent,
    )?;

    let search = months_to_target(
        inputs.current_savings,
        target,
        inputs.annual_savings,
        inputs.expected_return_percent,
    );
    let years = search.months as f64 / MONTHS_PER_YEAR as f64;

    Ok(FireTimeline {
        fire_number: target,
        years_to_fire: years,
        fire_age: inputs.current_age + years,
        converged: search.reached,
    })
}

/// Timeline plus a guardrailed drawdown of the FIRE number, starting in the
/// calendar year the target is reached.
pub fn plan_fire(inputs: &FireInputs) -> Result<FirePlan, ValidationError> {
    rate_percent("inflationRatePercent", inputs.inflation_rate_percent)?;
    start_year_in_range(inputs.start_year)?;
    let timeline = fire_timeline(inputs)?;
    let retirement = simulate_withdrawal(&WithdrawalInput {
        initial_portfolio: timeline.fire_number,
        annual_expenses: inputs.annual_expenses,
        withdrawal_rate_percent: inputs.withdrawal_rate_percent,
        expected_return_percent: inputs.expected_return_percent,
        inflation_rate_percent: inputs.inflation_rate_percent,
        strategy: WithdrawalStrategy::PercentageOfPortfolio,
        years: RETIREMENT_HORIZON_YEARS,
        start_year: inputs.start_year + timeline.years_to_fire.ceil() as i32,
    })?;

    Ok(FirePlan {
        timeline,
        retirement,
    })
}
