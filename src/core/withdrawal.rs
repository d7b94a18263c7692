use super::engine::MAX_SIMULATION_YEARS;
use super::error::{
    ValidationError, non_negative, positive, rate_percent, start_year_in_range, within,
    years_in_range,
};
use super::types::{
    ScenarioOutcome, SustainabilityInput, SustainabilityResult, WithdrawalInput,
    WithdrawalSimulationResult, WithdrawalStrategy, WithdrawalYearRecord,
};

/// Guardrails for [`WithdrawalStrategy::PercentageOfPortfolio`], as multiples
/// of the inflation-adjusted initial withdrawal.
pub const GUARDRAIL_FLOOR: f64 = 0.8;
pub const GUARDRAIL_CEILING: f64 = 1.5;

#[derive(Debug, Clone, Copy)]
struct WithdrawalParams {
    annual_expenses: f64,
    withdrawal_rate: f64,
    inflation_rate: f64,
    initial_withdrawal: f64,
}

impl WithdrawalParams {
    fn inflation_factor(self, year: u32) -> f64 {
        (1.0 + self.inflation_rate).powi(year as i32 - 1)
    }
}

fn planned_withdrawal(
    strategy: WithdrawalStrategy,
    params: WithdrawalParams,
    portfolio: f64,
    year: u32,
) -> f64 {
    match strategy {
        WithdrawalStrategy::ConstantDollar => params.annual_expenses * params.inflation_factor(year),
        WithdrawalStrategy::ConstantPercentage => portfolio * params.withdrawal_rate,
        WithdrawalStrategy::PercentageOfPortfolio => {
            let base = portfolio * params.withdrawal_rate;
            let anchor = params.initial_withdrawal * params.inflation_factor(year);
            base.max(anchor * GUARDRAIL_FLOOR).min(anchor * GUARDRAIL_CEILING)
        }
    }
}

/// Year-stepped decumulation. Each year withdraws (never more than the
/// portfolio holds), then grows what is left. The run stops early on ruin.
pub fn simulate_withdrawal(
    input: &WithdrawalInput,
) -> Result<WithdrawalSimulationResult, ValidationError> {
    non_negative("initialPortfolio", input.initial_portfolio)?;
    non_negative("annualExpenses", input.annual_expenses)?;
    positive("withdrawalRatePercent", input.withdrawal_rate_percent)?;
    rate_percent("expectedReturnPercent", input.expected_return_percent)?;
    rate_percent("inflationRatePercent", input.inflation_rate_percent)?;
    years_in_range(input.years, MAX_SIMULATION_YEARS)?;
    start_year_in_range(input.start_year)?;

    let withdrawal_rate = input.withdrawal_rate_percent / 100.0;
    let expected_return = input.expected_return_percent / 100.0;
    let inflation_rate = input.inflation_rate_percent / 100.0;
    let initial_withdrawal = match input.strategy {
        WithdrawalStrategy::PercentageOfPortfolio => input.initial_portfolio * withdrawal_rate,
        WithdrawalStrategy::ConstantDollar | WithdrawalStrategy::ConstantPercentage => {
            input.annual_expenses
        }
    };
    let params = WithdrawalParams {
        annual_expenses: input.annual_expenses,
        withdrawal_rate,
        inflation_rate,
        initial_withdrawal,
    };

    let mut portfolio = input.initial_portfolio;
    let mut yearly_data = Vec::with_capacity(input.years as usize);

    for year in 1..=input.years {
        let withdrawal = planned_withdrawal(input.strategy, params, portfolio, year).min(portfolio);
        portfolio -= withdrawal;

        let portfolio_growth = portfolio * expected_return;
        portfolio += portfolio_growth;

        let withdrawal_rate_of_portfolio = if portfolio > 0.0 {
            withdrawal / portfolio * 100.0
        } else {
            100.0
        };

        yearly_data.push(WithdrawalYearRecord {
            year: input.start_year + year as i32,
            portfolio_value: portfolio,
            withdrawal,
            inflation_adjusted_expenses: input.annual_expenses
                * (1.0 + inflation_rate).powi(year as i32),
            withdrawal_rate: withdrawal_rate_of_portfolio,
            portfolio_growth,
        });

        if portfolio <= 0.0 {
            break;
        }
    }

    let is_successful = portfolio > 0.0;
    Ok(WithdrawalSimulationResult {
        strategy: input.strategy,
        initial_portfolio: input.initial_portfolio,
        initial_withdrawal,
        withdrawal_rate_percent: input.withdrawal_rate_percent,
        survival_years: yearly_data.len() as u32,
        yearly_data,
        final_portfolio_value: if is_successful { portfolio } else { 0.0 },
        is_successful,
    })
}

/// Runs a constant-dollar drawdown per return scenario and weighs the
/// outcomes by each scenario's probability.
pub fn analyze_sustainability(
    input: &SustainabilityInput,
) -> Result<SustainabilityResult, ValidationError> {
    if input.scenarios.is_empty() {
        return Err(ValidationError::NoScenarios);
    }
    start_year_in_range(input.start_year)?;
    for scenario in &input.scenarios {
        within("probability", scenario.probability, 0.0, 1.0)?;
        rate_percent("returnRatePercent", scenario.return_rate_percent)?;
    }

    let mut scenario_results = Vec::with_capacity(input.scenarios.len());
    for scenario in &input.scenarios {
        let result = simulate_withdrawal(&WithdrawalInput {
            initial_portfolio: input.initial_portfolio,
            annual_expenses: input.annual_expenses,
            withdrawal_rate_percent: input.withdrawal_rate_percent,
            expected_return_percent: scenario.return_rate_percent,
            inflation_rate_percent: input.inflation_rate_percent,
            strategy: WithdrawalStrategy::ConstantDollar,
            years: input.simulation_years,
            start_year: input.start_year,
        })?;
        scenario_results.push(ScenarioOutcome {
            scenario: scenario.name.clone(),
            return_rate: scenario.return_rate_percent,
            probability: scenario.probability,
            result,
        });
    }

    let weighted_success_rate = scenario_results
        .iter()
        .filter(|outcome| outcome.result.is_successful)
        .map(|outcome| outcome.probability)
        .sum::<f64>();
    let average_survival_years = scenario_results
        .iter()
        .map(|outcome| outcome.result.survival_years as f64 * outcome.probability)
        .sum::<f64>();

    // Strict comparisons keep the first scenario on ties.
    let first = &scenario_results[0];
    let best_scenario = scenario_results.iter().fold(first, |best, current| {
        if current.result.final_portfolio_value > best.result.final_portfolio_value {
            current
        } else {
            best
        }
    });
    let worst_scenario = scenario_results.iter().fold(first, |worst, current| {
        if current.result.final_portfolio_value < worst.result.final_portfolio_value {
            current
        } else {
            worst
        }
    });

    Ok(SustainabilityResult {
        initial_portfolio: input.initial_portfolio,
        annual_expenses: input.annual_expenses,
        withdrawal_rate_percent: input.withdrawal_rate_percent,
        inflation_rate_percent: input.inflation_rate_percent,
        simulation_years: input.simulation_years,
        best_scenario: best_scenario.clone(),
        worst_scenario: worst_scenario.clone(),
        scenario_results,
        weighted_success_rate,
        average_survival_years,
        sustainability_score: weighted_success_rate * 100.0,
    })
}
