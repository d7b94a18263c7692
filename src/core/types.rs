use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WithdrawalStrategy {
    #[default]
    ConstantDollar,
    ConstantPercentage,
    /// Portfolio-percentage withdrawal kept between guardrails around the
    /// inflation-adjusted initial withdrawal.
    PercentageOfPortfolio,
}

impl WithdrawalStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            WithdrawalStrategy::ConstantDollar => "constantDollar",
            WithdrawalStrategy::ConstantPercentage => "constantPercentage",
            WithdrawalStrategy::PercentageOfPortfolio => "percentageOfPortfolio",
        }
    }
}

impl fmt::Display for WithdrawalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawalStrategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "constantDollar" | "constant-dollar" | "constant_dollar" => {
                Ok(WithdrawalStrategy::ConstantDollar)
            }
            "constantPercentage" | "constant-percentage" | "constant_percentage" => {
                Ok(WithdrawalStrategy::ConstantPercentage)
            }
            "percentageOfPortfolio" | "percentage-of-portfolio" | "percentage_of_portfolio" => {
                Ok(WithdrawalStrategy::PercentageOfPortfolio)
            }
            other => Err(ValidationError::UnknownStrategy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionInput {
    pub principal: f64,
    pub monthly_contribution: f64,
    pub annual_rate_percent: f64,
    pub years: u32,
    pub inflation_rate_percent: f64,
    pub adjust_for_inflation: bool,
    /// Calendar year the projection starts from; row `i` is labelled
    /// `start_year + i`.
    pub start_year: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlySnapshot {
    pub year: i32,
    pub total_investment: f64,
    pub investment_value: f64,
    pub inflation_adjusted_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub yearly_projections: Vec<YearlySnapshot>,
    pub final_investment_value: f64,
    pub total_contributions: f64,
    pub total_growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationLeg {
    #[serde(rename = "type")]
    pub kind: String,
    pub percentage: f64,
    pub expected_return_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixedAllocationInput {
    pub principal: f64,
    pub monthly_contribution: f64,
    pub legs: Vec<AllocationLeg>,
    pub years: u32,
    pub inflation_rate_percent: f64,
    pub start_year: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegValue {
    pub value: f64,
    pub adjusted_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixedYearSnapshot {
    pub year: i32,
    pub total_investment: f64,
    pub investment_value: f64,
    pub inflation_adjusted_value: f64,
    pub breakdown: BTreeMap<String, LegValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegTerminalValue {
    #[serde(rename = "type")]
    pub kind: String,
    pub percentage: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixedProjectionResult {
    pub yearly_projections: Vec<MixedYearSnapshot>,
    pub final_investment_value: f64,
    pub total_contributions: f64,
    pub total_growth: f64,
    pub breakdown: Vec<LegTerminalValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxedYearSnapshot {
    #[serde(flatten)]
    pub snapshot: YearlySnapshot,
    /// Growth earned during the year, net of that year's contributions.
    /// Negative in losing years.
    pub growth: f64,
    pub tax_amount: f64,
    pub after_tax_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AfterTaxResult {
    pub yearly_projections: Vec<TaxedYearSnapshot>,
    pub final_investment_value: f64,
    pub total_contributions: f64,
    pub total_growth: f64,
    pub final_after_tax_value: f64,
    pub total_tax_paid: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedProjection {
    pub name: String,
    pub input: ProjectionInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedProjectionResult {
    pub name: String,
    pub result: ProjectionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FireInputs {
    pub current_age: f64,
    pub annual_expenses: f64,
    pub annual_savings: f64,
    pub withdrawal_rate_percent: f64,
    pub safety_margin_percent: f64,
    pub current_savings: f64,
    pub expected_return_percent: f64,
    pub inflation_rate_percent: f64,
    pub start_year: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FireTimeline {
    pub fire_number: f64,
    pub years_to_fire: f64,
    pub fire_age: f64,
    /// False when savings never reached the target inside the simulation
    /// horizon; `years_to_fire` is then the horizon itself.
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirePlan {
    pub timeline: FireTimeline,
    pub retirement: WithdrawalSimulationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalInput {
    pub initial_portfolio: f64,
    pub annual_expenses: f64,
    pub withdrawal_rate_percent: f64,
    pub expected_return_percent: f64,
    pub inflation_rate_percent: f64,
    pub strategy: WithdrawalStrategy,
    pub years: u32,
    pub start_year: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalYearRecord {
    pub year: i32,
    pub portfolio_value: f64,
    pub withdrawal: f64,
    pub inflation_adjusted_expenses: f64,
    pub withdrawal_rate: f64,
    pub portfolio_growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalSimulationResult {
    pub strategy: WithdrawalStrategy,
    pub initial_portfolio: f64,
    pub initial_withdrawal: f64,
    pub withdrawal_rate_percent: f64,
    pub yearly_data: Vec<WithdrawalYearRecord>,
    pub final_portfolio_value: f64,
    pub survival_years: u32,
    pub is_successful: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnScenario {
    pub name: String,
    pub return_rate_percent: f64,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SustainabilityInput {
    pub initial_portfolio: f64,
    pub annual_expenses: f64,
    pub withdrawal_rate_percent: f64,
    pub scenarios: Vec<ReturnScenario>,
    pub inflation_rate_percent: f64,
    pub simulation_years: u32,
    pub start_year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOutcome {
    pub scenario: String,
    pub return_rate: f64,
    pub probability: f64,
    pub result: WithdrawalSimulationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SustainabilityResult {
    pub initial_portfolio: f64,
    pub annual_expenses: f64,
    pub withdrawal_rate_percent: f64,
    pub inflation_rate_percent: f64,
    pub simulation_years: u32,
    pub scenario_results: Vec<ScenarioOutcome>,
    pub weighted_success_rate: f64,
    pub average_survival_years: f64,
    pub best_scenario: ScenarioOutcome,
    pub worst_scenario: ScenarioOutcome,
    pub sustainability_score: f64,
}
