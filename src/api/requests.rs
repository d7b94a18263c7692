use chrono::{Datelike, Local};
use clap::Args;
use serde::Deserialize;

use crate::core::{
    AllocationLeg, FireInputs, MixedAllocationInput, NamedProjection, ProjectionInput,
    ReturnScenario, SustainabilityInput, ValidationError, WithdrawalInput, WithdrawalStrategy,
};

const DEFAULT_PRINCIPAL: f64 = 100_000.0;
const DEFAULT_MONTHLY_CONTRIBUTION: f64 = 1_000.0;
const DEFAULT_ANNUAL_RATE: f64 = 7.0;
const DEFAULT_YEARS: u32 = 20;
const DEFAULT_INFLATION_RATE: f64 = 2.5;
const DEFAULT_TAX_RATE: f64 = 15.0;

const DEFAULT_CURRENT_AGE: f64 = 30.0;
const DEFAULT_CURRENT_SAVINGS: f64 = 100_000.0;
const DEFAULT_ANNUAL_EXPENSES: f64 = 60_000.0;
const DEFAULT_ANNUAL_SAVINGS: f64 = 40_000.0;
const DEFAULT_WITHDRAWAL_RATE: f64 = 4.0;
const DEFAULT_SAFETY_MARGIN: f64 = 10.0;

const DEFAULT_INITIAL_PORTFOLIO: f64 = 1_500_000.0;
const DEFAULT_WITHDRAWAL_YEARS: u32 = 30;
const DEFAULT_SUSTAINABILITY_YEARS: u32 = 50;

pub fn current_year() -> i32 {
    Local::now().year()
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ProjectionArgs {
    #[arg(long, default_value_t = DEFAULT_PRINCIPAL, help = "Initial investment")]
    pub principal: f64,
    #[arg(long, default_value_t = DEFAULT_MONTHLY_CONTRIBUTION)]
    pub monthly_contribution: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_ANNUAL_RATE,
        help = "Expected annual return in percent, e.g. 7"
    )]
    pub annual_rate: f64,
    #[arg(long, default_value_t = DEFAULT_YEARS)]
    pub years: u32,
    #[arg(long, default_value_t = DEFAULT_INFLATION_RATE, help = "Annual inflation in percent")]
    pub inflation_rate: f64,
    #[arg(long, help = "Report nominal values only")]
    pub no_inflation_adjustment: bool,
    #[arg(long, help = "First calendar year; defaults to the current year")]
    pub start_year: Option<i32>,
}

impl Default for ProjectionArgs {
    fn default() -> Self {
        Self {
            principal: DEFAULT_PRINCIPAL,
            monthly_contribution: DEFAULT_MONTHLY_CONTRIBUTION,
            annual_rate: DEFAULT_ANNUAL_RATE,
            years: DEFAULT_YEARS,
            inflation_rate: DEFAULT_INFLATION_RATE,
            no_inflation_adjustment: false,
            start_year: None,
        }
    }
}

impl ProjectionArgs {
    pub fn to_input(&self) -> ProjectionInput {
        ProjectionInput {
            principal: self.principal,
            monthly_contribution: self.monthly_contribution,
            annual_rate_percent: self.annual_rate,
            years: self.years,
            inflation_rate_percent: self.inflation_rate,
            adjust_for_inflation: !self.no_inflation_adjustment,
            start_year: self.start_year.unwrap_or_else(current_year),
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct AfterTaxArgs {
    #[command(flatten)]
    pub projection: ProjectionArgs,
    #[arg(
        long,
        default_value_t = DEFAULT_TAX_RATE,
        help = "Tax on yearly growth in percent"
    )]
    pub tax_rate: f64,
}

impl Default for AfterTaxArgs {
    fn default() -> Self {
        Self {
            projection: ProjectionArgs::default(),
            tax_rate: DEFAULT_TAX_RATE,
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct CompareArgs {
    #[command(flatten)]
    pub projection: ProjectionArgs,
    #[arg(
        long = "scenario",
        value_parser = parse_rate_scenario,
        help = "NAME:RATE, repeatable; each scenario overrides --annual-rate"
    )]
    pub scenarios: Vec<(String, f64)>,
}

impl CompareArgs {
    pub fn to_scenarios(&self) -> Vec<NamedProjection> {
        let scenarios = if self.scenarios.is_empty() {
            default_rate_scenarios()
        } else {
            self.scenarios.clone()
        };
        scenarios
            .into_iter()
            .map(|(name, rate)| {
                let mut input = self.projection.to_input();
                input.annual_rate_percent = rate;
                input.adjust_for_inflation = true;
                NamedProjection { name, input }
            })
            .collect()
    }
}

fn default_rate_scenarios() -> Vec<(String, f64)> {
    vec![("baseline".to_string(), 7.0), ("optimistic".to_string(), 10.0)]
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct MixedArgs {
    #[arg(long, default_value_t = DEFAULT_PRINCIPAL)]
    pub principal: f64,
    #[arg(long, default_value_t = DEFAULT_MONTHLY_CONTRIBUTION)]
    pub monthly_contribution: f64,
    #[arg(long, default_value_t = DEFAULT_YEARS)]
    pub years: u32,
    #[arg(long, default_value_t = DEFAULT_INFLATION_RATE)]
    pub inflation_rate: f64,
    #[arg(
        long = "leg",
        value_parser = parse_leg,
        help = "TYPE:PERCENT:RETURN, repeatable; percentages must sum to 100"
    )]
    pub legs: Vec<AllocationLeg>,
    #[arg(long)]
    pub start_year: Option<i32>,
}

impl Default for MixedArgs {
    fn default() -> Self {
        Self {
            principal: DEFAULT_PRINCIPAL,
            monthly_contribution: DEFAULT_MONTHLY_CONTRIBUTION,
            years: DEFAULT_YEARS,
            inflation_rate: DEFAULT_INFLATION_RATE,
            legs: Vec::new(),
            start_year: None,
        }
    }
}

impl MixedArgs {
    pub fn to_input(&self) -> MixedAllocationInput {
        MixedAllocationInput {
            principal: self.principal,
            monthly_contribution: self.monthly_contribution,
            legs: if self.legs.is_empty() {
                default_legs()
            } else {
                self.legs.clone()
            },
            years: self.years,
            inflation_rate_percent: self.inflation_rate,
            start_year: self.start_year.unwrap_or_else(current_year),
        }
    }
}

fn default_legs() -> Vec<AllocationLeg> {
    [("stocks", 60.0, 8.0), ("bonds", 30.0, 4.0), ("cash", 10.0, 2.0)]
        .into_iter()
        .map(|(kind, percentage, expected_return_percent)| AllocationLeg {
            kind: kind.to_string(),
            percentage,
            expected_return_percent,
        })
        .collect()
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct FireArgs {
    #[arg(long, default_value_t = DEFAULT_CURRENT_AGE)]
    pub current_age: f64,
    #[arg(long, default_value_t = DEFAULT_CURRENT_SAVINGS)]
    pub current_savings: f64,
    #[arg(long, default_value_t = DEFAULT_ANNUAL_EXPENSES)]
    pub annual_expenses: f64,
    #[arg(long, default_value_t = DEFAULT_ANNUAL_SAVINGS)]
    pub annual_savings: f64,
    #[arg(long, default_value_t = DEFAULT_ANNUAL_RATE, help = "Expected annual return in percent")]
    pub expected_return: f64,
    #[arg(long, default_value_t = DEFAULT_WITHDRAWAL_RATE, help = "Safe withdrawal rate in percent")]
    pub withdrawal_rate: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_SAFETY_MARGIN,
        help = "Buffer added to the FIRE number in percent"
    )]
    pub safety_margin: f64,
    #[arg(long, default_value_t = DEFAULT_INFLATION_RATE)]
    pub inflation_rate: f64,
    #[arg(long)]
    pub start_year: Option<i32>,
}

impl Default for FireArgs {
    fn default() -> Self {
        Self {
            current_age: DEFAULT_CURRENT_AGE,
            current_savings: DEFAULT_CURRENT_SAVINGS,
            annual_expenses: DEFAULT_ANNUAL_EXPENSES,
            annual_savings: DEFAULT_ANNUAL_SAVINGS,
            expected_return: DEFAULT_ANNUAL_RATE,
            withdrawal_rate: DEFAULT_WITHDRAWAL_RATE,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            inflation_rate: DEFAULT_INFLATION_RATE,
            start_year: None,
        }
    }
}

impl FireArgs {
    pub fn to_input(&self) -> FireInputs {
        FireInputs {
            current_age: self.current_age,
            annual_expenses: self.annual_expenses,
            annual_savings: self.annual_savings,
            withdrawal_rate_percent: self.withdrawal_rate,
            safety_margin_percent: self.safety_margin,
            current_savings: self.current_savings,
            expected_return_percent: self.expected_return,
            inflation_rate_percent: self.inflation_rate,
            start_year: self.start_year.unwrap_or_else(current_year),
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct WithdrawalArgs {
    #[arg(long, default_value_t = DEFAULT_INITIAL_PORTFOLIO)]
    pub initial_portfolio: f64,
    #[arg(long, default_value_t = DEFAULT_ANNUAL_EXPENSES)]
    pub annual_expenses: f64,
    #[arg(long, default_value_t = DEFAULT_WITHDRAWAL_RATE)]
    pub withdrawal_rate: f64,
    #[arg(long, default_value_t = DEFAULT_ANNUAL_RATE)]
    pub expected_return: f64,
    #[arg(long, default_value_t = DEFAULT_INFLATION_RATE)]
    pub inflation_rate: f64,
    #[arg(
        long,
        default_value = "constantDollar",
        help = "constantDollar, constantPercentage or percentageOfPortfolio"
    )]
    pub strategy: String,
    #[arg(long, default_value_t = DEFAULT_WITHDRAWAL_YEARS)]
    pub years: u32,
    #[arg(long)]
    pub start_year: Option<i32>,
}

impl Default for WithdrawalArgs {
    fn default() -> Self {
        Self {
            initial_portfolio: DEFAULT_INITIAL_PORTFOLIO,
            annual_expenses: DEFAULT_ANNUAL_EXPENSES,
            withdrawal_rate: DEFAULT_WITHDRAWAL_RATE,
            expected_return: DEFAULT_ANNUAL_RATE,
            inflation_rate: DEFAULT_INFLATION_RATE,
            strategy: WithdrawalStrategy::default().to_string(),
            years: DEFAULT_WITHDRAWAL_YEARS,
            start_year: None,
        }
    }
}

impl WithdrawalArgs {
    /// Fails only on an unrecognised strategy name; numeric checks happen in
    /// the engine.
    pub fn to_input(&self) -> Result<WithdrawalInput, ValidationError> {
        Ok(WithdrawalInput {
            initial_portfolio: self.initial_portfolio,
            annual_expenses: self.annual_expenses,
            withdrawal_rate_percent: self.withdrawal_rate,
            expected_return_percent: self.expected_return,
            inflation_rate_percent: self.inflation_rate,
            strategy: self.strategy.parse()?,
            years: self.years,
            start_year: self.start_year.unwrap_or_else(current_year),
        })
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct SustainabilityArgs {
    #[arg(long, default_value_t = DEFAULT_INITIAL_PORTFOLIO)]
    pub initial_portfolio: f64,
    #[arg(long, default_value_t = DEFAULT_ANNUAL_EXPENSES)]
    pub annual_expenses: f64,
    #[arg(long, default_value_t = DEFAULT_WITHDRAWAL_RATE)]
    pub withdrawal_rate: f64,
    #[arg(long, default_value_t = DEFAULT_INFLATION_RATE)]
    pub inflation_rate: f64,
    #[arg(long, default_value_t = DEFAULT_SUSTAINABILITY_YEARS)]
    pub years: u32,
    #[arg(
        long = "scenario",
        value_parser = parse_return_scenario,
        help = "NAME:RETURN:PROBABILITY, repeatable"
    )]
    pub scenarios: Vec<ReturnScenario>,
    #[arg(long)]
    pub start_year: Option<i32>,
}

impl Default for SustainabilityArgs {
    fn default() -> Self {
        Self {
            initial_portfolio: DEFAULT_INITIAL_PORTFOLIO,
            annual_expenses: DEFAULT_ANNUAL_EXPENSES,
            withdrawal_rate: DEFAULT_WITHDRAWAL_RATE,
            inflation_rate: DEFAULT_INFLATION_RATE,
            years: DEFAULT_SUSTAINABILITY_YEARS,
            scenarios: Vec::new(),
            start_year: None,
        }
    }
}

impl SustainabilityArgs {
    pub fn to_input(&self) -> SustainabilityInput {
        SustainabilityInput {
            initial_portfolio: self.initial_portfolio,
            annual_expenses: self.annual_expenses,
            withdrawal_rate_percent: self.withdrawal_rate,
            scenarios: if self.scenarios.is_empty() {
                default_return_scenarios()
            } else {
                self.scenarios.clone()
            },
            inflation_rate_percent: self.inflation_rate,
            simulation_years: self.years,
            start_year: self.start_year.unwrap_or_else(current_year),
        }
    }
}

pub fn default_return_scenarios() -> Vec<ReturnScenario> {
    [("pessimistic", 4.0, 0.25), ("baseline", 7.0, 0.5), ("optimistic", 10.0, 0.25)]
        .into_iter()
        .map(|(name, return_rate_percent, probability)| ReturnScenario {
            name: name.to_string(),
            return_rate_percent,
            probability,
        })
        .collect()
}

fn split_fields<const N: usize>(raw: &str, shape: &str) -> Result<[String; N], String> {
    let parts: Vec<String> = raw.split(':').map(|part| part.trim().to_string()).collect();
    parts
        .try_into()
        .map_err(|_| format!("expected {shape}, got {raw:?}"))
}

fn parse_number(raw: &str, what: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .map_err(|_| format!("{what} must be a number, got {raw:?}"))
}

pub fn parse_leg(raw: &str) -> Result<AllocationLeg, String> {
    let [kind, percentage, expected_return] = split_fields::<3>(raw, "TYPE:PERCENT:RETURN")?;
    if kind.is_empty() {
        return Err("allocation type must not be empty".to_string());
    }
    Ok(AllocationLeg {
        kind,
        percentage: parse_number(&percentage, "percentage")?,
        expected_return_percent: parse_number(&expected_return, "return")?,
    })
}

pub fn parse_return_scenario(raw: &str) -> Result<ReturnScenario, String> {
    let [name, rate, probability] = split_fields::<3>(raw, "NAME:RETURN:PROBABILITY")?;
    Ok(ReturnScenario {
        name,
        return_rate_percent: parse_number(&rate, "return")?,
        probability: parse_number(&probability, "probability")?,
    })
}

pub fn parse_rate_scenario(raw: &str) -> Result<(String, f64), String> {
    let [name, rate] = split_fields::<2>(raw, "NAME:RATE")?;
    Ok((name, parse_number(&rate, "rate")?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectionPayload {
    pub principal: Option<f64>,
    pub monthly_contribution: Option<f64>,
    pub annual_rate: Option<f64>,
    pub years: Option<u32>,
    pub inflation_rate: Option<f64>,
    pub adjust_for_inflation: Option<bool>,
    pub start_year: Option<i32>,
    pub tax_rate: Option<f64>,
}

impl ProjectionPayload {
    pub fn apply(self, args: &mut ProjectionArgs) {
        if let Some(v) = self.principal {
            args.principal = v;
        }
        if let Some(v) = self.monthly_contribution {
            args.monthly_contribution = v;
        }
        if let Some(v) = self.annual_rate {
            args.annual_rate = v;
        }
        if let Some(v) = self.years {
            args.years = v;
        }
        if let Some(v) = self.inflation_rate {
            args.inflation_rate = v;
        }
        if let Some(v) = self.adjust_for_inflation {
            args.no_inflation_adjustment = !v;
        }
        if let Some(v) = self.start_year {
            args.start_year = Some(v);
        }
    }

    pub fn into_after_tax_args(self) -> AfterTaxArgs {
        let mut args = AfterTaxArgs::default();
        if let Some(v) = self.tax_rate {
            args.tax_rate = v;
        }
        self.apply(&mut args.projection);
        args
    }
}

pub fn projection_args_from_payload(payload: ProjectionPayload) -> ProjectionArgs {
    let mut args = ProjectionArgs::default();
    payload.apply(&mut args);
    args
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedProjectionPayload {
    pub name: String,
    #[serde(flatten)]
    pub projection: ProjectionPayload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComparePayload {
    pub scenarios: Vec<NamedProjectionPayload>,
}

impl ComparePayload {
    /// Scenario comparisons are always reported in today's money.
    pub fn into_scenarios(self) -> Vec<NamedProjection> {
        self.scenarios
            .into_iter()
            .map(|scenario| {
                let mut input = projection_args_from_payload(scenario.projection).to_input();
                input.adjust_for_inflation = true;
                NamedProjection {
                    name: scenario.name,
                    input,
                }
            })
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MixedPayload {
    pub principal: Option<f64>,
    pub monthly_contribution: Option<f64>,
    pub years: Option<u32>,
    pub inflation_rate: Option<f64>,
    #[serde(alias = "allocation")]
    pub legs: Option<Vec<AllocationLeg>>,
    pub start_year: Option<i32>,
}

pub fn mixed_args_from_payload(payload: MixedPayload) -> MixedArgs {
    let mut args = MixedArgs::default();
    if let Some(v) = payload.principal {
        args.principal = v;
    }
    if let Some(v) = payload.monthly_contribution {
        args.monthly_contribution = v;
    }
    if let Some(v) = payload.years {
        args.years = v;
    }
    if let Some(v) = payload.inflation_rate {
        args.inflation_rate = v;
    }
    if let Some(v) = payload.legs {
        args.legs = v;
    }
    if let Some(v) = payload.start_year {
        args.start_year = Some(v);
    }
    args
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FirePayload {
    pub current_age: Option<f64>,
    pub current_savings: Option<f64>,
    pub annual_expenses: Option<f64>,
    pub annual_savings: Option<f64>,
    #[serde(alias = "expectedReturnRate")]
    pub expected_return: Option<f64>,
    pub withdrawal_rate: Option<f64>,
    pub safety_margin: Option<f64>,
    pub inflation_rate: Option<f64>,
    pub start_year: Option<i32>,
}

pub fn fire_args_from_payload(payload: FirePayload) -> FireArgs {
    let mut args = FireArgs::default();
    if let Some(v) = payload.current_age {
        args.current_age = v;
    }
    if let Some(v) = payload.current_savings {
        args.current_savings = v;
    }
    if let Some(v) = payload.annual_expenses {
        args.annual_expenses = v;
    }
    if let Some(v) = payload.annual_savings {
        args.annual_savings = v;
    }
    if let Some(v) = payload.expected_return {
        args.expected_return = v;
    }
    if let Some(v) = payload.withdrawal_rate {
        args.withdrawal_rate = v;
    }
    if let Some(v) = payload.safety_margin {
        args.safety_margin = v;
    }
    if let Some(v) = payload.inflation_rate {
        args.inflation_rate = v;
    }
    if let Some(v) = payload.start_year {
        args.start_year = Some(v);
    }
    args
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WithdrawalPayload {
    pub initial_portfolio: Option<f64>,
    pub annual_expenses: Option<f64>,
    pub withdrawal_rate: Option<f64>,
    #[serde(alias = "expectedReturnRate")]
    pub expected_return: Option<f64>,
    pub inflation_rate: Option<f64>,
    pub strategy: Option<String>,
    pub years: Option<u32>,
    pub start_year: Option<i32>,
}

pub fn withdrawal_args_from_payload(payload: WithdrawalPayload) -> WithdrawalArgs {
    let mut args = WithdrawalArgs::default();
    if let Some(v) = payload.initial_portfolio {
        args.initial_portfolio = v;
    }
    if let Some(v) = payload.annual_expenses {
        args.annual_expenses = v;
    }
    if let Some(v) = payload.withdrawal_rate {
        args.withdrawal_rate = v;
    }
    if let Some(v) = payload.expected_return {
        args.expected_return = v;
    }
    if let Some(v) = payload.inflation_rate {
        args.inflation_rate = v;
    }
    if let Some(v) = payload.strategy {
        args.strategy = v;
    }
    if let Some(v) = payload.years {
        args.years = v;
    }
    if let Some(v) = payload.start_year {
        args.start_year = Some(v);
    }
    args
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SustainabilityPayload {
    pub initial_portfolio: Option<f64>,
    pub annual_expenses: Option<f64>,
    pub withdrawal_rate: Option<f64>,
    pub inflation_rate: Option<f64>,
    #[serde(alias = "simulationYears")]
    pub years: Option<u32>,
    #[serde(alias = "returnRateScenarios")]
    pub scenarios: Option<Vec<ReturnScenario>>,
    pub start_year: Option<i32>,
}

pub fn sustainability_args_from_payload(payload: SustainabilityPayload) -> SustainabilityArgs {
    let mut args = SustainabilityArgs::default();
    if let Some(v) = payload.initial_portfolio {
        args.initial_portfolio = v;
    }
    if let Some(v) = payload.annual_expenses {
        args.annual_expenses = v;
    }
    if let Some(v) = payload.withdrawal_rate {
        args.withdrawal_rate = v;
    }
    if let Some(v) = payload.inflation_rate {
        args.inflation_rate = v;
    }
    if let Some(v) = payload.years {
        args.years = v;
    }
    if let Some(v) = payload.scenarios {
        args.scenarios = v;
    }
    if let Some(v) = payload.start_year {
        args.start_year = Some(v);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn projection_payload_overrides_only_given_fields() {
        let payload: ProjectionPayload = serde_json::from_str(
            r#"{"principal": 5000, "years": 3, "adjustForInflation": false, "startYear": 2030}"#,
        )
        .expect("json should parse");
        let input = projection_args_from_payload(payload).to_input();

        assert_approx(input.principal, 5_000.0);
        assert_approx(input.monthly_contribution, DEFAULT_MONTHLY_CONTRIBUTION);
        assert_approx(input.annual_rate_percent, DEFAULT_ANNUAL_RATE);
        assert_eq!(input.years, 3);
        assert!(!input.adjust_for_inflation);
        assert_eq!(input.start_year, 2030);
    }

    #[test]
    fn after_tax_payload_carries_tax_rate() {
        let payload: ProjectionPayload =
            serde_json::from_str(r#"{"taxRate": 30}"#).expect("json should parse");
        let args = payload.into_after_tax_args();
        assert_approx(args.tax_rate, 30.0);
        assert_eq!(args.projection, ProjectionArgs::default());
    }

    #[test]
    fn withdrawal_payload_parses_strategy_and_rejects_unknown() {
        let payload: WithdrawalPayload = serde_json::from_str(
            r#"{"strategy": "percentageOfPortfolio", "expectedReturnRate": 5, "years": 40}"#,
        )
        .expect("json should parse");
        let input = withdrawal_args_from_payload(payload)
            .to_input()
            .expect("known strategy");
        assert_eq!(input.strategy, WithdrawalStrategy::PercentageOfPortfolio);
        assert_approx(input.expected_return_percent, 5.0);
        assert_eq!(input.years, 40);

        let payload: WithdrawalPayload =
            serde_json::from_str(r#"{"strategy": "bogus"}"#).expect("json should parse");
        let err = withdrawal_args_from_payload(payload)
            .to_input()
            .expect_err("unknown strategy must be rejected");
        assert_eq!(err, ValidationError::UnknownStrategy("bogus".to_string()));
    }

    #[test]
    fn mixed_payload_accepts_allocation_alias_with_type_key() {
        let payload: MixedPayload = serde_json::from_str(
            r#"{"allocation": [
                {"type": "stocks", "percentage": 80, "expectedReturnPercent": 9},
                {"type": "bonds", "percentage": 20, "expectedReturnPercent": 3}
            ]}"#,
        )
        .expect("json should parse");
        let input = mixed_args_from_payload(payload).to_input();
        assert_eq!(input.legs.len(), 2);
        assert_eq!(input.legs[0].kind, "stocks");
        assert_approx(input.legs[1].expected_return_percent, 3.0);
    }

    #[test]
    fn missing_legs_fall_back_to_default_mix() {
        let input = MixedArgs::default().to_input();
        let total: f64 = input.legs.iter().map(|leg| leg.percentage).sum();
        assert_approx(total, 100.0);
    }

    #[test]
    fn sustainability_defaults_to_three_weighted_scenarios() {
        let input = SustainabilityArgs::default().to_input();
        assert_eq!(input.scenarios.len(), 3);
        let total: f64 = input.scenarios.iter().map(|s| s.probability).sum();
        assert_approx(total, 1.0);
        assert_eq!(input.simulation_years, DEFAULT_SUSTAINABILITY_YEARS);
    }

    #[test]
    fn fire_payload_maps_source_field_names() {
        let payload: FirePayload = serde_json::from_str(
            r#"{"currentAge": 40, "expectedReturnRate": 6, "safetyMargin": 0}"#,
        )
        .expect("json should parse");
        let input = fire_args_from_payload(payload).to_input();
        assert_approx(input.current_age, 40.0);
        assert_approx(input.expected_return_percent, 6.0);
        assert_approx(input.safety_margin_percent, 0.0);
        assert_approx(input.annual_expenses, DEFAULT_ANNUAL_EXPENSES);
    }

    #[test]
    fn compare_payload_forces_inflation_adjustment() {
        let payload: ComparePayload = serde_json::from_str(
            r#"{"scenarios": [{"name": "a", "annualRate": 5, "adjustForInflation": false}]}"#,
        )
        .expect("json should parse");
        let scenarios = payload.into_scenarios();
        assert_eq!(scenarios[0].name, "a");
        assert!(scenarios[0].input.adjust_for_inflation);
        assert_approx(scenarios[0].input.annual_rate_percent, 5.0);
    }

    #[test]
    fn cli_value_parsers_split_on_colons() {
        let leg = parse_leg("stocks:60:8.5").expect("valid leg");
        assert_eq!(leg.kind, "stocks");
        assert_approx(leg.percentage, 60.0);
        assert_approx(leg.expected_return_percent, 8.5);
        assert!(parse_leg("stocks:60").is_err());
        assert!(parse_leg(":60:8").is_err());

        let scenario = parse_return_scenario("bear:2:0.3").expect("valid scenario");
        assert_eq!(scenario.name, "bear");
        assert_approx(scenario.probability, 0.3);
        assert!(parse_return_scenario("bear:x:0.3").is_err());

        assert_eq!(
            parse_rate_scenario("bull:11").expect("valid"),
            ("bull".to_string(), 11.0)
        );
    }

    #[test]
    fn compare_args_default_to_two_rate_scenarios() {
        let args = CompareArgs {
            projection: ProjectionArgs::default(),
            scenarios: Vec::new(),
        };
        let scenarios = args.to_scenarios();
        assert_eq!(scenarios.len(), 2);
        assert_approx(scenarios[1].input.annual_rate_percent, 10.0);
    }
}
