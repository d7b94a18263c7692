mod engine;
mod error;
mod solver;
mod types;
mod withdrawal;

pub use engine::{
    ALLOCATION_TOLERANCE, MAX_SIMULATION_MONTHS, MAX_SIMULATION_YEARS, MONTHS_PER_YEAR,
    apply_after_tax_adjustment, compare_projections, simulate_compound_growth,
    simulate_mixed_allocation, validate_allocation,
};
pub use error::ValidationError;
pub use solver::{RETIREMENT_HORIZON_YEARS, fire_number, fire_timeline, plan_fire, years_to_fire};
pub use types::{
    AfterTaxResult, AllocationLeg, FireInputs, FirePlan, FireTimeline, LegTerminalValue,
    LegValue, MixedAllocationInput, MixedProjectionResult, MixedYearSnapshot, NamedProjection,
    NamedProjectionResult, ProjectionInput, ProjectionResult, ReturnScenario, ScenarioOutcome,
    SustainabilityInput, SustainabilityResult, TaxedYearSnapshot, WithdrawalInput,
    WithdrawalSimulationResult, WithdrawalStrategy, WithdrawalYearRecord, YearlySnapshot,
};
pub use withdrawal::{GUARDRAIL_CEILING, GUARDRAIL_FLOOR, analyze_sustainability, simulate_withdrawal};
