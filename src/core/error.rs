use thiserror::Error;

/// Rejected engine input. Raised before any computation runs, so a caller
/// never sees a partial result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("{field} must be >= 0")]
    Negative { field: &'static str },
    #[error("{field} must be > 0")]
    NotPositive { field: &'static str },
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("years must be between 1 and {max}, got {years}")]
    YearsOutOfRange { years: u32, max: u32 },
    #[error("startYear must be between {min} and {max}, got {start_year}")]
    StartYearOutOfRange { start_year: i32, min: i32, max: i32 },
    #[error("allocation must contain at least one leg")]
    EmptyAllocation,
    #[error("allocation percentages must sum to 100, got {total}")]
    AllocationSum { total: f64 },
    #[error("allocation type {0:?} appears more than once")]
    DuplicateLeg(String),
    #[error("projection has no yearly snapshots")]
    EmptyProjection,
    #[error("at least one return scenario is required")]
    NoScenarios,
    #[error("unknown withdrawal strategy {0:?}")]
    UnknownStrategy(String),
}

pub(crate) fn finite(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NotFinite { field })
    }
}

pub(crate) fn non_negative(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if finite(field, value)? < 0.0 {
        return Err(ValidationError::Negative { field });
    }
    Ok(value)
}

pub(crate) fn positive(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if finite(field, value)? <= 0.0 {
        return Err(ValidationError::NotPositive { field });
    }
    Ok(value)
}

/// Rates are whole-number percentages; anything at or below -100% would
/// wipe out (or invert) the balance in a single period.
pub(crate) fn rate_percent(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if finite(field, value)? <= -100.0 {
        return Err(ValidationError::OutOfRange {
            field,
            min: -100.0,
            max: f64::INFINITY,
        });
    }
    Ok(value)
}

pub(crate) fn within(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<f64, ValidationError> {
    if !(min..=max).contains(&finite(field, value)?) {
        return Err(ValidationError::OutOfRange { field, min, max });
    }
    Ok(value)
}

pub(crate) fn years_in_range(years: u32, max: u32) -> Result<u32, ValidationError> {
    if years == 0 || years > max {
        return Err(ValidationError::YearsOutOfRange { years, max });
    }
    Ok(years)
}

/// Calendar years a simulation may start in. Year labels are built by
/// adding at most a few hundred years, so this keeps them far from `i32`
/// overflow.
pub(crate) const MIN_START_YEAR: i32 = 1;
pub(crate) const MAX_START_YEAR: i32 = 9_999;

pub(crate) fn start_year_in_range(start_year: i32) -> Result<i32, ValidationError> {
    if !(MIN_START_YEAR..=MAX_START_YEAR).contains(&start_year) {
        return Err(ValidationError::StartYearOutOfRange {
            start_year,
            min: MIN_START_YEAR,
            max: MAX_START_YEAR,
        });
    }
    Ok(start_year)
}
