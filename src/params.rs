//! Parameter metadata for rules
//!
//! Lets callers discover a rule's tunable parameters, build rules from a
//! name → value map, and enumerate grids for optimization sweeps.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use tarules::prelude::*;
//!
//! let closes = vec![1.0, 1.5, 1.4, 2.0, 2.2];
//! let meta = IsRisingRule::<Vec<f64>>::param_meta();
//!
//! for time_frame in meta[0].generate_grid().into_iter().take(3) {
//!   let mut params = HashMap::new();
//!   params.insert("time_frame", time_frame);
//!   params.insert("rising_factor", 0.5);
//!   let rule = IsRisingRule::with_params(&closes, &params).unwrap();
//!   println!("tf={} -> {:?}", time_frame, satisfied_indices(&rule, 0..closes.len(), &NoTrades));
//! }
//! ```

use std::collections::HashMap;

use crate::{Period, Ratio, Result, RuleError};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Fraction in 0.0..=1.0
  Ratio,
  /// Bar count (positive integer)
  Period,
}

/// Metadata for a single rule parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "time_frame")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  /// All grid values from min to max inclusive.
  ///
  /// Values are computed as `min + k * step` so the sweep does not drift.
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    if step <= 0.0 || max < min {
      return vec![min];
    }
    let steps = ((max - min) / step + 1e-9).floor() as usize;
    (0..=steps).map(|k| (min + k as f64 * step).min(max)).collect()
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value.is_nan() || value < min || value > max {
      return Err(RuleError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ratio::new(value).map(|_| ()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(RuleError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
    }
  }
}

// ============================================================
// PARAMETERIZED RULE TRAIT
// ============================================================

/// Rules that can be built from named parameters
pub trait ParameterizedRule: Sized {
  /// What the rule reads (usually the indicator)
  type Source;

  /// Metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Build the rule; missing parameters use their defaults.
  fn with_params(source: Self::Source, params: &HashMap<&str, f64>) -> Result<Self>;

  fn rule_id_str() -> &'static str;

  /// Reject names that are not in [`param_meta`](Self::param_meta)
  fn check_known(params: &HashMap<&str, f64>) -> Result<()> {
    let meta = Self::param_meta();
    match params.keys().find(|name| !meta.iter().any(|m| m.name == **name)) {
      Some(name) => {
        Err(RuleError::UnknownParameter { rule: Self::rule_id_str(), name: name.to_string() })
      },
      None => Ok(()),
    }
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Period from params with default fallback; fractional values are rejected
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
    return Err(RuleError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

// ============================================================
// TESTS
// ============================================================
