//! Indicator-rising rule
//!
//! Satisfied when the indicator rose on at least `rising_factor` of the bars
//! in a trailing window of `time_frame` bars (the current bar included).
//!
//! A bar counts as rising when its value is strictly greater than the value
//! of the bar before it. The comparison index is clamped at 0, so bar 0 is
//! compared with itself and never counts. The ratio is taken over the
//! configured `time_frame` even when the window is cut short by the start
//! of the series, which penalizes early bars. [`WindowDenominator::Available`]
//! divides by the bars actually inspected instead.

use std::collections::HashMap;

use crate::params::{get_period, get_ratio, ParamMeta, ParamType, ParameterizedRule};
use crate::{Indicator, Period, Result, Rule, RuleError, RuleId, TradingRecord};

// ============================================================
// CONFIGURATION
// ============================================================

/// Minimum fraction of rising bars, normalized into (0, 0.99].
///
/// Anything at or above 1.0 becomes [`RisingFactor::STRICT`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct RisingFactor(f64);

impl RisingFactor {
    pub const STRICT: f64 = 0.99;

    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(RuleError::InvalidConfiguration {
                field: "rising_factor",
                reason: "must be finite",
            });
        }
        if value <= 0.0 {
            return Err(RuleError::InvalidConfiguration {
                field: "rising_factor",
                reason: "must be > 0",
            });
        }
        if value >= 1.0 {
            tracing::debug!(
                requested = value,
                normalized = Self::STRICT,
                "rising factor clamped to strict"
            );
            return Ok(Self(Self::STRICT));
        }
        Ok(Self(value))
    }

    pub const fn strict() -> Self {
        Self(Self::STRICT)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for RisingFactor {
    fn default() -> Self {
        Self::strict()
    }
}

impl serde::Serialize for RisingFactor {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for RisingFactor {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        RisingFactor::new(value).map_err(serde::de::Error::custom)
    }
}

/// Divisor used for the rising ratio
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowDenominator {
    /// Always the configured `time_frame`
    #[default]
    TimeFrame,
    /// Number of bars in the window after clamping to the series start
    Available,
}

/// Immutable rising rule configuration
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RisingConfig {
    pub time_frame: Period,
    #[serde(default)]
    pub rising_factor: RisingFactor,
    #[serde(default)]
    pub denominator: WindowDenominator,
}

impl RisingConfig {
    pub fn new(time_frame: usize, rising_factor: f64) -> Result<Self> {
        Ok(Self {
            time_frame: Period::new(time_frame)?,
            rising_factor: RisingFactor::new(rising_factor)?,
            denominator: WindowDenominator::TimeFrame,
        })
    }

    pub fn strict(time_frame: usize) -> Result<Self> {
        Self::new(time_frame, 1.0)
    }

    pub fn with_denominator(mut self, denominator: WindowDenominator) -> Self {
        self.denominator = denominator;
        self
    }
}

// ============================================================
// RULE
// ============================================================

/// IS_RISING - indicator rose on enough bars of the trailing window
#[derive(Debug, Clone)]
pub struct IsRisingRule<I> {
    indicator: I,
    config: RisingConfig,
}

impl<I: Indicator> IsRisingRule<I> {
    /// `time_frame` must be > 0; `rising_factor` must be > 0 and is clamped
    /// to 0.99 when >= 1.
    pub fn new(indicator: I, time_frame: usize, rising_factor: f64) -> Result<Self> {
        Ok(Self::with_config(indicator, RisingConfig::new(time_frame, rising_factor)?))
    }

    /// Strict rising: rising factor of 1, normalized to 0.99
    pub fn strict(indicator: I, time_frame: usize) -> Result<Self> {
        Ok(Self::with_config(indicator, RisingConfig::strict(time_frame)?))
    }

    pub fn with_config(indicator: I, config: RisingConfig) -> Self {
        Self { indicator, config }
    }

    pub fn config(&self) -> &RisingConfig {
        &self.config
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    /// First bar of the window ending at `index`
    #[inline]
    fn window_start(&self, index: usize) -> usize {
        (index + 1).saturating_sub(self.config.time_frame.get())
    }

    /// Bars in the window ending at `index` whose value beat the previous bar
    pub fn rising_count(&self, index: usize) -> usize {
        (self.window_start(index)..=index)
            .rev()
            .filter(|&i| self.indicator.value(i) > self.indicator.value(i.saturating_sub(1)))
            .count()
    }

    /// `rising_count` over the configured denominator, in [0, 1]
    pub fn rising_ratio(&self, index: usize) -> f64 {
        let denominator = match self.config.denominator {
            WindowDenominator::TimeFrame => self.config.time_frame.get(),
            WindowDenominator::Available => index + 1 - self.window_start(index),
        };
        self.rising_count(index) as f64 / denominator as f64
    }
}

impl<I: Indicator + Send + Sync> Rule for IsRisingRule<I> {
    fn id(&self) -> RuleId {
        RuleId(Self::rule_id_str())
    }

    fn is_satisfied(&self, index: usize, _record: &dyn TradingRecord) -> bool {
        self.rising_ratio(index) >= self.config.rising_factor.get()
    }
}

// ============================================================
// PARAMETER METADATA
// ============================================================

static IS_RISING_PARAMS: &[ParamMeta] = &[
    ParamMeta {
        name: "time_frame",
        param_type: ParamType::Period,
        default: 5.0,
        range: (2.0, 30.0, 1.0),
        description: "Trailing window length in bars, current bar included",
    },
    ParamMeta {
        name: "rising_factor",
        param_type: ParamType::Ratio,
        default: 1.0,
        range: (0.5, 1.0, 0.05),
        description: "Minimum fraction of rising bars; 1.0 means strict (0.99)",
    },
];

impl<I: Indicator> ParameterizedRule for IsRisingRule<I> {
    type Source = I;

    fn param_meta() -> &'static [ParamMeta] {
        IS_RISING_PARAMS
    }

    fn with_params(indicator: I, params: &HashMap<&str, f64>) -> Result<Self> {
        Self::check_known(params)?;
        let time_frame = get_period(params, "time_frame", 5)?;
        let rising_factor = RisingFactor::new(get_ratio(params, "rising_factor", 1.0)?.get())?;
        Ok(Self::with_config(
            indicator,
            RisingConfig {
                time_frame,
                rising_factor,
                denominator: WindowDenominator::TimeFrame,
            },
        ))
    }

    fn rule_id_str() -> &'static str {
        "IS_RISING"
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoTrades;

    fn satisfied<I: Indicator + Send + Sync>(rule: &IsRisingRule<I>, index: usize) -> bool {
        rule.is_satisfied(index, &NoTrades)
    }

    #[test]
    fn test_strictly_rising_window() {
        let series = [1.0, 2.0, 3.0, 4.0, 5.0];
        let rule = IsRisingRule::new(&series[..], 3, 1.0).unwrap();

        assert_eq!(rule.rising_count(4), 3);
        assert_eq!(rule.rising_ratio(4), 1.0);
        assert!(satisfied(&rule, 4));
    }

    #[test]
    fn test_index_zero_never_satisfied() {
        let series = [5.0, 6.0, 7.0];
        for time_frame in 1..=4 {
            for factor in [0.01, 0.5, 1.0] {
                let rule = IsRisingRule::new(&series[..], time_frame, factor).unwrap();
                assert_eq!(rule.rising_count(0), 0);
                assert!(!satisfied(&rule, 0));
            }
        }
    }

    #[test]
    fn test_single_bar_window() {
        let series = [3.0, 4.0, 4.0, 2.0, 5.0];
        let rule = IsRisingRule::strict(&series[..], 1).unwrap();

        let results: Vec<bool> = (0..series.len()).map(|i| satisfied(&rule, i)).collect();
        assert_eq!(results, vec![false, true, false, false, true]);
    }

    #[test]
    fn test_truncated_window_uses_configured_time_frame() {
        // Window at index 2 with time_frame 5 is bars 0..=2: two rises out of 5
        let series = [1.0, 2.0, 3.0, 4.0];
        let rule = IsRisingRule::new(&series[..], 5, 0.5).unwrap();

        assert_eq!(rule.rising_count(2), 2);
        assert!((rule.rising_ratio(2) - 0.4).abs() < f64::EPSILON);
        assert!(!satisfied(&rule, 2));
    }

    #[test]
    fn test_available_denominator() {
        let series = [1.0, 2.0, 3.0, 4.0];
        let config = RisingConfig::new(5, 0.5)
            .unwrap()
            .with_denominator(WindowDenominator::Available);
        let rule = IsRisingRule::with_config(&series[..], config);

        assert!((rule.rising_ratio(2) - 2.0 / 3.0).abs() < f64::EPSILON);
        assert!(satisfied(&rule, 2));
        // Index 0 still never rises
        assert_eq!(rule.rising_ratio(0), 0.0);
    }

    #[test]
    fn test_partial_rising_factor() {
        // Rises at 1, 2, 4; flat at 3; falls at 5
        let series = [10.0, 11.0, 12.0, 12.0, 13.0, 12.5];
        let loose = IsRisingRule::new(&series[..], 5, 0.6).unwrap();
        let tight = IsRisingRule::new(&series[..], 5, 0.8).unwrap();

        assert_eq!(loose.rising_count(5), 3);
        assert!(satisfied(&loose, 5));
        assert!(!satisfied(&tight, 5));
    }

    #[test]
    fn test_factor_normalization() {
        assert_eq!(RisingFactor::new(1.0).unwrap().get(), RisingFactor::STRICT);
        assert_eq!(RisingFactor::new(3.5).unwrap().get(), RisingFactor::STRICT);
        assert_eq!(RisingFactor::new(0.75).unwrap().get(), 0.75);
        assert_eq!(RisingFactor::default(), RisingFactor::strict());
    }

    #[test]
    fn test_invalid_configuration() {
        let series = [1.0, 2.0];
        assert!(matches!(
            IsRisingRule::new(&series[..], 0, 0.5),
            Err(RuleError::InvalidConfiguration {
                field: "time_frame",
                ..
            })
        ));
        for factor in [0.0, -0.2, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                RisingFactor::new(factor),
                Err(RuleError::InvalidConfiguration {
                    field: "rising_factor",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_record_is_ignored() {
        struct OpenPosition;

        impl TradingRecord for OpenPosition {
            fn trade_count(&self) -> usize {
                3
            }

            fn is_closed(&self) -> bool {
                false
            }

            fn last_entry_index(&self) -> Option<usize> {
                Some(2)
            }
        }

        let series = [1.0, 2.0, 3.0];
        let rule = IsRisingRule::strict(&series[..], 2).unwrap();
        assert_eq!(
            rule.is_satisfied(2, &OpenPosition),
            rule.is_satisfied(2, &NoTrades)
        );
    }

    #[test]
    fn test_integer_indicator() {
        let volumes: Vec<u64> = vec![100, 120, 90, 130, 140];
        let rule = IsRisingRule::new(volumes, 4, 0.75).unwrap();
        assert_eq!(rule.rising_count(4), 3);
        assert!(satisfied(&rule, 4));
        assert_eq!(rule.id(), RuleId("IS_RISING"));
    }

    #[test]
    fn test_config_serde() {
        let config: RisingConfig =
            serde_json::from_str(r#"{"time_frame": 4, "rising_factor": 0.7}"#).unwrap();
        assert_eq!(config.time_frame.get(), 4);
        assert_eq!(config.rising_factor.get(), 0.7);
        assert_eq!(config.denominator, WindowDenominator::TimeFrame);

        let strict: RisingConfig =
            serde_json::from_str(r#"{"time_frame": 3, "denominator": "available"}"#).unwrap();
        assert_eq!(strict.rising_factor.get(), RisingFactor::STRICT);
        assert_eq!(strict.denominator, WindowDenominator::Available);

        assert!(serde_json::from_str::<RisingConfig>(r#"{"time_frame": 0}"#).is_err());
        assert!(
            serde_json::from_str::<RisingConfig>(r#"{"time_frame": 3, "rising_factor": 0}"#)
                .is_err()
        );

        let json = serde_json::to_string(&RisingConfig::strict(2).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"time_frame":2,"rising_factor":0.99,"denominator":"time_frame"}"#
        );
    }

    #[test]
    fn test_with_params() {
        let series = vec![1.0, 2.0, 3.0];
        let mut params = HashMap::new();
        params.insert("time_frame", 2.0);
        params.insert("rising_factor", 0.5);

        let rule = IsRisingRule::with_params(&series, &params).unwrap();
        assert_eq!(rule.config().time_frame.get(), 2);
        assert_eq!(rule.config().rising_factor.get(), 0.5);

        let defaults = IsRisingRule::with_params(&series, &HashMap::new()).unwrap();
        assert_eq!(defaults.config().time_frame.get(), 5);
        assert_eq!(defaults.config().rising_factor.get(), RisingFactor::STRICT);

        params.insert("lookback", 3.0);
        assert!(matches!(
            IsRisingRule::with_params(&series, &params),
            Err(RuleError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn test_param_meta_defaults_build() {
        for meta in IsRisingRule::<Vec<f64>>::param_meta() {
            assert!(meta.validate(meta.default).is_ok(), "{}", meta.name);
        }
    }
}
