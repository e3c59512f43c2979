//! # tarules - Technical-analysis trading rules
//!
//! Index-addressable trading rules: predicates answering "is this condition
//! true at bar `i`?" over an indicator series.
//!
//! Rules are pure and emit nothing on their own. Tracing is opt-in: wrap a
//! rule with [`RuleExt::traced`] to send every `(rule, index, satisfied)`
//! result to a [`trace::TraceSink`], or with [`RuleExt::logged`] to emit a
//! `TRACE` level `tracing` event per evaluation.
//!
//! ## Quick Start
//!
//! ```rust
//! use tarules::prelude::*;
//!
//! // Any slice of comparable values is an indicator
//! let closes = vec![10.0, 10.5, 11.0, 10.8, 11.4, 11.9];
//!
//! // Satisfied when at least 60% of the last 5 bars rose
//! let rule = IsRisingRule::new(&closes, 5, 0.6).unwrap();
//! assert!(rule.is_satisfied(5, &NoTrades));
//!
//! // Record every evaluation in a bounded trace log
//! let log = TraceLog::with_capacity(16);
//! let traced = rule.traced(&log);
//! let hits: Vec<usize> = satisfied_indices(&traced, 0..closes.len(), &NoTrades);
//! assert_eq!(log.len(), closes.len());
//! assert!(hits.contains(&5));
//! ```

pub mod params;
pub mod rules;
pub mod trace;

use std::ops::Range;
use std::sync::Arc;

pub mod prelude {
    pub use crate::{
        // Evaluation
        evaluate,
        evaluate_parallel,
        // Indicators
        from_fn,
        // Parameters
        params::{get_period, get_ratio, ParamMeta, ParamType, ParameterizedRule},
        // Rules
        rules::*,
        satisfied_indices,
        // Tracing
        trace::{LogSink, TraceEntry, TraceLog, TraceSink, Traced},
        Evaluation,
        EvaluationResult,
        FromFn,
        Indicator,
        NoTrades,
        Period,
        Ratio,
        Result,
        Rule,
        // Errors
        RuleError,
        RuleExt,
        RuleId,
        TradingRecord,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, RuleError>;

/// Errors raised while configuring rules. Evaluation itself never fails.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfiguration {
        field: &'static str,
        reason: &'static str,
    },

    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Unknown parameter `{name}` for {rule}")]
    UnknownParameter { rule: &'static str, name: String },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(RuleError::InvalidValue("Ratio cannot be NaN or infinite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(RuleError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Window length in bars (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, rejecting zero
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(RuleError::InvalidConfiguration {
                field: "time_frame",
                reason: "must be > 0",
            });
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// INDICATOR
// ============================================================

/// A source of per-bar values, indexed from 0 (earliest) to `len() - 1`.
///
/// Reading outside `[0, len())` is the indicator's concern; rules in this
/// crate never ask for an index below 0 or above the one they are evaluated at.
pub trait Indicator {
    type Value: PartialOrd;

    fn value(&self, index: usize) -> Self::Value;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: PartialOrd + Copy> Indicator for [V] {
    type Value = V;

    #[inline]
    fn value(&self, index: usize) -> V {
        self[index]
    }

    fn len(&self) -> usize {
        <[V]>::len(self)
    }
}

impl<V: PartialOrd + Copy> Indicator for Vec<V> {
    type Value = V;

    #[inline]
    fn value(&self, index: usize) -> V {
        self[index]
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}

impl<I: Indicator + ?Sized> Indicator for &I {
    type Value = I::Value;

    #[inline]
    fn value(&self, index: usize) -> Self::Value {
        (**self).value(index)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

impl<I: Indicator + ?Sized> Indicator for Arc<I> {
    type Value = I::Value;

    #[inline]
    fn value(&self, index: usize) -> Self::Value {
        (**self).value(index)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// Indicator backed by a closure. Built with [`from_fn`].
#[derive(Clone)]
pub struct FromFn<F> {
    f: F,
    len: usize,
}

impl<F> std::fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FromFn").field("len", &self.len).finish()
    }
}

/// Wrap `f` as an indicator over `len` bars.
pub fn from_fn<V, F>(len: usize, f: F) -> FromFn<F>
where
    V: PartialOrd,
    F: Fn(usize) -> V,
{
    FromFn { f, len }
}

impl<V: PartialOrd, F: Fn(usize) -> V> Indicator for FromFn<F> {
    type Value = V;

    #[inline]
    fn value(&self, index: usize) -> V {
        (self.f)(index)
    }

    fn len(&self) -> usize {
        self.len
    }
}

// ============================================================
// TRADING RECORD
// ============================================================

/// Read-only view over past trades, consulted by position-aware rules.
pub trait TradingRecord {
    /// Number of closed trades
    fn trade_count(&self) -> usize;

    /// True when no position is currently open
    fn is_closed(&self) -> bool;

    fn last_entry_index(&self) -> Option<usize> {
        None
    }

    fn last_exit_index(&self) -> Option<usize> {
        None
    }
}

/// Record with no trades and no open position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoTrades;

impl TradingRecord for NoTrades {
    fn trade_count(&self) -> usize {
        0
    }

    fn is_closed(&self) -> bool {
        true
    }
}

// ============================================================
// RULE TRAIT
// ============================================================

/// Unique identifier for a rule type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct RuleId(pub &'static str);

impl RuleId {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// A trading condition evaluated at a bar index.
///
/// Implementations must be total over every index the indicator covers and
/// must not mutate the indicator or the record.
pub trait Rule: Send + Sync {
    fn id(&self) -> RuleId;

    fn is_satisfied(&self, index: usize, record: &dyn TradingRecord) -> bool;
}

impl<R: Rule + ?Sized> Rule for &R {
    fn id(&self) -> RuleId {
        (**self).id()
    }

    #[inline]
    fn is_satisfied(&self, index: usize, record: &dyn TradingRecord) -> bool {
        (**self).is_satisfied(index, record)
    }
}

impl<R: Rule + ?Sized> Rule for Box<R> {
    fn id(&self) -> RuleId {
        (**self).id()
    }

    #[inline]
    fn is_satisfied(&self, index: usize, record: &dyn TradingRecord) -> bool {
        (**self).is_satisfied(index, record)
    }
}

impl<R: Rule + ?Sized> Rule for Arc<R> {
    fn id(&self) -> RuleId {
        (**self).id()
    }

    #[inline]
    fn is_satisfied(&self, index: usize, record: &dyn TradingRecord) -> bool {
        (**self).is_satisfied(index, record)
    }
}

/// Adapters available on every rule
pub trait RuleExt: Rule + Sized {
    /// Forward every evaluation result to `sink`
    fn traced<S: trace::TraceSink>(self, sink: S) -> trace::Traced<Self, S> {
        trace::Traced::new(self, sink)
    }

    /// Emit a `tracing` event for every evaluation
    fn logged(self) -> trace::Traced<Self, trace::LogSink> {
        trace::Traced::new(self, trace::LogSink)
    }
}

impl<R: Rule> RuleExt for R {}

// ============================================================
// EVALUATION
// ============================================================

/// Iterator over `(index, satisfied)` for a range of bars
pub struct Evaluation<'a, R: Rule + ?Sized> {
    rule: &'a R,
    record: &'a dyn TradingRecord,
    indices: Range<usize>,
}

impl<'a, R: Rule + ?Sized> Iterator for Evaluation<'a, R> {
    type Item = (usize, bool);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.indices.next()?;
        Some((index, self.rule.is_satisfied(index, self.record)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl<'a, R: Rule + ?Sized> ExactSizeIterator for Evaluation<'a, R> {}

/// Evaluate `rule` at every index in `indices`, lazily.
pub fn evaluate<'a, R: Rule + ?Sized>(
    rule: &'a R,
    indices: Range<usize>,
    record: &'a dyn TradingRecord,
) -> Evaluation<'a, R> {
    Evaluation {
        rule,
        record,
        indices,
    }
}

/// Indices in `indices` where `rule` is satisfied.
pub fn satisfied_indices<R: Rule + ?Sized>(
    rule: &R,
    indices: Range<usize>,
    record: &dyn TradingRecord,
) -> Vec<usize> {
    evaluate(rule, indices, record)
        .filter_map(|(index, satisfied)| satisfied.then_some(index))
        .collect()
}

// ============================================================
// PARALLEL EVALUATION
// ============================================================

use rayon::prelude::*;

/// Satisfied bars of a single instrument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationResult {
    pub symbol: String,
    pub satisfied: Vec<usize>,
}

/// Evaluate one rule per instrument in parallel.
///
/// Each item is `(symbol, rule, bars)`; the rule is evaluated at `0..bars`.
pub fn evaluate_parallel<'a, R, I, T>(instruments: I, record: &T) -> Vec<EvaluationResult>
where
    R: Rule + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a R, usize)>,
    T: TradingRecord + Sync,
{
    instruments
        .into_par_iter()
        .map(|(symbol, rule, bars)| EvaluationResult {
            symbol: symbol.to_string(),
            satisfied: satisfied_indices(rule, 0..bars, record),
        })
        .collect()
}

// ============================================================
// TESTS
// ============================================================
