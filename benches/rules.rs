//! Benchmarks for rule evaluation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tarules::prelude::*;

/// Deterministic zig-zag price series
fn generate_closes(n: usize) -> Vec<f64> {
  let mut closes = Vec::with_capacity(n);
  let mut price = 100.0;

  for i in 0..n {
    let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 0.9;
    price += change;
    closes.push(price);
  }

  closes
}

fn bench_single_evaluation(c: &mut Criterion) {
  let closes = generate_closes(1000);
  let rule = IsRisingRule::new(&closes, 20, 0.7).unwrap();

  c.bench_function("is_rising_tf20_single", |b| {
    b.iter(|| black_box(rule.is_satisfied(black_box(999), &NoTrades)))
  });
}

fn bench_time_frames(c: &mut Criterion) {
  let closes = generate_closes(1000);
  let mut group = c.benchmark_group("is_rising_1000_bars");

  for time_frame in [5, 20, 100] {
    let rule = IsRisingRule::new(&closes, time_frame, 0.7).unwrap();
    group.bench_with_input(BenchmarkId::from_parameter(time_frame), &rule, |b, rule| {
      b.iter(|| black_box(satisfied_indices(rule, 0..closes.len(), &NoTrades)))
    });
  }

  group.finish();
}

fn bench_traced(c: &mut Criterion) {
  let closes = generate_closes(1000);
  let log = TraceLog::with_capacity(256);
  let rule = IsRisingRule::new(&closes, 20, 0.7).unwrap().traced(&log);

  c.bench_function("is_rising_tf20_traced_1000_bars", |b| {
    b.iter(|| black_box(satisfied_indices(&rule, 0..closes.len(), &NoTrades)))
  });
}

fn bench_parallel(c: &mut Criterion) {
  let series: Vec<(String, Vec<f64>)> =
    (0..16).map(|k| (format!("SYM{k}"), generate_closes(1000 + k * 10))).collect();
  let rules: Vec<_> =
    series.iter().map(|(_, closes)| IsRisingRule::new(closes, 20, 0.7).unwrap()).collect();

  c.bench_function("is_rising_parallel_16_instruments", |b| {
    b.iter(|| {
      let instruments: Vec<_> = series
        .iter()
        .zip(&rules)
        .map(|((symbol, closes), rule)| (symbol.as_str(), rule, closes.len()))
        .collect();
      black_box(evaluate_parallel(instruments, &NoTrades))
    })
  });
}

criterion_group!(benches, bench_single_evaluation, bench_time_frames, bench_traced, bench_parallel);
criterion_main!(benches);
