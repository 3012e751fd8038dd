use std::time::Duration;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use smartwire_core::decision::{DecisionInputs, decide};
use smartwire_core::history::{History, Snapshot};
use smartwire_core::mocks::{ManualClock, RecordingTiming, ScriptedBus};
use smartwire_core::{Outcome, PerformanceMetrics, Tuner, score};

fn configure(g: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>) {
    // Allow quick tweaking without CLI flags (Criterion 0.5):
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p smartwire_core --bench decision
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(Duration::from_millis(ms_u64));
    }
}

pub fn bench_decide(c: &mut Criterion) {
    let mut g = c.benchmark_group("decide");
    configure(&mut g);

    let mut m = PerformanceMetrics::default();
    for i in 0..25u64 {
        m.record(true, 400 + i * 7, i);
    }
    let mut history = History::new();
    for i in 0..10u64 {
        let mut epoch = m;
        epoch.record(true, 300 - i * 20, 25 + i);
        history.push(Snapshot {
            metrics: epoch,
            score: score(&epoch, 50.0),
        });
    }

    g.bench_function("score_and_stability", |b| {
        b.iter(|| {
            let stability = black_box(&history).stability();
            black_box(score(black_box(&m), stability))
        })
    });

    g.bench_function("decide", |b| {
        let inputs = DecisionInputs {
            now_ms: 60_000,
            last_adjustment_ms: Some(10_000),
            cooldown_ms: 5_000,
            ignore_cooldown: false,
            current_score: score(&m, history.stability()),
            best_score: 70.0,
            trend: history.trend(),
            recent_error_rate: 0.0,
            error_rate_pct: m.error_rate_pct,
            successes: m.successes,
            consecutive_errors: 0,
            adaptation_rate: 5,
        };
        b.iter(|| black_box(decide(black_box(&inputs))))
    });
    g.finish();
}

pub fn bench_observe(c: &mut Criterion) {
    let mut g = c.benchmark_group("observe");
    configure(&mut g);

    g.bench_function("observe_1k_successes", |b| {
        b.iter_batched(
            || {
                Tuner::builder()
                    .with_bus(ScriptedBus::new())
                    .with_timing(RecordingTiming::new())
                    .with_clock(Box::new(ManualClock::new()))
                    .build()
                    .expect("build tuner")
            },
            |mut t| {
                for _ in 0..1_000 {
                    t.observe(0x48, Outcome::Success, Duration::from_micros(300));
                }
                black_box(t.score());
            },
            BatchSize::SmallInput,
        )
    });
    g.finish();
}

criterion_group!(decision, bench_decide, bench_observe);
criterion_main!(decision);
