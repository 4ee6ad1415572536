use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use swish_core::{
    CalibrationCfg, CalibrationEngine, FilterCfg, FormScorer, MotionFilter, ShotRecord, Vector3,
};
use swish_traits::ImuReading;

// tiny xorshift PRNG so runs are repeatable
fn rng(seed: u32) -> impl FnMut() -> f32 {
    let mut state = seed.max(1);
    move || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        (x as f32) / (u32::MAX as f32 + 1.0)
    }
}

fn synth_shots(n: usize, points: usize, seed: u32) -> Vec<ShotRecord> {
    let mut next = rng(seed);
    (0..n)
        .map(|_| {
            let jitter = next() * 0.05;
            let path = (0..points)
                .map(|i| {
                    let t = i as f32 / points as f32;
                    Vector3::new(t * 0.6 + jitter, 0.0, (t * std::f32::consts::PI).sin() * 0.4)
                })
                .collect();
            ShotRecord::synthetic(
                0,
                1400 + (next() * 200.0) as u64,
                25.0 + next() * 10.0,
                600.0 + next() * 200.0,
                path,
            )
        })
        .collect()
}

fn configure(g: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>) {
    // BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p swish_core --bench scoring
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(10));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }
}

pub fn bench_calibration(c: &mut Criterion) {
    let mut g = c.benchmark_group("calibration");
    configure(&mut g);
    let shots = synth_shots(10, 100, 0xC0FFEE);
    g.bench_function("ten_shot_profile", |b| {
        b.iter_batched(
            || CalibrationEngine::new(CalibrationCfg::default()),
            |mut engine| {
                engine.start();
                for s in &shots {
                    let _ = engine.add_sample(black_box(s));
                }
                black_box(engine.finish().ok());
            },
            BatchSize::SmallInput,
        )
    });
    g.finish();
}

pub fn bench_scoring(c: &mut Criterion) {
    let mut g = c.benchmark_group("scoring");
    configure(&mut g);
    let mut engine = CalibrationEngine::new(CalibrationCfg::default());
    engine.start();
    for s in &synth_shots(10, 100, 0xBEEF) {
        let _ = engine.add_sample(s);
    }
    let Ok(profile) = engine.finish() else {
        return;
    };
    let scorer = FormScorer::default();

    for &points in &[20usize, 100] {
        let candidates = synth_shots(64, points, 0xFACE);
        g.bench_function(format!("score_{points}_points"), |b| {
            b.iter(|| {
                for shot in &candidates {
                    black_box(scorer.score(black_box(shot), &profile).ok());
                }
            })
        });
    }
    g.finish();
}

pub fn bench_filter(c: &mut Criterion) {
    let mut g = c.benchmark_group("filter");
    configure(&mut g);
    let mut next = rng(0x5EED);
    let readings: Vec<ImuReading> = (0..10_000u64)
        .map(|i| {
            let noise = (next() - 0.5) * 0.4;
            ImuReading::new(i * 10, [noise, noise, 9.8 + noise], [noise * 10.0; 3])
        })
        .collect();
    g.bench_function("process_10k", |b| {
        b.iter_batched(
            || MotionFilter::new(FilterCfg::default()),
            |mut f| {
                for r in &readings {
                    black_box(f.process(black_box(r)));
                }
            },
            BatchSize::SmallInput,
        )
    });
    g.finish();
}

criterion_group!(scoring, bench_calibration, bench_scoring, bench_filter);
criterion_main!(scoring);
