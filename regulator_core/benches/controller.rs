use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use regulator_core::{ControlCfg, IntegralMode, RampedController, sci};

// Synthetic gauge trace: first-order rise toward `eq` with multiplicative jitter
fn synth_pressures(n: usize, start: f64, eq: f64, seed: u32) -> Vec<f64> {
    // tiny PRNG
    let mut state = seed.max(1);
    let mut next_f64 = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    };
    let mut p = start;
    (0..n)
        .map(|_| {
            p += (eq - p) * 0.05;
            p * (1.0 + (next_f64() * 2.0 - 1.0) * 0.01)
        })
        .collect()
}

fn configure(g: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>) {
    // Allow quick tweaking without CLI flags (Criterion 0.5):
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p regulator_core --bench controller
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
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }
}

pub fn bench_control_law(c: &mut Criterion) {
    let mut g = c.benchmark_group("control_law");
    configure(&mut g);

    let trace = synth_pressures(10_000, 2.0e-9, 2.0e-8, 0xC0FFEE);

    for mode in [IntegralMode::Frozen, IntegralMode::Accumulating] {
        let cfg = ControlCfg {
            integral_mode: mode,
            ..ControlCfg::default()
        };
        g.bench_function(format!("session_{mode:?}"), |b| {
            b.iter_batched(
                || {
                    let mut ctl = RampedController::new(&cfg);
                    let _ = ctl.start(1.5e-8, trace[0]);
                    ctl
                },
                |mut ctl| {
                    let mut acc = 0.0;
                    for &p in &trace {
                        acc += ctl.calc_percent_change(black_box(p)).unwrap_or(0.0);
                    }
                    black_box(acc);
                },
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

pub fn bench_codec(c: &mut Criterion) {
    let mut g = c.benchmark_group("sci_codec");
    configure(&mut g);

    let lines: Vec<String> = synth_pressures(10_000, 2.0e-9, 2.0e-8, 0xBEEF)
        .into_iter()
        .map(sci::render)
        .collect();

    g.bench_function("parse_gauge_text", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for l in &lines {
                acc += sci::parse(black_box(l)).unwrap_or(0.0);
            }
            black_box(acc)
        })
    });
    g.finish();
}

criterion_group!(controller, bench_control_law, bench_codec);
criterion_main!(controller);
