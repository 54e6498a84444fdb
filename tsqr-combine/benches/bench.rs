use criterion::{criterion_group, criterion_main, Criterion};
use dyn_stack::*;
use rand::random;
use std::time::Duration;
use tsqr_combine::base::{factor_first, factor_first_req};
use tsqr_combine::combine::{factor_inner, factor_inner_req, factor_pair, factor_pair_req};

fn random_triangle(n: usize) -> Vec<f64> {
    let mut r = vec![0.0f64; n * n];
    for j in 0..n {
        for i in 0..=j {
            r[i + j * n] = random::<f64>();
        }
    }
    r
}

pub fn combine(c: &mut Criterion) {
    for (m, n) in [(256, 32), (1024, 64), (4096, 128)] {
        c.bench_function(&format!("tsqr-factor-first-{m}x{n}"), |b| {
            let orig = (0..m * n).map(|_| random::<f64>()).collect::<Vec<_>>();
            let mut a = orig.clone();
            let mut tau = vec![0.0f64; n];

            let mut mem = GlobalMemBuffer::new(factor_first_req::<f64>(n).unwrap());
            let mut stack = DynStack::new(&mut mem);

            b.iter(|| {
                a.copy_from_slice(&orig);
                factor_first(m, n, &mut a, m, &mut tau, stack.rb_mut());
            })
        });

        c.bench_function(&format!("tsqr-factor-inner-{m}x{n}"), |b| {
            let r_orig = random_triangle(n);
            let a_orig = (0..m * n).map(|_| random::<f64>()).collect::<Vec<_>>();
            let mut r = r_orig.clone();
            let mut a = a_orig.clone();
            let mut tau = vec![0.0f64; n];

            let mut mem = GlobalMemBuffer::new(factor_inner_req::<f64>(n).unwrap());
            let mut stack = DynStack::new(&mut mem);

            b.iter(|| {
                r.copy_from_slice(&r_orig);
                a.copy_from_slice(&a_orig);
                factor_inner(m, n, &mut r, n, &mut a, m, &mut tau, stack.rb_mut());
            })
        });
    }

    for n in [32, 64, 128, 256] {
        c.bench_function(&format!("tsqr-factor-pair-{n}"), |b| {
            let top_orig = random_triangle(n);
            let bot_orig = random_triangle(n);
            let mut r_top = top_orig.clone();
            let mut r_bot = bot_orig.clone();
            let mut tau = vec![0.0f64; n];

            let mut mem = GlobalMemBuffer::new(factor_pair_req::<f64>(n).unwrap());
            let mut stack = DynStack::new(&mut mem);

            b.iter(|| {
                r_top.copy_from_slice(&top_orig);
                r_bot.copy_from_slice(&bot_orig);
                factor_pair(n, &mut r_top, n, &mut r_bot, n, &mut tau, stack.rb_mut());
            })
        });
    }
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_secs(1))
        .measurement_time(Duration::from_secs(1))
        .sample_size(10);
    targets = combine
);
criterion_main!(benches);
