use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mindtrainer::difficulty::DifficultyProfile;
use mindtrainer::prng::Prng;
use mindtrainer::sequence;

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequence_generate");
    for level in [1u32, 125, 250] {
        let profile = DifficultyProfile::for_level(level);
        group.bench_function(format!("level_{level}"), |b| {
            let mut rng = Prng::new(0xC0FFEE);
            b.iter(|| sequence::generate(black_box(&profile), &mut rng));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_generate);
criterion_main!(benches);
