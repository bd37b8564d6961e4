use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tally::{batch, AttrDef, Formula, FormulaConfig, StatDef, StatsSheet};

fn fighter() -> StatsSheet {
    StatsSheet::new()
        .with_stat("strength", StatDef::new(14.0))
        .with_stat("armor", StatDef::new(6.0))
        .with_stat(
            "attack",
            StatDef::derived(0.0, Formula::parse("stat[strength] * 2 + 5").unwrap()),
        )
        .with_stat("max_health", StatDef::new(120.0))
        .with_attr("health", AttrDef::new("max_health"))
}

fn bench_parse(c: &mut Criterion) {
    let source = "max[1, this[value] + stat[attack] * 1.5 - stat:other[armor] / (2 + floor[attr[health] / 10])]";

    c.bench_function("parse", |b| {
        b.iter(|| black_box(Formula::parse(black_box(source)).unwrap()))
    });
}

fn bench_calculate(c: &mut Criterion) {
    let hero = fighter();
    let rival = fighter();
    let formula = Formula::parse(
        "max[1, this[value] + stat[attack] * 1.5 - stat:other[armor] / (2 + floor[attr[health] / 10])]",
    )
    .unwrap();

    c.bench_function("calculate", |b| {
        b.iter(|| black_box(formula.calculate(black_box(10.0), &hero, Some(&rival))))
    });
}

fn bench_batch(c: &mut Criterion) {
    let hero = fighter();
    // Mix of deterministic and random formulas
    let formulas: Vec<Formula> = (0..256)
        .map(|i| {
            let source = if i % 2 == 0 {
                format!("stat[attack] + {i}")
            } else {
                "dice[2, 6] + rand[0, stat[strength]]".to_string()
            };
            Formula::parse(&source).unwrap()
        })
        .collect();
    let config = FormulaConfig::seeded(7);

    c.bench_function("calculate_many_256", |b| {
        b.iter(|| black_box(batch::calculate_many(&formulas, 0.0, &hero, None, &config)))
    });
}

criterion_group!(benches, bench_parse, bench_calculate, bench_batch);
criterion_main!(benches);
