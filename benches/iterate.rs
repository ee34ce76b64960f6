use criterion::*;
use weft::Registry;

#[derive(Clone)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Clone)]
struct Velocity {
    x: f32,
    y: f32,
}

#[derive(Clone)]
struct Rare;

fn populated_registry(entities: u64, rare_every: u64) -> Registry {
    let registry = Registry::new();
    for i in 0..entities {
        let ent = registry.create_entity().expect("index space not full");
        ent.assign_component(Position { x: i as f32, y: 0.0 });
        ent.assign_component(Velocity { x: 1.0, y: 1.0 });
        if i % rare_every == 0 {
            ent.assign_component(Rare);
        }
    }
    registry
}

fn iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("joined iteration");

    for log_entities in (4..=14).step_by(5) {
        let entities = 1u64 << log_entities;
        group.throughput(Throughput::Elements(entities));

        group.bench_with_input(
            BenchmarkId::new("2-way join", format!("{entities} entities")),
            &entities,
            |b, &entities| {
                let registry = populated_registry(entities, 16);
                b.iter(|| {
                    registry.for_joined_components_mut::<(Position, Velocity), _>(|_, (p, v)| {
                        p.x += v.x;
                        p.y += v.y;
                    });
                });
            },
        );

        // Scarce driver first: the join walks the small column and probes
        // the large ones.
        group.bench_with_input(
            BenchmarkId::new("scarce driver", format!("{entities} entities")),
            &entities,
            |b, &entities| {
                let registry = populated_registry(entities, 16);
                b.iter(|| {
                    let mut sum = 0.0f32;
                    registry.for_joined_components::<(Rare, Position, Velocity), _>(
                        |_, (_, p, v)| {
                            sum += p.x + v.x;
                        },
                    );
                    black_box(sum)
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("single column", format!("{entities} entities")),
            &entities,
            |b, &entities| {
                let registry = populated_registry(entities, 16);
                b.iter(|| {
                    let mut sum = 0.0f32;
                    registry.for_each_component::<Position>(|_, p| sum += p.x);
                    black_box(sum)
                });
            },
        );
    }
}

criterion_group!(benches, iterate);
criterion_main!(benches);
