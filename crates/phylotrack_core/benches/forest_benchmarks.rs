use criterion::{black_box, criterion_group, criterion_main, Criterion};
use phylotrack_core::{Systematics, SystematicsConfig};
use phylotrack_data::WorldPosition;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const POP_SIZE: usize = 500;

/// Steady-state population: each step a random slot is replaced by the
/// offspring of another random slot, mutating with probability 0.05.
fn run_population(steps: usize, seed: u64) -> Systematics<u32, u32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let config = SystematicsConfig {
        store_position: true,
        ..Default::default()
    };
    let mut sys = Systematics::with_config(|g: &u32| *g, config).expect("valid config");
    let mut genomes = vec![0u32; POP_SIZE];
    let mut next_genome = 1;

    for slot in 0..POP_SIZE {
        let parent = sys.most_recent();
        sys.add_org_at(&0, WorldPosition::active(slot), parent);
    }

    for _ in 0..steps {
        let parent_slot = rng.gen_range(0..POP_SIZE);
        let child_slot = rng.gen_range(0..POP_SIZE);
        let mut genome = genomes[parent_slot];
        if rng.gen_bool(0.05) {
            genome = next_genome;
            next_genome += 1;
        }
        sys.remove_org_at_after_repro(WorldPosition::active(child_slot))
            .expect("slot is occupied");
        sys.add_org_at_with_parent_pos(
            &genome,
            WorldPosition::active(child_slot),
            WorldPosition::active(parent_slot),
        )
        .expect("parent slot is occupied");
        genomes[child_slot] = genome;
        sys.update();
    }
    sys
}

fn bench_event_processing(c: &mut Criterion) {
    c.bench_function("systematics_10000_births", |b| {
        b.iter(|| black_box(run_population(10_000, 42).num_taxa()))
    });
}

fn bench_statistics(c: &mut Criterion) {
    let sys = run_population(10_000, 7);

    c.bench_function("phylogenetic_diversity", |b| {
        b.iter(|| black_box(sys.phylogenetic_diversity()))
    });
    c.bench_function("colless_like_index", |b| {
        b.iter(|| black_box(sys.colless_like_index()))
    });
    c.bench_function("evolutionary_distinctiveness", |b| {
        b.iter(|| black_box(sys.evolutionary_distinctiveness(10_000.0)))
    });
    c.bench_function("mean_pairwise_distance", |b| {
        b.iter(|| black_box(sys.mean_pairwise_distance(false)))
    });
}

criterion_group!(benches, bench_event_processing, bench_statistics);
criterion_main!(benches);
