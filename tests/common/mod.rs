pub mod macros;

use phylotrack_lib::{Systematics, SystematicsConfig, TaxonId, WorldPosition};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

/// The six-taxon tree used by the phylostatistics tests.
///
/// ```text
/// 1 (t=0)
/// ├── 2 (t=6)
/// │   ├── 4 (t=25)
/// │   └── 5 (t=32)
/// │       └── 6 (t=32)
/// └── 3 (t=10)
/// ```
#[allow(dead_code)]
pub struct ReferenceTree {
    pub sys: Systematics<i32, String>,
    pub ids: [TaxonId; 6],
}

#[allow(dead_code)]
pub fn reference_tree() -> ReferenceTree {
    let mut sys = Systematics::new(|org: &i32| org.to_string());
    sys.set_update(0);
    let id1 = sys.add_org(&25, None);
    sys.set_update(6);
    let id2 = sys.add_org(&1, Some(id1));
    sys.set_update(10);
    let id3 = sys.add_org(&26, Some(id1));
    sys.set_update(25);
    let id4 = sys.add_org(&27, Some(id2));
    sys.set_update(32);
    let id5 = sys.add_org(&28, Some(id2));
    let id6 = sys.add_org(&30, Some(id5));
    ReferenceTree {
        sys,
        ids: [id1, id2, id3, id4, id5, id6],
    }
}

/// Drives a fixed-size population of integer genomes through random
/// birth/death events.
#[allow(dead_code)]
pub struct PopulationBuilder {
    config: SystematicsConfig,
    seed: u64,
    size: usize,
    steps: usize,
    mutation_rate: f64,
}

#[allow(dead_code)]
impl PopulationBuilder {
    pub fn new() -> Self {
        Self {
            config: SystematicsConfig {
                store_position: true,
                ..SystematicsConfig::default()
            },
            seed: 42,
            size: 50,
            steps: 500,
            mutation_rate: 0.2,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate;
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut SystematicsConfig),
    {
        modifier(&mut self.config);
        self
    }

    /// Seeds every slot with genome 0 under one root, then replaces a random
    /// slot with the mutated offspring of another each step.
    pub fn build(self) -> (Systematics<u32, u32>, Vec<u32>) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut sys = Systematics::with_config(|genome: &u32| *genome, self.config)
            .expect("valid config");
        let mut genomes = vec![0u32; self.size];

        let root = sys.add_org_at(&0, WorldPosition::active(0), None);
        for idx in 1..self.size {
            sys.add_org_at(&0, WorldPosition::active(idx), Some(root));
        }

        let mut next_genome = 1;
        for step in 0..self.steps {
            sys.set_update(step as u64 + 1);
            let parent = rng.gen_range(0..self.size);
            let target = rng.gen_range(0..self.size);
            let genome = if rng.gen_bool(self.mutation_rate) {
                next_genome += 1;
                next_genome
            } else {
                genomes[parent]
            };

            sys.remove_org_at_after_repro(WorldPosition::active(target))
                .expect("slot occupied");
            sys.add_org_at_with_parent_pos(
                &genome,
                WorldPosition::active(target),
                WorldPosition::active(parent),
            )
            .expect("parent occupied");
            genomes[target] = genome;
        }
        (sys, genomes)
    }
}

/// A scratch file path unique to this process.
#[allow(dead_code)]
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("phylotrack_{}_{name}", std::process::id()))
}
