use crate::*;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use itertools::Itertools;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PHASE_HETEROATOM: u64 = 1;
const PHASE_FRAGMENT: u64 = 2;

/// Every subset of `indices`, smallest first, the empty set included.
pub fn power_set(indices: &[usize]) -> Vec<Vec<usize>> {
    indices.iter().copied().powerset().collect()
}

/// Drop repeated pairs, keeping the first occurrence.
pub fn dedup_variants(variants: Vec<Variant>) -> Vec<Variant> {
    variants.into_iter().unique().collect()
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// The generator for one attempt, a pure function of its coordinates.
fn attempt_rng(
    run_seed: u64,
    phase: u64,
    seed_index: usize,
    subset_index: usize,
    trial: usize,
) -> SmallRng {
    let mut state = splitmix64(run_seed ^ phase);
    for coordinate in [seed_index, subset_index, trial] {
        state = splitmix64(state ^ coordinate as u64);
    }
    SmallRng::seed_from_u64(state)
}

/// Enumeration over every subset of ring positions.
///
/// A run has two phases. First each subset gets one heteroatom substitution,
/// giving the seeds. Then fragments are grown on the first few seeds, many
/// random trials per subset. Each attempt draws from its own generator derived
/// from the run seed, so a run is reproducible regardless of scheduling.
pub struct Driver {
    positions: PositionIndex,
    fragments: FragmentTable,
    iterations: usize,
    seeds_to_extend: usize,
    seed: u64,
    threads: Option<usize>,
}

impl Driver {
    pub fn new(
        config: &GeneratorConfig,
        positions: PositionIndex,
        fragments: FragmentTable,
    ) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random::<u64>);
        info!("Run seed {}", seed);
        Self {
            positions,
            fragments,
            iterations: config.iterations_per_subset,
            seeds_to_extend: config.seeds_to_extend,
            seed,
            threads: config.threads,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn subsets(&self) -> Vec<Vec<usize>> {
        power_set(&self.positions.indices())
    }

    /// One heteroatom substitution per subset; failed subsets are dropped.
    pub fn heteroatom_seeds(
        &self,
        scaffold: &Molecule,
        prefix: &str,
        suffix: &str,
    ) -> Vec<SeedVariant> {
        let subsets = self.subsets();
        info!("Substituting heteroatoms over {} position subsets", subsets.len());

        let seeds: Vec<SeedVariant> = subsets
            .par_iter()
            .enumerate()
            .filter_map(|(subset_index, subset)| {
                let mut rng = attempt_rng(self.seed, PHASE_HETEROATOM, 0, subset_index, 0);
                match substitute_heteroatoms(
                    subset,
                    scaffold,
                    prefix,
                    suffix,
                    &self.positions,
                    &mut rng,
                ) {
                    Ok(seed) => Some(seed),
                    Err(e) => {
                        debug!("Dropping substitution at {:?}: {}", subset, e);
                        None
                    }
                }
            })
            .collect();

        info!("Kept {} of {} heteroatom seeds", seeds.len(), subsets.len());
        seeds
    }

    /// Grow fragments on the first seeds, `iterations` trials per subset.
    pub fn extend_seeds(&self, seeds: &[SeedVariant]) -> Vec<Variant> {
        let subsets = self.subsets();
        let mut variants = Vec::new();

        for (seed_index, seed) in seeds.iter().take(self.seeds_to_extend).enumerate() {
            info!(
                "Growing fragments on {} over {} subsets x {} trials",
                seed.notation,
                subsets.len(),
                self.iterations
            );
            let batch: Vec<Variant> = subsets
                .par_iter()
                .enumerate()
                .flat_map_iter(|(subset_index, subset)| {
                    (0..self.iterations).filter_map(move |trial| {
                        let mut rng =
                            attempt_rng(self.seed, PHASE_FRAGMENT, seed_index, subset_index, trial);
                        match extend_variant(
                            &seed.notation,
                            &seed.molecule,
                            &self.positions,
                            subset,
                            &self.fragments,
                            &mut rng,
                        ) {
                            Ok(variant) => Some(variant),
                            Err(e) => {
                                debug!("Dropping trial {} at {:?}: {}", trial, subset, e);
                                None
                            }
                        }
                    })
                })
                .collect();
            info!("Seed {} produced {} variants", seed.notation, batch.len());
            variants.extend(batch);
        }
        variants
    }

    /// Both phases, then dedup.
    pub fn run(&self, scaffold: &Molecule, prefix: &str, suffix: &str) -> Result<Vec<Variant>> {
        let work = || {
            let seeds = self.heteroatom_seeds(scaffold, prefix, suffix);
            let variants = self.extend_seeds(&seeds);
            let total = variants.len();
            let unique = dedup_variants(variants);
            info!("{} unique variants out of {}", unique.len(), total);
            unique
        };

        match self.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .context("Failed to build the worker pool")?;
                Ok(pool.install(work))
            }
            None => Ok(work()),
        }
    }
}

/// `<dir>/<seed notation>_SEED_Variations.txt`
pub fn output_path(dir: impl AsRef<Path>, seed_notation: &str) -> PathBuf {
    dir.as_ref().join(format!("{seed_notation}_SEED_Variations.txt"))
}

pub fn write_variants_to<W: Write>(writer: W, variants: &[Variant]) -> Result<()> {
    let mut wtr = WriterBuilder::new().delimiter(b'\t').has_headers(false).from_writer(writer);
    for variant in variants {
        wtr.write_record([variant.smiles.as_str(), variant.notation.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `(structure, notation)` rows, tab separated, without a header.
pub fn write_variants(path: impl AsRef<Path>, variants: &[Variant]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_variants_to(file, variants)?;
    info!("Wrote {} variants to {}", variants.len(), path.display());
    Ok(())
}

pub fn read_variants_from<R: Read>(reader: R) -> Result<Vec<Variant>> {
    let mut rdr = ReaderBuilder::new().delimiter(b'\t').has_headers(false).from_reader(reader);
    let mut variants = Vec::new();
    for record in rdr.records() {
        let record = record?;
        match (record.get(0), record.get(1)) {
            (Some(smiles), Some(notation)) => variants.push(Variant::new(smiles, notation)),
            _ => anyhow::bail!("Expected two columns, found {:?}", record),
        }
    }
    Ok(variants)
}

pub fn read_variants(path: impl AsRef<Path>) -> Result<Vec<Variant>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    read_variants_from(file)
}
