use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ring_generator::*;
use std::path::PathBuf;
use tracing::info;

const DEFAULT_SCAFFOLD: &str = "C1C2C(CCC1)CC3C(C2)CCCC3";

#[derive(Parser)]
#[command(
    name = "ring-generator",
    about = "Grow substituted ring structures with matching WLN strings"
)]
struct Cli {
    /// Log level: error, warn, info, debug or trace.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enumerate position subsets and write the generated variants.
    Generate(GenerateArgs),
    /// Print the canonical atom indices of a scaffold.
    Positions {
        #[arg(long, default_value = DEFAULT_SCAFFOLD)]
        scaffold: String,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Tab separated fragment table with WLN and SMILES columns.
    #[arg(long)]
    fragments: PathBuf,
    #[arg(long, default_value = DEFAULT_SCAFFOLD)]
    scaffold: String,
    /// Notation in front of the substitution terms.
    #[arg(long, default_value = "L C666")]
    prefix: String,
    /// Notation glued onto the last term.
    #[arg(long, default_value = "TJ")]
    suffix: String,
    /// Letter to atom index map, `A:3,B:4,...`.
    #[arg(long, default_value = DEFAULT_RING_POSITIONS)]
    positions: PositionIndex,
    #[arg(long, default_value = "Ring_Data")]
    out_dir: PathBuf,
    /// JSON file with generator settings; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    iterations: Option<usize>,
    #[arg(long)]
    max_fragment_rows: Option<usize>,
    #[arg(long)]
    seeds_to_extend: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    threads: Option<usize>,
}

impl GenerateArgs {
    fn config(&self) -> Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::from_json_file(path)?,
            None => GeneratorConfig::default(),
        };
        if let Some(iterations) = self.iterations {
            config.iterations_per_subset = iterations;
        }
        if let Some(rows) = self.max_fragment_rows {
            config.max_fragment_rows = rows;
        }
        if let Some(seeds) = self.seeds_to_extend {
            config.seeds_to_extend = seeds;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        Ok(config)
    }
}

fn generate(args: GenerateArgs) -> Result<()> {
    let config = args.config()?;
    let fragments = FragmentTable::from_path(&args.fragments, &config.fragment_filter())
        .with_context(|| format!("Failed to load fragments from {}", args.fragments.display()))?;
    let scaffold = Molecule::canonical_from_smiles(&args.scaffold)
        .with_context(|| format!("Failed to read scaffold {}", args.scaffold))?;

    let max_index = args.positions.indices().last().copied().unwrap_or_default();
    if max_index >= scaffold.atom_count() {
        anyhow::bail!(
            "Position {} is outside the scaffold, which has {} atoms",
            max_index,
            scaffold.atom_count()
        );
    }
    info!(
        "Positions {} to choose from on {} ({} atoms)",
        args.positions,
        scaffold,
        scaffold.atom_count()
    );

    let seed_notation = fuse_notation::<&str>(&args.prefix, &[], &args.suffix);
    let driver = Driver::new(&config, args.positions, fragments);
    let variants = driver.run(&scaffold, &args.prefix, &args.suffix)?;
    write_variants(output_path(&args.out_dir, &seed_notation), &variants)
}

fn positions(scaffold: &str) -> Result<()> {
    let molecule = Molecule::canonical_from_smiles(scaffold)
        .with_context(|| format!("Failed to read scaffold {}", scaffold))?;
    println!("{}", molecule);
    for (index, symbol) in molecule.atom_labels() {
        println!("{}\t{}", index, symbol);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Generate(args) => generate(args),
        Command::Positions { scaffold } => positions(&scaffold),
    }
}
