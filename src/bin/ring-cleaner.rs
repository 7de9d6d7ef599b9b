use anyhow::Result;
use clap::Parser;
use ring_generator::*;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "ring-cleaner",
    about = "Relabel generated WLN strings relative to their anchor position"
)]
struct Cli {
    /// Tab separated (SMILES, WLN) file written by ring-generator.
    input: PathBuf,
    /// Where to write the normalized rows; stdout when absent.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// `minimum` measures from the lowest letter, `first` from the first token.
    #[arg(long, default_value = "minimum")]
    anchor: AnchorPolicy,
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let variants = read_variants(&cli.input)?;
    let total = variants.len();
    let cleaned: Vec<Variant> = variants
        .into_iter()
        .filter_map(|variant| match normalize_with(&variant.notation, cli.anchor) {
            Ok(notation) => Some(Variant::new(variant.smiles, notation)),
            Err(e) => {
                warn!("Skipping '{}': {}", variant.notation, e);
                None
            }
        })
        .collect();
    info!("Normalized {} of {} rows", cleaned.len(), total);

    match &cli.output {
        Some(path) => write_variants(path, &cleaned),
        None => write_variants_to(std::io::stdout().lock(), &cleaned),
    }
}
