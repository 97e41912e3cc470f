//! Writes a small random feed-forward model for the scoring service.

use std::path::PathBuf;

use clap::Parser;
use score_window_service::MlpScorer;

#[derive(Parser, Debug)]
#[command(about = "Generate a random MLP model file for the score service")]
struct Args {
    /// Output path
    #[arg(short, long, default_value = "model.json", env = "MODEL_PATH")]
    out: PathBuf,

    /// Number of input features
    #[arg(long, default_value_t = 3)]
    in_dim: usize,

    /// Width of the two hidden layers
    #[arg(long, default_value_t = 128)]
    hidden: usize,

    /// RNG seed; same seed, same weights
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    score_window_service::init_tracing();
    let args = Args::parse();

    let model = MlpScorer::random(args.in_dim, args.hidden, args.seed);
    model.save(&args.out)?;

    tracing::info!(
        path = %args.out.display(),
        in_dim = args.in_dim,
        hidden = args.hidden,
        seed = args.seed,
        "model written"
    );
    println!("Saved {}", args.out.display());
    Ok(())
}
