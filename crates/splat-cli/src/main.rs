use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use splat_data::{generate_synthetic_cloud, load_ply, GaussianCloud};
use splat_render::ViewerOptions;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "splatview")]
#[command(about = "Real-time 3D Gaussian splat viewer")]
struct Cli {
    /// Initial Gaussian scale multiplier (+/- adjust it at runtime)
    #[arg(long, global = true, default_value = "1.0")]
    multiplier: f32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a trained 3DGS PLY file in the viewer
    View {
        /// Binary little-endian PLY file
        path: PathBuf,
    },

    /// View a procedurally generated cloud
    Synthetic {
        #[arg(short, long, default_value = "100000")]
        count: usize,
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Print statistics about a PLY file without opening a window
    Info {
        path: PathBuf,
    },
}

fn print_info(name: &str, cloud: &GaussianCloud) {
    println!("{name}");
    println!("  Gaussians:  {}", cloud.len());
    println!("  SH degree:  {}", cloud.sh_degree());
    if let Some((min, max)) = cloud.bounds() {
        let size = max - min;
        println!("  Bounds min: ({:.3}, {:.3}, {:.3})", min.x, min.y, min.z);
        println!("  Bounds max: ({:.3}, {:.3}, {:.3})", max.x, max.y, max.z);
        println!("  Extent:     ({:.3}, {:.3}, {:.3})", size.x, size.y, size.z);
    }

    let gaussians = cloud.gaussians();
    if !gaussians.is_empty() {
        let mean_opacity = gaussians.iter().map(|g| g.opacity).sum::<f32>() / gaussians.len() as f32;
        let max_scale = gaussians
            .iter()
            .flat_map(|g| g.scale)
            .fold(0.0_f32, f32::max);
        println!("  Opacity:    {:.3} mean", mean_opacity);
        println!("  Scale:      {:.4} max", max_scale);
    }
}

fn view(cloud: GaussianCloud, title: String, multiplier: f32) -> Result<()> {
    if !(multiplier > 0.0 && multiplier.is_finite()) {
        anyhow::bail!("--multiplier must be a positive number, got {multiplier}");
    }
    let options = ViewerOptions {
        title,
        gaussian_multiplier: multiplier,
        ..ViewerOptions::default()
    };
    splat_render::run(cloud, options)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::View { path } => {
            let cloud = load_ply(&path).with_context(|| format!("Failed to load {}", path.display()))?;
            let title = format!("splatview | {}", path.display());
            view(cloud, title, cli.multiplier)?;
        }

        Commands::Synthetic { count, seed } => {
            tracing::info!("Generating {} synthetic Gaussians (seed {})", count, seed);
            let cloud = generate_synthetic_cloud(count, seed);
            view(cloud, format!("splatview | synthetic x{count}"), cli.multiplier)?;
        }

        Commands::Info { path } => {
            let cloud = load_ply(&path).with_context(|| format!("Failed to load {}", path.display()))?;
            print_info(&path.display().to_string(), &cloud);
        }
    }

    Ok(())
}
