//! Emergency Vehicle Classification CLI
//!
//! Entry point for the emergency vs non-emergency vehicle classifier:
//! fine-tunes a ResNet-18 backbone with a trainable head and reports
//! training and validation accuracy.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use emergency_vehicles::backend::{backend_name, TrainingBackend};
use emergency_vehicles::dataset::loader::VehicleDataset;
use emergency_vehicles::training::{
    TrainingConfig, DEFAULT_BATCH_SIZE, DEFAULT_EPOCHS, DEFAULT_LEARNING_RATE,
};
use emergency_vehicles::utils::logging::{init_logging, LogConfig};
use emergency_vehicles::DEFAULT_SEED;

/// Emergency vs Non-Emergency Vehicle Classification
///
/// Fine-tunes a pretrained ResNet-18 backbone on vehicle images using the
/// Burn framework. Only the classification head is trained.
#[derive(Parser, Debug)]
#[command(name = "emergency_vehicles")]
#[command(version)]
#[command(about = "Emergency vehicle classification with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full pipeline: load, split, train, evaluate
    Train {
        /// Path to the CSV label manifest
        #[arg(long, default_value = "dataset/emergency_train.csv")]
        csv: PathBuf,

        /// Directory containing the images named by the manifest
        #[arg(long, default_value = "dataset/images")]
        images_dir: PathBuf,

        /// Number of training epochs
        #[arg(short, long, default_value_t = DEFAULT_EPOCHS)]
        epochs: usize,

        /// Batch size for training and evaluation
        #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Fixed learning rate for the Adam optimizer
        #[arg(short, long, default_value_t = DEFAULT_LEARNING_RATE)]
        learning_rate: f64,

        /// Fraction of data held out for validation
        #[arg(long, default_value_t = 0.1)]
        validation_fraction: f64,

        /// Random seed for the split and epoch shuffling
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Burn record file with pretrained backbone weights
        #[arg(long)]
        pretrained: Option<PathBuf>,
    },

    /// Show dataset statistics
    Stats {
        /// Path to the CSV label manifest
        #[arg(long, default_value = "dataset/emergency_train.csv")]
        csv: PathBuf,

        /// Directory containing the images named by the manifest
        #[arg(long, default_value = "dataset/images")]
        images_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    print_banner();

    match cli.command {
        Commands::Train {
            csv,
            images_dir,
            epochs,
            batch_size,
            learning_rate,
            validation_fraction,
            seed,
            pretrained,
        } => {
            let config = TrainingConfig {
                csv_path: csv,
                images_dir,
                epochs,
                batch_size,
                learning_rate,
                validation_fraction,
                seed,
                pretrained,
            };

            info!("Starting training on backend: {}", backend_name());
            let report = emergency_vehicles::training::run_training::<TrainingBackend>(&config)?;

            println!();
            println!("{}", "Run Summary:".cyan().bold());
            println!("  training accuracy:   {:.4}", report.training_accuracy);
            println!("  validation accuracy: {:.4}", report.validation_accuracy);
        }

        Commands::Stats { csv, images_dir } => {
            cmd_stats(&csv, &images_dir)?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 ╔══════════════════════════════════════════════════════════╗
 ║   🚑 Emergency Vehicle Classification                    ║
 ║   ResNet-18 Fine-Tuning with Burn + Rust                 ║
 ╚══════════════════════════════════════════════════════════╝
  "#
        .green()
    );
}

fn cmd_stats(csv: &PathBuf, images_dir: &PathBuf) -> Result<()> {
    info!("Computing dataset statistics");
    println!("  🖥️  Backend: {}", backend_name());

    match VehicleDataset::from_manifest(csv, images_dir) {
        Ok(dataset) => {
            dataset.stats().print();
        }
        Err(e) => {
            println!("{} Failed to load dataset: {}", "Error:".red(), e);
            println!();
            println!("Expected layout:");
            println!("  {:?} with columns image_names,emergency_or_not", csv);
            println!("  {:?}/<image files referenced by the manifest>", images_dir);
        }
    }

    Ok(())
}
