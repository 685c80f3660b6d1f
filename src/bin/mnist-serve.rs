//! Local host for the serving contract: load a checkpoint, classify files.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;

use mnist_serve::api::PredictResponse;
use mnist_serve::common::log;
use mnist_serve::{AppCfg, MnistModel, ServeCode, ServeError};

#[derive(Parser, Debug)]
#[command(name = "mnist-serve", version, about = "Serve a pre-trained MNIST classifier")]
struct Cli {
    /// Checkpoint to load. Defaults to `MNIST_SERVE_CHECKPOINT`, then /storage/model.pkl.
    #[arg(long, global = true)]
    checkpoint: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the checkpoint and report the input the network expects.
    Check,
    /// Classify image files, printing one JSON response per line.
    Predict {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Feature name forwarded with every request. Repeatable.
        #[arg(long = "feature-name")]
        feature_names: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let cfg = AppCfg::load();
    if let Err(err) = log::init(&cfg.log_filter) {
        eprintln!("{err}");
    }

    let checkpoint = cli.checkpoint.unwrap_or(cfg.checkpoint_path);
    let model = match MnistModel::from_checkpoint(&checkpoint) {
        Ok(model) => model,
        Err(err) => {
            eprintln!("{err}");
            return exit_code(err.code());
        }
    };

    match cli.command {
        Command::Check => {
            let report = json!({
                "ok": true,
                "checkpoint": model.checkpoint_path().display().to_string(),
                "input_shape": model.expected_input_shape(),
                "classes": model.config().num_classes,
            });
            println!("{report}");
            ExitCode::SUCCESS
        }
        Command::Predict {
            images,
            feature_names,
        } => {
            let names = (!feature_names.is_empty()).then_some(feature_names.as_slice());
            let mut status = ExitCode::SUCCESS;
            for image in images {
                let result = fs::read(&image)
                    .map_err(|err| {
                        ServeError::invalid(format!("cannot read {}: {err}", image.display()))
                    })
                    .and_then(|bytes| model.predict(&bytes, names));
                if let Err(err) = &result {
                    status = exit_code(err.code());
                }
                println!(
                    "{}\t{}",
                    image.display(),
                    PredictResponse::from_result(&result).to_json()
                );
            }
            status
        }
    }
}

fn exit_code(code: ServeCode) -> ExitCode {
    ExitCode::from(code as u8)
}
