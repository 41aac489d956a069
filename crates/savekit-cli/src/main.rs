//! savekit command line tools.
//!
//! Provides the `savekit` binary with subcommands for inspecting checkpoint
//! layouts, dumping a saved manifest, and saving a module described in JSON.
//! Every subcommand prints a JSON document to stdout; diagnostics and logs go
//! to stderr. The log filter is read from `SAVEKIT_LOG` (default `info`).

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use savekit_core::Module;
use savekit_storage::layout::flat::FlatTensorInfo;
use savekit_storage::layout::native::CheckpointMetadata;
use savekit_storage::{
    get_checkpoint_layout, get_checkpoint_layout_pytree, load_manifest, save, CheckpointLayout,
    LayoutConvention, LayoutInstance, SaveOptions, StorageError,
};

/// Environment variable holding the tracing filter directive.
const LOG_ENV: &str = "SAVEKIT_LOG";

/// Checkpoint and export inspection tools.
#[derive(Parser)]
#[command(name = "savekit", about = "Checkpoint layout and manifest tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Detect and validate the layout of a checkpoint.
    Layout {
        /// Checkpoint directory or file.
        #[arg(short, long)]
        path: PathBuf,

        /// Expected convention: native, flat_tensor (aliases: orbax, flat, safetensors).
        #[arg(short, long, default_value = "native")]
        layout: String,

        /// Also resolve the pytree checkpointable.
        #[arg(long)]
        pytree: bool,

        /// Checkpointable to validate as the pytree (implies --pytree).
        #[arg(short, long)]
        checkpointable: Option<String>,
    },

    /// Load manifest.pb from an export directory and print it.
    Manifest {
        /// Export directory.
        #[arg(short, long)]
        path: PathBuf,
    },

    /// Save a JSON-described module as manifest.pb.
    Save {
        /// Module graph as JSON.
        #[arg(short, long)]
        module: PathBuf,

        /// SaveOptions as JSON.
        #[arg(long)]
        options: PathBuf,

        /// Export directory (created if missing).
        #[arg(short = 'O', long)]
        output_dir: PathBuf,
    },
}

/// JSON report printed by `layout`.
#[derive(Serialize)]
struct LayoutReport {
    path: PathBuf,
    convention: LayoutConvention,
    #[serde(skip_serializing_if = "Option::is_none")]
    checkpointable: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    has_indicator_file: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checkpoint_metadata: Option<CheckpointMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tensors: Option<Vec<FlatTensorInfo>>,
}

fn main() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Layout {
            path,
            layout,
            pytree,
            checkpointable,
        } => run_layout(&path, &layout, pytree, checkpointable.as_deref()),
        Commands::Manifest { path } => run_manifest(&path),
        Commands::Save {
            module,
            options,
            output_dir,
        } => run_save(&module, &options, &output_dir),
    };

    match result {
        Ok(json) => {
            println!("{}", json);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            process::exit(exit_code(&e));
        }
    }
}

/// Exit code for a failed command: 1 = invalid layout or data,
/// 2 = caller precondition violated, 3 = I/O error.
fn exit_code(err: &StorageError) -> i32 {
    match err {
        StorageError::Precondition(_) => 2,
        StorageError::Io(_) => 3,
        _ => 1,
    }
}

fn run_layout(
    path: &Path,
    layout: &str,
    pytree: bool,
    checkpointable: Option<&str>,
) -> Result<String, StorageError> {
    let convention: LayoutConvention = layout.parse()?;
    tracing::debug!(path = %path.display(), %convention, pytree, "inspecting checkpoint");

    let (instance, checkpointable) = if pytree || checkpointable.is_some() {
        get_checkpoint_layout_pytree(path, convention, checkpointable)?
    } else {
        (get_checkpoint_layout(path, convention)?, None)
    };

    let mut report = LayoutReport {
        path: instance.path().to_path_buf(),
        convention: instance.convention(),
        checkpointable,
        has_indicator_file: None,
        checkpoint_metadata: None,
        tensors: None,
    };
    match &instance {
        LayoutInstance::Native(native) => {
            report.has_indicator_file = Some(native.has_indicator_file());
            report.checkpoint_metadata = native.checkpoint_metadata()?;
        }
        LayoutInstance::FlatTensor(flat) => {
            report.tensors = Some(flat.tensor_specs()?);
        }
    }
    Ok(serde_json::to_string_pretty(&report)?)
}

fn run_manifest(path: &Path) -> Result<String, StorageError> {
    let manifest = load_manifest(path)?;
    Ok(serde_json::to_string_pretty(&manifest)?)
}

fn run_save(module: &Path, options: &Path, output_dir: &Path) -> Result<String, StorageError> {
    let module: Module = serde_json::from_slice(&fs::read(module)?)?;
    let options = SaveOptions::from_json(&fs::read_to_string(options)?)?;
    save(&module, output_dir, Some(&options))?;

    let manifest = load_manifest(output_dir)?;
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "path": output_dir,
        "version": manifest.version,
        "variables": manifest.variables.len(),
        "functions": manifest.functions.len(),
    }))?)
}
