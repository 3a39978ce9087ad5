//! Photo Booth CLI - Bridge interface for the web frontend
//!
//! Commands: save, capture, fetch, delete, list, print, cancel, status,
//! printers, test-printer
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on a classified failure, 1 on usage or config errors

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use photobooth_core::{
    config, ArtifactStore, LpGateway, PrintDispatcher, PrintResult, StoreError,
};

#[derive(Parser)]
#[command(name = "photobooth-cli")]
#[command(about = "Photo Booth CLI - Secure artifact store and print dispatcher")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an image under an existing id
    Save {
        #[arg(short, long)]
        id: String,

        /// Image file; its extension selects the format
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Store an image under a freshly generated id
    Capture {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print an image as a data URI
    Fetch { id: String },

    /// Remove an image
    Delete { id: String },

    /// List stored image ids
    List,

    /// Print an image
    Print {
        id: String,

        #[arg(short = 'n', long, default_value_t = 1)]
        copies: u32,
    },

    /// Cancel a print job
    Cancel { job_id: String },

    /// Show status of the configured printer
    Status,

    /// List printers known to the print subsystem
    Printers,

    /// Check the configured printer is ready
    TestPrinter,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            println!("{}", json!({"success": false, "error": e.to_string()}));
            return ExitCode::FAILURE;
        }
    };

    let store = match ArtifactStore::open(&config.storage, &config.security) {
        Ok(s) => Arc::new(s),
        Err(e) => return store_failure(e),
    };

    match cli.command {
        Commands::Save { id, file } => {
            let (bytes, ext) = match read_image(&store, &file) {
                Ok(v) => v,
                Err(code) => return code,
            };
            match store.save(&id, &bytes, &ext) {
                Ok(path) => emit(json!({"success": true, "id": id.to_lowercase(), "filePath": path})),
                Err(e) => store_failure(e),
            }
        }

        Commands::Capture { file } => {
            let (bytes, ext) = match read_image(&store, &file) {
                Ok(v) => v,
                Err(code) => return code,
            };
            match store.save_new(&bytes, &ext) {
                Ok((id, path)) => emit(json!({"success": true, "id": id, "filePath": path})),
                Err(e) => store_failure(e),
            }
        }

        Commands::Fetch { id } => match store.fetch(&id) {
            Ok(image) => emit(json!({"success": true, "image": image})),
            Err(e) => store_failure(e),
        },

        Commands::Delete { id } => match store.delete(&id) {
            Ok(()) => emit(json!({"success": true})),
            Err(e) => store_failure(e),
        },

        Commands::List => match store.list() {
            Ok(ids) => emit(json!({"success": true, "ids": ids})),
            Err(e) => store_failure(e),
        },

        Commands::Print { id, copies } => {
            let dispatcher = PrintDispatcher::new(store, LpGateway::system(), config.printing);
            print_outcome(dispatcher.dispatch(&id, copies).await)
        }

        Commands::Cancel { job_id } => {
            let dispatcher = PrintDispatcher::new(store, LpGateway::system(), config.printing);
            print_outcome(dispatcher.cancel(&job_id).await)
        }

        Commands::Status => {
            let dispatcher = PrintDispatcher::new(store, LpGateway::system(), config.printing);
            emit(json!({"success": true, "status": dispatcher.status().await}))
        }

        Commands::Printers => {
            let dispatcher = PrintDispatcher::new(store, LpGateway::system(), config.printing);
            emit(json!({"success": true, "printers": dispatcher.printers().await}))
        }

        Commands::TestPrinter => {
            let dispatcher = PrintDispatcher::new(store, LpGateway::system(), config.printing);
            print_outcome(dispatcher.test_printer().await)
        }
    }
}

/// Read an input image, refusing oversized files before loading them.
fn read_image(store: &ArtifactStore, file: &Path) -> Result<(Vec<u8>, String), ExitCode> {
    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    match std::fs::metadata(file) {
        Ok(meta) => store.check_size(meta.len()).map_err(store_failure)?,
        Err(e) => {
            println!("{}", json!({"success": false, "error": format!("Failed to read {}: {}", file.display(), e)}));
            return Err(ExitCode::FAILURE);
        }
    }

    match std::fs::read(file) {
        Ok(bytes) => Ok((bytes, ext)),
        Err(e) => {
            println!("{}", json!({"success": false, "error": format!("Failed to read {}: {}", file.display(), e)}));
            Err(ExitCode::FAILURE)
        }
    }
}

fn emit(value: serde_json::Value) -> ExitCode {
    println!("{}", serde_json::to_string_pretty(&value).unwrap());
    ExitCode::SUCCESS
}

fn store_failure(e: StoreError) -> ExitCode {
    let kind = e.kind();
    let output = json!({
        "success": false,
        "errorKind": kind,
        "message": kind.user_message(),
        "error": e.to_string(),
    });
    println!("{}", serde_json::to_string(&output).unwrap());
    ExitCode::from(2)
}

fn print_outcome(result: PrintResult) -> ExitCode {
    println!("{}", serde_json::to_string_pretty(&result).unwrap());
    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}
