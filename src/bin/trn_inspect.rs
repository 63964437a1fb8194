use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use trn_editor::snapshot::parse_snapshot;
use trn_editor::{ParseOptions, TerrainDocument};

#[derive(Parser)]
#[command(name = "trn-inspect")]
#[command(about = "Inspect and patch terrain files")]
struct Cli {
    /// JSON file with parse options
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List boundary records
    Records { path: PathBuf },
    /// Dump the full chunk tree
    Tree { path: PathBuf },
    /// List layers with boundary counts
    Layers { path: PathBuf },
    /// Show global terrain parameters
    Params { path: PathBuf },
    /// List world placements from the companion snapshot
    Placements { path: PathBuf },
    /// Overwrite one field of one boundary record
    Edit {
        path: PathBuf,
        #[arg(long)]
        record: usize,
        #[arg(long)]
        field: String,
        #[arg(long)]
        value: f64,
        /// Defaults to overwriting the input after copying it to `.bak`
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    match run(cli) {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Failed to encode output: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            let err = json!({
                "success": false,
                "error": e.to_string()
            });
            println!("{}", err);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<Value, Box<dyn std::error::Error>> {
    let options = match &cli.config {
        Some(path) => ParseOptions::load(path)?,
        None => ParseOptions::default(),
    };

    let result = match cli.command {
        Commands::Records { path } => {
            let doc = open(&path, options)?;
            json!({
                "checksum": format!("{:08x}", doc.checksum()),
                "records": doc.boundaries(),
            })
        }
        Commands::Tree { path } => {
            let doc = open(&path, options)?;
            serde_json::to_value(doc.tree())?
        }
        Commands::Layers { path } => {
            let doc = open(&path, options)?;
            serde_json::to_value(doc.layers())?
        }
        Commands::Params { path } => {
            let doc = open(&path, options)?;
            serde_json::to_value(doc.params())?
        }
        Commands::Placements { path } => {
            let snapshot_path = companion_path(&path);
            if !snapshot_path.exists() {
                eprintln!("No placement data at {:?}", snapshot_path);
                return Ok(json!({ "templates": [], "placements": [] }));
            }
            let data = std::fs::read(&snapshot_path)?;
            serde_json::to_value(parse_snapshot(&data, &options.placement))?
        }
        Commands::Edit { path, record, field, value, output } => {
            let mut doc = open(&path, options)?;
            let outcome = doc.apply_edit(record, &field, value)?;

            let target = match output {
                Some(output) => output,
                None => {
                    let backup = path.with_extension("bak");
                    std::fs::copy(&path, &backup)?;
                    eprintln!("Backed up original to {:?}", backup);
                    path.clone()
                }
            };
            std::fs::write(&target, doc.bytes())?;
            doc.mark_saved();
            eprintln!("Wrote {:?}", target);

            json!({
                "success": true,
                "edit": outcome,
                "checksum": format!("{:08x}", doc.checksum()),
            })
        }
    };
    Ok(result)
}

fn open(path: &Path, options: ParseOptions) -> Result<TerrainDocument, Box<dyn std::error::Error>> {
    let data = std::fs::read(path)?;
    Ok(TerrainDocument::parse_with(data, options)?)
}

/// Snapshot stored next to a terrain: same stem, `.ws` extension.
fn companion_path(path: &Path) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ws") => path.to_path_buf(),
        _ => path.with_extension("ws"),
    }
}
