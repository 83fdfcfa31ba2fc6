//! XRose CLI - inspect and edit rose diagram documents

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use xrose::config::{self, XRoseConfig};
use xrose::ui::{self, Icons};
use xrose::{Document, WindowSize};

#[derive(Parser)]
#[command(name = "xrose")]
#[command(version = "0.1.0")]
#[command(about = "Inspect and edit XRose rose diagram documents")]
#[command(long_about = r#"
XRose documents are SQLite databases holding the diagram setup (window,
geometry, layers, colors, datasets) next to the raw directional data tables.

Every command loads the document into memory; commands that change it save
the whole working copy back.

Example usage:
  xrose init field.xrose
  xrose summary -d field.xrose
  xrose columns outcrop -d field.xrose
  xrose rename-table outcrop site_a -d field.xrose
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Document path (defaults to the one in xrose.toml)
    #[arg(short, long, global = true)]
    document: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, global = true)]
    format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty document
    Init {
        /// Path of the new document
        path: PathBuf,

        /// Overwrite an existing document or config
        #[arg(long)]
        force: bool,

        /// Also write xrose.toml pointing at the new document
        #[arg(long)]
        config: bool,
    },

    #[command(flatten)]
    Document(DocumentCommands),
}

/// Commands that work on an existing document
#[derive(Subcommand)]
enum DocumentCommands {
    /// Show window, geometry, layers, datasets and tables
    Summary,

    /// List every table with its row count
    Tables,

    /// Show the columns of a table
    Columns {
        /// Table name
        table: String,
    },

    /// List layers in drawing order
    Layers,

    /// List datasets
    Datasets,

    /// Print the values of a dataset
    Values {
        /// Dataset id
        id: i64,
    },

    /// Rename a data table
    RenameTable { from: String, to: String },

    /// Drop a data table
    DropTable { name: String },

    /// Add a column to a data table
    AddColumn {
        table: String,

        /// Column definition, e.g. "dip REAL"
        definition: String,
    },

    /// Show or set the stored window size
    WindowSize {
        width: Option<f64>,
        height: Option<f64>,
    },

    /// Copy the document to a new file through the in-memory store
    Copy {
        /// Destination path
        target: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let settings = config::load_config(None)?.unwrap_or_default();
    let json = cli
        .format
        .as_deref()
        .or(settings.format.as_deref())
        .is_some_and(|f| f.eq_ignore_ascii_case("json"));

    match cli.command {
        Commands::Init { path, force, config } => init(&path, force, config),
        Commands::Document(command) => {
            let path = document_path(cli.document, &settings)?;
            run(command, &path, json)
        }
    }
}

fn run(command: DocumentCommands, path: &Path, json: bool) -> anyhow::Result<()> {
    let mut document = Document::open(path)?;

    match command {
        DocumentCommands::Summary => summary(&document, path, json)?,
        DocumentCommands::Tables => {
            let inventory = document.table_inventory()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&inventory)?);
            } else {
                ui::section(Icons::DATABASE, "Tables");
                println!("{}", ui::inventory_table(&inventory));
            }
        }
        DocumentCommands::Columns { table } => {
            let columns = document.columns(&table)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&columns)?);
            } else {
                ui::section(Icons::COLUMN, &format!("Columns of {}", table));
                println!("{}", ui::columns_table(&columns));
            }
        }
        DocumentCommands::Layers => {
            if json {
                println!("{}", serde_json::to_string_pretty(document.layers())?);
            } else if document.layers().is_empty() {
                ui::info("Layers", "none");
            } else {
                ui::section(Icons::LAYERS, "Layers");
                println!("{}", ui::layers_table(document.layers()));
            }
        }
        DocumentCommands::Datasets => {
            if json {
                println!("{}", serde_json::to_string_pretty(document.data_sets())?);
            } else if document.data_sets().is_empty() {
                ui::info("Datasets", "none");
            } else {
                ui::section(Icons::STATS, "Datasets");
                println!("{}", ui::data_sets_table(document.data_sets()));
                for data_set in document.data_sets() {
                    if let Some(comments) = &data_set.comments {
                        ui::summary_row(&format!("[{}]", data_set.id), comments);
                    }
                }
            }
        }
        DocumentCommands::Values { id } => {
            let data_set = document
                .data_set(id)
                .ok_or_else(|| anyhow::anyhow!("no dataset with id {}", id))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&data_set.values)?);
            } else {
                for value in &data_set.values {
                    println!("{}", value);
                }
            }
        }
        DocumentCommands::RenameTable { from, to } => {
            document.rename_table(&from, &to)?;
            document.save_in_place()?;
            ui::success(&format!("Renamed {} to {}", from, to));
        }
        DocumentCommands::DropTable { name } => {
            let readers = document.data_sets_reading(&name);
            if readers > 0 {
                ui::warn(&format!("{} is still read by {} datasets", name, readers));
            }
            document.drop_table(&name)?;
            document.save_in_place()?;
            ui::success(&format!("Dropped {}", name));
        }
        DocumentCommands::AddColumn { table, definition } => {
            document.add_column(&table, &definition)?;
            document.save_in_place()?;
            ui::success(&format!("Added {} to {}", definition, table));
        }
        DocumentCommands::WindowSize { width, height } => match (width, height) {
            (Some(width), Some(height)) => {
                document.set_window_size(WindowSize::new(width, height))?;
                document.save_in_place()?;
                ui::success(&format!("Window size set to {} x {}", width, height));
            }
            (None, None) => {
                let size = document.window_size();
                if json {
                    println!("{}", serde_json::to_string_pretty(&size)?);
                } else {
                    ui::info("Window size", &format!("{} x {}", size.width, size.height));
                }
            }
            _ => anyhow::bail!("give both width and height to set the window size"),
        },
        DocumentCommands::Copy { target } => {
            config::ensure_document_dir(&target)?;
            document.save(&target)?;
            ui::success(&format!("Copied {} to {}", path.display(), target.display()));
        }
    }

    Ok(())
}

fn document_path(explicit: Option<PathBuf>, settings: &XRoseConfig) -> anyhow::Result<PathBuf> {
    explicit
        .or_else(|| settings.document_path())
        .ok_or_else(|| anyhow::anyhow!("no document given (use --document or set one in xrose.toml)"))
}

fn init(path: &Path, force: bool, write_config: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    config::ensure_document_dir(path)?;
    let mut document = Document::new()?;
    document.save(path)?;
    ui::success(&format!("Created {}", path.display()));

    if write_config {
        let settings = XRoseConfig {
            document: Some(path.display().to_string()),
            format: None,
        };
        let config_path = config::default_config_path();
        config::write_config(&config_path, &settings, force)?;
        ui::info("Config", &config_path.display().to_string());
    }
    Ok(())
}

fn summary(document: &Document, path: &Path, json: bool) -> anyhow::Result<()> {
    let mut layers_by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for layer in document.layers() {
        *layers_by_type.entry(layer.kind().as_str()).or_default() += 1;
    }
    let orphaned = document.orphaned_tables();

    if json {
        let summary = serde_json::json!({
            "file": path.display().to_string(),
            "window_size": document.window_size(),
            "geometry": document.geometry(),
            "layer_count": document.layers().len(),
            "layers_by_type": layers_by_type,
            "dataset_count": document.data_sets().len(),
            "data_tables": document.table_names(),
            "orphaned_tables": orphaned,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    ui::header(&format!("XRose document {}", path.display()));

    let size = document.window_size();
    let geometry = document.geometry();
    let mut stats = ui::TableBuilder::new();
    stats.add_row("Window", &format!("{} x {}", size.width, size.height));
    stats.add_row("Equal area", &geometry.is_equal_area.to_string());
    stats.add_row("Sector size", &format!("{}°", geometry.sector_size));
    stats.add_row("Sector count", &geometry.sector_count.to_string());
    stats.add_row("Starting angle", &format!("{}°", geometry.starting_angle));
    stats.add_row("Layers", &document.layers().len().to_string());
    stats.add_row("Datasets", &document.data_sets().len().to_string());
    stats.add_row("Data tables", &document.table_names().len().to_string());
    println!("{}", stats.build());

    if !layers_by_type.is_empty() {
        ui::section(Icons::LAYERS, "Layers by type");
        for layer in document.layers() {
            ui::summary_row(&ui::kind_label(layer.kind()), layer.name());
        }
    }

    if !orphaned.is_empty() {
        ui::section(Icons::TABLE, "Tables not used by any dataset");
        for table in &orphaned {
            let rows = document.store().row_count(table)?;
            ui::summary_row(table, &ui::muted(&format!("{} rows", rows)));
        }
    }

    Ok(())
}
