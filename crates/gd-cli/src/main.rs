//! gdgen CLI
//!
//! Command-line tool for turning game-data spreadsheets into generated code and JSON data.

use clap::{Parser, Subcommand};
use gd_core::{
    enumeration_columns, BatchReport, Config, Dispatcher, FieldValue, Manifest, TableKind,
    CONFIG_FILE_NAME,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gd-cli")]
#[command(about = "Game data spreadsheet code generator", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Log debug detail (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse every source under the configured directories
    Build,

    /// Parse specific files as one table kind
    Parse {
        /// Table kind: convert, enum or variable
        #[arg(short, long)]
        kind: TableKind,

        /// Source files
        #[arg(short, long, required = true)]
        file: Vec<PathBuf>,
    },

    /// List every table in the manifest
    List {
        /// Show source and output files for each table
        #[arg(short, long)]
        verbose: bool,
    },

    /// Remove tables and delete their generated files
    Remove {
        /// Table names
        #[arg(short, long, required = true)]
        name: Vec<String>,
    },

    /// Parse manifested tables again (all of them when no name is given)
    Reparse {
        /// Table names
        #[arg(short, long)]
        name: Vec<String>,
    },

    /// Validate a source and print its rows without writing anything
    Show {
        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        /// Table kind: convert, enum or variable
        #[arg(short, long)]
        kind: TableKind,

        /// Maximum number of rows to display
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Write a configuration file with default settings
    InitConfig {
        /// Output path for the configuration file
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("gd_core=debug,gd_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gd_core=info,gd_cli=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Returns whether every table involved succeeded
fn run(cli: Cli) -> gd_core::Result<bool> {
    let config = cli.config.as_path();

    match cli.command {
        Commands::Build => cmd_build(config),
        Commands::Parse { kind, file } => cmd_parse(config, kind, &file),
        Commands::List { verbose } => cmd_list(config, verbose).map(|()| true),
        Commands::Remove { name } => cmd_remove(config, &name).map(|()| true),
        Commands::Reparse { name } => cmd_reparse(config, &name),
        Commands::Show { file, kind, limit } => cmd_show(config, &file, kind, limit).map(|()| true),
        Commands::InitConfig { output, force } => cmd_init_config(&output, force).map(|()| true),
    }
}

fn load_config(path: &Path) -> gd_core::Result<Config> {
    if path.exists() {
        return Config::load(path);
    }

    info!("{} not found, using default settings", path.display());
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(Config::default().resolved_against(base))
}

fn cmd_build(config_path: &Path) -> gd_core::Result<bool> {
    let config = load_config(config_path)?;
    let mut manifest = Manifest::load(&config.manifest_path)?;
    let report = Dispatcher::from_config(&mut manifest, &config)?.build(&config.sources)?;
    Ok(print_report(&report))
}

fn cmd_parse(config_path: &Path, kind: TableKind, files: &[PathBuf]) -> gd_core::Result<bool> {
    let config = load_config(config_path)?;
    let mut manifest = Manifest::load(&config.manifest_path)?;
    let report = Dispatcher::from_config(&mut manifest, &config)?.parse_files(files, kind)?;
    Ok(print_report(&report))
}

fn cmd_reparse(config_path: &Path, names: &[String]) -> gd_core::Result<bool> {
    let config = load_config(config_path)?;
    let mut manifest = Manifest::load(&config.manifest_path)?;
    let report = Dispatcher::from_config(&mut manifest, &config)?.reparse(names)?;
    Ok(print_report(&report))
}

fn cmd_list(config_path: &Path, verbose: bool) -> gd_core::Result<()> {
    let config = load_config(config_path)?;
    let manifest = Manifest::load(&config.manifest_path)?;

    println!("Tables ({}):", manifest.len());
    println!();

    for entry in manifest.iter() {
        if verbose {
            println!("{} [{}]", entry.name, entry.kind);
            println!("  source: {}", entry.source_path.display());
            for output in &entry.output_paths {
                println!("  output: {}", output.display());
            }
            println!();
        } else {
            println!("  {} [{}]", entry.name, entry.kind);
        }
    }

    Ok(())
}

fn cmd_remove(config_path: &Path, names: &[String]) -> gd_core::Result<()> {
    let config = load_config(config_path)?;
    let mut manifest = Manifest::load(&config.manifest_path)?;
    let removed = Dispatcher::from_config(&mut manifest, &config)?.remove(names)?;

    println!("Removed {} table(s):", removed.len());
    for entry in &removed {
        println!("  {} [{}]", entry.name, entry.kind);
    }

    Ok(())
}

fn cmd_show(config_path: &Path, file: &Path, kind: TableKind, limit: Option<usize>) -> gd_core::Result<()> {
    let config = load_config(config_path)?;
    let mut manifest = Manifest::load(&config.manifest_path)?;
    let table = Dispatcher::from_config(&mut manifest, &config)?.preview(file, kind)?;

    println!("Table: {} [{}]", table.name, table.kind);
    println!("File: {}", file.display());
    println!("Columns: {}", table.column_count());
    println!("Rows: {}", table.row_count());

    let enums: Vec<&str> = enumeration_columns(&table.columns).map(|(_, e)| e).collect();
    if !enums.is_empty() {
        println!("Enumerations: {}", enums.join(", "));
    }
    println!();

    let mut header = vec!["ID".to_string()];
    header.extend(table.columns.iter().map(|c| format!("{}:{}", c.name, c.type_name)));
    println!("{}", header.join("\t"));
    println!("{}", "-".repeat(header.len() * 12));

    let row_limit = limit.unwrap_or(10);
    for row in table.rows.iter().take(row_limit) {
        let mut values = vec![row.id.clone()];
        values.extend(table.columns.iter().map(|c| {
            row.get(&c.key())
                .map(display_value)
                .unwrap_or_else(|| "#".to_string())
        }));
        println!("{}", values.join("\t"));
    }

    if table.row_count() > row_limit {
        println!("... ({} more rows)", table.row_count() - row_limit);
    }

    Ok(())
}

fn cmd_init_config(output: &Path, force: bool) -> gd_core::Result<()> {
    if output.exists() && !force {
        return Err(gd_core::Error::Config(format!(
            "{} already exists (use --force to overwrite)",
            output.display()
        )));
    }

    Config::default().save(output)?;
    println!("Created configuration file: {}", output.display());
    println!();
    println!("Edit the source directories, then run:");
    println!("  gd-cli --config {} build", output.display());

    Ok(())
}

/// Print a batch summary; returns whether the batch had no failures
fn print_report(report: &BatchReport) -> bool {
    for entry in &report.parsed {
        println!("  parsed {} [{}]", entry.name, entry.kind);
    }
    for path in &report.skipped {
        println!("  skipped {}", path.display());
    }

    if !report.failures.is_empty() {
        println!("\nFailures ({}):", report.failures.len());
        for failure in &report.failures {
            println!("  {}: {}", failure.source_path.display(), failure.error);
        }
    }

    println!();
    println!(
        "{} table(s) parsed, {} failed",
        report.parsed.len(),
        report.failures.len()
    );

    report.is_success()
}

fn display_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Scalar(text) => text.clone(),
        FieldValue::Array(items) => format!("[{}]", items.join(", ")),
    }
}
