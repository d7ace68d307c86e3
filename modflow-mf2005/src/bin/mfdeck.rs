use anyhow::Context;
use clap::{Parser, Subcommand};
use modflow_mf2005::{LoadOptions, Model};
use modflow_output::{compare_head_files, CompareOptions, HeadFile, HobOutput};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mfdeck")]
#[command(about = "Inspect, rewrite and compare MODFLOW-2005 models")]
struct Cli {
    /// Log package-level progress
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a model and write it to another directory
    Roundtrip {
        /// Name file of the model
        nam: PathBuf,
        /// Directory to write into
        outdir: PathBuf,
        /// Keep packages that fail to parse as raw text
        #[arg(long)]
        forgive: bool,
        /// Only load these package types (DIS is always loaded)
        #[arg(long, value_delimiter = ',')]
        load_only: Option<Vec<String>>,
    },
    /// Print the unit table of a model
    Units {
        nam: PathBuf,
    },
    /// Summarise the records of a binary head file
    Heads {
        file: PathBuf,
        /// Print the records as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Compare two head files cell by cell
    Compare {
        a: PathBuf,
        b: PathBuf,
        /// Largest absolute difference accepted
        #[arg(long, default_value = "0.001")]
        tolerance: f64,
    },
    /// Summarise the residuals of a HOB output file
    HobCheck {
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Roundtrip {
            nam,
            outdir,
            forgive,
            load_only,
        } => {
            let mut options = LoadOptions {
                verbose: cli.verbose,
                forgive,
                check: true,
                load_only: None,
            };
            if let Some(ftypes) = load_only {
                options = options.with_load_only(ftypes);
            }
            let mut model = Model::load(&nam, &options)
                .with_context(|| format!("loading {}", nam.display()))?;
            model.change_workspace(&outdir);
            model
                .write_input()
                .with_context(|| format!("writing to {}", outdir.display()))?;

            println!(
                "Wrote {} packages to {}",
                model.packages().len(),
                model.name_file_path().display()
            );
            for failure in model.load_failures() {
                println!(
                    "  kept {} ({}) as raw text: {}",
                    failure.ftype, failure.fname, failure.message
                );
            }
        }
        Commands::Units { nam } => {
            let model = Model::load(&nam, &LoadOptions::forgiving())
                .with_context(|| format!("loading {}", nam.display()))?;
            println!("{:<14} {:>6}  {:<8} FILE", "TYPE", "UNIT", "PACKAGE");
            println!(
                "{:<14} {:>6}  {:<8} {}",
                "LIST",
                model.list_unit(),
                "",
                model.list_file_name()
            );
            for entry in model.units().entries() {
                println!(
                    "{:<14} {:>6}  {:<8} {}",
                    entry.name_file_type(),
                    entry.unit,
                    entry.package.as_deref().unwrap_or(""),
                    entry.fname
                );
            }
        }
        Commands::Heads { file, json } => {
            let heads = HeadFile::open(&file)
                .with_context(|| format!("opening {}", file.display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(heads.records())?);
                return Ok(());
            }
            println!(
                "{} precision, {} layers x {} rows x {} columns, {} records",
                match heads.precision() {
                    modflow_output::Precision::Single => "single",
                    modflow_output::Precision::Double => "double",
                },
                heads.nlay(),
                heads.nrow(),
                heads.ncol(),
                heads.records().len()
            );
            for record in heads.records() {
                println!(
                    "kstp={:<4} kper={:<4} totim={:<12} layer={:<3} {}",
                    record.kstp,
                    record.kper,
                    record.totim,
                    record.ilay,
                    record.text.trim()
                );
            }
        }
        Commands::Compare { a, b, tolerance } => {
            let comparison = compare_head_files(&a, &b, &CompareOptions::with_tolerance(tolerance))
                .with_context(|| format!("comparing {} with {}", a.display(), b.display()))?;
            comparison.write_summary(std::io::stdout())?;
            if !comparison.passed {
                anyhow::bail!(
                    "{} records differ by more than {} ({} structural problems)",
                    comparison.failed_records().count(),
                    tolerance,
                    comparison.failures.len()
                );
            }
        }
        Commands::HobCheck { file } => {
            let output = HobOutput::read(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            for (name, residual) in output.residuals() {
                println!("{:<20} {:>14.6}", name, residual);
            }
            if let Some(rmse) = output.rmse() {
                println!("\nRMSE: {:.6} over {} observations", rmse, output.rows.len());
            }
            if let Some(worst) = output.max_abs_residual() {
                println!("Largest residual: {} ({:.6})", worst.name, worst.residual());
            }
        }
    }

    Ok(())
}
