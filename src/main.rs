mod app;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use app::{App, CacheAction, OutlierArgs};
use oceanplot::{DetectionMethod, HandlingStrategy, Settings};

#[derive(Parser)]
#[command(name = "oceanplot", version)]
#[command(about = "Outlier cleaning and eDNA sample grouping for survey data files")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    /// JSON settings file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct OutlierOpts {
    /// Comma-separated column names (default: detected numeric columns).
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<String>>,
    #[arg(long, value_enum)]
    method: Option<MethodCli>,
    #[arg(long)]
    sensitivity: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List columns that look numeric.
    Columns { file: PathBuf },
    /// Per-column outlier statistics as JSON.
    Stats {
        file: PathBuf,
        #[command(flatten)]
        opts: OutlierOpts,
    },
    /// Handle outliers and write the cleaned table as CSV.
    Clean {
        file: PathBuf,
        #[command(flatten)]
        opts: OutlierOpts,
        #[arg(long, value_enum)]
        strategy: Option<StrategyCli>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Group an eDNA metadata sheet into per-parameter spot samples.
    Edna {
        file: PathBuf,
        #[arg(long)]
        sample_id_column: Option<String>,
    },
    /// Show the dates encoded in a file name.
    Dates { name: String },
    /// Inspect or prune a saved transform cache.
    Cache {
        file: PathBuf,
        #[arg(value_enum, default_value_t = CacheActionCli::Stats)]
        action: CacheActionCli,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodCli {
    Iqr,
    Stddev,
    Zscore,
    ModifiedZscore,
}

impl From<MethodCli> for DetectionMethod {
    fn from(value: MethodCli) -> Self {
        match value {
            MethodCli::Iqr => DetectionMethod::Iqr,
            MethodCli::Stddev => DetectionMethod::StdDev,
            MethodCli::Zscore => DetectionMethod::ZScore,
            MethodCli::ModifiedZscore => DetectionMethod::ModifiedZScore,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyCli {
    Remove,
    Flag,
    Median,
    Mean,
    Cap,
}

impl From<StrategyCli> for HandlingStrategy {
    fn from(value: StrategyCli) -> Self {
        match value {
            StrategyCli::Remove => HandlingStrategy::Remove,
            StrategyCli::Flag => HandlingStrategy::Flag,
            StrategyCli::Median => HandlingStrategy::Median,
            StrategyCli::Mean => HandlingStrategy::Mean,
            StrategyCli::Cap => HandlingStrategy::Cap,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CacheActionCli {
    Stats,
    Prune,
}

impl OutlierOpts {
    fn into_args(self, strategy: Option<StrategyCli>) -> OutlierArgs {
        OutlierArgs {
            columns: self.columns,
            method: self.method.map(Into::into),
            sensitivity: self.sensitivity,
            strategy: strategy.map(Into::into),
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> oceanplot::Result<()> {
    let settings = Settings::load_or_default(cli.config.as_deref())?;
    let app = App::new(settings);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Columns { file } => app.columns(&file, &mut out),
        Commands::Stats { file, opts } => app.stats(&file, &opts.into_args(None), &mut out),
        Commands::Clean {
            file,
            opts,
            strategy,
            output,
        } => app.clean(&file, &opts.into_args(strategy), output.as_deref(), &mut out),
        Commands::Edna {
            file,
            sample_id_column,
        } => app.edna(&file, sample_id_column.as_deref(), &mut out),
        Commands::Dates { name } => app.dates(&name, &mut out),
        Commands::Cache { file, action } => {
            let action = match action {
                CacheActionCli::Stats => CacheAction::Stats,
                CacheActionCli::Prune => CacheAction::Prune,
            };
            app.cache(&file, action, &mut out)
        }
    }?;

    out.flush().map_err(|e| oceanplot::Error::io("<stdout>", e))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
