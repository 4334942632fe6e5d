use std::path::PathBuf;

use bimodal_basic::BimodalBasic;
use clap::{Parser, Subcommand, ValueEnum};
use common::{
    config::{Config, Settings, SweepRange, Sweeps},
    plot::Plot,
    report::{attempt_line, bimodal_listing, bimodal_summary, gshare_listing, gshare_summary},
    result::RateExtractor,
    sweep::{Predictor, SweepResults, aggregate_bimodal, aggregate_gshare_with, planned_files},
};
use eyre::Result;
use gshare_basic::GshareBasic;
use tracing::{debug, error, info};
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const MODULES: &[&str] = &["common", "bimodal_basic", "gshare_basic"];

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long)]
    log: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract misprediction rates, print the report and plot them
    Run {
        /// Config file, the built-in gcc/jpeg sweep when omitted
        #[arg(short, long)]
        config_file: Option<PathBuf>,
        /// Only run one predictor's sweep
        #[arg(short, long)]
        predictor: Option<PredictorArg>,
        /// Do not generate plots
        #[arg(long, default_value_t = false)]
        skip_plot: bool,
    },
    /// Print the result files a sweep reads
    Print {
        #[arg(short, long)]
        config_file: Option<PathBuf>,
        #[arg(short, long)]
        predictor: Option<PredictorArg>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PredictorArg {
    Bimodal,
    Gshare,
}

impl From<PredictorArg> for Predictor {
    fn from(value: PredictorArg) -> Self {
        match value {
            PredictorArg::Bimodal => Predictor::Bimodal,
            PredictorArg::Gshare => Predictor::Gshare,
        }
    }
}

fn selected(predictor: Option<PredictorArg>) -> Vec<Predictor> {
    match predictor {
        Some(p) => vec![p.into()],
        None => vec![Predictor::Bimodal, Predictor::Gshare],
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();
    let file_appender = tracing_appender::rolling::never(".", "log.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let mut env_filter = EnvFilter::new(format!("predictor_sweep={log_level}"));

    if !args.log.is_empty() {
        for log in &args.log {
            env_filter = env_filter.add_directive(log.parse()?);
        }
    }

    for module in MODULES {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(layer().with_writer(non_blocking))
        .init();

    if let Err(err) = execute(args.command).await {
        error!("{err:#?}");
        return Err(err);
    }

    Ok(())
}

async fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            config_file,
            predictor,
            skip_plot,
        } => run(load_config(config_file).await?, &selected(predictor), skip_plot).await,
        Commands::Print {
            config_file,
            predictor,
        } => {
            print_files(load_config(config_file).await?, &selected(predictor));
            Ok(())
        }
    }
}

/// The gcc/jpeg sweep the traces are usually produced for
fn default_config() -> Config {
    let plots: Vec<Box<dyn Plot>> = vec![
        Box::new(BimodalBasic {
            y_range: [("jpeg".to_owned(), (7.5, 8.0))].into_iter().collect(),
        }),
        Box::new(GshareBasic::default()),
    ];
    Config {
        name: "branch-predictors".to_owned(),
        settings: Settings::default(),
        benchmarks: vec!["gcc".to_owned(), "jpeg".to_owned()],
        sweeps: Sweeps {
            m: SweepRange::new(7, 12, 1),
            n: SweepRange::new(2, 12, 2),
        },
        plots: Some(plots),
    }
}

async fn load_config(config_file: Option<PathBuf>) -> Result<Config> {
    match config_file {
        Some(path) => Config::load(&path).await,
        None => {
            debug!("No config file given, using defaults");
            Ok(default_config())
        }
    }
}

async fn run(config: Config, predictors: &[Predictor], skip_plot: bool) -> Result<()> {
    let extractor = RateExtractor::new()?;
    let space = config.sweep_space();
    let data_dir = &config.settings.data_dir;
    info!(
        "Running {} over {} benchmarks from {}",
        config.name,
        space.benchmarks.len(),
        data_dir.display()
    );

    let mut results = SweepResults::default();
    if predictors.contains(&Predictor::Bimodal) {
        let sweep = aggregate_bimodal(&extractor, data_dir, &space.benchmarks, &space.m).await;
        println!("{}", bimodal_listing(&sweep));
        results.bimodal = Some(sweep);
    }
    if predictors.contains(&Predictor::Gshare) {
        let sweep = aggregate_gshare_with(&extractor, data_dir, &space, |attempt| {
            println!("{}", attempt_line(attempt))
        })
        .await;
        println!("{}", gshare_listing(&sweep));
        results.gshare = Some(sweep);
    }

    if !skip_plot {
        let plots = config.plots.map(|plots| {
            plots
                .into_iter()
                .filter(|plot| {
                    let ready = plot.required_sweeps().iter().all(|p| results.has(*p));
                    if !ready {
                        debug!("Skipping {plot:?}");
                    }
                    ready
                })
                .collect::<Vec<_>>()
        });
        let written = common::plot::plot(&plots, &results, &config.settings.plot_dir).await?;
        if !written.is_empty() {
            println!("Plots have been saved:");
            for path in written {
                println!("  {}", path.display());
            }
        }
    }

    println!("\nData for report:");
    if let Some(sweep) = &results.bimodal {
        print!("{}", bimodal_summary(sweep));
    }
    if let Some(sweep) = &results.gshare {
        print!("{}", gshare_summary(sweep));
    }
    Ok(())
}

fn print_files(config: Config, predictors: &[Predictor]) {
    let space = config.sweep_space();
    for predictor in predictors {
        println!("{}:", predictor.name());
        for path in planned_files(*predictor, &config.settings.data_dir, &space) {
            if path.exists() {
                println!("  {}", path.display());
            } else {
                println!("  {} (missing)", path.display());
            }
        }
    }
}
