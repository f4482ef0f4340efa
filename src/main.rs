//! Câmbio Charts - USD/BRL exchange rate visualizations
//!
//! Reads a prepared exchange-rate CSV and renders three static charts: the
//! rate over time, its yearly distribution and a year/value-range network.

mod charts;
mod data;
mod network;
mod stats;

use anyhow::{ensure, Context, Result};
use charts::{ChartStyle, DistributionChart, NetworkChart, TimelineChart};
use clap::Parser;
use data::{DataLoader, LoadOptions};
use env_logger::Env;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Prepared CSV with Data and USD_BRL columns
    #[arg(long, default_value = "usd_brl_preparado.csv")]
    input: PathBuf,

    /// Field separator of the input file
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Ignore columns other than Data, USD_BRL, Ano, Mes and Trimestre
    #[arg(long, default_value_t = false)]
    allow_extra_columns: bool,

    #[arg(long, default_value = "grafico_linhas.png")]
    line_chart: PathBuf,

    #[arg(long, default_value = "boxplot_anual.png")]
    boxplot: PathBuf,

    #[arg(long, default_value = "grafo_rede.png")]
    network: PathBuf,

    /// Output resolution, overrides the style file
    #[arg(long)]
    dpi: Option<u32>,

    /// JSON file overriding presentation defaults
    #[arg(long)]
    style: Option<PathBuf>,
}

fn run(cli: &Cli) -> Result<()> {
    ensure!(
        cli.delimiter.is_ascii(),
        "Delimiter must be a single ASCII character, got '{}'",
        cli.delimiter
    );

    let mut style = match &cli.style {
        Some(path) => ChartStyle::load(path)
            .with_context(|| format!("loading style from {}", path.display()))?,
        None => ChartStyle::default(),
    };
    if let Some(dpi) = cli.dpi {
        style = style.with_dpi(dpi);
        style.validate().context("applying --dpi")?;
    }

    let loader = DataLoader::new(LoadOptions {
        delimiter: cli.delimiter as u8,
        allow_extra_columns: cli.allow_extra_columns,
    });
    let observations = loader
        .load_observations(&cli.input)
        .context("preparing data")?;

    TimelineChart::render(&observations, &style, Some(&cli.line_chart))
        .context("rendering line chart")?;
    DistributionChart::render(&observations, &style, Some(&cli.boxplot))
        .context("rendering boxplot")?;
    NetworkChart::render(&observations, &style, Some(&cli.network))
        .context("rendering network graph")?;

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::debug!("Parsed arguments: {:?}", cli);
    log::info!("Starting USD/BRL exchange rate visualizations...");

    match run(&cli) {
        Ok(()) => {
            log::info!("All charts generated successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
