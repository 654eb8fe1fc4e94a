//! 对单个岩心样本运行完整流水线, 写出各阶段结果表并更新群体熵值表.

use std::error::Error;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use hetero_berry::prelude::*;
use log::{error, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use utils::loader;

mod cli;
mod report;

type AppResult<T> = Result<T, Box<dyn Error>>;

fn missing(what: &str) -> Box<dyn Error> {
    format!("cannot resolve the {what}, pass it explicitly").into()
}

fn load_population(path: &Path) -> AppResult<PopulationTable> {
    if path.exists() {
        Ok(table::read_population(path)?)
    } else {
        warn!(
            "Population table {} does not exist, starting from an empty population",
            path.display()
        );
        Ok(PopulationTable::default())
    }
}

fn run(args: &cli::Args) -> AppResult<()> {
    let config = args.to_config()?;
    let sample = sample_name_from_path(&args.sample_path)
        .ok_or_else(|| format!("no sample name in {}", args.sample_path.display()))?;
    let load_failed = |source| SampleError {
        sample: sample.clone(),
        stage: Stage::Load,
        source,
    };

    let source = open_volume(&args.sample_path).map_err(load_failed)?;
    let corpus = if config.entropy.standardize {
        let dir = loader::features_dir(args.features_folder.clone())
            .ok_or_else(|| missing("features folder"))?;
        Some(CsvReferenceCorpus::new(dir).map_err(load_failed)?)
    } else {
        None
    };
    let population_path = loader::population_path(args.population_path.clone())
        .ok_or_else(|| missing("population table path"))?;
    let output_root = loader::output_dir(args.output_folder.clone())
        .ok_or_else(|| missing("output folder"))?;

    let seed = config.seed.unwrap_or_else(rand::random);
    info!(
        "Random seed: {seed}, worker threads: {}",
        config.workers.unwrap_or_else(utils::cpus)
    );
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut aggregator = RankAggregator::new(load_population(&population_path)?);
    let run = SampleRun {
        sample: &sample,
        volume: source.as_ref(),
        corpus: corpus.as_ref().map(|c| c as &dyn ReferenceCorpus),
        bounds: None,
    };
    let report = run_sample(run, &config, &mut aggregator, &mut rng)?;

    let stamp = chrono::Local::now().format("%d%m%Y_%H%M%S");
    let out = output_root.join(format!("{sample}_{stamp}"));
    fs::create_dir_all(&out)?;
    table::write_info_table(out.join(format!("info_{sample}.csv")), &report.info)?;
    table::write_feature_table(out.join(format!("features_{sample}.csv")), &report.features)?;
    table::write_entropy_table(
        out.join(format!("entropy_{sample}.csv")),
        &report.entropy,
        &config.features,
    )?;
    table::write_rank_table(
        out.join(format!("rank_{sample}.csv")),
        &report.ranks,
        &config.features,
    )?;
    info!("Results written to {}", out.display());

    if let Some(parent) = population_path.parent() {
        fs::create_dir_all(parent)?;
    }
    table::write_population(&population_path, aggregator.table())?;

    report::print(&report)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = cli::Args::parse();
    if let Err(e) = simple_logger::SimpleLogger::new()
        .with_level(args.log_level)
        .env()
        .init()
    {
        eprintln!("Failed to install the logger: {e}");
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_population_is_empty() {
        let t = load_population(Path::new("/definitely/not/here/population.csv")).unwrap();
        assert!(t.is_empty());
    }
}
