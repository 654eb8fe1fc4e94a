//! 单样本流水线.
//!
//! 体数据 → ROI 定位 → 对比度校准 → 网格特征 → 特征熵 → 群体排名.
//! 任一阶段的致命错误都会中止该样本, 此时群体熵值表保持不变.

use std::collections::BTreeMap;
use std::fmt;

use log::{info, warn};
use rand::Rng;
use thiserror::Error;

use crate::bounds::BoundsDetector;
use crate::calibrate::{ContrastCalibrator, ContrastReference};
use crate::config::RunConfig;
use crate::dataset::table::InfoRow;
use crate::dataset::{ReferenceCorpus, VolumeSource, VoxelType};
use crate::entropy::{EntropyEstimator, EntropyRecord, EntropyTaskKey};
use crate::grid::{FeatureTable, GridFeatureExtractor};
use crate::parallel::{TaskFailure, TaskFailures};
use crate::rank::{RankAggregator, RankRecord};
use crate::{Bounds, HeteroError, HeteroResult};

mod clock;

pub use clock::StageClock;

/// 流水线阶段.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// 读取体数据.
    Load,
    /// ROI 定位.
    Bounds,
    /// 对比度校准.
    Calibrate,
    /// 网格特征.
    Features,
    /// 特征熵.
    Entropy,
    /// 群体排名.
    Rank,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Load => "load",
            Self::Bounds => "bounds",
            Self::Calibrate => "calibrate",
            Self::Features => "features",
            Self::Entropy => "entropy",
            Self::Rank => "rank",
        })
    }
}

/// 中止样本处理的错误.
#[derive(Debug, Error)]
#[error("sample `{sample}` failed at stage {stage}: {source}")]
pub struct SampleError {
    /// 样本名.
    pub sample: String,
    /// 出错的阶段.
    pub stage: Stage,
    /// 底层错误.
    pub source: HeteroError,
}

/// 一次样本处理的输入.
pub struct SampleRun<'a> {
    /// 样本名.
    pub sample: &'a str,
    /// 体数据源.
    pub volume: &'a dyn VolumeSource,
    /// 参考特征库. 启用标准化时必须提供.
    pub corpus: Option<&'a dyn ReferenceCorpus>,
    /// 预先确定的 ROI. 给定时跳过自动定位.
    pub bounds: Option<Bounds>,
}

/// 一次样本处理的全部结果.
#[derive(Debug)]
pub struct SampleReport {
    /// 样本名.
    pub sample: String,
    /// ROI.
    pub bounds: Bounds,
    /// 校准参考值. 未请求校准时为 `None`.
    pub reference: Option<ContrastReference>,
    /// 信息表, 每个校准选项一行.
    pub info: Vec<InfoRow>,
    /// 子立方体特征表.
    pub features: FeatureTable,
    /// 特征熵.
    pub entropy: Vec<EntropyRecord>,
    /// 熵无定义而被跳过的任务.
    pub skipped: Vec<TaskFailure<EntropyTaskKey>>,
    /// 排名.
    pub ranks: Vec<RankRecord>,
    /// 各阶段耗时.
    pub timings: StageClock,
}

/// 逐个记录失败的任务, 以键序最小的失败中止样本.
fn task_failed<K: fmt::Display>(
    sample: &str,
    stage: Stage,
) -> impl FnOnce(TaskFailures<K>) -> SampleError + '_ {
    move |failures| {
        for f in failures.iter() {
            warn!("Task {} of {sample} failed at stage {stage}: {}", f.key, f.error);
        }
        SampleError {
            sample: sample.to_string(),
            stage,
            source: failures.into_first().error,
        }
    }
}

/// 处理单个样本, 并把它的熵值提交到 `aggregator`.
pub fn run_sample<R: Rng + ?Sized>(
    run: SampleRun<'_>,
    config: &RunConfig,
    aggregator: &mut RankAggregator,
    rng: &mut R,
) -> Result<SampleReport, SampleError> {
    let sample = run.sample;
    let fail = |stage: Stage| {
        move |source: HeteroError| SampleError {
            sample: sample.to_string(),
            stage,
            source,
        }
    };

    config.validate().map_err(fail(Stage::Load))?;
    let mut clock = StageClock::new();
    info!("Processing sample {sample}");

    let volume = clock
        .time(Stage::Load, || match run.volume.dtype() {
            VoxelType::U16 => run.volume.read_all(),
            other => Err(HeteroError::validation(format!(
                "voxel type {other} is not supported, expected u16"
            ))),
        })
        .map_err(fail(Stage::Load))?;
    info!("Loaded {sample}: shape {:?}", volume.shape());

    let bounds = match run.bounds {
        Some(b) if b.is_within(volume.shape()) && b.voxels() > 0 => b,
        Some(b) => {
            return Err(fail(Stage::Bounds)(HeteroError::validation(format!(
                "bounds {b:?} do not fit volume shape {:?}",
                volume.shape()
            ))))
        }
        None => clock
            .time(Stage::Bounds, || {
                BoundsDetector::new(config.detector).detect(&volume, config.z_range, rng)
            })
            .map_err(fail(Stage::Bounds))?,
    };
    info!("Bounds of {sample}: {bounds:?}");

    let adjustments = config.adjustments();
    let calibrator = ContrastCalibrator::new(config.calibration);
    let (reference, volumes) = clock
        .time(Stage::Calibrate, || -> HeteroResult<_> {
            let reference = if adjustments.contains(&true) {
                Some(calibrator.reference(&volume, bounds.z_range(), rng)?)
            } else {
                None
            };
            let mut volumes = BTreeMap::new();
            for &adj in &adjustments {
                let r = if adj { reference.as_ref() } else { None };
                volumes.insert(
                    (sample.to_string(), adj),
                    ContrastCalibrator::prepare(&volume, &bounds, r)?,
                );
            }
            Ok((reference, volumes))
        })
        .map_err(fail(Stage::Calibrate))?;
    if let Some(r) = reference.as_ref() {
        info!(
            "Contrast reference of {sample}: voidmean = {:.3}, rockmedian = {:.3}",
            r.voidmean(),
            r.rockmedian()
        );
    }
    drop(volume);

    let info_rows = adjustments
        .iter()
        .map(|&adj| InfoRow {
            dataset: sample.to_string(),
            bounds,
            contrast_adjustment: adj,
            voidmean: reference.filter(|_| adj).map(|r| r.voidmean()),
            rockmedian: reference.filter(|_| adj).map(|r| r.rockmedian()),
        })
        .collect();

    let extractor = GridFeatureExtractor::new(&config.divisions, config.features.clone())
        .map_err(fail(Stage::Features))?
        .with_workers(config.workers);
    let features = clock
        .time(Stage::Features, || extractor.extract(&volumes))
        .map_err(task_failed(sample, Stage::Features))?;
    drop(volumes);
    info!("Extracted {} subcube feature rows for {sample}", features.len());

    let estimator = EntropyEstimator::new(config.entropy).with_workers(config.workers);
    let outcome = clock
        .time(Stage::Entropy, || estimator.estimate(sample, &features, run.corpus))
        .map_err(task_failed(sample, Stage::Entropy))?;

    let ranks = clock
        .time(Stage::Rank, || aggregator.submit(sample, &outcome.records, &config.features))
        .map_err(fail(Stage::Rank))?;

    info!("Sample {sample} done ({clock})");
    Ok(SampleReport {
        sample: sample.to_string(),
        bounds,
        reference,
        info: info_rows,
        features,
        entropy: outcome.records,
        skipped: outcome.failed,
        ranks,
        timings: clock,
    })
}
