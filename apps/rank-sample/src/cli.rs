//! 命令行参数.

use std::path::PathBuf;

use clap::Parser;
use hetero_berry::consts::{DEFAULT_ADJUSTMENTS, DEFAULT_DIVISIONS};
use hetero_berry::prelude::*;

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim() {
        "True" | "true" | "1" => Ok(true),
        "False" | "false" | "0" => Ok(false),
        other => Err(format!("`{other}` is not a boolean")),
    }
}

fn parse_level(s: &str) -> Result<log::LevelFilter, String> {
    s.parse().map_err(|_| format!("`{s}` is not a log level"))
}

/// 对单个岩心样本计算纹理异质性熵值, 并在群体中排名.
#[derive(Parser, Debug)]
#[command(name = "rank-sample", version)]
pub struct Args {
    /// 体数据文件 (.npy, .nii, .nii.gz). 样本名取文件名去掉扩展名.
    #[arg(long)]
    pub sample_path: PathBuf,

    /// 参考特征库目录 (默认 $HETERO_FEATURES_DIR 或 $HOME/dataset/features).
    #[arg(long, value_name = "DIR")]
    pub features_folder: Option<PathBuf>,

    /// 输出根目录 (默认 $HETERO_OUTPUT_DIR 或 $HOME/dataset/output).
    #[arg(long, value_name = "DIR")]
    pub output_folder: Option<PathBuf>,

    /// 群体熵值表 (默认 $HETERO_POPULATION_PATH 或 $HOME/dataset/entropy/population.csv).
    #[arg(long, value_name = "CSV")]
    pub population_path: Option<PathBuf>,

    /// 网格划分因子, 逗号分隔.
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_DIVISIONS)]
    pub division_list: Vec<usize>,

    /// 对比度校准选项, 逗号分隔 (True / False).
    #[arg(long, value_delimiter = ',', value_parser = parse_bool, default_values_t = DEFAULT_ADJUSTMENTS)]
    pub contrast_adjustment_options: Vec<bool>,

    /// 特征名, 逗号分隔. 缺省时使用全部特征.
    #[arg(long, value_delimiter = ',')]
    pub feature_list: Vec<String>,

    /// z 方向起始层 (含). 必须与 `--z-fin` 同时给出.
    #[arg(long, requires = "z_fin")]
    pub z_ini: Option<usize>,

    /// z 方向结束层 (不含). 必须与 `--z-ini` 同时给出.
    #[arg(long, requires = "z_ini")]
    pub z_fin: Option<usize>,

    /// 随机数种子. 缺省时随机生成并写入日志.
    #[arg(long)]
    pub seed: Option<u64>,

    /// 线程数上限. 缺省时使用所有可用核心.
    #[arg(long)]
    pub workers: Option<usize>,

    /// 估计熵之前不按参考特征库标准化.
    #[arg(long)]
    pub no_scale: bool,

    /// 日志级别.
    #[arg(long, default_value = "info", value_parser = parse_level)]
    pub log_level: log::LevelFilter,
}

impl Args {
    /// 转换为流水线配置.
    pub fn to_config(&self) -> HeteroResult<RunConfig> {
        let features = if self.feature_list.is_empty() {
            FeatureSet::all()
        } else {
            FeatureSet::parse(&self.feature_list)?
        };
        let mut config = RunConfig {
            divisions: self.division_list.clone(),
            contrast_adjustments: self.contrast_adjustment_options.clone(),
            features,
            z_range: self.z_ini.zip(self.z_fin),
            workers: self.workers,
            seed: self.seed,
            ..Default::default()
        };
        config.entropy.standardize = !self.no_scale;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["rank-sample", "--sample-path", "s.npy"]);
        let c = args.to_config().unwrap();
        assert_eq!(c.divisions, DEFAULT_DIVISIONS.to_vec());
        assert_eq!(c.contrast_adjustments, vec![true, false]);
        assert!(c.entropy.standardize);
        assert_eq!(c.z_range, None);
    }

    #[test]
    fn test_lists() {
        let args = Args::parse_from([
            "rank-sample",
            "--sample-path",
            "s.npy",
            "--division-list",
            "2,4",
            "--contrast-adjustment-options",
            "False",
            "--feature-list",
            "mean,variation coefficient",
            "--z-ini",
            "10",
            "--z-fin",
            "90",
            "--no-scale",
        ]);
        let c = args.to_config().unwrap();
        assert_eq!(c.divisions, vec![2, 4]);
        assert_eq!(c.contrast_adjustments, vec![false]);
        assert_eq!(
            c.features.as_slice(),
            &[Feature::Mean, Feature::VariationCoefficient]
        );
        assert_eq!(c.z_range, Some((10, 90)));
        assert!(!c.entropy.standardize);
    }

    #[test]
    fn test_unknown_feature_fails() {
        let args = Args::parse_from(["rank-sample", "--sample-path", "s.npy", "--feature-list", "entropy"]);
        assert!(matches!(args.to_config(), Err(HeteroError::Validation(_))));
    }

    #[test]
    fn test_z_requires_both() {
        assert!(Args::try_parse_from(["rank-sample", "--sample-path", "s.npy", "--z-ini", "3"]).is_err());
    }
}
