//! 群体百分位排名.
//!
//! 群体熵值表按 `(样本, 划分因子, 校准选项)` 唯一. 同名样本再次提交时,
//! 先在副本上删除旧行, 追加新行并计算排名, 成功后才替换在用的表.

use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};

use crate::consts::RANK_SCALE;
use crate::entropy::EntropyRecord;
use crate::grid::{Feature, FeatureSet};
use crate::{HeteroError, HeteroResult};

/// 群体熵值表的行键.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntropyKey {
    /// 样本名.
    pub sample: String,
    /// 划分因子.
    pub division: usize,
    /// 是否经过对比度校准.
    pub contrast_adjustment: bool,
}

/// 群体熵值表.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PopulationTable {
    rows: BTreeMap<EntropyKey, BTreeMap<Feature, f64>>,
}

impl PopulationTable {
    /// 由熵值记录构建. 键重复时后出现的记录覆盖先出现的.
    pub fn from_records<I: IntoIterator<Item = EntropyRecord>>(records: I) -> Self {
        let mut table = Self::default();
        for r in records {
            table.insert(r);
        }
        table
    }

    /// 插入一行, 返回被覆盖的旧值.
    pub fn insert(&mut self, record: EntropyRecord) -> Option<BTreeMap<Feature, f64>> {
        let key = EntropyKey {
            sample: record.sample,
            division: record.division,
            contrast_adjustment: record.contrast_adjustment,
        };
        self.rows.insert(key, record.values)
    }

    /// 删除某个样本的所有行, 返回删除的行数.
    pub fn remove_sample(&mut self, sample: &str) -> usize {
        let before = self.rows.len();
        self.rows.retain(|k, _| k.sample != sample);
        before - self.rows.len()
    }

    /// 表中是否有该样本.
    pub fn contains_sample(&self, sample: &str) -> bool {
        self.rows.keys().any(|k| k.sample == sample)
    }

    /// 行数.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 获取一行.
    pub fn get(&self, key: &EntropyKey) -> Option<&BTreeMap<Feature, f64>> {
        self.rows.get(key)
    }

    /// 表中所有样本名, 升序.
    pub fn samples(&self) -> BTreeSet<&str> {
        self.rows.keys().map(|k| k.sample.as_str()).collect()
    }

    /// 表中出现过的所有特征.
    pub fn features(&self) -> FeatureSet {
        let present: BTreeSet<Feature> =
            self.rows.values().flat_map(|v| v.keys().copied()).collect();
        present.into_iter().collect()
    }

    /// 按键序导出所有行.
    pub fn records(&self) -> Vec<EntropyRecord> {
        self.rows
            .iter()
            .map(|(k, v)| EntropyRecord {
                sample: k.sample.clone(),
                division: k.division,
                contrast_adjustment: k.contrast_adjustment,
                values: v.clone(),
            })
            .collect()
    }

    /// `(division, contrast_adjustment)` 分区内所有带有限 `feature` 值的行.
    fn column(&self, division: usize, contrast_adjustment: bool, feature: Feature) -> Vec<(&str, f64)> {
        self.rows
            .iter()
            .filter(|(k, _)| k.division == division && k.contrast_adjustment == contrast_adjustment)
            .filter_map(|(k, v)| {
                v.get(&feature)
                    .copied()
                    .filter(|x| x.is_finite())
                    .map(|x| (k.sample.as_str(), x))
            })
            .collect()
    }
}

/// 单个样本在一个 `(划分因子, 校准选项)` 下的各特征百分位排名.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankRecord {
    /// 样本名.
    pub sample: String,
    /// 划分因子.
    pub division: usize,
    /// 是否经过对比度校准.
    pub contrast_adjustment: bool,
    /// 各特征的百分位排名, 位于 `(0, 100]`.
    pub ranks: BTreeMap<Feature, f64>,
}

/// 百分位排名 `100 · r / n`. `r` 为 1 起始的名次, 并列值取其名次的平均值.
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // 名次 start + 1 ..= end 的平均值.
        let avg = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = avg / n as f64 * RANK_SCALE;
        }
        start = end;
    }
    ranks
}

/// 排名聚合器. 拥有群体熵值表.
#[derive(Clone, Debug, Default)]
pub struct RankAggregator {
    table: PopulationTable,
}

impl RankAggregator {
    /// 以已有的群体熵值表创建.
    #[inline]
    pub fn new(table: PopulationTable) -> Self {
        Self { table }
    }

    /// 当前群体熵值表.
    #[inline]
    pub fn table(&self) -> &PopulationTable {
        &self.table
    }

    /// 取出群体熵值表.
    #[inline]
    pub fn into_table(self) -> PopulationTable {
        self.table
    }

    /// 提交 `sample` 的全部熵值记录, 返回该样本的排名记录.
    ///
    /// 该样本原有的行总是被整体替换, `records` 为空时即从群体中移除该样本.
    /// 记录中出现其它样本时返回错误, 群体表保持不变.
    /// 群体中缺少某特征值的行不参与该特征的排名.
    pub fn submit(
        &mut self,
        sample: &str,
        records: &[EntropyRecord],
        features: &FeatureSet,
    ) -> HeteroResult<Vec<RankRecord>> {
        if let Some(other) = records.iter().find(|r| r.sample != sample) {
            return Err(HeteroError::validation(format!(
                "record of {} submitted as part of {sample}",
                other.sample
            )));
        }

        let mut staged = self.table.clone();
        let replaced = staged.remove_sample(sample);
        for r in records {
            staged.insert(r.clone());
        }
        if records.is_empty() && replaced > 0 {
            warn!("No entropy record for {sample}, its {replaced} old rows are removed");
        }

        let partitions: BTreeSet<(usize, bool)> = records
            .iter()
            .map(|r| (r.division, r.contrast_adjustment))
            .collect();
        let mut out: BTreeMap<(usize, bool), BTreeMap<Feature, f64>> = partitions
            .iter()
            .map(|&p| (p, BTreeMap::new()))
            .collect();
        for &(division, adj) in &partitions {
            for f in features.iter() {
                let column = staged.column(division, adj, f);
                let values: Vec<f64> = column.iter().map(|&(_, v)| v).collect();
                let ranks = percentile_ranks(&values);
                let own = column.iter().zip(ranks).find(|((s, _), _)| *s == sample);
                if let (Some((_, rank)), Some(row)) = (own, out.get_mut(&(division, adj))) {
                    row.insert(f, rank);
                }
            }
        }

        info!(
            "Ranked {sample} against {} samples ({replaced} rows replaced)",
            staged.samples().len()
        );
        self.table = staged;
        Ok(out
            .into_iter()
            .map(|((division, contrast_adjustment), ranks)| RankRecord {
                sample: sample.to_string(),
                division,
                contrast_adjustment,
                ranks,
            })
            .collect())
    }
}
