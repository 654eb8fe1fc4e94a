//! 多分辨率网格特征.
//!
//! 对每个 `(样本, 校准选项, 划分因子 d)`, 把 ROI 划分为
//! `⌊z / s⌋ x d x d` 个边长为 `s = ⌊min(x, y) / d⌋` 的子立方体, 余下的体素舍弃.
//! 子立方体 `(i, j, k)` 的编号为 `i·d² + j·d + k`.

use std::collections::BTreeMap;
use std::fmt;

use itertools::iproduct;
use log::info;
use ndarray::{s, Array3, ArrayView3};

use crate::parallel::{run_keyed, TaskFailures};
use crate::{HeteroError, HeteroResult};

mod feature;

pub use feature::{compute, Feature, FeatureSet};

/// 网格任务键.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridKey {
    /// 样本名.
    pub sample: String,
    /// 是否经过对比度校准.
    pub contrast_adjustment: bool,
    /// 划分因子.
    pub division: usize,
}

impl fmt::Display for GridKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, contrast_adjustment = {}, division = {})",
            self.sample, self.contrast_adjustment, self.division
        )
    }
}

/// 单个子立方体的键.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubcubeKey {
    /// 所属网格.
    pub grid: GridKey,
    /// 子立方体编号.
    pub subcube: usize,
}

/// 子立方体特征表. 行按 `(样本, 校准选项, 划分因子, 子立方体编号)` 排序,
/// 每行的值与 [`FeatureTable::features`] 一一对应.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureTable {
    features: FeatureSet,
    rows: BTreeMap<SubcubeKey, Vec<f64>>,
}

impl FeatureTable {
    /// 创建空表.
    pub fn new(features: FeatureSet) -> Self {
        Self {
            features,
            rows: BTreeMap::new(),
        }
    }

    /// 列 (特征) 顺序.
    #[inline]
    pub fn features(&self) -> &FeatureSet {
        &self.features
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

    /// 插入一行. `values` 的长度必须与特征数相同, 否则程序 panic.
    pub fn insert(&mut self, key: SubcubeKey, values: Vec<f64>) {
        assert_eq!(values.len(), self.features.len(), "特征列数不符");
        self.rows.insert(key, values);
    }

    /// 按键序迭代所有行.
    pub fn rows(&self) -> impl Iterator<Item = (&SubcubeKey, &[f64])> {
        self.rows.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// 某个网格内的所有行, 按子立方体编号排序.
    fn grid_rows<'a>(&'a self, grid: &'a GridKey) -> impl Iterator<Item = &'a [f64]> + 'a {
        let lo = SubcubeKey {
            grid: grid.clone(),
            subcube: 0,
        };
        self.rows
            .range(lo..)
            .take_while(move |(k, _)| k.grid == *grid)
            .map(|(_, v)| v.as_slice())
    }

    /// 某个网格内所有子立方体的 `feature` 值, 按子立方体编号排序.
    /// `feature` 不在表中时返回空.
    pub fn values(&self, grid: &GridKey, feature: Feature) -> Vec<f64> {
        let Some(col) = self.features.iter().position(|f| f == feature) else {
            return Vec::new();
        };
        self.grid_rows(grid).map(|v| v[col]).collect()
    }

    /// 同 [`FeatureTable::values`], 但整行舍弃任一特征值非有限 (NaN, inf) 的子立方体.
    pub fn complete_values(&self, grid: &GridKey, feature: Feature) -> Vec<f64> {
        let Some(col) = self.features.iter().position(|f| f == feature) else {
            return Vec::new();
        };
        self.grid_rows(grid)
            .filter(|v| v.iter().all(|x| x.is_finite()))
            .map(|v| v[col])
            .collect()
    }

    /// 表中出现过的所有网格键.
    pub fn grids(&self) -> Vec<GridKey> {
        let mut v: Vec<GridKey> = self.rows.keys().map(|k| k.grid.clone()).collect();
        v.dedup();
        v
    }
}

/// 多分辨率网格特征提取器.
#[derive(Clone, Debug)]
pub struct GridFeatureExtractor {
    divisions: Vec<usize>,
    features: FeatureSet,
    workers: Option<usize>,
}

impl GridFeatureExtractor {
    /// 创建提取器. 每个划分因子必须不小于 2, 特征集合不能为空.
    pub fn new(divisions: &[usize], features: FeatureSet) -> HeteroResult<Self> {
        if let Some(d) = divisions.iter().find(|&&d| d < 2) {
            return Err(HeteroError::validation(format!(
                "division {d} is invalid, divisions must be at least 2"
            )));
        }
        if divisions.is_empty() {
            return Err(HeteroError::validation("no division given"));
        }
        if features.is_empty() {
            return Err(HeteroError::validation("no feature given"));
        }
        let mut divisions = divisions.to_vec();
        divisions.sort_unstable();
        divisions.dedup();
        Ok(Self {
            divisions,
            features,
            workers: None,
        })
    }

    /// 限制线程数.
    #[inline]
    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    /// 划分因子, 升序.
    #[inline]
    pub fn divisions(&self) -> &[usize] {
        &self.divisions
    }

    /// 特征集合.
    #[inline]
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// 对 `volumes` (键为 `(样本名, 校准选项)`) 中的每个体数据和每个划分因子提取特征.
    ///
    /// 所有任务共享同一份只读映射. 任何一个任务失败时, 返回所有失败的网格, 按键排序.
    pub fn extract(
        &self,
        volumes: &BTreeMap<(String, bool), Array3<f32>>,
    ) -> Result<FeatureTable, TaskFailures<GridKey>> {
        let shared: BTreeMap<GridKey, ArrayView3<f32>> =
            iproduct!(volumes.iter(), self.divisions.iter())
                .map(|(((sample, adj), vol), &division)| {
                    let key = GridKey {
                        sample: sample.clone(),
                        contrast_adjustment: *adj,
                        division,
                    };
                    (key, vol.view())
                })
                .collect();
        let keys: Vec<GridKey> = shared.keys().cloned().collect();

        let batch = run_keyed(&keys, self.workers, |key| {
            extract_grid(shared[key], key.division, &self.features)
                .map_err(|e| retag(e, key))
        });
        if let Some(failures) = TaskFailures::collect(batch.failed) {
            return Err(failures);
        }

        let mut table = FeatureTable::new(self.features.clone());
        for (grid, cubes) in batch.done {
            info!("Grid {grid}: {} subcubes", cubes.len());
            for (subcube, values) in cubes {
                let key = SubcubeKey {
                    grid: grid.clone(),
                    subcube,
                };
                table.insert(key, values);
            }
        }
        Ok(table)
    }
}

fn retag(e: HeteroError, key: &GridKey) -> HeteroError {
    match e {
        HeteroError::Validation(m) => HeteroError::Validation(format!("{key}: {m}")),
        other => other,
    }
}

/// 网格几何 `(子立方体边长, z 方向个数)`. 任一为 0 时报错.
pub fn grid_shape((z, x, y): (usize, usize, usize), division: usize) -> HeteroResult<(usize, usize)> {
    let segment = x.min(y) / division.max(1);
    if segment == 0 {
        return Err(HeteroError::validation(format!(
            "division {division} is too fine for a {x}x{y} section"
        )));
    }
    let divisions_z = z / segment;
    if divisions_z == 0 {
        return Err(HeteroError::validation(format!(
            "depth {z} is smaller than the subcube edge {segment}"
        )));
    }
    Ok((segment, divisions_z))
}

/// 计算单个网格内所有子立方体的特征, 按编号升序返回.
pub fn extract_grid(
    volume: ArrayView3<f32>,
    division: usize,
    features: &FeatureSet,
) -> HeteroResult<Vec<(usize, Vec<f64>)>> {
    let (seg, dz) = grid_shape(volume.dim(), division)?;
    let mut buf = Vec::with_capacity(seg * seg * seg);
    let mut out = Vec::with_capacity(dz * division * division);

    for (i, j, k) in iproduct!(0..dz, 0..division, 0..division) {
        let part = volume.slice(s![
            i * seg..(i + 1) * seg,
            j * seg..(j + 1) * seg,
            k * seg..(k + 1) * seg
        ]);
        buf.clear();
        buf.extend(part.iter().map(|&v| v as f64));
        let values = compute(&mut buf, features)
            .ok_or_else(|| HeteroError::computation("empty subcube"))?;
        out.push((i * division * division + j * division + k, values));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::textured_volume;

    fn extractor(divisions: &[usize], names: &[&str]) -> GridFeatureExtractor {
        GridFeatureExtractor::new(divisions, FeatureSet::parse(names).unwrap()).unwrap()
    }

    #[test]
    fn test_grid_shape() {
        assert_eq!(grid_shape((10, 12, 13), 2).unwrap(), (6, 1));
        assert_eq!(grid_shape((20, 9, 9), 3).unwrap(), (3, 6));
        assert!(matches!(
            grid_shape((20, 12, 12), 20),
            Err(HeteroError::Validation(_))
        ));
        assert!(matches!(
            grid_shape((2, 12, 12), 2),
            Err(HeteroError::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_extractor() {
        assert!(GridFeatureExtractor::new(&[1, 2], FeatureSet::all()).is_err());
        assert!(GridFeatureExtractor::new(&[], FeatureSet::all()).is_err());
        assert!(GridFeatureExtractor::new(&[2], FeatureSet::from_iter(std::iter::empty())).is_err());
    }

    #[test]
    fn test_record_count_and_index() {
        let vol = textured_volume((20, 9, 10), 1000);
        let cubes = extract_grid(vol.view(), 3, &FeatureSet::all()).unwrap();
        assert_eq!(cubes.len(), 6 * 9);
        let idx: Vec<usize> = cubes.iter().map(|(i, _)| *i).collect();
        assert_eq!(idx, (0..54).collect::<Vec<_>>());

        // 子立方体 (i, j, k) = (1, 2, 0), 编号 1·9 + 2·3 + 0 = 15.
        let part = vol.slice(s![3..6, 6..9, 0..3]);
        let mean = part.iter().map(|&v| v as f64).sum::<f64>() / 27.0;
        assert!((cubes[15].1[0] - mean).abs() < 1e-9);
        let max = part.iter().fold(f32::MIN, |a, &b| a.max(b)) as f64;
        assert_eq!(cubes[15].1[3], max);
    }

    #[test]
    fn test_extract_table() {
        let mut volumes = BTreeMap::new();
        volumes.insert(("s1".to_string(), true), textured_volume((32, 32, 32), 100));
        volumes.insert(("s1".to_string(), false), textured_volume((32, 32, 32), 9000));
        let ex = extractor(&[4, 2], &["mean", "max"]);
        assert_eq!(ex.divisions(), &[2, 4]);

        let table = ex.extract(&volumes).unwrap();
        // 2 个校准选项 x (8 + 64) 个子立方体.
        assert_eq!(table.len(), 2 * (8 + 64));
        assert_eq!(table.grids().len(), 4);

        let key = GridKey {
            sample: "s1".into(),
            contrast_adjustment: false,
            division: 2,
        };
        let means = table.values(&key, Feature::Mean);
        assert_eq!(means.len(), 8);
        assert!(means.iter().all(|&m| m > 9000.0));
        assert!(table.values(&key, Feature::Std).is_empty());
    }

    #[test]
    fn test_extract_deterministic() {
        let mut volumes = BTreeMap::new();
        volumes.insert(("s".to_string(), true), textured_volume((24, 24, 24), 500));
        let ex = extractor(&[2, 3], &["mean", "std", "skewness", "kurtosis", "median"])
            .with_workers(Some(3));
        let a = ex.extract(&volumes).unwrap();
        let b = ex.extract(&volumes).unwrap();
        let bits = |t: &FeatureTable| -> Vec<u64> {
            t.rows().flat_map(|(_, v)| v.iter().map(|x| x.to_bits())).collect()
        };
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_extract_failure_carries_key() {
        let mut volumes = BTreeMap::new();
        volumes.insert(("thin".to_string(), false), textured_volume((3, 16, 16), 500));
        let err = extractor(&[2], &["mean"]).extract(&volumes).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.first().key.sample, "thin");
        assert_eq!(err.first().key.division, 2);
        assert!(matches!(err.first().error, HeteroError::Validation(_)));
    }

    #[test]
    fn test_every_failed_grid_reported() {
        let mut volumes = BTreeMap::new();
        // 深度 6: d = 2 时边长 8 放不下, d = 4 时边长 4 可以, d = 8 时边长 2 可以.
        volumes.insert(("a".to_string(), false), textured_volume((6, 16, 16), 500));
        volumes.insert(("a".to_string(), true), textured_volume((6, 16, 16), 900));
        let err = extractor(&[2, 4, 8], &["mean"]).extract(&volumes).unwrap_err();
        let keys: Vec<(bool, usize)> = err
            .iter()
            .map(|f| (f.key.contrast_adjustment, f.key.division))
            .collect();
        assert_eq!(keys, vec![(false, 2), (true, 2)]);
    }

    #[test]
    fn test_complete_values_drop_rows() {
        let grid = GridKey {
            sample: "s".into(),
            contrast_adjustment: true,
            division: 2,
        };
        let mut table = FeatureTable::new(FeatureSet::parse(["mean", "skewness"]).unwrap());
        for (i, row) in [[1.0, 0.1], [2.0, f64::NAN], [3.0, -0.2]].into_iter().enumerate() {
            let key = SubcubeKey {
                grid: grid.clone(),
                subcube: i,
            };
            table.insert(key, row.to_vec());
        }
        assert_eq!(table.values(&grid, Feature::Mean), vec![1.0, 2.0, 3.0]);
        assert_eq!(table.complete_values(&grid, Feature::Mean), vec![1.0, 3.0]);
        assert_eq!(table.complete_values(&grid, Feature::Skewness), vec![0.1, -0.2]);
    }
}
