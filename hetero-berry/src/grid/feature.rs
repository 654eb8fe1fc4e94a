//! 子立方体统计特征.

use std::fmt;
use std::str::FromStr;

use crate::stats::{median, Moments};
use crate::HeteroError;

/// 子立方体上的统计特征.
///
/// 排列顺序即各结果表中的列顺序.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Feature {
    /// 均值.
    Mean,
    /// 总体标准差.
    Std,
    /// 最小值.
    Min,
    /// 最大值.
    Max,
    /// 有偏偏度.
    Skewness,
    /// 有偏超额峰度.
    Kurtosis,
    /// 变异系数.
    VariationCoefficient,
    /// 中位数.
    Median,
}

impl Feature {
    /// 全部特征, 按默认顺序.
    pub const ALL: [Feature; 8] = [
        Feature::Mean,
        Feature::Std,
        Feature::Min,
        Feature::Max,
        Feature::Skewness,
        Feature::Kurtosis,
        Feature::VariationCoefficient,
        Feature::Median,
    ];

    /// 规范名称, 即结果表的列名.
    pub const fn name(self) -> &'static str {
        match self {
            Feature::Mean => "mean",
            Feature::Std => "std",
            Feature::Min => "min",
            Feature::Max => "max",
            Feature::Skewness => "skewness",
            Feature::Kurtosis => "kurtosis",
            Feature::VariationCoefficient => "variation coefficient",
            Feature::Median => "median",
        }
    }

    /// 取值是否直接来自体素强度 (离散), 熵估计时使用 Shannon 熵.
    /// 其余特征使用 KDE 微分熵.
    #[inline]
    pub const fn is_discrete(self) -> bool {
        matches!(self, Feature::Max | Feature::Min | Feature::Median)
    }

    /// 排名表中对应的列名 `<name>_rank`.
    pub fn rank_column(self) -> String {
        format!("{}_rank", self.name())
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = HeteroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(|c: char| c == '_' || c == '-', " ");
        Ok(match key.as_str() {
            "mean" => Feature::Mean,
            "std" => Feature::Std,
            "min" => Feature::Min,
            "max" => Feature::Max,
            "skewness" | "skew" => Feature::Skewness,
            "kurtosis" => Feature::Kurtosis,
            "variation coefficient" | "variation" | "cv" => Feature::VariationCoefficient,
            "median" => Feature::Median,
            _ => {
                return Err(HeteroError::validation(format!(
                    "unknown feature name {s:?}"
                )))
            }
        })
    }
}

/// 有序且不重复的特征集合.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureSet(Vec<Feature>);

impl Default for FeatureSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<Feature> for FeatureSet {
    /// 去重并保留首次出现的顺序.
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        let mut v: Vec<Feature> = Vec::new();
        for f in iter {
            if !v.contains(&f) {
                v.push(f);
            }
        }
        Self(v)
    }
}

impl FeatureSet {
    /// 全部 8 个特征.
    #[inline]
    pub fn all() -> Self {
        Self(Feature::ALL.to_vec())
    }

    /// 解析特征名列表. 任一名称未知时立即失败.
    pub fn parse<I, S>(names: I) -> Result<Self, HeteroError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|s| s.as_ref().parse::<Feature>())
            .collect::<Result<Self, _>>()
    }

    /// 特征个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 是否包含 `f`.
    #[inline]
    pub fn contains(&self, f: Feature) -> bool {
        self.0.contains(&f)
    }

    /// 按顺序迭代.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Feature> + '_ {
        self.0.iter().copied()
    }

    /// 以切片形式访问.
    #[inline]
    pub fn as_slice(&self) -> &[Feature] {
        &self.0
    }
}

/// 对一组体素值计算 `features` 中的每个特征, 顺序与 `features` 一致.
///
/// `values` 会被就地重排 (中位数需要排序). 空输入时返回 `None`.
pub fn compute(values: &mut [f64], features: &FeatureSet) -> Option<Vec<f64>> {
    let m = Moments::from_slice(values)?;
    let mut out = Vec::with_capacity(features.len());
    for f in features.iter() {
        out.push(match f {
            Feature::Mean => m.mean(),
            Feature::Std => m.std(),
            Feature::Min => m.min(),
            Feature::Max => m.max(),
            Feature::Skewness => m.skewness(),
            Feature::Kurtosis => m.kurtosis(),
            Feature::VariationCoefficient => m.variation(),
            Feature::Median => median(values)?,
        });
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("mean".parse::<Feature>().unwrap(), Feature::Mean);
        assert_eq!(
            "variation coefficient".parse::<Feature>().unwrap(),
            Feature::VariationCoefficient
        );
        assert_eq!(
            "Variation_Coefficient".parse::<Feature>().unwrap(),
            Feature::VariationCoefficient
        );
        assert!(matches!(
            "entropy".parse::<Feature>(),
            Err(HeteroError::Validation(_))
        ));
        for f in Feature::ALL {
            assert_eq!(f.name().parse::<Feature>().unwrap(), f);
        }
    }

    #[test]
    fn test_feature_set() {
        let s = FeatureSet::parse(["max", "mean", "max"]).unwrap();
        assert_eq!(s.as_slice(), &[Feature::Max, Feature::Mean]);
        assert!(s.contains(Feature::Mean));
        assert!(!s.contains(Feature::Std));
        assert!(FeatureSet::parse(["mean", "nope"]).is_err());
        assert_eq!(FeatureSet::default().len(), 8);
        assert_eq!(Feature::Kurtosis.rank_column(), "kurtosis_rank");
        assert_eq!(
            Feature::VariationCoefficient.rank_column(),
            "variation coefficient_rank"
        );
    }

    #[test]
    fn test_discrete_split() {
        let discrete: Vec<_> = Feature::ALL.into_iter().filter(|f| f.is_discrete()).collect();
        assert_eq!(discrete, vec![Feature::Min, Feature::Max, Feature::Median]);
    }

    #[test]
    fn test_compute() {
        let mut v = vec![4.0, 1.0, 3.0, 2.0];
        let out = compute(&mut v, &FeatureSet::all()).unwrap();
        assert_eq!(out[0], 2.5);
        assert_eq!(out[2], 1.0);
        assert_eq!(out[3], 4.0);
        assert!((out[5] + 1.36).abs() < 1e-10);
        assert_eq!(out[7], 2.5);
        assert!(compute(&mut [], &FeatureSet::all()).is_none());
    }
}
