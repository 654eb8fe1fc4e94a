//! 各阶段结果表的 CSV 读写.
//!
//! 布尔值写作 `True` / `False`, 缺失值与 NaN 写作空串.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::entropy::EntropyRecord;
use crate::grid::{Feature, FeatureSet, FeatureTable};
use crate::rank::{PopulationTable, RankRecord};
use crate::{Bounds, HeteroError, HeteroResult};

/// 信息表的一行: 样本 ROI 与对比度校准参考值.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InfoRow {
    /// 样本名.
    pub dataset: String,
    /// ROI.
    pub bounds: Bounds,
    /// 是否经过对比度校准.
    pub contrast_adjustment: bool,
    /// 孔隙均值. 仅校准行有值.
    pub voidmean: Option<f64>,
    /// 岩石中位数. 仅校准行有值.
    pub rockmedian: Option<f64>,
}

fn fmt_bool(b: bool) -> String {
    let s = if b { "True" } else { "False" };
    s.to_string()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "True" | "true" | "1" => Some(true),
        "False" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn fmt_f64(v: Option<f64>) -> String {
    match v {
        Some(v) if !v.is_nan() => v.to_string(),
        _ => String::new(),
    }
}

/// 写信息表 `[dataset, z_ini, z_fin, x_ini, x_fin, y_ini, y_fin,
/// contrast_adjustment, voidmean, rockmedian]`.
pub fn write_info_table<P: AsRef<Path>>(path: P, rows: &[InfoRow]) -> HeteroResult<()> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record([
        "dataset",
        "z_ini",
        "z_fin",
        "x_ini",
        "x_fin",
        "y_ini",
        "y_fin",
        "contrast_adjustment",
        "voidmean",
        "rockmedian",
    ])?;
    for r in rows {
        let b = &r.bounds;
        w.write_record([
            r.dataset.clone(),
            b.z_ini.to_string(),
            b.z_fin.to_string(),
            b.x_ini.to_string(),
            b.x_fin.to_string(),
            b.y_ini.to_string(),
            b.y_fin.to_string(),
            fmt_bool(r.contrast_adjustment),
            fmt_f64(r.voidmean),
            fmt_f64(r.rockmedian),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// 写子立方体特征表 `[sample, contrast_adjustment, division, subcube] + 特征`.
pub fn write_feature_table<P: AsRef<Path>>(path: P, table: &FeatureTable) -> HeteroResult<()> {
    let mut w = csv::Writer::from_path(path)?;
    let mut header: Vec<String> = ["sample", "contrast_adjustment", "division", "subcube"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend(table.features().iter().map(|f| f.name().to_string()));
    w.write_record(&header)?;

    for (key, values) in table.rows() {
        let mut row = vec![
            key.grid.sample.clone(),
            fmt_bool(key.grid.contrast_adjustment),
            key.grid.division.to_string(),
            key.subcube.to_string(),
        ];
        row.extend(values.iter().map(|&v| fmt_f64(Some(v))));
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

fn write_keyed<'a, P, I>(path: P, columns: Vec<String>, rows: I) -> HeteroResult<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = (&'a str, usize, bool, Vec<String>)>,
{
    let mut w = csv::Writer::from_path(path)?;
    let mut header: Vec<String> = ["sample", "division", "contrast_adjustment"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend(columns);
    w.write_record(&header)?;
    for (sample, division, adj, values) in rows {
        let mut row = vec![sample.to_string(), division.to_string(), fmt_bool(adj)];
        row.extend(values);
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

/// 写熵值表 `[sample, division, contrast_adjustment] + 特征`.
pub fn write_entropy_table<P: AsRef<Path>>(
    path: P,
    records: &[EntropyRecord],
    features: &FeatureSet,
) -> HeteroResult<()> {
    let columns = features.iter().map(|f| f.name().to_string()).collect();
    write_keyed(
        path,
        columns,
        records.iter().map(|r| {
            let values = features
                .iter()
                .map(|f| fmt_f64(r.values.get(&f).copied()))
                .collect();
            (r.sample.as_str(), r.division, r.contrast_adjustment, values)
        }),
    )
}

/// 写排名表 `[sample, division, contrast_adjustment] + <特征>_rank`.
pub fn write_rank_table<P: AsRef<Path>>(
    path: P,
    records: &[RankRecord],
    features: &FeatureSet,
) -> HeteroResult<()> {
    let columns = features.iter().map(Feature::rank_column).collect();
    write_keyed(
        path,
        columns,
        records.iter().map(|r| {
            let values = features
                .iter()
                .map(|f| fmt_f64(r.ranks.get(&f).copied()))
                .collect();
            (r.sample.as_str(), r.division, r.contrast_adjustment, values)
        }),
    )
}

/// 读群体熵值表 (熵值表格式). 非特征列被忽略, 空单元格视为缺失.
pub fn read_population<P: AsRef<Path>>(path: P) -> HeteroResult<PopulationTable> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| HeteroError::validation(format!("column `{name}` is missing in {}", path.display())))
    };
    let (i_sample, i_div, i_adj) = (find("sample")?, find("division")?, find("contrast_adjustment")?);

    let mut features: BTreeMap<usize, Feature> = BTreeMap::new();
    for (i, h) in headers.iter().enumerate() {
        if i == i_sample || i == i_div || i == i_adj {
            continue;
        }
        match h.parse::<Feature>() {
            Ok(f) => {
                features.insert(i, f);
            }
            Err(_) => warn!("Ignoring unknown column `{h}` in {}", path.display()),
        }
    }

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row?;
        let bad = |what: &str| {
            HeteroError::validation(format!(
                "bad {what} in row {} of {}",
                line + 1,
                path.display()
            ))
        };
        let sample = row.get(i_sample).ok_or_else(|| bad("sample"))?.to_string();
        let division = row
            .get(i_div)
            .and_then(|s| s.trim().parse::<usize>().ok())
            .ok_or_else(|| bad("division"))?;
        let contrast_adjustment = row
            .get(i_adj)
            .and_then(parse_bool)
            .ok_or_else(|| bad("contrast_adjustment"))?;
        let values = features
            .iter()
            .filter_map(|(&i, &f)| {
                let v = row.get(i)?.trim().parse::<f64>().ok()?;
                (!v.is_nan()).then_some((f, v))
            })
            .collect();
        records.push(EntropyRecord {
            sample,
            division,
            contrast_adjustment,
            values,
        });
    }
    let table = PopulationTable::from_records(records);
    info!(
        "Loaded population of {} samples ({} rows) from {}",
        table.samples().len(),
        table.len(),
        path.display()
    );
    Ok(table)
}

/// 整体写回群体熵值表. 先写临时文件再重命名, 中途失败不会破坏原文件.
pub fn write_population<P: AsRef<Path>>(path: P, table: &PopulationTable) -> HeteroResult<()> {
    let path = path.as_ref();
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    write_entropy_table(&tmp, &table.records(), &table.features())?;
    fs::rename(&tmp, path)?;
    info!("Population of {} rows written to {}", table.len(), path.display());
    Ok(())
}
