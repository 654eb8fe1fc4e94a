//! 对 `hetero_berry::dataset` 的更一层封装. 按 "显式值 → 环境变量 → 主目录" 的顺序解析路径.

use std::env;
use std::path::PathBuf;

use hetero_berry::dataset::home_dataset_dir_with;

/// 参考特征库目录的环境变量.
pub const FEATURES_DIR_ENV: &str = "HETERO_FEATURES_DIR";

/// 输出目录的环境变量.
pub const OUTPUT_DIR_ENV: &str = "HETERO_OUTPUT_DIR";

/// 群体熵值表路径的环境变量.
pub const POPULATION_PATH_ENV: &str = "HETERO_POPULATION_PATH";

fn resolve(explicit: Option<PathBuf>, var: &str, home: &[&str]) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    match env::var(var) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => home_dataset_dir_with(home),
    }
}

/// 获取参考特征库目录.
///
/// 1. 若给定 `explicit`, 则返回其值;
/// 2. 若环境变量 `$HETERO_FEATURES_DIR` 非空, 则返回其值;
/// 3. 否则, 返回 `$HOME/dataset/features`.
pub fn features_dir(explicit: Option<PathBuf>) -> Option<PathBuf> {
    resolve(explicit, FEATURES_DIR_ENV, &["features"])
}

/// 获取输出根目录.
///
/// 1. 若给定 `explicit`, 则返回其值;
/// 2. 若环境变量 `$HETERO_OUTPUT_DIR` 非空, 则返回其值;
/// 3. 否则, 返回 `$HOME/dataset/output`.
pub fn output_dir(explicit: Option<PathBuf>) -> Option<PathBuf> {
    resolve(explicit, OUTPUT_DIR_ENV, &["output"])
}

/// 获取群体熵值表路径.
///
/// 1. 若给定 `explicit`, 则返回其值;
/// 2. 若环境变量 `$HETERO_POPULATION_PATH` 非空, 则返回其值;
/// 3. 否则, 返回 `$HOME/dataset/entropy/population.csv`.
pub fn population_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    resolve(explicit, POPULATION_PATH_ENV, &["entropy", "population.csv"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_wins() {
        let p = PathBuf::from("/tmp/explicit");
        assert_eq!(features_dir(Some(p.clone())), Some(p.clone()));
        assert_eq!(output_dir(Some(p.clone())), Some(p.clone()));
        assert_eq!(population_path(Some(p.clone())), Some(p));
    }

    #[test]
    fn test_home_fallback_suffix() {
        if env::var(POPULATION_PATH_ENV).is_err() {
            if let Some(p) = population_path(None) {
                assert!(p.ends_with("dataset/entropy/population.csv"));
            }
        }
    }
}
