//! 有界任务池.
//!
//! 任务都是只读的纯函数, 结果一律按任务键合并, 与完成顺序无关.
//! 未启用 `rayon` 特性时所有任务串行执行, 结果完全相同.

use std::collections::BTreeMap;
use std::fmt;

use log::warn;

use crate::{HeteroError, HeteroResult};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 失败的任务及其键.
#[derive(Debug)]
pub struct TaskFailure<K> {
    /// 任务键.
    pub key: K,
    /// 任务返回的错误.
    pub error: HeteroError,
}

/// 一组致命的失败任务, 至少包含一个, 按键排序.
#[derive(Debug)]
pub struct TaskFailures<K> {
    first: TaskFailure<K>,
    rest: Vec<TaskFailure<K>>,
}

impl<K> From<TaskFailure<K>> for TaskFailures<K> {
    #[inline]
    fn from(first: TaskFailure<K>) -> Self {
        Self {
            first,
            rest: Vec::new(),
        }
    }
}

impl<K: Ord> TaskFailures<K> {
    /// 收集失败任务并按键排序. 输入为空时返回 `None`.
    pub fn collect(failed: Vec<TaskFailure<K>>) -> Option<Self> {
        let mut failed = failed;
        failed.sort_by(|a, b| a.key.cmp(&b.key));
        let mut it = failed.into_iter();
        let first = it.next()?;
        Some(Self {
            first,
            rest: it.collect(),
        })
    }
}

impl<K> TaskFailures<K> {
    /// 键序最小的失败.
    #[inline]
    pub fn first(&self) -> &TaskFailure<K> {
        &self.first
    }

    /// 失败任务个数.
    #[inline]
    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }

    /// 构造保证至少包含一个失败.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 按键序迭代所有失败.
    pub fn iter(&self) -> impl Iterator<Item = &TaskFailure<K>> {
        std::iter::once(&self.first).chain(self.rest.iter())
    }

    /// 取出键序最小的失败, 其余的失败被丢弃.
    #[inline]
    pub fn into_first(self) -> TaskFailure<K> {
        self.first
    }
}

/// 一批带键任务的执行结果.
#[derive(Debug)]
pub struct Batch<K, T> {
    /// 成功任务, 按键排序.
    pub done: BTreeMap<K, T>,
    /// 失败任务, 按键排序.
    pub failed: Vec<TaskFailure<K>>,
}

impl<K: Ord + fmt::Display, T> Batch<K, T> {
    /// 是否所有任务都成功.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// 分离出所有致命错误. 没有致命错误时返回 `Ok` 并保留可恢复的失败.
    ///
    /// 存在致命错误时, 可恢复的失败随本批结果一起被丢弃, 丢弃前逐个记录日志.
    pub fn into_fatal(self) -> Result<Self, TaskFailures<K>> {
        let Self { done, failed } = self;
        let (fatal, recoverable): (Vec<_>, Vec<_>) =
            failed.into_iter().partition(|f| f.error.is_fatal());
        match TaskFailures::collect(fatal) {
            Some(f) => {
                for r in recoverable.iter() {
                    warn!("Task {} failed ({}), discarded with its batch", r.key, r.error);
                }
                Err(f)
            }
            None => Ok(Self {
                done,
                failed: recoverable,
            }),
        }
    }
}

/// 计算 `units` 个任务实际使用的线程数: `min(可用核数或 limit, units)`, 至少为 1.
pub fn workers_for(units: usize, limit: Option<usize>) -> usize {
    let cores = std::thread::available_parallelism().map_or(1, usize::from);
    limit.unwrap_or(cores).max(1).min(units.max(1))
}

/// 在有界线程池上为每个键执行 `task`, 按键合并结果.
///
/// `workers` 为 `None` 时使用可用核数.
pub fn run_keyed<K, T, F>(keys: &[K], workers: Option<usize>, task: F) -> Batch<K, T>
where
    K: Ord + Clone + Send + Sync,
    T: Send,
    F: Fn(&K) -> HeteroResult<T> + Sync + Send,
{
    let results = run_all(keys, workers_for(keys.len(), workers), &task);

    let mut done = BTreeMap::new();
    let mut failed = Vec::new();
    for (key, r) in keys.iter().cloned().zip(results) {
        match r {
            Ok(v) => {
                done.insert(key, v);
            }
            Err(error) => failed.push(TaskFailure { key, error }),
        }
    }
    failed.sort_by(|a, b| a.key.cmp(&b.key));
    Batch { done, failed }
}

#[cfg(feature = "rayon")]
fn run_all<K, T, F>(keys: &[K], workers: usize, task: &F) -> Vec<HeteroResult<T>>
where
    K: Sync,
    T: Send,
    F: Fn(&K) -> HeteroResult<T> + Sync + Send,
{
    match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(|| keys.par_iter().map(task).collect()),
        Err(e) => {
            log::warn!("Failed to build a pool of {workers} threads ({e}), running sequentially");
            keys.iter().map(task).collect()
        }
    }
}

#[cfg(not(feature = "rayon"))]
fn run_all<K, T, F>(keys: &[K], _workers: usize, task: &F) -> Vec<HeteroResult<T>>
where
    F: Fn(&K) -> HeteroResult<T>,
{
    keys.iter().map(task).collect()
}

/// 对 `items` 逐个执行 `f`, 保持输入顺序. 启用 `rayon` 时使用全局线程池.
#[cfg(feature = "rayon")]
pub fn map_ordered<T, U, F>(items: &[T], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    items.par_iter().map(f).collect()
}

/// 对 `items` 逐个执行 `f`, 保持输入顺序.
#[cfg(not(feature = "rayon"))]
pub fn map_ordered<T, U, F>(items: &[T], f: F) -> Vec<U>
where
    F: Fn(&T) -> U,
{
    items.iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workers_for() {
        assert_eq!(workers_for(0, None), 1);
        assert_eq!(workers_for(3, Some(8)), 3);
        assert_eq!(workers_for(100, Some(2)), 2);
        assert_eq!(workers_for(5, Some(0)), 1);
        assert!(workers_for(1000, None) >= 1);
    }

    #[test]
    fn test_run_keyed_merges_by_key() {
        let keys: Vec<u32> = (0..20).rev().collect();
        let batch = run_keyed(&keys, Some(4), |&k| {
            if k % 7 == 3 {
                Err(HeteroError::computation(format!("task {k}")))
            } else {
                Ok(k * k)
            }
        });
        assert_eq!(batch.done.len(), 17);
        assert_eq!(batch.done[&5], 25);
        let failed: Vec<u32> = batch.failed.iter().map(|f| f.key).collect();
        assert_eq!(failed, vec![3, 10, 17]);
        assert!(!batch.is_complete());

        let batch = batch.into_fatal().unwrap();
        assert_eq!(batch.failed.len(), 3);
    }

    #[test]
    fn test_fatal_failure_surfaces() {
        let keys = [1u8, 2, 3];
        let batch = run_keyed(&keys, None, |&k| match k {
            2 => Err(HeteroError::validation("bad")),
            3 => Err(HeteroError::computation("degenerate")),
            _ => Ok(()),
        });
        let fatal = batch.into_fatal().unwrap_err();
        assert_eq!(fatal.len(), 1);
        assert_eq!(fatal.first().key, 2);
        assert!(matches!(fatal.first().error, HeteroError::Validation(_)));
    }

    #[test]
    fn test_map_ordered() {
        let v: Vec<usize> = (0..100).collect();
        let out = map_ordered(&v, |x| x * 2);
        assert_eq!(out, (0..100).map(|x| x * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_all_fatal_failures_kept() {
        let keys = [5u8, 1, 4, 2];
        let batch = run_keyed(&keys, Some(2), |&k| match k {
            1 => Ok(()),
            2 => Err(HeteroError::computation("degenerate")),
            _ => Err(HeteroError::validation(format!("bad {k}"))),
        });
        let fatal = batch.into_fatal().unwrap_err();
        assert_eq!(fatal.len(), 2);
        let keys: Vec<u8> = fatal.iter().map(|f| f.key).collect();
        assert_eq!(keys, vec![4, 5]);
        assert_eq!(fatal.into_first().key, 4);

        assert!(TaskFailures::<u8>::collect(Vec::new()).is_none());
    }
}
