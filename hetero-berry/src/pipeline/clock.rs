use std::fmt;
use std::time::{Duration, Instant};

use super::Stage;

/// 分阶段计时器.
///
/// 同一阶段可多次计时, 时长累加.
#[derive(Clone, Debug)]
pub struct StageClock {
    stages: Vec<(Stage, Duration)>,
    created: Instant,
}

impl StageClock {
    /// 初始化. 总时长从此刻起算.
    #[inline]
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            created: Instant::now(),
        }
    }

    /// 执行 `f` 并将耗时记入 `stage`.
    pub fn time<T>(&mut self, stage: Stage, f: impl FnOnce() -> T) -> T {
        let since = Instant::now();
        let out = f();
        self.record(stage, since.elapsed());
        out
    }

    /// 累加 `stage` 的耗时.
    pub fn record(&mut self, stage: Stage, d: Duration) {
        match self.stages.iter_mut().find(|(s, _)| *s == stage) {
            Some((_, acc)) => *acc += d,
            None => self.stages.push((stage, d)),
        }
    }

    /// 某阶段累计耗时. 未计时的阶段返回 `None`.
    pub fn get(&self, stage: Stage) -> Option<Duration> {
        self.stages.iter().find(|(s, _)| *s == stage).map(|(_, d)| *d)
    }

    /// 按首次计时顺序迭代.
    pub fn iter(&self) -> impl Iterator<Item = (Stage, Duration)> + '_ {
        self.stages.iter().copied()
    }

    /// 从创建到现在的总时长.
    #[inline]
    pub fn total(&self) -> Duration {
        self.created.elapsed()
    }
}

impl Default for StageClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StageClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (stage, d) in self.iter() {
            write!(f, "{stage}: {:.3}s, ", d.as_secs_f64())?;
        }
        write!(f, "total: {:.3}s", self.total().as_secs_f64())
    }
}
