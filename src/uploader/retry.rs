// 重试策略
//
// 分片重试与完成校验共用同一种策略描述：
// - 分片重试：固定 1000ms，最多 3 次
// - 完成校验：2000ms 起步，每轮翻倍，共 3 轮

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大次数（分片重试为重试次数，完成校验为轮数）
    pub max_attempts: u32,
    /// 首次等待时间
    pub base_delay: Duration,
    /// 每轮等待倍数（1 表示固定间隔）
    pub multiplier: u32,
}

impl RetryPolicy {
    /// 固定间隔
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            multiplier: 1,
        }
    }

    /// 指数退避
    pub fn exponential(max_attempts: u32, base_delay: Duration, multiplier: u32) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier,
        }
    }

    /// 第 `round` 轮（从 0 开始）之后的等待时间
    ///
    /// # 延迟序列（2000ms, ×2）
    /// - round=0: 2000ms
    /// - round=1: 4000ms
    /// - round=2: 8000ms
    pub fn delay_for(&self, round: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(round);
        self.base_delay.saturating_mul(factor)
    }
}

/// 可被取消的等待
///
/// 返回 false 表示等待期间被取消
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
