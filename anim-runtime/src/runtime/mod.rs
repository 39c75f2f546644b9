//! # Runtime 模块
//!
//! 播放与执行核心。
//!
//! ## 模块结构
//!
//! - [`scheduler`]：时间轴播放调度（全局一个）
//! - [`executor`]：事件 / 脚本节点到 Command 的转换
//! - [`gas_player`]：GAS 解释器（每个角色一个）
//!
//! 两者都以 tick 驱动：Host 每帧先调用 [`AnimationPlayer::update`]，
//! 再调用各角色的 [`GasPlayer::tick`]。

pub mod executor;
pub mod gas_player;
pub mod scheduler;

pub use executor::{ExecuteResult, Executor, event_command};
pub use gas_player::{GasPlayer, GasTick};
pub use scheduler::{AnimationPlayer, PlaybackId, SchedulerTick};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::timeline::ALWAYS;

/// 帧间隔：NaN / 无穷按 0 处理，计时器状态保持不变
pub(crate) fn frame_delta(delta_time: f32) -> f32 {
    if delta_time.is_finite() {
        delta_time
    } else {
        warn!(delta_time, "帧间隔无效，按 0 处理");
        0.0
    }
}

/// 创建随机数生成器；给定种子时结果可复现
pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// 概率判定：在 [0, 100) 中抽取，小于 `chance` 时通过
pub(crate) fn passes_chance(chance: u8, rng: &mut impl Rng) -> bool {
    if chance >= ALWAYS {
        return true;
    }
    if chance == 0 {
        return false;
    }
    rng.random_range(0..ALWAYS) < chance
}

/// 按权重随机选择下标
///
/// 权重全为 0 时等概率选择；列表为空时返回 `None`。
pub(crate) fn pick_weighted(weights: &[u32], rng: &mut impl Rng) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let total: u64 = weights.iter().map(|w| u64::from(*w)).sum();
    if total == 0 {
        return Some(rng.random_range(0..weights.len()));
    }

    let mut roll = rng.random_range(0..total);
    for (index, weight) in weights.iter().enumerate() {
        let weight = u64::from(*weight);
        if roll < weight {
            return Some(index);
        }
        roll -= weight;
    }
    Some(weights.len() - 1)
}
