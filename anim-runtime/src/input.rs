//! # Input 模块
//!
//! Host 向 GAS 解释器传递的输入事件。
//!
//! 时间等待与动画等待由解释器在每个 tick 自行检查，不需要输入；
//! 只有走动这类由 Host 执行的长动作需要 Host 回报完成。

use serde::{Deserialize, Serialize};

/// Host 向解释器传递的输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GasInput {
    /// 角色已到达目标（解除 `WaitingReason::Walk`）
    WalkFinished,
}

impl GasInput {
    pub fn walk_finished() -> Self {
        Self::WalkFinished
    }
}
