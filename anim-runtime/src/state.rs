//! # State 模块
//!
//! GAS 解释器的运行状态和等待模型。
//!
//! ## 设计原则
//!
//! - 所有状态**显式建模**，每个 tick 重新检查
//! - 状态**可序列化**，便于调试输出
//! - 不允许隐式全局状态

use serde::{Deserialize, Serialize};

use crate::gas::Variable;
use crate::runtime::PlaybackId;

/// 等待原因
///
/// ```text
/// None      -> 继续执行
/// Time      -> 剩余时间归零后继续
/// Animation -> 调度器中的播放结束后继续
/// Walk      -> 收到 GasInput::WalkFinished 后继续
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum WaitingReason {
    /// 不等待
    #[default]
    None,

    /// 等待一段时间（秒）
    Time { remaining: f32 },

    /// 等待时间轴播放结束
    Animation(PlaybackId),

    /// 等待 Host 回报走动完成
    Walk,
}

impl WaitingReason {
    /// 是否处于等待状态
    pub fn is_waiting(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn time(seconds: f32) -> Self {
        Self::Time { remaining: seconds }
    }

    /// 简短名称，用于错误信息
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Time { .. } => "Time",
            Self::Animation(_) => "Animation",
            Self::Walk => "Walk",
        }
    }
}

/// 解释器状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasState {
    /// 下一个要执行的节点索引
    pub position: usize,
    /// 变量 `A`–`Z`
    pub variables: [i32; Variable::COUNT],
    /// 当前等待原因
    pub waiting: WaitingReason,
    /// 脚本是否已结束
    pub finished: bool,
}

impl Default for GasState {
    fn default() -> Self {
        Self {
            position: 0,
            variables: [0; Variable::COUNT],
            waiting: WaitingReason::None,
            finished: false,
        }
    }
}

impl GasState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, var: Variable) -> i32 {
        self.variables[var.index()]
    }

    pub fn set(&mut self, var: Variable, value: i32) {
        self.variables[var.index()] = value;
    }

    pub fn add(&mut self, var: Variable, delta: i32) {
        let slot = &mut self.variables[var.index()];
        *slot = slot.wrapping_add(delta);
    }

    pub fn wait(&mut self, reason: WaitingReason) {
        self.waiting = reason;
    }

    pub fn clear_wait(&mut self) {
        self.waiting = WaitingReason::None;
    }
}
