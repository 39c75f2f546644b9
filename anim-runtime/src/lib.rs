//! # Anim Runtime
//!
//! 3D 冒险游戏引擎的动画与角色行为核心库。
//!
//! ## 架构概述
//!
//! `anim-runtime` 是纯逻辑核心，不依赖渲染、音频或场景图。
//! 它通过 **命令驱动模式** 与宿主层（Host）通信：
//!
//! ```text
//! Host                                Runtime
//!   │                                    │
//!   │──── update(dt) ──────────────────►│ AnimationPlayer
//!   │◄─── SchedulerTick { commands } ───│
//!   │                                    │
//!   │──── tick(dt, GasInput) ──────────►│ GasPlayer（每个角色一个）
//!   │◄─── GasTick { commands, waiting } │
//! ```
//!
//! ## 资源格式
//!
//! - ANM：区段文本，按帧号触发的事件时间轴 → [`Animation`]
//! - ACT：压缩的顶点关键帧二进制流 → [`VertexAnimation`]
//! - GAS：角色自动脚本 → [`AutoScript`]
//!
//! 文本资源的解析永不失败：无效行记录为 [`ParseError`] 警告并跳过。
//! 资源名通过注入的 [`AssetResolver`] 解析，查找失败时存 `None`，执行时跳过。
//!
//! ## 使用示例
//!
//! ```ignore
//! let config = RuntimeConfig::load("anim.json")?;
//! let mut player = AnimationPlayer::new(&config);
//! let script = Arc::new(AutoScript::parse("gab_idle", text, &resolver));
//! let mut gas = GasPlayer::new("gabriel", script, &config);
//!
//! loop {
//!     let frame = player.update(dt);
//!     host.execute(frame.commands);
//!
//!     let tick = gas.tick(dt, input.take(), &mut player)?;
//!     host.execute(tick.commands);
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`ini`]：区段文本读取
//! - [`timeline`]：ANM 时间轴与解析器
//! - [`vertex`]：ACT 顶点动画解码与采样
//! - [`gas`]：GAS 脚本 AST 与解析器
//! - [`runtime`]：播放调度器与 GAS 解释器
//! - [`command`]：Command 定义
//! - [`diagnostic`]：资源静态检查
//! - [`config`]：运行时配置
//! - [`error`]：错误类型定义

pub mod command;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod gas;
pub mod ini;
pub mod input;
pub mod resolver;
pub mod runtime;
pub mod state;
pub mod timeline;
pub mod vertex;

// 重导出核心类型
pub use command::Command;
pub use config::{ConfigError, RuntimeConfig};
pub use diagnostic::{
    Diagnostic, DiagnosticLevel, DiagnosticResult, analyze_animation, analyze_script,
    defined_labels, jump_targets,
};
pub use error::{ActError, AnimError, AnimResult, ParseError, RuntimeError};
pub use gas::{AutoScript, GasNode, GasNodeKind, GasParser, Variable, WalkTarget};
pub use input::GasInput;
pub use resolver::{AssetResolver, AudioHandle, MemoryResolver, NullResolver, normalize_name};
pub use runtime::{AnimationPlayer, GasPlayer, GasTick, PlaybackId, SchedulerTick};
pub use state::{GasState, WaitingReason};
pub use timeline::{AnimEvent, AnimNode, AnimOptions, Animation, TimelineParser};
pub use vertex::{TransformPose, VertexAnimation, VertexPose};
