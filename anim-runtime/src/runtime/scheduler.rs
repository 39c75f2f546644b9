//! # Scheduler 模块
//!
//! 时间轴播放调度器：管理所有正在播放的 ANM。
//!
//! ## 播放模型
//!
//! 每条播放记录独立保存当前帧和距下一帧的计时器，同一个时间轴可以同时播放多次。
//!
//! ```text
//! update(dt):
//!   timer -= dt
//!   while timer <= 0 且还有帧:
//!       按声明顺序触发当前帧的所有事件
//!       frame += 1
//!       timer += 1 / fps
//! ```
//!
//! 新播放从第 1 帧、计时器 0 开始，因此第 1 帧在下一次 update 时触发。
//! 最后一帧触发后播放结束，其 ID 在当次 update 的 `finished` 中报告一次。
//! 主动停止的播放不会出现在 `finished` 中。

use std::sync::Arc;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{event_command, frame_delta, make_rng, passes_chance};
use crate::command::Command;
use crate::config::RuntimeConfig;
use crate::timeline::Animation;

/// 播放记录 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaybackId(u64);

impl PlaybackId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// 一次 update 的输出
#[derive(Debug, Default, PartialEq)]
pub struct SchedulerTick {
    /// 按触发顺序排列的命令
    pub commands: Vec<Command>,
    /// 本次 update 中播放结束的记录
    pub finished: Vec<PlaybackId>,
}

/// 单条播放记录
#[derive(Debug)]
struct Playback {
    id: PlaybackId,
    animation: Arc<Animation>,
    /// 下一个要触发的帧（从 1 开始）
    frame: u32,
    /// 距下一帧的剩余时间（秒）
    timer: f32,
    frame_duration: f32,
}

impl Playback {
    fn is_exhausted(&self) -> bool {
        self.frame > self.animation.frame_count()
    }
}

/// 时间轴播放调度器
pub struct AnimationPlayer {
    playbacks: Vec<Playback>,
    next_id: u64,
    rng: StdRng,
    default_frame_rate: u32,
    honor_frame_rate_option: bool,
}

impl AnimationPlayer {
    /// 按配置创建
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            playbacks: Vec::new(),
            next_id: 1,
            rng: make_rng(config.seed),
            default_frame_rate: config.default_frame_rate.max(1),
            honor_frame_rate_option: config.honor_frame_rate_option,
        }
    }

    /// 时间轴实际使用的帧率
    pub fn frame_rate_of(&self, animation: &Animation) -> u32 {
        match animation.options().frame_rate {
            Some(rate) if self.honor_frame_rate_option && rate > 0 => rate,
            _ => self.default_frame_rate,
        }
    }

    /// 开始播放
    pub fn play(&mut self, animation: Arc<Animation>) -> PlaybackId {
        let id = PlaybackId(self.next_id);
        self.next_id += 1;

        let frame_rate = self.frame_rate_of(&animation);
        debug!(
            id = id.raw(),
            name = animation.name(),
            frame_rate,
            "开始播放时间轴"
        );
        self.playbacks.push(Playback {
            id,
            animation,
            frame: 1,
            timer: 0.0,
            frame_duration: 1.0 / frame_rate as f32,
        });
        id
    }

    /// 停止某个时间轴的所有播放，返回停止的数量
    pub fn stop(&mut self, animation: &Arc<Animation>) -> usize {
        let before = self.playbacks.len();
        self.playbacks
            .retain(|p| !Arc::ptr_eq(&p.animation, animation));
        let stopped = before - self.playbacks.len();
        if stopped > 0 {
            debug!(name = animation.name(), stopped, "停止时间轴");
        }
        stopped
    }

    /// 停止单条播放
    pub fn stop_playback(&mut self, id: PlaybackId) -> bool {
        let before = self.playbacks.len();
        self.playbacks.retain(|p| p.id != id);
        before != self.playbacks.len()
    }

    /// 播放是否仍在进行
    pub fn is_playing(&self, id: PlaybackId) -> bool {
        self.playbacks.iter().any(|p| p.id == id)
    }

    /// 正在进行的播放数量
    pub fn active_count(&self) -> usize {
        self.playbacks.len()
    }

    /// 立即触发某一帧的事件，不影响任何播放
    pub fn sample(&mut self, animation: &Animation, frame: u32) -> Vec<Command> {
        let mut commands = Vec::new();
        fire_frame(animation, frame, &mut self.rng, &mut commands);
        commands
    }

    /// 推进所有播放
    pub fn update(&mut self, delta_time: f32) -> SchedulerTick {
        let delta_time = frame_delta(delta_time);
        let mut tick = SchedulerTick::default();

        for playback in &mut self.playbacks {
            playback.timer -= delta_time;
            while playback.timer <= 0.0 && !playback.is_exhausted() {
                fire_frame(
                    &playback.animation,
                    playback.frame,
                    &mut self.rng,
                    &mut tick.commands,
                );
                playback.frame += 1;
                playback.timer += playback.frame_duration;
            }
            if playback.is_exhausted() {
                tick.finished.push(playback.id);
            }
        }

        if !tick.finished.is_empty() {
            self.playbacks.retain(|p| !p.is_exhausted());
            for id in &tick.finished {
                debug!(id = id.raw(), "时间轴播放结束");
            }
        }
        tick
    }
}

impl Default for AnimationPlayer {
    fn default() -> Self {
        Self::new(&RuntimeConfig::default())
    }
}

fn fire_frame(animation: &Animation, frame: u32, rng: &mut StdRng, out: &mut Vec<Command>) {
    let Some(nodes) = animation.frame(frame) else {
        return;
    };
    for node in nodes {
        if !passes_chance(node.chance, rng) {
            continue;
        }
        if let Some(command) = event_command(&node.event) {
            out.push(command);
        }
    }
}
