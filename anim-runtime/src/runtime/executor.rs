//! # Executor 模块
//!
//! 将时间轴事件与 GAS 节点转换为 Command。
//!
//! ## 职责
//!
//! - 时间轴事件 → Command（引用为空时不产生）
//! - GAS 节点 → Command + 等待原因 + 跳转
//! - 不处理概率判定，由调用方负责

use rand::Rng;
use tracing::{debug, error};

use super::{AnimationPlayer, pick_weighted};
use crate::command::Command;
use crate::gas::{AutoScript, GasNodeKind, WalkTarget};
use crate::state::{GasState, WaitingReason};
use crate::timeline::{AnimEvent, Animation};

/// 时间轴事件 → Command
///
/// 引用了外部资源但查找失败的事件返回 `None`。
pub fn event_command(event: &AnimEvent) -> Option<Command> {
    let command = match event {
        AnimEvent::VertexAnimation(v) => Command::StartVertexAnimation {
            animation: v.animation.clone()?,
            origin: v.origin,
            start: v.start,
        },
        AnimEvent::SceneTexture {
            scene,
            model,
            texture,
        } => Command::SetSceneTexture {
            scene: scene.clone(),
            model: model.clone(),
            texture: texture.clone(),
        },
        AnimEvent::SceneModelVisibility {
            scene,
            model,
            visible,
        } => Command::SetSceneModelVisibility {
            scene: scene.clone(),
            model: model.clone(),
            visible: *visible,
        },
        AnimEvent::ModelTexture {
            model,
            mesh_index,
            submesh_index,
            texture,
        } => Command::SetModelTexture {
            model: model.clone(),
            mesh_index: *mesh_index,
            submesh_index: *submesh_index,
            texture: texture.clone(),
        },
        AnimEvent::ModelVisibility { model, visible } => Command::SetModelVisibility {
            model: model.clone(),
            visible: *visible,
        },
        AnimEvent::Sound(sound) => Command::PlaySound {
            audio: sound.audio.clone()?,
            volume: sound.volume,
            source: sound.source.clone(),
            min_distance: sound.min_distance,
            max_distance: sound.max_distance,
        },
        AnimEvent::Footstep { actor } => Command::Footstep {
            actor: actor.clone(),
        },
        AnimEvent::Footscuff { actor } => Command::Footscuff {
            actor: actor.clone(),
        },
        AnimEvent::PlaySoundtrack { name } => Command::PlaySoundtrack { name: name.clone() },
        AnimEvent::StopSoundtrack { name } => Command::StopSoundtrack { name: name.clone() },
        AnimEvent::Camera { position_name } => Command::SetCamera {
            position_name: position_name.clone(),
        },
        AnimEvent::LipSync {
            actor,
            mouth_texture,
        } => Command::LipSync {
            actor: actor.clone(),
            mouth_texture: mouth_texture.clone(),
        },
        AnimEvent::FaceTexture {
            actor,
            texture,
            element,
        } => Command::SetFaceTexture {
            actor: actor.clone(),
            texture: texture.clone(),
            element: *element,
        },
        AnimEvent::ClearFaceTexture { actor, element } => Command::ClearFaceTexture {
            actor: actor.clone(),
            element: *element,
        },
        AnimEvent::Glance { actor, position } => Command::Glance {
            actor: actor.clone(),
            position: *position,
        },
        AnimEvent::Mood { actor, mood } => Command::SetMood {
            actor: actor.clone(),
            mood: mood.clone(),
        },
    };
    Some(command)
}

/// GAS 节点执行结果
#[derive(Debug, Default)]
pub struct ExecuteResult {
    /// 产生的命令
    pub commands: Vec<Command>,
    /// 等待原因（如果需要等待）
    pub waiting: Option<WaitingReason>,
    /// 跳转目标节点索引
    pub jump_to: Option<usize>,
    /// 脚本因错误结束
    pub end: bool,
}

impl ExecuteResult {
    fn empty() -> Self {
        Self::default()
    }

    fn with_wait(commands: Vec<Command>, waiting: WaitingReason) -> Self {
        Self {
            commands,
            waiting: Some(waiting),
            ..Self::default()
        }
    }

    fn with_jump(jump_to: usize) -> Self {
        Self {
            jump_to: Some(jump_to),
            ..Self::default()
        }
    }

    fn ended() -> Self {
        Self {
            end: true,
            ..Self::default()
        }
    }
}

/// GAS 节点执行器
///
/// 负责单个节点的语义；节点推进、概率判定和循环保护由 [`super::GasPlayer`] 处理。
#[derive(Debug, Clone)]
pub struct Executor {
    /// 脚本所属角色
    actor: String,
}

impl Executor {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
        }
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// 执行单个节点
    pub fn execute(
        &self,
        kind: &GasNodeKind,
        state: &mut GasState,
        script: &AutoScript,
        player: &mut AnimationPlayer,
        rng: &mut impl Rng,
    ) -> ExecuteResult {
        match kind {
            GasNodeKind::Anim {
                name, animation, ..
            } => self.play(name, animation.as_ref(), player),

            GasNodeKind::OneOf { options } => {
                let weights: Vec<u32> = options.iter().map(|o| o.weight).collect();
                match pick_weighted(&weights, rng).and_then(|i| options.get(i)) {
                    Some(option) => self.play(&option.name, option.animation.as_ref(), player),
                    None => ExecuteResult::empty(),
                }
            }

            GasNodeKind::Wait {
                min_seconds,
                max_seconds,
            } => {
                let seconds = if max_seconds > min_seconds {
                    rng.random_range(*min_seconds..=*max_seconds)
                } else {
                    *min_seconds
                };
                if seconds > 0.0 {
                    ExecuteResult::with_wait(Vec::new(), WaitingReason::time(seconds))
                } else {
                    ExecuteResult::empty()
                }
            }

            GasNodeKind::Label { .. } => ExecuteResult::empty(),

            GasNodeKind::Goto { label } => self.jump(label, script),

            GasNodeKind::Set { var, value } => {
                state.set(*var, *value);
                ExecuteResult::empty()
            }

            GasNodeKind::Add { var, delta } => {
                state.add(*var, *delta);
                ExecuteResult::empty()
            }

            GasNodeKind::If {
                var,
                op,
                value,
                label,
            } => {
                if op.evaluate(state.get(*var), *value) {
                    self.jump(label, script)
                } else {
                    ExecuteResult::empty()
                }
            }

            GasNodeKind::WalkTo { target } => self.walk(target.clone()),

            GasNodeKind::ChooseWalk { targets } => {
                let weights: Vec<u32> = targets.iter().map(|t| t.weight).collect();
                match pick_weighted(&weights, rng).and_then(|i| targets.get(i)) {
                    Some(option) => self.walk(option.target.clone()),
                    None => ExecuteResult::empty(),
                }
            }

            GasNodeKind::UseIPos { name } => ExecuteResult {
                commands: vec![Command::UseIPos {
                    actor: self.actor.clone(),
                    name: name.clone(),
                }],
                ..ExecuteResult::default()
            },
        }
    }

    fn play(
        &self,
        name: &str,
        animation: Option<&std::sync::Arc<Animation>>,
        player: &mut AnimationPlayer,
    ) -> ExecuteResult {
        let Some(animation) = animation else {
            debug!(actor = %self.actor, name, "动画引用为空，跳过");
            return ExecuteResult::empty();
        };
        let id = player.play(animation.clone());
        ExecuteResult::with_wait(Vec::new(), WaitingReason::Animation(id))
    }

    fn walk(&self, target: WalkTarget) -> ExecuteResult {
        ExecuteResult::with_wait(
            vec![Command::WalkTo {
                actor: self.actor.clone(),
                target,
            }],
            WaitingReason::Walk,
        )
    }

    /// 空标签回到开头；找不到标签时脚本结束
    fn jump(&self, label: &str, script: &AutoScript) -> ExecuteResult {
        if label.is_empty() {
            return ExecuteResult::with_jump(0);
        }
        match script.find_label(label) {
            Some(index) => ExecuteResult::with_jump(index),
            None => {
                error!(
                    actor = %self.actor,
                    script = script.name(),
                    label,
                    "找不到跳转标签，脚本结束"
                );
                ExecuteResult::ended()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::Vec3;

    use super::*;
    use crate::resolver::AudioHandle;
    use crate::timeline::{SoundEvent, SoundSource, VertexAnimEvent};
    use crate::vertex::VertexAnimation;

    #[test]
    fn test_null_references_produce_nothing() {
        let event = AnimEvent::VertexAnimation(VertexAnimEvent {
            name: "missing".to_string(),
            animation: None,
            origin: None,
            start: None,
        });
        assert_eq!(event_command(&event), None);

        let event = AnimEvent::Sound(SoundEvent {
            name: "missing".to_string(),
            audio: None,
            volume: 100,
            source: SoundSource::Model("door".to_string()),
            min_distance: 1.0,
            max_distance: 2.0,
        });
        assert_eq!(event_command(&event), None);
    }

    #[test]
    fn test_resolved_events() {
        let act = Arc::new(VertexAnimation::new("walk01", 3));
        let event = AnimEvent::VertexAnimation(VertexAnimEvent {
            name: "walk01".to_string(),
            animation: Some(act.clone()),
            origin: None,
            start: None,
        });
        assert_eq!(
            event_command(&event),
            Some(Command::StartVertexAnimation {
                animation: act,
                origin: None,
                start: None
            })
        );

        let event = AnimEvent::Sound(SoundEvent {
            name: "creak".to_string(),
            audio: Some(AudioHandle::new("creak")),
            volume: 80,
            source: SoundSource::Position(Vec3::ONE),
            min_distance: 10.0,
            max_distance: 50.0,
        });
        let Some(Command::PlaySound { audio, volume, .. }) = event_command(&event) else {
            panic!("期望 PlaySound");
        };
        assert_eq!(audio.name(), "creak");
        assert_eq!(volume, 80);

        let event = AnimEvent::Mood {
            actor: "gabriel".to_string(),
            mood: "happy".to_string(),
        };
        assert_eq!(event_command(&event).unwrap().name(), "set_mood");
    }
}
