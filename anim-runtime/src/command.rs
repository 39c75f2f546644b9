//! # Command 模块
//!
//! 定义 Runtime 向 Host 发出的所有指令。
//! Command 是 Runtime 与 Host 之间的**唯一通信方式**。
//!
//! ## 设计原则
//!
//! - **声明式**：Command 描述"做什么"，不描述"怎么做"
//! - **无副作用**：Command 本身不执行任何操作
//! - **引用已解析**：资源引用在加载时解析完毕，引用为空的事件不产生 Command

use std::sync::Arc;

use glam::Vec3;

use crate::gas::WalkTarget;
use crate::resolver::AudioHandle;
use crate::timeline::{FaceElement, Placement, SoundSource};
use crate::vertex::VertexAnimation;

/// Runtime 向 Host 发出的指令
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// 开始播放顶点动画
    StartVertexAnimation {
        animation: Arc<VertexAnimation>,
        /// 绝对动画：相对原点的偏移与朝向
        origin: Option<Placement>,
        /// 绝对动画：开始时模型所在位置与朝向
        start: Option<Placement>,
    },

    /// 场景模型换贴图
    SetSceneTexture {
        scene: String,
        model: String,
        texture: String,
    },

    /// 场景模型显隐
    SetSceneModelVisibility {
        scene: String,
        model: String,
        visible: bool,
    },

    /// 模型子网格换贴图
    SetModelTexture {
        model: String,
        mesh_index: u8,
        submesh_index: u8,
        texture: String,
    },

    /// 模型显隐
    SetModelVisibility { model: String, visible: bool },

    /// 播放 3D 音效
    PlaySound {
        audio: AudioHandle,
        volume: i32,
        source: SoundSource,
        min_distance: f32,
        max_distance: f32,
    },

    /// 脚步声
    Footstep { actor: String },

    /// 拖步声
    Footscuff { actor: String },

    /// 播放配乐
    PlaySoundtrack { name: String },

    /// 停止配乐；`None` 表示全部
    StopSoundtrack { name: Option<String> },

    /// 切换到命名机位
    SetCamera { position_name: String },

    /// 口型
    LipSync { actor: String, mouth_texture: String },

    /// 设置脸部贴图
    SetFaceTexture {
        actor: String,
        texture: String,
        element: FaceElement,
    },

    /// 清除脸部贴图
    ClearFaceTexture { actor: String, element: FaceElement },

    /// 看向某点
    Glance { actor: String, position: Vec3 },

    /// 情绪
    SetMood { actor: String, mood: String },

    /// 走到目标（GAS）
    ///
    /// Host 在到达后通过 `GasInput::WalkFinished` 通知。
    WalkTo { actor: String, target: WalkTarget },

    /// 使用交互位置（GAS）
    UseIPos { actor: String, name: String },
}

impl Command {
    /// 指令名，用于日志
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartVertexAnimation { .. } => "start_vertex_animation",
            Self::SetSceneTexture { .. } => "set_scene_texture",
            Self::SetSceneModelVisibility { .. } => "set_scene_model_visibility",
            Self::SetModelTexture { .. } => "set_model_texture",
            Self::SetModelVisibility { .. } => "set_model_visibility",
            Self::PlaySound { .. } => "play_sound",
            Self::Footstep { .. } => "footstep",
            Self::Footscuff { .. } => "footscuff",
            Self::PlaySoundtrack { .. } => "play_soundtrack",
            Self::StopSoundtrack { .. } => "stop_soundtrack",
            Self::SetCamera { .. } => "set_camera",
            Self::LipSync { .. } => "lipsync",
            Self::SetFaceTexture { .. } => "set_face_texture",
            Self::ClearFaceTexture { .. } => "clear_face_texture",
            Self::Glance { .. } => "glance",
            Self::SetMood { .. } => "set_mood",
            Self::WalkTo { .. } => "walk_to",
            Self::UseIPos { .. } => "use_ipos",
        }
    }
}
