//! # 事件节点
//!
//! ANM 时间轴上的单个事件。每种行为一个变体，调度器按变体匹配执行。

use std::sync::Arc;

use glam::Vec3;

use crate::resolver::AudioHandle;
use crate::vertex::VertexAnimation;

/// 事件执行概率的默认值：总是执行
pub const ALWAYS: u8 = 100;

/// 位置 + 朝向
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    /// 朝向角（度）
    pub heading: f32,
}

impl Placement {
    pub fn new(position: Vec3, heading: f32) -> Self {
        Self { position, heading }
    }
}

/// 脸部贴图区域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceElement {
    Mouth,
    Eyelids,
    Forehead,
}

impl FaceElement {
    /// 按关键字首字母识别（大小写不敏感）：m → 嘴，e → 眼睑，h / f → 额头
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.chars().next()?.to_ascii_lowercase() {
            'm' => Some(Self::Mouth),
            'e' => Some(Self::Eyelids),
            'h' | 'f' => Some(Self::Forehead),
            _ => None,
        }
    }
}

/// 声源位置：挂在模型上，或场景中的固定坐标（二选一）
#[derive(Debug, Clone, PartialEq)]
pub enum SoundSource {
    Model(String),
    Position(Vec3),
}

/// 顶点动画触发
///
/// 可选字段是否存在只取决于源行的字段数量。
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAnimEvent {
    /// ANM 中书写的资源名
    pub name: String,
    /// 解析到的顶点动画；查找失败时为 `None`
    pub animation: Option<Arc<VertexAnimation>>,
    /// 相对原点的偏移与朝向（6 个及以上字段）
    pub origin: Option<Placement>,
    /// 动画开始时模型被移动到的位置与朝向（10 个字段）
    pub start: Option<Placement>,
}

impl VertexAnimEvent {
    /// 是否为绝对动画（同时重新定位模型）
    pub fn is_absolute(&self) -> bool {
        self.origin.is_some()
    }
}

/// 声音触发
#[derive(Debug, Clone, PartialEq)]
pub struct SoundEvent {
    pub name: String,
    pub audio: Option<AudioHandle>,
    pub volume: i32,
    pub source: SoundSource,
    pub min_distance: f32,
    pub max_distance: f32,
}

/// 事件内容
#[derive(Debug, Clone, PartialEq)]
pub enum AnimEvent {
    /// `[ACTIONS]` 顶点动画
    VertexAnimation(VertexAnimEvent),

    /// `[STEXTURES]` 场景（BSP）模型换贴图
    SceneTexture {
        scene: String,
        model: String,
        texture: String,
    },

    /// `[SVISIBILITY]` 场景模型显隐
    SceneModelVisibility {
        scene: String,
        model: String,
        visible: bool,
    },

    /// `[MTEXTURES]` 模型子网格换贴图
    ModelTexture {
        model: String,
        mesh_index: u8,
        submesh_index: u8,
        texture: String,
    },

    /// `[MVISIBILITY]` 模型显隐
    ModelVisibility { model: String, visible: bool },

    /// `[SOUNDS]` 声音
    Sound(SoundEvent),

    /// `[GK3] FOOTSTEP`
    Footstep { actor: String },

    /// `[GK3] FOOTSCUFF`
    Footscuff { actor: String },

    /// `[GK3] PLAYSOUNDTRACK` / `PLAYSOUNDTRACKTBS`
    PlaySoundtrack { name: String },

    /// `[GK3] STOPSOUNDTRACK`；`name` 为 `None` 表示停止全部（`STOPALLSOUNDTRACKS`）
    StopSoundtrack { name: Option<String> },

    /// `[GK3] CAMERA`
    Camera { position_name: String },

    /// `[GK3] LIPSYNCH`
    LipSync { actor: String, mouth_texture: String },

    /// `[GK3] FACETEX`
    FaceTexture {
        actor: String,
        texture: String,
        element: FaceElement,
    },

    /// `[GK3] UNFACETEX`
    ClearFaceTexture { actor: String, element: FaceElement },

    /// `[GK3] GLANCE`
    Glance { actor: String, position: Vec3 },

    /// `[GK3] MOOD`
    Mood { actor: String, mood: String },
}

impl AnimEvent {
    /// 事件种类名，用于日志与诊断
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::VertexAnimation(_) => "vertex_animation",
            Self::SceneTexture { .. } => "scene_texture",
            Self::SceneModelVisibility { .. } => "scene_visibility",
            Self::ModelTexture { .. } => "model_texture",
            Self::ModelVisibility { .. } => "model_visibility",
            Self::Sound(_) => "sound",
            Self::Footstep { .. } => "footstep",
            Self::Footscuff { .. } => "footscuff",
            Self::PlaySoundtrack { .. } => "play_soundtrack",
            Self::StopSoundtrack { .. } => "stop_soundtrack",
            Self::Camera { .. } => "camera",
            Self::LipSync { .. } => "lipsync",
            Self::FaceTexture { .. } => "face_texture",
            Self::ClearFaceTexture { .. } => "clear_face_texture",
            Self::Glance { .. } => "glance",
            Self::Mood { .. } => "mood",
        }
    }

    /// 若事件引用了外部资源但查找失败，返回该资源名
    pub fn unresolved_reference(&self) -> Option<&str> {
        match self {
            Self::VertexAnimation(v) if v.animation.is_none() => Some(&v.name),
            Self::Sound(s) if s.audio.is_none() => Some(&s.name),
            _ => None,
        }
    }
}

/// 时间轴节点：帧号 + 执行概率 + 事件
#[derive(Debug, Clone, PartialEq)]
pub struct AnimNode {
    /// 帧号（从 1 开始）
    pub frame: u32,
    /// 执行概率（0–100）
    pub chance: u8,
    pub event: AnimEvent,
}

impl AnimNode {
    pub fn new(frame: u32, event: AnimEvent) -> Self {
        Self {
            frame,
            chance: ALWAYS,
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_element_from_keyword() {
        assert_eq!(FaceElement::from_keyword("Mouth"), Some(FaceElement::Mouth));
        assert_eq!(FaceElement::from_keyword("e"), Some(FaceElement::Eyelids));
        assert_eq!(FaceElement::from_keyword("HEAD"), Some(FaceElement::Forehead));
        assert_eq!(FaceElement::from_keyword("Forehead"), Some(FaceElement::Forehead));
        assert_eq!(FaceElement::from_keyword("x"), None);
        assert_eq!(FaceElement::from_keyword(""), None);
    }

    #[test]
    fn test_unresolved_reference() {
        let event = AnimEvent::VertexAnimation(VertexAnimEvent {
            name: "walk01".to_string(),
            animation: None,
            origin: None,
            start: None,
        });
        assert_eq!(event.unresolved_reference(), Some("walk01"));
        assert!(!matches!(&event, AnimEvent::VertexAnimation(v) if v.is_absolute()));

        let event = AnimEvent::Footstep {
            actor: "gabriel".to_string(),
        };
        assert_eq!(event.unresolved_reference(), None);
        assert_eq!(event.kind_name(), "footstep");
    }
}
