//! # Vertex 模块
//!
//! ACT 顶点动画：按 (网格, 子网格) 保存的顶点关键帧，以及按网格保存的变换关键帧。
//!
//! ## 模块结构
//!
//! - [`decode`]：二进制关键帧流 → [`VertexAnimation`]
//! - [`sample`]：按时间采样（插值、越界钳制）
//!
//! 所有坐标在解码时已经转换到运行时坐标系。

mod decode;
mod sample;

use std::collections::BTreeMap;

use glam::{Quat, Vec3};

use crate::error::ActError;

/// 单个子网格在某一关键帧的全部顶点位置
#[derive(Debug, Clone, PartialEq)]
pub struct VertexPose {
    /// 关键帧号（从 0 开始）
    pub frame: u32,
    pub positions: Vec<Vec3>,
}

/// 单个网格在某一关键帧的变换
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformPose {
    pub frame: u32,
    pub rotation: Quat,
    pub position: Vec3,
    pub scale: Vec3,
}

impl TransformPose {
    pub fn identity(frame: u32) -> Self {
        Self {
            frame,
            rotation: Quat::IDENTITY,
            position: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// 顶点动画（ACT）
///
/// 加载后不可变；关键帧按帧号升序保存，采样时二分查找。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VertexAnimation {
    name: String,
    model_name: String,
    frame_count: u32,
    vertex_poses: BTreeMap<(u32, u16), Vec<VertexPose>>,
    transform_poses: BTreeMap<u32, Vec<TransformPose>>,
}

impl VertexAnimation {
    /// 创建空动画
    pub fn new(name: impl Into<String>, frame_count: u32) -> Self {
        Self {
            name: name.into(),
            frame_count,
            ..Self::default()
        }
    }

    /// 从 ACT 二进制数据解码
    pub fn from_bytes(name: &str, data: &[u8]) -> Result<Self, ActError> {
        decode::decode(name, data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 文件头中记录的模型名
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// 按给定帧率播放所需的时长（秒）
    pub fn duration(&self, frames_per_second: u32) -> f32 {
        if frames_per_second == 0 {
            return 0.0;
        }
        self.frame_count as f32 / frames_per_second as f32
    }

    /// 某个子网格的顶点关键帧
    pub fn vertex_poses(&self, mesh: u32, submesh: u16) -> Option<&[VertexPose]> {
        self.vertex_poses.get(&(mesh, submesh)).map(Vec::as_slice)
    }

    /// 某个网格的变换关键帧
    pub fn transform_poses(&self, mesh: u32) -> Option<&[TransformPose]> {
        self.transform_poses.get(&mesh).map(Vec::as_slice)
    }

    /// 有数据的网格索引（升序、去重）
    pub fn meshes(&self) -> Vec<u32> {
        let mut meshes: Vec<u32> = self
            .vertex_poses
            .keys()
            .map(|(mesh, _)| *mesh)
            .chain(self.transform_poses.keys().copied())
            .collect();
        meshes.sort_unstable();
        meshes.dedup();
        meshes
    }

    /// 插入顶点关键帧（保持帧号有序，同帧号覆盖）
    pub fn push_vertex_pose(&mut self, mesh: u32, submesh: u16, pose: VertexPose) {
        let poses = self.vertex_poses.entry((mesh, submesh)).or_default();
        insert_sorted(poses, pose, |p| p.frame);
    }

    /// 插入变换关键帧（保持帧号有序，同帧号覆盖）
    pub fn push_transform_pose(&mut self, mesh: u32, pose: TransformPose) {
        let poses = self.transform_poses.entry(mesh).or_default();
        insert_sorted(poses, pose, |p| p.frame);
    }

    pub(crate) fn set_model_name(&mut self, model_name: String) {
        self.model_name = model_name;
    }
}

fn insert_sorted<T>(items: &mut Vec<T>, item: T, frame: impl Fn(&T) -> u32) {
    let key = frame(&item);
    let idx = items.partition_point(|p| frame(p) < key);
    match items.get_mut(idx) {
        Some(existing) if frame(existing) == key => *existing = item,
        _ => items.insert(idx, item),
    }
}
