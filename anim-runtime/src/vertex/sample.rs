//! 关键帧采样
//!
//! 帧号 = 时间 × 帧率。找到满足 `a.frame ≤ f < b.frame` 的相邻关键帧并插值；
//! 早于第一帧或晚于最后一帧时钳制到端点。

use glam::Vec3;

use super::{TransformPose, VertexAnimation, VertexPose};

/// 采样位置在关键帧序列中的位置
enum Bracket<'a, T> {
    /// 落在端点上或端点之外
    Exact(&'a T),
    /// 在两帧之间，`t` ∈ (0, 1)
    Between(&'a T, &'a T, f32),
}

fn bracket<T>(poses: &[T], frame: f32, key: impl Fn(&T) -> u32) -> Option<Bracket<'_, T>> {
    let first = poses.first()?;
    let idx = poses.partition_point(|p| key(p) as f32 <= frame);
    if idx == 0 {
        return Some(Bracket::Exact(first));
    }
    let prev = &poses[idx - 1];
    let Some(next) = poses.get(idx) else {
        return Some(Bracket::Exact(prev));
    };

    let span = (key(next) - key(prev)) as f32;
    let t = (frame - key(prev) as f32) / span;
    if t <= 0.0 {
        Some(Bracket::Exact(prev))
    } else {
        Some(Bracket::Between(prev, next, t))
    }
}

fn frame_at(time: f32, frames_per_second: u32) -> f32 {
    time * frames_per_second as f32
}

impl VertexAnimation {
    /// 采样单个顶点位置
    ///
    /// 网格、子网格或顶点没有数据时返回 `None`。
    pub fn sample_vertex_position(
        &self,
        time: f32,
        frames_per_second: u32,
        mesh: u32,
        submesh: u16,
        vertex: usize,
    ) -> Option<Vec3> {
        let poses = self.vertex_poses(mesh, submesh)?;
        match bracket(poses, frame_at(time, frames_per_second), |p| p.frame)? {
            Bracket::Exact(pose) => pose.positions.get(vertex).copied(),
            Bracket::Between(a, b, t) => {
                let from = a.positions.get(vertex)?;
                let to = b.positions.get(vertex)?;
                Some(from.lerp(*to, t))
            }
        }
    }

    /// 采样整个子网格的顶点位置
    pub fn sample_vertex_pose(
        &self,
        time: f32,
        frames_per_second: u32,
        mesh: u32,
        submesh: u16,
    ) -> Option<Vec<Vec3>> {
        let poses = self.vertex_poses(mesh, submesh)?;
        let positions = match bracket(poses, frame_at(time, frames_per_second), |p| p.frame)? {
            Bracket::Exact(VertexPose { positions, .. }) => positions.clone(),
            Bracket::Between(a, b, t) => a
                .positions
                .iter()
                .zip(&b.positions)
                .map(|(from, to)| from.lerp(*to, t))
                .collect(),
        };
        Some(positions)
    }

    /// 采样网格变换：位置与缩放线性插值，旋转球面插值（最短弧）
    ///
    /// 返回值的 `frame` 为下方关键帧的帧号。
    pub fn sample_transform_pose(
        &self,
        time: f32,
        frames_per_second: u32,
        mesh: u32,
    ) -> Option<TransformPose> {
        let poses = self.transform_poses(mesh)?;
        let pose = match bracket(poses, frame_at(time, frames_per_second), |p| p.frame)? {
            Bracket::Exact(pose) => *pose,
            Bracket::Between(a, b, t) => TransformPose {
                frame: a.frame,
                rotation: a.rotation.slerp(b.rotation, t),
                position: a.position.lerp(b.position, t),
                scale: a.scale.lerp(b.scale, t),
            },
        };
        Some(pose)
    }
}
