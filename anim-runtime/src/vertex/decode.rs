//! ACT 二进制解码
//!
//! ```text
//! 文件头: "HTCA", u32 版本, u32 网格数, u32 帧数, [u8; 32] 模型名, u32 帧偏移[帧数]
//! 每帧:   u32 网格块数，每块 u32 网格索引, u32 段数，每段 u8 类型, u32 长度, 数据
//!   类型 0 顶点: u16 子网格, u16 顶点数, 压缩掩码, 压缩数据
//!   类型 1 变换: f32 四元数 (x, y, z, w), f32 位置 (x, y, z), f32 缩放 (x, y, z)
//!   类型 2 包围盒: 忽略
//! ```
//!
//! 一个子网格的第一个关键帧是绝对值，之后的关键帧是相对上一关键帧的增量。
//! 文件坐标 (x, y, z) 对应运行时 (x, z, y)。

use std::collections::HashMap;

use glam::{Quat, Vec3};
use tracing::{debug, warn};

use super::{TransformPose, VertexAnimation, VertexPose};
use crate::error::ActError;

const MAGIC: &[u8; 4] = b"HTCA";
const MODEL_NAME_LEN: usize = 32;

const SECTION_VERTEX: u8 = 0;
const SECTION_TRANSFORM: u8 = 1;
const SECTION_BOUNDS: u8 = 2;

/// 小端字节游标
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    /// 在整个文件中的起始偏移（错误信息用）
    base: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    fn at(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], ActError> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.data.len());
        let Some(end) = end else {
            return Err(ActError::Truncated {
                offset: self.base + self.pos,
                needed: len,
            });
        };
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ActError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, ActError> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, ActError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32, ActError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn f32(&mut self) -> Result<f32, ActError> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    fn vec3(&mut self) -> Result<Vec3, ActError> {
        Ok(Vec3::new(self.f32()?, self.f32()?, self.f32()?))
    }

    /// 取出一段长度为 `len` 的子游标
    fn sub(&mut self, len: usize) -> Result<ByteReader<'a>, ActError> {
        let base = self.base + self.pos;
        Ok(ByteReader::at(self.bytes(len)?, base))
    }
}

/// 文件坐标 → 运行时坐标
fn convert_axes(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.z, v.y)
}

fn convert_rotation(x: f32, y: f32, z: f32, w: f32) -> Quat {
    Quat::from_xyzw(-x, -z, -y, w)
}

/// 1 字节压缩值：最高位为符号，其余 7 位为 1/16 精度的定点数
fn decompress_byte(v: u8) -> f32 {
    let magnitude = f32::from(v & 0x7F) / 16.0;
    if v & 0x80 != 0 { -magnitude } else { magnitude }
}

/// 2 字节压缩值：最高位为符号，其余 15 位为 1/256 精度的定点数
fn decompress_short(v: u16) -> f32 {
    let magnitude = f32::from(v & 0x7FFF) / 256.0;
    if v & 0x8000 != 0 { -magnitude } else { magnitude }
}

pub(super) fn decode(name: &str, data: &[u8]) -> Result<VertexAnimation, ActError> {
    let mut reader = ByteReader::new(data);

    let magic = reader.array::<4>()?;
    if &magic != MAGIC {
        return Err(ActError::BadMagic { found: magic });
    }
    let version = reader.u32()?;
    let mesh_count = reader.u32()?;
    let frame_count = reader.u32()?;
    let model_name = reader.bytes(MODEL_NAME_LEN)?;
    let model_name = String::from_utf8_lossy(model_name)
        .trim_end_matches('\0')
        .to_string();

    // 先按声明的帧数取出整张偏移表，帧数与文件长度不符时在分配前报截断
    let mut table = reader.sub((frame_count as usize).saturating_mul(4))?;
    let offsets = (0..frame_count)
        .map(|_| table.u32().map(|offset| offset as usize))
        .collect::<Result<Vec<_>, _>>()?;

    let mut anim = VertexAnimation::new(name, frame_count);
    anim.set_model_name(model_name);

    let mut previous: HashMap<(u32, u16), Vec<Vec3>> = HashMap::new();
    for (frame, offset) in offsets.into_iter().enumerate() {
        if offset >= data.len() {
            return Err(ActError::FrameOffset {
                frame,
                offset,
                len: data.len(),
            });
        }
        let mut frame_reader = ByteReader::at(&data[offset..], offset);
        decode_frame(&mut frame_reader, frame as u32, &mut anim, &mut previous)?;
    }

    debug!(
        name,
        version,
        mesh_count,
        frame_count,
        model = anim.model_name(),
        "ACT 解码完成"
    );
    Ok(anim)
}

fn decode_frame(
    reader: &mut ByteReader<'_>,
    frame: u32,
    anim: &mut VertexAnimation,
    previous: &mut HashMap<(u32, u16), Vec<Vec3>>,
) -> Result<(), ActError> {
    let block_count = reader.u32()?;
    for _ in 0..block_count {
        let mesh = reader.u32()?;
        let section_count = reader.u32()?;
        for _ in 0..section_count {
            let kind = reader.u8()?;
            let len = reader.u32()? as usize;
            let mut section = reader.sub(len)?;
            match kind {
                SECTION_VERTEX => decode_vertex_section(&mut section, mesh, frame, anim, previous)?,
                SECTION_TRANSFORM => {
                    let (x, y, z, w) = (section.f32()?, section.f32()?, section.f32()?, section.f32()?);
                    let position = section.vec3()?;
                    let scale = section.vec3()?;
                    anim.push_transform_pose(
                        mesh,
                        TransformPose {
                            frame,
                            rotation: convert_rotation(x, y, z, w),
                            position: convert_axes(position),
                            scale: convert_axes(scale),
                        },
                    );
                }
                SECTION_BOUNDS => {}
                other => warn!(name = anim.name(), frame, kind = other, "未知的 ACT 数据段，已跳过"),
            }
        }
    }
    Ok(())
}

fn decode_vertex_section(
    reader: &mut ByteReader<'_>,
    mesh: u32,
    frame: u32,
    anim: &mut VertexAnimation,
    previous: &mut HashMap<(u32, u16), Vec<Vec3>>,
) -> Result<(), ActError> {
    let submesh = reader.u16()?;
    let vertex_count = usize::from(reader.u16()?);
    let component_count = vertex_count * 3;
    let mask = reader.bytes(component_count.div_ceil(4))?;

    let mut components = Vec::with_capacity(component_count);
    for c in 0..component_count {
        let bits = (mask[c / 4] >> ((c % 4) * 2)) & 0b11;
        let value = match bits {
            0 => 0.0,
            1 => decompress_byte(reader.u8()?),
            2 => decompress_short(reader.u16()?),
            _ => reader.f32()?,
        };
        components.push(value);
    }

    let values = components
        .chunks_exact(3)
        .map(|c| convert_axes(Vec3::new(c[0], c[1], c[2])));

    let key = (mesh, submesh);
    let positions: Vec<Vec3> = match previous.get(&key) {
        None => values.collect(),
        Some(base) if base.len() == vertex_count => {
            base.iter().zip(values).map(|(b, d)| *b + d).collect()
        }
        Some(base) => {
            return Err(ActError::VertexCountMismatch {
                mesh,
                submesh,
                expected: base.len(),
                found: vertex_count,
            });
        }
    };

    previous.insert(key, positions.clone());
    anim.push_vertex_pose(mesh, submesh, VertexPose { frame, positions });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试用的 ACT 写入器
    #[derive(Default)]
    struct ActWriter {
        frames: Vec<Vec<u8>>,
    }

    enum Component {
        Zero,
        Byte(u8),
        Short(u16),
        Float(f32),
    }

    fn vertex_section(submesh: u16, components: &[Component]) -> Vec<u8> {
        assert_eq!(components.len() % 3, 0);
        let mut out = Vec::new();
        out.extend_from_slice(&submesh.to_le_bytes());
        out.extend_from_slice(&((components.len() / 3) as u16).to_le_bytes());

        let mut mask = vec![0u8; components.len().div_ceil(4)];
        let mut values = Vec::new();
        for (c, component) in components.iter().enumerate() {
            let bits = match component {
                Component::Zero => 0,
                Component::Byte(v) => {
                    values.push(*v);
                    1
                }
                Component::Short(v) => {
                    values.extend_from_slice(&v.to_le_bytes());
                    2
                }
                Component::Float(v) => {
                    values.extend_from_slice(&v.to_le_bytes());
                    3
                }
            };
            mask[c / 4] |= bits << ((c % 4) * 2);
        }
        out.extend_from_slice(&mask);
        out.extend_from_slice(&values);
        out
    }

    fn transform_section(quat: [f32; 4], position: [f32; 3], scale: [f32; 3]) -> Vec<u8> {
        quat.iter()
            .chain(&position)
            .chain(&scale)
            .flat_map(|v| v.to_le_bytes())
            .collect()
    }

    impl ActWriter {
        /// 添加一帧：每个元素为 (网格索引, [(段类型, 数据)])
        fn frame(mut self, blocks: &[(u32, Vec<(u8, Vec<u8>)>)]) -> Self {
            let mut out = Vec::new();
            out.extend_from_slice(&(blocks.len() as u32).to_le_bytes());
            for (mesh, sections) in blocks {
                out.extend_from_slice(&mesh.to_le_bytes());
                out.extend_from_slice(&(sections.len() as u32).to_le_bytes());
                for (kind, payload) in sections {
                    out.push(*kind);
                    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
                    out.extend_from_slice(payload);
                }
            }
            self.frames.push(out);
            self
        }

        fn build(self) -> Vec<u8> {
            let mut out = Vec::new();
            out.extend_from_slice(MAGIC);
            out.extend_from_slice(&1u32.to_le_bytes());
            out.extend_from_slice(&1u32.to_le_bytes());
            out.extend_from_slice(&(self.frames.len() as u32).to_le_bytes());
            let mut name = [0u8; MODEL_NAME_LEN];
            name[..3].copy_from_slice(b"gab");
            out.extend_from_slice(&name);

            let mut offset = out.len() + self.frames.len() * 4;
            for frame in &self.frames {
                out.extend_from_slice(&(offset as u32).to_le_bytes());
                offset += frame.len();
            }
            for frame in self.frames {
                out.extend_from_slice(&frame);
            }
            out
        }
    }

    #[test]
    fn test_decompress() {
        assert_eq!(decompress_byte(0x10), 1.0);
        assert_eq!(decompress_byte(0x90), -1.0);
        assert_eq!(decompress_byte(0x08), 0.5);
        assert_eq!(decompress_short(0x0100), 1.0);
        assert_eq!(decompress_short(0x8080), -0.5);
    }

    #[test]
    fn test_absolute_then_delta() {
        use Component::*;

        let first = vertex_section(0, &[Float(1.0), Float(2.0), Float(3.0)]);
        // 增量：x +1（字节），y 不变，z -0.5（短整型）
        let second = vertex_section(0, &[Byte(0x10), Zero, Short(0x8080)]);
        let data = ActWriter::default()
            .frame(&[(0, vec![(SECTION_VERTEX, first)])])
            .frame(&[(0, vec![(SECTION_VERTEX, second)])])
            .build();

        let anim = VertexAnimation::from_bytes("walk01", &data).unwrap();
        assert_eq!(anim.frame_count(), 2);
        assert_eq!(anim.model_name(), "gab");

        let poses = anim.vertex_poses(0, 0).unwrap();
        assert_eq!(poses.len(), 2);
        // 文件 (1, 2, 3) → 运行时 (1, 3, 2)
        assert_eq!(poses[0].positions, [Vec3::new(1.0, 3.0, 2.0)]);
        // 文件增量 (1, 0, -0.5) → 运行时 (1, -0.5, 0)
        assert_eq!(poses[1].frame, 1);
        assert_eq!(poses[1].positions, [Vec3::new(2.0, 2.5, 2.0)]);

        // 采样关键帧处得到解压后的值
        assert_eq!(
            anim.sample_vertex_position(1.0, 1, 0, 0, 0),
            Some(Vec3::new(2.0, 2.5, 2.0))
        );
    }

    #[test]
    fn test_transform_axis_conversion() {
        let transform = transform_section([0.1, 0.2, 0.3, 0.9], [1.0, 2.0, 3.0], [4.0, 5.0, 6.0]);
        let data = ActWriter::default()
            .frame(&[(2, vec![(SECTION_BOUNDS, vec![0; 24]), (SECTION_TRANSFORM, transform)])])
            .build();

        let anim = VertexAnimation::from_bytes("turn", &data).unwrap();
        let pose = anim.transform_poses(2).unwrap()[0];
        assert_eq!(pose.rotation, Quat::from_xyzw(-0.1, -0.3, -0.2, 0.9));
        assert_eq!(pose.position, Vec3::new(1.0, 3.0, 2.0));
        assert_eq!(pose.scale, Vec3::new(4.0, 6.0, 5.0));
        assert!(anim.vertex_poses(2, 0).is_none());
    }

    #[test]
    fn test_unknown_section_is_skipped() {
        use Component::*;

        let data = ActWriter::default()
            .frame(&[(
                0,
                vec![(9, vec![1, 2, 3]), (SECTION_VERTEX, vertex_section(1, &[Zero, Zero, Byte(0x20)]))],
            )])
            .build();
        let anim = VertexAnimation::from_bytes("x", &data).unwrap();
        assert_eq!(anim.vertex_poses(0, 1).unwrap()[0].positions, [Vec3::new(0.0, 2.0, 0.0)]);
    }

    #[test]
    fn test_bad_magic() {
        let mut data = ActWriter::default().build();
        data[0] = b'X';
        let err = VertexAnimation::from_bytes("x", &data).unwrap_err();
        assert_eq!(err, ActError::BadMagic { found: *b"XTCA" });
    }

    #[test]
    fn test_truncated() {
        let data = ActWriter::default()
            .frame(&[(0, vec![(SECTION_TRANSFORM, vec![0; 40])])])
            .build();
        let err = VertexAnimation::from_bytes("x", &data[..data.len() - 1]).unwrap_err();
        assert!(matches!(err, ActError::Truncated { .. }));

        let err = VertexAnimation::from_bytes("x", b"HTC").unwrap_err();
        assert_eq!(err, ActError::Truncated { offset: 0, needed: 4 });
    }

    #[test]
    fn test_huge_frame_count_is_truncated() {
        let mut data = ActWriter::default().frame(&[]).build();
        data[12..16].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = VertexAnimation::from_bytes("x", &data).unwrap_err();
        assert_eq!(
            err,
            ActError::Truncated {
                offset: 4 + 12 + MODEL_NAME_LEN,
                needed: u32::MAX as usize * 4,
            }
        );
    }

    #[test]
    fn test_frame_offset_out_of_range() {
        let mut data = ActWriter::default().frame(&[]).build();
        let table = 4 + 12 + MODEL_NAME_LEN;
        data[table..table + 4].copy_from_slice(&9999u32.to_le_bytes());
        let err = VertexAnimation::from_bytes("x", &data).unwrap_err();
        assert!(matches!(err, ActError::FrameOffset { frame: 0, offset: 9999, .. }));
    }

    #[test]
    fn test_vertex_count_mismatch() {
        use Component::*;

        let data = ActWriter::default()
            .frame(&[(0, vec![(SECTION_VERTEX, vertex_section(0, &[Zero, Zero, Zero]))])])
            .frame(&[(
                0,
                vec![(SECTION_VERTEX, vertex_section(0, &[Zero, Zero, Zero, Zero, Zero, Zero]))],
            )])
            .build();
        let err = VertexAnimation::from_bytes("x", &data).unwrap_err();
        assert_eq!(
            err,
            ActError::VertexCountMismatch {
                mesh: 0,
                submesh: 0,
                expected: 1,
                found: 2
            }
        );
    }
}
