//! # Timeline 解析器
//!
//! 把 ANM 区段文本解析为 [`Animation`]。
//!
//! ## 容错策略
//!
//! - 字段数量不对、字段值无效：记录警告，跳过该行
//! - 未知区段、未知关键字：记录警告，忽略
//! - 资源查找失败：节点中存 `None`，不算警告
//!
//! 解析永远不会失败；所有警告可通过 [`TimelineParser::warnings`] 获取。
//!
//! 除 `[HEADER]` 外，每个区段的第一行是条目数量，解析时直接跳过（条目数以实际行数为准）。

use glam::Vec3;
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::ini::{IniLine, IniSection, parse_sections};
use crate::resolver::AssetResolver;

use super::node::{
    AnimEvent, AnimNode, FaceElement, Placement, SoundEvent, SoundSource, VertexAnimEvent,
};
use super::{AnimOptions, Animation};

/// ANM 解析器
pub struct TimelineParser<'a> {
    resolver: &'a dyn AssetResolver,
    /// 当前资源名（日志用）
    asset: String,
    /// 解析警告（非致命错误）
    warnings: Vec<ParseError>,
}

impl<'a> TimelineParser<'a> {
    /// 创建解析器
    pub fn new(resolver: &'a dyn AssetResolver) -> Self {
        Self {
            resolver,
            asset: String::new(),
            warnings: Vec::new(),
        }
    }

    /// 解析 ANM 文本
    pub fn parse(&mut self, name: &str, text: &str) -> Animation {
        self.warnings.clear();
        self.asset = name.to_string();

        let mut anim = Animation::new(name, 0);
        let mut options = AnimOptions::default();

        for section in parse_sections(text) {
            let upper = section.name.to_ascii_uppercase();
            match upper.as_str() {
                "HEADER" => self.parse_header(&section, &mut anim),
                "ACTIONS" => self.parse_actions(&section, &mut anim),
                "STEXTURES" => self.parse_scene_textures(&section, &mut anim),
                "SVISIBILITY" => self.parse_scene_visibility(&section, &mut anim),
                "MTEXTURES" => self.parse_model_textures(&section, &mut anim),
                "MVISIBILITY" => self.parse_model_visibility(&section, &mut anim),
                "SOUNDS" => self.parse_sounds(&section, &mut anim),
                "OPTIONS" => self.parse_options(&section, &mut options),
                "GK3" => self.parse_gk3(&section, &mut anim),
                _ => self.warn(ParseError::UnknownSection {
                    section: section.name.clone(),
                    line: section.line_number,
                }),
            }
        }

        anim.set_options(options);
        debug!(
            asset = %self.asset,
            frames = anim.frame_count(),
            events = anim.event_count(),
            warnings = self.warnings.len(),
            "ANM 解析完成"
        );
        anim
    }

    /// 获取解析过程中的警告
    pub fn warnings(&self) -> &[ParseError] {
        &self.warnings
    }

    fn warn(&mut self, error: ParseError) {
        warn!(asset = %self.asset, "{error}");
        self.warnings.push(error);
    }

    // ========== 区段 ==========

    /// `[HEADER]`：第一行第一个字段是帧数
    fn parse_header(&mut self, section: &IniSection, anim: &mut Animation) {
        let Some(line) = section.lines.first() else {
            return;
        };
        match line.get(0).and_then(|e| e.as_int()) {
            Some(count) if count >= 0 => anim.set_frame_count(count as u32),
            _ => self.invalid(section, line, "frame_count", "帧数必须是非负整数"),
        }
    }

    /// `[ACTIONS]`
    ///
    /// `<frame>, <act>, [<x1>, <y1>, <z1>, <angle1>], [<x2>, <y2>, <z2>, <angle2>]`
    fn parse_actions(&mut self, section: &IniSection, anim: &mut Animation) {
        for line in section.lines.iter().skip(1) {
            if !self.require(section, line, 2, "至少 2") {
                continue;
            }
            let Some(frame) = self.frame_of(section, line) else {
                continue;
            };
            let name = line.entries[1].key.clone();

            // 第一组可选字段：文件中 y/z 与运行时坐标系相反
            let origin = if line.len() >= 6 {
                let Some([x, y, z, heading]) = self.floats::<4>(section, line, 2) else {
                    continue;
                };
                Some(Placement::new(Vec3::new(x, z, y), heading))
            } else {
                None
            };

            // 第二组可选字段：保持文件中的轴顺序
            let start = if line.len() >= 10 {
                let Some([x, y, z, heading]) = self.floats::<4>(section, line, 6) else {
                    continue;
                };
                Some(Placement::new(Vec3::new(x, y, z), heading))
            } else {
                None
            };

            let animation = self.resolver.vertex_animation(&name);
            if animation.is_none() {
                debug!(asset = %self.asset, name = %name, "顶点动画未找到");
            }

            anim.push(AnimNode::new(
                frame,
                AnimEvent::VertexAnimation(VertexAnimEvent {
                    name,
                    animation,
                    origin,
                    start,
                }),
            ));
        }
    }

    /// `[STEXTURES]`：`<frame>, <scene>, <model>, <texture>`
    fn parse_scene_textures(&mut self, section: &IniSection, anim: &mut Animation) {
        for line in section.lines.iter().skip(1) {
            if !self.require(section, line, 4, "4") {
                continue;
            }
            let Some(frame) = self.frame_of(section, line) else {
                continue;
            };
            anim.push(AnimNode::new(
                frame,
                AnimEvent::SceneTexture {
                    scene: line.entries[1].key.clone(),
                    model: line.entries[2].key.clone(),
                    texture: line.entries[3].key.clone(),
                },
            ));
        }
    }

    /// `[SVISIBILITY]`：`<frame>, <scene>, <model>, <on/off>`
    fn parse_scene_visibility(&mut self, section: &IniSection, anim: &mut Animation) {
        for line in section.lines.iter().skip(1) {
            if !self.require(section, line, 4, "4") {
                continue;
            }
            let Some(frame) = self.frame_of(section, line) else {
                continue;
            };
            anim.push(AnimNode::new(
                frame,
                AnimEvent::SceneModelVisibility {
                    scene: line.entries[1].key.clone(),
                    model: line.entries[2].key.clone(),
                    visible: line.entries[3].as_bool(),
                },
            ));
        }
    }

    /// `[MTEXTURES]`：`<frame>, <model>, <mesh>, <submesh>, <texture>`
    fn parse_model_textures(&mut self, section: &IniSection, anim: &mut Animation) {
        for line in section.lines.iter().skip(1) {
            if !self.require(section, line, 5, "5") {
                continue;
            }
            let Some(frame) = self.frame_of(section, line) else {
                continue;
            };
            let Some(mesh_index) = self.index(section, line, 2, "mesh_index") else {
                continue;
            };
            let Some(submesh_index) = self.index(section, line, 3, "submesh_index") else {
                continue;
            };
            anim.push(AnimNode::new(
                frame,
                AnimEvent::ModelTexture {
                    model: line.entries[1].key.clone(),
                    mesh_index,
                    submesh_index,
                    texture: line.entries[4].key.clone(),
                },
            ));
        }
    }

    /// `[MVISIBILITY]`：`<frame>, <model>, <on/off>`
    fn parse_model_visibility(&mut self, section: &IniSection, anim: &mut Animation) {
        for line in section.lines.iter().skip(1) {
            if !self.require(section, line, 3, "3") {
                continue;
            }
            let Some(frame) = self.frame_of(section, line) else {
                continue;
            };
            anim.push(AnimNode::new(
                frame,
                AnimEvent::ModelVisibility {
                    model: line.entries[1].key.clone(),
                    visible: line.entries[2].as_bool(),
                },
            ));
        }
    }

    /// `[SOUNDS]`，两种形式：
    ///
    /// ```text
    /// <frame>, <sound>, <volume>, <model>, <min_dist>, <max_dist>
    /// <frame>, <sound>, <volume>, <x>, <y>, <z>, <min_dist>, <max_dist>
    /// ```
    fn parse_sounds(&mut self, section: &IniSection, anim: &mut Animation) {
        for line in section.lines.iter().skip(1) {
            let count = line.len();
            if count != 6 && count != 8 {
                self.warn(ParseError::FieldCount {
                    section: section.name.clone(),
                    line: line.line_number,
                    found: count,
                    expected: "6 或 8".to_string(),
                });
                continue;
            }
            let Some(frame) = self.frame_of(section, line) else {
                continue;
            };
            let name = line.entries[1].key.clone();
            let Some(volume) = self.int(section, line, 2, "volume") else {
                continue;
            };

            let source = if count == 6 {
                SoundSource::Model(line.entries[3].key.clone())
            } else {
                // 坐标保持文件中的轴顺序
                let Some([x, y, z]) = self.floats::<3>(section, line, 3) else {
                    continue;
                };
                SoundSource::Position(Vec3::new(x, y, z))
            };

            let dist_index = if count == 6 { 4 } else { 6 };
            let Some([min_distance, max_distance]) = self.floats::<2>(section, line, dist_index)
            else {
                continue;
            };

            let audio = self.resolver.audio(&name);
            if audio.is_none() {
                debug!(asset = %self.asset, name = %name, "音频未找到");
            }

            anim.push(AnimNode::new(
                frame,
                AnimEvent::Sound(SoundEvent {
                    name,
                    audio,
                    volume,
                    source,
                    min_distance,
                    max_distance,
                }),
            ));
        }
    }

    /// `[OPTIONS]`：`[<frame>,] <option>[, <value>]`，也接受 `<option>=<value>`
    fn parse_options(&mut self, section: &IniSection, options: &mut AnimOptions) {
        for line in section.lines.iter().skip(1) {
            let idx = usize::from(line.len() >= 2 && line.entries[0].as_int().is_some());
            let Some(entry) = line.get(idx) else {
                continue;
            };
            let value = if entry.value != entry.key {
                Some(entry)
            } else {
                line.get(idx + 1)
            };

            let option = entry.key.to_ascii_uppercase();
            match option.as_str() {
                "SIMPLE" => {
                    options.simple = value.and_then(|v| v.as_int()).is_none_or(|v| v != 0);
                }
                "NOINTERPOLATE" => options.no_interpolate = true,
                "FRAMERATE" => match value.and_then(|v| v.as_int()) {
                    Some(rate) if rate > 0 => options.frame_rate = Some(rate as u32),
                    _ => self.invalid(section, line, "FRAMERATE", "帧率必须是正整数"),
                },
                _ => self.warn(ParseError::UnknownKeyword {
                    section: section.name.clone(),
                    line: line.line_number,
                    keyword: entry.key.clone(),
                }),
            }
        }
    }

    /// `[GK3]`：`<frame>, <keyword>, <args...>`
    fn parse_gk3(&mut self, section: &IniSection, anim: &mut Animation) {
        for line in section.lines.iter().skip(1) {
            if !self.require(section, line, 2, "至少 2") {
                continue;
            }
            let Some(frame) = self.frame_of(section, line) else {
                continue;
            };

            let keyword = line.entries[1].key.to_ascii_uppercase();
            let needed = match keyword.as_str() {
                "STOPALLSOUNDTRACKS" => 2,
                "FOOTSTEP" | "FOOTSCUFF" | "PLAYSOUNDTRACK" | "PLAYSOUNDTRACKTBS"
                | "STOPSOUNDTRACK" | "CAMERA" => 3,
                "LIPSYNCH" | "UNFACETEX" | "MOOD" => 4,
                "FACETEX" => 5,
                "GLANCE" => 6,
                _ => {
                    self.warn(ParseError::UnknownKeyword {
                        section: section.name.clone(),
                        line: line.line_number,
                        keyword: line.entries[1].key.clone(),
                    });
                    continue;
                }
            };
            if !self.require(section, line, needed, &needed.to_string()) {
                continue;
            }

            let arg = |i: usize| line.entries[i].key.clone();
            let event = match keyword.as_str() {
                "FOOTSTEP" => AnimEvent::Footstep { actor: arg(2) },
                "FOOTSCUFF" => AnimEvent::Footscuff { actor: arg(2) },
                "PLAYSOUNDTRACK" | "PLAYSOUNDTRACKTBS" => AnimEvent::PlaySoundtrack { name: arg(2) },
                "STOPSOUNDTRACK" => AnimEvent::StopSoundtrack { name: Some(arg(2)) },
                "STOPALLSOUNDTRACKS" => AnimEvent::StopSoundtrack { name: None },
                "CAMERA" => AnimEvent::Camera {
                    position_name: arg(2),
                },
                "LIPSYNCH" => AnimEvent::LipSync {
                    actor: arg(2),
                    mouth_texture: arg(3),
                },
                "FACETEX" => AnimEvent::FaceTexture {
                    actor: arg(2),
                    texture: arg(3),
                    element: self.face_element(section, line, 4),
                },
                "UNFACETEX" => AnimEvent::ClearFaceTexture {
                    actor: arg(2),
                    element: self.face_element(section, line, 3),
                },
                "GLANCE" => {
                    let Some([x, y, z]) = self.floats::<3>(section, line, 3) else {
                        continue;
                    };
                    AnimEvent::Glance {
                        actor: arg(2),
                        position: Vec3::new(x, y, z),
                    }
                }
                _ => AnimEvent::Mood {
                    actor: arg(2),
                    mood: arg(3),
                },
            };
            anim.push(AnimNode::new(frame, event));
        }
    }

    // ========== 字段辅助 ==========

    /// 检查字段数量下限
    fn require(&mut self, section: &IniSection, line: &IniLine, min: usize, expected: &str) -> bool {
        if line.len() >= min {
            return true;
        }
        self.warn(ParseError::FieldCount {
            section: section.name.clone(),
            line: line.line_number,
            found: line.len(),
            expected: expected.to_string(),
        });
        false
    }

    /// 第一个字段：帧号，必须 ≥ 1
    fn frame_of(&mut self, section: &IniSection, line: &IniLine) -> Option<u32> {
        match line.get(0).and_then(|e| e.as_int()) {
            Some(frame) if frame >= 1 => Some(frame as u32),
            _ => {
                self.invalid(section, line, "frame", "帧号必须是不小于 1 的整数");
                None
            }
        }
    }

    fn int(&mut self, section: &IniSection, line: &IniLine, index: usize, field: &str) -> Option<i32> {
        let value = line.get(index).and_then(|e| e.as_int());
        if value.is_none() {
            self.invalid(section, line, field, "应为整数");
        }
        value
    }

    /// 0–255 的网格 / 子网格索引
    fn index(&mut self, section: &IniSection, line: &IniLine, index: usize, field: &str) -> Option<u8> {
        let value = self.int(section, line, index, field)?;
        match u8::try_from(value) {
            Ok(v) => Some(v),
            Err(_) => {
                self.invalid(section, line, field, "索引超出 0–255");
                None
            }
        }
    }

    /// 从 `start` 开始连续读取 N 个浮点字段
    fn floats<const N: usize>(
        &mut self,
        section: &IniSection,
        line: &IniLine,
        start: usize,
    ) -> Option<[f32; N]> {
        let mut out = [0.0; N];
        for (i, slot) in out.iter_mut().enumerate() {
            match line.get(start + i).and_then(|e| e.as_float()) {
                Some(v) => *slot = v,
                None => {
                    let field = format!("#{}", start + i + 1);
                    self.invalid(section, line, &field, "应为数值");
                    return None;
                }
            }
        }
        Some(out)
    }

    /// 脸部区域；无法识别时退回嘴部并记录警告
    fn face_element(&mut self, section: &IniSection, line: &IniLine, index: usize) -> FaceElement {
        let keyword = &line.entries[index].key;
        FaceElement::from_keyword(keyword).unwrap_or_else(|| {
            self.invalid(section, line, "face_element", "应以 m/e/h 开头，按嘴部处理");
            FaceElement::Mouth
        })
    }

    fn invalid(&mut self, section: &IniSection, line: &IniLine, field: &str, message: &str) {
        self.warn(ParseError::InvalidField {
            section: section.name.clone(),
            line: line.line_number,
            field: field.to_string(),
            message: message.to_string(),
        });
    }
}
