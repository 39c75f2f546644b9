//! # Timeline 模块
//!
//! ANM 时间轴资源：以帧号为键的稀疏事件表。
//!
//! ## 模块结构
//!
//! - [`node`]：事件节点定义
//! - [`parser`]：区段文本 → [`Animation`]

pub mod node;
pub mod parser;


use std::collections::BTreeMap;

pub use node::{
    ALWAYS, AnimEvent, AnimNode, FaceElement, Placement, SoundEvent, SoundSource, VertexAnimEvent,
};
pub use parser::TimelineParser;

use crate::resolver::AssetResolver;

/// `[OPTIONS]` 区段中的全局选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnimOptions {
    /// `SIMPLE`（保存但不影响播放）
    pub simple: bool,
    /// `NOINTERPOLATE`（保存但不影响播放）
    pub no_interpolate: bool,
    /// `FRAMERATE`，帧/秒
    pub frame_rate: Option<u32>,
}

/// 时间轴动画（ANM）
///
/// 加载后不可变，通常以 `Arc<Animation>` 共享。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Animation {
    name: String,
    frame_count: u32,
    options: AnimOptions,
    frames: BTreeMap<u32, Vec<AnimNode>>,
}

impl Animation {
    /// 创建空时间轴
    pub fn new(name: impl Into<String>, frame_count: u32) -> Self {
        Self {
            name: name.into(),
            frame_count,
            ..Self::default()
        }
    }

    /// 解析 ANM 文本
    ///
    /// 解析警告会被记录到日志；需要逐条检查时使用 [`TimelineParser`]。
    pub fn parse(name: &str, text: &str, resolver: &dyn AssetResolver) -> Self {
        TimelineParser::new(resolver).parse(name, text)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 声明的帧数
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn options(&self) -> &AnimOptions {
        &self.options
    }

    /// 获取某一帧的事件（按声明顺序）；该帧无事件时返回 `None`
    pub fn frame(&self, frame: u32) -> Option<&[AnimNode]> {
        self.frames.get(&frame).map(Vec::as_slice)
    }

    /// 按帧号升序遍历所有有事件的帧
    pub fn frames(&self) -> impl Iterator<Item = (u32, &[AnimNode])> {
        self.frames.iter().map(|(f, nodes)| (*f, nodes.as_slice()))
    }

    /// 事件总数
    pub fn event_count(&self) -> usize {
        self.frames.values().map(Vec::len).sum()
    }

    /// 追加事件（同一帧内保持追加顺序）
    pub fn push(&mut self, node: AnimNode) {
        self.frames.entry(node.frame).or_default().push(node);
    }

    pub fn set_frame_count(&mut self, frame_count: u32) {
        self.frame_count = frame_count;
    }

    pub fn set_options(&mut self, options: AnimOptions) {
        self.options = options;
    }
}
