//! # AST 模块
//!
//! GAS 自动脚本的节点定义。
//!
//! 节点词汇是固定的：播放动画、等待、跳转、变量运算、走动。
//! 解释器读取节点并产生 Command。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use glam::Vec3;

use crate::timeline::{ALWAYS, Animation};

/// 脚本变量（`A`–`Z`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(u8);

impl Variable {
    /// 变量数量
    pub const COUNT: usize = 26;

    /// 从单个字母解析（大小写不敏感）
    pub fn from_name(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        let c = chars.next()?.to_ascii_uppercase();
        if chars.next().is_some() || !c.is_ascii_uppercase() {
            return None;
        }
        Some(Self(c as u8 - b'A'))
    }

    /// 在变量表中的下标
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    pub fn letter(self) -> char {
        char::from(b'A' + self.0)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CompareOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" | "==" => Some(Self::Eq),
            "!=" | "<>" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            ">" => Some(Self::Gt),
            "<=" => Some(Self::Le),
            ">=" => Some(Self::Ge),
            _ => None,
        }
    }

    pub fn evaluate(self, lhs: i32, rhs: i32) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Lt => lhs < rhs,
            Self::Gt => lhs > rhs,
            Self::Le => lhs <= rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

/// ONEOF 的候选动画
#[derive(Debug, Clone, PartialEq)]
pub struct AnimOption {
    pub name: String,
    /// 解析到的动画；查找失败时为 `None`
    pub animation: Option<Arc<Animation>>,
    /// 权重（默认 1）
    pub weight: u32,
}

/// 走动目标
#[derive(Debug, Clone, PartialEq)]
pub enum WalkTarget {
    /// 场景中的命名位置
    Named(String),
    /// 固定坐标
    Position(Vec3),
}

/// CHOOSEWALK 的候选目标
#[derive(Debug, Clone, PartialEq)]
pub struct WalkOption {
    pub target: WalkTarget,
    pub weight: u32,
}

/// 节点内容
#[derive(Debug, Clone, PartialEq)]
pub enum GasNodeKind {
    /// 播放时间轴动画，等待其结束
    Anim {
        name: String,
        animation: Option<Arc<Animation>>,
        /// 动画是否会移动角色
        moving: bool,
    },

    /// 从候选动画中按权重随机选一个播放
    OneOf { options: Vec<AnimOption> },

    /// 等待 [min, max] 秒内的随机时长
    Wait { min_seconds: f32, max_seconds: f32 },

    /// 跳转目标
    Label { name: String },

    /// 跳转到标签；空标签表示回到开头
    Goto { label: String },

    /// 设置变量
    Set { var: Variable, value: i32 },

    /// 变量加减（INC / DEC）
    Add { var: Variable, delta: i32 },

    /// 条件成立时跳转
    If {
        var: Variable,
        op: CompareOp,
        value: i32,
        label: String,
    },

    /// 走到目标位置，等待到达
    WalkTo { target: WalkTarget },

    /// 从候选目标中按权重随机选一个走过去
    ChooseWalk { targets: Vec<WalkOption> },

    /// 使用交互位置
    UseIPos { name: String },
}

impl GasNodeKind {
    /// 关键字名，用于日志与诊断
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Anim { .. } => "ANIM",
            Self::OneOf { .. } => "ONEOF",
            Self::Wait { .. } => "WAIT",
            Self::Label { .. } => "LABEL",
            Self::Goto { .. } => "GOTO",
            Self::Set { .. } => "SET",
            Self::Add { .. } => "INC",
            Self::If { .. } => "IF",
            Self::WalkTo { .. } => "WALKTO",
            Self::ChooseWalk { .. } => "CHOOSEWALK",
            Self::UseIPos { .. } => "USEIPOS",
        }
    }

    /// 跳转目标标签（GOTO / IF）
    pub fn jump_target(&self) -> Option<&str> {
        match self {
            Self::Goto { label } | Self::If { label, .. } => Some(label),
            _ => None,
        }
    }
}

/// 脚本节点：执行概率 + 内容
#[derive(Debug, Clone, PartialEq)]
pub struct GasNode {
    /// 执行概率（0–100）
    pub chance: u8,
    pub kind: GasNodeKind,
}

impl GasNode {
    pub fn new(kind: GasNodeKind) -> Self {
        Self {
            chance: ALWAYS,
            kind,
        }
    }

    pub fn with_chance(mut self, chance: u8) -> Self {
        self.chance = chance.min(ALWAYS);
        self
    }
}

/// GAS 自动脚本
///
/// 加载后不可变，通常以 `Arc<AutoScript>` 在多个角色间共享。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AutoScript {
    name: String,
    nodes: Vec<GasNode>,
    /// 每个节点对应的源码行号（从 1 开始）
    source_map: Vec<usize>,
    /// 小写标签名 → 节点索引（重复标签取第一个）
    label_index: HashMap<String, usize>,
}

impl AutoScript {
    /// 创建脚本（无行号信息）
    pub fn new(name: impl Into<String>, nodes: Vec<GasNode>) -> Self {
        let source_map = (1..=nodes.len()).collect();
        Self::with_source_map(name, nodes, source_map)
    }

    /// 创建脚本并附带行号
    pub fn with_source_map(
        name: impl Into<String>,
        nodes: Vec<GasNode>,
        source_map: Vec<usize>,
    ) -> Self {
        let mut script = Self {
            name: name.into(),
            nodes,
            source_map,
            label_index: HashMap::new(),
        };
        script.build_label_index();
        script
    }

    fn build_label_index(&mut self) {
        self.label_index.clear();
        for (index, node) in self.nodes.iter().enumerate() {
            if let GasNodeKind::Label { name } = &node.kind {
                self.label_index
                    .entry(name.to_ascii_lowercase())
                    .or_insert(index);
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 获取指定索引的节点
    pub fn node(&self, index: usize) -> Option<&GasNode> {
        self.nodes.get(index)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[GasNode] {
        &self.nodes
    }

    /// 根据标签名查找节点索引（大小写不敏感）
    pub fn find_label(&self, name: &str) -> Option<usize> {
        self.label_index.get(&name.to_ascii_lowercase()).copied()
    }

    /// 节点所在的源码行号
    pub fn line_of(&self, index: usize) -> Option<usize> {
        self.source_map.get(index).copied()
    }
}
