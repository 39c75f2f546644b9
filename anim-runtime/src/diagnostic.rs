//! # 诊断模块
//!
//! 对已解析资源做静态检查，不依赖 IO。
//!
//! ## 设计原则
//!
//! - 纯函数 API，可在无 IO 环境下运行
//! - 诊断分级：Error（必须修复）、Warn（建议修复）、Info（信息提示）
//! - 复用解析结果，不重复解析逻辑

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::ParseError;
use crate::gas::{AutoScript, GasNodeKind};
use crate::timeline::Animation;

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    /// 信息提示
    Info,
    /// 警告（建议修复）
    Warn,
    /// 错误（必须修复）
    Error,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 诊断条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    /// 资源名 / 文件路径
    pub asset: String,
    /// 行号（如果可定位，从 1 开始）
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    fn new(level: DiagnosticLevel, asset: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            asset: asset.into(),
            line: None,
            message: message.into(),
        }
    }

    pub fn error(asset: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, asset, message)
    }

    pub fn warn(asset: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warn, asset, message)
    }

    pub fn info(asset: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, asset, message)
    }

    /// 设置行号
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// 解析警告 → 诊断
    pub fn from_parse_error(asset: impl Into<String>, error: &ParseError) -> Self {
        Self::warn(asset, error.to_string()).with_line(error.line())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.asset)?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// 诊断结果
#[derive(Debug, Clone, Default)]
pub struct DiagnosticResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// 合并另一个结果
    pub fn merge(&mut self, other: DiagnosticResult) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn error_count(&self) -> usize {
        self.count(DiagnosticLevel::Error)
    }

    pub fn warn_count(&self) -> usize {
        self.count(DiagnosticLevel::Warn)
    }

    fn count(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics.iter().filter(|d| d.level == level).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// 按级别过滤
    pub fn filter_by_level(&self, min_level: DiagnosticLevel) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level >= min_level)
            .collect()
    }
}

impl fmt::Display for DiagnosticResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

//=============================================================================
// GAS 分析
//=============================================================================

/// 分析 GAS 脚本
///
/// - Error：GOTO / IF 的目标标签不存在
/// - Warn：动画引用未解析、重复标签、执行概率为 0 的节点
pub fn analyze_script(script: &AutoScript) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();
    let asset = script.name();
    let at = |index: usize, diag: Diagnostic| match script.line_of(index) {
        Some(line) => diag.with_line(line),
        None => diag,
    };

    let mut seen_labels: HashMap<String, usize> = HashMap::new();
    for (index, node) in script.nodes().iter().enumerate() {
        match &node.kind {
            GasNodeKind::Label { name } => {
                let key = name.to_ascii_lowercase();
                if let Some(first) = seen_labels.get(&key) {
                    let first_line = script.line_of(*first).unwrap_or(0);
                    result.push(at(
                        index,
                        Diagnostic::warn(
                            asset,
                            format!("重复的标签 '{name}'，跳转使用第 {first_line} 行的定义"),
                        ),
                    ));
                } else {
                    seen_labels.insert(key, index);
                }
            }
            GasNodeKind::Anim {
                name,
                animation: None,
                ..
            } => {
                result.push(at(index, Diagnostic::warn(asset, format!("动画 '{name}' 未找到"))));
            }
            GasNodeKind::OneOf { options } => {
                for option in options.iter().filter(|o| o.animation.is_none()) {
                    result.push(at(
                        index,
                        Diagnostic::warn(asset, format!("动画 '{}' 未找到", option.name)),
                    ));
                }
            }
            _ => {}
        }

        if let Some(label) = node.kind.jump_target() {
            if !label.is_empty() && script.find_label(label).is_none() {
                result.push(at(
                    index,
                    Diagnostic::error(asset, format!("未定义的跳转目标 '{label}'")),
                ));
            }
        }

        if node.chance == 0 {
            result.push(at(
                index,
                Diagnostic::warn(
                    asset,
                    format!("{} 的执行概率为 0，永远不会执行", node.kind.keyword()),
                ),
            ));
        }
    }

    result
}

/// 脚本中定义的所有标签（按出现顺序）
pub fn defined_labels(script: &AutoScript) -> Vec<&str> {
    script
        .nodes()
        .iter()
        .filter_map(|node| match &node.kind {
            GasNodeKind::Label { name } => Some(name.as_str()),
            _ => None,
        })
        .collect()
}

/// 脚本中引用的所有跳转目标（小写，不含空标签）
pub fn jump_targets(script: &AutoScript) -> HashSet<String> {
    script
        .nodes()
        .iter()
        .filter_map(|node| node.kind.jump_target())
        .filter(|label| !label.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

//=============================================================================
// ANM 分析
//=============================================================================

/// 分析时间轴
///
/// - Warn：事件帧号超出声明的帧数（永远不会触发）
/// - Warn：顶点动画 / 音频引用未解析
pub fn analyze_animation(animation: &Animation) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();
    let asset = animation.name();

    for (frame, nodes) in animation.frames() {
        for node in nodes {
            if frame > animation.frame_count() {
                result.push(Diagnostic::warn(
                    asset,
                    format!(
                        "第 {frame} 帧的 {} 事件超出帧数 {}，不会触发",
                        node.event.kind_name(),
                        animation.frame_count()
                    ),
                ));
            }
            if let Some(name) = node.event.unresolved_reference() {
                result.push(Diagnostic::warn(
                    asset,
                    format!("第 {frame} 帧的 {} 引用 '{name}' 未找到", node.event.kind_name()),
                ));
            }
        }
    }

    result
}
