//! # Error 模块
//!
//! 定义 anim-runtime 中使用的错误类型。
//!
//! 文本资源（ANM / GAS）的解析错误都是**可恢复**的：解析器记录错误并跳过该行，
//! 不会中断整个资源的加载。只有 ACT 二进制流的解码错误会让单个资源加载失败。

use thiserror::Error;

/// 解析错误（逐行，可恢复）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// 字段数量不符合该区段的语法
    #[error("[{section}] 第 {line} 行：字段数量 {found} 无效，期望 {expected}")]
    FieldCount {
        section: String,
        line: usize,
        found: usize,
        expected: String,
    },

    /// 字段值无效
    #[error("[{section}] 第 {line} 行：字段 '{field}' 的值无效 - {message}")]
    InvalidField {
        section: String,
        line: usize,
        field: String,
        message: String,
    },

    /// 未知区段
    #[error("第 {line} 行：未知区段 '{section}'")]
    UnknownSection { section: String, line: usize },

    /// 未知关键字
    #[error("[{section}] 第 {line} 行：未知关键字 '{keyword}'")]
    UnknownKeyword {
        section: String,
        line: usize,
        keyword: String,
    },
}

impl ParseError {
    /// 出错的行号（从 1 开始）
    pub fn line(&self) -> usize {
        match self {
            Self::FieldCount { line, .. }
            | Self::InvalidField { line, .. }
            | Self::UnknownSection { line, .. }
            | Self::UnknownKeyword { line, .. } => *line,
        }
    }
}

/// ACT 关键帧流解码错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActError {
    /// 文件头标识不匹配
    #[error("无效的 ACT 标识: {found:?}")]
    BadMagic { found: [u8; 4] },

    /// 数据提前结束
    #[error("ACT 数据在偏移 {offset} 处截断，需要 {needed} 字节")]
    Truncated { offset: usize, needed: usize },

    /// 帧偏移越界
    #[error("第 {frame} 帧的偏移 {offset} 超出数据长度 {len}")]
    FrameOffset {
        frame: usize,
        offset: usize,
        len: usize,
    },

    /// 顶点数量与之前的关键帧不一致
    #[error("网格 {mesh}/{submesh} 的顶点数量从 {expected} 变为 {found}")]
    VertexCountMismatch {
        mesh: u32,
        submesh: u16,
        expected: usize,
        found: usize,
    },
}

/// 运行时错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// 输入与当前等待状态不匹配
    #[error("当前状态不允许此操作：期望 {expected}，实际 {actual}")]
    StateMismatch { expected: String, actual: String },

    /// 脚本已执行完毕
    #[error("脚本已执行完毕")]
    ScriptEnded,
}

/// anim-runtime 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimError {
    /// 关键帧解码错误
    #[error("关键帧解码错误: {0}")]
    Act(#[from] ActError),

    /// 运行时错误
    #[error("运行时错误: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Result 类型别名
pub type AnimResult<T> = Result<T, AnimError>;
