//! # GAS 模块
//!
//! 角色自动脚本（GAS）：固定词汇的小型脚本，驱动角色的闲置行为。
//!
//! ## 模块结构
//!
//! - [`ast`]：节点定义与 [`AutoScript`]
//! - [`parser`]：GAS 文本 → [`AutoScript`]

pub mod ast;
pub mod parser;

#[cfg(test)]
mod tests;

pub use ast::*;
pub use parser::GasParser;

use crate::resolver::AssetResolver;

impl AutoScript {
    /// 解析 GAS 文本
    ///
    /// 解析警告会被记录到日志；需要逐条检查时使用 [`GasParser`]。
    pub fn parse(name: &str, text: &str, resolver: &dyn AssetResolver) -> Self {
        GasParser::new(resolver).parse(name, text)
    }
}
