//! # 键值项
//!
//! `IniKeyValue` 及其取值函数。取值失败返回 `None`，由调用方决定如何报告。

use glam::Vec3;

/// 单个键值项
///
/// 没有 `=` 的项（如 `hidden`、`walk01`、`3`）的 value 与 key 相同，
/// 这样取值函数对两种写法都适用。
#[derive(Debug, Clone, PartialEq)]
pub struct IniKeyValue {
    pub key: String,
    pub value: String,
}

impl IniKeyValue {
    /// 从单项文本构建
    pub fn parse(item: &str) -> Self {
        match item.split_once('=') {
            Some((key, value)) => Self {
                key: key.trim().to_string(),
                value: value.trim().to_string(),
            },
            None => {
                let item = item.trim();
                Self {
                    key: item.to_string(),
                    value: item.to_string(),
                }
            }
        }
    }

    /// 整数值；`"12.7"` 这样的写法截断为 12
    pub fn as_int(&self) -> Option<i32> {
        let v = self.value.trim();
        v.parse::<i32>()
            .ok()
            .or_else(|| v.parse::<f32>().ok().filter(|f| f.is_finite()).map(|f| f as i32))
    }

    /// 浮点值
    pub fn as_float(&self) -> Option<f32> {
        self.value.trim().parse::<f32>().ok()
    }

    /// 布尔值：on/true/yes/1 为真，其余一律为假
    pub fn as_bool(&self) -> bool {
        let v = self.value.trim();
        ["on", "true", "yes", "1"]
            .iter()
            .any(|t| v.eq_ignore_ascii_case(t))
    }

    /// `{x, y, z}` 形式的向量
    ///
    /// 容忍缺失的右花括号（部分资源存在这种笔误）。
    pub fn as_vec3(&self) -> Option<Vec3> {
        let v = self.value.trim();
        let v = v.strip_prefix('{').unwrap_or(v);
        let v = v.strip_suffix('}').unwrap_or(v);

        let mut parts = v.split(',').map(|p| p.trim().parse::<f32>());
        let x = parts.next()?.ok()?;
        let y = parts.next()?.ok()?;
        let z = parts.next()?.ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Vec3::new(x, y, z))
    }

    /// `r/g/b` 形式的颜色
    pub fn as_color(&self) -> Option<[u8; 3]> {
        let mut parts = self.value.trim().split('/').map(|p| p.trim().parse::<u8>());
        let r = parts.next()?.ok()?;
        let g = parts.next()?.ok()?;
        let b = parts.next()?.ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some([r, g, b])
    }
}
