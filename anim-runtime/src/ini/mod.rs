//! # INI 模块
//!
//! 区段式文本读取器：把原始文本切分为 区段 → 行 → 键值项。
//!
//! ## 格式
//!
//! ```text
//! // 注释行
//! [Header]
//! 5
//! [Actions=SomeCondition]
//! 2
//! 3, walk01, pos={1, 2, 3}, hidden
//! ```
//!
//! - 区段头 `[Name]` 或 `[Name=condition]`（大小写由使用方决定，condition 目前保留未用）
//! - `//` 开头的行是注释；行内 `//` 之后的内容也被丢弃
//! - 一行可包含多个以逗号分隔的项，`{}` 内的逗号不作为分隔符
//! - 每项为 `key=value` 或仅 `key`（此时 value 与 key 相同）

mod value;

pub use value::IniKeyValue;

/// 一行数据
#[derive(Debug, Clone, PartialEq)]
pub struct IniLine {
    /// 行内各项
    pub entries: Vec<IniKeyValue>,
    /// 源文本行号（从 1 开始）
    pub line_number: usize,
}

impl IniLine {
    /// 项数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按索引取项
    pub fn get(&self, index: usize) -> Option<&IniKeyValue> {
        self.entries.get(index)
    }
}

/// 一个区段
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IniSection {
    /// 区段名（不含方括号；文件开头无区段头的内容为空字符串）
    pub name: String,
    /// 条件（`[Name=condition]` 中 `=` 之后的部分）
    pub condition: Option<String>,
    /// 数据行
    pub lines: Vec<IniLine>,
    /// 区段头所在行号（无区段头时为 0）
    pub line_number: usize,
}

impl IniSection {
    /// 区段名是否匹配（大小写不敏感）
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// 解析整段文本为区段列表
pub fn parse_sections(text: &str) -> Vec<IniSection> {
    let mut sections = Vec::new();
    let mut current = IniSection::default();

    for (line_number, line) in logical_lines(text) {
        if let Some((name, condition)) = parse_header(&line) {
            if !current.name.is_empty() || !current.lines.is_empty() {
                sections.push(std::mem::take(&mut current));
            }
            current.name = name;
            current.condition = condition;
            current.line_number = line_number;
            continue;
        }

        let entries = split_entries(&line)
            .into_iter()
            .map(|item| IniKeyValue::parse(&item))
            .collect();
        current.lines.push(IniLine {
            entries,
            line_number,
        });
    }

    if !current.name.is_empty() || !current.lines.is_empty() {
        sections.push(current);
    }

    sections
}

/// 逐行预处理：去掉注释，制表符视为空格，去首尾空白并跳过空行
///
/// 返回 (行号, 内容)，行号从 1 开始。
pub fn logical_lines(text: &str) -> impl Iterator<Item = (usize, String)> + '_ {
    text.lines().enumerate().filter_map(|(idx, raw)| {
        let line = strip_comment(raw).replace('\t', " ").trim().to_string();
        (!line.is_empty()).then_some((idx + 1, line))
    })
}

/// 识别区段头，返回 (name, condition)
fn parse_header(line: &str) -> Option<(String, Option<String>)> {
    if line.len() <= 2 || !line.starts_with('[') {
        return None;
    }
    let end = line[1..].find(']')? + 1;
    let inner = line[1..end].trim();

    match inner.split_once('=') {
        Some((name, condition)) => Some((
            name.trim().to_string(),
            Some(condition.trim().to_string()),
        )),
        None => Some((inner.to_string(), None)),
    }
}

/// 丢弃 `//` 之后的内容
fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// 按逗号切分一行（忽略 `{}` 内的逗号）
///
/// 空项被丢弃：`a,,b` 得到 `["a", "b"]`。
pub fn split_entries(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;

    for ch in line.chars() {
        match ch {
            '{' => {
                depth += 1;
                current.push(ch);
            }
            '}' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth <= 0 => {
                push_trimmed(&mut result, &current);
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    push_trimmed(&mut result, &current);

    result
}

fn push_trimmed(out: &mut Vec<String>, item: &str) {
    let item = item.trim();
    if !item.is_empty() {
        out.push(item.to_string());
    }
}
