//! # GAS 解析器
//!
//! 一行一条命令，`//` 注释。参数以空白或逗号分隔（`{}` 内除外），关键字大小写不敏感。
//!
//! ```text
//! ANIM <anim> [MOVING]
//! ONEOF <anim>[=weight] <anim>[=weight] ...
//! WAIT <seconds> | WAIT <min> <max>
//! LABEL <name>
//! GOTO [<name>] | LOOP
//! SET <var> <int>
//! INC <var> [amount] | DEC <var> [amount]
//! IF <var> <op> <int> <label>
//! WALKTO <name> | WALKTO {x,y,z}
//! CHOOSEWALK <target>[=weight] ...
//! USEIPOS <name>
//! ```
//!
//! 任意位置的 `random=N`（或 `chance=N`）设置该节点的执行概率。
//! 无效行记录警告并跳过。

use tracing::{debug, warn};

use crate::error::ParseError;
use crate::ini::{IniKeyValue, logical_lines};
use crate::resolver::AssetResolver;
use crate::timeline::ALWAYS;

use super::ast::{
    AnimOption, AutoScript, CompareOp, GasNode, GasNodeKind, Variable, WalkOption, WalkTarget,
};

/// 按空白或逗号切分（忽略 `{}` 内的分隔符）
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
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
            c if depth <= 0 && (c == ',' || c.is_whitespace()) => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// 当前行的上下文（错误信息用）
struct LineCtx<'t> {
    keyword: String,
    line: usize,
    args: &'t [String],
}

/// GAS 解析器
pub struct GasParser<'a> {
    resolver: &'a dyn AssetResolver,
    asset: String,
    warnings: Vec<ParseError>,
}

impl<'a> GasParser<'a> {
    pub fn new(resolver: &'a dyn AssetResolver) -> Self {
        Self {
            resolver,
            asset: String::new(),
            warnings: Vec::new(),
        }
    }

    /// 解析 GAS 文本
    pub fn parse(&mut self, name: &str, text: &str) -> AutoScript {
        self.warnings.clear();
        self.asset = name.to_string();

        let mut nodes = Vec::new();
        let mut source_map = Vec::new();
        for (line_number, line) in logical_lines(text) {
            if let Some(node) = self.parse_line(line_number, &line) {
                nodes.push(node);
                source_map.push(line_number);
            }
        }

        debug!(
            asset = %self.asset,
            nodes = nodes.len(),
            warnings = self.warnings.len(),
            "GAS 解析完成"
        );
        AutoScript::with_source_map(name, nodes, source_map)
    }

    /// 获取解析过程中的警告
    pub fn warnings(&self) -> &[ParseError] {
        &self.warnings
    }

    fn warn(&mut self, error: ParseError) {
        warn!(asset = %self.asset, "{error}");
        self.warnings.push(error);
    }

    fn parse_line(&mut self, line: usize, text: &str) -> Option<GasNode> {
        let mut tokens = tokenize(text);
        let chance = self.take_chance(line, &mut tokens)?;
        let (keyword, args) = tokens.split_first()?;

        let ctx = LineCtx {
            keyword: keyword.to_ascii_uppercase(),
            line,
            args,
        };
        let kind = match ctx.keyword.as_str() {
            "ANIM" => self.parse_anim(&ctx)?,
            "ONEOF" => self.parse_one_of(&ctx)?,
            "WAIT" => self.parse_wait(&ctx)?,
            "LABEL" => GasNodeKind::Label {
                name: self.arg(&ctx, 0, "1")?.to_string(),
            },
            "GOTO" => GasNodeKind::Goto {
                label: args.first().cloned().unwrap_or_default(),
            },
            "LOOP" => GasNodeKind::Goto {
                label: String::new(),
            },
            "SET" => GasNodeKind::Set {
                var: self.variable(&ctx, 0)?,
                value: self.int(&ctx, 1, "value")?,
            },
            "INC" | "DEC" => self.parse_add(&ctx)?,
            "IF" => self.parse_if(&ctx)?,
            "WALKTO" => {
                let raw = self.arg(&ctx, 0, "1")?;
                GasNodeKind::WalkTo {
                    target: self.walk_target(&ctx, raw)?,
                }
            }
            "CHOOSEWALK" => self.parse_choose_walk(&ctx)?,
            "USEIPOS" => GasNodeKind::UseIPos {
                name: self.arg(&ctx, 0, "1")?.to_string(),
            },
            _ => {
                self.warn(ParseError::UnknownKeyword {
                    section: "GAS".to_string(),
                    line,
                    keyword: keyword.clone(),
                });
                return None;
            }
        };

        Some(GasNode::new(kind).with_chance(chance))
    }

    /// 取出并移除 `random=N` / `chance=N`
    fn take_chance(&mut self, line: usize, tokens: &mut Vec<String>) -> Option<u8> {
        let mut chance = ALWAYS;
        let mut valid = true;
        tokens.retain(|token| {
            let kv = IniKeyValue::parse(token);
            if token.contains('=')
                && (kv.key.eq_ignore_ascii_case("random") || kv.key.eq_ignore_ascii_case("chance"))
            {
                match kv.as_int() {
                    Some(v) => chance = v.clamp(0, i32::from(ALWAYS)) as u8,
                    None => valid = false,
                }
                return false;
            }
            true
        });

        if !valid {
            self.warn(ParseError::InvalidField {
                section: "GAS".to_string(),
                line,
                field: "random".to_string(),
                message: "应为 0–100 的整数".to_string(),
            });
            return None;
        }
        Some(chance)
    }

    fn parse_anim(&mut self, ctx: &LineCtx<'_>) -> Option<GasNodeKind> {
        let name = self.arg(ctx, 0, "至少 1")?.to_string();
        let moving = ctx.args[1..]
            .iter()
            .any(|a| a.eq_ignore_ascii_case("MOVING"));
        let animation = self.resolver.animation(&name);
        if animation.is_none() {
            debug!(asset = %self.asset, name = %name, "时间轴动画未找到");
        }
        Some(GasNodeKind::Anim {
            name,
            animation,
            moving,
        })
    }

    fn parse_one_of(&mut self, ctx: &LineCtx<'_>) -> Option<GasNodeKind> {
        self.arg(ctx, 0, "至少 1")?;
        let mut options = Vec::with_capacity(ctx.args.len());
        for arg in ctx.args {
            let (name, weight) = self.weighted(ctx, arg)?;
            let animation = self.resolver.animation(&name);
            if animation.is_none() {
                debug!(asset = %self.asset, name = %name, "时间轴动画未找到");
            }
            options.push(AnimOption {
                name,
                animation,
                weight,
            });
        }
        Some(GasNodeKind::OneOf { options })
    }

    fn parse_wait(&mut self, ctx: &LineCtx<'_>) -> Option<GasNodeKind> {
        let min = self.seconds(ctx, 0)?;
        let max = if ctx.args.len() >= 2 {
            self.seconds(ctx, 1)?
        } else {
            min
        };

        if max < min {
            self.invalid(ctx, "max", "上限小于下限，已交换");
            return Some(GasNodeKind::Wait {
                min_seconds: max,
                max_seconds: min,
            });
        }
        Some(GasNodeKind::Wait {
            min_seconds: min,
            max_seconds: max,
        })
    }

    fn parse_add(&mut self, ctx: &LineCtx<'_>) -> Option<GasNodeKind> {
        let var = self.variable(ctx, 0)?;
        let amount = if ctx.args.len() >= 2 {
            self.int(ctx, 1, "amount")?
        } else {
            1
        };
        let delta = if ctx.keyword == "DEC" { -amount } else { amount };
        Some(GasNodeKind::Add { var, delta })
    }

    fn parse_if(&mut self, ctx: &LineCtx<'_>) -> Option<GasNodeKind> {
        if ctx.args.len() < 4 {
            self.field_count(ctx, "4");
            return None;
        }
        let var = self.variable(ctx, 0)?;
        let Some(op) = CompareOp::from_symbol(&ctx.args[1]) else {
            self.invalid(ctx, "op", "应为 = == != <> < > <= >= 之一");
            return None;
        };
        let value = self.int(ctx, 2, "value")?;
        Some(GasNodeKind::If {
            var,
            op,
            value,
            label: ctx.args[3].clone(),
        })
    }

    fn parse_choose_walk(&mut self, ctx: &LineCtx<'_>) -> Option<GasNodeKind> {
        self.arg(ctx, 0, "至少 1")?;
        let mut targets = Vec::with_capacity(ctx.args.len());
        for arg in ctx.args {
            let (target, weight) = self.weighted(ctx, arg)?;
            let target = self.walk_target(ctx, &target)?;
            targets.push(WalkOption { target, weight });
        }
        Some(GasNodeKind::ChooseWalk { targets })
    }

    // ========== 参数辅助 ==========

    fn arg<'t>(&mut self, ctx: &LineCtx<'t>, index: usize, expected: &str) -> Option<&'t str> {
        match ctx.args.get(index) {
            Some(arg) => Some(arg.as_str()),
            None => {
                self.field_count(ctx, expected);
                None
            }
        }
    }

    fn int(&mut self, ctx: &LineCtx<'_>, index: usize, field: &str) -> Option<i32> {
        let raw = self.arg(ctx, index, &(index + 1).to_string())?;
        let value = raw.parse::<i32>().ok();
        if value.is_none() {
            self.invalid(ctx, field, "应为整数");
        }
        value
    }

    fn seconds(&mut self, ctx: &LineCtx<'_>, index: usize) -> Option<f32> {
        let raw = self.arg(ctx, index, "1 或 2")?;
        match raw.parse::<f32>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
            _ => {
                self.invalid(ctx, "seconds", "应为非负数");
                None
            }
        }
    }

    fn variable(&mut self, ctx: &LineCtx<'_>, index: usize) -> Option<Variable> {
        let raw = self.arg(ctx, index, &(index + 1).to_string())?;
        let var = Variable::from_name(raw);
        if var.is_none() {
            self.invalid(ctx, "var", "变量名应为 A–Z 的单个字母");
        }
        var
    }

    /// `name` 或 `name=weight`
    fn weighted(&mut self, ctx: &LineCtx<'_>, arg: &str) -> Option<(String, u32)> {
        // `{x,y,z}` 内不会出现 `=`，按最后一个 `=` 切分即可
        match arg.rsplit_once('=') {
            None => Some((arg.to_string(), 1)),
            Some((name, weight)) => match weight.trim().parse::<u32>() {
                Ok(weight) => Some((name.trim().to_string(), weight)),
                Err(_) => {
                    self.invalid(ctx, "weight", "权重应为非负整数");
                    None
                }
            },
        }
    }

    fn walk_target(&mut self, ctx: &LineCtx<'_>, raw: &str) -> Option<WalkTarget> {
        if !raw.starts_with('{') {
            return Some(WalkTarget::Named(raw.to_string()));
        }
        match IniKeyValue::parse(raw).as_vec3() {
            Some(position) => Some(WalkTarget::Position(position)),
            None => {
                self.invalid(ctx, "target", "坐标应为 {x, y, z}");
                None
            }
        }
    }

    fn field_count(&mut self, ctx: &LineCtx<'_>, expected: &str) {
        self.warn(ParseError::FieldCount {
            section: ctx.keyword.clone(),
            line: ctx.line,
            found: ctx.args.len(),
            expected: expected.to_string(),
        });
    }

    fn invalid(&mut self, ctx: &LineCtx<'_>, field: &str, message: &str) {
        self.warn(ParseError::InvalidField {
            section: ctx.keyword.clone(),
            line: ctx.line,
            field: field.to_string(),
            message: message.to_string(),
        });
    }
}
