//! # Config 模块
//!
//! 运行时配置。所有字段都有默认值，配置文件只需写出要覆盖的项。
//!
//! ```json
//! { "default_frame_rate": 15, "seed": 42 }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置文件解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("配置无效: {0}")]
    Invalid(String),
}

/// 运行时配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// ANM 时间轴默认帧率（帧/秒）
    #[serde(default = "default_frame_rate")]
    pub default_frame_rate: u32,

    /// ACT 顶点动画采样帧率（帧/秒）
    #[serde(default = "default_frame_rate")]
    pub vertex_frame_rate: u32,

    /// 是否采用 ANM `[OPTIONS]` 中的 FRAMERATE
    #[serde(default = "default_true")]
    pub honor_frame_rate_option: bool,

    /// GAS 单次 tick 最多求值的节点数，超过后让出到下一个 tick
    #[serde(default = "default_max_nodes_per_tick")]
    pub max_nodes_per_tick: usize,

    /// 随机数种子；为 `None` 时使用系统熵
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_frame_rate() -> u32 {
    15
}

fn default_true() -> bool {
    true
}

fn default_max_nodes_per_tick() -> usize {
    256
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_frame_rate: default_frame_rate(),
            vertex_frame_rate: default_frame_rate(),
            honor_frame_rate_option: true,
            max_nodes_per_tick: default_max_nodes_per_tick(),
            seed: None,
        }
    }
}

impl RuntimeConfig {
    /// 从 JSON 文本解析并校验
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载
    ///
    /// 文件不存在时返回默认配置；存在但内容无效时返回错误。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        debug!(path = %path.display(), "配置文件加载成功");
        Ok(config)
    }

    /// 校验配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_frame_rate == 0 {
            return Err(ConfigError::Invalid("default_frame_rate 必须大于 0".to_string()));
        }
        if self.vertex_frame_rate == 0 {
            return Err(ConfigError::Invalid("vertex_frame_rate 必须大于 0".to_string()));
        }
        if self.max_nodes_per_tick == 0 {
            return Err(ConfigError::Invalid("max_nodes_per_tick 必须大于 0".to_string()));
        }
        Ok(())
    }
}
