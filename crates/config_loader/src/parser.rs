//! 录制配置解析
//!
//! `recorder.toml` (或等价的 JSON) 包含五个可选段：`[robot]`、`[recording]`、
//! `[rotation]`、`[debounce]`、`[source]`。缺失的段和字段取默认值，
//! 因此空文件也是合法配置；范围检查在 `validator` 中完成。

use contracts::{ContractError, RecorderConfig};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `recorder.toml`
    Toml,
    /// `recorder.json`
    Json,
}

impl ConfigFormat {
    /// 由扩展名推断格式 (忽略大小写)
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

/// 解析 TOML 格式的录制配置
pub fn parse_toml(content: &str) -> Result<RecorderConfig, ContractError> {
    toml::from_str(content).map_err(|e| parse_error(ConfigFormat::Toml, e))
}

/// 解析 JSON 格式的录制配置
pub fn parse_json(content: &str) -> Result<RecorderConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| parse_error(ConfigFormat::Json, e))
}

/// 按格式分派
pub fn parse(content: &str, format: ConfigFormat) -> Result<RecorderConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

fn parse_error<E>(format: ConfigFormat, e: E) -> ContractError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ContractError::ConfigParse {
        message: format!("invalid recorder config ({}): {e}", format.label()),
        source: Some(Box::new(e)),
    }
}
