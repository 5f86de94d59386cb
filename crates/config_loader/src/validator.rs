//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (frequency_hz, 阈值, 轮转上限) 由 `validator` derive 检查
//! - 浮点字段必须是有限值 (range 检查放行 NaN)
//! - replay 数据源必须提供 replay_path
//! - 输出模板必须带文件名
//! - 显式变量列表不能为空

use std::borrow::Cow;

use contracts::{ContractError, RecorderConfig, SourceKind};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// 校验 RecorderConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &RecorderConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_finite(config)?;
    validate_output(config)?;
    validate_variables(config)?;
    validate_source(config)?;
    Ok(())
}

/// 字段级约束
fn validate_fields(config: &RecorderConfig) -> Result<(), ContractError> {
    match config.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let (field, message) = first_violation(&errors, "")
                .unwrap_or_else(|| ("config".to_string(), errors.to_string()));
            Err(ContractError::config_validation(field, message))
        }
    }
}

/// 浮点字段必须是有限值
fn validate_finite(config: &RecorderConfig) -> Result<(), ContractError> {
    let fields = [
        ("recording.frequency_hz", Some(config.recording.frequency_hz)),
        ("debounce.check_interval_s", Some(config.debounce.check_interval_s)),
        ("rotation.max_file_size_mb", config.rotation.max_file_size_mb),
        ("rotation.max_duration_minutes", config.rotation.max_duration_minutes),
    ];

    for (field, value) in fields {
        if let Some(value) = value.filter(|v| !v.is_finite()) {
            return Err(ContractError::config_validation(
                field,
                format!("must be a finite number, got {value}"),
            ));
        }
    }
    Ok(())
}

/// 输出模板必须带文件名
fn validate_output(config: &RecorderConfig) -> Result<(), ContractError> {
    let output = &config.recording.output;
    let has_stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false);

    if !has_stem {
        return Err(ContractError::config_validation(
            "recording.output",
            format!("output template '{}' has no file name", output.display()),
        ));
    }
    Ok(())
}

/// 显式变量列表不能为空
fn validate_variables(config: &RecorderConfig) -> Result<(), ContractError> {
    if let Some(variables) = &config.recording.variables {
        if variables.iter().all(|v| v.trim().is_empty()) {
            return Err(ContractError::config_validation(
                "recording.variables",
                "variables list cannot be empty; omit it to use the variables file",
            ));
        }
    }
    Ok(())
}

/// replay 数据源必须提供 replay_path
fn validate_source(config: &RecorderConfig) -> Result<(), ContractError> {
    if config.source.kind == SourceKind::Replay && config.source.replay_path.is_none() {
        return Err(ContractError::config_validation(
            "source.replay_path",
            "replay source requires replay_path",
        ));
    }
    Ok(())
}

/// 取第一个违规字段 (按字段名排序，保证输出稳定)
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut entries: Vec<_> = errors.errors().iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in entries {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    return Some((path, describe(err)));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_violation(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_violation(inner, &format!("{path}[{idx}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

fn describe(err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }

    let mut bounds: Vec<String> = err
        .params
        .iter()
        .filter(|(k, _)| &***k != "value")
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    bounds.sort();

    let got = err
        .params
        .get(&Cow::Borrowed("value"))
        .map(|v| format!(", got {v}"))
        .unwrap_or_default();

    format!("{} check failed ({}){}", err.code, bounds.join(", "), got)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn minimal_config() -> RecorderConfig {
        RecorderConfig::default()
    }

    #[test]
    fn test_valid_config() {
        let config = minimal_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_frequency() {
        let mut config = minimal_config();
        config.recording.frequency_hz = -5.0;
        let result = validate(&config);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("recording.frequency_hz"), "got: {err}");
    }

    #[test]
    fn test_frequency_upper_bound() {
        let mut config = minimal_config();
        config.recording.frequency_hz = 5000.0;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("frequency_hz"), "got: {err}");
    }

    #[test]
    fn test_subnormal_frequency_rejected() {
        let mut config = minimal_config();
        config.recording.frequency_hz = 1e-310;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("recording.frequency_hz"), "got: {err}");
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let mut config = minimal_config();
        config.rotation.max_duration_minutes = Some(f64::NAN);
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("rotation.max_duration_minutes"), "got: {err}");

        let mut config = minimal_config();
        config.debounce.check_interval_s = f64::NAN;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("debounce.check_interval_s"), "got: {err}");
    }

    #[test]
    fn test_oversized_duration_limit_rejected() {
        let mut config = minimal_config();
        config.rotation.max_duration_minutes = Some(1e30);
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("rotation.max_duration_minutes"), "got: {err}");

        config.rotation.max_duration_minutes = Some(f64::INFINITY);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let mut config = minimal_config();
        config.debounce.start_threshold = 0;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("debounce.start_threshold"), "got: {err}");
    }

    #[test]
    fn test_negative_rotation_limit_rejected() {
        let mut config = minimal_config();
        config.rotation.max_file_size_mb = Some(-1.0);
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("rotation.max_file_size_mb"), "got: {err}");
    }

    #[test]
    fn test_zero_rotation_limit_allowed() {
        let mut config = minimal_config();
        config.rotation.max_duration_minutes = Some(0.0);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_output_without_file_name() {
        let mut config = minimal_config();
        config.recording.output = PathBuf::from("/");
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("has no file name"), "got: {err}");
    }

    #[test]
    fn test_empty_variable_list() {
        let mut config = minimal_config();
        config.recording.variables = Some(vec![" ".into()]);
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_replay_requires_path() {
        let mut config = minimal_config();
        config.source.kind = SourceKind::Replay;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("replay_path"), "got: {err}");

        config.source.replay_path = Some(PathBuf::from("old.csv"));
        assert!(validate(&config).is_ok());
    }
}
