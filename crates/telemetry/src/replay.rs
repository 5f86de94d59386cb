//! 回放遥测源
//!
//! 从已录制的 CSV 段文件回放数据。
//!
//! 列名规则：
//! - 标量变量：列名即变量名
//! - 向量变量：`name_0 .. name_{N-1}`，N 必须等于目录中的 arity
//!
//! 有剩余行时报告 PLAYING，回放完毕后报告 STOPPED 并保持最后一行的值。
//! 只有被读取过的周期才会前进到下一行，因此防抖期间不会丢行。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use contracts::{
    lookup, Arity, ContractError, FetchError, PeriodMarker, RuntimeState, TelemetrySource,
    VariableValue, TIMESTAMP_VARIABLE,
};
use tracing::{debug, info, warn};

use crate::period::PeriodClock;

/// 回放遥测源
pub struct ReplaySource {
    name: String,
    path: PathBuf,
    clock: PeriodClock,
    /// 变量 -> 列下标
    columns: HashMap<String, Vec<usize>>,
    rows: Vec<Vec<f64>>,
    /// 第一行的时间戳 (用于归零)
    first_timestamp: Option<f64>,
    cursor: usize,
    fetched_this_period: bool,
}

impl ReplaySource {
    /// 加载回放文件
    ///
    /// # Errors
    /// - 文件读取失败
    /// - 表头或数据行格式错误
    pub fn load(path: &Path, frequency_hz: f64) -> Result<Self, ContractError> {
        let content = std::fs::read_to_string(path)?;
        let mut lines = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header) = lines
            .next()
            .ok_or_else(|| format_error(path, "file has no header"))?;
        let header: Vec<&str> = header.split(',').map(str::trim).collect();
        let columns = group_columns(path, &header)?;

        let mut rows = Vec::new();
        for (idx, line) in lines {
            rows.push(parse_row(path, idx + 1, line, header.len())?);
        }

        let first_timestamp = columns
            .get(TIMESTAMP_VARIABLE)
            .and_then(|cols| rows.first().map(|row| row[cols[0]]));

        if rows.is_empty() {
            warn!(path = %path.display(), "Replay file has no data rows");
        }

        info!(
            path = %path.display(),
            rows = rows.len(),
            variables = columns.len(),
            "Loaded replay source"
        );

        Ok(Self {
            name: format!("replay://{}", path.display()),
            path: path.to_path_buf(),
            clock: PeriodClock::new(frequency_hz),
            columns,
            rows,
            first_timestamp,
            cursor: 0,
            fetched_this_period: false,
        })
    }

    /// 回放文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 数据行总数
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 是否没有数据行
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 尚未回放的行数
    pub fn remaining(&self) -> usize {
        self.rows.len().saturating_sub(self.cursor)
    }

    /// 文件中出现的变量 (按字母序)
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.columns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn current_row(&self) -> Option<&Vec<f64>> {
        let last = self.rows.len().checked_sub(1)?;
        self.rows.get(self.cursor.min(last))
    }

    fn rebased_timestamp(&self) -> Option<f64> {
        let cols = self.columns.get(TIMESTAMP_VARIABLE)?;
        let row = self.current_row()?;
        Some(row[cols[0]] - self.first_timestamp.unwrap_or(0.0))
    }
}

impl TelemetrySource for ReplaySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init_period(&mut self) -> Result<PeriodMarker, ContractError> {
        Ok(self.clock.begin())
    }

    async fn wait_period(&mut self, marker: PeriodMarker) -> Result<(), ContractError> {
        if std::mem::take(&mut self.fetched_this_period) && self.cursor < self.rows.len() {
            self.cursor += 1;
            if self.cursor == self.rows.len() {
                info!(rows = self.rows.len(), "Replay completed");
            }
        }
        self.clock.finish(&self.name, marker).await
    }

    fn runtime_state(&mut self) -> Result<RuntimeState, FetchError> {
        if self.cursor < self.rows.len() {
            Ok(RuntimeState::Playing)
        } else {
            Ok(RuntimeState::Stopped)
        }
    }

    fn timestamp(&mut self) -> Result<f64, FetchError> {
        Ok(self
            .rebased_timestamp()
            .unwrap_or_else(|| self.cursor as f64 * self.clock.period().as_secs_f64()))
    }

    fn fetch(&mut self, variable: &str) -> Result<VariableValue, FetchError> {
        self.fetched_this_period = true;

        if variable == TIMESTAMP_VARIABLE {
            return self.timestamp().map(VariableValue::Scalar);
        }

        let cols = self
            .columns
            .get(variable)
            .ok_or_else(|| FetchError::UnknownVariable(variable.to_string()))?;
        let row = self
            .current_row()
            .ok_or_else(|| FetchError::unavailable(variable, "replay has no rows"))?;

        let value = match cols.as_slice() {
            [single] => VariableValue::Scalar(row[*single]),
            many => VariableValue::Vector(many.iter().map(|c| row[*c]).collect()),
        };
        Ok(value)
    }
}

fn format_error(path: &Path, message: impl Into<String>) -> ContractError {
    ContractError::ReplayFormat {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

/// 表头分组：`name_i` 归入向量变量 `name`，其余列视为标量
fn group_columns(
    path: &Path,
    header: &[&str],
) -> Result<HashMap<String, Vec<usize>>, ContractError> {
    let mut columns: HashMap<String, Vec<usize>> = HashMap::new();

    for (idx, column) in header.iter().copied().enumerate() {
        if column.is_empty() {
            return Err(format_error(path, format!("column {} has no name", idx + 1)));
        }
        let name = match vector_member(column) {
            Some(base) => base,
            None => column,
        };
        columns.entry(name.to_string()).or_default().push(idx);
    }

    for (name, cols) in &columns {
        let expected = lookup(name).map(|e| e.arity).unwrap_or(Arity::One).width();
        if cols.len() != expected {
            return Err(format_error(
                path,
                format!(
                    "variable '{name}' has {} columns, catalog expects {expected}",
                    cols.len()
                ),
            ));
        }
    }

    debug!(columns = header.len(), variables = columns.len(), "Grouped replay header");
    Ok(columns)
}

/// `actual_q_3` -> `actual_q` when `actual_q` is a catalog vector
fn vector_member(column: &str) -> Option<&str> {
    let (base, index) = column.rsplit_once('_')?;
    index.parse::<usize>().ok()?;
    let entry = lookup(base)?;
    (entry.arity != Arity::One).then_some(base)
}

fn parse_row(
    path: &Path,
    line_no: usize,
    line: &str,
    width: usize,
) -> Result<Vec<f64>, ContractError> {
    let cells: Vec<&str> = line.split(',').map(str::trim).collect();
    if cells.len() != width {
        return Err(format_error(
            path,
            format!("line {line_no}: {} cells, header has {width}", cells.len()),
        ));
    }

    cells
        .iter()
        .map(|cell| {
            cell.parse::<f64>().map_err(|e| {
                format_error(path, format!("line {line_no}: invalid number '{cell}': {e}"))
            })
        })
        .collect()
}
