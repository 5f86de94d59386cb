//! Scripted 遥测源
//!
//! 用于单元测试的确定性实现，支持注入失败场景：
//! 按调用序号给出 runtime state，按周期注入读取失败、链路断开和设备时钟重启。

use std::collections::HashSet;

use contracts::{
    lookup, ContractError, FetchError, PeriodMarker, RuntimeState, TelemetrySource,
    VariableValue, TIMESTAMP_VARIABLE,
};
use tracing::{debug, instrument};

use crate::period::PeriodClock;

/// Scripted 源配置
#[derive(Debug, Clone)]
pub struct ScriptedConfig {
    /// 采样频率 (Hz)
    pub frequency_hz: f64,
    /// 每次 `runtime_state` 调用返回的状态，用完后重复最后一个
    pub states: Vec<RuntimeState>,
    /// 应该失败的 `runtime_state` 调用序号 (从 0 开始)
    pub fail_state_reads: Vec<u64>,
    /// 应该失败的 (周期, 变量) 读取
    pub fail_fetches: Vec<(u64, String)>,
    /// 返回错误宽度的变量
    pub truncated_variables: Vec<String>,
    /// 第 0 个周期的设备时钟 (秒)
    pub clock_origin: f64,
    /// 进入 PLAYING 时设备时钟从 0 重新开始
    pub restart_clock_on_play: bool,
    /// 在该周期 `init_period` 返回链路错误
    pub link_failure_at: Option<u64>,
}

impl Default for ScriptedConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 100.0,
            states: Vec::new(),
            fail_state_reads: Vec::new(),
            fail_fetches: Vec::new(),
            truncated_variables: Vec::new(),
            clock_origin: 0.0,
            restart_clock_on_play: false,
            link_failure_at: None,
        }
    }
}

impl ScriptedConfig {
    /// 状态脚本: 每个 (状态, 次数) 依次展开
    pub fn with_states(mut self, script: &[(RuntimeState, usize)]) -> Self {
        self.states = script
            .iter()
            .flat_map(|(state, count)| std::iter::repeat(*state).take(*count))
            .collect();
        self
    }
}

/// Scripted 遥测源
pub struct ScriptedSource {
    /// 配置（可注入失败场景）
    config: ScriptedConfig,
    /// 周期时钟
    clock: PeriodClock,
    /// `runtime_state` 调用次数
    state_reads: u64,
    /// 变量读取次数
    fetches: u64,
    /// 最近一次成功返回的状态
    last_state: Option<RuntimeState>,
    /// 设备时钟基准 (周期, 起点秒数)
    clock_base: (u64, f64),
    fail_fetches: HashSet<(u64, String)>,
}

impl ScriptedSource {
    /// 使用配置创建 scripted 源
    pub fn new(config: ScriptedConfig) -> Self {
        let clock = PeriodClock::new(config.frequency_hz);
        let fail_fetches = config.fail_fetches.iter().cloned().collect();
        let clock_base = (0, config.clock_origin);
        Self {
            config,
            clock,
            state_reads: 0,
            fetches: 0,
            last_state: None,
            clock_base,
            fail_fetches,
        }
    }

    /// 获取 `runtime_state` 调用次数
    pub fn state_reads(&self) -> u64 {
        self.state_reads
    }

    /// 获取变量读取次数
    pub fn fetches(&self) -> u64 {
        self.fetches
    }

    /// 获取已完成的周期数
    pub fn ticks(&self) -> u64 {
        self.clock.tick()
    }

    fn device_clock(&self) -> f64 {
        let (base_tick, origin) = self.clock_base;
        let dt = self.clock.period().as_secs_f64();
        origin + (self.clock.tick() - base_tick) as f64 * dt
    }

    fn scripted_state(&self, call: u64) -> RuntimeState {
        let idx = usize::try_from(call).unwrap_or(usize::MAX);
        self.config
            .states
            .get(idx)
            .or(self.config.states.last())
            .copied()
            .unwrap_or(RuntimeState::Stopped)
    }

    fn value_for(&self, variable: &str) -> Result<VariableValue, FetchError> {
        if variable == TIMESTAMP_VARIABLE {
            return Ok(VariableValue::Scalar(self.device_clock()));
        }

        let entry =
            lookup(variable).ok_or_else(|| FetchError::UnknownVariable(variable.to_string()))?;
        let mut width = entry.arity.width();
        if self.config.truncated_variables.iter().any(|v| v == variable) {
            width = width.saturating_sub(1).max(2);
        }

        let tick = self.clock.tick() as f64;
        Ok(match width {
            1 => VariableValue::Scalar(tick),
            n => VariableValue::Vector((0..n).map(|i| tick + i as f64 / 10.0).collect()),
        })
    }
}

impl TelemetrySource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn init_period(&mut self) -> Result<PeriodMarker, ContractError> {
        if self.config.link_failure_at == Some(self.clock.tick()) {
            return Err(ContractError::telemetry_link(
                self.name(),
                format!("scripted link failure at period {}", self.clock.tick()),
            ));
        }
        Ok(self.clock.begin())
    }

    async fn wait_period(&mut self, marker: PeriodMarker) -> Result<(), ContractError> {
        self.clock.finish("scripted", marker).await
    }

    #[instrument(name = "scripted_runtime_state", skip(self), fields(call = self.state_reads))]
    fn runtime_state(&mut self) -> Result<RuntimeState, FetchError> {
        let call = self.state_reads;
        self.state_reads += 1;

        if self.config.fail_state_reads.contains(&call) {
            return Err(FetchError::unavailable("runtime_state", "scripted failure"));
        }

        let state = self.scripted_state(call);
        let was_playing = self.last_state.is_some_and(RuntimeState::is_playing);
        if self.config.restart_clock_on_play && state.is_playing() && !was_playing {
            debug!(tick = self.clock.tick(), "Device clock restarted");
            self.clock_base = (self.clock.tick(), 0.0);
        }
        self.last_state = Some(state);
        Ok(state)
    }

    fn timestamp(&mut self) -> Result<f64, FetchError> {
        Ok(self.device_clock())
    }

    fn fetch(&mut self, variable: &str) -> Result<VariableValue, FetchError> {
        self.fetches += 1;
        let key = (self.clock.tick(), variable.to_string());
        if self.fail_fetches.contains(&key) {
            return Err(FetchError::unavailable(variable, "scripted failure"));
        }
        self.value_for(variable)
    }
}
