//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置加载 → 变量解析 → 录制循环 的完整链路
//! - 状态防抖、段轮转、占位符、中断收尾 的端到端场景
//! - 录制文件回放 e2e

#[cfg(test)]
mod contract_tests {
    use contracts::{ordered_columns, resolve_all, row_width};

    #[test]
    fn test_header_width_equals_row_width() {
        let vars = resolve_all(&["timestamp", "actual_q", "payload_cog", "mystery"]);
        assert_eq!(ordered_columns(&vars).len(), row_width(&vars));
        assert_eq!(row_width(&vars), 1 + 6 + 3 + 1);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader, VariableOrigin};
    use contracts::{RecorderConfig, RotationReason, RuntimeState, SessionEvent};
    use recorder::{
        ControllerConfig, SegmentName, SessionController, StatusOutput, StopReason, PLACEHOLDER,
    };
    use telemetry::{ReplaySource, ScriptedConfig, ScriptedSource, SimulatedRobot, SimulationProfile};
    use tempfile::tempdir;

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Column `idx` of every data row
    fn column(path: &Path, idx: usize) -> Vec<String> {
        read_lines(path)
            .iter()
            .skip(1)
            .map(|line| line.split(',').nth(idx).unwrap().to_string())
            .collect()
    }

    fn controller_config(config: &RecorderConfig, variables: &[&str]) -> ControllerConfig {
        ControllerConfig::from_config(config, contracts::resolve_all(variables))
            .with_status_output(StatusOutput::Off)
    }

    /// One state check per period at 100 Hz
    fn fast_config(dir: &Path) -> RecorderConfig {
        let mut config = RecorderConfig::default();
        config.recording.output = dir.join("robot_data.csv");
        config.recording.frequency_hz = 100.0;
        config.recording.status_every = 0;
        config.debounce.check_interval_s = 0.01;
        config
    }

    fn never() -> std::future::Pending<()> {
        std::future::pending()
    }

    /// Config file → variables file → controller; `[STOPPED]x5, [PLAYING]x3`
    /// at one check per second starts recording on the third PLAYING check.
    #[tokio::test(start_paused = true)]
    async fn test_e2e_config_to_first_session() {
        let dir = tempdir().unwrap();
        let vars_file = dir.path().join("record_variables_input.txt");
        fs::write(
            &vars_file,
            "# recorded set\ntimestamp, payload\nactual_TCP_force\npayload\n",
        )
        .unwrap();

        let toml = format!(
            r#"
[robot]
address = "192.168.0.42"

[recording]
output = '{}'
frequency_hz = 10.0
variables_file = '{}'
status_every = 0

[debounce]
check_interval_s = 1.0
"#,
            dir.path().join("arm.csv").display(),
            vars_file.display()
        );
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        let selection = config_loader::resolve_variables(&config.recording);
        assert_eq!(selection.origin, VariableOrigin::File);
        assert_eq!(selection.names(), vec!["timestamp", "payload", "actual_TCP_force"]);

        let source = ScriptedSource::new(
            ScriptedConfig {
                frequency_hz: 10.0,
                ..Default::default()
            }
            .with_states(&[(RuntimeState::Stopped, 5), (RuntimeState::Playing, 3)]),
        );
        let controller_config = ControllerConfig::from_config(&config, selection.variables)
            .with_status_output(StatusOutput::Off);
        let mut controller = SessionController::new(source, controller_config);
        assert_eq!(controller.check_every(), 10);

        let report = controller.run(never(), Some(80)).await.unwrap();
        assert_eq!(report.stop, StopReason::SampleLimit);

        let opened = controller.segments().opened_segments();
        assert_eq!(opened.len(), 1);
        let name = SegmentName::parse(&opened[0]).unwrap();
        assert_eq!(name.base, "arm");
        assert!(name.session_time().is_some());

        let lines = read_lines(&opened[0]);
        assert_eq!(
            lines[0],
            "timestamp,payload,actual_TCP_force_0,actual_TCP_force_1,actual_TCP_force_2,\
             actual_TCP_force_3,actual_TCP_force_4,actual_TCP_force_5"
        );
        // recording began at the 8th check (period 70)
        assert_eq!(lines.len(), 1 + 10);
        assert_eq!(column(&opened[0], 1)[0], "70.000000");
    }

    /// Size rotation: counters advance, each segment gets its own header and
    /// every period lands in exactly one segment.
    #[tokio::test(start_paused = true)]
    async fn test_e2e_size_rotation() {
        let dir = tempdir().unwrap();
        let mut config = fast_config(dir.path());
        config.rotation.max_file_size_mb = Some(0.0001);
        config.rotation.max_duration_minutes = None;

        let source =
            ScriptedSource::new(ScriptedConfig::default().with_states(&[(RuntimeState::Playing, 1)]));
        let mut controller =
            SessionController::new(source, controller_config(&config, &["timestamp", "payload"]));
        controller.run(never(), Some(30)).await.unwrap();

        let opened = controller.segments().opened_segments().to_vec();
        assert!(opened.len() >= 3);
        for (idx, path) in opened.iter().enumerate() {
            let name = SegmentName::parse(path).unwrap();
            assert_eq!(name.segment, Some(idx as u32 + 1));
            assert_eq!(read_lines(path)[0], "timestamp,payload");
        }

        let numbers: Vec<u32> = controller
            .events()
            .iter()
            .filter_map(|event| match event {
                SessionEvent::Rotated {
                    reason: RotationReason::Size,
                    file_number,
                    ..
                } => Some(*file_number),
                _ => None,
            })
            .collect();
        assert_eq!(numbers, (2..=opened.len() as u32).collect::<Vec<_>>());

        let payloads: Vec<String> = opened.iter().flat_map(|p| column(p, 1)).collect();
        let expected: Vec<String> = (2..30).map(|tick| format!("{tick}.000000")).collect();
        assert_eq!(payloads, expected);
    }

    /// A failed vector read becomes six placeholders in its own columns only.
    #[tokio::test(start_paused = true)]
    async fn test_e2e_placeholder_row() {
        let dir = tempdir().unwrap();
        let config = fast_config(dir.path());
        let source = ScriptedSource::new(ScriptedConfig {
            fail_fetches: vec![(5, "actual_TCP_force".to_string())],
            ..ScriptedConfig::default().with_states(&[(RuntimeState::Playing, 1)])
        });
        let mut controller = SessionController::new(
            source,
            controller_config(&config, &["payload", "actual_TCP_force", "robot_mode"]),
        );
        controller.run(never(), Some(8)).await.unwrap();

        let lines = read_lines(&controller.segments().opened_segments()[0]);
        let width = lines[0].split(',').count();
        assert_eq!(width, 8);

        // row for period 5 is the 4th data row (recording began at period 2)
        let cells: Vec<&str> = lines[4].split(',').collect();
        assert_eq!(cells.len(), width);
        assert_eq!(cells[0], "5.000000");
        assert!(cells[1..7].iter().all(|c| *c == PLACEHOLDER));
        assert_eq!(cells[7], "5.000000");

        let neighbour: Vec<&str> = lines[3].split(',').collect();
        assert_eq!(neighbour[2], "4.100000");
    }

    /// Interrupt with a segment open: the file is closed complete and the
    /// summary carries the cumulative sample count.
    #[tokio::test(start_paused = true)]
    async fn test_e2e_interrupt_closes_open_segment() {
        let dir = tempdir().unwrap();
        let config = fast_config(dir.path());
        let source =
            ScriptedSource::new(ScriptedConfig::default().with_states(&[(RuntimeState::Playing, 1)]));
        let mut controller = SessionController::new(
            source,
            controller_config(&config, &["timestamp", "actual_q"]),
        );

        let report = controller
            .run(tokio::time::sleep(Duration::from_millis(495)), None)
            .await
            .unwrap();
        assert_eq!(report.stop, StopReason::Interrupted);
        assert_eq!(report.samples, 50);
        assert!(report.summary.to_string().contains("Total samples: 50"));
        assert!(!controller.segments().is_open());

        let path = &controller.segments().opened_segments()[0];
        let content = fs::read_to_string(path).unwrap();
        assert!(content.ends_with('\n'));
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1 + 48);
        assert!(lines.iter().all(|line| line.split(',').count() == 7));
    }

    /// A recorded segment replays into an identical recording.
    #[tokio::test(start_paused = true)]
    async fn test_e2e_replay_round_trip() {
        let first_dir = tempdir().unwrap();
        let config = fast_config(first_dir.path());
        let variables = ["timestamp", "payload", "elbow_position"];

        let source =
            ScriptedSource::new(ScriptedConfig::default().with_states(&[(RuntimeState::Playing, 1)]));
        let mut controller = SessionController::new(source, controller_config(&config, &variables));
        controller.run(never(), Some(20)).await.unwrap();
        let recorded: PathBuf = controller.segments().opened_segments()[0].clone();
        let original_rows = read_lines(&recorded).len() - 1;
        assert_eq!(original_rows, 18);

        let second_dir = tempdir().unwrap();
        let replay_config = fast_config(second_dir.path());
        let source = ReplaySource::load(&recorded, 100.0).unwrap();
        let mut replayer =
            SessionController::new(source, controller_config(&replay_config, &variables));
        replayer.run(never(), Some(40)).await.unwrap();
        assert_eq!(replayer.stats().sessions, 1);

        let replayed = &replayer.segments().opened_segments()[0];
        let original_payload = column(&recorded, 1);
        let replayed_payload = column(replayed, 1);
        assert_eq!(replayed_payload[..original_rows], original_payload[..]);
        // rows written while the stop is being debounced repeat the last sample
        assert!(replayed_payload[original_rows..]
            .iter()
            .all(|p| *p == original_payload[original_rows - 1]));
        assert_eq!(column(replayed, 3)[..original_rows], column(&recorded, 3)[..]);

        // sample spacing survives the re-anchoring
        let ts = |path: &Path| -> Vec<f64> {
            column(path, 0).iter().map(|c| c.parse().unwrap()).collect()
        };
        let (a, b) = (ts(&recorded), ts(replayed));
        for i in 1..original_rows {
            assert!(((b[i] - b[i - 1]) - (a[i] - a[i - 1])).abs() < 1e-5);
        }
    }

    /// Three simulated programs give three sessions; the device clock restart
    /// at each program start never shows in the recorded timestamps.
    #[tokio::test(start_paused = true)]
    async fn test_e2e_simulated_program_cycles() {
        let dir = tempdir().unwrap();
        let mut config = fast_config(dir.path());
        config.recording.frequency_hz = 50.0;
        config.debounce.check_interval_s = 0.02;

        let robot = SimulatedRobot::new(
            "localhost",
            SimulationProfile {
                frequency_hz: 50.0,
                idle_secs: 0.2,
                playing_secs: 0.6,
                seed: Some(1),
                ..Default::default()
            },
        );
        let mut controller =
            SessionController::new(robot, controller_config(&config, &["timestamp", "actual_q"]));
        let report = controller.run(never(), Some(120)).await.unwrap();

        assert_eq!(controller.source().programs_started(), 3);
        assert_eq!(report.summary.sessions, 3);

        let opened = controller.segments().opened_segments().to_vec();
        assert_eq!(opened.len(), 3);
        let row_counts: Vec<usize> = opened.iter().map(|p| read_lines(p).len() - 1).collect();
        assert_eq!(row_counts, vec![29, 29, 28]);

        for path in &opened {
            let ts: Vec<f64> = column(path, 0).iter().map(|c| c.parse().unwrap()).collect();
            assert!(ts[0] > 1_600_000_000.0, "not wall-clock time: {}", ts[0]);
            for pair in ts.windows(2) {
                assert!(((pair[1] - pair[0]) - 0.02).abs() < 1e-5);
            }
        }
    }
}
