//! # Acquisition Loop
//!
//! One cycle per telemetry line: parse, read the enclosure sensor, derive
//! metrics, publish the status pages, and let the log gate decide whether
//! the sample goes into the audit log.

use chrono::{DateTime, Timelike, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{Config, MetricsConfig};
use crate::error::{MonitorError, Result};
use crate::frame::parser::ParseError;
use crate::frame::protocol::TelemetryLine;
use crate::render::StatusRenderer;
use crate::sensor::bus::SensorBus;
use crate::sensor::SensorReader;
use crate::telemetry::gate::{GateDecision, LogGate};
use crate::telemetry::logger::AuditLog;
use crate::telemetry::metrics::{self, DerivedSample};

/// Number of published cycles between status log messages
const STATUS_INTERVAL_CYCLES: u64 = 720;

/// Result of one acquisition cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Line rejected by the parser; nothing rendered or logged
    Discarded(ParseError),

    /// Sample rendered; `logged` is true only if the audit entry was written
    Published {
        sample: DerivedSample,
        decision: GateDecision,
        logged: bool,
    },
}

/// Running totals for status reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub published: u64,
    pub discarded: u64,
    pub logged: u64,
}

/// Per-cycle pipeline state
///
/// Owns every piece of state that survives between cycles: the log gate and
/// the battery trend inside the renderer.
#[derive(Debug)]
pub struct Acquisition<B> {
    sensor: SensorReader<B>,
    metrics: MetricsConfig,
    renderer: StatusRenderer,
    gate: LogGate,
    audit: AuditLog,
    stats: CycleStats,
}

impl<B: SensorBus> Acquisition<B> {
    /// Build the pipeline; the log gate is seeded with the hour of `started_at`
    pub fn new(sensor: SensorReader<B>, config: &Config, started_at: DateTime<Utc>) -> Self {
        Self {
            sensor,
            metrics: config.metrics.clone(),
            renderer: StatusRenderer::new(&config.render),
            gate: LogGate::starting_at(started_at, config.log.overvoltage_threshold),
            audit: AuditLog::new(&config.log.path),
            stats: CycleStats::default(),
        }
    }

    pub fn gate(&self) -> &LogGate {
        &self.gate
    }

    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    /// Run one cycle for `line` at wall-clock time `now`
    ///
    /// # Errors
    ///
    /// Returns error only if the sensor transaction fails. Parse failures
    /// are reported as [`CycleOutcome::Discarded`]; render and audit-log
    /// write failures are logged and the cycle carries on.
    pub async fn process_line(
        &mut self,
        line: &TelemetryLine,
        now: DateTime<Utc>,
    ) -> Result<CycleOutcome> {
        let telemetry = match line.parse() {
            Ok(telemetry) => telemetry,
            Err(e) => {
                debug!("Discarding telemetry \"{}\": {}", line, e);
                self.stats.discarded += 1;
                return Ok(CycleOutcome::Discarded(e));
            }
        };

        let reading = self.sensor.read().await?;
        let sample = metrics::derive(&telemetry, &reading, &self.metrics);

        if let Err(e) = self.renderer.publish(&sample) {
            warn!("Failed to write status pages: {}", e);
        }
        self.stats.published += 1;

        let hour = now.hour();
        let decision = self.gate.evaluate(&sample, hour);
        let logged = decision.should_log() && self.persist(&sample, decision, now);
        if logged {
            self.gate.record_logged(hour);
            self.stats.logged += 1;
        }

        if self.stats.published % STATUS_INTERVAL_CYCLES == 0 {
            info!(
                "Processed {} samples ({} discarded lines, {} audit entries)",
                self.stats.published, self.stats.discarded, self.stats.logged
            );
        }

        Ok(CycleOutcome::Published {
            sample,
            decision,
            logged,
        })
    }

    fn persist(&mut self, sample: &DerivedSample, decision: GateDecision, now: DateTime<Utc>) -> bool {
        if let Err(e) = self.audit.append_sample(sample, now) {
            warn!("Failed to append to {}: {}", self.audit.path().display(), e);
            return false;
        }

        match decision {
            GateDecision::OverVoltage => warn!(
                "Over-voltage: {:.2} V logged to {}",
                sample.output_voltage,
                self.audit.path().display()
            ),
            _ => info!("Hourly sample logged to {}", self.audit.path().display()),
        }

        if let Err(e) = self.renderer.record_battery(now, sample) {
            warn!("Failed to write battery chart: {}", e);
        }
        true
    }

    /// Process lines until the intake side closes the channel
    ///
    /// # Errors
    ///
    /// Returns `IntakeClosed` when the channel closes, or the sensor error
    /// that ended the loop.
    pub async fn run(&mut self, lines: &mut mpsc::Receiver<TelemetryLine>) -> Result<()> {
        while let Some(line) = lines.recv().await {
            self.process_line(&line, Utc::now()).await?;
        }
        Err(MonitorError::IntakeClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::bus::MockSensorBus;
    use chrono::TimeZone;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    fn test_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.sensor.settle_ms = 0;
        config.log.path = dir.join("generator.log").display().to_string();
        config.render.standard_path = dir.join("index.html").display().to_string();
        config.render.mobile_path = dir.join("mobile.html").display().to_string();
        config
    }

    fn healthy_bus() -> MockSensorBus {
        let mut bus = MockSensorBus::new();
        bus.expect_write_command().returning(|_, _| Ok(()));
        bus.expect_read_block()
            .returning(|_, _| Ok(vec![0x66, 0x66, 0x00, 0x99, 0x99, 0x00]));
        bus
    }

    fn at_hour(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 28, hour, 30, 0).unwrap()
    }

    fn pipeline(config: &Config, bus: MockSensorBus) -> Acquisition<MockSensorBus> {
        Acquisition::new(SensorReader::new(bus, &config.sensor), config, at_hour(9))
    }

    fn setup() -> (TempDir, Config) {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        (dir, config)
    }

    fn log_lines(config: &Config) -> Vec<String> {
        std::fs::read_to_string(&config.log.path)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_malformed_line_skips_cycle() {
        let (dir, config) = setup();
        let mut bus = MockSensorBus::new();
        bus.expect_write_command().never();
        bus.expect_read_block().never();
        let mut acquisition = pipeline(&config, bus);

        let outcome = acquisition
            .process_line(&TelemetryLine::new("50.0 50.0 10.0\n"), at_hour(10))
            .await
            .unwrap();

        assert_eq!(outcome, CycleOutcome::Discarded(ParseError::FieldCount { found: 3 }));
        assert!(!dir.path().join("index.html").exists());
        assert!(log_lines(&config).is_empty());
        assert_eq!(acquisition.stats().discarded, 1);
    }

    #[tokio::test]
    async fn test_same_hour_renders_without_logging() {
        let (dir, config) = setup();
        let mut acquisition = pipeline(&config, healthy_bus());

        let outcome = acquisition
            .process_line(&TelemetryLine::new("50.0 50.0 10.0 13.2\n"), at_hour(9))
            .await
            .unwrap();

        match outcome {
            CycleOutcome::Published { sample, decision, logged } => {
                assert_eq!(sample.power, 500.0);
                assert!((sample.temperature_celsius - 25.0).abs() < 0.01);
                assert_eq!(decision, GateDecision::Skip);
                assert!(!logged);
            }
            other => panic!("Expected Published, got: {:?}", other),
        }

        assert!(dir.path().join("index.html").exists());
        assert!(dir.path().join("mobile.html").exists());
        assert!(log_lines(&config).is_empty());
    }

    #[tokio::test]
    async fn test_hour_change_logs_once() {
        let (_dir, config) = setup();
        let mut acquisition = pipeline(&config, healthy_bus());
        let line = TelemetryLine::new("50.0 50.0 1.0 13.2\n");

        acquisition.process_line(&line, at_hour(10)).await.unwrap();
        acquisition.process_line(&line, at_hour(10)).await.unwrap();

        let lines = log_lines(&config);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("2024-10-28-10-30-00.000000 utc: voltage = 50.00"));
        assert_eq!(acquisition.gate().previous_logged_hour(), 10);
        assert_eq!(acquisition.stats().logged, 1);
    }

    #[tokio::test]
    async fn test_overvoltage_always_logged() {
        let (_dir, config) = setup();
        let mut acquisition = pipeline(&config, healthy_bus());
        let line = TelemetryLine::new("150.0 50.0 1.0 13.2\n");

        for _ in 0..3 {
            let outcome = acquisition.process_line(&line, at_hour(9)).await.unwrap();
            assert!(matches!(
                outcome,
                CycleOutcome::Published { decision: GateDecision::OverVoltage, logged: true, .. }
            ));
        }
        assert_eq!(log_lines(&config).len(), 3);
    }

    #[tokio::test]
    async fn test_failed_log_write_does_not_advance_gate() {
        let (dir, mut config) = setup();
        config.log.path = dir.path().join("missing/generator.log").display().to_string();
        let mut acquisition = pipeline(&config, healthy_bus());

        let outcome = acquisition
            .process_line(&TelemetryLine::new("50.0 50.0 1.0 13.2\n"), at_hour(10))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            CycleOutcome::Published { decision: GateDecision::Heartbeat, logged: false, .. }
        ));
        assert_eq!(acquisition.gate().previous_logged_hour(), 9);
    }

    #[tokio::test]
    async fn test_render_failure_is_not_fatal() {
        let (dir, mut config) = setup();
        config.render.standard_path = dir.path().join("missing/index.html").display().to_string();
        let mut acquisition = pipeline(&config, healthy_bus());

        let outcome = acquisition
            .process_line(&TelemetryLine::new("50.0 50.0 1.0 13.2\n"), at_hour(10))
            .await
            .unwrap();
        assert!(matches!(outcome, CycleOutcome::Published { logged: true, .. }));
    }

    #[tokio::test]
    async fn test_logged_sample_feeds_battery_chart() {
        let (dir, mut config) = setup();
        config.render.chart_path = Some(dir.path().join("battery.html").display().to_string());
        let mut acquisition = pipeline(&config, healthy_bus());
        let line = TelemetryLine::new("50.0 50.0 1.0 12.6\n");

        acquisition.process_line(&line, at_hour(9)).await.unwrap();
        assert!(!dir.path().join("battery.html").exists());

        acquisition.process_line(&line, at_hour(10)).await.unwrap();
        let chart = std::fs::read_to_string(dir.path().join("battery.html")).unwrap();
        assert!(chart.contains("{ x: new Date(2024, 9, 28, 10, 30), y: 12.60 },"));
    }

    #[tokio::test]
    async fn test_sensor_failure_is_fatal() {
        let (_dir, config) = setup();
        let mut bus = MockSensorBus::new();
        bus.expect_write_command()
            .returning(|_, _| Err(MonitorError::Sensor("device not present".to_string())));
        let mut acquisition = pipeline(&config, bus);

        let result = acquisition
            .process_line(&TelemetryLine::new("50.0 50.0 10.0 13.2\n"), at_hour(9))
            .await;
        assert!(matches!(result, Err(MonitorError::Sensor(_))));
    }

    #[tokio::test]
    async fn test_run_until_intake_closes() {
        let (_dir, config) = setup();
        let mut acquisition = pipeline(&config, healthy_bus());
        let (tx, mut rx) = mpsc::channel(4);

        // Normal voltage; only a wall-clock hour change can log it
        tx.send(TelemetryLine::new("50.0 50.0 10.0 13.2\n")).await.unwrap();
        tx.send(TelemetryLine::new("garbage\n")).await.unwrap();
        drop(tx);

        let result = acquisition.run(&mut rx).await;
        assert!(matches!(result, Err(MonitorError::IntakeClosed)));
        assert_eq!(acquisition.stats().published, 1);
        assert_eq!(acquisition.stats().discarded, 1);
        assert!(acquisition.stats().logged <= 1);
    }
}
