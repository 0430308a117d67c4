//! # Status Page Rendering
//!
//! Writes the static HTML status pages served from the generator host.
//!
//! Two snapshot documents are produced for every sample, identical apart
//! from sizing: a standard page for desktop browsers and a mobile page with
//! a larger type scale. An optional third page charts battery voltage over
//! the persisted samples.

pub mod chart;

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::RenderConfig;
use crate::error::Result;
use crate::telemetry::metrics::DerivedSample;
use chart::BatteryTrend;

/// Presentation variant of the status page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Standard,
    Mobile,
}

impl Layout {
    fn font_size(self) -> &'static str {
        match self {
            Layout::Standard => "16px",
            Layout::Mobile => "42px",
        }
    }

    fn table_width(self) -> &'static str {
        match self {
            Layout::Standard => "480px",
            Layout::Mobile => "100%",
        }
    }
}

/// The pair of snapshot documents for one sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDocuments {
    pub standard: String,
    pub mobile: String,
}

/// Table rows in display order
fn rows(sample: &DerivedSample) -> [(&'static str, String); 6] {
    [
        ("Output Voltage", format!("{:.2}", sample.output_voltage)),
        ("Frequency", format!("{:.2}", sample.frequency)),
        ("Power (watts)", format!("{:.2}", sample.power)),
        ("Battery Voltage", format!("{:.2}", sample.battery_voltage)),
        ("Temperature &deg;C", format!("{:.1}", sample.temperature_celsius)),
        ("Humidity", format!("{:.1}", sample.relative_humidity_percent)),
    ]
}

/// Render one status document
pub fn render_document(sample: &DerivedSample, layout: Layout) -> String {
    let mut html = String::with_capacity(1024);

    html.push_str("<!DOCTYPE HTML>\n<html>\n<head>\n");
    html.push_str("  <meta charset=\"utf-8\">\n");
    html.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str("  <title>Generator Status</title>\n");
    html.push_str("  <style>\n");
    html.push_str(&format!(
        "    body {{ font-family: sans-serif; font-size: {}; }}\n",
        layout.font_size()
    ));
    html.push_str(&format!(
        "    table {{ border-collapse: collapse; width: {}; }}\n",
        layout.table_width()
    ));
    html.push_str("    td { border: 1px solid #888; padding: 0.25em 0.5em; }\n");
    html.push_str("    td.value { text-align: right; }\n");
    html.push_str("  </style>\n</head>\n<body>\n");
    html.push_str("  <h1>Generator Status</h1>\n");
    html.push_str("  <table>\n");
    for (label, value) in rows(sample) {
        html.push_str(&format!(
            "    <tr><td>{}</td><td class=\"value\">{}</td></tr>\n",
            label, value
        ));
    }
    html.push_str("  </table>\n</body>\n</html>\n");

    html
}

/// Render both snapshot documents
pub fn render(sample: &DerivedSample) -> StatusDocuments {
    StatusDocuments {
        standard: render_document(sample, Layout::Standard),
        mobile: render_document(sample, Layout::Mobile),
    }
}

/// Writes status documents to their configured locations
#[derive(Debug)]
pub struct StatusRenderer {
    standard_path: PathBuf,
    mobile_path: PathBuf,
    chart: Option<(PathBuf, BatteryTrend)>,
}

impl StatusRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            standard_path: PathBuf::from(&config.standard_path),
            mobile_path: PathBuf::from(&config.mobile_path),
            chart: config
                .chart_path
                .as_ref()
                .map(|path| (PathBuf::from(path), BatteryTrend::new(config.chart_capacity))),
        }
    }

    /// Render and write both snapshot documents
    ///
    /// # Errors
    ///
    /// Returns error if either file cannot be written
    pub fn publish(&self, sample: &DerivedSample) -> Result<()> {
        let documents = render(sample);
        write_document(&self.standard_path, &documents.standard)?;
        write_document(&self.mobile_path, &documents.mobile)?;
        Ok(())
    }

    /// Add a persisted sample to the battery chart and rewrite it
    ///
    /// No-op when no chart is configured.
    pub fn record_battery(&mut self, timestamp: DateTime<Utc>, sample: &DerivedSample) -> Result<()> {
        if let Some((path, trend)) = &mut self.chart {
            trend.push(timestamp, sample.battery_voltage);
            write_document(path, &chart::render_battery_chart(trend))?;
        }
        Ok(())
    }
}

/// Hidden sibling that a document is staged in before it replaces `path`
fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    if let Some(file_name) = path.file_name() {
        name.push(file_name);
    }
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with `contents` in one rename
///
/// Readers see either the previous page or the new one, never a partial
/// write.
fn write_document(path: &Path, contents: &str) -> Result<()> {
    let staging = staging_path(path);
    fs::write(&staging, contents)?;
    if let Err(e) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(e.into());
    }
    debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}
