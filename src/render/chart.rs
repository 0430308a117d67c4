//! Battery voltage trend chart (CanvasJS line chart)

use std::collections::VecDeque;

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Bounded history of (timestamp, battery voltage) points
#[derive(Debug, Clone)]
pub struct BatteryTrend {
    points: VecDeque<(DateTime<Utc>, f64)>,
    capacity: usize,
}

impl BatteryTrend {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a point, evicting the oldest once full
    pub fn push(&mut self, timestamp: DateTime<Utc>, voltage: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back((timestamp, voltage));
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = &(DateTime<Utc>, f64)> {
        self.points.iter()
    }
}

/// Render the trend as a self-contained chart page
pub fn render_battery_chart(trend: &BatteryTrend) -> String {
    let mut html = String::with_capacity(1024 + trend.len() * 48);

    html.push_str("<!DOCTYPE HTML>\n<html>\n<head>\n");
    html.push_str("  <meta charset=\"utf-8\">\n");
    html.push_str("  <title>Battery Voltage</title>\n");
    html.push_str("  <script type=\"text/javascript\">\n");
    html.push_str("  window.onload = function () {\n");
    html.push_str("    var chart = new CanvasJS.Chart(\"chartContainer\",\n");
    html.push_str("    {\n");
    html.push_str("      title: { text: \"Battery Voltage\" },\n");
    html.push_str("      data: [\n");
    html.push_str("      {\n");
    html.push_str("        type: \"line\",\n");
    html.push_str("        dataPoints: [\n");
    for (timestamp, voltage) in trend.points() {
        // JavaScript months are zero-based
        html.push_str(&format!(
            "        {{ x: new Date({}, {}, {}, {}, {}), y: {:.2} }},\n",
            timestamp.year(),
            timestamp.month0(),
            timestamp.day(),
            timestamp.hour(),
            timestamp.minute(),
            voltage
        ));
    }
    html.push_str("        ]\n");
    html.push_str("      }\n");
    html.push_str("      ]\n");
    html.push_str("    });\n");
    html.push_str("    chart.render();\n");
    html.push_str("  }\n");
    html.push_str("  </script>\n");
    html.push_str(
        "  <script type=\"text/javascript\" src=\"https://cdn.canvasjs.com/canvasjs.min.js\"></script>\n",
    );
    html.push_str("</head>\n<body>\n");
    html.push_str("  <div id=\"chartContainer\" style=\"height: 300px; width: 100%;\"></div>\n");
    html.push_str("</body>\n</html>\n");

    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_trend_evicts_oldest() {
        let mut trend = BatteryTrend::new(2);
        trend.push(at(28, 13), 12.1);
        trend.push(at(29, 13), 12.5);
        trend.push(at(30, 13), 12.7);

        assert_eq!(trend.len(), 2);
        let voltages: Vec<f64> = trend.points().map(|(_, v)| *v).collect();
        assert_eq!(voltages, vec![12.5, 12.7]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut trend = BatteryTrend::new(0);
        trend.push(at(28, 13), 12.1);
        assert!(trend.is_empty());
    }

    #[test]
    fn test_chart_points() {
        let mut trend = BatteryTrend::new(8);
        trend.push(at(28, 13), 12.1);
        trend.push(at(29, 14), 12.5);

        let html = render_battery_chart(&trend);
        assert!(html.contains("{ x: new Date(2024, 9, 28, 13, 0), y: 12.10 },"));
        assert!(html.contains("{ x: new Date(2024, 9, 29, 14, 0), y: 12.50 },"));
        assert!(html.contains("chartContainer"));
    }

    #[test]
    fn test_empty_chart_renders() {
        let html = render_battery_chart(&BatteryTrend::new(4));
        assert!(html.contains("dataPoints: [\n        ]"));
    }
}
