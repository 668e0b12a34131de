//! HTML rendering of the dashboard page.
//!
//! Rendering is a pure function of a [`TelemetryStore`] snapshot, the
//! configuration and an optional operator notice. Nothing here mutates
//! state; the caller drains the ingestion channel first.
//!
//! Layout: left column holds the connection indicator, the last reading,
//! LED controls and the CSV download; right column holds the live chart.

use crate::models::{LedCommand, Reading};
use crate::store::TelemetryStore;
use crate::Config;

// ---

/// One-shot message shown at the top of the page after an operator action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Sent(LedCommand),
    Failed(LedCommand),
    ExportEmpty,
}

impl Notice {
    // ---
    /// Value carried in the `?notice=` query parameter.
    pub fn as_query(self) -> &'static str {
        match self {
            Notice::Sent(LedCommand::On) => "led_on_sent",
            Notice::Sent(LedCommand::Off) => "led_off_sent",
            Notice::Failed(LedCommand::On) => "led_on_failed",
            Notice::Failed(LedCommand::Off) => "led_off_failed",
            Notice::ExportEmpty => "export_empty",
        }
    }

    /// Inverse of [`Notice::as_query`]; unknown values are ignored.
    pub fn from_query(value: &str) -> Option<Self> {
        // ---
        let notice = match value {
            "led_on_sent" => Notice::Sent(LedCommand::On),
            "led_off_sent" => Notice::Sent(LedCommand::Off),
            "led_on_failed" => Notice::Failed(LedCommand::On),
            "led_off_failed" => Notice::Failed(LedCommand::Off),
            "export_empty" => Notice::ExportEmpty,
            _ => return None,
        };
        Some(notice)
    }

    fn message(self) -> String {
        match self {
            Notice::Sent(cmd) => format!("{} sent", cmd.label()),
            Notice::Failed(cmd) => format!("Failed to send {}", cmd.label()),
            Notice::ExportEmpty => "No data buffered yet".to_string(),
        }
    }

    fn css_class(self) -> &'static str {
        match self {
            Notice::Sent(_) => "success",
            Notice::Failed(_) => "error",
            Notice::ExportEmpty => "info",
        }
    }
}

/// Render the full dashboard page.
pub fn page(store: &TelemetryStore, cfg: &Config, notice: Option<Notice>) -> String {
    // ---
    let mut html = String::with_capacity(16 * 1024);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    if cfg.page_refresh_secs > 0 {
        // Refresh to the bare URL so a notice is shown once.
        html.push_str(&format!(
            "<meta http-equiv=\"refresh\" content=\"{};url=/\">\n",
            cfg.page_refresh_secs
        ));
    }
    html.push_str("<title>IoT Telemetry Dashboard</title>\n");
    html.push_str(STYLE);
    html.push_str("</head>\n<body>\n<h1>IoT Telemetry Dashboard</h1>\n");

    if let Some(notice) = notice {
        html.push_str(&format!(
            "<div class=\"notice {}\">{}</div>\n",
            notice.css_class(),
            escape_html(&notice.message())
        ));
    }

    html.push_str("<div class=\"columns\">\n<section class=\"left\">\n");
    status_panel(&mut html, store);
    last_reading_panel(&mut html, store.snapshot_last());
    control_panel(&mut html);
    export_panel(&mut html);
    html.push_str("</section>\n<section class=\"right\">\n<h2>Live Chart</h2>\n");

    let recent = store.snapshot_recent(cfg.chart_window);
    match chart_svg(&recent, &cfg.chart_primary_field, &cfg.chart_secondary_field) {
        Some(svg) => html.push_str(&svg),
        None => html.push_str("<div class=\"notice info\">Waiting for sensor data...</div>\n"),
    }

    html.push_str(&format!(
        "<p class=\"footer\">{} of {} readings buffered ({} received)</p>\n",
        store.len(),
        store.capacity(),
        store.total_ingested()
    ));
    html.push_str("</section>\n</div>\n</body>\n</html>\n");
    html
}

fn status_panel(html: &mut String, store: &TelemetryStore) {
    // ---
    let (label, class) = if store.is_connected() {
        ("YES", "up")
    } else {
        ("NO", "down")
    };
    html.push_str(&format!(
        "<h2>Connection Status</h2>\n<div class=\"metric\"><span>MQTT Connected</span><strong id=\"connected\" class=\"{class}\">{label}</strong></div>\n<hr>\n"
    ));
}

fn last_reading_panel(html: &mut String, last: Option<&Reading>) {
    // ---
    html.push_str("<h2>Last Data</h2>\n");
    let pretty = last.and_then(|r| serde_json::to_string_pretty(r).ok());
    match pretty {
        Some(json) => {
            html.push_str(&format!("<pre id=\"last\">{}</pre>\n", escape_html(&json)));
        }
        None => html.push_str("<div class=\"notice info\">Waiting for data...</div>\n"),
    }
    html.push_str("<hr>\n");
}

fn control_panel(html: &mut String) {
    // ---
    html.push_str("<h2>LED Control</h2>\n<div class=\"buttons\">\n");
    for (path, cmd) in [("on", LedCommand::On), ("off", LedCommand::Off)] {
        html.push_str(&format!(
            "<form method=\"post\" action=\"/control/led/{path}\"><button type=\"submit\">{}</button></form>\n",
            cmd.label()
        ));
    }
    html.push_str("</div>\n<hr>\n");
}

fn export_panel(html: &mut String) {
    // ---
    html.push_str(
        "<h2>Download Logs</h2>\n<a class=\"button\" href=\"/export.csv\">Download CSV</a>\n",
    );
}

// ---

const CHART_WIDTH: f64 = 900.0;
const CHART_HEIGHT: f64 = 500.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 70.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 70.0;
const Y_TICKS: usize = 5;
const MAX_X_LABELS: usize = 8;

const PRIMARY_COLOR: &str = "#1f77b4";
const SECONDARY_COLOR: &str = "#ff7f0e";

/// Render the chart for `readings` (oldest first) as an inline SVG.
///
/// Returns `None` when no reading carries `primary`. The secondary series
/// gets its own right-hand axis and is drawn only if some reading has it.
pub fn chart_svg(readings: &[&Reading], primary: &str, secondary: &str) -> Option<String> {
    // ---
    if !readings.iter().any(|r| r.get(primary).is_some()) {
        return None;
    }
    let has_secondary = readings.iter().any(|r| r.get(secondary).is_some());

    let plot_w = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let n = readings.len();
    let x_at = |i: usize| -> f64 {
        if n <= 1 {
            MARGIN_LEFT + plot_w / 2.0
        } else {
            MARGIN_LEFT + plot_w * i as f64 / (n - 1) as f64
        }
    };

    let mut svg = String::with_capacity(8 * 1024);
    svg.push_str(&format!(
        "<svg class=\"chart\" xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {CHART_WIDTH} {CHART_HEIGHT}\" role=\"img\">\n"
    ));
    svg.push_str(&format!(
        "<rect x=\"{MARGIN_LEFT}\" y=\"{MARGIN_TOP}\" width=\"{plot_w}\" height=\"{plot_h}\" fill=\"#fafafa\" stroke=\"#ccc\"/>\n"
    ));

    let primary_series: Vec<Option<f64>> = readings.iter().map(|r| r.numeric(primary)).collect();
    let primary_scale = Scale::fit(&primary_series);
    y_axis(&mut svg, &primary_scale, primary, MARGIN_LEFT, Side::Left, PRIMARY_COLOR);
    series(&mut svg, &primary_series, &primary_scale, &x_at, PRIMARY_COLOR, "primary");

    if has_secondary {
        let secondary_series: Vec<Option<f64>> =
            readings.iter().map(|r| r.numeric(secondary)).collect();
        let secondary_scale = Scale::fit(&secondary_series);
        y_axis(
            &mut svg,
            &secondary_scale,
            secondary,
            CHART_WIDTH - MARGIN_RIGHT,
            Side::Right,
            SECONDARY_COLOR,
        );
        series(&mut svg, &secondary_series, &secondary_scale, &x_at, SECONDARY_COLOR, "secondary");
    }

    // X labels: display timestamps, thinned to a readable count.
    let step = n.div_ceil(MAX_X_LABELS).max(1);
    let baseline = MARGIN_TOP + plot_h;
    for (i, reading) in readings.iter().enumerate().step_by(step) {
        let x = x_at(i);
        svg.push_str(&format!(
            "<text x=\"{x:.1}\" y=\"{:.1}\" font-size=\"11\" text-anchor=\"end\" transform=\"rotate(-35 {x:.1} {:.1})\">{}</text>\n",
            baseline + 16.0,
            baseline + 16.0,
            escape_html(&reading.ts)
        ));
    }

    // Legend
    svg.push_str(&format!(
        "<text x=\"{MARGIN_LEFT}\" y=\"24\" font-size=\"13\" fill=\"{PRIMARY_COLOR}\">&#9679; {}</text>\n",
        escape_html(primary)
    ));
    if has_secondary {
        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"24\" font-size=\"13\" fill=\"{SECONDARY_COLOR}\">&#9679; {}</text>\n",
            MARGIN_LEFT + 120.0,
            escape_html(secondary)
        ));
    }

    svg.push_str("</svg>\n");
    Some(svg)
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Linear mapping from a value range onto the plot's vertical extent.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Scale {
    min: f64,
    max: f64,
}

impl Scale {
    // ---
    fn fit(values: &[Option<f64>]) -> Self {
        // ---
        let (min, max) = values
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        if !min.is_finite() || !max.is_finite() {
            return Scale { min: 0.0, max: 1.0 };
        }

        // Halved spans keep the arithmetic finite near f64::MAX.
        let pad = if min == max {
            (min.abs() * 0.05).max(1.0)
        } else {
            (max / 2.0 - min / 2.0) * 0.1
        };
        let padded = Scale {
            min: min - pad,
            max: max + pad,
        };
        if padded.min.is_finite() && padded.max.is_finite() {
            padded
        } else {
            Scale { min, max }
        }
    }

    /// Value at fraction `f` (0 = bottom, 1 = top) of the axis.
    fn value_at(&self, f: f64) -> f64 {
        self.min * (1.0 - f) + self.max * f
    }

    fn y(&self, value: f64) -> f64 {
        // ---
        let plot_h = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let fraction = (value / 2.0 - self.min / 2.0) / (self.max / 2.0 - self.min / 2.0);
        MARGIN_TOP + plot_h * (1.0 - fraction)
    }
}

fn y_axis(svg: &mut String, scale: &Scale, title: &str, x: f64, side: Side, color: &str) {
    // ---
    let (anchor, label_dx, title_x) = match side {
        Side::Left => ("end", -6.0, x - 52.0),
        Side::Right => ("start", 6.0, x + 52.0),
    };

    for t in 0..=Y_TICKS {
        let value = scale.value_at(t as f64 / Y_TICKS as f64);
        let y = scale.y(value);
        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"11\" text-anchor=\"{anchor}\" fill=\"{color}\">{:.1}</text>\n",
            x + label_dx,
            y + 4.0,
            value
        ));
        if matches!(side, Side::Left) {
            svg.push_str(&format!(
                "<line x1=\"{MARGIN_LEFT}\" x2=\"{:.1}\" y1=\"{y:.1}\" y2=\"{y:.1}\" stroke=\"#e5e5e5\"/>\n",
                CHART_WIDTH - MARGIN_RIGHT
            ));
        }
    }

    let mid = MARGIN_TOP + (CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM) / 2.0;
    svg.push_str(&format!(
        "<text x=\"{title_x:.1}\" y=\"{mid:.1}\" font-size=\"13\" text-anchor=\"middle\" fill=\"{color}\" transform=\"rotate(-90 {title_x:.1} {mid:.1})\">{}</text>\n",
        escape_html(title)
    ));
}

/// Draw a line with markers; a missing value breaks the line.
fn series<F>(svg: &mut String, values: &[Option<f64>], scale: &Scale, x_at: &F, color: &str, name: &str)
where
    F: Fn(usize) -> f64,
{
    // ---
    let mut path = String::new();
    let mut pen_down = false;
    let mut markers = String::new();

    for (i, value) in values.iter().enumerate() {
        match value {
            Some(v) => {
                let (x, y) = (x_at(i), scale.y(*v));
                path.push_str(&format!("{}{x:.1},{y:.1} ", if pen_down { "L" } else { "M" }));
                markers.push_str(&format!("<circle cx=\"{x:.1}\" cy=\"{y:.1}\" r=\"3\"/>"));
                pen_down = true;
            }
            None => pen_down = false,
        }
    }

    if path.is_empty() {
        return;
    }
    svg.push_str(&format!(
        "<g class=\"series {name}\" fill=\"{color}\"><path d=\"{}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"2\"/>{markers}</g>\n",
        path.trim_end()
    ));
}

/// Escape text for inclusion in HTML or SVG.
pub fn escape_html(text: &str) -> String {
    // ---
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = r#"<style>
body { font-family: sans-serif; margin: 1.5rem; color: #222; }
.columns { display: flex; gap: 2rem; }
.left { flex: 1; min-width: 260px; }
.right { flex: 2; }
.metric span { display: block; color: #666; font-size: 0.9rem; }
.metric strong { font-size: 2rem; }
.metric .up { color: #2a9d4a; }
.metric .down { color: #c0392b; }
.buttons { display: flex; gap: 0.5rem; }
button, .button { padding: 0.4rem 1rem; border: 1px solid #999; border-radius: 4px; background: #fff; color: #222; text-decoration: none; cursor: pointer; }
pre { background: #f4f4f4; padding: 0.5rem; overflow-x: auto; }
.notice { padding: 0.6rem 1rem; border-radius: 4px; margin: 0.5rem 0; }
.notice.info { background: #e8f1fb; }
.notice.success { background: #e6f6ea; }
.notice.error { background: #fbeaea; }
.chart { width: 100%; height: auto; }
.footer { color: #888; font-size: 0.8rem; }
</style>
"#;

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::{IngestionEvent, Payload};
    use chrono::Utc;

    fn store_with(bodies: &[&str]) -> TelemetryStore {
        // ---
        let cfg = Config::default();
        let mut store = TelemetryStore::new(cfg.buffer_capacity, cfg.display_offset);
        for body in bodies {
            store.apply(IngestionEvent::sensor_from_bytes(body.as_bytes(), Utc::now()));
        }
        store
    }

    #[test]
    fn test_notice_query_round_trip() {
        // ---
        for notice in [
            Notice::Sent(LedCommand::On),
            Notice::Sent(LedCommand::Off),
            Notice::Failed(LedCommand::On),
            Notice::Failed(LedCommand::Off),
            Notice::ExportEmpty,
        ] {
            assert_eq!(Notice::from_query(notice.as_query()), Some(notice));
        }
        assert_eq!(Notice::from_query("bogus"), None);
    }

    #[test]
    fn test_empty_page_shows_waiting_states() {
        // ---
        let store = store_with(&[]);
        let html = page(&store, &Config::default(), None);

        assert!(html.contains(">NO</strong>"));
        assert!(html.contains("Waiting for data..."));
        assert!(html.contains("Waiting for sensor data..."));
        assert!(html.contains("action=\"/control/led/on\""));
        assert!(html.contains("action=\"/control/led/off\""));
        assert!(html.contains("href=\"/export.csv\""));
        assert!(html.contains("content=\"2;url=/\""));
    }

    #[test]
    fn test_page_shows_last_reading_escaped() {
        // ---
        let store = store_with(&[r#"{"suhu": 29}"#, "<script>"]);
        let html = page(&store, &Config::default(), Some(Notice::Failed(LedCommand::Off)));

        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("Failed to send LED OFF"));
        assert!(html.contains("notice error"));
        // The primary field is in the window, so the chart is drawn.
        assert!(html.contains("<svg"));
    }

    #[test]
    fn test_chart_requires_primary_field() {
        // ---
        let store = store_with(&[r#"{"ldr": 10}"#]);
        let recent = store.snapshot_recent(200);
        assert!(chart_svg(&recent, "suhu", "ldr").is_none());
    }

    #[test]
    fn test_chart_draws_secondary_only_when_present() {
        // ---
        let store = store_with(&[r#"{"suhu": 20}"#, r#"{"suhu": 21}"#]);
        let recent = store.snapshot_recent(200);
        let svg = chart_svg(&recent, "suhu", "ldr").unwrap();
        assert!(svg.contains("series primary"));
        assert!(!svg.contains("series secondary"));

        let store = store_with(&[r#"{"suhu": 20, "ldr": 400}"#, r#"{"suhu": 21, "ldr": 380}"#]);
        let recent = store.snapshot_recent(200);
        let svg = chart_svg(&recent, "suhu", "ldr").unwrap();
        assert!(svg.contains("series secondary"));
        assert_eq!(svg.matches("<circle").count(), 4);
    }

    #[test]
    fn test_missing_values_break_the_line() {
        // ---
        let store = store_with(&[
            r#"{"suhu": 20}"#,
            r#"{"suhu": 21}"#,
            r#"{"other": 1}"#,
            r#"{"suhu": 22}"#,
        ]);
        let recent = store.snapshot_recent(200);
        let svg = chart_svg(&recent, "suhu", "ldr").unwrap();

        let path = svg
            .split("d=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap();
        assert_eq!(path.matches('M').count(), 2);
        assert_eq!(path.matches('L').count(), 1);
    }

    #[test]
    fn test_scale_handles_flat_and_empty_series() {
        // ---
        assert_eq!(Scale::fit(&[None, None]), Scale { min: 0.0, max: 1.0 });
        assert_eq!(Scale::fit(&[Some(5.0), Some(5.0)]), Scale { min: 4.0, max: 6.0 });

        let scale = Scale::fit(&[Some(0.0), Some(100.0)]);
        assert!(scale.y(100.0) < scale.y(0.0));
    }

    #[test]
    fn test_scale_stays_finite_for_extreme_values() {
        // ---
        let wide = Scale::fit(&[Some(1e308), Some(-1e308)]);
        assert!(wide.min.is_finite() && wide.max.is_finite());
        for v in [1e308, -1e308, 0.0, wide.value_at(0.5)] {
            let y = wide.y(v);
            assert!(y.is_finite(), "y({v}) = {y}");
            assert!((MARGIN_TOP..=CHART_HEIGHT - MARGIN_BOTTOM).contains(&y));
        }

        let flat = Scale::fit(&[Some(1e308), Some(1e308)]);
        assert!(flat.y(1e308).is_finite());

        let store = store_with(&[r#"{"suhu": 1e308}"#, r#"{"suhu": -1e308}"#]);
        let recent = store.snapshot_recent(200);
        let svg = chart_svg(&recent, "suhu", "ldr").unwrap();
        assert!(!svg.contains("NaN"));
        assert!(!svg.contains("inf"));
    }

    #[test]
    fn test_single_reading_is_centered() {
        // ---
        let mut payload = Payload::new();
        payload.insert("suhu".into(), serde_json::json!(25));
        let cfg = Config::default();
        let reading = Reading::new(0, payload, Utc::now(), &cfg.display_offset);

        let svg = chart_svg(&[&reading], "suhu", "ldr").unwrap();
        let center = MARGIN_LEFT + (CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT) / 2.0;
        assert!(svg.contains(&format!("cx=\"{center:.1}\"")));
    }
}
