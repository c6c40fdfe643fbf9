// Plot rendering - query history, draw an SVG chart, publish it
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::{ArtifactError, ArtifactStore};
use crate::constants;
use crate::history::{HistoryStore, SizeHistoryRecord, StoreError};

/// A render request: one bucket or all, over a time range or all time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

/// Reference to a published chart
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotArtifact {
    pub location: String,
    pub generated_at: i64,
}

/// Errors from rendering
#[derive(Debug, Error)]
pub enum RenderError {
    /// The queried range holds no records; terminal, never an empty chart
    #[error("no history records in the requested range")]
    NoData,

    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange { start: i64, end: i64 },

    #[error("chart drawing failed: {0}")]
    Chart(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Renders size-over-time charts from the history store
///
/// Read-only with respect to history: it draws whatever snapshot the range
/// query returns, and records landing concurrently simply show up on the
/// next render.
pub struct PlotRenderer<S: HistoryStore, A: ArtifactStore> {
    history: Arc<S>,
    artifacts: Arc<A>,
}

impl<S: HistoryStore, A: ArtifactStore> PlotRenderer<S, A> {
    pub fn new(history: Arc<S>, artifacts: Arc<A>) -> Self {
        Self { history, artifacts }
    }

    /// Query the requested range, draw the chart, publish it atomically,
    /// and return the artifact reference
    pub fn render(&self, request: &PlotRequest) -> Result<PlotArtifact, RenderError> {
        if let (Some(start), Some(end)) = (request.start, request.end)
            && start > end
        {
            return Err(RenderError::InvalidRange { start, end });
        }

        let buckets = match &request.bucket {
            Some(bucket) => vec![bucket.clone()],
            None => self.history.buckets()?,
        };

        let mut series: Vec<(String, Vec<SizeHistoryRecord>)> = Vec::new();
        for bucket in buckets {
            let records = self.history.range(&bucket, request.start, request.end)?;
            if !records.is_empty() {
                series.push((bucket, records));
            }
        }
        if series.is_empty() {
            return Err(RenderError::NoData);
        }

        // Peak reference line: the all-time maximum across the plotted
        // buckets, from the secondary index rather than the range scan.
        let mut peak: Option<SizeHistoryRecord> = None;
        for (bucket, _) in &series {
            if let Some(max) = self.history.max_size(bucket)? {
                match &peak {
                    Some(p) if p.size_bytes >= max.size_bytes => {}
                    _ => peak = Some(max),
                }
            }
        }

        let mut svg = String::new();
        draw_chart(&series, peak.as_ref(), &mut svg)?;

        let generated_at = Utc::now().timestamp_millis();
        let scope = request.bucket.as_deref().unwrap_or("all");
        let key = constants::plot_artifact_key(scope, generated_at);
        let location =
            self.artifacts
                .publish(&key, svg.as_bytes(), constants::ARTIFACT_CONTENT_TYPE)?;

        info!(
            "rendered {} series ({} points) to {}",
            series.len(),
            series.iter().map(|(_, r)| r.len()).sum::<usize>(),
            location
        );
        Ok(PlotArtifact {
            location,
            generated_at,
        })
    }
}

const SERIES_COLORS: [RGBColor; 6] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(23, 190, 207),
];

const PEAK_COLOR: RGBColor = RGBColor(214, 39, 40);

fn chart_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Chart(e.to_string())
}

fn format_ts_label(ts: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(ts) {
        Some(dt) => dt.format("%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

/// Draw size-vs-time line series, one per bucket, plus the peak reference
/// line, into an SVG string
fn draw_chart(
    series: &[(String, Vec<SizeHistoryRecord>)],
    peak: Option<&SizeHistoryRecord>,
    out: &mut String,
) -> Result<(), RenderError> {
    let mut x_min = i64::MAX;
    let mut x_max = i64::MIN;
    let mut y_max = 0u64;
    for (_, records) in series {
        for r in records {
            x_min = x_min.min(r.timestamp);
            x_max = x_max.max(r.timestamp);
            y_max = y_max.max(r.size_bytes);
        }
    }
    if let Some(p) = peak {
        y_max = y_max.max(p.size_bytes);
    }
    if x_min == x_max {
        // a single observation still deserves a visible axis
        x_max = x_min + 1_000;
    }
    let y_top = (y_max.max(1) as f64) * 1.1;

    let root = SVGBackend::with_string(out, (constants::CHART_WIDTH, constants::CHART_HEIGHT))
        .into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("bucket size over time", ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(44)
        .y_label_area_size(72)
        .build_cartesian_2d(x_min..x_max, 0f64..y_top)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_desc("time")
        .y_desc("size (bytes)")
        .x_labels(6)
        .x_label_formatter(&|ts: &i64| format_ts_label(*ts))
        .draw()
        .map_err(chart_err)?;

    for (i, (bucket, records)) in series.iter().enumerate() {
        let color = SERIES_COLORS[i % SERIES_COLORS.len()];
        chart
            .draw_series(LineSeries::new(
                records.iter().map(|r| (r.timestamp, r.size_bytes as f64)),
                color.stroke_width(2),
            ))
            .map_err(chart_err)?
            .label(bucket.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color));
    }

    if let Some(p) = peak {
        let size = p.size_bytes;
        chart
            .draw_series(LineSeries::new(
                [(x_min, size as f64), (x_max, size as f64)],
                PEAK_COLOR.stroke_width(1),
            ))
            .map_err(chart_err)?
            .label(format!("peak: {} bytes", size))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], PEAK_COLOR));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}
