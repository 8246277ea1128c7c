// src/render/mod.rs

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use plotters::prelude::*;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};
use tracing::info;

use crate::record::CanonicalRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    #[default]
    Csv,
    Json,
    Summary,
    /// SVG scatter plot.
    Chart,
}

/// Consumer of the final record set.
pub trait Renderer {
    fn render(&self, records: &[CanonicalRecord], out: &mut dyn Write) -> Result<()>;
}

/// `year,magnitude,event,category`, one row per record.
pub struct CsvRenderer;

impl Renderer for CsvRenderer {
    fn render(&self, records: &[CanonicalRecord], out: &mut dyn Write) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(out);
        for r in records {
            wtr.serialize(r).context("writing CSV row")?;
        }
        wtr.flush().context("flushing CSV")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    source: &'a str,
    generated_at: DateTime<Utc>,
    record_count: usize,
    records: &'a [CanonicalRecord],
}

pub struct JsonRenderer {
    pub source: String,
}

impl Renderer for JsonRenderer {
    fn render(&self, records: &[CanonicalRecord], out: &mut dyn Write) -> Result<()> {
        let doc = JsonDocument {
            source: &self.source,
            generated_at: Utc::now(),
            record_count: records.len(),
            records,
        };
        serde_json::to_writer_pretty(&mut *out, &doc).context("writing JSON")?;
        writeln!(out)?;
        Ok(())
    }
}

/// Per-category counts, total toll and year span.
pub struct SummaryRenderer;

#[derive(Default)]
struct CategorySummary {
    events: usize,
    total: i64,
    first: Option<i64>,
    last: Option<i64>,
}

impl Renderer for SummaryRenderer {
    fn render(&self, records: &[CanonicalRecord], out: &mut dyn Write) -> Result<()> {
        let mut by_category: BTreeMap<&str, CategorySummary> = BTreeMap::new();
        for r in records {
            let s = by_category.entry(r.category.as_str()).or_default();
            s.events += 1;
            s.total = s.total.saturating_add(r.magnitude);
            s.first = Some(s.first.map_or(r.year, |y| y.min(r.year)));
            s.last = Some(s.last.map_or(r.year, |y| y.max(r.year)));
        }
        writeln!(
            out,
            "{:<24} {:>7} {:>14} {:>11}",
            "category", "events", "death toll", "years"
        )?;
        for (category, s) in &by_category {
            let span = match (s.first, s.last) {
                (Some(a), Some(b)) => format!("{}-{}", a, b),
                _ => String::new(),
            };
            writeln!(out, "{:<24} {:>7} {:>14} {:>11}", category, s.events, s.total, span)?;
        }
        let total: i64 = records.iter().map(|r| r.magnitude).fold(0, i64::saturating_add);
        writeln!(out, "{:<24} {:>7} {:>14}", "total", records.len(), total)?;
        Ok(())
    }
}

/// Death toll against year on a log scale, one colour per category, as SVG.
pub struct ChartRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self {
            width: 1500,
            height: 800,
        }
    }
}

impl Renderer for ChartRenderer {
    fn render(&self, records: &[CanonicalRecord], out: &mut dyn Write) -> Result<()> {
        let mut by_category: BTreeMap<&str, Vec<(i64, f64)>> = BTreeMap::new();
        for r in records {
            // log axis: a zero toll sits on the floor
            let toll = r.magnitude.max(1) as f64;
            by_category
                .entry(r.category.as_str())
                .or_default()
                .push((r.year, toll));
        }
        let first = records.iter().map(|r| r.year).min().unwrap_or(1900);
        let last = records.iter().map(|r| r.year).max().unwrap_or(2025);
        let top = records.iter().map(|r| r.magnitude).max().unwrap_or(1).max(1) as f64 * 2.0;

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height))
                .into_drawing_area();
            root.fill(&WHITE)?;
            let mut chart = ChartBuilder::on(&root)
                .caption(
                    "Natural disaster death tolls by year",
                    ("sans-serif", 28).into_font(),
                )
                .margin(20)
                .x_label_area_size(40)
                .y_label_area_size(90)
                .build_cartesian_2d(first - 1..last + 1, (1f64..top).log_scale())?;
            chart
                .configure_mesh()
                .x_desc("Year")
                .y_desc("Estimated death toll")
                .draw()?;

            for (idx, (category, points)) in by_category.iter().enumerate() {
                let color = Palette99::pick(idx).to_rgba();
                chart
                    .draw_series(
                        points
                            .iter()
                            .map(|&(year, toll)| Circle::new((year, toll), 5, color.filled())),
                    )?
                    .label(*category)
                    .legend(move |(x, y)| Circle::new((x, y), 5, color.filled()));
            }
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()?;
            root.present()?;
        }
        out.write_all(svg.as_bytes()).context("writing chart")?;
        Ok(())
    }
}

pub fn renderer_for(format: Format, source: &str) -> Box<dyn Renderer> {
    match format {
        Format::Csv => Box::new(CsvRenderer),
        Format::Json => Box::new(JsonRenderer {
            source: source.to_string(),
        }),
        Format::Summary => Box::new(SummaryRenderer),
        Format::Chart => Box::new(ChartRenderer::default()),
    }
}

/// Render to `path`, or to stdout when no path is given.
pub fn render_to(
    renderer: &dyn Renderer,
    records: &[CanonicalRecord],
    path: Option<&Path>,
) -> Result<()> {
    match path {
        Some(p) => {
            let file = File::create(p).with_context(|| format!("creating {}", p.display()))?;
            let mut w = BufWriter::new(file);
            renderer.render(records, &mut w)?;
            w.flush()?;
            info!(path = %p.display(), records = records.len(), "wrote output");
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            renderer.render(records, &mut lock)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn records() -> Vec<CanonicalRecord> {
        vec![
            CanonicalRecord {
                year: 1931,
                magnitude: 2_500_000,
                event: "1931 china floods".into(),
                category: "flood".into(),
            },
            CanonicalRecord {
                year: 1970,
                magnitude: 400_000,
                event: "bhola cyclone, east pakistan".into(),
                category: "tropical cyclone".into(),
            },
            CanonicalRecord {
                year: 1998,
                magnitude: 4_150,
                event: "yangtze floods".into(),
                category: "flood".into(),
            },
        ]
    }

    fn render(renderer: &dyn Renderer) -> String {
        let mut buf = Vec::new();
        renderer.render(&records(), &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn csv_has_header_and_quotes_commas() {
        let text = render(&CsvRenderer);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "year,magnitude,event,category");
        assert_eq!(lines[1], "1931,2500000,1931 china floods,flood");
        assert_eq!(lines[2], "1970,400000,\"bhola cyclone, east pakistan\",tropical cyclone");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn json_round_trips_records() {
        let text = render(&JsonRenderer {
            source: "test".into(),
        });
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["record_count"], 3);
        assert_eq!(v["source"], "test");
        let back: Vec<CanonicalRecord> = serde_json::from_value(v["records"].clone()).unwrap();
        assert_eq!(back, records());
    }

    #[test]
    fn summary_groups_by_category() {
        let text = render(&SummaryRenderer);
        let flood = text.lines().find(|l| l.starts_with("flood")).unwrap();
        let cols: Vec<_> = flood.split_whitespace().collect();
        assert_eq!(cols, vec!["flood", "2", "2504150", "1931-1998"]);
        let total = text.lines().last().unwrap();
        assert!(total.starts_with("total"));
        assert!(total.ends_with("2904150"));
    }

    #[test]
    fn chart_plots_one_marker_per_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tolls.svg");
        render_to(&ChartRenderer::default(), &records(), Some(path.as_path())).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("tropical cyclone"));
        assert!(svg.matches("<circle").count() >= records().len());
    }

    #[test]
    fn chart_of_no_records_still_renders() {
        let mut buf = Vec::new();
        ChartRenderer::default().render(&[], &mut buf).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("</svg>"));
    }

    #[test]
    fn render_to_file_writes_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tolls.csv");
        render_to(&CsvRenderer, &records(), Some(path.as_path())).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 4);
    }
}
