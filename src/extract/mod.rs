// src/extract/mod.rs

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, trace};

use crate::config::ExtractSettings;
use crate::error::{ConfigError, Result};
use crate::normalize::rules::ANNOTATIONS;
use crate::record::{RawTable, RawValue};

/// Upper bound for `rowspan`/`colspan`; larger values are clamped.
const MAX_SPAN: usize = 1000;

/// Pull every data table out of `html`, in document order.
///
/// A table's section is the label of the nearest preceding heading whose tag
/// is in `settings.heading_levels`; tables before any such heading have none.
/// Selectors that do not parse are reported as a config error.
#[instrument(level = "info", skip(html, settings), fields(bytes = html.len()))]
pub fn extract_tables(html: &str, settings: &ExtractSettings) -> Result<Vec<RawTable>> {
    let table_sel = parse_selector(&settings.table_selector)?;
    let mut walk = settings.heading_levels.clone();
    walk.push(settings.table_selector.clone());
    let walk_sel = parse_selector(&walk.join(", "))?;

    let document = Html::parse_document(html);

    let mut section: Option<String> = None;
    let mut position = 0;
    let mut tables = Vec::new();
    for el in document.select(&walk_sel) {
        if !table_sel.matches(&el) {
            section = heading_label(el);
            trace!(?section, "heading");
            continue;
        }
        let table = parse_table(el, position, section.clone());
        position += 1;
        if !section_wanted(settings, table.section.as_deref()) {
            debug!(table = %table.describe(), "skipped by section filter");
            continue;
        }
        debug!(
            table = %table.describe(),
            columns = ?table.headers,
            rows = table.rows.len(),
            "extracted table"
        );
        tables.push(table);
    }
    info!(tables = tables.len(), seen = position, "extraction done");
    Ok(tables)
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| ConfigError::Invalid(format!("bad selector {:?}: {:?}", css, e)).into())
}

fn section_wanted(settings: &ExtractSettings, section: Option<&str>) -> bool {
    match (&settings.sections, section) {
        (None, _) | (_, None) => true,
        (Some(wanted), Some(label)) => wanted.iter().any(|w| w.eq_ignore_ascii_case(label)),
    }
}

/// `id` of the heading, else the `id` of an old-style `.mw-headline` child,
/// else its visible text with spaces turned into underscores.
fn heading_label(heading: ElementRef<'_>) -> Option<String> {
    if let Some(id) = heading.value().attr("id").filter(|id| !id.is_empty()) {
        return Some(id.to_string());
    }
    let headline = Selector::parse(".mw-headline[id]").expect("headline selector should parse");
    if let Some(id) = heading
        .select(&headline)
        .find_map(|h| h.value().attr("id"))
        .filter(|id| !id.is_empty())
    {
        return Some(id.to_string());
    }
    let text = ANNOTATIONS.apply(&cell_text(heading));
    let label = text.split_whitespace().collect::<Vec<_>>().join("_");
    (!label.is_empty()).then_some(label)
}

fn span_attr(cell: ElementRef<'_>, name: &str) -> usize {
    cell.value()
        .attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, MAX_SPAN)
}

fn is_hidden(el: ElementRef<'_>) -> bool {
    let name = el.value().name();
    if name == "style" || name == "script" {
        return true;
    }
    el.value()
        .attr("style")
        .map(|s| s.replace(' ', "").contains("display:none"))
        .unwrap_or(false)
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if child_el.value().name() == "br" {
                out.push(' ');
            } else if !is_hidden(child_el) {
                collect_text(child_el, out);
            }
        }
    }
}

/// Visible text of an element with whitespace collapsed.
fn cell_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(el, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rows that belong to `table` itself, not to a table nested in it.
fn own_rows<'a>(table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let tr = Selector::parse("tr").expect("tr selector should parse");
    table
        .select(&tr)
        .filter(|row| {
            row.ancestors()
                .filter_map(ElementRef::wrap)
                .find(|a| a.value().name() == "table")
                .map(|a| a.id() == table.id())
                .unwrap_or(false)
        })
        .collect()
}

/// Per column: rows still covered by a `rowspan` above, and the text.
type Carry = Vec<Option<(usize, Option<String>)>>;

/// Copy spanned cells from rows above until a free column is reached.
fn fill_carried(col: &mut usize, cells: &mut Vec<Option<String>>, carry: &mut Carry) {
    while let Some(Some((left, text))) = carry.get_mut(*col) {
        cells.push(text.clone());
        *left -= 1;
        if *left == 0 {
            carry[*col] = None;
        }
        *col += 1;
    }
}

struct GridRow {
    header: bool,
    cells: Vec<Option<String>>,
}

/// Lay the table out as a dense grid, copying spanned cells into every slot
/// they cover.
fn expand_grid(table: ElementRef<'_>) -> Vec<GridRow> {
    let mut carry: Carry = Vec::new();
    let mut grid = Vec::new();

    for row in own_rows(table) {
        let mut cells: Vec<Option<String>> = Vec::new();
        let mut header = true;
        let mut col = 0;

        for cell in row.children().filter_map(ElementRef::wrap) {
            let name = cell.value().name();
            if name != "td" && name != "th" {
                continue;
            }
            header &= name == "th";
            fill_carried(&mut col, &mut cells, &mut carry);

            let text = Some(cell_text(cell)).filter(|t| !t.is_empty());
            let rowspan = span_attr(cell, "rowspan");
            for _ in 0..span_attr(cell, "colspan") {
                cells.push(text.clone());
                if carry.len() <= col {
                    carry.resize(col + 1, None);
                }
                if rowspan > 1 {
                    carry[col] = Some((rowspan - 1, text.clone()));
                }
                col += 1;
            }
        }
        // trailing columns covered from rows above
        while col < carry.len() {
            if carry[col].is_some() {
                fill_carried(&mut col, &mut cells, &mut carry);
            } else {
                cells.push(None);
                col += 1;
            }
        }
        if cells.iter().all(Option::is_none) {
            continue;
        }
        grid.push(GridRow { header, cells });
    }
    grid
}

fn parse_table(table: ElementRef<'_>, position: usize, section: Option<String>) -> RawTable {
    let grid = expand_grid(table);
    let header_rows = match grid.iter().position(|r| !r.header) {
        Some(0) => 1,
        Some(n) => n,
        None => grid.len(),
    };
    let width = grid[..header_rows]
        .iter()
        .map(|r| r.cells.len())
        .max()
        .unwrap_or(0);

    let headers = (0..width)
        .map(|c| {
            let mut parts: Vec<&str> = Vec::new();
            for row in &grid[..header_rows] {
                if let Some(Some(t)) = row.cells.get(c) {
                    if parts.last() != Some(&t.as_str()) {
                        parts.push(t);
                    }
                }
            }
            parts.join(" ")
        })
        .collect::<Vec<_>>();

    let rows = grid[header_rows..]
        .iter()
        .map(|r| {
            let mut cells: Vec<Option<RawValue>> = r
                .cells
                .iter()
                .take(width)
                .map(|c| c.as_deref().map(RawValue::from))
                .collect();
            cells.resize(width, None);
            cells
        })
        .collect();

    RawTable {
        position,
        section,
        headers,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    fn text(v: &Option<RawValue>) -> Option<String> {
        v.as_ref().map(RawValue::as_text)
    }

    const PAGE: &str = r#"
<html><body>
<h2 id="Deadliest_by_year">Deadliest natural disasters by year</h2>
<table class="wikitable">
  <tr><th>Year</th><th>Death toll</th><th>Event</th></tr>
  <tr><td>1931</td><td>1,000,000–4,000,000<sup class="reference">[3]</sup></td><td>1931 China floods</td></tr>
</table>
<div class="mw-heading mw-heading3"><h3 id="20th_century">20th century</h3></div>
<table class="wikitable">
  <thead><tr><th>Death toll</th><th>Event</th><th>Year</th></tr></thead>
  <tbody><tr><td>230,000</td><td>Tangshan<br>earthquake</td><td>1976</td></tr></tbody>
</table>
<table class="infobox"><tr><th>ignored</th></tr><tr><td>x</td></tr></table>
<h3><span class="mw-headline" id="Avalanches">Avalanches</span><span class="mw-editsection">[edit]</span></h3>
<table class="wikitable sortable">
  <tr><th>Year</th><th>Event</th></tr>
  <tr><td>1970</td><td>Huascarán</td></tr>
</table>
</body></html>"#;

    #[test]
    fn tables_inherit_preceding_heading() {
        let tables = extract_tables(PAGE, &ExtractSettings::default()).unwrap();
        assert_eq!(tables.len(), 3);
        assert_eq!(tables[0].section, None);
        assert_eq!(tables[1].section.as_deref(), Some("20th_century"));
        assert_eq!(tables[2].section.as_deref(), Some("Avalanches"));
        assert_eq!(tables.iter().map(|t| t.position).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn headers_and_cells_are_text() {
        let tables = extract_tables(PAGE, &ExtractSettings::default()).unwrap();
        assert_eq!(tables[0].headers, vec!["Year", "Death toll", "Event"]);
        assert_eq!(
            text(&tables[0].rows[0][1]).as_deref(),
            Some("1,000,000–4,000,000[3]")
        );
        assert_eq!(text(&tables[1].rows[0][1]).as_deref(), Some("Tangshan earthquake"));
    }

    #[test]
    fn section_filter_keeps_unlabelled_first_table() {
        let settings = ExtractSettings {
            sections: Some(vec!["avalanches".to_string()]),
            ..ExtractSettings::default()
        };
        let tables = extract_tables(PAGE, &settings).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].section, None);
        assert_eq!(tables[1].section.as_deref(), Some("Avalanches"));
        assert_eq!(tables[1].position, 2);
    }

    #[test]
    fn heading_text_is_used_without_ids() {
        let html = r#"<h3>Tropical cyclones <span>[edit]</span></h3>
<table class="wikitable"><tr><th>Year</th></tr><tr><td>1970</td></tr></table>"#;
        let tables = extract_tables(html, &ExtractSettings::default()).unwrap();
        assert_eq!(tables[0].section.as_deref(), Some("Tropical_cyclones"));
    }

    #[test]
    fn rowspan_and_colspan_are_expanded() {
        let html = r#"<table class="wikitable">
<tr><th>Year</th><th>Death toll</th><th>Event</th></tr>
<tr><td rowspan="2">1900</td><td>8,000</td><td>Galveston hurricane</td></tr>
<tr><td>400</td><td>Other</td></tr>
<tr><td colspan="2">unknown</td><td>Third</td></tr>
<tr><td>1901</td><td></td></tr>
</table>"#;
        let t = &extract_tables(html, &ExtractSettings::default()).unwrap()[0];
        let rows: Vec<Vec<Option<String>>> = t
            .rows
            .iter()
            .map(|r| r.iter().map(text).collect())
            .collect();
        let s = |v: &str| Some(v.to_string());
        assert_eq!(rows[0], vec![s("1900"), s("8,000"), s("Galveston hurricane")]);
        assert_eq!(rows[1], vec![s("1900"), s("400"), s("Other")]);
        assert_eq!(rows[2], vec![s("unknown"), s("unknown"), s("Third")]);
        // short row padded, empty cell missing
        assert_eq!(rows[3], vec![s("1901"), None, None]);
    }

    #[test]
    fn nested_table_rows_are_not_mixed_in() {
        let html = r#"<table class="wikitable">
<tr><th>Year</th><th>Event</th></tr>
<tr><td>1950</td><td><table><tr><td>inner</td></tr></table></td></tr>
</table>"#;
        let t = &extract_tables(html, &ExtractSettings::default()).unwrap()[0];
        assert_eq!(t.rows.len(), 1);
        assert_eq!(text(&t.rows[0][1]).as_deref(), Some("inner"));
    }

    #[test]
    fn multi_row_headers_are_joined() {
        let html = r#"<table class="wikitable">
<tr><th rowspan="2">Year</th><th colspan="2">Death toll</th></tr>
<tr><th>Low</th><th>High</th></tr>
<tr><td>1920</td><td>1</td><td>2</td></tr>
</table>"#;
        let t = &extract_tables(html, &ExtractSettings::default()).unwrap()[0];
        assert_eq!(t.headers, vec!["Year", "Death toll Low", "Death toll High"]);
        assert_eq!(t.rows.len(), 1);
    }

    #[test]
    fn hidden_sort_keys_are_skipped() {
        let html = r#"<table class="wikitable">
<tr><th>Death toll</th></tr>
<tr><td><span style="display: none">0000500</span>500</td></tr>
</table>"#;
        let t = &extract_tables(html, &ExtractSettings::default()).unwrap()[0];
        assert_eq!(text(&t.rows[0][0]).as_deref(), Some("500"));
    }

    #[test]
    fn bad_selector_is_a_config_error() {
        let settings = ExtractSettings {
            table_selector: "table[[".to_string(),
            ..ExtractSettings::default()
        };
        let err = extract_tables(PAGE, &settings).unwrap_err();
        assert!(matches!(err, PipelineError::Config(ConfigError::Invalid(_))));
    }
}
