//! Minimal OOXML (.xlsx) reader producing a [`Grid`] for the first sheet.
//!
//! Only what the timetable interpreter needs is decoded: cell text (shared,
//! inline or raw values) and the fill colour of each cell's style. Formulas,
//! number formats and every sheet after the first are ignored.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use anyhow::{anyhow, ensure, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use super::{Cell, Grid, Row};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const STYLES_PART: &str = "xl/styles.xml";
const FALLBACK_SHEET_PART: &str = "xl/worksheets/sheet1.xml";

/// Open an .xlsx file and read its first sheet.
pub fn read_workbook(path: impl AsRef<Path>) -> Result<Grid> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("failed to open workbook {}", path.display()))?;
    read_workbook_from_reader(BufReader::new(file))
        .with_context(|| format!("failed to read workbook {}", path.display()))
}

pub fn read_workbook_from_reader<R: Read + Seek>(reader: R) -> Result<Grid> {
    let mut archive = ZipArchive::new(reader).context("not a valid xlsx (zip) package")?;

    let workbook_xml = read_part(&mut archive, WORKBOOK_PART)?
        .ok_or_else(|| anyhow!("workbook part {WORKBOOK_PART} is missing"))?;
    let workbook = parse_workbook(&workbook_xml)?;

    let sheet_part = match (&workbook.first_sheet_rel, read_part(&mut archive, WORKBOOK_RELS_PART)?) {
        (Some(rel_id), Some(rels_xml)) => parse_relationships(&rels_xml)?
            .remove(rel_id)
            .map(|target| resolve_target(&target))
            .unwrap_or_else(|| FALLBACK_SHEET_PART.to_string()),
        _ => FALLBACK_SHEET_PART.to_string(),
    };

    let shared_strings = match read_part(&mut archive, SHARED_STRINGS_PART)? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };
    let fills = match read_part(&mut archive, STYLES_PART)? {
        Some(xml) => parse_style_fills(&xml)?,
        None => Vec::new(),
    };

    let sheet_xml = read_part(&mut archive, &sheet_part)?
        .ok_or_else(|| anyhow!("no sheets found in workbook (missing {sheet_part})"))?;
    let rows = parse_sheet(&sheet_xml, &shared_strings, &fills)?;

    log::debug!(
        "read {} rows from {} (date1904={})",
        rows.len(),
        sheet_part,
        workbook.date1904
    );

    Ok(Grid::new(rows).with_date1904(workbook.date1904))
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(anyhow::Error::new(err).context(format!("failed to open {name}"))),
    };
    let mut contents = String::new();
    entry
        .read_to_string(&mut contents)
        .with_context(|| format!("failed to decode {name}"))?;
    Ok(Some(contents))
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.context("malformed xml attribute")?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

#[derive(Debug, Default)]
struct WorkbookInfo {
    date1904: bool,
    first_sheet_rel: Option<String>,
}

fn parse_workbook(xml: &str) -> Result<WorkbookInfo> {
    let mut reader = Reader::from_str(xml);
    let mut info = WorkbookInfo::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).context("malformed workbook.xml")? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"workbookPr" => {
                    info.date1904 = matches!(
                        attribute(e, b"date1904")?.as_deref(),
                        Some("1") | Some("true")
                    );
                }
                b"sheet" if info.first_sheet_rel.is_none() => {
                    info.first_sheet_rel = attribute(e, b"id")?;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(info)
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).context("malformed workbook relationships")? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attribute(e, b"Id")?, attribute(e, b"Target")?) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(targets)
}

/// Each `<si>` becomes one string; rich-text runs are concatenated and
/// phonetic (`<rPh>`) runs are skipped.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).context("malformed sharedStrings.xml")? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic_depth += 1,
                b"t" => in_text = phonetic_depth == 0,
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(ref t) if in_text => {
                if let Some(value) = current.as_mut() {
                    value.push_str(&t.unescape()?);
                }
            }
            Event::CData(ref t) if in_text => {
                if let Some(value) = current.as_mut() {
                    value.push_str(&String::from_utf8_lossy(t));
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

#[derive(Debug, Default, Clone)]
struct FillSpec {
    pattern: Option<String>,
    fg_color: Option<String>,
    gradient: bool,
}

impl FillSpec {
    fn identifier(&self, fill_id: usize) -> String {
        if self.gradient {
            return format!("gradient:{fill_id}");
        }
        match self.pattern.as_deref() {
            None | Some("none") => String::new(),
            Some(_) => self.fg_color.clone().unwrap_or_default(),
        }
    }
}

fn color_identifier(element: &BytesStart<'_>) -> Result<Option<String>> {
    let tint = attribute(element, b"tint")?
        .filter(|tint| tint.parse::<f64>().map(|v| v != 0.0).unwrap_or(true));
    let with_tint = |base: String| match &tint {
        Some(tint) => format!("{base}:{tint}"),
        None => base,
    };

    if let Some(rgb) = attribute(element, b"rgb")? {
        return Ok(Some(rgb));
    }
    if let Some(theme) = attribute(element, b"theme")? {
        return Ok(Some(with_tint(format!("theme:{theme}"))));
    }
    if let Some(indexed) = attribute(element, b"indexed")? {
        return Ok(Some(with_tint(format!("indexed:{indexed}"))));
    }
    if attribute(element, b"auto")?.is_some() {
        return Ok(Some("auto".to_string()));
    }
    Ok(None)
}

/// Resolve every `cellXfs` entry to the fill identifier of its `fillId`.
fn parse_style_fills(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut fills: Vec<FillSpec> = Vec::new();
    let mut xf_fill_ids: Vec<usize> = Vec::new();
    let mut in_fills = false;
    let mut in_cell_xfs = false;
    let mut current_fill: Option<FillSpec> = None;
    let mut buf = Vec::new();

    loop {
        {
            let event = reader.read_event_into(&mut buf).context("malformed styles.xml")?;
            let is_empty = matches!(event, Event::Empty(_));
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"fills" if !is_empty => in_fills = true,
                    b"cellXfs" if !is_empty => in_cell_xfs = true,
                    b"fill" if in_fills => {
                        if is_empty {
                            fills.push(FillSpec::default());
                        } else {
                            current_fill = Some(FillSpec::default());
                        }
                    }
                    b"patternFill" => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.pattern = attribute(e, b"patternType")?;
                        }
                    }
                    b"gradientFill" => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.gradient = true;
                        }
                    }
                    b"fgColor" => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.fg_color = color_identifier(e)?;
                        }
                    }
                    b"xf" if in_cell_xfs => {
                        let fill_id = attribute(e, b"fillId")?
                            .and_then(|id| id.parse().ok())
                            .unwrap_or(0);
                        xf_fill_ids.push(fill_id);
                    }
                    _ => {}
                },
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"fills" => in_fills = false,
                    b"cellXfs" => in_cell_xfs = false,
                    b"fill" => {
                        if let Some(fill) = current_fill.take() {
                            fills.push(fill);
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }
        buf.clear();
    }

    Ok(xf_fill_ids
        .into_iter()
        .map(|fill_id| {
            fills
                .get(fill_id)
                .map(|fill| fill.identifier(fill_id))
                .unwrap_or_default()
        })
        .collect())
}

/// Last zero-based column (`XFD`) and row an xlsx sheet can address.
const MAX_COLUMN: usize = 16_383;
const MAX_ROW: usize = 1_048_575;

/// Split an A1 reference into zero-based `(column, row)`; `None` when the
/// reference is malformed or outside the sheet limits.
fn parse_cell_ref(reference: &str) -> Option<(usize, Option<usize>)> {
    let letters = reference
        .chars()
        .take_while(char::is_ascii_alphabetic)
        .count();
    if letters == 0 {
        return None;
    }
    let column = reference[..letters]
        .bytes()
        .try_fold(0usize, |acc, b| {
            acc.checked_mul(26)?
                .checked_add(usize::from(b.to_ascii_uppercase() - b'A') + 1)
        })?
        - 1;
    if column > MAX_COLUMN {
        return None;
    }
    let digits = &reference[letters..];
    let row = if digits.is_empty() {
        None
    } else {
        Some(row_index(digits)?)
    };
    Some((column, row))
}

/// One-based row number text to a bounded zero-based index.
fn row_index(number: &str) -> Option<usize> {
    number
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|r| r.checked_sub(1))
        .filter(|&r| r <= MAX_ROW)
}

#[derive(Debug, Default)]
struct PendingCell {
    column: usize,
    style: usize,
    kind: Option<String>,
    raw: String,
}

fn place_cell(row: &mut Row, column: usize, cell: Cell) {
    if row.cells.len() <= column {
        row.cells.resize_with(column + 1, Cell::default);
    }
    row.cells[column] = cell;
}

fn finish_cell(pending: PendingCell, shared_strings: &[String], fills: &[String]) -> Cell {
    let value = match pending.kind.as_deref() {
        Some("s") => pending
            .raw
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|index| shared_strings.get(index))
            .cloned()
            .unwrap_or_default(),
        _ => pending.raw,
    };
    let fill_color = fills.get(pending.style).cloned().unwrap_or_default();
    Cell { value, fill_color }
}

fn parse_sheet(xml: &str, shared_strings: &[String], fills: &[String]) -> Result<Vec<Row>> {
    let mut reader = Reader::from_str(xml);
    let mut rows: Vec<Row> = Vec::new();
    let mut current_row: Option<(usize, Row)> = None;
    let mut pending: Option<PendingCell> = None;
    let mut next_row_index = 0usize;
    let mut next_column = 0usize;
    let mut in_value = false;
    let mut phonetic_depth = 0usize;
    let mut buf = Vec::new();

    loop {
        {
            let event = reader.read_event_into(&mut buf).context("malformed worksheet xml")?;
            let is_empty = matches!(event, Event::Empty(_));
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"row" => {
                        let index = match attribute(e, b"r")? {
                            Some(r) => row_index(&r).ok_or_else(|| anyhow!("invalid row number '{r}'"))?,
                            None => next_row_index,
                        };
                        ensure!(index <= MAX_ROW, "worksheet has more than {} rows", MAX_ROW + 1);
                        next_row_index = index + 1;
                        next_column = 0;
                        if is_empty {
                            store_row(&mut rows, index, Row::default());
                        } else {
                            current_row = Some((index, Row::default()));
                        }
                    }
                    b"c" => {
                        let column = match attribute(e, b"r")? {
                            Some(r) => parse_cell_ref(&r)
                                .map(|(column, _)| column)
                                .ok_or_else(|| anyhow!("invalid cell reference '{r}'"))?,
                            None => next_column,
                        };
                        ensure!(column <= MAX_COLUMN, "row {} has more than {} columns", next_row_index, MAX_COLUMN + 1);
                        next_column = column + 1;
                        let cell = PendingCell {
                            column,
                            style: attribute(e, b"s")?.and_then(|s| s.parse().ok()).unwrap_or(0),
                            kind: attribute(e, b"t")?,
                            raw: String::new(),
                        };
                        if is_empty {
                            if let Some((_, row)) = current_row.as_mut() {
                                let column = cell.column;
                                place_cell(row, column, finish_cell(cell, shared_strings, fills));
                            }
                        } else {
                            pending = Some(cell);
                        }
                    }
                    b"rPh" if !is_empty => phonetic_depth += 1,
                    b"v" | b"t" if !is_empty && pending.is_some() => in_value = phonetic_depth == 0,
                    _ => {}
                },
                Event::Text(ref t) if in_value => {
                    if let Some(cell) = pending.as_mut() {
                        cell.raw.push_str(&t.unescape()?);
                    }
                }
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"v" | b"t" => in_value = false,
                    b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                    b"c" => {
                        if let (Some(cell), Some((_, row))) = (pending.take(), current_row.as_mut()) {
                            let column = cell.column;
                            place_cell(row, column, finish_cell(cell, shared_strings, fills));
                        }
                    }
                    b"row" => {
                        if let Some((index, row)) = current_row.take() {
                            store_row(&mut rows, index, row);
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }
        buf.clear();
    }

    Ok(rows)
}

fn store_row(rows: &mut Vec<Row>, index: usize, row: Row) {
    if rows.len() <= index {
        rows.resize_with(index + 1, Row::default);
    }
    rows[index] = row;
}
