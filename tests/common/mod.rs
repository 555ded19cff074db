//! Writes small but genuine .xlsx packages for end-to-end tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Number(f64),
    Blank,
}

#[derive(Debug, Default)]
pub struct SheetBuilder {
    cells: BTreeMap<(usize, usize), (Value, Option<String>)>,
    fills: Vec<String>,
}

fn column_letters(mut column: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (column % 26) as u8) as char);
        if column < 26 {
            break;
        }
        column = column / 26 - 1;
    }
    letters.iter().rev().collect()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

impl SheetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&mut self, row: usize, column: usize, value: Value, fill: Option<&str>) -> &mut Self {
        if let Some(fill) = fill {
            if !self.fills.iter().any(|f| f == fill) {
                self.fills.push(fill.to_string());
            }
        }
        self.cells.insert((row, column), (value, fill.map(str::to_string)));
        self
    }

    pub fn text(&mut self, row: usize, column: usize, text: &str) -> &mut Self {
        self.put(row, column, Value::Text(text.to_string()), None)
    }

    pub fn filled(&mut self, row: usize, column: usize, text: &str, fill: &str) -> &mut Self {
        let value = if text.is_empty() {
            Value::Blank
        } else {
            Value::Text(text.to_string())
        };
        self.put(row, column, value, Some(fill))
    }

    pub fn number(&mut self, row: usize, column: usize, value: f64) -> &mut Self {
        self.put(row, column, Value::Number(value), None)
    }

    fn style_index(&self, fill: Option<&String>) -> usize {
        fill.and_then(|fill| self.fills.iter().position(|f| f == fill))
            .map(|index| index + 1)
            .unwrap_or(0)
    }

    fn styles_xml(&self) -> String {
        let mut fills = String::from(
            r#"<fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill>"#,
        );
        let mut xfs = String::from(r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>"#);
        for (index, rgb) in self.fills.iter().enumerate() {
            fills.push_str(&format!(
                r#"<fill><patternFill patternType="solid"><fgColor rgb="{rgb}"/><bgColor indexed="64"/></patternFill></fill>"#
            ));
            xfs.push_str(&format!(
                r#"<xf numFmtId="0" fontId="0" fillId="{}" borderId="0" applyFill="1"/>"#,
                index + 2
            ));
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="{}">{fills}</fills><borders count="1"><border/></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="{}">{xfs}</cellXfs></styleSheet>"#,
            self.fills.len() + 2,
            self.fills.len() + 1
        )
    }

    fn sheet_and_strings(&self) -> (String, String) {
        let mut strings: Vec<String> = Vec::new();
        let mut rows: BTreeMap<usize, String> = BTreeMap::new();

        for ((row, column), (value, fill)) in &self.cells {
            let reference = format!("{}{}", column_letters(*column), row + 1);
            let style = self.style_index(fill.as_ref());
            let cell = match value {
                Value::Text(text) => {
                    let index = strings.iter().position(|s| s == text).unwrap_or_else(|| {
                        strings.push(text.clone());
                        strings.len() - 1
                    });
                    format!(r#"<c r="{reference}" s="{style}" t="s"><v>{index}</v></c>"#)
                }
                Value::Number(number) => format!(r#"<c r="{reference}" s="{style}"><v>{number}</v></c>"#),
                Value::Blank => format!(r#"<c r="{reference}" s="{style}"/>"#),
            };
            rows.entry(*row).or_default().push_str(&cell);
        }

        let sheet_rows: String = rows
            .iter()
            .map(|(row, cells)| format!(r#"<row r="{}">{cells}</row>"#, row + 1))
            .collect();
        let sheet = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_rows}</sheetData></worksheet>"#
        );
        let items: String = strings
            .iter()
            .map(|s| format!("<si><t>{}</t></si>", escape(s)))
            .collect();
        let shared = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">{items}</sst>"#,
            strings.len()
        );
        (sheet, shared)
    }

    pub fn to_xlsx(&self) -> Vec<u8> {
        let (sheet, shared) = self.sheet_and_strings();
        let parts = [
            (
                "[Content_Types].xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#
                    .to_string(),
            ),
            (
                "xl/workbook.xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><workbookPr/><sheets><sheet name="Timetable" sheetId="1" r:id="rId1"/><sheet name="Notes" sheetId="2" r:id="rId2"/></sheets></workbook>"#
                    .to_string(),
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/></Relationships>"#
                    .to_string(),
            ),
            (
                "xl/worksheets/sheet2.xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>Time</t></is></c></row></sheetData></worksheet>"#
                    .to_string(),
            ),
            ("xl/worksheets/sheet1.xml", sheet),
            ("xl/sharedStrings.xml", shared),
            ("xl/styles.xml", self.styles_xml()),
        ];

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, contents) in parts {
            writer.start_file(name, options).expect("start zip entry");
            writer.write_all(contents.as_bytes()).expect("write zip entry");
        }
        writer.finish().expect("finish zip").into_inner()
    }
}

/// The layout every test starts from: title rows, one module table and the
/// anchor row of each week block (label row, `Time` row with weekday dates).
pub struct Layout {
    pub sheet: SheetBuilder,
    next_row: usize,
}

impl Layout {
    pub fn new(title: &str, subtitle: &str) -> Self {
        let mut sheet = SheetBuilder::new();
        sheet.text(0, 0, title).text(1, 0, subtitle);
        Self { sheet, next_row: 2 }
    }

    pub fn modules(&mut self, modules: &[(&str, &str, &str, &str, &str)]) -> &mut Self {
        let header = self.next_row;
        for (column, label) in ["CODE", "NAME", "CREDITS", "LEAD"].iter().enumerate() {
            self.sheet.text(header, column, label);
        }
        for (offset, (code, name, credits, lead, fill)) in modules.iter().enumerate() {
            let row = header + 1 + offset;
            self.sheet
                .filled(row, 0, code, fill)
                .text(row, 1, name)
                .text(row, 2, credits)
                .text(row, 3, lead);
        }
        // blank terminator row
        self.next_row = header + modules.len() + 2;
        self
    }

    /// Adds a 21-row block after `label`; returns its anchor (`Time`) row.
    pub fn week(&mut self, label: &str, monday_serial: f64) -> usize {
        let label_row = self.next_row;
        let anchor = label_row + 1;
        self.sheet.text(label_row, 0, label).text(anchor, 0, "Time");
        for day in 0..5 {
            self.sheet.number(anchor, 1 + day * 2, monday_serial + day as f64);
        }
        for (day, name) in ["Mon", "Tue", "Wed", "Thu", "Fri"].iter().enumerate() {
            self.sheet.text(anchor + 1, 1 + day * 2, name);
        }
        self.next_row = anchor + 21;
        anchor
    }
}
