//! In-memory OOXML packages for tests.

use crate::ocr::tests::sample_png;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Zip the given `(name, bytes)` entries.
pub(crate) fn zip_package(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A PPTX with one slide per `(text, has_picture)` entry.
///
/// Slide parts are numbered in reverse so that presentation order differs
/// from part-name order.
pub(crate) fn sample_pptx(slides: &[(&str, bool)]) -> Vec<u8> {
    let n = slides.len();
    let mut ids = String::new();
    let mut rels = String::new();
    let mut entries: Vec<(String, Vec<u8>)> = Vec::new();

    for (i, (text, has_picture)) in slides.iter().enumerate() {
        let part = n - i;
        ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, 10 + i));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{part}.xml"/>"#,
            10 + i
        ));

        let mut shapes = String::new();
        if !text.is_empty() {
            shapes.push_str(&format!(
                "<p:sp><p:txBody><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp>"
            ));
        }
        if *has_picture {
            shapes.push_str(r#"<p:pic><p:blipFill><a:blip r:embed="rId2"/></p:blipFill></p:pic>"#);
            entries.push((
                format!("ppt/slides/_rels/slide{part}.xml.rels"),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image{part}.png"/></Relationships>"#
                )
                .into_bytes(),
            ));
            entries.push((format!("ppt/media/image{part}.png"), sample_png()));
        }

        entries.push((
            format!("ppt/slides/slide{part}.xml"),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>{shapes}</p:spTree></p:cSld></p:sld>"#
            )
            .into_bytes(),
        ));
    }

    entries.push((
        "ppt/presentation.xml".to_string(),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:presentation xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#
        )
        .into_bytes(),
    ));
    entries.push((
        "ppt/_rels/presentation.xml.rels".to_string(),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
        )
        .into_bytes(),
    ));

    let borrowed: Vec<(&str, Vec<u8>)> = entries
        .iter()
        .map(|(name, data)| (name.as_str(), data.clone()))
        .collect();
    zip_package(&borrowed)
}

fn cell_ref(col: usize, row: usize) -> String {
    let letter = char::from(b'A' + u8::try_from(col).unwrap());
    format!("{letter}{row}")
}

/// Cell styles in `xl/styles.xml`: general, date (`14`) and date-time (`22`).
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?><styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="3"><xf numFmtId="0"></xf><xf numFmtId="14"></xf><xf numFmtId="22"></xf></cellXfs></styleSheet>"#;

/// An XLSX with the given sheets. Cells are inline strings, except
/// `#<style>:<number>` which is a numeric cell with that style index; an
/// empty string leaves the cell out.
pub(crate) fn sample_xlsx(sheets: &[(&str, Vec<Vec<&str>>)]) -> Vec<u8> {
    let mut workbook_sheets = String::new();
    let mut rels = String::new();
    let mut overrides = String::new();
    let mut entries: Vec<(String, Vec<u8>)> = Vec::new();

    for (i, (name, rows)) in sheets.iter().enumerate() {
        let n = i + 1;
        workbook_sheets.push_str(&format!(
            r#"<sheet name="{name}" sheetId="{n}" r:id="rId{n}"/>"#
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        ));
        overrides.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));

        let mut sheet_data = String::new();
        for (r, row) in rows.iter().enumerate() {
            sheet_data.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let cell = cell_ref(c, r + 1);
                match value.strip_prefix('#').and_then(|v| v.split_once(':')) {
                    Some((style, number)) => sheet_data.push_str(&format!(
                        r#"<c r="{cell}" s="{style}"><v>{number}</v></c>"#
                    )),
                    None => sheet_data.push_str(&format!(
                        r#"<c r="{cell}" t="inlineStr"><is><t xml:space="preserve">{value}</t></is></c>"#
                    )),
                }
            }
            sheet_data.push_str("</row>");
        }
        entries.push((
            format!("xl/worksheets/sheet{n}.xml"),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_data}</sheetData></worksheet>"#
            )
            .into_bytes(),
        ));
    }

    entries.push((
        "[Content_Types].xml".to_string(),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>{overrides}</Types>"#
        )
        .into_bytes(),
    ));
    entries.push(("xl/styles.xml".to_string(), STYLES.as_bytes().to_vec()));
    entries.push((
        "_rels/.rels".to_string(),
        br#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_vec(),
    ));
    entries.push((
        "xl/workbook.xml".to_string(),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{workbook_sheets}</sheets></workbook>"#
        )
        .into_bytes(),
    ));
    entries.push((
        "xl/_rels/workbook.xml.rels".to_string(),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
        )
        .into_bytes(),
    ));

    let borrowed: Vec<(&str, Vec<u8>)> = entries
        .iter()
        .map(|(name, data)| (name.as_str(), data.clone()))
        .collect();
    zip_package(&borrowed)
}
