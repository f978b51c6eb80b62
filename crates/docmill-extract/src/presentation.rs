//! PPTX extractor.
//!
//! Slides are read in `sldIdLst` order from `ppt/presentation.xml`. Only the
//! top-level shapes of each slide tree are considered: text comes from
//! [`ShapeKind::AutoShape`] text bodies, images from [`ShapeKind::Picture`]
//! blips resolved through the slide's relationships.

use async_trait::async_trait;
use docmill_core::{
    file_stem, total_elapsed, DocumentContent, DocumentExtractor, DocumentMetadata,
    DocumentRecord, ExtractError, ExtractedImage, FileKind, UnitKind,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::pdf::file_name;
use crate::unit::{UnitProcessor, UnitSource, UnitText};

const OVERALL_SUMMARY: &str = "PPTX extraction complete.";
const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

/// Extractor for PPTX files.
pub struct PresentationExtractor {
    processor: Arc<UnitProcessor>,
}

impl PresentationExtractor {
    /// Create a new presentation extractor.
    #[must_use]
    pub fn new(processor: Arc<UnitProcessor>) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl DocumentExtractor for PresentationExtractor {
    fn kind(&self) -> FileKind {
        FileKind::Presentation
    }

    async fn extract(&self, path: &Path) -> Result<DocumentRecord, ExtractError> {
        debug!("Extracting presentation: {:?}", path);
        let start = Instant::now();

        let bytes = tokio::fs::read(path).await?;
        let file_size = bytes.len() as u64;

        let source = tokio::task::spawn_blocking(move || PptxSource::load(bytes))
            .await
            .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))??;

        let slide_count = source.unit_count();
        let stem = file_stem(path);
        let slides = self.processor.process(&stem, Box::new(source)).await?;

        Ok(DocumentRecord {
            metadata: DocumentMetadata {
                file_name: file_name(path),
                file_type: FileKind::Presentation,
                file_size,
                unit_count: slide_count,
                rows_extracted: None,
            },
            content: DocumentContent::Slides(slides),
            overall_summary: OVERALL_SUMMARY.to_string(),
            total_time_taken: total_elapsed(start.elapsed()),
        })
    }
}

// ============================================================================
// Package model
// ============================================================================

/// Kind of a top-level slide shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// `p:sp`, including placeholders and text boxes
    AutoShape,
    /// `p:pic`
    Picture,
    /// `p:graphicFrame` (tables, charts, diagrams)
    GraphicFrame,
    /// `p:grpSp`
    Group,
    /// `p:cxnSp`
    Connector,
}

impl ShapeKind {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"sp" => Some(Self::AutoShape),
            b"pic" => Some(Self::Picture),
            b"graphicFrame" => Some(Self::GraphicFrame),
            b"grpSp" => Some(Self::Group),
            b"cxnSp" => Some(Self::Connector),
            _ => None,
        }
    }
}

/// A top-level shape of a slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub kind: ShapeKind,
    /// Paragraphs joined by `\n` (auto shapes only)
    pub text: String,
    /// Relationship id of the picture blip (pictures only)
    pub embed: Option<String>,
}

#[derive(Debug, Default)]
struct Slide {
    blocks: Vec<String>,
    /// Package paths of picture media, in shape order
    pictures: Vec<String>,
}

/// Opened PPTX package with parsed slides.
pub struct PptxSource {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    slides: Vec<Slide>,
}

impl PptxSource {
    /// Open a package and parse every slide's shape tree.
    pub fn load(bytes: Vec<u8>) -> Result<Self, ExtractError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ExtractError::Parse(format!("invalid PPTX package: {e}")))?;

        let presentation = read_part(&mut archive, PRESENTATION_PART)?;
        let rels = parse_relationships(&read_part(&mut archive, PRESENTATION_RELS)?)?;

        let mut slides = Vec::new();
        for rel_id in parse_slide_ids(&presentation)? {
            let target = rels.get(&rel_id).ok_or_else(|| {
                ExtractError::Parse(format!("slide relationship {rel_id} not found"))
            })?;
            let slide_path = resolve_target("ppt", target);
            slides.push(load_slide(&mut archive, &slide_path)?);
        }

        Ok(Self { archive, slides })
    }
}

impl UnitSource for PptxSource {
    fn unit_kind(&self) -> UnitKind {
        UnitKind::Slide
    }

    fn unit_count(&self) -> usize {
        self.slides.len()
    }

    fn unit_text(&mut self, index: usize) -> Result<UnitText, ExtractError> {
        let blocks = self.slides[index].blocks.clone();
        Ok(UnitText {
            text: blocks.join("\n"),
            blocks,
        })
    }

    fn unit_images(&mut self, index: usize) -> Result<Vec<ExtractedImage>, ExtractError> {
        let mut images = Vec::new();
        for media in self.slides[index].pictures.clone() {
            match read_binary(&mut self.archive, &media) {
                Ok(data) => images.push(ExtractedImage {
                    data,
                    ext: extension(&media),
                }),
                Err(e) => warn!("Skipping picture {} on slide {}: {}", media, index + 1, e),
            }
        }
        Ok(images)
    }
}

fn load_slide(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    slide_path: &str,
) -> Result<Slide, ExtractError> {
    let xml = read_part(archive, slide_path)?;
    let shapes = parse_shapes(&xml)?;

    let (dir, name) = slide_path.rsplit_once('/').unwrap_or(("", slide_path));
    let rels_path = format!("{dir}/_rels/{name}.rels");
    let rels = match read_part(archive, &rels_path) {
        Ok(xml) => parse_relationships(&xml)?,
        Err(_) => HashMap::new(),
    };

    let mut slide = Slide::default();
    for shape in shapes {
        match shape.kind {
            ShapeKind::AutoShape => {
                let text = shape.text.trim();
                if !text.is_empty() {
                    slide.blocks.push(text.to_string());
                }
            }
            ShapeKind::Picture => match shape.embed.as_ref().and_then(|id| rels.get(id)) {
                Some(target) => slide.pictures.push(resolve_target(dir, target)),
                None => warn!("Picture without media in {}", slide_path),
            },
            ShapeKind::GraphicFrame | ShapeKind::Group | ShapeKind::Connector => {}
        }
    }
    Ok(slide)
}

// ============================================================================
// XML parsing
// ============================================================================

fn xml_error(part: &str, e: impl std::fmt::Display) -> ExtractError {
    ExtractError::Parse(format!("{part}: {e}"))
}

/// Relationship ids of `p:sldId` entries, in presentation order.
fn parse_slide_ids(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut ids = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e))
                if e.local_name().as_ref() == b"sldId" =>
            {
                if let Some(id) = prefixed_attr(e, b"id") {
                    ids.push(id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(PRESENTATION_PART, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(ids)
}

/// `Id` to `Target` for a relationships part.
fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut rels = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attr(e, b"Id"), attr(e, b"Target")) {
                    rels.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("relationships", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

/// Top-level shapes of a slide's `p:spTree`, in document order.
pub fn parse_shapes(xml: &str) -> Result<Vec<Shape>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut shapes = Vec::new();
    let mut depth = 0usize;
    let mut tree_depth: Option<usize> = None;
    // (kind, depth, paragraphs, embed)
    let mut current: Option<(ShapeKind, usize, Vec<String>, Option<String>)> = None;
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                depth += 1;
                let name = e.local_name();
                let name = name.as_ref();

                if tree_depth.is_none() && name == b"spTree" {
                    tree_depth = Some(depth);
                } else if current.is_none() && tree_depth.is_some_and(|d| depth == d + 1) {
                    if let Some(kind) = ShapeKind::from_local_name(name) {
                        current = Some((kind, depth, Vec::new(), None));
                    }
                } else if let Some((kind, _, paragraphs, embed)) = current.as_mut() {
                    match (*kind, name) {
                        (ShapeKind::AutoShape, b"p") => paragraphs.push(String::new()),
                        (ShapeKind::AutoShape, b"t") => in_text_run = true,
                        (ShapeKind::Picture, b"blip") => *embed = prefixed_attr(e, b"embed"),
                        _ => {}
                    }
                }
            }
            Ok(Event::Empty(ref e)) => {
                if current.is_none() && tree_depth == Some(depth) {
                    if let Some(kind) = ShapeKind::from_local_name(e.local_name().as_ref()) {
                        shapes.push(Shape {
                            kind,
                            text: String::new(),
                            embed: None,
                        });
                    }
                } else if let Some((kind, _, paragraphs, embed)) = current.as_mut() {
                    match (*kind, e.local_name().as_ref()) {
                        (ShapeKind::AutoShape, b"br") => {
                            if let Some(p) = paragraphs.last_mut() {
                                p.push('\n');
                            }
                        }
                        (ShapeKind::AutoShape, b"p") => paragraphs.push(String::new()),
                        (ShapeKind::Picture, b"blip") => *embed = prefixed_attr(e, b"embed"),
                        _ => {}
                    }
                }
            }
            Ok(Event::Text(e)) if in_text_run => {
                if let Some((_, _, paragraphs, _)) = current.as_mut() {
                    let text = e.unescape().map_err(|err| xml_error("slide", err))?;
                    match paragraphs.last_mut() {
                        Some(p) => p.push_str(&text),
                        None => paragraphs.push(text.into_owned()),
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = false;
                }
                if current.as_ref().is_some_and(|(_, d, _, _)| *d == depth) {
                    if let Some((kind, _, paragraphs, embed)) = current.take() {
                        shapes.push(Shape {
                            kind,
                            text: paragraphs.join("\n"),
                            embed,
                        });
                    }
                }
                if tree_depth == Some(depth) {
                    tree_depth = None;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("slide", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(shapes)
}

/// Unprefixed attribute value.
fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Namespace-prefixed attribute value (`r:id`, `r:embed`).
fn prefixed_attr(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.prefix().is_some() && a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

// ============================================================================
// Package helpers
// ============================================================================

fn read_part(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    name: &str,
) -> Result<String, ExtractError> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| ExtractError::Parse(format!("missing part {name}: {e}")))?;
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(xml)
}

fn read_binary(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    name: &str,
) -> Result<Vec<u8>, ExtractError> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| ExtractError::Parse(format!("missing part {name}: {e}")))?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(data)
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

fn extension(part: &str) -> String {
    Path::new(part)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "bin".to_string())
}
