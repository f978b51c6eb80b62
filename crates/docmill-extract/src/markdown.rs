//! Markdown extractor.
//!
//! A pure structural parse into [`ContentBlock`]s: headings, paragraphs,
//! lists and code blocks, in document order. Nested list items are flattened
//! into the outermost list; paragraphs inside items become item text.

use async_trait::async_trait;
use docmill_core::{
    total_elapsed, ContentBlock, DocumentContent, DocumentExtractor, DocumentMetadata,
    DocumentRecord, ExtractError, FileKind,
};
use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

use crate::pdf::file_name;

const OVERALL_SUMMARY: &str = "Markdown extraction complete.";

/// Extractor for Markdown files.
pub struct MarkdownExtractor;

impl MarkdownExtractor {
    /// Create a new Markdown extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for MarkdownExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentExtractor for MarkdownExtractor {
    fn kind(&self) -> FileKind {
        FileKind::Markdown
    }

    async fn extract(&self, path: &Path) -> Result<DocumentRecord, ExtractError> {
        debug!("Extracting Markdown: {:?}", path);
        let start = Instant::now();

        let text = tokio::fs::read_to_string(path).await?;
        let blocks = parse_blocks(&text);

        Ok(DocumentRecord {
            metadata: DocumentMetadata {
                file_name: file_name(path),
                file_type: FileKind::Markdown,
                file_size: text.len() as u64,
                unit_count: blocks.len(),
                rows_extracted: None,
            },
            content: DocumentContent::Blocks(blocks),
            overall_summary: OVERALL_SUMMARY.to_string(),
            total_time_taken: total_elapsed(start.elapsed()),
        })
    }
}

/// An open list: all items collected so far, including nested ones.
struct OpenList {
    ordered: bool,
    items: Vec<String>,
}

/// Parse Markdown into structural blocks.
#[must_use]
pub fn parse_blocks(markdown: &str) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();
    let mut text = String::new();

    let mut list: Option<OpenList> = None;
    let mut list_depth = 0usize;
    // One buffer per open item, innermost last
    let mut items: Vec<String> = Vec::new();
    let mut code: Option<Option<String>> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::List(start)) => {
                if list_depth == 0 {
                    list = Some(OpenList {
                        ordered: start.is_some(),
                        items: Vec::new(),
                    });
                } else if let (Some(open), Some(current)) = (list.as_mut(), items.last_mut()) {
                    // Text before a nested list is its own item
                    push_item(&mut open.items, current);
                }
                list_depth += 1;
            }
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                if list_depth == 0 {
                    if let Some(open) = list.take() {
                        blocks.push(ContentBlock::List {
                            ordered: open.ordered,
                            items: open.items,
                        });
                    }
                }
            }
            Event::Start(Tag::Item) => items.push(String::new()),
            Event::End(TagEnd::Item) => {
                if let (Some(open), Some(mut current)) = (list.as_mut(), items.pop()) {
                    push_item(&mut open.items, &mut current);
                }
            }
            Event::Start(Tag::Paragraph) => {
                if let Some(current) = items.last_mut() {
                    if !current.trim().is_empty() {
                        current.push('\n');
                    }
                } else {
                    text.clear();
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if items.is_empty() {
                    let paragraph = text.trim();
                    if !paragraph.is_empty() {
                        blocks.push(ContentBlock::Paragraph {
                            text: paragraph.to_string(),
                        });
                    }
                    text.clear();
                }
            }
            Event::Start(Tag::Heading { .. }) if items.is_empty() => text.clear(),
            // Inside a list item the heading text stays part of the item
            Event::End(TagEnd::Heading(level)) if items.is_empty() => {
                blocks.push(ContentBlock::Heading {
                    level: level as u8,
                    text: text.trim().to_string(),
                });
                text.clear();
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                code = Some(language);
                text.clear();
            }
            Event::End(TagEnd::CodeBlock) => {
                let language = code.take().flatten();
                if let Some(current) = items.last_mut() {
                    current.push_str(text.trim_end());
                } else {
                    blocks.push(ContentBlock::CodeBlock {
                        language,
                        code: text.clone(),
                    });
                }
                text.clear();
            }
            Event::Text(s) | Event::Code(s) => {
                if code.is_none() {
                    if let Some(current) = items.last_mut() {
                        current.push_str(&s);
                        continue;
                    }
                }
                text.push_str(&s);
            }
            Event::SoftBreak | Event::HardBreak => match items.last_mut() {
                Some(current) if code.is_none() => current.push('\n'),
                _ => text.push('\n'),
            },
            _ => {}
        }
    }

    blocks
}

fn push_item(items: &mut Vec<String>, current: &mut String) {
    let item = current.trim();
    if !item.is_empty() {
        items.push(item.to_string());
    }
    current.clear();
}
