//! Markdown extractor.
//!
//! Uses pulldown-cmark to walk the markdown event stream and map it onto
//! content blocks. Formula markers are ordinary text to the markdown parser
//! (`\f` is not an escape sequence), so they reach paragraph text verbatim.

use super::Extractor;
use crate::error::Result;
use crate::model::{ContentBlock, Document};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser as MdParser, Tag, TagEnd};
use std::fs;
use std::mem;
use std::path::Path;

/// Extracts headings, paragraphs, images, lists, code and tables from
/// markdown.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownExtractor {
    front_matter: bool,
}

impl MarkdownExtractor {
    /// Create a markdown extractor that reads front matter.
    pub fn new() -> Self {
        Self { front_matter: true }
    }

    /// Enable or disable `---` front matter.
    pub fn with_front_matter(mut self, enabled: bool) -> Self {
        self.front_matter = enabled;
        self
    }

    /// Build a document from markdown already in memory.
    pub fn extract_str(&self, source: &str) -> Document {
        let mut options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        if self.front_matter {
            options |= Options::ENABLE_YAML_STYLE_METADATA_BLOCKS;
        }

        let mut builder = BlockBuilder::default();
        for event in MdParser::new_ext(source, options) {
            builder.handle(event);
        }
        builder.finish()
    }
}

impl Default for MarkdownExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for MarkdownExtractor {
    fn name(&self) -> &str {
        "markdown"
    }

    fn extract(&self, path: &Path) -> Result<Document> {
        let source = fs::read_to_string(path)?;
        Ok(self.extract_str(&source))
    }
}

/// An image seen inside a paragraph.
struct PendingImage {
    path: String,
    title: String,
    alt: String,
}

struct ListFrame {
    ordered: bool,
    items: Vec<String>,
}

#[derive(Default)]
struct BlockBuilder {
    doc: Document,
    first_h1: Option<String>,

    /// Text of the paragraph, heading, list item or table cell being built
    text: String,
    in_paragraph: bool,
    heading: Option<u8>,
    images: Vec<PendingImage>,
    image: Option<PendingImage>,

    lists: Vec<ListFrame>,

    code: Option<(Option<String>, String)>,

    table: Option<Vec<Vec<String>>>,
    row: Vec<String>,

    in_metadata: bool,
}

impl BlockBuilder {
    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => self.push_text(&code),
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.push_text("\n"),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.in_paragraph = true;
                if self.lists.is_empty() {
                    self.text.clear();
                }
            }
            Tag::Heading { level, .. } => {
                self.text.clear();
                self.heading = Some(level as u8);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some(PendingImage {
                    path: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                });
            }
            Tag::List(start) => {
                if let Some(parent) = self.lists.last_mut() {
                    let pending = mem::take(&mut self.text);
                    if !pending.trim().is_empty() {
                        parent.items.push(pending.trim().to_string());
                    }
                } else {
                    self.text.clear();
                }
                self.lists.push(ListFrame {
                    ordered: start.is_some(),
                    items: Vec::new(),
                });
            }
            Tag::Item => self.text.clear(),
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                };
                self.code = Some((language, String::new()));
            }
            Tag::Table(_) => self.table = Some(Vec::new()),
            Tag::TableHead | Tag::TableRow => self.row.clear(),
            Tag::TableCell => self.text.clear(),
            Tag::MetadataBlock(_) => self.in_metadata = true,
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.in_paragraph = false;
                if self.lists.is_empty() {
                    self.flush_paragraph();
                } else {
                    self.text.push(' ');
                }
            }
            TagEnd::Heading(_) => {
                let text = mem::take(&mut self.text).trim().to_string();
                let level = self.heading.take().unwrap_or(1);
                if level == 1 && self.first_h1.is_none() {
                    self.first_h1 = Some(text.clone());
                }
                self.doc.push(ContentBlock::heading(text, level));
            }
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    if self.in_paragraph && self.lists.is_empty() && self.table.is_none() {
                        self.images.push(image);
                    } else {
                        self.text.push_str(&image.alt);
                    }
                }
            }
            TagEnd::Item => {
                let item = mem::take(&mut self.text);
                if let Some(frame) = self.lists.last_mut() {
                    if !item.trim().is_empty() {
                        frame.items.push(item.trim().to_string());
                    }
                }
            }
            TagEnd::List(_) => {
                if let Some(frame) = self.lists.pop() {
                    match self.lists.last_mut() {
                        Some(parent) => parent.items.extend(frame.items),
                        None => self.doc.push(ContentBlock::list(frame.items, frame.ordered)),
                    }
                }
            }
            TagEnd::CodeBlock => {
                if let Some((language, mut code)) = self.code.take() {
                    if code.ends_with('\n') {
                        code.pop();
                    }
                    self.doc.push(ContentBlock::code(code, language));
                }
            }
            TagEnd::TableCell => {
                let cell = mem::take(&mut self.text).trim().to_string();
                self.row.push(cell);
            }
            TagEnd::TableHead | TagEnd::TableRow => {
                let row = mem::take(&mut self.row);
                if let Some(rows) = self.table.as_mut() {
                    rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(rows) = self.table.take() {
                    self.doc.push(ContentBlock::table(rows));
                }
            }
            TagEnd::MetadataBlock(_) => self.in_metadata = false,
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.in_metadata {
            self.read_front_matter(text);
        } else if let Some(image) = self.image.as_mut() {
            image.alt.push_str(text);
        } else if let Some((_, code)) = self.code.as_mut() {
            code.push_str(text);
        } else {
            self.text.push_str(text);
        }
    }

    /// Emit the finished top-level paragraph and any images it held.
    ///
    /// A paragraph consisting only of images becomes image blocks.
    fn flush_paragraph(&mut self) {
        let text = mem::take(&mut self.text).trim().to_string();
        if !text.is_empty() {
            self.doc.push(ContentBlock::paragraph(text));
        }
        for image in self.images.drain(..) {
            let caption = if !image.alt.trim().is_empty() {
                Some(image.alt.trim().to_string())
            } else if !image.title.is_empty() {
                Some(image.title)
            } else {
                None
            };
            self.doc.push(ContentBlock::image(image.path, caption));
        }
    }

    fn read_front_matter(&mut self, block: &str) {
        for line in block.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() || key.starts_with('#') || key.contains(char::is_whitespace) {
                continue;
            }
            let value = value.trim().trim_matches(|c: char| c == '"' || c == '\'');
            if !value.is_empty() {
                self.doc.metadata.set(key, value);
            }
        }
    }

    fn finish(mut self) -> Document {
        if !self.doc.metadata.contains("title") {
            if let Some(title) = self.first_h1.take() {
                self.doc.metadata.set("title", title);
            }
        }
        self.doc
    }
}
