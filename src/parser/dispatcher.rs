//! Format dispatcher: the fail-closed gate between extraction and the rest
//! of the pipeline.

use super::{CommandExtractor, Extractor, MarkdownExtractor, ParseOptions, TextExtractor};
use crate::detect::SourceFormat;
use crate::error::{Error, Result};
use crate::model::Document;
use crate::schema::{ensure_valid, Schema};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Routes source files to per-format extractors and validates the result.
///
/// The mapping is keyed by [`SourceFormat`], so the set of accepted
/// extensions is fixed; only the extractor behind each format can be
/// swapped.
pub struct Dispatcher {
    extractors: HashMap<SourceFormat, Arc<dyn Extractor>>,
    schema: Schema,
}

impl Dispatcher {
    /// Create a dispatcher with no extractors.
    pub fn new(schema: Schema) -> Self {
        Self {
            extractors: HashMap::new(),
            schema,
        }
    }

    /// Create a dispatcher with the built-in markdown and plain-text
    /// extractors and the default schema.
    pub fn with_defaults() -> Self {
        Self::from_options(&ParseOptions::default())
    }

    /// Create a dispatcher from parse options.
    ///
    /// The word-processor slot is filled only when a command is configured.
    pub fn from_options(options: &ParseOptions) -> Self {
        let mut dispatcher = Self::new(options.schema.clone());
        dispatcher.register(
            SourceFormat::Markdown,
            Arc::new(MarkdownExtractor::new().with_front_matter(options.front_matter)),
        );
        dispatcher.register(
            SourceFormat::PlainText,
            Arc::new(TextExtractor::new().with_normalization(options.normalize_unicode)),
        );
        if let Some(ref program) = options.word_command {
            dispatcher.register(
                SourceFormat::WordProcessor,
                Arc::new(CommandExtractor::new(program).with_args(options.word_args.clone())),
            );
        }
        dispatcher
    }

    /// Install the extractor for a format, replacing any previous one.
    pub fn register(&mut self, format: SourceFormat, extractor: Arc<dyn Extractor>) {
        self.extractors.insert(format, extractor);
    }

    /// Get the extractor for a format.
    pub fn extractor(&self, format: SourceFormat) -> Option<Arc<dyn Extractor>> {
        self.extractors.get(&format).cloned()
    }

    /// Check if a format has an extractor installed.
    pub fn supports(&self, format: SourceFormat) -> bool {
        self.extractors.contains_key(&format)
    }

    /// The schema documents are validated against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Parse a source file into a validated document.
    ///
    /// # Errors
    /// * `NotFound` if the file does not exist
    /// * `UnsupportedFormat` if the extension is outside the accepted set
    /// * `ExtractorUnavailable` if the format has no extractor installed
    /// * `SchemaViolation` if the extracted document is invalid
    pub fn parse<P: AsRef<Path>>(&self, path: P) -> Result<Document> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let absolute = fs::canonicalize(path)?;

        let format = SourceFormat::from_path(path)?;
        let extractor = self
            .extractor(format)
            .ok_or_else(|| Error::ExtractorUnavailable(format.name().to_string()))?;

        log::debug!(
            "Extracting {} as {} with {}",
            absolute.display(),
            format,
            extractor.name()
        );
        let doc = extractor.extract(&absolute)?;

        if let Err(e) = ensure_valid(&doc, &self.schema) {
            log::warn!("{} failed schema validation: {}", absolute.display(), e);
            return Err(e);
        }
        log::info!(
            "Parsed {} ({} blocks)",
            absolute.display(),
            doc.content.len()
        );
        Ok(doc)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}
