//! Parsing options and configuration.

use crate::schema::Schema;
use std::path::PathBuf;

/// Options for canonicalizing source documents.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Contract every extracted document must satisfy
    pub schema: Schema,

    /// External program producing document JSON for word-processor files
    pub word_command: Option<PathBuf>,

    /// Extra arguments passed to the word-processor program before the path
    pub word_args: Vec<String>,

    /// Apply Unicode NFC normalization to plain-text input
    pub normalize_unicode: bool,

    /// Read `---` front matter in markdown into metadata
    pub front_matter: bool,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the schema documents are validated against.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Configure the word-processor extractor program.
    pub fn with_word_command(mut self, program: impl Into<PathBuf>) -> Self {
        self.word_command = Some(program.into());
        self
    }

    /// Set arguments for the word-processor program.
    pub fn with_word_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.word_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable Unicode normalization of plain text.
    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize_unicode = normalize;
        self
    }

    /// Enable or disable markdown front matter.
    pub fn with_front_matter(mut self, enabled: bool) -> Self {
        self.front_matter = enabled;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            schema: Schema::default(),
            word_command: None,
            word_args: Vec::new(),
            normalize_unicode: true,
            front_matter: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_builder() {
        let options = ParseOptions::new()
            .with_word_command("/usr/local/bin/docx2json")
            .with_word_args(["--images", "parsed_images"])
            .with_normalization(false)
            .with_front_matter(false);

        assert_eq!(
            options.word_command,
            Some(PathBuf::from("/usr/local/bin/docx2json"))
        );
        assert_eq!(options.word_args, vec!["--images", "parsed_images"]);
        assert!(!options.normalize_unicode);
        assert!(!options.front_matter);
    }

    #[test]
    fn test_default_options() {
        let options = ParseOptions::default();
        assert!(options.word_command.is_none());
        assert!(options.normalize_unicode);
        assert!(options.front_matter);
        assert!(options.schema.recognizes("paragraph"));
    }
}
