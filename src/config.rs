//! Configuration for TEI conversion.

/// Default placeholder glyph standing in for inline formulas and footnotes.
pub const DEFAULT_PLACEHOLDER_GLYPH: char = '\u{FFFC}';

/// Conversion configuration.
///
/// # Example
///
/// ```
/// use tei_oxide::config::ConverterConfig;
///
/// let config = ConverterConfig::new()
///     .with_max_depth(256)
///     .with_drop_untitled_bib_entries(true);
/// assert_eq!(config.max_depth, 256);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterConfig {
    /// Maximum element nesting depth accepted from the markup source.
    ///
    /// Deeper trees are rejected as structural errors. Default: 512.
    pub max_depth: usize,

    /// Discard bibliography nodes that have no title.
    pub drop_untitled_bib_entries: bool,

    /// Number of bracket-shaped citation surfaces above which the document
    /// is classified as bracket style.
    pub bracket_style_threshold: usize,

    /// Glyph inserted in place of inline formulas and footnotes.
    ///
    /// Must be a single character; offsets count characters, so the glyph
    /// always occupies exactly one offset unit.
    pub placeholder_glyph: char,

    /// Section name given to abstract paragraphs.
    pub abstract_section_name: String,

    /// Store ragged tables as raw text instead of a grid.
    pub strict_tables: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            max_depth: 512,
            drop_untitled_bib_entries: false,
            bracket_style_threshold: 5,
            placeholder_glyph: DEFAULT_PLACEHOLDER_GLYPH,
            abstract_section_name: "Abstract".to_string(),
            strict_tables: true,
        }
    }

    /// Strict preset: shallow depth limit, ragged tables demoted to raw text.
    pub fn strict() -> Self {
        Self {
            max_depth: 128,
            ..Self::new()
        }
    }

    /// Lenient preset: deep trees accepted, ragged tables padded into a grid.
    pub fn lenient() -> Self {
        Self {
            max_depth: 4096,
            strict_tables: false,
            ..Self::new()
        }
    }

    /// Set the maximum nesting depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Drop bibliography nodes without a title.
    pub fn with_drop_untitled_bib_entries(mut self, enable: bool) -> Self {
        self.drop_untitled_bib_entries = enable;
        self
    }

    /// Set the bracket-style detection threshold.
    pub fn with_bracket_style_threshold(mut self, threshold: usize) -> Self {
        self.bracket_style_threshold = threshold;
        self
    }

    /// Set the placeholder glyph.
    pub fn with_placeholder_glyph(mut self, glyph: char) -> Self {
        self.placeholder_glyph = glyph;
        self
    }

    /// Set the abstract section name.
    pub fn with_abstract_section_name(mut self, name: impl Into<String>) -> Self {
        self.abstract_section_name = name.into();
        self
    }

    /// Enable or disable strict table handling.
    pub fn with_strict_tables(mut self, enable: bool) -> Self {
        self.strict_tables = enable;
        self
    }
}
