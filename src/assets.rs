//! Asset registry: figures, tables, equations and footnotes.
//!
//! Entries are inserted when an asset is first met, so iteration order is
//! document order. An asset's slot is reserved before its content is
//! tracked, which keeps an outer footnote ahead of a formula nested in it.

use crate::config::ConverterConfig;
use crate::diagnostics::Warning;
use crate::document::{AssetContent, AssetEntry, AssetKind};
use crate::ids::{AssignedId, IdGenerator};
use crate::markup::{collapse_whitespace, Element};
use crate::spans::{AssetSink, SpanTracker, TrackedText};
use indexmap::IndexMap;

/// Collects the assets of one document.
#[derive(Debug)]
pub struct AssetRegistry {
    ids: IdGenerator,
    entries: IndexMap<String, AssetEntry>,
    warnings: Vec<Warning>,
    glyph: char,
    strict_tables: bool,
}

impl AssetRegistry {
    /// Create a registry drawing ids from `ids`.
    pub fn new(ids: IdGenerator, config: &ConverterConfig) -> Self {
        Self {
            ids,
            entries: IndexMap::new(),
            warnings: Vec::new(),
            glyph: config.placeholder_glyph,
            strict_tables: config.strict_tables,
        }
    }

    /// Glyph written in place of inline assets.
    pub fn glyph(&self) -> char {
        self.glyph
    }

    /// Register an equation or footnote and return its asset-id.
    pub fn register(&mut self, element: &Element, kind: AssetKind) -> String {
        if matches!(kind, AssetKind::Figure | AssetKind::Table) {
            return self.register_figure(element);
        }
        let asset_id = self.claim(element, kind);
        let entry = match kind {
            AssetKind::Equation => {
                let glyph = self.glyph;
                let tracked = SpanTracker::track_excluding(self, glyph, element, &["label"]);
                let mut entry = AssetEntry::new(asset_id.clone(), kind, tracked.text);
                entry.spans = tracked.spans;
                entry.label = element
                    .find_child("label")
                    .map(Element::normalized_text)
                    .filter(|label| !label.is_empty());
                entry
            },
            _ => {
                let glyph = self.glyph;
                let tracked = SpanTracker::track(self, glyph, element);
                let mut entry = AssetEntry::new(asset_id.clone(), kind, tracked.text);
                entry.spans = tracked.spans;
                entry.label = element.attr("n").map(str::to_string);
                entry
            },
        };
        self.entries.insert(asset_id.clone(), entry);
        asset_id
    }

    /// Register a `figure` element (a table when `type="table"`).
    pub fn register_figure(&mut self, element: &Element) -> String {
        let kind = if element.attr("type") == Some("table") {
            AssetKind::Table
        } else {
            AssetKind::Figure
        };
        let asset_id = self.claim(element, kind);
        let glyph = self.glyph;

        let caption = match element
            .find_child("figDesc")
            .or_else(|| element.find_child("head"))
        {
            Some(node) => SpanTracker::track(self, glyph, node),
            None => TrackedText::default(),
        };

        let mut entry = AssetEntry::new(asset_id.clone(), kind, caption.text);
        entry.spans = caption.spans;
        entry.label = element
            .find_child("label")
            .map(Element::normalized_text)
            .filter(|label| !label.is_empty());
        entry.uris = element
            .find_all("graphic")
            .iter()
            .filter_map(|graphic| graphic.attr("url"))
            .map(str::to_string)
            .collect();
        if kind == AssetKind::Table {
            entry.content = element
                .find_descendant("table")
                .and_then(|table| self.table_content(&asset_id, table));
        }

        self.entries.insert(asset_id.clone(), entry);
        asset_id
    }

    /// Look up a registered asset.
    pub fn get(&self, asset_id: &str) -> Option<&AssetEntry> {
        self.entries.get(asset_id)
    }

    /// Split into entries and recorded warnings.
    pub fn into_parts(self) -> (IndexMap<String, AssetEntry>, Vec<Warning>) {
        (self.entries, self.warnings)
    }

    /// Claim an id and reserve the entry's slot in document order.
    fn claim(&mut self, element: &Element, kind: AssetKind) -> String {
        let preferred = element.id();
        let assigned = self.ids.claim(preferred, kind.prefix());
        if let (Some(id), AssignedId::Generated(fresh)) = (preferred, &assigned) {
            self.warn(Warning::DuplicateIdentifier {
                id: id.to_string(),
                assigned: fresh.clone(),
            });
        }
        let asset_id = assigned.into_string();
        self.entries
            .insert(asset_id.clone(), AssetEntry::new(asset_id.clone(), kind, ""));
        asset_id
    }

    fn table_content(&mut self, asset_id: &str, table: &Element) -> Option<AssetContent> {
        let mut rows: Vec<Vec<String>> = table
            .child_elements()
            .filter(|row| row.is("row"))
            .map(table_row)
            .collect();
        if rows.is_empty() {
            return None;
        }

        let row_lengths: Vec<usize> = rows.iter().map(Vec::len).collect();
        let width = row_lengths.iter().copied().max().unwrap_or(0);
        if row_lengths.iter().all(|&len| len == width) {
            return Some(AssetContent::Grid { rows });
        }

        self.warn(Warning::MalformedTable {
            asset_id: asset_id.to_string(),
            row_lengths,
        });
        if self.strict_tables {
            let text = rows
                .iter()
                .map(|row| collapse_whitespace(&row.join(" ")))
                .collect::<Vec<_>>()
                .join("\n");
            Some(AssetContent::RawText { text })
        } else {
            for row in &mut rows {
                row.resize(width, String::new());
            }
            Some(AssetContent::Grid { rows })
        }
    }

    fn warn(&mut self, warning: Warning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

impl AssetSink for AssetRegistry {
    fn register_placeholder(&mut self, element: &Element, kind: AssetKind) -> String {
        self.register(element, kind)
    }

    fn register_detached(&mut self, element: &Element) {
        let asset_id = self.register_figure(element);
        log::debug!("registered {} from running text", asset_id);
    }
}

/// Cell texts of one row; `cols="n"` spans add n-1 empty cells.
fn table_row(row: &Element) -> Vec<String> {
    let mut cells = Vec::new();
    for cell in row.child_elements().filter(|cell| cell.is("cell")) {
        cells.push(cell.normalized_text());
        let span = cell
            .attr("cols")
            .and_then(|cols| cols.trim().parse::<usize>().ok())
            .unwrap_or(1);
        for _ in 1..span {
            cells.push(String::new());
        }
    }
    cells
}

/// Tracked text of `element` with assets going to `registry`.
pub fn track_with(registry: &mut AssetRegistry, element: &Element) -> TrackedText {
    let glyph = registry.glyph;
    SpanTracker::track(registry, glyph, element)
}
