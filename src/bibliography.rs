//! Bibliography normalization.
//!
//! Each `biblStruct` node becomes a [`BibEntry`]. Structured sub-fields are
//! preferred; a regex pass over the raw citation string fills only the
//! fields the markup left empty.
//!
//! Nodes whose whitespace-normalized raw text is identical are merged into
//! the first one seen. The markup ids of merged nodes are recorded as
//! aliases so the resolution pass can repoint spans to the survivor.

use crate::config::ConverterConfig;
use crate::diagnostics::Warning;
use crate::document::BibEntry;
use crate::ids::{AssignedId, IdGenerator};
use crate::markup::{collapse_whitespace, Element};
use crate::metadata::{clean_authors, extract_year, parse_authors};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    /// DOI as printed in reference strings.
    static ref DOI: Regex = Regex::new(r"\b10\.\d{4,9}/[^\s]+").unwrap();

    /// APA-like layout: `Authors (Year). Title. Venue`
    static ref APA: Regex = Regex::new(
        r"^(?P<authors>.+?)\s*\((?:19|20)\d{2}[a-z]?\)\.?\s*(?P<title>[^.?!]+[.?!])\s*(?P<venue>[^.,;(]+)?"
    )
    .unwrap();

    /// Title in double quotes.
    static ref QUOTED_TITLE: Regex = Regex::new(r#"["“](?P<title>[^"”]{4,})["”]"#).unwrap();
}

/// Prefix of generated ref-ids.
pub const BIB_ID_PREFIX: &str = "bib";

/// Normalized bibliography of one document.
#[derive(Debug, Clone, Default)]
pub struct Bibliography {
    /// Entries keyed by ref-id, in first-seen order
    pub entries: IndexMap<String, BibEntry>,
    /// Markup id of a merged duplicate → surviving ref-id
    pub aliases: IndexMap<String, String>,
    /// Recovered conditions
    pub warnings: Vec<Warning>,
}

/// Turns bibliography nodes into deduplicated entries.
#[derive(Debug, Clone)]
pub struct BibliographyNormalizer {
    config: ConverterConfig,
}

impl BibliographyNormalizer {
    /// Create a normalizer.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Normalize `nodes` in order, drawing ids from `ids`.
    pub fn normalize(&self, nodes: &[&Element], ids: &mut IdGenerator) -> Bibliography {
        let mut bibliography = Bibliography::default();
        let mut by_text: HashMap<String, String> = HashMap::new();

        for node in nodes {
            let mut entry = parse_entry(node);
            if self.config.drop_untitled_bib_entries && entry.title.is_none() {
                log::debug!("dropping untitled bibliography node {:?}", node.id());
                continue;
            }

            let key = collapse_whitespace(&entry.raw_text);
            if let Some(survivor_id) = by_text.get(&key) {
                if let Some(survivor) = bibliography.entries.get_mut(survivor_id) {
                    log::debug!("merging duplicate bibliography node into {}", survivor_id);
                    merge_into(survivor, entry);
                    if let Some(markup_id) = node.id() {
                        if ids.reserve(markup_id) {
                            survivor.aliases.push(markup_id.to_string());
                            bibliography
                                .aliases
                                .insert(markup_id.to_string(), survivor_id.clone());
                        }
                    }
                }
                continue;
            }

            let preferred = node.id();
            let assigned = ids.claim(preferred, BIB_ID_PREFIX);
            if let (Some(id), AssignedId::Generated(fresh)) = (preferred, &assigned) {
                let warning = Warning::DuplicateIdentifier {
                    id: id.to_string(),
                    assigned: fresh.clone(),
                };
                log::warn!("{}", warning);
                bibliography.warnings.push(warning);
            }
            entry.ref_id = assigned.into_string();
            if !key.is_empty() {
                by_text.insert(key, entry.ref_id.clone());
            }
            bibliography.entries.insert(entry.ref_id.clone(), entry);
        }

        log::debug!(
            "bibliography: {} node(s), {} entries, {} merged",
            nodes.len(),
            bibliography.entries.len(),
            bibliography.aliases.len()
        );
        bibliography
    }
}

/// Every `biblStruct` listed under a `listBibl` of `root`, `root` included.
pub fn bibliography_nodes(root: &Element) -> Vec<&Element> {
    Some(root)
        .filter(|r| r.is("listBibl"))
        .into_iter()
        .chain(root.find_all("listBibl"))
        .flat_map(|list| list.child_elements().filter(|node| node.is("biblStruct")))
        .collect()
}

/// Parse one `biblStruct` without assigning an id.
pub fn parse_entry(node: &Element) -> BibEntry {
    let mut entry = BibEntry {
        raw_text: raw_text(node),
        ..BibEntry::default()
    };

    let titles = node.find_all("title");
    let title_at = |level: &str| {
        titles
            .iter()
            .filter(|t| t.attr("level") == Some(level))
            .map(|t| t.normalized_text())
            .find(|t| !t.is_empty())
    };
    entry.title = title_at("a").or_else(|| title_at("m"));
    entry.venue = ["j", "m", "s"]
        .iter()
        .filter_map(|level| title_at(*level))
        .find(|venue| Some(venue) != entry.title.as_ref());

    entry.authors = clean_authors(parse_authors(node, false));

    for scope in node.find_all("biblScope") {
        match scope.attr("unit") {
            Some("volume") if entry.volume.is_none() => entry.volume = scope_value(scope),
            Some("issue") if entry.issue.is_none() => entry.issue = scope_value(scope),
            Some("page") if entry.pages.is_none() => entry.pages = page_range(scope),
            _ => {},
        }
    }

    entry.year = node.find_all("date").into_iter().find_map(|date| {
        date.attr("when")
            .and_then(extract_year)
            .or_else(|| extract_year(&date.normalized_text()))
    });

    for idno in node.find_all("idno") {
        let value = idno.normalized_text();
        if let (Some(scheme), false) = (idno.attr("type"), value.is_empty()) {
            let values = entry.identifiers.entry(scheme.to_string()).or_default();
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }

    entry.urls = node
        .find_all("ptr")
        .into_iter()
        .filter_map(|ptr| ptr.attr("target"))
        .map(str::to_string)
        .collect();

    fill_from_raw_text(&mut entry);
    entry
}

fn raw_text(node: &Element) -> String {
    node.find_all("note")
        .into_iter()
        .find(|note| note.attr("type") == Some("raw_reference"))
        .map(Element::normalized_text)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| node.rendered_text())
}

fn scope_value(scope: &Element) -> Option<String> {
    let text = scope.normalized_text();
    if !text.is_empty() {
        return Some(text);
    }
    scope.attr("from").map(str::to_string)
}

fn page_range(scope: &Element) -> Option<String> {
    match (scope.attr("from"), scope.attr("to")) {
        (Some(from), Some(to)) => Some(format!("{}--{}", from, to)),
        (Some(from), None) => Some(from.to_string()),
        _ => Some(scope.normalized_text()).filter(|text| !text.is_empty()),
    }
}

/// Heuristic extraction over the raw string for fields the markup lacks.
fn fill_from_raw_text(entry: &mut BibEntry) {
    let raw = entry.raw_text.clone();
    if raw.is_empty() {
        return;
    }

    if entry.year.is_none() {
        entry.year = extract_year(&raw);
    }

    if entry.doi().is_none() {
        if let Some(m) = DOI.find(&raw) {
            let doi = m.as_str().trim_end_matches(|c| matches!(c, '.' | ',' | ';' | ')'));
            entry
                .identifiers
                .insert("DOI".to_string(), vec![doi.to_string()]);
        }
    }

    if entry.title.is_none() || entry.venue.is_none() {
        if let Some(caps) = APA.captures(&raw) {
            if entry.title.is_none() {
                entry.title = caps
                    .name("title")
                    .map(|m| m.as_str().trim_end_matches('.').trim().to_string())
                    .filter(|t| !t.is_empty());
            }
            if entry.venue.is_none() {
                entry.venue = caps
                    .name("venue")
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|v| !v.is_empty());
            }
        }
    }

    if entry.title.is_none() {
        entry.title = QUOTED_TITLE
            .captures(&raw)
            .and_then(|caps| caps.name("title"))
            .map(|m| m.as_str().trim_end_matches(',').trim().to_string());
    }
}

/// Fill fields missing on `survivor` from a duplicate node.
fn merge_into(survivor: &mut BibEntry, duplicate: BibEntry) {
    if survivor.title.is_none() {
        survivor.title = duplicate.title;
    }
    if survivor.authors.is_empty() {
        survivor.authors = duplicate.authors;
    }
    if survivor.venue.is_none() {
        survivor.venue = duplicate.venue;
    }
    if survivor.volume.is_none() {
        survivor.volume = duplicate.volume;
    }
    if survivor.issue.is_none() {
        survivor.issue = duplicate.issue;
    }
    if survivor.pages.is_none() {
        survivor.pages = duplicate.pages;
    }
    if survivor.year.is_none() {
        survivor.year = duplicate.year;
    }
    for (scheme, values) in duplicate.identifiers {
        survivor.identifiers.entry(scheme).or_insert(values);
    }
    for url in duplicate.urls {
        if !survivor.urls.contains(&url) {
            survivor.urls.push(url);
        }
    }
}
