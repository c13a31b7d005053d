//! Paper header metadata: title, authors, affiliations, year.
//!
//! Person names follow the TEI `persName` layout. The same name rules are
//! reused for cited-work authors in the bibliography.

use crate::document::{Affiliation, Author};
use crate::markup::Element;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Plausible publication year.
    static ref YEAR: Regex = Regex::new(r"\b(19|20)\d{2}\b").unwrap();
}

/// Title, authors and year of the paper.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperMetadata {
    /// Article title
    pub title: String,
    /// Cleaned author list
    pub authors: Vec<Author>,
    /// Publication year
    pub year: Option<String>,
}

/// Extract metadata from a `teiHeader` element.
pub fn extract_paper_metadata(header: &Element) -> PaperMetadata {
    let titles = header.find_all("title");
    let title = titles
        .iter()
        .find(|t| t.attr("level") == Some("a"))
        .or_else(|| titles.first())
        .map(|t| t.normalized_text())
        .unwrap_or_default();

    let author_scope = header.find_descendant("sourceDesc").unwrap_or(header);
    let authors = clean_authors(parse_authors(author_scope, true));

    let year = header
        .find_descendant("publicationStmt")
        .and_then(|stmt| {
            stmt.find_all("date")
                .into_iter()
                .find(|d| d.attr("type") == Some("published"))
        })
        .and_then(|date| {
            date.attr("when")
                .and_then(extract_year)
                .or_else(|| extract_year(&date.normalized_text()))
        })
        .map(|year| year.to_string());

    log::debug!("header: title {:?}, {} author(s)", title, authors.len());
    PaperMetadata {
        title,
        authors,
        year,
    }
}

/// First plausible four-digit year in `text`.
pub fn extract_year(text: &str) -> Option<u32> {
    YEAR.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Every `author` below `scope` that carries a `persName`, in document order.
pub fn parse_authors(scope: &Element, with_affiliation: bool) -> Vec<Author> {
    scope
        .find_all("author")
        .into_iter()
        .filter_map(|author| parse_author(author, with_affiliation))
        .collect()
}

/// One `author` element.
pub fn parse_author(author: &Element, with_affiliation: bool) -> Option<Author> {
    let pers_name = author.find_child("persName")?;
    let mut parsed = parse_person(pers_name);
    if with_affiliation {
        parsed.email = author
            .find_child("email")
            .map(Element::normalized_text)
            .filter(|email| !email.is_empty());
        parsed.affiliation = author
            .find_child("affiliation")
            .map(parse_affiliation)
            .filter(|aff| !aff.is_empty());
    }
    Some(parsed)
}

/// Split a `persName` into name parts.
pub fn parse_person(pers_name: &Element) -> Author {
    let mut author = Author::default();
    let mut surnames = Vec::new();
    let mut suffixes = Vec::new();

    for part in pers_name.child_elements() {
        let text = part.normalized_text();
        if text.is_empty() {
            continue;
        }
        match part.tag.as_str() {
            "forename" => match part.attr("type") {
                Some("middle") => author.middle.push(text),
                _ if author.first.is_empty() => author.first = text,
                _ => author.middle.push(text),
            },
            "surname" => surnames.push(text),
            "roleName" | "genName" => suffixes.push(text),
            _ => {},
        }
    }

    if let Some(last) = surnames.pop() {
        author.middle.extend(surnames);
        author.last = last;
    }
    author.suffix = suffixes.join(" ");
    author
}

/// Laboratory, institution and address parts of an `affiliation`.
pub fn parse_affiliation(affiliation: &Element) -> Affiliation {
    let mut parsed = Affiliation::default();
    let mut department = None;

    for org in affiliation.find_all("orgName") {
        let text = org.normalized_text();
        if text.is_empty() {
            continue;
        }
        match org.attr("type") {
            Some("laboratory") if parsed.laboratory.is_empty() => parsed.laboratory = text,
            Some("institution") if parsed.institution.is_empty() => parsed.institution = text,
            Some("department") if department.is_none() => department = Some(text),
            _ => {},
        }
    }
    if parsed.laboratory.is_empty() {
        parsed.laboratory = department.unwrap_or_default();
    }

    if let Some(address) = affiliation.find_child("address") {
        for part in address.child_elements() {
            let text = part.normalized_text();
            if !text.is_empty() {
                parsed.location.entry(part.tag.clone()).or_insert(text);
            }
        }
    }
    parsed
}

/// Drop nameless authors and collapse duplicates into the first occurrence.
///
/// A duplicate contributes its email and affiliation when the surviving
/// occurrence has none.
pub fn clean_authors(authors: Vec<Author>) -> Vec<Author> {
    let mut cleaned: Vec<Author> = Vec::new();
    for author in authors {
        if author.is_blank() {
            continue;
        }
        let key = author.name_key();
        match cleaned.iter_mut().find(|seen| seen.name_key() == key) {
            Some(seen) => {
                if seen.email.is_none() {
                    seen.email = author.email;
                }
                if seen.affiliation.is_none() {
                    seen.affiliation = author.affiliation;
                }
            },
            None => cleaned.push(author),
        }
    }
    cleaned
}
