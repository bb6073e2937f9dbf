//! Declarative HTML queries over `scraper` documents.
//!
//! Queries are phrased as "elements of tag T (inside container C) passing
//! predicate P". Predicates only see a [`Tag`]: its name, attributes and
//! visible text.

use scraper::{ElementRef, Html, Selector};

/// Read-only view of an element handed to predicates.
#[derive(Clone, Copy)]
pub struct Tag<'a> {
    element: ElementRef<'a>,
}

impl<'a> Tag<'a> {
    /// Lower-case tag name.
    pub fn name(&self) -> &'a str {
        self.element.value().name()
    }

    /// Attribute value, if present.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Whether the `class` attribute contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|value| value.split_whitespace().any(|c| c == class))
    }

    /// Raw concatenated text content.
    pub fn raw_text(&self) -> String {
        self.element.text().collect()
    }

    /// Text nodes stripped and joined with a single space.
    pub fn text(&self) -> String {
        element_text(self.element)
    }
}

/// Text nodes of an element, each trimmed, empty ones dropped, joined by a space.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Whether the document contains at least one element with this tag.
pub fn has_tag(doc: &Html, tag: &str) -> bool {
    let Some(sel) = selector(tag) else {
        return false;
    };
    let found = doc.select(&sel).next().is_some();
    found
}

/// All elements of `tag` located anywhere inside a `container` element,
/// in document order, that pass `predicate`.
pub fn find_all_in<'a, F>(doc: &'a Html, container: &str, tag: &str, predicate: F) -> Vec<ElementRef<'a>>
where
    F: Fn(&Tag<'a>) -> bool,
{
    let Some(sel) = selector(&format!("{container} {tag}")) else {
        return Vec::new();
    };
    let found: Vec<ElementRef<'a>> = doc
        .select(&sel)
        .filter(|el| predicate(&Tag { element: *el }))
        .collect();
    found
}

/// First element of `tag` inside a `container` element that passes `predicate`.
pub fn find_first_in<'a, F>(doc: &'a Html, container: &str, tag: &str, predicate: F) -> Option<ElementRef<'a>>
where
    F: Fn(&Tag<'a>) -> bool,
{
    let sel = selector(&format!("{container} {tag}"))?;
    let found = doc.select(&sel).find(|el| predicate(&Tag { element: *el }));
    found
}

/// Predicate: attribute `name` exists and satisfies `check`.
pub fn attr_matches<'a, F>(name: &'a str, check: F) -> impl Fn(&Tag<'_>) -> bool + 'a
where
    F: Fn(&str) -> bool + 'a,
{
    move |tag: &Tag<'_>| tag.attr(name).is_some_and(|value| check(value))
}
