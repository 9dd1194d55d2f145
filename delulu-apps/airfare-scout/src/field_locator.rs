//!  Delulu Airfare Scout
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # Field Locator
//!
//! Declarative addressing of markup nodes by tag name and class, optionally
//! nested. Every field the extractors read is described by one [`Locator`]
//! and resolved by the same tree search, so the leg and record extractors are
//! tables of locators rather than hand-written traversals.
//!
//! A missing node is data, not an error: lookups return `None` or the
//! [`NOT_AVAILABLE`] sentinel.

use scraper::ElementRef;

use crate::fare_record::NOT_AVAILABLE;

/// `{tag, class, child?}` address of a node below some subtree root.
///
/// The tag `"*"` matches any element and a `None` class matches any class
/// list. With a child, the child is searched inside the first node matching
/// the outer part only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    tag: &'static str,
    class: Option<&'static str>,
    child: Option<&'static Locator>,
}

impl Locator {
    pub const fn new(tag: &'static str, class: &'static str) -> Self {
        Self {
            tag,
            class: Some(class),
            child: None,
        }
    }

    pub const fn tag(tag: &'static str) -> Self {
        Self {
            tag,
            class: None,
            child: None,
        }
    }

    /// Any element: used to reach "the first nested element" of a container.
    pub const fn any() -> Self {
        Self::tag("*")
    }

    pub const fn then(self, child: &'static Locator) -> Self {
        Self {
            child: Some(child),
            ..self
        }
    }

    fn matches(&self, element: &ElementRef) -> bool {
        let value = element.value();
        (self.tag == "*" || value.name() == self.tag)
            && self
                .class
                .is_none_or(|class| value.classes().any(|c| c == class))
    }

    /// Descendants of `root` (root excluded) matching the outer part, in document order.
    fn outer_matches<'a>(&self, root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
        root.descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(move |el| self.matches(el))
    }

    /// First node addressed by this locator, following the child chain.
    pub fn find<'a>(&self, root: ElementRef<'a>) -> Option<ElementRef<'a>> {
        let outer = self.outer_matches(root).next()?;
        match self.child {
            Some(child) => child.find(outer),
            None => Some(outer),
        }
    }

    /// All nodes addressed by this locator, in document order.
    ///
    /// With a child, each outer match contributes the first child match found
    /// inside it; outer matches without one are skipped.
    pub fn find_all<'a>(&self, root: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        match self.child {
            Some(child) => self
                .outer_matches(root)
                .filter_map(|outer| child.find(outer))
                .collect(),
            None => self.outer_matches(root).collect(),
        }
    }

    pub fn count(&self, root: ElementRef) -> usize {
        self.find_all(root).len()
    }
}

/// Trimmed text of a node, `None` when it only holds whitespace.
pub fn element_text(element: ElementRef) -> Option<String> {
    let text: String = element.text().collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Text before the first newline, trimmed.
pub fn first_line(s: &str) -> &str {
    s.trim().split('\n').next().unwrap_or_default().trim()
}

/// Optional text of the node addressed by `locator` below `root`.
pub fn find_text(root: Option<ElementRef>, locator: &Locator) -> Option<String> {
    root.and_then(|r| locator.find(r)).and_then(element_text)
}

/// Trimmed text of the node addressed by `locator`, or the sentinel when the
/// root is absent, nothing matches, or the match holds no text.
pub fn field_text(root: Option<ElementRef>, locator: &Locator) -> String {
    find_text(root, locator).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Like [`field_text`], keeping only the first line. Some fields carry
/// newline-separated annotations after the value.
pub fn field_first_line(root: Option<ElementRef>, locator: &Locator) -> String {
    find_text(root, locator)
        .map(|text| first_line(&text).to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Trimmed text of every node addressed by `locator`, in document order.
/// Nodes without text are skipped.
pub fn field_texts(root: Option<ElementRef>, locator: &Locator) -> Vec<String> {
    root.map(|r| {
        locator
            .find_all(r)
            .into_iter()
            .filter_map(element_text)
            .collect()
    })
    .unwrap_or_default()
}
