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

//! # Markup Sanitizer
//!
//! Side-effect free reduction of a rendered result page before extraction.
//! Drops non-content nodes (scripts, styles, metadata, comments) and every
//! attribute except `id` and `class`, which are all the locators address.
//! Text content is carried over untouched.

use scraper::Html;
use scraper::node::Node;

/// Elements removed together with their whole subtree.
const DROPPED_ELEMENTS: &[&str] = &[
    "script", "style", "meta", "noscript", "link", "template", "iframe", "svg",
];

/// Attributes kept on surviving elements.
const KEPT_ATTRIBUTES: &[&str] = &["id", "class"];

/// Parses `raw` and returns the reduced document.
///
/// The reduction edits the parsed tree in place, so text nodes are exactly
/// what the parser produced. Malformed markup never fails: the HTML5 parser
/// recovers to a best-effort tree and the reduction runs over whatever it
/// produced.
pub fn sanitize_markup(raw: &str) -> Html {
    let mut document = Html::parse_document(raw);

    let doomed: Vec<_> = document
        .tree
        .root()
        .descendants()
        .filter(|node| match node.value() {
            Node::Comment(_) | Node::ProcessingInstruction(_) => true,
            Node::Element(element) => DROPPED_ELEMENTS.contains(&element.name()),
            _ => false,
        })
        .map(|node| node.id())
        .collect();
    for id in &doomed {
        if let Some(mut node) = document.tree.get_mut(*id) {
            node.detach();
        }
    }

    let elements: Vec<_> = document
        .tree
        .root()
        .descendants()
        .filter(|node| node.value().is_element())
        .map(|node| node.id())
        .collect();
    for id in elements {
        if let Some(mut node) = document.tree.get_mut(id) {
            if let Node::Element(element) = node.value() {
                element
                    .attrs
                    .retain(|name, _| KEPT_ATTRIBUTES.contains(&&*name.local));
            }
        }
    }

    tracing::trace!(
        "Sanitized markup: {} bytes, {} nodes dropped",
        raw.len(),
        doomed.len()
    );
    document
}

/// Serialized form of [`sanitize_markup`], for saving or inspecting a page.
pub fn reduce_markup(raw: &str) -> String {
    sanitize_markup(raw).html()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn test_drops_scripts_styles_and_comments() {
        let raw = r#"<html><head><meta charset="utf-8"><style>.x{}</style>
            <script>var a = "<div class='flight-area'>";</script></head>
            <body><!-- ad slot --><noscript>enable js</noscript>
            <div class="flight-area">ok</div></body></html>"#;
        let reduced = reduce_markup(raw);
        assert!(!reduced.contains("script"));
        assert!(!reduced.contains("style"));
        assert!(!reduced.contains("meta"));
        assert!(!reduced.contains("ad slot"));
        assert!(!reduced.contains("enable js"));

        let doc = sanitize_markup(raw);
        let sel = Selector::parse("div.flight-area").unwrap();
        assert_eq!(doc.select(&sel).count(), 1);
    }

    #[test]
    fn test_keeps_only_id_and_class() {
        let raw = r#"<div id="main" class="flight-area wide" data-x="1" style="color:red" onclick="go()"><span class="price" title="t">86,344円</span></div>"#;
        let reduced = reduce_markup(raw);
        assert!(reduced.contains(r#"id="main""#));
        assert!(reduced.contains(r#"class="flight-area wide""#));
        assert!(reduced.contains(r#"<span class="price">86,344円</span>"#));
        assert!(!reduced.contains("data-x"));
        assert!(!reduced.contains("onclick"));
        assert!(!reduced.contains("title"));
    }

    #[test]
    fn test_text_is_preserved_verbatim() {
        let raw = "<div class=\"flt-hour\"><span>35時間40分\nvia SIN &amp; KUL</span></div>";
        let doc = sanitize_markup(raw);
        let sel = Selector::parse("div.flt-hour span").unwrap();
        let text: String = doc.select(&sel).next().unwrap().text().collect();
        assert_eq!(text, "35時間40分\nvia SIN & KUL");
    }

    fn text_of(doc: &Html, selector: &str) -> String {
        let sel = Selector::parse(selector).unwrap();
        doc.select(&sel).next().unwrap().text().collect()
    }

    #[test]
    fn test_leading_newlines_in_pre_survive() {
        let raw = "<div class=\"flt-hour\"><pre>\n\nNRT</pre><textarea>\n\nCMB</textarea></div>";
        let before = text_of(&Html::parse_document(raw), "div.flt-hour pre");
        assert_eq!(before, "\nNRT");
        let doc = sanitize_markup(raw);
        assert_eq!(text_of(&doc, "div.flt-hour pre"), before);
        assert_eq!(text_of(&doc, "div.flt-hour textarea"), "\nCMB");
    }

    #[test]
    fn test_raw_text_elements_keep_their_text() {
        let raw = "<div class=\"note\"><xmp>SIN & KUL <b></xmp></div>";
        let doc = sanitize_markup(raw);
        assert_eq!(text_of(&doc, "div.note xmp"), "SIN & KUL <b>");
    }

    #[test]
    fn test_sanitized_text_matches_parsed_text() {
        let raw = "<html><body><!-- c --><div class=\"flight-area\" data-id=\"7\">\
                   <pre>\n 15:30\n</pre><span class=\"price\">86,344円 &amp; tax</span>\
                   <script>x()</script></div></body></html>";
        let parsed = Html::parse_document(raw);
        let doc = sanitize_markup(raw);
        assert_eq!(text_of(&doc, "div.flight-area pre"), text_of(&parsed, "div.flight-area pre"));
        assert_eq!(
            text_of(&doc, "div.flight-area span.price"),
            "86,344円 & tax"
        );
        let area = text_of(&doc, "div.flight-area");
        assert!(!area.contains("x()"));
    }

    #[test]
    fn test_malformed_markup_degrades() {
        let raw = r#"<div class="flight-area"><span class="price">1,000円<div class="flight-area">"#;
        let doc = sanitize_markup(raw);
        let sel = Selector::parse("div.flight-area").unwrap();
        assert_eq!(doc.select(&sel).count(), 2);
    }

    #[test]
    fn test_empty_input() {
        let doc = sanitize_markup("");
        let sel = Selector::parse("div").unwrap();
        assert_eq!(doc.select(&sel).count(), 0);
    }
}
