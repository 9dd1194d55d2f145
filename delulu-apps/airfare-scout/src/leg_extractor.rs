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

//! # Leg Extractor
//!
//! Builds one [`Leg`] from the departure side, arrival side and term block of
//! a direction. The site names departure and arrival fields differently
//! (`dpt-*` versus `arr-*`), so each side has its own locator table and the
//! two are never swapped for one another.

use scraper::ElementRef;

use crate::fare_record::{Endpoint, Leg, NOT_AVAILABLE, Transfers};
use crate::field_locator::{Locator, field_text, field_texts, find_text, first_line};

struct EndpointLocators {
    date: Locator,
    time: Locator,
    airport: Locator,
}

static DEPARTURE_FIELDS: EndpointLocators = EndpointLocators {
    date: Locator::new("div", "dpt-date"),
    time: Locator::new("div", "dpt-time"),
    airport: Locator::new("div", "dpt-airport"),
};

static ARRIVAL_FIELDS: EndpointLocators = EndpointLocators {
    date: Locator::new("div", "arr-date"),
    time: Locator::new("div", "arr-time"),
    airport: Locator::new("div", "arr-airport"),
};

const GOING_AREA: Locator = Locator::new("div", "going-area");
const RETURN_AREA: Locator = Locator::new("div", "return-area");
const TERM_BLOCK: Locator = Locator::new("div", "flt-term");

const FIRST_ELEMENT: Locator = Locator::any();
const HOUR_CONTAINER: Locator = Locator::new("div", "flt-hour");
const HOUR_FIRST_ELEMENT: Locator = HOUR_CONTAINER.then(&FIRST_ELEMENT);
// Pre-2025 layout: duration is the text of a bare span.
const LEGACY_HOUR: Locator = Locator::new("span", "hour");
const TRANSFER_SUMMARY: Locator = Locator::new("span", "transfer");

const AIRPORT_NAME: Locator = Locator::new("a", "airport-name");
const AIRPORT_TRANSFER: Locator = Locator::new("dd", "airport-transfer").then(&AIRPORT_NAME);

fn extract_endpoint(side: Option<ElementRef>, fields: &EndpointLocators) -> Endpoint {
    Endpoint {
        date: field_text(side, &fields.date),
        time: field_text(side, &fields.time),
        airport: field_text(side, &fields.airport),
    }
}

/// Duration shown in the term block, first line only.
fn extract_duration(term: Option<ElementRef>) -> String {
    [&HOUR_FIRST_ELEMENT, &HOUR_CONTAINER, &LEGACY_HOUR]
        .into_iter()
        .find_map(|locator| find_text(term, locator))
        .map(|text| first_line(&text).to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Extracts one leg from its two sides and its term block.
///
/// Transfer airports are not part of a leg in the markup; callers fill
/// `transfers.airports` from [`extract_transfer_airports`] when they can
/// attribute them.
pub fn extract_leg(
    departure_side: Option<ElementRef>,
    arrival_side: Option<ElementRef>,
    term: Option<ElementRef>,
) -> Leg {
    Leg {
        departure: extract_endpoint(departure_side, &DEPARTURE_FIELDS),
        arrival: extract_endpoint(arrival_side, &ARRIVAL_FIELDS),
        duration: extract_duration(term),
        transfers: Transfers {
            count_str: field_text(term, &TRANSFER_SUMMARY),
            airports: Vec::new(),
        },
    }
}

/// Locates the sides and term block inside `section` (a detailed-leg section,
/// or a whole one-way card) and extracts the leg.
///
/// Older markup keeps the arrival fields inside the going area, which is used
/// when no return area exists.
pub fn extract_direction(section: ElementRef) -> Leg {
    let going = GOING_AREA.find(section);
    let arriving = RETURN_AREA.find(section).or(going);
    let term = TERM_BLOCK.find(section);
    tracing::trace!(
        "Direction sides: going={} return={} term={}",
        going.is_some(),
        arriving.is_some(),
        term.is_some()
    );
    extract_leg(going, arriving, term)
}

/// Transfer airport codes listed anywhere in `card`, in document order.
pub fn extract_transfer_airports(card: ElementRef) -> Vec<String> {
    field_texts(Some(card), &AIRPORT_TRANSFER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn root(html: &Html) -> ElementRef<'_> {
        html.root_element()
    }

    #[test]
    fn test_leg_without_date_keeps_first_duration_line() {
        let html = Html::parse_fragment(
            "<div class=\"going-area\"><div class=\"dpt-time\">15:30</div><div class=\"dpt-airport\">NRT</div></div>\
             <div class=\"return-area\"><div class=\"arr-date\">12月28日</div><div class=\"arr-time\">23:40</div>\
             <div class=\"arr-airport\">CMB</div></div>\
             <div class=\"flt-term\"><div class=\"flt-hour\"><span>35時間40分\nvia SIN</span></div>\
             <span class=\"transfer\">乗継3回/自己</span></div>",
        );
        let leg = extract_direction(root(&html));
        assert_eq!(
            leg.departure,
            Endpoint {
                date: NOT_AVAILABLE.into(),
                time: "15:30".into(),
                airport: "NRT".into(),
            }
        );
        assert_eq!(leg.arrival.date, "12月28日");
        assert_eq!(leg.arrival.airport, "CMB");
        assert_eq!(leg.duration, "35時間40分");
        assert_eq!(leg.transfers.count_str, "乗継3回/自己");
        assert!(leg.transfers.airports.is_empty());
    }

    #[test]
    fn test_departure_and_arrival_locators_are_distinct() {
        // Arrival classes inside the going area must not leak into departure.
        let html = Html::parse_fragment(
            r#"<div class="going-area"><div class="arr-airport">CMB</div></div>
               <div class="return-area"><div class="dpt-airport">NRT</div></div>"#,
        );
        let going = GOING_AREA.find(root(&html));
        let arriving = RETURN_AREA.find(root(&html));
        let leg = extract_leg(going, arriving, None);
        assert_eq!(leg.departure.airport, NOT_AVAILABLE);
        assert_eq!(leg.arrival.airport, NOT_AVAILABLE);
    }

    #[test]
    fn test_legacy_layout_falls_back_to_going_area() {
        let html = Html::parse_fragment(
            r#"<div class="going-area"><div class="dpt-time">10:05</div><div class="dpt-airport">HND</div>
               <div class="arr-time">18:20</div><div class="arr-airport">SIN</div></div>
               <div class="flt-term"><span class="hour">8時間15分</span><span class="transfer">直行便</span></div>"#,
        );
        let leg = extract_direction(root(&html));
        assert_eq!(leg.departure.time, "10:05");
        assert_eq!(leg.arrival.time, "18:20");
        assert_eq!(leg.arrival.airport, "SIN");
        assert_eq!(leg.arrival.date, NOT_AVAILABLE);
        assert_eq!(leg.duration, "8時間15分");
        assert_eq!(leg.transfers.count_str, "直行便");
    }

    #[test]
    fn test_hour_container_without_nested_element() {
        let html = Html::parse_fragment(
            r#"<div class="flt-term"><div class="flt-hour">12時間</div></div>"#,
        );
        let term = TERM_BLOCK.find(root(&html));
        assert_eq!(extract_duration(term), "12時間");
    }

    #[test]
    fn test_empty_section_is_all_sentinels() {
        let html = Html::parse_fragment("<div></div>");
        assert_eq!(extract_direction(root(&html)), Leg::default());
    }

    #[test]
    fn test_transfer_airports_in_document_order() {
        let html = Html::parse_fragment(
            r#"<dl><dt>乗継</dt><dd class="airport-transfer"><a class="airport-name">SIN</a></dd>
               <dd class="airport-transfer"><a class="airport-name">KUL</a></dd>
               <dd class="airport-transfer"><a class="airport-name">BKK</a></dd></dl>"#,
        );
        assert_eq!(
            extract_transfer_airports(root(&html)),
            vec!["SIN", "KUL", "BKK"]
        );
    }
}
