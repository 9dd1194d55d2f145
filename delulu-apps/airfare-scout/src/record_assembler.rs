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

//! # Record Assembler
//!
//! Turns one flight card into one [`FareRecord`]. One-way cards are read as a
//! single direction; round-trip cards must show two direction headers and two
//! detailed-leg sections, otherwise the card is dropped rather than recorded
//! half-filled.

use scraper::ElementRef;

use crate::fare_record::{FareRecord, NOT_AVAILABLE, Route, TripKind, join_flight_codes};
use crate::field_locator::{Locator, element_text, field_text, field_texts};
use crate::leg_extractor::{extract_direction, extract_transfer_airports};

const PROVIDER: Locator = Locator::new("div", "flight-summary-hdg");
const PRICE: Locator = Locator::new("span", "price");
const SPAN: Locator = Locator::tag("span");
const DIRECTION_HEADER: Locator = Locator::new("div", "sch-header");
const TRIP_TYPE: Locator = DIRECTION_HEADER.then(&SPAN);
const LEG_SECTION: Locator = Locator::new("div", "sch-detail");
const AIRLINE: Locator = Locator::new("span", "air-name");
const FLIGHT_CODE: Locator = Locator::new("span", "flt-code");
const EQUIPMENT: Locator = Locator::new("li", "equipment");
const SUMMARY_INFO: Locator = Locator::new("ul", "summary-info");
const LIST_ITEM: Locator = Locator::tag("li");
const STAY_ITEM: Locator = Locator::new("div", "stay-item");

/// Direction-header and detailed-leg section counts of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardShape {
    pub headers: usize,
    pub legs: usize,
}

impl CardShape {
    pub fn of(card: ElementRef) -> Self {
        Self {
            headers: DIRECTION_HEADER.count(card),
            legs: LEG_SECTION.count(card),
        }
    }

    pub fn is_round_trip(&self) -> bool {
        self.headers >= 2 && self.legs >= 2
    }
}

/// Aircraft model from the equipment amenity. Newer cards split it into
/// spans (icon, label, model): the third span holds the model.
fn extract_plane_model(card: ElementRef) -> String {
    let Some(equipment) = EQUIPMENT.find(card) else {
        return NOT_AVAILABLE.to_string();
    };
    let spans = SPAN.find_all(equipment);
    let text = match spans.get(2) {
        Some(model) => element_text(*model),
        None => element_text(equipment),
    };
    text.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn extract_baggage(card: ElementRef) -> Vec<String> {
    field_texts(SUMMARY_INFO.find(card), &LIST_ITEM)
}

/// Card-level fields shared by both layouts, with the route filled in by the caller.
fn card_record(card: ElementRef, route: Route) -> FareRecord {
    let root = Some(card);
    let flight_codes = field_texts(root, &FLIGHT_CODE);
    FareRecord {
        provider_name: field_text(root, &PROVIDER),
        price: field_text(root, &PRICE),
        trip_type: field_text(root, &TRIP_TYPE),
        airline: field_text(root, &AIRLINE),
        flight_code: join_flight_codes(&flight_codes),
        flight_codes,
        route,
        plane_model: extract_plane_model(card),
        baggage: extract_baggage(card),
        source_url: None,
    }
}

/// Assembles a one-way record. Never fails: absent nodes become sentinels.
pub fn assemble_one_way(card: ElementRef) -> FareRecord {
    let mut leg = extract_direction(card);
    leg.transfers.airports = extract_transfer_airports(card);
    card_record(card, Route::OneWay(leg))
}

/// Assembles a round-trip record, or `None` when the card does not show two
/// direction headers and two detailed-leg sections.
pub fn assemble_round_trip(card: ElementRef) -> Option<FareRecord> {
    let shape = CardShape::of(card);
    if !shape.is_round_trip() {
        tracing::debug!(
            "Skipping round-trip card: {} direction headers, {} leg sections",
            shape.headers,
            shape.legs
        );
        return None;
    }

    let mut legs = LEG_SECTION.find_all(card).into_iter().map(extract_direction);
    let outbound = legs.next()?;
    let inbound = legs.next()?;

    let route = Route::RoundTrip {
        outbound,
        inbound,
        stay_duration: field_text(Some(card), &STAY_ITEM),
        transfer_airports: extract_transfer_airports(card),
    };
    Some(card_record(card, route))
}

/// Dispatches a card on the page's trip type.
pub fn assemble_card(card: ElementRef, trip: TripKind) -> Option<FareRecord> {
    match trip {
        TripKind::OneWay => Some(assemble_one_way(card)),
        TripKind::RoundTrip => assemble_round_trip(card),
    }
}
