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

//! # Fares Results Parser
//!
//! Side-effect free extraction of fare records from an aggregator result page.
//! Cards are returned in document order, which is the site's own ranking
//! (cheapest first); nothing is re-sorted here.

use scraper::Html;

use crate::fare_record::{FareRecord, TripKind};
use crate::fares_query_builder::FareQuery;
use crate::field_locator::Locator;
use crate::markup_sanitizer::sanitize_markup;
use crate::record_assembler::assemble_card;

const FLIGHT_CARD: Locator = Locator::new("div", "flight-area");

#[derive(Debug, Clone)]
pub struct FareSearchResult {
    pub query: FareQuery,
    pub records: Vec<FareRecord>,
    pub raw_response: String,
}

impl FareSearchResult {
    /// Sanitizes and parses `html` for `query`. A page without cards gives an
    /// empty result, not an error. Records are stamped with the query's
    /// search URL.
    pub fn from_html(html: &str, query: FareQuery) -> Self {
        let mut records = parse_fares_response(html, query.trip);
        let url = query.search_url();
        for record in &mut records {
            record.source_url = Some(url.clone());
        }
        Self {
            query,
            records,
            raw_response: html.to_string(),
        }
    }

    /// Wraps records that did not come from a page (e.g. a cached batch).
    pub fn from_records(records: Vec<FareRecord>, query: FareQuery) -> Self {
        Self {
            query,
            records,
            raw_response: String::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The first `n` records as ranked by the site.
    pub fn top(&self, n: usize) -> &[FareRecord] {
        &self.records[..n.min(self.records.len())]
    }
}

/// Sanitizes raw page markup and extracts its records.
pub fn parse_fares_response(html: &str, trip: TripKind) -> Vec<FareRecord> {
    let document = sanitize_markup(html);
    extract_records(&document, trip)
}

/// Extracts one record per flight card of `document`, in document order.
///
/// Round-trip cards failing the shape check are dropped; every other card
/// yields a record even when all of its fields are sentinels.
pub fn extract_records(document: &Html, trip: TripKind) -> Vec<FareRecord> {
    let cards = FLIGHT_CARD.find_all(document.root_element());
    let card_count = cards.len();

    let records: Vec<FareRecord> = cards
        .into_iter()
        .filter_map(|card| assemble_card(card, trip))
        .collect();

    if records.len() < card_count {
        tracing::debug!(
            "Dropped {} of {} {:?} cards with an unexpected layout",
            card_count - records.len(),
            card_count,
            trip
        );
    }
    tracing::debug!("Extracted {} records from {} cards", records.len(), card_count);
    records
}
