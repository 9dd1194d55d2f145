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

//! # Fare Records
//!
//! The canonical record shape every extraction and migration path converges to.
//! All text fields are kept exactly as rendered by the site (currency symbols,
//! unit suffixes, CJK text): nothing here is parsed into numbers.

use serde::{Deserialize, Serialize};

/// Placeholder for a field whose node was absent from the markup.
pub const NOT_AVAILABLE: &str = "N/A";

/// Trip type discriminator, mirrors the aggregator's `air_type` query flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripKind {
    #[default]
    OneWay,
    RoundTrip,
}

impl TripKind {
    /// `0` is one-way, `1` is round-trip; anything else is rejected.
    pub fn from_air_type(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(Self::OneWay),
            1 => Some(Self::RoundTrip),
            _ => None,
        }
    }

    pub fn air_type(self) -> u8 {
        match self {
            Self::OneWay => 0,
            Self::RoundTrip => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub date: String,
    pub time: String,
    pub airport: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            date: NOT_AVAILABLE.to_string(),
            time: NOT_AVAILABLE.to_string(),
            airport: NOT_AVAILABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfers {
    pub count_str: String,
    #[serde(default)]
    pub airports: Vec<String>,
}

impl Default for Transfers {
    fn default() -> Self {
        Self {
            count_str: NOT_AVAILABLE.to_string(),
            airports: Vec::new(),
        }
    }
}

/// One directional segment of an itinerary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub departure: Endpoint,
    pub arrival: Endpoint,
    pub duration: String,
    pub transfers: Transfers,
}

impl Default for Leg {
    fn default() -> Self {
        Self {
            departure: Endpoint::default(),
            arrival: Endpoint::default(),
            duration: NOT_AVAILABLE.to_string(),
            transfers: Transfers::default(),
        }
    }
}

/// Direction-specific part of a record.
///
/// Serialized inline into the record: a one-way record carries
/// `departure`/`arrival`/`duration`/`transfers` at the top level, a round-trip
/// record carries `outbound`/`return`/`stay_duration`/`transfer_airports`.
///
/// The site lists transfer airports once per card, not per direction, so a
/// round-trip record keeps them as a single combined list and both legs have
/// an empty `transfers.airports`. Which airport belongs to which direction is
/// not recoverable from the markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Route {
    RoundTrip {
        outbound: Leg,
        #[serde(rename = "return")]
        inbound: Leg,
        stay_duration: String,
        #[serde(default)]
        transfer_airports: Vec<String>,
    },
    OneWay(Leg),
}

impl Default for Route {
    fn default() -> Self {
        Self::OneWay(Leg::default())
    }
}

impl Route {
    pub fn is_round_trip(&self) -> bool {
        matches!(self, Self::RoundTrip { .. })
    }

    /// The first leg flown: the only leg for one-way, the outbound for round-trip.
    pub fn first_leg(&self) -> &Leg {
        match self {
            Self::OneWay(leg) => leg,
            Self::RoundTrip { outbound, .. } => outbound,
        }
    }

    /// Every transfer airport known for the itinerary, in document order.
    pub fn transfer_airports(&self) -> &[String] {
        match self {
            Self::OneWay(leg) => &leg.transfers.airports,
            Self::RoundTrip {
                transfer_airports, ..
            } => transfer_airports,
        }
    }
}

/// One priced itinerary offering as listed on the result page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareRecord {
    pub provider_name: String,
    pub price: String,
    pub trip_type: String,
    pub airline: String,
    /// Display form of `flight_codes`, kept for consumers of older batches.
    pub flight_code: String,
    #[serde(default)]
    pub flight_codes: Vec<String>,
    #[serde(flatten)]
    pub route: Route,
    pub plane_model: String,
    #[serde(default)]
    pub baggage: Vec<String>,
    /// Result page the record was read from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl Default for FareRecord {
    fn default() -> Self {
        Self {
            provider_name: NOT_AVAILABLE.to_string(),
            price: NOT_AVAILABLE.to_string(),
            trip_type: NOT_AVAILABLE.to_string(),
            airline: NOT_AVAILABLE.to_string(),
            flight_code: NOT_AVAILABLE.to_string(),
            flight_codes: Vec::new(),
            route: Route::default(),
            plane_model: NOT_AVAILABLE.to_string(),
            baggage: Vec::new(),
            source_url: None,
        }
    }
}

/// Joins flight codes for display; an empty list renders as the sentinel.
pub fn join_flight_codes(codes: &[String]) -> String {
    if codes.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        codes.join(", ")
    }
}
