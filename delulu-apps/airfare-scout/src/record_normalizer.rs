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

//! # Record Normalizer
//!
//! Brings batches written by older releases and by the current extractor to
//! the canonical [`FareRecord`] shape, so report code never has to care where
//! a record came from.
//!
//! Two shapes exist on disk:
//! - the legacy flat shape, with every schedule field nested under `schedule`
//!   and no dates, airline, flight codes, aircraft or baggage;
//! - the canonical shape, as serialized by [`FareRecord`].
//!
//! The shape is decided by one structural probe (presence of `schedule`).
//! Legacy records are rewritten through [`LEGACY_SCHEDULE_FIELDS`] into a
//! canonical object, then every record goes through the same canonical read,
//! which defaults any absent key. The optional `source_url` of either shape
//! is carried over as is.

use serde_json::{Map, Value, json};

use crate::fare_record::{
    Endpoint, FareRecord, Leg, NOT_AVAILABLE, Route, Transfers, join_flight_codes,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    LegacySchedule,
    Canonical,
}

impl RecordShape {
    pub fn detect(value: &Value) -> Self {
        if value.get("schedule").is_some() {
            Self::LegacySchedule
        } else {
            Self::Canonical
        }
    }
}

/// Legacy JSON pointer to canonical JSON pointer, renamed one to one.
pub const LEGACY_SCHEDULE_FIELDS: &[(&str, &str)] = &[
    ("/provider_name", "/provider_name"),
    ("/price", "/price"),
    ("/schedule/trip_type", "/trip_type"),
    ("/schedule/departure_time", "/departure/time"),
    ("/schedule/departure_airport", "/departure/airport"),
    ("/schedule/arrival_time", "/arrival/time"),
    ("/schedule/arrival_airport", "/arrival/airport"),
    ("/schedule/duration", "/duration"),
    ("/schedule/transfers", "/transfers/count_str"),
    ("/source_url", "/source_url"),
];

/// Canonical fields the legacy shape cannot provide, with the value they get.
fn legacy_unavailable_fields() -> [(&'static str, Value); 3] {
    [
        ("/departure/date", json!("")),
        ("/arrival/date", json!("")),
        ("/transfers/airports", json!([])),
    ]
}

/// Sets `value` at `pointer`, creating intermediate objects.
fn insert_at(target: &mut Map<String, Value>, pointer: &str, value: Value) {
    let mut segments: Vec<&str> = pointer.trim_start_matches('/').split('/').collect();
    let Some(last) = segments.pop() else {
        return;
    };
    let mut current = target;
    for segment in segments {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(next) => current = next,
            _ => return,
        }
    }
    current.insert(last.to_string(), value);
}

/// Rewrites a legacy flat record into a canonical JSON object.
pub fn migrate_legacy(value: &Value) -> Value {
    let mut canonical = Map::new();
    for (from, to) in LEGACY_SCHEDULE_FIELDS {
        if let Some(v) = value.pointer(from) {
            insert_at(&mut canonical, to, v.clone());
        }
    }
    for (to, v) in legacy_unavailable_fields() {
        insert_at(&mut canonical, to, v);
    }
    Value::Object(canonical)
}

fn text_at(value: &Value, pointer: &str) -> String {
    match value.pointer(pointer) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn texts_at(value: &Value, pointer: &str) -> Option<Vec<String>> {
    let items = value.pointer(pointer)?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
    )
}

fn leg_at(value: &Value, prefix: &str) -> Leg {
    let endpoint = |side: &str| Endpoint {
        date: text_at(value, &format!("{prefix}/{side}/date")),
        time: text_at(value, &format!("{prefix}/{side}/time")),
        airport: text_at(value, &format!("{prefix}/{side}/airport")),
    };
    Leg {
        departure: endpoint("departure"),
        arrival: endpoint("arrival"),
        duration: text_at(value, &format!("{prefix}/duration")),
        transfers: Transfers {
            count_str: text_at(value, &format!("{prefix}/transfers/count_str")),
            airports: texts_at(value, &format!("{prefix}/transfers/airports")).unwrap_or_default(),
        },
    }
}

/// Reads a canonical-shaped object, defaulting every absent key.
fn read_canonical(value: &Value) -> FareRecord {
    let route = if value.get("outbound").is_some() || value.get("return").is_some() {
        Route::RoundTrip {
            outbound: leg_at(value, "/outbound"),
            inbound: leg_at(value, "/return"),
            stay_duration: text_at(value, "/stay_duration"),
            transfer_airports: texts_at(value, "/transfer_airports").unwrap_or_default(),
        }
    } else {
        Route::OneWay(leg_at(value, ""))
    };

    let flight_codes = texts_at(value, "/flight_codes").unwrap_or_else(|| {
        text_at(value, "/flight_code")
            .split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty() && *code != NOT_AVAILABLE)
            .map(str::to_string)
            .collect()
    });
    let flight_code = match value.get("flight_code") {
        Some(Value::String(s)) => s.clone(),
        _ => join_flight_codes(&flight_codes),
    };

    FareRecord {
        provider_name: text_at(value, "/provider_name"),
        price: text_at(value, "/price"),
        trip_type: text_at(value, "/trip_type"),
        airline: text_at(value, "/airline"),
        flight_code,
        flight_codes,
        route,
        plane_model: text_at(value, "/plane_model"),
        baggage: texts_at(value, "/baggage").unwrap_or_default(),
        source_url: value
            .get("source_url")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

/// Maps one record of any known shape to the canonical record.
pub fn normalize_record(value: &Value) -> FareRecord {
    match RecordShape::detect(value) {
        RecordShape::LegacySchedule => read_canonical(&migrate_legacy(value)),
        RecordShape::Canonical => read_canonical(value),
    }
}

/// Normalizes a heterogeneous sequence of records, keeping its order.
/// Entries that are not JSON objects are skipped.
pub fn normalize_records(values: &[Value]) -> Vec<FareRecord> {
    values
        .iter()
        .filter(|value| {
            let is_object = value.is_object();
            if !is_object {
                tracing::warn!("Skipping non-object record in batch: {}", value);
            }
            is_object
        })
        .map(normalize_record)
        .collect()
}

/// Normalizes a whole batch document: an array of records or a single record.
pub fn normalize_batch(batch: &Value) -> Vec<FareRecord> {
    match batch {
        Value::Array(values) => normalize_records(values),
        Value::Object(_) => vec![normalize_record(batch)],
        other => {
            tracing::warn!("Unexpected batch document type: {}", other);
            Vec::new()
        }
    }
}
