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

//! IATA code to display name lookup used when rendering reports.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Sorted by code. City-level codes (TYO, OSA, SEL, ...) are listed too as the
/// aggregator uses them in queries.
const AIRPORTS: &[(&str, &str)] = &[
    ("AKL", "Auckland"),
    ("AMS", "Amsterdam Schiphol"),
    ("BAH", "Bahrain"),
    ("BKK", "Bangkok Suvarnabhumi"),
    ("CAN", "Guangzhou Baiyun"),
    ("CDG", "Paris Charles de Gaulle"),
    ("CGK", "Jakarta Soekarno-Hatta"),
    ("CMB", "Colombo Bandaranaike"),
    ("CTS", "Sapporo New Chitose"),
    ("DEL", "Delhi Indira Gandhi"),
    ("DMK", "Bangkok Don Mueang"),
    ("DOH", "Doha Hamad"),
    ("DPS", "Bali Ngurah Rai"),
    ("DXB", "Dubai"),
    ("FCO", "Rome Fiumicino"),
    ("FRA", "Frankfurt"),
    ("FUK", "Fukuoka"),
    ("GMP", "Seoul Gimpo"),
    ("HAN", "Hanoi Noi Bai"),
    ("HEL", "Helsinki Vantaa"),
    ("HKG", "Hong Kong"),
    ("HND", "Tokyo Haneda"),
    ("HNL", "Honolulu"),
    ("ICN", "Seoul Incheon"),
    ("IST", "Istanbul"),
    ("ITM", "Osaka Itami"),
    ("JFK", "New York John F. Kennedy"),
    ("KIX", "Osaka Kansai"),
    ("KUL", "Kuala Lumpur"),
    ("KWI", "Kuwait"),
    ("LAX", "Los Angeles"),
    ("LHR", "London Heathrow"),
    ("MAA", "Chennai"),
    ("MEL", "Melbourne"),
    ("MLE", "Male Velana"),
    ("MNL", "Manila Ninoy Aquino"),
    ("NGO", "Nagoya Chubu Centrair"),
    ("NRT", "Tokyo Narita"),
    ("OKA", "Okinawa Naha"),
    ("OSA", "Osaka (all airports)"),
    ("PEK", "Beijing Capital"),
    ("PVG", "Shanghai Pudong"),
    ("SEL", "Seoul (all airports)"),
    ("SFO", "San Francisco"),
    ("SGN", "Ho Chi Minh City Tan Son Nhat"),
    ("SIN", "Singapore Changi"),
    ("SYD", "Sydney"),
    ("TPE", "Taipei Taoyuan"),
    ("TYO", "Tokyo (all airports)"),
    ("YVR", "Vancouver"),
];

static AIRPORT_INDEX: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| AIRPORTS.iter().copied().collect());

pub fn airport_name(code: &str) -> Option<&'static str> {
    AIRPORT_INDEX
        .get(code.trim().to_ascii_uppercase().as_str())
        .copied()
}

/// `NRT (Tokyo Narita)` for known codes. Anything else, including the
/// free-text airport names the page sometimes shows, is returned as is.
pub fn display_airport(code_or_name: &str) -> String {
    let trimmed = code_or_name.trim();
    match airport_name(trimmed) {
        Some(name) => format!("{} ({})", trimmed.to_ascii_uppercase(), name),
        None => trimmed.to_string(),
    }
}
