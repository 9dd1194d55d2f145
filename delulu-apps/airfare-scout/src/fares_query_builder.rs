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

//! # Fares Query Builder
//!
//! Side-effect free construction and validation of aggregator searches.
//! One query is one (origin, destination, departure date) list page.

use std::fmt;

use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::fare_record::TripKind;

pub const SEARCH_BASE_URL: &str = "https://www.tour.ne.jp/w_air/list/";

// IATA airport or metropolitan area code (NRT, TYO).
static AIRPORT_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{3}$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FareQuery {
    pub origin: String,
    pub destination: String,
    pub depart_date: NaiveDate,
    pub trip: TripKind,
}

impl FareQuery {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        depart_date: NaiveDate,
        trip: TripKind,
    ) -> Self {
        Self {
            origin: origin.into().trim().to_uppercase(),
            destination: destination.into().trim().to_uppercase(),
            depart_date,
            trip,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            AIRPORT_CODE_RE.is_match(&self.origin),
            "Invalid origin airport code: '{}'",
            self.origin
        );
        ensure!(
            AIRPORT_CODE_RE.is_match(&self.destination),
            "Invalid destination airport code: '{}'",
            self.destination
        );
        ensure!(
            self.origin != self.destination,
            "Origin and destination are both {}",
            self.origin
        );
        Ok(())
    }

    /// List page URL. The departure date lives in the fragment: the page
    /// reads it client-side, which is why it has to be rendered.
    pub fn search_url(&self) -> String {
        format!(
            "{}?air_type={}&slice_info={}-{}#dpt_date={}&page_from=index",
            SEARCH_BASE_URL,
            self.trip.air_type(),
            urlencoding::encode(&self.origin),
            urlencoding::encode(&self.destination),
            self.depart_date.format("%Y-%m-%d")
        )
    }

    /// Names saved pages and cached batches: `ORIGIN-DEST-YYYYMMDD` for
    /// one-way, with the `air_type` appended for round-trip
    /// (`ORIGIN-DEST-YYYYMMDD-1`). One-way keeps the bare form so batches
    /// written before round-trip support still load.
    pub fn slug(&self) -> String {
        let base = format!(
            "{}-{}-{}",
            self.origin,
            self.destination,
            self.depart_date.format("%Y%m%d")
        );
        match self.trip {
            TripKind::OneWay => base,
            TripKind::RoundTrip => format!("{}-{}", base, self.trip.air_type()),
        }
    }
}

impl fmt::Display for FareQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} → {} on {}",
            self.origin, self.destination, self.depart_date
        )
    }
}

/// Parses `YYYYMMDD`, `YYYY-MM-DD` or `YYYY/MM/DD`.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .context(format!(
            "Invalid date format: {}. Use YYYYMMDD, YYYY-MM-DD or YYYY/MM/DD",
            s
        ))
}

/// Splits a comma separated setting, dropping blanks.
pub fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// One query per (destination, date), destinations outermost.
pub fn expand_queries(
    origin: &str,
    destinations: &[String],
    dates: &[NaiveDate],
    trip: TripKind,
) -> Result<Vec<FareQuery>> {
    ensure!(!destinations.is_empty(), "At least one destination is required");
    ensure!(!dates.is_empty(), "At least one departure date is required");

    let mut queries = Vec::with_capacity(destinations.len() * dates.len());
    for destination in destinations {
        for date in dates {
            let query = FareQuery::new(origin, destination.as_str(), *date, trip);
            query.validate()?;
            queries.push(query);
        }
    }
    Ok(queries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 27).unwrap()
    }

    #[test]
    fn test_search_url() {
        let query = FareQuery::new("tyo", " cmb ", date(), TripKind::OneWay);
        assert_eq!(
            query.search_url(),
            "https://www.tour.ne.jp/w_air/list/?air_type=0&slice_info=TYO-CMB#dpt_date=2025-12-27&page_from=index"
        );
        let round = FareQuery::new("TYO", "CMB", date(), TripKind::RoundTrip);
        assert!(round.search_url().contains("air_type=1"));
        assert_eq!(round.slug(), "TYO-CMB-20251227-1");
        assert_eq!(
            FareQuery::new("TYO", "CMB", date(), TripKind::OneWay).slug(),
            "TYO-CMB-20251227"
        );
    }

    #[test]
    fn test_validate() {
        assert!(FareQuery::new("TYO", "CMB", date(), TripKind::OneWay).validate().is_ok());
        assert!(FareQuery::new("TOKYO", "CMB", date(), TripKind::OneWay).validate().is_err());
        assert!(FareQuery::new("TYO", "C1B", date(), TripKind::OneWay).validate().is_err());
        assert!(FareQuery::new("TYO", "tyo", date(), TripKind::OneWay).validate().is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        for s in ["20251227", "2025-12-27", "2025/12/27", " 20251227 "] {
            assert_eq!(parse_date(s).unwrap(), date(), "{}", s);
        }
        assert!(parse_date("27/12/2025").is_err());
    }

    #[test]
    fn test_expand_queries() {
        let dests = parse_list("CMB, BKK,,");
        assert_eq!(dests, ["CMB", "BKK"]);
        let dates = vec![date(), date().succ_opt().unwrap()];
        let queries = expand_queries("TYO", &dests, &dates, TripKind::OneWay).unwrap();
        let slugs: Vec<_> = queries.iter().map(FareQuery::slug).collect();
        assert_eq!(
            slugs,
            [
                "TYO-CMB-20251227",
                "TYO-CMB-20251228",
                "TYO-BKK-20251227",
                "TYO-BKK-20251228"
            ]
        );
        assert!(expand_queries("TYO", &[], &dates, TripKind::OneWay).is_err());
        assert!(expand_queries("TYO", &["xx".to_string()], &dates, TripKind::OneWay).is_err());
    }
}
