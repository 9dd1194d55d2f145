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

//! Live searches rendered in a headless Chrome.
//!
//! Needs a local Chrome/Chromium and network access.
//! Run with: cargo test --features browser --test t_fares_browser_live -- --include-ignored
#![cfg(feature = "browser")]

use anyhow::Result;
use chrono::{Months, NaiveDate};
use delulu_airfare_scout::{
    FareQuery, MarkupSource, NOT_AVAILABLE, RenderConfig, TourFaresClient, TripKind,
};

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn client() -> TourFaresClient {
    TourFaresClient::new(MarkupSource::Browser(RenderConfig {
        devtools_url: std::env::var("DEVTOOLS_URL").ok(),
        ..Default::default()
    }))
}

#[tokio::test]
#[ignore]
async fn test_live_one_way_search() -> Result<()> {
    let query = FareQuery::new("TYO", "CMB", today() + Months::new(2), TripKind::OneWay);
    println!("🔗 URL for manual check:\n{}", query.search_url());

    let result = client().search_fares(&query).await?;
    println!("Parsed {} records", result.len());

    assert!(!result.is_empty(), "no fares rendered for {}", query);
    let first = &result.records[0];
    println!("Best: {} {}", first.price, first.provider_name);
    assert_ne!(first.price, NOT_AVAILABLE);
    assert!(!first.route.is_round_trip());
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_live_round_trip_search() -> Result<()> {
    let query = FareQuery::new("TYO", "BKK", today() + Months::new(3), TripKind::RoundTrip);
    println!("🔗 URL for manual check:\n{}", query.search_url());

    let result = client().search_fares(&query).await?;
    println!("Parsed {} records", result.len());

    for record in &result.records {
        assert!(record.route.is_round_trip());
    }
    Ok(())
}
