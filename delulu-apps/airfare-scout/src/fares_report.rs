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

//! # Fare reports
//!
//! Renders the top records of a search, in the order the site ranked them,
//! as a chat message (Telegram legacy Markdown) or as a standalone HTML page.
//! Both work on one-way and round-trip records alike.

use std::fmt::Write;

use crate::airport_names::display_airport;
use crate::fare_record::{FareRecord, Leg, NOT_AVAILABLE, Route, TripKind};
use crate::fares_results_parser::FareSearchResult;

fn trip_label(trip: TripKind) -> &'static str {
    match trip {
        TripKind::OneWay => "one-way",
        TripKind::RoundTrip => "round-trip",
    }
}

/// `15:30 NRT (Tokyo Narita) → 23:40 CMB (Colombo Bandaranaike)`
pub fn leg_times(leg: &Leg) -> String {
    format!(
        "{} {} → {} {}",
        leg.departure.time,
        display_airport(&leg.departure.airport),
        leg.arrival.time,
        display_airport(&leg.arrival.airport)
    )
}

/// `35時間40分, 乗継3回/自己 via SIN, KUL`
fn leg_stops(leg: &Leg, airports: &[String]) -> String {
    let mut line = format!("{}, {}", leg.duration, leg.transfers.count_str);
    if !airports.is_empty() {
        let _ = write!(line, " via {}", airports.join(", "));
    }
    line
}

/// Airline plus flight numbers, leaving out what the page did not show.
fn carrier(record: &FareRecord) -> String {
    match (record.airline.as_str(), record.flight_code.as_str()) {
        (NOT_AVAILABLE, NOT_AVAILABLE) => NOT_AVAILABLE.to_string(),
        (airline, NOT_AVAILABLE) => airline.to_string(),
        (NOT_AVAILABLE, codes) => codes.to_string(),
        (airline, codes) => format!("{} {}", airline, codes),
    }
}

/// Characters with a meaning in Telegram's legacy Markdown.
fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Chat message listing the `top` first records of `result`.
pub fn summary_message(result: &FareSearchResult, top: usize) -> String {
    let query = &result.query;
    let mut msg = format!(
        "✈️ *{} → {}* {} ({})\n",
        escape_markdown(&display_airport(&query.origin)),
        escape_markdown(&display_airport(&query.destination)),
        query.depart_date,
        trip_label(query.trip)
    );

    let shown = result.top(top);
    if shown.is_empty() {
        msg.push_str("No fares found.\n");
        return msg;
    }
    let _ = writeln!(msg, "{} fares, top {}:", result.len(), shown.len());

    for (i, record) in shown.iter().enumerate() {
        let _ = writeln!(
            msg,
            "\n{}. *{}* {}",
            i + 1,
            escape_markdown(&record.price),
            escape_markdown(&record.provider_name)
        );
        let _ = writeln!(msg, "   {}", escape_markdown(&carrier(record)));
        match &record.route {
            Route::OneWay(leg) => {
                let _ = writeln!(msg, "   {}", escape_markdown(&leg_times(leg)));
                let _ = writeln!(
                    msg,
                    "   {}",
                    escape_markdown(&leg_stops(leg, &leg.transfers.airports))
                );
            }
            Route::RoundTrip {
                outbound,
                inbound,
                stay_duration,
                transfer_airports,
            } => {
                let _ = writeln!(msg, "   ↗ {}", escape_markdown(&leg_times(outbound)));
                let _ = writeln!(msg, "     {}", escape_markdown(&leg_stops(outbound, &[])));
                let _ = writeln!(msg, "   ↙ {}", escape_markdown(&leg_times(inbound)));
                let _ = writeln!(msg, "     {}", escape_markdown(&leg_stops(inbound, &[])));
                let _ = writeln!(msg, "   Stay: {}", escape_markdown(stay_duration));
                if !transfer_airports.is_empty() {
                    let _ = writeln!(
                        msg,
                        "   Transfers via {}",
                        escape_markdown(&transfer_airports.join(", "))
                    );
                }
            }
        }
    }
    msg
}

const REPORT_STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse;margin-bottom:2em}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:left;vertical-align:top}\
th{background:#f0f0f0}\
.price{font-weight:bold;white-space:nowrap}";

fn html_leg_cell(leg: &Leg, airports: &[String]) -> String {
    format!(
        "{}<br>{}<br>{}",
        escape_html(&format!("{} {}", leg.departure.date, leg.departure.time)),
        escape_html(&leg_times(leg)),
        escape_html(&leg_stops(leg, airports))
    )
}

fn html_section(out: &mut String, result: &FareSearchResult, top: usize) {
    let query = &result.query;
    let _ = writeln!(
        out,
        "<h2>{} → {} on {} ({})</h2>",
        escape_html(&display_airport(&query.origin)),
        escape_html(&display_airport(&query.destination)),
        query.depart_date,
        trip_label(query.trip)
    );

    let shown = result.top(top);
    if shown.is_empty() {
        out.push_str("<p>No fares found.</p>\n");
        return;
    }
    let round_trip = shown.iter().any(|r| r.route.is_round_trip());

    out.push_str("<table>\n<tr><th>#</th><th>Price</th><th>Provider</th><th>Flights</th>");
    if round_trip {
        out.push_str("<th>Outbound</th><th>Return</th><th>Stay</th>");
    } else {
        out.push_str("<th>Schedule</th>");
    }
    out.push_str("<th>Aircraft</th><th>Baggage</th></tr>\n");

    for (i, record) in shown.iter().enumerate() {
        let _ = write!(
            out,
            "<tr><td>{}</td><td class=\"price\">{}</td><td>{}</td><td>{}</td>",
            i + 1,
            escape_html(&record.price),
            escape_html(&record.provider_name),
            escape_html(&carrier(record))
        );
        match &record.route {
            Route::OneWay(leg) => {
                let _ = write!(out, "<td>{}</td>", html_leg_cell(leg, &leg.transfers.airports));
                if round_trip {
                    out.push_str("<td></td><td></td>");
                }
            }
            Route::RoundTrip {
                outbound,
                inbound,
                stay_duration,
                transfer_airports,
            } => {
                let mut stay = escape_html(stay_duration);
                if !transfer_airports.is_empty() {
                    let _ = write!(
                        stay,
                        "<br>via {}",
                        escape_html(&transfer_airports.join(", "))
                    );
                }
                let _ = write!(
                    out,
                    "<td>{}</td><td>{}</td><td>{}</td>",
                    html_leg_cell(outbound, &[]),
                    html_leg_cell(inbound, &[]),
                    stay
                );
            }
        }
        let baggage = if record.baggage.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            record
                .baggage
                .iter()
                .map(|b| escape_html(b))
                .collect::<Vec<_>>()
                .join("<br>")
        };
        let _ = writeln!(
            out,
            "<td>{}</td><td>{}</td></tr>",
            escape_html(&record.plane_model),
            baggage
        );
    }
    out.push_str("</table>\n");
}

/// Standalone HTML page with one table per search.
pub fn html_report(results: &[FareSearchResult], top: usize) -> String {
    let mut out = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(
        out,
        "<title>Airfare report</title>\n<style>{}</style>\n</head>\n<body>\n<h1>Airfare report</h1>",
        REPORT_STYLE
    );
    for result in results {
        html_section(&mut out, result, top);
    }
    out.push_str("</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fare_record::{Endpoint, Transfers};
    use crate::fares_query_builder::FareQuery;
    use chrono::NaiveDate;

    fn leg(from: &str, to: &str, dep: &str, arr: &str) -> Leg {
        Leg {
            departure: Endpoint {
                date: "2025年12月27日".into(),
                time: dep.into(),
                airport: from.into(),
            },
            arrival: Endpoint {
                date: "2025年12月28日".into(),
                time: arr.into(),
                airport: to.into(),
            },
            duration: "35時間40分".into(),
            transfers: Transfers {
                count_str: "乗継3回/自己".into(),
                airports: Vec::new(),
            },
        }
    }

    fn one_way(price: &str, provider: &str) -> FareRecord {
        let mut outbound = leg("NRT", "CMB", "15:30", "23:40");
        outbound.transfers.airports = vec!["SIN".into(), "KUL".into()];
        FareRecord {
            provider_name: provider.into(),
            price: price.into(),
            trip_type: "片道".into(),
            airline: "シンガポール航空".into(),
            flight_code: "SQ636, SQ468".into(),
            flight_codes: vec!["SQ636".into(), "SQ468".into()],
            route: Route::OneWay(outbound),
            plane_model: "ボーイング777".into(),
            baggage: vec!["手荷物1個無料".into(), "受託荷物23kg無料".into()],
            source_url: None,
        }
    }

    fn result(trip: TripKind, records: Vec<FareRecord>) -> FareSearchResult {
        FareSearchResult::from_records(
            records,
            FareQuery::new(
                "TYO",
                "CMB",
                NaiveDate::from_ymd_opt(2025, 12, 27).unwrap(),
                trip,
            ),
        )
    }

    #[test]
    fn test_summary_lists_top_records_in_order() {
        let r = result(
            TripKind::OneWay,
            vec![
                one_way("86,344円", "Gotogate"),
                one_way("86,415円", "Gotogate"),
                one_way("99,828円", "エクスペディア"),
            ],
        );
        let msg = summary_message(&r, 2);
        assert!(msg.starts_with("✈️ *TYO (Tokyo (all airports)) → CMB"), "{msg}");
        assert!(msg.contains("3 fares, top 2:"));
        let first = msg.find("86,344円").unwrap();
        let second = msg.find("86,415円").unwrap();
        assert!(first < second);
        assert!(!msg.contains("99,828円"));
        assert!(msg.contains("15:30 NRT (Tokyo Narita) → 23:40 CMB (Colombo Bandaranaike)"));
        assert!(msg.contains("via SIN, KUL"));
    }

    #[test]
    fn test_summary_escapes_markdown() {
        let r = result(TripKind::OneWay, vec![one_way("86,344円", "trip_com*")]);
        let msg = summary_message(&r, 5);
        assert!(msg.contains("trip\\_com\\*"));
    }

    #[test]
    fn test_summary_for_empty_result() {
        let r = result(TripKind::OneWay, Vec::new());
        assert!(summary_message(&r, 5).ends_with("No fares found.\n"));
    }

    #[test]
    fn test_summary_round_trip() {
        let mut record = one_way("150,000円", "Trip.com");
        record.route = Route::RoundTrip {
            outbound: leg("NRT", "CMB", "15:30", "23:40"),
            inbound: leg("CMB", "NRT", "01:10", "18:05"),
            stay_duration: "7日間".into(),
            transfer_airports: vec!["SIN".into(), "BKK".into()],
        };
        let msg = summary_message(&result(TripKind::RoundTrip, vec![record]), 5);
        assert!(msg.contains("↗ 15:30 NRT"));
        assert!(msg.contains("↙ 01:10 CMB"));
        assert!(msg.contains("Stay: 7日間"));
        assert!(msg.contains("Transfers via SIN, BKK"));
    }

    #[test]
    fn test_carrier_skips_missing_parts() {
        let mut record = one_way("1円", "x");
        record.flight_code = NOT_AVAILABLE.into();
        assert_eq!(carrier(&record), "シンガポール航空");
        record.airline = NOT_AVAILABLE.into();
        assert_eq!(carrier(&record), NOT_AVAILABLE);
    }

    #[test]
    fn test_html_report_escapes_and_structures() {
        let r = result(
            TripKind::OneWay,
            vec![one_way("86,344円", "<b>Gotogate</b>")],
        );
        let html = html_report(&[r], 5);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("&lt;b&gt;Gotogate&lt;/b&gt;"));
        assert!(!html.contains("<b>Gotogate"));
        assert!(html.contains("<th>Schedule</th>"));
        assert!(html.contains("手荷物1個無料<br>受託荷物23kg無料"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_html_report_mixed_shapes_use_round_trip_columns() {
        let mut rt = one_way("150,000円", "Trip.com");
        rt.route = Route::RoundTrip {
            outbound: leg("NRT", "CMB", "15:30", "23:40"),
            inbound: leg("CMB", "NRT", "01:10", "18:05"),
            stay_duration: "7日間".into(),
            transfer_airports: Vec::new(),
        };
        let r = result(TripKind::RoundTrip, vec![rt, one_way("90,000円", "Gotogate")]);
        let html = html_report(&[r], 5);
        assert!(html.contains("<th>Return</th>"));
        assert!(html.contains("<td>7日間</td>"));
        assert!(html.contains("<td></td><td></td>"));
    }
}
