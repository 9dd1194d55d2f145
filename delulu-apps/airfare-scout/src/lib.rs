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

// Library for delulu-airfare-scout
// Flight offers extraction from the tour.ne.jp aggregator result pages

// Extraction core: markup in, records out. No I/O.
mod fare_record;
mod fares_results_parser;
mod field_locator;
mod leg_extractor;
mod markup_sanitizer;
mod record_assembler;
mod record_normalizer;

// Glue: queries, page sources, cache, reports, delivery
mod airport_names;
mod fares_cache;
mod fares_query_builder;
mod fares_report;
mod fares_search;
mod telegram_sink;

pub use fare_record::{
    Endpoint, FareRecord, Leg, NOT_AVAILABLE, Route, Transfers, TripKind, join_flight_codes,
};
pub use fares_results_parser::{FareSearchResult, extract_records, parse_fares_response};
pub use field_locator::{Locator, field_text, field_texts};
pub use leg_extractor::{extract_direction, extract_leg, extract_transfer_airports};
pub use markup_sanitizer::{reduce_markup, sanitize_markup};
pub use record_assembler::{CardShape, assemble_card, assemble_one_way, assemble_round_trip};
pub use record_normalizer::{
    RecordShape, migrate_legacy, normalize_batch, normalize_record, normalize_records,
};

pub use airport_names::{airport_name, display_airport};
pub use fares_cache::{FaresCache, load_batch};
pub use fares_query_builder::{FareQuery, expand_queries, parse_date, parse_list};
pub use fares_report::{html_report, leg_times, summary_message};
pub use fares_search::*;
pub use delulu_page_queues::{PageQueue, PageQueueError};
pub use telegram_sink::{Delivery, TelegramConfig, TelegramSink, split_message};
