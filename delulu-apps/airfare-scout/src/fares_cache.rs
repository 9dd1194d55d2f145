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

//! # Fares cache
//!
//! One file per fetch, `<ORIGIN>-<DEST>-<YYYYMMDD>-<YYYYmmdd_HHMMSS>.json`
//! for one-way and `<ORIGIN>-<DEST>-<YYYYMMDD>-1-<YYYYmmdd_HHMMSS>.json` for
//! round-trip, holding the extracted batch as a JSON array. Reading picks the newest file
//! for a query and runs it through the normalizer, so batches written by
//! older releases (flat `schedule` records, or markdown files wrapping the
//! array in a ```json fence) load as current records.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use serde_json::Value;

use crate::fare_record::{FareRecord, TripKind};
use crate::fares_query_builder::FareQuery;
use crate::record_normalizer::normalize_batch;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const CACHE_EXTENSIONS: &[&str] = &["json", "md"];

#[derive(Debug, Clone)]
pub struct FaresCache {
    dir: PathBuf,
}

impl FaresCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn store(&self, query: &FareQuery, records: &[FareRecord]) -> Result<PathBuf> {
        self.store_at(query, records, Local::now().naive_local())
    }

    pub fn store_at(
        &self,
        query: &FareQuery,
        records: &[FareRecord],
        fetched_at: NaiveDateTime,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache dir {}", self.dir.display()))?;

        let path = self.dir.join(format!(
            "{}-{}.json",
            query.slug(),
            fetched_at.format(TIMESTAMP_FORMAT)
        ));
        let json = serde_json::to_string_pretty(records).context("Failed to serialize records")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write cache file {}", path.display()))?;

        tracing::info!("Saved {} records to {}", records.len(), path.display());
        Ok(path)
    }

    /// Newest cache file for `query`, if any.
    pub fn latest_path(&self, query: &FareQuery) -> Result<Option<PathBuf>> {
        if !self.dir.exists() {
            return Ok(None);
        }
        let prefix = format!("{}-", query.slug());

        let mut newest: Option<(NaiveDateTime, PathBuf)> = None;
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list cache dir {}", self.dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            let Some(fetched_at) = cache_timestamp(&path, &prefix) else {
                continue;
            };
            if newest.as_ref().is_none_or(|(best, _)| fetched_at > *best) {
                newest = Some((fetched_at, path));
            }
        }
        Ok(newest.map(|(_, path)| path))
    }

    pub fn load_latest(&self, query: &FareQuery) -> Result<Option<Vec<FareRecord>>> {
        let Some(path) = self.latest_path(query)? else {
            return Ok(None);
        };
        let records = load_batch(&path)?;
        let round_trip = query.trip == TripKind::RoundTrip;
        if let Some(stray) = records
            .iter()
            .position(|r| r.route.is_round_trip() != round_trip)
        {
            tracing::warn!(
                "Ignoring {}: record #{} is not a {:?} fare",
                path.display(),
                stray,
                query.trip
            );
            return Ok(None);
        }
        tracing::info!(
            "Loaded {} cached records for {} from {}",
            records.len(),
            query,
            path.display()
        );
        Ok(Some(records))
    }
}

/// Timestamp part of a cache file name, when the name belongs to the query.
fn cache_timestamp(path: &Path, prefix: &str) -> Option<NaiveDateTime> {
    let extension = path.extension()?.to_str()?;
    if !CACHE_EXTENSIONS.contains(&extension) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let stamp = stem.strip_prefix(prefix)?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
}

/// Reads one cache file of any known shape into canonical records.
pub fn load_batch(path: &Path) -> Result<Vec<FareRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read cache file {}", path.display()))?;
    let json = match path.extension().and_then(|e| e.to_str()) {
        Some("md") => fenced_json(&content)
            .with_context(|| format!("No ```json block in {}", path.display()))?,
        _ => content.as_str(),
    };
    let batch: Value = serde_json::from_str(json)
        .with_context(|| format!("Invalid JSON in cache file {}", path.display()))?;
    Ok(normalize_batch(&batch))
}

fn fenced_json(markdown: &str) -> Option<&str> {
    let start = markdown.find("```json")? + "```json".len();
    let len = markdown[start..].find("```")?;
    Some(markdown[start..start + len].trim())
}
