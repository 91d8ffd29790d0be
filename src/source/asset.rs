//! Parser for the static address script that seeds the crawl with countries,
//! provinces, cities/counties, and foreign cities.
//!
//! The script embeds its tables as bare array literals. They are located by
//! pattern and classified purely by their position in the match list:
//!
//! | position | level         | element shape                         |
//! |----------|---------------|---------------------------------------|
//! | 0..=3    | province      | `[id, [name, trad], parent]`          |
//! | 4..=6    | city/county   | `[id, [name, trad], parent, subtype]` |
//! | 7        | foreign city  | `[id, [name, trad, en], parent]`      |
//! | 8, 10..  | country       | `[id, [name, trad, en]]`              |
//!
//! Position 9 is not a country table and is skipped.

use crate::area::{Area, Level};
use crate::source::payload::{all_arrays, decode_array, int_at, text_at};
use anyhow::{bail, Result};
use serde_json::Value;

const SKIPPED_GROUP: usize = 9;

fn group_level(position: usize) -> Option<Level> {
    match position {
        0..=3 => Some(Level::Province),
        4..=6 => Some(Level::City),
        7 => Some(Level::ForeignCity),
        SKIPPED_GROUP => None,
        _ => Some(Level::Country),
    }
}

fn area_from_element(element: &Value, level: Level) -> Area {
    let id = int_at(element, &[0]);
    let name = text_at(element, &[1, 0]);
    let traditional = text_at(element, &[1, 1]);

    match level {
        Level::Province => Area::new(id, int_at(element, &[2]), level).with_names(name, traditional, ""),
        Level::City => Area::new(id, int_at(element, &[2]), level)
            .with_names(name, traditional, "")
            .with_subtype(subtype_at(element, id)),
        Level::ForeignCity => Area::new(id, int_at(element, &[2]), level).with_names(
            name,
            traditional,
            text_at(element, &[1, 2]),
        ),
        Level::Country | Level::Street => {
            Area::new(id, 0, level).with_names(name, traditional, text_at(element, &[1, 2]))
        }
    }
}

/// Subtypes past `u32` saturate so an oversized code never reads as 0.
fn subtype_at(element: &Value, id: u64) -> u32 {
    let raw = int_at(element, &[3]);
    u32::try_from(raw).unwrap_or_else(|_| {
        tracing::warn!(id, subtype = raw, "subtype out of range; clamped");
        u32::MAX
    })
}

/// Parses the script body into flat records and appends the synthetic home
/// country. Undecodable tables are logged and skipped; a body without any
/// table is an error.
pub fn parse_asset(body: &str) -> Result<Vec<Area>> {
    let arrays = all_arrays(body);
    if arrays.is_empty() {
        bail!("address script contains no area tables");
    }

    let mut areas = Vec::new();
    for (position, raw) in arrays.iter().enumerate() {
        let Some(level) = group_level(position) else {
            continue;
        };

        let elements = match decode_array(raw) {
            Ok(elements) => elements,
            Err(err) => {
                tracing::warn!(position, %level, error = %err, "skipping undecodable area table");
                continue;
            }
        };

        areas.extend(
            elements
                .iter()
                .map(|element| area_from_element(element, level)),
        );
    }

    areas.push(Area::china());

    tracing::info!(
        tables = arrays.len(),
        areas = areas.len(),
        "parsed address script"
    );
    Ok(areas)
}
