//! Flat administrative record shared by every level of the hierarchy, plus the
//! level classification used to filter provinces, counties, and streets.

use serde::Serialize;
use std::fmt;

/// Coarse rank of an [`Area`] in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Country,
    Province,
    City,
    Street,
    ForeignCity,
}

impl Level {
    /// Numeric classification code written to the output stream.
    pub fn code(self) -> u8 {
        match self {
            Level::Country => 0,
            Level::Province => 1,
            Level::City => 2,
            Level::Street => 3,
            Level::ForeignCity => 5,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Level::Country => "country",
            Level::Province => "province",
            Level::City => "city",
            Level::Street => "street",
            Level::ForeignCity => "foreign-city",
        };
        f.write_str(label)
    }
}

/// One administrative unit. Ids are only unique within a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Area {
    pub id: u64,
    pub name: String,
    pub traditional_name: String,
    pub english_name: String,
    /// `0` marks a root record.
    pub parent_id: u64,
    pub subtype: u32,
    pub level: Level,
}

impl Area {
    pub fn new(id: u64, parent_id: u64, level: Level) -> Self {
        Self {
            id,
            name: String::new(),
            traditional_name: String::new(),
            english_name: String::new(),
            parent_id,
            subtype: 0,
            level,
        }
    }

    pub fn with_names(
        mut self,
        name: impl Into<String>,
        traditional_name: impl Into<String>,
        english_name: impl Into<String>,
    ) -> Self {
        self.name = name.into();
        self.traditional_name = traditional_name.into();
        self.english_name = english_name.into();
        self
    }

    pub fn with_subtype(mut self, subtype: u32) -> Self {
        self.subtype = subtype;
        self
    }

    /// Synthetic top-level record for the home country; the asset only lists
    /// foreign countries.
    pub fn china() -> Self {
        Area::new(1, 0, Level::Country).with_names("中国", "中國", "China")
    }

    pub fn is_root(&self) -> bool {
        self.parent_id == 0
    }

    /// Ordinary counties (subtype 0 at the city level) are the only units the
    /// street endpoint knows about.
    pub fn is_street_candidate(&self) -> bool {
        self.level == Level::City && self.subtype == 0
    }

    pub(crate) fn as_row(&self) -> AreaRow<'_> {
        AreaRow {
            id: self.id,
            name: &self.name,
            traditional_name: &self.traditional_name,
            english_name: &self.english_name,
            parent_id: self.parent_id,
            subtype: self.subtype,
            level: self.level.code(),
        }
    }
}

/// One leaf unit to enrich with streets, named by its ancestor chain.
///
/// For a city with no counties of its own the city id doubles as the county
/// id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreetJob {
    pub province_id: u64,
    pub city_id: u64,
    pub county_id: u64,
}

impl StreetJob {
    pub fn new(province_id: u64, city_id: u64, county_id: u64) -> Self {
        Self {
            province_id,
            city_id,
            county_id,
        }
    }
}

impl fmt::Display for StreetJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.province_id, self.city_id, self.county_id
        )
    }
}

/// Column order of the tabular output.
pub const AREA_HEADER: [&str; 7] = [
    "id",
    "name",
    "traditional_name",
    "english_name",
    "parent_id",
    "subtype",
    "level",
];

#[derive(Serialize)]
pub(crate) struct AreaRow<'a> {
    id: u64,
    name: &'a str,
    traditional_name: &'a str,
    english_name: &'a str,
    parent_id: u64,
    subtype: u32,
    level: u8,
}
