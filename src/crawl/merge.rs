use crate::area::{Area, Level};
use crate::source::StreetEntry;

/// Pairs the two locale variants of one street list by position.
///
/// The simplified list drives the output: one record per entry, with the
/// traditional name taken from the same index or left empty when the
/// traditional list is shorter.
pub fn merge_locales(simplified: &[StreetEntry], traditional: &[StreetEntry]) -> Vec<Area> {
    simplified
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            let traditional_name = traditional
                .get(position)
                .map(|other| other.name.as_str())
                .unwrap_or_default();
            Area::new(entry.id, entry.parent_id, Level::Street).with_names(
                entry.name.as_str(),
                traditional_name,
                "",
            )
        })
        .collect()
}
