//! Parent → children lookup over the flat record set.
//!
//! Built in a single pass so that walking province → city → county costs one
//! hash lookup per step instead of a scan of the whole record list.

use crate::area::Area;
use std::collections::HashMap;

/// Read-only child index borrowed from the record slice it was built from.
///
/// Children are stored as positions into that slice and keep source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyIndex<'a> {
    records: &'a [Area],
    children: HashMap<u64, Vec<usize>>,
}

impl<'a> HierarchyIndex<'a> {
    pub fn build(records: &'a [Area]) -> Self {
        let mut children: HashMap<u64, Vec<usize>> = HashMap::new();
        for (position, area) in records.iter().enumerate() {
            if area.is_root() {
                continue;
            }
            children.entry(area.parent_id).or_default().push(position);
        }

        tracing::debug!(
            records = records.len(),
            parents = children.len(),
            "built hierarchy index"
        );

        Self { records, children }
    }

    pub fn records(&self) -> &'a [Area] {
        self.records
    }

    /// Direct children of `id` (every record whose `parent_id == id`) in
    /// source order. Levels are not filtered because ids repeat across levels.
    pub fn children(&self, id: u64) -> impl Iterator<Item = &'a Area> + '_ {
        let records = self.records;
        self.children
            .get(&id)
            .into_iter()
            .flatten()
            .map(move |position| &records[*position])
    }

    #[cfg(test)]
    fn child_count(&self, id: u64) -> usize {
        self.children.get(&id).map(Vec::len).unwrap_or(0)
    }

    pub fn parent_count(&self) -> usize {
        self.children.len()
    }
}
