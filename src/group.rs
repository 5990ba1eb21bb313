//! Per-color connected-group bookkeeping.

/// A monochromatic connected group of stones. Groups are never destroyed by
/// merging: the absorbed group's `id` is overwritten with the survivor's id
/// and its `size` is left untouched so `undo` can restore it exactly.
#[derive(Clone, Debug)]
pub struct Group {
    pub id: usize,
    pub size: u32,
    /// For every move that merged other groups into this one, the list of
    /// (same-color) group ids that were absorbed, excluding the survivor
    /// itself. Popped on undo to reverse a merge.
    pub added_group_ids: Vec<Vec<usize>>,
}

impl Group {
    pub fn new(id: usize, size: u32) -> Self {
        Group {
            id,
            size,
            added_group_ids: Vec::new(),
        }
    }
}
