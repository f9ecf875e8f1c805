use crate::flow::FlowModule;

/// Picks the index in `target` at which the entry found at `original_index` of `source`
/// should be inserted so that it keeps its place relative to its old neighbours.
///
/// The nearest preceding entry of `source` that also exists in `target` wins; the new entry
/// goes right after it. Failing that, the nearest following one wins and the new entry goes
/// right before it. With no anchor at all the entry is appended.
pub fn best_insert_index(target: &[FlowModule], source: &[FlowModule], original_index: usize) -> usize {
    let position_in_target = |anchor: &FlowModule| target.iter().position(|m| m.id == anchor.id);

    let preceding = source.iter().take(original_index.min(source.len())).rev();
    for anchor in preceding {
        if let Some(index) = position_in_target(anchor) {
            return index + 1;
        }
    }

    for anchor in source.iter().skip(original_index.saturating_add(1)) {
        if let Some(index) = position_in_target(anchor) {
            return index;
        }
    }

    target.len()
}
