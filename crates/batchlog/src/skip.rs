//! Skip pointer delta compression
//!
//! A head entry points back at earlier batch heads, nearest first, so its
//! pointers form a strictly decreasing run of sequence numbers below the
//! head's own sequence. Storing each one as the distance from the previous
//! reference keeps the values small, and postcard's varints keep them short.

/// Delta-encode `pointers` relative to `base`
///
/// Each output value is `reference - pointer`, where `reference` starts at
/// `base` and becomes the pointer just consumed. `pointers` must be strictly
/// decreasing and below `base` for [`decompress`] to accept the result.
pub fn compress(base: u64, pointers: &[u64]) -> Vec<u64> {
    let mut reference = base;
    pointers
        .iter()
        .map(|&pointer| {
            let delta = reference.wrapping_sub(pointer);
            reference = pointer;
            delta
        })
        .collect()
}

/// Rebuild absolute sequence numbers from deltas produced by [`compress`]
///
/// Returns `None` if the deltas do not describe a strictly decreasing run
/// below `base` (a zero delta, or one that would go below sequence zero).
pub fn decompress(base: u64, deltas: &[u64]) -> Option<Vec<u64>> {
    let mut reference = base;
    deltas
        .iter()
        .map(|&delta| {
            if delta == 0 {
                return None;
            }
            reference = reference.checked_sub(delta)?;
            Some(reference)
        })
        .collect()
}
