//! In-place replacement used for partial writes.

/// Splice `data` into `old` at `offset`.
///
/// - no existing content: `data` when `offset == 0`, otherwise `None`
/// - empty `data`: `old` unchanged
/// - `offset` past the end of `old`: `old` unchanged (no gap fill)
/// - otherwise `old[..offset] + data + old[offset + data.len()..]`
pub fn irepl(old: Option<&[u8]>, data: &[u8], offset: usize) -> Option<Vec<u8>> {
    let old = match old.filter(|o| !o.is_empty()) {
        Some(old) => old,
        None if offset == 0 => return Some(data.to_vec()),
        None => return old.map(<[u8]>::to_vec),
    };
    if data.is_empty() || offset > old.len() {
        return Some(old.to_vec());
    }

    let mut out = Vec::with_capacity(old.len().max(offset + data.len()));
    out.extend_from_slice(&old[..offset]);
    out.extend_from_slice(data);
    if let Some(suffix) = old.get(offset + data.len()..) {
        out.extend_from_slice(suffix);
    }
    Some(out)
}
