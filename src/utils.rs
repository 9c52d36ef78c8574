

/// Rounds half away from zero to `decimals` places. NaN and infinities pass through.
#[inline]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}


/// Stable sort by lowercase name, so names differing only in case keep their input order.
pub fn sort_case_insensitive(names: &mut [String]) {
    names.sort_by_cached_key(|name| name.to_lowercase());
}
