// Human-readable memory sizes

const KB_PER_MB: u64 = 1024;
const KB_PER_GB: u64 = 1024 * 1024;

/// Format a size in KB as `N KB`, `N.N MB` or `N.N GB`.
///
/// Lower bounds are inclusive: 1024 KB is `1.0 MB`, 1048576 KB is `1.0 GB`.
/// The decimal is computed in integer tenths, rounding halves up, so the
/// result never depends on float formatting.
pub fn format_memory(kb: u64) -> String {
    if kb >= KB_PER_GB {
        format_tenths(kb, KB_PER_GB, "GB")
    } else if kb >= KB_PER_MB {
        format_tenths(kb, KB_PER_MB, "MB")
    } else {
        format!("{kb} KB")
    }
}

fn format_tenths(kb: u64, unit: u64, suffix: &str) -> String {
    let tenths = (u128::from(kb) * 10 + u128::from(unit) / 2) / u128::from(unit);
    format!("{}.{} {suffix}", tenths / 10, tenths % 10)
}
