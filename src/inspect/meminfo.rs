// Paging statistics from /proc/meminfo

use super::SystemMemoryStats;
use anyhow::{Context, Result};
use std::fs;

/// Read paging statistics from a meminfo-formatted file
pub(crate) fn read_meminfo(path: &str) -> Result<Option<SystemMemoryStats>> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    Ok(parse_meminfo(&text))
}

/// Parse `/proc/meminfo` text.
///
/// Active, inactive and free pages map directly. Linux has no wired pages;
/// the unevictable pool is the closest equivalent. Compressed memory is the
/// zswap pool, zero when the kernel has none. Returns `None` when any of the
/// required keys is missing.
pub fn parse_meminfo(text: &str) -> Option<SystemMemoryStats> {
    let mut free = None;
    let mut active = None;
    let mut inactive = None;
    let mut unevictable = None;
    let mut zswap = 0;

    for line in text.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.len() < 2 {
            continue;
        }

        let key = parts[0].trim_end_matches(':');
        let Ok(value_kb) = parts[1].parse::<u64>() else {
            log::debug!("Skipping malformed meminfo line: {line}");
            continue;
        };

        match key {
            "MemFree" => free = Some(value_kb),
            "Active" => active = Some(value_kb),
            "Inactive" => inactive = Some(value_kb),
            "Unevictable" => unevictable = Some(value_kb),
            "Zswap" => zswap = value_kb,
            _ => {}
        }
    }

    Some(SystemMemoryStats {
        free_mb: free? / 1024,
        active_mb: active? / 1024,
        inactive_mb: inactive? / 1024,
        wired_mb: unevictable? / 1024,
        compressed_mb: zswap / 1024,
    })
}
