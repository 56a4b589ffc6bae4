// Paging statistics from the vm_stat utility

use super::{pages_to_mb, SystemMemoryStats};

const DEFAULT_PAGE_SIZE: u64 = 4096;

/// Parse `vm_stat` output.
///
/// The header line carries the page size; every other line is
/// `Label: count.`. Returns `None` unless free, active, inactive, wired and
/// compressor-occupied page counts are all present.
pub fn parse_vm_stat(text: &str) -> Option<SystemMemoryStats> {
    let mut page_size = DEFAULT_PAGE_SIZE;
    let mut free = None;
    let mut active = None;
    let mut inactive = None;
    let mut wired = None;
    let mut compressed = None;

    for line in text.lines() {
        if let Some(size) = header_page_size(line) {
            page_size = size;
            continue;
        }

        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let Ok(pages) = value.trim().trim_end_matches('.').parse::<u64>() else {
            log::debug!("Skipping malformed vm_stat line: {line}");
            continue;
        };

        match label.trim() {
            "Pages free" => free = Some(pages),
            "Pages active" => active = Some(pages),
            "Pages inactive" => inactive = Some(pages),
            "Pages wired down" => wired = Some(pages),
            "Pages occupied by compressor" => compressed = Some(pages),
            _ => {}
        }
    }

    Some(SystemMemoryStats {
        free_mb: pages_to_mb(free?, page_size),
        active_mb: pages_to_mb(active?, page_size),
        inactive_mb: pages_to_mb(inactive?, page_size),
        wired_mb: pages_to_mb(wired?, page_size),
        compressed_mb: pages_to_mb(compressed?, page_size),
    })
}

/// `Mach Virtual Memory Statistics: (page size of 16384 bytes)`
fn header_page_size(line: &str) -> Option<u64> {
    let rest = line.split("page size of ").nth(1)?;
    rest.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Mach Virtual Memory Statistics: (page size of 16384 bytes)
Pages free:                                6400.
Pages active:                            128000.
Pages inactive:                          121600.
Pages speculative:                         2311.
Pages throttled:                              0.
Pages wired down:                         76800.
Pages purgeable:                           1021.
\"Translation faults\":                 912346712.
Pages copy-on-write:                   12749340.
Pages occupied by compressor:             32000.
Swapins:                                 101223.
";

    #[test]
    fn test_parse_vm_stat() {
        let stats = parse_vm_stat(SAMPLE).unwrap();
        assert_eq!(stats.free_mb, 100);
        assert_eq!(stats.active_mb, 2000);
        assert_eq!(stats.inactive_mb, 1900);
        assert_eq!(stats.wired_mb, 1200);
        assert_eq!(stats.compressed_mb, 500);
    }

    #[test]
    fn test_parse_vm_stat_default_page_size() {
        let text = "\
Pages free: 256.
Pages active: 512.
Pages inactive: 768.
Pages wired down: 1024.
Pages occupied by compressor: 0.
";
        let stats = parse_vm_stat(text).unwrap();
        assert_eq!(stats.free_mb, 1);
        assert_eq!(stats.active_mb, 2);
        assert_eq!(stats.inactive_mb, 3);
        assert_eq!(stats.wired_mb, 4);
        assert_eq!(stats.compressed_mb, 0);
    }

    #[test]
    fn test_parse_vm_stat_incomplete_is_none() {
        let text = SAMPLE.replace("Pages wired down:                         76800.\n", "");
        assert!(parse_vm_stat(&text).is_none());
        assert!(parse_vm_stat("").is_none());
    }

    #[test]
    fn test_parse_vm_stat_skips_malformed_counts() {
        let text = format!("Pages free: many.\n{SAMPLE}");
        assert_eq!(parse_vm_stat(&text).unwrap().free_mb, 100);
    }

    #[test]
    fn test_header_page_size() {
        assert_eq!(
            header_page_size("Mach Virtual Memory Statistics: (page size of 4096 bytes)"),
            Some(4096)
        );
        assert_eq!(header_page_size("Pages free: 10."), None);
    }
}
