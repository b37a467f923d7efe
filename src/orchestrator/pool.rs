//! Worker pool sizing from available system memory

/// Number of workers to spawn given available memory
///
/// Available memory divided by the per-worker budget, floor of 1 so a
/// constrained host still makes progress, capped by `max_workers` when
/// configured. Sizing is policy, not correctness: any positive count
/// produces the same mirror.
#[must_use]
pub fn worker_pool_size(
    available_bytes: u64,
    per_worker_budget_bytes: u64,
    max_workers: Option<usize>,
) -> usize {
    let budget = per_worker_budget_bytes.max(1);
    let by_memory = usize::try_from(available_bytes / budget).unwrap_or(usize::MAX);
    let size = by_memory.max(1);
    match max_workers {
        Some(cap) => size.min(cap.max(1)),
        None => size,
    }
}

/// Probe available system memory in bytes
#[must_use]
pub fn available_memory() -> u64 {
    #[cfg(target_os = "linux")]
    {
        use std::fs;
        if let Ok(meminfo) = fs::read_to_string("/proc/meminfo") {
            for line in meminfo.lines() {
                if line.starts_with("MemAvailable:") {
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        if let Ok(kb) = kb_str.parse::<u64>() {
                            return kb * 1024; // Convert KB to bytes
                        }
                    }
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        use std::process::Command;
        if let Ok(output) = Command::new("sysctl").args(["hw.memsize"]).output()
            && let Ok(output_str) = String::from_utf8(output.stdout)
            && let Some(mem_str) = output_str.split_whitespace().nth(1)
            && let Ok(total_memory) = mem_str.parse::<u64>()
        {
            // Estimate available as 75% of total (conservative)
            return (total_memory * 3) / 4;
        }
    }

    // Fallback: 2GB if we can't determine system memory
    2_147_483_648
}
