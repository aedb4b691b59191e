//! Resource and capability flag construction.
//!
//! Pure: depends only on the spec's limits and the negotiated compute
//! mode, performs no I/O. The runtime passes the flags through verbatim.

use corral_health::ComputeMode;
use corral_types::ResourceLimits;

/// Build the runtime invocation flags for one service.
///
/// When a memory limit is set without an explicit swap limit, swap is
/// capped at the memory limit (no swap allowance).
pub fn run_flags(resources: &ResourceLimits, mode: ComputeMode) -> Vec<String> {
    let mut flags = Vec::new();

    if let Some(cpus) = resources.cpus {
        flags.push(format!("--cpus={}", cpus));
    }

    if let Some(memory) = resources.memory_bytes {
        flags.push(format!("--memory={}", memory));
        let swap = resources.memory_swap_bytes.unwrap_or(memory);
        flags.push(format!("--memory-swap={}", swap));
    } else if let Some(swap) = resources.memory_swap_bytes {
        flags.push(format!("--memory-swap={}", swap));
    }

    if let Some(shm) = resources.shm_size_bytes {
        flags.push(format!("--shm-size={}", shm));
    }

    if mode == ComputeMode::Accelerated {
        flags.push("--gpus".to_string());
        flags.push("all".to_string());
    }

    flags
}
