#[cfg(target_env = "msvc")]
pub use std::alloc::System as DefaultAllocator;
#[cfg(not(target_env = "msvc"))]
pub use tikv_jemallocator::Jemalloc as DefaultAllocator;

#[macro_export]
macro_rules! used {
    () => {
        #[global_allocator]
        static GLOBAL: $crate::DefaultAllocator = $crate::DefaultAllocator;
    };
}

/// Heap usage as reported by the allocator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Bytes currently allocated by the application.
    pub allocated: u64,
    /// Bytes of physical memory resident in allocator-managed pages.
    /// Always >= allocated; the difference is fragmentation and metadata.
    pub resident: u64,
}

/// Read current heap statistics from jemalloc.
///
/// jemalloc caches its stats behind an epoch; we advance it first so the
/// numbers reflect the present, not the last reader. Returns zeroed stats
/// on platforms without jemalloc or if the mallctl calls fail.
#[cfg(not(target_env = "msvc"))]
pub fn read_alloc_stats() -> AllocStats {
    use tikv_jemalloc_ctl::{epoch, stats};

    if epoch::advance().is_err() {
        return AllocStats::default();
    }
    let allocated = stats::allocated::read().unwrap_or(0) as u64;
    let resident = stats::resident::read().unwrap_or(0) as u64;
    AllocStats {
        allocated,
        resident,
    }
}

#[cfg(target_env = "msvc")]
pub fn read_alloc_stats() -> AllocStats {
    AllocStats::default()
}
