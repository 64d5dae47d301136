pub mod ecosystem;

// ============================================================================
// Profiling Macros
// ============================================================================

/// Log a message every 100 ecosystem ticks when the `perf_stats` feature is enabled.
///
/// `$tick` is anything with a `.0: u64` tick counter (normally `Res<EcoTick>`).
/// Without the feature this expands to nothing and the arguments are never
/// evaluated.
///
/// # Example
/// ```ignore
/// profile_log!(tick, "[TARGETING] {} predators resolved", report.predators);
/// ```
#[macro_export]
#[cfg(feature = "perf_stats")]
macro_rules! profile_log {
    ($tick:expr, $($arg:tt)*) => {
        if $tick.0 % 100 == 0 {
            bevy::log::info!($($arg)*);
        }
    };
}

#[macro_export]
#[cfg(not(feature = "perf_stats"))]
macro_rules! profile_log {
    ($tick:expr, $($arg:tt)*) => {};
}
