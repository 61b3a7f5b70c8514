//! Log set-up for the binaries. Library code only emits `tracing` events.

use tracing_subscriber::EnvFilter;

/// Filter variable, EnvFilter syntax (e.g. `SWEEP_LOG=strategic_equilibrium=debug`).
pub const LOG_ENV: &str = "SWEEP_LOG";

/// Install a stderr fmt subscriber. Later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init();
        init();
        tracing::info!("logging initialised");
    }
}
