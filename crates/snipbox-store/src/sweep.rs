use std::time::Duration;

use tracing::info;

use crate::store::Store;

/// Background task that reclaims expired records.
///
/// Reads already treat expired records as absent; this loop exists so the
/// memory behind codes nobody asks about again is eventually freed.
pub async fn run_sweep_loop(store: Store, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let pruned = store.sweep().await;
        if pruned > 0 {
            info!("Sweep: pruned {} expired records", pruned);
        }
    }
}
