use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::relay::hub::RelayHub;

const HEARTBEAT_PERIOD: Duration = Duration::from_secs(30);

/// Every 30s: ping all job sockets so idle proxies keep them open, then stop
/// actors whose sockets have all gone.
///
/// Aborted during shutdown.
pub fn start_heartbeat(hub: Arc<RelayHub>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(HEARTBEAT_PERIOD);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; nothing is connected yet.
        ticks.tick().await;

        loop {
            ticks.tick().await;
            hub.ping_all().await;
            let reaped = hub.reap_idle().await;
            let sockets = hub.connection_count().await;
            let runners = hub.runner_count().await;
            tracing::debug!(
                sockets,
                runners,
                reaped,
                "Job relay heartbeat"
            );
        }
    })
}
