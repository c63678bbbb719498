//! Lobby idle eviction.
//!
//! Every `check_interval` the supervisor bumps each non-host client's idle
//! counter, unless a game is running, in which case all counters are zeroed.
//! A client whose counter reaches `max_idle_ticks` gets a private notice and
//! is disconnected through the async queue.

use std::sync::Arc;

use lockstep_netproto::PlayerId;
use lockstep_netproto::constants::HOST_PLAYER_ID;
use lockstep_netproto::messages::session::ChatMessage;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::async_queue::Target;
use crate::config::IdleConfig;
use crate::session::Session;
use crate::session::registry::Registry;

pub struct IdleSupervisor {
    max_idle_ticks: u32,
}

impl IdleSupervisor {
    pub fn new(max_idle_ticks: u32) -> Self {
        Self {
            max_idle_ticks: max_idle_ticks.max(1),
        }
    }

    /// Advance every counter by one tick and return the clients to evict.
    pub fn sweep(&self, running: bool, reg: &mut Registry) -> Vec<PlayerId> {
        let mut expired = Vec::new();
        for client in reg.clients_mut().filter(|c| c.pid != HOST_PLAYER_ID) {
            if running {
                client.idle_ticks = 0;
                continue;
            }
            client.idle_ticks += 1;
            if client.idle_ticks >= self.max_idle_ticks {
                client.idle_ticks = 0;
                expired.push(client.pid);
            }
        }
        for pid in &expired {
            reg.readiness.reset(*pid);
        }
        expired
    }
}

/// Supervisor loop. Returns when `shutdown` fires.
pub async fn run(session: Arc<Session>, config: IdleConfig, shutdown: CancellationToken) {
    let supervisor = IdleSupervisor::new(config.max_idle_ticks);
    let mut ticker = tokio::time::interval(config.check_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    info!(
        interval_ms = config.check_interval.as_millis() as u64,
        max_idle_ticks = config.max_idle_ticks,
        "Idle supervisor started"
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let expired = {
            let (game, mut reg) = session.lock();
            supervisor.sweep(game.is_running, &mut reg)
        };

        for pid in expired {
            info!(pid, "Evicting idle player");
            session.publish(
                &ChatMessage {
                    author: 0,
                    text: format!(
                        "You were disconnected from {} for being idle in the lobby.",
                        session.config().server_name
                    ),
                },
                Target::Only(pid),
            );
            session.queue.kick(pid, "idle timeout");
        }
    }
    debug!("Idle supervisor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::readiness::LoadStatus;
    use crate::session::registry::tests::test_client;

    fn registry(players: u8) -> (Registry, Vec<crate::net::outbound::PeerOutboundRx>) {
        let mut reg = Registry::default();
        let mut rxs = Vec::new();
        for pid in 1..=players {
            let (c, rx) = test_client(pid);
            reg.insert(c);
            rxs.push(rx);
        }
        (reg, rxs)
    }

    #[test]
    fn evicts_exactly_at_the_threshold() {
        let (mut reg, _rx) = registry(2);
        reg.readiness.set_status(2, LoadStatus::Success);
        let sup = IdleSupervisor::new(3);

        assert!(sup.sweep(false, &mut reg).is_empty());
        assert!(sup.sweep(false, &mut reg).is_empty());
        assert_eq!(sup.sweep(false, &mut reg), vec![2]);
        assert_eq!(reg.get(2).unwrap().idle_ticks, 0);
        assert_eq!(reg.readiness.status(2), Some(LoadStatus::Init));
    }

    #[test]
    fn running_game_resets_counters_and_host_is_exempt() {
        let (mut reg, _rx) = registry(3);
        let sup = IdleSupervisor::new(2);

        assert!(sup.sweep(false, &mut reg).is_empty());
        for _ in 0..10 {
            assert!(sup.sweep(true, &mut reg).is_empty());
        }
        assert!(reg.clients().all(|c| c.idle_ticks == 0));

        assert!(sup.sweep(false, &mut reg).is_empty());
        assert_eq!(sup.sweep(false, &mut reg), vec![2, 3]);
        assert_eq!(reg.get(1).unwrap().idle_ticks, 0);
    }
}
