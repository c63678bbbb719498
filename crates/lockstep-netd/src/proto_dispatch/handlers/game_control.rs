//! Game lifecycle messages from clients: start acknowledgment, stop, power,
//! initial-state readiness and start requests.

use std::time::Duration;

use lockstep_netproto::messages::game::{
    ClientInitialStateAck, PauseSimulation, PowerButton, RequestStartGame, ResumeSimulation,
    StartGameAck, StopGame,
};
use tracing::{debug, info, warn};

use super::{Handler, HandlerContext};
use crate::async_queue::Target;
use crate::proto_dispatch::error::HandlerResult;
use crate::session::readiness::LoadStatus;
use crate::sync;

/// Time clients get to load the initial state between pause and resume.
const RESUME_DELAY: Duration = Duration::from_secs(1);

pub(crate) struct StartGameAckHandler;

impl Handler<StartGameAck> for StartGameAckHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: StartGameAck) -> HandlerResult {
        if let Some(client) = ctx.reg.get_mut(ctx.pid) {
            debug!(pid = ctx.pid, token = msg.game_token, "Client entered the game");
            client.current_game = msg.game_token;
            client.idle_ticks = 0;
        }
        Ok(())
    }
}

pub(crate) struct StopGameHandler;

impl Handler<StopGame> for StopGameHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, _msg: StopGame) -> HandlerResult {
        if !ctx.game.is_running {
            return Ok(());
        }
        info!(pid = ctx.pid, "Game stopped by player");
        ctx.game.is_running = false;
        ctx.reg.readiness.reset_except_host();
        ctx.reg.broadcast(&StopGame, Target::ALL);
        Ok(())
    }
}

pub(crate) struct PowerButtonHandler;

impl Handler<PowerButton> for PowerButtonHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: PowerButton) -> HandlerResult {
        ctx.reg.broadcast(&msg, Target::AllExcept(ctx.pid));
        Ok(())
    }
}

/// Once every guest has loaded the initial state, pause everyone and resume
/// shortly after so they continue from the same point.
pub(crate) struct InitialStateAckHandler;

impl Handler<ClientInitialStateAck> for InitialStateAckHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: ClientInitialStateAck) -> HandlerResult {
        if !msg.has_initial_state {
            debug!(pid = ctx.pid, "Client has no initial state");
            return Ok(());
        }
        let readiness = &mut ctx.reg.readiness;
        if readiness.status(ctx.pid) == Some(LoadStatus::Success) {
            return Ok(());
        }
        readiness.set_status(ctx.pid, LoadStatus::Success);
        if !readiness.all_ready() {
            return Ok(());
        }

        info!("All clients loaded the initial state; pausing");
        ctx.reg.broadcast(&PauseSimulation, Target::ALL);

        let queue = ctx.session.queue.clone();
        let shutdown = ctx.session.shutdown.clone();
        ctx.session.tasks.spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(RESUME_DELAY) => {
                    if let Err(e) = queue.send(&ResumeSimulation, Target::ALL) {
                        warn!(error = %e, "Failed to queue resume");
                    }
                }
            }
        });
        Ok(())
    }
}

pub(crate) struct RequestStartGameHandler;

impl Handler<RequestStartGame> for RequestStartGameHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, _msg: RequestStartGame) -> HandlerResult {
        info!(pid = ctx.pid, "Player requested a game start");
        if let Err(e) = sync::request_start(ctx.session, ctx.game, ctx.reg) {
            warn!(pid = ctx.pid, error = %e, "Start request rejected");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use lockstep_netproto::msg_id::MsgId;

    use super::*;
    use crate::proto_dispatch::handlers::tests::Fixture;

    #[tokio::test]
    async fn pause_then_resume_once_every_guest_is_ready() {
        let mut fx = Fixture::new(3);
        let ack = ClientInitialStateAck {
            has_initial_state: true,
        };

        fx.send(2, &ack).unwrap();
        fx.send(2, &ack).unwrap();
        assert!(fx.flush()[0].is_empty());

        fx.send(3, &ack).unwrap();
        assert_eq!(fx.flush()[0], vec![MsgId::PauseSimulation]);

        tokio::time::sleep(RESUME_DELAY + Duration::from_millis(300)).await;
        assert_eq!(fx.flush()[0], vec![MsgId::ResumeSimulation]);
    }

    #[test]
    fn stop_only_when_running() {
        let mut fx = Fixture::new(2);
        fx.send(2, &StopGame).unwrap();
        assert!(fx.flush()[0].is_empty());

        fx.session.game.lock().is_running = true;
        fx.send(2, &StopGame).unwrap();
        assert!(!fx.session.game.lock().is_running);
        assert_eq!(fx.flush()[0], vec![MsgId::StopGame]);
    }

    #[test]
    fn start_ack_records_the_token() {
        let fx = Fixture::new(2);
        fx.session.registry.write().get_mut(2).unwrap().idle_ticks = 9;
        fx.send(2, &StartGameAck { game_token: 77 }).unwrap();
        let reg = fx.session.registry.read();
        let client = reg.get(2).unwrap();
        assert_eq!((client.current_game, client.idle_ticks), (77, 0));
    }
}
