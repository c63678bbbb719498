//! Input relay.
//!
//! `PadData` entries are checked against the pad table. Mismatched entries
//! are still relayed for a bounded number of consecutive frames while a
//! mapping change settles; past that they are dropped silently. With host
//! input authority everything funnels to the current golfer, whose
//! `PadHostData` is then fanned out to the rest.

use lockstep_netproto::messages::input::{PadData, PadEntry, PadHostData};
use tracing::{trace, warn};

use super::{Handler, HandlerContext};
use crate::async_queue::Target;
use crate::proto_dispatch::error::{HandlerError, HandlerResult};
use crate::session::mapping::MappingTables;

/// Analog state is present exactly for slots without a handheld attached.
fn normalize(mut entry: PadEntry, tables: &MappingTables) -> Result<PadEntry, HandlerError> {
    let slot = entry.slot as usize;
    if tables.pad_owner(slot).is_none() {
        return Err(HandlerError::InvalidSlot);
    }
    if tables.gba_enabled(slot) {
        entry.analog = None;
    } else if entry.analog.is_none() {
        return Err(HandlerError::BadMessage);
    }
    Ok(entry)
}

/// Input from a previous game is still draining.
fn is_stale(ctx: &HandlerContext<'_>) -> bool {
    ctx.reg
        .get(ctx.pid)
        .is_none_or(|c| c.current_game != ctx.game.current_game)
}

pub(crate) struct PadDataHandler;

impl Handler<PadData> for PadDataHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: PadData) -> HandlerResult {
        if is_stale(ctx) {
            trace!(pid = ctx.pid, "Dropping pad data from a previous game");
            return Ok(());
        }

        let grace_frames = ctx.session.config().pad_mapping_grace_frames;
        let mut relayed = Vec::with_capacity(msg.entries.len());
        for entry in msg.entries {
            let entry = normalize(entry, &ctx.reg.mappings)?;
            let owner = ctx.reg.mappings.pads[entry.slot as usize];
            if owner == ctx.pid {
                ctx.game.grace_counter = 0;
            } else if ctx.game.grace_counter < grace_frames {
                ctx.game.grace_counter += 1;
            } else {
                warn!(
                    pid = ctx.pid,
                    slot = entry.slot,
                    owner,
                    "Pad mapping mismatch beyond the grace window"
                );
                break;
            }
            relayed.push(entry);
        }
        if relayed.is_empty() {
            return Ok(());
        }

        if ctx.game.host_input_authority {
            let golfer = ctx.game.current_golfer;
            if golfer != 0 && ctx.reg.contains(golfer) {
                ctx.reg.send_to(golfer, &PadHostData { entries: relayed });
            }
        } else {
            ctx.reg
                .broadcast(&PadData { entries: relayed }, Target::AllExcept(ctx.pid));
        }
        Ok(())
    }
}

pub(crate) struct PadHostDataHandler;

impl Handler<PadHostData> for PadHostDataHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: PadHostData) -> HandlerResult {
        let golfer = ctx.game.current_golfer;
        if golfer != 0 && ctx.pid != golfer {
            return Err(HandlerError::NotGolfer);
        }
        let entries = msg
            .entries
            .into_iter()
            .map(|e| normalize(e, &ctx.reg.mappings))
            .collect::<Result<Vec<_>, _>>()?;
        ctx.reg
            .broadcast(&PadData { entries }, Target::AllExcept(ctx.pid));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use lockstep_netproto::messages::input::PadAnalog;
    use lockstep_netproto::msg_id::MsgId;

    use super::*;
    use crate::proto_dispatch::handlers::tests::Fixture;

    fn pad(slot: u8) -> PadData {
        PadData {
            entries: vec![PadEntry {
                slot,
                button: 0x0100,
                analog: Some(PadAnalog::default()),
            }],
        }
    }

    fn running(players: u8) -> Fixture {
        let fx = Fixture::new(players);
        {
            let (mut game, mut reg) = fx.session.lock();
            game.is_running = true;
            game.current_game = 42;
            for c in reg.clients_mut() {
                c.current_game = 42;
            }
            reg.mappings.pads = [1, 2, 0, 0];
        }
        fx
    }

    #[test]
    fn mapped_input_is_relayed_to_everyone_else() {
        let mut fx = running(3);
        fx.send(2, &pad(1)).unwrap();
        let got = fx.flush();
        assert_eq!(got[0], vec![MsgId::PadData]);
        assert!(got[1].is_empty());
        assert_eq!(got[2], vec![MsgId::PadData]);
    }

    #[test]
    fn grace_window_relays_then_drops_then_resets() {
        let mut fx = running(2);
        let grace = fx.session.config().pad_mapping_grace_frames;

        for _ in 0..grace {
            fx.send(2, &pad(0)).unwrap();
        }
        assert_eq!(fx.flush()[0].len(), grace as usize);

        // Frame G+1 is dropped, not a violation.
        fx.send(2, &pad(0)).unwrap();
        assert!(fx.flush()[0].is_empty());

        // One matching frame resets the counter.
        fx.send(2, &pad(1)).unwrap();
        assert_eq!(fx.session.game.lock().grace_counter, 0);
        fx.send(2, &pad(0)).unwrap();
        assert_eq!(fx.flush()[0].len(), 2);
    }

    #[test]
    fn stale_input_is_ignored() {
        let mut fx = running(2);
        fx.session.registry.write().get_mut(2).unwrap().current_game = 7;
        fx.send(2, &pad(1)).unwrap();
        assert!(fx.flush()[0].is_empty());
    }

    #[test]
    fn out_of_range_slot_is_a_violation() {
        let fx = running(2);
        assert_eq!(fx.send(2, &pad(4)), Err(HandlerError::InvalidSlot));
    }

    #[test]
    fn host_authority_funnels_input_to_the_golfer() {
        let mut fx = running(3);
        fx.session.game.lock().host_input_authority = true;
        fx.send(2, &pad(1)).unwrap();
        let got = fx.flush();
        assert_eq!(got[0], vec![MsgId::PadHostData]);
        assert!(got[2].is_empty());

        let host_data = PadHostData {
            entries: pad(0).entries,
        };
        assert_eq!(fx.send(3, &host_data), Err(HandlerError::NotGolfer));
        fx.send(1, &host_data).unwrap();
        let got = fx.flush();
        assert_eq!(got[1], vec![MsgId::PadData]);
        assert_eq!(got[2], vec![MsgId::PadData]);
    }
}
