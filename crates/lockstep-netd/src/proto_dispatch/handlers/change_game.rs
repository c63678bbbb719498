//! Game selection requests resolved against the persisted catalog.
//!
//! Catalog writes and content installs run on blocking tasks; only the
//! lookup that decides the reply happens under the session locks.

use lockstep_netproto::constants::HOST_PLAYER_ID;
use lockstep_netproto::messages::game::{ChangeGameNotFound, RequestChangeGame, RequestChangeGameFull};
use tracing::{info, warn};

use super::{Handler, HandlerContext};
use crate::catalog::{CatalogEntry, WiiBlobs};
use crate::proto_dispatch::error::{HandlerError, HandlerResult};

pub(crate) struct ChangeGameHandler;

impl Handler<RequestChangeGame> for ChangeGameHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: RequestChangeGame) -> HandlerResult {
        if ctx.game.is_busy() {
            warn!(pid = ctx.pid, game_id = %msg.game_id, "Ignoring game change while a game is running");
            return Ok(());
        }

        let entry = match ctx.session.catalog.lookup(&msg.game_id, &msg.sync_hash) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %ctx.session.catalog.path().display(), error = %e, "Catalog lookup failed");
                None
            }
        };

        match entry {
            Some(entry) => {
                let name = entry.display_name().to_string();
                let sync_identifier = entry.to_sync_identifier(msg.sync_hash);
                ctx.session.apply_change_game(
                    ctx.game,
                    ctx.reg,
                    sync_identifier,
                    name,
                    entry.wii_blobs(),
                );
            }
            None => {
                info!(pid = ctx.pid, game_id = %msg.game_id, hash = %hex::encode(msg.sync_hash), "Requested game is not in the catalog");
                ctx.reg.send_to(
                    ctx.pid,
                    &ChangeGameNotFound {
                        game_id: msg.game_id,
                    },
                );
            }
        }
        Ok(())
    }
}

/// Select a game the catalog may not know yet, recording it for later lookups.
pub(crate) struct ChangeGameFullHandler;

impl Handler<RequestChangeGameFull> for ChangeGameFullHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: RequestChangeGameFull) -> HandlerResult {
        if ctx.pid != HOST_PLAYER_ID {
            return Err(HandlerError::PermissionDenied);
        }
        if ctx.game.is_busy() {
            warn!(game_id = %msg.sync_identifier.game_id, "Ignoring game change while a game is running");
            return Ok(());
        }

        let blobs = if msg.has_wii_data {
            WiiBlobs {
                tmd: msg.tmd,
                ticket: msg.ticket,
                cert: msg.cert,
            }
        } else {
            WiiBlobs::default()
        };
        let entry = CatalogEntry::new(&msg.sync_identifier, &msg.netplay_name, msg.region, &blobs);
        let catalog = ctx.session.catalog.clone();
        ctx.session.tasks.spawn_blocking(move || {
            if let Err(e) = catalog.register(entry) {
                warn!(path = %catalog.path().display(), error = %e, "Failed to update the catalog");
            }
        });

        ctx.session.apply_change_game(
            ctx.game,
            ctx.reg,
            msg.sync_identifier,
            msg.netplay_name,
            blobs,
        );
        Ok(())
    }
}
