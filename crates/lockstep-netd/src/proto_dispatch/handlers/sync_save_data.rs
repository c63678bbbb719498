//! Client side of save synchronization: acks, failures and uploads.
//!
//! An upload carries persistent-storage saves back to the server. Files are
//! unpacked on the session loop; the storage write runs on the blocking pool
//! and the verdict is queued to the uploader.

use lockstep_netproto::PlayerId;
use lockstep_netproto::messages::sync::{SyncSaveData, TitleSave};
use tracing::{info, warn};

use super::{Handler, HandlerContext};
use crate::async_queue::Target;
use crate::proto_dispatch::error::{HandlerError, HandlerResult};
use crate::services::Compressor;
use crate::sync;

pub(crate) struct SyncSaveDataHandler;

impl Handler<SyncSaveData> for SyncSaveDataHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: SyncSaveData) -> HandlerResult {
        match msg {
            SyncSaveData::Success => {
                sync::on_save_success(ctx.session, ctx.game, ctx.reg, ctx.pid);
            }
            SyncSaveData::Failure => {
                sync::on_sync_failure(ctx.session, ctx.game, ctx.reg, ctx.pid, "save data");
            }
            SyncSaveData::UploadIntent => {
                let allowed = ctx.game.settings.savedata_write;
                info!(pid = ctx.pid, allowed, "Save upload requested");
                let reply = if allowed {
                    SyncSaveData::AllowUpload
                } else {
                    SyncSaveData::Failure
                };
                ctx.reg.send_to(ctx.pid, &reply);
            }
            SyncSaveData::WiiData { mii, titles } => accept_upload(ctx, mii, titles),
            _ => {
                warn!(pid = ctx.pid, "Server-bound save sync message from a client");
                return Err(HandlerError::UnexpectedMessage);
            }
        }
        Ok(())
    }
}

fn accept_upload(ctx: &mut HandlerContext<'_>, mii: Option<Vec<u8>>, titles: Vec<TitleSave>) {
    let pid = ctx.pid;
    if !ctx.game.settings.savedata_write {
        warn!(pid, "Save upload while writes are disabled");
        ctx.reg.send_to(pid, &SyncSaveData::Failure);
        return;
    }

    let compressor = ctx.session.services.compressor.as_ref();
    let mii_ok = mii.is_none_or(|m| compressor.decompress(&m).is_some());
    let titles = if mii_ok { unpack(compressor, titles) } else { None };
    let Some(titles) = titles else {
        warn!(pid, "Save upload could not be unpacked");
        ctx.reg.send_to(pid, &SyncSaveData::Failure);
        return;
    };

    info!(pid, titles = titles.len(), "Writing uploaded saves");
    let storage = ctx.session.services.storage.clone();
    let queue = ctx.session.queue.clone();
    ctx.session.tasks.spawn_blocking(move || {
        let written = titles.into_iter().try_for_each(|t| match t.save {
            Some(bundle) => storage.write_save(t.title_id, bundle),
            None => storage.delete_save(t.title_id),
        });
        let reply = match written {
            Ok(()) => SyncSaveData::Success,
            Err(e) => {
                warn!(pid, error = %e, "Failed to store uploaded saves");
                SyncSaveData::Failure
            }
        };
        reply_to(&queue, pid, &reply);
    });
}

fn reply_to(queue: &crate::async_queue::AsyncQueue, pid: PlayerId, reply: &SyncSaveData) {
    if let Err(e) = queue.send(reply, Target::Only(pid)) {
        warn!(pid, error = %e, "Failed to queue upload verdict");
    }
}

/// Decompress every file in place. `None` if any file is corrupt.
fn unpack(compressor: &dyn Compressor, titles: Vec<TitleSave>) -> Option<Vec<TitleSave>> {
    titles
        .into_iter()
        .map(|mut title| {
            if let Some(bundle) = title.save.as_mut() {
                for file in &mut bundle.files {
                    if let Some(data) = file.data.take() {
                        file.data = Some(compressor.decompress(&data)?);
                    }
                }
            }
            Some(title)
        })
        .collect()
}
