//! Pre-start synchronization coordinator.
//!
//! `request_start` snapshots the host settings and, with more than one
//! player connected, pushes save data and code lists to every guest. Each
//! enabled phase completes once every guest has reported `Success`; a single
//! `Failure` aborts the whole attempt. The game starts when all enabled
//! phases are satisfied.

use bytes::Bytes;
use chrono::Utc;
use lockstep_netproto::PlayerId;
use lockstep_netproto::channel::ChannelKind;
use lockstep_netproto::codec::encode_message;
use lockstep_netproto::constants::{HOST_PLAYER_ID, MAX_PAD_SLOTS};
use lockstep_netproto::error::ProtoError;
use lockstep_netproto::messages::game::{NetSettings, StartGame, SyncIdentifier};
use lockstep_netproto::messages::input::PadBuffer;
use lockstep_netproto::messages::sync::{
    CodeLine, GciFile, SaveBundle, SyncCodes, SyncSaveData, TitleSave,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::async_queue::Target;
use crate::chunked::ChunkJob;
use crate::services::{CheatCode, MemoryCard, Services};
use crate::session::readiness::LoadStatus;
use crate::session::registry::Registry;
use crate::session::state::GameState;
use crate::session::{Session, wall_clock_token};

#[derive(Debug, Error)]
pub enum StartError {
    #[error("no game selected")]
    NoGameSelected,
    #[error("a game is already running or starting")]
    Busy,
    #[error("too many save pieces to announce ({0})")]
    TooManyPieces(usize),
    #[error("code list has too many lines ({0})")]
    TooManyLines(usize),
    #[error("failed to encode sync payload: {0}")]
    Encode(#[from] ProtoError),
}

/// Begin a start attempt. On error nothing is left pending.
pub(crate) fn request_start(
    session: &Session,
    game: &mut GameState,
    reg: &mut Registry,
) -> Result<(), StartError> {
    let Some(selected) = game.selected_game.clone() else {
        return Err(StartError::NoGameSelected);
    };
    if game.is_busy() {
        return Err(StartError::Busy);
    }

    let snapshot = build_snapshot(&game.settings, reg);
    game.snapshot = Some(snapshot.clone());
    game.sync.reset();

    let players = reg.len();
    info!(players, game = %selected.netplay_name, "Start requested");

    if snapshot.savedata_load && players > 1 {
        game.start_pending = true;
        game.sync.saves_synced = false;
        if let Err(e) = sync_save_data(session, &snapshot, &selected.sync_identifier, reg) {
            warn!(error = %e, "Save synchronization could not be prepared");
            fail_start(session, game);
            return Err(e);
        }
    }

    if snapshot.sync_codes && players > 1 {
        game.start_pending = true;
        game.sync.codes_synced = false;
        if let Err(e) = sync_codes(session, &selected.sync_identifier) {
            warn!(error = %e, "Code synchronization could not be prepared");
            fail_start(session, game);
            return Err(e);
        }
    }

    if !game.start_pending {
        start_game(session, game, reg);
    }
    Ok(())
}

/// Cancel a pending start. Does nothing if none is pending.
pub(crate) fn abort_start(session: &Session, game: &mut GameState) {
    if !game.start_pending {
        debug!("No start pending; nothing to abort");
        return;
    }
    info!("Aborting game start");
    fail_start(session, game);
}

fn fail_start(session: &Session, game: &mut GameState) {
    session.services.observer.on_game_start_aborted();
    session.chunks.abort();
    game.start_pending = false;
}

/// Copy the host settings, dropping features not every player can honour.
fn build_snapshot(settings: &NetSettings, reg: &Registry) -> NetSettings {
    let mut snapshot = settings.clone();
    snapshot.load_ipl_dump &= reg.clients().all(|c| c.has_ipl_dump);
    snapshot.use_fma &= reg.clients().all(|c| c.has_hardware_fma);
    snapshot
}

/// A guest applied the save data.
pub(crate) fn on_save_success(
    session: &Session,
    game: &mut GameState,
    reg: &mut Registry,
    pid: PlayerId,
) {
    if !game.start_pending || game.sync.saves_synced {
        debug!(pid, "Ignoring save sync success outside a pending start");
        return;
    }
    if pid != HOST_PLAYER_ID {
        game.sync.save_acks.insert(pid);
    }
    let needed = reg.len().saturating_sub(1);
    debug!(pid, acked = game.sync.save_acks.len(), needed, "Save sync success");
    if game.sync.save_acks.len() >= needed {
        info!("All players' saves synchronized");
        game.sync.saves_synced = true;
        check_sync_and_start(session, game, reg);
    }
}

pub(crate) fn on_code_success(
    session: &Session,
    game: &mut GameState,
    reg: &mut Registry,
    pid: PlayerId,
) {
    if !game.start_pending || game.sync.codes_synced {
        debug!(pid, "Ignoring code sync success outside a pending start");
        return;
    }
    if pid != HOST_PLAYER_ID {
        game.sync.code_acks.insert(pid);
    }
    let needed = reg.len().saturating_sub(1);
    debug!(pid, acked = game.sync.code_acks.len(), needed, "Code sync success");
    if game.sync.code_acks.len() >= needed {
        info!("All players' codes synchronized");
        game.sync.codes_synced = true;
        check_sync_and_start(session, game, reg);
    }
}

/// A guest could not apply what it was sent. Terminal for this attempt.
pub(crate) fn on_sync_failure(
    session: &Session,
    game: &mut GameState,
    reg: &mut Registry,
    pid: PlayerId,
    what: &str,
) {
    let name = reg.get(pid).map(|c| c.name.clone()).unwrap_or_default();
    warn!(pid, %name, what, "Player failed to synchronize");
    session
        .services
        .observer
        .on_chat(&format!("{name} failed to synchronize {what}."));
    reg.readiness.set_status(pid, LoadStatus::Failed);
    if game.start_pending {
        fail_start(session, game);
    }
}

/// Start once every enabled phase is done.
pub(crate) fn check_sync_and_start(session: &Session, game: &mut GameState, reg: &mut Registry) {
    if game.start_pending && game.sync.all_synced() {
        start_game(session, game, reg);
    }
}

pub(crate) fn start_game(session: &Session, game: &mut GameState, reg: &mut Registry) {
    game.timebase.reset();
    game.current_game = wall_clock_token();
    reg.readiness.reset_except_host();

    if !game.host_input_authority {
        session.publish(
            &PadBuffer {
                size: game.pad_buffer_size,
            },
            Target::ALL,
        );
    }

    game.current_golfer = HOST_PLAYER_ID;
    game.pending_golfer = 0;
    game.grace_counter = 0;

    let settings = game
        .snapshot
        .clone()
        .unwrap_or_else(|| game.settings.clone());
    let start = StartGame {
        game_token: game.current_game,
        region: settings.save_data_region.clone(),
        settings,
        initial_rtc: Utc::now().timestamp().max(0) as u64,
        sram: session.services.storage.sram(),
    };
    info!(token = start.game_token, players = reg.len(), "Starting game");
    session.publish(&start, Target::ALL);

    game.start_pending = false;
    game.is_running = true;
}

/// Encoded save pieces for the guests, in send order.
struct SavePiece {
    title: String,
    frame: Bytes,
}

fn piece(title: impl Into<String>, msg: &SyncSaveData) -> Result<SavePiece, ProtoError> {
    Ok(SavePiece {
        title: title.into(),
        frame: Bytes::from(encode_message(msg)?),
    })
}

fn slot_letter(slot_a: bool) -> char {
    if slot_a { 'A' } else { 'B' }
}

fn collect_save_pieces(
    services: &Services,
    settings: &NetSettings,
    game: &SyncIdentifier,
    reg: &Registry,
) -> Result<Vec<SavePiece>, ProtoError> {
    let storage = &services.storage;
    let compressor = &services.compressor;
    let mut pieces = Vec::new();

    for slot_a in [true, false] {
        let letter = slot_letter(slot_a);
        match storage.memory_card(slot_a) {
            Some(MemoryCard::Raw {
                region,
                size_override,
                image,
            }) => pieces.push(piece(
                format!("Memory Card {letter} Synchronization"),
                &SyncSaveData::RawData {
                    is_slot_a: slot_a,
                    region,
                    size_override,
                    data: Some(compressor.compress(&image)),
                },
            )?),
            Some(MemoryCard::GciFolder { files }) => pieces.push(piece(
                format!("GCI Folder {letter} Synchronization"),
                &SyncSaveData::GciData {
                    is_slot_a: slot_a,
                    files: files
                        .into_iter()
                        .map(|(name, data)| GciFile {
                            data: compressor.compress(&data),
                            name,
                        })
                        .collect(),
                },
            )?),
            None => {}
        }
    }

    let titles = if settings.savedata_sync_all_wii {
        storage.installed_titles()
    } else {
        storage.title_for(game).into_iter().collect()
    };
    if !titles.is_empty() {
        let titles = titles
            .into_iter()
            .map(|title_id| TitleSave {
                title_id,
                save: storage
                    .read_save(title_id)
                    .map(|bundle| compress_bundle(services, bundle)),
            })
            .collect();
        let mii = storage.mii_data().map(|m| compressor.compress(&m));
        pieces.push(piece(
            "Wii Save Synchronization",
            &SyncSaveData::WiiData { mii, titles },
        )?);
    }

    for slot in 0..MAX_PAD_SLOTS {
        let cfg = &reg.mappings.gba[slot];
        if !(cfg.enabled && cfg.has_rom) {
            continue;
        }
        let data = storage.gba_save(slot).map(|d| compressor.compress(&d));
        pieces.push(piece(
            format!("GBA{} Save File Synchronization", slot + 1),
            &SyncSaveData::GbaData {
                slot: slot as u8,
                data,
            },
        )?);
    }

    Ok(pieces)
}

fn compress_bundle(services: &Services, mut bundle: SaveBundle) -> SaveBundle {
    for file in &mut bundle.files {
        if let Some(data) = file.data.take() {
            file.data = Some(services.compressor.compress(&data));
        }
    }
    bundle
}

/// Announce the piece count to everyone, then hand the pieces to the chunk
/// engine for every guest.
fn sync_save_data(
    session: &Session,
    settings: &NetSettings,
    game: &SyncIdentifier,
    reg: &Registry,
) -> Result<(), StartError> {
    let pieces = collect_save_pieces(&session.services, settings, game, reg)?;
    let save_count =
        u8::try_from(pieces.len()).map_err(|_| StartError::TooManyPieces(pieces.len()))?;

    info!(save_count, "Synchronizing saves");
    session.queue.send_on(
        &SyncSaveData::Notify { save_count },
        Target::ALL,
        ChannelKind::Bulk,
    )?;
    for p in pieces {
        session.chunks.enqueue(ChunkJob {
            title: p.title,
            payload: p.frame,
            target: Target::AllExcept(HOST_PLAYER_ID),
        });
    }
    Ok(())
}

/// Lines of every approved, enabled code.
fn active_lines(
    services: &Services,
    codes: Vec<CheatCode>,
) -> Result<(u16, Vec<CodeLine>), StartError> {
    let lines: Vec<CodeLine> = codes
        .into_iter()
        .filter(|c| services.codes.is_approved(c))
        .filter(|c| c.enabled)
        .flat_map(|c| c.lines)
        .collect();
    let count = u16::try_from(lines.len()).map_err(|_| StartError::TooManyLines(lines.len()))?;
    Ok((count, lines))
}

fn sync_codes(session: &Session, game: &SyncIdentifier) -> Result<(), StartError> {
    let services = &session.services;
    let (gecko_lines, gecko) = active_lines(services, services.codes.gecko_codes(game))?;
    let (ar_lines, ar) = active_lines(services, services.codes.ar_codes(game))?;
    info!(gecko_lines, ar_lines, "Synchronizing codes");

    let queue = &session.queue;
    queue.send(&SyncCodes::Notify, Target::ALL)?;
    queue.send(&SyncCodes::NotifyGecko { lines: gecko_lines }, Target::ALL)?;
    queue.send(&SyncCodes::GeckoData { codes: gecko }, Target::ALL)?;
    queue.send(&SyncCodes::NotifyAr { lines: ar_lines }, Target::ALL)?;
    queue.send(&SyncCodes::ArData { codes: ar }, Target::ALL)?;
    Ok(())
}
