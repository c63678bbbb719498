use std::collections::BTreeMap;

use lockstep_netproto::PlayerId;
use lockstep_netproto::constants::HOST_PLAYER_ID;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Init,
    Success,
    Failed,
}

/// Per-identity "booted and ready" tracking. Only connected identities are active.
#[derive(Debug, Default)]
pub struct Readiness {
    clients: BTreeMap<PlayerId, LoadStatus>,
}

impl Readiness {
    pub fn activate(&mut self, pid: PlayerId) {
        self.clients.insert(pid, LoadStatus::Init);
    }

    pub fn deactivate(&mut self, pid: PlayerId) {
        self.clients.remove(&pid);
    }

    pub fn reset(&mut self, pid: PlayerId) {
        if let Some(status) = self.clients.get_mut(&pid) {
            *status = LoadStatus::Init;
        }
    }

    pub fn reset_except_host(&mut self) {
        for (_, status) in self
            .clients
            .iter_mut()
            .filter(|(pid, _)| **pid != HOST_PLAYER_ID)
        {
            *status = LoadStatus::Init;
        }
    }

    pub fn set_status(&mut self, pid: PlayerId, status: LoadStatus) {
        if let Some(current) = self.clients.get_mut(&pid) {
            *current = status;
        }
    }

    pub fn status(&self, pid: PlayerId) -> Option<LoadStatus> {
        self.clients.get(&pid).copied()
    }

    /// Every non-host client has loaded successfully, and there is at
    /// least one of them.
    pub fn all_ready(&self) -> bool {
        let mut guests = self
            .clients
            .iter()
            .filter(|(pid, _)| **pid != HOST_PLAYER_ID)
            .peekable();
        guests.peek().is_some() && guests.all(|(_, status)| *status == LoadStatus::Success)
    }
}
