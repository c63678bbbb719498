use lockstep_netproto::PlayerId;
use lockstep_netproto::constants::MAX_PAD_SLOTS;
use lockstep_netproto::messages::input::{
    GbaConfig, GbaConfigArray, PadMapping, PadMappingArray, WiimoteMapping,
};

/// Which tables changed after a player was cleared from them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cleared {
    /// Pad table and the parallel GBA table.
    pub pads: bool,
    pub wiimotes: bool,
}

/// Slot -> owner tables for every virtual controller port.
///
/// Every non-zero entry must name a connected player; the registry clears a
/// player from all tables when they leave.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTables {
    pub pads: PadMappingArray,
    pub gba: GbaConfigArray,
    pub wiimotes: PadMappingArray,
}

impl MappingTables {
    /// Give `pid` the first unmapped pad, if any.
    pub fn assign_free_pad(&mut self, pid: PlayerId) -> Option<usize> {
        let slot = self.pads.iter().position(|&owner| owner == 0)?;
        self.pads[slot] = pid;
        Some(slot)
    }

    pub fn pad_owner(&self, slot: usize) -> Option<PlayerId> {
        self.pads.get(slot).copied()
    }

    pub fn wiimote_owner(&self, slot: usize) -> Option<PlayerId> {
        self.wiimotes.get(slot).copied()
    }

    pub fn gba_enabled(&self, slot: usize) -> bool {
        self.gba.get(slot).is_some_and(|g| g.enabled)
    }

    pub fn holds_pad(&self, pid: PlayerId) -> bool {
        pid != 0 && self.pads.contains(&pid)
    }

    /// Any pad or motion controller mapped to `pid`.
    pub fn has_controller(&self, pid: PlayerId) -> bool {
        pid != 0 && (self.pads.contains(&pid) || self.wiimotes.contains(&pid))
    }

    /// Remove `pid` from every table. Pads it held also lose their GBA.
    pub fn clear_player(&mut self, pid: PlayerId) -> Cleared {
        let mut cleared = Cleared::default();
        if pid == 0 {
            return cleared;
        }
        for slot in 0..MAX_PAD_SLOTS {
            if self.pads[slot] == pid {
                self.pads[slot] = 0;
                self.gba[slot].enabled = false;
                cleared.pads = true;
            }
            if self.wiimotes[slot] == pid {
                self.wiimotes[slot] = 0;
                cleared.wiimotes = true;
            }
        }
        cleared
    }

    /// Replace all tables, dropping owners that are not connected.
    pub fn replace(
        &mut self,
        pads: PadMappingArray,
        gba: GbaConfigArray,
        wiimotes: PadMappingArray,
        is_connected: impl Fn(PlayerId) -> bool,
    ) {
        self.pads = sanitize(pads, &is_connected);
        self.gba = gba;
        self.wiimotes = sanitize(wiimotes, &is_connected);
    }

    /// True when every non-zero owner satisfies `is_connected`.
    pub fn owners_valid(&self, is_connected: impl Fn(PlayerId) -> bool) -> bool {
        self.pads
            .iter()
            .chain(self.wiimotes.iter())
            .all(|&pid| pid == 0 || is_connected(pid))
    }

    pub fn pad_message(&self) -> PadMapping {
        PadMapping { pads: self.pads }
    }

    pub fn gba_message(&self) -> GbaConfig {
        GbaConfig {
            slots: self.gba.clone(),
        }
    }

    pub fn wiimote_message(&self) -> WiimoteMapping {
        WiimoteMapping {
            wiimotes: self.wiimotes,
        }
    }
}

pub(crate) fn sanitize(
    mut table: PadMappingArray,
    is_connected: impl Fn(PlayerId) -> bool,
) -> PadMappingArray {
    for owner in table.iter_mut() {
        if *owner != 0 && !is_connected(*owner) {
            *owner = 0;
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_players_fill_the_first_free_pad() {
        let mut t = MappingTables::default();
        assert_eq!(t.assign_free_pad(1), Some(0));
        assert_eq!(t.assign_free_pad(2), Some(1));
        t.pads[0] = 0;
        assert_eq!(t.assign_free_pad(3), Some(0));
        t.pads = [1, 2, 3, 4];
        assert_eq!(t.assign_free_pad(5), None);
    }

    #[test]
    fn clearing_a_player_disables_their_gba_slots() {
        let mut t = MappingTables::default();
        t.pads = [1, 2, 2, 0];
        t.wiimotes = [0, 2, 0, 0];
        for g in t.gba.iter_mut() {
            g.enabled = true;
        }

        let cleared = t.clear_player(2);
        assert_eq!(
            cleared,
            Cleared {
                pads: true,
                wiimotes: true
            }
        );
        assert_eq!(t.pads, [1, 0, 0, 0]);
        assert_eq!(t.wiimotes, [0; 4]);
        assert!(t.gba[0].enabled);
        assert!(!t.gba[1].enabled);
        assert!(!t.gba[2].enabled);
        assert!(t.gba[3].enabled);
        assert!(!t.holds_pad(2));
    }

    #[test]
    fn clearing_an_unmapped_player_changes_nothing() {
        let mut t = MappingTables::default();
        t.pads = [1, 0, 0, 0];
        assert_eq!(t.clear_player(3), Cleared::default());
        assert_eq!(t.pads, [1, 0, 0, 0]);
    }

    #[test]
    fn replace_drops_disconnected_owners() {
        let mut t = MappingTables::default();
        t.replace(
            [1, 7, 2, 0],
            Default::default(),
            [9, 0, 0, 2],
            |pid| pid == 1 || pid == 2,
        );
        assert_eq!(t.pads, [1, 0, 2, 0]);
        assert_eq!(t.wiimotes, [0, 0, 0, 2]);
        assert!(t.owners_valid(|pid| pid <= 2));
    }
}
