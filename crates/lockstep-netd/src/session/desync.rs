use std::collections::HashMap;

use lockstep_netproto::PlayerId;

/// Result of recording one timebase report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimebaseOutcome {
    /// Still waiting for other players to report this frame.
    Pending,
    /// Everyone agreed.
    Consistent,
    /// Values diverged. `blamed` is `0` when there is no unique outlier.
    Desync { blamed: PlayerId },
    /// A desync was already reported for this game.
    Suppressed,
}

/// Per-frame checksum reports, purged as soon as a frame is complete.
#[derive(Debug, Default)]
pub struct TimebaseLedger {
    frames: HashMap<u64, Vec<(PlayerId, u64)>>,
    desync_detected: bool,
}

impl TimebaseLedger {
    /// Forget everything; called when a new game starts.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.desync_detected = false;
    }

    pub fn desync_detected(&self) -> bool {
        self.desync_detected
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Record `pid`'s checksum for `frame`; `expected` is the number of
    /// connected players.
    pub fn record(
        &mut self,
        pid: PlayerId,
        frame: u64,
        value: u64,
        expected: usize,
    ) -> TimebaseOutcome {
        if self.desync_detected {
            return TimebaseOutcome::Suppressed;
        }

        let reports = self.frames.entry(frame).or_default();
        match reports.iter_mut().find(|(p, _)| *p == pid) {
            Some(existing) => existing.1 = value,
            None => reports.push((pid, value)),
        }
        if reports.len() < expected {
            return TimebaseOutcome::Pending;
        }
        self.settle(frame)
    }

    /// Drop `pid`'s reports. Frames the remaining `expected` players have all
    /// reported are then compared, oldest first; the first desync found is
    /// returned as `(frame, blamed)`.
    pub fn forget_player(&mut self, pid: PlayerId, expected: usize) -> Option<(u64, PlayerId)> {
        for reports in self.frames.values_mut() {
            reports.retain(|(p, _)| *p != pid);
        }
        self.frames.retain(|_, reports| !reports.is_empty());
        if self.desync_detected {
            return None;
        }

        let mut complete: Vec<u64> = self
            .frames
            .iter()
            .filter(|(_, reports)| reports.len() >= expected)
            .map(|(frame, _)| *frame)
            .collect();
        complete.sort_unstable();
        complete.into_iter().find_map(|frame| match self.settle(frame) {
            TimebaseOutcome::Desync { blamed } => Some((frame, blamed)),
            _ => None,
        })
    }

    /// Compare and purge a fully reported frame.
    fn settle(&mut self, frame: u64) -> TimebaseOutcome {
        let reports = self.frames.remove(&frame).unwrap_or_default();
        let first = reports.first().map(|(_, v)| *v);
        if reports.iter().all(|(_, v)| Some(*v) == first) {
            return TimebaseOutcome::Consistent;
        }

        self.desync_detected = true;
        TimebaseOutcome::Desync {
            blamed: unique_outlier(&reports).unwrap_or(0),
        }
    }
}

/// The single report whose value differs from all others while the others
/// agree with each other.
pub fn unique_outlier(reports: &[(PlayerId, u64)]) -> Option<PlayerId> {
    let mut found = None;
    for (i, &(pid, value)) in reports.iter().enumerate() {
        let mut rest = reports
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, (_, v))| *v);
        let Some(reference) = rest.next() else {
            continue;
        };
        if reference != value && rest.all(|v| v == reference) {
            if found.is_some() {
                return None;
            }
            found = Some(pid);
        }
    }
    found
}
