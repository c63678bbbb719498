//! Thread-safe outbox drained by the session loop.
//!
//! Anything not running on the session task (host API calls, the chunk worker,
//! the idle supervisor, blocking save writers) publishes packets here instead
//! of touching peer queues directly. Items are delivered in enqueue order.

use bytes::Bytes;
use lockstep_netproto::PlayerId;
use lockstep_netproto::channel::{ChannelKind, channel_for_msg};
use lockstep_netproto::codec::encode_message;
use lockstep_netproto::error::ProtoError;
use lockstep_netproto::messages::Message;
use tokio::sync::mpsc;

/// Destination selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Exactly one identity.
    Only(PlayerId),
    /// Everyone except one identity; `AllExcept(0)` is everyone.
    AllExcept(PlayerId),
}

impl Target {
    pub const ALL: Target = Target::AllExcept(0);

    pub fn includes(self, pid: PlayerId) -> bool {
        match self {
            Target::Only(p) => p == pid,
            Target::AllExcept(p) => p != pid,
        }
    }
}

#[derive(Debug)]
pub(crate) enum QueueItem {
    Packet {
        frame: Bytes,
        channel: ChannelKind,
        target: Target,
    },
    /// Forcibly disconnect `pid`.
    Kick { pid: PlayerId, reason: &'static str },
}

#[derive(Debug, Clone)]
pub struct AsyncQueue {
    tx: mpsc::UnboundedSender<QueueItem>,
}

pub(crate) type AsyncQueueRx = mpsc::UnboundedReceiver<QueueItem>;

impl AsyncQueue {
    pub(crate) fn new() -> (Self, AsyncQueueRx) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Encode `msg` and queue it on its preferred channel.
    pub fn send<T: Message>(&self, msg: &T, target: Target) -> Result<(), ProtoError> {
        self.send_on(msg, target, channel_for_msg(T::msg_id()))
    }

    /// Encode `msg` and queue it on an explicit channel.
    pub fn send_on<T: Message>(
        &self,
        msg: &T,
        target: Target,
        channel: ChannelKind,
    ) -> Result<(), ProtoError> {
        let frame = Bytes::from(encode_message(msg)?);
        self.push(QueueItem::Packet {
            frame,
            channel,
            target,
        });
        Ok(())
    }

    pub fn kick(&self, pid: PlayerId, reason: &'static str) {
        self.push(QueueItem::Kick { pid, reason });
    }

    fn push(&self, item: QueueItem) {
        // The receiver only goes away when the session loop has shut down.
        let _ = self.tx.send(item);
    }
}

#[cfg(test)]
mod tests {
    use lockstep_netproto::messages::session::PlayerLeave;

    use super::*;

    #[test]
    fn items_drain_in_enqueue_order() {
        let (queue, mut rx) = AsyncQueue::new();
        queue.send(&PlayerLeave { pid: 2 }, Target::ALL).unwrap();
        queue.kick(3, "test");

        assert!(matches!(
            rx.try_recv(),
            Ok(QueueItem::Packet {
                channel: ChannelKind::Control,
                target: Target::AllExcept(0),
                ..
            })
        ));
        assert!(matches!(rx.try_recv(), Ok(QueueItem::Kick { pid: 3, .. })));
    }

    #[test]
    fn target_selection() {
        assert!(Target::ALL.includes(1));
        assert!(!Target::AllExcept(1).includes(1));
        assert!(Target::Only(4).includes(4));
        assert!(!Target::Only(4).includes(5));
    }
}
