use bytes::Bytes;
use futures_util::{Sink, SinkExt};
use lockstep_netproto::channel::{ChannelKind, channel_for_msg};
use lockstep_netproto::codec::encode_message;
use lockstep_netproto::error::ProtoError;
use lockstep_netproto::messages::Message;
use tokio::sync::mpsc;

/// Frames queued on the unreliable channel before new ones are dropped.
pub const UNRELIABLE_QUEUE_CAPACITY: usize = 64;

/// Per-peer outbound queues, one per logical channel.
///
/// Frames must already be framed for TCP (length prefix + header + payload).
/// Reliable channels never drop; the unreliable channel drops when full.
#[derive(Debug, Clone)]
pub struct PeerOutbound {
    control: mpsc::UnboundedSender<Bytes>,
    input: mpsc::UnboundedSender<Bytes>,
    bulk: mpsc::UnboundedSender<Bytes>,
    unreliable: mpsc::Sender<Bytes>,
}

/// Receiving half of [`PeerOutbound`], owned by the writer task.
#[derive(Debug)]
pub struct PeerOutboundRx {
    control: mpsc::UnboundedReceiver<Bytes>,
    input: mpsc::UnboundedReceiver<Bytes>,
    bulk: mpsc::UnboundedReceiver<Bytes>,
    unreliable: mpsc::Receiver<Bytes>,
}

pub fn peer_channels() -> (PeerOutbound, PeerOutboundRx) {
    let (control, control_rx) = mpsc::unbounded_channel();
    let (input, input_rx) = mpsc::unbounded_channel();
    let (bulk, bulk_rx) = mpsc::unbounded_channel();
    let (unreliable, unreliable_rx) = mpsc::channel(UNRELIABLE_QUEUE_CAPACITY);
    (
        PeerOutbound {
            control,
            input,
            bulk,
            unreliable,
        },
        PeerOutboundRx {
            control: control_rx,
            input: input_rx,
            bulk: bulk_rx,
            unreliable: unreliable_rx,
        },
    )
}

impl PeerOutbound {
    /// Queue an encoded frame. Returns `false` if the connection is gone or an
    /// unreliable frame was dropped.
    pub fn send_frame(&self, channel: ChannelKind, frame: Bytes) -> bool {
        match channel {
            ChannelKind::Control => self.control.send(frame).is_ok(),
            ChannelKind::Input => self.input.send(frame).is_ok(),
            ChannelKind::Bulk => self.bulk.send(frame).is_ok(),
            ChannelKind::Unreliable => self.unreliable.try_send(frame).is_ok(),
        }
    }

    /// Encode `msg` and queue it on its preferred channel.
    pub fn send<T: Message>(&self, msg: &T) -> Result<bool, ProtoError> {
        let frame = Bytes::from(encode_message(msg)?);
        Ok(self.send_frame(channel_for_msg(T::msg_id()), frame))
    }
}

#[cfg(test)]
impl PeerOutboundRx {
    /// Everything queued so far, in writer priority order.
    pub(crate) fn drain_frames(&mut self) -> Vec<Bytes> {
        let mut out = Vec::new();
        while let Ok(f) = self.input.try_recv() {
            out.push(f);
        }
        while let Ok(f) = self.control.try_recv() {
            out.push(f);
        }
        while let Ok(f) = self.unreliable.try_recv() {
            out.push(f);
        }
        while let Ok(f) = self.bulk.try_recv() {
            out.push(f);
        }
        out
    }
}

/// Spawn a writer task that drains the peer's queues into the socket sink.
///
/// Queues are polled in priority order (input, control, unreliable, bulk) so a
/// long chunked transfer never delays input relay. Exits once every sender is
/// dropped and the queues are empty, or on a socket write error.
pub fn spawn_writer<S>(
    mut write: S,
    mut rx: PeerOutboundRx,
) -> tokio::task::JoinHandle<anyhow::Result<()>>
where
    S: Sink<Bytes, Error = std::io::Error> + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                biased;
                Some(f) = rx.input.recv() => f,
                Some(f) = rx.control.recv() => f,
                Some(f) = rx.unreliable.recv() => f,
                Some(f) = rx.bulk.recv() => f,
                else => break,
            };
            write.send(frame).await?;
        }
        write.flush().await?;
        Ok(())
    })
}
