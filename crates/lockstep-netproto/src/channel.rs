use serde::{Deserialize, Serialize};
use strum::FromRepr;

use crate::msg_id::MsgId;

/// Logical channels multiplexed over a transport.
///
/// - `Control`: handshake/session control and small messages.
/// - `Input`: time-sensitive input relay (minimize head-of-line blocking).
/// - `Unreliable`: latency probes; may be dropped under pressure.
/// - `Bulk`: chunked transfers (save data, code lists).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromRepr)]
pub enum ChannelKind {
    Control = 0,
    Input = 1,
    Unreliable = 2,
    Bulk = 3,
}

impl ChannelKind {
    /// Reliable channels never drop frames.
    pub const fn is_reliable(self) -> bool {
        !matches!(self, ChannelKind::Unreliable)
    }
}

/// Map a message ID to its preferred logical channel.
///
/// Transports that do not support multiple channels should send everything on `Control`.
pub const fn channel_for_msg(msg_id: MsgId) -> ChannelKind {
    match msg_id {
        MsgId::PadData | MsgId::PadHostData | MsgId::WiimoteData => ChannelKind::Input,

        MsgId::Ping | MsgId::Pong | MsgId::PlayerPingData => ChannelKind::Unreliable,

        MsgId::ChunkedDataStart
        | MsgId::ChunkedDataEnd
        | MsgId::ChunkedDataPayload
        | MsgId::ChunkedDataProgress
        | MsgId::ChunkedDataComplete
        | MsgId::ChunkedDataAbort => ChannelKind::Bulk,

        _ => ChannelKind::Control,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunked_traffic_never_shares_the_input_channel() {
        for id in [
            MsgId::ChunkedDataStart,
            MsgId::ChunkedDataPayload,
            MsgId::ChunkedDataEnd,
            MsgId::ChunkedDataAbort,
        ] {
            assert_eq!(channel_for_msg(id), ChannelKind::Bulk);
        }
        assert_eq!(channel_for_msg(MsgId::PadData), ChannelKind::Input);
        assert_eq!(channel_for_msg(MsgId::ChangeGame), ChannelKind::Control);
    }

    #[test]
    fn only_ping_traffic_is_unreliable() {
        assert!(!ChannelKind::Unreliable.is_reliable());
        assert!(ChannelKind::Bulk.is_reliable());
        assert_eq!(channel_for_msg(MsgId::Ping), ChannelKind::Unreliable);
    }
}
