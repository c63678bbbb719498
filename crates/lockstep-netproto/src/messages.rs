use crate::msg_id::MsgId;
use serde::de::DeserializeOwned;

pub mod chunked;
pub mod game;
pub mod input;
pub mod session;
pub mod sync;

/// A trait for all session protocol messages.
///
/// Each message type implements this trait to declare its associated `MsgId`,
/// enabling automatic header construction during encoding.
///
/// Implementations are generated by [`define_messages!`]; do not implement it by hand.
pub trait Message: serde::Serialize + DeserializeOwned + Send + 'static {
    /// Returns the message identifier for this message type.
    fn msg_id() -> MsgId;
}

/// Bind message types to their `MsgId`.
macro_rules! define_messages {
    ($($ty:ty => $id:ident),* $(,)?) => {
        $(
            impl $crate::messages::Message for $ty {
                #[inline]
                fn msg_id() -> $crate::msg_id::MsgId {
                    $crate::msg_id::MsgId::$id
                }
            }
        )*
    };
}

pub(crate) use define_messages;
