//! Classification of inbound datagrams by their magic number.

use crate::error::ErrorCode;
use crate::event::EventKind;

use tracing::warn;

/// Magic numbers identifying who sent a message, read in network byte order
/// from the first four bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicNumbers {
    pub peer: u32,
    pub supervisor: u32,
}

impl MagicNumbers {
    pub const DEFAULT_PEER: u32 = 0xDEAD_BEEF;
    pub const DEFAULT_SUPERVISOR: u32 = 0x5355_504D;
}

impl Default for MagicNumbers {
    fn default() -> Self {
        Self {
            peer: Self::DEFAULT_PEER,
            supervisor: Self::DEFAULT_SUPERVISOR,
        }
    }
}

/// Picks the event kind that should receive `data`, along with its magic.
pub(crate) fn classify(magic: &MagicNumbers, data: &[u8]) -> Result<(EventKind, u32), ErrorCode> {
    let Some(header) = data.first_chunk::<4>() else {
        warn!(len = data.len(), "Received message shorter than its magic; ignoring packet");
        return Err(ErrorCode::BadMagic);
    };

    let value = u32::from_be_bytes(*header);
    if value == magic.supervisor {
        Ok((EventKind::SupMsgIn, value))
    } else if value == magic.peer {
        Ok((EventKind::PeerMsgIn, value))
    } else {
        warn!(
            magic = %format!("{value:#010X}"),
            "Received possibly malformed message; ignoring packet"
        );
        Err(ErrorCode::BadMagic)
    }
}
