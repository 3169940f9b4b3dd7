mod client;
mod packet;
mod position;
mod signaling;

pub use client::ClientId;
pub use packet::{CHARACTER_NAME_CAPACITY, CharacterName, PacketError, PeerPacket, PeerPosition};
pub use position::MapPosition;
pub use signaling::{ClientMessage, PositionUpdate, ServerMessage};
