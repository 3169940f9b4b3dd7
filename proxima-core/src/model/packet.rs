use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::position::MapPosition;

/// The game stores character names in a 12 byte, nul-terminated field.
pub const CHARACTER_NAME_CAPACITY: usize = 11;

pub type CharacterName = heapless::String<CHARACTER_NAME_CAPACITY>;

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("peer packet codec error: {0}")]
    Codec(#[from] postcard::Error),
}

/// Where a connected peer currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerPosition {
    pub map_id: i32,
    pub x: i32,
    pub y: i32,
    pub character_name: CharacterName,
}

impl PeerPosition {
    pub fn new(position: MapPosition, character_name: &str) -> Self {
        Self {
            map_id: position.map_id,
            x: position.x,
            y: position.y,
            character_name: truncate_name(character_name),
        }
    }

    pub fn position(&self) -> MapPosition {
        MapPosition::new(self.map_id, self.x, self.y)
    }
}

/// Messages exchanged directly between connected peers over the data channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerPacket {
    Position(PeerPosition),
}

impl PeerPacket {
    pub fn encode(&self) -> Result<Bytes, PacketError> {
        Ok(Bytes::from(postcard::to_allocvec(self)?))
    }

    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        Ok(postcard::from_bytes(data)?)
    }
}

/// Keeps as many whole characters as fit the fixed-size name field.
fn truncate_name(name: &str) -> CharacterName {
    let mut out = CharacterName::new();
    for c in name.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
