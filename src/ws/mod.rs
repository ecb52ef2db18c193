//! WebSocket transport: upgrade handling and the wire protocol

pub mod handler;
pub mod protocol;
