//! `WebSocket` hub: connection state, planning registry, event dispatch.

pub mod connection;
pub mod hub;
pub mod registry;
pub mod session;
