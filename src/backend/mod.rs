//! Clients for the storage backend's REST surface: identity checks,
//! the hybrid-search SQL function, and chat-row updates.

pub mod auth;
pub mod chats;
pub mod search;
