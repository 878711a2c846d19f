//! Taskrelay library.
//!
//! Streaming event proxy between browser clients and the agent task backend:
//! resolves the caller's bearer credential, opens a server-sent events stream
//! on the backend and relays its bytes to the client unchanged.

pub mod api;
pub mod backend;
pub mod credentials;
pub mod pump;
pub mod session;
