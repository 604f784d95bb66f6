//! HTTP login relay.
//!
//! The game's login page posts the player's one-time passcode and session
//! cookie here; [`relay::LoginRelay`] hands the cookie to the `/login` flow
//! waiting on that passcode.

pub mod relay;
pub mod server;
