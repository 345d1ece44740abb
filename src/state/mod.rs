//! Application state: the session state machine and its controller, the
//! notice/navigation side channel, and persisted preferences.

pub mod controller;
pub mod events;
pub mod prefs;
pub mod session;
