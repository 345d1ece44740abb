//! Persistence helpers shared across the session and preference layers.
//!
//! SYSTEM CONTEXT
//! ==============
//! `storage` abstracts the key-value slots that survive restarts, and
//! `credentials` is the single bearer-token slot built on top of it.

pub mod credentials;
pub mod storage;
