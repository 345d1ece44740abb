//! Network clients: the identity provider, the dashboard backend, and the
//! wire types they share.

pub mod api;
pub mod identity;
pub mod profile;
pub mod types;
