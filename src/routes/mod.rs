//! Routing: guards, the route table, and the role-filtered navigation menu.

pub mod guard;
pub mod menu;
pub mod table;
