//! Terminal rendering of the dashboard views.

pub mod about;
pub mod analysis;
pub mod setup;
pub mod snapshot;
pub mod ui;
