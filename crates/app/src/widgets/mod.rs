//! Reusable widgets for the application.

pub mod drag_drop;
