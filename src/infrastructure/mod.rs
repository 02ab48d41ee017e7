//! Infrastructure layer - Store backends and logging setup

pub mod logging;
pub mod store;
