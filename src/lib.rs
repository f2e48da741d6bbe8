pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use config::BookingConfig;
pub use core::{BookingClient, BookingCoordinator, MapOverview, WorkflowEvent, WorkflowState};
pub use utils::error::{BookingMapError, Result};
