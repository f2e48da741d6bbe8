pub mod client;
pub mod coordinator;
pub mod map;
pub mod render;
pub mod workflow;

pub use crate::domain::model::{BookingRequest, Location, SessionContext, Slot};
pub use crate::domain::ports::{BookingApi, ConfigProvider, CredentialProvider};
pub use crate::utils::error::Result;
pub use client::BookingClient;
pub use coordinator::BookingCoordinator;
pub use map::{MapOverview, MapView};
pub use workflow::{Completion, Outcome, Ticket, Workflow, WorkflowEvent, WorkflowState};
