use std::collections::HashMap;

use crate::core::map::MapOverview;
use crate::core::render;
use crate::core::workflow::{Completion, Outcome, Ticket, Workflow, WorkflowEvent, WorkflowState};
use crate::domain::model::{Location, LocationId, SessionContext};
use crate::domain::ports::BookingApi;
use crate::utils::error::WorkflowError;

/// Owns one independent workflow per bookable marker.
///
/// `begin` and `complete` touch state; `execute` only talks to the API, so a
/// front end can keep several markers' requests in flight at once and feed
/// the answers back in whatever order they arrive.
pub struct BookingCoordinator<A: BookingApi> {
    api: A,
    session: SessionContext,
    login_url: String,
    workflows: HashMap<LocationId, Workflow>,
}

impl<A: BookingApi> BookingCoordinator<A> {
    pub fn new(api: A, session: SessionContext, login_url: impl Into<String>) -> Self {
        Self {
            api,
            session,
            login_url: login_url.into(),
            workflows: HashMap::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Adds a marker in `Idle`. Re-registering a known location keeps its workflow.
    pub fn register(&mut self, location: Location) {
        self.workflows
            .entry(location.id)
            .or_insert_with(|| Workflow::new(location));
    }

    pub fn register_overview(&mut self, overview: &MapOverview) {
        for location in overview.locations() {
            self.register(location.clone());
        }
        tracing::debug!("{} bookable markers registered", self.workflows.len());
    }

    pub fn workflow(&self, location_id: LocationId) -> Option<&Workflow> {
        self.workflows.get(&location_id)
    }

    pub fn state(&self, location_id: LocationId) -> Option<&WorkflowState> {
        self.workflow(location_id).map(Workflow::state)
    }

    pub fn begin(
        &mut self,
        location_id: LocationId,
        event: WorkflowEvent,
    ) -> Result<Option<Ticket>, WorkflowError> {
        let workflow = self
            .workflows
            .get_mut(&location_id)
            .ok_or(WorkflowError::UnknownLocation(location_id))?;
        workflow.handle(event, &self.session)
    }

    pub async fn execute(&self, ticket: &Ticket) -> Outcome {
        ticket.execute(&self.api).await
    }

    pub fn complete(&mut self, ticket: &Ticket, outcome: Outcome) -> Result<Completion, WorkflowError> {
        let workflow = self
            .workflows
            .get_mut(&ticket.location_id)
            .ok_or(WorkflowError::UnknownLocation(ticket.location_id))?;
        Ok(workflow.apply(ticket, outcome))
    }

    /// Runs one event to completion, one request at most.
    pub async fn dispatch(
        &mut self,
        location_id: LocationId,
        event: WorkflowEvent,
    ) -> Result<&WorkflowState, WorkflowError> {
        if let Some(ticket) = self.begin(location_id, event)? {
            let outcome = self.execute(&ticket).await;
            self.complete(&ticket, outcome)?;
        }

        self.state(location_id)
            .ok_or(WorkflowError::UnknownLocation(location_id))
    }

    pub fn render_popup(&self, location_id: LocationId) -> Option<String> {
        self.workflow(location_id).map(|w| {
            render::render_location_popup(w.location(), w.state(), &self.login_url)
        })
    }

    pub fn render_text(&self, location_id: LocationId) -> Option<String> {
        self.workflow(location_id)
            .map(|w| render::render_text(w.location(), w.state(), &self.login_url))
    }
}
