//! Per-marker booking workflow: date → time slot → consultant → appointment.
//!
//! The state machine never touches the network. Transitions that need data
//! hand out a [`Ticket`]; whoever runs the request feeds the answer back via
//! [`Workflow::apply`]. Each ticket carries the generation it was issued
//! under, and any later transition bumps the generation, so an answer that
//! arrives after the user moved on is dropped instead of overwriting newer
//! state.

use chrono::NaiveDate;

use crate::domain::model::{
    AppointmentId, BookingRequest, Consultant, ConsultantId, Location, LocationId,
    SessionContext, Slot,
};
use crate::domain::ports::BookingApi;
use crate::utils::error::{BookingError, PermissionError, QueryError, TransportError, WorkflowError};

/// Slots fetched for one date.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySlots {
    pub date: NaiveDate,
    pub slots: Vec<Slot>,
}

impl DaySlots {
    pub fn offers(&self, time: &Slot) -> bool {
        self.slots.contains(time)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotChoice {
    pub day: DaySlots,
    pub time: Slot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsultantOffer {
    pub choice: SlotChoice,
    pub consultants: Vec<Consultant>,
}

impl ConsultantOffer {
    pub fn offers(&self, consultant_id: ConsultantId) -> bool {
        self.consultants.iter().any(|c| c.id == consultant_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    Idle,
    SlotsLoading {
        date: NaiveDate,
    },
    SlotsFailed {
        date: NaiveDate,
        message: String,
    },
    SlotsReady(DaySlots),
    LoginRequired(SlotChoice),
    RoleDenied(SlotChoice),
    ConsultantsLoading(SlotChoice),
    ConsultantsFailed {
        choice: SlotChoice,
        message: String,
    },
    ConsultantsReady(ConsultantOffer),
    Booking {
        offer: ConsultantOffer,
        request: BookingRequest,
    },
    BookingFailed {
        offer: ConsultantOffer,
        request: BookingRequest,
        message: String,
    },
    Booked {
        request: BookingRequest,
        appointment_id: AppointmentId,
    },
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::SlotsLoading { .. } => "slots_loading",
            WorkflowState::SlotsFailed { .. } => "slots_failed",
            WorkflowState::SlotsReady(_) => "slots_ready",
            WorkflowState::LoginRequired(_) => "login_required",
            WorkflowState::RoleDenied(_) => "role_denied",
            WorkflowState::ConsultantsLoading(_) => "consultants_loading",
            WorkflowState::ConsultantsFailed { .. } => "consultants_failed",
            WorkflowState::ConsultantsReady(_) => "consultants_ready",
            WorkflowState::Booking { .. } => "booking",
            WorkflowState::BookingFailed { .. } => "booking_failed",
            WorkflowState::Booked { .. } => "booked",
        }
    }

    /// The date the popup currently shows.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            WorkflowState::Idle => None,
            WorkflowState::SlotsLoading { date } | WorkflowState::SlotsFailed { date, .. } => {
                Some(*date)
            }
            WorkflowState::Booked { request, .. } => Some(request.date),
            other => other.day().map(|day| day.date),
        }
    }

    /// Loaded slots, for every state from `SlotsReady` onwards.
    pub fn day(&self) -> Option<&DaySlots> {
        match self {
            WorkflowState::SlotsReady(day) => Some(day),
            WorkflowState::LoginRequired(choice)
            | WorkflowState::RoleDenied(choice)
            | WorkflowState::ConsultantsLoading(choice)
            | WorkflowState::ConsultantsFailed { choice, .. } => Some(&choice.day),
            WorkflowState::ConsultantsReady(offer)
            | WorkflowState::Booking { offer, .. }
            | WorkflowState::BookingFailed { offer, .. } => Some(&offer.choice.day),
            WorkflowState::Idle
            | WorkflowState::SlotsLoading { .. }
            | WorkflowState::SlotsFailed { .. }
            | WorkflowState::Booked { .. } => None,
        }
    }

    pub fn selected_time(&self) -> Option<&Slot> {
        match self {
            WorkflowState::LoginRequired(choice)
            | WorkflowState::RoleDenied(choice)
            | WorkflowState::ConsultantsLoading(choice)
            | WorkflowState::ConsultantsFailed { choice, .. } => Some(&choice.time),
            WorkflowState::ConsultantsReady(offer)
            | WorkflowState::Booking { offer, .. }
            | WorkflowState::BookingFailed { offer, .. } => Some(&offer.choice.time),
            WorkflowState::Booked { request, .. } => Some(&request.time),
            _ => None,
        }
    }

    pub fn offer(&self) -> Option<&ConsultantOffer> {
        match self {
            WorkflowState::ConsultantsReady(offer)
            | WorkflowState::Booking { offer, .. }
            | WorkflowState::BookingFailed { offer, .. } => Some(offer),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            WorkflowState::SlotsLoading { .. }
                | WorkflowState::ConsultantsLoading(_)
                | WorkflowState::Booking { .. }
        )
    }

    /// Error displays. All of them are recoverable by re-interacting.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            WorkflowState::SlotsFailed { message, .. }
            | WorkflowState::ConsultantsFailed { message, .. }
            | WorkflowState::BookingFailed { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// The marker's popup was opened with this date preselected.
    Opened { date: NaiveDate },
    DateChanged(NaiveDate),
    SlotSelected(Slot),
    ConsultantSelected(ConsultantId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PendingRequest {
    Slots { date: NaiveDate },
    Consultants { date: NaiveDate, time: Slot },
    Book(BookingRequest),
}

/// A request a transition asked for, stamped with the generation that issued it.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub location_id: LocationId,
    pub generation: u64,
    pub request: PendingRequest,
}

impl Ticket {
    /// Runs the request. Booking is sent exactly once.
    pub async fn execute<A: BookingApi + ?Sized>(&self, api: &A) -> Outcome {
        match &self.request {
            PendingRequest::Slots { date } => {
                Outcome::Slots(api.slots(self.location_id, *date).await)
            }
            PendingRequest::Consultants { date, time } => {
                Outcome::Consultants(api.consultants(self.location_id, *date, time).await)
            }
            PendingRequest::Book(request) => Outcome::Booking(api.book(request).await),
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Slots(Result<Vec<Slot>, QueryError>),
    Consultants(Result<Vec<Consultant>, QueryError>),
    Booking(Result<AppointmentId, BookingError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The workflow moved on after the ticket was issued; the answer was dropped.
    Stale,
}

#[derive(Debug, Clone)]
pub struct Workflow {
    location: Location,
    generation: u64,
    state: WorkflowState,
}

impl Workflow {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            generation: 0,
            state: WorkflowState::Idle,
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn handle(
        &mut self,
        event: WorkflowEvent,
        session: &SessionContext,
    ) -> Result<Option<Ticket>, WorkflowError> {
        tracing::debug!(
            "marker {}: {:?} in state {}",
            self.location.id,
            event,
            self.state.name()
        );

        match event {
            WorkflowEvent::Opened { date } | WorkflowEvent::DateChanged(date) => {
                Ok(Some(self.load_slots(date)))
            }
            WorkflowEvent::SlotSelected(time) => self.select_slot(time, session),
            WorkflowEvent::ConsultantSelected(id) => self.select_consultant(id).map(Some),
        }
    }

    fn issue(&mut self, request: PendingRequest) -> Ticket {
        self.generation += 1;
        Ticket {
            location_id: self.location.id,
            generation: self.generation,
            request,
        }
    }

    /// Drops everything downstream of the date and asks for fresh slots.
    fn load_slots(&mut self, date: NaiveDate) -> Ticket {
        self.state = WorkflowState::SlotsLoading { date };
        self.issue(PendingRequest::Slots { date })
    }

    fn select_slot(
        &mut self,
        time: Slot,
        session: &SessionContext,
    ) -> Result<Option<Ticket>, WorkflowError> {
        match &self.state {
            WorkflowState::Booking { .. } => return Err(WorkflowError::BookingInFlight),
            WorkflowState::Booked { .. } => return Err(WorkflowError::AlreadyBooked),
            _ => {}
        }

        let day = self.state.day().cloned().ok_or(WorkflowError::NoSlotsLoaded)?;
        if !day.offers(&time) {
            return Err(WorkflowError::SlotNotOffered(time.to_string()));
        }

        let choice = SlotChoice { day, time };

        match session.permission() {
            Ok(()) => {
                let request = PendingRequest::Consultants {
                    date: choice.day.date,
                    time: choice.time.clone(),
                };
                self.state = WorkflowState::ConsultantsLoading(choice);
                Ok(Some(self.issue(request)))
            }
            Err(denied) => {
                // still invalidates any consultants request from an earlier pick
                self.generation += 1;
                self.state = denied_state(&denied, choice);
                Ok(None)
            }
        }
    }

    fn select_consultant(&mut self, consultant_id: ConsultantId) -> Result<Ticket, WorkflowError> {
        let offer = match &self.state {
            WorkflowState::ConsultantsReady(offer) | WorkflowState::BookingFailed { offer, .. } => {
                offer.clone()
            }
            WorkflowState::Booking { .. } => return Err(WorkflowError::BookingInFlight),
            WorkflowState::Booked { .. } => return Err(WorkflowError::AlreadyBooked),
            _ => return Err(WorkflowError::NoConsultantsLoaded),
        };

        if !offer.offers(consultant_id) {
            return Err(WorkflowError::ConsultantNotOffered(consultant_id));
        }

        let request = BookingRequest {
            location_id: self.location.id,
            consultant_id,
            date: offer.choice.day.date,
            time: offer.choice.time.clone(),
        };

        self.state = WorkflowState::Booking {
            offer,
            request: request.clone(),
        };
        Ok(self.issue(PendingRequest::Book(request)))
    }

    /// Feeds a response back. Answers to superseded tickets are dropped.
    pub fn apply(&mut self, ticket: &Ticket, outcome: Outcome) -> Completion {
        if ticket.location_id != self.location.id || ticket.generation != self.generation {
            tracing::debug!(
                "marker {}: dropping stale response (ticket generation {}, current {})",
                self.location.id,
                ticket.generation,
                self.generation
            );
            if let Outcome::Booking(Ok(appointment_id)) = &outcome {
                tracing::warn!(
                    "marker {}: appointment #{} confirmed after the popup moved on",
                    self.location.id,
                    appointment_id
                );
            }
            return Completion::Stale;
        }

        let state = std::mem::replace(&mut self.state, WorkflowState::Idle);
        self.state = match (state, outcome) {
            (WorkflowState::SlotsLoading { date }, Outcome::Slots(Ok(slots))) => {
                tracing::debug!("marker {}: {} slots on {}", self.location.id, slots.len(), date);
                WorkflowState::SlotsReady(DaySlots { date, slots })
            }
            (WorkflowState::SlotsLoading { date }, Outcome::Slots(Err(e))) => {
                WorkflowState::SlotsFailed {
                    date,
                    message: self.query_failure(&e),
                }
            }
            (WorkflowState::ConsultantsLoading(choice), Outcome::Consultants(Ok(consultants))) => {
                WorkflowState::ConsultantsReady(ConsultantOffer {
                    choice,
                    consultants,
                })
            }
            (WorkflowState::ConsultantsLoading(choice), Outcome::Consultants(Err(e))) => match e {
                QueryError::Permission(denied) => denied_state(&denied, choice),
                other => WorkflowState::ConsultantsFailed {
                    message: self.query_failure(&other),
                    choice,
                },
            },
            (WorkflowState::Booking { request, .. }, Outcome::Booking(Ok(appointment_id))) => {
                tracing::info!(
                    "marker {}: appointment #{} requested for {} {}",
                    self.location.id,
                    appointment_id,
                    request.date,
                    request.time
                );
                WorkflowState::Booked {
                    request,
                    appointment_id,
                }
            }
            (WorkflowState::Booking { offer, request }, Outcome::Booking(Err(e))) => {
                let message = match &e {
                    BookingError::Transport(t) => self.transport_failure(t),
                    _ => e.user_friendly_message(),
                };
                tracing::warn!("marker {}: booking failed: {}", self.location.id, e);
                WorkflowState::BookingFailed {
                    offer,
                    request,
                    message,
                }
            }
            (state, outcome) => {
                tracing::warn!(
                    "marker {}: {:?} does not match state {}",
                    self.location.id,
                    outcome,
                    state.name()
                );
                self.state = state;
                return Completion::Stale;
            }
        };

        Completion::Applied
    }

    fn query_failure(&self, err: &QueryError) -> String {
        match err {
            QueryError::Transport(t) => self.transport_failure(t),
            other => {
                tracing::debug!("marker {}: query rejected: {}", self.location.id, other);
                other.user_friendly_message()
            }
        }
    }

    fn transport_failure(&self, err: &TransportError) -> String {
        if err.is_expected() {
            tracing::warn!("marker {}: {}", self.location.id, err);
        } else {
            tracing::error!("marker {}: unexpected failure: {}", self.location.id, err);
        }
        err.user_friendly_message()
    }
}

fn denied_state(denied: &PermissionError, choice: SlotChoice) -> WorkflowState {
    match denied {
        PermissionError::Unauthenticated => WorkflowState::LoginRequired(choice),
        PermissionError::WrongRole { .. } => WorkflowState::RoleDenied(choice),
    }
}
