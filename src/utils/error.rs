use thiserror::Error;

/// Longest body excerpt kept for diagnostics when a response is not JSON.
pub const SNIPPET_LEN: usize = 300;

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Error, Debug)]
pub enum BookingMapError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("HTTP client setup failed: {0}")]
    ClientError(#[from] reqwest::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

impl BookingMapError {
    pub fn user_friendly_message(&self) -> String {
        match self {
            BookingMapError::ConfigValidationError { field, message } => {
                format!("Configuration problem in {}: {}", field, message)
            }
            BookingMapError::MissingConfigError { field } => {
                format!("Configuration value '{}' is required", field)
            }
            BookingMapError::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration value '{}' is invalid: {}", field, reason)
            }
            BookingMapError::IoError(e) => format!("Could not read a file: {}", e),
            BookingMapError::Transport(e) => e.user_friendly_message(),
            BookingMapError::Query(e) => e.user_friendly_message(),
            BookingMapError::Booking(e) => e.user_friendly_message(),
            BookingMapError::Workflow(e) => e.to_string(),
            BookingMapError::SerializationError(_) | BookingMapError::ClientError(_) => {
                GENERIC_FAILURE.to_string()
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            BookingMapError::ConfigValidationError { .. }
            | BookingMapError::MissingConfigError { .. }
            | BookingMapError::InvalidConfigValueError { .. } => {
                "Check the TOML configuration file and any ${VAR} environment substitutions"
            }
            BookingMapError::IoError(_) => "Make sure the file exists and is readable",
            BookingMapError::Transport(_) | BookingMapError::ClientError(_) => {
                "Check that the booking server is reachable and returns JSON"
            }
            BookingMapError::Query(QueryError::Permission(PermissionError::Unauthenticated))
            | BookingMapError::Booking(BookingError::Permission(PermissionError::Unauthenticated)) => {
                "Log in and pass the session cookies in [session].cookies"
            }
            BookingMapError::Query(_)
            | BookingMapError::Booking(_)
            | BookingMapError::Workflow(_)
            | BookingMapError::SerializationError(_) => "Pick another date, time or consultant and retry",
        }
    }
}

pub type Result<T> = std::result::Result<T, BookingMapError>;

/// Failure of a single JSON request.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("server error ({status})")]
    ServerError { status: u16 },

    #[error("non-JSON response (content-type '{content_type}'): {snippet}")]
    InvalidContentType {
        content_type: String,
        snippet: String,
    },

    #[error("malformed JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid request URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl TransportError {
    /// Whether this failure is one the server reported, as opposed to a local fault.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            TransportError::ServerError { .. } | TransportError::InvalidContentType { .. }
        )
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            TransportError::ServerError { status } => format!("Server error ({}).", status),
            TransportError::InvalidContentType { .. } => {
                "Server returned non-JSON response.".to_string()
            }
            TransportError::Decode(_)
            | TransportError::Network(_)
            | TransportError::InvalidUrl { .. } => GENERIC_FAILURE.to_string(),
        }
    }
}

/// Local session check that runs before any consultant or booking request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("login required")]
    Unauthenticated,

    #[error("role '{role}' may not book appointments")]
    WrongRole { role: String },
}

impl PermissionError {
    pub fn user_friendly_message(&self) -> String {
        match self {
            PermissionError::Unauthenticated => "Please login to see consultants.".to_string(),
            PermissionError::WrongRole { .. } => {
                "Only customers can book appointments.".to_string()
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("{message}")]
    Rejected { message: String },

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl QueryError {
    pub fn user_friendly_message(&self) -> String {
        match self {
            QueryError::Rejected { message } => message.clone(),
            QueryError::Permission(e) => e.user_friendly_message(),
            QueryError::Transport(e) => e.user_friendly_message(),
        }
    }
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("{message}")]
    Rejected { message: String },

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl BookingError {
    pub fn user_friendly_message(&self) -> String {
        match self {
            BookingError::Rejected { message } => message.clone(),
            BookingError::Permission(e) => e.user_friendly_message(),
            BookingError::Transport(e) => e.user_friendly_message(),
        }
    }
}

/// An event the workflow cannot accept in its current state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("no marker registered for location {0}")]
    UnknownLocation(u64),

    #[error("no time slots are loaded for this marker")]
    NoSlotsLoaded,

    #[error("time {0} is not offered for the selected date")]
    SlotNotOffered(String),

    #[error("no consultants are loaded for this marker")]
    NoConsultantsLoaded,

    #[error("consultant {0} is not offered for the selected time")]
    ConsultantNotOffered(u64),

    #[error("a booking request is already in flight")]
    BookingInFlight,

    #[error("the appointment is already booked")]
    AlreadyBooked,
}
