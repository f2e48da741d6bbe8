use crate::adapters::{CookieCsrfToken, JsonTransport};
use crate::config::BookingConfig;
use crate::core::map::{MapOverview, MapView};
use crate::domain::model::{
    AppointmentId, BookingRequest, BookingResult, Consultant, ConsultantsResponse, LocationId,
    MapData, Slot, SlotsResponse,
};
use crate::domain::ports::{BookingApi, ConfigProvider, CredentialProvider};
use crate::utils::error::{BookingError, PermissionError, QueryError, Result, TransportError};
use async_trait::async_trait;
use chrono::NaiveDate;

pub const CSRF_HEADER: &str = "X-CSRFToken";

const SLOTS_FALLBACK: &str = "Error loading times";
const CONSULTANTS_FALLBACK: &str = "Error loading consultants";
const BOOKING_FALLBACK: &str = "Booking failed";

/// Talks to the booking server's JSON endpoints.
pub struct BookingClient<C: ConfigProvider, K: CredentialProvider> {
    config: C,
    credentials: K,
    transport: JsonTransport,
}

impl BookingClient<BookingConfig, CookieCsrfToken> {
    /// Client whose anti-forgery token comes from the session cookies in the config.
    pub fn from_config(config: BookingConfig) -> Result<Self> {
        let transport = JsonTransport::new(config.base_url(), config.request_timeout_secs())?;
        if let Some(cookies) = &config.session.cookies {
            transport.seed_cookies(cookies);
        }

        let credentials = CookieCsrfToken::new(
            transport.cookie_jar(),
            transport.base_url().clone(),
            config.csrf_cookie(),
        );

        Ok(Self::new(config, credentials, transport))
    }
}

impl<C: ConfigProvider, K: CredentialProvider> BookingClient<C, K> {
    pub fn new(config: C, credentials: K, transport: JsonTransport) -> Self {
        Self {
            config,
            credentials,
            transport,
        }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    pub fn transport(&self) -> &JsonTransport {
        &self.transport
    }

    pub async fn load_map(&self, view: MapView) -> std::result::Result<MapOverview, QueryError> {
        let url = self.transport.resolve(self.config.map_data_url())?;
        let data: MapData = self.transport.get_as(url).await?;
        let overview = MapOverview::from_data(data, view);
        tracing::info!("Loaded {} map markers", overview.markers.len());
        Ok(overview)
    }
}

fn denied_by_status(status: u16, role: &str) -> Option<PermissionError> {
    match status {
        401 => Some(PermissionError::Unauthenticated),
        403 => Some(PermissionError::WrongRole {
            role: role.to_string(),
        }),
        _ => None,
    }
}

#[async_trait]
impl<C: ConfigProvider, K: CredentialProvider> BookingApi for BookingClient<C, K> {
    async fn slots(
        &self,
        location_id: LocationId,
        date: NaiveDate,
    ) -> std::result::Result<Vec<Slot>, QueryError> {
        let location = location_id.to_string();
        let day = date.to_string();
        let url = self.transport.resolve_with_query(
            self.config.timeslots_url(),
            &[("location_id", location.as_str()), ("date", day.as_str())],
        )?;

        let response: SlotsResponse = self.transport.get_as(url).await?;
        if !response.ok {
            return Err(QueryError::Rejected {
                message: response
                    .error
                    .unwrap_or_else(|| SLOTS_FALLBACK.to_string()),
            });
        }

        tracing::debug!("{} slots for location {} on {}", response.slots.len(), location_id, date);
        Ok(response.slots)
    }

    async fn consultants(
        &self,
        location_id: LocationId,
        date: NaiveDate,
        time: &Slot,
    ) -> std::result::Result<Vec<Consultant>, QueryError> {
        let session = self.config.session();
        session.permission()?;

        let location = location_id.to_string();
        let day = date.to_string();
        let url = self.transport.resolve_with_query(
            self.config.consultants_url(),
            &[
                ("location_id", location.as_str()),
                ("date", day.as_str()),
                ("time", time.as_str()),
            ],
        )?;

        let response = match self.transport.get_as::<ConsultantsResponse>(url).await {
            Ok(response) => response,
            Err(TransportError::ServerError { status }) => {
                return Err(match denied_by_status(status, session.user_role.as_str()) {
                    Some(denied) => QueryError::Permission(denied),
                    None => QueryError::Transport(TransportError::ServerError { status }),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if !response.ok {
            return Err(QueryError::Rejected {
                message: response
                    .error
                    .unwrap_or_else(|| CONSULTANTS_FALLBACK.to_string()),
            });
        }

        Ok(response.consultants)
    }

    async fn book(&self, request: &BookingRequest) -> std::result::Result<AppointmentId, BookingError> {
        self.config.session().permission()?;

        let token = self.credentials.anti_forgery_token().unwrap_or_else(|| {
            tracing::warn!("No anti-forgery token available; the server will likely reject the booking");
            String::new()
        });

        let url = self.transport.resolve(self.config.book_url())?;
        tracing::info!(
            "Submitting booking: location {} consultant {} on {} at {}",
            request.location_id,
            request.consultant_id,
            request.date,
            request.time
        );

        let (status, value) = self
            .transport
            .post_json(url, request, &[(CSRF_HEADER, token)])
            .await?;
        let result: BookingResult = serde_json::from_value(value).map_err(TransportError::from)?;

        match result {
            BookingResult {
                ok: true,
                appointment_id: Some(id),
                status: appointment_status,
                ..
            } => {
                tracing::info!(
                    "Booking accepted: appointment #{} ({})",
                    id,
                    appointment_status.as_deref().unwrap_or("PENDING")
                );
                Ok(id)
            }
            BookingResult { ok: true, .. } => {
                tracing::error!("Booking reported ok without an appointment id (HTTP {})", status);
                Err(BookingError::Rejected {
                    message: BOOKING_FALLBACK.to_string(),
                })
            }
            BookingResult { error, .. } => {
                tracing::warn!("Booking rejected (HTTP {}): {:?}", status, error);
                Err(BookingError::Rejected {
                    message: error.unwrap_or_else(|| BOOKING_FALLBACK.to_string()),
                })
            }
        }
    }
}
