use crate::domain::model::{
    AppointmentId, BookingRequest, Consultant, LocationId, SessionContext, Slot,
};
use crate::utils::error::{BookingError, QueryError};
use async_trait::async_trait;
use chrono::NaiveDate;

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn map_data_url(&self) -> &str;
    fn timeslots_url(&self) -> &str;
    fn consultants_url(&self) -> &str;
    fn book_url(&self) -> &str;
    fn login_url(&self) -> &str;
    fn session(&self) -> &SessionContext;
    fn request_timeout_secs(&self) -> u64;
}

/// Source of the anti-forgery token attached to state-changing requests.
///
/// Read on every call; implementations must not memoize across calls.
pub trait CredentialProvider: Send + Sync {
    fn anti_forgery_token(&self) -> Option<String>;
}

#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn slots(&self, location_id: LocationId, date: NaiveDate) -> Result<Vec<Slot>, QueryError>;

    async fn consultants(
        &self,
        location_id: LocationId,
        date: NaiveDate,
        time: &Slot,
    ) -> Result<Vec<Consultant>, QueryError>;

    /// Submits once. Callers must never retry this on their own.
    async fn book(&self, request: &BookingRequest) -> Result<AppointmentId, BookingError>;
}
