use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::error::PermissionError;

pub type LocationId = u64;
pub type ConsultantId = u64;
pub type AppointmentId = u64;

/// A bookable place plotted on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

/// A garage sale pin. No booking workflow, only a popup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleEvent {
    pub id: Option<u64>,
    pub title: String,
    pub location_name: String,
    pub lat: f64,
    pub lng: f64,
    pub items_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapMarker {
    Location(Location),
    SaleEvent(SaleEvent),
}

impl MapMarker {
    pub fn coordinates(&self) -> (f64, f64) {
        match self {
            MapMarker::Location(l) => (l.lat, l.lng),
            MapMarker::SaleEvent(e) => (e.lat, e.lng),
        }
    }
}

/// Time string as the server formats it, e.g. "09:00".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(pub String);

impl Slot {
    pub fn new(time: impl Into<String>) -> Self {
        Self(time.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Slot {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultant {
    pub id: ConsultantId,
    pub name: String,
}

/// Body of the booking POST. Built right before submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub location_id: LocationId,
    pub consultant_id: ConsultantId,
    pub date: NaiveDate,
    pub time: Slot,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotsResponse {
    pub ok: bool,
    #[serde(default)]
    pub slots: Vec<Slot>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsultantsResponse {
    pub ok: bool,
    #[serde(default)]
    pub consultants: Vec<Consultant>,
    pub error: Option<String>,
}

/// Server answer to a booking submission.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingResult {
    pub ok: bool,
    pub appointment_id: Option<AppointmentId>,
    pub status: Option<String>,
    pub error: Option<String>,
}

/// Raw map payload. Items stay loosely typed so one bad pin does not drop the rest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapData {
    pub events: Option<Vec<serde_json::Value>>,
    pub locations: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserRole {
    Customer,
    Consultant,
    LocationOwner,
    Other(String),
}

impl From<String> for UserRole {
    fn from(value: String) -> Self {
        match value.as_str() {
            "CUSTOMER" => UserRole::Customer,
            "CONSULTANT" => UserRole::Consultant,
            "LOCATION_OWNER" => UserRole::LocationOwner,
            _ => UserRole::Other(value),
        }
    }
}

impl From<UserRole> for String {
    fn from(value: UserRole) -> Self {
        value.as_str().to_string()
    }
}

impl UserRole {
    pub fn as_str(&self) -> &str {
        match self {
            UserRole::Customer => "CUSTOMER",
            UserRole::Consultant => "CONSULTANT",
            UserRole::LocationOwner => "LOCATION_OWNER",
            UserRole::Other(role) => role,
        }
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Other(String::new())
    }
}

/// Who is looking at the map. Supplied once by the host and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(default)]
    pub is_logged_in: bool,
    #[serde(default)]
    pub user_role: UserRole,
}

impl SessionContext {
    pub fn customer() -> Self {
        Self {
            is_logged_in: true,
            user_role: UserRole::Customer,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Whether this session may list consultants and book.
    pub fn permission(&self) -> Result<(), PermissionError> {
        if !self.is_logged_in {
            return Err(PermissionError::Unauthenticated);
        }
        if self.user_role != UserRole::Customer {
            return Err(PermissionError::WrongRole {
                role: self.user_role.as_str().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_request_wire_shape() {
        let request = BookingRequest {
            location_id: 42,
            consultant_id: 7,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            time: Slot::new("09:00"),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "location_id": 42,
                "consultant_id": 7,
                "date": "2024-05-01",
                "time": "09:00"
            })
        );
    }

    #[test]
    fn test_slots_response_defaults_to_empty() {
        let response: SlotsResponse = serde_json::from_str(r#"{"ok": true}"#).unwrap();
        assert!(response.ok);
        assert!(response.slots.is_empty());
    }

    #[test]
    fn test_session_permission() {
        assert_eq!(SessionContext::customer().permission(), Ok(()));
        assert_eq!(
            SessionContext::anonymous().permission(),
            Err(PermissionError::Unauthenticated)
        );

        let consultant = SessionContext {
            is_logged_in: true,
            user_role: UserRole::from("CONSULTANT".to_string()),
        };
        assert_eq!(
            consultant.permission(),
            Err(PermissionError::WrongRole {
                role: "CONSULTANT".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_role_round_trips() {
        let role: UserRole = serde_json::from_str(r#""AUDITOR""#).unwrap();
        assert_eq!(role, UserRole::Other("AUDITOR".to_string()));
        assert_eq!(serde_json::to_string(&role).unwrap(), r#""AUDITOR""#);
    }
}
