use crate::domain::model::SessionContext;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{BookingMapError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

pub const DEFAULT_CENTER: (f64, f64) = (-37.8136, 144.9631);
pub const DEFAULT_ZOOM: u8 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CSRF_COOKIE: &str = "csrftoken";

/// Everything the host page used to hand the map script, as one explicit value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub endpoints: EndpointConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub map_data: String,
    pub timeslots: String,
    pub consultants: String,
    pub book: String,
    pub login: String,
    pub events_list: String,
    pub create_event: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            map_data: "/physio/map-data/".to_string(),
            timeslots: "/physio/api/timeslots/".to_string(),
            consultants: "/physio/api/available-consultants/".to_string(),
            book: "/physio/api/book/".to_string(),
            login: "/login/".to_string(),
            events_list: "/garage-sale/events/".to_string(),
            create_event: "/garage-sale/events/create/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    pub center: Option<[f64; 2]>,
    pub zoom: Option<u8>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: Some([DEFAULT_CENTER.0, DEFAULT_CENTER.1]),
            zoom: Some(DEFAULT_ZOOM),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(flatten)]
    pub context: SessionContext,
    /// `Cookie` header value copied from a logged-in browser session.
    pub cookies: Option<String>,
    pub csrf_cookie: Option<String>,
}

impl BookingConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            server: ServerConfig {
                base_url: base_url.into(),
                timeout_seconds: None,
            },
            endpoints: EndpointConfig::default(),
            map: MapConfig::default(),
            session: SessionConfig::default(),
        }
    }

    pub fn with_session(mut self, context: SessionContext) -> Self {
        self.session.context = context;
        self
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BookingMapError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| BookingMapError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay verbatim.
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn map_center(&self) -> (f64, f64) {
        self.map
            .center
            .map(|[lat, lng]| (lat, lng))
            .unwrap_or(DEFAULT_CENTER)
    }

    pub fn map_zoom(&self) -> u8 {
        self.map.zoom.unwrap_or(DEFAULT_ZOOM)
    }

    pub fn csrf_cookie(&self) -> &str {
        self.session
            .csrf_cookie
            .as_deref()
            .unwrap_or(DEFAULT_CSRF_COOKIE)
    }
}

impl ConfigProvider for BookingConfig {
    fn base_url(&self) -> &str {
        &self.server.base_url
    }

    fn map_data_url(&self) -> &str {
        &self.endpoints.map_data
    }

    fn timeslots_url(&self) -> &str {
        &self.endpoints.timeslots
    }

    fn consultants_url(&self) -> &str {
        &self.endpoints.consultants
    }

    fn book_url(&self) -> &str {
        &self.endpoints.book
    }

    fn login_url(&self) -> &str {
        &self.endpoints.login
    }

    fn session(&self) -> &SessionContext {
        &self.session.context
    }

    fn request_timeout_secs(&self) -> u64 {
        self.server.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}

impl Validate for BookingConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("server.base_url", &self.server.base_url)?;

        validation::validate_endpoint("endpoints.map_data", &self.endpoints.map_data)?;
        validation::validate_endpoint("endpoints.timeslots", &self.endpoints.timeslots)?;
        validation::validate_endpoint("endpoints.consultants", &self.endpoints.consultants)?;
        validation::validate_endpoint("endpoints.book", &self.endpoints.book)?;
        validation::validate_non_empty_string("endpoints.login", &self.endpoints.login)?;
        validation::validate_endpoint("endpoints.events_list", &self.endpoints.events_list)?;
        validation::validate_endpoint("endpoints.create_event", &self.endpoints.create_event)?;

        if let Some(timeout) = self.server.timeout_seconds {
            validation::validate_range("server.timeout_seconds", timeout, 1, 600)?;
        }

        let (lat, lng) = self.map_center();
        validation::validate_range("map.center[0]", lat, -90.0, 90.0)?;
        validation::validate_range("map.center[1]", lng, -180.0, 180.0)?;
        validation::validate_range("map.zoom", self.map_zoom(), 0, 19)?;

        validation::validate_non_empty_string("session.csrf_cookie", self.csrf_cookie())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::UserRole;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[server]
base_url = "https://bookings.example.com"
timeout_seconds = 10

[endpoints]
map_data = "/physio/map-data/"
timeslots = "/physio/api/timeslots/"
consultants = "/physio/api/available-consultants/"
book = "/physio/api/book/"
login = "/accounts/login/"

[map]
center = [-33.8688, 151.2093]
zoom = 12

[session]
is_logged_in = true
user_role = "CUSTOMER"
cookies = "csrftoken=abc; sessionid=xyz"
"#;

        let config = BookingConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.base_url(), "https://bookings.example.com");
        assert_eq!(config.request_timeout_secs(), 10);
        assert_eq!(config.login_url(), "/accounts/login/");
        assert_eq!(config.map_center(), (-33.8688, 151.2093));
        assert_eq!(config.map_zoom(), 12);
        assert!(config.session().is_logged_in);
        assert_eq!(config.session().user_role, UserRole::Customer);
        assert_eq!(config.csrf_cookie(), "csrftoken");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = BookingConfig::from_toml_str(
            r#"
[server]
base_url = "http://localhost:8000"
"#,
        )
        .unwrap();

        assert_eq!(config.map_center(), DEFAULT_CENTER);
        assert_eq!(config.map_zoom(), DEFAULT_ZOOM);
        assert_eq!(config.timeslots_url(), "/physio/api/timeslots/");
        assert_eq!(config.request_timeout_secs(), DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.endpoints.events_list, "/garage-sale/events/");
        assert_eq!(config.endpoints.create_event, "/garage-sale/events/create/");
        assert!(!config.session().is_logged_in);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("MAP_BOOKING_TEST_BASE_URL", "https://test.bookings.com");

        let config = BookingConfig::from_toml_str(
            r#"
[server]
base_url = "${MAP_BOOKING_TEST_BASE_URL}"
"#,
        )
        .unwrap();
        assert_eq!(config.server.base_url, "https://test.bookings.com");

        std::env::remove_var("MAP_BOOKING_TEST_BASE_URL");
    }

    #[test]
    fn test_config_validation() {
        let config = BookingConfig::from_toml_str(
            r#"
[server]
base_url = "invalid-url"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let mut config = BookingConfig::new("http://localhost:8000");
        config.map.zoom = Some(25);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_endpoints_keep_defaults() {
        let config = BookingConfig::from_toml_str(
            r#"
[server]
base_url = "http://localhost:8000"

[endpoints]
login = "/accounts/login/"
create_event = "/sales/new/"
"#,
        )
        .unwrap();

        assert_eq!(config.login_url(), "/accounts/login/");
        assert_eq!(config.book_url(), "/physio/api/book/");
        assert_eq!(config.endpoints.events_list, "/garage-sale/events/");
        assert_eq!(config.endpoints.create_event, "/sales/new/");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[server]\nbase_url = \"http://localhost:8000\"\n")
            .unwrap();

        let config = BookingConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.base_url(), "http://localhost:8000");
    }
}
