use anyhow::Result;
use chrono::NaiveDate;
use httpmock::prelude::*;
use map_booking::core::map::MapView;
use map_booking::domain::model::Slot;
use map_booking::utils::validation::Validate;
use map_booking::{BookingClient, BookingConfig, BookingCoordinator, WorkflowEvent, WorkflowState};
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;

fn may_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

fn write_config(base_url: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
[server]
base_url = "{}"
timeout_seconds = 5

[session]
is_logged_in = true
user_role = "CUSTOMER"
cookies = "sessionid=s1; csrftoken=tok123"
"#,
        base_url
    )?;
    Ok(file)
}

fn mock_map(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/physio/map-data/");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({
                "ok": true,
                "events": [],
                "locations": [{"id": 42, "name": "Carlton Physio", "lat": -37.80, "lng": 144.96}]
            }));
    });
}

fn mock_slots(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET)
            .path("/physio/api/timeslots/")
            .query_param("location_id", "42");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({"ok": true, "slots": ["09:00", "10:00"]}));
    });
}

fn mock_consultants(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/physio/api/available-consultants/");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({"ok": true, "consultants": [{"id": 7, "name": "alex"}]}));
    });
}

async fn coordinator_from_file(
    server: &MockServer,
) -> Result<BookingCoordinator<BookingClient<BookingConfig, map_booking::adapters::CookieCsrfToken>>> {
    let file = write_config(&server.base_url())?;
    let config = BookingConfig::from_file(file.path())?;
    config.validate()?;

    let session = config.session.context.clone();
    let login_url = config.endpoints.login.clone();
    let client = BookingClient::from_config(config)?;
    let overview = client.load_map(MapView::default()).await?;

    let mut coordinator = BookingCoordinator::new(client, session, login_url);
    coordinator.register_overview(&overview);
    Ok(coordinator)
}

#[tokio::test]
async fn test_booking_from_config_file() -> Result<()> {
    let server = MockServer::start();
    mock_map(&server);
    mock_slots(&server);
    mock_consultants(&server);
    let book_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/physio/api/book/")
            .header("X-CSRFToken", "tok123")
            .json_body(json!({
                "location_id": 42,
                "consultant_id": 7,
                "date": "2024-05-01",
                "time": "10:00"
            }));
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({"ok": true, "appointment_id": 555, "status": "PENDING"}));
    });

    let mut coordinator = coordinator_from_file(&server).await?;

    coordinator
        .dispatch(42, WorkflowEvent::Opened { date: may_first() })
        .await?;
    coordinator
        .dispatch(42, WorkflowEvent::SlotSelected(Slot::new("10:00")))
        .await?;
    let state = coordinator
        .dispatch(42, WorkflowEvent::ConsultantSelected(7))
        .await?;

    assert!(matches!(
        state,
        WorkflowState::Booked {
            appointment_id: 555,
            ..
        }
    ));
    book_mock.assert();

    let popup = coordinator.render_popup(42).unwrap();
    assert!(popup.contains("✅ Requested! (Appointment #555)"));
    Ok(())
}

#[tokio::test]
async fn test_slot_full_then_retry() -> Result<()> {
    let server = MockServer::start();
    mock_map(&server);
    mock_slots(&server);
    mock_consultants(&server);
    let mut book_mock = server.mock(|when, then| {
        when.method(POST).path("/physio/api/book/");
        then.status(409)
            .header("Content-Type", "application/json")
            .json_body(json!({"ok": false, "error": "Slot full"}));
    });

    let mut coordinator = coordinator_from_file(&server).await?;
    coordinator
        .dispatch(42, WorkflowEvent::Opened { date: may_first() })
        .await?;
    coordinator
        .dispatch(42, WorkflowEvent::SlotSelected(Slot::new("09:00")))
        .await?;
    let state = coordinator
        .dispatch(42, WorkflowEvent::ConsultantSelected(7))
        .await?;

    assert_eq!(state.error_message(), Some("Slot full"));
    assert!(coordinator.render_popup(42).unwrap().contains(r#"data-cid="7""#));
    book_mock.assert_hits(1);
    book_mock.delete();

    server.mock(|when, then| {
        when.method(POST).path("/physio/api/book/");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({"ok": true, "appointment_id": 556}));
    });

    let state = coordinator
        .dispatch(42, WorkflowEvent::ConsultantSelected(7))
        .await?;
    assert!(matches!(
        state,
        WorkflowState::Booked {
            appointment_id: 556,
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn test_server_error_shows_status() -> Result<()> {
    let server = MockServer::start();
    mock_map(&server);
    server.mock(|when, then| {
        when.method(GET).path("/physio/api/timeslots/");
        then.status(502)
            .header("Content-Type", "text/html")
            .body("<html>Bad Gateway</html>");
    });

    let mut coordinator = coordinator_from_file(&server).await?;
    let state = coordinator
        .dispatch(42, WorkflowEvent::Opened { date: may_first() })
        .await?;

    assert_eq!(state.error_message(), Some("Server error (502)."));
    Ok(())
}

#[tokio::test]
async fn test_empty_day_has_no_slot_buttons() -> Result<()> {
    let server = MockServer::start();
    mock_map(&server);
    server.mock(|when, then| {
        when.method(GET).path("/physio/api/timeslots/");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({"ok": true, "slots": []}));
    });

    let mut coordinator = coordinator_from_file(&server).await?;
    coordinator
        .dispatch(42, WorkflowEvent::Opened { date: may_first() })
        .await?;

    let popup = coordinator.render_popup(42).unwrap();
    assert!(popup.contains("No times available."));
    assert!(!popup.contains("data-time="));
    Ok(())
}
