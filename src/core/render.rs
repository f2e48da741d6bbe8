//! Popup markup for map markers, plus a plain-text rendering for terminals.
//!
//! Every string that came from the server goes through [`escape_html`].

use crate::core::map::{EMPTY_MAP_NOTICE, MAP_LOAD_FAILURE};
use crate::core::workflow::WorkflowState;
use crate::domain::model::{Location, SaleEvent, SessionContext};
use crate::utils::error::PermissionError;
use crate::utils::html::escape_html;

const MUTED: &str = "font-size:12px;color:#666";
const ERROR: &str = "color:#b00";
const SUCCESS: &str = "color:#0a7";

pub fn render_location_popup(location: &Location, state: &WorkflowState, login_url: &str) -> String {
    let id = location.id;
    let date = state.date().map(|d| d.to_string()).unwrap_or_default();

    format!(
        r#"<div style="min-width:260px">
  <div><b>{name}</b></div>
  <div class="text-muted" style="font-size:12px;margin-bottom:6px">Choose date → time → consultant</div>
  <label style="font-size:12px">Date</label>
  <input id="p_date_{id}" type="date" value="{date}" style="width:100%;padding:6px;margin-bottom:8px"/>
  <div id="p_slots_{id}" style="margin-bottom:8px">{slots}</div>
  <div id="p_cons_{id}" style="margin-bottom:8px">{consultants}</div>
  <div id="p_msg_{id}" style="{msg_style}">{message}</div>
</div>"#,
        name = escape_html(&location.name),
        slots = slots_section(state),
        consultants = consultants_section(state),
        msg_style = message_style(state),
        message = message_section(state, login_url),
    )
}

fn slots_section(state: &WorkflowState) -> String {
    match state {
        WorkflowState::Idle => String::new(),
        WorkflowState::SlotsLoading { .. } => "Loading times…".to_string(),
        WorkflowState::SlotsFailed { message, .. } => {
            format!(r#"<div style="{}">{}</div>"#, ERROR, escape_html(message))
        }
        WorkflowState::Booked { .. } => String::new(),
        other => match other.day() {
            Some(day) if day.slots.is_empty() => {
                r#"<div class="text-muted">No times available.</div>"#.to_string()
            }
            Some(day) => day
                .slots
                .iter()
                .map(|slot| {
                    let time = escape_html(slot.as_str());
                    format!(
                        r#"<button type="button" data-time="{time}" style="margin:2px 4px 2px 0;padding:4px 8px;border:1px solid #ccc;border-radius:8px;background:#fff;cursor:pointer">{time}</button>"#
                    )
                })
                .collect::<Vec<_>>()
                .join(""),
            None => String::new(),
        },
    }
}

fn consultants_section(state: &WorkflowState) -> String {
    match state {
        WorkflowState::ConsultantsFailed { message, .. } => {
            format!(r#"<div style="{}">{}</div>"#, ERROR, escape_html(message))
        }
        WorkflowState::ConsultantsReady(offer)
        | WorkflowState::Booking { offer, .. }
        | WorkflowState::BookingFailed { offer, .. } => {
            let time = escape_html(offer.choice.time.as_str());
            if offer.consultants.is_empty() {
                return format!(
                    r#"<div class="text-muted">No consultants available for {}.</div>"#,
                    time
                );
            }

            let buttons = offer
                .consultants
                .iter()
                .map(|c| {
                    format!(
                        r#"<button data-cid="{}" style="margin:2px 4px 2px 0;padding:4px 8px;border:1px solid #0a7;border-radius:8px;background:#eafff7;cursor:pointer">{}</button>"#,
                        c.id,
                        escape_html(&c.name)
                    )
                })
                .collect::<Vec<_>>()
                .join("");

            format!(
                r#"<div style="font-size:12px;margin:6px 0 4px">Available consultants for <b>{}</b>:</div>{}"#,
                time, buttons
            )
        }
        _ => String::new(),
    }
}

fn message_style(state: &WorkflowState) -> String {
    match state {
        WorkflowState::BookingFailed { .. } => format!("font-size:12px;{}", ERROR),
        WorkflowState::Booked { .. } => format!("font-size:12px;{}", SUCCESS),
        _ => MUTED.to_string(),
    }
}

fn message_section(state: &WorkflowState, login_url: &str) -> String {
    match state {
        WorkflowState::ConsultantsLoading(choice) => format!(
            "Loading consultants for {}...",
            escape_html(choice.time.as_str())
        ),
        WorkflowState::LoginRequired(_) => format!(
            r#"Please <a href="{}">login</a> to see consultants."#,
            escape_html(login_url)
        ),
        WorkflowState::RoleDenied(_) => PermissionError::WrongRole {
            role: String::new(),
        }
        .user_friendly_message(),
        WorkflowState::Booking { .. } => "Booking…".to_string(),
        WorkflowState::BookingFailed { message, .. } => escape_html(message),
        WorkflowState::Booked { appointment_id, .. } => {
            format!("✅ Requested! (Appointment #{})", appointment_id)
        }
        _ => String::new(),
    }
}

/// Popup for a garage sale pin. Only customers get the items link.
pub fn render_sale_event_popup(event: &SaleEvent, session: &SessionContext) -> String {
    let action = if session.permission().is_ok() {
        format!(
            r#"<a class="btn btn-sm btn-black" href="{}">View items</a>"#,
            escape_html(event.items_url.as_deref().unwrap_or("#"))
        )
    } else {
        r#"<span class="muted">Login as a Customer to view items.</span>"#.to_string()
    };

    format!(
        r#"<div style="min-width:240px">
  <strong>{}</strong><br/>
  <div class="muted">{}</div>
  <div style="margin-top:10px">{}</div>
</div>"#,
        escape_html(&event.title),
        escape_html(&event.location_name),
        action
    )
}

/// Shown at the map center when the garage sale payload lists no events.
pub fn render_empty_map_popup(events_list_url: &str, create_event_url: &str) -> String {
    format!(
        r#"<b>{}</b><br/>
<span class="muted">
  Try <a href="{}">View Events</a> or
  <a href="{}">Create Event</a>.
</span>"#,
        EMPTY_MAP_NOTICE,
        escape_html(events_list_url),
        escape_html(create_event_url)
    )
}

pub fn render_map_failure_popup(message: &str) -> String {
    let message = if message.is_empty() { "Unknown error" } else { message };
    format!(
        r#"<b>{}</b><br/>
<span class="muted">{}</span>"#,
        MAP_LOAD_FAILURE,
        escape_html(message)
    )
}

/// One-screen summary of a workflow for terminal front ends.
pub fn render_text(location: &Location, state: &WorkflowState, login_url: &str) -> String {
    let mut lines = vec![format!("{} (#{})", location.name, location.id)];
    if let Some(date) = state.date() {
        lines.push(format!("Date: {}", date));
    }

    match state {
        WorkflowState::Idle => lines.push("Not opened yet.".to_string()),
        WorkflowState::SlotsLoading { .. } => lines.push("Loading times…".to_string()),
        WorkflowState::SlotsFailed { message, .. } => lines.push(format!("Error: {}", message)),
        WorkflowState::Booked {
            request,
            appointment_id,
        } => lines.push(format!(
            "Requested! (Appointment #{}) at {} with consultant {}",
            appointment_id, request.time, request.consultant_id
        )),
        other => {
            if let Some(day) = other.day() {
                if day.slots.is_empty() {
                    lines.push("No times available.".to_string());
                } else {
                    let times: Vec<&str> = day.slots.iter().map(|s| s.as_str()).collect();
                    lines.push(format!("Times: {}", times.join(", ")));
                }
            }
            if let Some(time) = other.selected_time() {
                lines.push(format!("Selected time: {}", time));
            }
            match other {
                WorkflowState::LoginRequired(_) => {
                    lines.push(format!("Please login to see consultants: {}", login_url))
                }
                WorkflowState::RoleDenied(_) => {
                    lines.push("Only customers can book appointments.".to_string())
                }
                WorkflowState::ConsultantsLoading(_) => {
                    lines.push("Loading consultants...".to_string())
                }
                WorkflowState::ConsultantsFailed { message, .. } => {
                    lines.push(format!("Error: {}", message))
                }
                _ => {}
            }
            if let Some(offer) = other.offer() {
                if offer.consultants.is_empty() {
                    lines.push(format!("No consultants available for {}.", offer.choice.time));
                }
                for c in &offer.consultants {
                    lines.push(format!("  [{}] {}", c.id, c.name));
                }
            }
            match other {
                WorkflowState::Booking { .. } => lines.push("Booking…".to_string()),
                WorkflowState::BookingFailed { message, .. } => {
                    lines.push(format!("Booking failed: {}", message))
                }
                _ => {}
            }
        }
    }

    lines.join("\n")
}
