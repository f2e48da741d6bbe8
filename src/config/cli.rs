use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::core::workflow::WorkflowEvent;
use crate::domain::model::{ConsultantId, LocationId, Slot};

#[derive(Debug, Clone, Parser)]
#[command(name = "map-booking")]
#[command(about = "Browse map markers and book appointments against a booking server")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "map-booking.toml")]
    pub config: String,

    /// Override server.base_url from the config file
    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the markers the map would plot
    Markers,

    /// Show the bookable times of a location
    Slots {
        #[arg(long)]
        location: LocationId,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show the consultants free at a time
    Consultants {
        #[arg(long)]
        location: LocationId,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        time: String,
    },

    /// Walk the whole workflow and request an appointment
    Book {
        #[arg(long)]
        location: LocationId,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        time: String,
        #[arg(long)]
        consultant: ConsultantId,
    },
}

/// The marker and the events a booking command walks it through after opening.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowPlan {
    pub location: LocationId,
    /// Opening date; `None` means today.
    pub date: Option<NaiveDate>,
    pub steps: Vec<WorkflowEvent>,
}

impl Command {
    /// `None` for commands that never open a popup.
    pub fn into_plan(self) -> Option<WorkflowPlan> {
        let (location, date, steps) = match self {
            Command::Markers => return None,
            Command::Slots { location, date } => (location, date, vec![]),
            Command::Consultants {
                location,
                date,
                time,
            } => (
                location,
                date,
                vec![WorkflowEvent::SlotSelected(Slot::new(time))],
            ),
            Command::Book {
                location,
                date,
                time,
                consultant,
            } => (
                location,
                date,
                vec![
                    WorkflowEvent::SlotSelected(Slot::new(time)),
                    WorkflowEvent::ConsultantSelected(consultant),
                ],
            ),
        };

        Some(WorkflowPlan {
            location,
            date,
            steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_book_command() {
        let cli = CliConfig::try_parse_from([
            "map-booking",
            "--config",
            "local.toml",
            "book",
            "--location",
            "42",
            "--date",
            "2024-05-01",
            "--time",
            "09:00",
            "--consultant",
            "7",
        ])
        .unwrap();

        assert_eq!(cli.config, "local.toml");
        match cli.command {
            Command::Book {
                location,
                date,
                time,
                consultant,
            } => {
                assert_eq!(location, 42);
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 1));
                assert_eq!(time, "09:00");
                assert_eq!(consultant, 7);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_malformed_date() {
        let result = CliConfig::try_parse_from([
            "map-booking",
            "slots",
            "--location",
            "42",
            "--date",
            "01/05/2024",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_markers_has_no_plan() {
        let cli = CliConfig::try_parse_from(["map-booking", "markers"]).unwrap();
        assert_eq!(cli.command.into_plan(), None);
    }

    #[test]
    fn test_book_plan_selects_time_then_consultant() {
        let cli = CliConfig::try_parse_from([
            "map-booking",
            "book",
            "--location",
            "42",
            "--time",
            "09:00",
            "--consultant",
            "7",
        ])
        .unwrap();

        assert_eq!(
            cli.command.into_plan(),
            Some(WorkflowPlan {
                location: 42,
                date: None,
                steps: vec![
                    WorkflowEvent::SlotSelected(Slot::new("09:00")),
                    WorkflowEvent::ConsultantSelected(7),
                ],
            })
        );
    }

    #[test]
    fn test_slots_plan_only_opens() {
        let cli = CliConfig::try_parse_from([
            "map-booking",
            "slots",
            "--location",
            "42",
            "--date",
            "2024-05-01",
        ])
        .unwrap();

        let plan = cli.command.into_plan().unwrap();
        assert_eq!(plan.location, 42);
        assert_eq!(plan.date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert!(plan.steps.is_empty());
    }
}
