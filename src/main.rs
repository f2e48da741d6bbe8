use clap::Parser;
use map_booking::core::map::MapView;
use map_booking::core::render;
use map_booking::domain::model::MapMarker;
use map_booking::domain::ports::ConfigProvider;
use map_booking::utils::{logger, validation::Validate};
use map_booking::{
    BookingClient, BookingConfig, BookingCoordinator, CliConfig, WorkflowEvent, WorkflowState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting map-booking CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let view = MapView {
        center: config.map_center(),
        zoom: config.map_zoom(),
    };
    let session = config.session().clone();
    let login_url = config.login_url().to_string();
    let event_links = (
        config.endpoints.events_list.clone(),
        config.endpoints.create_event.clone(),
    );
    let client = BookingClient::from_config(config)?;

    let overview = match client.load_map(view).await {
        Ok(overview) => overview,
        Err(e) => {
            tracing::error!("❌ Loading map data failed: {}", e);
            eprintln!("{}", render::render_map_failure_popup(&e.user_friendly_message()));
            std::process::exit(2);
        }
    };

    let Some(plan) = cli.command.into_plan() else {
        print_markers(&overview, &session, &event_links);
        return Ok(());
    };

    let mut coordinator = BookingCoordinator::new(client, session, login_url);
    coordinator.register_overview(&overview);

    let location = plan.location;
    let date = plan
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let mut events = vec![WorkflowEvent::Opened { date }];
    events.extend(plan.steps);

    for event in events {
        match coordinator.dispatch(location, event).await {
            Ok(state) if is_error_display(state) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::error!("❌ {}", e);
                eprintln!("❌ {}", e);
                if let Some(text) = coordinator.render_text(location) {
                    println!("{}", text);
                }
                std::process::exit(2);
            }
        }
    }

    if let Some(text) = coordinator.render_text(location) {
        println!("{}", text);
    }

    if coordinator.state(location).is_some_and(is_error_display) {
        std::process::exit(2);
    }

    Ok(())
}

fn load_config(cli: &CliConfig) -> map_booking::Result<BookingConfig> {
    let mut config = BookingConfig::from_file(&cli.config)?;
    if let Some(base_url) = &cli.base_url {
        config.server.base_url = base_url.clone();
    }
    config.validate()?;
    Ok(config)
}

fn is_error_display(state: &WorkflowState) -> bool {
    state.error_message().is_some()
        || matches!(
            state,
            WorkflowState::LoginRequired(_) | WorkflowState::RoleDenied(_)
        )
}

fn print_markers(
    overview: &map_booking::MapOverview,
    session: &map_booking::domain::model::SessionContext,
    (events_list, create_event): &(String, String),
) {
    if overview.empty_notice().is_some() {
        println!("{}", render::render_empty_map_popup(events_list, create_event));
        return;
    }
    if overview.is_empty() {
        println!("No markers to show.");
        return;
    }

    for marker in &overview.markers {
        match marker {
            MapMarker::Location(l) => {
                println!("[{}] {} ({:.4}, {:.4})", l.id, l.name, l.lat, l.lng)
            }
            MapMarker::SaleEvent(e) => {
                println!("{}", render::render_sale_event_popup(e, session))
            }
        }
    }

    if overview.skipped > 0 {
        println!("({} items without coordinates skipped)", overview.skipped);
    }
}
