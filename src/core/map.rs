use serde::Deserialize;

use crate::domain::model::{Location, MapData, MapMarker, SaleEvent};

pub const EMPTY_MAP_NOTICE: &str = "No active garage sales today.";
pub const MAP_LOAD_FAILURE: &str = "Couldn't load garage sale pins.";
const DEFAULT_EVENT_TITLE: &str = "Garage Sale";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: (f64, f64),
    pub zoom: u8,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: crate::config::toml_config::DEFAULT_CENTER,
            zoom: crate::config::toml_config::DEFAULT_ZOOM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    fn around(lat: f64, lng: f64) -> Self {
        Self {
            south: lat,
            west: lng,
            north: lat,
            east: lng,
        }
    }

    fn extend(&mut self, lat: f64, lng: f64) {
        self.south = self.south.min(lat);
        self.north = self.north.max(lat);
        self.west = self.west.min(lng);
        self.east = self.east.max(lng);
    }
}

/// Shape shared by `locations` and `events` items. Anything missing is tolerated here
/// and decided on per marker kind.
#[derive(Debug, Deserialize)]
struct RawPin {
    id: Option<u64>,
    name: Option<String>,
    title: Option<String>,
    location_name: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    items_url: Option<String>,
}

impl RawPin {
    fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng)),
            _ => None,
        }
    }
}

/// What the map should plot after loading its data endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOverview {
    pub view: MapView,
    pub markers: Vec<MapMarker>,
    /// Box around every plotted marker; the map fits to it when present.
    pub bounds: Option<Bounds>,
    pub skipped: usize,
    /// Length of the `events` list as served; `None` for payloads without one.
    pub listed_events: Option<usize>,
}

impl MapOverview {
    pub fn from_data(data: MapData, view: MapView) -> Self {
        let mut markers = Vec::new();
        let mut skipped = 0;
        let listed_events = data.events.as_ref().map(Vec::len);

        for item in data.locations.unwrap_or_default() {
            match parse_pin(item).and_then(location_from) {
                Some(location) => markers.push(MapMarker::Location(location)),
                None => skipped += 1,
            }
        }

        for item in data.events.unwrap_or_default() {
            match parse_pin(item).and_then(sale_event_from) {
                Some(event) => markers.push(MapMarker::SaleEvent(event)),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} map items without usable coordinates", skipped);
        }

        let mut bounds: Option<Bounds> = None;
        for marker in &markers {
            let (lat, lng) = marker.coordinates();
            match bounds.as_mut() {
                Some(b) => b.extend(lat, lng),
                None => bounds = Some(Bounds::around(lat, lng)),
            }
        }

        Self {
            view,
            markers,
            bounds,
            skipped,
            listed_events,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Only garage sale payloads have an empty state; a bare location map just shows no pins.
    pub fn empty_notice(&self) -> Option<&'static str> {
        (self.listed_events == Some(0)).then_some(EMPTY_MAP_NOTICE)
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.markers.iter().filter_map(|m| match m {
            MapMarker::Location(l) => Some(l),
            MapMarker::SaleEvent(_) => None,
        })
    }

    pub fn sale_events(&self) -> impl Iterator<Item = &SaleEvent> {
        self.markers.iter().filter_map(|m| match m {
            MapMarker::SaleEvent(e) => Some(e),
            MapMarker::Location(_) => None,
        })
    }
}

fn parse_pin(item: serde_json::Value) -> Option<RawPin> {
    serde_json::from_value(item)
        .map_err(|e| tracing::debug!("Unreadable map item: {}", e))
        .ok()
}

fn location_from(pin: RawPin) -> Option<Location> {
    let (lat, lng) = pin.coordinates()?;
    Some(Location {
        id: pin.id?,
        name: pin.name.unwrap_or_default(),
        lat,
        lng,
    })
}

fn sale_event_from(pin: RawPin) -> Option<SaleEvent> {
    let (lat, lng) = pin.coordinates()?;
    Some(SaleEvent {
        id: pin.id,
        title: pin
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT_TITLE.to_string()),
        location_name: pin.location_name.unwrap_or_default(),
        lat,
        lng,
        items_url: pin.items_url,
    })
}
