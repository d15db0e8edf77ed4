use chrono::{DateTime, Duration, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;
use volunteer_match::config::MatchingSettings;
use volunteer_match::workflows::matching::{
    distance_miles, AccessibilityRequirement, ChatChannelPublisher, ChatChannelRequest, ChatError,
    Coordinates, GeocodeError, Geocoder, InMemoryMatchingStore, MatchingConfig, MatchingService,
    RepositoryError, ResolvedPlace, UserAccount, UserId,
};

/// Reverse lookups snap to the nearest gazetteer entry within this distance.
const REVERSE_SNAP_MILES: f64 = 2.0;

pub(crate) type ApiService =
    MatchingService<InMemoryMatchingStore, GazetteerGeocoder, LoggingChatPublisher>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Offline geocoder backed by a fixed list of neighbourhoods keyed by postal code.
#[derive(Debug, Clone, Default)]
pub(crate) struct GazetteerGeocoder {
    places: BTreeMap<String, ResolvedPlace>,
}

impl GazetteerGeocoder {
    pub(crate) fn philadelphia() -> Self {
        let entries = [
            ("19103", "Rittenhouse, Philadelphia, PA 19103", 39.9496, -75.1718),
            ("19104", "University City, Philadelphia, PA 19104", 39.9566, -75.1899),
            ("19125", "Fishtown, Philadelphia, PA 19125", 39.9700, -75.1300),
            ("19147", "Queen Village, Philadelphia, PA 19147", 39.9367, -75.1527),
            ("19119", "Mount Airy, Philadelphia, PA 19119", 40.0540, -75.1950),
        ];
        let places = entries
            .into_iter()
            .map(|(code, label, latitude, longitude)| {
                (
                    code.to_string(),
                    ResolvedPlace {
                        point: Coordinates::new(latitude, longitude),
                        label: label.to_string(),
                    },
                )
            })
            .collect();
        Self { places }
    }
}

impl Geocoder for GazetteerGeocoder {
    fn reverse(&self, point: Coordinates) -> Result<Option<String>, GeocodeError> {
        let nearest = self
            .places
            .values()
            .map(|place| (distance_miles(point, place.point), place))
            .filter(|(miles, _)| *miles <= REVERSE_SNAP_MILES)
            .min_by(|a, b| a.0.total_cmp(&b.0));
        Ok(nearest.map(|(_, place)| place.label.clone()))
    }

    fn forward(&self, query: &str) -> Result<Option<ResolvedPlace>, GeocodeError> {
        let needle = query.trim().to_ascii_lowercase();
        if let Some(place) = self.places.get(&needle) {
            return Ok(Some(place.clone()));
        }
        Ok(self
            .places
            .values()
            .find(|place| place.label.to_ascii_lowercase().contains(&needle))
            .cloned())
    }
}

/// Chat collaborator that only records the request in the log stream.
#[derive(Debug, Clone, Default)]
pub(crate) struct LoggingChatPublisher;

impl ChatChannelPublisher for LoggingChatPublisher {
    fn open_channel(&self, request: ChatChannelRequest) -> Result<(), ChatError> {
        info!(
            job = %request.job,
            volunteer = %request.volunteer,
            poster = %request.poster,
            "chat channel requested"
        );
        Ok(())
    }
}

pub(crate) fn build_service(
    settings: &MatchingSettings,
    store: Arc<InMemoryMatchingStore>,
) -> ApiService {
    MatchingService::new(
        store,
        Arc::new(GazetteerGeocoder::philadelphia()),
        Arc::new(LoggingChatPublisher),
        MatchingConfig::from_settings(settings),
    )
}

/// Accounts the upstream auth layer would normally supply.
pub(crate) fn seed_accounts(
    store: &InMemoryMatchingStore,
    now: DateTime<Utc>,
) -> Result<Vec<UserAccount>, RepositoryError> {
    let accounts = vec![
        UserAccount {
            id: UserId(1),
            username: "pantry-lead".to_string(),
            joined_at: now - Duration::days(420),
        },
        UserAccount {
            id: UserId(2),
            username: "rivera".to_string(),
            joined_at: now - Duration::days(95),
        },
        UserAccount {
            id: UserId(3),
            username: "okafor".to_string(),
            joined_at: now - Duration::days(12),
        },
    ];
    for account in &accounts {
        store.register_user(account.clone())?;
    }
    Ok(accounts)
}

pub(crate) fn parse_limitation(raw: &str) -> Result<AccessibilityRequirement, String> {
    let needle = raw.trim().to_ascii_lowercase().replace('-', "_");
    AccessibilityRequirement::ALL
        .into_iter()
        .find(|requirement| requirement.label() == needle)
        .ok_or_else(|| {
            let known: Vec<&str> = AccessibilityRequirement::ALL
                .iter()
                .map(|requirement| requirement.label())
                .collect();
            format!("unknown limitation '{raw}' (expected one of {})", known.join(", "))
        })
}
