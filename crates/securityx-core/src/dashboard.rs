//! Dashboard view state and placeholder metrics.
//!
//! A [`DashboardState`] is the owned state of one user's dashboard: which
//! integration card is expanded, what has been typed into the credential
//! forms, notifications, and navigation. It is plain data with synchronous
//! operations; persistence happens elsewhere.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::integration::{IntegrationCard, default_cards};

/// Dashboard sections reachable from the drawer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    #[default]
    Home,
    Vulnerabilities,
    Alerts,
    #[serde(rename = "api-keys")]
    ApiKeys,
    Integrations,
    Settings,
    Activity,
    Analytics,
    Reports,
}

impl Section {
    /// Every section, in drawer order.
    pub const ALL: [Self; 9] = [
        Self::Home,
        Self::Vulnerabilities,
        Self::Alerts,
        Self::ApiKeys,
        Self::Integrations,
        Self::Settings,
        Self::Activity,
        Self::Analytics,
        Self::Reports,
    ];
}

/// A dashboard notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

/// Why a card operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardError {
    #[error("no integration at index {0}")]
    UnknownIndex(usize),
    #[error("{0} is missing required credentials")]
    MissingCredentials(&'static str),
    #[error("{0} has no field named '{1}'")]
    UnknownField(&'static str, String),
}

/// One user's dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardState {
    pub cards: Vec<IntegrationCard>,
    pub expanded: Option<usize>,
    pub notifications: Vec<Notification>,
    pub section: Section,
    pub drawer_open: bool,
    pub api_id: String,
    pub proxy_id: String,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardState {
    /// A fresh dashboard with the full catalog and new identifiers.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cards(default_cards())
    }

    #[must_use]
    pub fn with_cards(cards: Vec<IntegrationCard>) -> Self {
        Self {
            cards,
            expanded: None,
            notifications: Vec::new(),
            section: Section::Home,
            drawer_open: false,
            api_id: format!("sx_api_{}", random_suffix()),
            proxy_id: format!("sx_proxy_{}", random_suffix()),
        }
    }

    /// Expand card `index`, or collapse it if it is already expanded.
    ///
    /// Credentials are untouched, so toggling twice restores the previous
    /// state exactly.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::UnknownIndex`] for an index outside the catalog.
    pub fn toggle_expanded(&mut self, index: usize) -> Result<Option<usize>, CardError> {
        self.card(index)?;
        self.expanded = if self.expanded == Some(index) {
            None
        } else {
            Some(index)
        };
        Ok(self.expanded)
    }

    /// Record one typed credential value.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown card or a field the card does not
    /// declare.
    pub fn set_credential(
        &mut self,
        index: usize,
        field: &str,
        value: &str,
    ) -> Result<(), CardError> {
        let card = self
            .cards
            .get_mut(index)
            .ok_or(CardError::UnknownIndex(index))?;
        if !card.spec.fields.iter().any(|f| f.name == field) {
            return Err(CardError::UnknownField(card.spec.name, field.to_owned()));
        }
        card.credentials.insert(field.to_owned(), value.to_owned());
        Ok(())
    }

    /// Mark card `index` connected, collapse it, and announce it.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::MissingCredentials`] if a required field is
    /// blank; the state is left unchanged.
    pub fn connect(&mut self, index: usize) -> Result<&IntegrationCard, CardError> {
        let card = self.card(index)?;
        if !card.can_connect() {
            return Err(CardError::MissingCredentials(card.spec.name));
        }
        let name = card.spec.name;

        self.cards[index].connected = true;
        self.expanded = None;
        self.push_notification(format!("{name} integration connected successfully!"));
        Ok(&self.cards[index])
    }

    /// Newest notifications first.
    pub fn push_notification(&mut self, message: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.notifications.insert(
            0,
            Notification {
                id,
                message: message.into(),
                timestamp: Utc::now(),
                read: false,
            },
        );
        id
    }

    /// Returns whether a notification with that id existed.
    pub fn mark_read(&mut self, id: Uuid) -> bool {
        self.notifications
            .iter_mut()
            .find(|n| n.id == id)
            .map(|n| n.read = true)
            .is_some()
    }

    pub fn mark_all_read(&mut self) {
        for n in &mut self.notifications {
            n.read = true;
        }
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    /// Navigate to a section; navigating always closes the drawer.
    pub fn set_section(&mut self, section: Section) {
        self.section = section;
        self.drawer_open = false;
    }

    pub fn set_drawer(&mut self, open: bool) {
        self.drawer_open = open;
    }

    fn card(&self, index: usize) -> Result<&IntegrationCard, CardError> {
        self.cards.get(index).ok_or(CardError::UnknownIndex(index))
    }
}

/// 13 base-36 characters from a fresh v4 UUID.
fn random_suffix() -> String {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut n = Uuid::new_v4().as_u128();
    (0..13)
        .map(|_| {
            let c = ALPHABET[(n % 36) as usize];
            n /= 36;
            char::from(c)
        })
        .collect()
}

// ── Placeholder metrics ──────────────────────────────────────────────

/// Fixed security score shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SecurityScore {
    pub score: u8,
    pub color: &'static str,
}

impl SecurityScore {
    /// Until scans exist the score is a constant.
    pub const PLACEHOLDER: u8 = 87;

    #[must_use]
    pub const fn new(score: u8) -> Self {
        let color = match score {
            80.. => "green",
            60..=79 => "yellow",
            _ => "red",
        };
        Self { score, color }
    }

    #[must_use]
    pub const fn placeholder() -> Self {
        Self::new(Self::PLACEHOLDER)
    }
}

/// Kind of a timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Scan,
    Alert,
    Integration,
    Success,
}

/// One entry of the activity timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEvent {
    pub id: u32,
    pub kind: EventKind,
    pub title: &'static str,
    pub description: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// The fixed sample timeline, timestamps relative to `now`.
#[must_use]
pub fn activity_timeline(now: DateTime<Utc>) -> Vec<TimelineEvent> {
    let entries = [
        (EventKind::Scan, "Vulnerability Scan Completed", "Found 3 vulnerabilities requiring attention"),
        (EventKind::Integration, "Kubernetes Connected", "Successfully integrated with cluster prod-01"),
        (EventKind::Success, "Security Patch Applied", "Critical XSS vulnerability has been fixed"),
        (EventKind::Alert, "Unusual Activity Detected", "Multiple failed login attempts from IP 192.168.1.1"),
    ];
    entries
        .into_iter()
        .zip(1u32..)
        .map(|((kind, title, description), id)| TimelineEvent {
            id,
            kind,
            title,
            description,
            timestamp: now - Duration::hours(2 * i64::from(id)),
        })
        .collect()
}
