//! Integration catalog and per-user integration cards.
//!
//! Integrations are placeholders: connecting one only records the
//! credentials and flips the `connected` flag. Nothing ever talks to Slack,
//! Kubernetes, or the rest.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::IntegrationRecord;

/// How a credential input is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Password,
}

/// One credential input of an integration form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub placeholder: &'static str,
    pub required: bool,
}

const fn field(
    name: &'static str,
    label: &'static str,
    kind: FieldKind,
    placeholder: &'static str,
    required: bool,
) -> CredentialField {
    CredentialField {
        name,
        label,
        kind,
        placeholder,
        required,
    }
}

/// Static description of an integration.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct IntegrationSpec {
    pub name: &'static str,
    pub icon: &'static str,
    /// `false` for "coming soon" entries, which have no fields.
    pub available: bool,
    pub fields: &'static [CredentialField],
}

/// Every integration, in display order.
pub static CATALOG: &[IntegrationSpec] = &[
    IntegrationSpec {
        name: "Slack",
        icon: "💬",
        available: true,
        fields: &[
            field("webhookUrl", "Webhook URL", FieldKind::Text, "https://hooks.slack.com/services/...", true),
            field("channel", "Channel Name", FieldKind::Text, "#security-alerts", true),
            field("botToken", "Bot Token", FieldKind::Password, "xoxb-...", false),
        ],
    },
    IntegrationSpec {
        name: "Kubernetes",
        icon: "☸️",
        available: true,
        fields: &[
            field("apiServer", "API Server URL", FieldKind::Text, "https://your-cluster.example.com", true),
            field("token", "Service Account Token", FieldKind::Password, "eyJhbGciOiJSUzI1NiIs...", true),
            field("namespace", "Namespace", FieldKind::Text, "default", false),
        ],
    },
    IntegrationSpec {
        name: "Grafana",
        icon: "📊",
        available: true,
        fields: &[
            field("url", "Grafana URL", FieldKind::Text, "https://grafana.example.com", true),
            field("apiKey", "API Key", FieldKind::Password, "glsa_...", true),
        ],
    },
    IntegrationSpec {
        name: "Prometheus",
        icon: "🔥",
        available: true,
        fields: &[
            field("url", "Prometheus URL", FieldKind::Text, "https://prometheus.example.com", true),
            field("username", "Username", FieldKind::Text, "admin", false),
            field("password", "Password", FieldKind::Password, "password", false),
        ],
    },
    IntegrationSpec { name: "Docker", icon: "🐳", available: false, fields: &[] },
    IntegrationSpec { name: "PostgreSQL", icon: "🐘", available: false, fields: &[] },
    IntegrationSpec { name: "MySQL", icon: "🗄️", available: false, fields: &[] },
    IntegrationSpec { name: "Redis", icon: "⚡", available: false, fields: &[] },
];

/// Look up a catalog entry by name (exact match).
#[must_use]
pub fn spec_by_name(name: &str) -> Option<&'static IntegrationSpec> {
    CATALOG.iter().find(|s| s.name == name)
}

/// A user's view of one integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrationCard {
    pub spec: &'static IntegrationSpec,
    pub connected: bool,
    pub credentials: BTreeMap<String, String>,
}

impl IntegrationCard {
    #[must_use]
    pub fn new(spec: &'static IntegrationSpec) -> Self {
        Self {
            spec,
            connected: false,
            credentials: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    /// Every required field holds a non-blank value.
    ///
    /// "Coming soon" entries have no fields and are never connectable.
    #[must_use]
    pub fn can_connect(&self) -> bool {
        self.spec.available
            && self.spec.fields.iter().filter(|f| f.required).all(|f| {
                self.credentials
                    .get(f.name)
                    .is_some_and(|v| !v.trim().is_empty())
            })
    }

    /// Apply a stored row onto this card.
    pub fn apply(&mut self, record: &IntegrationRecord) {
        self.connected = record.connected;
        self.credentials.clone_from(&record.credentials);
    }

    /// The row to persist for `user_id`.
    #[must_use]
    pub fn to_record(&self, user_id: uuid::Uuid) -> IntegrationRecord {
        IntegrationRecord {
            user_id,
            integration_name: self.spec.name.to_owned(),
            credentials: self.credentials.clone(),
            connected: self.connected,
        }
    }
}

/// Fresh cards for the whole catalog.
#[must_use]
pub fn default_cards() -> Vec<IntegrationCard> {
    CATALOG.iter().map(IntegrationCard::new).collect()
}

/// Overlay stored rows onto the catalog. Rows naming unknown integrations
/// are ignored.
#[must_use]
pub fn cards_from_records(records: &[IntegrationRecord]) -> Vec<IntegrationCard> {
    let mut cards = default_cards();
    for card in &mut cards {
        if let Some(record) = records.iter().find(|r| r.integration_name == card.name()) {
            card.apply(record);
        }
    }
    cards
}

/// Serialized form of a card, used for local snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSnapshot {
    pub name: String,
    pub connected: bool,
    pub credentials: BTreeMap<String, String>,
}

impl From<&IntegrationCard> for CardSnapshot {
    fn from(card: &IntegrationCard) -> Self {
        Self {
            name: card.name().to_owned(),
            connected: card.connected,
            credentials: card.credentials.clone(),
        }
    }
}

/// Rebuild cards from a snapshot, keeping catalog order.
#[must_use]
pub fn cards_from_snapshot(snapshot: &[CardSnapshot]) -> Vec<IntegrationCard> {
    let mut cards = default_cards();
    for card in &mut cards {
        if let Some(saved) = snapshot.iter().find(|s| s.name == card.name()) {
            card.connected = saved.connected;
            card.credentials.clone_from(&saved.credentials);
        }
    }
    cards
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn catalog_order_and_availability() {
        let names: Vec<_> = CATALOG.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            ["Slack", "Kubernetes", "Grafana", "Prometheus", "Docker", "PostgreSQL", "MySQL", "Redis"]
        );
        assert!(CATALOG.iter().all(|s| s.available != s.fields.is_empty()));
    }

    #[test]
    fn connect_requires_required_fields_only() {
        let mut slack = IntegrationCard::new(&CATALOG[0]);
        assert!(!slack.can_connect());

        slack.credentials.insert("webhookUrl".into(), "https://hooks.slack.com/x".into());
        slack.credentials.insert("channel".into(), "   ".into());
        assert!(!slack.can_connect());

        slack.credentials.insert("channel".into(), "#sec".into());
        assert!(slack.can_connect());
    }

    #[test]
    fn coming_soon_never_connects() {
        let docker = IntegrationCard::new(spec_by_name("Docker").unwrap_or(&CATALOG[4]));
        assert!(!docker.can_connect());
    }

    #[test]
    fn records_overlay_by_name() {
        let user = Uuid::new_v4();
        let mut grafana = IntegrationCard::new(&CATALOG[2]);
        grafana.credentials.insert("url".into(), "https://g".into());
        grafana.connected = true;

        let mut stray = grafana.to_record(user);
        stray.integration_name = "Jenkins".into();

        let cards = cards_from_records(&[grafana.to_record(user), stray]);
        assert_eq!(cards.len(), CATALOG.len());
        assert!(cards[2].connected);
        assert_eq!(cards[2].credentials.get("url").map(String::as_str), Some("https://g"));
        assert!(cards.iter().filter(|c| c.connected).count() == 1);
    }

    #[test]
    fn snapshot_restores_cards() {
        let mut cards = default_cards();
        cards[1].credentials.insert("token".into(), "t".into());
        let snapshot: Vec<CardSnapshot> = cards.iter().map(CardSnapshot::from).collect();
        assert_eq!(cards_from_snapshot(&snapshot), cards);
    }
}
