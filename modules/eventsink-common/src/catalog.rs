//! Canonical column order for every known domain.
//!
//! Unknown domains are allowed; their tables take the first event's keys as header.

/// Domain used when a submission does not name one.
pub const DEFAULT_DOMAIN: &str = "audit_logs";

const REFERENCE_DOMAINS: &[(&str, &[&str])] = &[
    (
        "audit_logs",
        &["timestamp", "action", "user_id", "username", "details", "ip_address"],
    ),
    (
        "users",
        &["timestamp", "action", "user_id", "username", "email", "display_name", "role"],
    ),
    (
        "videos",
        &[
            "timestamp",
            "action",
            "video_id",
            "user_id",
            "username",
            "title",
            "description",
            "video_url",
            "thumbnail_url",
            "duration",
        ],
    ),
    (
        "comments",
        &["timestamp", "action", "comment_id", "video_id", "user_id", "username", "content"],
    ),
    ("likes", &["timestamp", "action", "video_id", "user_id", "username"]),
    (
        "views",
        &["timestamp", "action", "video_id", "user_id", "username", "watch_seconds"],
    ),
    (
        "notifications",
        &["timestamp", "action", "notification_id", "user_id", "type", "message", "is_read"],
    ),
    (
        "messages",
        &["timestamp", "action", "message_id", "sender_id", "receiver_id", "content"],
    ),
    (
        "support_tickets",
        &["timestamp", "action", "ticket_id", "user_id", "username", "subject", "message", "status"],
    ),
    (
        "reports",
        &["timestamp", "action", "report_id", "reporter_id", "target_type", "target_id", "reason", "status"],
    ),
    ("password_resets", &["timestamp", "action", "user_id", "email", "status"]),
    (
        "events",
        &["timestamp", "action", "event_id", "user_id", "title", "description", "location", "starts_at"],
    ),
    (
        "places",
        &["timestamp", "action", "place_id", "user_id", "name", "category", "latitude", "longitude"],
    ),
    (
        "shura_messages",
        &["timestamp", "action", "message_id", "user_id", "username", "content"],
    ),
    (
        "admin_actions",
        &["timestamp", "action", "admin_id", "admin_username", "target_type", "target_id", "details"],
    ),
];

/// Static lookup of domain name to canonical header. Pure; never touches a store.
#[derive(Debug, Clone)]
pub struct TableCatalog {
    domains: Vec<(String, Vec<String>)>,
}

impl TableCatalog {
    /// A catalog with no known domains. Every table bootstraps from its first event.
    pub fn empty() -> Self {
        Self {
            domains: Vec::new(),
        }
    }

    /// The reference deployment's fifteen domains.
    pub fn reference() -> Self {
        REFERENCE_DOMAINS
            .iter()
            .fold(Self::empty(), |catalog, (name, columns)| {
                catalog.with_domain(*name, columns.iter().copied())
            })
    }

    /// Add a domain, or replace the columns of an existing one.
    pub fn with_domain<I, S>(mut self, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        match self.domains.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = columns,
            None => self.domains.push((name, columns)),
        }
        self
    }

    pub fn schema_for(&self, domain: &str) -> Option<&[String]> {
        self.domains
            .iter()
            .find(|(name, _)| name == domain)
            .map(|(_, columns)| columns.as_slice())
    }

    pub fn is_known(&self, domain: &str) -> bool {
        self.schema_for(domain).is_some()
    }

    /// Known domains in registration order.
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(|(name, _)| name.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.domains
            .iter()
            .map(|(name, columns)| (name.as_str(), columns.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl Default for TableCatalog {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Header;

    #[test]
    fn likes_has_reference_order() {
        let catalog = TableCatalog::reference();
        assert_eq!(
            catalog.schema_for("likes").unwrap(),
            ["timestamp", "action", "video_id", "user_id", "username"]
        );
    }

    #[test]
    fn unknown_domain_is_not_found() {
        assert!(TableCatalog::reference().schema_for("bookmarks").is_none());
    }

    #[test]
    fn reference_has_fifteen_domains_including_default() {
        let catalog = TableCatalog::reference();
        assert_eq!(catalog.len(), 15);
        assert!(catalog.is_known(DEFAULT_DOMAIN));
    }

    #[test]
    fn every_reference_header_is_valid() {
        for domain in TableCatalog::reference().domains() {
            let columns = TableCatalog::reference().schema_for(domain).unwrap().to_vec();
            assert!(Header::from_columns(columns).is_ok(), "{domain} header invalid");
        }
    }

    #[test]
    fn with_domain_extends_and_replaces() {
        let catalog = TableCatalog::empty()
            .with_domain("bookmarks", ["timestamp", "video_id"])
            .with_domain("bookmarks", ["timestamp", "video_id", "user_id"]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.schema_for("bookmarks").unwrap().len(), 3);
    }
}
