//! Best-effort change notifications.
//!
//! Notifiers are optional collaborators: missing credentials disable a
//! notifier with a warning, and a failed delivery is logged without failing
//! the run.
mod email;
mod issue;

pub use email::{EmailCredentials, EmailNotifier};
pub use issue::{IssueCredentials, IssueNotifier};

use crate::config::MonitorConfig;
use chrono::{DateTime, SecondsFormat, Utc};

pub const EMAIL_SENDER_VAR: &str = "EMAIL_SENDER";
pub const EMAIL_PASSWORD_VAR: &str = "EMAIL_PASSWORD";
pub const EMAIL_RECIPIENT_VAR: &str = "EMAIL_RECIPIENT";
pub const ISSUE_REPOSITORY_VAR: &str = "GITHUB_REPOSITORY";
pub const ISSUE_TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Message sent when a change is detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn page_changed(
        source: &str,
        detected_at: DateTime<Utc>,
        current_text: &str,
        previous_text: &str,
    ) -> Self {
        let detected = detected_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        Self {
            subject: "Monitored page updated".to_string(),
            body: format!(
                "A change was detected at {detected} (UTC).\n\n\
                 Source: {source}\n\n\
                 New text:\n{current_text}\n\n\
                 Previous text:\n{previous_text}\n"
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("build email: {0}")]
    Email(#[from] lettre::error::Error),
    #[error("smtp delivery: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("POST {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: ureq::Error,
    },
    #[error("issue creation returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Delivery channel for change notifications.
pub trait Notifier {
    fn name(&self) -> &'static str;
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Required environment values that were absent or blank.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing {}", .missing.join(", "))]
pub struct MissingCredentials {
    pub missing: Vec<&'static str>,
}

/// Collects required values, remembering every one that is absent.
struct EnvReader<F> {
    lookup: F,
    missing: Vec<&'static str>,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn new(lookup: F) -> Self {
        Self {
            lookup,
            missing: Vec::new(),
        }
    }

    fn take(&mut self, name: &'static str) -> String {
        match (self.lookup)(name).filter(|value| !value.trim().is_empty()) {
            Some(value) => value,
            None => {
                self.missing.push(name);
                String::new()
            }
        }
    }

    fn finish<T>(self, value: T) -> Result<T, MissingCredentials> {
        if self.missing.is_empty() {
            Ok(value)
        } else {
            Err(MissingCredentials {
                missing: self.missing,
            })
        }
    }
}

/// Process-environment lookup used outside tests.
pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Build the notifiers enabled in `config` whose credentials are present.
pub fn build_notifiers<F>(config: &MonitorConfig, lookup: F) -> Vec<Box<dyn Notifier>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();
    if config.email_enabled {
        match EmailCredentials::from_lookup(&lookup) {
            Ok(credentials) => notifiers.push(Box::new(EmailNotifier::new(
                credentials,
                &config.smtp_host,
                config.smtp_port,
            ))),
            Err(missing) => {
                tracing::warn!(notifier = "email", %missing, "notifier skipped")
            }
        }
    }
    if config.ticket_enabled {
        match IssueCredentials::from_lookup(&lookup) {
            Ok(credentials) => notifiers.push(Box::new(IssueNotifier::new(credentials))),
            Err(missing) => {
                tracing::warn!(notifier = "issue", %missing, "notifier skipped")
            }
        }
    }
    notifiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn page_changed_message_carries_both_texts_and_timestamp() {
        let at = Utc
            .with_ymd_and_hms(2025, 2, 3, 4, 5, 6)
            .single()
            .expect("valid timestamp");
        let note = Notification::page_changed("https://example.org", at, "A\nB\nC", "A\nB");
        assert_eq!(note.subject, "Monitored page updated");
        assert!(note.body.contains("2025-02-03T04:05:06Z"));
        assert!(note.body.contains("New text:\nA\nB\nC"));
        assert!(note.body.contains("Previous text:\nA\nB"));
        assert!(note.body.contains("Source: https://example.org"));
    }

    #[test]
    fn missing_and_blank_values_are_reported_together() {
        let lookup = lookup_from(&[(EMAIL_SENDER_VAR, "bot@example.org"), (EMAIL_PASSWORD_VAR, "  ")]);
        let missing = EmailCredentials::from_lookup(&lookup).expect_err("incomplete");
        assert_eq!(missing.missing, [EMAIL_PASSWORD_VAR, EMAIL_RECIPIENT_VAR]);
        assert_eq!(missing.to_string(), "missing EMAIL_PASSWORD, EMAIL_RECIPIENT");
    }

    #[test]
    fn disabled_or_unconfigured_notifiers_are_not_built() {
        let mut config = MonitorConfig::default();
        assert!(build_notifiers(&config, lookup_from(&[])).is_empty());

        config.email_enabled = true;
        config.ticket_enabled = true;
        assert!(build_notifiers(&config, lookup_from(&[])).is_empty());

        let lookup = lookup_from(&[
            (ISSUE_REPOSITORY_VAR, "octo/watch"),
            (ISSUE_TOKEN_VAR, "t0ken"),
        ]);
        let names: Vec<_> = build_notifiers(&config, lookup)
            .iter()
            .map(|notifier| notifier.name())
            .collect();
        assert_eq!(names, ["issue"]);
    }
}
