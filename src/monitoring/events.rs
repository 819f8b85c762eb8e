/*!
 * Event System
 * Strongly-typed guard lifecycle events
 */

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event severity for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Severity {
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

/// Stage of a guard's lifecycle an event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    Used,
    Released,
    Error,
}

/// A single guard lifecycle event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Position in the collector's stream, assigned on emit
    pub sequence: u64,
    pub guard_id: Uuid,
    pub resource_type: String,
    pub kind: EventKind,
    pub severity: Severity,
    /// Operation name or error message
    pub detail: Option<String>,
    pub lifetime_micros: Option<u64>,
}

impl Event {
    pub fn new(guard_id: Uuid, resource_type: impl Into<String>, kind: EventKind) -> Self {
        let severity = match kind {
            EventKind::Error => Severity::Error,
            _ => Severity::Debug,
        };
        Self {
            sequence: 0,
            guard_id,
            resource_type: resource_type.into(),
            kind,
            severity,
            detail: None,
            lifetime_micros: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_lifetime(mut self, micros: u64) -> Self {
        self.lifetime_micros = Some(micros);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}
