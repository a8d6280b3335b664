//! Security audit logging for authentication events
//!
//! Logins, registrations and rejected tokens are logged at INFO level on the
//! "audit" target so they can be filtered and routed apart from application
//! logs. Each record carries the event serialized as JSON.
//!
//! Author: hephaex@gmail.com

use axum::http::{header, HeaderMap};
use chrono::Utc;
use miniature_core::UserId;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Request context attached to audit events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    LoginSuccess {
        user_id: UserId,
        username: String,
        client: ClientInfo,
    },

    LoginFailure {
        username: String,
        reason: String,
        client: ClientInfo,
    },

    RegistrationSuccess {
        user_id: UserId,
        username: String,
        client: ClientInfo,
    },

    RegistrationFailure {
        username: String,
        reason: String,
        client: ClientInfo,
    },

    /// Protected route called without a bearer credential
    MissingToken { path: String, client: ClientInfo },

    /// Forged, malformed or expired token
    InvalidToken {
        path: String,
        reason: String,
        client: ClientInfo,
    },

    /// Valid token whose account no longer resolves
    UnknownAccount {
        user_id: UserId,
        path: String,
        client: ClientInfo,
    },
}

impl AuditEvent {
    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::RegistrationSuccess { .. } => "Registration successful",
            AuditEvent::RegistrationFailure { .. } => "Registration failed",
            AuditEvent::MissingToken { .. } => "Token missing",
            AuditEvent::InvalidToken { .. } => "Invalid token",
            AuditEvent::UnknownAccount { .. } => "Token for unknown account",
        }
    }

    fn client(&self) -> &ClientInfo {
        match self {
            AuditEvent::LoginSuccess { client, .. }
            | AuditEvent::LoginFailure { client, .. }
            | AuditEvent::RegistrationSuccess { client, .. }
            | AuditEvent::RegistrationFailure { client, .. }
            | AuditEvent::MissingToken { client, .. }
            | AuditEvent::InvalidToken { client, .. }
            | AuditEvent::UnknownAccount { client, .. } => client,
        }
    }
}

/// Log a security audit event with structured fields
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();

    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    info!(
        target: "audit",
        timestamp = %timestamp,
        event = %event_json,
        ip_address = ?event.client().ip_address,
        "{}",
        event.summary()
    );
}

/// Extract the client IP from proxy headers (X-Forwarded-For, then X-Real-IP)
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(first_ip) = headers
        .get("x-forwarded-for")
        .and_then(|xff| xff.to_str().ok())
        .and_then(|xff| xff.split(',').next())
    {
        return Some(first_ip.trim().to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|ip| ip.to_str().ok())
        .map(|s| s.to_string())
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginSuccess {
            user_id: UserId(3),
            username: "admin".to_string(),
            client: ClientInfo {
                ip_address: Some("192.168.1.1".to_string()),
                user_agent: None,
            },
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "login_success");
        assert_eq!(json["user_id"], 3);
        assert_eq!(json["client"]["ip_address"], "192.168.1.1");
    }

    #[test]
    fn test_audit_log_does_not_panic() {
        audit_log(&AuditEvent::InvalidToken {
            path: "/post".to_string(),
            reason: "Token has expired".to_string(),
            client: ClientInfo::default(),
        });
        audit_log(&AuditEvent::RegistrationFailure {
            username: "admin".to_string(),
            reason: "Username is already taken".to_string(),
            client: ClientInfo::default(),
        });
    }

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.1".parse().unwrap());

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_client_info_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, "Mozilla/5.0 (Test)".parse().unwrap());

        let client = ClientInfo::from_headers(&headers);
        assert_eq!(client.ip_address, None);
        assert_eq!(client.user_agent, Some("Mozilla/5.0 (Test)".to_string()));
    }
}
