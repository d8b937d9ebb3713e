//! Configuration types.
//!
//! Everything is read once at start-up from environment variables. Each
//! `from_env()` has a `from_lookup()` twin taking any key → value function,
//! which is what the tests use.

use std::net::IpAddr;

use secrecy::SecretString;

use crate::error::{self, ConfigError};
use crate::relay::address::{self, EmailAddress};
use crate::relay::{DEFAULT_FROM_MARKER, DEFAULT_TO_MARKER, Markers, NameTags};

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Read an optional value, treating blank values as unset.
fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional(lookup, key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

// ── Relay ───────────────────────────────────────────────────────────

/// Routing configuration shared by every webhook invocation.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Subject marker tokens (`RELAY_TO_PREFIX`, `RELAY_FROM_PREFIX`).
    pub markers: Markers,
    /// Internal mailbox that incoming mail is redirected to
    /// (`RELAY_EMAIL_ADDRESS`, `RELAY_EMAIL_NAME`).
    pub mailbox: EmailAddress,
    /// Display names for relayed senders (`RELAY_NAMETAGS`).
    pub nametags: NameTags,
}

impl RelayConfig {
    pub fn new(markers: Markers, mailbox: EmailAddress, nametags: NameTags) -> Self {
        Self {
            markers,
            mailbox,
            nametags,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Markers are taken verbatim: surrounding whitespace is significant.
        let to = lookup("RELAY_TO_PREFIX").unwrap_or_else(|| DEFAULT_TO_MARKER.to_string());
        let from = lookup("RELAY_FROM_PREFIX").unwrap_or_else(|| DEFAULT_FROM_MARKER.to_string());
        for (key, marker) in [("RELAY_TO_PREFIX", &to), ("RELAY_FROM_PREFIX", &from)] {
            if marker.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "marker must not be empty".into(),
                });
            }
        }

        let raw_address = required(&lookup, "RELAY_EMAIL_ADDRESS")?;
        let email = address::extract(&raw_address).map_err(|e| ConfigError::InvalidValue {
            key: "RELAY_EMAIL_ADDRESS".into(),
            message: e.to_string(),
        })?;
        let mailbox = EmailAddress::new(email.email)
            .with_name(optional(&lookup, "RELAY_EMAIL_NAME").or(email.name));

        let nametags = match optional(&lookup, "RELAY_NAMETAGS") {
            Some(json) => NameTags::from_json(&json).map_err(|e| ConfigError::InvalidValue {
                key: "RELAY_NAMETAGS".into(),
                message: e.to_string(),
            })?,
            None => NameTags::default(),
        };

        Ok(Self::new(Markers::new(to, from), mailbox, nametags))
    }
}

// ── Transport ───────────────────────────────────────────────────────

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpTls {
    StartTls,
    Tls,
    None,
}

impl std::str::FromStr for SmtpTls {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "starttls" => Ok(Self::StartTls),
            "tls" => Ok(Self::Tls),
            "none" => Ok(Self::None),
            other => Err(format!("expected starttls, tls or none, got {other:?}")),
        }
    }
}

/// SMTP sender configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub tls: SmtpTls,
}

/// SendGrid v3 API configuration.
#[derive(Debug, Clone)]
pub struct SendGridConfig {
    pub api_key: SecretString,
    pub api_url: String,
}

/// Default SendGrid send endpoint.
pub const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Which backend delivers routed mail (`RELAY_TRANSPORT`).
#[derive(Debug, Clone)]
pub enum TransportConfig {
    Smtp(SmtpConfig),
    SendGrid(SendGridConfig),
}

impl TransportConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let transport = optional(&lookup, "RELAY_TRANSPORT")
            .unwrap_or_else(|| "sendgrid".to_string())
            .to_ascii_lowercase();

        match transport.as_str() {
            "sendgrid" => Ok(Self::SendGrid(SendGridConfig {
                api_key: SecretString::from(required(&lookup, "SENDGRID_API_KEY")?),
                api_url: optional(&lookup, "SENDGRID_API_URL")
                    .unwrap_or_else(|| SENDGRID_API_URL.to_string()),
            })),
            "smtp" => {
                let username = optional(&lookup, "SMTP_USERNAME");
                let password = optional(&lookup, "SMTP_PASSWORD").map(SecretString::from);
                // Credentials only work as a pair.
                if username.is_some() != password.is_some() {
                    let missing = if username.is_some() {
                        "SMTP_PASSWORD"
                    } else {
                        "SMTP_USERNAME"
                    };
                    return Err(ConfigError::MissingEnvVar(missing.to_string()));
                }
                Ok(Self::Smtp(SmtpConfig {
                    host: required(&lookup, "SMTP_HOST")?,
                    port: parsed(&lookup, "SMTP_PORT", 587)?,
                    username,
                    password,
                    tls: parsed(&lookup, "SMTP_TLS", SmtpTls::StartTls)?,
                }))
            }
            other => Err(ConfigError::InvalidValue {
                key: "RELAY_TRANSPORT".into(),
                message: format!("expected sendgrid or smtp, got {other:?}"),
            }),
        }
    }
}

// ── Server ──────────────────────────────────────────────────────────

/// Webhook listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Largest accepted webhook body, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::from([0, 0, 0, 0]),
            port: 8080,
            max_body_bytes: 30 * 1024 * 1024, // SendGrid's inbound limit
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let max_body_mb: usize = parsed(&lookup, "RELAY_MAX_BODY_MB", 30)?;
        let max_body_bytes = max_body_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "RELAY_MAX_BODY_MB".into(),
                message: format!("{max_body_mb} MB does not fit in memory"),
            })?;
        Ok(Self {
            bind: parsed(&lookup, "RELAY_BIND", defaults.bind)?,
            port: parsed(&lookup, "RELAY_PORT", defaults.port)?,
            max_body_bytes,
        })
    }
}

// ── Whole service ───────────────────────────────────────────────────

/// Everything the binary needs, loaded in one go.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub relay: RelayConfig,
    pub transport: TransportConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn from_env() -> error::Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> error::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            relay: RelayConfig::from_lookup(&lookup)?,
            transport: TransportConfig::from_lookup(&lookup)?,
            server: ServerConfig::from_lookup(&lookup)?,
        })
    }
}
