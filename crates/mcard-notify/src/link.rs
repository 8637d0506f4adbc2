//! Deep-link construction and message encoding.

use mcard_core::{CredentialRecord, Phone};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;
use url::Url;

/// Messaging service used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://wa.me/";

/// Country calling code prefixed to domestic numbers.
pub const DEFAULT_COUNTRY_CODE: &str = "91";

/// Everything outside the RFC 3986 unreserved set is escaped.
const MESSAGE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Invalid link builder configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("invalid messaging base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("country code must be 1-4 ASCII digits, got {0:?}")]
    InvalidCountryCode(String),
}

/// Builds approval notification links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationLinkBuilder {
    base_url: String,
    country_code: String,
}

impl Default for NotificationLinkBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
        }
    }
}

impl NotificationLinkBuilder {
    /// Create a builder for a messaging service and country code.
    ///
    /// The base URL must be absolute `http`/`https`; a trailing `/` is
    /// added when missing.
    pub fn new(base_url: &str, country_code: &str) -> Result<Self, LinkError> {
        let parsed = Url::parse(base_url).map_err(|e| LinkError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LinkError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme {:?}", parsed.scheme()),
            });
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(LinkError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "query and fragment are not allowed".to_string(),
            });
        }

        let cc = country_code.trim().trim_start_matches('+');
        if cc.is_empty() || cc.len() > 4 || !cc.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LinkError::InvalidCountryCode(country_code.to_string()));
        }

        let mut base = parsed.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            base_url: base,
            country_code: cc.to_string(),
        })
    }

    /// The configured country code, without `+`.
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Recipient in the digits-only international form the service expects.
    ///
    /// A number entered with a leading `+` already carries its country code;
    /// anything else is treated as domestic and gets the configured prefix.
    pub fn recipient(&self, phone: &Phone) -> String {
        if phone.is_international() {
            phone.digits()
        } else {
            format!("{}{}", self.country_code, phone.digits())
        }
    }

    /// The plain-text approval message.
    pub fn message(name: &str, certificate_url: &str) -> String {
        format!(
            "🎉 Hello {name}!\n\n\
             Your Membership Card has been approved! 🎖️\n\n\
             📄 Download your certificate:\n{certificate_url}\n\n\
             Thank you for joining the movement."
        )
    }

    /// Build the deep-link for an approved record.
    pub fn build(&self, record: &CredentialRecord, certificate_url: &str) -> String {
        self.build_for(&record.name, &record.phone, certificate_url)
    }

    /// Build the deep-link from the individual fields.
    pub fn build_for(&self, name: &str, phone: &Phone, certificate_url: &str) -> String {
        let message = Self::message(name, certificate_url);
        format!(
            "{}{}?text={}",
            self.base_url,
            self.recipient(phone),
            encode_message(&message)
        )
    }
}

/// Percent-encode a message for use as a query value.
pub fn encode_message(message: &str) -> String {
    utf8_percent_encode(message, MESSAGE_ENCODE_SET).to_string()
}
