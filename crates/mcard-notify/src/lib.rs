//! # mcard-notify — Notification Links
//!
//! Builds the messaging deep-link an administrator shares with a member
//! once their card is approved. The link addresses the member's phone and
//! carries a pre-filled message naming them and pointing at the
//! certificate:
//!
//! ```text
//! https://wa.me/919000000001?text=%F0%9F%8E%89%20Hello%20Asha%20Rao%21...
//! ```
//!
//! Construction is pure. Nothing here performs network I/O.

pub mod link;

pub use link::{encode_message, LinkError, NotificationLinkBuilder, DEFAULT_BASE_URL, DEFAULT_COUNTRY_CODE};
