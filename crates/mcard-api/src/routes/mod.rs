//! # Route Modules
//!
//! - `credentials`: registration, availability, approval, download, and
//!   admin record management.

pub mod credentials;
