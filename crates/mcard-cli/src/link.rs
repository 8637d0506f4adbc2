//! # Link Subcommand
//!
//! Prints the notification link an administrator would share after
//! approving a member.

use anyhow::Result;
use clap::Args;
use mcard_core::Phone;
use mcard_notify::{NotificationLinkBuilder, DEFAULT_BASE_URL, DEFAULT_COUNTRY_CODE};

/// Arguments for `mcard link`.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Member display name.
    #[arg(long)]
    pub name: String,

    /// Member phone number as registered.
    #[arg(long)]
    pub phone: String,

    /// Public certificate URL.
    #[arg(long)]
    pub url: String,

    /// Country code prefixed to domestic numbers.
    #[arg(long, default_value = DEFAULT_COUNTRY_CODE)]
    pub country_code: String,

    /// Messaging deep-link service.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
}

/// Execute the link subcommand.
pub fn run_link(args: &LinkArgs) -> Result<u8> {
    println!("{}", build_link(args)?);
    Ok(0)
}

/// Build the link described by `args`.
pub fn build_link(args: &LinkArgs) -> Result<String> {
    let builder = NotificationLinkBuilder::new(&args.base_url, &args.country_code)?;
    let phone = Phone::new(&args.phone)?;
    Ok(builder.build_for(&args.name, &phone, &args.url))
}
