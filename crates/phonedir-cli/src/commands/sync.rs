use crate::commands::{publish, resolve_output, Context};
use crate::error::invalid_input;
use anyhow::{Context as _, Result};
use clap::Args;
use phonedir_config::CardDavConfig;
use phonedir_sync::{nextcloud_addressbook_url, CardDavOptions, CardDavSource, CardSource};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Args)]
pub struct SyncArgs {
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Address book name, replacing carddav.addressbook
    #[arg(long)]
    pub addressbook: Option<String>,
    /// Convert and report without writing the directory
    #[arg(long)]
    pub dry_run: bool,
}

pub fn sync(ctx: &Context<'_>, args: SyncArgs) -> Result<()> {
    let carddav = ctx
        .config
        .carddav
        .as_ref()
        .ok_or_else(|| invalid_input("no [carddav] section in config"))?;
    let addressbook_url = resolve_addressbook_url(carddav, args.addressbook.as_deref())?;
    let password = carddav
        .resolve_password()
        .with_context(|| "resolve carddav password")?;

    let source = CardDavSource::new(CardDavOptions {
        addressbook_url: addressbook_url.clone(),
        username: carddav.username.clone(),
        password,
        user_agent: carddav.user_agent.clone(),
        timeout: Duration::from_secs(carddav.timeout_secs),
        verify_tls: carddav.verify_tls,
    });
    debug!(url = %addressbook_url, "fetching address book");
    let cards = source
        .fetch_cards()
        .with_context(|| format!("fetch address book {addressbook_url}"))?;
    debug!(count = cards.len(), "cards fetched");

    let output = resolve_output(ctx, args.out);
    publish(ctx, source.source_name(), &cards, output.as_deref(), args.dry_run)
}

fn resolve_addressbook_url(carddav: &CardDavConfig, addressbook: Option<&str>) -> Result<String> {
    if let Some(url) = &carddav.addressbook_url {
        if addressbook.is_some() {
            return Err(invalid_input(
                "--addressbook cannot be combined with carddav.addressbook_url",
            ));
        }
        return Ok(url.clone());
    }

    let name = match addressbook.map(str::trim) {
        Some("") => return Err(invalid_input("--addressbook must not be empty")),
        Some(name) if name.contains('/') => {
            return Err(invalid_input("--addressbook must be a single name"))
        }
        Some(name) => name,
        None => carddav.addressbook.as_str(),
    };
    let base = carddav
        .url
        .as_deref()
        .ok_or_else(|| invalid_input("carddav.url is required to derive the address book url"))?;
    Ok(nextcloud_addressbook_url(base, &carddav.username, name))
}
