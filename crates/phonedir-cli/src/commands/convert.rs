use crate::commands::{publish, resolve_output, Context};
use anyhow::{Context as _, Result};
use clap::Args;
use phonedir_sync::{CardSource, VcfFileSource};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// vCard file to convert
    pub file: PathBuf,
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn convert_file(ctx: &Context<'_>, args: ConvertArgs) -> Result<()> {
    let source = VcfFileSource::new(args.file);
    debug!(path = %source.path().display(), "reading vcf file");
    let cards = source
        .fetch_cards()
        .with_context(|| format!("read vcf file {}", source.path().display()))?;
    let output = resolve_output(ctx, args.out);
    publish(ctx, source.source_name(), &cards, output.as_deref(), false)
}
