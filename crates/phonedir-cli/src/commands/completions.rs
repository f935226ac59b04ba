use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{generate, Shell};
use std::io;

#[derive(Debug, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate the script for
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn emit(args: CompletionsArgs) -> Result<()> {
    let mut cli = crate::Cli::command();
    let bin_name = cli.get_name().to_string();
    generate(args.shell, &mut cli, bin_name, &mut io::stdout().lock());
    Ok(())
}
