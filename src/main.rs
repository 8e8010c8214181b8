use clap::Parser;
use element_anchor::cli::commands::{
    cmd_capture, cmd_clear, cmd_delete, cmd_list, cmd_refs, cmd_rename, cmd_show, cmd_synth,
    cmd_track, cmd_verify,
};
use element_anchor::cli::config::{Cli, Commands, load_config};
use element_anchor::cli::logging::init_tracing;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).with_overrides(&cli);
    init_tracing(cli.verbose, &config.logging.filter);

    match cli.command {
        Commands::Capture {
            page,
            at,
            selector,
            broaden,
            track,
        } => {
            cmd_capture(&config, &page, at, selector.as_deref(), broaden, track).await?;
        }
        Commands::Synth {
            page,
            selector,
            full,
        } => {
            cmd_synth(&config, &page, &selector, full)?;
        }
        Commands::List => cmd_list(&config).await?,
        Commands::Show { name } => cmd_show(&config, &name).await?,
        Commands::Rename { old, new } => cmd_rename(&config, &old, &new).await?,
        Commands::Delete { name } => cmd_delete(&config, &name).await?,
        Commands::Verify { name, page } => {
            let valid = cmd_verify(&config, &name, &page).await?;
            if !valid {
                std::process::exit(1);
            }
        }
        Commands::Track { name, enabled } => cmd_track(&config, &name, enabled).await?,
        Commands::Refs { text } => cmd_refs(&config, &text).await?,
        Commands::Clear => cmd_clear(&config).await?,
    }

    Ok(())
}
