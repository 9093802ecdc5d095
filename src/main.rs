use anyhow::Result;
use clap::Parser;
use owo_colors::OwoColorize;
use std::io::{IsTerminal, Read};
use ttscast::app::{self, Overrides};
use ttscast::cli::{Cli, Commands, ConfigAction};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = app::load_config(cli.config.as_deref())?;

    let overrides = Overrides {
        endpoint: cli.endpoint,
        model: cli.model,
        no_stream: cli.no_stream,
        mode: cli.mode,
        volume: cli.volume,
    };
    app::apply_overrides(&mut config, &overrides)?;

    match cli.command {
        None => {
            let text = match cli.text {
                Some(text) => text,
                None => read_stdin_text()?,
            };

            let result = app::run_say(
                config,
                &text,
                cli.voice.as_deref(),
                cli.output.as_deref(),
                cli.quiet,
            )
            .await;

            if let Err(e) = result {
                eprintln!("{} {}", "TTS generation failed:".red(), e);
                std::process::exit(1);
            }
        }
        Some(Commands::Voices) => {
            app::run_voices(config).await?;
        }
        Some(Commands::Preview { voice }) => {
            app::run_preview(config, &voice).await?;
        }
        Some(Commands::Check) => {
            app::run_check(config).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Path => app::run_config_path(),
            ConfigAction::Show => app::run_config_show(&config)?,
        },
    }

    Ok(())
}

/// Read the text to speak from stdin when no argument was given.
fn read_stdin_text() -> Result<String> {
    if std::io::stdin().is_terminal() {
        anyhow::bail!("no text given; pass it as an argument or pipe it on stdin");
    }
    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text)?;
    let text = text.trim().to_string();
    if text.is_empty() {
        anyhow::bail!("stdin was empty");
    }
    Ok(text)
}
