//! Command-line interface for ttscast
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Speak text through a self-hosted TTS server
#[derive(Parser, Debug)]
#[command(name = "ttscast", version, about = "Speak text through a self-hosted TTS server")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Text to speak (reads stdin when omitted and no subcommand given)
    pub text: Option<String>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Voice name to speak with (default: first available voice)
    #[arg(long, value_name = "NAME")]
    pub voice: Option<String>,

    /// Generation endpoint URL override
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Model backend override (e.g., chatterbox)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Request the complete WAV instead of streaming
    #[arg(long)]
    pub no_stream: bool,

    /// Streaming playback mode override (worklet, blob)
    #[arg(long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Playback volume, 0.0 to 2.0
    #[arg(long, value_name = "VOLUME")]
    pub volume: Option<f32>,

    /// Save the synthesized WAV to a file instead of playing it
    /// (implies --no-stream)
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List voices offered by the provider
    Voices,

    /// Play a short preview phrase for a voice
    Preview {
        /// Voice name to preview
        voice: String,
    },

    /// Check connectivity to the provider and audio output
    Check,

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration file path
    Path,
    /// Show the effective configuration
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_argument() {
        let cli = Cli::try_parse_from(["ttscast", "Hello world"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.text.as_deref(), Some("Hello world"));
        assert!(cli.voice.is_none());
        assert!(!cli.no_stream);
        assert!(cli.volume.is_none());
    }

    #[test]
    fn test_parse_no_arguments() {
        let cli = Cli::try_parse_from(["ttscast"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.text.is_none());
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_with_options() {
        let cli = Cli::try_parse_from([
            "ttscast",
            "Hello",
            "--voice",
            "Anna",
            "--endpoint",
            "http://localhost:7778/v1/audio/speech",
            "--model",
            "chatterbox",
        ])
        .unwrap();

        assert_eq!(cli.text.as_deref(), Some("Hello"));
        assert_eq!(cli.voice.as_deref(), Some("Anna"));
        assert_eq!(
            cli.endpoint.as_deref(),
            Some("http://localhost:7778/v1/audio/speech")
        );
        assert_eq!(cli.model.as_deref(), Some("chatterbox"));
    }

    #[test]
    fn test_parse_no_stream() {
        let cli = Cli::try_parse_from(["ttscast", "Hello", "--no-stream"]).unwrap();
        assert!(cli.no_stream);
    }

    #[test]
    fn test_parse_mode_and_volume() {
        let cli =
            Cli::try_parse_from(["ttscast", "Hello", "--mode", "blob", "--volume", "1.5"]).unwrap();
        assert_eq!(cli.mode.as_deref(), Some("blob"));
        assert_eq!(cli.volume, Some(1.5));
    }

    #[test]
    fn test_parse_output_file() {
        let cli = Cli::try_parse_from(["ttscast", "Hello", "-o", "out.wav"]).unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("out.wav")));
    }

    #[test]
    fn test_parse_voices() {
        let cli = Cli::try_parse_from(["ttscast", "voices"]).unwrap();
        match cli.command {
            Some(Commands::Voices) => {}
            _ => panic!("Expected Voices command"),
        }
    }

    #[test]
    fn test_parse_preview() {
        let cli = Cli::try_parse_from(["ttscast", "preview", "Anna"]).unwrap();
        match cli.command {
            Some(Commands::Preview { voice }) => assert_eq!(voice, "Anna"),
            _ => panic!("Expected Preview command"),
        }
    }

    #[test]
    fn test_preview_requires_voice() {
        let result = Cli::try_parse_from(["ttscast", "preview"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from(["ttscast", "check"]).unwrap();
        match cli.command {
            Some(Commands::Check) => {}
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_parse_config_path() {
        let cli = Cli::try_parse_from(["ttscast", "config", "path"]).unwrap();
        match cli.command {
            Some(Commands::Config { action }) => match action {
                ConfigAction::Path => {}
                _ => panic!("Expected Path action"),
            },
            _ => panic!("Expected Config command"),
        }
    }

    #[test]
    fn test_parse_config_show() {
        let cli = Cli::try_parse_from(["ttscast", "config", "show"]).unwrap();
        match cli.command {
            Some(Commands::Config { action }) => match action {
                ConfigAction::Show => {}
                _ => panic!("Expected Show action"),
            },
            _ => panic!("Expected Config command"),
        }
    }

    #[test]
    fn test_config_requires_subcommand() {
        let result = Cli::try_parse_from(["ttscast", "config"]);
        let err = result.unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn test_parse_global_config() {
        let cli = Cli::try_parse_from(["ttscast", "--config", "/path/to/config.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
    }

    #[test]
    fn test_parse_global_quiet() {
        let cli = Cli::try_parse_from(["ttscast", "--quiet", "voices"]).unwrap();
        assert!(cli.quiet);
        match cli.command {
            Some(Commands::Voices) => {}
            _ => panic!("Expected Voices command"),
        }
    }

    #[test]
    fn test_invalid_subcommand_is_treated_as_text() {
        // A bare word is the text to speak, not a subcommand error
        let cli = Cli::try_parse_from(["ttscast", "hello"]).unwrap();
        assert_eq!(cli.text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_version_flag() {
        let result = Cli::try_parse_from(["ttscast", "--version"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_help_flag() {
        let result = Cli::try_parse_from(["ttscast", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
