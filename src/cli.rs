use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ConfigOverrides;

/// sitespec: generate a website specification document from a client brief.
///
/// The brief is a TOML form file (see `sitespec init`). The assembled prompt
/// is sent to a Gemini-compatible endpoint and the Markdown reply is
/// written out as-is and, optionally, rendered to HTML.
#[derive(Debug, Parser)]
#[command(name = "sitespec", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a specification from a form file.
    Generate(GenerateArgs),

    /// Print the prompt that `generate` would send, without calling the endpoint.
    Prompt(PromptArgs),

    /// Render a Markdown file to HTML with the built-in renderer.
    Render(RenderArgs),

    /// Write a sample form file to start from.
    Init(InitArgs),
}

/// Arguments for the `generate` subcommand.
///
/// Endpoint settings can also come from a config file or `SITESPEC_*` env
/// vars. Precedence: CLI > env > file > defaults.
#[derive(Debug, Clone, clap::Args)]
pub struct GenerateArgs {
    /// Path to the TOML form file describing the client.
    #[arg(long)]
    pub form: PathBuf,

    /// Path to a TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Model name (default: "gemini-2.5-flash").
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL of the generation API.
    #[arg(long)]
    pub api_base: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    pub request_timeout_sec: Option<u64>,

    /// Write the raw Markdown reply here. Without `--markdown` or `--html`
    /// the reply goes to stdout.
    #[arg(long)]
    pub markdown: Option<PathBuf>,

    /// Write the rendered reply here as a standalone HTML page.
    #[arg(long)]
    pub html: Option<PathBuf>,

    /// Escape HTML-significant characters in the reply before rendering.
    #[arg(long, default_value_t = false)]
    pub escape_html: bool,

    /// Log level filter (default: "info"). Supports tracing directives
    /// (e.g. "debug", "sitespec=trace,warn"). Overridden by SITESPEC_LOG.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Append structured JSON logs to this file in addition to stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl GenerateArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            model: self.model.clone(),
            api_base: self.api_base.clone(),
            request_timeout_sec: self.request_timeout_sec,
            escape_html: self.escape_html,
            log_level: self.log_level.clone(),
            log_file: self.log_file.clone(),
        }
    }
}

/// Arguments for the `prompt` subcommand.
#[derive(Debug, Clone, clap::Args)]
pub struct PromptArgs {
    /// Path to the TOML form file describing the client.
    #[arg(long)]
    pub form: PathBuf,

    /// Write the prompt to this file instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `render` subcommand.
#[derive(Debug, Clone, clap::Args)]
pub struct RenderArgs {
    /// Markdown file to render.
    pub input: PathBuf,

    /// Write the HTML to this file instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Escape HTML-significant characters before rendering.
    #[arg(long, default_value_t = false)]
    pub escape_html: bool,

    /// Wrap the fragment in a complete HTML page.
    #[arg(long, default_value_t = false)]
    pub standalone: bool,
}

/// Arguments for the `init` subcommand.
#[derive(Debug, Clone, clap::Args)]
pub struct InitArgs {
    /// Write the sample form here instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn generate_parses_form_and_outputs() {
        let cli = Cli::try_parse_from([
            "sitespec",
            "generate",
            "--form",
            "brief.toml",
            "--markdown",
            "out/spec.md",
            "--html",
            "out/spec.html",
        ])
        .expect("should parse valid args");

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.form, PathBuf::from("brief.toml"));
                assert_eq!(args.markdown, Some(PathBuf::from("out/spec.md")));
                assert_eq!(args.html, Some(PathBuf::from("out/spec.html")));
                assert!(args.config.is_none());
                assert!(!args.escape_html);
            }
            other => panic!("expected generate, got {other:?}"),
        }
    }

    #[test]
    fn generate_requires_form() {
        let err = Cli::try_parse_from(["sitespec", "generate"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn generate_overrides_carry_endpoint_flags() {
        let cli = Cli::try_parse_from([
            "sitespec",
            "generate",
            "--form",
            "brief.toml",
            "--model",
            "gemini-2.5-pro",
            "--api-base",
            "http://127.0.0.1:8080/v1beta",
            "--request-timeout-sec",
            "30",
            "--escape-html",
            "--log-level",
            "debug",
        ])
        .unwrap();

        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(
            args.overrides(),
            ConfigOverrides {
                model: Some("gemini-2.5-pro".to_owned()),
                api_base: Some("http://127.0.0.1:8080/v1beta".to_owned()),
                request_timeout_sec: Some(30),
                escape_html: true,
                log_level: Some("debug".to_owned()),
                log_file: None,
            }
        );
    }

    #[test]
    fn generate_rejects_non_numeric_timeout() {
        let err = Cli::try_parse_from([
            "sitespec",
            "generate",
            "--form",
            "brief.toml",
            "--request-timeout-sec",
            "soon",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn render_takes_positional_input() {
        let cli =
            Cli::try_parse_from(["sitespec", "render", "spec.md", "--standalone"]).unwrap();
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.input, PathBuf::from("spec.md"));
                assert!(args.standalone);
                assert!(args.output.is_none());
            }
            other => panic!("expected render, got {other:?}"),
        }
    }

    #[test]
    fn prompt_and_init_accept_output() {
        let cli = Cli::try_parse_from([
            "sitespec", "prompt", "--form", "a.toml", "--output", "p.txt",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Prompt(PromptArgs { output: Some(_), .. })
        ));

        let cli = Cli::try_parse_from(["sitespec", "init"]).unwrap();
        assert!(matches!(cli.command, Commands::Init(InitArgs { output: None })));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        let err = Cli::try_parse_from(["sitespec", "run"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }
}
