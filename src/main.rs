use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use sitespec::cli::{Cli, Commands, GenerateArgs, InitArgs, PromptArgs, RenderArgs};
use sitespec::client::GeminiClient;
use sitespec::config::SitespecConfig;
use sitespec::form::{self, SpecFormData};
use sitespec::markdown::{self, RenderOptions};
use sitespec::output;
use sitespec::prompt;
use sitespec::session::{Session, Status, run_cycle};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // No-op when a command already initialized logging.
            let _ = sitespec::logging::init(None, None);
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => generate(&args),
        Commands::Prompt(args) => print_prompt(&args),
        Commands::Render(args) => render(&args),
        Commands::Init(args) => init_form(&args),
    }
}

fn generate(args: &GenerateArgs) -> anyhow::Result<()> {
    let config = SitespecConfig::load(args.config.as_deref(), &args.overrides())?;

    sitespec::logging::init(config.log_level.as_deref(), config.log_file.as_deref())?;

    config.validate()?;
    let api_key = config.resolve_api_key()?;

    info!(
        form = %args.form.display(),
        model = %config.model,
        api_base = %config.api_base,
        timeout_sec = config.request_timeout_sec,
        escape_html = config.escape_html,
        "config loaded"
    );

    let form = form::load_form_file(&args.form)?;
    let client = GeminiClient::new(&config.endpoint_settings(), api_key)?;

    let session = run_cycle(&Session::new(form), &client)?;
    let source = match &session.status {
        Status::Ready { source } => source,
        Status::Failed { message } => anyhow::bail!("{message}"),
        other => anyhow::bail!("generation ended in unexpected state {other:?}"),
    };

    if args.markdown.is_none() && args.html.is_none() {
        return write_stdout(source);
    }
    if let Some(path) = &args.markdown {
        output::write_atomic(path, source)?;
        info!(path = %path.display(), "wrote markdown");
    }
    if let Some(path) = &args.html {
        let fragment = markdown::render_with(source, config.render_options());
        let page = output::html_document(&document_title(&session.form), &fragment);
        output::write_atomic(path, &page)?;
        info!(path = %path.display(), "wrote html");
    }
    Ok(())
}

fn print_prompt(args: &PromptArgs) -> anyhow::Result<()> {
    sitespec::logging::init(None, None)?;

    let form = form::load_form_file(&args.form)?;
    let text = prompt::website_spec(&form);
    emit(args.output.as_deref(), &text)
}

fn render(args: &RenderArgs) -> anyhow::Result<()> {
    sitespec::logging::init(None, None)?;

    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let options = RenderOptions {
        escape_html: args.escape_html,
    };
    let fragment = markdown::render_with(&source, options);

    let html = if args.standalone {
        let title = args
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Website Specification".to_owned());
        output::html_document(&title, &fragment)
    } else {
        fragment
    };
    emit(args.output.as_deref(), &html)
}

fn init_form(args: &InitArgs) -> anyhow::Result<()> {
    sitespec::logging::init(None, None)?;

    let toml = SpecFormData::sample().to_toml()?;
    emit(args.output.as_deref(), &toml)
}

fn document_title(form: &SpecFormData) -> String {
    let client = form.client_name.trim();
    if client.is_empty() {
        "Website Specification".to_owned()
    } else {
        format!("{client} Website Specification")
    }
}

/// Write to `path` when given, otherwise to stdout.
fn emit(path: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match path {
        Some(p) => {
            output::write_atomic(p, text)?;
            info!(path = %p.display(), bytes = text.len(), "wrote output");
            Ok(())
        }
        None => write_stdout(text),
    }
}

fn write_stdout(text: &str) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
