use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use colored::*;
use log::{info, warn};

mod auth;
mod config;
mod error;
mod event_bus;
mod forms;
mod generator;
mod llm_manager;
mod logger;
mod preview;
mod providers;
mod schema;
mod session;
mod ui;

use auth::{OAuthClientConfig, TokenResponse};
use config::Config;
use error::FormGenieError;
use event_bus::{EventBus, EventEmitter};
use forms::FormsClient;
use generator::FormGenerator;
use llm_manager::LLMProvider;
use preview::FormPreview;
use providers::gemini::GeminiProvider;
use schema::FormSchema;
use session::Session;
use ui::StatusUI;

#[derive(Parser)]
#[command(name = "form_genie", about = "Instantly convert text to forms with AI")]
struct Args {
    /// Run without spinners or colors
    #[arg(long, global = true)]
    headless: bool,
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a form schema from free-form text and preview it
    Generate {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Preview a saved form schema
    Preview {
        /// JSON schema file
        file: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Publish a saved form schema to Google Forms
    Publish {
        /// JSON schema file
        file: PathBuf,
        #[command(flatten)]
        token: TokenArgs,
    },
    /// Print the Google sign-in URL for obtaining an access token
    AuthUrl,
    /// Generate, preview and optionally publish in one go
    Run {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
        /// Publish the generated form to Google Forms
        #[arg(long)]
        publish: bool,
        #[command(flatten)]
        token: TokenArgs,
    },
}

#[derive(ClapArgs)]
struct InputArgs {
    /// Text file to read, or `-` for stdin (default)
    file: Option<PathBuf>,
    /// Use the built-in sample survey instead of reading input
    #[arg(long, conflicts_with = "file")]
    sample: bool,
}

#[derive(ClapArgs)]
struct OutputArgs {
    /// Print the schema as JSON instead of the preview
    #[arg(long)]
    json: bool,
    /// Write the schema JSON to a file
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Copy the schema JSON to the clipboard
    #[arg(long)]
    copy: bool,
}

#[derive(ClapArgs)]
struct TokenArgs {
    /// OAuth access token (defaults to GOOGLE_OAUTH_TOKEN)
    #[arg(long, env = "GOOGLE_OAUTH_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(args.verbose);

    let mut config = Config::load(&args.config)?;
    config.merge_with_args(args.headless);
    if !config.ui.colorful {
        colored::control::set_override(false);
    }

    let oauth = OAuthClientConfig::load(&config.oauth.client_config).await;
    let bus = Arc::new(EventBus::new(64));
    let mut ui = StatusUI::new(args.headless, config.ui.spinners);
    ui.start(&bus);

    let generator = build_generator(&config);
    let mut session = Session::new(generator, FormsClient::new(&config.forms), oauth);
    session.set_event_bus(bus.clone());

    let result = run(args.command, &mut session, &config).await;

    let metrics = bus.get_metrics().await;
    info!(
        "Session summary - generated: {}, published: {}, failures: {}",
        metrics.forms_generated,
        metrics.forms_published,
        metrics.generation_failures + metrics.publish_failures
    );
    drop(session);
    drop(bus);
    ui.finish().await;

    if let Err(e) = result {
        match e.downcast_ref::<FormGenieError>() {
            Some(err) => ui.display_error(&err.to_string()),
            None => ui.display_error(&format!("{:#}", e)),
        }
        std::process::exit(1);
    }
    Ok(())
}

fn build_generator(config: &Config) -> FormGenerator {
    let provider = config::gemini_api_key().map(|key| {
        Arc::new(GeminiProvider::new(key, &config.gemini)) as Arc<dyn LLMProvider>
    });
    FormGenerator::new(provider)
}

async fn run(command: Command, session: &mut Session, config: &Config) -> Result<()> {
    let preview = FormPreview::new(config.ui.colorful);
    match command {
        Command::Generate { input, output } => {
            load_input(session, &input)?;
            let schema = session.generate().await?.clone();
            emit_output(&preview, &schema, &output)?;
        }
        Command::Preview { file, output } => match read_saved(&file)? {
            Some(schema) => emit_output(&preview, &schema, &output)?,
            None => println!("{}", preview.render(None)),
        },
        Command::Publish { file, token } => {
            session.schema = Some(load_schema(&file)?);
            sign_in(session, &token, &config.oauth.redirect_uri).await?;
            publish(session).await?;
        }
        Command::AuthUrl => {
            let url = session.oauth().authorization_url(&config.oauth.redirect_uri)?;
            println!("{}", url);
        }
        Command::Run { input, output, publish: should_publish, token } => {
            load_input(session, &input)?;
            let schema = session.generate().await?.clone();
            emit_output(&preview, &schema, &output)?;
            if should_publish {
                sign_in(session, &token, &config.oauth.redirect_uri).await?;
                publish(session).await?;
            }
        }
    }
    Ok(())
}

fn load_input(session: &mut Session, input: &InputArgs) -> Result<()> {
    if input.sample {
        session.use_sample();
        return Ok(());
    }
    let text = match &input.file {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?,
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read input from stdin")?;
            text
        }
    };
    session.set_input(text);
    Ok(())
}

fn read_saved(path: &PathBuf) -> Result<Option<FormSchema>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema file: {}", path.display()))?;
    FormSchema::from_saved(&json)
        .with_context(|| format!("Failed to parse schema file: {}", path.display()))
}

fn load_schema(path: &PathBuf) -> Result<FormSchema> {
    read_saved(path)?.ok_or_else(|| {
        FormGenieError::Validation(format!("No form in {}. Generate one first.", path.display()))
            .into()
    })
}

fn emit_output(preview: &FormPreview, schema: &FormSchema, output: &OutputArgs) -> Result<()> {
    let json = preview::render_json(schema)?;
    if output.json {
        println!("{}", json);
    } else {
        println!("{}", preview.render(Some(schema)));
    }
    if let Some(path) = &output.out {
        std::fs::write(path, &json)
            .with_context(|| format!("Failed to write schema to {}", path.display()))?;
        eprintln!("{} Schema written to {}", "✓".green(), path.display());
    }
    if output.copy {
        match preview::copy_to_clipboard(&json) {
            Ok(()) => eprintln!("{} Copied!", "✓".green()),
            Err(e) => warn!("{:#}", e),
        }
    }
    Ok(())
}

async fn sign_in(session: &mut Session, token: &TokenArgs, redirect_uri: &str) -> Result<()> {
    let Some(access_token) = token.token.clone() else {
        let url = session.oauth().authorization_url(redirect_uri)?;
        return Err(FormGenieError::Auth(format!(
            "No access token. Sign in at {} and pass the token with --token or GOOGLE_OAUTH_TOKEN.",
            url
        ))
        .into());
    };
    session
        .sign_in(TokenResponse {
            access_token: Some(access_token),
            ..TokenResponse::default()
        })
        .await?;
    Ok(())
}

async fn publish(session: &mut Session) -> Result<()> {
    let url = session.publish().await?;
    println!(
        "{} Your form is ready: {}",
        "Success!".green().bold(),
        url.bright_white().underline()
    );
    Ok(())
}
