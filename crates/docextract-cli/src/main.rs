use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docextract_core::config_file::{self, ConfigFile};
use docextract_core::{
    Config, ExtractionDispatcher, GenerativeKind, PdfBackend, Provider, StructuredExtractor,
};
use docextract_pdf_mupdf::MupdfBackend;

mod output;
mod settings;

use output::{ColorMode, ProviderState};
use settings::Overrides;

/// Extract text from PDFs with local or cloud providers, and parse
/// brokerage statements into transactions with a generative model.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Read configuration from this TOML file instead of the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// HTTP request timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract text from a PDF
    Extract {
        /// Path to the PDF
        file_path: PathBuf,

        /// Provider: local, azure, adobe, amazon, google, google-statement
        #[arg(short, long, default_value = "local")]
        provider: String,

        /// Print the full {text, rawResponse} envelope as JSON
        #[arg(long)]
        json: bool,

        /// Also parse the extracted text into transactions with this backend
        #[arg(long, value_name = "BACKEND")]
        transactions: Option<String>,

        /// Give up on polled jobs after this many seconds (0 waits forever)
        #[arg(long)]
        max_wait_secs: Option<u64>,
    },

    /// Parse statement text into transactions
    Transactions {
        /// Text file to parse, or `-` for stdin
        file_path: String,

        /// Generative backend: anthropic or openai
        #[arg(short, long, default_value = "anthropic")]
        backend: String,

        /// Print the model reply as-is, without locating or validating JSON
        #[arg(long)]
        raw: bool,

        /// Give up on polled runs after this many seconds (0 waits forever)
        #[arg(long)]
        max_wait_secs: Option<u64>,
    },

    /// List providers and generative backends and whether each is configured
    Providers,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_file_config(path: Option<&Path>) -> anyhow::Result<ConfigFile> {
    match path {
        Some(p) => Ok(config_file::try_load_from_path(p)?),
        None => Ok(config_file::load_config()),
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging();

    let color = ColorMode(!cli.no_color);
    let file = load_file_config(cli.config.as_deref())?;

    match cli.command {
        Command::Extract {
            file_path,
            provider,
            json,
            transactions,
            max_wait_secs,
        } => {
            let overrides = Overrides {
                max_wait_secs,
                request_timeout_secs: cli.timeout_secs,
            };
            let config = settings::resolve(&file, &overrides, env_var);
            extract(&config, &file_path, &provider, json, transactions, color).await
        }
        Command::Transactions {
            file_path,
            backend,
            raw,
            max_wait_secs,
        } => {
            let overrides = Overrides {
                max_wait_secs,
                request_timeout_secs: cli.timeout_secs,
            };
            let config = settings::resolve(&file, &overrides, env_var);
            parse_transactions(&config, &file_path, &backend, raw).await
        }
        Command::Providers => {
            let overrides = Overrides {
                max_wait_secs: None,
                request_timeout_secs: cli.timeout_secs,
            };
            let config = settings::resolve(&file, &overrides, env_var);
            list_providers(&config, color)
        }
    }
}

async fn extract(
    config: &Config,
    file_path: &Path,
    provider: &str,
    json: bool,
    transactions: Option<String>,
    color: ColorMode,
) -> anyhow::Result<()> {
    let provider: Provider = provider.parse()?;
    let structured = match transactions {
        Some(name) => {
            let kind: GenerativeKind = name.parse()?;
            Some(StructuredExtractor::from_config(config, kind)?)
        }
        None => None,
    };

    if !file_path.exists() {
        anyhow::bail!("File not found: {}", file_path.display());
    }
    let document = std::fs::read(file_path)?;

    let config = settings::restrict(config, provider);
    tracing::debug!(?config, "resolved configuration");
    if !settings::has_section(&config, provider) {
        anyhow::bail!(
            "provider {} is not configured (set its environment variables or config section)",
            provider
        );
    }
    let local_backend: Option<Arc<dyn PdfBackend>> = if provider == Provider::Local {
        Some(Arc::new(MupdfBackend))
    } else {
        None
    };
    let dispatcher = ExtractionDispatcher::from_config(&config, local_backend)?;

    let bar = output::spinner(format!(
        "Extracting {} with {}...",
        file_path.display(),
        provider
    ));
    let result = dispatcher.extract_with(&document, provider).await;
    bar.finish_and_clear();
    let result = result?;

    let records = match structured {
        Some(extractor) => {
            let bar = output::spinner(format!(
                "Parsing transactions with {}...",
                extractor.backend_name()
            ));
            let records = extractor.parse_transactions(&result.text).await;
            bar.finish_and_clear();
            Some(records?)
        }
        None => None,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        output::print_envelope(&mut out, &result, records.as_deref())?;
    } else if let Some(ref records) = records {
        output::print_transactions(&mut out, records)?;
    } else {
        let stderr = std::io::stderr();
        let mut status = stderr.lock();
        output::print_text(&mut out, &mut status, provider, &result, color)?;
    }
    out.flush()?;
    Ok(())
}

fn read_text(file_path: &str) -> anyhow::Result<String> {
    if file_path == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    let path = Path::new(file_path);
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    Ok(std::fs::read_to_string(path)?)
}

async fn parse_transactions(
    config: &Config,
    file_path: &str,
    backend: &str,
    raw: bool,
) -> anyhow::Result<()> {
    let kind: GenerativeKind = backend.parse()?;
    let extractor = StructuredExtractor::from_config(config, kind)?;
    let text = read_text(file_path)?;
    if text.trim().is_empty() {
        anyhow::bail!("no text to parse in {}", file_path);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let bar = output::spinner(format!("Asking {}...", extractor.backend_name()));
    if raw {
        let completion = extractor.complete(&text).await;
        bar.finish_and_clear();
        output::print_raw(&mut out, &completion?.text)?;
    } else {
        let records = extractor.parse_transactions(&text).await;
        bar.finish_and_clear();
        output::print_transactions(&mut out, &records?)?;
    }
    out.flush()?;
    Ok(())
}

/// Build each provider and backend on its own so one broken section does
/// not hide the state of the others. Nothing here touches the network.
fn list_providers(config: &Config, color: ColorMode) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for provider in Provider::ALL {
        let state = if provider == Provider::Local {
            ProviderState::Ready
        } else if !settings::has_section(config, provider) {
            ProviderState::Missing
        } else {
            match ExtractionDispatcher::from_config(&settings::restrict(config, provider), None) {
                Ok(d) if d.is_configured(provider) => ProviderState::Ready,
                Ok(_) => ProviderState::Missing,
                Err(e) => ProviderState::Invalid(e.to_string()),
            }
        };
        output::print_provider_status(&mut out, provider.name(), &state, color)?;
    }

    for kind in GenerativeKind::ALL {
        let present = match kind {
            GenerativeKind::Anthropic => config.anthropic.is_some(),
            GenerativeKind::OpenAi => config.openai.is_some(),
        };
        let state = if !present {
            ProviderState::Missing
        } else {
            match StructuredExtractor::from_config(config, kind) {
                Ok(_) => ProviderState::Ready,
                Err(e) => ProviderState::Invalid(e.to_string()),
            }
        };
        output::print_provider_status(&mut out, kind.name(), &state, color)?;
    }
    out.flush()?;
    Ok(())
}
