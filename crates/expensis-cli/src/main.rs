use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use expensis_core::{
    Analyzer, ChatClient, CompletionClient, Config, ExtractedStatement, config_file,
    validate_statement,
};
use expensis_ingest::StatementInput;

mod output;

use output::ColorMode;

/// Bank statement analyzer: extract transactions from PDFs and analyze spending
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a statement (.json, .csv, or .pdf)
    Analyze {
        /// Path to the statement file
        file_path: PathBuf,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Extract transactions from a PDF statement
    Extract {
        /// Path to the PDF
        file_path: PathBuf,

        /// Print the transactions as JSON
        #[arg(long)]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Show the resolved configuration (API key redacted)
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config_file::resolve_from_env();

    match cli.command {
        Command::Analyze {
            file_path,
            json,
            no_color,
        } => analyze(&config, &file_path, json, ColorMode(!no_color && !json)).await,
        Command::Extract {
            file_path,
            json,
            no_color,
        } => extract(&config, &file_path, json, ColorMode(!no_color && !json)).await,
        Command::Config => {
            let mut stdout = std::io::stdout().lock();
            if let Some(path) = config_file::config_path() {
                writeln!(stdout, "# config file: {}", path.display())?;
            }
            output::print_config(&mut stdout, &config)?;
            Ok(())
        }
    }
}

fn completion_client(config: &Config) -> anyhow::Result<Arc<dyn CompletionClient>> {
    let chat = ChatClient::from_config(config, reqwest::Client::new())
        .context("set DEEPSEEK_API_URL and DEEPSEEK_API_KEY, or [completion] in .expensis.toml")?;
    Ok(Arc::new(chat))
}

async fn extract_pdf(
    config: &Config,
    llm: Arc<dyn CompletionClient>,
    data: Vec<u8>,
) -> anyhow::Result<ExtractedStatement> {
    let extractor = expensis_ingest::default_extractor(config, llm)?;
    Ok(extractor.extract(data).await?)
}

async fn analyze(
    config: &Config,
    file_path: &Path,
    json: bool,
    color: ColorMode,
) -> anyhow::Result<()> {
    let llm = completion_client(config)?;

    let input = expensis_ingest::read_statement(file_path)
        .with_context(|| format!("could not load {}", file_path.display()))?;

    let analyzer = Analyzer::new(llm.clone());
    let result = match input {
        StatementInput::Records(records) => {
            let statement = serde_json::Value::Array(records);
            let records = validate_statement(&statement)?;
            analyzer.analyze(records).await?
        }
        StatementInput::Pdf(data) => {
            let extracted = extract_pdf(config, llm, data).await?;
            eprintln!(
                "Extracted {} transactions ({})",
                extracted.transactions.len(),
                extracted.method
            );
            analyzer.analyze_transactions(extracted.transactions).await?
        }
    };

    let mut stdout = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &result)?;
        writeln!(stdout)?;
    } else {
        output::print_analysis(&mut stdout, &result, color)?;
    }
    Ok(())
}

async fn extract(
    config: &Config,
    file_path: &Path,
    json: bool,
    color: ColorMode,
) -> anyhow::Result<()> {
    if !expensis_ingest::is_pdf_path(file_path) {
        anyhow::bail!("{} is not a PDF", file_path.display());
    }
    let data = std::fs::read(file_path)
        .with_context(|| format!("could not read {}", file_path.display()))?;

    let llm = completion_client(config)?;
    let extracted = extract_pdf(config, llm, data).await?;

    let mut stdout = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &extracted.transactions)?;
        writeln!(stdout)?;
    } else {
        let name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file_path.display().to_string());
        output::print_extraction(&mut stdout, &name, &extracted, color)?;
    }
    Ok(())
}
