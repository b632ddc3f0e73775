//! CLI entry point for the Atende assistants (for dev and testing).

use std::error::Error;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use atende_core::{
    app_data_dir, build_index, load_config, save_config, status, Config, Corpus, FactAccumulator, FactUpdate,
    FaqSession, LeadSession, OllamaClient, Responder, ResponderOptions, Retriever, VectorIndex,
};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "atende")]
#[command(about = "Atende: FAQ consultant and commercial agent over Ollama")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Args)]
struct IndexArgs {
    /// Corpus file (.toml or .yaml). Defaults to the configured corpus, then the built-in FAQ.
    #[arg(long, value_name = "PATH")]
    corpus: Option<PathBuf>,
    /// Where the index is persisted. Defaults to the configured path.
    #[arg(long, value_name = "PATH")]
    index: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show backend status (for dev).
    Status,
    /// Show where Atende stores its config and index (app data directory).
    DataDir,
    /// Write the current config (defaults for missing fields) to config.toml in the app data directory.
    InitConfig,
    /// Embed the corpus and persist the index, or load it if it already exists.
    BuildIndex {
        #[command(flatten)]
        args: IndexArgs,
    },
    /// Print the corpus entry closest to a question.
    Ask {
        #[arg(value_name = "QUESTION")]
        query: String,
        #[command(flatten)]
        args: IndexArgs,
    },
    /// Chat on stdin with one of the assistants.
    Chat {
        #[arg(long, value_enum, default_value_t = Mode::Faq)]
        mode: Mode,
        #[command(flatten)]
        args: IndexArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Answers from the FAQ corpus.
    Faq,
    /// Qualifies a lead and shows the collected facts.
    Lead,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config();

    let result = match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => {
            println!("Atende backend");
            println!("  core: {}", status());
            println!("  ollama: {}", config.ollama_url);
            Ok(())
        }
        Commands::DataDir => {
            match app_data_dir() {
                Some(p) => println!("{}", p.display()),
                None => eprintln!("Could not determine app data directory."),
            }
            Ok(())
        }
        Commands::InitConfig => save_config(&config).map_err(Box::<dyn Error>::from).map(|path| {
            println!("Config written to {}", path.display());
        }),
        Commands::BuildIndex { args } => open_index(&config, &args).await.map(|(_, index, _)| {
            println!("Index ready: {} entries, {} dimensions", index.len(), index.dimensions());
        }),
        Commands::Ask { query, args } => ask(&config, &args, &query).await,
        Commands::Chat { mode: Mode::Faq, args } => chat_faq(&config, &args).await,
        Commands::Chat { mode: Mode::Lead, .. } => chat_lead(&config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn open_index(config: &Config, args: &IndexArgs) -> Result<(Corpus, VectorIndex, OllamaClient), Box<dyn Error>> {
    let client = OllamaClient::from_config(config)?;
    let corpus_path = args.corpus.clone().or_else(|| config.corpus_path());
    let corpus = Corpus::load_or_builtin(corpus_path.as_deref())?;
    let index_path = match &args.index {
        Some(p) => p.clone(),
        None => config.resolve_index_path()?,
    };
    let index = build_index(&corpus, &index_path, &client, client.embed_model()).await?;
    Ok((corpus, index, client))
}

async fn ask(config: &Config, args: &IndexArgs, query: &str) -> Result<(), Box<dyn Error>> {
    let (corpus, index, client) = open_index(config, args).await?;
    let retriever = Retriever::new(&corpus, &index, &client)?;
    let hit = retriever.retrieve_entry(query).await?;
    println!("#{} (distance {:.4})", hit.position, hit.distance);
    println!("  Q: {}", hit.entry.question);
    println!("  A: {}", hit.entry.answer);
    Ok(())
}

async fn chat_faq(config: &Config, args: &IndexArgs) -> Result<(), Box<dyn Error>> {
    let (corpus, index, client) = open_index(config, args).await?;
    let mut session = FaqSession::new(
        Retriever::new(&corpus, &index, &client)?,
        Responder::new(&client, ResponderOptions::faq().configured(config)),
    );
    println!("Pergunte o que quiser sobre a PierX (Ctrl+D para sair).");
    while let Some(line) = read_line()? {
        match session.turn(&line).await {
            Ok(reply) => println!("{}\n", reply),
            Err(e) => println!("{}\n", e.user_message()),
        }
    }
    Ok(())
}

async fn chat_lead(config: &Config) -> Result<(), Box<dyn Error>> {
    let client = OllamaClient::from_config(config)?;
    let merger = client.clone().with_chat_model(config.merge_model());
    let mut session = LeadSession::new(
        Responder::new(client, ResponderOptions::lead().configured(config)),
        FactAccumulator::new(merger),
        config.greeting(),
    );
    if let Some(greeting) = session.history().turns().first() {
        println!("{}\n", greeting.content);
    }
    while let Some(line) = read_line()? {
        match session.turn(&line).await {
            Ok(turn) => {
                println!("{}\n", turn.reply);
                if let FactUpdate::Kept(e) = &turn.facts {
                    eprintln!("(lead data unchanged: {})", e);
                }
                eprintln!("Lead data: {}", serde_json::to_string_pretty(session.record())?);
            }
            Err(e) => println!("{}\n", e.user_message()),
        }
    }
    Ok(())
}

/// Next non-empty line from stdin, or `None` at end of input.
fn read_line() -> std::io::Result<Option<String>> {
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim();
        if !line.is_empty() {
            return Ok(Some(line.to_string()));
        }
    }
}
