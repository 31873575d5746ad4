use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use moments_contracts::chat::{parse_intent, CHAT_HELP_COMMANDS};
use moments_contracts::content::GeneratedContent;
use moments_contracts::history::HistoryStore;
use moments_contracts::providers::ProviderKind;
use moments_engine::export::{copy_text, default_export_name, save_image};
use moments_engine::{EngineConfig, MarketingEngine, Resolution, SessionState};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "moments",
    version,
    about = "Marketing image and WeChat Moments copy generator"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive session driven by slash commands.
    Chat(ChatArgs),
    /// Generate one image and its copy, then exit.
    Run(RunArgs),
    /// Describe a local image and write copy for it.
    Caption(CaptionArgs),
    /// List saved generations, newest first.
    History(HistoryArgs),
}

#[derive(Debug, Clone, Args)]
struct EngineArgs {
    /// Directory holding history.json and events.jsonl.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    events: Option<PathBuf>,
    /// gemini or zhipu; overrides MOMENTS_PROVIDER.
    #[arg(long)]
    provider: Option<String>,
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Debug, Parser)]
struct RunArgs {
    #[command(flatten)]
    engine: EngineArgs,
    /// Also write the image to this path.
    #[arg(long)]
    save: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct CaptionArgs {
    #[arg(long)]
    image: PathBuf,
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Debug, Parser)]
struct HistoryArgs {
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    limit: Option<usize>,
}

fn main() {
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("moments error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MOMENTS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
        Command::Run(args) => run_once(args),
        Command::Caption(args) => run_caption(args),
        Command::History(args) => run_history(args),
    }
}

fn load_config(data_dir: Option<&Path>) -> Result<EngineConfig> {
    let mut config = EngineConfig::from_env()?;
    if let Some(dir) = data_dir {
        config = config.with_data_dir(dir);
    }
    Ok(config)
}

fn build_engine(args: &EngineArgs) -> Result<MarketingEngine> {
    let mut config = load_config(args.data_dir.as_deref())?;
    if let Some(raw) = args.provider.as_deref() {
        config.default_provider = raw.parse().map_err(anyhow::Error::msg)?;
    }
    let events_path = args.events.clone().unwrap_or_else(|| config.events_path());
    tracing::debug!(
        data_dir = %config.data_dir().display(),
        provider = %config.default_provider,
        max_retries = config.retry.max_retries,
        "engine configured"
    );
    MarketingEngine::with_events(&config, events_path)
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let mut engine = build_engine(&args.engine)?;
    let stdin = io::stdin();
    let mut line = String::new();

    println!(
        "Moments chat started ({}). Type /help for commands.",
        engine.active_provider().label()
    );

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        let intent = parse_intent(input);
        match intent.action.as_str() {
            "noop" => continue,
            "help" => {
                println!("Commands: {}", CHAT_HELP_COMMANDS.join(" "));
            }
            "generate_image" => {
                println!("Generating image with {}...", engine.active_provider().label());
                report_step(engine.generate_image(), engine.session());
            }
            "upload_image" => {
                let Some(path) = intent.arg_str("path") else {
                    println!("/upload requires a path");
                    continue;
                };
                println!("Analyzing {path}...");
                match engine.upload_image(Path::new(path)) {
                    Ok(resolution) => report_step(resolution, engine.session()),
                    Err(err) => println!("Upload failed: {err:#}"),
                }
            }
            "clear_upload" => {
                engine.clear_uploaded_image();
                println!("Cleared. Generate a new image or upload one.");
            }
            "generate_text" => {
                println!("Writing copy...");
                match engine.generate_text() {
                    Resolution::Applied(content) => {
                        print_content(&content);
                        if let Some(message) = engine.session().error_message() {
                            println!("{message}");
                        }
                    }
                    Resolution::Failed(err) => println!(
                        "{}",
                        engine
                            .session()
                            .error_message()
                            .map(str::to_string)
                            .unwrap_or_else(|| err.to_string())
                    ),
                    Resolution::Stale => println!("(result discarded)"),
                }
            }
            "list_history" => print_history(engine.history().items(), None),
            "restore_history" => {
                let Some(key) = intent.arg_str("key") else {
                    println!("/restore requires a history number or id");
                    continue;
                };
                match engine.select_history(key) {
                    Some(content) => print_content(&content),
                    None => println!("No history entry matches '{key}'."),
                }
            }
            "set_provider" => match intent.arg_str("provider") {
                None => println!(
                    "Provider: {} (choices: {})",
                    engine.active_provider(),
                    ProviderKind::ALL
                        .iter()
                        .map(|kind| kind.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                Some(raw) => match raw.parse::<ProviderKind>() {
                    Ok(kind) => {
                        engine.select_provider(kind);
                        println!("Provider set to {}", kind.label());
                    }
                    Err(message) => println!("{message}"),
                },
            },
            "show_status" => {
                for row in status_lines(engine.session(), engine.active_provider()) {
                    println!("{row}");
                }
            }
            "copy_text" => match copy_text(engine.session().current()) {
                Some(text) => println!("{text}"),
                None => println!("Nothing to copy yet."),
            },
            "save_image" => {
                let Some(image_url) = engine.session().display_image_url() else {
                    println!("No image to save yet.");
                    continue;
                };
                let target = intent
                    .arg_str("path")
                    .map(PathBuf::from)
                    .unwrap_or_else(default_export_name);
                match save_image(image_url, &target) {
                    Ok(bytes) => println!("Saved {bytes} bytes to {}", target.display()),
                    Err(err) => println!("Save failed: {err:#}"),
                }
            }
            "quit" => break,
            _ => {
                println!("Unknown command: {}", intent.raw.trim());
            }
        }
    }

    Ok(())
}

fn report_step(resolution: Resolution<()>, session: &SessionState) {
    match resolution {
        Resolution::Applied(()) => {
            for row in image_lines(session) {
                println!("{row}");
            }
            println!("Type /text to write the copy.");
        }
        Resolution::Failed(err) => println!(
            "{}",
            session
                .error_message()
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string())
        ),
        Resolution::Stale => println!("(result discarded)"),
    }
}

fn run_once(args: RunArgs) -> Result<i32> {
    let mut engine = build_engine(&args.engine)?;
    if let Resolution::Failed(err) = engine.generate_image() {
        eprintln!("{}", engine.session().error_message().unwrap_or(&err.to_string()));
        return Ok(1);
    }
    for row in image_lines(engine.session()) {
        println!("{row}");
    }
    finish_with_text(&mut engine, args.save.as_deref())
}

fn run_caption(args: CaptionArgs) -> Result<i32> {
    let mut engine = build_engine(&args.engine)?;
    match engine.upload_image(&args.image)? {
        Resolution::Applied(()) => {}
        Resolution::Failed(err) => {
            eprintln!("{}", engine.session().error_message().unwrap_or(&err.to_string()));
            return Ok(1);
        }
        Resolution::Stale => return Ok(1),
    }
    for row in image_lines(engine.session()) {
        println!("{row}");
    }
    finish_with_text(&mut engine, None)
}

fn finish_with_text(engine: &mut MarketingEngine, save: Option<&Path>) -> Result<i32> {
    match engine.generate_text() {
        Resolution::Applied(content) => {
            print_content(&content);
            if let Some(message) = engine.session().error_message() {
                eprintln!("{message}");
            }
            if let Some(target) = save {
                let bytes = save_image(&content.image_url, target)
                    .with_context(|| format!("failed to save image to {}", target.display()))?;
                println!("Saved {bytes} bytes to {}", target.display());
            }
            Ok(0)
        }
        Resolution::Failed(err) => {
            eprintln!("{}", engine.session().error_message().unwrap_or(&err.to_string()));
            Ok(1)
        }
        Resolution::Stale => Ok(1),
    }
}

fn run_history(args: HistoryArgs) -> Result<i32> {
    let config = load_config(args.data_dir.as_deref())?;
    let history = HistoryStore::load(config.history_path());
    if history.is_empty() {
        println!("No history yet.");
        return Ok(0);
    }
    print_history(history.items(), args.limit);
    Ok(0)
}

fn print_history(items: &[GeneratedContent], limit: Option<usize>) {
    for row in history_lines(items, limit) {
        println!("{row}");
    }
}

fn history_lines(items: &[GeneratedContent], limit: Option<usize>) -> Vec<String> {
    if items.is_empty() {
        return vec!["No history yet.".to_string()];
    }
    items
        .iter()
        .take(limit.unwrap_or(items.len()))
        .enumerate()
        .map(|(index, item)| {
            let marker = if item.is_uploaded { " (uploaded)" } else { "" };
            format!("{:>3}. {}{marker}", index + 1, item.summary_line())
        })
        .collect()
}

fn image_lines(session: &SessionState) -> Vec<String> {
    let mut rows = vec![format!("Theme: {}", session.display_theme())];
    if let Some(description) = session.description_preview() {
        rows.push(format!("Description: {description}"));
    }
    if let Some(url) = session.display_image_url() {
        rows.push(format!("Image: {}", preview_url(url)));
    }
    rows
}

fn status_lines(session: &SessionState, provider: ProviderKind) -> Vec<String> {
    let mut rows = vec![
        format!("Provider: {}", provider.label()),
        format!("Status: {}", session.status().as_str()),
    ];
    if session.display_image_url().is_some() {
        rows.extend(image_lines(session));
    }
    if let Some(advantage) = session.current().advantage_used.as_deref() {
        rows.push(format!("Selling point: {advantage}"));
    }
    if let Some(message) = session.error_message() {
        rows.push(format!("Error: {message}"));
    }
    rows.push(format!(
        "Copy ready: {}",
        if session.can_generate_text() { "yes (/text)" } else { "no" }
    ));
    rows
}

/// Inline payloads are far too long for a terminal line.
fn preview_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("data:") {
        let mime = rest.split(';').next().unwrap_or("image");
        return format!("<inline {mime}, {} chars>", url.len());
    }
    url.to_string()
}

fn print_content(content: &GeneratedContent) {
    println!("Theme: {}", content.theme);
    println!("Selling point: {}", content.advantage_used);
    println!();
    println!("{}", content.copy_text());
}
