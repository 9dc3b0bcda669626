// ABOUTME: Simple REPL for exercising selectstream against a backend or a captured body.
// ABOUTME: Reads .selectstream.json, streams chat turns and comparisons, Ctrl-C cancels.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rustyline::DefaultEditor;
use tracing::info;

use selectstream::prelude::*;

const REPLAY_ENV: &str = "SELECTSTREAM_REPLAY";
const REPLAY_CHUNK_SIZE: usize = 7;
const REDRAW_INTERVAL: Duration = Duration::from_millis(50);

fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from(".selectstream.json");
    if local.exists() {
        return Some(local);
    }

    if let Some(home) = dirs::home_dir() {
        let global = home.join(".selectstream.json");
        if global.exists() {
            return Some(global);
        }
    }

    None
}

fn load_config() -> Result<ClientConfig> {
    match find_config() {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            ClientConfig::load(&path).with_context(|| format!("reading {}", path.display()))
        }
        None => Ok(ClientConfig::from_env()),
    }
}

/// Where stream bodies come from.
enum Backend {
    Live,
    /// Replays one captured body for every request.
    Replay {
        transport: Arc<ReplayTransport>,
        body: Vec<u8>,
    },
}

impl Backend {
    fn prepare(&self, route: Route) {
        if let Backend::Replay { transport, body } = self {
            transport.push(route, Reply::chunked(body, REPLAY_CHUNK_SIZE));
        }
    }
}

fn connect() -> Result<(StreamClient, Backend)> {
    if let Ok(path) = std::env::var(REPLAY_ENV) {
        let body = std::fs::read(&path).with_context(|| format!("reading {}", path))?;
        println!("Replaying {} ({} bytes)", path, body.len());
        let transport = Arc::new(ReplayTransport::new());
        let client = StreamClient::with_shared_transport(transport.clone());
        return Ok((client, Backend::Replay { transport, body }));
    }

    let config = load_config()?;
    println!("Backend: {}", config.base_url);
    Ok((StreamClient::new(config)?, Backend::Live))
}

/// Parse `openai:gpt-4o,anthropic:claude-sonnet` into selections.
fn parse_selections(input: &str) -> Result<Vec<ModelSelection>> {
    input.split(',')
        .map(|pair| match pair.split_once(':') {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
                Ok(ModelSelection::new(provider, model))
            }
            _ => bail!("expected provider:model, got '{}'", pair),
        })
        .collect()
}

async fn stream_chat(handle: &ChatStreamHandle) -> Result<ChatSessionState> {
    let mut printed = 0;
    let mut ticker = tokio::time::interval(REDRAW_INTERVAL);

    loop {
        tokio::select! {
            _ = handle.changed() => {}
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
            }
        }

        let state = handle.state();
        if state.text.len() > printed {
            print!("{}", &state.text[printed..]);
            std::io::stdout().flush()?;
            printed = state.text.len();
        }
        if state.status.is_terminal() {
            println!();
            return Ok(state);
        }
    }
}

async fn stream_comparison(handle: &ComparisonStreamHandle) -> Result<ComparisonSessionState> {
    let mut ticker = tokio::time::interval(REDRAW_INTERVAL);
    let mut last = Vec::new();

    loop {
        tokio::select! {
            _ = handle.changed() => {}
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
            }
        }

        let state = handle.state();
        let progress: Vec<(usize, ProviderStatus)> = state
            .providers
            .iter()
            .map(|p| (p.response.len(), p.status))
            .collect();
        if progress != last {
            let line: Vec<String> = state
                .providers
                .iter()
                .map(|p| format!("{} {:?} {}b", p.label, p.status, p.response.len()))
                .collect();
            println!("  {}", line.join(" | "));
            last = progress;
        }
        if state.status.is_terminal() {
            return Ok(state);
        }
    }
}

fn print_comparison(state: &ComparisonSessionState) {
    for p in &state.providers {
        println!("\n== {} [{:?}] ==", p.label, p.status);
        if let Some(first) = p.first_chunk_secs {
            print!("first chunk {:.2}s, ", first);
        }
        println!("{:.2}s, {} tokens", p.elapsed_secs, p.tokens);
        println!("{}", p.response);
    }
    if let Some(id) = &state.session_id {
        println!("\ncomparison {}", id);
    }
}

async fn run_repl(client: &StreamClient, backend: &Backend) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut conversation: Option<String> = None;

    println!("Commands:");
    println!("  chat <provider> <model> <message>");
    println!("  compare <provider:model,provider:model,...> <prompt>");
    println!("  new        start a fresh conversation");
    println!("  quit\n");

    loop {
        let line = match rl.readline("> ") {
            Ok(line) => line,
            Err(_) => break,
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        let _ = rl.add_history_entry(line);

        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "new" => {
                conversation = None;
                println!("[new conversation]");
            }
            "chat" => {
                let mut parts = rest.splitn(3, ' ');
                let (Some(provider), Some(model), Some(message)) =
                    (parts.next(), parts.next(), parts.next())
                else {
                    println!("usage: chat <provider> <model> <message>");
                    continue;
                };

                let mut params = ChatParams::new(provider, model, message);
                if let Some(id) = &conversation {
                    params = params.conversation(id.clone());
                }

                backend.prepare(Route::ChatStream);
                let handle = client.open_chat_stream(params);
                let state = stream_chat(&handle).await?;

                match (&state.status, &state.error) {
                    (SessionStatus::Done, _) => {}
                    (_, Some(error)) => println!("[{}: {}]", state.status, error),
                    _ => println!("[{}]", state.status),
                }
                if conversation.is_none() {
                    conversation = state.session_id;
                }
            }
            "compare" => {
                let Some((models, prompt)) = rest.split_once(' ') else {
                    println!("usage: compare <provider:model,...> <prompt>");
                    continue;
                };
                let selections = match parse_selections(models) {
                    Ok(selections) => selections,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };

                backend.prepare(Route::CompareStream);
                let handle = client.open_comparison_stream(ComparisonParams::new(prompt, selections));
                let state = stream_comparison(&handle).await?;

                print_comparison(&state);
                if let Some(error) = &state.error {
                    println!("[{}: {}]", state.status, error);
                }
            }
            other => println!("unknown command '{}'", other),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("selectstream=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (client, backend) = connect()?;
    let result = run_repl(&client, &backend).await;

    // Leave nothing streaming behind on exit.
    client.cancel_active();

    result
}
