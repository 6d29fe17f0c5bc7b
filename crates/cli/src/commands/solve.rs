//! `reagent solve`: run one task and relay its step stream.

use reagent_agent::ReactOrchestrator;
use reagent_config::AppConfig;
use reagent_core::event::{EventBus, SessionId, StepEvent};
use reagent_core::memory::EpisodicMemory;
use reagent_memory::FileStore;
use std::sync::Arc;

pub async fn run(task: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured for provider '{}'!", config.provider);
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    QWEN_API_KEY      (provider qwen, the default)");
        eprintln!("    OPENAI_API_KEY    (with LLM_PROVIDER=openai)");
        eprintln!("    REAGENT_API_KEY   (applies to the active provider)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let orchestrator = build(&config).await?;
    let events = Arc::clone(orchestrator.events());

    let session = SessionId::new();
    let (subscription, mut rx) = events.subscribe_channel(Some(session.clone()));
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event, json);
        }
    });

    let result = orchestrator.run_in_session(session, task).await;

    // Dropping the listener closes the channel, which ends the printer.
    events.unsubscribe(subscription);
    printer.await?;

    let outcome = result?;
    if json {
        println!("{}", serde_json::to_string(&outcome)?);
    } else {
        println!();
        println!("{}", outcome.answer);
    }
    Ok(())
}

/// Wire the per-process instances together.
async fn build(config: &AppConfig) -> Result<ReactOrchestrator, Box<dyn std::error::Error>> {
    let gateway = Arc::new(reagent_providers::build_from_config(config)?);
    let tools = Arc::new(reagent_tools::default_dispatch(&config.tools)?);

    let memory = Arc::new(FileStore::with_limits(
        config.memory_path(),
        config.memory.capacity,
        config.memory.similarity_threshold,
    ));
    memory.initialize().await?;

    let events = Arc::new(EventBus::new());
    Ok(ReactOrchestrator::new(gateway, tools, memory, events).with_limits(config.agent.clone()))
}

fn print_event(event: &StepEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize event"),
        }
        return;
    }

    let label = match event.iteration {
        Some(n) => format!("[{} #{n}]", event.kind),
        None => format!("[{}]", event.kind),
    };
    println!("{label} {}", event.content);
}
