//! `reagent memory-stats`: episodic memory diagnostics.

use reagent_core::memory::EpisodicMemory;
use reagent_memory::FileStore;

pub async fn stats() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let path = config.memory_path();

    let store = FileStore::with_limits(path.clone(), config.memory.capacity, config.memory.similarity_threshold);
    store.initialize().await?;

    eprintln!("Memory document: {}", path.display());
    println!("{}", serde_json::to_string_pretty(&store.stats())?);
    Ok(())
}
