//! Drive the store the way an execution engine does: derive a checkpoint per
//! step, persist it with metadata, then resume and inspect history.
//!
//! Run with `RUST_LOG=checkpoint_store=debug cargo run --example execution_history`.

use checkpoint_store::{
    create_checkpoint, Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSaver,
    CheckpointSource, InMemoryCheckpointSaver, MetadataFilter,
};
use futures::TryStreamExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let saver = InMemoryCheckpointSaver::new();

    for thread_id in ["alice", "bob"] {
        let mut parent = Checkpoint::empty();
        let mut config = saver
            .put(
                &CheckpointConfig::new(thread_id),
                parent.clone(),
                CheckpointMetadata::new()
                    .with_source(CheckpointSource::Input)
                    .with_step(-1)
                    .with_writes(json!({"__start__": {"user": thread_id}})),
            )
            .await?;

        for step in 0..3 {
            let node = format!("node_{}", step % 2);
            let writes: HashMap<String, Value> = HashMap::from([
                ("counter".to_string(), json!(step + 1)),
                ("last_node".to_string(), json!(node)),
            ]);
            let next = create_checkpoint(&parent, &writes, step)?;
            config = saver
                .put(
                    &config,
                    next.clone(),
                    CheckpointMetadata::new()
                        .with_source(CheckpointSource::Loop)
                        .with_step(step)
                        .with_writes(json!({ node: {"counter": step + 1} })),
                )
                .await?;
            parent = next;
        }
    }

    // Resume: the latest checkpoint of a thread
    let latest = saver
        .get_tuple(&CheckpointConfig::new("alice"))
        .await?
        .ok_or("alice has no checkpoints")?;
    println!(
        "alice resumes at step {:?} with counter={} (version {:?})",
        latest.metadata.step(),
        latest.checkpoint.channel_values["counter"],
        latest.checkpoint.channel_versions["counter"],
    );

    // Inspect: every loop checkpoint at step 1, across threads
    let filter = MetadataFilter::new()
        .eq("source", json!("loop"))
        .eq("step", json!(1));
    let at_step_one: Vec<_> = saver
        .list(None, Some(&filter), None, None)
        .await?
        .try_collect()
        .await?;
    for tuple in &at_step_one {
        println!(
            "{} @ step 1: {} (parent {:?})",
            tuple.config.thread_id,
            tuple.checkpoint.id,
            tuple.parent_config.as_ref().and_then(|p| p.checkpoint_id.as_deref()),
        );
    }

    // Page backwards through bob's history two at a time
    let bob = CheckpointConfig::new("bob");
    let mut cursor: Option<CheckpointConfig> = None;
    loop {
        let page: Vec<_> = saver
            .list(Some(&bob), None, cursor.as_ref(), Some(2))
            .await?
            .try_collect()
            .await?;
        let Some(last) = page.last() else { break };
        let steps: Vec<_> = page.iter().map(|t| t.metadata.step()).collect();
        println!("bob page: steps {:?}", steps);
        cursor = Some(last.config.clone());
    }

    Ok(())
}
