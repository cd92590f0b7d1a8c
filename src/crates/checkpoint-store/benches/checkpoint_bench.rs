use checkpoint_store::{
    create_checkpoint, BlockingCheckpointSaver, Checkpoint, CheckpointConfig, CheckpointMetadata,
    CheckpointSaver, InMemoryCheckpointSaver, MetadataFilter,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use futures::TryStreamExt;
use serde_json::json;
use std::collections::HashMap;

fn populated_saver(threads: usize, per_thread: i64) -> InMemoryCheckpointSaver {
    let saver = InMemoryCheckpointSaver::new();
    for t in 0..threads {
        let mut config = CheckpointConfig::new(format!("thread-{}", t));
        let mut parent = Checkpoint::empty();
        for step in 0..per_thread {
            let writes = HashMap::from([("count".to_string(), json!(step))]);
            let next = create_checkpoint(&parent, &writes, step).unwrap();
            let metadata = CheckpointMetadata::new()
                .with_extra("source", json!(if step % 10 == 0 { "input" } else { "loop" }))
                .with_step(step);
            config = saver.blocking_put(&config, next.clone(), metadata).unwrap();
            parent = next;
        }
    }
    saver
}

fn checkpoint_save_benchmark(c: &mut Criterion) {
    let saver = InMemoryCheckpointSaver::new();
    let config = CheckpointConfig::new("bench-thread");

    c.bench_function("checkpoint save", |b| {
        b.iter(|| {
            saver
                .blocking_put(
                    &config,
                    black_box(Checkpoint::empty()),
                    black_box(CheckpointMetadata::new().with_step(1)),
                )
                .unwrap();
        });
    });
}

fn checkpoint_load_benchmark(c: &mut Criterion) {
    let saver = populated_saver(10, 100);
    let latest = CheckpointConfig::new("thread-5");

    c.bench_function("checkpoint load latest", |b| {
        b.iter(|| saver.blocking_get_tuple(black_box(&latest)).unwrap());
    });
}

fn checkpoint_list_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let saver = populated_saver(10, 100);
    let filter = MetadataFilter::new().eq("source", json!("input"));

    c.bench_function("checkpoint list filtered (blocking)", |b| {
        b.iter(|| {
            saver
                .blocking_list(None, Some(black_box(&filter)), None, None)
                .unwrap()
                .count()
        });
    });

    c.bench_function("checkpoint list filtered (async)", |b| {
        b.to_async(&runtime).iter(|| async {
            let results: Vec<_> = saver
                .list(None, Some(black_box(&filter)), None, None)
                .await
                .unwrap()
                .try_collect()
                .await
                .unwrap();
            results.len()
        });
    });

    c.bench_function("checkpoint list page of 10", |b| {
        b.iter(|| {
            saver
                .blocking_list(None, None, None, Some(black_box(10)))
                .unwrap()
                .count()
        });
    });
}

criterion_group!(
    benches,
    checkpoint_save_benchmark,
    checkpoint_load_benchmark,
    checkpoint_list_benchmark
);
criterion_main!(benches);
