//! Simulated feed scroll
//!
//! Run with: cargo run --example feed_scroll [ITEMS]
//!
//! Ingests ITEMS entries (default 12), then scrolls from the top of the feed
//! to the bottom, preloading around the visible item at each step. A fake
//! decoder takes a few tens of milliseconds per controller and fails for
//! every seventh video, so retries, eviction and permanent failures all show
//! up in the log.
//!
//! Set `RUST_LOG=feed_preload=debug` for per-decision logging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::broadcast::error::RecvError;

use feed_preload::{
    Controller, ControllerFactory, FactoryOutcome, ManagerConfig, TimeoutFactory, VideoEntry,
    VideoManager, VideoSource,
};

/// Fake decoder handle
struct SimulatedController {
    playing: bool,
    frame: Option<Bytes>,
}

impl Controller for SimulatedController {
    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn thumbnail(&self) -> Option<Bytes> {
        self.frame.clone()
    }

    fn release(&mut self) {
        self.playing = false;
    }
}

/// Factory that sleeps to emulate decoder setup
struct SimulatedFactory {
    created: AtomicU64,
}

#[async_trait::async_trait]
impl ControllerFactory for SimulatedFactory {
    async fn create(&self, entry: &VideoEntry, source: &VideoSource) -> FactoryOutcome {
        let n: u64 = entry.id.as_str().trim_start_matches("video-").parse().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(20 + (n % 4) * 15)).await;

        if n % 7 == 6 {
            return FactoryOutcome::Failed(format!("decoder rejected {}", source));
        }

        self.created.fetch_add(1, Ordering::Relaxed);
        let frame = match source {
            VideoSource::Thumbnail { .. } => Some(Bytes::from(format!("jpeg:{}", entry.id))),
            _ => None,
        };
        FactoryOutcome::Created(Box::new(SimulatedController {
            playing: false,
            frame,
        }))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let items: usize = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 12,
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("feed_preload=info".parse()?)
                .add_directive("feed_scroll=info".parse()?),
        )
        .init();

    let factory = TimeoutFactory::new(
        SimulatedFactory {
            created: AtomicU64::new(0),
        },
        Duration::from_millis(200),
    );
    let config = ManagerConfig::default()
        .max_retries(1)
        .max_live_controllers(4)
        .keep_count(3);
    let factory = Arc::new(factory);
    let manager = Arc::new(VideoManager::with_config(factory.clone(), config));

    let mut changes = manager.subscribe();
    let watcher = tokio::spawn(async move {
        let mut wakeups = 0u64;
        loop {
            match changes.recv().await {
                Ok(()) => wakeups += 1,
                Err(RecvError::Lagged(missed)) => wakeups += missed,
                Err(RecvError::Closed) => break wakeups,
            }
        }
    });

    // Oldest first, so video-0 ends up at the bottom of the feed
    for i in 0..items {
        let entry = VideoEntry::new(format!("video-{}", i), "demo")
            .url(format!("https://cdn.example/video-{}.mp4", i))
            .title(format!("Clip #{}", i))
            .created_at(1_700_000_000 + i as u64);
        manager.ingest(entry).await?;
    }

    let top = manager.entries().await.first().map(|entry| entry.id.clone());
    if let Some(id) = top {
        // Poster first; scrolling onto it upgrades to a playback controller
        manager.preload_thumbnail(&id).await?;
        manager.settle().await;
        if let Some(frame) = manager.thumbnail(&id).await {
            println!("poster for {}: {} bytes", id, frame.len());
        }
    }

    for index in 0..items {
        manager.preload_around_default(index).await?;
        manager.settle().await;

        let entries = manager.entries().await;
        if let Some(visible) = entries.get(index) {
            manager.pause_all().await?;
            manager.resume(&visible.id).await?;
        }

        let snapshot = manager.debug_snapshot().await;
        println!(
            "index {:>2}: ready={} failed={} disposed={} blacklisted={}",
            index, snapshot.ready, snapshot.failed, snapshot.disposed, snapshot.permanently_failed
        );
    }

    let snapshot = manager.debug_snapshot().await;
    println!();
    println!("{:#?}", snapshot.operations);

    manager.stop_all().await?;
    manager.dispose().await?;
    manager.settle().await;
    drop(manager);

    let wakeups = watcher.await?;
    println!("change notifications observed: {}", wakeups);
    println!(
        "controllers built by the decoder: {}",
        factory.inner().created.load(Ordering::Relaxed)
    );

    Ok(())
}
