//! Command implementations over a [`Telemetry`] instance.

use anyhow::Context;
use hutch_config::{Config, Paths};
use hutch_outbox::{props, DrainReport, Props, Telemetry};
use hutch_storage::FileStore;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Jumps between two score events in the demo.
const DEMO_SCORE_EVERY: u32 = 4;

/// Pause between simulated demo actions.
const DEMO_STEP: Duration = Duration::from_millis(150);

pub struct App {
    telemetry: Telemetry,
}

impl App {
    /// Open the file-backed telemetry client under `paths.state_dir()`.
    pub fn open(paths: &Paths, config: &Config, api_override: Option<String>) -> anyhow::Result<Self> {
        let store = FileStore::open(paths.state_dir())
            .with_context(|| format!("opening state directory {}", paths.state_dir().display()))?;
        let telemetry = Telemetry::with_http(Arc::new(store), config, api_override)
            .context("creating HTTP transport")?;
        Ok(Self { telemetry })
    }

    pub fn user_id(&self) {
        println!("{}", self.telemetry.user_id());
    }

    pub fn api_base(&self, url: Option<&str>) -> anyhow::Result<()> {
        if let Some(url) = url {
            self.telemetry
                .set_api_base(url)
                .with_context(|| format!("setting API base to {:?}", url))?;
        }
        println!("{}", self.telemetry.api_base());
        Ok(())
    }

    /// Track one event, then try to deliver the queue before exiting.
    pub async fn track(&self, name: &str, props: Vec<(String, Value)>, session: Option<&str>) {
        if let Some(session_id) = session {
            self.telemetry.resume_session(session_id);
        }
        self.telemetry.track(name, props.into_iter().collect::<Props>());

        if let Some(session_id) = self.telemetry.active_session() {
            println!("session {}", session_id);
        }
        self.flush().await;
    }

    pub fn session(&self, id: &str) {
        self.telemetry.begin_session(id);
        println!("session {} started", id);
    }

    pub fn status(&self) {
        let status = self.telemetry.status();
        println!("user id:        {}", self.telemetry.user_id());
        println!("api base:       {}", self.telemetry.api_base());
        println!("queued batches: {}", status.queued_batches);
        println!("queued events:  {}", status.queued_events);
        for batch in self.telemetry.outbox().snapshot() {
            println!("  {}  {} events", batch.session_id, batch.len());
        }
    }

    pub async fn flush(&self) {
        let report = self.telemetry.drain().await;
        print_report(&report, self.telemetry.status().queued_events);
    }

    /// Deliver in the background until Ctrl-C, then flush once more.
    pub async fn run(&self) -> anyhow::Result<()> {
        let background = self.telemetry.start_background();
        self.telemetry.flush_now();
        info!(api_base = %self.telemetry.api_base(), "Running, press Ctrl-C to stop");

        tokio::signal::ctrl_c()
            .await
            .context("waiting for Ctrl-C")?;

        info!("Shutting down");
        background.shutdown();
        self.flush().await;
        Ok(())
    }

    /// Simulated game session: start, jumps with periodic score, game over.
    pub async fn demo(&self, jumps: u32) {
        let session_id = uuid::Uuid::new_v4().to_string();
        self.telemetry.begin_session(&session_id);
        self.telemetry.track("game_start", Props::new());
        println!("session {}", session_id);

        let mut score = 0u64;
        for jump in 1..=jumps {
            tokio::time::sleep(DEMO_STEP).await;
            let height = jump_height();
            score += height;
            self.telemetry
                .track("jump", props(json!({ "height": height })));

            if jump % DEMO_SCORE_EVERY == 0 {
                self.telemetry.track("score", props(json!({ "value": score })));
            }
        }

        self.telemetry
            .track("game_over", props(json!({ "final_score": score })));
        self.telemetry.flush_now();
        self.flush().await;
    }
}

/// Jump height between 10 and 20.
fn jump_height() -> u64 {
    rand::thread_rng().gen_range(10..=20)
}

fn print_report(report: &DrainReport, remaining: usize) {
    println!(
        "delivered {} events in {} batches, {} events queued",
        report.delivered_events, report.delivered_batches, remaining
    );
    if report.failed {
        warn!(remaining = remaining, "Delivery failed, events stay queued");
        println!("delivery failed; queued events will be retried");
    }
}
