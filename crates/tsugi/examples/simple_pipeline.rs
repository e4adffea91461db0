//! Simple pipeline example.
//!
//! Registers three actions, chains them and prints the ledger:
//! 1. `seed` outputs a starting number
//! 2. `scale` multiplies its input by a configured factor
//! 3. `report` formats the final number
//!
//! A second run shows what happens when an action fails and an error
//! handler is installed.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tsugi::prelude::*;

#[derive(Debug, Deserialize)]
struct Seed {
    value: i64,
}

#[async_trait]
impl Action for Seed {
    fn tag(&self) -> Tag {
        Tag::new("seed")
    }

    async fn execute(&self, _previous: Option<Output>) -> Result<Output, BoxError> {
        Ok(Output::value(self.value))
    }
}

#[derive(Debug, Deserialize)]
struct Scale {
    factor: i64,
}

#[async_trait]
impl Action for Scale {
    fn tag(&self) -> Tag {
        Tag::new("scale")
    }

    async fn execute(&self, previous: Option<Output>) -> Result<Output, BoxError> {
        let n = previous
            .and_then(Output::into_value)
            .and_then(|v| v.as_i64())
            .ok_or("scale needs a number")?;
        // Simulate some async work
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        Ok(Output::value(n * self.factor))
    }
}

#[derive(Debug, Deserialize)]
struct Report {}

#[async_trait]
impl Action for Report {
    fn tag(&self) -> Tag {
        Tag::new("report")
    }

    async fn execute(&self, previous: Option<Output>) -> Result<Output, BoxError> {
        match previous.and_then(Output::into_value) {
            Some(value) => {
                println!("Final value: {}", value);
                Ok(Output::Nothing)
            }
            None => Err("nothing to report".into()),
        }
    }
}

fn register(pipeline: &mut Pipeline) -> Result<(), PipelineError> {
    pipeline.register_action("seed", from_config(|seed: Seed| seed))?;
    pipeline.register_action("scale", from_config(|scale: Scale| scale))?;
    pipeline.register_action("report", from_config(|report: Report| report))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let registry = Registry::shared();

    let mut pipeline = Pipeline::new(
        Arc::clone(&registry),
        QueueConfig::default().capture_results(true),
    );
    register(&mut pipeline)?;

    let ledger = pipeline
        .begin_with("seed", json!({ "value": 3 }))?
        .next("scale", json!({ "factor": 7 }))?
        .next("scale", json!({ "factor": 2 }))?
        .next("report", json!({}))?
        .run()
        .await?;

    for entry in &ledger {
        println!("{:>8} -> {:?}", entry.tag.as_str(), entry.output);
    }
    println!("Ledger as JSON: {}", serde_json::to_string(&ledger)?);

    // Same registry, different policy: report the failure instead of
    // returning it.
    let handled = Pipeline::new(
        registry,
        QueueConfig::default().on_error(|error, action| {
            eprintln!("Action '{}' failed: {}", action.tag(), error);
        }),
    );
    let flow = handled
        .begin_with("report", json!({}))?
        .next("seed", json!({ "value": 1 }))?;
    flow.run().await?;
    println!("Actions left after failure: {}", flow.queue().len());

    Ok(())
}
