//! Config file pipeline.
//!
//! Uses the built-in file actions to:
//! 1. Write a JSON settings file from defaults plus an override
//! 2. Load it back
//! 3. Convert it to TOML
//! 4. Append a section to the TOML file
//! 5. Load the TOML file
//! 6. Save the result as YAML
//!
//! Files are written to a temporary directory.

use serde_json::json;
use tsugi::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let dir = std::env::temp_dir().join("tsugi-config-files");
    std::fs::create_dir_all(&dir)?;
    let json_path = dir.join("settings.json");
    let toml_path = dir.join("settings.toml");
    let yaml_path = dir.join("settings.yaml");

    let pipeline = Pipeline::with_builtins(
        Registry::shared(),
        QueueConfig::default().capture_results(true),
    )?;
    println!(
        "Registered actions: {:?}",
        pipeline.list_registered().keys().collect::<Vec<_>>()
    );

    let ledger = pipeline
        .begin_with(
            "write_file",
            json!({
                "path": json_path,
                "object": { "name": "demo", "server": { "port": 8080, "host": "0.0.0.0" } }
            }),
        )?
        .next("load_file", json!({ "path": json_path }))?
        .next("write_file", json!({ "path": toml_path }))?
        .next(
            "append_file",
            json!({ "path": toml_path, "object": { "logging": { "level": "info" } } }),
        )?
        .next("load_file", json!({ "path": toml_path }))?
        .next("write_file", json!({ "path": yaml_path }))?
        .run()
        .await?;

    if let Some(entry) = ledger.values_for("load_file").last() {
        println!(
            "Final document:\n{}",
            serde_json::to_string_pretty(&entry.output)?
        );
    }
    println!("TOML on disk:\n{}", std::fs::read_to_string(&toml_path)?);
    println!("YAML on disk:\n{}", std::fs::read_to_string(&yaml_path)?);

    Ok(())
}
