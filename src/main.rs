// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use the_loomwork::config::{load_and_validate_definition, DefinitionBuilder};
use the_loomwork::engine::PatternEngine;
use the_loomwork::traits::MemoryStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <definition1.yaml> [definition2.yaml ...] <input_json>", args[0]);
        eprintln!("Example: {} configs/map-reduce-demo.yaml \"[1, 2, 3]\"", args[0]);
        eprintln!(
            "Example: {} configs/sequential-demo.yaml configs/fan-out-demo.yaml \"[1, 2, 3, 4]\"",
            args[0]
        );
        std::process::exit(1);
    }

    // The last argument is the JSON input; everything before it is a definition file.
    let input_raw = &args[args.len() - 1];
    let definition_files = &args[1..args.len() - 1];

    let input: Value = match serde_json::from_str(input_raw) {
        Ok(value) => value,
        Err(_) => Value::String(input_raw.clone()),
    };

    println!("🧵 Loomwork Pattern Engine Demo");
    println!("═══════════════════════════════");
    println!("Input: {input}");
    println!("Definitions: {definition_files:?}");
    println!();

    let engine = Arc::new(PatternEngine::new(Arc::new(MemoryStore::new())));

    for (i, definition_file) in definition_files.iter().enumerate() {
        if i > 0 {
            println!("\n{}", "─".repeat(72));
        }
        if let Err(e) = run_single_definition(&engine, definition_file, input.clone()).await {
            eprintln!("❌ Failed to run {definition_file}: {e}");
        }
    }

    println!("\n🎉 Demo complete!");
}

async fn run_single_definition(
    engine: &PatternEngine,
    definition_file: &str,
    input: Value,
) -> Result<(), Box<dyn std::error::Error>> {
    let load_start = Instant::now();
    let definition = load_and_validate_definition(definition_file)?;

    println!("📋 Definition: {definition_file}");
    println!("🧩 Pattern: {} ({:?})", definition.name, definition.pattern);

    let pattern = DefinitionBuilder::build(engine, &definition).await?;
    println!("⚙️  Concurrency: {}", pattern.configuration.concurrency);
    println!("⏲️  Timeout: {}ms", pattern.configuration.timeout_ms);
    println!(
        "🛡️  Error strategy: {:?}",
        pattern.configuration.error_handling.strategy
    );

    let result = engine.execute_pattern(&pattern.id, input).await;

    println!("\n📊 Execution Result:");
    println!("🆔 Execution: {}", result.execution_id);
    println!("🏁 Status: {}", result.status);
    println!("⏱️  Duration: {}ms", result.duration_ms);
    match (&result.output, &result.error) {
        (Some(output), _) => println!("🎯 Output: {output}"),
        (None, Some(error)) => println!("💥 Error: {error}"),
        (None, None) => println!("🎯 Output: <none>"),
    }

    let metrics = engine.get_pattern_metrics(&pattern.id).await?;
    println!("\n📈 Pattern Metrics:");
    println!("   • throughput: {:.3}/s", metrics.throughput);
    println!("   • avg latency: {:.1}ms", metrics.average_latency_ms);
    println!("   • reliability: {:.3}", metrics.reliability);
    println!("   • error rate: {:.3}", metrics.error_rate);

    println!(
        "\n⏱️  Total time (including definition load): {:?}",
        load_start.elapsed()
    );

    Ok(())
}
