//! Subcommand handlers.

use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use lanekit_core::{builtin_machines, detect, LaneConfig, ProfileOptions, Registry};

/// Builds a registry from the requested configuration source.
pub fn build_registry(config: Option<&Path>, no_config: bool) -> anyhow::Result<Registry> {
    let config = if no_config {
        LaneConfig::default()
    } else if let Some(path) = config {
        LaneConfig::load_from(path)?
    } else {
        LaneConfig::load()?
    };
    tracing::debug!(?config, "configuration loaded");
    Ok(Registry::with_config(&config)?)
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

pub fn info(registry: &Registry, all_machines: bool, json: bool) -> anyhow::Result<()> {
    if json {
        return info_json(registry, all_machines);
    }

    let machine = registry.machine();
    println!("{}", "LaneKit dispatch".bold());
    println!("  Detected:  {}", registry.detected().to_string().cyan());
    println!("  Machine:   {}", machine.name().green().bold());
    println!("  Alignment: {} bytes\n", registry.alignment());

    let mut bindings = new_table(&["Primitive", "Aligned", "Unaligned"]);
    for (primitive, binding) in registry.bindings() {
        bindings.add_row(vec![
            Cell::new(primitive),
            Cell::new(binding.aligned.name()),
            Cell::new(binding.unaligned.name()),
        ]);
    }
    println!("{bindings}");

    if all_machines {
        // Judged against the CPU, not the configured mask.
        let cpu = detect();
        let mut machines = new_table(&["Machine", "Capabilities", "Alignment", "Runs here"]);
        for table in builtin_machines() {
            let runs = table.runs_on(cpu);
            let name = if table.name() == machine.name() {
                Cell::new(format!("{} *", table.name())).fg(Color::Green)
            } else {
                Cell::new(table.name())
            };
            machines.add_row(vec![
                name,
                Cell::new(table.capability_mask().to_string()),
                Cell::new(table.alignment()),
                if runs {
                    Cell::new("yes").fg(Color::Green)
                } else {
                    Cell::new("no").fg(Color::Red)
                },
            ]);
        }
        println!("\n{machines}");
    }
    Ok(())
}

fn info_json(registry: &Registry, all_machines: bool) -> anyhow::Result<()> {
    let bindings: serde_json::Map<String, serde_json::Value> = registry
        .bindings()
        .iter()
        .map(|(primitive, binding)| {
            (
                (*primitive).to_string(),
                serde_json::json!({
                    "aligned": binding.aligned.name(),
                    "unaligned": binding.unaligned.name(),
                }),
            )
        })
        .collect();

    let mut report = serde_json::json!({
        "machine": registry.machine().name(),
        "detected": registry.detected().names(),
        "alignment": registry.alignment(),
        "bindings": bindings,
    });
    if all_machines {
        let cpu = detect();
        let machines: Vec<_> = builtin_machines()
            .iter()
            .map(|table| {
                serde_json::json!({
                    "name": table.name(),
                    "capabilities": table.capability_mask().names(),
                    "alignment": table.alignment(),
                    "runs": table.runs_on(cpu),
                })
            })
            .collect();
        report["machines"] = serde_json::Value::from(machines);
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn profile(
    registry: &Registry,
    iterations: usize,
    points: usize,
    json: Option<&Path>,
    write_config: Option<&Path>,
) -> anyhow::Result<()> {
    let options = ProfileOptions { points, iterations };
    println!(
        "Profiling machine {} ({} points, {} iterations)\n",
        registry.machine().name().green().bold(),
        options.points,
        options.iterations
    );

    let report = lanekit_core::profile(registry, &options)?;

    for test in &report.tests {
        println!("{}", test.name.bold());
        let mut table = new_table(&["Variant", "Alignment", "ns/call", "Max rel. error", "Status"]);
        for (name, timing) in &test.results {
            let mut label = name.clone();
            if *name == test.best_aligned {
                label.push_str(" [a]");
            }
            if *name == test.best_unaligned {
                label.push_str(" [u]");
            }
            table.add_row(vec![
                Cell::new(label),
                Cell::new(timing.alignment),
                Cell::new(format!("{:.1}", timing.per_call_ns)),
                Cell::new(format!("{:.2e}", timing.max_rel_error)),
                if timing.passed {
                    Cell::new("ok").fg(Color::Green)
                } else {
                    Cell::new("FAILED").fg(Color::Red)
                },
            ]);
        }
        println!("{table}");
        if let Some(speedup) = test.speedup_over_generic() {
            println!("  {} {speedup:.2}x over generic\n", test.best_aligned.cyan());
        } else {
            println!();
        }
    }

    if let Some(path) = json {
        report
            .write_json(path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Report written to {}", path.display().to_string().bold());
    }
    if let Some(path) = write_config {
        report
            .write_config(path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Configuration written to {}", path.display().to_string().bold());
    }

    let failed: Vec<_> = report
        .tests
        .iter()
        .flat_map(|t| {
            t.results
                .iter()
                .filter(|(_, timing)| !timing.passed)
                .map(move |(name, _)| format!("{}::{name}", t.name))
        })
        .collect();
    if !failed.is_empty() {
        anyhow::bail!("variants disagree with generic: {}", failed.join(", "));
    }
    Ok(())
}
