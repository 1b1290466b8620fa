//! Flow command - create, edit and render flows.

use anyhow::{Context as _, Result, bail};
use clap::{Args, Subcommand};
use console::{Style, style};
use serde_json::json;
use vizflow_store::Flow;

use super::{Context, print_json, print_success};

/// Arguments for the flow command.
#[derive(Args, Debug)]
pub struct FlowArgs {
    #[command(subcommand)]
    pub command: FlowCommand,
}

#[derive(Subcommand, Debug)]
pub enum FlowCommand {
    /// Create an empty flow
    New {
        /// Flow name
        name: String,

        /// Free-form description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// List all flows
    List,

    /// Add an edge between two nodes
    Connect {
        /// Flow ID
        flow: String,
        /// Source node ID
        from: String,
        /// Target node ID
        to: String,
    },

    /// Remove an edge between two nodes
    Disconnect {
        /// Flow ID
        flow: String,
        /// Source node ID
        from: String,
        /// Target node ID
        to: String,
    },

    /// Remove a node and all of its edges
    RemoveNode {
        /// Flow ID
        flow: String,
        /// Node ID
        node: String,
    },

    /// Render the history leading to a node
    History {
        /// Flow ID
        flow: String,
        /// Node ID
        node: String,
    },

    /// Render every independent history in a flow
    Map {
        /// Flow ID
        flow: String,
    },
}

/// Run the flow command.
pub fn run(args: FlowArgs, ctx: &Context) -> Result<()> {
    let mut project = ctx.open_project()?;
    let flows = &mut project.flows;
    let dim = Style::new().dim();

    match args.command {
        FlowCommand::New { name, description } => {
            let flow = flows.create_flow(&name, &description)?;
            if ctx.json_output {
                print_json(&flow_json(&flow))?;
            } else {
                print_success(&format!("Flow created: {}", dim.apply_to(&flow.id)));
            }
        }
        FlowCommand::List => {
            let all = flows.list_flows()?;
            if ctx.json_output {
                print_json(&json!(all.iter().map(flow_json).collect::<Vec<_>>()))?;
            } else {
                println!("{}", style("Flows").bold());
                println!("{}", dim.apply_to("─".repeat(50)));
                if all.is_empty() {
                    println!("{}", dim.apply_to("No flows found"));
                }
                for flow in &all {
                    println!(
                        "{} {} {}",
                        dim.apply_to(format!("[{}]", flow.id)),
                        flow.name,
                        dim.apply_to(format!(
                            "({} nodes, updated {})",
                            flow.graph().len(),
                            flow.updated.format("%Y-%m-%d %H:%M")
                        ))
                    );
                }
            }
        }
        FlowCommand::Connect { flow, from, to } => {
            let added = flows
                .connect(&flow, &from, &to)
                .with_context(|| format!("cannot connect {from} → {to} in flow {flow}"))?;
            report_change(ctx, "connected", added, &format!("{from} → {to}"))?;
        }
        FlowCommand::Disconnect { flow, from, to } => {
            let removed = flows
                .disconnect(&flow, &from, &to)
                .with_context(|| format!("cannot update flow {flow}"))?;
            report_change(ctx, "disconnected", removed, &format!("{from} → {to}"))?;
        }
        FlowCommand::RemoveNode { flow, node } => {
            let removed = flows
                .remove_node(&flow, &node)
                .with_context(|| format!("cannot update flow {flow}"))?;
            report_change(ctx, "removed", removed, &node)?;
        }
        FlowCommand::History { flow, node } => {
            let flow = flows.get(&flow)?;
            let graph = flow.graph();
            if !graph.exists(&node) {
                bail!("node {node} is not part of flow {}", flow.id);
            }
            let history = graph.get_history(&node);
            let lines = graph.render(&history);
            if ctx.json_output {
                print_json(&json!({ "history": history, "lines": lines }))?;
            } else {
                for line in lines {
                    println!("{line}");
                }
            }
        }
        FlowCommand::Map { flow } => {
            let flow = flows.get(&flow)?;
            let blocks = flow.graph().render_all();
            if ctx.json_output {
                print_json(&json!({
                    "histories": flow.graph().get_histories(),
                    "blocks": blocks,
                }))?;
            } else {
                if ctx.verbose {
                    for (i, id) in flow.graph().nodes().iter().enumerate() {
                        println!("{}", dim.apply_to(format!("{}: {id}", i + 1)));
                    }
                }
                println!("{}", blocks.join("\n\n"));
            }
        }
    }
    Ok(())
}

fn report_change(ctx: &Context, verb: &str, changed: bool, subject: &str) -> Result<()> {
    if ctx.json_output {
        let mut object = serde_json::Map::new();
        object.insert(verb.to_string(), changed.into());
        return print_json(&serde_json::Value::Object(object));
    }
    if changed {
        print_success(&format!("{} {subject}", capitalize(verb)));
    } else {
        println!("{}", Style::new().dim().apply_to(format!("Unchanged: {subject}")));
    }
    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn flow_json(flow: &Flow) -> serde_json::Value {
    json!({
        "id": flow.id,
        "name": flow.name,
        "description": flow.description,
        "created": flow.created.to_rfc3339(),
        "updated": flow.updated.to_rfc3339(),
        "nodes": flow.graph().nodes(),
        "connections": flow
            .graph()
            .edges()
            .map(|(from, to)| json!({ "from": from, "to": to }))
            .collect::<Vec<_>>(),
    })
}
