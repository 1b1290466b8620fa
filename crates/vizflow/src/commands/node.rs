//! Node command - store and amend conversation nodes.

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use console::{Style, style};
use vizflow_store::{NewNode, Node, Role};

use super::{Context, print_json, print_success};

/// Arguments for the node command.
#[derive(Args, Debug)]
pub struct NodeArgs {
    #[command(subcommand)]
    pub command: NodeCommand,
}

#[derive(Subcommand, Debug)]
pub enum NodeCommand {
    /// Store a prompt/response exchange
    Add {
        /// User prompt
        #[arg(long)]
        prompt: String,

        /// Assistant response
        #[arg(long)]
        response: String,

        /// Model that produced the response
        #[arg(long, default_value = "")]
        model: String,

        /// Tags for the node
        #[arg(short, long)]
        tags: Vec<String>,

        /// Also attach the node to this flow
        #[arg(long)]
        flow: Option<String>,

        /// Parent node within the flow
        #[arg(long, requires = "flow")]
        parent: Option<String>,
    },

    /// Show a stored node
    Show {
        /// Node ID
        id: String,
    },

    /// Replace a node's tags
    Tag {
        /// Node ID
        id: String,

        /// New tags (none clears them)
        tags: Vec<String>,
    },
}

/// Run the node command.
pub fn run(args: NodeArgs, ctx: &Context) -> Result<()> {
    let mut project = ctx.open_project()?;

    match args.command {
        NodeCommand::Add {
            prompt,
            response,
            model,
            tags,
            flow,
            parent,
        } => {
            let new = NewNode::exchange(&prompt, &response, model).with_tags(tags);
            let node = match flow {
                Some(flow) => project
                    .record_exchange(&flow, parent.as_deref(), new)
                    .with_context(|| format!("cannot record node in flow {flow}"))?,
                None => project.nodes.create_node(new)?,
            };
            if ctx.json_output {
                print_json(&serde_json::to_value(&node)?)?;
            } else {
                let dim = Style::new().dim();
                print_success(&format!("Node created: {}", dim.apply_to(&node.id)));
            }
        }
        NodeCommand::Show { id } => {
            let node = project.nodes.get(&id)?;
            if ctx.json_output {
                print_json(&serde_json::to_value(&node)?)?;
            } else {
                print_node(&node, ctx.verbose);
            }
        }
        NodeCommand::Tag { id, tags } => {
            let node = project.nodes.set_tags(&id, tags)?;
            if ctx.json_output {
                print_json(&serde_json::to_value(&node)?)?;
            } else {
                print_success(&format!("Tags set: [{}]", node.tags.join(", ")));
            }
        }
    }
    Ok(())
}

fn print_node(node: &Node, verbose: bool) {
    let dim = Style::new().dim();
    println!("{}", style("Node Details").bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    println!("{} {}", dim.apply_to("id:       "), node.id);
    println!("{} {}", dim.apply_to("timestamp:"), node.timestamp.to_rfc3339());
    if !node.model.is_empty() {
        println!("{} {}", dim.apply_to("model:    "), node.model);
    }
    if !node.tags.is_empty() {
        println!("{} {}", dim.apply_to("tags:     "), node.tags.join(", "));
    }
    for segment in &node.segments {
        println!();
        let label = match segment.role {
            Role::User => style(segment.role.as_str()).cyan(),
            Role::Assistant => style(segment.role.as_str()).green(),
            Role::System => style(segment.role.as_str()).yellow(),
        };
        println!("{}", label.bold());
        println!("{}", segment.text);
    }
    if verbose {
        println!();
        for usage in &node.usage {
            println!(
                "{}",
                dim.apply_to(format!(
                    "{}: {} tokens in {:.2}s ({:.2}/s)",
                    usage.role, usage.count, usage.duration, usage.rate
                ))
            );
        }
        println!(
            "{}",
            dim.apply_to(format!(
                "summary: {} (last built {})",
                if node.summary.updated { "current" } else { "stale" },
                node.summary.last_built.to_rfc3339()
            ))
        );
    }
}
