//! CLI command handlers.

pub mod flow;
pub mod index;
pub mod node;

use anyhow::{Context as _, Result};
use console::Style;
use vizflow_config::VizflowConfig;
use vizflow_store::{Project, ProjectConfig};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Resolved storage location and cache sizes.
    pub project: ProjectConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Open the project's stores, reconciling both indexes.
    pub fn open_project(&self) -> Result<Project> {
        Project::open(&self.project).with_context(|| {
            format!(
                "failed to open project at {}",
                self.project.base_dir.display()
            )
        })
    }
}

/// Map the loaded configuration onto store settings.
pub fn project_config(config: &VizflowConfig) -> ProjectConfig {
    let storage = config.storage();
    let cache = config.cache();
    ProjectConfig {
        base_dir: storage.base_dir,
        flows_dir: storage.flows_dir,
        nodes_dir: storage.nodes_dir,
        max_flows: cache.max_flows,
        max_nodes: cache.max_nodes,
    }
}

fn print_success(message: &str) {
    let green = Style::new().green();
    println!("{} {}", green.apply_to("✓"), message);
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
