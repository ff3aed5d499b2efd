// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent lifecycle commands: create, resume, archive, send, cancel, list.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand, ValueEnum};
use paseo_core::ProviderKind;

use crate::client::DaemonClient;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommand,
}

/// Mirrors [`ProviderKind`], kept separate so clap can derive `ValueEnum` for it.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ProviderArg {
    Claude,
    Codex,
}

impl From<ProviderArg> for ProviderKind {
    fn from(p: ProviderArg) -> Self {
        match p {
            ProviderArg::Claude => ProviderKind::Claude,
            ProviderArg::Codex => ProviderKind::Codex,
        }
    }
}

#[derive(Subcommand)]
pub enum AgentCommand {
    /// Create a new agent in a working directory
    Create {
        /// Coding agent provider to spawn
        #[arg(long)]
        provider: ProviderArg,
        /// Working directory for the agent
        #[arg(long)]
        cwd: String,
        /// Permission mode id (provider-specific, e.g. "default", "plan")
        #[arg(long, default_value = "default")]
        mode: String,
        /// Model id (provider-specific)
        #[arg(long)]
        model: String,
        /// Optional display title
        #[arg(long)]
        title: Option<String>,
    },
    /// Resume a previously archived or disconnected agent from a persisted session id
    Resume {
        #[arg(long)]
        provider: ProviderArg,
        #[arg(long)]
        cwd: String,
        /// Provider-specific session id to resume
        #[arg(long)]
        session_id: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Archive an agent, detaching it from its working directory
    Archive {
        /// Agent ID
        agent_id: String,
        /// Archive even if the agent has an in-flight turn
        #[arg(long)]
        force: bool,
    },
    /// Send a text message to a running agent
    Send {
        /// Agent ID
        agent_id: String,
        /// Message text
        message: String,
    },
    /// Cancel an agent's in-flight turn
    Cancel {
        /// Agent ID
        agent_id: String,
    },
    /// List the current agent roster
    List,
}

pub async fn handle(
    command: AgentCommand,
    client: &DaemonClient,
    format: OutputFormat,
) -> Result<()> {
    match command {
        AgentCommand::Create {
            provider,
            cwd,
            mode,
            model,
            title,
        } => {
            let agent = client
                .create_agent(provider.into(), &cwd, &mode, &model, title)
                .await
                .map_err(|e| anyhow!("{}", e))?;
            print_agent(&agent, format)?;
        }
        AgentCommand::Resume {
            provider,
            cwd,
            session_id,
            title,
        } => {
            let persistence = paseo_core::PersistenceHandle {
                provider: provider.into(),
                session_id,
                metadata: serde_json::Value::Null,
            };
            let agent = client
                .resume_agent(persistence.provider, &cwd, persistence, title)
                .await
                .map_err(|e| anyhow!("{}", e))?;
            print_agent(&agent, format)?;
        }
        AgentCommand::Archive { agent_id, force } => {
            let archived_at = client
                .archive_agent(&agent_id, force)
                .await
                .map_err(|e| anyhow!("{}", e))?;
            let secs = archived_at
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            match format {
                OutputFormat::Text => println!("Agent {} archived", agent_id),
                OutputFormat::Json => {
                    let obj = serde_json::json!({ "agent_id": agent_id, "archived_at": secs });
                    println!("{}", serde_json::to_string_pretty(&obj)?);
                }
            }
        }
        AgentCommand::Send { agent_id, message } => {
            client
                .send_message(&agent_id, &message)
                .await
                .map_err(|e| anyhow!("{}", e))?;
            println!("Sent to agent {}", agent_id);
        }
        AgentCommand::Cancel { agent_id } => {
            client
                .cancel(&agent_id)
                .await
                .map_err(|e| anyhow!("{}", e))?;
            println!("Cancelled agent {}", agent_id);
        }
        AgentCommand::List => {
            let agents = client.list_agents().await.map_err(|e| anyhow!("{}", e))?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&agents)?),
                OutputFormat::Text => {
                    if agents.is_empty() {
                        println!("No agents found");
                    } else {
                        println!(
                            "{:<38} {:<8} {:<10} {:<30}",
                            "AGENT_ID", "PROVIDER", "STATE", "CWD"
                        );
                        for a in &agents {
                            println!(
                                "{:<38} {:<8} {:<10} {:<30}",
                                a.id,
                                a.provider,
                                a.state,
                                truncate(&a.cwd, 30),
                            );
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_agent(agent: &paseo_core::AgentRecord, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(agent)?),
        OutputFormat::Text => {
            println!("Agent: {}", agent.id);
            println!("Provider: {}", agent.provider);
            println!("State: {}", agent.state);
            println!("Cwd: {}", agent.cwd);
        }
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        s
    } else {
        &s[..max]
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
