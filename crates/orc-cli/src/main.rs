//! `orc` developer command line
//!
//! Stores and enhances deployments in an in-memory store snapshotted to a
//! JSON file between invocations.

mod config;
mod logging;
mod state;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use config::OrcConfig;
use orc_deployments::prelude::*;
use orc_events::TracingEventSink;
use orc_store::KvStore;
use orc_tosca::Value;
use std::path::PathBuf;
use std::sync::Arc;

fn cli() -> Command {
    Command::new("orc")
        .version(orc_deployments::VERSION)
        .about("Topology enhancement and attribute mapping for deployments")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("state")
                .long("state")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("JSON snapshot of the store, created if missing"),
        )
        .subcommand(
            Command::new("deploy")
                .about("Store and enhance a topology")
                .arg(Arg::new("id").required(true).help("Deployment id"))
                .arg(
                    Arg::new("topology")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Topology YAML file"),
                ),
        )
        .subcommand(
            Command::new("set-attribute")
                .about("Write a value into a nested instance or capability attribute")
                .arg(Arg::new("id").required(true).help("Deployment id"))
                .arg(Arg::new("node").required(true))
                .arg(Arg::new("instance").required(true))
                .arg(
                    Arg::new("name")
                        .required(true)
                        .help("Attribute, or capability followed by its attribute in the path"),
                )
                .arg(Arg::new("value").required(true).help("JSON value, or plain text"))
                .arg(Arg::new("path").num_args(0..).help("Nested path segments")),
        )
        .subcommand(
            Command::new("show")
                .about("Print status, instances and relationships of a deployment")
                .arg(Arg::new("id").required(true).help("Deployment id")),
        )
        .subcommand(Command::new("config").about("Print the effective configuration"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config = OrcConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    logging::init(&config.log);

    let state_path = matches.get_one::<PathBuf>("state").cloned();
    let store = Arc::new(state::load(state_path.as_deref())?);
    let deployments = Deployments::new(
        Arc::clone(&store) as Arc<dyn KvStore>,
        Arc::new(TracingEventSink),
        config.deployments.clone(),
    );

    let result = run(&matches, &deployments, &config).await;
    if let Some(path) = &state_path {
        state::save(&store, path)?;
    }
    result
}

async fn run(matches: &ArgMatches, deployments: &Deployments, config: &OrcConfig) -> Result<()> {
    match matches.subcommand() {
        Some(("deploy", args)) => {
            let id = required(args, "id")?;
            let topology = args
                .get_one::<PathBuf>("topology")
                .context("missing topology file")?;
            deployments
                .store_deployment_definition(id, topology)
                .await
                .with_context(|| format!("failed to deploy {id}"))?;
            print!("{}", render(deployments, id).await?);
        }
        Some(("set-attribute", args)) => {
            let id = required(args, "id")?;
            let node = required(args, "node")?;
            let instance = required(args, "instance")?;
            let name = required(args, "name")?;
            let value = parse_value(required(args, "value")?);
            let path: Vec<String> = args
                .get_many::<String>("path")
                .map(|segments| segments.cloned().collect())
                .unwrap_or_default();
            deployments
                .resolve_attribute_mapping(id, node, instance, name, value, &path)
                .await
                .with_context(|| format!("failed to set {name} on {node}/{instance}"))?;
        }
        Some(("show", args)) => {
            let id = required(args, "id")?;
            print!("{}", render(deployments, id).await?);
        }
        Some(("config", _)) => {
            print!("{}", toml::to_string_pretty(config)?);
        }
        _ => anyhow::bail!("unknown command"),
    }
    Ok(())
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing argument {name}"))
}

/// JSON text is decoded, anything else is a scalar
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::scalar(raw))
}

/// Human-readable summary of a deployment
async fn render(deployments: &Deployments, id: &str) -> Result<String> {
    let status = deployments
        .status(id)
        .await?
        .map_or_else(|| "UNKNOWN".to_string(), |s| s.to_string());
    let mut out = format!("deployment {id}: {status}\n");

    for node in deployments.node_names(id).await? {
        let count = deployments.nb_instances(id, &node).await?;
        out.push_str(&format!("  {node}: {count} instance(s)\n"));
        for record in deployments.relationship_instances(id, &node).await? {
            out.push_str(&format!(
                "    {}/{} -[{}]-> {} {:?}\n",
                node,
                record.instance,
                record.relationship.relationship_type,
                record.relationship.target,
                record.relationship.target_instances,
            ));
        }
    }
    Ok(out)
}
