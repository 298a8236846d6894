//! graphbox - preview environments for generated visualisation apps
//!
//! ## Commands
//!
//! - `provision`: build a preview for a source file and print its URL
//! - `scaffold`: write or list the generated project without running it
//! - `tool`: answer one `generate_graph` tool call (JSON on stdin/stdout)
//! - `tool-schema`: print the `generate_graph` tool definition

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use graphbox_core::tool::{execute_with_observer, ToolResponse};
use graphbox_core::{
    execute_generate_graph, init_tracing, tool_definition, FileOp, GenerationRequest, LogFormat,
    LogObserver, Orchestrator, PreviewConfig, ProjectFileSet, Scaffolder, ToolRequest,
};
use graphbox_local::{LocalProvider, LocalProviderConfig};

#[derive(Parser)]
#[command(name = "graphbox")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Ephemeral preview environments for generated React apps", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML configuration file
    #[arg(long, global = true, env = "GRAPHBOX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct ProviderArgs {
    /// Directory holding one subdirectory per environment
    #[arg(long, env = "GRAPHBOX_ROOT")]
    root: Option<PathBuf>,

    /// Hostname suffix for preview URLs
    #[arg(long, env = "GRAPHBOX_HOST_SUFFIX", default_value = "localhost")]
    host_suffix: String,
}

impl ProviderArgs {
    fn provider(&self) -> LocalProvider {
        let mut config = LocalProviderConfig {
            host_suffix: self.host_suffix.clone(),
            ..LocalProviderConfig::default()
        };
        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        LocalProvider::new(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Provision a preview environment and print its URL
    Provision {
        /// Root component source (`-` for stdin)
        #[arg(long)]
        code: String,

        /// Extra npm package (repeatable, `name` or `name@version`)
        #[arg(long = "dep")]
        deps: Vec<String>,

        /// Overall time budget in seconds (0 disables it)
        #[arg(long)]
        timeout: Option<u64>,

        /// Keep the dev server running until Ctrl-C, then tear it down
        #[arg(long)]
        hold: bool,

        #[command(flatten)]
        provider: ProviderArgs,
    },

    /// Generate the project files without provisioning
    Scaffold {
        /// Root component source (`-` for stdin)
        #[arg(long)]
        code: String,

        /// Extra npm package (repeatable)
        #[arg(long = "dep")]
        deps: Vec<String>,

        /// Write the project into this directory instead of listing it
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Answer a `generate_graph` tool call read from stdin
    Tool {
        #[command(flatten)]
        provider: ProviderArgs,
    },

    /// Print the `generate_graph` tool definition
    ToolSchema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(LogFormat::from_json_flag(cli.json), level);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Provision {
            code,
            deps,
            timeout,
            hold,
            provider,
        } => cmd_provision(config, &code, deps, timeout, hold, &provider).await,
        Commands::Scaffold { code, deps, out } => cmd_scaffold(&config, &code, &deps, out.as_deref()),
        Commands::Tool { provider } => cmd_tool(config, &provider).await,
        Commands::ToolSchema => cmd_tool_schema(),
    }
}

fn load_config(path: Option<&Path>) -> Result<PreviewConfig> {
    let config = match path {
        Some(path) => PreviewConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PreviewConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("Invalid GRAPHBOX_* environment override")
}

fn read_source(code: &str) -> Result<String> {
    if code == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read source from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(code).with_context(|| format!("Failed to read source file {}", code))
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn cmd_provision(
    mut config: PreviewConfig,
    code: &str,
    deps: Vec<String>,
    timeout: Option<u64>,
    hold: bool,
    provider_args: &ProviderArgs,
) -> Result<()> {
    if let Some(secs) = timeout {
        config.timeout_secs = secs;
    }
    let source = read_source(code)?;
    let provider = Arc::new(provider_args.provider());
    let orchestrator = Orchestrator::new(provider.clone(), config);
    let observer: Arc<dyn LogObserver> = Arc::new(|line: &str| println!("{}", line));

    let request = GenerationRequest::new(source, deps);
    let result = orchestrator
        .run_until(&request, Some(observer), ctrl_c())
        .await;

    let response = ToolResponse::from(result);
    println!("{}", serde_json::to_string_pretty(&response)?);

    let url = match &response {
        ToolResponse::Ready { url, .. } => url.clone(),
        ToolResponse::Failed { error, .. } => bail!("Provisioning failed: {}", error),
    };

    if hold {
        info!(url = %url, "Holding preview; press Ctrl-C to tear down");
        ctrl_c().await;
        if let Some(env) = environment_from_url(&url, provider.config().host_suffix.as_str()) {
            provider
                .destroy(&env)
                .await
                .context("Failed to tear down environment")?;
        }
    }
    Ok(())
}

/// Recover the environment id from `https://<port>-<id>.<suffix>`.
fn environment_from_url(url: &str, host_suffix: &str) -> Option<graphbox_core::EnvironmentId> {
    let host = url.strip_prefix("https://")?;
    let label = host.strip_suffix(host_suffix)?.strip_suffix('.')?;
    let (_port, id) = label.split_once('-')?;
    Some(graphbox_core::EnvironmentId(id.to_string()))
}

fn cmd_scaffold(config: &PreviewConfig, code: &str, deps: &[String], out: Option<&Path>) -> Result<()> {
    let source = read_source(code)?;
    let file_set = Scaffolder::from_config(config).scaffold(&source, deps);

    match out {
        Some(dir) => {
            write_file_set(dir, &file_set)?;
            println!("Wrote {} entries to {}", file_set.len(), dir.display());
        }
        None => {
            for op in file_set.ops() {
                match op {
                    FileOp::CreateDir { path } => println!("dir   {}/", path),
                    FileOp::WriteFile { path, contents } => {
                        println!("file  {} ({} bytes)", path, contents.len())
                    }
                }
            }
        }
    }
    println!("Digest: {}", file_set.digest());
    Ok(())
}

fn write_file_set(dir: &Path, file_set: &ProjectFileSet) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    for op in file_set.ops() {
        let target = dir.join(op.path());
        match op {
            FileOp::CreateDir { .. } => std::fs::create_dir_all(&target),
            FileOp::WriteFile { contents, .. } => std::fs::write(&target, contents),
        }
        .with_context(|| format!("Failed to write {}", target.display()))?;
    }
    Ok(())
}

async fn cmd_tool(config: PreviewConfig, provider_args: &ProviderArgs) -> Result<()> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("Failed to read tool request from stdin")?;
    let request: ToolRequest = serde_json::from_str(&raw).context("Invalid tool request JSON")?;

    let orchestrator = Orchestrator::new(Arc::new(provider_args.provider()), config);
    let response = if tracing::enabled!(Level::DEBUG) {
        let observer: Arc<dyn LogObserver> =
            Arc::new(|line: &str| tracing::debug!(target: "graphbox::tool", "{}", line));
        execute_with_observer(&orchestrator, request, Some(observer)).await
    } else {
        execute_generate_graph(&orchestrator, request).await
    };

    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

fn cmd_tool_schema() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&tool_definition())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_provision_collects_repeated_deps() {
        let cli = Cli::try_parse_from([
            "graphbox", "provision", "--code", "App.tsx", "--dep", "recharts", "--dep", "d3@7",
            "--timeout", "90",
        ])
        .unwrap();
        match cli.command {
            Commands::Provision {
                deps, timeout, hold, ..
            } => {
                assert_eq!(deps, vec!["recharts", "d3@7"]);
                assert_eq!(timeout, Some(90));
                assert!(!hold);
            }
            _ => panic!("expected provision"),
        }
    }

    #[test]
    fn test_environment_from_url() {
        let env = environment_from_url("https://5173-0b7c-11aa.localhost", "localhost").unwrap();
        assert_eq!(env.as_str(), "0b7c-11aa");
        assert!(environment_from_url("http://5173-x.localhost", "localhost").is_none());
        assert!(environment_from_url("https://5173-x.other", "localhost").is_none());
    }

    #[test]
    fn test_write_file_set_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file_set = Scaffolder::default().scaffold("export default () => null", &[]);

        write_file_set(dir.path(), &file_set).unwrap();

        assert!(dir.path().join("package.json").is_file());
        let app = std::fs::read_to_string(dir.path().join("src/App.tsx")).unwrap();
        assert_eq!(app, "export default () => null");
    }
}
