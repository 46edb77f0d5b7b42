use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use codesearch_harvest_core::{
    default_cookie_jar_path, discover_batch_files, dispatch, make_search_job, templates,
    CancellationToken, ClientConfig, CookieJar, Credentials, DispatchOptions, SearchClient,
    SearchRunner, DEFAULT_CODE_SEARCH_URL, DEFAULT_QUEUE_DEPTH,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "codesearch-harvest", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Code search API base URL (must end in '/')
    #[arg(long, global = true, default_value = DEFAULT_CODE_SEARCH_URL)]
    base_url: String,

    /// Bearer token for the code search API
    #[arg(long, global = true, env = "CODESEARCH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Cookie jar file with `name=value; name=value` entries
    #[arg(long, global = true)]
    cookie_jar: Option<PathBuf>,

    /// Load the cookie jar from the default config location
    #[arg(long, global = true, default_value_t = false)]
    default_cookie_jar: bool,

    /// User-Agent header sent with each request
    #[arg(long, global = true)]
    user_agent: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Run every job in the batch files of a folder and write one result file per query.
    Run {
        /// Folder containing `*.json` batch files.
        #[arg(long)]
        in_dir: PathBuf,
        /// Folder that receives `<sha1(query)>.json` result files.
        #[arg(long)]
        out_dir: PathBuf,
        /// Jobs buffered between the batch readers and the runner.
        #[arg(long, default_value_t = DEFAULT_QUEUE_DEPTH)]
        queue_depth: usize,
    },
    /// List the predefined search templates.
    Templates,
    /// Write a batch file built from predefined templates.
    Batch {
        /// Template name; repeat for several jobs.
        #[arg(long = "template", required = true)]
        templates: Vec<String>,
        /// Query prefix prepended to every template, e.g. `org:kubernetes`.
        #[arg(long, default_value = "")]
        prefix: String,
        /// Override the template's page budget.
        #[arg(long)]
        max_page: Option<u32>,
        /// Destination batch file.
        #[arg(long)]
        output: PathBuf,
    },
}

fn credentials(cli: &Cli) -> anyhow::Result<Credentials> {
    let jar_path = match &cli.token {
        Some(_) => None,
        None => cookie_jar_path(cli.cookie_jar.as_deref(), cli.default_cookie_jar)?,
    };
    resolve_credentials(cli.token.as_deref(), jar_path.as_deref())
}

/// An explicit `--cookie-jar` wins over `--default-cookie-jar`.
fn cookie_jar_path(explicit: Option<&Path>, use_default: bool) -> anyhow::Result<Option<PathBuf>> {
    match (explicit, use_default) {
        (Some(path), _) => Ok(Some(path.to_path_buf())),
        (None, true) => default_cookie_jar_path()
            .context("no config directory for the default cookie jar")
            .map(Some),
        (None, false) => Ok(None),
    }
}

/// A token wins over a cookie jar. With neither, requests go out anonymous.
fn resolve_credentials(
    token: Option<&str>,
    jar_path: Option<&Path>,
) -> anyhow::Result<Credentials> {
    if let Some(token) = token {
        return Ok(Credentials::Bearer(token.to_string()));
    }

    match jar_path {
        Some(path) => {
            let jar = CookieJar::load(path)
                .with_context(|| format!("failed to load cookie jar {}", path.display()))?;
            info!(path = %path.display(), cookies = jar.cookies().len(), "loaded cookie jar");
            Ok(Credentials::Cookies(jar))
        }
        None => Ok(Credentials::Anonymous),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "codesearch-harvest boot"
    );

    match &cli.command {
        Command::Run {
            in_dir,
            out_dir,
            queue_depth,
        } => {
            let mut config = ClientConfig::new(&cli.base_url, credentials(&cli)?);
            config.user_agent = cli.user_agent.clone();
            let runner = SearchRunner::new(SearchClient::new(config)?);

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, cancelling in-flight request");
                    on_signal.cancel();
                }
            });

            let files = discover_batch_files(in_dir)
                .with_context(|| format!("failed to read batch folder {}", in_dir.display()))?;
            if files.is_empty() {
                warn!(in_dir = %in_dir.display(), "no batch files found");
            }
            info!(
                in_dir = %in_dir.display(),
                file_count = files.len(),
                "dispatching batch files"
            );

            tokio::fs::create_dir_all(out_dir)
                .await
                .with_context(|| format!("failed to create {}", out_dir.display()))?;

            let options = DispatchOptions {
                output_dir: out_dir.clone(),
                queue_depth: *queue_depth,
            };
            let outcome = dispatch(&runner, &cancel, files, &options).await;

            if let Some(reset) = runner.search().rate_limits().secondary_rate_limit_reset() {
                warn!(reset = %reset.to_rfc3339(), "secondary rate limit observed during run");
            }

            let report = outcome?;
            println!(
                "{} jobs written to {} at {}",
                report.jobs_run,
                out_dir.display(),
                Utc::now().to_rfc3339()
            );
        }
        Command::Templates => {
            for template in templates() {
                println!("{:<26} {}", template.name, template.description);
            }
        }
        Command::Batch {
            templates,
            prefix,
            max_page,
            output,
        } => {
            let jobs = templates
                .iter()
                .map(|name| {
                    make_search_job(name, prefix).map(|mut job| {
                        if let Some(max_page) = max_page {
                            job.max_page = *max_page;
                        }
                        job
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let mut encoded = serde_json::to_string_pretty(&jobs)?;
            encoded.push('\n');
            tokio::fs::write(output, encoded)
                .await
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("{} jobs written to {}", jobs.len(), output.display());
        }
    }

    Ok(())
}
