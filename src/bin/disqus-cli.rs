use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use disqus_api::{ClientConfig, DisqusApi, Interface, Paginator, Params};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(
    name = "disqus-cli",
    version,
    about = "Small CLI for calling the Disqus API through its interface description"
)]
struct Cli {
    /// Path to the JSON interface description (resources, methods, required params).
    #[arg(long, env = "DISQUS_INTERFACES", value_name = "PATH")]
    interfaces: PathBuf,

    /// API secret key, sent as `api_secret`.
    #[arg(long, env = "DISQUS_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// Public API key, sent as `api_key`.
    #[arg(long, env = "DISQUS_PUBLIC_KEY")]
    public_key: Option<String>,

    /// User access token, sent as `access_token`.
    #[arg(long, env = "DISQUS_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// API version used in request paths.
    #[arg(long, env = "DISQUS_API_VERSION", default_value = disqus_api::DEFAULT_API_VERSION)]
    api_version: String,

    /// API host.
    #[arg(long, env = "DISQUS_HOST", default_value = disqus_api::DEFAULT_HOST)]
    host: String,

    /// Emit compact JSON instead of pretty-printed output.
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List endpoints declared in the interface description.
    Interfaces {
        /// Filter endpoints by substring match on the path (case-insensitive).
        #[arg(long)]
        filter: Option<String>,
    },
    /// Call a resource once and print its response.
    Call(CallArgs),
    /// Follow cursors across a list resource and print every item.
    Paginate(PaginateArgs),
}

#[derive(Debug, Args)]
struct CallArgs {
    /// Resource path (for example: forums/listThreads).
    path: String,

    /// Parameter in form key=value. Repeat a key to send a list.
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// HTTP method overriding the one declared by the interface.
    #[arg(long)]
    method: Option<String>,
}

#[derive(Debug, Args)]
struct PaginateArgs {
    #[command(flatten)]
    call: CallArgs,

    /// Stop after this many items.
    #[arg(long)]
    limit: Option<usize>,

    /// End quietly when the API reports a rate limit.
    #[arg(long)]
    silence_limit: bool,
}

/// Entry point for the CLI.
///
/// Loads the interface description, builds a client from flags/environment,
/// dispatches subcommands, and prints JSON output.
fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let interface = load_interface(&cli.interfaces)?;

    if let Command::Interfaces { filter } = &cli.command {
        print_endpoints(&interface, filter.as_deref());
        return Ok(());
    }

    let config = ClientConfig {
        secret_key: cli.secret_key.clone(),
        public_key: cli.public_key.clone(),
        access_token: cli.access_token.clone(),
        api_version: cli.api_version.clone(),
        host: cli.host.clone(),
    };
    let api = DisqusApi::from_config(interface, config);

    let output = match &cli.command {
        Command::Interfaces { .. } => unreachable!("handled above"),
        Command::Call(args) => {
            call(&api, args).with_context(|| format!("call failed: '{}'", args.path))?
        }
        Command::Paginate(args) => paginate(&api, args)
            .with_context(|| format!("pagination failed: '{}'", args.call.path))?,
    };

    print_json(&output, cli.compact).context("failed to print JSON output")?;
    Ok(())
}

fn load_interface(path: &Path) -> Result<Interface> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read interfaces file '{}'", path.display()))?;
    Interface::from_json_str(&raw)
        .with_context(|| format!("failed to parse interfaces file '{}'", path.display()))
}

/// Prints the endpoints declared in the interface description.
fn print_endpoints(interface: &Interface, filter: Option<&str>) {
    let filter = filter.map(str::to_ascii_lowercase);

    let endpoints: Vec<_> = interface
        .endpoints()
        .into_iter()
        .filter(|endpoint| {
            filter
                .as_ref()
                .is_none_or(|needle| endpoint.path.to_ascii_lowercase().contains(needle))
        })
        .collect();

    let (path_width, method_width) =
        endpoints
            .iter()
            .fold((0usize, 0usize), |(path_max, method_max), endpoint| {
                (
                    path_max.max(endpoint.path.len()),
                    method_max.max(endpoint.method.len()),
                )
            });

    for endpoint in endpoints {
        println!(
            "{:<path_width$}  {:<method_width$}  {}",
            endpoint.path,
            endpoint.method,
            endpoint.required.join(",")
        );
    }
}

fn call(api: &DisqusApi, args: &CallArgs) -> Result<Value> {
    let params = build_params(args)?;
    let response = api.resource(&args.path).call(params)?;
    Ok(response.into_value())
}

fn paginate(api: &DisqusApi, args: &PaginateArgs) -> Result<Value> {
    let params = build_params(&args.call)?;
    let paginator = Paginator::new(api.resource(&args.call.path), params);
    let items = paginator
        .run(args.limit, args.silence_limit)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Array(items))
}

/// Builds call parameters from repeated `key=value` args and `--method`.
///
/// A key given more than once is sent as a list.
fn build_params(args: &CallArgs) -> Result<Params> {
    let mut params = Params::new();
    for (key, value) in parse_pairs(&args.params, "--param")? {
        match params.get_mut(&key) {
            Some(existing) => existing.push(value),
            None => {
                params.insert(key, value);
            }
        }
    }
    if let Some(method) = &args.method {
        params.insert("method", method.as_str());
    }
    Ok(params)
}

/// Parses repeated `key=value` arguments into owned key/value pairs.
///
/// Returns an error when a value does not include `=` or has an empty key.
fn parse_pairs(values: &[String], flag_name: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::with_capacity(values.len());
    for item in values {
        let Some((key, value)) = item.split_once('=') else {
            bail!("invalid {flag_name} value '{item}': expected key=value");
        };
        if key.is_empty() {
            bail!("invalid {flag_name} value '{item}': empty key");
        }
        pairs.push((key.to_owned(), value.to_owned()));
    }
    Ok(pairs)
}

/// Prints a JSON value either compact or pretty-formatted.
fn print_json(value: &Value, compact: bool) -> Result<()> {
    if compact {
        println!(
            "{}",
            serde_json::to_string(value).context("Failed to render JSON")?
        );
    } else {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("Failed to render JSON")?
        );
    }
    Ok(())
}
