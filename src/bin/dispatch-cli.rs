use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use axum::http::Uri;
use clap::{Parser, Subcommand};

use dispatch_core::app;
use dispatch_core::config::{load_config, AppConfig};
use dispatch_core::routing::{verify_signed_url, Router, UrlOptions};
use dispatch_core::security::MessageVerifier;

#[derive(Parser)]
#[command(name = "dispatch-cli")]
#[command(
    about = "Inspect routes and build URLs for the dispatch-core demo app",
    long_about = None
)]
struct Cli {
    /// Config file (TOML); defaults apply when omitted.
    #[arg(short, long, env = "DISPATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the committed route table in match order
    Routes {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Build the URL of a route (name, pattern or Controller.method)
    Url {
        identifier: String,
        #[command(flatten)]
        options: UrlArgs,
    },
    /// Build a signed URL of a route
    Sign {
        identifier: String,
        #[command(flatten)]
        options: UrlArgs,
        /// Seconds until the signature expires
        #[arg(long)]
        expires_in: Option<u64>,
    },
    /// Check the signature of a URL
    Verify { url: String },
}

#[derive(clap::Args)]
struct UrlArgs {
    /// Route parameter, `key=value` (repeatable)
    #[arg(short, long = "param", value_parser = parse_pair)]
    params: Vec<(String, String)>,

    /// Query string entry, `key=value` (repeatable)
    #[arg(short, long = "qs", value_parser = parse_pair)]
    qs: Vec<(String, String)>,

    /// Pick the route registered for this domain pattern
    #[arg(long)]
    domain: Option<String>,
}

impl UrlArgs {
    fn to_options(&self) -> UrlOptions {
        let mut options = UrlOptions::new().params(self.params.iter().cloned());
        for (key, value) in &self.qs {
            options = options.query(key.clone(), value);
        }
        if let Some(domain) = &self.domain {
            options = options.domain(domain.clone());
        }
        options
    }
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))
}

fn committed_router() -> Result<Router, Box<dyn std::error::Error>> {
    let mut router = app::router()?;
    router.commit()?;
    Ok(router)
}

fn print_routes(router: &Router, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let routes: Vec<_> = router.routes().map(|r| r.to_json()).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&routes)?);
        return Ok(());
    }

    println!("{:<14} {:<28} {:<22} {:<32} MIDDLEWARE", "METHOD", "PATTERN", "NAME", "HANDLER");
    for route in &routes {
        let methods = route["methods"]
            .as_array()
            .map(|m| m.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>().join("|"))
            .unwrap_or_default();
        let pattern = match route["domain"].as_str() {
            Some(domain) => format!("{}{}", domain, route["pattern"].as_str().unwrap_or_default()),
            None => route["pattern"].as_str().unwrap_or_default().to_string(),
        };
        let middleware = route["middleware"]
            .as_array()
            .map(|m| m.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        println!(
            "{:<14} {:<28} {:<22} {:<32} {}",
            methods,
            pattern,
            route["name"].as_str().unwrap_or("-"),
            route["handler"].as_str().unwrap_or_default(),
            middleware
        );
    }
    Ok(())
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    let verifier = MessageVerifier::new(app::app_key(&config));

    match cli.command {
        Commands::Routes { json } => {
            print_routes(&committed_router()?, json)?;
        }
        Commands::Url { identifier, options } => {
            match committed_router()?.url_for(&identifier, &options.to_options())? {
                Some(url) => println!("{}", url),
                None => {
                    eprintln!("No route matches `{}`", identifier);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Sign {
            identifier,
            options,
            expires_in,
        } => {
            let mut url_options = options.to_options();
            if let Some(secs) = expires_in {
                url_options = url_options.expires_in(Duration::from_secs(secs));
            }
            match committed_router()?.url_for_signed(&identifier, &url_options, &verifier)? {
                Some(url) => println!("{}", url),
                None => {
                    eprintln!("No route matches `{}`", identifier);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Verify { url } => {
            let uri: Uri = url.parse()?;
            if verify_signed_url(uri.path(), uri.query().unwrap_or_default(), &verifier) {
                println!("valid");
            } else {
                println!("invalid");
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
