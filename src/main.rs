use anyhow::{anyhow, Context, Result};
use bulk_checker::config::DEFAULT_IP_LOOKUP_URL;
use bulk_checker::input::load_items;
use bulk_checker::{CheckerConfig, Dispatcher, ProxyParser, ProxyType, RequestProfile};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Bulk identity checker with multi-threading and rotating proxy support
#[derive(Parser)]
#[command(name = "bulk-checker")]
#[command(about = "Bulk identity checker with multi-threading and rotating proxy support")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every item of a list against the verification endpoint
    Check {
        /// Verification endpoint receiving one POST per attempt
        #[arg(short, long)]
        endpoint: String,
        /// Item list file, one item per line (prompted when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Number of concurrent workers (prompted when omitted)
        #[arg(short = 'n', long)]
        threads: Option<usize>,
        /// Proxy list file; missing file means direct connections
        #[arg(short, long, default_value = "proxy.txt")]
        proxies: PathBuf,
        /// Proxy type for lines without a scheme (http, https, socks5)
        #[arg(short = 't', long, default_value = "http")]
        proxy_type: String,
        /// Directory receiving live.txt and dead.txt
        #[arg(short, long, default_value = "result")]
        output: PathBuf,
        /// Timeout per attempt in seconds
        #[arg(long, default_value = "10")]
        timeout: u64,
        /// Pause after every attempt in milliseconds
        #[arg(long, default_value = "100")]
        throttle_ms: u64,
        /// Give up on an item after this many attempts (default: never)
        #[arg(long)]
        max_attempts: Option<u32>,
        /// JSON field carrying the item in the request body
        #[arg(long, default_value = "email")]
        body_field: String,
        /// User-Agent header value (default: a browser agent picked at random per run)
        #[arg(long)]
        user_agent: Option<String>,
        /// Extra request header, "Name: value" (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
        /// URL reporting the egress IP as {"ip": ...}
        #[arg(long, default_value = DEFAULT_IP_LOOKUP_URL)]
        ip_lookup_url: String,
        /// Skip the egress IP lookup
        #[arg(long)]
        no_ip_lookup: bool,
    },
    /// Parse a proxy list and print the routes it yields
    Proxies {
        /// Proxy list file
        input: PathBuf,
        /// Proxy type for lines without a scheme (http, https, socks5)
        #[arg(short = 't', long, default_value = "http")]
        proxy_type: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bulk_checker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            endpoint,
            input,
            threads,
            proxies,
            proxy_type,
            output,
            timeout,
            throttle_ms,
            max_attempts,
            body_field,
            user_agent,
            headers,
            ip_lookup_url,
            no_ip_lookup,
        } => {
            let ptype: ProxyType = proxy_type.parse()?;
            let input = match input {
                Some(path) => path,
                None => PathBuf::from(prompt("Enter item list file name (e.g., emails.txt): ")?),
            };
            let threads = match threads {
                Some(n) => n,
                None => prompt_threads()?,
            };

            let proxies = ProxyParser::load_or_empty(&proxies, ptype);

            let items = load_items(&input)
                .with_context(|| format!("Failed to read item list '{}'", input.display()))?;

            let mut profile = RequestProfile::new().with_body_field(body_field);
            if let Some(user_agent) = user_agent {
                profile = profile.with_user_agent(user_agent);
            }
            for header in &headers {
                let (name, value) = RequestProfile::parse_header_arg(header)?;
                profile = profile.with_header(name, value);
            }

            let config = CheckerConfig::new(endpoint)
                .with_concurrency(threads)
                .with_timeout(Duration::from_secs(timeout))
                .with_throttle(Duration::from_millis(throttle_ms))
                .with_max_attempts(max_attempts)
                .with_output_dir(output)
                .with_ip_lookup_url((!no_ip_lookup).then_some(ip_lookup_url))
                .with_profile(profile);

            let dispatcher = Dispatcher::from_config(&config, proxies)
                .context("Failed to prepare the check")?;
            info!(run_id = %config.profile.run_id, items = items.len(), "Items loaded");

            let summary = dispatcher.run(&items).await;

            println!();
            println!("Check finished in {:.2}s", summary.elapsed.as_secs_f64());
            println!(
                "Results: {} live, {} dead of {} items",
                summary.live, summary.dead, summary.total
            );
            println!("Results saved in '{}'", config.output_dir.display());
            for report in summary.abandoned() {
                warn!(item = %report.item, attempts = report.attempts, verdict = ?report.verdict, "Item left unclassified");
            }
        }
        Commands::Proxies { input, proxy_type } => {
            let ptype: ProxyType = proxy_type.parse()?;
            let proxies = ProxyParser::parse_file(&input, ptype)
                .with_context(|| format!("Failed to read proxy list '{}'", input.display()))?;

            println!("Parsed {} proxies from {:?}", proxies.len(), input);
            for (index, proxy) in proxies.iter().enumerate() {
                println!("{:>4}  {}", index, proxy);
            }
        }
    }

    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(anyhow!("stdin closed while waiting for input"));
    }
    Ok(line.trim().to_string())
}

/// Ask for the worker count until a positive integer is given
fn prompt_threads() -> Result<usize> {
    loop {
        match prompt("Enter number of threads (e.g., 120): ")?.parse::<usize>() {
            Ok(0) => println!("Number of threads must be greater than 0. Please try again."),
            Ok(n) => return Ok(n),
            Err(_) => println!("Invalid input. Please enter a number for the number of threads."),
        }
    }
}
