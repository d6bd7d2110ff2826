//! livefiles CLI
//!
//! Operator tool for a live file cache: crawl a directory, inspect what would
//! be served, or keep the cache running and report statistics.
//!
//! ## Usage
//!
//! ```bash
//! livefiles --root public list --long
//! livefiles --config livefiles.toml get /css/site.css --decompress
//! livefiles --root public -vv watch --interval 5
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use livefiles_cache::{LiveFilesConfig, LocalFiles, Lookup};
use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "livefiles")]
#[command(about = "Live-updating precompressed static file cache", long_about = None)]
#[command(version)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// TOML configuration file
	#[arg(short, long, value_name = "PATH", global = true)]
	config: Option<PathBuf>,

	/// Served root directory (overrides the configuration file)
	#[arg(short, long, value_name = "DIRECTORY", global = true)]
	root: Option<PathBuf>,

	/// Verbosity level (can be repeated)
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	verbosity: u8,
}

#[derive(Subcommand)]
enum Commands {
	/// List every directory and file route in the cache
	List {
		/// Show original and compressed sizes
		#[arg(short, long)]
		long: bool,
	},

	/// Print the cached body of one route to stdout
	Get {
		/// Route to look up, e.g. /css/site.css
		#[arg(value_name = "ROUTE")]
		route: String,

		/// Write the uncompressed content instead of the gzip body
		#[arg(long)]
		decompress: bool,

		/// Print response headers to stderr
		#[arg(long)]
		headers: bool,
	},

	/// Keep the cache live and report statistics until interrupted
	Watch {
		/// Seconds between statistics reports
		#[arg(long, value_name = "SECONDS", default_value_t = 10)]
		interval: u64,
	},
}

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	init_logging(cli.verbosity);

	let result = match load_config(cli.config.as_ref(), cli.root.as_ref()) {
		Ok(config) => match cli.command {
			Commands::List { long } => run_list(config, long),
			Commands::Get {
				route,
				decompress,
				headers,
			} => run_get(config, &route, decompress, headers),
			Commands::Watch { interval } => run_watch(config, interval).await,
		},
		Err(e) => Err(e),
	};

	if let Err(e) = result {
		eprintln!("{}: {}", "Error".red(), e);
		process::exit(1);
	}
}

fn init_logging(verbosity: u8) {
	let default_level = match verbosity {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	};
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();
}

fn load_config(
	path: Option<&PathBuf>,
	root: Option<&PathBuf>,
) -> Result<LiveFilesConfig, Box<dyn Error>> {
	let mut config = match path {
		Some(path) => LiveFilesConfig::from_file(path)?,
		None => LiveFilesConfig::default(),
	};
	if let Some(root) = root {
		config.root = root.clone();
	}
	config.validate()?;
	Ok(config)
}

fn run_list(config: LiveFilesConfig, long: bool) -> CliResult {
	let files = LocalFiles::new(config)?;
	let store = files.store();

	for route in files.browse() {
		if store.is_directory(&route) {
			println!("{}", route.blue().bold());
			continue;
		}
		match store.get(&route).entry() {
			Some(entry) if long => {
				let meta = entry.metadata();
				println!(
					"{:<48} {:>10} {:>10}  {}",
					route, meta.original_size, meta.compressed_size, meta.mime_type
				);
			}
			_ => println!("{}", route),
		}
	}

	let stats = files.statistics();
	eprintln!(
		"{} files, {} directories, {} -> {} bytes",
		stats.entry_count.to_string().green(),
		stats.directory_count.to_string().green(),
		stats.original_bytes,
		stats.compressed_bytes
	);
	Ok(())
}

fn run_get(config: LiveFilesConfig, route: &str, decompress: bool, headers: bool) -> CliResult {
	let files = LocalFiles::new(config)?;

	match files.get_file(route) {
		Lookup::Found(entry) => {
			if headers {
				for (name, value) in entry.headers().iter() {
					eprintln!("{}: {}", name.as_str().cyan(), value.to_str().unwrap_or("<binary>"));
				}
			}
			let mut stdout = std::io::stdout().lock();
			if decompress {
				stdout.write_all(&entry.decompress()?)?;
			} else {
				stdout.write_all(entry.body())?;
			}
			stdout.flush()?;
			Ok(())
		}
		Lookup::Redirect(redirect) => {
			eprintln!(
				"{} {} -> {}",
				redirect.status().as_u16().to_string().yellow(),
				route,
				redirect.location
			);
			Ok(())
		}
		Lookup::NotFound => Err(format!("{} not found", route).into()),
	}
}

async fn run_watch(config: LiveFilesConfig, interval: u64) -> CliResult {
	let files = LocalFiles::new(config)?;
	files.start()?;
	eprintln!(
		"{} watching {} ({} files)",
		"Started".green(),
		files.root().display(),
		files.store().len()
	);

	let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
	ticker.tick().await;
	loop {
		tokio::select! {
			signal = tokio::signal::ctrl_c() => {
				signal?;
				break;
			}
			_ = ticker.tick() => {
				let stats = files.statistics();
				eprintln!(
					"{} files, {} directories, {} bytes compressed ({:.1}% of original)",
					stats.entry_count,
					stats.directory_count,
					stats.compressed_bytes,
					stats.compression_ratio() * 100.0
				);
			}
		}
	}

	eprintln!("{}", "Stopping...".yellow());
	tokio::task::spawn_blocking(move || files.shutdown()).await?;
	Ok(())
}
