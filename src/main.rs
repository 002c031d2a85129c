mod api;
mod database;
mod error;
mod studio;
mod utils;

use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use anyhow::{Result, Context};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::{info, error};
use tracing_subscriber::EnvFilter;

use crate::studio::client::{ArtSink, GraphqlClient};
use crate::studio::palette::{Palette, Shape};
use crate::studio::render::{ArtParams, DEFAULT_COMPLEXITY, DEFAULT_RANDOMNESS};
use crate::utils::config::{load_settings, Overrides, Settings};

#[derive(Parser, Debug)]
#[command(author, version, about = "Digital Dreamscapes generative art server and studio", long_about = None)]
struct Args {
    /// `.env`-style settings file; ignored when missing.
    #[arg(short, long, global = true, default_value = ".env")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the GraphQL art server (default).
    Serve(ServeArgs),
    /// Render a single piece, write it as PNG and optionally save it.
    Generate(GenerateArgs),
    /// Interactive studio reading commands from stdin.
    Studio(StudioArgs),
}

#[derive(ClapArgs, Debug, Default)]
struct ServeArgs {
    #[arg(short, long)]
    db_path: Option<PathBuf>,

    #[arg(long)]
    host: Option<IpAddr>,

    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(ClapArgs, Debug)]
struct GenerateArgs {
    #[arg(long, default_value = "Ocean Breeze")]
    palette: Palette,

    #[arg(long, default_value = "Mixed")]
    shape: Shape,

    #[arg(long, default_value_t = DEFAULT_COMPLEXITY)]
    complexity: u32,

    #[arg(long, default_value_t = DEFAULT_RANDOMNESS)]
    randomness: u32,

    /// Random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = studio::CANVAS_WIDTH)]
    width: u32,

    #[arg(long, default_value_t = studio::CANVAS_HEIGHT)]
    height: u32,

    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Store the piece on the server.
    #[arg(long)]
    save: bool,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    endpoint: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct StudioArgs {
    #[arg(long)]
    endpoint: Option<String>,

    #[arg(long)]
    debounce_ms: Option<u64>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    match args.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(serve) => {
            let settings = load_settings(
                &args.config,
                Overrides {
                    db_path: serve.db_path,
                    host: serve.host,
                    port: serve.port,
                    ..Overrides::default()
                },
            )?;
            serve_blocking(settings)
        }
        Command::Generate(opts) => {
            let settings = load_settings(
                &args.config,
                Overrides {
                    endpoint: opts.endpoint,
                    ..Overrides::default()
                },
            )?;
            let params = ArtParams {
                palette: opts.palette,
                shape: opts.shape,
                complexity: opts.complexity,
                randomness: opts.randomness,
                seed: opts.seed.unwrap_or_else(rand::random),
            };
            info!(?params, "Generating artwork");

            let client = if opts.save {
                Some(GraphqlClient::new(settings.endpoint.clone())?)
            } else {
                None
            };
            let save = client.as_ref().map(|c| (c as &dyn ArtSink, opts.title.clone()));

            let saved = studio::generate_once(&params, (opts.width, opts.height), opts.output.as_deref(), save)?;
            if let Some(art) = saved {
                println!("{}", art.id);
            }
            Ok(())
        }
        Command::Studio(st) => {
            let settings = load_settings(
                &args.config,
                Overrides {
                    endpoint: st.endpoint,
                    debounce_ms: st.debounce_ms,
                    ..Overrides::default()
                },
            )?;
            studio::run(&settings)
        }
    }
}

fn serve_blocking(settings: Settings) -> Result<()> {
    info!("Digital Dreamscapes server starting...");
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(api::server::run(settings))
}
