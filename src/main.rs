use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use popfilter::{web, Config};

#[derive(Parser)]
#[command(name = "popfilter")]
#[command(about = "Browse your Spotify listening by popularity and build filtered playlists")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Address to listen on (or set POPFILTER_ADDR env var)
        #[arg(long, env = "POPFILTER_ADDR", default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },

    /// Show setup guide
    Setup,
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    match cli.command {
        Commands::Serve { addr } => {
            serve(addr).await?;
        }
        Commands::Setup => {
            show_setup_guide();
        }
    }

    Ok(())
}

async fn serve(addr: SocketAddr) -> Result<()> {
    println!("{}", "Popfilter".cyan().bold());
    println!("{}", "=".repeat(50));

    let config = Config::from_env().context("Failed to load configuration")?;

    let missing = config.get_missing_config();
    if !missing.is_empty() {
        println!("{}", "Missing configuration:".red());
        for item in &missing {
            println!("   - {}", item);
        }
        println!(
            "\n{}",
            "Run `popfilter setup` for instructions.".yellow()
        );
        std::process::exit(1);
    }

    println!("Open {} in your browser", format!("http://{}", addr).green());

    web::serve(config, addr)
        .await
        .context("Web server stopped")?;

    Ok(())
}

fn show_setup_guide() {
    println!("{}", "Popfilter Setup Guide".cyan().bold());
    println!("{}", "=".repeat(50));

    println!("\n{}", "1. Spotify API Setup".yellow());
    println!("   - Go to https://developer.spotify.com/dashboard/");
    println!("   - Create a new app");
    println!("   - Copy your Client ID and Client Secret");
    println!("   - Add 'http://127.0.0.1:8080/callback' as a redirect URI");

    println!("\n{}", "2. Configuration".yellow());
    println!("   - Create a .env file with:");
    println!("     SPOTIFY_CLIENT_ID=your_spotify_client_id");
    println!("     SPOTIFY_CLIENT_SECRET=your_spotify_client_secret");
    println!("     SPOTIFY_REDIRECT_URI=http://127.0.0.1:8080/callback");
    println!("   - Optional:");
    println!("     POPFILTER_ADDR=127.0.0.1:8080");
    println!("     POPFILTER_SAMPLE_SIZE=400");

    println!("\n{}", "3. Usage".yellow());
    println!("   - popfilter serve        (start the server)");
    println!("   - popfilter serve -v     (with debug logging)");

    println!("\n{}", "Ready to go!".green());
}
