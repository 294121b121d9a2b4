mod cli;

use bdscan::{config, report};
use bdscan_disc::{find_bdmv, Disc, DiscOptions, PlaylistFilter, ScanHandlers, ScanOptions};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "bdscan=trace,bdscan_disc=debug".to_string()
        } else {
            "bdscan=info,bdscan_disc=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scan {
            path,
            json,
            stop_on_error,
            ssif,
            all_playlists,
        } => scan_disc(
            &path,
            cli.config.as_deref(),
            ScanFlags {
                json,
                stop_on_error,
                ssif,
                all_playlists,
            },
        ),
        Commands::Locate { path } => locate(&path, cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("bdscan {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

struct ScanFlags {
    json: bool,
    stop_on_error: bool,
    ssif: bool,
    all_playlists: bool,
}

fn scan_disc(path: &Path, config_path: Option<&Path>, flags: ScanFlags) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    let disc_options = DiscOptions {
        bdmv_search_depth: config.scan.bdmv_search_depth,
    };
    let mut disc = Disc::open(path, &disc_options)
        .with_context(|| format!("Failed to open disc at {:?}", path))?;

    let scan_options = ScanOptions {
        enable_ssif: flags.ssif || config.scan.enable_ssif,
        stream_scan_limit: config.scan.stream_scan_limit(),
        ..ScanOptions::default()
    };

    let mut handlers = if flags.stop_on_error || !config.scan.continue_on_error {
        ScanHandlers::new()
    } else {
        ScanHandlers::continue_on_error()
    };
    if flags.json {
        tracing::debug!("Writing JSON report");
    } else {
        handlers = handlers.on_progress(|p| {
            tracing::debug!("[{} {}/{}] {}", p.phase, p.index + 1, p.total, p.item);
        });
    }

    let summary = disc
        .scan(&mut handlers, &scan_options)
        .with_context(|| format!("Failed to scan disc at {:?}", disc.root()))?;

    let filter = if flags.all_playlists {
        PlaylistFilter::all()
    } else {
        PlaylistFilter::from(&config.filter)
    };

    if flags.json {
        let report = report::DiscReport::new(&disc, &summary, &filter);
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report::render_text(&disc, &summary, &filter));
    }

    Ok(())
}

fn locate(path: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let bdmv = find_bdmv(path, config.scan.bdmv_search_depth)
        .with_context(|| format!("No disc found at {:?}", path))?;
    println!("{}", bdmv.display());
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_config(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            print_config(&config::Config::default());
        }
    }

    Ok(())
}

fn print_config(config: &config::Config) {
    println!("  Continue on error: {}", config.scan.continue_on_error);
    println!("  SSIF scanning: {}", config.scan.enable_ssif);
    println!("  BDMV search depth: {}", config.scan.bdmv_search_depth);
    match config.scan.stream_scan_limit() {
        Some(limit) => println!("  Stream scan limit: {} bytes", limit),
        None => println!("  Stream scan limit: none"),
    }
    println!(
        "  Minimum playlist length: {}s (filtering {})",
        config.filter.min_playlist_length_secs,
        if config.filter.filter_short_playlists {
            "on"
        } else {
            "off"
        }
    );
    println!(
        "  Looping playlists filtered: {}",
        config.filter.filter_looping_playlists
    );
}
