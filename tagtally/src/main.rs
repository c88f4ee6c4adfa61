use clap::ArgMatches;
use colored::Colorize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tagtally::handlers::AppState;
use tagtally::server::HttpServer;
use tagtally_core::{data::Database, print_banner};
use tagtally_fetch::Fetcher;
use tokio::sync::Mutex;

mod commands;

const DB_FILE_NAME: &str = "tagtally.db";

#[tokio::main]
async fn main() {
    let cmd = commands::command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    match chosen_command.subcommand() {
        Some(("init", primary_command)) => handle_init(primary_command),
        Some(("serve", primary_command)) => handle_serve(primary_command, quiet).await,
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush().unwrap();
    let mut response = String::new();
    io::stdin().read_line(&mut response).unwrap();
    response.trim().to_lowercase()
}

fn handle_init(args: &ArgMatches) {
    let db_path_arg = args.get_one::<String>("PATH").unwrap();
    let force = args.get_flag("force");
    let expanded_config_dir = shellexpand::tilde(db_path_arg);
    let config_dir = Path::new(expanded_config_dir.as_ref());
    let db_loc = config_dir.join(DB_FILE_NAME);
    let db_path = db_loc.as_path();

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );

    if Database::exists(db_path) && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("Database already exists at:");
        println!(
            "  {} {}",
            "•".yellow(),
            db_path.display().to_string().bright_white()
        );
        println!();

        let response = print_prompt("Would you like to overwrite it? [y/N]:");
        println!();

        if response != "y" && response != "yes" {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return;
        }
    }

    if Database::exists(db_path) {
        Database::drop(db_path);
        println!("{} Existing database removed", "✓".green().bold());
    }

    fs::create_dir_all(config_dir).expect("Failed to create config directory");

    println!("{} Creating database...", "→".blue());
    Database::new(db_path).expect("Failed to create database");
    println!(
        "{} Database initialized: {}",
        "✓".green().bold(),
        db_path.display().to_string().bright_white()
    );
}

async fn handle_serve(args: &ArgMatches, quiet: bool) {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let listen_addr = args.get_one::<String>("listen").unwrap().clone();
    let database_arg = args.get_one::<String>("database").unwrap();
    let timeout_secs = *args.get_one::<u64>("timeout").unwrap();

    let expanded_config_dir = shellexpand::tilde(database_arg);
    let config_dir = Path::new(expanded_config_dir.as_ref());
    let db_path = config_dir.join(DB_FILE_NAME);

    if let Err(e) = fs::create_dir_all(config_dir) {
        eprintln!("✗ Failed to create {}: {}", config_dir.display(), e);
        std::process::exit(1);
    }

    // No database, no server. This is not a per-request condition.
    let db = match Database::new(&db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("✗ Failed to open database {}: {}", db_path.display(), e);
            std::process::exit(1);
        }
    };

    if !quiet {
        println!("Database: {}", db_path.display());
        println!("Fetch timeout: {}s", timeout_secs);
        println!();
    }

    let state = AppState {
        db: Arc::new(Mutex::new(db)),
        fetcher: Arc::new(Fetcher::with_timeout(timeout_secs)),
    };

    if let Err(e) = HttpServer::new(listen_addr, state).run().await {
        eprintln!("✗ Server failed: {}", e);
        std::process::exit(1);
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
