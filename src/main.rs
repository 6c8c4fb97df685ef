use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use gh_member_snapshot::{
    client::DEFAULT_API_BASE,
    domains::DomainRules,
    members::DEFAULT_MAX_REPOS,
    runner::{RunSettings, Runner, DEFAULT_MAX_MEMBERS},
    snapshot::{SnapshotStore, DEFAULT_KEEP_BACKUPS},
    Bootstrap,
};

/// Snapshot the members of a GitHub organization and their research domains
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The snapshot CSV file to write
    #[arg(long, default_value = "data/members.csv")]
    output: PathBuf,

    /// How many members to process
    #[arg(long, default_value_t = DEFAULT_MAX_MEMBERS)]
    max_members: usize,

    /// How many recently updated repositories to inspect per member
    #[arg(long, default_value_t = DEFAULT_MAX_REPOS, value_parser = clap::value_parser!(u8).range(1..=100))]
    max_repos: u8,

    /// A TOML file with keyword and language rules
    #[arg(long)]
    rules: Option<PathBuf>,

    /// How many backups of the snapshot to keep
    #[arg(long, default_value_t = DEFAULT_KEEP_BACKUPS)]
    keep_backups: usize,

    /// The GitHub API to talk to
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,
}

fn main() {
    let args = Args::parse();
    let bootstrap = Bootstrap::new();

    let rules = match &args.rules {
        Some(path) => match DomainRules::load(path) {
            Ok(rules) => rules,
            Err(e) => {
                println!("{}", e.to_string().bold().red());
                std::process::exit(1);
            }
        },
        None => DomainRules::default(),
    };

    let client = match bootstrap.client(&args.api_base) {
        Ok(client) => client,
        Err(e) => {
            println!("{}", e.to_string().bold().red());
            std::process::exit(1);
        }
    };

    println!("{}", "GitHub Member Snapshot".white().bold());

    let settings = RunSettings {
        org: bootstrap.org.clone(),
        max_members: args.max_members,
        max_repos: args.max_repos,
    };
    let snapshot = SnapshotStore::new(args.output, args.keep_backups);

    let outcome = Runner::new(&client, &rules, snapshot, settings).run();
    std::process::exit(outcome.exit_code());
}
