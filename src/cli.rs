use std::path::PathBuf;

use clap::Parser;

use crate::config::DEFAULT_CONFIG_FILE;

#[derive(Parser, Debug, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML or JSON config file
    #[clap(short, long, env = "JIRA_GITHUB_SYNC_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Override a config value, e.g. `--set jiraPrefix=PROJ` (repeatable)
    #[clap(short, long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,

    /// Log the links and merges that would be made without making them
    #[clap(short, long, value_parser, default_value_t = false)]
    pub dry_run: bool,

    /// Enable debug logging
    #[clap(short, long, value_parser, default_value_t = false)]
    pub verbose: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", raw))?;

    let key = key.trim().trim_start_matches('-');
    if key.is_empty() {
        return Err(format!("missing key in {:?}", raw));
    }
    Ok((key.to_string(), value.to_string()))
}
