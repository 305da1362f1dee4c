//! Fedimoji - emoji substitution and picker search for fediverse content.
//!
//! # Usage
//!
//! ```bash
//! fedimoji render post.html
//! echo 'hello :wave:' | fedimoji render
//! fedimoji render --markdown README.md
//! fedimoji search heart --max-results 8
//! fedimoji search blob --custom custom_emojis.json
//! fedimoji custom --custom custom_emojis.json
//! ```

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use fedimoji::catalog::Catalog;
use fedimoji::config::{
    clear_config_flags, global_config_path, load_config_flags, local_override_path,
    save_config_flags, ConfigFlags,
};
use fedimoji::custom::{build_custom_emojis, CustomEmojiEntry, CustomEmojiMap};
use fedimoji::emojify::{Emojifier, PackAssetResolver};
use fedimoji::perf;
use fedimoji::search::{EmojiIndex, DEFAULT_MAX_RESULTS};

/// Emoji substitution and search for fediverse content
#[derive(Parser, Debug)]
#[command(name = "fedimoji", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Emoji catalog in the emoji-mart data layout (defaults to the bundled one)
    #[arg(long, global = true, value_name = "PATH")]
    catalog: Option<PathBuf>,

    /// JSON array of the server's custom emoji
    #[arg(long, global = true, value_name = "PATH")]
    custom: Option<PathBuf>,

    /// Base URL for emoji artwork
    #[arg(long, global = true, value_name = "URL")]
    asset_base: Option<String>,

    /// Maximum number of search results
    #[arg(long, global = true, value_name = "N")]
    max_results: Option<usize>,

    /// Treat render input as markdown and convert it to HTML first
    #[arg(long, global = true)]
    markdown: bool,

    /// Enable performance logging
    #[arg(long, global = true)]
    perf: bool,

    /// Save current command-line flags as defaults
    #[arg(long, global = true)]
    save: bool,

    /// Clear saved defaults
    #[arg(long, global = true)]
    clear: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Substitute emoji in HTML read from FILE, or stdin when omitted
    Render {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Search native and custom emoji, printing JSON results
    Search {
        #[arg(value_name = "QUERY")]
        query: String,
    },
    /// Print custom emoji as picker catalog entries
    Custom,
}

impl Cli {
    fn flags(&self) -> ConfigFlags {
        ConfigFlags {
            markdown: self.markdown,
            perf: self.perf,
            catalog: self.catalog.clone(),
            custom: self.custom.clone(),
            asset_base: self.asset_base.clone(),
            max_results: self.max_results,
        }
    }
}

fn load_custom_emojis(path: Option<&Path>) -> Result<Vec<CustomEmojiEntry>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read custom emoji {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse custom emoji {}", path.display()))
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = cli.flags();

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);
    perf::set_enabled(effective.perf);

    let loaded;
    let catalog = match &effective.catalog {
        Some(path) => {
            let _scope = perf::scope("catalog.load_file");
            loaded = Catalog::from_path(path)
                .with_context(|| format!("Failed to load catalog {}", path.display()))?;
            &loaded
        }
        None => Catalog::global(),
    };
    let custom_emojis = load_custom_emojis(effective.custom.as_deref())?;
    tracing::debug!(
        catalog = catalog.len(),
        custom = custom_emojis.len(),
        "emoji sources ready"
    );

    let mut stdout = std::io::stdout().lock();
    match &cli.command {
        Command::Render { file } => {
            let mut input = read_input(file.as_deref())?;
            if effective.markdown {
                input = comrak::markdown_to_html(&input, &comrak::Options::default());
            }
            let resolver = effective
                .asset_base
                .as_deref()
                .map_or_else(PackAssetResolver::default, PackAssetResolver::new);
            let emojifier = Emojifier::new(catalog).with_resolver(resolver);
            let custom = CustomEmojiMap::new(&custom_emojis);
            let _scope = perf::scope("render.emojify");
            stdout.write_all(emojifier.emojify_with_custom(&input, &custom).as_bytes())?;
        }
        Command::Search { query } => {
            let index = EmojiIndex::new(catalog);
            index.add_custom_to_pool(&custom_emojis);
            let max_results = effective.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
            let results = index.search(query, max_results, Some(custom_emojis.as_slice()));
            serde_json::to_writer_pretty(&mut stdout, &results)?;
            writeln!(stdout)?;
        }
        Command::Custom => {
            serde_json::to_writer_pretty(&mut stdout, &build_custom_emojis(&custom_emojis))?;
            writeln!(stdout)?;
        }
    }
    stdout.flush().context("Failed to flush output")
}
