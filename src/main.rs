//! Easel - prompt composition console for a Stable Diffusion client
//!
//! Wires the file-backed stores to a compose session and a template roll
//! session, and drives them from stdin commands. The same core runs under
//! the mobile screens; this binary is the developer-facing surface.

mod config;
mod core;
mod data;
mod store;

use crate::core::{
    ComposeSession, LibrarySearch, RollSession, SearchKind, SearchOutcome, SendMode,
};
use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use config::Config;
use data::{Prompt, Region, RegionPromptParam, SavedPrompt};
use std::path::PathBuf;
use std::sync::Arc;
use store::{GlossaryTranslator, HistoryStore, Language, PromptLibrary, TemplateHistoryFile, Translator};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(ClapParser)]
#[command(name = "easel")]
#[command(about = "Prompt composition console", long_about = None)]
struct Cli {
    /// Custom data directory (default: ~/.easel)
    /// Can also be set via the EASEL_DIR environment variable
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a divider string and print the resulting region layout
    ValidateDivider {
        /// Divider text, e.g. "2,1,1;1"
        divider: String,
        /// Reserve region 0 as the common region
        #[arg(long)]
        use_common: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => Config::data_dir()?,
    };

    // Subcommands run without any session wiring
    if let Some(Commands::ValidateDivider { divider, use_common }) = cli.command {
        validate_divider(&divider, use_common);
        return Ok(());
    }

    let config = match &cli.data_dir {
        Some(dir) => Config::load_from(dir)?,
        None => Config::load()?,
    };

    // The console owns stdout, so logs go to a file
    // (use RUST_LOG to control the level)
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(Config::log_path(&data_dir))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();

    run_console(config, &data_dir).await
}

fn validate_divider(divider: &str, use_common: bool) {
    let mut root = Region::parse(divider);
    root.reindex(use_common);

    println!("✓ Parsed divider {:?}", divider);
    for (i, column) in root.sub_regions.iter().enumerate() {
        println!("  column {} (ratio {})", i, column.ratio);
        for row in &column.sub_regions {
            println!("    region {} (ratio {})", row.index, row.ratio);
        }
    }
    println!("  {} regions total", root.leaf_count());
    let repaired = root.serialize();
    if repaired != divider {
        println!("⚠ Normalized to {:?}", repaired);
    }
}

/// Everything one console run owns. The search receiver stays outside so
/// the select loop can poll it while commands borrow the rest.
struct Console {
    config: Config,
    data_dir: PathBuf,
    session: ComposeSession,
    roll: RollSession,
    search: LibrarySearch,
    history: Arc<TemplateHistoryFile>,
    translator: GlossaryTranslator,
    /// Results of the latest applied search, addressable by index
    results: Vec<SavedPrompt>,
    style_results: Vec<data::PromptStyle>,
    history_cache: Vec<data::TemplateHistory>,
}

async fn run_console(config: Config, data_dir: &std::path::Path) -> Result<()> {
    let library = Arc::new(
        PromptLibrary::load(&Config::library_path(data_dir))
            .context("Failed to load prompt library")?,
    );
    let history = Arc::new(
        TemplateHistoryFile::open(Config::history_path(data_dir))
            .context("Failed to open template history")?,
    );
    let translator = GlossaryTranslator::from_library(library.prompts());

    let (search, mut search_rx) = LibrarySearch::new(
        library.clone(),
        library.clone(),
        config.search.debounce_ms,
        config.search.top_n,
    );

    let mut roll = RollSession::new(library.clone(), history.clone());
    roll.load_slots()
        .await
        .context("Failed to load template slots")?;

    let mut console = Console {
        config,
        data_dir: data_dir.to_path_buf(),
        session: ComposeSession::new(Vec::new(), RegionPromptParam::default()),
        roll,
        search,
        history,
        translator,
        results: Vec::new(),
        style_results: Vec::new(),
        history_cache: Vec::new(),
    };

    println!("easel console - type 'help' for commands, 'quit' to exit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !console.handle(line.trim()).await? {
                    break;
                }
            }
            Some(outcome) = search_rx.recv() => {
                console.apply_search(outcome);
            }
        }
    }
    Ok(())
}

impl Console {
    /// Apply a search outcome, unless a newer query superseded it.
    fn apply_search(&mut self, outcome: SearchOutcome) {
        if !self.search.is_current(&outcome) {
            tracing::debug!("Dropping stale search result (seq {})", outcome.seq());
            return;
        }
        match outcome {
            SearchOutcome::Prompts { results, .. } => {
                self.results = results;
                for (i, row) in self.results.iter().enumerate() {
                    println!("  [{}] {}", i, self.describe_row(row));
                }
                if self.results.is_empty() {
                    println!("  no matches");
                }
            }
            SearchOutcome::Styles { results, .. } => {
                self.style_results = results;
                for (i, style) in self.style_results.iter().enumerate() {
                    let texts: Vec<&str> =
                        style.prompts.iter().map(|p| p.text.as_str()).collect();
                    println!("  [{}] {} = {}", i, style.name, texts.join(", "));
                }
                if self.style_results.is_empty() {
                    println!("  no matches");
                }
            }
            SearchOutcome::Failed { error, .. } => {
                println!("search failed: {error}");
            }
        }
    }

    fn describe_row(&self, row: &SavedPrompt) -> String {
        match (&row.translation, self.config.display.only_show_translation) {
            (Some(t), true) => t.clone(),
            (Some(t), false) => format!("{} ({})", row.text, t),
            (None, _) => row.text.clone(),
        }
    }

    fn print_prompts(&self) {
        if self.session.prompts.is_empty() {
            println!("  (empty)");
            return;
        }
        let total = self.session.region.total_region_count() as i32;
        for region in 0..total.max(1) {
            let in_region = self.session.prompts_in_region(region);
            if in_region.is_empty() {
                continue;
            }
            if self.session.region.use_common && region == 0 {
                println!("  common region:");
            } else {
                println!("  region {region}:");
            }
            for prompt in in_region {
                println!(
                    "    [{}] {} (weight {})",
                    &prompt.random_id[..8],
                    prompt.translation_text(),
                    prompt.weight
                );
            }
        }
    }

    fn print_tree(&self) {
        let tree = self.session.region_tree();
        println!(
            "  divider {:?}, {} regions, common={}",
            self.session.region.divider_text,
            self.session.region.region_count,
            self.session.region.use_common
        );
        for column in &tree.sub_regions {
            println!("  {} (ratio {})", column.id, column.ratio);
            for row in &column.sub_regions {
                println!("    {} (ratio {}, region {})", row.id, row.ratio, row.index);
            }
        }
    }

    /// Resolve a session prompt by the id prefix the console prints.
    fn resolve_prompt_id(&self, prefix: &str) -> Option<String> {
        self.session
            .prompts
            .iter()
            .find(|p| p.random_id.starts_with(prefix))
            .map(|p| p.random_id.clone())
    }

    async fn handle(&mut self, line: &str) -> Result<bool> {
        let mut parts = line.splitn(2, ' ');
        let command = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("").trim();

        match command {
            "" => {}
            "quit" | "exit" => return Ok(false),
            "help" => print_help(),

            // ----- library search -----
            "search" => self.search.input(SearchKind::Prompt, rest),
            "style" => self.search.input(SearchKind::Style, rest),
            "pick" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                match args.first().and_then(|n| n.parse::<usize>().ok()) {
                    Some(n) if n < self.results.len() => {
                        let region = args.get(1).and_then(|r| r.parse().ok()).unwrap_or(0);
                        let prompt = self.results[n].to_prompt();
                        println!("added {}", prompt.text);
                        self.session.add_prompt(prompt, region);
                    }
                    _ => println!("usage: pick <result#> [region]"),
                }
            }
            "usestyle" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                match args.first().and_then(|n| n.parse::<usize>().ok()) {
                    Some(n) if n < self.style_results.len() => {
                        let region = args.get(1).and_then(|r| r.parse().ok()).unwrap_or(0);
                        let prompts: Vec<Prompt> = self.style_results[n]
                            .prompts
                            .iter()
                            .map(|row| row.to_prompt())
                            .collect();
                        println!("added {} prompts", prompts.len());
                        self.session.add_style(prompts, region);
                    }
                    _ => println!("usage: usestyle <style#> [region] (run 'style' first)"),
                }
            }
            "new" => {
                if rest.is_empty() {
                    println!("usage: new <text>");
                } else {
                    let translation = self
                        .translator
                        .translate(
                            rest,
                            Language::English,
                            Language::from_code(&self.config.language.preferred),
                        )
                        .await?;
                    let mut prompt = Prompt::new(rest);
                    if translation != rest {
                        prompt.translation = Some(translation);
                    }
                    self.session.add_prompt(prompt, 0);
                    println!("added {rest}");
                }
            }

            // ----- prompt list -----
            "list" => self.print_prompts(),
            "sel" => match self.resolve_prompt_id(rest) {
                Some(id) => {
                    self.session.select(&id);
                    if let Some(prompt) = self.session.current_prompt() {
                        println!(
                            "  {} (weight {}, region {})",
                            prompt.translation_text(),
                            prompt.weight,
                            prompt.region_index
                        );
                    }
                }
                None => println!("no prompt matching {rest:?}"),
            },
            "weight" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                match (
                    args.first().and_then(|p| self.resolve_prompt_id(p)),
                    args.get(1).and_then(|w| w.parse::<f32>().ok()),
                ) {
                    (Some(id), Some(weight)) => {
                        self.session.set_weight(&id, weight);
                    }
                    _ => println!("usage: weight <id-prefix> <0..10>"),
                }
            }
            "assign" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                match (
                    args.first().and_then(|p| self.resolve_prompt_id(p)),
                    args.get(1).and_then(|r| r.parse::<i32>().ok()),
                ) {
                    (Some(id), Some(region)) => {
                        if !self.session.set_region_index(&id, region) {
                            println!("region {region} does not exist");
                        }
                    }
                    _ => println!("usage: assign <id-prefix> <region>"),
                }
            }
            "del" => match self.resolve_prompt_id(rest) {
                Some(id) => {
                    self.session.toggle_multi_select(&id);
                    self.session.remove_selected();
                }
                None => println!("no prompt matching {rest:?}"),
            },
            "translate" => {
                let to = Language::from_code(&self.config.language.preferred);
                let translated = self.translator.translate(rest, Language::English, to).await?;
                println!("  {translated}");
            }
            "showtrans" => {
                self.config.display.only_show_translation = rest == "on";
                self.config.save_to(&self.data_dir)?;
            }

            // ----- regions -----
            "region" => self.print_tree(),
            "divider" => {
                self.session.set_divider_text(rest);
                self.print_tree();
            }
            "regions" => self.session.set_region_enable(rest == "on"),
            "common" => {
                self.session.set_use_common(rest == "on");
                self.print_tree();
            }
            "inspect" => {
                let tree = self.session.region_tree();
                match tree.find(rest) {
                    Some(node) => match tree.parent_of(&node.id) {
                        Some(parent) => println!(
                            "  {} (ratio {}, region {}) in {}",
                            node.id, node.ratio, node.index, parent.id
                        ),
                        None => println!(
                            "  {} (ratio {}, {} rows)",
                            node.id,
                            node.ratio,
                            node.sub_regions.len()
                        ),
                    },
                    None => println!("no region with id {rest:?}"),
                }
            }
            "addrow" => {
                if let Err(e) = self.session.add_region_row(rest) {
                    println!("{e}");
                }
            }
            "addcol" => {
                self.session.add_region_column();
                self.print_tree();
            }
            "rmregion" => {
                if let Err(e) = self.session.remove_region(rest) {
                    println!("{e}");
                }
            }
            "ratio" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                match (args.first(), args.get(1).and_then(|r| r.parse().ok())) {
                    (Some(id), Some(ratio)) => {
                        if let Err(e) = self.session.set_region_ratio(id, ratio) {
                            println!("{e}");
                        }
                    }
                    _ => println!("usage: ratio <region-id> <positive-int>"),
                }
            }

            // ----- template building -----
            "slots" => {
                for slot in &self.roll.slots {
                    let marker = if self.roll.selected_slot.as_deref() == Some(slot.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    println!(" {marker} {slot}");
                }
            }
            "slot" => {
                if let Err(e) = self.roll.select_slot(rest).await {
                    println!("{e}");
                } else {
                    println!("categories: {}", self.roll.categories.join(", "));
                }
            }
            "cat" => self.roll.select_category(rest),
            "cats" => println!("  {}", self.roll.categories.join(", ")),
            "browse" => {
                let rows: Vec<String> = self
                    .roll
                    .display_prompts()
                    .iter()
                    .map(|row| self.describe_row(row))
                    .collect();
                for (i, row) in rows.iter().enumerate() {
                    println!("  [{i}] {row}");
                }
            }
            "titem" => {
                let pick = rest
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| self.roll.display_prompts().get(n).cloned().cloned());
                match pick {
                    Some(row) => {
                        println!("template += {}", row.text);
                        self.roll.add_prompt_item(row.to_prompt());
                    }
                    None => println!("usage: titem <browse#>"),
                }
            }
            "tcat" => match self.roll.selected_slot.clone() {
                Some(slot) => {
                    println!("template += #{rest}");
                    self.roll.add_category_item(rest, &slot);
                }
                None => println!("select a slot first"),
            },
            "template" => {
                for item in &self.roll.param.template {
                    let lock = if item.locked { "*" } else { " " };
                    let tag = if item.is_category() { "#" } else { "" };
                    println!("  {} {}{} ({})", lock, tag, item.display_text(), &item.id[..8]);
                }
            }
            "trm" => {
                let id = self
                    .roll
                    .param
                    .template
                    .iter()
                    .find(|i| i.id.starts_with(rest))
                    .map(|i| i.id.clone());
                match id {
                    Some(id) => self.roll.remove_item(&id),
                    None => println!("no template item matching {rest:?}"),
                }
            }

            // ----- rolling -----
            "roll" => match self.roll.roll().await {
                Ok(()) => self.print_rolled(),
                Err(e) => println!("roll failed: {e}"),
            },
            "rolled" => self.print_rolled(),
            "lock" => {
                self.roll.begin_lock_edit();
                let id = self
                    .roll
                    .param
                    .rolled
                    .iter()
                    .find(|g| g.prompt.random_id.starts_with(rest))
                    .map(|g| g.prompt.random_id.clone());
                match id {
                    Some(id) => {
                        if !self.roll.toggle_lock(&id) {
                            println!("explicit picks cannot be locked");
                        }
                    }
                    None => println!("no rolled prompt matching {rest:?}"),
                }
                self.roll.end_edit();
            }
            "rrm" => {
                self.roll.begin_edit();
                let id = self
                    .roll
                    .param
                    .rolled
                    .iter()
                    .find(|g| g.prompt.random_id.starts_with(rest))
                    .map(|g| g.prompt.random_id.clone());
                match id {
                    Some(id) => self.roll.remove_rolled(&id),
                    None => println!("no rolled prompt matching {rest:?}"),
                }
                self.roll.end_edit();
            }
            "send" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                let mode = match args.first() {
                    Some(&"add") => SendMode::Add,
                    _ => SendMode::Replace,
                };
                let region = args.get(1).and_then(|r| r.parse().ok()).unwrap_or(0);
                self.session.apply_roll(&self.roll.param.rolled, mode, region);
                self.print_prompts();
            }

            // ----- history -----
            "hist" => {
                self.history_cache = self.history.all_templates().await?;
                for (i, entry) in self.history_cache.iter().enumerate() {
                    let labels: Vec<String> = entry
                        .items
                        .iter()
                        .map(|item| {
                            item.category
                                .clone()
                                .map(|c| format!("#{c}"))
                                .or_else(|| item.text.clone())
                                .unwrap_or_default()
                        })
                        .collect();
                    println!(
                        "  [{}] {} - {}",
                        i,
                        entry.saved_at.format("%Y-%m-%d %H:%M"),
                        labels.join(", ")
                    );
                }
            }
            "apply" => {
                match rest
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| self.history_cache.get(n).cloned())
                {
                    Some(entry) => {
                        self.roll.apply_history(&entry).await?;
                        println!(
                            "template restored ({} items)",
                            self.roll.param.template.len()
                        );
                    }
                    None => println!("usage: apply <hist#> (run 'hist' first)"),
                }
            }

            other => println!("unknown command {other:?} - try 'help'"),
        }
        Ok(true)
    }

    fn print_rolled(&self) {
        if self.roll.param.rolled.is_empty() {
            println!("  (nothing rolled)");
            return;
        }
        for rolled in &self.roll.param.rolled {
            let lock = if rolled.locked { "*" } else { " " };
            let tag = if rolled.random_pick { "#" } else { "" };
            println!(
                "  {} {}{} ({})",
                lock,
                tag,
                rolled.prompt.translation_text(),
                &rolled.prompt.random_id[..8]
            );
        }
    }
}

fn print_help() {
    println!(
        "\
library:   search <text> | style <text> | pick <n> [region] | usestyle <n> [region] | new <text>
prompts:   list | sel <id> | weight <id> <w> | assign <id> <region> | del <id>
           translate <text> | showtrans on|off
regions:   region | divider <text> | regions on|off | common on|off
           inspect <id> | addrow <col-id> | addcol | rmregion <id> | ratio <id> <n>
template:  slots | slot <name> | cats | cat <name> | browse
           titem <n> | tcat <category> | template | trm <id>
rolling:   roll | rolled | lock <id> | rrm <id> | send [replace|add] [region]
history:   hist | apply <n>
           quit"
    );
}
