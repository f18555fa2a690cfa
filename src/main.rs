use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};

use licensefp::batch::{compute_corpus, load_overrides, replace_corpus};
use licensefp::config::LicenseFpConfig;
use licensefp::logging::{init_tracing, init_tracing_json};
use licensefp::{
    CorpusStore, DetectionScheduler, LicenseMatch, StoreConfig, canonicalize_text,
    collapse_whitespace, fuzzy_hash_with, sort_by_confidence,
};

const USAGE: &str = "\
usage:
  licensefp compute <folder> [<store-path>] [--overrides <json>] [--config <yaml>]
  licensefp detect <file> [<store-path>] [--min <f>] [--early-exit <f>] [--json] [--config <yaml>]
  licensefp hash <file> [--block-size <n>] [--hash-length <n>] [--raw] [--config <yaml>]

<store-path> defaults to the config's `index` section and is opened with its backend.

global switches: --log-json (JSON log lines on stderr), --help";

/// Positional arguments plus `--flag value` / `--switch` options.
struct Args {
    positional: Vec<String>,
    options: BTreeMap<String, String>,
    switches: Vec<String>,
}

impl Args {
    const SWITCHES: &'static [&'static str] = &["json", "raw", "help", "log-json"];

    fn parse(raw: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut args = Args {
            positional: Vec::new(),
            options: BTreeMap::new(),
            switches: Vec::new(),
        };
        let mut raw = raw.into_iter();
        while let Some(arg) = raw.next() {
            let Some(name) = arg.strip_prefix("--") else {
                args.positional.push(arg);
                continue;
            };
            if Self::SWITCHES.contains(&name) {
                args.switches.push(name.to_string());
                continue;
            }
            let value = raw
                .next()
                .ok_or_else(|| anyhow!("option --{name} needs a value"))?;
            args.options.insert(name.to_string(), value);
        }
        Ok(args)
    }

    fn positional(&self, index: usize, what: &str) -> Result<&str> {
        self.positional
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("missing <{what}>\n{USAGE}"))
    }

    fn option<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.options
            .get(name)
            .map(|value| {
                value
                    .parse()
                    .with_context(|| format!("invalid value for --{name}: {value:?}"))
            })
            .transpose()
    }

    fn switch(&self, name: &str) -> bool {
        self.switches.iter().any(|s| s == name)
    }

    fn config(&self) -> Result<LicenseFpConfig> {
        match self.options.get("config") {
            Some(path) => LicenseFpConfig::from_file(path)
                .with_context(|| format!("loading config {path}")),
            None => Ok(LicenseFpConfig::default()),
        }
    }
}

/// Store named by the positional argument at `index`, falling back to the
/// config's `index` section.
fn open_store(
    args: &Args,
    index: usize,
    config: &LicenseFpConfig,
) -> Result<(StoreConfig, Box<dyn CorpusStore>)> {
    let cli_path = args.positional.get(index).map(Path::new);
    let store_cfg = config
        .resolve_store(cli_path)
        .with_context(|| format!("choosing a store\n{USAGE}"))?;
    let store = store_cfg
        .build()
        .with_context(|| format!("opening store {}", store_label(&store_cfg)))?;
    Ok((store_cfg, store))
}

fn store_label(store: &StoreConfig) -> String {
    store
        .path()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<in-memory>".to_string())
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// First few words of `text` on one line, for log output.
fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 60;
    let flat = collapse_whitespace(text);
    match flat.char_indices().nth(MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

fn compute(args: &Args) -> Result<()> {
    let folder = PathBuf::from(args.positional(1, "folder")?);
    let config = args.config()?;

    let mut overrides = config.overrides.clone();
    if let Some(path) = args.options.get("overrides") {
        overrides.extend(load_overrides(path)?);
    }

    let defaults = config.corpus_defaults();
    let entries = compute_corpus(&folder, &defaults, &overrides)?;
    let (store_cfg, store) = open_store(args, 2, &config)?;
    replace_corpus(store.as_ref(), &entries)?;

    println!("Recompiled {} licenses into {}", entries.len(), store_label(&store_cfg));
    println!();
    println!("Default block size: {}", defaults.ctph.block_size);
    println!("Default hash length: {}", defaults.ctph.hash_length);
    if !overrides.is_empty() {
        println!();
        println!("--- overrides ---");
        for (name, over) in &overrides {
            let resolved = over.resolve(&defaults.ctph);
            println!(
                "{name}: block size {}, hash length {}",
                resolved.block_size, resolved.hash_length
            );
        }
    }
    Ok(())
}

async fn detect(args: &Args) -> Result<()> {
    let file = PathBuf::from(args.positional(1, "file")?);
    let config = args.config()?;

    let mut scheduler_cfg = config.scheduler_config();
    if let Some(min) = args.option::<f64>("min")? {
        scheduler_cfg.options = scheduler_cfg.options.with_min_confidence(min);
    }
    if let Some(early) = args.option::<f64>("early-exit")? {
        scheduler_cfg.options = scheduler_cfg.options.with_early_exit(early);
    }

    let text = read_text(&file)?;
    tracing::debug!(input = %file.display(), preview = %preview(&text), "read input");
    let canonical = canonicalize_text(&text, &config.canonical_config())?;

    let (store_cfg, store) = open_store(args, 2, &config)?;
    tracing::info!(
        store = %store_label(&store_cfg),
        entries = store.count()?,
        "loaded license corpus"
    );

    let mut scheduler = DetectionScheduler::from_store(store.as_ref(), scheduler_cfg)?;
    let result = scheduler.detect(canonical.text.into_bytes()).await;
    scheduler.shutdown();
    let mut matches: Vec<LicenseMatch> = result?;
    sort_by_confidence(&mut matches);

    if args.switch("json") {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }
    if matches.is_empty() {
        println!("no license matched");
        return Ok(());
    }
    for m in &matches {
        println!(
            "{:<32} {:>6.2}%  ({}/{} blocks)",
            m.name,
            m.confidence * 100.0,
            m.common_blocks,
            m.total_blocks
        );
    }
    Ok(())
}

fn hash(args: &Args) -> Result<()> {
    let file = PathBuf::from(args.positional(1, "file")?);
    let config = args.config()?;

    let mut ctph = config.ctph_config();
    if let Some(block_size) = args.option::<usize>("block-size")? {
        ctph = ctph.with_block_size(block_size);
    }
    if let Some(hash_length) = args.option::<usize>("hash-length")? {
        ctph = ctph.with_hash_length(hash_length);
    }

    let bytes = if args.switch("raw") {
        std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?
    } else {
        canonicalize_text(&read_text(&file)?, &config.canonical_config())?
            .text
            .into_bytes()
    };
    println!("{}", fuzzy_hash_with(&bytes, &ctph)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("error: {err:#}\n{USAGE}");
            return ExitCode::from(2);
        }
    };
    if args.switch("log-json") {
        init_tracing_json();
    } else {
        init_tracing();
    }

    let result = match args.positional.first().map(String::as_str) {
        _ if args.switch("help") => {
            println!("{USAGE}");
            Ok(())
        }
        Some("compute") => compute(&args),
        Some("detect") => detect(&args).await,
        Some("hash") => hash(&args),
        Some(other) => Err(anyhow!("unknown command {other:?}\n{USAGE}")),
        None => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
