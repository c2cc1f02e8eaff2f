use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSetBuilder};
use image::ImageReader;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use runtime_atlas_core::prelude::*;
use serde::Deserialize;
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "runtime-atlas",
    about = "Allocate images into growable runtime atlas pages",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --no-progress or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Insert every image under a path into an atlas and write the pages
    Pack(PackArgs),
    /// Run a YAML script of insert/lookup/release operations
    Replay(ReplayArgs),
    /// Random insert/release churn; prints timing and occupancy
    Bench(BenchArgs),
}

#[derive(Parser, Debug, Clone)]
struct AtlasArgs {
    /// Page width
    #[arg(long, default_value_t = 1024, help_heading = "Atlas")]
    page_width: u32,
    /// Page height
    #[arg(long, default_value_t = 1024, help_heading = "Atlas")]
    page_height: u32,
    /// Padding added to each item's width and height
    #[arg(long, default_value_t = 1, help_heading = "Atlas")]
    padding: u32,
    /// Fit strategy: baf
    #[arg(long, default_value = "baf", help_heading = "Atlas")]
    strategy: String,
    /// Merge edge-aligned free regions on release
    #[arg(long, default_value_t = false, help_heading = "Atlas")]
    coalesce_free: bool,
    /// YAML config file path (fields present override the flags above)
    #[arg(long, help_heading = "Atlas")]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
struct PackArgs {
    /// Input file or directory
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Atlas base name (files will be name_<page>.png and name.json)
    #[arg(short, long, default_value = "atlas", help_heading = "Input/Output")]
    name: String,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,
    #[command(flatten)]
    atlas: AtlasArgs,
    /// Print the resolved config and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: allocate and report stats but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct ReplayArgs {
    /// YAML script: optional `config` block plus an `ops` list
    script: PathBuf,
    /// Write the final snapshot JSON here
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
struct BenchArgs {
    /// Distinct item keys
    #[arg(long, default_value_t = 500)]
    items: usize,
    /// Insert/release operations to run
    #[arg(long, default_value_t = 20_000)]
    rounds: usize,
    /// Smallest item side
    #[arg(long, default_value_t = 8)]
    min: u32,
    /// Largest item side
    #[arg(long, default_value_t = 96)]
    max: u32,
    /// RNG seed
    #[arg(long, default_value_t = 7)]
    seed: u64,
    #[command(flatten)]
    atlas: AtlasArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Pack(args) => run_pack(args, cli.progress && !cli.quiet),
        Commands::Replay(args) => run_replay(args),
        Commands::Bench(args) => run_bench(args),
    }
}

fn run_pack(cli: &PackArgs, show_progress: bool) -> anyhow::Result<()> {
    let cfg = resolve_config(&cli.atlas)?;

    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(());
    }

    let paths = gather_paths(&cli.input, &cli.include, &cli.exclude)?;
    info!(count = paths.len(), "found input images");

    let mut atlas = ImageAtlas::with_image_store(cfg)?;
    let skipped = insert_images_with_progress(&mut atlas, &cli.input, &paths, show_progress)?;

    let stats = atlas.atlas().stats();
    info!(skipped, "{}", stats.summary());

    if cli.dry_run {
        return Ok(());
    }
    fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("create out_dir {}", cli.out_dir.display()))?;
    let pngs = atlas
        .save_pages(&cli.out_dir, &cli.name)
        .with_context(|| format!("write pages to {}", cli.out_dir.display()))?;
    let json_path = cli.out_dir.join(format!("{}.json", cli.name));
    write_json_snapshot(&json_path, &atlas.atlas().snapshot())
        .with_context(|| format!("write {}", json_path.display()))?;
    info!(?json_path, pages = pngs.len(), "atlas written");
    Ok(())
}

fn insert_images_with_progress(
    atlas: &mut ImageAtlas,
    root: &Path,
    paths: &[PathBuf],
    progress: bool,
) -> anyhow::Result<usize> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(paths.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} packing {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut skipped = 0usize;
    for p in paths {
        let key = key_for(root, p);
        if let Some(b) = &bar {
            b.set_message(key.clone());
        }
        match load_image(p) {
            Ok(img) => match atlas.insert_image(&key, &img) {
                Ok(_) => {}
                Err(AtlasError::OversizedItem { width, height, .. }) => {
                    warn!(key = %key, width, height, "skip oversized image");
                    skipped += 1;
                }
                Err(e) => return Err(e).with_context(|| format!("insert {}", key)),
            },
            Err(e) => {
                error!(?p, error = %e, "skip image");
                skipped += 1;
            }
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(skipped)
}

fn key_for(root: &Path, p: &Path) -> String {
    p.strip_prefix(root)
        .ok()
        .filter(|rel| !rel.as_os_str().is_empty())
        .unwrap_or(p)
        .to_string_lossy()
        .replace('\\', "/")
}

fn load_image(p: &Path) -> anyhow::Result<image::RgbaImage> {
    let img = ImageReader::open(p)?.with_guessed_format()?.decode()?;
    Ok(img.to_rgba8())
}

#[derive(Debug, Deserialize)]
struct ReplayScript {
    #[serde(default)]
    config: Option<AtlasConfig>,
    ops: Vec<ReplayOp>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum ReplayOp {
    Insert { key: String, w: u32, h: u32 },
    Lookup { key: String },
    Release { key: String },
    Reset,
    Clear,
    Stats,
}

fn run_replay(args: &ReplayArgs) -> anyhow::Result<()> {
    let text = fs::read_to_string(&args.script)
        .with_context(|| format!("read {}", args.script.display()))?;
    let script: ReplayScript = serde_yaml::from_str(&text)
        .with_context(|| format!("parse {}", args.script.display()))?;
    let mut atlas = Atlas::new(script.config.unwrap_or_default())?;

    for (i, op) in script.ops.iter().enumerate() {
        match op {
            ReplayOp::Insert { key, w, h } => match atlas.insert(key, *w, *h) {
                Ok(p) => println!(
                    "#{i} insert {key} {w}x{h} -> page {} at ({}, {}) refs={}",
                    p.page,
                    p.region.x,
                    p.region.y,
                    atlas.ref_count(key).unwrap_or(0)
                ),
                Err(e) => println!("#{i} insert {key} {w}x{h} -> error: {e}"),
            },
            ReplayOp::Lookup { key } => match atlas.lookup(key) {
                Some(p) => println!(
                    "#{i} lookup {key} -> page {} at ({}, {}) refs={}",
                    p.page,
                    p.region.x,
                    p.region.y,
                    atlas.ref_count(key).unwrap_or(0)
                ),
                None => println!("#{i} lookup {key} -> not found"),
            },
            ReplayOp::Release { key } => match atlas.release(key) {
                ReleaseOutcome::Unknown => println!("#{i} release {key} -> unknown"),
                ReleaseOutcome::Retained { remaining } => {
                    println!("#{i} release {key} -> refs={remaining}")
                }
                ReleaseOutcome::Reclaimed(p) => {
                    println!("#{i} release {key} -> reclaimed on page {}", p.page)
                }
            },
            ReplayOp::Reset => {
                atlas.reset();
                println!("#{i} reset");
            }
            ReplayOp::Clear => {
                atlas.clear();
                println!("#{i} clear");
            }
            ReplayOp::Stats => println!("#{i} {}", atlas.stats().summary()),
        }
    }

    if let Some(path) = &args.snapshot {
        write_json_snapshot(path, &atlas.snapshot())
            .with_context(|| format!("write {}", path.display()))?;
        info!(?path, "snapshot written");
    }
    Ok(())
}

fn run_bench(b: &BenchArgs) -> anyhow::Result<()> {
    if b.items == 0 || b.min == 0 || b.min > b.max {
        anyhow::bail!("bench needs items > 0 and 0 < min <= max");
    }
    let cfg = resolve_config(&b.atlas)?;
    let mut rng = StdRng::seed_from_u64(b.seed);
    let sizes: Vec<(u32, u32)> = (0..b.items)
        .map(|_| (rng.gen_range(b.min..=b.max), rng.gen_range(b.min..=b.max)))
        .collect();
    let mut atlas = Atlas::new(cfg)?;

    let start = Instant::now();
    let (mut inserts, mut releases, mut rejected) = (0usize, 0usize, 0usize);
    for _ in 0..b.rounds {
        let idx = rng.gen_range(0..b.items);
        let key = format!("item_{}", idx);
        if rng.gen_bool(0.6) {
            let (w, h) = sizes[idx];
            match atlas.insert(&key, w, h) {
                Ok(_) => inserts += 1,
                Err(AtlasError::OversizedItem { .. }) => rejected += 1,
                Err(e) => return Err(e.into()),
            }
        } else if atlas.release(&key) != ReleaseOutcome::Unknown {
            releases += 1;
        }
    }
    let dur = start.elapsed();
    let stats = atlas.stats();
    println!(
        "ops={} inserts={} releases={} rejected={} pages={} occupancy={:.2}% free_regions={} time={}",
        b.rounds,
        inserts,
        releases,
        rejected,
        stats.num_pages,
        stats.occupancy * 100.0,
        stats.free_regions,
        fmt_dur(dur)
    );
    Ok(())
}

fn fmt_dur(d: Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms >= 1.0 {
        format!("{:.1}ms", ms)
    } else {
        format!("{}us", d.as_micros())
    }
}

fn resolve_config(args: &AtlasArgs) -> anyhow::Result<AtlasConfig> {
    let strategy: FitStrategy = args
        .strategy
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown strategy: {}", args.strategy))?;
    let mut cfg = AtlasConfig::builder()
        .with_page_size(args.page_width, args.page_height)
        .padding(args.padding)
        .strategy(strategy)
        .coalesce_free(args.coalesce_free)
        .build();
    if let Some(path) = &args.config {
        let file =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)?;
        cfg = y.into_atlas_config(cfg)?;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn gather_paths(
    path: &Path,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    // Build glob matchers
    let mut inc_set = None;
    if !include.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in include {
            b.add(Glob::new(pat)?);
        }
        inc_set = Some(b.build()?);
    }
    let mut exc_set = None;
    if !exclude.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in exclude {
            b.add(Glob::new(pat)?);
        }
        exc_set = Some(b.build()?);
    }
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_image(path) {
            list.push(path.to_path_buf());
        }
    } else {
        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    Ok(list)
}

fn should_skip(
    p: &Path,
    include: Option<&globset::GlobSet>,
    exclude: Option<&globset::GlobSet>,
) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if let Some(ex) = exclude {
        if ex.is_match(&s) {
            return true;
        }
    }
    if let Some(inc) = include {
        if !inc.is_match(&s) {
            return true;
        }
    }
    false
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "tga" | "gif")
    )
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    page_width: Option<u32>,
    page_height: Option<u32>,
    padding: Option<u32>,
    strategy: Option<String>,
    coalesce_free: Option<bool>,
}

impl YamlConfig {
    fn into_atlas_config(self, mut cfg: AtlasConfig) -> anyhow::Result<AtlasConfig> {
        if let Some(v) = self.page_width {
            cfg.page_width = v;
        }
        if let Some(v) = self.page_height {
            cfg.page_height = v;
        }
        if let Some(v) = self.padding {
            cfg.padding = v;
        }
        if let Some(v) = self.strategy {
            cfg.strategy = v
                .parse()
                .map_err(|_| anyhow::anyhow!("unknown strategy in config: {}", v))?;
        }
        if let Some(v) = self.coalesce_free {
            cfg.coalesce_free = v;
        }
        Ok(cfg)
    }
}
