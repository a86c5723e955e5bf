use anyhow::Context;
use clap::Parser;
use indexmap::IndexMap;
use log::info;
use rayon::prelude::*;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use stylec_lib::pipeline::ClassNames;
use stylec_lib::{
    compile_source, source_identifier, CompiledSource, NameCache, Options, VendorPrefixes,
};

const STYLEC_INTRO: &str = "stylec - nested style objects to CSS";

#[derive(Parser)]
#[command(name = "stylec")]
#[command(about = "Compile extracted style objects into CSS and class name tables")]
struct Args {
    /// Extracted style objects, one JSON file per source file: `{ "sheetId": { ... } }`.
    /// `src/Button.js.json` is compiled as source `src/Button.js`.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON options file (`minify`, `mediaMap`, `cacheDir`, ...).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bundle file for the generated CSS. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the class name table here as JSON.
    #[arg(long)]
    names: Option<PathBuf>,

    /// Directory source identifiers are relative to. Defaults to the current directory.
    #[arg(long)]
    root: Option<PathBuf>,

    #[arg(long)]
    minify: bool,

    #[arg(long)]
    vendor_prefixes: bool,

    /// Replace class names with short cached tokens.
    #[arg(long)]
    compress: bool,

    /// Persist compressed class names here instead of in memory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    #[arg(long)]
    prefix: Option<String>,

    /// Forget all cached class names before compiling.
    #[arg(long)]
    clear_cache: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // parse the args given in terminal
    let args: Args = Args::parse();
    info!("{}", STYLEC_INTRO);

    if let Err(e) = run(&args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let options = load_options(args)?;
    let cache = NameCache::for_options(&options);
    if args.clear_cache {
        cache.clear().context("failed to clear the class name cache")?;
    }

    let root = match &args.root {
        Some(root) => root.clone(),
        None => env::current_dir().context("cannot determine the current directory")?,
    };

    // Token assignment order must not depend on thread scheduling.
    let compiled: Vec<CompiledSource> = if options.compress_class_names {
        args.inputs
            .iter()
            .map(|input| compile_file(input, &root, &options, &cache))
            .collect::<anyhow::Result<_>>()?
    } else {
        args.inputs
            .par_iter()
            .map(|input| compile_file(input, &root, &options, &cache))
            .collect::<anyhow::Result<_>>()?
    };

    write_bundle(args.output.as_deref(), &compiled)?;

    if let Some(names_path) = &args.names {
        let table: IndexMap<&str, &IndexMap<String, ClassNames>> = compiled
            .iter()
            .map(|source| (source.file.as_str(), &source.class_names))
            .collect();
        let json = serde_json::to_string_pretty(&table)?;
        fs::write(names_path, json)
            .with_context(|| format!("failed to write {}", names_path.display()))?;
    }

    Ok(())
}

fn load_options(args: &Args) -> anyhow::Result<Options> {
    let mut options = match &args.config {
        Some(path) => Options::from_file(path)?,
        None => Options::default(),
    };

    if args.minify {
        options.minify = true;
    }
    if args.vendor_prefixes && options.vendor_prefixes == VendorPrefixes::Enabled(false) {
        options.vendor_prefixes = VendorPrefixes::Enabled(true);
    }
    if args.compress {
        options.compress_class_names = true;
    }
    if args.cache_dir.is_some() {
        options.cache_dir = args.cache_dir.clone();
    }
    if args.prefix.is_some() {
        options.prefix = args.prefix.clone();
    }
    Ok(options)
}

fn compile_file(
    input: &Path,
    root: &Path,
    options: &Options,
    cache: &NameCache,
) -> anyhow::Result<CompiledSource> {
    let json = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let sheets: serde_json::Value = serde_json::from_str(&json)
        .with_context(|| format!("{} is not valid JSON", input.display()))?;

    let source = input.with_extension("");
    let file = source_identifier(Some(&source), root);
    let compiled = compile_source(&file, &sheets, options, cache)
        .with_context(|| format!("failed to compile stylesheets of {}", file))?;

    info!("compiled {} ({} bytes of CSS)", file, compiled.css.len());
    Ok(compiled)
}

fn write_bundle(output: Option<&Path>, compiled: &[CompiledSource]) -> anyhow::Result<()> {
    let bundle: String = compiled.iter().map(|source| source.css.as_str()).collect();

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(path, bundle)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => io::stdout().write_all(bundle.as_bytes())?,
    }
    Ok(())
}
