//! pagebridge CLI - WordPress page builder converter.

use clap::{Parser, Subcommand};
use pagebridge::{
    AdapterRegistry, ApplyOptions, ConversionResult, ExtractOptions, NeutralLayout, PageData,
    RegistryConfig,
};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pagebridge")]
#[command(author, version, about = "WordPress page builder converter", long_about = None)]
struct Cli {
    /// Registry config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect which builder produced a page
    Detect {
        /// Page file: raw markup, or a WordPress REST page object (.json); - for stdin
        input: PathBuf,

        /// List every builder above the threshold
        #[arg(short, long)]
        all: bool,

        /// Minimum confidence (default 0.5, or 0.3 with --all)
        #[arg(short, long)]
        min_confidence: Option<f64>,
    },

    /// Extract a page's neutral layout as JSON
    Extract {
        /// Page file (use - for stdin)
        input: PathBuf,

        /// Builder to read with (detected if not specified)
        #[arg(short, long)]
        builder: Option<String>,

        /// Keep native names and attributes on every element
        #[arg(short, long)]
        preserve: bool,

        /// Output file (stdout if omitted or -)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a neutral layout as a builder's markup
    Apply {
        /// Layout JSON file (use - for stdin)
        layout: PathBuf,

        /// Builder to write
        #[arg(short, long)]
        builder: String,

        /// Pretty-print where the builder allows it
        #[arg(long)]
        pretty: bool,

        /// Output file (stdout if omitted or -)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a page from one builder to another
    Convert {
        /// Page file (use - for stdin)
        input: PathBuf,

        /// Target builder
        #[arg(short, long)]
        to: String,

        /// Source builder (detected if not specified)
        #[arg(short, long)]
        from: Option<String>,

        /// Pretty-print where the builder allows it
        #[arg(long)]
        pretty: bool,

        /// Output file (stdout if omitted or -)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List registered builders
    Builders,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let registry = match &cli.config {
        Some(path) => AdapterRegistry::from_config(&RegistryConfig::load(path)?),
        None => AdapterRegistry::with_defaults(),
    };

    match cli.command {
        Commands::Detect {
            input,
            all,
            min_confidence,
        } => detect(&registry, &input, all, min_confidence),
        Commands::Extract {
            input,
            builder,
            preserve,
            output,
        } => extract(&registry, &input, builder, preserve, output),
        Commands::Apply {
            layout,
            builder,
            pretty,
            output,
        } => apply(&registry, &layout, &builder, pretty, output),
        Commands::Convert {
            input,
            to,
            from,
            pretty,
            output,
        } => convert(&registry, &input, from, &to, pretty, output),
        Commands::Builders => {
            list_builders(&registry);
            Ok(())
        }
    }
}

fn detect(
    registry: &AdapterRegistry,
    input: &Path,
    all: bool,
    min_confidence: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let page = read_page(input)?;
    let matches = if all {
        registry.detect_all_builders(&page, min_confidence)
    } else {
        registry
            .detect_builder(&page, min_confidence)
            .into_iter()
            .collect()
    };

    if matches.is_empty() {
        return Err("no builder detected".into());
    }
    for m in matches {
        println!("{:12} {:.3}  {}", m.name, m.confidence, m.method);
    }
    Ok(())
}

fn extract(
    registry: &AdapterRegistry,
    input: &Path,
    builder: Option<String>,
    preserve: bool,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let page = read_page(input)?;
    let builder = resolve_builder(registry, &page, builder)?;
    let options = ExtractOptions {
        preserve_builder_data: preserve,
    };
    let result = report(registry.extract(&page, &builder, &options)?)?;
    write_output(output, result.to_json(true)?.as_bytes())
}

fn apply(
    registry: &AdapterRegistry,
    layout: &Path,
    builder: &str,
    pretty: bool,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let layout = NeutralLayout::from_json(&read_input(layout)?)?;
    let result = report(registry.apply(&layout, builder, &ApplyOptions { pretty })?)?;
    write_output(output, result.as_bytes())
}

fn convert(
    registry: &AdapterRegistry,
    input: &Path,
    from: Option<String>,
    to: &str,
    pretty: bool,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let page = read_page(input)?;
    let from = resolve_builder(registry, &page, from)?;
    let result = registry.convert(
        &page,
        Some(&from),
        to,
        &ExtractOptions::default(),
        &ApplyOptions { pretty },
    )?;
    let markup = report(result)?;
    write_output(output, markup.as_bytes())
}

fn resolve_builder(
    registry: &AdapterRegistry,
    page: &PageData,
    builder: Option<String>,
) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(builder) = builder {
        return Ok(builder);
    }
    let found = registry
        .detect_builder(page, None)
        .ok_or("cannot detect the page's builder. Use --builder/--from to specify.")?;
    tracing::info!(builder = %found.name, confidence = found.confidence, "detected");
    Ok(found.name)
}

/// Print warnings to stderr and unwrap the data of a successful conversion.
fn report<T>(result: ConversionResult<T>) -> Result<T, Box<dyn std::error::Error>> {
    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }
    if !result.unsupported_elements.is_empty() {
        let names: Vec<_> = result.unsupported_elements.iter().cloned().collect();
        eprintln!("unsupported: {}", names.join(", "));
    }
    if let Some(stats) = &result.stats {
        tracing::info!(
            total = stats.total_elements,
            converted = stats.converted_elements,
            elapsed = ?stats.processing_time,
            "conversion stats"
        );
    }
    if !result.success {
        return Err("conversion failed".into());
    }
    Ok(result.data)
}

fn read_input(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

/// A `.json` file holding a page object (with a `content` object) is a
/// REST page record; anything else is raw content.
fn read_page(path: &Path) -> Result<PageData, Box<dyn std::error::Error>> {
    let text = read_input(path)?;
    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
    if is_json
        && let Ok(value) = serde_json::from_str::<serde_json::Value>(&text)
        && value.get("content").is_some_and(|c| c.is_object())
    {
        return Ok(serde_json::from_value(value)?);
    }
    Ok(PageData::from_raw(text))
}

fn write_output(output: Option<PathBuf>, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) if path.as_os_str() != "-" => {
            fs::write(&path, bytes)?;
        }
        _ => {
            let mut stdout = io::stdout();
            stdout.write_all(bytes)?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn list_builders(registry: &AdapterRegistry) {
    println!("Registered builders:\n");
    println!(
        "  {:12} {:28} {:8} {:8}  VERSION",
        "NAME", "DISPLAY NAME", "PRIORITY", "ENABLED"
    );
    println!(
        "  {:12} {:28} {:8} {:8}  -------",
        "----", "------------", "--------", "-------"
    );

    let stats = registry.stats();
    for reg in registry.registrations() {
        let enabled = if reg.enabled { "yes" } else { "-" };
        println!(
            "  {:12} {:28} {:8} {:8}  {}",
            reg.name(),
            reg.adapter.display_name(),
            reg.priority,
            enabled,
            reg.adapter.version()
        );
    }
    println!(
        "\n{} registered, {} enabled, {} supported",
        stats.total, stats.enabled, stats.supported
    );
}
