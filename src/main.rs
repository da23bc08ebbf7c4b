use clap::{Parser, Subcommand};
use simple_blog::cms::{PostSource, PrismicClient};
use simple_blog::config::{self, SiteConfig};
use simple_blog::fetch::{self, Manifest};
use simple_blog::preview::PreviewState;
use simple_blog::{generate, output};
use std::path::{Path, PathBuf};

/// Shared flags for commands that query the CMS.
#[derive(clap::Args, Clone)]
struct PreviewArgs {
    /// Build in preview mode: show the exit-preview link on every page
    #[arg(long)]
    preview: bool,

    /// Content ref to query instead of the master ref (implies --preview)
    #[arg(long = "ref", value_name = "REF")]
    content_ref: Option<String>,
}

#[derive(Parser)]
#[command(name = "simple-blog")]
#[command(about = "Static blog generator for a headless CMS")]
#[command(long_about = "\
Static blog generator for a headless CMS

Posts live in a Prismic repository. The build fetches the listing page by
page, then every post document, and writes a static site:

  dist/
  ├── index.html                   # First page of posts + \"Carregar mais posts\"
  ├── posts/2.json                 # Further listing pages, loaded in the browser
  └── post/<uid>/index.html        # One page per post

Source directory:

  site/
  ├── config.toml                  # Site config (optional)
  └── assets/                      # Static assets (logo, favicon) → copied to output root

Environment:
  PRISMIC_API_ENDPOINT   CMS API root (overrides [cms] endpoint)
  PRISMIC_ACCESS_TOKEN   Access token for private repositories
  UTTERANCES_REPO        GitHub repository backing the comments
  RUST_LOG               Diagnostic logging (e.g. RUST_LOG=simple_blog=debug)

Run 'simple-blog gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Source directory (config.toml and assets/)
    #[arg(long, default_value = "site", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Directory for intermediate files (manifest)
    #[arg(long, default_value = ".simple-blog-temp", global = true)]
    temp_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every post from the CMS into a manifest
    Fetch(PreviewArgs),
    /// Produce the final HTML site from the manifest
    Generate,
    /// Run the full pipeline: fetch → generate
    Build(PreviewArgs),
    /// Validate config and query the first listing page without building
    Check(PreviewArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let manifest_path = cli.temp_dir.join("manifest.json");

    match cli.command {
        Command::Fetch(preview_args) => {
            let site_config = config::load_config(&cli.source)?;
            run_fetch(&site_config, &preview_args, &manifest_path)?;
        }
        Command::Generate => {
            let report = generate::generate(&manifest_path, &cli.source, &cli.output)?;
            output::print_generate_output(&report);
        }
        Command::Build(preview_args) => {
            let site_config = config::load_config(&cli.source)?;

            println!("==> Stage 1: Fetching posts");
            let manifest = run_fetch(&site_config, &preview_args, &manifest_path)?;

            println!("==> Stage 2: Generating HTML → {}", cli.output.display());
            let report = generate::generate_from_manifest(&manifest, &cli.source, &cli.output)?;
            output::print_generate_output(&report);

            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check(preview_args) => {
            println!("==> Checking {}", cli.source.display());
            let site_config = config::load_config(&cli.source)?;
            site_config.require_endpoint()?;
            let preview = resolve_preview(&site_config, &preview_args);
            let client = PrismicClient::connect(&site_config.cms, preview.query_ref())?;
            let first = client.first_page(site_config.cms.page_size)?;
            output::print_check_output(&client.endpoint(), client.content_ref(), &first);
            println!("==> CMS is reachable");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Fetch with progress printed from a dedicated thread, then write the manifest.
fn run_fetch(
    site_config: &SiteConfig,
    preview_args: &PreviewArgs,
    manifest_path: &Path,
) -> Result<Manifest, Box<dyn std::error::Error>> {
    init_thread_pool(&site_config.processing);
    let preview = resolve_preview(site_config, preview_args);

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_fetch_event(&event);
        }
    });
    let result = fetch::fetch(site_config, &preview, Some(tx));
    printer.join().map_err(|_| "output thread panicked")?;
    let manifest = result?;

    fetch::write_manifest(&manifest, manifest_path)?;
    output::print_fetch_summary(&manifest);
    Ok(manifest)
}

fn resolve_preview(site_config: &SiteConfig, args: &PreviewArgs) -> PreviewState {
    PreviewState::resolve(
        &site_config.preview,
        args.preview,
        args.content_ref.as_deref(),
    )
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; config can lower the count, never raise it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
