use clap::{Parser, Subcommand};
use slab_press::cache::{ContentCache, FsSource};
use slab_press::query::Blog;
use slab_press::{config, generate, output, scan};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "slab-press")]
#[command(about = "Blog engine for a concrete calculator site")]
#[command(long_about = "\
Blog engine for a concrete calculator site

Posts are MDX/Markdown files with YAML front matter. Every post needs a
title and a slug; everything else is optional.

Content structure:

  content/
  ├── config.toml                  # Site config (optional)
  ├── categories.json              # Category descriptors
  └── blog/
      ├── slab-thickness.mdx       # Post
      ├── guides/
      │   └── footing-depth.mdx    # Subdirectories are searched too
      └── .draft.mdx               # Hidden files are ignored

Front matter:

  ---
  title: How Thick Should a Slab Be?
  slug: slab-thickness
  date: 2024-06-01
  excerpt: Four inches is not always enough.
  cover: /public/images/slab.jpg   # /public is stripped
  category: slabs
  calculator: slab
  relatedPosts: [footing-depth]
  ---

Set RUST_LOG (e.g. RUST_LOG=debug) to control log output on stderr.

Run 'slab-press gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Content directory
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Directory for intermediate files (manifest)
    #[arg(long, default_value = ".slab-press-temp", global = true)]
    temp_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan content directory into a manifest
    Scan,
    /// Run the full pipeline: scan → generate
    Build,
    /// Validate content directory without building
    Check,
    /// Print the RSS feed to stdout
    Feed,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Scan => {
            let manifest = scan::scan(&cli.source)?;
            write_manifest(&manifest, &cli.temp_dir)?;
            output::print_scan_output(&manifest, &cli.source);
        }
        Command::Build => {
            println!("==> Stage 1: Scanning {}", cli.source.display());
            let manifest = scan::scan(&cli.source)?;
            write_manifest(&manifest, &cli.temp_dir)?;
            output::print_scan_output(&manifest, &cli.source);

            println!("==> Stage 2: Generating HTML → {}", cli.output.display());
            let blog = open_blog(&cli.source, &manifest.config);
            let report = generate::generate(&blog, &manifest.config, &cli.output)?;
            output::print_generate_output(&report);

            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let manifest = scan::scan(&cli.source)?;
            output::print_scan_output(&manifest, &cli.source);
            if manifest.is_clean() {
                println!("==> Content is valid");
            } else {
                return Err(format!(
                    "{} dropped, {} duplicate slugs, {} unreadable directories",
                    manifest.dropped.len(),
                    manifest.duplicates.len(),
                    manifest.unreadable
                )
                .into());
            }
        }
        Command::Feed => {
            let config = config::load_config(&cli.source)?;
            let blog = open_blog(&cli.source, &config);
            let response = generate::feed_response(&blog.list_all(), &config);
            print!("{}", response.body);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_blog(source: &Path, config: &config::SiteConfig) -> Blog {
    let cache = ContentCache::new(FsSource {
        root: config.blog_dir(source),
        extension: config.blog.extension.clone(),
        public_prefix: config.blog.public_prefix.clone(),
    });
    Blog::new(cache, config.categories_path(source))
}

fn write_manifest(manifest: &scan::Manifest, temp_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(temp_dir)?;
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(temp_dir.join("manifest.json"), json)?;
    Ok(())
}
