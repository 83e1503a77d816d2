use clap::{Parser, Subcommand};
use smak_folio::http_cache::CacheRequest;
use smak_folio::site::Site;
use smak_folio::{config, naming, output, telemetry};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "smak-folio")]
#[command(about = "Dated photo-set listing and template cache maintenance")]
#[command(long_about = "\
Dated photo-set listing and template cache maintenance

Your filesystem is the data source. Gallery directories below the content
root become sets, each rendered by the template that sits next to its images.
A leading 00 on a directory name is an ordering hint and is dropped from the
name used in links.

Content structure:

  config.toml                          # Site config (optional)
  templates/                           # Site templates (index, about, ...)
  content/
  ├── 2024/
  │   ├── 00-2024-spring/              # Set, link name \"2024-spring\"
  │   │   ├── 00-2024-spring.html.twig # Set template (required)
  │   │   ├── 01.jpg
  │   │   └── 02.jpg
  │   └── 2024-winter/                 # Skipped: no images
  │       └── 2024-winter.html.twig
  └── 2023/
      └── 2023-fall/
          ├── 2023-fall.html.twig
          └── 01.jpg

Sets touched within the freshness interval are listed first; the rest are
ordered newest name first.

Pages are rendered with 'smak-folio render <template>': a stale compiled
template is evicted together with the cached page, then recompiled.

Run 'smak-folio gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Site directory holding config.toml; relative paths resolve here
    #[arg(long, default_value = ".", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Aggregate and print the set listing
    List {
        /// Session whose stored listing is reused
        #[arg(long, default_value = "cli")]
        session: String,
    },
    /// Print the sets of one year
    Year {
        /// Four-digit year
        year: String,
        #[arg(long, default_value = "cli")]
        session: String,
    },
    /// Print one set with its neighbours in the listing
    Show {
        year: String,
        /// Directory name or link name of the set
        name: String,
        #[arg(long, default_value = "cli")]
        session: String,
    },
    /// Evict a compiled template if its source changed since compilation
    Check {
        /// Template identifier, e.g. index.html.twig or 2024/2024-spring/2024-spring.html.twig
        template_id: String,
        /// Request URI whose cached response is dropped on eviction
        #[arg(long, default_value = "/")]
        uri: String,
    },
    /// Render a template for a request URI through the compiled and page caches
    Render {
        /// Template identifier, as for `check`
        template_id: String,
        /// Request URI the rendered page is cached under
        #[arg(long, default_value = "/")]
        uri: String,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::List { session } => {
            let site = open_site(&cli.config)?;
            let mut store = site.session(&session);
            let sets = site.provider().sets(&mut store)?;
            output::print_listing(&sets);
        }
        Command::Year { year, session } => {
            require_year(&year)?;
            let site = open_site(&cli.config)?;
            let mut store = site.session(&session);
            let sets = site.provider().sets_for_year(&mut store, &year)?;
            output::print_listing(&sets);
        }
        Command::Show {
            year,
            name,
            session,
        } => {
            require_year(&year)?;
            let site = open_site(&cli.config)?;
            let mut store = site.session(&session);
            let (set, nav) = site.provider().find_set(&mut store, &year, &name)?;
            output::print_set(&set, &nav);
        }
        Command::Check { template_id, uri } => {
            let site = open_site(&cli.config)?;
            let state = site.checker().check(&template_id, &CacheRequest::new(uri));
            println!("{}", output::format_template_state(&template_id, state));
        }
        Command::Render { template_id, uri } => {
            let site = open_site(&cli.config)?;
            let rendered = site.render(&template_id, &CacheRequest::new(uri))?;
            println!("{}", output::format_render(&template_id, &rendered));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the site config and install logging from it.
fn open_site(dir: &Path) -> Result<Site, Box<dyn std::error::Error>> {
    let site = Site::open(dir)?;
    telemetry::init(&site.config().logging)?;
    Ok(site)
}

fn require_year(year: &str) -> Result<(), String> {
    if naming::is_year(year) {
        Ok(())
    } else {
        Err(format!("not a year: {year}"))
    }
}
