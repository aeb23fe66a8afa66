use anyhow::{Context, Result as AnyhowResult};
use clap::{Parser, Subcommand};
use keel_docs::config::{DocsConfig, HighlightOptions, HighlightStyle};
use keel_docs::primitives::grammar::LocalGrammarLoader;
use keel_docs::primitives::highlighter::available_themes;
use keel_docs::services::tracing_setup;
use keel_docs::site::{configure_and_build, ManifestWriter, SiteConfig};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Build configuration for the Keel documentation site
#[derive(Parser, Debug)]
#[command(name = "keel-docs")]
#[command(about = "Assemble the docs site configuration and highlight code with custom grammars", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the settings file (default: ./keel-docs.json if present)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Write diagnostics to this file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the languages the highlighter accepts
    Languages {
        /// Only list registered grammars
        #[arg(long)]
        custom: bool,
    },

    /// Highlight a source file as HTML
    Highlight {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Language id or alias (default: inferred from the file extension)
        #[arg(long)]
        lang: Option<String>,

        /// Highlight theme overriding the settings file
        #[arg(long)]
        theme: Option<String>,

        /// Emit CSS classes instead of inline styles
        #[arg(long)]
        classed: bool,

        /// Print the stylesheet for classed output instead of the code
        #[arg(long)]
        css: bool,
    },

    /// Print the assembled site configuration as JSON
    DumpConfig,

    /// Hand the configuration to the manifest builder
    Emit {
        /// Output file (default: stdout)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },

    /// List available highlight themes
    Themes,
}

fn main() -> AnyhowResult<()> {
    let args = Args::parse();

    let default_level = if args.log_file.is_some() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    if !tracing_setup::init_global(args.log_file.as_deref(), default_level) {
        eprintln!("Warning: failed to initialize logging");
    }

    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    let loader = LocalGrammarLoader::new();
    let load_settings =
        || DocsConfig::locate(args.config.as_deref(), &cwd).context("Failed to load settings");
    let assemble = || -> AnyhowResult<SiteConfig> {
        let (config, base_dir) = load_settings()?;
        SiteConfig::assemble(&config, &base_dir, &loader)
            .context("Failed to assemble site configuration")
    };

    match &args.command {
        Command::Themes => {
            for theme in available_themes() {
                println!("{}", theme);
            }
            Ok(())
        }
        Command::Emit { out } => {
            let (config, base_dir) = load_settings()?;
            emit(&config, &base_dir, &loader, out.as_deref())
        }
        Command::Languages { custom } => list_languages(&assemble()?, *custom),
        Command::Highlight {
            file,
            lang,
            theme,
            classed,
            css,
        } => {
            let site = assemble()?;
            let defaults = &site.mdx_options.pretty_code.highlight;
            let options = HighlightOptions {
                theme: theme.clone().unwrap_or_else(|| defaults.theme.clone()),
                style: if *classed {
                    HighlightStyle::Classed
                } else {
                    defaults.style
                },
            };
            highlight_file(&site, &options, file, lang.as_deref(), *css)
        }
        Command::DumpConfig => {
            let site = assemble()?;
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &site.manifest())?;
            writeln!(stdout)?;
            Ok(())
        }
    }
}

fn emit(
    config: &DocsConfig,
    base_dir: &Path,
    loader: &LocalGrammarLoader,
    out: Option<&Path>,
) -> AnyhowResult<()> {
    match out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = ManifestWriter::new(BufWriter::new(file));
            configure_and_build(&mut writer, config, base_dir, loader)?;
            tracing::info!("Wrote manifest to {:?}", path);
        }
        None => {
            let mut writer = ManifestWriter::new(io::stdout().lock());
            configure_and_build(&mut writer, config, base_dir, loader)?;
        }
    }
    Ok(())
}

fn list_languages(site: &SiteConfig, custom: bool) -> AnyhowResult<()> {
    let catalog = site.catalog();
    let languages = if custom {
        catalog.custom()
    } else {
        catalog.languages()
    };

    let mut stdout = io::stdout().lock();
    for language in languages {
        writeln!(
            stdout,
            "{}\t{}\t{}",
            language.id,
            language.scope_name,
            language.aliases.join(",")
        )?;
    }
    Ok(())
}

fn highlight_file(
    site: &SiteConfig,
    options: &HighlightOptions,
    file: &Path,
    lang: Option<&str>,
    css: bool,
) -> AnyhowResult<()> {
    let highlighter = site.mdx_options.pretty_code.get_highlighter.create(options)?;
    let mut stdout = io::stdout().lock();

    if css {
        write!(stdout, "{}", highlighter.css()?)?;
        return Ok(());
    }

    let lang = match lang {
        Some(lang) => lang,
        None => file
            .extension()
            .and_then(|e| e.to_str())
            .with_context(|| format!("Cannot infer language of {}, pass --lang", file.display()))?,
    };
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    write!(stdout, "{}", highlighter.highlight(&code, lang)?)?;
    Ok(())
}
