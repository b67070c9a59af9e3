//! md2html: CLI tool to convert Markdown to HTML

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing_subscriber::EnvFilter;

use config::{CONFIG_FILE_NAME, Config, Emit};
use md2html_core::{
    DialectRef, Options, ParseOptions, RenderOptions, parse_with_options, render_tree,
    slides_to_html, to_html_tree,
};

#[derive(Parser, Debug)]
#[command(name = "md2html")]
#[command(about = "Convert Markdown to HTML")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(after_help = "Examples:
  md2html README.md                 # Convert single file to README.html
  md2html README.md -o out.html     # Convert to specific output file
  md2html - < notes.md              # Read stdin, write stdout
  md2html docs/ -o site/ -r -j4     # Convert a directory tree with 4 jobs
  md2html notes.md -d Maruku        # Use the Maruku dialect
  md2html notes.md --emit tree      # Write the Markdown tree as JSON
  md2html init                      # Write a sample _md2html.toml")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Input Markdown file or directory ("-" or omitted reads stdin)
    input: Option<PathBuf>,

    /// Output file or directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Markdown dialect ("Gruber", "default" or "Maruku")
    #[arg(short, long)]
    dialect: Option<String>,

    /// What to write out
    #[arg(long, value_enum)]
    emit: Option<Emit>,

    /// Wrap rendered HTML in the root `<html>` element
    #[arg(long)]
    root: bool,

    /// Treat the input as a slide deck split on `-----` lines
    #[arg(long)]
    slides: bool,

    /// Configuration file (defaults to `_md2html.toml` next to the input)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of parallel jobs (defaults to number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Process directories recursively
    #[arg(short, long)]
    recursive: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only show errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a sample configuration file
    Init {
        /// Where to write (defaults to `_md2html.toml` in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the JSON schema of the configuration instead
        #[arg(long)]
        schema: bool,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Settings after merging command line, configuration file and defaults
#[derive(Debug, Clone)]
struct Settings {
    dialect: String,
    parse: ParseOptions,
    emit: Emit,
    extension: String,
    root: bool,
    slides: bool,
}

impl Settings {
    /// Command line flags win over the configuration file
    fn resolve(cli: &Cli, config: &Config) -> Self {
        let defaults = ParseOptions::default();
        let emit = cli.emit.or(config.output.emit).unwrap_or_default();
        Settings {
            dialect: cli
                .dialect
                .clone()
                .or_else(|| config.parser.dialect.clone())
                .unwrap_or_else(|| "Gruber".to_string()),
            parse: ParseOptions {
                max_block_depth: config.parser.max_block_depth.unwrap_or(defaults.max_block_depth),
                max_inline_depth: config
                    .parser
                    .max_inline_depth
                    .unwrap_or(defaults.max_inline_depth),
            },
            emit,
            extension: config
                .output
                .extension
                .clone()
                .unwrap_or_else(|| emit.extension().to_string()),
            root: cli.root || config.output.root.unwrap_or(false),
            slides: cli.slides || config.output.slides.unwrap_or(false),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Some(Command::Init {
        output,
        schema,
        force,
    }) = &cli.command
    {
        return init_config(output.as_deref(), *schema, *force, cli.quiet);
    }

    let input = cli.input.as_deref().filter(|p| *p != Path::new("-"));
    let config = load_config(&cli, input)?;
    let settings = Settings::resolve(&cli, &config);
    tracing::debug!(?settings, "resolved settings");

    // Fail on an unknown dialect before touching any file
    DialectRef::from(settings.dialect.as_str()).resolve()?;

    match input {
        None => convert_stdin(cli.output.as_deref(), &settings),
        Some(input) if input.is_file() => {
            convert_file(input, cli.output.as_deref(), &settings, cli.quiet)
        }
        Some(input) if input.is_dir() => convert_directory(
            input,
            cli.output.as_deref(),
            cli.recursive,
            &settings,
            cli.quiet,
            cli.jobs,
        ),
        Some(input) => anyhow::bail!("Input path does not exist: {}", input.display()),
    }
}

/// Install the stderr log subscriber
///
/// `RUST_LOG` takes precedence over the verbosity flags.
fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Load the configuration file named on the command line, or the one next to the input
fn load_config(cli: &Cli, input: Option<&Path>) -> Result<Config> {
    if let Some(path) = &cli.config {
        return Config::load(path);
    }
    let dir = match input {
        Some(input) if input.is_dir() => input.to_path_buf(),
        Some(input) => input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
        None => PathBuf::from("."),
    };
    let config = Config::load_from_dir(&dir)?;
    if config.is_some() {
        tracing::info!(path = %dir.join(CONFIG_FILE_NAME).display(), "loaded configuration");
    }
    Ok(config.unwrap_or_default())
}

/// Write a sample configuration file or its JSON schema
fn init_config(output: Option<&Path>, schema: bool, force: bool, quiet: bool) -> Result<()> {
    let content = if schema {
        Config::json_schema_string()?
    } else {
        Config::sample().to_toml_with_schema()?
    };

    let output_path = match output {
        Some(p) => p.to_path_buf(),
        None if schema => {
            println!("{content}");
            return Ok(());
        }
        None => PathBuf::from(CONFIG_FILE_NAME),
    };

    if output_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output_path.display()
        );
    }

    fs::write(&output_path, content)
        .with_context(|| format!("Failed to write: {}", output_path.display()))?;

    if !quiet {
        println!("{}", output_path.display());
    }

    Ok(())
}

/// Convert Markdown from stdin
fn convert_stdin(output: Option<&Path>, settings: &Settings) -> Result<()> {
    let content = io::read_to_string(io::stdin()).context("Failed to read stdin")?;
    let rendered = convert_markdown(&content, settings)?;

    match output {
        Some(path) if path != Path::new("-") => write_output(path, &rendered),
        _ => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{rendered}").context("Failed to write stdout")
        }
    }
}

/// Convert a single Markdown file
fn convert_file(input: &Path, output: Option<&Path>, settings: &Settings, quiet: bool) -> Result<()> {
    let output_path = match output {
        Some(p) => p.to_path_buf(),
        None => input.with_extension(&settings.extension),
    };

    tracing::info!(
        "Converting: {} -> {}",
        input.display(),
        output_path.display()
    );

    convert_file_inner(input, &output_path, settings)?;

    if !quiet {
        println!("{}", output_path.display());
    }

    Ok(())
}

/// Convert a directory of Markdown files
fn convert_directory(
    input: &Path,
    output: Option<&Path>,
    recursive: bool,
    settings: &Settings,
    quiet: bool,
    jobs: Option<usize>,
) -> Result<()> {
    let output_dir = output.unwrap_or(input);

    let files = collect_markdown_files(input, recursive)?;

    if files.is_empty() {
        if !quiet {
            eprintln!("No Markdown files found in {}", input.display());
        }
        return Ok(());
    }

    tracing::info!("Found {} Markdown files", files.len());

    if let Some(n) = jobs {
        // A global pool may already exist
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .ok();
    }

    let success = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    let errors: Vec<_> = files
        .par_iter()
        .filter_map(|file| {
            let relative = file.strip_prefix(input).unwrap_or(file);
            let output_file = output_dir.join(relative).with_extension(&settings.extension);

            match convert_file_inner(file, &output_file, settings) {
                Ok(()) => {
                    success.fetch_add(1, Ordering::Relaxed);
                    if !quiet {
                        println!("{}", output_file.display());
                    }
                    None
                }
                Err(e) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                    Some((file.clone(), e))
                }
            }
        })
        .collect();

    for (file, e) in &errors {
        eprintln!("Error converting {}: {:#}", file.display(), e);
    }

    let success_count = success.load(Ordering::Relaxed);
    let failed_count = failed.load(Ordering::Relaxed);

    if !quiet {
        eprintln!("Converted {} files, {} failed", success_count, failed_count);
    }

    if failed_count > 0 {
        anyhow::bail!("{} files failed to convert", failed_count);
    }

    Ok(())
}

/// Conversion without progress output (for parallel use)
fn convert_file_inner(input: &Path, output: &Path, settings: &Settings) -> Result<()> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read: {}", input.display()))?;

    let rendered = convert_markdown(&content, settings)?;
    write_output(output, &rendered)
}

fn write_output(output: &Path, rendered: &str) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(output, format!("{rendered}\n"))
        .with_context(|| format!("Failed to write: {}", output.display()))
}

/// Collect all `.md` and `.markdown` files in a directory
fn collect_markdown_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();

        if path.is_file() {
            let is_markdown = path.extension().is_some_and(|ext| {
                ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown")
            });
            if is_markdown {
                files.push(path);
            }
        } else if path.is_dir() && recursive {
            files.extend(collect_markdown_files(&path, recursive)?);
        }
    }

    files.sort();
    Ok(files)
}

/// Core conversion function
///
/// Slides only apply to HTML output; tree output is always one document.
fn convert_markdown(source: &str, settings: &Settings) -> Result<String> {
    let options = Options {
        parse: settings.parse,
        ..Options::default()
    };
    let dialect = settings.dialect.as_str();

    let rendered = match settings.emit {
        Emit::Html if settings.slides => slides_to_html(source, dialect, &options)?,
        Emit::Html => {
            let html = to_html_tree(source, dialect, &options)?;
            render_tree(&html, &RenderOptions { root: settings.root })
        }
        Emit::Tree => {
            let tree = parse_with_options(source, dialect, &options.parse)?;
            serde_json::to_string_pretty(&tree).context("Failed to serialize tree")?
        }
        Emit::HtmlTree => {
            let html = to_html_tree(source, dialect, &options)?;
            serde_json::to_string_pretty(&html).context("Failed to serialize tree")?
        }
    };

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(emit: Emit) -> Settings {
        Settings {
            dialect: "Gruber".to_string(),
            parse: ParseOptions::default(),
            emit,
            extension: emit.extension().to_string(),
            root: false,
            slides: false,
        }
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::parse_from(["md2html", "in.md", "-d", "Maruku", "--emit", "tree"]);
        let config: Config = toml::from_str(
            "[parser]\ndialect = \"Gruber\"\nmax_inline_depth = 9\n[output]\nemit = \"html\"\nroot = true",
        )
        .unwrap();
        let settings = Settings::resolve(&cli, &config);
        assert_eq!(settings.dialect, "Maruku");
        assert_eq!(settings.emit, Emit::Tree);
        assert_eq!(settings.extension, "json");
        assert_eq!(settings.parse.max_inline_depth, 9);
        assert_eq!(settings.parse.max_block_depth, 32);
        assert!(settings.root);
    }

    #[test]
    fn test_defaults_without_config() {
        let cli = Cli::parse_from(["md2html"]);
        let settings = Settings::resolve(&cli, &Config::default());
        assert_eq!(settings.dialect, "Gruber");
        assert_eq!(settings.emit, Emit::Html);
        assert_eq!(settings.extension, "html");
        assert!(!settings.root && !settings.slides);
    }

    #[test]
    fn test_init_subcommand() {
        let cli = Cli::parse_from(["md2html", "init", "--schema"]);
        assert!(matches!(cli.command, Some(Command::Init { schema: true, .. })));
    }

    #[test]
    fn test_convert_markdown_html() {
        let html = convert_markdown("# Hi\n\n*there*", &settings(Emit::Html)).unwrap();
        insta::assert_snapshot!(html, @r"
        <h1>Hi</h1>

        <p><em>there</em></p>
        ");
    }

    #[test]
    fn test_convert_markdown_root() {
        let mut settings = settings(Emit::Html);
        settings.root = true;
        let html = convert_markdown("Hi", &settings).unwrap();
        insta::assert_snapshot!(html, @"<html><p>Hi</p></html>");
    }

    #[test]
    fn test_convert_markdown_tree() {
        let json = convert_markdown("Hi", &settings(Emit::Tree)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!(["markdown", ["para", "Hi"]]));

        let json = convert_markdown("Hi", &settings(Emit::HtmlTree)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!(["html", ["p", "Hi"]]));
    }

    #[test]
    fn test_convert_markdown_slides() {
        let mut settings = settings(Emit::Html);
        settings.slides = true;
        let html = convert_markdown("one\n-----\ntwo", &settings).unwrap();
        insta::assert_snapshot!(html, @r#"
        <div class="slide"><p>one</p></div>

        <div class="slide"><p>two</p></div>
        "#);
    }

    #[test]
    fn test_unknown_dialect_fails() {
        let mut settings = settings(Emit::Html);
        settings.dialect = "kramdown".to_string();
        let err = convert_markdown("x", &settings).unwrap_err();
        assert_eq!(err.to_string(), "Unknown Markdown dialect 'kramdown'");
    }

    #[test]
    fn test_collect_markdown_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "a").unwrap();
        fs::write(dir.path().join("b.MARKDOWN"), "b").unwrap();
        fs::write(dir.path().join("c.txt"), "c").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/d.md"), "d").unwrap();

        let flat = collect_markdown_files(dir.path(), false).unwrap();
        assert_eq!(flat.len(), 2);
        let deep = collect_markdown_files(dir.path(), true).unwrap();
        assert_eq!(deep.len(), 3);
    }
}
