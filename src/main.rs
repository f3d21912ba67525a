//! # Quire CLI
//!
//! Usage:
//!   quire notes.md                     # writes notes.pdf
//!   quire notes.md -o out.pdf --theme Ocean --page-size A4
//!   cat notes.md | quire - -o out.pdf
//!   quire --list-themes

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use quire::config::RenderConfig;
use quire::error::QuireError;
use quire::style::{themes, PageSize};
use quire::Renderer;

#[derive(Parser, Debug)]
#[command(version, about = "Render Markdown to a paginated PDF")]
struct Args {
    /// Markdown file to render, or `-` for stdin
    input: Option<PathBuf>,

    /// Output PDF path (defaults to the input path with a .pdf extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON render configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Built-in theme name
    #[arg(short, long)]
    theme: Option<String>,

    /// Page size: A3, A4, A5, Letter, Legal or Tabloid
    #[arg(long)]
    page_size: Option<PageSize>,

    /// Draw code blocks without syntax colors
    #[arg(long)]
    no_highlight: bool,

    /// Hide code-block line numbers
    #[arg(long)]
    no_line_numbers: bool,

    /// TrueType font for monochrome emoji
    #[arg(long)]
    emoji_font: Option<PathBuf>,

    /// Directory of Twemoji PNGs (e.g. 1f389.png) for color emoji
    #[arg(long)]
    emoji_images: Option<PathBuf>,

    /// Print the built-in theme names and exit
    #[arg(long)]
    list_themes: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    if args.list_themes {
        for name in themes::THEME_NAMES {
            println!("{}", name);
        }
        return;
    }

    if let Err(e) = run(args) {
        eprintln!("✗ {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), QuireError> {
    let Some(input) = args.input.clone() else {
        return Err(QuireError::Render("no input file given (see --help)".to_string()));
    };
    let from_stdin = input.as_os_str() == "-";
    let markdown = if from_stdin {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| QuireError::io("<stdin>", e))?;
        buf
    } else {
        fs::read_to_string(&input).map_err(|e| QuireError::io(&input, e))?
    };

    let mut config = match &args.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    apply_flags(&mut config, &args);
    if config.image_base_path.is_none() && !from_stdin {
        config.image_base_path = input.parent().map(Path::to_path_buf);
    }

    let output = match args.output {
        Some(path) => path,
        None if from_stdin => PathBuf::from("output.pdf"),
        None => input.with_extension("pdf"),
    };

    let renderer = Renderer::new(config.into_options())?;
    let pdf = renderer.render(&markdown)?;
    fs::write(&output, &pdf).map_err(|e| QuireError::io(&output, e))?;
    eprintln!("✓ Written {} bytes to {}", pdf.len(), output.display());
    Ok(())
}

/// Command-line flags win over the config file.
fn apply_flags(config: &mut RenderConfig, args: &Args) {
    if let Some(theme) = &args.theme {
        config.theme = Some(theme.clone());
    }
    if let Some(size) = args.page_size {
        let mut page = config.page.unwrap_or_default();
        page.page_size = size;
        config.page = Some(page);
    }
    if args.no_highlight {
        config.syntax_highlighting = Some(false);
    }
    if args.no_line_numbers {
        config.line_numbers = Some(false);
    }
    if let Some(font) = &args.emoji_font {
        config.emoji_font = Some(font.clone());
    }
    if let Some(dir) = &args.emoji_images {
        config.emoji_images = Some(dir.clone());
    }
}
