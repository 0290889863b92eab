use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pdf_retouch_core::input::{parse_color, parse_font_size, parse_point, parse_rect};
use pdf_retouch_core::{
    DocumentEngine, EditOutcome, EditorConfig, EditorSession, FormattingAnalyzer,
    FormattingProfile, HitTester, Point, Rect, RegionEditor, RegionRegistry, Rgb, Selection,
    StyleOverrides, TextDimensionEstimator,
};
use pdf_retouch_render::PdfiumEngine;
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "retouch")]
#[command(about = "Select, analyze and rewrite text regions of a PDF")]
pub struct Cli {
    /// JSON editor configuration; defaults come from PDF_RETOUCH_* variables.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct PageArgs {
    #[arg(value_name = "FILE")]
    file: PathBuf,
    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: u32,
}

#[derive(Debug, Args)]
struct RegionArgs {
    #[command(flatten)]
    target: PageArgs,
    /// Region as x0,y0,x1,y1 in points, top-left origin.
    #[arg(long, allow_hyphen_values = true)]
    rect: String,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the visible text of a page.
    Text(PageArgs),
    /// Print the text selected by a rectangle.
    Select(RegionArgs),
    /// Print the word under a point, as a double-click would pick it.
    Word {
        #[command(flatten)]
        target: PageArgs,
        /// Point as x,y in points.
        #[arg(long, allow_hyphen_values = true)]
        at: String,
    },
    /// Print the formatting of the text under a rectangle.
    Analyze(RegionArgs),
    /// Estimate the size of TEXT drawn in the style found under a rectangle.
    Estimate {
        #[command(flatten)]
        region: RegionArgs,
        #[arg(long)]
        text: String,
    },
    /// Mask a region with an opaque white box.
    Hide {
        #[command(flatten)]
        region: RegionArgs,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Mask a region and draw new text over it in the matched style.
    Replace {
        #[command(flatten)]
        region: RegionArgs,
        #[arg(long)]
        text: String,
        /// Override the matched font size.
        #[arg(long, allow_hyphen_values = true)]
        size: Option<String>,
        /// Override the matched color (name or #rrggbb).
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Add a highlight annotation over a region.
    Highlight {
        #[command(flatten)]
        region: RegionArgs,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Attach a sticky note at a point.
    Note {
        #[command(flatten)]
        target: PageArgs,
        #[arg(long, allow_hyphen_values = true)]
        at: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Render a page to PNG.
    Render {
        #[command(flatten)]
        target: PageArgs,
        #[arg(long, default_value_t = 1.0)]
        zoom: f32,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct TextOutput {
    page: u32,
    text: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeOutput {
    #[serde(flatten)]
    profile: FormattingProfile,
    description: String,
}

#[derive(Debug, Serialize)]
struct EstimateOutput {
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
struct EditOutput {
    output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<EditOutcome>,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Text(target) => run_text(config, &target),
        Commands::Select(region) => run_select(&config, &region),
        Commands::Word { target, at } => run_word(&config, &target, &at),
        Commands::Analyze(region) => run_analyze(&region),
        Commands::Estimate { region, text } => run_estimate(&config, &region, &text),
        Commands::Hide { region, output } => run_hide(config, &region, output.as_deref()),
        Commands::Replace { region, text, size, color, output } => {
            let overrides = StyleOverrides {
                font_size: size.as_deref().map(parse_font_size).transpose()?,
                color: color.as_deref().map(parse_color).transpose()?,
            };
            run_replace(config, &region, &text, overrides, output.as_deref())
        }
        Commands::Highlight { region, color, output } => {
            let color = color.as_deref().map(parse_color).transpose()?;
            run_highlight(config, &region, color, output.as_deref())
        }
        Commands::Note { target, at, content, output } => {
            run_note(config, &target, &at, &content, output.as_deref())
        }
        Commands::Render { target, zoom, output } => {
            run_render(&config, &target, zoom, output.as_deref())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    match path {
        Some(path) => EditorConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => EditorConfig::from_env().context("invalid PDF_RETOUCH_* environment"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// Convert a 1-based `--page` into an engine page index
fn page_index(page: u32) -> Result<u16> {
    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }
    u16::try_from(page - 1).context("--page is too large")
}

fn open_document(target: &PageArgs) -> Result<(PdfiumEngine, u16)> {
    let page = page_index(target.page)?;
    ensure_pdf_exists(&target.file)?;
    log::debug!("opening {} at page index {page}", target.file.display());
    let engine = PdfiumEngine::open(&target.file).context("failed to open PDF")?;
    Ok((engine, page))
}

fn run_text(config: EditorConfig, target: &PageArgs) -> Result<()> {
    let page = page_index(target.page)?;
    ensure_pdf_exists(&target.file)?;

    let mut session: EditorSession<PdfiumEngine> = EditorSession::new(config);
    session.open(&target.file).context("failed to open PDF")?;
    let text = session.extract_page_text(page)?;

    print_json(&TextOutput {
        page: target.page,
        text,
    })
}

fn run_select(config: &EditorConfig, region: &RegionArgs) -> Result<()> {
    let rect = parse_rect(&region.rect)?;
    let (engine, page) = open_document(&region.target)?;

    let selection: Option<Selection> = HitTester::new(config.probe_radius).select_region(
        &engine,
        &RegionRegistry::new(),
        page,
        &rect,
    )?;
    print_json(&selection)
}

fn run_word(config: &EditorConfig, target: &PageArgs, at: &str) -> Result<()> {
    let point = parse_point(at)?;
    let (engine, page) = open_document(target)?;

    let word = HitTester::new(config.probe_radius).select_word_at(
        &engine,
        &RegionRegistry::new(),
        page,
        point,
    )?;
    print_json(&word)
}

fn run_analyze(region: &RegionArgs) -> Result<()> {
    let rect = parse_rect(&region.rect)?;
    let (engine, page) = open_document(&region.target)?;
    pdf_retouch_core::editor::check_page(&engine, page)?;

    let profile = FormattingAnalyzer::analyze(&engine, page, &rect)?;
    let description = profile.describe();
    print_json(&AnalyzeOutput {
        profile,
        description,
    })
}

fn run_estimate(config: &EditorConfig, region: &RegionArgs, text: &str) -> Result<()> {
    let rect = parse_rect(&region.rect)?;
    let (engine, page) = open_document(&region.target)?;
    pdf_retouch_core::editor::check_page(&engine, page)?;

    let profile = FormattingAnalyzer::analyze(&engine, page, &rect)?;
    let (width, height) = TextDimensionEstimator::from_config(config).estimate(text, &profile);
    print_json(&EstimateOutput { width, height })
}

/// Open the target, apply `edit`, and write the result
fn edit_and_save<F>(
    target: &PageArgs,
    output: Option<&Path>,
    edit: F,
) -> Result<()>
where
    F: FnOnce(&mut PdfiumEngine, &mut RegionRegistry, u16) -> Result<Option<EditOutcome>>,
{
    let (mut engine, page) = open_document(target)?;
    let mut registry = RegionRegistry::new();
    let outcome = edit(&mut engine, &mut registry, page)?;

    let output = output
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| default_edited_output(&target.file));
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    engine
        .save(&output)
        .with_context(|| format!("failed to write PDF to {}", output.display()))?;

    print_json(&EditOutput {
        output: output.display().to_string(),
        outcome,
    })
}

fn run_hide(config: EditorConfig, region: &RegionArgs, output: Option<&Path>) -> Result<()> {
    let rect = parse_rect(&region.rect)?;
    let editor = RegionEditor::new(config);
    edit_and_save(&region.target, output, |engine, registry, page| {
        editor.hide_text_area(engine, registry, page, &rect)?;
        Ok(None)
    })
}

fn run_replace(
    config: EditorConfig,
    region: &RegionArgs,
    text: &str,
    overrides: StyleOverrides,
    output: Option<&Path>,
) -> Result<()> {
    let rect = parse_rect(&region.rect)?;
    let editor = RegionEditor::new(config);
    edit_and_save(&region.target, output, |engine, registry, page| {
        let outcome = if overrides == StyleOverrides::default() {
            editor.replace_text_area(engine, registry, page, &rect, text)?
        } else {
            editor.restyle_text_area(engine, registry, page, &rect, text, overrides)?
        };
        Ok(Some(outcome))
    })
}

fn run_highlight(
    config: EditorConfig,
    region: &RegionArgs,
    color: Option<Rgb>,
    output: Option<&Path>,
) -> Result<()> {
    let rect: Rect = parse_rect(&region.rect)?;
    let editor = RegionEditor::new(config);
    edit_and_save(&region.target, output, |engine, _, page| {
        editor.highlight_area(engine, page, &rect, color)?;
        Ok(None)
    })
}

fn run_note(
    config: EditorConfig,
    target: &PageArgs,
    at: &str,
    content: &str,
    output: Option<&Path>,
) -> Result<()> {
    let anchor: Point = parse_point(at)?;
    let editor = RegionEditor::new(config);
    edit_and_save(target, output, |engine, _, page| {
        editor.add_note(engine, page, anchor, content)?;
        Ok(None)
    })
}

fn run_render(
    config: &EditorConfig,
    target: &PageArgs,
    zoom: f32,
    output: Option<&Path>,
) -> Result<()> {
    let zoom = config.clamp_zoom(zoom);
    let (engine, page) = open_document(target)?;
    pdf_retouch_core::editor::check_page(&engine, page)?;

    let image = engine.render(page, zoom).context("failed to render page")?;
    let output = output
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| default_render_output(&target.file, target.page));
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    image
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());
    Ok(())
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn file_stem(file: &Path, fallback: &'static str) -> String {
    file.file_stem()
        .and_then(|name| name.to_str())
        .unwrap_or(fallback)
        .to_string()
}

fn default_edited_output(file: &Path) -> PathBuf {
    let stem = file_stem(file, "document");
    file.with_file_name(format!("{stem}-edited.pdf"))
}

fn default_render_output(file: &Path, page: u32) -> PathBuf {
    let stem = file_stem(file, "page");
    file.with_file_name(format!("{stem}-page-{page}.png"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_outputs() {
        assert_eq!(
            default_edited_output(Path::new("/tmp/invoice.pdf")),
            PathBuf::from("/tmp/invoice-edited.pdf")
        );
        assert_eq!(
            default_render_output(Path::new("scans/invoice.pdf"), 2),
            PathBuf::from("scans/invoice-page-2.png")
        );
    }

    #[test]
    fn test_page_index_is_one_based() {
        assert_eq!(page_index(1).unwrap(), 0);
        assert_eq!(page_index(12).unwrap(), 11);
        assert!(page_index(0).is_err());
        assert!(page_index(70_000).is_err());
    }

    #[test]
    fn test_cli_parses_replace() {
        let cli = Cli::parse_from([
            "retouch",
            "replace",
            "invoice.pdf",
            "--page",
            "2",
            "--rect",
            "100,100,200,120",
            "--text",
            "Facture",
            "--size",
            "14",
        ]);
        match cli.command {
            Commands::Replace { region, text, size, color, output } => {
                assert_eq!(region.target.page, 2);
                assert_eq!(region.rect, "100,100,200,120");
                assert_eq!(text, "Facture");
                assert_eq!(size.as_deref(), Some("14"));
                assert!(color.is_none());
                assert!(output.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
