use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use slidepress::capture::{self, CaptureMode, CaptureOptions};
use slidepress::deck::{self, SlideTable};
use slidepress::export::{self, FlattenOptions};
use slidepress::navigate::{Navigation, DEFAULT_HIDE_SELECTORS};
use slidepress::source::{ensure_pdf_extension, Source};
use slidepress::{assemble, Engine, EngineConfig, PaperSize, PrintOptions, Viewport};

#[derive(Parser, Debug)]
#[command(
    name = "slidepress",
    version,
    about = "Capture every slide and state of an HTML slideshow into one PDF"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture one page per slide state and merge them into a PDF
    Capture(CaptureArgs),
    /// Lay every slide out in one long document and print it
    Flatten(FlattenArgs),
    /// Print a web page or local HTML file as-is
    Page(PageArgs),
    /// Merge PDFs and images, in the order given, into one PDF
    Merge(MergeArgs),
    /// Print a slide table as TOML
    Deck(DeckArgs),
}

#[derive(Args, Debug, Clone)]
struct BrowserArgs {
    /// Viewport width in CSS pixels
    #[arg(long, default_value_t = 1920)]
    width: u32,
    /// Viewport height in CSS pixels
    #[arg(long, default_value_t = 1080)]
    height: u32,
    /// Device scale factor (2 doubles screenshot resolution)
    #[arg(long, default_value_t = 1.0)]
    scale: f64,
    #[arg(long, default_value_t = 30000)]
    timeout_ms: u64,
    /// Chrome or Chromium binary to launch
    #[arg(long, value_name = "PATH")]
    chrome: Option<PathBuf>,
    /// Disable the Chrome sandbox (needed when running as root in containers)
    #[arg(long)]
    no_sandbox: bool,
    /// Show the browser window
    #[arg(long)]
    headful: bool,
    #[arg(long)]
    user_agent: Option<String>,
}

impl BrowserArgs {
    fn config(&self) -> EngineConfig {
        EngineConfig {
            viewport: Viewport {
                width: self.width,
                height: self.height,
            },
            device_scale_factor: self.scale,
            timeout_ms: self.timeout_ms,
            headless: !self.headful,
            sandbox: !self.no_sandbox,
            chrome_path: self.chrome.clone(),
            user_agent: self.user_agent.clone(),
            ..Default::default()
        }
    }
}

#[derive(Args, Debug, Clone)]
struct DeckSourceArgs {
    /// Slide table file (TOML); defaults to the built-in table
    #[arg(long, value_name = "TOML")]
    deck: Option<PathBuf>,
    /// Read the slide table from the loaded page instead
    #[arg(long, conflicts_with = "deck")]
    discover: bool,
}

impl DeckSourceArgs {
    fn table(&self) -> Result<SlideTable> {
        match &self.deck {
            Some(path) => SlideTable::load(path)
                .with_context(|| format!("Failed to load slide table {}", path.display())),
            None => Ok(SlideTable::builtin()?),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
struct PrintArgs {
    /// Paper size: a3, a4, letter, legal, or WxHin / WxHmm
    #[arg(long, value_parser = parse_paper)]
    paper: Option<PaperSize>,
    /// Margin on every side, in millimetres
    #[arg(long)]
    margin_mm: Option<f64>,
    #[arg(long)]
    landscape: bool,
    /// Content scale for printing (0.1 to 2.0)
    #[arg(long)]
    print_scale: Option<f64>,
}

impl PrintArgs {
    fn apply(&self, mut base: PrintOptions) -> PrintOptions {
        if let Some(paper) = self.paper {
            base.paper = paper;
        }
        if let Some(margin) = self.margin_mm {
            base.margin_mm = margin;
        }
        if self.landscape {
            base.landscape = true;
        }
        if self.print_scale.is_some() {
            base.scale = self.print_scale;
        }
        base
    }
}

#[derive(Args, Debug)]
struct CaptureArgs {
    /// Slideshow URL or local HTML file
    input: String,
    /// Output PDF (default: <name>_slides.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    browser: BrowserArgs,
    #[command(flatten)]
    deck: DeckSourceArgs,
    /// screenshot or print
    #[arg(long, default_value = "screenshot", value_parser = parse_mode)]
    mode: CaptureMode,
    /// script (default), keyboard or dom
    #[arg(long, value_parser = parse_navigation)]
    nav: Option<Navigation>,
    /// Key pressed to advance states; implies --nav keyboard
    #[arg(long)]
    key: Option<String>,
    /// Scale the slideshow container before capturing
    #[arg(long, value_parser = parse_positive)]
    zoom: Option<f64>,
    /// Element scaled by --zoom
    #[arg(long, value_name = "SELECTOR")]
    container: Option<String>,
    /// Pixels per inch screenshots are placed at (default: 100 x --scale)
    #[arg(long, value_parser = parse_positive)]
    dpi: Option<f64>,
    /// Also keep every capture in this directory
    #[arg(long, value_name = "DIR")]
    frames_dir: Option<PathBuf>,
    #[arg(long)]
    load_wait_ms: Option<u64>,
    #[arg(long)]
    slide_wait_ms: Option<u64>,
    #[arg(long)]
    state_wait_ms: Option<u64>,
    /// Extra selector to hide (repeatable)
    #[arg(long, value_name = "SELECTOR")]
    hide: Vec<String>,
    /// Keep the slideshow's own navigation visible
    #[arg(long)]
    no_hide: bool,
    #[command(flatten)]
    print: PrintArgs,
}

impl CaptureArgs {
    fn options(&self) -> Result<CaptureOptions> {
        let mut options = CaptureOptions {
            mode: self.mode,
            navigation: navigation(self.nav.clone(), self.key.as_deref())?,
            dpi: self.dpi.unwrap_or(100.0 * self.browser.scale),
            frames_dir: self.frames_dir.clone(),
            print: self.print.apply(PrintOptions::per_slide()),
            ..Default::default()
        };
        if let Some(ms) = self.load_wait_ms {
            options.load_wait_ms = ms;
        }
        if let Some(ms) = self.slide_wait_ms {
            options.slide_wait_ms = ms;
        }
        if let Some(ms) = self.state_wait_ms {
            options.state_wait_ms = ms;
        }
        options.prepare.zoom = self.zoom;
        if let Some(container) = &self.container {
            options.prepare.container_selector = container.clone();
        }
        options.prepare.hide_selectors = hide_list(self.no_hide, &self.hide);
        options.validate()?;
        Ok(options)
    }
}

#[derive(Args, Debug)]
struct FlattenArgs {
    /// Slideshow URL or local HTML file
    input: String,
    /// Output PDF (default: <name>_export.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    browser: BrowserArgs,
    #[command(flatten)]
    deck: DeckSourceArgs,
    #[arg(long, default_value_t = 3000)]
    load_wait_ms: u64,
    /// Pause after laying out the slides, before printing
    #[arg(long, default_value_t = 5000)]
    settle_wait_ms: u64,
    #[arg(long, value_name = "SELECTOR")]
    hide: Vec<String>,
    #[arg(long)]
    no_hide: bool,
    #[command(flatten)]
    print: PrintArgs,
}

#[derive(Args, Debug)]
struct PageArgs {
    /// URL or local HTML file
    input: String,
    /// Output PDF (default: <host or file name>.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    browser: BrowserArgs,
    #[arg(long, default_value_t = 2000)]
    wait_ms: u64,
    #[command(flatten)]
    print: PrintArgs,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// PDF, PNG or JPEG files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    #[arg(short, long)]
    output: PathBuf,
    /// Pixels per inch images are placed at
    #[arg(long, default_value_t = 100.0)]
    dpi: f64,
}

#[derive(Args, Debug)]
struct DeckArgs {
    /// Slide table file to check and print
    #[arg(long, value_name = "TOML", conflicts_with = "discover")]
    deck: Option<PathBuf>,
    /// Discover the table from this slideshow URL or file
    #[arg(long, value_name = "INPUT")]
    discover: Option<String>,
    #[command(flatten)]
    browser: BrowserArgs,
    #[arg(long, default_value_t = 3000)]
    load_wait_ms: u64,
}

/// What a finished command wrote
struct Summary {
    output: PathBuf,
    pages: usize,
    bytes: u64,
}

fn parse_paper(s: &str) -> std::result::Result<PaperSize, String> {
    s.parse().map_err(|e: slidepress::Error| e.to_string())
}

fn parse_mode(s: &str) -> std::result::Result<CaptureMode, String> {
    s.parse().map_err(|e: slidepress::Error| e.to_string())
}

fn parse_navigation(s: &str) -> std::result::Result<Navigation, String> {
    s.parse().map_err(|e: slidepress::Error| e.to_string())
}

fn parse_positive(s: &str) -> std::result::Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v > 0.0 && v.is_finite() => Ok(v),
        Ok(_) => Err(format!("must be a positive number, got {}", s)),
        Err(e) => Err(e.to_string()),
    }
}

/// `--key` alone means keyboard navigation; with another method it is a mistake
fn navigation(nav: Option<Navigation>, key: Option<&str>) -> Result<Navigation> {
    match (nav, key) {
        (nav, None) => Ok(nav.unwrap_or_default()),
        (None, Some(key)) | (Some(Navigation::Keyboard { .. }), Some(key)) => {
            Ok(Navigation::Keyboard { key: key.to_string() })
        }
        (Some(other), Some(_)) => anyhow::bail!("--key only applies to keyboard navigation, not {:?}", other),
    }
}

fn hide_list(no_hide: bool, extra: &[String]) -> Vec<String> {
    let mut selectors: Vec<String> = if no_hide {
        Vec::new()
    } else {
        DEFAULT_HIDE_SELECTORS.iter().map(|s| s.to_string()).collect()
    };
    selectors.extend(extra.iter().cloned());
    selectors
}

fn output_path(explicit: Option<PathBuf>, source: &Source, suffix: &str) -> PathBuf {
    explicit
        .map(ensure_pdf_extension)
        .unwrap_or_else(|| source.default_output(suffix))
}

fn start_engine(browser: &BrowserArgs) -> Result<impl Engine> {
    slidepress::new_engine(browser.config()).context("Failed to start Chrome")
}

fn write_pdf_bytes(output: &Path, pdf: &[u8]) -> Result<Summary> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, pdf).with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(Summary {
        output: output.to_path_buf(),
        pages: assemble::count_pages(output)?,
        bytes: pdf.len() as u64,
    })
}

fn run_capture(args: CaptureArgs) -> Result<Summary> {
    let source = Source::parse(&args.input)?;
    let url = source.url()?;
    let output = output_path(args.output.clone(), &source, "_slides");
    let options = args.options()?;

    let mut engine = start_engine(&args.browser)?;
    let report = if args.deck.discover {
        info!("Loading {}", url);
        engine.load_url(&url)?;
        engine.wait(options.load_wait_ms);
        let deck = deck::discover(&mut engine).context("Slide discovery failed")?;
        info!("Found {} slides ({} pages)", deck.len(), deck.expected_pages());
        let pages = capture::capture_loaded(&mut engine, &deck, &options)?;
        capture::write_pdf(&pages, deck.expected_pages(), options.dpi, &output)?
    } else {
        let deck = args.deck.table()?;
        capture::capture_to_pdf(&mut engine, &url, &deck, &options, &output)?
    };
    engine.close()?;

    Ok(Summary {
        output: report.output,
        pages: report.pages,
        bytes: report.bytes,
    })
}

fn run_flatten(args: FlattenArgs) -> Result<Summary> {
    let source = Source::parse(&args.input)?;
    let url = source.url()?;
    let output = output_path(args.output.clone(), &source, "_export");
    let options = FlattenOptions {
        load_wait_ms: args.load_wait_ms,
        settle_wait_ms: args.settle_wait_ms,
        hide_selectors: hide_list(args.no_hide, &args.hide),
        print: args.print.apply(PrintOptions::flattened()),
    };

    let mut engine = start_engine(&args.browser)?;
    let pdf = if args.deck.discover {
        info!("Loading {}", url);
        engine.load_url(&url)?;
        engine.wait(options.load_wait_ms);
        let deck = deck::discover(&mut engine).context("Slide discovery failed")?;
        export::export_flattened_loaded(&mut engine, &deck, &options)?
    } else {
        let deck = args.deck.table()?;
        export::export_flattened(&mut engine, &url, &deck, &options)?
    };
    engine.close()?;

    write_pdf_bytes(&output, &pdf)
}

fn run_page(args: PageArgs) -> Result<Summary> {
    let source = Source::parse(&args.input)?;
    let url = source.url()?;
    let output = output_path(args.output.clone(), &source, "");

    let mut engine = start_engine(&args.browser)?;
    let pdf = export::export_page(&mut engine, &url, args.wait_ms, &args.print.apply(PrintOptions::page()))?;
    engine.close()?;

    write_pdf_bytes(&output, &pdf)
}

fn run_merge(args: MergeArgs) -> Result<Summary> {
    let output = ensure_pdf_extension(args.output);
    let mut doc = assemble::merge_files(&args.inputs, args.dpi)?;
    let bytes = assemble::save(&mut doc, &output)?;
    Ok(Summary {
        pages: doc.get_pages().len(),
        output,
        bytes,
    })
}

fn run_deck(args: DeckArgs) -> Result<()> {
    let deck = match (&args.discover, &args.deck) {
        (Some(input), _) => {
            let url = Source::parse(input)?.url()?;
            let mut engine = start_engine(&args.browser)?;
            engine.load_url(&url)?;
            engine.wait(args.load_wait_ms);
            let deck = deck::discover(&mut engine).context("Slide discovery failed")?;
            engine.close()?;
            deck
        }
        (None, Some(path)) => SlideTable::load(path)
            .with_context(|| format!("Failed to load slide table {}", path.display()))?,
        (None, None) => SlideTable::builtin()?,
    };

    info!("{} slides, {} pages", deck.len(), deck.expected_pages());
    print!("{}", deck.to_toml()?);
    Ok(())
}

fn run(cli: Cli) -> Result<Option<Summary>> {
    match cli.command {
        Command::Capture(args) => run_capture(args).map(Some),
        Command::Flatten(args) => run_flatten(args).map(Some),
        Command::Page(args) => run_page(args).map(Some),
        Command::Merge(args) => run_merge(args).map(Some),
        Command::Deck(args) => run_deck(args).map(|_| None),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(Some(summary)) => {
            println!(
                "Created {} ({} pages, {} bytes)",
                summary.output.display(),
                summary.pages,
                summary.bytes
            );
        }
        Ok(None) => {}
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
