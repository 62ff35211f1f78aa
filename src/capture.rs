//! The capture loop: visit every slide and state, grab one page per state.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info, warn};

use crate::assemble;
use crate::deck::SlideTable;
use crate::navigate::{prepare_script, Navigation, PrepareOptions, StateAction};
use crate::{Engine, Error, PrintOptions, Result};

/// What each captured page is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// Viewport PNG screenshots, embedded as full-page images
    #[default]
    Screenshot,
    /// The browser's own print-to-PDF output, one document per state
    Print,
}

impl FromStr for CaptureMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "screenshot" | "screenshots" | "png" => Ok(CaptureMode::Screenshot),
            "print" | "pdf" => Ok(CaptureMode::Print),
            other => Err(Error::ConfigError(format!(
                "Unknown capture mode '{}' (expected screenshot or print)",
                other
            ))),
        }
    }
}

/// Options for a capture run
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub mode: CaptureMode,
    pub navigation: Navigation,
    /// Pause after the initial page load, for the slideshow's own setup
    pub load_wait_ms: u64,
    /// Pause after switching slides
    pub slide_wait_ms: u64,
    /// Pause after advancing a state
    pub state_wait_ms: u64,
    pub prepare: PrepareOptions,
    /// Used in `Print` mode
    pub print: PrintOptions,
    /// Resolution screenshots are placed at, in pixels per inch
    pub dpi: f64,
    /// Also write every capture to this directory
    pub frames_dir: Option<PathBuf>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            mode: CaptureMode::Screenshot,
            navigation: Navigation::Script,
            load_wait_ms: 3000,
            slide_wait_ms: 1000,
            state_wait_ms: 500,
            prepare: PrepareOptions::default(),
            print: PrintOptions::per_slide(),
            dpi: 100.0,
            frames_dir: None,
        }
    }
}

impl CaptureOptions {
    /// Reject settings that would produce blank or degenerate pages
    pub fn validate(&self) -> Result<()> {
        if let Some(zoom) = self.prepare.zoom {
            if !(zoom > 0.0 && zoom.is_finite()) {
                return Err(Error::ConfigError(format!("zoom must be positive, got {}", zoom)));
            }
        }
        if !(self.dpi > 0.0 && self.dpi.is_finite()) {
            return Err(Error::ConfigError(format!("dpi must be positive, got {}", self.dpi)));
        }
        Ok(())
    }
}

/// Raw bytes of one captured page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageData {
    Png(Vec<u8>),
    Pdf(Vec<u8>),
}

impl PageData {
    pub fn extension(&self) -> &'static str {
        match self {
            PageData::Png(_) => "png",
            PageData::Pdf(_) => "pdf",
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            PageData::Png(b) | PageData::Pdf(b) => b,
        }
    }
}

/// One (slide, state) capture
#[derive(Debug, Clone)]
pub struct CapturedPage {
    pub slide_index: usize,
    /// 0-based state within the slide
    pub state: u32,
    pub file_stem: String,
    pub data: PageData,
}

/// Summary of a finished capture
#[derive(Debug, Clone)]
pub struct CaptureReport {
    pub output: PathBuf,
    pub pages: usize,
    pub expected_pages: usize,
    pub bytes: u64,
}

fn eval_flag<E: Engine>(engine: &mut E, script: &str) -> Result<bool> {
    let result = engine.evaluate_script(script)?;
    if result.is_error {
        return Err(Error::ScriptError(result.value));
    }
    Ok(result.value.trim() == "true")
}

fn capture_one<E: Engine>(engine: &mut E, options: &CaptureOptions) -> Result<PageData> {
    match options.mode {
        CaptureMode::Screenshot => Ok(PageData::Png(engine.render_png()?)),
        CaptureMode::Print => Ok(PageData::Pdf(engine.render_pdf(&options.print)?)),
    }
}

/// Load `url` and capture every state of every slide in `deck`, in order.
///
/// The page must already be reachable; the engine is left on the last slide.
pub fn capture_deck<E: Engine>(
    engine: &mut E,
    url: &str,
    deck: &SlideTable,
    options: &CaptureOptions,
) -> Result<Vec<CapturedPage>> {
    options.validate()?;
    info!("Loading {}", url);
    engine.load_url(url)?;
    engine.wait(options.load_wait_ms);

    capture_loaded(engine, deck, options)
}

/// Same as [`capture_deck`] for a page that is already loaded
pub fn capture_loaded<E: Engine>(
    engine: &mut E,
    deck: &SlideTable,
    options: &CaptureOptions,
) -> Result<Vec<CapturedPage>> {
    options.validate()?;
    if !eval_flag(engine, &prepare_script(deck, &options.prepare))? {
        warn!("Page preparation script reported failure");
    }

    if let Some(dir) = &options.frames_dir {
        std::fs::create_dir_all(dir)?;
    }

    let total = deck.len();
    let mut pages = Vec::with_capacity(deck.expected_pages());

    for (index, slide) in deck.slides.iter().enumerate() {
        info!(
            "Slide {}/{}: {} ({} state(s))",
            index + 1,
            total,
            deck.display_name(index),
            slide.states
        );

        if !eval_flag(engine, &options.navigation.go_to_slide(index, slide))? {
            warn!("Could not find slide {} on the page; capturing anyway", deck.display_name(index));
        }
        engine.wait(options.slide_wait_ms);

        for state in 0..slide.states {
            if state > 0 {
                debug!("  state {}/{}", state + 1, slide.states);
                match options.navigation.advance_state(index, slide, state) {
                    StateAction::Eval(script) => {
                        if !eval_flag(engine, &script)? {
                            warn!(
                                "No state handler moved {} to state {}",
                                deck.display_name(index),
                                state + 1
                            );
                        }
                    }
                    StateAction::Key(key) => engine.press_key(&key)?,
                }
                engine.wait(options.state_wait_ms);
            }

            let data = capture_one(engine, options)?;
            let page = CapturedPage {
                slide_index: index,
                state,
                file_stem: deck.file_stem(pages.len(), index, state),
                data,
            };

            if let Some(dir) = &options.frames_dir {
                write_frame(dir, &page)?;
            }
            pages.push(page);
        }
    }

    if pages.is_empty() {
        return Err(Error::NoPagesCaptured);
    }
    Ok(pages)
}

fn write_frame(dir: &Path, page: &CapturedPage) -> Result<()> {
    let path = dir.join(format!("{}.{}", page.file_stem, page.data.extension()));
    std::fs::write(&path, page.data.bytes())?;
    debug!("  saved {}", path.display());
    Ok(())
}

/// Capture the whole deck and write the merged PDF to `output`
pub fn capture_to_pdf<E: Engine>(
    engine: &mut E,
    url: &str,
    deck: &SlideTable,
    options: &CaptureOptions,
    output: &Path,
) -> Result<CaptureReport> {
    let pages = capture_deck(engine, url, deck, options)?;
    write_pdf(&pages, deck.expected_pages(), options.dpi, output)
}

/// Merge captured pages into the PDF at `output`
pub fn write_pdf(
    pages: &[CapturedPage],
    expected_pages: usize,
    dpi: f64,
    output: &Path,
) -> Result<CaptureReport> {
    info!("Combining {} captures into {}", pages.len(), output.display());
    let mut doc = assemble::assemble_pages(pages, dpi)?;
    let bytes = assemble::save(&mut doc, output)?;

    let written = doc.get_pages().len();
    if written != expected_pages {
        warn!("Wrote {} pages, expected {}", written, expected_pages);
    }

    Ok(CaptureReport {
        output: output.to_path_buf(),
        pages: written,
        expected_pages,
        bytes,
    })
}
