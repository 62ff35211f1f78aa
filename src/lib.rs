//! slidepress
//!
//! Captures every slide, and every state within a slide, of a single-page
//! HTML slideshow using a headless browser, then merges the captures into one
//! PDF document.
//!
//! # Features
//!
//! - **CDP Backend** (default): drives headless Chrome through the DevTools Protocol
//! - **Slide tables**: TOML files, a built-in table, or discovery from the live page
//! - **Capture modes**: viewport screenshots or natively printed PDF pages
//!
//! # Example
//!
//! ```no_run
//! use slidepress::capture::{capture_to_pdf, CaptureOptions};
//! use slidepress::deck::SlideTable;
//! use slidepress::{EngineConfig, Viewport};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig {
//!     viewport: Viewport { width: 1920, height: 1080 },
//!     ..Default::default()
//! };
//!
//! let mut engine = slidepress::new_engine(config)?;
//! let deck = SlideTable::builtin()?;
//! let report = capture_to_pdf(
//!     &mut engine,
//!     "file:///srv/talk/index.html",
//!     &deck,
//!     &CaptureOptions::default(),
//!     std::path::Path::new("talk.pdf"),
//! )?;
//! println!("{} pages", report.pages);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

#[cfg(feature = "cdp")]
pub mod cdp;

pub mod assemble;
pub mod capture;
pub mod deck;
pub mod export;
pub mod navigate;
pub mod source;

/// Configuration for the browser engine
///
/// The defaults match a 1080p presentation display: a 1920x1080 viewport at
/// device scale factor 1, headless, with the Chrome sandbox left enabled.
///
/// # Examples
///
/// ```
/// let cfg = slidepress::EngineConfig::default();
/// assert_eq!(cfg.viewport.width, 1920);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Viewport dimensions in CSS pixels
    pub viewport: Viewport,
    /// Device pixel ratio; 2.0 doubles the captured pixel density
    pub device_scale_factor: f64,
    /// Timeout for browser operations in milliseconds
    pub timeout_ms: u64,
    /// Run Chrome without a visible window
    pub headless: bool,
    /// Keep the Chrome sandbox enabled
    pub sandbox: bool,
    /// Explicit Chrome/Chromium binary, otherwise auto-detected
    pub chrome_path: Option<PathBuf>,
    /// Override the browser user agent
    pub user_agent: Option<String>,
    /// Whether to allow JavaScript evaluation
    pub enable_javascript: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            device_scale_factor: 1.0,
            timeout_ms: 30000,
            headless: true,
            sandbox: true,
            chrome_path: None,
            user_agent: None,
            enable_javascript: true,
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Result of JavaScript execution
///
/// `value` is the JSON encoding of the evaluation result (`null` when the
/// script returned nothing). `is_error` indicates whether the script threw.
#[derive(Debug, Clone)]
pub struct ScriptResult {
    /// JSON-encoded result value
    pub value: String,
    /// Whether the script threw an error
    pub is_error: bool,
}

/// Paper dimensions in inches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperSize {
    pub width_in: f64,
    pub height_in: f64,
}

impl PaperSize {
    pub const A3: PaperSize = PaperSize { width_in: 11.69, height_in: 16.54 };
    pub const A4: PaperSize = PaperSize { width_in: 8.27, height_in: 11.69 };
    pub const LETTER: PaperSize = PaperSize { width_in: 8.5, height_in: 11.0 };
    pub const LEGAL: PaperSize = PaperSize { width_in: 8.5, height_in: 14.0 };
}

impl FromStr for PaperSize {
    type Err = Error;

    /// Parse a named size (`a3`, `a4`, `letter`, `legal`) or explicit
    /// dimensions such as `11x8.5in` or `297x210mm`.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "a3" => return Ok(Self::A3),
            "a4" => return Ok(Self::A4),
            "letter" => return Ok(Self::LETTER),
            "legal" => return Ok(Self::LEGAL),
            _ => {}
        }

        let (dims, per_inch) = if let Some(d) = lower.strip_suffix("mm") {
            (d, 25.4)
        } else if let Some(d) = lower.strip_suffix("in") {
            (d, 1.0)
        } else {
            return Err(Error::ConfigError(format!("Unknown paper size: {}", s)));
        };

        let (w, h) = dims
            .split_once('x')
            .ok_or_else(|| Error::ConfigError(format!("Paper size must look like WxHin or WxHmm: {}", s)))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|n| *n > 0.0)
                .ok_or_else(|| Error::ConfigError(format!("Invalid paper dimension '{}' in {}", v, s)))
        };

        Ok(PaperSize {
            width_in: parse(w)? / per_inch,
            height_in: parse(h)? / per_inch,
        })
    }
}

/// Options for printing the current page to PDF
#[derive(Debug, Clone, PartialEq)]
pub struct PrintOptions {
    pub paper: PaperSize,
    pub landscape: bool,
    /// Uniform margin on all four sides
    pub margin_mm: f64,
    pub print_background: bool,
    /// Content scale factor (Chrome accepts 0.1..=2.0)
    pub scale: Option<f64>,
}

impl PrintOptions {
    /// One slide per sheet: 11x8.5in, 10mm margins, content scaled to 90%
    pub fn per_slide() -> Self {
        Self {
            paper: PaperSize { width_in: 11.0, height_in: 8.5 },
            landscape: false,
            margin_mm: 10.0,
            print_background: true,
            scale: Some(0.9),
        }
    }

    /// Whole deck laid out as one long document
    pub fn flattened() -> Self {
        Self {
            paper: PaperSize::A4,
            landscape: false,
            margin_mm: 15.0,
            print_background: true,
            scale: None,
        }
    }

    /// Plain web page
    pub fn page() -> Self {
        Self {
            margin_mm: 20.0,
            ..Self::flattened()
        }
    }

    pub fn margin_in(&self) -> f64 {
        self.margin_mm / 25.4
    }
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self::per_slide()
    }
}

/// Core trait for browser engine implementations
///
/// The capture loop only talks to the browser through this trait, so any
/// backend able to navigate, run scripts, press keys and produce PNG or PDF
/// bytes can drive it.
pub trait Engine {
    /// Create a new engine instance with the given configuration
    fn new(config: EngineConfig) -> Result<Self>
    where
        Self: Sized;

    /// Load a URL and wait for navigation to complete
    fn load_url(&mut self, url: &str) -> Result<()>;

    /// Evaluate JavaScript in the page's global context
    fn evaluate_script(&mut self, script: &str) -> Result<ScriptResult>;

    /// Evaluate JavaScript and parse its result as JSON
    fn evaluate_json(&mut self, script: &str) -> Result<serde_json::Value> {
        let result = self.evaluate_script(script)?;
        if result.is_error {
            return Err(Error::ScriptError(result.value));
        }
        Ok(serde_json::from_str(&result.value)?)
    }

    /// Dispatch a key press (e.g. `Space`, `ArrowRight`) to the focused page
    fn press_key(&mut self, key: &str) -> Result<()>;

    /// Capture the visible viewport as a PNG image
    fn render_png(&self) -> Result<Vec<u8>>;

    /// Print the current page to PDF
    fn render_pdf(&self, options: &PrintOptions) -> Result<Vec<u8>>;

    /// Let the page settle (animations, lazy images) for `ms` milliseconds
    fn wait(&mut self, ms: u64) {
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(ms));
        }
    }

    /// Close the engine and clean up resources
    fn close(self) -> Result<()>;
}

/// Create a new engine instance with the default backend
#[cfg(feature = "cdp")]
pub fn new_engine(config: EngineConfig) -> Result<impl Engine> {
    cdp::CdpEngine::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.viewport.width, 1920);
        assert_eq!(config.viewport.height, 1080);
        assert_eq!(config.device_scale_factor, 1.0);
        assert!(config.headless);
        assert!(config.enable_javascript);
    }

    #[test]
    fn test_named_paper_sizes() {
        assert_eq!("A4".parse::<PaperSize>().unwrap(), PaperSize::A4);
        assert_eq!("letter".parse::<PaperSize>().unwrap(), PaperSize::LETTER);
    }

    #[test]
    fn test_explicit_paper_sizes() {
        let p: PaperSize = "11x8.5in".parse().unwrap();
        assert_eq!(p.width_in, 11.0);
        assert_eq!(p.height_in, 8.5);

        let p: PaperSize = "254x127mm".parse().unwrap();
        assert!((p.width_in - 10.0).abs() < 1e-9);
        assert!((p.height_in - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_bad_paper_sizes() {
        assert!("tabloid".parse::<PaperSize>().is_err());
        assert!("11in".parse::<PaperSize>().is_err());
        assert!("0x5in".parse::<PaperSize>().is_err());
    }

    #[test]
    fn test_print_presets() {
        let p = PrintOptions::per_slide();
        assert_eq!(p.scale, Some(0.9));
        assert!((p.margin_in() - 10.0 / 25.4).abs() < 1e-9);
        assert_eq!(PrintOptions::page().margin_mm, 20.0);
        assert_eq!(PrintOptions::page().paper, PaperSize::A4);
    }
}
