//! In-memory engine that records what the capture code asks of the browser

#![allow(dead_code)]

use std::cell::RefCell;
use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use slidepress::{Engine, EngineConfig, PrintOptions, Result, ScriptResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load(String),
    Eval(String),
    Key(String),
    Png,
    Pdf(PrintOptions),
    Wait(u64),
    Close,
}

pub struct FakeEngine {
    pub config: EngineConfig,
    pub calls: RefCell<Vec<Call>>,
    /// Value returned by every script unless a `replies` entry matches
    pub default_reply: String,
    /// `(needle, reply)`: scripts containing `needle` get `reply`
    pub replies: Vec<(String, String)>,
    pub script_error: bool,
    pub empty_pdf: bool,
}

impl FakeEngine {
    pub fn reply(mut self, needle: &str, value: &str) -> Self {
        self.replies.push((needle.to_string(), value.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(*c)).count()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Eval(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    fn frame(&self) -> Vec<u8> {
        // Shade by capture count so frames are distinguishable
        let n = self.count(|c| matches!(c, Call::Png | Call::Pdf(_))) as u8;
        let img = RgbImage::from_pixel(
            self.config.viewport.width,
            self.config.viewport.height,
            Rgb([n.wrapping_mul(40), 128, 200]),
        );
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }
}

impl Engine for FakeEngine {
    fn new(config: EngineConfig) -> Result<Self> {
        Ok(Self {
            config,
            calls: RefCell::new(Vec::new()),
            default_reply: "true".to_string(),
            replies: Vec::new(),
            script_error: false,
            empty_pdf: false,
        })
    }

    fn load_url(&mut self, url: &str) -> Result<()> {
        self.calls.borrow_mut().push(Call::Load(url.to_string()));
        Ok(())
    }

    fn evaluate_script(&mut self, script: &str) -> Result<ScriptResult> {
        self.calls.borrow_mut().push(Call::Eval(script.to_string()));
        if self.script_error {
            return Ok(ScriptResult {
                value: "ReferenceError: goToSlide is not defined".to_string(),
                is_error: true,
            });
        }
        let value = self
            .replies
            .iter()
            .find(|(needle, _)| script.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default_reply.clone());
        Ok(ScriptResult { value, is_error: false })
    }

    fn press_key(&mut self, key: &str) -> Result<()> {
        self.calls.borrow_mut().push(Call::Key(key.to_string()));
        Ok(())
    }

    fn render_png(&self) -> Result<Vec<u8>> {
        let png = self.frame();
        self.calls.borrow_mut().push(Call::Png);
        Ok(png)
    }

    fn render_pdf(&self, options: &PrintOptions) -> Result<Vec<u8>> {
        if self.empty_pdf {
            self.calls.borrow_mut().push(Call::Pdf(options.clone()));
            return Ok(Vec::new());
        }
        let mut doc = slidepress::assemble::image_page(&self.frame(), 100.0)?;
        self.calls.borrow_mut().push(Call::Pdf(options.clone()));
        let mut out = Vec::new();
        doc.save_to(&mut out)?;
        Ok(out)
    }

    fn wait(&mut self, ms: u64) {
        self.calls.borrow_mut().push(Call::Wait(ms));
    }

    fn close(self) -> Result<()> {
        self.calls.borrow_mut().push(Call::Close);
        Ok(())
    }
}

/// Engine with a small viewport so generated frames stay cheap
pub fn fake(width: u32, height: u32) -> FakeEngine {
    FakeEngine::new(EngineConfig {
        viewport: slidepress::Viewport { width, height },
        ..Default::default()
    })
    .unwrap()
}
