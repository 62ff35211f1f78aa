//! Slide table: which slides to capture and how many states each one has.

use crate::{Engine, Error, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

const BUILTIN_DECK: &str = include_str!("../decks/default.toml");

/// One slide of the deck
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    /// DOM id of the `.slide` element, when it has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Human readable title, used in logs, frame names and flattened exports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Number of states the slide cycles through (at least 1)
    #[serde(default = "one")]
    pub states: u32,
    /// Page function rendering a given state, e.g. `handlePartsSlideState`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_handler: Option<String>,
}

fn one() -> u32 {
    1
}

impl Slide {
    pub fn new(id: impl Into<String>, states: u32) -> Self {
        Self {
            id: Some(id.into()),
            title: None,
            states,
            state_handler: None,
        }
    }
}

/// Ordered slide table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideTable {
    pub slides: Vec<Slide>,
}

impl SlideTable {
    /// Build a table, rejecting empty tables and slides with zero states
    pub fn new(slides: Vec<Slide>) -> Result<Self> {
        let table = Self { slides };
        table.validate()?;
        Ok(table)
    }

    /// Parse a table from TOML (`[[slides]]` entries)
    pub fn from_toml(text: &str) -> Result<Self> {
        let table: SlideTable = toml::from_str(text)?;
        table.validate()?;
        Ok(table)
    }

    /// Load a table from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::InputNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Render the table back to the TOML accepted by [`SlideTable::from_toml`]
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::ConfigError(format!("Cannot serialize slide table: {}", e)))
    }

    /// The table shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_DECK)
    }

    fn validate(&self) -> Result<()> {
        if self.slides.is_empty() {
            return Err(Error::ConfigError("Slide table has no slides".into()));
        }
        for (index, slide) in self.slides.iter().enumerate() {
            if slide.states == 0 {
                return Err(Error::ConfigError(format!(
                    "Slide {} ({}) must have at least one state",
                    index + 1,
                    self.display_name(index)
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Total number of pages a full capture produces
    pub fn expected_pages(&self) -> usize {
        self.slides.iter().map(|s| s.states as usize).sum()
    }

    /// Title, else id, else a 1-based "Slide N"
    pub fn display_name(&self, index: usize) -> String {
        self.slides
            .get(index)
            .and_then(|s| s.title.clone().or_else(|| s.id.clone()))
            .unwrap_or_else(|| format!("Slide {}", index + 1))
    }

    /// Frame name for the `counter`-th capture, at `state` (0-based) of slide `index`.
    ///
    /// Single-state slides get `slide_007_1.6`, multi-state slides
    /// `slide_004_1.3_state1`. An index past the end is named by its
    /// 1-based position.
    pub fn file_stem(&self, counter: usize, index: usize, state: u32) -> String {
        let slide = self.slides.get(index);
        let raw = slide
            .and_then(|s| {
                s.id.as_deref()
                    .map(|id| id.strip_prefix("slide-").unwrap_or(id).to_string())
                    .or_else(|| s.title.clone())
            })
            .unwrap_or_else(|| (index + 1).to_string());
        let name = sanitize(&raw);

        if slide.map_or(false, |s| s.states > 1) {
            format!("slide_{:03}_{}_state{}", counter, name, state + 1)
        } else {
            format!("slide_{:03}_{}", counter, name)
        }
    }
}

fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Reads slide count, ids, titles and state counts from the loaded page.
///
/// Top-level `let`/`const` bindings are not window properties, so globals are
/// probed with `typeof` rather than through `window`.
const DISCOVER_SCRIPT: &str = r#"(() => {
    if (typeof initializeSlideStates === "function") {
        try { initializeSlideStates(); } catch (e) {}
    }
    const els = Array.from(document.querySelectorAll(".slide"));
    let count = els.length;
    if (typeof CONFIG !== "undefined" && CONFIG && CONFIG.SLIDE_COUNT) {
        count = CONFIG.SLIDE_COUNT;
    }
    const titles = typeof slideTitles !== "undefined" ? slideTitles : (window.slideTitles || []);
    const maxStates = typeof maxSlideStates !== "undefined" ? maxSlideStates : (window.maxSlideStates || []);
    const out = [];
    for (let i = 0; i < count; i++) {
        const el = els[i];
        out.push({
            id: el && el.id ? el.id : null,
            title: titles[i] ? String(titles[i]) : null,
            states: Number(maxStates[i]) || 1,
            dom_slides: els.length
        });
    }
    return out;
})()"#;

#[derive(Deserialize)]
struct DiscoveredSlide {
    id: Option<String>,
    title: Option<String>,
    states: f64,
    dom_slides: usize,
}

/// Build a slide table from the page currently loaded in `engine`
pub fn discover<E: Engine>(engine: &mut E) -> Result<SlideTable> {
    let value = engine.evaluate_json(DISCOVER_SCRIPT)?;
    let found: Vec<DiscoveredSlide> = serde_json::from_value(value)?;

    if let Some(first) = found.first() {
        if first.dom_slides != found.len() {
            warn!(
                "Page declares {} slides but contains {} .slide elements",
                found.len(),
                first.dom_slides
            );
        }
    }

    let slides = found
        .into_iter()
        .map(|d| Slide {
            id: d.id,
            title: d.title,
            states: if d.states >= 1.0 { d.states as u32 } else { 1 },
            state_handler: None,
        })
        .collect::<Vec<_>>();
    debug!("Discovered {} slides", slides.len());

    SlideTable::new(slides)
}
