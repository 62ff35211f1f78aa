//! Page scripts for moving between slides and slide states.
//!
//! The slideshow is treated as an opaque UI. Every global it may or may not
//! define is probed with `typeof` so a page missing one degrades to the DOM
//! fallback instead of throwing. Scripts evaluate to `true` when they found
//! something to act on.

use crate::deck::{Slide, SlideTable};
use crate::{Error, Result};
use serde::Serialize;
use std::str::FromStr;

/// Selectors for presenter UI that should not appear in captures
pub const DEFAULT_HIDE_SELECTORS: &[&str] = &[
    ".navigation",
    ".nav-btn",
    ".progress-container",
    ".slide-note",
    ".revolver-wheel",
];

/// Element scaled by `--zoom`
pub const DEFAULT_CONTAINER_SELECTOR: &str = ".slideshow-container";

/// How the capture loop moves between slides and states
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Navigation {
    /// Call the page's `goToSlide` / `triggerSlideStateChange` globals
    #[default]
    Script,
    /// Activate slides through the DOM, advance states with a key press
    Keyboard { key: String },
    /// Toggle `.active` and `.state` elements directly
    Dom,
}

impl FromStr for Navigation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "script" | "js" => Ok(Navigation::Script),
            "keyboard" | "key" | "keys" => Ok(Navigation::Keyboard { key: "Space".into() }),
            "dom" => Ok(Navigation::Dom),
            other => Err(Error::ConfigError(format!(
                "Unknown navigation method '{}' (expected script, keyboard or dom)",
                other
            ))),
        }
    }
}

/// What to do to move a slide to its next state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateAction {
    /// Evaluate this script; it returns `true` when a state change happened
    Eval(String),
    /// Press this key
    Key(String),
}

impl Navigation {
    /// Script that makes slide `index` the visible one, with its state reset
    pub fn go_to_slide(&self, index: usize, slide: &Slide) -> String {
        match self {
            Navigation::Script => format!(
                r#"(() => {{
    const index = {index};
    if (typeof slideStates !== "undefined" && slideStates) {{ slideStates[index] = 0; }}
    if (typeof goToSlide === "function") {{ goToSlide(index); return true; }}
    return {fallback};
}})()"#,
                index = index,
                fallback = dom_activate(index, slide),
            ),
            Navigation::Keyboard { .. } | Navigation::Dom => dom_activate(index, slide),
        }
    }

    /// Action that moves slide `index` to `state` (only called for `state > 0`)
    pub fn advance_state(&self, index: usize, slide: &Slide, state: u32) -> StateAction {
        match self {
            Navigation::Script => StateAction::Eval(format!(
                r#"(() => {{
    const index = {index};
    const state = {state};
    if (typeof slideStates !== "undefined" && slideStates) {{ slideStates[index] = state; }}
    if (typeof triggerSlideStateChange === "function") {{ triggerSlideStateChange(index, state); return true; }}
    const handler = {handler};
    if (handler && typeof window[handler] === "function") {{ window[handler](state); return true; }}
    return false;
}})()"#,
                index = index,
                state = state,
                handler = js_literal(&slide.state_handler),
            )),
            Navigation::Keyboard { key } => StateAction::Key(key.clone()),
            Navigation::Dom => StateAction::Eval(format!(
                r#"(() => {{
    const target = {target};
    if (!target) return false;
    const states = target.querySelectorAll(".state, [data-state]");
    if (states.length <= {state}) return false;
    states.forEach((s, i) => {{
        s.style.display = i === {state} ? "" : "none";
        s.style.opacity = i === {state} ? "1" : "0";
    }});
    return true;
}})()"#,
                target = find_target(index, slide),
                state = state,
            )),
        }
    }
}

/// Options for the one-off script run after the page loads
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareOptions {
    pub hide_selectors: Vec<String>,
    pub zoom: Option<f64>,
    pub container_selector: String,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            hide_selectors: DEFAULT_HIDE_SELECTORS.iter().map(|s| s.to_string()).collect(),
            zoom: None,
            container_selector: DEFAULT_CONTAINER_SELECTOR.to_string(),
        }
    }
}

/// Stylesheet hiding presenter UI and applying zoom, if there is anything to do
pub fn capture_css(options: &PrepareOptions) -> Option<String> {
    let mut css = String::new();
    if !options.hide_selectors.is_empty() {
        css.push_str(&options.hide_selectors.join(", "));
        css.push_str(" { display: none !important; }\n");
    }
    if let Some(zoom) = options.zoom.filter(|z| (*z - 1.0).abs() > f64::EPSILON) {
        css.push_str(&format!(
            "{} {{ transform: scale({}); transform-origin: top left; }}\nbody {{ overflow: hidden; }}\n",
            options.container_selector, zoom
        ));
    }
    if css.is_empty() {
        None
    } else {
        Some(css)
    }
}

/// Script run once after load: initialise slide states, publish the table's
/// state counts to the page, and inject the capture stylesheet.
pub fn prepare_script(deck: &SlideTable, options: &PrepareOptions) -> String {
    let counts: Vec<u32> = deck.slides.iter().map(|s| s.states).collect();
    format!(
        r#"(() => {{
    if (typeof initializeSlideStates === "function") {{ try {{ initializeSlideStates(); }} catch (e) {{}} }}
    const counts = {counts};
    if (typeof setSlideMaxStates === "function") {{
        counts.forEach((n, i) => {{ try {{ setSlideMaxStates(i, n); }} catch (e) {{}} }});
    }} else if (typeof maxSlideStates !== "undefined" && maxSlideStates) {{
        counts.forEach((n, i) => {{ maxSlideStates[i] = n; }});
    }}
    const css = {css};
    if (css) {{
        const style = document.createElement("style");
        style.setAttribute("data-slidepress", "");
        style.textContent = css;
        document.head.appendChild(style);
        void document.body.offsetHeight;
    }}
    return true;
}})()"#,
        counts = js_literal(&counts),
        css = js_literal(&capture_css(options)),
    )
}

/// Expression resolving to the slide element: by id first, else by position
fn find_target(index: usize, slide: &Slide) -> String {
    format!(
        r#"(() => {{
        const id = {id};
        const byId = id !== null ? document.getElementById(id) : null;
        return byId || document.querySelectorAll(".slide")[{index}] || null;
    }})()"#,
        id = js_literal(&slide.id),
        index = index,
    )
}

fn dom_activate(index: usize, slide: &Slide) -> String {
    format!(
        r#"(() => {{
    const target = {target};
    if (!target) return false;
    document.querySelectorAll(".slide").forEach(s => {{
        s.classList.remove("active");
        s.style.display = "none";
        s.style.opacity = "0";
    }});
    target.classList.add("active");
    target.style.display = "block";
    target.style.opacity = "1";
    target.style.visibility = "visible";
    if (typeof currentSlide !== "undefined") {{ try {{ currentSlide = {index}; }} catch (e) {{}} }}
    target.querySelectorAll("img[data-src]").forEach(img => {{
        if (img.dataset.src && !img.getAttribute("src")) {{
            img.src = img.dataset.src;
            img.classList.add("loaded");
        }}
    }});
    target.querySelectorAll(".state, [data-state]").forEach((s, i) => {{
        s.style.display = i === 0 ? "" : "none";
        s.style.opacity = i === 0 ? "1" : "0";
    }});
    if (typeof target.focus === "function") target.focus();
    return true;
}})()"#,
        target = find_target(index, slide),
        index = index,
    )
}

/// JSON is valid JavaScript literal syntax for strings, numbers, arrays and null
pub(crate) fn js_literal<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide(id: &str, states: u32) -> Slide {
        Slide::new(id, states)
    }

    #[test]
    fn parse_navigation() {
        assert_eq!("script".parse::<Navigation>().unwrap(), Navigation::Script);
        assert_eq!("DOM".parse::<Navigation>().unwrap(), Navigation::Dom);
        assert_eq!(
            "keyboard".parse::<Navigation>().unwrap(),
            Navigation::Keyboard { key: "Space".into() }
        );
        assert!("mouse".parse::<Navigation>().is_err());
    }

    #[test]
    fn script_navigation_prefers_go_to_slide() {
        let js = Navigation::Script.go_to_slide(4, &slide("slide-1.3", 2));
        assert!(js.contains("goToSlide(index)"));
        assert!(js.contains("const index = 4;"));
        // falls back to DOM activation by id
        assert!(js.contains(r#"const id = "slide-1.3";"#));
    }

    #[test]
    fn ids_are_embedded_as_literals() {
        let js = Navigation::Dom.go_to_slide(0, &slide("we\"ird", 1));
        assert!(js.contains(r#"const id = "we\"ird";"#));

        let anonymous = Slide { id: None, title: None, states: 1, state_handler: None };
        let js = Navigation::Dom.go_to_slide(3, &anonymous);
        assert!(js.contains("const id = null;"));
        assert!(js.contains(r#"document.querySelectorAll(".slide")[3]"#));
    }

    #[test]
    fn script_state_uses_trigger_then_handler() {
        let s = Slide {
            state_handler: Some("handleMCUSlideState".into()),
            ..slide("slide-1.4", 2)
        };
        match Navigation::Script.advance_state(5, &s, 1) {
            StateAction::Eval(js) => {
                assert!(js.contains("triggerSlideStateChange(index, state)"));
                assert!(js.contains(r#"const handler = "handleMCUSlideState";"#));
                assert!(js.contains("const state = 1;"));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn keyboard_state_presses_key() {
        let nav = Navigation::Keyboard { key: "ArrowRight".into() };
        assert_eq!(
            nav.advance_state(0, &slide("a", 3), 2),
            StateAction::Key("ArrowRight".into())
        );
    }

    #[test]
    fn dom_state_selects_nth_state() {
        match Navigation::Dom.advance_state(0, &slide("a", 3), 2) {
            StateAction::Eval(js) => {
                assert!(js.contains("states.length <= 2"));
                assert!(js.contains(r#"i === 2 ? "" : "none""#));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn css_hides_chrome_and_zooms() {
        let css = capture_css(&PrepareOptions { zoom: Some(2.0), ..Default::default() }).unwrap();
        assert!(css.starts_with(".navigation, .nav-btn"));
        assert!(css.contains(".slideshow-container { transform: scale(2);"));

        let none = PrepareOptions {
            hide_selectors: vec![],
            zoom: Some(1.0),
            container_selector: "main".into(),
        };
        assert_eq!(capture_css(&none), None);
    }

    #[test]
    fn prepare_publishes_state_counts() {
        let deck = SlideTable::new(vec![slide("a", 1), slide("b", 3)]).unwrap();
        let js = prepare_script(&deck, &PrepareOptions::default());
        assert!(js.contains("const counts = [1,3];"));
        assert!(js.contains("setSlideMaxStates(i, n)"));
        assert!(js.contains("display: none !important"));
    }
}
