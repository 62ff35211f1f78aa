//! Single-print exports: the whole deck flattened into one document, or a
//! plain page printed as-is.

use log::{info, warn};
use serde::Serialize;

use crate::deck::SlideTable;
use crate::navigate::{js_literal, DEFAULT_HIDE_SELECTORS};
use crate::{Engine, Error, PrintOptions, Result};

#[derive(Debug, Clone)]
pub struct FlattenOptions {
    pub load_wait_ms: u64,
    /// Pause between rebuilding the page and printing it
    pub settle_wait_ms: u64,
    pub hide_selectors: Vec<String>,
    pub print: PrintOptions,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            load_wait_ms: 3000,
            settle_wait_ms: 5000,
            hide_selectors: DEFAULT_HIDE_SELECTORS.iter().map(|s| s.to_string()).collect(),
            print: PrintOptions::flattened(),
        }
    }
}

#[derive(Serialize)]
struct FlatSlide<'a> {
    id: Option<&'a str>,
    title: String,
    states: u32,
    handler: Option<&'a str>,
}

/// Script replacing the page body with every slide laid out one after another.
///
/// Evaluates to the number of slides written.
pub fn flatten_script(deck: &SlideTable, hide_selectors: &[String]) -> String {
    let slides: Vec<FlatSlide> = deck
        .slides
        .iter()
        .enumerate()
        .map(|(i, s)| FlatSlide {
            id: s.id.as_deref(),
            title: deck.display_name(i),
            states: s.states,
            handler: s.state_handler.as_deref(),
        })
        .collect();

    format!(
        r#"(() => {{
    if (typeof initializeSlideStates === "function") {{ try {{ initializeSlideStates(); }} catch (e) {{}} }}
    const deck = {deck};
    const hide = {hide};
    const all = Array.from(document.querySelectorAll(".slide"));
    const out = document.createElement("div");
    out.style.cssText = "background: white; padding: 0; margin: 0;";
    deck.forEach((entry, i) => {{
        const slide = (entry.id && document.getElementById(entry.id)) || all[i];
        const wrapper = document.createElement("div");
        wrapper.style.cssText = "page-break-after: always; min-height: 100vh; padding: 40px; background: white;";
        const heading = document.createElement("h1");
        heading.style.cssText = "font-size: 2.5em; margin-bottom: 30px;";
        heading.textContent = (i + 1) + ". " + entry.title;
        wrapper.appendChild(heading);
        if (!slide) {{ out.appendChild(wrapper); return; }}
        const handler = entry.handler && typeof window[entry.handler] === "function" ? window[entry.handler] : null;
        if (handler && entry.states > 1) {{
            for (let s = 0; s < entry.states; s++) {{
                try {{ handler(s); }} catch (e) {{}}
                const content = slide.querySelector(".content-container") || slide;
                const block = document.createElement("div");
                if (s > 0) block.style.marginTop = "50px";
                block.innerHTML = content.innerHTML;
                wrapper.appendChild(block);
            }}
        }} else {{
            const clone = slide.cloneNode(true);
            clone.style.display = "block";
            clone.style.opacity = "1";
            clone.style.position = "relative";
            wrapper.appendChild(clone.querySelector(".content-container") || clone);
        }}
        out.appendChild(wrapper);
    }});
    document.body.innerHTML = "";
    document.body.style.cssText = "margin: 0; padding: 0; background: white;";
    document.body.appendChild(out);
    if (hide.length) {{
        document.querySelectorAll(hide.join(", ")).forEach(el => {{ el.style.display = "none"; }});
    }}
    return deck.length;
}})()"#,
        deck = js_literal(&slides),
        hide = js_literal(hide_selectors),
    )
}

/// Print every slide of `deck` into a single document, returning its bytes
pub fn export_flattened<E: Engine>(
    engine: &mut E,
    url: &str,
    deck: &SlideTable,
    options: &FlattenOptions,
) -> Result<Vec<u8>> {
    info!("Loading {}", url);
    engine.load_url(url)?;
    engine.wait(options.load_wait_ms);

    export_flattened_loaded(engine, deck, options)
}

/// Same as [`export_flattened`] for a page that is already loaded
pub fn export_flattened_loaded<E: Engine>(
    engine: &mut E,
    deck: &SlideTable,
    options: &FlattenOptions,
) -> Result<Vec<u8>> {
    info!("Laying out {} slides", deck.len());
    let written = engine.evaluate_json(&flatten_script(deck, &options.hide_selectors))?;
    if written.as_u64() != Some(deck.len() as u64) {
        warn!("Flattened {} slides, expected {}", written, deck.len());
    }
    engine.wait(options.settle_wait_ms);

    let pdf = engine.render_pdf(&options.print)?;
    if pdf.is_empty() {
        return Err(Error::EmptyPdf("flattened deck".to_string()));
    }
    Ok(pdf)
}

/// Print a page as it loads, after `wait_ms` for scripts to finish
pub fn export_page<E: Engine>(
    engine: &mut E,
    url: &str,
    wait_ms: u64,
    print: &PrintOptions,
) -> Result<Vec<u8>> {
    info!("Loading {}", url);
    engine.load_url(url)?;
    engine.wait(wait_ms);

    let pdf = engine.render_pdf(print)?;
    if pdf.is_empty() {
        return Err(Error::EmptyPdf(url.to_string()));
    }
    Ok(pdf)
}
