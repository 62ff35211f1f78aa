//! Chrome DevTools Protocol adapter implementation

use crate::navigate::js_literal;
use crate::{Engine, EngineConfig, Error, PrintOptions, Result, ScriptResult};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

/// CDP-based engine implementation (uses the `headless_chrome` crate)
///
/// This adapter launches a Chrome instance sized to the configured viewport,
/// manages a single tab, and provides the `Engine` trait implementation over it.
pub struct CdpEngine {
    browser: Browser,
    tab: Arc<Tab>,
    config: EngineConfig,
}

impl Engine for CdpEngine {
    fn new(config: EngineConfig) -> Result<Self>
    where
        Self: Sized,
    {
        if config.device_scale_factor <= 0.0 {
            return Err(Error::ConfigError(format!(
                "device scale factor must be positive, got {}",
                config.device_scale_factor
            )));
        }

        let scale_arg = format!("--force-device-scale-factor={}", config.device_scale_factor);
        let args: Vec<&OsStr> = vec![OsStr::new(&scale_arg), OsStr::new("--hide-scrollbars")];

        // Configure Chrome launch options
        let mut builder = LaunchOptions::default_builder();
        builder
            .headless(config.headless)
            .sandbox(config.sandbox)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .idle_browser_timeout(Duration::from_millis(config.timeout_ms.max(60_000)))
            .args(args);
        if let Some(path) = &config.chrome_path {
            builder.path(Some(path.clone()));
        }
        let launch_options = builder
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        // Launch the browser
        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(Duration::from_millis(config.timeout_ms));

        if let Some(user_agent) = &config.user_agent {
            tab.set_user_agent(user_agent, None, None)
                .map_err(|e| Error::InitializationError(format!("Failed to set user agent: {}", e)))?;
        }

        debug!(
            "Launched Chrome at {}x{} @{}x",
            config.viewport.width, config.viewport.height, config.device_scale_factor
        );

        Ok(Self { browser, tab, config })
    }

    fn load_url(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::LoadError(format!("Navigation to {} failed: {}", url, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::LoadError(format!("Wait for navigation failed: {}", e)))?;

        Ok(())
    }

    fn evaluate_script(&mut self, script: &str) -> Result<ScriptResult> {
        if !self.config.enable_javascript {
            return Err(Error::ScriptError("JavaScript execution is disabled in the engine config".into()));
        }

        // Objects come back from CDP by reference only, so results and
        // exceptions travel as a JSON string
        let result = self
            .tab
            .evaluate(&script_envelope(script), true)
            .map_err(|e| Error::ScriptError(format!("Evaluation failed: {}", e)))?;

        unwrap_envelope(result.value)
    }

    fn press_key(&mut self, key: &str) -> Result<()> {
        self.tab
            .press_key(cdp_key_name(key))
            .map_err(|e| Error::ScriptError(format!("Key press '{}' failed: {}", key, e)))?;
        Ok(())
    }

    fn render_png(&self) -> Result<Vec<u8>> {
        // Viewport only: slides are sized to the window, not the document
        let screenshot_data = self
            .tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| Error::RenderError(format!("Screenshot failed: {}", e)))?;

        Ok(screenshot_data)
    }

    fn render_pdf(&self, options: &PrintOptions) -> Result<Vec<u8>> {
        let margin = options.margin_in();
        let pdf_options = PrintToPdfOptions {
            landscape: Some(options.landscape),
            display_header_footer: Some(false),
            print_background: Some(options.print_background),
            scale: options.scale,
            paper_width: Some(options.paper.width_in),
            paper_height: Some(options.paper.height_in),
            margin_top: Some(margin),
            margin_bottom: Some(margin),
            margin_left: Some(margin),
            margin_right: Some(margin),
            prefer_css_page_size: Some(false),
            ..Default::default()
        };

        let pdf = self
            .tab
            .print_to_pdf(Some(pdf_options))
            .map_err(|e| Error::RenderError(format!("Print to PDF failed: {}", e)))?;

        if pdf.is_empty() {
            warn!("Chrome returned an empty PDF");
        }
        Ok(pdf)
    }

    fn close(self) -> Result<()> {
        // Drop the tab before the browser so the child process exits promptly
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }
}

/// Wrap `script` so it evaluates to `{"result": ...}` or `{"error": ...}` as JSON text.
///
/// Indirect eval keeps global scope, so top-level `let`/`const` bindings stay visible.
fn script_envelope(script: &str) -> String {
    format!(
        r#"(async () => {{
    try {{
        const value = await (0, eval)({source});
        return JSON.stringify({{ result: value === undefined ? null : value }});
    }} catch (e) {{
        return JSON.stringify({{ error: String(e && e.stack ? e.stack : e) }});
    }}
}})()"#,
        source = js_literal(script),
    )
}

fn unwrap_envelope(value: Option<serde_json::Value>) -> Result<ScriptResult> {
    let text = match value {
        Some(serde_json::Value::String(text)) => text,
        other => {
            return Err(Error::ScriptError(format!(
                "Unexpected evaluation result: {}",
                other.map(|v| v.to_string()).unwrap_or_else(|| "nothing".into())
            )))
        }
    };

    let parsed: serde_json::Value = serde_json::from_str(&text)?;
    if let Some(error) = parsed.get("error") {
        let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
        return Ok(ScriptResult { value: message, is_error: true });
    }
    let result = parsed.get("result").cloned().unwrap_or(serde_json::Value::Null);
    Ok(ScriptResult { value: result.to_string(), is_error: false })
}

/// Map friendly key names onto the names `headless_chrome` knows
fn cdp_key_name(key: &str) -> &str {
    match key {
        "Space" | "space" | "Spacebar" => " ",
        "Right" | "right" => "ArrowRight",
        "Left" | "left" => "ArrowLeft",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(cdp_key_name("Space"), " ");
        assert_eq!(cdp_key_name("right"), "ArrowRight");
        assert_eq!(cdp_key_name("PageDown"), "PageDown");
    }

    #[test]
    fn test_envelope_keeps_script_intact() {
        let js = script_envelope(r#"(() => ["a", "b"])()"#);
        assert!(js.contains(r#"(0, eval)("(() => [\"a\", \"b\"])()")"#));
        assert!(js.contains("JSON.stringify({ result:"));
    }

    #[test]
    fn test_envelope_results() {
        let array = unwrap_envelope(Some(serde_json::json!(
            r#"{"result":[{"id":"slide-0","states":2}]}"#
        )))
        .unwrap();
        assert!(!array.is_error);
        assert_eq!(array.value, r#"[{"id":"slide-0","states":2}]"#);

        let flag = unwrap_envelope(Some(serde_json::json!(r#"{"result":true}"#))).unwrap();
        assert_eq!(flag.value, "true");

        let nothing = unwrap_envelope(Some(serde_json::json!(r#"{"result":null}"#))).unwrap();
        assert_eq!(nothing.value, "null");
    }

    #[test]
    fn test_envelope_exceptions() {
        let thrown = unwrap_envelope(Some(serde_json::json!(
            r#"{"error":"TypeError: goToSlide is not a function"}"#
        )))
        .unwrap();
        assert!(thrown.is_error);
        assert_eq!(thrown.value, "TypeError: goToSlide is not a function");

        assert!(matches!(unwrap_envelope(None), Err(Error::ScriptError(_))));
    }

    #[test]
    fn test_cdp_engine_creation() {
        let config = EngineConfig::default();
        // This test requires Chrome to be installed, so we skip it in CI
        if std::env::var("CI").is_ok() {
            return;
        }
        let result = CdpEngine::new(config);
        if let Err(e) = result {
            eprintln!("Skipping CDP engine creation test because Chrome is not available or failed to launch: {}", e);
            return;
        }
        assert!(result.is_ok());
    }

    #[test]
    fn test_rejects_bad_scale() {
        let config = EngineConfig {
            device_scale_factor: 0.0,
            ..Default::default()
        };
        assert!(matches!(CdpEngine::new(config), Err(Error::ConfigError(_))));
    }
}
