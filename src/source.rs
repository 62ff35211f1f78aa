//! Where a deck comes from and where its PDF goes.

use std::path::{Path, PathBuf};

use url::Url;

use crate::{Error, Result};

/// A page to load: either a remote URL or a local HTML file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Remote(Url),
    Local(PathBuf),
}

impl Source {
    /// `http://` and `https://` inputs are remote; anything else must be an
    /// existing file.
    pub fn parse(input: &str) -> Result<Self> {
        let lower = input.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = Url::parse(input)
                .map_err(|e| Error::ConfigError(format!("Invalid URL '{}': {}", input, e)))?;
            return Ok(Source::Remote(url));
        }

        let path = Path::new(input);
        if !path.exists() {
            return Err(Error::InputNotFound(path.to_path_buf()));
        }
        Ok(Source::Local(path.canonicalize()?))
    }

    /// URL handed to the browser
    pub fn url(&self) -> Result<String> {
        match self {
            Source::Remote(url) => Ok(url.to_string()),
            Source::Local(path) => Url::from_file_path(path)
                .map(|u| u.to_string())
                .map_err(|_| Error::ConfigError(format!("Cannot make a file URL from {}", path.display()))),
        }
    }

    /// `<host or file stem><suffix>.pdf` in the working directory
    pub fn default_output(&self, suffix: &str) -> PathBuf {
        let base = match self {
            Source::Remote(url) => {
                let mut host = url.host_str().unwrap_or("page").to_string();
                if let Some(port) = url.port() {
                    host.push_str(&format!(":{}", port));
                }
                host.replace(['.', ':'], "_")
            }
            Source::Local(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "page".to_string()),
        };
        PathBuf::from(format!("{}{}.pdf", base, suffix))
    }
}

/// Append `.pdf` unless the name already ends with it
pub fn ensure_pdf_extension(path: PathBuf) -> PathBuf {
    let has_pdf = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if has_pdf {
        path
    } else {
        let mut name = path.into_os_string();
        name.push(".pdf");
        PathBuf::from(name)
    }
}
