use crate::error::{ChartError, Result};
use crate::figure::Figure;
use log::{debug, info, warn};
use maud::{html, PreEscaped, DOCTYPE};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_PLOTLY_SRC: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Png,
    Html,
    Pdf,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [Self::Png, Self::Html, Self::Pdf];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "html" | "htm" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Format implied by the file extension of `path`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                ChartError::UnsupportedFormat(format!("'{}' has no file extension", path.display()))
            })?;

        Self::from_name(extension).ok_or_else(|| ChartError::UnsupportedFormat(extension.to_string()))
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Html => "html",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| ChartError::UnsupportedFormat(s.to_string()))
    }
}

/// Turns a [`Figure`] into bytes of a given format.
///
/// Raster and document formats depend on an external engine, so callers plug
/// one in through this trait. [`HtmlRenderer`] covers interactive HTML.
pub trait ChartRenderer {
    fn name(&self) -> &str;

    fn supports(&self, format: OutputFormat) -> bool;

    fn render(&self, figure: &Figure, format: OutputFormat, writer: &mut dyn Write) -> Result<()>;
}

/// Standalone HTML page that loads Plotly from a script tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlRenderer {
    pub plotly_src: String,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plotly_src(plotly_src: impl Into<String>) -> Self {
        Self {
            plotly_src: plotly_src.into(),
        }
    }

    pub fn to_html(&self, figure: &Figure) -> Result<String> {
        // `</` inside a script block would end it early.
        let data = serde_json::to_string(&figure.data)?.replace("</", "<\\/");
        let layout = serde_json::to_string(&figure.layout)?.replace("</", "<\\/");
        let title = figure.title().unwrap_or("Chart");

        let page = html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="utf-8";
                    title { (title) }
                    script src=(self.plotly_src) {}
                }
                body {
                    div id="chart" {}
                    script {
                        (PreEscaped(format!(
                            "Plotly.newPlot(\"chart\", {}, {}, {{\"responsive\": true}});",
                            data, layout
                        )))
                    }
                }
            }
        };

        Ok(page.into_string())
    }
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self {
            plotly_src: DEFAULT_PLOTLY_SRC.to_string(),
        }
    }
}

impl ChartRenderer for HtmlRenderer {
    fn name(&self) -> &str {
        "html"
    }

    fn supports(&self, format: OutputFormat) -> bool {
        format == OutputFormat::Html
    }

    fn render(&self, figure: &Figure, format: OutputFormat, writer: &mut dyn Write) -> Result<()> {
        if !self.supports(format) {
            return Err(ChartError::UnsupportedFormat(format!(
                "{} renderer cannot produce {}",
                self.name(),
                format
            )));
        }
        writer.write_all(self.to_html(figure)?.as_bytes())?;
        Ok(())
    }
}

/// Writes `figure` to `path` in the format implied by its extension.
///
/// Nothing is created when the format is unknown or the renderer cannot
/// produce it. A file left half-written by a failed render is removed.
pub fn export_figure(
    renderer: &dyn ChartRenderer,
    figure: &Figure,
    path: impl AsRef<Path>,
) -> Result<PathBuf> {
    let path = path.as_ref();
    let format = OutputFormat::from_path(path)?;

    if !renderer.supports(format) {
        return Err(ChartError::UnsupportedFormat(format!(
            "{} renderer cannot produce {}",
            renderer.name(),
            format
        )));
    }

    info!(
        "Exporting chart to {} with the {} renderer",
        path.display(),
        renderer.name()
    );

    let file = File::create(path).map_err(|e| export_error(path, e))?;

    let written = {
        let mut writer = BufWriter::new(file);
        renderer
            .render(figure, format, &mut writer)
            .and_then(|_| writer.flush().map_err(ChartError::from))
    };

    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(path) {
            warn!(
                "Could not remove partial export {}: {}",
                path.display(),
                cleanup
            );
        }
        return Err(export_error(path, e));
    }

    debug!("Wrote {} chart to {}", format, path.display());

    Ok(path.to_path_buf())
}

fn export_error(path: &Path, reason: impl fmt::Display) -> ChartError {
    ChartError::ExportError {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}
