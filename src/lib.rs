use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};

pub mod card;
pub mod color;
pub mod error;
pub mod font;
pub mod layout;
pub mod logging;
pub mod render;
pub mod settings;

pub use card::{RenderOptions, RenderOutcome, TextBlock, render_card};
pub use error::{RenderError, RenderResult};
pub use font::FontFace;
pub use layout::{BlockPosition, LineAlignment, Overflow, Rect, TextStyle};
pub use render::{Canvas, FitMode, OverlayStyle, Placement, TextLayout};
pub use settings::Settings;

#[derive(Debug, Clone)]
pub struct Config {
    pub title: Option<String>,
    pub description: Option<String>,
    pub settings_path: Option<PathBuf>,
    /// Overrides `[font] path`.
    pub font_path: Option<PathBuf>,
    pub out: PathBuf,
    pub debug: bool,
}

/// Renders one card from `config` and writes it as PNG to `config.out`.
pub fn run(config: Config) -> Result<RenderOutcome> {
    let settings = settings::load_settings(config.settings_path.as_deref())?;

    let title = config.title.unwrap_or_default();
    let description = config.description.unwrap_or_default();
    if title.trim().is_empty() && description.trim().is_empty() {
        return Err(anyhow!("title and description are both empty"));
    }

    let font_path = config.font_path.as_deref().or(settings.font_path.as_deref());
    let face = font::resolve_font(
        font_path,
        settings.font_family.as_deref(),
        font::default_fallback_families(),
    )
    .context("failed to resolve a font (set --font or [font] path)")?;
    tracing::debug!(family = face.family().unwrap_or("(unknown)"), "font resolved");

    let mut canvas = settings.create_canvas()?;
    let blocks = [
        TextBlock::new("title", title, settings.title.to_style(face.clone())),
        TextBlock::new(
            "description",
            description,
            settings.description.to_style(face),
        ),
    ];
    let overlays = settings.load_overlays()?;
    let options = RenderOptions {
        debug: config.debug || settings.debug,
    };

    let outcome = render_card(&mut canvas, &blocks, &overlays, &options);
    save_png(&canvas, &config.out)?;
    Ok(outcome)
}

fn save_png(canvas: &Canvas, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory: {}", parent.display()))?;
    }
    canvas
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write image: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_rejects_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(Config {
            title: Some("  ".to_string()),
            description: None,
            settings_path: None,
            font_path: None,
            out: dir.path().join("card.png"),
            debug: false,
        })
        .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn save_png_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out/card.png");
        let canvas = Canvas::new(4, 4);
        save_png(&canvas, &out).unwrap();
        let written = image::open(&out).unwrap();
        assert_eq!((written.width(), written.height()), (4, 4));
    }
}
