use anyhow::{Context, Result, anyhow};
use image::Rgba;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::color::{FALLBACK_TEXT_COLOR, resolve_color};
use crate::font::FontFace;
use crate::layout::{
    BlockPosition, LineAlignment, MIN_SIZE_FLOOR, Overflow, Rect, TextStyle,
    default_end_prohibited, default_start_prohibited,
};
use crate::render::{Canvas, FitMode, OverlayStyle, Placement, composite};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");
const BACKGROUND_FALLBACK: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Clone)]
pub struct Settings {
    pub canvas: CanvasSettings,
    pub font_path: Option<PathBuf>,
    pub font_family: Option<String>,
    pub title: TextSettings,
    pub description: TextSettings,
    pub debug: bool,
    pub overlays: Vec<OverlaySettings>,
}

#[derive(Debug, Clone)]
pub struct CanvasSettings {
    pub width: u32,
    pub height: u32,
    pub background_color: String,
    pub background_image: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct TextSettings {
    pub size: f32,
    pub min_size: f32,
    pub color: String,
    pub area: Rect,
    pub block_position: BlockPosition,
    pub line_alignment: LineAlignment,
    pub overflow: Overflow,
    pub line_height: f32,
    pub letter_spacing: i32,
    /// Replaces the default start-prohibited set when present.
    pub start_prohibited: Option<String>,
    /// Replaces the default end-prohibited set when present.
    pub end_prohibited: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySettings {
    pub path: PathBuf,
    pub placement: Placement,
    pub fit: FitMode,
    pub opacity: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            canvas: CanvasSettings::default(),
            font_path: None,
            font_family: None,
            title: TextSettings::default(),
            description: TextSettings::default(),
            debug: false,
            overlays: Vec::new(),
        }
    }
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 630,
            background_color: "#ffffff".to_string(),
            background_image: None,
        }
    }
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            size: 48.0,
            min_size: MIN_SIZE_FLOOR,
            color: "#000000".to_string(),
            area: Rect::default(),
            block_position: BlockPosition::default(),
            line_alignment: LineAlignment::default(),
            overflow: Overflow::default(),
            line_height: 1.2,
            letter_spacing: 0,
            start_prohibited: None,
            end_prohibited: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    canvas: Option<CanvasFile>,
    font: Option<FontFile>,
    title: Option<TextFile>,
    description: Option<TextFile>,
    debug: Option<DebugFile>,
    overlay: Option<Vec<OverlayFile>>,
}

#[derive(Debug, Default, Deserialize)]
struct CanvasFile {
    width: Option<u32>,
    height: Option<u32>,
    background_color: Option<String>,
    background_image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FontFile {
    path: Option<String>,
    family: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AreaFile {
    x: Option<i32>,
    y: Option<i32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct TextFile {
    size: Option<f32>,
    min_size: Option<f32>,
    color: Option<String>,
    area: Option<AreaFile>,
    block_position: Option<String>,
    line_alignment: Option<String>,
    overflow: Option<String>,
    line_height: Option<f32>,
    letter_spacing: Option<i32>,
    start_prohibited: Option<String>,
    end_prohibited: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DebugFile {
    enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct OverlayFile {
    path: String,
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
    width: Option<u32>,
    height: Option<u32>,
    fit: Option<String>,
    opacity: Option<f32>,
}

/// Built-in defaults with `extra_path` merged on top, field by field.
/// An `[[overlay]]` list in the file replaces the default list.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    settings
        .merge_str(DEFAULT_SETTINGS_TOML)
        .context("failed to parse built-in settings")?;

    if let Some(path) = extra_path {
        if !path.exists() {
            return Err(anyhow!("settings file not found: {}", path.display()));
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings: {}", path.display()))?;
        settings
            .merge_str(&content)
            .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "settings merged");
    }

    Ok(settings)
}

impl Settings {
    /// Merges one TOML document on top of the current values.
    pub fn merge_str(&mut self, content: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)?;
        self.merge(parsed)
    }

    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(canvas) = incoming.canvas {
            if let Some(width) = canvas.width.filter(|w| *w > 0) {
                self.canvas.width = width;
            }
            if let Some(height) = canvas.height.filter(|h| *h > 0) {
                self.canvas.height = height;
            }
            if let Some(color) = non_blank(canvas.background_color) {
                self.canvas.background_color = color;
            }
            if let Some(path) = non_blank(canvas.background_image) {
                self.canvas.background_image = Some(PathBuf::from(path));
            }
        }
        if let Some(font) = incoming.font {
            if let Some(path) = non_blank(font.path) {
                self.font_path = Some(PathBuf::from(path));
            }
            if let Some(family) = non_blank(font.family) {
                self.font_family = Some(family);
            }
        }
        if let Some(title) = incoming.title {
            self.title.merge(title).context("invalid [title]")?;
        }
        if let Some(description) = incoming.description {
            self.description
                .merge(description)
                .context("invalid [description]")?;
        }
        if let Some(debug) = incoming.debug.and_then(|d| d.enabled) {
            self.debug = debug;
        }
        if let Some(overlays) = incoming.overlay {
            self.overlays = overlays
                .into_iter()
                .enumerate()
                .map(|(idx, overlay)| {
                    OverlaySettings::from_file(overlay)
                        .with_context(|| format!("invalid [[overlay]] #{}", idx + 1))
                })
                .collect::<Result<_>>()?;
        }
        Ok(())
    }

    /// A canvas filled with the background color, with the background image
    /// (if any) stretched over it.
    pub fn create_canvas(&self) -> Result<Canvas> {
        let background = resolve_color(&self.canvas.background_color, BACKGROUND_FALLBACK);
        let mut canvas = Canvas::from_pixel(self.canvas.width, self.canvas.height, background);
        if let Some(path) = &self.canvas.background_image {
            let image = image::open(path)
                .with_context(|| format!("failed to open background image: {}", path.display()))?
                .to_rgba8();
            let placement = Placement {
                x: 0,
                y: 0,
                width: Some(self.canvas.width),
                height: Some(self.canvas.height),
            };
            composite(&mut canvas, &image, &placement, FitMode::Fill, 1.0)
                .with_context(|| format!("failed to draw background image: {}", path.display()))?;
        }
        Ok(canvas)
    }

    /// Decodes every configured overlay image.
    pub fn load_overlays(&self) -> Result<Vec<OverlayStyle>> {
        self.overlays.iter().map(OverlaySettings::load).collect()
    }
}

impl TextSettings {
    fn merge(&mut self, incoming: TextFile) -> Result<()> {
        if let Some(size) = incoming.size.filter(|s| *s > 0.0) {
            self.size = size;
        }
        if let Some(min_size) = incoming.min_size.filter(|s| *s > 0.0) {
            self.min_size = min_size;
        }
        if let Some(color) = non_blank(incoming.color) {
            self.color = color;
        }
        if let Some(area) = incoming.area {
            self.area = Rect::new(
                area.x.unwrap_or(self.area.x),
                area.y.unwrap_or(self.area.y),
                area.width.unwrap_or(self.area.width),
                area.height.unwrap_or(self.area.height),
            );
        }
        if let Some(value) = incoming.block_position {
            self.block_position = parse_setting(&value, "block_position")?;
        }
        if let Some(value) = incoming.line_alignment {
            self.line_alignment = parse_setting(&value, "line_alignment")?;
        }
        if let Some(value) = incoming.overflow {
            self.overflow = parse_setting(&value, "overflow")?;
        }
        if let Some(line_height) = incoming.line_height.filter(|h| *h > 0.0) {
            self.line_height = line_height;
        }
        if let Some(spacing) = incoming.letter_spacing {
            self.letter_spacing = spacing;
        }
        if let Some(chars) = incoming.start_prohibited {
            self.start_prohibited = Some(chars);
        }
        if let Some(chars) = incoming.end_prohibited {
            self.end_prohibited = Some(chars);
        }
        Ok(())
    }

    pub fn to_style(&self, font: FontFace) -> TextStyle {
        let mut style = TextStyle::new(font, self.size, self.area);
        style.min_size = self.min_size;
        style.color = resolve_color(&self.color, FALLBACK_TEXT_COLOR);
        style.block_position = self.block_position;
        style.line_alignment = self.line_alignment;
        style.overflow = self.overflow;
        style.line_height = self.line_height;
        style.letter_spacing = self.letter_spacing;
        style.start_prohibited = char_set(self.start_prohibited.as_deref())
            .unwrap_or_else(default_start_prohibited);
        style.end_prohibited =
            char_set(self.end_prohibited.as_deref()).unwrap_or_else(default_end_prohibited);
        style
    }
}

impl OverlaySettings {
    fn from_file(file: OverlayFile) -> Result<Self> {
        let path = file.path.trim();
        if path.is_empty() {
            return Err(anyhow!("overlay path is empty"));
        }
        let fit = match file.fit {
            Some(value) => parse_setting(&value, "fit")?,
            None => FitMode::default(),
        };
        Ok(Self {
            path: PathBuf::from(path),
            placement: Placement {
                x: file.x,
                y: file.y,
                width: file.width,
                height: file.height,
            },
            fit,
            opacity: file.opacity.unwrap_or(1.0),
        })
    }

    pub fn load(&self) -> Result<OverlayStyle> {
        let bytes = fs::read(&self.path)
            .with_context(|| format!("failed to read overlay: {}", self.path.display()))?;
        let mut overlay = OverlayStyle::decode(&bytes, self.placement)
            .with_context(|| format!("invalid overlay: {}", self.path.display()))?;
        overlay.fit = self.fit;
        overlay.opacity = self.opacity;
        Ok(overlay)
    }
}

fn parse_setting<T>(value: &str, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse::<T>()
        .map_err(|err| anyhow!("{}: {}", key, err))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn char_set(value: Option<&str>) -> Option<HashSet<char>> {
    value.map(|chars| chars.chars().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{HorizontalAnchor, VerticalAnchor};
    use std::io::Write;

    fn defaults() -> Settings {
        let mut settings = Settings::default();
        settings.merge_str(DEFAULT_SETTINGS_TOML).unwrap();
        settings
    }

    #[test]
    fn built_in_settings_describe_a_1200x630_card() {
        let settings = defaults();
        assert_eq!((settings.canvas.width, settings.canvas.height), (1200, 630));
        assert_eq!(settings.title.size, 72.0);
        assert_eq!(settings.title.area, Rect::new(80, 80, 1040, 300));
        assert_eq!(
            settings.title.block_position,
            BlockPosition::new(VerticalAnchor::Middle, HorizontalAnchor::Left)
        );
        assert_eq!(settings.description.min_size, 20.0);
        assert!(!settings.debug);
        assert!(settings.overlays.is_empty());
    }

    #[test]
    fn later_documents_override_field_by_field() {
        let mut settings = defaults();
        settings
            .merge_str(
                r##"
                [title]
                size = 96
                color = "#ff0000"
                area = { y = 40 }
                overflow = "clip"

                [debug]
                enabled = true
                "##,
            )
            .unwrap();
        assert_eq!(settings.title.size, 96.0);
        assert_eq!(settings.title.color, "#ff0000");
        assert_eq!(settings.title.area, Rect::new(80, 40, 1040, 300));
        assert_eq!(settings.title.overflow, Overflow::Clip);
        assert_eq!(settings.title.min_size, 32.0);
        assert_eq!(settings.description.size, 36.0);
        assert!(settings.debug);
    }

    #[test]
    fn non_positive_numbers_and_blank_strings_are_ignored() {
        let mut settings = defaults();
        settings
            .merge_str(
                r#"
                [canvas]
                width = 0
                background_color = "  "

                [description]
                size = -4
                line_height = 0
                "#,
            )
            .unwrap();
        assert_eq!(settings.canvas.width, 1200);
        assert_eq!(settings.canvas.background_color, "#ffffff");
        assert_eq!(settings.description.size, 36.0);
        assert_eq!(settings.description.line_height, 1.4);
    }

    #[test]
    fn unknown_enumeration_values_are_errors() {
        let mut settings = defaults();
        let err = settings
            .merge_str("[title]\nblock_position = \"upper-left\"\n")
            .unwrap_err();
        assert!(format!("{:#}", err).contains("block_position"));

        let err = settings
            .merge_str("[[overlay]]\npath = \"logo.png\"\nfit = \"stretch\"\n")
            .unwrap_err();
        assert!(format!("{:#}", err).contains("overlay"));
    }

    #[test]
    fn overlays_parse_with_defaults() {
        let mut settings = defaults();
        settings
            .merge_str(
                r#"
                [[overlay]]
                path = "logo.png"
                x = 10
                y = 20
                width = 120

                [[overlay]]
                path = "badge.png"
                fit = "cover"
                opacity = 0.5
                "#,
            )
            .unwrap();
        assert_eq!(settings.overlays.len(), 2);
        assert_eq!(
            settings.overlays[0],
            OverlaySettings {
                path: PathBuf::from("logo.png"),
                placement: Placement {
                    x: 10,
                    y: 20,
                    width: Some(120),
                    height: None,
                },
                fit: FitMode::Contain,
                opacity: 1.0,
            }
        );
        assert_eq!(settings.overlays[1].fit, FitMode::Cover);
        assert_eq!(settings.overlays[1].opacity, 0.5);
    }

    #[test]
    fn text_settings_resolve_to_style() {
        let mut text = defaults().title;
        text.color = "not-a-color".to_string();
        text.start_prohibited = Some("。".to_string());
        let style = text.to_style(FontFace::estimated());
        assert_eq!(style.size, 72.0);
        assert_eq!(style.color, FALLBACK_TEXT_COLOR);
        assert_eq!(style.start_prohibited, HashSet::from(['。']));
        assert!(style.end_prohibited.contains(&'「'));
    }

    #[test]
    fn load_settings_reads_extra_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[canvas]\nwidth = 800\nheight = 418").unwrap();
        let settings = load_settings(Some(file.path())).unwrap();
        assert_eq!((settings.canvas.width, settings.canvas.height), (800, 418));
        assert_eq!(settings.title.size, 72.0);
    }

    #[test]
    fn load_settings_rejects_missing_extra_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = load_settings(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("settings file not found"));
    }

    #[test]
    fn overlay_load_keeps_fit_and_opacity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        image::RgbaImage::from_pixel(6, 3, Rgba([9, 9, 9, 255]))
            .save(&path)
            .unwrap();
        let overlay = OverlaySettings {
            path,
            placement: Placement::default(),
            fit: FitMode::Cover,
            opacity: 0.25,
        }
        .load()
        .unwrap();
        assert_eq!(overlay.image.dimensions(), (6, 3));
        assert_eq!(overlay.fit, FitMode::Cover);
        assert_eq!(overlay.opacity, 0.25);

        let garbage = dir.path().join("garbage.png");
        fs::write(&garbage, b"nope").unwrap();
        let err = OverlaySettings {
            path: garbage,
            placement: Placement::default(),
            fit: FitMode::Fill,
            opacity: 1.0,
        }
        .load()
        .unwrap_err();
        assert!(format!("{:#}", err).contains("failed to decode overlay image"));
    }

    #[test]
    fn canvas_uses_background_color_and_image() {
        let mut settings = defaults();
        settings.canvas.width = 8;
        settings.canvas.height = 4;
        settings.canvas.background_color = "#102030".to_string();
        let canvas = settings.create_canvas().unwrap();
        assert_eq!(*canvas.get_pixel(7, 3), Rgba([0x10, 0x20, 0x30, 255]));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.png");
        image::RgbaImage::from_pixel(2, 2, Rgba([0, 200, 0, 255]))
            .save(&path)
            .unwrap();
        settings.canvas.background_image = Some(path);
        let canvas = settings.create_canvas().unwrap();
        assert_eq!(canvas.dimensions(), (8, 4));
        assert_eq!(*canvas.get_pixel(0, 0), Rgba([0, 200, 0, 255]));
        assert_eq!(*canvas.get_pixel(7, 3), Rgba([0, 200, 0, 255]));
    }
}
