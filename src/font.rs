use anyhow::{Context, Result, anyhow};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use ttf_parser::{Face, name_id};
use usvg::fontdb;

/// A font usable for measuring and drawing text.
///
/// Either backed by parsed font bytes, or an estimated face that only knows
/// per-script average advances and cannot draw glyphs.
#[derive(Clone)]
pub struct FontFace {
    source: FaceSource,
}

#[derive(Clone)]
enum FaceSource {
    Parsed(Arc<ParsedFont>),
    Estimated,
}

struct ParsedFont {
    data: Vec<u8>,
    face_index: u32,
    units_per_em: u16,
    space_advance: u16,
    ascender: i16,
    descender: i16,
    family: Option<String>,
}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            FaceSource::Parsed(font) => f
                .debug_struct("FontFace")
                .field("family", &font.family)
                .field("face_index", &font.face_index)
                .field("units_per_em", &font.units_per_em)
                .finish(),
            FaceSource::Estimated => f.write_str("FontFace(estimated)"),
        }
    }
}

impl FontFace {
    pub fn estimated() -> Self {
        Self {
            source: FaceSource::Estimated,
        }
    }

    /// Parses the first usable face in `data`, or the face named
    /// `preferred_family` when the data is a collection.
    pub fn from_bytes(data: Vec<u8>, preferred_family: Option<&str>) -> Result<Self> {
        let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
        let mut fallback = None;
        for index in 0..count {
            let Ok(face) = Face::parse(&data, index) else {
                continue;
            };
            let info = face_info(&face, index);
            if let (Some(preferred), Some(found)) = (preferred_family, &info.5) {
                if found.eq_ignore_ascii_case(preferred) {
                    return Ok(Self::parsed(data, info));
                }
            }
            if fallback.is_none() {
                fallback = Some(info);
            }
        }
        if preferred_family.is_some() && count > 1 {
            tracing::debug!(
                family = preferred_family,
                "family not found in collection, using first face"
            );
        }
        let info = fallback.ok_or_else(|| anyhow!("failed to parse font data"))?;
        Ok(Self::parsed(data, info))
    }

    /// Parses exactly the face at `index` of a font file or collection.
    pub fn from_bytes_at(data: Vec<u8>, index: u32) -> Result<Self> {
        let face = Face::parse(&data, index)
            .map_err(|err| anyhow!("failed to parse font face #{}: {}", index, err))?;
        let info = face_info(&face, index);
        Ok(Self::parsed(data, info))
    }

    fn parsed(data: Vec<u8>, info: FaceInfo) -> Self {
        let (face_index, units_per_em, space_advance, ascender, descender, family) = info;
        Self {
            source: FaceSource::Parsed(Arc::new(ParsedFont {
                data,
                face_index,
                units_per_em,
                space_advance,
                ascender,
                descender,
                family,
            })),
        }
    }

    pub fn is_estimated(&self) -> bool {
        matches!(self.source, FaceSource::Estimated)
    }

    pub fn family(&self) -> Option<&str> {
        match &self.source {
            FaceSource::Parsed(font) => font.family.as_deref(),
            FaceSource::Estimated => None,
        }
    }

    /// Parses the underlying face for glyph lookups. `None` for estimated faces.
    pub(crate) fn face(&self) -> Option<Face<'_>> {
        match &self.source {
            FaceSource::Parsed(font) => Face::parse(&font.data, font.face_index).ok(),
            FaceSource::Estimated => None,
        }
    }

    pub(crate) fn units_per_em(&self) -> f32 {
        match &self.source {
            FaceSource::Parsed(font) => f32::from(font.units_per_em),
            FaceSource::Estimated => 1.0,
        }
    }

    pub(crate) fn space_advance(&self) -> u16 {
        match &self.source {
            FaceSource::Parsed(font) => font.space_advance,
            FaceSource::Estimated => 0,
        }
    }

    /// Ascender and descender in em units; descender is negative.
    pub(crate) fn vertical_extent_em(&self) -> (f32, f32) {
        match &self.source {
            FaceSource::Parsed(font) => {
                let units = f32::from(font.units_per_em);
                (
                    f32::from(font.ascender) / units,
                    f32::from(font.descender) / units,
                )
            }
            FaceSource::Estimated => (0.8, -0.2),
        }
    }
}

pub fn load_font(path: &Path, family: Option<&str>) -> Result<FontFace> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    FontFace::from_bytes(data, family)
        .with_context(|| format!("failed to parse font: {}", path.display()))
}

/// Loads `font_path` when given, otherwise looks the family (or each fallback
/// family in order) up among the installed system fonts.
pub fn resolve_font(
    font_path: Option<&Path>,
    font_family: Option<&str>,
    fallback: &[&str],
) -> Result<FontFace> {
    if let Some(path) = font_path {
        return load_font(path, font_family);
    }

    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    if let Some(family) = font_family {
        return load_from_family(&db, family);
    }

    for candidate in fallback {
        match load_from_family(&db, candidate) {
            Ok(face) => return Ok(face),
            Err(err) => tracing::debug!(family = candidate, "fallback font unavailable: {err}"),
        }
    }

    Err(anyhow!("no fallback fonts found"))
}

#[cfg(target_os = "macos")]
pub fn default_fallback_families() -> &'static [&'static str] {
    &["Hiragino Sans", "Noto Sans CJK JP", "sans-serif"]
}

#[cfg(target_os = "windows")]
pub fn default_fallback_families() -> &'static [&'static str] {
    &["Yu Gothic", "Noto Sans CJK JP", "sans-serif"]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn default_fallback_families() -> &'static [&'static str] {
    &["Noto Sans CJK JP", "Noto Sans", "sans-serif"]
}

fn load_from_family(db: &fontdb::Database, family: &str) -> Result<FontFace> {
    let families = if family.eq_ignore_ascii_case("sans-serif") {
        vec![fontdb::Family::SansSerif]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    let (data, index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| anyhow!("failed to load font data: {}", family))?;
    FontFace::from_bytes_at(data, index)
}

type FaceInfo = (u32, u16, u16, i16, i16, Option<String>);

fn face_info(face: &Face<'_>, index: u32) -> FaceInfo {
    let units_per_em = face.units_per_em().max(1);
    let space_advance = face
        .glyph_index(' ')
        .and_then(|id| face.glyph_hor_advance(id))
        .unwrap_or(units_per_em / 2);
    (
        index,
        units_per_em,
        space_advance,
        face.ascender(),
        face.descender(),
        extract_family_name(face),
    )
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

/// Average advance in em units used by [`FontFace::estimated`].
pub(crate) fn estimate_char_units(ch: char) -> f32 {
    if ch.is_whitespace() {
        0.25
    } else if ch.is_ascii_alphanumeric() {
        0.55
    } else if ch.is_ascii() {
        0.35
    } else if is_wide(ch) {
        1.0
    } else {
        0.9
    }
}

pub(crate) fn is_wide(ch: char) -> bool {
    matches!(
        ch as u32,
        0x3000..=0x303F
            | 0x3040..=0x30FF
            | 0x31F0..=0x31FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xAC00..=0xD7AF
            | 0xFF01..=0xFF60
    )
}
