use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::error::{PosterError, PosterResult};

/// Raw font face used by the glyph rasterizer and referenced by the browser page.
#[derive(Clone)]
pub struct FontSource {
    pub bytes: Arc<Vec<u8>>,
    /// Face index inside a collection file.
    pub index: u32,
    /// File the face was read from, when it came from disk.
    pub path: Option<PathBuf>,
}

impl std::fmt::Debug for FontSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontSource")
            .field("len", &self.bytes.len())
            .field("index", &self.index)
            .field("path", &self.path)
            .finish()
    }
}

impl FontSource {
    /// First readable file from `candidates`, else the system sans-serif face.
    pub fn discover(candidates: &[PathBuf]) -> PosterResult<Self> {
        if let Some(found) = Self::first_existing(candidates) {
            return Ok(found);
        }
        tracing::warn!(
            tried = candidates.len(),
            "no configured font found, falling back to system sans-serif"
        );
        Self::system_sans_serif()
    }

    pub fn from_file(path: &Path) -> PosterResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| PosterError::io(path, e))?;
        Ok(Self {
            bytes: Arc::new(bytes),
            index: 0,
            path: Some(path.to_path_buf()),
        })
    }

    fn first_existing(candidates: &[PathBuf]) -> Option<Self> {
        for path in candidates {
            if !path.is_file() {
                continue;
            }
            match Self::from_file(path) {
                Ok(font) => {
                    tracing::debug!(path = %path.display(), "using font");
                    return Some(font);
                }
                Err(err) => tracing::warn!(error = %err, "skipping unreadable font"),
            }
        }
        None
    }

    fn system_sans_serif() -> PosterResult<Self> {
        let db = system_db();
        let families = [usvg::fontdb::Family::SansSerif];
        let id = db
            .query(&query(&families))
            .or_else(|| db.faces().next().map(|f| f.id))
            .ok_or_else(|| PosterError::rasterization("no usable font installed on this system"))?;
        Self::from_db(&db, id)
            .ok_or_else(|| PosterError::rasterization("system font data is unavailable"))
    }

    fn from_db(db: &usvg::fontdb::Database, id: usvg::fontdb::ID) -> Option<Self> {
        let path = db.face(id).and_then(|face| match &face.source {
            usvg::fontdb::Source::File(p) => Some(p.clone()),
            usvg::fontdb::Source::SharedFile(p, _) => Some(p.clone()),
            usvg::fontdb::Source::Binary(_) => None,
        });
        let (bytes, index) = db.with_face_data(id, |data, index| (data.to_vec(), index))?;
        Some(Self {
            bytes: Arc::new(bytes),
            index,
            path,
        })
    }

    /// `file://` URL for an on-disk face.
    pub fn file_url(&self) -> Option<String> {
        let path = self.path.as_ref()?;
        let abs = std::fs::canonicalize(path).unwrap_or_else(|_| path.clone());
        Some(format!("file://{}", abs.display()))
    }
}

/// Installed families tried after the configured files, CJK first, then emoji and symbols.
const FALLBACK_FAMILIES: &[&str] = &[
    "Noto Sans CJK SC",
    "Noto Sans SC",
    "Source Han Sans SC",
    "PingFang SC",
    "Microsoft YaHei",
    "WenQuanYi Micro Hei",
    "Droid Sans Fallback",
    "Noto Color Emoji",
    "Apple Color Emoji",
    "Segoe UI Emoji",
    "Noto Emoji",
    "Symbola",
    "DejaVu Sans",
];

/// Ordered faces for per-glyph fallback: configured files first, then installed fallbacks.
#[derive(Clone, Debug, Default)]
pub struct FontSet {
    faces: Vec<FontSource>,
}

impl FontSet {
    /// Every readable candidate in order, then the installed fallback families.
    ///
    /// When nothing at all is found the system sans-serif face is used, with a warning.
    pub fn discover(candidates: &[PathBuf]) -> Self {
        let mut set = Self::default();
        for path in candidates.iter().filter(|p| p.is_file()) {
            match FontSource::from_file(path) {
                Ok(font) => set.push(font),
                Err(err) => tracing::warn!(error = %err, "skipping unreadable font"),
            }
        }
        let configured = set.faces.len();

        let db = system_db();
        for &name in FALLBACK_FAMILIES {
            let families = [usvg::fontdb::Family::Name(name)];
            if let Some(font) = db
                .query(&query(&families))
                .and_then(|id| FontSource::from_db(&db, id))
            {
                set.push(font);
            }
        }

        if set.faces.is_empty() {
            tracing::warn!(
                tried = candidates.len(),
                "no configured font found, falling back to system sans-serif"
            );
            match FontSource::system_sans_serif() {
                Ok(font) => set.push(font),
                Err(err) => tracing::warn!(error = %err, "no system font either"),
            }
        } else if configured == 0 {
            tracing::warn!(
                tried = candidates.len(),
                "no configured font found, using installed fallback families"
            );
        }
        tracing::debug!(configured, faces = set.faces.len(), "font set ready");
        set
    }

    pub fn from_sources(sources: impl IntoIterator<Item = FontSource>) -> Self {
        let mut set = Self::default();
        for font in sources {
            set.push(font);
        }
        set
    }

    /// Skips files already present; a collection is registered whole.
    fn push(&mut self, font: FontSource) {
        let dup = font.path.is_some() && self.faces.iter().any(|f| f.path == font.path);
        if !dup {
            self.faces.push(font);
        }
    }

    pub fn faces(&self) -> &[FontSource] {
        &self.faces
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

fn system_db() -> usvg::fontdb::Database {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    db
}

fn query<'a>(families: &'a [usvg::fontdb::Family<'a>]) -> usvg::fontdb::Query<'a> {
    usvg::fontdb::Query {
        families,
        weight: usvg::fontdb::Weight::NORMAL,
        stretch: usvg::fontdb::Stretch::Normal,
        style: usvg::fontdb::Style::Normal,
    }
}
