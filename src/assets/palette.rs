use std::path::Path;

use crate::foundation::error::{PosterError, PosterResult};
use crate::paint::color::{Stops, parse_palette};

/// One named palette as stored in the palette file.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PaletteEntry {
    pub id: i64,
    pub name: String,
    /// `#RRGGBB` stops in gradient order.
    pub colors: Vec<String>,
}

impl PaletteEntry {
    pub fn stops(&self) -> PosterResult<Stops> {
        parse_palette(&self.colors)
    }
}

/// Palette file contents: a JSON array of [`PaletteEntry`].
#[derive(Clone, Debug, Default)]
pub struct PaletteTable {
    entries: Vec<PaletteEntry>,
}

impl PaletteTable {
    pub fn load(path: &Path) -> PosterResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PosterError::io(path, e))?;
        Self::from_json(&text).map_err(|e| match e {
            PosterError::Other(err) => {
                PosterError::Other(err.context(format!("parse palette file '{}'", path.display())))
            }
            other => other,
        })
    }

    pub fn from_json(text: &str) -> PosterResult<Self> {
        let entries: Vec<PaletteEntry> =
            serde_json::from_str(text).map_err(|e| PosterError::Other(e.into()))?;
        Ok(Self { entries })
    }

    /// First entry with a matching id.
    pub fn find(&self, id: i64) -> PosterResult<&PaletteEntry> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .ok_or(PosterError::Lookup(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgb;

    const SAMPLE: &str = r##"[
        {"id": 1, "name": "墨", "colors": ["#000000", "#FFFFFF"]},
        {"id": 2, "name": "first", "colors": ["#FF0000"]},
        {"id": 2, "name": "shadowed", "colors": ["#00FF00"]}
    ]"##;

    #[test]
    fn finds_first_matching_id() {
        let table = PaletteTable::from_json(SAMPLE).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.find(2).unwrap().name, "first");
        let stops = table.find(1).unwrap().stops().unwrap();
        assert_eq!(stops.as_slice(), &[Rgb::BLACK, Rgb::WHITE]);
    }

    #[test]
    fn unknown_id_is_lookup_error() {
        let table = PaletteTable::from_json(SAMPLE).unwrap();
        let err = table.find(99).unwrap_err();
        assert!(matches!(err, PosterError::Lookup(99)));
        assert_eq!(err.to_string(), "No color found with ID 99");
    }

    #[test]
    fn load_reports_path_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = PaletteTable::load(&missing).unwrap_err();
        assert!(matches!(err, PosterError::Io { .. }));
        assert!(err.to_string().contains("nope.json"));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        let err = PaletteTable::load(&bad).unwrap_err();
        assert!(format!("{err:#}").contains("bad.json"), "{err:#}");
    }
}
