//! Feature-id grid: a side channel recording which feature was drawn last at every pixel.

use std::collections::BTreeMap;

use ahash::AHashMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::expression::Value;
use crate::feature::Feature;

/// Attribute used as the key of a feature in a [`GridEncoding`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum GridKey {
    /// Feature id.
    #[default]
    Id,
    /// Value of the named attribute. Features without the attribute fall back to their id.
    Attribute(String),
}

/// Surface of feature ids with the same pixel layout as the image it's rendered with.
#[derive(Debug, Clone)]
pub struct FeatureGrid {
    width: u32,
    height: u32,
    key: GridKey,
    cells: Vec<Option<i64>>,
    features: AHashMap<i64, GridFeature>,
}

#[derive(Debug, Clone)]
struct GridFeature {
    key: String,
    attributes: BTreeMap<String, Value>,
}

/// Compact text representation of a [`FeatureGrid`].
///
/// Every row of `grid` is a string with one character per cell. The character's code point
/// indexes `keys` (code point 32 is index 0, `"` and `\` are skipped), and `data` maps the keys
/// to the feature attributes. Index 0 is always the empty key `""` for cells without a
/// feature.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridEncoding {
    /// Rows of encoded cells.
    pub grid: Vec<String>,
    /// Feature keys in code point order.
    pub keys: Vec<String>,
    /// Selected attributes of every key except the empty one.
    pub data: BTreeMap<String, BTreeMap<String, Value>>,
}

/// Character encoding the key with the given index.
fn code_point(index: usize) -> Option<char> {
    let mut code = index as u32 + 32;
    if code >= 34 {
        code += 1;
    }
    if code >= 92 {
        code += 1;
    }
    // Surrogates are not characters.
    if code >= 0xD800 {
        code += 0x800;
    }

    char::from_u32(code)
}

impl FeatureGrid {
    /// Creates an empty grid.
    pub fn new(width: u32, height: u32, key: GridKey) -> Self {
        Self {
            width,
            height,
            key,
            cells: vec![None; width as usize * height as usize],
            features: AHashMap::new(),
        }
    }

    /// Grid width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Key attribute.
    pub fn key(&self) -> &GridKey {
        &self.key
    }

    /// Feature id at the cell.
    pub fn get(&self, x: u32, y: u32) -> Option<i64> {
        if x >= self.width || y >= self.height {
            return None;
        }

        self.cells[y as usize * self.width as usize + x as usize]
    }

    /// Assigns the cell to the feature. Later writes replace earlier ones.
    pub fn set(&mut self, x: u32, y: u32, id: i64) {
        if x >= self.width || y >= self.height {
            return;
        }

        self.cells[y as usize * self.width as usize + x as usize] = Some(id);
    }

    /// Remembers the key and attributes of a feature drawn into the grid.
    pub fn add_feature(&mut self, feature: &Feature, fields: &[String]) {
        let key = match &self.key {
            GridKey::Id => feature.id().to_string(),
            GridKey::Attribute(name) => match feature.get(name) {
                Some(value) if !value.is_null() => value.to_text(),
                _ => feature.id().to_string(),
            },
        };

        let attributes = fields
            .iter()
            .filter_map(|name| Some((name.clone(), feature.get(name)?.clone())))
            .collect();

        self.features
            .insert(feature.id(), GridFeature { key, attributes });
    }

    /// Number of distinct features drawn into the grid.
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Encodes the grid, taking every `resolution`-th cell of every `resolution`-th row.
    pub fn encode(&self, resolution: u32, fields: &[String]) -> GridEncoding {
        let resolution = resolution.max(1);
        let mut keys = vec![String::new()];
        let mut codes: AHashMap<&str, char> = AHashMap::new();
        codes.insert("", ' ');
        let mut data = BTreeMap::new();

        let mut grid = vec![];
        for y in (0..self.height).step_by(resolution as usize) {
            let mut row = String::new();
            for x in (0..self.width).step_by(resolution as usize) {
                let feature = self.get(x, y).and_then(|id| self.features.get(&id));
                let Some(feature) = feature else {
                    row.push(' ');
                    continue;
                };

                let code = match codes.get(feature.key.as_str()) {
                    Some(code) => *code,
                    None => {
                        let Some(code) = code_point(keys.len()) else {
                            row.push(' ');
                            continue;
                        };
                        codes.insert(&feature.key, code);
                        keys.push(feature.key.clone());
                        let attributes = feature
                            .attributes
                            .iter()
                            .filter(|(name, _)| fields.contains(name))
                            .map(|(name, value)| (name.clone(), value.clone()))
                            .collect();
                        data.insert(feature.key.clone(), attributes);
                        code
                    }
                };
                row.push(code);
            }
            grid.push(row);
        }

        GridEncoding { grid, keys, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_debug_snapshot;

    #[test]
    fn code_points_skip_quote_and_backslash() {
        assert_eq!(code_point(0), Some(' '));
        assert_eq!(code_point(1), Some('!'));
        assert_eq!(code_point(2), Some('#'));
        assert_eq!(code_point(58), Some('['));
        assert_eq!(code_point(59), Some(']'));
    }

    #[test]
    fn code_points_skip_surrogates() {
        assert_eq!(code_point(55261), Some('\u{D7FF}'));
        assert_eq!(code_point(55262), Some('\u{E000}'));
        assert!((0..70_000).all(|i| code_point(i).is_some()));
    }

    #[test]
    fn encode_downsamples() {
        let mut grid = FeatureGrid::new(4, 4, GridKey::Attribute("name".into()));
        grid.add_feature(
            &Feature::new(0)
                .with_attribute("name", "zero")
                .with_attribute("pop", 10),
            &["name".into(), "pop".into()],
        );
        grid.add_feature(&Feature::new(-5), &[]);
        for x in 0..4 {
            grid.set(x, 0, 0);
        }
        grid.set(2, 2, -5);
        grid.set(3, 3, 0);

        let fields = vec!["pop".to_string()];
        let encoded = grid.encode(2, &fields);
        assert_debug_snapshot!(encoded, @r###"
        GridEncoding {
            grid: [
                "!!",
                " #",
            ],
            keys: [
                "",
                "zero",
                "-5",
            ],
            data: {
                "-5": {},
                "zero": {
                    "pop": Int(
                        10,
                    ),
                },
            },
        }
        "###);
    }

    #[test]
    fn later_writes_win() {
        let mut grid = FeatureGrid::new(2, 1, GridKey::Id);
        grid.set(0, 0, 1);
        grid.set(0, 0, 2);
        grid.set(5, 5, 3);
        assert_eq!(grid.get(0, 0), Some(2));
        assert_eq!(grid.get(1, 0), None);
        assert_eq!(grid.get(5, 5), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn encoding_serializes_to_json() {
        let mut grid = FeatureGrid::new(1, 1, GridKey::Id);
        grid.add_feature(&Feature::new(7).with_attribute("a", "b"), &["a".into()]);
        grid.set(0, 0, 7);
        let json = serde_json::to_value(grid.encode(1, &["a".into()])).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"grid": ["!"], "keys": ["", "7"], "data": {"7": {"a": "b"}}})
        );
    }
}
