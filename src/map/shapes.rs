use std::{collections::HashMap, fs::File, io::BufReader, path::Path};

use pathfinder_geometry::vector::{vec2f, Vector2F};
use serde::Deserialize;

use crate::errors::{Error, Result};

pub const DEFAULT_SHAPE_ID: &str = "default";

const BUILTIN_SHAPES: &str = include_str!("../../resources/icons/shapes.json");

/// Icon outline on a 16 px grid. `offset` moves the path so that the icon is
/// centered on the point it marks.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: String,
    pub path: String,
    pub offset: Vector2F,
}

impl Shape {
    /// Last resort when a provider has no default shape either.
    pub fn fallback() -> Self {
        Shape {
            id: DEFAULT_SHAPE_ID.to_string(),
            path: "M 8,4 A 4,4 0 1 0 8,12 A 4,4 0 1 0 8,4 Z".to_string(),
            offset: vec2f(-8.0, -8.0),
        }
    }

    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_SHAPE_ID
    }
}

/// Looks shapes up by identifier. Sprite storage lives behind this seam.
pub trait ShapeProvider {
    fn lookup(&self, shape_id: &str) -> Result<Shape>;

    /// The default shape, or the built-in circle when the provider lacks one.
    fn default_shape(&self) -> Shape {
        self.lookup(DEFAULT_SHAPE_ID).unwrap_or_else(|_| Shape::fallback())
    }
}

#[derive(Deserialize)]
struct ShapeRecord {
    path: String,
    #[serde(default = "default_offset")]
    offset: [f32; 2],
}

fn default_offset() -> [f32; 2] {
    [-8.0, -8.0]
}

#[derive(Deserialize)]
struct ShapeFile {
    shapes: HashMap<String, ShapeRecord>,
}

/// In-memory shape set loaded from a JSON document.
#[derive(Debug, Clone, Default)]
pub struct ShapeLibrary {
    shapes: HashMap<String, Shape>,
}

impl ShapeLibrary {
    pub fn from_json(text: &str) -> Result<Self> {
        let file: ShapeFile = serde_json::from_str(text)?;
        Ok(Self::from_records(file))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let file: ShapeFile = serde_json::from_reader(reader)?;
        Ok(Self::from_records(file))
    }

    /// Shapes shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_SHAPES)
    }

    fn from_records(file: ShapeFile) -> Self {
        let shapes = file.shapes
            .into_iter()
            .map(|(id, record)| {
                let shape = Shape {
                    id: id.clone(),
                    path: record.path,
                    offset: vec2f(record.offset[0], record.offset[1]),
                };
                (id, shape)
            })
            .collect();
        ShapeLibrary { shapes }
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }
}

impl ShapeProvider for ShapeLibrary {
    fn lookup(&self, shape_id: &str) -> Result<Shape> {
        self.shapes
            .get(shape_id)
            .cloned()
            .ok_or_else(|| Error::shape_not_found(shape_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_builtin_has_default_and_digits() {
        let library = ShapeLibrary::builtin().unwrap();
        assert!(library.lookup(DEFAULT_SHAPE_ID).unwrap().is_default());
        for digit in 0..10 {
            assert!(library.lookup(&format!("digit_{}", digit)).is_ok());
        }
    }

    #[test]
    fn test_missing_shape() {
        let library = ShapeLibrary::builtin().unwrap();
        assert_eq!(library.lookup("no_such_shape").unwrap_err().kind, ErrorKind::ShapeNotFound);
    }

    #[test]
    fn test_default_shape_falls_back() {
        let library = ShapeLibrary::default();
        assert_eq!(library.default_shape(), Shape::fallback());
    }
}
