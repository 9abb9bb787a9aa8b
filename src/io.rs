//! External collaborator interfaces (spec §1, §6): raw-file I/O, the
//! colour palette, and geospatial projection. The core only ever reaches
//! these through traits; concrete file formats are out of scope.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{EngineError, EngineResult};
use crate::grid::{ValueGrid, BAD_DATA};

/// An RGB colour used only to paint cluster ids; the engine never
/// interprets its components.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

/// Reads a raw gridded field from an external, unspecified on-disk format.
pub trait GridReader {
    fn read(&self, path: &Path) -> EngineResult<ValueGrid>;
}

/// Reads an ordered colour palette from an external, unspecified format.
pub trait PaletteReader {
    fn read(&self, path: &Path) -> EngineResult<Vec<Color>>;
}

/// Maps grid (x,y) to geographic (lon,lat). A sibling verification mode's
/// reprojection and distance-to-land lookups build on top of this but are
/// out of scope for the core.
pub trait Projection {
    fn to_lonlat(&self, x: f64, y: f64) -> (f64, f64);
}

/// A projection that performs no transform; useful for tests and for
/// fields whose (x,y) already are (lon,lat) in degrees.
#[derive(Copy, Clone, Debug, Default)]
pub struct IdentityProjection;

impl Projection for IdentityProjection {
    fn to_lonlat(&self, x: f64, y: f64) -> (f64, f64) {
        (x, y)
    }
}

/// On-disk shape of a [`JsonGridReader`] field: a flat row-major
/// (y-slowest) buffer plus its dimensions.
#[derive(Deserialize)]
struct JsonGrid {
    nx: usize,
    ny: usize,
    #[serde(default)]
    bad_data: Option<f64>,
    data: Vec<f64>,
}

/// Reads a gridded field from a small JSON manifest, the concrete format
/// the CLI binary ships with (spec §6 leaves the on-disk representation
/// unspecified; NetCDF/plotting I/O is explicitly out of scope).
#[derive(Copy, Clone, Debug, Default)]
pub struct JsonGridReader;

impl GridReader for JsonGridReader {
    fn read(&self, path: &Path) -> EngineResult<ValueGrid> {
        let bytes = fs::read(path)
            .map_err(|e| EngineError::InputReadFailed(format!("{}: {e}", path.display())))?;
        let raw: JsonGrid = serde_json::from_slice(&bytes)
            .map_err(|e| EngineError::InputReadFailed(format!("{}: {e}", path.display())))?;
        if raw.data.len() != raw.nx * raw.ny {
            return Err(EngineError::InputReadFailed(format!(
                "{}: data length {} does not match nx*ny ({}*{})",
                path.display(),
                raw.data.len(),
                raw.nx,
                raw.ny
            )));
        }
        let mut grid = ValueGrid::from_values(raw.nx, raw.ny, raw.data);
        if let Some(bad) = raw.bad_data {
            if bad != BAD_DATA {
                for (x, y) in grid.grid().iter_xy().collect::<Vec<_>>() {
                    if grid.get(x, y) == bad {
                        grid.set(x, y, BAD_DATA);
                    }
                }
            }
        }
        Ok(grid)
    }
}

/// On-disk shape of a [`JsonPaletteReader`] palette: a flat list of
/// `[r,g,b]` triples in cluster-index order.
#[derive(Deserialize)]
struct JsonPalette {
    colors: Vec<[u8; 3]>,
}

/// Reads an ordered colour palette from a small JSON manifest, the
/// concrete format the CLI binary ships with.
#[derive(Copy, Clone, Debug, Default)]
pub struct JsonPaletteReader;

impl PaletteReader for JsonPaletteReader {
    fn read(&self, path: &Path) -> EngineResult<Vec<Color>> {
        let bytes = fs::read(path)
            .map_err(|e| EngineError::InputReadFailed(format!("{}: {e}", path.display())))?;
        let raw: JsonPalette = serde_json::from_slice(&bytes)
            .map_err(|e| EngineError::InputReadFailed(format!("{}: {e}", path.display())))?;
        Ok(raw.colors.into_iter().map(|[r, g, b]| Color(r, g, b)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_palette_reader_parses_colors() {
        let dir = std::env::temp_dir();
        let path = dir.join("modeverify_test_palette.json");
        fs::write(&path, r#"{"colors":[[255,0,0],[0,255,0]]}"#).unwrap();
        let palette = JsonPaletteReader.read(&path).unwrap();
        assert_eq!(palette, vec![Color(255, 0, 0), Color(0, 255, 0)]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn json_grid_reader_parses_dimensions_and_data() {
        let dir = std::env::temp_dir();
        let path = dir.join("modeverify_test_grid.json");
        fs::write(&path, r#"{"nx":2,"ny":1,"data":[1.0,2.0]}"#).unwrap();
        let grid = JsonGridReader.read(&path).unwrap();
        assert_eq!(grid.nx(), 2);
        assert_eq!(grid.ny(), 1);
        assert_eq!(grid.get(0, 0), 1.0);
        assert_eq!(grid.get(1, 0), 2.0);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn json_grid_reader_rejects_mismatched_length() {
        let dir = std::env::temp_dir();
        let path = dir.join("modeverify_test_grid_bad.json");
        fs::write(&path, r#"{"nx":2,"ny":2,"data":[1.0,2.0]}"#).unwrap();
        let err = JsonGridReader.read(&path).unwrap_err();
        assert!(matches!(err, EngineError::InputReadFailed(_)));
        let _ = fs::remove_file(&path);
    }
}
