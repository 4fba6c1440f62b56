use serde::{Deserialize, Serialize};

use crate::SettingsError;

/// Default edge length of the square tiles staged in shared memory.
pub const TILE_SIZE: u32 = 32;
/// Default ratio between the tile size and the number of unit rows per cube.
pub const ROW_BLOCK_FACTOR: u32 = 4;
/// Default number of units per cube for the one-unit-per-column kernels.
pub const UNITS_PER_CUBE: u32 = 256;

/// Launch parameters shared by every kernel of the crate.
///
/// Shared memory tiles hold `tile_size * (tile_size + 1)` elements, the extra column being
/// padding against bank conflicts on the transposed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelSettings {
    /// Edge length of the tiles used by the transpose and vector engines.
    pub tile_size: u32,
    /// A cube has `tile_size / row_block_factor` rows of `tile_size` units.
    pub row_block_factor: u32,
    /// Cube size of the copy and scale engines.
    pub units_per_cube: u32,
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            row_block_factor: ROW_BLOCK_FACTOR,
            units_per_cube: UNITS_PER_CUBE,
        }
    }
}

impl KernelSettings {
    /// Parse settings from a TOML document, missing keys keep their default value.
    ///
    /// ```toml
    /// tile_size = 16
    /// row_block_factor = 2
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Self =
            toml::from_str(content).map_err(|err| SettingsError::Parse(err.to_string()))?;
        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.tile_size.is_power_of_two() || !(8..=32).contains(&self.tile_size) {
            return Err(SettingsError::TileSize(self.tile_size));
        }

        if self.row_block_factor == 0 || self.tile_size % self.row_block_factor != 0 {
            return Err(SettingsError::RowBlockFactor {
                factor: self.row_block_factor,
                tile_size: self.tile_size,
            });
        }

        if !self.units_per_cube.is_power_of_two() || !(32..=1024).contains(&self.units_per_cube) {
            return Err(SettingsError::UnitsPerCube(self.units_per_cube));
        }

        Ok(())
    }

    /// Number of unit rows in a tiled cube.
    pub fn block_rows(&self) -> u32 {
        self.tile_size / self.row_block_factor
    }
}
