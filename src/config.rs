use std::{fs, path::Path, time::Duration};

use egui::Vec2;
use serde::Deserialize;

use crate::error::{EditorError, Result};

/// Tunables of the editor core. Every section falls back to its defaults, so a
/// config file only needs the values it wants to change.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub dims: Dims,
    pub zoom: ZoomConfig,
    pub hit: HitConfig,
    pub history: HistoryConfig,
    pub layout: LayoutConfig,
    pub toolbar: ToolbarConfig,
}

/// Node metrics in world units.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Dims {
    pub node_width: f32,
    pub header_height: f32,
    pub row_height: f32,
    pub footer_height: f32,
    /// Extra space below the last output row.
    pub content_padding: f32,
    /// Gap between the header and the first output row.
    pub socket_top_padding: f32,
    pub socket_radius: f32,
    pub corner_radius: f32,
    pub grid_size: f32,
    /// Half-width of the resize band, in screen pixels.
    pub resize_margin: f32,
    pub min_node_width: f32,
}

impl Default for Dims {
    fn default() -> Self {
        Self {
            node_width: 420.0,
            header_height: 32.0,
            row_height: 33.0,
            footer_height: 32.0,
            content_padding: 10.0,
            socket_top_padding: 5.0,
            socket_radius: 8.0,
            corner_radius: 6.0,
            grid_size: 500.0,
            resize_margin: 8.0,
            min_node_width: 200.0,
        }
    }
}

impl Dims {
    /// Height needed to show the header, every output row and the footer.
    pub fn content_height(&self, output_count: usize) -> f32 {
        self.header_height
            + output_count as f32 * self.row_height
            + self.footer_height
            + self.content_padding
    }

    /// Rendered height: the stored height never hides output rows.
    pub fn effective_height(&self, stored_height: f32, output_count: usize) -> f32 {
        stored_height.max(self.content_height(output_count))
    }

    pub fn min_size(&self, output_count: usize) -> Vec2 {
        Vec2::new(self.min_node_width, self.content_height(output_count))
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ZoomConfig {
    pub min: f32,
    pub max: f32,
    pub step_in: f32,
    pub step_out: f32,
    pub initial: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min: 0.05,
            max: 2.0,
            step_in: 1.1,
            step_out: 0.9,
            initial: 0.5,
        }
    }
}

/// Hit-test tolerances. Everything here is in screen pixels.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HitConfig {
    /// Socket hit radius at zoom 1.0, scaled by the current zoom.
    pub socket_radius: f32,
    pub connection_threshold: f32,
    pub bezier_samples: usize,
    /// Marquees smaller than this on both axes count as a click.
    pub marquee_min: f32,
    /// How far a released connection may land from a node and still attach.
    pub snap_distance: f32,
}

impl Default for HitConfig {
    fn default() -> Self {
        Self {
            socket_radius: 25.0,
            connection_threshold: 5.0,
            bezier_samples: 20,
            marquee_min: 5.0,
            snap_distance: 50.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
    pub debounce_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            debounce_ms: 1000,
        }
    }
}

impl HistoryConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    pub start_x: f32,
    pub start_y: f32,
    pub column_step: f32,
    pub row_gap: f32,
    pub island_gap: f32,
    /// Screen point the imported root is framed at.
    pub anchor: [f32; 2],
    /// Vertical gap between existing content and a merged import.
    pub import_gap: f32,
    pub fit_padding: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            start_x: 300.0,
            start_y: 300.0,
            column_step: 500.0,
            row_gap: 100.0,
            island_gap: 250.0,
            anchor: [100.0, 100.0],
            import_gap: 150.0,
            fit_padding: 60.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolbarConfig {
    pub cascade_wrap: u32,
    pub cascade_step: f32,
    pub group_shift: f32,
}

impl Default for ToolbarConfig {
    fn default() -> Self {
        Self {
            cascade_wrap: 20,
            cascade_step: 30.0,
            group_shift: 100.0,
        }
    }
}

impl EditorConfig {
    pub fn load<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref())?;
        Self::load_from_str(&data)
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        toml::from_str::<EditorConfig>(toml_str).map_err(|e| EditorError::Config(e.to_string()))
    }
}
