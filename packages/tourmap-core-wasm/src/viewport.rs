use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};

/// Metres per pixel at zoom 0 for 256px Web Mercator tiles.
pub const RESOLUTION_Z0: f64 = 156_543.033_928_040_97;

/// A pixel position inside the map container, origin top-left.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

impl Pixel {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Pixel) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Target of an animated view change, handed to the renderer.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewAnimation {
    /// Web Mercator
    pub center: [f64; 2],
    pub zoom: f64,
    pub duration_ms: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Web Mercator metres
    pub center: Coord<f64>,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Viewport {
    pub fn new(center: Coord<f64>, zoom: f64, width: f64, height: f64) -> Self {
        Self {
            center,
            zoom,
            width,
            height,
            min_zoom: 0.0,
            max_zoom: 28.0,
        }
    }

    pub fn with_zoom_bounds(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
        self
    }

    pub fn resolution(&self) -> f64 {
        RESOLUTION_Z0 / 2.0_f64.powf(self.zoom)
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    pub fn set_center_zoom(&mut self, center: Coord<f64>, zoom: f64) {
        self.center = center;
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    pub fn pixel_to_coordinate(&self, pixel: Pixel) -> Coord<f64> {
        let res = self.resolution();
        Coord {
            x: self.center.x + (pixel.x - self.width / 2.0) * res,
            y: self.center.y - (pixel.y - self.height / 2.0) * res,
        }
    }

    pub fn coordinate_to_pixel(&self, coord: Coord<f64>) -> Pixel {
        let res = self.resolution();
        Pixel {
            x: (coord.x - self.center.x) / res + self.width / 2.0,
            y: (self.center.y - coord.y) / res + self.height / 2.0,
        }
    }

    /// Center on `extent` and pick the largest zoom that keeps it inside the
    /// padded viewport, never exceeding `max_zoom`.
    pub fn fit_extent(&mut self, extent: Rect<f64>, padding: f64, max_zoom: f64) {
        let avail_w = (self.width - 2.0 * padding).max(1.0);
        let avail_h = (self.height - 2.0 * padding).max(1.0);
        let res = (extent.width() / avail_w).max(extent.height() / avail_h);

        let ceiling = max_zoom.min(self.max_zoom);
        let zoom = if res > 0.0 {
            (RESOLUTION_Z0 / res).log2().min(ceiling)
        } else {
            // Single point or coincident points
            ceiling
        };
        self.set_center_zoom(extent.center(), zoom);
    }

    pub fn animation_to(&self, center: Coord<f64>, zoom: f64, duration_ms: u32) -> ViewAnimation {
        ViewAnimation {
            center: [center.x, center.y],
            zoom: zoom.clamp(self.min_zoom, self.max_zoom),
            duration_ms,
        }
    }
}
