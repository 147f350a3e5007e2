use std::fmt;
use std::str::FromStr;

use geo::{Coord, CoordsIter, Geometry, LineString, MapCoords};
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::features::GeoFeature;
use crate::projection::to_mercator;
use crate::viewport::{Pixel, Viewport};

/// Extra pixels around a marker or stroke that still count as a hit.
pub const HIT_TOLERANCE: f64 = 2.0;

/// Overlay layers in z-order, bottom first.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum LayerId {
    Routes,
    CountyRoutes,
    WaterPoints,
    Places,
    Recaps,
    Location,
}

impl LayerId {
    pub const STACK: [LayerId; 6] = [
        LayerId::Routes,
        LayerId::CountyRoutes,
        LayerId::WaterPoints,
        LayerId::Places,
        LayerId::Recaps,
        LayerId::Location,
    ];

    /// Layers whose features can be clicked to open the popup.
    pub fn is_interactive(&self) -> bool {
        matches!(
            self,
            LayerId::CountyRoutes | LayerId::WaterPoints | LayerId::Places | LayerId::Recaps
        )
    }

    pub fn z_index(&self) -> usize {
        *self as usize
    }

    pub fn key(&self) -> &'static str {
        match self {
            LayerId::Routes => "routes",
            LayerId::CountyRoutes => "countyRoutes",
            LayerId::WaterPoints => "waterPoints",
            LayerId::Places => "places",
            LayerId::Recaps => "recaps",
            LayerId::Location => "location",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LayerId::Routes => "Tour Route",
            LayerId::CountyRoutes => "County Routes",
            LayerId::WaterPoints => "Water Points",
            LayerId::Places => "API Places",
            LayerId::Recaps => "Daily Recaps",
            LayerId::Location => "My Location",
        }
    }

    fn visible_by_default(&self) -> bool {
        !matches!(self, LayerId::Recaps)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for LayerId {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayerId::STACK
            .into_iter()
            .find(|l| l.key() == s)
            .ok_or_else(|| DashboardError::UnknownLayer(s.to_string()))
    }
}

/// What a rendered feature represents.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MarkerKind {
    RouteLine,
    StartingPoint,
    Waypoint,
    WaterPoint,
    Place,
    Recap,
    CurrentLocation,
    Accuracy,
    InitialLocation,
}

impl MarkerKind {
    /// The user's own position markers are never selectable.
    pub fn is_location(&self) -> bool {
        matches!(
            self,
            MarkerKind::CurrentLocation | MarkerKind::Accuracy | MarkerKind::InitialLocation
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FeatureStyle {
    #[serde(rename_all = "camelCase")]
    Circle {
        radius: f64,
        fill: String,
        stroke: String,
        stroke_width: f64,
    },
    Line { color: String, width: f64 },
    #[serde(rename_all = "camelCase")]
    Icon { src: String, scale: f64, size: f64 },
}

impl FeatureStyle {
    fn circle(radius: f64, fill: &str, stroke: &str, stroke_width: f64) -> Self {
        FeatureStyle::Circle {
            radius,
            fill: fill.to_string(),
            stroke: stroke.to_string(),
            stroke_width,
        }
    }

    /// Pixel reach of the style around its geometry.
    fn reach(&self) -> f64 {
        match self {
            FeatureStyle::Circle { radius, .. } => *radius,
            FeatureStyle::Line { width, .. } => width / 2.0,
            FeatureStyle::Icon { size, scale, .. } => size * scale / 2.0,
        }
    }
}

/// Default look for each kind of marker.
pub fn style_for(kind: MarkerKind) -> FeatureStyle {
    match kind {
        MarkerKind::RouteLine => FeatureStyle::Line {
            color: "blue".to_string(),
            width: 3.0,
        },
        MarkerKind::StartingPoint => FeatureStyle::circle(10.0, "#00ff00", "#fff", 2.0),
        MarkerKind::Waypoint => FeatureStyle::circle(8.0, "#ff6600", "#fff", 2.0),
        MarkerKind::WaterPoint => FeatureStyle::circle(8.0, "#1e90ff", "#fff", 2.0),
        MarkerKind::Place => FeatureStyle::circle(8.0, "#6B8E23", "#fff", 2.0),
        MarkerKind::Recap => FeatureStyle::circle(8.0, "#8b5cf6", "#fff", 2.0),
        MarkerKind::CurrentLocation => FeatureStyle::circle(8.0, "#3b82f6", "#ffffff", 3.0),
        MarkerKind::Accuracy => {
            FeatureStyle::circle(8.0, "rgba(59, 130, 246, 0.1)", "rgba(59, 130, 246, 0.3)", 1.0)
        }
        MarkerKind::InitialLocation => FeatureStyle::Icon {
            src: "https://cdn-icons-png.flaticon.com/512/2362/2362465.png".to_string(),
            scale: 0.1,
            size: 512.0,
        },
    }
}

/// A feature placed on the map: source attributes plus its geometry in
/// Web Mercator and how it is drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayFeature {
    pub kind: MarkerKind,
    pub source: GeoFeature,
    pub projected: Geometry<f64>,
    pub style: FeatureStyle,
    pub label: Option<String>,
}

impl OverlayFeature {
    pub fn new(kind: MarkerKind, source: GeoFeature) -> Self {
        let projected = source.geometry.map_coords(to_mercator);
        let label = match kind {
            MarkerKind::RouteLine | MarkerKind::Recap => None,
            _ => source.label().map(str::to_string),
        };
        Self {
            kind,
            projected,
            style: style_for(kind),
            label,
            source,
        }
    }

    pub fn with_style(mut self, style: FeatureStyle) -> Self {
        self.style = style;
        self
    }

    /// Every vertex of the projected geometry, in screen pixels.
    pub fn pixels(&self, viewport: &Viewport) -> Vec<Pixel> {
        let mut out = Vec::new();
        visit_lines(&self.projected, &mut |line: &LineString<f64>| {
            out.extend(line.coords().map(|c| viewport.coordinate_to_pixel(*c)));
        });
        if let Geometry::Point(p) = &self.projected {
            out.push(viewport.coordinate_to_pixel(p.0));
        }
        if let Geometry::MultiPoint(mp) = &self.projected {
            out.extend(mp.iter().map(|p| viewport.coordinate_to_pixel(p.0)));
        }
        out
    }

    /// Does the drawn feature cover `pixel`?
    pub fn hit(&self, viewport: &Viewport, pixel: Pixel) -> bool {
        let reach = self.style.reach() + HIT_TOLERANCE;
        match &self.projected {
            Geometry::Point(p) => viewport.coordinate_to_pixel(p.0).distance(&pixel) <= reach,
            Geometry::MultiPoint(mp) => mp
                .iter()
                .any(|p| viewport.coordinate_to_pixel(p.0).distance(&pixel) <= reach),
            other => {
                let mut best = f64::INFINITY;
                visit_lines(other, &mut |line: &LineString<f64>| {
                    for seg in line.lines() {
                        let a = viewport.coordinate_to_pixel(seg.start);
                        let b = viewport.coordinate_to_pixel(seg.end);
                        best = best.min(segment_distance(pixel, a, b));
                    }
                });
                best <= reach
            }
        }
    }
}

fn visit_lines(geometry: &Geometry<f64>, f: &mut impl FnMut(&LineString<f64>)) {
    match geometry {
        Geometry::LineString(ls) => f(ls),
        Geometry::MultiLineString(mls) => mls.iter().for_each(|ls| f(ls)),
        Geometry::Line(l) => f(&LineString::new(vec![l.start, l.end])),
        Geometry::Polygon(p) => {
            f(p.exterior());
            p.interiors().iter().for_each(|ls| f(ls));
        }
        Geometry::MultiPolygon(mp) => mp.iter().for_each(|p| {
            f(p.exterior());
            p.interiors().iter().for_each(|ls| f(ls));
        }),
        Geometry::GeometryCollection(gc) => gc.iter().for_each(|g| visit_lines(g, f)),
        Geometry::Rect(r) => f(r.to_polygon().exterior()),
        Geometry::Triangle(t) => f(t.to_polygon().exterior()),
        Geometry::Point(_) | Geometry::MultiPoint(_) => {}
    }
}

fn segment_distance(p: Pixel, a: Pixel, b: Pixel) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return p.distance(&a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    p.distance(&Pixel::new(a.x + t * dx, a.y + t * dy))
}

/// One entry of the overlay stack.
#[derive(Clone, Debug)]
pub struct OverlayLayer {
    pub id: LayerId,
    pub visible: bool,
    features: Vec<OverlayFeature>,
}

impl OverlayLayer {
    pub fn new(id: LayerId) -> Self {
        Self {
            id,
            visible: id.visible_by_default(),
            features: Vec::new(),
        }
    }

    pub fn features(&self) -> &[OverlayFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn clear(&mut self) {
        self.features.clear();
    }

    pub fn replace(&mut self, features: Vec<OverlayFeature>) {
        self.features = features;
    }

    pub fn push(&mut self, feature: OverlayFeature) {
        self.features.push(feature);
    }

    pub fn remove_kind(&mut self, kind: MarkerKind) {
        self.features.retain(|f| f.kind != kind);
    }

    pub fn count_kind(&self, kind: MarkerKind) -> usize {
        self.features.iter().filter(|f| f.kind == kind).count()
    }

    pub fn projected_coords(&self) -> impl Iterator<Item = Coord<f64>> + '_ {
        self.features.iter().flat_map(|f| f.projected.coords_iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Point};
    use geojson::JsonObject;

    fn view() -> Viewport {
        Viewport::new(to_mercator(Coord { x: 36.8, y: -1.3 }), 12.0, 800.0, 600.0)
    }

    #[test]
    fn test_stack_order() {
        assert!(LayerId::Routes.z_index() < LayerId::Places.z_index());
        assert!(LayerId::Places.z_index() < LayerId::Location.z_index());
        assert!(!LayerId::Location.is_interactive());
        assert!(!LayerId::Routes.is_interactive());
        assert_eq!("countyRoutes".parse::<LayerId>().unwrap(), LayerId::CountyRoutes);
        assert!("nope".parse::<LayerId>().is_err());
    }

    #[test]
    fn test_point_hit_radius() {
        let vp = view();
        let f = OverlayFeature::new(
            MarkerKind::Place,
            GeoFeature::new(Geometry::Point(Point::new(36.8, -1.3)), JsonObject::new()),
        );
        let center = Pixel::new(400.0, 300.0);
        assert!(f.hit(&vp, center));
        assert!(f.hit(&vp, Pixel::new(409.0, 300.0)));
        assert!(!f.hit(&vp, Pixel::new(411.0, 300.0)));
    }

    #[test]
    fn test_line_hit_uses_segment_distance() {
        let vp = view();
        let line = LineString::from(vec![(36.7, -1.3), (36.9, -1.3)]);
        let f = OverlayFeature::new(
            MarkerKind::RouteLine,
            GeoFeature::new(Geometry::LineString(line), JsonObject::new()),
        );
        assert!(f.hit(&vp, Pixel::new(420.0, 301.0)));
        assert!(!f.hit(&vp, Pixel::new(420.0, 310.0)));
        assert_eq!(f.pixels(&vp).len(), 2);
    }

    #[test]
    fn test_remove_kind() {
        let mut layer = OverlayLayer::new(LayerId::Location);
        let point = GeoFeature::new(Geometry::Point(Point::new(0.0, 0.0)), JsonObject::new());
        layer.push(OverlayFeature::new(MarkerKind::Accuracy, point.clone()));
        layer.push(OverlayFeature::new(MarkerKind::CurrentLocation, point.clone()));
        layer.push(OverlayFeature::new(MarkerKind::InitialLocation, point));
        layer.remove_kind(MarkerKind::Accuracy);
        assert_eq!(layer.len(), 2);
        assert_eq!(layer.count_kind(MarkerKind::CurrentLocation), 1);
        assert!(!OverlayLayer::new(LayerId::Recaps).visible);
    }
}
