use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

/// Tile providers the user can switch between.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum BasemapKind {
    #[default]
    Osm,
    OpenStreet,
    Satellite,
    Terrain,
    Dark,
}

impl BasemapKind {
    pub const ALL: [BasemapKind; 5] = [
        BasemapKind::Osm,
        BasemapKind::OpenStreet,
        BasemapKind::Satellite,
        BasemapKind::Terrain,
        BasemapKind::Dark,
    ];

    pub fn url_template(&self) -> &'static str {
        match self {
            BasemapKind::Osm => "https://{a-c}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            BasemapKind::OpenStreet => "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
            BasemapKind::Satellite => {
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
            }
            BasemapKind::Terrain => "https://stamen-tiles.a.ssl.fastly.net/terrain/{z}/{x}/{y}.jpg",
            BasemapKind::Dark => "https://{a-c}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BasemapKind::Osm => "OSM Default",
            BasemapKind::OpenStreet => "OpenStreet",
            BasemapKind::Satellite => "Satellite",
            BasemapKind::Terrain => "Terrain",
            BasemapKind::Dark => "Dark",
        }
    }

    /// Stamen terrain tiles were retired upstream.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, BasemapKind::Terrain)
    }

    pub fn key(&self) -> &'static str {
        match self {
            BasemapKind::Osm => "osm",
            BasemapKind::OpenStreet => "openstreet",
            BasemapKind::Satellite => "satellite",
            BasemapKind::Terrain => "terrain",
            BasemapKind::Dark => "dark",
        }
    }
}

impl fmt::Display for BasemapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for BasemapKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BasemapKind::ALL
            .into_iter()
            .find(|k| k.key() == s)
            .ok_or_else(|| DashboardError::UnknownBasemap(s.to_string()))
    }
}
