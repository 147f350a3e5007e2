// Typed payloads returned by the dashboard REST API
use geo::{Geometry, Point};
use geojson::JsonObject;
use serde::{Deserialize, Deserializer, Serialize};

use crate::features::GeoFeature;

/// The API sends decimals either as JSON numbers or as numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn flexible_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrString>::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrString::Number(n)) if n.is_finite() => Some(n),
        Some(NumberOrString::Text(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    })
}

/// Counts arrive as integers, whole floats (`12.0`) or numeric strings.
/// Anything negative, fractional or out of range reads as missing.
fn flexible_uint<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let raw = Option::<NumberOrString>::deserialize(deserializer)?;
    let n = match raw {
        Some(NumberOrString::Number(n)) => Some(n),
        Some(NumberOrString::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    };
    Ok(n
        .filter(|n| n.is_finite() && *n >= 0.0 && n.fract() == 0.0 && *n <= u64::MAX as f64)
        .and_then(|n| T::try_from(n as u64).ok()))
}

fn flexible_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(flexible_uint(deserializer)?.unwrap_or(0))
}

/// One day of the tour as recorded by the field team.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct DailyRecap {
    #[serde(deserialize_with = "flexible_uint")]
    pub id: Option<u64>,
    pub date: Option<String>,
    #[serde(deserialize_with = "flexible_uint")]
    pub day_number: Option<u32>,
    pub title: Option<String>,
    pub location_name: Option<String>,
    pub county: Option<String>,
    #[serde(deserialize_with = "flexible_f64")]
    pub latitude: Option<f64>,
    #[serde(deserialize_with = "flexible_f64")]
    pub longitude: Option<f64>,
    #[serde(deserialize_with = "flexible_f64")]
    pub distance_km: Option<f64>,
    #[serde(deserialize_with = "flexible_f64")]
    pub duration_hours: Option<f64>,
    #[serde(deserialize_with = "flexible_f64")]
    pub avg_speed_kmh: Option<f64>,
    #[serde(deserialize_with = "flexible_f64")]
    pub elevation_gain_m: Option<f64>,
    #[serde(deserialize_with = "flexible_f64")]
    pub calories_burned: Option<f64>,
    #[serde(deserialize_with = "flexible_f64")]
    pub co2_saved_kg: Option<f64>,
    #[serde(deserialize_with = "flexible_uint")]
    pub riders_count: Option<u32>,
    #[serde(deserialize_with = "flexible_uint")]
    pub participants: Option<u32>,
    #[serde(deserialize_with = "flexible_uint")]
    pub trees_planted: Option<u32>,
    #[serde(deserialize_with = "flexible_uint")]
    pub schools_visited: Option<u32>,
    #[serde(deserialize_with = "flexible_uint")]
    pub students_engaged: Option<u32>,
    #[serde(deserialize_with = "flexible_uint")]
    pub communities_visited: Option<u32>,
    #[serde(deserialize_with = "flexible_uint")]
    pub people_reached: Option<u32>,
    #[serde(deserialize_with = "flexible_uint")]
    pub water_points_visited: Option<u32>,
    #[serde(deserialize_with = "flexible_uint")]
    pub meetings_held: Option<u32>,
    #[serde(deserialize_with = "flexible_uint")]
    pub partners_engaged: Option<u32>,
    #[serde(deserialize_with = "flexible_uint")]
    pub media_mentions: Option<u32>,
    #[serde(deserialize_with = "flexible_uint")]
    pub social_media_reach: Option<u64>,
    #[serde(deserialize_with = "flexible_uint")]
    pub posts_published: Option<u32>,
    #[serde(deserialize_with = "flexible_uint")]
    pub photos_taken: Option<u32>,
    #[serde(deserialize_with = "flexible_uint")]
    pub videos_recorded: Option<u32>,
    #[serde(deserialize_with = "flexible_uint")]
    pub interviews_conducted: Option<u32>,
    pub weather: Option<String>,
    pub highlights: Option<String>,
    pub challenges: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    /// Anything the API adds that we do not model yet.
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl DailyRecap {
    /// Point feature at the recap location, or `None` when either
    /// coordinate is missing or unparseable.
    pub fn to_feature(&self) -> Option<GeoFeature> {
        let (lat, lon) = (self.latitude?, self.longitude?);
        let properties = match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => JsonObject::new(),
        };
        Some(GeoFeature::new(
            Geometry::Point(Point::new(lon, lat)),
            properties,
        ))
    }
}

/// Aggregate summary from `/daily-recaps/stats/`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct RecapStats {
    #[serde(deserialize_with = "flexible_count")]
    pub total_recaps: u32,
    #[serde(deserialize_with = "flexible_f64")]
    pub total_distance_km: Option<f64>,
    #[serde(deserialize_with = "flexible_f64")]
    pub average_distance_km: Option<f64>,
    #[serde(deserialize_with = "flexible_f64")]
    pub average_speed_kmh: Option<f64>,
    #[serde(deserialize_with = "flexible_f64")]
    pub total_co2_saved_kg: Option<f64>,
    #[serde(deserialize_with = "flexible_uint")]
    pub total_people_reached: Option<u64>,
    #[serde(deserialize_with = "flexible_uint")]
    pub total_trees_planted: Option<u64>,
    #[serde(deserialize_with = "flexible_uint")]
    pub total_schools_visited: Option<u64>,
    #[serde(deserialize_with = "flexible_uint")]
    pub total_participants: Option<u64>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

/// A published geostory (PDF plus metadata).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct GeoStory {
    pub id: serde_json::Value,
    pub title: String,
    pub author_email: String,
    pub location_name: Option<String>,
    pub created_at: Option<String>,
    pub thumbnail_url: Option<String>,
    pub pdf_url: Option<String>,
    pub description: Option<String>,
}

/// Django REST framework page envelope.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            count: 0,
            next: None,
            previous: None,
        }
    }
}

impl<T> Page<T> {
    /// `ceil(count / page_size)`, never less than one page.
    pub fn total_pages(&self, page_size: u32) -> u32 {
        if page_size == 0 {
            return 1;
        }
        (self.count.div_ceil(page_size as u64) as u32).max(1)
    }
}
