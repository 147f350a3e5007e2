use thiserror::Error;
use wasm_bindgen::JsValue;

/// Reasons the browser geolocation API can refuse or fail a position request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("Location access denied by user")]
    PermissionDenied,
    #[error("Location information unavailable")]
    PositionUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Geolocation is not supported by this browser.")]
    Unsupported,
    #[error("Unknown location error")]
    Unknown(u16),
}

impl GeolocationError {
    /// Map a `GeolocationPositionError.code` to our error.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => GeolocationError::PermissionDenied,
            2 => GeolocationError::PositionUnavailable,
            3 => GeolocationError::Timeout,
            other => GeolocationError::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DashboardError {
    #[error("Failed to fetch: {0}")]
    Network(String),
    #[error("HTTP error! status: {0}")]
    HttpStatus(u16),
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("{0}")]
    Geolocation(#[from] GeolocationError),
    #[error("Map is not mounted")]
    NotMounted,
    #[error("Unknown layer {0}")]
    UnknownLayer(String),
    #[error("Unknown basemap {0}")]
    UnknownBasemap(String),
    #[error("Basemap {0} is not available")]
    DisabledBasemap(String),
}

impl DashboardError {
    /// Text shown in the status area of the page.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn is_network(&self) -> bool {
        matches!(self, DashboardError::Network(_))
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(e: serde_json::Error) -> Self {
        DashboardError::Parse(e.to_string())
    }
}

impl From<DashboardError> for JsValue {
    fn from(e: DashboardError) -> Self {
        JsValue::from_str(&e.user_message())
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geolocation_codes() {
        assert_eq!(GeolocationError::from_code(1), GeolocationError::PermissionDenied);
        assert_eq!(GeolocationError::from_code(2), GeolocationError::PositionUnavailable);
        assert_eq!(GeolocationError::from_code(3), GeolocationError::Timeout);
        assert_eq!(
            GeolocationError::from_code(9).to_string(),
            "Unknown location error"
        );
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            DashboardError::HttpStatus(404).user_message(),
            "HTTP error! status: 404"
        );
        let e: DashboardError = GeolocationError::Timeout.into();
        assert_eq!(e.user_message(), "Location request timed out");
        assert!(DashboardError::Network("offline".into()).is_network());
    }
}
