use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use crate::error::{DashboardError, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx status into `HttpStatus`.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(DashboardError::HttpStatus(self.status))
        }
    }
}

/// Something that can perform an HTTP GET. The browser implementation is
/// [`FetchTransport`]; tests plug in canned responses.
#[allow(async_fn_in_trait)]
pub trait HttpTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// `window.fetch` based transport.
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchTransport;

impl HttpTransport for FetchTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let window = web_sys::window()
            .ok_or_else(|| DashboardError::Network("no window available".to_string()))?;

        let response = JsFuture::from(window.fetch_with_str(url))
            .await
            .map_err(|e| DashboardError::Network(js_error_text(&e)))?;
        let response: Response = response
            .dyn_into()
            .map_err(|_| DashboardError::Network("fetch did not return a Response".to_string()))?;

        let status = response.status();
        let text_promise = response
            .text()
            .map_err(|e| DashboardError::Network(js_error_text(&e)))?;
        let body = JsFuture::from(text_promise)
            .await
            .map_err(|e| DashboardError::Network(js_error_text(&e)))?
            .as_string()
            .unwrap_or_default();

        Ok(HttpResponse { status, body })
    }
}

fn js_error_text(value: &wasm_bindgen::JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| "Failed to fetch".to_string())
}

/// Append `key=value` pairs to `base`, skipping empty values.
pub fn with_query(base: &str, params: &[(&str, String)]) -> String {
    let query = params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&");
    if query.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, query)
    }
}

// application/x-www-form-urlencoded, as URLSearchParams does it
const FORM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'*');

fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, FORM).to_string().replace("%20", "+")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_skips_empty_values() {
        let url = with_query(
            "http://localhost:8000/api/geostories/",
            &[
                ("page", "2".to_string()),
                ("search", "".to_string()),
                ("location_name", "Athi River".to_string()),
                ("author_email", "a+b@x.org".to_string()),
            ],
        );
        assert_eq!(
            url,
            "http://localhost:8000/api/geostories/?page=2&location_name=Athi+River&author_email=a%2Bb%40x.org"
        );
        assert_eq!(with_query("http://h/x/", &[("search", String::new())]), "http://h/x/");
    }

    #[test]
    fn test_query_encodes_non_ascii() {
        let url = with_query("http://h/x/", &[("location_name", "Murang'a 50%".to_string())]);
        assert_eq!(url, "http://h/x/?location_name=Murang%27a+50%25");
        let url = with_query("http://h/x/", &[("search", "café".to_string())]);
        assert_eq!(url, "http://h/x/?search=caf%C3%A9");
    }

    #[test]
    fn test_status_mapping() {
        let ok = HttpResponse { status: 204, body: String::new() };
        assert!(ok.error_for_status().is_ok());
        let missing = HttpResponse { status: 404, body: String::new() };
        assert_eq!(missing.error_for_status(), Err(DashboardError::HttpStatus(404)));
    }
}
