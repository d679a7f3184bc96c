use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_categories: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub sku: String,
    pub price: f64,
    pub vendor_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<serde_json::Value>,
    /// Create requests carry `mediaUrl` entries; list responses may echo a
    /// `url` per media record. Both shapes share this type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<MediaRef>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A persisted media record from `GET /products/{id}/media`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMedia {
    pub id: i64,
    pub media_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cuisine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub cuisine_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewFetchResponse {
    pub local_url: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Thin blocking client for the marketplace REST API. Cheap to clone behind
/// an `Arc`; every method is safe to call from a worker thread.
pub struct ApiClient {
    client: Client,
    base: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .context("Could not initialize HTTP client for the Souk API")?;
        Ok(Self {
            client,
            base: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Resolves a backend-relative path against the API base; absolute URLs
    /// and plain local paths pass through untouched.
    pub fn absolute_url(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else if reference.starts_with('/') {
            format!("{}{reference}", self.base)
        } else {
            reference.to_string()
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub fn list_vendors(&self, search: Option<&str>) -> Result<Vec<Vendor>> {
        let path = match search {
            Some(term) if !term.trim().is_empty() => {
                format!("/vendors?q={}", encode_query_value(term.trim()))
            }
            _ => "/vendors".to_string(),
        };
        self.get_json(&path)
    }

    pub fn create_vendor(&self, vendor: &Vendor) -> Result<Vendor> {
        self.post_json("/vendors", vendor)
    }

    pub fn update_vendor(&self, vendor_id: i64, vendor: &Vendor) -> Result<Vendor> {
        self.put_json(&format!("/vendors/{vendor_id}"), vendor)
    }

    pub fn delete_vendor(&self, vendor_id: i64) -> Result<()> {
        self.delete(&format!("/vendors/{vendor_id}"))
    }

    pub fn list_products(&self) -> Result<Vec<Product>> {
        self.get_json("/products")
    }

    pub fn create_product(&self, product: &Product) -> Result<Product> {
        self.post_json("/products", product)
    }

    pub fn update_product(&self, product_id: i64, product: &Product) -> Result<Product> {
        self.put_json(&format!("/products/{product_id}"), product)
    }

    pub fn delete_product(&self, product_id: i64) -> Result<()> {
        self.delete(&format!("/products/{product_id}"))
    }

    pub fn list_product_media(&self, product_id: i64) -> Result<Vec<ProductMedia>> {
        self.get_json(&format!("/products/{product_id}/media"))
    }

    pub fn delete_product_media(&self, product_id: i64, media_id: i64) -> Result<()> {
        self.delete(&format!("/products/{product_id}/media/{media_id}"))
    }

    pub fn upload_product_media(&self, product_id: i64, file: &Path) -> Result<()> {
        let url = self.url(&format!("/products/{product_id}/media/upload"));
        let form = multipart::Form::new()
            .file("file", file)
            .with_context(|| format!("Could not read upload file {}", file.display()))?;
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .with_context(|| format!("HTTP request failed for {url}"))?;
        Self::check_status(response, &url)?;
        Ok(())
    }

    pub fn fetch_preview(&self, remote_url: &str) -> Result<PreviewFetchResponse> {
        self.post_json("/preview/fetch", &serde_json::json!({ "url": remote_url }))
    }

    pub fn list_customers(&self) -> Result<Vec<Customer>> {
        self.get_json("/customers")
    }

    pub fn create_customer(&self, customer: &Customer) -> Result<Customer> {
        self.post_json("/customers", customer)
    }

    pub fn update_customer(&self, customer_id: i64, customer: &Customer) -> Result<Customer> {
        self.put_json(&format!("/customers/{customer_id}"), customer)
    }

    pub fn delete_customer(&self, customer_id: i64) -> Result<()> {
        self.delete(&format!("/customers/{customer_id}"))
    }

    pub fn list_cuisines(&self) -> Result<Vec<Cuisine>> {
        self.get_json("/cuisines")
    }

    pub fn create_cuisine(&self, cuisine: &Cuisine) -> Result<Cuisine> {
        self.post_json("/cuisines", cuisine)
    }

    pub fn update_cuisine(&self, cuisine_id: i64, cuisine: &Cuisine) -> Result<Cuisine> {
        self.put_json(&format!("/cuisines/{cuisine_id}"), cuisine)
    }

    pub fn delete_cuisine(&self, cuisine_id: i64) -> Result<()> {
        self.delete(&format!("/cuisines/{cuisine_id}"))
    }

    /// Raw media bytes for on-screen textures. `url` must already be
    /// absolute (see [`ApiClient::absolute_url`]).
    pub fn download_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("HTTP request failed for {url}"))?;
        let response = Self::check_status(response, url)?;
        response
            .bytes()
            .map(|body| body.to_vec())
            .with_context(|| format!("Could not read response body from {url}"))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("HTTP request failed for {url}"))?;
        Self::read_json(response, &url)
    }

    fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .with_context(|| format!("HTTP request failed for {url}"))?;
        Self::read_json(response, &url)
    }

    fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path);
        let response = self
            .client
            .put(&url)
            .json(body)
            .send()
            .with_context(|| format!("HTTP request failed for {url}"))?;
        Self::read_json(response, &url)
    }

    fn delete(&self, path: &str) -> Result<()> {
        let url = self.url(path);
        let response = self
            .client
            .delete(&url)
            .send()
            .with_context(|| format!("HTTP request failed for {url}"))?;
        Self::check_status(response, &url)?;
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T> {
        let response = Self::check_status(response, url)?;
        response
            .json::<T>()
            .with_context(|| format!("Could not parse JSON response from {url}"))
    }

    fn check_status(response: Response, url: &str) -> Result<Response> {
        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .unwrap_or_else(|_| String::from("unable to read error body"));
            bail!("HTTP {status} for {url}: {detail}");
        }
        Ok(response)
    }
}

fn encode_query_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => {
                encoded.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new("http://localhost:8080/").expect("client should build")
    }

    #[test]
    fn base_url_is_normalized_without_trailing_slash() {
        assert_eq!(client().base_url(), "http://localhost:8080");
    }

    #[test]
    fn absolute_url_resolves_backend_relative_paths() {
        let api = client();
        assert_eq!(
            api.absolute_url("/uploads/previews/abc.png"),
            "http://localhost:8080/uploads/previews/abc.png"
        );
        assert_eq!(
            api.absolute_url("https://cdn.example.com/x.png"),
            "https://cdn.example.com/x.png"
        );
        assert_eq!(api.absolute_url("local-file.png"), "local-file.png");
    }

    #[test]
    fn encode_query_value_escapes_reserved_characters() {
        assert_eq!(encode_query_value("plain"), "plain");
        assert_eq!(encode_query_value("spice & co"), "spice%20%26%20co");
        assert_eq!(encode_query_value("a.b-c_d~e"), "a.b-c_d~e");
    }

    #[test]
    fn product_media_deserializes_from_api_shape() {
        let json = r#"{"id":12,"mediaUrl":"/uploads/p/12.png","mediaType":"IMAGE","description":"front"}"#;
        let media: ProductMedia = serde_json::from_str(json).expect("media should parse");
        assert_eq!(media.id, 12);
        assert_eq!(media.media_url, "/uploads/p/12.png");
        assert_eq!(media.media_type.as_deref(), Some("IMAGE"));
        assert_eq!(media.description.as_deref(), Some("front"));
    }

    #[test]
    fn product_serializes_camel_case_and_skips_empty_fields() {
        let product = Product {
            id: None,
            name: "Dosa".to_string(),
            sku: "DOSA-1".to_string(),
            price: 4.5,
            vendor_id: 3,
            available: Some(true),
            category_details: None,
            schedule: None,
            media: Some(vec![MediaRef {
                media_url: Some("https://cdn/x.png".to_string()),
                ..MediaRef::default()
            }]),
        };
        let json = serde_json::to_value(&product).expect("product should serialize");
        assert_eq!(json["vendorId"], 3);
        assert_eq!(json["media"][0]["mediaUrl"], "https://cdn/x.png");
        assert!(json.get("id").is_none());
        assert!(json.get("categoryDetails").is_none());
    }

    #[test]
    fn preview_fetch_response_tolerates_missing_metadata() {
        let full: PreviewFetchResponse = serde_json::from_str(
            r#"{"localUrl":"/uploads/previews/h.png","mimeType":"image/png","size":2048}"#,
        )
        .expect("full response should parse");
        assert_eq!(full.local_url, "/uploads/previews/h.png");
        assert_eq!(full.size, Some(2048));

        let sparse: PreviewFetchResponse =
            serde_json::from_str(r#"{"localUrl":"/uploads/previews/h.png"}"#)
                .expect("sparse response should parse");
        assert!(sparse.mime_type.is_none());
        assert!(sparse.size.is_none());
    }
}
