//! # Backend Client
//!
//! The [`PharmacyBackend`] trait is everything the session layer needs from
//! the REST backend; [`HttpBackend`] implements it over `reqwest`.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Method  Path                     Body          Response               │
//! │  ──────  ────                     ────          ────────               │
//! │  GET     {base}/products          -             [Product + nested]     │
//! │  GET     {base}/branches          -             [Branch]               │
//! │  GET     {base}/users?role=customer -           [Customer]             │
//! │  POST    {base}/sales             SaleRequest   SaleReceipt            │
//! │                                                                         │
//! │  non-2xx → { "message": "..." | ["...", "..."] } → ApiError::Rejected  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Requests are sent once. There is no retry and no queue; a failed sale
//! leaves the decision to the operator.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};
use url::Url;

use pharmapos_core::{Branch, Customer, Product, SaleReceipt, SaleRequest};

use crate::config::ApiConfig;
use crate::dto::{BranchDto, CustomerDto, ErrorBody, ProductDto, SaleReceiptDto};
use crate::error::{ApiError, ApiResult};

/// Read and write access to the pharmacy backend.
#[async_trait]
pub trait PharmacyBackend: Send + Sync {
    /// Catalog with nested promotions, batches and inventory.
    async fn list_products(&self) -> ApiResult<Vec<Product>>;

    async fn list_branches(&self) -> ApiResult<Vec<Branch>>;

    /// Users with the customer role, for attaching to a POS sale.
    async fn list_customers(&self) -> ApiResult<Vec<Customer>>;

    /// Submits a sale. The backend prices it and decrements stock.
    async fn create_sale(&self, request: &SaleRequest) -> ApiResult<SaleReceipt>;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// `reqwest`-based backend client.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpBackend {
    /// Builds a client from validated configuration.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(HttpBackend {
            client: builder.build()?,
            base_url: config.parsed_base_url()?,
            token: None,
        })
    }

    /// Sends `Authorization: Bearer <token>` on every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        self.authorize(request).send().await.map_err(|e| {
            error!(error = %e, "Backend request failed");
            ApiError::from(e)
        })
    }

    async fn fetch_list<D, T>(&self, path: &str, query: &[(&str, &str)], entity: &str) -> ApiResult<Vec<T>>
    where
        D: DeserializeOwned,
        T: TryFrom<D, Error = ApiError>,
    {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");

        let response = self.send(self.client.get(url).query(query)).await?;
        let dtos: Vec<D> = read_json(response, entity).await?;
        dtos.into_iter().map(T::try_from).collect()
    }
}

#[async_trait]
impl PharmacyBackend for HttpBackend {
    async fn list_products(&self) -> ApiResult<Vec<Product>> {
        let products = self.fetch_list::<ProductDto, Product>("products", &[], "product").await?;
        debug!(count = products.len(), "Products fetched");
        Ok(products)
    }

    async fn list_branches(&self) -> ApiResult<Vec<Branch>> {
        self.fetch_list::<BranchDto, Branch>("branches", &[], "branch")
            .await
    }

    async fn list_customers(&self) -> ApiResult<Vec<Customer>> {
        self.fetch_list::<CustomerDto, Customer>("users", &[("role", "customer")], "customer")
            .await
    }

    async fn create_sale(&self, request: &SaleRequest) -> ApiResult<SaleReceipt> {
        let url = self.endpoint("sales")?;
        debug!(%url, lines = request.lines.len(), "POST sale");

        let response = self.send(self.client.post(url).json(request)).await?;
        let dto: SaleReceiptDto = read_json(response, "sale").await?;
        let receipt = SaleReceipt::try_from(dto)?;

        info!(sale_id = %receipt.id, total = %receipt.total(), "Sale created");
        Ok(receipt)
    }
}

/// Reads a body as `T` on success, or as the backend's error message.
async fn read_json<T: DeserializeOwned>(response: Response, entity: &str) -> ApiResult<T> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        return Err(rejection(status, &body));
    }

    serde_json::from_slice(&body).map_err(|e| ApiError::decode(entity, e))
}

fn rejection(status: StatusCode, body: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .map(ErrorBody::into_message)
        .ok()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Request failed with status {}", status));

    warn!(status = status.as_u16(), %message, "Backend rejected request");
    ApiError::Rejected {
        status: status.as_u16(),
        message,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode as HttpStatus};
    use axum::extract::Query;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use pharmapos_core::SaleRequestLine;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn serve(router: Router) -> ApiConfig {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        ApiConfig::new(format!("http://{}/api", addr))
    }

    fn catalog() -> Value {
        json!([{
            "id": "a",
            "name": "Paracetamol 500mg",
            "price": "10.00",
            "inventory": [{ "branchId": "north", "totalStock": 5 }]
        }, {
            "id": "b",
            "name": "Vitamin C 1g",
            "price": 20,
            "promotions": [{ "id": "promo-b", "discountPercent": 50 }],
            "inventory": [{ "branchId": "north", "totalStock": 5 }]
        }])
    }

    #[tokio::test]
    async fn test_list_products() {
        let config = serve(Router::new().route("/api/products", get(|| async { Json(catalog()) }))).await;
        let backend = HttpBackend::new(&config).unwrap();

        let products = backend.list_products().await.unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].price_cents, 1000);
        assert_eq!(products[1].promotions[0].discount_bps, 5000);
    }

    #[tokio::test]
    async fn test_customers_query_and_bearer_token() {
        let router = Router::new().route(
            "/api/users",
            get(|headers: HeaderMap, Query(params): Query<HashMap<String, String>>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if auth != "Bearer s3cret" || params.get("role").map(String::as_str) != Some("customer") {
                    return (HttpStatus::UNAUTHORIZED, Json(json!({ "message": "Unauthorized" })));
                }
                (HttpStatus::OK, Json(json!([{ "id": "u-1", "name": "Ana Silva" }])))
            }),
        );
        let config = serve(router).await;

        let anonymous = HttpBackend::new(&config).unwrap();
        let err = anonymous.list_customers().await.unwrap_err();
        assert_eq!(err.status(), Some(401));

        let backend = anonymous.with_token(Some("s3cret".to_string()));
        let customers = backend.list_customers().await.unwrap();
        assert_eq!(customers[0].name, "Ana Silva");
    }

    #[tokio::test]
    async fn test_create_sale_sends_ids_and_quantities_only() {
        let router = Router::new().route(
            "/api/sales",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(
                    body,
                    json!({
                        "customerId": null,
                        "lines": [
                            { "productId": "a", "quantity": 1 },
                            { "productId": "b", "quantity": 2 }
                        ]
                    })
                );
                Json(json!({
                    "id": "sale-1",
                    "total": "30.00",
                    "customerId": null,
                    "lines": [
                        { "productId": "a", "quantity": 1, "unitPrice": "10.00" },
                        { "productId": "b", "quantity": 2, "unitPrice": "10.00" }
                    ]
                }))
            }),
        );
        let backend = HttpBackend::new(&serve(router).await).unwrap();

        let request = SaleRequest {
            customer_id: None,
            lines: vec![
                SaleRequestLine { product_id: "a".into(), quantity: 1 },
                SaleRequestLine { product_id: "b".into(), quantity: 2 },
            ],
        };
        let receipt = backend.create_sale(&request).await.unwrap();
        assert_eq!(receipt.id, "sale-1");
        assert_eq!(receipt.total().cents(), 3000);
    }

    #[tokio::test]
    async fn test_rejection_message_is_verbatim() {
        let router = Router::new().route(
            "/api/sales",
            post(|| async {
                (
                    HttpStatus::BAD_REQUEST,
                    Json(json!({ "message": "Insufficient stock for Vitamin C 1g" })),
                )
            }),
        );
        let backend = HttpBackend::new(&serve(router).await).unwrap();

        let err = backend
            .create_sale(&SaleRequest { customer_id: None, lines: vec![] })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Insufficient stock for Vitamin C 1g");
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_rejection_without_json_body() {
        let router = Router::new().route(
            "/api/branches",
            get(|| async { (HttpStatus::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let backend = HttpBackend::new(&serve(router).await).unwrap();

        let err = backend.list_branches().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_decode_error() {
        let router = Router::new().route(
            "/api/products",
            get(|| async { Json(json!([{ "id": "a", "name": "X", "price": "abc" }])) }),
        );
        let backend = HttpBackend::new(&serve(router).await).unwrap();

        let err = backend.list_products().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpBackend::new(&ApiConfig::new(format!("http://{}/api", addr))).unwrap();
        let err = backend.list_branches().await.unwrap_err();
        assert!(err.is_transport());
    }
}
