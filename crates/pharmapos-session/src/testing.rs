//! In-memory backend and fixtures for session tests.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use pharmapos_api::{ApiError, ApiResult, PharmacyBackend};
use pharmapos_core::{
    Branch, Customer, Inventory, PricingResolver, Product, ProductStatus, SaleReceipt,
    SaleReceiptLine, SaleRequest,
};

pub(crate) fn product(id: &str, name: &str, price_cents: i64, stock: i64) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        price_cents,
        requires_prescription: false,
        status: ProductStatus::Active,
        category_id: None,
        promotions: vec![],
        batches: vec![],
        inventory: vec![Inventory {
            branch_id: "north".to_string(),
            total_stock: stock,
        }],
    }
}

#[derive(Default)]
struct FakeState {
    products: Vec<Product>,
    sales: Vec<SaleRequest>,
    reject_with: Option<String>,
    fail_reads: bool,
    hold_sales: bool,
}

/// Backend that prices sales like the real one and decrements stock.
#[derive(Default)]
pub(crate) struct FakeBackend {
    state: Mutex<FakeState>,
    release: Notify,
}

impl FakeBackend {
    pub(crate) fn new(products: Vec<Product>) -> Self {
        FakeBackend {
            state: Mutex::new(FakeState {
                products,
                ..FakeState::default()
            }),
            release: Notify::new(),
        }
    }

    pub(crate) fn reject_sales(&self, message: Option<&str>) {
        self.state.lock().unwrap().reject_with = message.map(str::to_string);
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    /// Sales wait for [`FakeBackend::release_sale`] before answering.
    pub(crate) fn hold_sales(&self, hold: bool) {
        self.state.lock().unwrap().hold_sales = hold;
    }

    pub(crate) fn release_sale(&self) {
        self.release.notify_one();
    }

    pub(crate) fn sales(&self) -> Vec<SaleRequest> {
        self.state.lock().unwrap().sales.clone()
    }
}

#[async_trait]
impl PharmacyBackend for FakeBackend {
    async fn list_products(&self) -> ApiResult<Vec<Product>> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(ApiError::ConnectionFailed("backend offline".to_string()));
        }
        Ok(state.products.clone())
    }

    async fn list_branches(&self) -> ApiResult<Vec<Branch>> {
        Ok(vec![Branch {
            id: "north".to_string(),
            name: "North Branch".to_string(),
            address: None,
        }])
    }

    async fn list_customers(&self) -> ApiResult<Vec<Customer>> {
        Ok(vec![Customer {
            id: "cust-1".to_string(),
            name: "Ana Silva".to_string(),
            email: Some("ana@example.com".to_string()),
        }])
    }

    async fn create_sale(&self, request: &SaleRequest) -> ApiResult<SaleReceipt> {
        let hold = self.state.lock().unwrap().hold_sales;
        if hold {
            self.release.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.reject_with {
            return Err(ApiError::Rejected {
                status: 400,
                message: message.clone(),
            });
        }

        let resolver = PricingResolver::default();
        let mut lines = Vec::new();
        for line in &request.lines {
            let product = state
                .products
                .iter_mut()
                .find(|p| p.id == line.product_id)
                .ok_or_else(|| ApiError::Rejected {
                    status: 404,
                    message: format!("Product {} not found", line.product_id),
                })?;
            if let Some(inventory) = product.inventory.first_mut() {
                inventory.total_stock -= line.quantity;
            }
            lines.push(SaleReceiptLine {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price_cents: resolver.resolve(product).final_price.cents(),
            });
        }

        state.sales.push(request.clone());
        Ok(SaleReceipt {
            id: format!("sale-{}", state.sales.len()),
            total_cents: lines.iter().map(|l| l.unit_price_cents * l.quantity).sum(),
            customer_id: request.customer_id.clone(),
            created_at: None,
            lines,
        })
    }
}
