//! Checkout: hand the cart to the hosted payment page, then turn a paid
//! session (or a cash-on-delivery request) into an order.
//!
//! ```text
//! POST /checkout ──card──▶ create gateway session ──303──▶ hosted page
//!                                                          │ paid
//! GET /checkout/success?session_id=… ◀────────────────────┘
//!   └─▶ confirm paid ─▶ amount == snapshot ─▶ OrderGateway::create
//!       └─▶ drop the paid lines from the cart
//!
//! POST /checkout ──cash on delivery──▶ OrderGateway::create ─▶ clear cart
//! ```

use marketstall_core::cart::{CartItem, CartStore, LocalStorage, StorageError};
use marketstall_core::{CurrentUser, Email, NewOrder, Order, PaymentMethod, ShippingAddress};
use thiserror::Error;

use crate::backend::BackendError;
use crate::models::PendingCheckout;
use crate::services::email::AdminNotifier;
use crate::services::orders::{OrderBackend, OrderGateway};
use crate::services::payments::{
    CheckoutSession, CheckoutSessionRequest, LineItem, PaymentError, PaymentGateway,
};

/// Placeholder the gateway replaces with the session id on redirect.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Errors that abort a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Shipping address is missing {0}")]
    InvalidAddress(&'static str),

    #[error("Checkout session does not match")]
    SessionMismatch,

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Where the hosted page sends the buyer back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutUrls {
    /// `…/checkout/success?session_id={CHECKOUT_SESSION_ID}` and `…/cart`.
    #[must_use]
    pub fn from_base_url(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        Self {
            success_url: format!("{base_url}/checkout/success?session_id={SESSION_ID_PLACEHOLDER}"),
            cancel_url: format!("{base_url}/cart"),
        }
    }
}

/// Build the gateway request for a cart: one line item per cart entry,
/// priced at the effective unit price in minor units.
///
/// # Errors
///
/// Returns `PaymentError::EmptyCart` for an empty cart and
/// `PaymentError::Price` if a price cannot be charged.
pub fn build_session_request(
    items: &[CartItem],
    customer_email: &Email,
    urls: &CheckoutUrls,
    payment_method_types: &[String],
) -> Result<CheckoutSessionRequest, PaymentError> {
    if items.is_empty() {
        return Err(PaymentError::EmptyCart);
    }

    let line_items = items
        .iter()
        .map(|item| {
            Ok(LineItem {
                name: item.product.name.clone(),
                description: Some(item.product.description.trim())
                    .filter(|d| !d.is_empty())
                    .map(str::to_string),
                images: item.product.images.clone(),
                unit_amount: item.product.effective_price().to_minor_units()?,
                quantity: item.quantity,
            })
        })
        .collect::<Result<Vec<_>, PaymentError>>()?;

    Ok(CheckoutSessionRequest {
        customer_email: customer_email.as_str().to_string(),
        line_items,
        success_url: urls.success_url.clone(),
        cancel_url: urls.cancel_url.clone(),
        payment_method_types: payment_method_types.to_vec(),
        client_reference_id: None,
    })
}

/// A gateway session ready for redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedCheckout {
    pub session_id: String,
    pub url: String,
}

/// Sends buyers to the hosted payment page and confirms their payment.
pub struct CheckoutRedirector<P> {
    gateway: P,
    urls: CheckoutUrls,
    payment_method_types: Vec<String>,
}

impl<P: PaymentGateway> CheckoutRedirector<P> {
    #[must_use]
    pub fn new(gateway: P, base_url: &str) -> Self {
        Self {
            gateway,
            urls: CheckoutUrls::from_base_url(base_url),
            payment_method_types: vec!["card".to_string()],
        }
    }

    /// Open a hosted checkout session for `items`.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` if the cart is empty or the gateway refuses.
    #[tracing::instrument(skip_all, fields(user_id = %customer.id, lines = items.len()))]
    pub async fn begin(
        &self,
        items: &[CartItem],
        customer: &CurrentUser,
    ) -> Result<HostedCheckout, PaymentError> {
        let mut request = build_session_request(
            items,
            &customer.email,
            &self.urls,
            &self.payment_method_types,
        )?;
        request.client_reference_id = Some(customer.id.to_string());

        let session = self.gateway.create_session(&request).await?;
        let url = session.url.ok_or_else(|| {
            PaymentError::Parse("gateway session has no checkout URL".to_string())
        })?;

        tracing::info!(session_id = %session.id, "Checkout session created");
        Ok(HostedCheckout {
            session_id: session.id,
            url,
        })
    }

    /// Fetch a session and require that it has been paid.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotPaid` for unpaid sessions and the gateway's
    /// error if the session cannot be read.
    pub async fn confirm(&self, session_id: &str) -> Result<CheckoutSession, PaymentError> {
        let session = self.gateway.retrieve_session(session_id).await?;
        if !session.is_paid() {
            return Err(PaymentError::NotPaid(session.payment_status));
        }
        Ok(session)
    }

    /// Turn a paid gateway session into an order.
    ///
    /// The order is built from the cart snapshot taken when the buyer left
    /// for the hosted page, and only if the session charged exactly that
    /// snapshot. The paid quantities are then taken out of the live cart;
    /// anything added during payment stays.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::SessionMismatch` for a session this checkout
    /// did not open, `PaymentError::NotPaid` or `PaymentError::AmountMismatch`
    /// if the payment does not cover the snapshot, and the backend's error if
    /// the order cannot be created.
    #[tracing::instrument(skip_all, fields(user_id = %customer.id, session_id = %session_id))]
    pub async fn complete<B, N, S>(
        &self,
        orders: &OrderGateway<B, N>,
        cart: &mut CartStore<S>,
        customer: &CurrentUser,
        pending: PendingCheckout,
        session_id: &str,
    ) -> Result<Order, CheckoutError>
    where
        B: OrderBackend,
        N: AdminNotifier,
        S: LocalStorage,
    {
        if pending.gateway_session_id.as_deref() != Some(session_id) {
            return Err(CheckoutError::SessionMismatch);
        }

        let expected = build_session_request(
            &pending.items,
            &customer.email,
            &self.urls,
            &self.payment_method_types,
        )?
        .amount_total();

        let session = self.confirm(session_id).await?;
        if session.amount_total != Some(expected) {
            tracing::error!(
                expected,
                paid = ?session.amount_total,
                "Paid amount does not match checkout snapshot"
            );
            return Err(PaymentError::AmountMismatch {
                expected,
                paid: session.amount_total,
            }
            .into());
        }

        let new_order = NewOrder::from_cart(
            customer,
            &pending.items,
            pending.shipping_address,
            pending.payment_method,
        )
        .ok_or(CheckoutError::EmptyCart)?;
        let order = orders.create(new_order).await?;

        if let Err(e) = remove_purchased(cart, &pending.items).await {
            tracing::warn!(
                order_id = %order.id,
                error = %e,
                "Order placed but cart could not be updated"
            );
        }

        Ok(order)
    }
}

/// Take the purchased quantities out of the cart, dropping lines that reach
/// zero. A cart left empty is cleared like after a direct order.
async fn remove_purchased<S: LocalStorage>(
    cart: &mut CartStore<S>,
    purchased: &[CartItem],
) -> Result<(), StorageError> {
    for bought in purchased {
        let Some(current) = cart
            .items()
            .iter()
            .find(|item| item.product.id == bought.product.id)
            .map(|item| item.quantity)
        else {
            continue;
        };
        cart.set_quantity(
            bought.product.id,
            i64::from(current) - i64::from(bought.quantity),
        )
        .await?;
    }
    if cart.is_empty() {
        cart.clear().await?;
    }
    Ok(())
}

/// Snapshot the cart into an order, create it, then clear the cart.
///
/// The cart is left untouched if the order cannot be created.
///
/// # Errors
///
/// Returns `CheckoutError` if the cart is empty, the address is incomplete,
/// or the backend rejects the order.
pub async fn place_order<B, N, S>(
    orders: &OrderGateway<B, N>,
    cart: &mut CartStore<S>,
    customer: &CurrentUser,
    shipping_address: ShippingAddress,
    payment_method: PaymentMethod,
) -> Result<Order, CheckoutError>
where
    B: OrderBackend,
    N: AdminNotifier,
    S: LocalStorage,
{
    shipping_address
        .validate()
        .map_err(CheckoutError::InvalidAddress)?;

    let new_order = NewOrder::from_cart(customer, cart.items(), shipping_address, payment_method)
        .ok_or(CheckoutError::EmptyCart)?;

    let order = orders.create(new_order).await?;

    if let Err(e) = cart.clear().await {
        tracing::warn!(
            order_id = %order.id,
            error = %e,
            "Order placed but cart could not be cleared"
        );
    }

    Ok(order)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use marketstall_core::cart::MemoryStorage;
    use marketstall_core::{
        Price, Product, ProductCategory, ProductCondition, ProductId, PublishStatus, Role, UserId,
    };
    use rust_decimal::Decimal;

    use super::*;
    use crate::services::email::LogNotifier;
    use crate::services::orders::tests::{MemoryOrders, new_order};

    fn product(id: i64, price: Price, sale_price: Option<Price>) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Item {id}"),
            description: "  ".to_string(),
            images: vec![format!("https://cdn.example/{id}.jpg")],
            price,
            sale_price,
            category: ProductCategory::Home,
            condition: ProductCondition::Good,
            stock: 5,
            status: PublishStatus::Published,
            created_at: None,
        }
    }

    fn customer() -> CurrentUser {
        CurrentUser {
            id: UserId::new(uuid::Uuid::new_v4()),
            name: "Ada Buyer".to_string(),
            email: Email::parse("ada@example.com").unwrap(),
            role: Role::Customer,
        }
    }

    #[derive(Default)]
    struct FakeGateway {
        requests: Mutex<Vec<CheckoutSessionRequest>>,
        payment_status: String,
    }

    impl PaymentGateway for FakeGateway {
        async fn create_session(
            &self,
            request: &CheckoutSessionRequest,
        ) -> Result<CheckoutSession, PaymentError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(CheckoutSession {
                id: "cs_test_1".to_string(),
                url: Some("https://checkout.stripe.com/c/pay/cs_test_1".to_string()),
                payment_status: "unpaid".to_string(),
                client_reference_id: request.client_reference_id.clone(),
                amount_total: None,
            })
        }

        async fn retrieve_session(
            &self,
            session_id: &str,
        ) -> Result<CheckoutSession, PaymentError> {
            let amount_total = self
                .requests
                .lock()
                .unwrap()
                .last()
                .map(CheckoutSessionRequest::amount_total);
            Ok(CheckoutSession {
                id: session_id.to_string(),
                url: None,
                payment_status: self.payment_status.clone(),
                client_reference_id: None,
                amount_total,
            })
        }
    }

    fn paid_redirector() -> CheckoutRedirector<FakeGateway> {
        CheckoutRedirector::new(
            FakeGateway {
                payment_status: "paid".to_string(),
                ..FakeGateway::default()
            },
            "https://marketstall.shop",
        )
    }

    /// Open the hosted page for the cart as it is now and record what was sent.
    async fn leave_for_payment(
        redirector: &CheckoutRedirector<FakeGateway>,
        cart: &CartStore<MemoryStorage>,
        buyer: &CurrentUser,
    ) -> PendingCheckout {
        let hosted = redirector.begin(cart.items(), buyer).await.unwrap();
        PendingCheckout {
            shipping_address: new_order(buyer.id).shipping_address,
            payment_method: PaymentMethod::Card,
            items: cart.items().to_vec(),
            gateway_session_id: Some(hosted.session_id),
        }
    }

    #[test]
    fn test_request_uses_effective_price_in_minor_units() {
        let items = vec![
            CartItem {
                product: product(1, Price::from_cents(10000), Some(Price::from_cents(8000))),
                quantity: 2,
            },
            CartItem {
                product: product(2, Price::new(Decimal::new(10_005, 3)), None),
                quantity: 1,
            },
        ];
        let urls = CheckoutUrls::from_base_url("https://marketstall.shop/");

        let request = build_session_request(
            &items,
            &Email::parse("ada@example.com").unwrap(),
            &urls,
            &["card".to_string()],
        )
        .unwrap();

        assert_eq!(request.line_items.len(), 2);
        assert_eq!(request.line_items[0].unit_amount, 8000);
        assert_eq!(request.line_items[0].quantity, 2);
        assert_eq!(request.line_items[1].unit_amount, 1001);
        assert!(request.line_items[0].description.is_none());
        assert_eq!(
            request.success_url,
            "https://marketstall.shop/checkout/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(request.cancel_url, "https://marketstall.shop/cart");
        assert_eq!(request.payment_method_types, vec!["card".to_string()]);
    }

    #[test]
    fn test_request_rejects_empty_cart() {
        let urls = CheckoutUrls::from_base_url("https://marketstall.shop");
        let result =
            build_session_request(&[], &Email::parse("ada@example.com").unwrap(), &urls, &[]);
        assert!(matches!(result, Err(PaymentError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_begin_returns_hosted_url_and_tags_customer() {
        let redirector =
            CheckoutRedirector::new(FakeGateway::default(), "https://marketstall.shop");
        let buyer = customer();
        let items = vec![CartItem {
            product: product(1, Price::from_cents(1000), None),
            quantity: 1,
        }];

        let hosted = redirector.begin(&items, &buyer).await.unwrap();
        assert_eq!(hosted.session_id, "cs_test_1");
        assert!(hosted.url.starts_with("https://checkout.stripe.com/"));

        let requests = redirector.gateway.requests.lock().unwrap();
        assert_eq!(
            requests[0].client_reference_id.as_deref(),
            Some(buyer.id.to_string().as_str())
        );
    }

    #[tokio::test]
    async fn test_confirm_requires_paid_session() {
        let unpaid = CheckoutRedirector::new(
            FakeGateway {
                payment_status: "unpaid".to_string(),
                ..FakeGateway::default()
            },
            "https://marketstall.shop",
        );
        assert!(matches!(
            unpaid.confirm("cs_test_1").await,
            Err(PaymentError::NotPaid(status)) if status == "unpaid"
        ));

        let paid = CheckoutRedirector::new(
            FakeGateway {
                payment_status: "paid".to_string(),
                ..FakeGateway::default()
            },
            "https://marketstall.shop",
        );
        assert!(paid.confirm("cs_test_1").await.unwrap().is_paid());
    }

    #[tokio::test]
    async fn test_paid_order_matches_charged_cart_not_live_cart() {
        let redirector = paid_redirector();
        let orders = OrderGateway::new(MemoryOrders::default(), LogNotifier);
        let buyer = customer();
        let mut cart = CartStore::open(MemoryStorage::new(), Some(buyer.id))
            .await
            .unwrap();
        cart.add_item(product(1, Price::from_cents(1000), None), 1)
            .await
            .unwrap();
        let pending = leave_for_payment(&redirector, &cart, &buyer).await;

        // Another tab adds to the cart while the buyer is on the hosted page.
        cart.add_item(product(2, Price::from_cents(50000), None), 3)
            .await
            .unwrap();

        let order = redirector
            .complete(&orders, &mut cart, &buyer, pending, "cs_test_1")
            .await
            .unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_id, ProductId::new(1));
        assert_eq!(order.total_price, Price::from_cents(1000));
        assert_eq!(order.total_price.to_minor_units().unwrap(), 1000);
        assert_eq!(order.payment_method, PaymentMethod::Card);

        // Only the paid line leaves the cart.
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].product.id, ProductId::new(2));
        assert_eq!(cart.total_count(), 3);
    }

    #[tokio::test]
    async fn test_paid_order_clears_unchanged_cart() {
        let redirector = paid_redirector();
        let orders = OrderGateway::new(MemoryOrders::default(), LogNotifier);
        let buyer = customer();
        let storage = MemoryStorage::new();
        let mut cart = CartStore::open(storage.clone(), Some(buyer.id)).await.unwrap();
        cart.add_item(product(1, Price::from_cents(1000), Some(Price::from_cents(750))), 2)
            .await
            .unwrap();
        let pending = leave_for_payment(&redirector, &cart, &buyer).await;

        let order = redirector
            .complete(&orders, &mut cart, &buyer, pending, "cs_test_1")
            .await
            .unwrap();

        assert_eq!(order.total_price, Price::from_cents(1500));
        assert!(cart.is_empty());
        assert!(!storage.contains_key(cart.key().as_str()));
    }

    #[tokio::test]
    async fn test_paid_order_survives_cart_emptied_during_payment() {
        let redirector = paid_redirector();
        let orders = OrderGateway::new(MemoryOrders::default(), LogNotifier);
        let buyer = customer();
        let mut cart = CartStore::open(MemoryStorage::new(), Some(buyer.id))
            .await
            .unwrap();
        cart.add_item(product(1, Price::from_cents(1000), None), 2)
            .await
            .unwrap();
        let pending = leave_for_payment(&redirector, &cart, &buyer).await;

        cart.clear().await.unwrap();

        let order = redirector
            .complete(&orders, &mut cart, &buyer, pending, "cs_test_1")
            .await
            .unwrap();
        assert_eq!(order.total_price, Price::from_cents(2000));
        assert_eq!(orders.list_all().await.unwrap().len(), 1);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_partial_quantity_bought_leaves_the_rest() {
        let redirector = paid_redirector();
        let orders = OrderGateway::new(MemoryOrders::default(), LogNotifier);
        let buyer = customer();
        let mut cart = CartStore::open(MemoryStorage::new(), Some(buyer.id))
            .await
            .unwrap();
        cart.add_item(product(1, Price::from_cents(1000), None), 1)
            .await
            .unwrap();
        let pending = leave_for_payment(&redirector, &cart, &buyer).await;
        cart.set_quantity(ProductId::new(1), 4).await.unwrap();

        let order = redirector
            .complete(&orders, &mut cart, &buyer, pending, "cs_test_1")
            .await
            .unwrap();
        assert_eq!(order.items[0].quantity, 1);
        assert_eq!(cart.total_count(), 3);
    }

    #[tokio::test]
    async fn test_amount_mismatch_creates_no_order() {
        let redirector = paid_redirector();
        let orders = OrderGateway::new(MemoryOrders::default(), LogNotifier);
        let buyer = customer();
        let mut cart = CartStore::open(MemoryStorage::new(), Some(buyer.id))
            .await
            .unwrap();
        cart.add_item(product(1, Price::from_cents(1000), None), 1)
            .await
            .unwrap();
        let mut pending = leave_for_payment(&redirector, &cart, &buyer).await;
        pending.items[0].quantity = 3;

        let err = redirector
            .complete(&orders, &mut cart, &buyer, pending, "cs_test_1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Payment(PaymentError::AmountMismatch {
                expected: 3000,
                paid: Some(1000)
            })
        ));
        assert!(orders.list_all().await.unwrap().is_empty());
        assert_eq!(cart.total_count(), 1);
    }

    #[tokio::test]
    async fn test_complete_rejects_foreign_or_unpaid_session() {
        let orders = OrderGateway::new(MemoryOrders::default(), LogNotifier);
        let buyer = customer();
        let mut cart = CartStore::open(MemoryStorage::new(), Some(buyer.id))
            .await
            .unwrap();
        cart.add_item(product(1, Price::from_cents(1000), None), 1)
            .await
            .unwrap();

        let redirector = paid_redirector();
        let pending = leave_for_payment(&redirector, &cart, &buyer).await;
        let err = redirector
            .complete(&orders, &mut cart, &buyer, pending, "cs_other")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::SessionMismatch));

        let unpaid = CheckoutRedirector::new(
            FakeGateway {
                payment_status: "unpaid".to_string(),
                ..FakeGateway::default()
            },
            "https://marketstall.shop",
        );
        let pending = leave_for_payment(&unpaid, &cart, &buyer).await;
        let err = unpaid
            .complete(&orders, &mut cart, &buyer, pending, "cs_test_1")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Payment(PaymentError::NotPaid(_))));
        assert!(orders.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_place_order_snapshots_cart_and_clears_it() {
        let orders = OrderGateway::new(MemoryOrders::default(), LogNotifier);
        let buyer = customer();
        let storage = MemoryStorage::new();
        let mut cart = CartStore::open(storage.clone(), Some(buyer.id)).await.unwrap();
        cart.add_item(product(1, Price::from_cents(10000), Some(Price::from_cents(8000))), 2)
            .await
            .unwrap();
        cart.add_item(product(2, Price::from_cents(5000), None), 1)
            .await
            .unwrap();
        let address = new_order(buyer.id).shipping_address;

        let order = place_order(&orders, &mut cart, &buyer, address, PaymentMethod::CashOnDelivery)
            .await
            .unwrap();

        assert_eq!(order.total_price, Price::from_cents(21000));
        assert_eq!(order.payment_method, PaymentMethod::CashOnDelivery);
        assert_eq!(order.customer_email, buyer.email);
        assert!(cart.is_empty());
        assert!(!storage.contains_key(cart.key().as_str()));
    }

    #[tokio::test]
    async fn test_failed_order_keeps_cart() {
        let orders = OrderGateway::new(MemoryOrders::failing(), LogNotifier);
        let buyer = customer();
        let mut cart = CartStore::open(MemoryStorage::new(), Some(buyer.id))
            .await
            .unwrap();
        cart.add_item(product(1, Price::from_cents(1000), None), 1)
            .await
            .unwrap();
        let address = new_order(buyer.id).shipping_address;

        let err = place_order(&orders, &mut cart, &buyer, address, PaymentMethod::Card)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Backend(_)));
        assert_eq!(cart.total_count(), 1);
    }

    #[tokio::test]
    async fn test_place_order_validates_before_creating() {
        let orders = OrderGateway::new(MemoryOrders::default(), LogNotifier);
        let buyer = customer();
        let mut cart = CartStore::open(MemoryStorage::new(), Some(buyer.id))
            .await
            .unwrap();
        let mut address = new_order(buyer.id).shipping_address;

        let err = place_order(&orders, &mut cart, &buyer, address.clone(), PaymentMethod::Card)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));

        cart.add_item(product(1, Price::from_cents(1000), None), 1)
            .await
            .unwrap();
        address.line1 = String::new();
        let err = place_order(&orders, &mut cart, &buyer, address, PaymentMethod::Card)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidAddress("line1")));
        assert!(orders.list_all().await.unwrap().is_empty());
    }
}
