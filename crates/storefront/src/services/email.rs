//! Admin notifications for new orders.
//!
//! Uses SMTP via lettre for delivery with Askama templates. Without an SMTP
//! relay configured, notifications are written to the log instead.

use std::future::Future;

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use marketstall_core::{Email, Order, PaymentMethod};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::{SmtpConfig, StorefrontConfig};

/// One order line, preformatted for templates.
struct EmailLine {
    name: String,
    quantity: u32,
    unit_price: String,
    line_total: String,
}

/// HTML template for the new-order email.
#[derive(Template)]
#[template(path = "email/new_order.html")]
struct NewOrderEmailHtml<'a> {
    order_id: String,
    customer_name: &'a str,
    customer_email: &'a str,
    payment_method: &'a str,
    status: &'static str,
    total: String,
    lines: &'a [EmailLine],
    shipping_lines: &'a [String],
    dashboard_url: &'a str,
}

/// Plain text template for the new-order email.
#[derive(Template)]
#[template(path = "email/new_order.txt")]
struct NewOrderEmailText<'a> {
    order_id: String,
    customer_name: &'a str,
    customer_email: &'a str,
    payment_method: &'a str,
    status: &'static str,
    total: String,
    lines: &'a [EmailLine],
    shipping_lines: &'a [String],
    dashboard_url: &'a str,
}

/// Errors that can occur when sending a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Tells the store administrator about new orders.
pub trait AdminNotifier: Send + Sync {
    fn notify_new_order(
        &self,
        order: &Order,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Rendered subject and bodies of a new-order email.
struct RenderedEmail {
    subject: String,
    text: String,
    html: String,
}

fn payment_label(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Card => "Card",
        PaymentMethod::CashOnDelivery => "Cash on delivery",
    }
}

fn render_new_order(order: &Order, base_url: &str) -> Result<RenderedEmail, NotifyError> {
    let lines: Vec<EmailLine> = order
        .items
        .iter()
        .map(|item| EmailLine {
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price.to_string(),
            line_total: item.line_total().to_string(),
        })
        .collect();

    let address = &order.shipping_address;
    let shipping_lines: Vec<String> = [
        Some(address.full_name.clone()),
        Some(address.line1.clone()),
        address.line2.clone().filter(|line| !line.trim().is_empty()),
        Some(format!("{} {}", address.postal_code, address.city)),
        Some(address.country.clone()),
        address.phone.clone(),
    ]
    .into_iter()
    .flatten()
    .collect();

    let dashboard_url = format!("{base_url}/admin/orders/{}", order.id);
    let payment_method = payment_label(order.payment_method);
    let total = order.total_price.to_string();

    let html = NewOrderEmailHtml {
        order_id: order.id.to_string(),
        customer_name: &order.customer_name,
        customer_email: order.customer_email.as_str(),
        payment_method,
        status: order.status.label(),
        total: total.clone(),
        lines: &lines,
        shipping_lines: &shipping_lines,
        dashboard_url: &dashboard_url,
    }
    .render()?;

    let text = NewOrderEmailText {
        order_id: order.id.to_string(),
        customer_name: &order.customer_name,
        customer_email: order.customer_email.as_str(),
        payment_method,
        status: order.status.label(),
        total: total.clone(),
        lines: &lines,
        shipping_lines: &shipping_lines,
        dashboard_url: &dashboard_url,
    }
    .render()?;

    Ok(RenderedEmail {
        subject: format!("New order #{} ({total})", order.id),
        text,
        html,
    })
}

/// Sends new-order emails through an SMTP relay.
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    admin_email: Email,
    base_url: String,
}

impl SmtpNotifier {
    /// Create a notifier from SMTP configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay host is invalid.
    pub fn new(config: &SmtpConfig, admin_email: Email, base_url: &str) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            admin_email,
            base_url: base_url.to_string(),
        })
    }

    async fn send_multipart_email(&self, email: RenderedEmail) -> Result<(), NotifyError> {
        let to = self.admin_email.as_str();
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotifyError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| NotifyError::InvalidAddress(to.to_string()))?)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html),
                    ),
            )?;

        self.mailer.send(message).await?;

        tracing::info!(to = %to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

impl AdminNotifier for SmtpNotifier {
    async fn notify_new_order(&self, order: &Order) -> Result<(), NotifyError> {
        let email = render_new_order(order, &self.base_url)?;
        self.send_multipart_email(email).await
    }
}

/// Writes new-order notifications to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl AdminNotifier for LogNotifier {
    async fn notify_new_order(&self, order: &Order) -> Result<(), NotifyError> {
        tracing::info!(
            order_id = %order.id,
            customer = %order.customer_email,
            total = %order.total_price,
            items = order.item_count(),
            "New order (SMTP not configured, notification logged only)"
        );
        Ok(())
    }
}

/// The notifier selected by configuration.
#[derive(Clone)]
pub enum Notifier {
    Smtp(SmtpNotifier),
    Log(LogNotifier),
}

impl Notifier {
    /// Pick SMTP when a relay is configured, logging otherwise.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay configuration is invalid.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, SmtpError> {
        match &config.smtp {
            Some(smtp) => Ok(Self::Smtp(SmtpNotifier::new(
                smtp,
                config.admin_email.clone(),
                &config.base_url,
            )?)),
            None => {
                tracing::warn!("SMTP_HOST not set, admin notifications will only be logged");
                Ok(Self::Log(LogNotifier))
            }
        }
    }
}

impl AdminNotifier for Notifier {
    async fn notify_new_order(&self, order: &Order) -> Result<(), NotifyError> {
        match self {
            Self::Smtp(notifier) => notifier.notify_new_order(order).await,
            Self::Log(notifier) => notifier.notify_new_order(order).await,
        }
    }
}
