use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info};

use crate::config::SmtpConfig;
use crate::errors::AppError;
use crate::models::{Direction, PriceChange};

// ==============================================================================
// Notifier
// ==============================================================================

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message about `change` to every recipient.
    async fn notify(&self, change: &PriceChange, recipients: &[String]) -> Result<(), AppError>;
}

// ==============================================================================
// SMTP Notifications
// ==============================================================================

pub struct SmtpNotifier {
    config: SmtpConfig,
    dashboard_url: Option<String>,
}

impl SmtpNotifier {
    pub fn new(config: SmtpConfig, dashboard_url: Option<String>) -> Self {
        Self {
            config,
            dashboard_url,
        }
    }

    fn build_message(&self, change: &PriceChange, recipients: &[String]) -> Result<Message, AppError> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| AppError::DeliveryFailure(format!("Invalid from address: {}", e)))?;

        let mut builder = Message::builder().from(from).subject(build_subject(change));

        for recipient in recipients {
            let to: Mailbox = recipient.parse().map_err(|e| {
                AppError::DeliveryFailure(format!("Invalid to address {}: {}", recipient, e))
            })?;
            builder = builder.to(to);
        }

        let dashboard = self.dashboard_url.as_deref();

        builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(build_text_body(change, dashboard)),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(build_email_html(change, dashboard)),
                    ),
            )
            .map_err(|e| AppError::DeliveryFailure(format!("Failed to build email: {}", e)))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, change: &PriceChange, recipients: &[String]) -> Result<(), AppError> {
        let email = self.build_message(change, recipients)?;

        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());

        info!("🔌 Connecting to SMTP server: {}:{}", self.config.host, self.config.port);

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
            .map_err(|e| AppError::DeliveryFailure(format!("Failed to create SMTP transport: {}", e)))?
            .port(self.config.port)
            .credentials(creds)
            .build();

        info!("📤 Sending email to {} recipient(s)...", recipients.len());
        match mailer.send(email).await {
            Ok(_) => {
                info!("✅ Email sent successfully to: {}", recipients.join(", "));
                Ok(())
            }
            Err(e) => {
                error!("❌ SMTP Error: {:?}", e);
                Err(AppError::DeliveryFailure(format!("SMTP send failed: {}", e)))
            }
        }
    }
}

// ==============================================================================
// Helper Functions
// ==============================================================================

fn build_subject(change: &PriceChange) -> String {
    format!("🚨 Price Alert: Resort Price Changed on {}", change.latest_date())
}

fn format_change_text(change: &PriceChange) -> String {
    match change.direction() {
        Direction::Up => format!("📈 UP by ${}", change.magnitude()),
        Direction::Down => format!("📉 DOWN by ${}", change.magnitude()),
        Direction::Unknown => "🔄 CHANGED (difference unavailable)".to_string(),
    }
}

fn price_text(price: &Option<String>) -> String {
    match price {
        Some(p) => format!("${}", p),
        None => "n/a".to_string(),
    }
}

fn build_text_body(change: &PriceChange, dashboard_url: Option<&str>) -> String {
    let previous = &change.previous;
    let latest = &change.latest;

    let mut text = format!(
        "Price Alert: Resort Price Changed on {}\n\n\
         Trip Details:\n\
         Check-in: {}\n\
         Check-out: {}\n\
         Party: {} adult(s), {} kid(s)\n\n\
         Price Comparison:\n\
         {}: {} (best) / {} (initial)\n\
         {}: {} (best) / {} (initial)\n\n\
         {}\n\
         Change: ${}\n",
        change.latest_date(),
        latest.stay_start,
        latest.stay_end,
        latest.party_adults,
        latest.party_kids,
        previous.observation_date,
        price_text(&previous.best_price),
        price_text(&previous.initial_price),
        latest.observation_date,
        price_text(&latest.best_price),
        price_text(&latest.initial_price),
        format_change_text(change),
        change.magnitude(),
    );

    if let Some(url) = dashboard_url {
        text.push_str(&format!("\n---\nResort Price Monitor: {}\n", url));
    }

    text
}

// ==============================================================================
// Email Template
// ==============================================================================

fn build_email_html(change: &PriceChange, dashboard_url: Option<&str>) -> String {
    let previous = &change.previous;
    let latest = &change.latest;

    let footer_link = match dashboard_url {
        Some(url) => format!(
            r#"Check <a href="{url}">{url}</a> for full details."#,
            url = url
        ),
        None => String::new(),
    };

    format!(
        r#"
<!DOCTYPE html>
<html>
<head>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; }}
        h2 {{ color: #d32f2f; }}
        h3 {{ color: #1976d2; }}
        table {{ border-collapse: collapse; width: 100%; margin: 20px 0; }}
        th, td {{ border: 1px solid #ddd; padding: 10px; text-align: left; }}
        th {{ background-color: #f5f5f5; }}
        .latest td {{ background-color: #fff3cd; font-weight: bold; }}
        .footer {{ color: #666; font-size: 12px; }}
    </style>
</head>
<body>
    <h2>🚨 Price Alert: Resort Price Changed</h2>

    <h3>Trip Details</h3>
    <p><strong>Check-in:</strong> {}</p>
    <p><strong>Check-out:</strong> {}</p>
    <p><strong>Party:</strong> {} adult(s), {} kid(s)</p>

    <h3>Price Comparison</h3>
    <table>
        <tr>
            <th>Date</th>
            <th>Best Price</th>
            <th>Initial Price</th>
        </tr>
        <tr>
            <td>{}</td>
            <td>{}</td>
            <td>{}</td>
        </tr>
        <tr class="latest">
            <td>{}</td>
            <td>{}</td>
            <td>{}</td>
        </tr>
    </table>

    <h3>{}</h3>
    <p style="font-size: 18px; color: #d32f2f;"><strong>${} change</strong></p>

    <hr>
    <p class="footer">
        This is an automated notification from Resort Price Monitor.<br>
        {}
    </p>
</body>
</html>
"#,
        latest.stay_start,
        latest.stay_end,
        latest.party_adults,
        latest.party_kids,
        previous.observation_date,
        price_text(&previous.best_price),
        price_text(&previous.initial_price),
        latest.observation_date,
        price_text(&latest.best_price),
        price_text(&latest.initial_price),
        format_change_text(change),
        change.magnitude(),
        footer_link,
    )
}
