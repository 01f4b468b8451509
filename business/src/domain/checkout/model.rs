use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::cart::model::{CartLine, CartTotals};
use crate::domain::payment::model::PaymentState;
use crate::domain::shared::value_objects::MinorUnits;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    CartReview,
    Login,
    CustomerInfo,
    Payment,
    Confirmation,
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckoutStep::CartReview => write!(f, "cart_review"),
            CheckoutStep::Login => write!(f, "login"),
            CheckoutStep::CustomerInfo => write!(f, "customer_info"),
            CheckoutStep::Payment => write!(f, "payment"),
            CheckoutStep::Confirmation => write!(f, "confirmation"),
        }
    }
}

/// Step sequence for a shopper; Login only appears when not signed in.
pub fn steps_for(authenticated: bool) -> Vec<CheckoutStep> {
    let mut steps = vec![CheckoutStep::CartReview];
    if !authenticated {
        steps.push(CheckoutStep::Login);
    }
    steps.extend([
        CheckoutStep::CustomerInfo,
        CheckoutStep::Payment,
        CheckoutStep::Confirmation,
    ]);
    steps
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    pub street: String,
    pub town: String,
    pub county: Option<String>,
    pub landmark: Option<String>,
}

impl DeliveryAddress {
    pub fn is_resolved(&self) -> bool {
        !self.street.trim().is_empty() && !self.town.trim().is_empty()
    }
}

impl std::fmt::Display for DeliveryAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<&str> = [
            Some(self.street.as_str()),
            self.landmark.as_deref(),
            Some(self.town.as_str()),
            self.county.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub delivery_address: DeliveryAddress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMethod {
    Mpesa { phone_number: String },
    CashOnDelivery,
}

impl PaymentMethod {
    /// Name used on the order payload.
    pub fn wire_name(&self) -> &'static str {
        match self {
            PaymentMethod::Mpesa { .. } => "mpesa",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }
}

/// A confirmed order as returned by the order service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub reference_number: String,
}

/// Snapshot of one checkout flow.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub steps: Vec<CheckoutStep>,
    pub active_step: CheckoutStep,
    pub customer: CustomerInfo,
    pub payment_method: Option<PaymentMethod>,
    pub payment_state: PaymentState,
    /// Receipt of a settled payment whose order is not recorded yet.
    pub payment_receipt: Option<String>,
    pub order_number: String,
    pub confirmation: Option<OrderConfirmation>,
    pub started_at: DateTime<Utc>,
}

impl CheckoutSession {
    pub fn new(authenticated: bool, now: DateTime<Utc>) -> Self {
        Self {
            steps: steps_for(authenticated),
            active_step: CheckoutStep::CartReview,
            customer: CustomerInfo::default(),
            payment_method: None,
            payment_state: PaymentState::Idle,
            payment_receipt: None,
            order_number: generate_order_number(now),
            confirmation: None,
            started_at: now,
        }
    }

    pub fn next_step(&self) -> Option<CheckoutStep> {
        let position = self.steps.iter().position(|s| *s == self.active_step)?;
        self.steps.get(position + 1).copied()
    }

    pub fn previous_step(&self) -> Option<CheckoutStep> {
        let position = self.steps.iter().position(|s| *s == self.active_step)?;
        position
            .checked_sub(1)
            .and_then(|p| self.steps.get(p).copied())
    }

    /// Rebuilds the step list for the current sign-in state. Signing in while
    /// on Login falls back to CartReview; signing out past Login returns to
    /// it. Confirmation is final and never moves. Returns whether the active
    /// step changed.
    pub fn align_steps(&mut self, authenticated: bool) -> bool {
        let steps = steps_for(authenticated);
        if steps == self.steps {
            return false;
        }
        self.steps = steps;

        let realigned = match self.active_step {
            CheckoutStep::Login if authenticated => CheckoutStep::CartReview,
            CheckoutStep::CustomerInfo | CheckoutStep::Payment if !authenticated => {
                CheckoutStep::Login
            }
            step => step,
        };
        let moved = realigned != self.active_step;
        self.active_step = realigned;
        moved
    }

    /// Closes the flow on a recorded order. Shopper details and payment data
    /// are dropped; only the order number and confirmation remain for display.
    pub fn confirm(&mut self, confirmation: OrderConfirmation) {
        self.customer = CustomerInfo::default();
        self.payment_method = None;
        self.payment_state = PaymentState::Idle;
        self.payment_receipt = None;
        self.confirmation = Some(confirmation);
        self.active_step = CheckoutStep::Confirmation;
    }

    pub fn is_confirmed(&self) -> bool {
        self.active_step == CheckoutStep::Confirmation
    }
}

/// `ORD-<unix millis>-<4 random digits>`.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::rng().random_range(1000..10000);
    format!("ORD-{}-{}", now.timestamp_millis(), suffix)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderPaymentStatus {
    Pending,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomer {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub delivery_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: MinorUnits,
    pub total_price: MinorUnits,
}

impl From<&CartLine> for OrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.canonical_product_id.to_string(),
            name: line.name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            total_price: line.line_total(),
        }
    }
}

/// Order payload submitted once payment is settled (or deferred for cash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub order_number: String,
    pub customer: OrderCustomer,
    pub items: Vec<OrderItem>,
    pub payment_method: String,
    pub subtotal: MinorUnits,
    pub shipping: MinorUnits,
    pub total: MinorUnits,
    pub payment_status: OrderPaymentStatus,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
}

impl OrderDraft {
    pub fn assemble(
        order_number: &str,
        customer: &CustomerInfo,
        method: &PaymentMethod,
        lines: &[CartLine],
        totals: &CartTotals,
        payment_reference: Option<String>,
    ) -> Self {
        let payment_status = if payment_reference.is_some() {
            OrderPaymentStatus::Paid
        } else {
            OrderPaymentStatus::Pending
        };

        Self {
            order_number: order_number.to_string(),
            customer: OrderCustomer {
                name: customer.name.trim().to_string(),
                email: customer.email.trim().to_string(),
                phone_number: customer.phone_number.trim().to_string(),
                delivery_address: customer.delivery_address.to_string(),
            },
            items: lines.iter().map(OrderItem::from).collect(),
            payment_method: method.wire_name().to_string(),
            subtotal: totals.subtotal,
            shipping: totals.shipping,
            total: totals.total,
            payment_status,
            status: "pending".to_string(),
            payment_reference,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutConfig {
    /// Refuse to enter Payment while any line is missing from the catalog.
    pub block_unmatched_items: bool,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            block_unmatched_items: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_insert_login_step_for_guests() {
        assert_eq!(
            steps_for(false),
            vec![
                CheckoutStep::CartReview,
                CheckoutStep::Login,
                CheckoutStep::CustomerInfo,
                CheckoutStep::Payment,
                CheckoutStep::Confirmation,
            ]
        );
        assert!(!steps_for(true).contains(&CheckoutStep::Login));
    }

    #[test]
    fn should_generate_order_number_with_timestamp_and_suffix() {
        let now = Utc::now();
        let number = generate_order_number(now);
        let parts: Vec<&str> = number.split('-').collect();

        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 4);
    }

    #[test]
    fn should_format_address_skipping_blank_parts() {
        let address = DeliveryAddress {
            street: "Moi Avenue 12".to_string(),
            town: "Nairobi".to_string(),
            county: None,
            landmark: Some(" ".to_string()),
        };

        assert_eq!(address.to_string(), "Moi Avenue 12, Nairobi");
        assert!(address.is_resolved());
        assert!(!DeliveryAddress::default().is_resolved());
    }

    #[test]
    fn should_walk_steps_in_order() {
        let mut session = CheckoutSession::new(true, Utc::now());
        assert_eq!(session.previous_step(), None);
        assert_eq!(session.next_step(), Some(CheckoutStep::CustomerInfo));

        session.active_step = CheckoutStep::Confirmation;
        assert_eq!(session.next_step(), None);
        assert_eq!(session.previous_step(), Some(CheckoutStep::Payment));
    }

    #[test]
    fn should_realign_steps_when_sign_in_state_changes() {
        let mut session = CheckoutSession::new(false, Utc::now());
        session.active_step = CheckoutStep::Login;

        assert!(session.align_steps(true));
        assert_eq!(session.active_step, CheckoutStep::CartReview);
        assert!(!session.steps.contains(&CheckoutStep::Login));
        assert!(!session.align_steps(true));

        session.active_step = CheckoutStep::Payment;
        assert!(session.align_steps(false));
        assert_eq!(session.active_step, CheckoutStep::Login);
    }

    #[test]
    fn should_keep_confirmation_when_signing_out() {
        let mut session = CheckoutSession::new(true, Utc::now());
        session.customer.name = "Wanjiru".to_string();
        session.payment_receipt = Some("QK7XYZ".to_string());

        session.confirm(OrderConfirmation {
            order_id: "65f0c1".to_string(),
            reference_number: "REF-1001".to_string(),
        });
        let moved = session.align_steps(false);

        assert!(!moved);
        assert!(session.is_confirmed());
        assert_eq!(session.customer, CustomerInfo::default());
        assert_eq!(session.payment_receipt, None);
    }

    #[test]
    fn should_serialize_order_draft_in_camel_case() {
        let draft = OrderDraft {
            order_number: "ORD-1-1234".to_string(),
            customer: OrderCustomer {
                name: "Wanjiru".to_string(),
                email: "w@example.com".to_string(),
                phone_number: "0712345678".to_string(),
                delivery_address: "Moi Avenue, Nairobi".to_string(),
            },
            items: vec![],
            payment_method: "mpesa".to_string(),
            subtotal: 0,
            shipping: 0,
            total: 0,
            payment_status: OrderPaymentStatus::Paid,
            status: "pending".to_string(),
            payment_reference: Some("QK7XYZ".to_string()),
        };

        let json = serde_json::to_value(&draft).unwrap();

        assert_eq!(json["orderNumber"], "ORD-1-1234");
        assert_eq!(json["customer"]["phoneNumber"], "0712345678");
        assert_eq!(json["paymentStatus"], "paid");
        assert_eq!(json["paymentReference"], "QK7XYZ");
    }
}
