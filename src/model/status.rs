//! Order status vocabulary.
//!
//! ```text
//! CREATING_ORDER → PENDING_VALIDATION → PENDING_PAYMENT → PAYMENT_SUCCESSFUL
//!     → DELIVERY_REQUESTED → PICKED_UP → IN_TRANSIT → DELIVERED
//!
//! any non-terminal state → CANCELLED | FAILED | LOST
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Status of an order as reported by the backend.
///
/// `CreatingOrder` never comes from the backend; it is the label a checkout session carries before
/// the new order has been discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    CreatingOrder,
    PendingValidation,
    PendingPayment,
    PaymentSuccessful,
    DeliveryRequested,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
    Failed,
    Lost,
}

/// Stages shown on the order progress timeline, in forward order.
pub const PROGRESS_STAGES: [OrderStatus; 7] = [
    OrderStatus::PendingValidation,
    OrderStatus::PendingPayment,
    OrderStatus::PaymentSuccessful,
    OrderStatus::DeliveryRequested,
    OrderStatus::PickedUp,
    OrderStatus::InTransit,
    OrderStatus::Delivered,
];

/// One stage of the progress timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressStage {
    pub status: OrderStatus,
    pub completed: bool,
    pub current: bool,
}

impl OrderStatus {
    /// Polling stops once a checkout session observes one of these.
    ///
    /// `DeliveryRequested` counts as terminal here because ownership passes to the delivery
    /// subsystem, even though the order itself is not finished.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::DeliveryRequested | Self::Delivered | Self::Cancelled | Self::Failed | Self::Lost
        )
    }

    /// Final outcomes: nothing changes after these.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::Cancelled | Self::Failed | Self::Lost
        )
    }

    /// Cancellation is only offered before the delivery request goes out.
    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            Self::CreatingOrder
                | Self::PendingValidation
                | Self::PendingPayment
                | Self::PaymentSuccessful
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatingOrder => "CREATING_ORDER",
            Self::PendingValidation => "PENDING_VALIDATION",
            Self::PendingPayment => "PENDING_PAYMENT",
            Self::PaymentSuccessful => "PAYMENT_SUCCESSFUL",
            Self::DeliveryRequested => "DELIVERY_REQUESTED",
            Self::PickedUp => "PICKED_UP",
            Self::InTransit => "IN_TRANSIT",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
            Self::Lost => "LOST",
        }
    }

    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::CreatingOrder => "Creating Order",
            Self::PendingValidation => "Validating Order",
            Self::PendingPayment => "Processing Payment",
            Self::PaymentSuccessful => "Payment Successful",
            Self::DeliveryRequested => "Requesting Delivery",
            Self::PickedUp => "Package Picked Up",
            Self::InTransit => "In Transit",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Payment Failed",
            Self::Lost => "Lost",
        }
    }

    /// Builds the progress timeline for an order currently in `current`.
    ///
    /// Stages up to and including `current` are completed. Side-branch statuses (`Cancelled`,
    /// `Failed`, `Lost`) and `CreatingOrder` are not on the timeline, so nothing is marked.
    pub fn progress(current: OrderStatus) -> Vec<ProgressStage> {
        let position = PROGRESS_STAGES.iter().position(|s| *s == current);
        PROGRESS_STAGES
            .iter()
            .enumerate()
            .map(|(index, status)| ProgressStage {
                status: *status,
                completed: position.is_some_and(|p| index <= p),
                current: *status == current,
            })
            .collect()
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_and_cancellable_sets_are_disjoint() {
        let all = [
            OrderStatus::CreatingOrder,
            OrderStatus::PendingValidation,
            OrderStatus::PendingPayment,
            OrderStatus::PaymentSuccessful,
            OrderStatus::DeliveryRequested,
            OrderStatus::PickedUp,
            OrderStatus::InTransit,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Failed,
            OrderStatus::Lost,
        ];
        for status in all {
            assert!(
                !(status.is_terminal() && status.is_cancellable()),
                "{status} is both terminal and cancellable"
            );
        }
        // Statuses owned by the delivery subsystem are neither.
        assert!(!OrderStatus::PickedUp.is_terminal());
        assert!(!OrderStatus::InTransit.is_cancellable());
    }

    #[test]
    fn delivery_requested_is_terminal_but_not_final() {
        assert!(OrderStatus::DeliveryRequested.is_terminal());
        assert!(!OrderStatus::DeliveryRequested.is_final());
        assert!(OrderStatus::Lost.is_final());
    }

    #[test]
    fn wire_names_round_trip() {
        let parsed: OrderStatus = serde_json::from_str("\"PAYMENT_SUCCESSFUL\"").unwrap();
        assert_eq!(parsed, OrderStatus::PaymentSuccessful);
        assert_eq!(
            serde_json::to_string(&OrderStatus::DeliveryRequested).unwrap(),
            "\"DELIVERY_REQUESTED\""
        );
        assert!(serde_json::from_str::<OrderStatus>("\"COMPLETED\"").is_err());
    }

    #[test]
    fn progress_marks_completed_stages() {
        let stages = OrderStatus::progress(OrderStatus::PaymentSuccessful);
        let completed: Vec<_> = stages.iter().filter(|s| s.completed).map(|s| s.status).collect();
        assert_eq!(
            completed,
            vec![
                OrderStatus::PendingValidation,
                OrderStatus::PendingPayment,
                OrderStatus::PaymentSuccessful
            ]
        );
        assert_eq!(stages.iter().filter(|s| s.current).count(), 1);
    }

    #[test]
    fn progress_for_side_branch_marks_nothing() {
        let stages = OrderStatus::progress(OrderStatus::Cancelled);
        assert!(stages.iter().all(|s| !s.completed && !s.current));
    }
}
