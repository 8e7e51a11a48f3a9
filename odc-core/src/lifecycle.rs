//! Order status lifecycle.
//!
//! Every screen (driver app order cards, admin console tables, tab
//! filters) derives its labels, groupings and action buttons from this
//! module so the lifecycle is interpreted exactly one way.
//!
//! The happy path is `Pending → Assigned → DriverAccepted →
//! EnRouteToPickup → ArrivedAtPickup → InService → Completed`, with
//! `Cancelled` as the single side-exit reachable from any non-terminal
//! status. `Completed` and `Cancelled` are terminal.
//!
//! Status changes themselves are performed by the order-update endpoint;
//! this model only predicts which action is legal and what status it
//! yields, so the UI can offer the button and re-fetch afterwards.

use odc_sdk::objects::StatusCode;

/// A known order lifecycle status with its fixed wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OrderStatus {
    Pending = 0,
    Assigned = 1,
    DriverAccepted = 2,
    EnRouteToPickup = 3,
    ArrivedAtPickup = 4,
    InService = 5,
    Completed = 6,
    Cancelled = 7,
}

/// The one action a driver may take to advance an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverAction {
    /// Arrived at the pickup address.
    MarkArrived,
    /// Passenger on board, trip started.
    StartTrip,
    /// Trip finished.
    CompleteTrip,
}

/// UI-level grouping used for tab filters.
///
/// `Pending` (not yet dispatched) and `Cancelled` orders belong to no
/// driver-facing group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusGroup {
    /// Dispatched but the passenger is not yet riding.
    PendingService,
    /// Passenger on board.
    InService,
    /// Trip finished.
    Completed,
}

impl OrderStatus {
    /// All statuses in wire-code order.
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Assigned,
        OrderStatus::DriverAccepted,
        OrderStatus::EnRouteToPickup,
        OrderStatus::ArrivedAtPickup,
        OrderStatus::InService,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Classify a raw wire code. Returns `None` for codes this build
    /// does not know; callers must then display the order as unknown
    /// and offer no actions.
    pub fn from_code(code: StatusCode) -> Option<Self> {
        match code.0 {
            0 => Some(OrderStatus::Pending),
            1 => Some(OrderStatus::Assigned),
            2 => Some(OrderStatus::DriverAccepted),
            3 => Some(OrderStatus::EnRouteToPickup),
            4 => Some(OrderStatus::ArrivedAtPickup),
            5 => Some(OrderStatus::InService),
            6 => Some(OrderStatus::Completed),
            7 => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// The wire code for this status.
    pub fn code(self) -> StatusCode {
        StatusCode(self as i64)
    }

    /// Stable human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Assigned => "Assigned",
            OrderStatus::DriverAccepted => "Accepted by driver",
            OrderStatus::EnRouteToPickup => "En route to pickup",
            OrderStatus::ArrivedAtPickup => "Arrived at pickup",
            OrderStatus::InService => "In service",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Returns `true` if no further transition is legal.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns `true` if the order may still be cancelled.
    pub fn can_cancel(self) -> bool {
        !self.is_terminal()
    }

    /// The single legal advance action for a driver holding an order in
    /// this status, or `None`.
    ///
    /// This table is the source of truth for driver-side progression;
    /// [`group`](Self::group) derives from it rather than repeating the
    /// status sets.
    pub fn advance(self) -> Option<DriverAction> {
        match self {
            OrderStatus::Assigned | OrderStatus::DriverAccepted | OrderStatus::EnRouteToPickup => {
                Some(DriverAction::MarkArrived)
            }
            OrderStatus::ArrivedAtPickup => Some(DriverAction::StartTrip),
            OrderStatus::InService => Some(DriverAction::CompleteTrip),
            OrderStatus::Pending | OrderStatus::Completed | OrderStatus::Cancelled => None,
        }
    }

    /// The driver-facing tab group this status belongs to, or `None`.
    pub fn group(self) -> Option<StatusGroup> {
        match self.advance() {
            Some(DriverAction::MarkArrived) | Some(DriverAction::StartTrip) => {
                Some(StatusGroup::PendingService)
            }
            Some(DriverAction::CompleteTrip) => Some(StatusGroup::InService),
            None if self == OrderStatus::Completed => Some(StatusGroup::Completed),
            None => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl DriverAction {
    /// Button label shown on the order card.
    pub fn label(self) -> &'static str {
        match self {
            DriverAction::MarkArrived => "Mark arrived",
            DriverAction::StartTrip => "Start trip",
            DriverAction::CompleteTrip => "Complete trip",
        }
    }

    /// The status the order enters once the server accepts this action.
    pub fn resulting_status(self) -> OrderStatus {
        match self {
            DriverAction::MarkArrived => OrderStatus::ArrivedAtPickup,
            DriverAction::StartTrip => OrderStatus::InService,
            DriverAction::CompleteTrip => OrderStatus::Completed,
        }
    }
}

/// Label for a raw wire code, including codes this build does not know.
pub fn code_label(code: StatusCode) -> &'static str {
    match OrderStatus::from_code(code) {
        Some(status) => status.label(),
        None => "Unknown status",
    }
}

/// Legal advance action for a raw wire code; unknown codes get none.
pub fn advance_for(code: StatusCode) -> Option<DriverAction> {
    OrderStatus::from_code(code).and_then(OrderStatus::advance)
}
