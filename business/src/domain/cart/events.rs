use uuid::Uuid;

/// A line that can no longer be bought.
#[derive(Debug, Clone, PartialEq)]
pub struct UnavailableLine {
    pub line_id: Uuid,
    pub name: String,
}

/// Structured notifications emitted by the cart and wishlist stores.
/// Presentation subscribes and decides how to render them.
#[derive(Debug, Clone, PartialEq)]
pub enum CartEvent {
    ItemAdded {
        line_id: Uuid,
        name: String,
        quantity: u32,
    },
    QuantityMerged {
        line_id: Uuid,
        name: String,
        quantity: u32,
    },
    QuantityUpdated {
        line_id: Uuid,
        quantity: u32,
    },
    LimitedStock {
        line_id: Uuid,
        name: String,
        available: u32,
    },
    ItemRemoved {
        line_id: Uuid,
        name: String,
    },
    Cleared,
    LinesRefreshed {
        refreshed: usize,
    },
    NowUnavailable {
        lines: Vec<UnavailableLine>,
    },
    WishlistAdded {
        line_id: Uuid,
        name: String,
    },
    WishlistRemoved {
        line_id: Uuid,
    },
    OperationRejected {
        code: &'static str,
    },
}
