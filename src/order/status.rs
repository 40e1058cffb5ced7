use std::fmt;
use serde::{Serialize, Deserialize};

/// Lifecycle status of a placed order
///
/// `Pending` is where every new order starts, `Completed` and `Cancelled`
/// are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
         Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Pending,
    Confirm,
    InProcess,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: &'static [OrderStatus] =
        &[ OrderStatus::Pending,
           OrderStatus::Confirm,
           OrderStatus::InProcess,
           OrderStatus::Ready,
           OrderStatus::Completed,
           OrderStatus::Cancelled ];

    /// Statuses an order may move to from `self` in the ordinary workflow
    ///
    /// Never contains `self`, empty for terminal statuses.
    pub const fn next_statuses(self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending   => &[OrderStatus::Confirm],
            OrderStatus::Confirm   => &[OrderStatus::InProcess],
            OrderStatus::InProcess => &[OrderStatus::Ready],
            OrderStatus::Ready     => &[OrderStatus::Completed],
            OrderStatus::Completed => &[],
            OrderStatus::Cancelled => &[],
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub const fn id(self) -> &'static str {
        match self {
            OrderStatus::Pending   => "pending",
            OrderStatus::Confirm   => "confirm",
            OrderStatus::InProcess => "inProcess",
            OrderStatus::Ready     => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            OrderStatus::Pending   => "Pending",
            OrderStatus::Confirm   => "Confirmed",
            OrderStatus::InProcess => "In Process",
            OrderStatus::Ready     => "Ready",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Hex color used to paint the status badge
    ///
    /// Both terminal statuses share the same gray.
    pub const fn color(self) -> &'static str {
        match self {
            OrderStatus::Pending   => "#8b5cf6", // violet
            OrderStatus::Confirm   => "#3b82f6", // blue
            OrderStatus::InProcess => "#f59e0b", // amber
            OrderStatus::Ready     => "#10b981", // green
            OrderStatus::Completed => "#6b7280", // gray
            OrderStatus::Cancelled => "#6b7280", // gray
        }
    }

    /// Converts str to OrderStatus, returns None if it doesn't
    /// match any of the status ids
    pub fn from_id(id: &str) -> Option<OrderStatus> {
        OrderStatus::ALL.iter().cloned().find(|s| s.id() == id)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrips() {
        for s in OrderStatus::ALL.iter().cloned() {
            assert_eq!(s, OrderStatus::from_id(s.id()).unwrap());
        }
    }

    #[test]
    fn test_some_ids() {
        assert_eq!(Some(OrderStatus::InProcess), OrderStatus::from_id("inProcess"));
        assert_eq!(None,                         OrderStatus::from_id("in_process"));
        assert_eq!(None,                         OrderStatus::from_id("Ready"));
        assert_eq!(None,                         OrderStatus::from_id(" ready"));
        assert_eq!(None,                         OrderStatus::from_id(""));
    }

    #[test]
    fn test_serde_uses_ids() {
        for s in OrderStatus::ALL.iter().cloned() {
            let json = serde_json::to_string(&s).unwrap();
            assert_eq!(format!("\"{}\"", s.id()), json);
        }
        assert!(serde_json::from_str::<OrderStatus>("\"shipped\"").is_err());
    }

    #[test]
    fn test_table_is_single_step_forward() {
        assert_eq!(OrderStatus::Pending.next_statuses(),   &[OrderStatus::Confirm]);
        assert_eq!(OrderStatus::Confirm.next_statuses(),   &[OrderStatus::InProcess]);
        assert_eq!(OrderStatus::InProcess.next_statuses(), &[OrderStatus::Ready]);
        assert_eq!(OrderStatus::Ready.next_statuses(),     &[OrderStatus::Completed]);

        for s in OrderStatus::ALL.iter().cloned() {
            assert!(!s.next_statuses().contains(&s), "{s:?} lists itself");
            assert_eq!(s.is_terminal(), s.next_statuses().is_empty());
        }
    }

    #[test]
    fn test_presentation_is_total() {
        for s in OrderStatus::ALL.iter().cloned() {
            assert!(!s.display_name().is_empty());
            assert!(s.color().starts_with('#'));
            assert_eq!(7, s.color().len());
        }
        assert_eq!("In Process", OrderStatus::InProcess.to_string());
    }

    #[test]
    fn test_terminal_statuses_share_gray() {
        assert_eq!(OrderStatus::Completed.color(), OrderStatus::Cancelled.color());

        let live: Vec<&str> = OrderStatus::ALL.iter()
            .filter(|s| !s.is_terminal())
            .map(|s| s.color())
            .collect();
        for (ii, c) in live.iter().enumerate() {
            assert!(!live[ii + 1..].contains(c), "duplicate color {c}");
            assert_ne!(*c, OrderStatus::Completed.color());
        }
    }
}
