//! What a consumer renders from the feed state

use super::trade::TradeProgressFrame;

/// Mutually exclusive display states of the market view
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayState {
    /// Snapshot fetch or transport failed; the string is shown as-is
    Error(String),
    /// Not connected yet, or connected without any data
    Loading,
    /// Connected with a snapshot or at least one batch
    Ready,
}

impl DisplayState {
    /// An error wins over everything else; data only counts while connected
    pub fn derive(error: Option<&str>, connected: bool, has_data: bool) -> Self {
        match error {
            Some(message) => DisplayState::Error(message.to_string()),
            None if connected && has_data => DisplayState::Ready,
            None => DisplayState::Loading,
        }
    }
}

/// Display states of the trade-progress view
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerView {
    /// Placeholder while not connected or before the first frame
    Connecting,
    /// Connected and a frame has arrived
    Detail(TradeProgressFrame),
}

impl TrackerView {
    pub fn derive(connected: bool, latest: Option<&TradeProgressFrame>) -> Self {
        match latest {
            Some(frame) if connected => TrackerView::Detail(frame.clone()),
            _ => TrackerView::Connecting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_state_precedence() {
        assert_eq!(
            DisplayState::derive(Some("rate limited"), true, true),
            DisplayState::Error("rate limited".into())
        );
        assert_eq!(DisplayState::derive(None, false, true), DisplayState::Loading);
        assert_eq!(DisplayState::derive(None, true, false), DisplayState::Loading);
        assert_eq!(DisplayState::derive(None, true, true), DisplayState::Ready);
    }

    #[test]
    fn test_tracker_view_needs_connection_and_frame() {
        let frame = TradeProgressFrame {
            trader_id: String::new(),
            trade_id: "t-1".into(),
            ticker: "AAPL".into(),
            quantity: 1.0,
            message: String::new(),
            event: "trade_completed".into(),
            progress: 45.0,
            status: None,
        };

        assert_eq!(TrackerView::derive(false, Some(&frame)), TrackerView::Connecting);
        assert_eq!(TrackerView::derive(true, None), TrackerView::Connecting);
        assert_eq!(TrackerView::derive(true, Some(&frame)), TrackerView::Detail(frame));
    }
}
