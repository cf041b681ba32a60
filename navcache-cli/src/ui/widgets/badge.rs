//! "Instant navigation" badge shown when a lookup is served from cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use navcache::cache::{CacheKey, Tier};
use navcache::events::{CacheEvent, CacheEventChannel, Subscription};

/// The most recent cache hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeHit {
    pub key: CacheKey,
    pub tier: Tier,
    pub at: Instant,
}

/// Tracks cache hits and reports the latest one until it goes stale.
///
/// Visibility is computed from the hit time on each read; there is no
/// dismissal timer.
pub struct InstantNavigationBadge {
    last_hit: Arc<Mutex<Option<BadgeHit>>>,
    dismiss_after: Duration,
    _subscription: Subscription,
}

impl InstantNavigationBadge {
    /// Subscribe to hit events on `channel`.
    pub fn attach(channel: &CacheEventChannel, dismiss_after: Duration) -> Self {
        let last_hit = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&last_hit);
        let subscription = channel.subscribe(move |event| {
            if let CacheEvent::Hit { key, tier } = event {
                *slot.lock() = Some(BadgeHit {
                    key: key.clone(),
                    tier: *tier,
                    at: Instant::now(),
                });
            }
        });

        Self {
            last_hit,
            dismiss_after,
            _subscription: subscription,
        }
    }

    /// The hit to show at `now`, if it is recent enough.
    pub fn visible_at(&self, now: Instant) -> Option<BadgeHit> {
        self.last_hit
            .lock()
            .as_ref()
            .filter(|hit| now.saturating_duration_since(hit.at) < self.dismiss_after)
            .cloned()
    }

    pub fn visible(&self) -> Option<BadgeHit> {
        self.visible_at(Instant::now())
    }
}

impl Widget for &BadgeHit {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let line = Line::from(vec![
            Span::styled(
                " ⚡ Instant ",
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(self.key.to_string(), Style::default().fg(Color::White)),
            Span::styled(
                format!("  from {}", self.tier),
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        Paragraph::new(line).render(area, buf);
    }
}
