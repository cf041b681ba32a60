//! Cache statistics panel.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use navcache::stats::StatsSnapshot;

use super::efficiency::EfficiencyBand;
use super::format::format_size;

const BAR_WIDTH: usize = 20;
const MAX_LISTED_KEYS: usize = 8;

/// Widget rendering a [`StatsSnapshot`].
pub struct CacheStatsWidget<'a> {
    snapshot: &'a StatsSnapshot,
}

impl<'a> CacheStatsWidget<'a> {
    pub fn new(snapshot: &'a StatsSnapshot) -> Self {
        Self { snapshot }
    }

    fn bar(percent: u32) -> String {
        let filled = (percent.min(100) as usize * BAR_WIDTH + 50) / 100;
        format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
    }

    fn label(text: &str) -> Span<'static> {
        Span::styled(format!("  {:<12}", text), Style::default().fg(Color::White))
    }

    fn preloaded_line(&self) -> Line<'static> {
        let keys = &self.snapshot.preloaded_keys;
        let mut listed: Vec<String> = keys
            .iter()
            .take(MAX_LISTED_KEYS)
            .map(|key| key.to_string())
            .collect();
        if keys.len() > MAX_LISTED_KEYS {
            listed.push(format!("+{} more", keys.len() - MAX_LISTED_KEYS));
        }
        let text = if listed.is_empty() {
            "none".to_string()
        } else {
            listed.join(", ")
        };
        Line::from(vec![
            Self::label("Keys:"),
            Span::styled(text, Style::default().fg(Color::DarkGray)),
        ])
    }
}

impl Widget for CacheStatsWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let snapshot = self.snapshot;
        let efficiency = snapshot.efficiency();
        let band = EfficiencyBand::from_percent(efficiency);

        let text = vec![
            Line::from(vec![
                Self::label("Memory:"),
                Span::styled(
                    format!("{} items", snapshot.memory_items),
                    Style::default().fg(Color::Cyan),
                ),
            ]),
            Line::from(vec![
                Self::label("Persistent:"),
                Span::styled(
                    format!("{} items", snapshot.persistent_items),
                    Style::default().fg(Color::Blue),
                ),
            ]),
            Line::from(vec![
                Self::label("Size:"),
                Span::styled(
                    format_size(snapshot.total_size_bytes),
                    Style::default().fg(Color::White),
                ),
            ]),
            Line::raw(""),
            Line::from(vec![
                Self::label("Preloaded:"),
                Span::styled(
                    format!("{}", snapshot.preloaded_count),
                    Style::default().fg(Color::White),
                ),
            ]),
            self.preloaded_line(),
            Line::from(vec![
                Self::label("Efficiency:"),
                Span::styled(Self::bar(efficiency), Style::default().fg(band.color())),
                Span::styled(
                    format!("  {}% ({})", efficiency, band.label()),
                    Style::default().fg(band.color()),
                ),
            ]),
        ];

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Cache ")
            .border_style(Style::default().fg(Color::DarkGray));
        Paragraph::new(text).block(block).render(area, buf);
    }
}
