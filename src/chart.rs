use crate::data::BinSeries;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Bar, BarChart, BarGroup, Block, Paragraph, Widget},
};

/// The chart area's current content; each update replaces it wholesale
#[derive(Default)]
pub struct BarChartView {
    series: Option<BinSeries>,
    revision: u64,
}

impl BarChartView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, series: BinSeries) {
        self.revision += 1;
        log::debug!(
            "chart {}: {} / {} with {} bins",
            self.revision,
            series.region,
            series.group,
            series.bins.len()
        );
        self.series = Some(series);
    }

    pub fn series(&self) -> Option<&BinSeries> {
        self.series.as_ref()
    }

    /// Number of times the chart has been replaced
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn title(&self) -> String {
        match &self.series {
            Some(s) => format!(" {} · {} ", s.group, s.region),
            None => " Frequency ".to_string(),
        }
    }

    pub fn widget(&self, block: Block<'static>) -> BarChartWidget<'_> {
        BarChartWidget { view: self, block }
    }
}

/// Bar height for a value; bars can't go below zero
fn bar_height(value: f64) -> u64 {
    if value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

fn value_text(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

pub struct BarChartWidget<'a> {
    view: &'a BarChartView,
    block: Block<'static>,
}

impl Widget for BarChartWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = self.block.inner(area);
        self.block.render(area, buf);

        let series = match self.view.series() {
            Some(s) if !s.is_empty() => s,
            Some(_) => {
                Paragraph::new("No data for this region and group")
                    .style(Style::default().fg(Color::DarkGray))
                    .alignment(Alignment::Center)
                    .render(inner, buf);
                return;
            }
            None => {
                Paragraph::new("Select a region and group")
                    .style(Style::default().fg(Color::DarkGray))
                    .alignment(Alignment::Center)
                    .render(inner, buf);
                return;
            }
        };

        let bars: Vec<Bar<'_>> = series
            .bins
            .iter()
            .map(|bin| {
                Bar::default()
                    .value(bar_height(bin.value))
                    .text_value(value_text(bin.value))
                    .label(Line::from(bin.label.as_str()))
                    .style(Style::default().fg(Color::Rgb(0xFC, 0x4E, 0x2A)))
                    .value_style(Style::default().fg(Color::Black).bg(Color::Rgb(0xFC, 0x4E, 0x2A)))
            })
            .collect();

        let count = bars.len() as u16;
        let gap = 1;
        let bar_width = (inner.width.saturating_sub(count.saturating_sub(1) * gap) / count.max(1)).clamp(1, 12);
        let max = series.bins.iter().map(|b| bar_height(b.value)).max().unwrap_or(0).max(1);

        BarChart::default()
            .data(BarGroup::default().bars(&bars))
            .max(max)
            .bar_gap(gap)
            .bar_width(bar_width)
            .render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Bin;

    fn series(region: &str, values: &[(&str, f64)]) -> BinSeries {
        BinSeries {
            region: region.to_string(),
            group: "Age".to_string(),
            bins: values
                .iter()
                .map(|(label, value)| Bin { label: label.to_string(), value: *value })
                .collect(),
        }
    }

    #[test]
    fn test_replace_discards_previous_series() {
        let mut view = BarChartView::new();
        view.replace(series("Texas", &[("0-10", 4.0), ("10-20", 6.0)]));
        view.replace(series("Ohio", &[("0-10", 1.0)]));

        let current = view.series().unwrap();
        assert_eq!(current.region, "Ohio");
        assert_eq!(current.bins.len(), 1);
        assert_eq!(view.revision(), 2);
        assert_eq!(view.title(), " Age · Ohio ");
    }

    #[test]
    fn test_bar_heights_and_text() {
        assert_eq!(bar_height(12.6), 13);
        assert_eq!(bar_height(-4.0), 0);
        assert_eq!(value_text(12.0), "12");
        assert_eq!(value_text(12.34), "12.3");
        assert_eq!(value_text(-4.0), "-4");
    }

    #[test]
    fn test_render_labels_in_order() {
        let mut view = BarChartView::new();
        view.replace(series("Texas", &[("young", 4.0), ("old", 8.0)]));

        let area = Rect::new(0, 0, 30, 10);
        let mut buf = Buffer::empty(area);
        view.widget(Block::default()).render(area, &mut buf);

        let bottom: String = (0..area.width).map(|x| buf[(x, 9)].symbol().to_string()).collect();
        let young = bottom.find("young").expect("first label drawn");
        let old = bottom.find("old").expect("second label drawn");
        assert!(young < old);
    }

    #[test]
    fn test_render_empty_series_message() {
        let mut view = BarChartView::new();
        view.replace(series("Atlantis", &[]));

        let area = Rect::new(0, 0, 40, 3);
        let mut buf = Buffer::empty(area);
        view.widget(Block::default()).render(area, &mut buf);

        let text: String = (0..area.height)
            .flat_map(|y| (0..area.width).map(move |x| (x, y)))
            .map(|(x, y)| buf[(x, y)].symbol().to_string())
            .collect();
        assert!(text.contains("No data for this region and group"));
    }
}
