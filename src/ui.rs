use crate::app::{App, Focus, Selector};
use crate::map::choropleth::{hex_rgb, FeatureStyle, LOWEST_COLOR, THRESHOLDS};
use crate::map::{blend, MapLayers, BASEMAP_RGB};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

const SIDE_PANEL_WIDTH: u16 = 38;

/// Split the terminal into map, side panel and status bar
fn layout(area: Rect) -> (Rect, Rect, Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map + side panel
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(SIDE_PANEL_WIDTH)])
        .split(rows[0]);

    (cols[0], cols[1], rows[1])
}

fn map_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

/// Inner map rectangle for a terminal of the given size
pub fn map_inner(area: Rect) -> Rect {
    let (map, _, _) = layout(area);
    map_block(String::new()).inner(map)
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let (map, side, status) = layout(frame.area());
    render_map(frame, app, map);
    render_side_panel(frame, app, side);
    render_status_bar(frame, app, status);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.map_renderer.active_layer() {
        Some(layer) => format!(" {} ", layer.metric()),
        None => " Choropleth ".to_string(),
    };
    let block = map_block(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut viewport = app.viewport.clone();
    // Braille gives 2x4 resolution per character
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let layers = app
        .map_renderer
        .render(inner.width as usize, inner.height as usize, &viewport);
    frame.render_widget(MapWidget { layers }, inner);
}

/// Cell fills with braille borders on top
struct MapWidget {
    layers: MapLayers,
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (br, bg, bb) = self.layers.border_rgb;
        let border = Color::Rgb(br, bg, bb);

        for cy in 0..area.height.min(self.layers.height as u16) {
            for cx in 0..area.width.min(self.layers.width as u16) {
                let cell = &mut buf[(area.x + cx, area.y + cy)];
                if let Some((r, g, b)) = self.layers.fill_at(cx as usize, cy as usize) {
                    cell.set_bg(Color::Rgb(r, g, b));
                }
                if let Some(ch) = self.layers.borders.cell(cx as usize, cy as usize) {
                    cell.set_char(ch).set_fg(border);
                }
            }
        }
    }
}

fn render_side_panel(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Metric
            Constraint::Length(3),  // Region
            Constraint::Length(3),  // Group
            Constraint::Length(4),  // Popup
            Constraint::Length(11), // Legend
            Constraint::Min(6),     // Chart
        ])
        .split(area);

    render_selector(frame, chunks[0], " Metric ", &app.metrics, |m| m.name.as_str(), app.focus == Focus::Metric);
    render_selector(frame, chunks[1], " Region ", &app.regions, String::as_str, app.focus == Focus::Region);
    render_selector(frame, chunks[2], " Group ", &app.groups, String::as_str, app.focus == Focus::Group);
    render_popup(frame, app, chunks[3]);
    render_legend(frame, chunks[4]);

    let chart_block = panel_block(app.chart.title(), false);
    frame.render_widget(app.chart.widget(chart_block), chunks[5]);
}

fn panel_block(title: impl Into<String>, focused: bool) -> Block<'static> {
    let border = if focused { Color::Yellow } else { Color::DarkGray };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(Span::styled(title.into(), Style::default().fg(Color::Cyan)))
}

fn render_selector<T>(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    selector: &Selector<T>,
    label: impl Fn(&T) -> &str,
    focused: bool,
) {
    let line = match selector.selected() {
        Some(item) => Line::from(vec![
            Span::styled("‹ ", Style::default().fg(Color::DarkGray)),
            Span::styled(label(item).to_string(), Style::default().fg(Color::White)),
            Span::styled(" › ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!("{}/{}", selector.index() + 1, selector.items().len()),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        None => Line::from(Span::styled("loading…", Style::default().fg(Color::DarkGray))),
    };
    frame.render_widget(Paragraph::new(line).block(panel_block(title, focused)), area);
}

fn render_popup(frame: &mut Frame, app: &App, area: Rect) {
    let lines = match app.map_renderer.popup() {
        Some(popup) => vec![
            Line::from(Span::styled(
                popup.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("Value: {}", popup.value_text())),
        ],
        None => vec![Line::from(Span::styled(
            "right-click a region",
            Style::default().fg(Color::DarkGray),
        ))],
    };
    frame.render_widget(Paragraph::new(lines).block(panel_block(" Region info ", false)), area);
}

fn swatch(hex: &str) -> Span<'static> {
    let (r, g, b) = hex_rgb(hex).unwrap_or((255, 255, 255));
    Span::styled("██ ", Style::default().fg(Color::Rgb(r, g, b)))
}

fn render_legend(frame: &mut Frame, area: Rect) {
    let mut lines: Vec<Line> = THRESHOLDS
        .iter()
        .map(|(bound, color)| Line::from(vec![swatch(color), Span::raw(format!("> {}", bound))]))
        .collect();

    let lowest = THRESHOLDS.last().map(|(b, _)| *b).unwrap_or(0.0);
    lines.push(Line::from(vec![swatch(LOWEST_COLOR), Span::raw(format!("≤ {}", lowest))]));

    let no_data = FeatureStyle::no_data();
    let (r, g, b) = blend(no_data, BASEMAP_RGB);
    lines.push(Line::from(vec![
        Span::styled("██ ", Style::default().fg(Color::Rgb(r, g, b))),
        Span::raw("No data"),
    ]));

    frame.render_widget(Paragraph::new(lines).block(panel_block(" Legend ", false)), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.map_renderer.settings;

    let mut spans = vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::raw(" "),
        Span::styled(
            if settings.show_borders { "[B]orders " } else { "[b]orders " },
            Style::default().fg(if settings.show_borders { Color::Green } else { Color::DarkGray }),
        ),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
    ];
    if app.pending > 0 {
        spans.push(Span::styled(
            format!(" | loading {}", app.pending),
            Style::default().fg(Color::Magenta),
        ));
    }
    spans.push(Span::styled(
        " | tab:focus [/]:select hjkl:pan +/-:zoom f:fit r:reload q:quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
