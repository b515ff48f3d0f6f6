use ratatui::{
    prelude::*,
    symbols::Marker,
    widgets::{
        BarChart, Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table,
        TableState, Wrap,
        canvas::{Canvas, Line as CanvasLine, Points},
    },
};
use tournees_core::{
    dataset::Dataset,
    kpi::{Kpis, cost_by_producer, distance_by_tour},
    model::{PointKind, Rgba},
};

use crate::app::{App, Facet, Failure, Screen, View};

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();

    // Outer layout: title, main content, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, content_area, status_area] = chunks else {
        return;
    };

    let title = match app.screen {
        Screen::SourceSelect => "tournees – delivery tour dashboard".to_owned(),
        Screen::Dashboard => format!("tournees – {}", app.selected_source_name()),
    };
    let header = Paragraph::new(title)
        .block(Block::default().borders(Borders::ALL).title("Tournées"));
    frame.render_widget(header, *header_area);

    match app.screen {
        Screen::SourceSelect => draw_source_select(frame, app, *content_area),
        Screen::Dashboard => draw_dashboard(frame, app, *content_area),
    }

    // Status bar
    let nav_hint = match app.screen {
        Screen::SourceSelect => "↑/↓ move · Enter/Space open source · q/Ctrl-C quit",
        Screen::Dashboard => {
            "↑/↓ move · Space toggle · a all · Tab next filter · v view · j/k PgUp/PgDn rows \
             · r refresh · Esc back · q quit"
        }
    };

    let status_text = if app.is_loading {
        format!("Loading… · {nav_hint}")
    } else if let Some(msg) = &app.error_message {
        format!("{msg} · {nav_hint}")
    } else {
        nav_hint.to_owned()
    };

    let status_style = if app.error_message.is_some() {
        Style::default().fg(Color::Red)
    } else if app.is_loading {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, *status_area);
}

fn draw_source_select(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let items = app
        .sources
        .iter()
        .enumerate()
        .map(|(idx, (_id, name))| {
            let prefix = if idx == app.source_list_index {
                "> "
            } else {
                "  "
            };
            ListItem::new(format!("{prefix}{name}"))
        })
        .collect::<Vec<ListItem<'_>>>();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Select source (↑/↓, Enter)"),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !app.sources.is_empty() {
        state.select(Some(app.source_list_index));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_dashboard(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let notice = if app.is_loading {
        Some("Loading tours…")
    } else if app.failure == Some(Failure::Unreachable) {
        Some("The source could not be reached. Press r to retry or Esc to pick another one.")
    } else if app.failure == Some(Failure::Unreadable) {
        Some("The source answered but its content could not be read. See the status line.")
    } else if app.dataset.record_count == 0 {
        Some("The connection works, but the table is empty.")
    } else {
        None
    };

    if let Some(text) = notice {
        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Dashboard"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }
    if app.dataset.is_empty() {
        draw_skipped(frame, &app.dataset, area);
        return;
    }

    let visible = app.visible();

    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);
    let chunks = layout_chunks.as_ref();
    let [kpi_area, body_area] = chunks else {
        return;
    };

    draw_kpis(frame, &visible.kpis(), *kpi_area);

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(32), Constraint::Min(0)])
        .split(*body_area);
    let body = body_chunks.as_ref();
    let [filter_area, view_area] = body else {
        return;
    };

    draw_filters(frame, app, *filter_area);

    if visible.is_empty() {
        let paragraph = Paragraph::new("No tour matches the selection.")
            .block(Block::default().borders(Borders::ALL).title(view_title(app.view)))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, *view_area);
        return;
    }

    match app.view {
        View::Map => draw_map(frame, app, &visible, *view_area),
        View::Charts => draw_charts(frame, &visible, *view_area),
        View::Table => draw_table(frame, app, &visible, *view_area),
    }
}

fn view_title(view: View) -> &'static str {
    match view {
        View::Map => "Map",
        View::Charts => "Charts",
        View::Table => "Tours",
    }
}

fn draw_kpis(frame: &mut Frame<'_>, kpis: &Kpis, area: Rect) {
    let cells = [
        ("Producers", kpis.active_producers.to_string()),
        ("Tours", kpis.tour_count.to_string()),
        ("Stops", kpis.stop_count.to_string()),
        ("Distance", format!("{:.0} km", kpis.total_distance_km)),
        ("Volume", format!("{:.0} kg", kpis.total_volume_kg)),
        ("Km / stop", format!("{:.1} km", kpis.km_per_stop())),
        ("Unit cost", format!("{:.2} €/kg", kpis.cost_per_kg())),
    ];

    let count = u32::try_from(cells.len()).unwrap_or(1);
    let layout_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(cells.iter().map(|_| Constraint::Ratio(1, count)))
        .split(area);

    for ((label, value), cell_area) in cells.into_iter().zip(layout_chunks.iter()) {
        let paragraph = Paragraph::new(value)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(label));
        frame.render_widget(paragraph, *cell_area);
    }
}

fn draw_filters(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let facets = [
        (Facet::Producers, "Producers"),
        (Facet::Days, "Days"),
        (Facet::Vehicles, "Vehicles"),
    ];

    for ((facet, label), facet_area) in facets.into_iter().zip(layout_chunks.iter()) {
        let choices = app.facet_choices(facet);
        let selection = app.facet_selection(facet);
        let focused = app.focus == facet;

        let items = choices
            .iter()
            .map(|choice| {
                let mark = if selection.contains(choice) { "[x]" } else { "[ ]" };
                ListItem::new(format!("{mark} {choice}"))
            })
            .collect::<Vec<ListItem<'_>>>();

        let border_style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style)
                    .title(format!("{label} ({})", choices.len())),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let mut state = ListState::default();
        if focused && !choices.is_empty() {
            state.select(Some(app.facet_index(facet)));
        }
        frame.render_stateful_widget(list, *facet_area, &mut state);
    }
}

fn draw_map(frame: &mut Frame<'_>, app: &App, visible: &Dataset, area: Rect) {
    let center = visible.map_center(app.fallback_center);
    let title = format!(
        "Map ({} routes, centered on {:.3}, {:.3})",
        visible.paths.len(),
        center.lat,
        center.lon
    );

    let Some(bounds) = visible.bounds() else {
        let paragraph = Paragraph::new("No located depot in this selection.")
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    };
    let bounds = bounds.padded(0.05, 0.005);

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .marker(Marker::Braille)
        .x_bounds([bounds.min.lon, bounds.max.lon])
        .y_bounds([bounds.min.lat, bounds.max.lat])
        .paint(|ctx| {
            for path in &visible.paths {
                let color = terminal_color(path.color);
                for leg in path.vertices.windows(2) {
                    if let [from, to] = leg {
                        ctx.draw(&CanvasLine::new(from.lon, from.lat, to.lon, to.lat, color));
                    }
                }
            }
            ctx.layer();

            for point in &visible.points {
                // Depot markers are near-black, unreadable on a dark terminal.
                let color = match point.kind {
                    PointKind::Depot => Color::White,
                    PointKind::Delivery => terminal_color(point.color),
                };
                ctx.draw(&Points {
                    coords: &[(point.coordinates.lon, point.coordinates.lat)],
                    color,
                });
                if point.kind == PointKind::Depot {
                    ctx.print(
                        point.coordinates.lon,
                        point.coordinates.lat,
                        Span::styled(point.producer.clone(), Style::default().fg(color)),
                    );
                }
            }
        });

    frame.render_widget(canvas, area);
}

fn draw_charts(frame: &mut Frame<'_>, visible: &Dataset, area: Rect) {
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let chunks = layout_chunks.as_ref();
    let [cost_area, distance_area] = chunks else {
        return;
    };

    let costs = cost_by_producer(&visible.metrics);
    let cost_bars: Vec<(&str, u64)> = costs
        .iter()
        .map(|(producer, cost)| (producer.as_str(), bar_value(*cost)))
        .collect();
    let cost_chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Cost per producer (€)"),
        )
        .data(cost_bars.as_slice())
        .bar_width(12)
        .bar_gap(2)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    frame.render_widget(cost_chart, *cost_area);

    let distances = distance_by_tour(&visible.metrics);
    let distance_bars: Vec<(&str, u64)> = distances
        .iter()
        .map(|(tour, distance)| (tour.as_str(), bar_value(*distance)))
        .collect();
    let distance_chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Distance per tour (km)"),
        )
        .data(distance_bars.as_slice())
        .bar_width(12)
        .bar_gap(2)
        .bar_style(Style::default().fg(Color::Green))
        .value_style(Style::default().fg(Color::Black).bg(Color::Green));
    frame.render_widget(distance_chart, *distance_area);
}

fn draw_skipped(frame: &mut Frame<'_>, dataset: &Dataset, area: Rect) {
    let rows = dataset.skipped.iter().map(|skipped| {
        Row::new(vec![
            Cell::from(skipped.producer.clone()),
            Cell::from(skipped.created_at.clone().unwrap_or_default()),
            Cell::from(skipped.reason.clone()),
            Cell::from(skipped.excerpt.clone()),
        ])
    });

    let column_widths = [
        Constraint::Length(20),
        Constraint::Length(26),
        Constraint::Length(32),
        Constraint::Min(20),
    ];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec!["Producer", "Created", "Reason", "Payload"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(format!(
            "Records were received but no tour could be extracted ({})",
            dataset.record_count
        )))
        .column_spacing(1);

    frame.render_widget(table, area);
}

fn draw_table(frame: &mut Frame<'_>, app: &App, visible: &Dataset, area: Rect) {
    let selected = app
        .table_row
        .min(visible.metrics.len().saturating_sub(1));
    let rows = visible.metrics.iter().map(|metric| {
        let sent_on = metric
            .sent_on
            .map(|date| date.format("%d.%m.%Y").to_string())
            .unwrap_or_default();

        Row::new(vec![
            Cell::from(metric.producer.clone()),
            Cell::from(metric.day.clone()),
            Cell::from(metric.tour_name.clone()),
            Cell::from(metric.vehicle_type.clone()),
            Cell::from(format!("{:.2} €", metric.cost)),
            Cell::from(format!("{:.2} €", metric.revenue)),
            Cell::from(format!("{:.1} km", metric.distance)),
            Cell::from(format!("{:.0} kg", metric.total_volume_kg)),
            Cell::from(metric.stop_count.to_string()),
            Cell::from(sent_on),
        ])
    });

    let column_widths = [
        Constraint::Min(16),
        Constraint::Length(10),
        Constraint::Min(14),
        Constraint::Length(12),
        Constraint::Length(11),
        Constraint::Length(11),
        Constraint::Length(9),
        Constraint::Length(8),
        Constraint::Length(6),
        Constraint::Length(10),
    ];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec![
                "Producer", "Day", "Tour", "Vehicle", "Cost", "Revenue", "Distance", "Volume",
                "Stops", "Sent",
            ])
            .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(format!(
            "Tours ({}/{})",
            selected + 1,
            visible.metrics.len()
        )))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .column_spacing(1);

    let mut state = TableState::default().with_selected(Some(selected));
    frame.render_stateful_widget(table, area, &mut state);
}

fn terminal_color(color: Rgba) -> Color {
    Color::Rgb(color.red, color.green, color.blue)
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "clamped to a non-negative whole number first"
)]
fn bar_value(value: f64) -> u64 {
    value.max(0.0).round() as u64
}
