use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph};

use super::super::display::truncate;

const ACCENT: Color = Color::Rgb(110, 170, 255);
const MUTED: Color = Color::Rgb(185, 195, 210);

pub(super) fn draw_picker(
    frame: &mut Frame,
    title: &str,
    options: &[String],
    list_state: &mut ListState,
) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let position = list_state
        .selected()
        .map(|idx| format!("{}/{}", idx + 1, options.len()))
        .unwrap_or_else(|| "-".to_string());
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "BGM",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(title.to_string(), Style::default().fg(Color::Yellow)),
        Span::styled("   ", Style::default()),
        Span::styled(position, Style::default().fg(MUTED)),
    ]))
    .alignment(Alignment::Center)
    .block(panel_block("Select"));
    frame.render_widget(header, chunks[0]);

    let width = usize::from(chunks[1].width.saturating_sub(6));
    let items: Vec<ListItem> = options
        .iter()
        .map(|option| ListItem::new(truncate(option, width.max(8))))
        .collect();
    let list = List::new(items)
        .block(panel_block("Options"))
        .style(Style::default().fg(Color::Rgb(230, 230, 230)))
        .highlight_style(
            Style::default()
                .bg(ACCENT)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, chunks[1], list_state);

    let controls = Paragraph::new(Line::from(Span::styled(
        "↑/↓ move  Home/End jump  Enter select  Esc/q cancel",
        Style::default().fg(MUTED),
    )))
    .alignment(Alignment::Center)
    .block(panel_block("Controls"));
    frame.render_widget(controls, chunks[2]);
}

fn panel_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(125, 135, 150)))
        .title(title)
}
