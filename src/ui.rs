use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Widget, Wrap},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use solostudy::{
    format::{format_hms, format_ms},
    question_timer::TimerStatus,
    session::SessionStatus,
    Outcome,
};

use crate::{App, AppState, FormField, SessionForm};

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;

/// Cuts `s` to at most `max` terminal columns, marking the cut with `…`.
pub fn truncate_to_width(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

fn status_style(status: SessionStatus) -> Style {
    let color = match status {
        SessionStatus::Idle => Color::Gray,
        SessionStatus::Running => Color::Green,
        SessionStatus::Ended => Color::Yellow,
        SessionStatus::Expired => Color::Red,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn outcome_style(outcome: Outcome) -> Style {
    match outcome {
        Outcome::Correct => Style::default().fg(Color::Green),
        Outcome::Incorrect => Style::default().fg(Color::Red),
        Outcome::Unattempted => Style::default().fg(Color::DarkGray),
    }
}

/// Dims a key hint when the action it triggers is unavailable.
fn hint(key: &str, label: &str, enabled: bool) -> Vec<Span<'static>> {
    let style = if enabled {
        Style::default()
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };
    vec![
        Span::styled(
            format!(" {key} "),
            style.add_modifier(Modifier::BOLD).fg(Color::Cyan),
        ),
        Span::styled(format!("{label}  "), style),
    ]
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_form(form: &SessionForm, area: Rect, buf: &mut Buffer) {
    let popup = centered(area, 50, 8);
    Clear.render(popup, buf);

    let field = |label: &str, value: &str, active: bool| {
        let style = if active {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let cursor = if active { "▏" } else { "" };
        Line::from(vec![
            Span::styled(format!("{label:>9}: "), style),
            Span::raw(format!("{value}{cursor}")),
        ])
    };

    let lines = vec![
        field("Name", &form.name, form.field == FormField::Name),
        field("Minutes", &form.minutes, form.field == FormField::Minutes),
        Line::from(""),
        Line::from(Span::styled(
            "enter start · tab switch field · esc cancel",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("New session"),
        )
        .render(popup, buf);
}

fn render_confirm(area: Rect, buf: &mut Buffer) {
    let popup = centered(area, 44, 5);
    Clear.render(popup, buf);
    Paragraph::new(vec![
        Line::from(Span::styled(
            "Clear all logs? This cannot be undone.",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from("y confirm · any other key cancels"),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Confirm"))
    .render(popup, buf);
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let view = self.controller.view();
        let bold_style = Style::default().add_modifier(Modifier::BOLD);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(3), // session header
                Constraint::Length(3), // timers
                Constraint::Min(3),    // logs
                Constraint::Length(4), // hints + status line
            ])
            .split(area);

        // header
        let name = if view.session.name.is_empty() {
            "None"
        } else {
            view.session.name.as_str()
        };
        let name_width = (chunks[0].width as usize).saturating_sub(30);
        Paragraph::new(Line::from(vec![
            Span::styled("Session ", bold_style),
            Span::raw(truncate_to_width(name, name_width)),
            Span::raw("  "),
            Span::styled(
                view.session.status.to_string(),
                status_style(view.session.status),
            ),
        ]))
        .block(Block::default().borders(Borders::ALL).title("solostudy"))
        .render(chunks[0], buf);

        // timers
        let timer_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);

        let main_style = if view.session.main_remaining_seconds == 0 {
            bold_style.fg(Color::Red)
        } else {
            bold_style
        };
        Paragraph::new(Span::styled(
            format_hms(view.session.main_remaining_seconds),
            main_style,
        ))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Main time"))
        .render(timer_chunks[0], buf);

        let question_style = match view.question.status {
            TimerStatus::Running => bold_style.fg(Color::Green),
            TimerStatus::Paused => bold_style.fg(Color::Yellow),
            TimerStatus::Stopped => bold_style.add_modifier(Modifier::DIM),
        };
        Paragraph::new(Span::styled(
            format_ms(view.question.elapsed_seconds),
            question_style,
        ))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Question ({})", view.question.status)),
        )
        .render(timer_chunks[1], buf);

        // logs
        let header = Row::new(vec!["", "#", "Question time", "Main remaining", "Status"])
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
        let rows: Vec<Row> = view
            .logs
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let mark = if entry.selected { "[x]" } else { "[ ]" };
                let row = Row::new(vec![
                    Cell::from(mark),
                    Cell::from((idx + 1).to_string()),
                    Cell::from(format_ms(entry.time_spent_seconds)),
                    Cell::from(format_hms(entry.main_remaining_at_submit)),
                    Cell::from(entry.outcome.to_string()).style(outcome_style(entry.outcome)),
                ]);
                if idx == self.cursor && self.state == AppState::Main {
                    row.style(Style::default().add_modifier(Modifier::REVERSED))
                } else {
                    row
                }
            })
            .collect();
        let selected = view.logs.iter().filter(|e| e.selected).count();
        Table::new(
            rows,
            [
                Constraint::Length(4),
                Constraint::Length(4),
                Constraint::Length(14),
                Constraint::Length(15),
                Constraint::Min(11),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(format!(
            "Logs ({} total, {} selected)",
            view.logs.len(),
            selected
        )))
        .render(chunks[2], buf);

        // hints
        let timer_hint = if view.pause_question_enabled {
            hint("space", "pause", true)
        } else {
            hint("space", "start", view.start_question_enabled)
        };
        let mut first = hint("n", "new session", view.start_session_enabled);
        first.extend(hint("e", "end", view.end_session_enabled));
        first.extend(timer_hint);
        first.extend(hint("c/x/u", "correct/incorrect/unattempted", view.submit_enabled));

        let mut second = hint("enter", "select", !view.logs.is_empty());
        second.extend(hint("d", "delete", !view.logs.is_empty()));
        second.extend(hint("m", "merge", view.merge_enabled));
        second.extend(hint("C", "clear", view.clear_enabled));
        second.extend(hint("w", "export", view.export_enabled));
        second.extend(hint("q", "quit", true));

        let mut lines = vec![Line::from(first), Line::from(second)];
        if let Some(message) = &self.message {
            let style = if message.is_error {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::Green)
            };
            lines.push(Line::from(Span::styled(message.text.clone(), style)));
        }
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .render(chunks[3], buf);

        match &self.state {
            AppState::Main => {}
            AppState::NewSession(form) => render_form(form, area, buf),
            AppState::ConfirmClear => render_confirm(area, buf),
        }
    }
}
