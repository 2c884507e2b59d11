use chrono::Local;
use rand::Rng;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Widget},
};
use time_humanize::HumanTime;

use crate::app::{App, View};
use crate::clock::Clock;
use crate::engine::{Phase, ReactionEngine};
use crate::records::{average_ms, format_seconds, records_view, Delta};

const HORIZONTAL_MARGIN: u16 = 2;
const LAMP_WIDTH: u16 = 5;
const LAMP_GAP: u16 = 1;
const DIALOG_WIDTH: u16 = 60;

const ACCENT: Color = Color::Rgb(225, 6, 0);

impl<C: Clock, R: Rng> Widget for &App<C, R> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        render_cockpit(&self.engine, area, buf);
        if self.view == View::Records {
            render_records(&self.engine, area, buf);
        }
    }
}

pub fn button_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "START ENGINE",
        Phase::Sequencing | Phase::WaitingForGo => "STAY READY",
        Phase::Reaction => "RELEASE!",
        Phase::Result => "RETRY",
        Phase::FalseStart => "RESTART",
    }
}

fn seconds(ms: f64) -> String {
    format!("{:.3}s", ms / 1000.0)
}

fn render_cockpit<C: Clock, R: Rng>(engine: &ReactionEngine<C, R>, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().fg(Color::DarkGray);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(1), // banner
            Constraint::Length(4), // light strip
            Constraint::Length(3), // status
            Constraint::Length(3), // button
            Constraint::Length(3), // engineer note
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    // header
    let phase = engine.phase();
    let live_style = if phase == Phase::Reaction {
        bold.fg(Color::Green)
    } else {
        bold
    };
    let best = engine
        .stats()
        .best_time_ms()
        .map(|b| seconds(b as f64))
        .unwrap_or_else(|| "--.---".to_string());
    let header = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("APX ", bold),
            Span::styled("REFLX", bold.fg(ACCENT)),
        ]),
        Line::from(vec![
            Span::styled("LIVE FEED ", dim),
            Span::styled(seconds(engine.live_elapsed_ms()), live_style),
            Span::raw("   "),
            Span::styled("SESSION BEST ", dim),
            Span::styled(best, bold.fg(Color::Magenta)),
        ]),
    ])
    .alignment(Alignment::Center);
    header.render(chunks[0], buf);

    let banner = match phase {
        Phase::FalseStart => Some(Span::styled("FALSE START", bold.fg(ACCENT))),
        Phase::Reaction => Some(Span::styled("LIGHTS OUT!", bold.fg(Color::Green))),
        _ => None,
    };
    if let Some(banner) = banner {
        Paragraph::new(Line::from(banner))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
    }

    render_light_strip(engine, chunks[2], buf);

    // status
    let status = match (phase, engine.current_result()) {
        (Phase::Result, Some(result)) => {
            let rating = result.rating();
            vec![
                Line::from(Span::styled(
                    format!("{}s", format_seconds(result.time_ms)),
                    bold.fg(rating.color()),
                )),
                Line::from(Span::styled(rating.label(), bold.fg(rating.color()))),
            ]
        }
        (Phase::FalseStart, _) => vec![
            Line::from(Span::styled(
                "JUMP START",
                bold.fg(ACCENT).add_modifier(Modifier::ITALIC),
            )),
            Line::from(Span::styled("WAIT FOR SIGNAL EXTINGUISH", dim)),
        ],
        (Phase::Idle, _) => vec![Line::from(Span::styled(
            "SYSTEMS NOMINAL • READY FOR INPUT",
            dim,
        ))],
        _ => vec![],
    };
    Paragraph::new(status)
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    // action button
    let button_style = match phase {
        Phase::Reaction => bold.fg(Color::Black).bg(Color::Green),
        Phase::Sequencing | Phase::WaitingForGo => dim,
        Phase::FalseStart => bold.fg(ACCENT),
        Phase::Idle | Phase::Result => bold,
    };
    let button_area = centered_width(chunks[4], 24);
    Paragraph::new(Span::styled(button_label(phase), button_style))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(button_style))
        .render(button_area, buf);

    if let Some(note) = engine.feedback() {
        Paragraph::new(Line::from(Span::styled(
            format!("\"{note}\""),
            Style::default().add_modifier(Modifier::ITALIC),
        )))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .title(Span::styled("ENGINEER NOTE", bold.fg(ACCENT))),
        )
        .render(chunks[5], buf);
    }

    Paragraph::new(Span::styled(
        "space/enter action  c clear  r records  esc/q quit",
        dim,
    ))
    .alignment(Alignment::Center)
    .render(chunks[7], buf);
}

fn render_light_strip<C: Clock, R: Rng>(
    engine: &ReactionEngine<C, R>,
    area: Rect,
    buf: &mut Buffer,
) {
    let count = engine.timing().light_count as u16;
    let total = count * LAMP_WIDTH + count.saturating_sub(1) * LAMP_GAP;
    let start_x = area.x + area.width.saturating_sub(total) / 2;

    for idx in 0..count {
        let x = start_x + idx * (LAMP_WIDTH + LAMP_GAP);
        if x + LAMP_WIDTH > area.right() {
            break;
        }
        let lamp = if engine.lamp_on(idx as u8) {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Paragraph::new(vec![
            Line::from(Span::styled("●", lamp)),
            Line::from(Span::styled("●", lamp)),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
        .render(Rect::new(x, area.y, LAMP_WIDTH, area.height), buf);
    }
}

fn render_records<C: Clock, R: Rng>(engine: &ReactionEngine<C, R>, area: Rect, buf: &mut Buffer) {
    let stats = engine.stats();
    let attempts = stats.recent_attempts();
    let height = (attempts.len().max(1) as u16 + 6).min(area.height);
    let dialog = centered_rect(area, DIALOG_WIDTH, height);

    Clear.render(dialog, buf);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .title(Span::styled(
            " LAST 5 CHANCES ",
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Line::from(" esc close ").right_aligned());
    let inner = block.inner(dialog);
    block.render(dialog, buf);

    if attempts.is_empty() {
        Paragraph::new(Span::styled(
            "NO DATA RECORDED",
            Style::default().fg(Color::DarkGray),
        ))
        .alignment(Alignment::Center)
        .render(inner, buf);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);

    let now = Local::now();
    let rows = records_view(attempts, stats.total_attempts())
        .into_iter()
        .map(|row| {
            let delta_style = match row.delta {
                Some(Delta::Better) => Style::default().fg(Color::Green),
                Some(Delta::Slower) => Style::default().fg(ACCENT),
                _ => Style::default(),
            };
            let age = (now - row.timestamp).num_seconds().max(0);
            Row::new(vec![
                Cell::from(row.serial_label()).style(Style::default().fg(Color::DarkGray)),
                Cell::from(row.seconds_label())
                    .style(delta_style.add_modifier(Modifier::BOLD)),
                Cell::from(row.delta.map(|d| d.marker()).unwrap_or("")).style(delta_style),
                Cell::from(row.rating.label()).style(Style::default().fg(row.rating.color())),
                Cell::from(HumanTime::from_seconds(-age).to_string())
                    .style(Style::default().fg(Color::DarkGray)),
            ])
        });

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(14),
            Constraint::Min(8),
        ],
    )
    .header(
        Row::new(vec!["SN", "TIMING (S)", "DELTA", "RATING", "WHEN"])
            .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD))
            .bottom_margin(1),
    );
    Widget::render(table, chunks[0], buf);

    if let Some(avg) = average_ms(attempts) {
        Paragraph::new(Line::from(vec![
            Span::styled("AVG ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                seconds(avg),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]))
        .alignment(Alignment::Right)
        .render(chunks[1], buf);
    }
}

fn centered_width(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y,
        width,
        area.height,
    )
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
