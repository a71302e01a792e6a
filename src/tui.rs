use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use futures_util::StreamExt;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::time::Duration;
use tracing::warn;

use crate::api::JobSearch;
use crate::app::AppContext;
use crate::models::{ApplicationStatus, Job, JobApplication};
use crate::theme::Palette;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Jobs,
    Applications,
    Dashboard,
}

impl View {
    fn next(self) -> Self {
        match self {
            View::Jobs => View::Applications,
            View::Applications => View::Dashboard,
            View::Dashboard => View::Jobs,
        }
    }

    fn title(self) -> &'static str {
        match self {
            View::Jobs => "Jobs",
            View::Applications => "Applications",
            View::Dashboard => "Dashboard",
        }
    }
}

struct AppState {
    view: View,
    selected: usize,
    scroll_offset: u16,
    // Some while the search prompt is open
    search_input: Option<String>,
    search: JobSearch,
    notice: Option<String>,
}

impl AppState {
    fn new() -> Self {
        Self {
            view: View::Jobs,
            selected: 0,
            scroll_offset: 0,
            search_input: None,
            search: JobSearch::default(),
            notice: None,
        }
    }

    fn next(&mut self, len: usize) {
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn switch_view(&mut self) {
        self.view = self.view.next();
        self.selected = 0;
        self.scroll_offset = 0;
    }
}

/// Applications whose job is still listed, paired with it. Others are hidden.
fn visible_applications(ctx: &AppContext) -> Vec<(JobApplication, Job)> {
    ctx.jobs
        .applications()
        .into_iter()
        .filter_map(|app| ctx.jobs.job_for(&app).map(|job| (app, job)))
        .collect()
}

pub async fn run_browse(ctx: &mut AppContext<'_>) -> Result<()> {
    let mut state = AppState::new();

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, ctx).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    ctx: &mut AppContext<'_>,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(200));
    let mut list_state = ListState::default();

    loop {
        let len = match state.view {
            View::Jobs => ctx.jobs.jobs().len(),
            View::Applications => visible_applications(ctx).len(),
            View::Dashboard => 0,
        };
        if len > 0 && state.selected >= len {
            state.selected = len - 1;
        }
        list_state.select(if len == 0 { None } else { Some(state.selected) });
        terminal.draw(|frame| draw(frame, state, ctx, &mut list_state))?;

        // store operations run as tasks, so keys keep working while they are in flight
        tokio::select! {
            _ = tick.tick() => {}
            event = events.next() => {
                let Some(event) = event else { break };
                if let Event::Key(key) = event? {
                    if key.kind == KeyEventKind::Press && !handle_key(key, state, ctx, len) {
                        break;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Returns false when the user quits.
fn handle_key(key: KeyEvent, state: &mut AppState, ctx: &mut AppContext<'_>, len: usize) -> bool {
    if let Some(input) = state.search_input.as_mut() {
        match key.code {
            KeyCode::Esc => state.search_input = None,
            KeyCode::Enter => {
                let text = input.trim().to_string();
                state.search.query = if text.is_empty() { None } else { Some(text) };
                state.search_input = None;
                state.selected = 0;
                spawn_fetch_jobs(ctx, state.search.clone());
            }
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) => input.push(c),
            _ => {}
        }
        return true;
    }

    state.notice = None;
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return false,
        KeyCode::Tab => state.switch_view(),
        KeyCode::Down | KeyCode::Char('j') => state.next(len),
        KeyCode::Up | KeyCode::Char('k') => state.prev(),
        KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
        KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
        KeyCode::Char('t') => match ctx.theme.toggle_theme() {
            Ok(mode) => state.notice = Some(format!("Theme: {}", mode)),
            Err(e) => state.notice = Some(format!("Could not save theme: {:#}", e)),
        },
        KeyCode::Char('/') if state.view == View::Jobs => {
            state.search_input = Some(state.search.query.clone().unwrap_or_default());
        }
        KeyCode::Char('R') if state.view == View::Jobs => {
            state.search.remote = match state.search.remote {
                None => Some(true),
                Some(true) => Some(false),
                Some(false) => None,
            };
            spawn_fetch_jobs(ctx, state.search.clone());
        }
        KeyCode::Char('r') => {
            spawn_fetch_jobs(ctx, state.search.clone());
            let jobs = ctx.jobs.clone();
            tokio::spawn(async move {
                let _ = jobs.fetch_applications().await;
            });
            let profile = ctx.profile.clone();
            tokio::spawn(async move {
                let _ = profile.fetch_profile().await;
            });
        }
        KeyCode::Char('a') if state.view == View::Jobs => {
            if let Some(job) = ctx.jobs.jobs().get(state.selected) {
                if ctx.jobs.is_applied(&job.job_id) {
                    state.notice = Some(format!("Already applied to {}", job.title));
                } else {
                    let jobs = ctx.jobs.clone();
                    let job_id = job.job_id.clone();
                    tokio::spawn(async move {
                        let _ = jobs.apply_to_job(&job_id).await;
                    });
                }
            }
        }
        KeyCode::Char(c) if state.view == View::Applications => {
            let status = match c {
                '1' => ApplicationStatus::Applied,
                '2' => ApplicationStatus::Interviewing,
                '3' => ApplicationStatus::Offered,
                '4' => ApplicationStatus::Accepted,
                '5' => ApplicationStatus::Rejected,
                _ => return true,
            };
            if let Some((app, _)) = visible_applications(ctx).get(state.selected) {
                let jobs = ctx.jobs.clone();
                let id = app.id.clone();
                tokio::spawn(async move {
                    if let Err(e) = jobs.update_application(&id, status).await {
                        warn!(error = %e, "status change failed");
                    }
                });
            }
        }
        _ => {}
    }
    true
}

fn spawn_fetch_jobs(ctx: &AppContext<'_>, search: JobSearch) {
    let jobs = ctx.jobs.clone();
    tokio::spawn(async move {
        let _ = jobs.fetch_jobs(Some(&search)).await;
    });
}

fn draw(frame: &mut Frame, state: &AppState, ctx: &AppContext<'_>, list_state: &mut ListState) {
    let palette = *ctx.theme.palette();
    frame.render_widget(Block::default().style(palette.base), frame.area());

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    match state.view {
        View::Jobs => draw_jobs(frame, rows[0], state, ctx, list_state, &palette),
        View::Applications => draw_applications(frame, rows[0], state, ctx, list_state, &palette),
        View::Dashboard => draw_dashboard(frame, rows[0], ctx, &palette),
    }

    draw_footer(frame, rows[1], state, ctx, &palette);
}

fn split_panels(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area)
}

fn panel<'a>(title: String, palette: &Palette) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .style(palette.base)
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn draw_jobs(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    ctx: &AppContext<'_>,
    list_state: &mut ListState,
    palette: &Palette,
) {
    let chunks = split_panels(area);
    let jobs = ctx.jobs.jobs();

    let items: Vec<ListItem> = jobs
        .iter()
        .map(|job| {
            let marker = if ctx.jobs.is_applied(&job.job_id) { "+" } else { " " };
            ListItem::new(format!("{} {} | {}", marker, truncate(&job.title, 32), job.company))
        })
        .collect();

    let mut title = format!(" {} ({}) ", View::Jobs.title(), jobs.len());
    if let Some(query) = &state.search.query {
        title.push_str(&format!("[{}] ", query));
    }
    if let Some(remote) = state.search.remote {
        title.push_str(if remote { "[remote] " } else { "[on-site] " });
    }

    let list = List::new(items)
        .block(panel(title, palette))
        .highlight_style(palette.highlight)
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[0], list_state);

    let detail = match jobs.get(state.selected) {
        Some(job) => job_detail(job, ctx.jobs.is_applied(&job.job_id), palette),
        None => Text::styled("No jobs found. Press / to search or r to refresh.", palette.muted),
    };
    let detail_widget = Paragraph::new(detail)
        .block(panel(" Detail ".to_string(), palette))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail_widget, chunks[1]);
}

fn job_detail(job: &Job, applied: bool, palette: &Palette) -> Text<'static> {
    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        job.title.clone(),
        palette.base.add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {} - {}", job.company, job.location)));
    if applied {
        lines.push(Line::from(Span::styled("Applied", palette.accent)));
    }
    lines.push(Line::from(format!("URL: {}", job.url)));
    if !job.source.is_empty() {
        lines.push(Line::from(format!("Source: {}", job.source)));
    }
    if let Some(salary) = &job.salary_range {
        lines.push(Line::from(format!(
            "Salary: {} {} - {}",
            salary.currency, salary.min, salary.max
        )));
    }
    if let Some(posted) = &job.posted_date {
        lines.push(Line::from(format!("Posted: {}", posted)));
    }
    let mut facts = Vec::new();
    if let Some(remote) = job.is_remote {
        facts.push(if remote { "remote".to_string() } else { "on-site".to_string() });
    }
    if let Some(level) = &job.experience_level {
        facts.push(level.clone());
    }
    if let Some(kind) = &job.job_type {
        facts.push(kind.clone());
    }
    if !facts.is_empty() {
        lines.push(Line::from(facts.join(" | ")));
    }

    lines.push(Line::from(""));

    if let Some(requirements) = job.requirements.as_ref().filter(|r| !r.is_empty()) {
        lines.push(Line::from(Span::styled(
            "Requirements",
            palette.base.add_modifier(Modifier::BOLD),
        )));
        for requirement in requirements {
            lines.push(Line::from(format!("  - {}", requirement)));
        }
        lines.push(Line::from(""));
    }

    match &job.description {
        Some(description) => {
            for line in textwrap::fill(description, 70).lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        None => lines.push(Line::from(Span::styled("(No description)", palette.muted))),
    }

    Text::from(lines)
}

fn draw_applications(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    ctx: &AppContext<'_>,
    list_state: &mut ListState,
    palette: &Palette,
) {
    let chunks = split_panels(area);
    let visible = visible_applications(ctx);

    let items: Vec<ListItem> = visible
        .iter()
        .map(|(app, job)| {
            ListItem::new(format!(
                "{:<12} {} | {}",
                app.status,
                truncate(&job.title, 28),
                job.company
            ))
        })
        .collect();

    let list = List::new(items)
        .block(panel(format!(" {} ({}) ", View::Applications.title(), visible.len()), palette))
        .highlight_style(palette.highlight)
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[0], list_state);

    let detail = match visible.get(state.selected) {
        Some((app, job)) => {
            let mut lines = vec![
                Line::from(Span::styled(
                    job.title.clone(),
                    palette.base.add_modifier(Modifier::BOLD),
                )),
                Line::from(format!("at {} - {}", job.company, job.location)),
                Line::from(Span::styled(format!("Status: {}", app.status), palette.accent)),
                Line::from(format!("Applied: {}", app.applied_date)),
                Line::from(format!("Updated: {}", app.last_updated)),
                Line::from(format!("URL: {}", job.url)),
            ];
            if let Some(notes) = &app.notes {
                lines.push(Line::from(""));
                for line in textwrap::fill(notes, 70).lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "1:applied 2:interviewing 3:offered 4:accepted 5:rejected",
                palette.muted,
            )));
            Text::from(lines)
        }
        None => Text::styled("Start applying to jobs to see them here.", palette.muted),
    };
    let detail_widget = Paragraph::new(detail)
        .block(panel(" Detail ".to_string(), palette))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail_widget, chunks[1]);
}

fn draw_dashboard(frame: &mut Frame, area: Rect, ctx: &AppContext<'_>, palette: &Palette) {
    let dashboard = ctx.dashboard();
    let bold = palette.base.add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::from(Span::styled("This week", bold)),
        Line::from(format!(
            "  {} of {} applications ({}%)",
            dashboard.stats.this_week, dashboard.goal, dashboard.progress
        )),
        Line::from(format!("  {}", progress_bar(dashboard.progress, 40))),
        Line::from(""),
        Line::from(Span::styled("Overall", bold)),
        Line::from(format!("  Total applications: {}", dashboard.stats.total)),
        Line::from(format!("  Response rate:      {}%", dashboard.response_rate)),
        Line::from(""),
        Line::from(Span::styled("By status", bold)),
    ];
    for share in &dashboard.distribution {
        lines.push(Line::from(format!(
            "  {:<13} {:>3} ({:>3}%)",
            share.status, share.count, share.percent
        )));
    }

    if let Some(profile) = ctx.profile.profile() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Profile", bold)));
        lines.push(Line::from(format!("  {} <{}>", profile.name, profile.email)));
        lines.push(Line::from(format!(
            "  {} years, prefers {}",
            profile.experience_years, profile.remote_preference
        )));
    } else if !ctx.profile.loading() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("No profile found.", palette.muted)));
    }

    let widget = Paragraph::new(Text::from(lines))
        .block(panel(format!(" {} ", View::Dashboard.title()), palette))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

fn progress_bar(percent: u32, width: usize) -> String {
    let filled = (percent.min(100) as usize * width) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

fn draw_footer(frame: &mut Frame, area: Rect, state: &AppState, ctx: &AppContext<'_>, palette: &Palette) {
    let (text, style) = if let Some(input) = &state.search_input {
        (format!(" Search: {}_  (Enter to search, Esc to cancel)", input), palette.base)
    } else if let Some(err) = ctx.jobs.error().or_else(|| ctx.profile.error()) {
        (format!(" {}", err), palette.error)
    } else if ctx.jobs.loading() || ctx.profile.loading() {
        (" Loading...".to_string(), palette.accent)
    } else if let Some(notice) = &state.notice {
        (format!(" {}", notice), palette.accent)
    } else {
        (
            " tab:view j/k:navigate J/K:scroll /:search R:remote a:apply r:refresh t:theme q:quit"
                .to_string(),
            palette.muted,
        )
    };
    frame.render_widget(Paragraph::new(text).style(style), area);
}
