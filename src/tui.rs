use crate::calendar::{is_peak_day, leading_blanks, project_month, shift_month};
use crate::config::Config;
use crate::models::{CalendarCell, Shift};
use crate::storage::Persistence;
use crate::store::ShiftStore;
use crate::utils::{format_span, parse_time_of_day};
use anyhow::Result;
use chrono::{Datelike, Duration, Local, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::collections::BTreeSet;
use std::io;
use std::time::Duration as StdDuration;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    #[default]
    Name,
    Start,
    End,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::Name => FormField::Start,
            FormField::Start => FormField::End,
            FormField::End => FormField::Name,
        }
    }

    fn prev(self) -> Self {
        self.next().next()
    }
}

/// Add-shift form filled in over the days marked on the calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct AddForm {
    pub name: String,
    pub start: String,
    pub end: String,
    pub focus: FormField,
}

impl AddForm {
    fn new(config: &Config) -> Self {
        Self {
            name: String::new(),
            start: config.default_start_time.format("%H:%M").to_string(),
            end: config.default_end_time.format("%H:%M").to_string(),
            focus: FormField::Name,
        }
    }

    fn field_mut(&mut self) -> &mut String {
        match self.focus {
            FormField::Name => &mut self.name,
            FormField::Start => &mut self.start,
            FormField::End => &mut self.end,
        }
    }
}

/// Interactive month view over a [`ShiftStore`].
pub struct CalendarApp<'a, P: Persistence> {
    pub store: &'a mut ShiftStore<P>,
    pub selected_date: NaiveDate,
    pub selected_shift: usize,
    /// Days marked for the next add.
    pub picked: BTreeSet<NaiveDate>,
    pub form: Option<AddForm>,
    pub status: Option<String>,
    config: Config,
}

impl<'a, P: Persistence> CalendarApp<'a, P> {
    pub fn new(store: &'a mut ShiftStore<P>, today: NaiveDate, config: &Config) -> Self {
        Self {
            store,
            selected_date: today,
            selected_shift: 0,
            picked: BTreeSet::new(),
            form: None,
            status: None,
            config: config.clone(),
        }
    }

    pub fn shifts_on_selected_day(&self) -> Vec<Shift> {
        self.store.query_by_day(self.selected_date)
    }

    fn move_to(&mut self, date: NaiveDate) {
        if date != self.selected_date {
            self.selected_date = date;
            self.selected_shift = 0;
        }
    }

    fn move_days(&mut self, days: i64) {
        if let Some(date) = self.selected_date.checked_add_signed(Duration::days(days)) {
            self.move_to(date);
        }
    }

    /// Applies one key press. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode, today: NaiveDate) -> bool {
        self.status = None;
        if self.form.is_some() {
            self.handle_form_key(code);
            return false;
        }
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Left | KeyCode::Char('h') => self.move_days(-1),
            KeyCode::Right | KeyCode::Char('l') => self.move_days(1),
            KeyCode::Up => self.move_days(-7),
            KeyCode::Down => self.move_days(7),
            KeyCode::Char('p') | KeyCode::PageUp => self.move_to(shift_month(self.selected_date, -1)),
            KeyCode::Char('n') | KeyCode::PageDown => self.move_to(shift_month(self.selected_date, 1)),
            KeyCode::Char('t') => self.move_to(today),
            KeyCode::Tab | KeyCode::Char('j') => {
                let count = self.shifts_on_selected_day().len();
                if count > 0 {
                    self.selected_shift = (self.selected_shift + 1) % count;
                }
            }
            KeyCode::Char('k') => {
                let count = self.shifts_on_selected_day().len();
                if count > 0 {
                    self.selected_shift = (self.selected_shift + count - 1) % count;
                }
            }
            KeyCode::Char(' ') => self.toggle_selected(),
            KeyCode::Char('d') => self.delete_selected(),
            KeyCode::Char('m') => {
                if !self.picked.remove(&self.selected_date) {
                    self.picked.insert(self.selected_date);
                }
            }
            KeyCode::Char('a') => {
                if self.picked.is_empty() {
                    self.status = Some("Mark at least one day with 'm' first".to_string());
                } else {
                    self.form = Some(AddForm::new(&self.config));
                }
            }
            _ => {}
        }
        false
    }

    fn handle_form_key(&mut self, code: KeyCode) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => self.form = None,
            KeyCode::Tab | KeyCode::Down => form.focus = form.focus.next(),
            KeyCode::BackTab | KeyCode::Up => form.focus = form.focus.prev(),
            KeyCode::Backspace => {
                form.field_mut().pop();
            }
            KeyCode::Char(c) => form.field_mut().push(c),
            KeyCode::Enter => self.submit_form(),
            _ => {}
        }
    }

    /// Creates one shift per marked day. On any error the form stays open.
    fn submit_form(&mut self) {
        let Some(form) = self.form.clone() else {
            return;
        };
        let times = parse_time_of_day(&form.start).and_then(|start| {
            parse_time_of_day(&form.end).map(|end| (start, end))
        });
        let (start, end) = match times {
            Ok(times) => times,
            Err(err) => {
                self.status = Some(err.to_string());
                return;
            }
        };
        match self.store.create(&form.name, start, end, &self.picked) {
            Ok(created) => {
                self.status = Some(format!(
                    "Added {} shift(s) for {}",
                    created.len(),
                    form.name.trim()
                ));
                self.picked.clear();
                self.form = None;
            }
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    fn toggle_selected(&mut self) {
        let Some(shift) = self.shifts_on_selected_day().get(self.selected_shift).cloned() else {
            return;
        };
        self.status = Some(match self.store.toggle_attendance(shift.id) {
            Ok(updated) if updated.attended => format!("{} marked as attended", updated.employee_name),
            Ok(updated) => format!("{} marked as absent", updated.employee_name),
            Err(err) => err.to_string(),
        });
    }

    fn delete_selected(&mut self) {
        let Some(shift) = self.shifts_on_selected_day().get(self.selected_shift).cloned() else {
            return;
        };
        self.status = Some(match self.store.delete(shift.id) {
            Ok(removed) => format!("Deleted shift for {}", removed.employee_name),
            Err(err) => err.to_string(),
        });
        let remaining = self.shifts_on_selected_day().len();
        self.selected_shift = self.selected_shift.min(remaining.saturating_sub(1));
    }
}

pub fn run_tui<P: Persistence>(app: &mut CalendarApp<'_, P>) -> Result<()> {
    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_loop(&mut terminal, app);

    // restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_loop<P: Persistence>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut CalendarApp<'_, P>,
) -> Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        if event::poll(StdDuration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press
                    && app.handle_key(key.code, Local::now().date_naive())
                {
                    return Ok(());
                }
            }
        }
    }
}

pub fn draw<P: Persistence>(frame: &mut Frame, app: &CalendarApp<'_, P>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Calendar + day
            Constraint::Length(3), // Footer
        ])
        .split(frame.size());

    draw_header(frame, chunks[0], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(32), Constraint::Min(20)])
        .split(chunks[1]);

    let cells = project_month(app.selected_date, app.store.all());
    draw_month(frame, body[0], app, &cells);
    match &app.form {
        Some(form) => draw_form(frame, body[1], app, form),
        None => draw_day(frame, body[1], app),
    }
    draw_footer(frame, chunks[2]);
}

fn draw_header<P: Persistence>(frame: &mut Frame, area: Rect, app: &CalendarApp<'_, P>) {
    let mut spans = vec![
        Span::styled(
            " Horarios ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(Local::now().format("%Y-%m-%d %H:%M").to_string()),
    ];
    if let Some(status) = &app.status {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::Yellow)));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn draw_month<P: Persistence>(
    frame: &mut Frame,
    area: Rect,
    app: &CalendarApp<'_, P>,
    cells: &[CalendarCell],
) {
    let mut lines = Vec::new();

    let mut weekday = app.config.week_start;
    let mut names = Vec::new();
    for _ in 0..7 {
        names.push(Span::styled(
            format!(" {:<3}", &weekday.to_string()[..2]),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        weekday = weekday.succ();
    }
    lines.push(Line::from(names));

    let blanks = leading_blanks(app.selected_date, app.config.week_start);
    let mut row: Vec<Span> = (0..blanks).map(|_| Span::raw("    ")).collect();
    let mut column = blanks;
    for cell in cells {
        let mut style = Style::default();
        if cell.is_peak_day {
            style = style.fg(Color::Magenta).add_modifier(Modifier::BOLD);
        }
        if app.picked.contains(&cell.date) {
            style = style.bg(Color::Blue).fg(Color::White);
        }
        if cell.date == app.selected_date {
            style = style.bg(Color::White).fg(Color::Black);
        }
        let marker = if cell.shifts.is_empty() { " " } else { "•" };
        row.push(Span::raw(" "));
        row.push(Span::styled(format!("{:>2}", cell.date.day()), style));
        row.push(Span::styled(marker, Style::default().fg(Color::Green)));
        column += 1;
        if column % 7 == 0 {
            lines.push(Line::from(std::mem::take(&mut row)));
        }
    }
    if !row.is_empty() {
        lines.push(Line::from(row));
    }

    let title = format!(" {} ", app.selected_date.format("%B %Y"));
    let block = Block::default().title(title).borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_day<P: Persistence>(frame: &mut Frame, area: Rect, app: &CalendarApp<'_, P>) {
    let shifts = app.shifts_on_selected_day();
    let mut lines = Vec::new();

    if shifts.is_empty() {
        lines.push(Line::raw("  No shifts on this day."));
    }
    for (i, shift) in shifts.iter().enumerate() {
        let check = if shift.attended {
            Span::styled(" [x] ", Style::default().fg(Color::Green))
        } else {
            Span::raw(" [ ] ")
        };
        let mut name_style = Style::default();
        if i == app.selected_shift {
            name_style = name_style.add_modifier(Modifier::REVERSED);
        }
        lines.push(Line::from(vec![
            check,
            Span::styled(shift.employee_name.clone(), name_style),
            Span::raw(format!(
                "  {}-{} ({})",
                shift.start_time.format("%H:%M"),
                shift.end_time.format("%H:%M"),
                format_span(shift.duration())
            )),
        ]));
    }

    let mut title = format!(" {} ", app.selected_date.format("%B %d, %Y"));
    if is_peak_day(app.selected_date) {
        title.push_str("- peak day ");
    }
    let block = Block::default().title(title).borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_form<P: Persistence>(
    frame: &mut Frame,
    area: Rect,
    app: &CalendarApp<'_, P>,
    form: &AddForm,
) {
    let days: Vec<String> = app.picked.iter().map(|d| d.format("%b %d").to_string()).collect();
    let mut lines = vec![
        Line::raw(format!("  Days: {}", days.join(", "))),
        Line::raw(""),
    ];
    for (field, label, value) in [
        (FormField::Name, "Employee", &form.name),
        (FormField::Start, "Start   ", &form.start),
        (FormField::End, "End     ", &form.end),
    ] {
        let mut style = Style::default();
        if field == form.focus {
            style = style.add_modifier(Modifier::REVERSED);
        }
        lines.push(Line::from(vec![
            Span::raw(format!("  {}: ", label)),
            Span::styled(format!("{:<20}", value), style),
        ]));
    }
    lines.push(Line::raw(""));
    lines.push(Line::styled(
        "  Days 15 and 30 are peak days.",
        Style::default().fg(Color::Magenta),
    ));
    lines.push(Line::raw("  enter: save | tab: next field | esc: cancel"));

    let block = Block::default().title(" New shift ").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_footer(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(
        "arrows: move | n/p: month | t: today | m: mark day | a: add | tab: next shift | space: attendance | d: delete | q: quit",
    )
    .block(Block::default().borders(Borders::ALL))
    .alignment(Alignment::Center);
    frame.render_widget(help, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chrono::NaiveTime;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup_store() -> ShiftStore<MemoryStorage> {
        let mut store = ShiftStore::open(MemoryStorage::new()).unwrap();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let one = NaiveTime::from_hms_opt(13, 0, 0).unwrap();
        let day = BTreeSet::from([ymd(2025, 1, 15)]);
        store.create("Ana", nine, one, &day).unwrap();
        store.create("Luis", one, one, &day).unwrap();
        store
    }

    #[test]
    fn test_navigation() {
        let mut store = setup_store();
        let today = ymd(2025, 1, 31);
        let mut app = CalendarApp::new(&mut store, today, &Config::default());

        app.handle_key(KeyCode::Char('n'), today);
        assert_eq!(app.selected_date, ymd(2025, 2, 28));
        app.handle_key(KeyCode::Char('p'), today);
        assert_eq!(app.selected_date, ymd(2025, 1, 28));
        app.handle_key(KeyCode::Up, today);
        assert_eq!(app.selected_date, ymd(2025, 1, 21));
        app.handle_key(KeyCode::Right, today);
        assert_eq!(app.selected_date, ymd(2025, 1, 22));
        app.handle_key(KeyCode::Char('t'), today);
        assert_eq!(app.selected_date, today);
        assert!(app.handle_key(KeyCode::Char('q'), today));
    }

    #[test]
    fn test_toggle_and_delete_selected() {
        let mut store = setup_store();
        let today = ymd(2025, 1, 15);
        {
            let mut app = CalendarApp::new(&mut store, today, &Config::default());
            assert_eq!(app.shifts_on_selected_day().len(), 2);

            app.handle_key(KeyCode::Tab, today);
            app.handle_key(KeyCode::Char(' '), today);
            assert_eq!(app.status.as_deref(), Some("Luis marked as attended"));

            app.handle_key(KeyCode::Char('d'), today);
            assert_eq!(app.status.as_deref(), Some("Deleted shift for Luis"));
            assert_eq!(app.selected_shift, 0);

            // nothing selected on an empty day
            app.handle_key(KeyCode::Right, today);
            app.handle_key(KeyCode::Char(' '), today);
            assert!(app.status.is_none());
        }

        let left = store.query_by_day(today);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].employee_name, "Ana");
        assert!(!left[0].attended);
    }

    fn type_text<P: Persistence>(app: &mut CalendarApp<'_, P>, text: &str, today: NaiveDate) {
        for c in text.chars() {
            app.handle_key(KeyCode::Char(c), today);
        }
    }

    #[test]
    fn test_add_form_creates_one_shift_per_marked_day() {
        let mut store = ShiftStore::open(MemoryStorage::new()).unwrap();
        let today = ymd(2025, 1, 14);
        {
            let mut app = CalendarApp::new(&mut store, today, &Config::default());

            app.handle_key(KeyCode::Char('a'), today);
            assert!(app.form.is_none());
            assert!(app.status.is_some());

            app.handle_key(KeyCode::Char('m'), today);
            app.handle_key(KeyCode::Right, today);
            app.handle_key(KeyCode::Char('m'), today);
            app.handle_key(KeyCode::Right, today);
            app.handle_key(KeyCode::Char('m'), today);
            app.handle_key(KeyCode::Char('m'), today);
            assert_eq!(app.picked, BTreeSet::from([ymd(2025, 1, 14), ymd(2025, 1, 15)]));

            app.handle_key(KeyCode::Char('a'), today);
            assert!(app.form.is_some());
            // 'q' is text while the form is open
            assert!(!app.handle_key(KeyCode::Char('q'), today));
            app.handle_key(KeyCode::Backspace, today);
            type_text(&mut app, "Eva", today);
            app.handle_key(KeyCode::Tab, today);
            for _ in 0..5 {
                app.handle_key(KeyCode::Backspace, today);
            }
            type_text(&mut app, "08:30", today);
            app.handle_key(KeyCode::Enter, today);

            assert_eq!(app.status.as_deref(), Some("Added 2 shift(s) for Eva"));
            assert!(app.form.is_none());
            assert!(app.picked.is_empty());
        }

        let shifts = store.all();
        assert_eq!(shifts.len(), 2);
        for shift in shifts {
            assert_eq!(shift.employee_name, "Eva");
            assert_eq!(shift.start_time.time(), NaiveTime::from_hms_opt(8, 30, 0).unwrap());
            assert_eq!(shift.end_time.time(), NaiveTime::from_hms_opt(17, 0, 0).unwrap());
        }
        assert!(store.query_by_day(ymd(2025, 1, 15))[0].is_peak_day);
    }

    #[test]
    fn test_add_form_keeps_input_on_error() {
        let mut store = ShiftStore::open(MemoryStorage::new()).unwrap();
        let today = ymd(2025, 1, 14);
        {
            let mut app = CalendarApp::new(&mut store, today, &Config::default());
            app.handle_key(KeyCode::Char('m'), today);
            app.handle_key(KeyCode::Char('a'), today);

            app.handle_key(KeyCode::Enter, today);
            assert!(app.status.as_deref().unwrap().contains("employee name is empty"));
            assert!(app.form.is_some());

            type_text(&mut app, "Eva", today);
            app.handle_key(KeyCode::BackTab, today);
            type_text(&mut app, "x", today);
            app.handle_key(KeyCode::Enter, today);
            assert!(app.status.as_deref().unwrap().contains("invalid time"));
            assert_eq!(app.form.as_ref().unwrap().end, "17:00x");

            app.handle_key(KeyCode::Esc, today);
            assert!(app.form.is_none());
            assert_eq!(app.picked.len(), 1);
        }
        assert!(store.all().is_empty());
    }
}
