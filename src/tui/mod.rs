//! TUI module - terminal workout logging screen with ratatui

use std::io::{Stdout, stdout};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table},
};

use crate::api::models::ExerciseSummary;
use crate::api::{ApiError, WorkoutApi};
use crate::library::filter_exercises;
use crate::screen::{LogScreen, SubmitError, Submitted};
use crate::session::input::{format_timer, sanitize_reps, sanitize_weight};
use crate::session::{ExerciseRef, SetField, WorkoutSession};

type Tui = Terminal<CrosstermBackend<Stdout>>;

enum Mode {
    Normal,
    Edit { field: SetField, buffer: String },
    Picker { query: String, selected: usize },
    Custom { name: String },
    Rename { name: String },
    ConfirmRemoveExercise,
    ConfirmReset,
}

/// App state for the logging screen
pub struct App<A: WorkoutApi> {
    screen: LogScreen<A>,
    library: Vec<ExerciseSummary>,
    weight_unit: &'static str,
    mode: Mode,
    cursor: usize,
    message: Option<String>,
    outcome: Option<Submitted>,
    should_quit: bool,
}

/// (exercise index, set index) for every visible row
fn positions(session: &WorkoutSession) -> Vec<(usize, usize)> {
    session
        .exercises()
        .iter()
        .enumerate()
        .flat_map(|(ei, entry)| (0..entry.sets().len()).map(move |si| (ei, si)))
        .collect()
}

fn submit_error_message(e: &SubmitError) -> String {
    match e {
        SubmitError::Validation(v) => v.to_string(),
        SubmitError::Api(ApiError::Unauthorized(_)) => {
            "You need to be logged in to save workouts. Run `liftlog login` first.".to_string()
        }
        SubmitError::Api(ApiError::Status { message, .. }) => format!("Failed to save workout. {}", message),
        SubmitError::Api(other) => format!("Failed to save workout. {}", other),
    }
}

impl<A: WorkoutApi> App<A> {
    pub fn new(screen: LogScreen<A>, library: Vec<ExerciseSummary>, weight_unit: &'static str) -> Self {
        Self {
            screen,
            library,
            weight_unit,
            mode: Mode::Normal,
            cursor: 0,
            message: None,
            outcome: None,
            should_quit: false,
        }
    }

    /// Run until the user quits or the workout is saved
    pub async fn run(mut self) -> Result<Option<Submitted>> {
        let mut terminal = init_terminal()?;
        let result = self.event_loop(&mut terminal).await;
        restore_terminal()?;
        result?;
        Ok(self.outcome)
    }

    async fn event_loop(&mut self, terminal: &mut Tui) -> Result<()> {
        while !self.should_quit {
            let session = self.screen.snapshot().await;
            terminal.draw(|frame| self.render(frame, &session))?;

            let event = tokio::task::block_in_place(|| -> Result<Option<Event>> {
                if event::poll(Duration::from_millis(100))? {
                    Ok(Some(event::read()?))
                } else {
                    Ok(None)
                }
            })?;

            if let Some(Event::Key(key)) = event
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key.code, &session).await;
            }
        }
        Ok(())
    }

    fn render(&self, frame: &mut Frame, session: &WorkoutSession) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(10), Constraint::Length(3)])
            .split(area);

        // Header
        let timer_label = if session.timer_running() { "running" } else { "paused" };
        let header = Paragraph::new(format!(
            "{}  |  {} ({})  |  volume {} {}",
            session.name(),
            format_timer(session.elapsed_seconds()),
            timer_label,
            session.total_volume(),
            self.weight_unit,
        ))
        .style(Style::default().fg(Color::Cyan).bold())
        .block(Block::default().borders(Borders::ALL).title("Log Workout"));
        frame.render_widget(header, chunks[0]);

        match &self.mode {
            Mode::Picker { query, selected } => self.render_picker(frame, chunks[1], query, *selected),
            _ => self.render_sets(frame, chunks[1], session),
        }

        // Footer
        let help = match &self.mode {
            Mode::Normal => {
                "q: quit | ↑↓: move | space: done | w/r: weight/reps | n/x: add/remove set | a: add exercise | D: remove exercise | e: rename | t/R: timer/reset | s: save"
                    .to_string()
            }
            Mode::Edit { field, buffer } => {
                let label = match field {
                    SetField::Weight => self.weight_unit,
                    SetField::Reps => "reps",
                };
                format!("{}: {}_  (enter: ok, esc: cancel)", label, buffer)
            }
            Mode::Picker { .. } => "type to search | ↑↓: select | enter: add | tab: custom exercise | esc: close".to_string(),
            Mode::Custom { name } => format!("custom exercise: {}_  (enter: add, esc: cancel)", name),
            Mode::Rename { name } => format!("workout name: {}_  (enter: ok, esc: cancel)", name),
            Mode::ConfirmRemoveExercise => "Remove this exercise? (y/n)".to_string(),
            Mode::ConfirmReset => "Reset timer to 00:00:00? (y/n)".to_string(),
        };
        let footer_text = self.message.clone().unwrap_or(help);
        let footer = Paragraph::new(footer_text)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[2]);
    }

    fn render_sets(&self, frame: &mut Frame, area: Rect, session: &WorkoutSession) {
        let rows: Vec<Row> = positions(session)
            .into_iter()
            .enumerate()
            .map(|(row, (ei, si))| {
                let entry = &session.exercises()[ei];
                let set = &entry.sets()[si];
                let name = if si == 0 {
                    let marker = if entry.is_custom() { " *" } else { "" };
                    format!("{}{}", entry.name(), marker)
                } else {
                    String::new()
                };
                let style = if row == self.cursor {
                    Style::default().bg(Color::DarkGray)
                } else if set.completed {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default()
                };
                Row::new(vec![
                    Cell::from(name),
                    Cell::from(set.number.to_string()),
                    Cell::from(set.weight.clone()),
                    Cell::from(set.reps.clone()),
                    Cell::from(if set.completed { "✓" } else { "" }),
                ])
                .style(style)
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Min(20),
                Constraint::Length(5),
                Constraint::Length(10),
                Constraint::Length(8),
                Constraint::Length(6),
            ],
        )
        .header(Row::new(vec!["Exercise", "Set", self.weight_unit, "Reps", "Done"]).style(Style::default().bold()))
        .block(Block::default().borders(Borders::ALL).title("Exercises"));

        frame.render_widget(table, area);
    }

    fn render_picker(&self, frame: &mut Frame, area: Rect, query: &str, selected: usize) {
        let items: Vec<ListItem> = filter_exercises(&self.library, query)
            .into_iter()
            .enumerate()
            .map(|(i, ex)| {
                let text = match &ex.category {
                    Some(category) => format!("{} ({})", ex.name, category),
                    None => ex.name.clone(),
                };
                let style = if i == selected {
                    Style::default().bg(Color::DarkGray)
                } else {
                    Style::default()
                };
                ListItem::new(text).style(style)
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Add exercise: {}", query)),
        );
        frame.render_widget(list, area);
    }

    async fn handle_key(&mut self, code: KeyCode, session: &WorkoutSession) {
        self.message = None;
        let rows = positions(session);
        let current = rows.get(self.cursor).copied();

        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Normal => self.handle_normal(code, current, rows.len()).await,
            Mode::Edit { field, mut buffer } => match code {
                KeyCode::Enter => {
                    if let Some((ei, si)) = current {
                        self.screen.apply(|s| s.update_set_field(ei, si, field, &buffer)).await;
                    }
                }
                KeyCode::Esc => {}
                KeyCode::Backspace => {
                    buffer.pop();
                    self.mode = Mode::Edit { field, buffer };
                }
                KeyCode::Char(c) => {
                    buffer.push(c);
                    let buffer = match field {
                        SetField::Weight => sanitize_weight(&buffer),
                        SetField::Reps => sanitize_reps(&buffer),
                    };
                    self.mode = Mode::Edit { field, buffer };
                }
                _ => self.mode = Mode::Edit { field, buffer },
            },
            Mode::Picker { mut query, mut selected } => {
                let found = filter_exercises(&self.library, &query).len();
                match code {
                    KeyCode::Esc => {}
                    KeyCode::Tab => self.mode = Mode::Custom { name: String::new() },
                    KeyCode::Enter => {
                        let picked = filter_exercises(&self.library, &query)
                            .get(selected)
                            .map(|ex| ExerciseRef::from(*ex));
                        match picked {
                            Some(exercise) => self.add_exercise(exercise, rows.len()).await,
                            None => self.mode = Mode::Picker { query, selected },
                        }
                    }
                    KeyCode::Up => {
                        selected = selected.saturating_sub(1);
                        self.mode = Mode::Picker { query, selected };
                    }
                    KeyCode::Down => {
                        if selected + 1 < found {
                            selected += 1;
                        }
                        self.mode = Mode::Picker { query, selected };
                    }
                    KeyCode::Backspace => {
                        query.pop();
                        self.mode = Mode::Picker { query, selected: 0 };
                    }
                    KeyCode::Char(c) => {
                        query.push(c);
                        self.mode = Mode::Picker { query, selected: 0 };
                    }
                    _ => self.mode = Mode::Picker { query, selected },
                }
            }
            Mode::Custom { mut name } => match code {
                KeyCode::Esc => {}
                KeyCode::Enter => {
                    if name.trim().is_empty() {
                        self.message = Some("Please enter an exercise name".to_string());
                        self.mode = Mode::Custom { name };
                    } else {
                        self.add_exercise(ExerciseRef::custom(&name), rows.len()).await;
                    }
                }
                KeyCode::Backspace => {
                    name.pop();
                    self.mode = Mode::Custom { name };
                }
                KeyCode::Char(c) => {
                    name.push(c);
                    self.mode = Mode::Custom { name };
                }
                _ => self.mode = Mode::Custom { name },
            },
            Mode::Rename { mut name } => match code {
                KeyCode::Esc => {}
                KeyCode::Enter => {
                    if name.trim().is_empty() {
                        self.message = Some("Please enter a workout name".to_string());
                        self.mode = Mode::Rename { name };
                    } else {
                        self.screen.apply(|s| s.rename(name.trim())).await;
                    }
                }
                KeyCode::Backspace => {
                    name.pop();
                    self.mode = Mode::Rename { name };
                }
                KeyCode::Char(c) => {
                    name.push(c);
                    self.mode = Mode::Rename { name };
                }
                _ => self.mode = Mode::Rename { name },
            },
            Mode::ConfirmRemoveExercise => {
                if let (KeyCode::Char('y'), Some((ei, _))) = (code, current) {
                    self.screen.apply(|s| s.remove_exercise(ei)).await;
                    self.clamp_cursor().await;
                }
            }
            Mode::ConfirmReset => {
                if code == KeyCode::Char('y') {
                    self.screen.reset_timer().await;
                }
            }
        }
    }

    async fn handle_normal(&mut self, code: KeyCode, current: Option<(usize, usize)>, row_count: usize) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Up => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down => {
                if self.cursor + 1 < row_count {
                    self.cursor += 1;
                }
            }
            KeyCode::Char('a') => {
                self.mode = Mode::Picker {
                    query: String::new(),
                    selected: 0,
                }
            }
            KeyCode::Char('e') => {
                let name = self.screen.snapshot().await.name().to_string();
                self.mode = Mode::Rename { name };
            }
            KeyCode::Char('t') => self.screen.toggle_timer().await,
            KeyCode::Char('R') => self.mode = Mode::ConfirmReset,
            KeyCode::Char('s') => self.save().await,
            _ => {}
        }

        let Some((ei, si)) = current else {
            return;
        };
        match code {
            KeyCode::Char(' ') => self.screen.apply(|s| s.toggle_set_completed(ei, si)).await,
            KeyCode::Char('w') => {
                self.mode = Mode::Edit {
                    field: SetField::Weight,
                    buffer: String::new(),
                }
            }
            KeyCode::Char('r') => {
                self.mode = Mode::Edit {
                    field: SetField::Reps,
                    buffer: String::new(),
                }
            }
            KeyCode::Char('n') => {
                self.screen.apply(|s| s.add_set(ei)).await;
                // Jump to the new last set of this exercise
                let session = self.screen.snapshot().await;
                if let Some(row) = positions(&session)
                    .iter()
                    .rposition(|(e, _)| *e == ei)
                {
                    self.cursor = row;
                }
            }
            KeyCode::Char('x') => {
                self.screen.apply(|s| s.remove_set(ei, si)).await;
                self.clamp_cursor().await;
            }
            KeyCode::Char('D') => self.mode = Mode::ConfirmRemoveExercise,
            _ => {}
        }
    }

    async fn add_exercise(&mut self, exercise: ExerciseRef, row_count: usize) {
        self.screen.apply(|s| s.add_exercise(exercise)).await;
        self.cursor = row_count;
    }

    async fn clamp_cursor(&mut self) {
        let rows = positions(&self.screen.snapshot().await).len();
        self.cursor = self.cursor.min(rows.saturating_sub(1));
    }

    async fn save(&mut self) {
        match self.screen.submit().await {
            Ok(outcome) => {
                self.outcome = Some(outcome);
                self.should_quit = true;
            }
            Err(e) => self.message = Some(submit_error_message(&e)),
        }
    }
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{AssignedWorkout, Routine, StoredWorkout, WorkoutRef};
    use crate::session::{CompletionPayload, ValidationError, WorkoutPayload};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct OfflineApi;

    fn offline() -> ApiError {
        ApiError::Status {
            status: 503,
            message: "offline".to_string(),
        }
    }

    #[async_trait]
    impl WorkoutApi for OfflineApi {
        async fn get_exercises(&self) -> Result<Vec<ExerciseSummary>, ApiError> {
            Err(offline())
        }
        async fn get_routine(&self, _id: i64) -> Result<Routine, ApiError> {
            Err(offline())
        }
        async fn get_workout(&self, _id: i64) -> Result<StoredWorkout, ApiError> {
            Err(offline())
        }
        async fn create_workout(&self, _payload: &WorkoutPayload) -> Result<WorkoutRef, ApiError> {
            Err(offline())
        }
        async fn update_workout(&self, _id: i64, _payload: &WorkoutPayload) -> Result<(), ApiError> {
            Err(offline())
        }
        async fn get_assigned_workout(&self, _class_id: i64, _id: i64) -> Result<AssignedWorkout, ApiError> {
            Err(offline())
        }
        async fn complete_assigned_workout(
            &self,
            _class_id: i64,
            _id: i64,
            _payload: &CompletionPayload,
        ) -> Result<(), ApiError> {
            Err(offline())
        }
    }

    fn test_app(name: &str) -> App<OfflineApi> {
        let screen = LogScreen::open_new(Arc::new(OfflineApi), Some(name));
        App::new(screen, vec![], "kg")
    }

    async fn press(app: &mut App<OfflineApi>, keys: &[KeyCode]) {
        for code in keys {
            let session = app.screen.snapshot().await;
            app.handle_key(*code, &session).await;
        }
    }

    #[tokio::test]
    async fn test_rename_workout_from_screen() {
        let mut app = test_app("Leg");
        press(&mut app, &[KeyCode::Char('e'), KeyCode::Char('s'), KeyCode::Enter]).await;
        assert_eq!(app.screen.snapshot().await.name(), "Legs");
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[tokio::test]
    async fn test_rename_rejects_blank_name() {
        let mut app = test_app("Push");
        let mut keys = vec![KeyCode::Char('e')];
        keys.extend([KeyCode::Backspace; 4]);
        keys.push(KeyCode::Enter);
        press(&mut app, &keys).await;

        assert_eq!(app.screen.snapshot().await.name(), "Push");
        assert!(matches!(app.mode, Mode::Rename { .. }));
        assert_eq!(app.message.as_deref(), Some("Please enter a workout name"));

        press(&mut app, &[KeyCode::Esc]).await;
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.screen.snapshot().await.name(), "Push");
    }

    #[test]
    fn test_positions_flatten_sets() {
        let session = WorkoutSession::default()
            .add_exercise(ExerciseRef::custom("A"))
            .add_set(0)
            .add_exercise(ExerciseRef::custom("B"));
        assert_eq!(positions(&session), vec![(0, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn test_submit_error_messages() {
        let validation = SubmitError::Validation(ValidationError::NoExercises);
        assert_eq!(submit_error_message(&validation), "Please add at least one exercise");

        let unauthorized = SubmitError::Api(ApiError::Unauthorized("expired".into()));
        assert!(submit_error_message(&unauthorized).contains("logged in"));

        let status = SubmitError::Api(ApiError::Status {
            status: 400,
            message: "Invalid exercise".into(),
        });
        assert_eq!(submit_error_message(&status), "Failed to save workout. Invalid exercise");
    }
}
