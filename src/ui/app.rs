use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tempfile::NamedTempFile;

use crate::api::TrackerApi;
use crate::error::Result;
use crate::plan::{NewPlanStep, PlanStep, PlanStepUpdate};
use crate::record::RecordKind;
use crate::task::{NewTask, Task, TaskStatus, TaskUpdate};

use super::editor::{EditorAction, EditorState, EditorSubmit};
use super::view;

const EVENT_POLL_MS: u64 = 120;
const WATCH_DEBOUNCE_MS: u64 = 200;

enum UiMsg {
    FilesChanged,
    WatchError(String),
}

#[derive(Clone, Copy)]
pub(crate) enum StatusKind {
    Error,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pane {
    Tasks,
    Plan,
    Notes,
}

/// What the event loop must do after a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyOutcome {
    Continue,
    Quit,
    EditNotes,
}

pub(crate) struct DeleteConfirmState {
    pub(crate) kind: RecordKind,
    pub(crate) id: String,
    pub(crate) label: String,
}

pub struct AppState {
    pub(crate) api: TrackerApi,
    pub(crate) focus: Pane,
    pub(crate) task_selected: usize,
    pub(crate) step_selected: usize,
    pub(crate) show_step_details: bool,
    pub(crate) notes_visible: bool,
    pub(crate) show_help: bool,
    pub(crate) editor: Option<EditorState>,
    pub(crate) delete_confirm: Option<DeleteConfirmState>,
    info_message: Option<String>,
    status_message: Option<String>,
    watch_error: Option<String>,
}

impl AppState {
    pub(crate) fn new(api: TrackerApi) -> Self {
        let notes_visible = api.config().ui.notes_visible;
        Self {
            api,
            focus: Pane::Tasks,
            task_selected: 0,
            step_selected: 0,
            show_step_details: false,
            notes_visible,
            show_help: false,
            editor: None,
            delete_confirm: None,
            info_message: None,
            status_message: None,
            watch_error: None,
        }
    }

    pub(crate) fn selected_task(&self) -> Option<&Task> {
        self.api.tasks().get(self.task_selected)
    }

    pub(crate) fn selected_step(&self) -> Option<&PlanStep> {
        self.api.plan_steps().get(self.step_selected)
    }

    pub(crate) fn status_line(&self) -> Option<(String, StatusKind)> {
        if let Some(message) = self.status_message.as_ref() {
            return Some((message.clone(), StatusKind::Error));
        }
        if let Some(error) = self.watch_error.as_ref() {
            return Some((error.clone(), StatusKind::Error));
        }
        self.info_message
            .as_ref()
            .map(|info| (info.clone(), StatusKind::Info))
    }

    pub(crate) fn footer_hint(&self) -> String {
        if self.delete_confirm.is_some() {
            return "y confirm delete  esc cancel".to_string();
        }
        if let Some(editor) = self.editor.as_ref() {
            if editor.confirming() {
                return "y/enter save  e/backspace edit  esc cancel".to_string();
            }
            return "type to edit  tab/up/down field  enter next  esc cancel".to_string();
        }
        match self.focus {
            Pane::Tasks => "j/k move  space status  n new  e edit  d delete  tab pane  ? help  q quit",
            Pane::Plan => {
                "j/k move  space toggle  enter details  n new  e edit  D delete  K/J reorder  q quit"
            }
            Pane::Notes => "e edit notes  tab pane  ctrl+x hide notes  ? help  q quit",
        }
        .to_string()
    }

    pub(crate) fn count_summary(&self) -> String {
        let tasks = self.api.tasks();
        let mut in_progress = 0usize;
        let mut completed = 0usize;
        for task in tasks {
            match task.status {
                TaskStatus::InProgress => in_progress += 1,
                TaskStatus::Completed => completed += 1,
                TaskStatus::NotStarted => {}
            }
        }
        let steps = self.api.plan_steps();
        let done = steps.iter().filter(|step| step.completed).count();
        format!(
            "tasks: {}  in progress: {in_progress}  completed: {completed}  plan: {done}/{} done",
            tasks.len(),
            steps.len()
        )
    }

    fn set_error(&mut self, message: String) {
        self.status_message = Some(message);
        self.info_message = None;
    }

    fn set_info(&mut self, message: String) {
        self.info_message = Some(message);
        self.status_message = None;
    }

    /// Re-read every file and keep the selections in range
    pub(crate) fn reload(&mut self) {
        self.api.reload_all();
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        self.task_selected = self
            .task_selected
            .min(self.api.tasks().len().saturating_sub(1));
        self.step_selected = self
            .step_selected
            .min(self.api.plan_steps().len().saturating_sub(1));
    }

    fn cycle_focus(&mut self, forward: bool) {
        let panes: &[Pane] = if self.notes_visible {
            &[Pane::Tasks, Pane::Plan, Pane::Notes]
        } else {
            &[Pane::Tasks, Pane::Plan]
        };
        let current = panes.iter().position(|pane| *pane == self.focus).unwrap_or(0) as isize;
        let delta = if forward { 1 } else { -1 };
        let next = (current + delta).rem_euclid(panes.len() as isize) as usize;
        self.focus = panes[next];
    }

    fn toggle_notes(&mut self) {
        self.notes_visible = !self.notes_visible;
        if !self.notes_visible && self.focus == Pane::Notes {
            self.focus = Pane::Tasks;
        }
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return KeyOutcome::Quit;
        }

        if let Some(confirm) = self.delete_confirm.take() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => self.delete(confirm),
                KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => {
                    self.set_info("cancelled".to_string());
                }
                _ => self.delete_confirm = Some(confirm),
            }
            return KeyOutcome::Continue;
        }

        if self.editor.is_some() {
            self.handle_editor_key(key);
            return KeyOutcome::Continue;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('x') {
                self.toggle_notes();
            }
            return KeyOutcome::Continue;
        }

        match key.code {
            KeyCode::Char('q') => return KeyOutcome::Quit,
            KeyCode::Tab => self.cycle_focus(true),
            KeyCode::BackTab => self.cycle_focus(false),
            KeyCode::Char('?') => self.show_help = !self.show_help,
            KeyCode::Esc => self.show_help = false,
            KeyCode::Char('r') => {
                self.reload();
                self.set_info("reloaded".to_string());
            }
            _ => {
                return match self.focus {
                    Pane::Tasks => {
                        self.handle_task_key(key);
                        KeyOutcome::Continue
                    }
                    Pane::Plan => {
                        self.handle_plan_key(key);
                        KeyOutcome::Continue
                    }
                    Pane::Notes => match key.code {
                        KeyCode::Char('e') | KeyCode::Enter => KeyOutcome::EditNotes,
                        _ => KeyOutcome::Continue,
                    },
                };
            }
        }
        KeyOutcome::Continue
    }

    fn handle_task_key(&mut self, key: KeyEvent) {
        let len = self.api.tasks().len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.task_selected = self.task_selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.task_selected = (self.task_selected + 1).min(len.saturating_sub(1));
            }
            KeyCode::Char(' ') => {
                let Some(task) = self.selected_task() else {
                    return;
                };
                let id = task.id.clone();
                let next = task.status.next();
                match self.api.update_task(&id, TaskUpdate::status(next)) {
                    Ok(task) => self.set_info(format!("{}: {}", task.title, task.status)),
                    Err(err) => self.set_error(err.to_string()),
                }
            }
            KeyCode::Char('n') => {
                let priority = self.api.config().tasks.default_priority;
                self.editor = Some(EditorState::new_task(priority));
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                self.editor = self.selected_task().map(EditorState::edit_task);
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                self.delete_confirm = self.selected_task().map(|task| DeleteConfirmState {
                    kind: RecordKind::Task,
                    id: task.id.clone(),
                    label: task.title.clone(),
                });
            }
            _ => {}
        }
    }

    fn handle_plan_key(&mut self, key: KeyEvent) {
        let len = self.api.plan_steps().len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.step_selected = self.step_selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.step_selected = (self.step_selected + 1).min(len.saturating_sub(1));
            }
            KeyCode::Char(' ') => {
                let Some(id) = self.selected_step().map(|step| step.id.clone()) else {
                    return;
                };
                match self.api.toggle_plan_step(&id) {
                    Ok(step) => {
                        let state = if step.completed { "done" } else { "open" };
                        self.set_info(format!("{}: {state}", step.name));
                    }
                    Err(err) => self.set_error(err.to_string()),
                }
            }
            KeyCode::Enter => self.show_step_details = !self.show_step_details,
            KeyCode::Char('n') => self.editor = Some(EditorState::new_step()),
            KeyCode::Char('e') => {
                self.editor = self.selected_step().map(EditorState::edit_step);
            }
            KeyCode::Char('D') | KeyCode::Delete => {
                self.delete_confirm = self.selected_step().map(|step| DeleteConfirmState {
                    kind: RecordKind::PlanStep,
                    id: step.id.clone(),
                    label: step.name.clone(),
                });
            }
            KeyCode::Char('K') => self.move_step(-1),
            KeyCode::Char('J') => self.move_step(1),
            _ => {}
        }
    }

    fn move_step(&mut self, delta: i64) {
        let Some(step) = self.selected_step() else {
            return;
        };
        let target = step.order as i64 + delta;
        if target < 0 || target >= self.api.plan_steps().len() as i64 {
            return;
        }
        let id = step.id.clone();
        match self.api.reorder_plan_step(&id, target) {
            Ok(step) => {
                self.step_selected = step.order;
                self.set_info(format!("{} moved to position {}", step.name, step.order + 1));
            }
            Err(err) => self.set_error(err.to_string()),
        }
    }

    fn delete(&mut self, confirm: DeleteConfirmState) {
        let result = match confirm.kind {
            RecordKind::Task => self.api.delete_task(&confirm.id).map(|task| task.title),
            RecordKind::PlanStep => self.api.delete_plan_step(&confirm.id).map(|step| step.name),
        };
        match result {
            Ok(label) => self.set_info(format!("deleted {label}")),
            Err(err) => self.set_error(err.to_string()),
        }
        self.clamp_selection();
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        match editor.handle_key(key) {
            EditorAction::None => {}
            EditorAction::Cancel => {
                self.editor = None;
                self.set_info("cancelled".to_string());
            }
            EditorAction::Submit => {
                let submit = match editor.build_submit() {
                    Ok(submit) => submit,
                    Err(err) => {
                        editor.set_error(err);
                        return;
                    }
                };
                match self.apply_submit(submit) {
                    Ok(message) => {
                        self.editor = None;
                        self.set_info(message);
                    }
                    Err(err) => {
                        if let Some(editor) = self.editor.as_mut() {
                            editor.set_error(err);
                        }
                    }
                }
            }
        }
    }

    fn apply_submit(&mut self, submit: EditorSubmit) -> std::result::Result<String, String> {
        let result = match submit {
            EditorSubmit::Task {
                id: None,
                title,
                description,
                priority,
                status,
            } => self
                .api
                .add_task(NewTask {
                    title,
                    description,
                    priority,
                    status,
                })
                .map(|task| {
                    self.task_selected = self.api.tasks().len().saturating_sub(1);
                    format!("added {}", task.title)
                }),
            EditorSubmit::Task {
                id: Some(id),
                title,
                description,
                priority,
                status,
            } => self
                .api
                .update_task(
                    &id,
                    TaskUpdate {
                        title: Some(title),
                        description: Some(description),
                        priority,
                        status,
                    },
                )
                .map(|task| format!("saved {}", task.title)),
            EditorSubmit::Step {
                id: None,
                name,
                description,
                details,
            } => self
                .api
                .add_plan_step(NewPlanStep {
                    name,
                    description,
                    details,
                })
                .map(|step| {
                    self.step_selected = step.order;
                    format!("added {}", step.name)
                }),
            EditorSubmit::Step {
                id: Some(id),
                name,
                description,
                details,
            } => self
                .api
                .update_plan_step(
                    &id,
                    PlanStepUpdate {
                        name: Some(name),
                        description: Some(description),
                        details: Some(details),
                        completed: None,
                    },
                )
                .map(|step| format!("saved {}", step.name)),
        };
        result.map_err(|err| err.to_string())
    }

    pub(crate) fn save_notes(&mut self, text: String) {
        if text == self.api.get_notes() {
            self.set_info("notes unchanged".to_string());
            return;
        }
        match self.api.save_notes(text) {
            Ok(()) => self.set_info("notes saved".to_string()),
            Err(err) => self.set_error(err.to_string()),
        }
    }
}

pub fn run(api: TrackerApi) -> Result<()> {
    api.storage().init()?;
    let (ui_tx, ui_rx) = mpsc::channel();
    if api.config().ui.watch {
        spawn_watch(api.storage().root().to_path_buf(), ui_tx);
    }

    let mut app = AppState::new(api);
    let result = run_terminal(&mut app, ui_rx);
    let saved = app.api.save_all();
    result.and(saved)
}

fn run_terminal(app: &mut AppState, ui_rx: Receiver<UiMsg>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app, ui_rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    ui_rx: Receiver<UiMsg>,
) -> Result<()> {
    let mut dirty = true;
    loop {
        while let Ok(msg) = ui_rx.try_recv() {
            handle_ui_msg(app, msg);
            dirty = true;
        }

        if dirty {
            terminal.draw(|frame| view::render(frame, app))?;
            dirty = false;
        }

        if event::poll(Duration::from_millis(EVENT_POLL_MS))? {
            match event::read()? {
                Event::Key(key) => {
                    match app.handle_key(key) {
                        KeyOutcome::Quit => break,
                        KeyOutcome::EditNotes => {
                            let current = app.api.get_notes().to_string();
                            match edit_text_external(terminal, &current) {
                                Ok(text) => app.save_notes(text),
                                Err(err) => app.set_error(err),
                            }
                        }
                        KeyOutcome::Continue => {}
                    }
                    dirty = true;
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }
    }
    Ok(())
}

fn handle_ui_msg(app: &mut AppState, msg: UiMsg) {
    match msg {
        UiMsg::FilesChanged => {
            app.reload();
            tracing::debug!("reloaded after file change");
        }
        UiMsg::WatchError(err) => {
            app.watch_error = Some(format!("watch error: {err}"));
        }
    }
}

fn edit_text_external(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    text: &str,
) -> std::result::Result<String, String> {
    let mut temp = NamedTempFile::new()
        .map_err(|err| format!("failed to create temp file for editor: {err}"))?;
    temp.write_all(text.as_bytes())
        .map_err(|err| format!("failed to write notes to temp file: {err}"))?;
    temp.flush()
        .map_err(|err| format!("failed to flush temp file: {err}"))?;
    let path = temp.path().to_path_buf();

    suspend_terminal(terminal).map_err(|err| format!("failed to suspend terminal: {err}"))?;
    let editor_result = launch_editor(&path);
    if let Err(err) = resume_terminal(terminal) {
        return Err(format!("failed to restore terminal: {err}"));
    }

    let status = editor_result?;
    if !status.success() {
        let detail = status
            .code()
            .map(|code| format!("exit code {code}"))
            .unwrap_or_else(|| "signal".to_string());
        return Err(format!("editor exited with {detail}"));
    }

    fs::read_to_string(&path).map_err(|err| format!("failed to read editor buffer: {err}"))
}

fn suspend_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    Ok(())
}

fn resume_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    execute!(terminal.backend_mut(), EnterAlternateScreen)?;
    enable_raw_mode()?;
    terminal.clear()?;
    Ok(())
}

fn launch_editor(path: &Path) -> std::result::Result<std::process::ExitStatus, String> {
    let mut attempted: Vec<String> = Vec::new();
    for candidate in editor_candidates() {
        let parts: Vec<&str> = candidate.split_whitespace().collect();
        let Some((program, args)) = parts.split_first() else {
            continue;
        };
        attempted.push(program.to_string());
        match Command::new(program).args(args).arg(path).status() {
            Ok(status) => return Ok(status),
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => return Err(format!("failed to launch editor '{program}': {err}")),
        }
    }
    Err(format!(
        "no editor found (tried {}); set $VISUAL or $EDITOR",
        attempted.join(", ")
    ))
}

fn editor_candidates() -> Vec<String> {
    let mut out: Vec<String> = ["VISUAL", "EDITOR"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .filter(|value| !value.trim().is_empty())
        .collect();
    out.push("vi".to_string());
    out
}

fn spawn_watch(root: PathBuf, ui_tx: Sender<UiMsg>) {
    thread::spawn(move || {
        let (event_tx, event_rx) = mpsc::channel();
        let watcher: notify::Result<RecommendedWatcher> = notify::recommended_watcher(move |res| {
            let _ = event_tx.send(res);
        });

        let mut watcher = match watcher {
            Ok(watcher) => watcher,
            Err(err) => {
                let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
                return;
            }
        };
        if let Err(err) = watcher.watch(&root, RecursiveMode::NonRecursive) {
            let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
            return;
        }

        let debounce = Duration::from_millis(WATCH_DEBOUNCE_MS);
        let mut pending: Option<Instant> = None;

        loop {
            let timeout = pending
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(Duration::from_secs(3600));
            match event_rx.recv_timeout(timeout) {
                Ok(Ok(_)) => {
                    pending = Some(Instant::now() + debounce);
                }
                Ok(Err(err)) => {
                    let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if pending.take().is_some() && ui_tx.send(UiMsg::FilesChanged).is_err() {
                        break;
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    });
}
