use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::plan::PlanStep;
use crate::task::{self, Task, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKind {
    NewTask,
    EditTask,
    NewStep,
    EditStep,
}

impl EditorKind {
    pub fn title(self) -> &'static str {
        match self {
            EditorKind::NewTask => "New Task",
            EditorKind::EditTask => "Edit Task",
            EditorKind::NewStep => "New Plan Step",
            EditorKind::EditStep => "Edit Plan Step",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorFieldId {
    Title,
    Name,
    Description,
    Details,
    Priority,
    Status,
}

#[derive(Debug, Clone)]
pub struct EditorField {
    pub id: EditorFieldId,
    pub label: &'static str,
    pub value: String,
    pub required: bool,
}

impl EditorField {
    fn new(id: EditorFieldId, label: &'static str, value: String, required: bool) -> Self {
        Self {
            id,
            label,
            value,
            required,
        }
    }
}

/// Parsed form contents; empty optional fields become `None`
#[derive(Debug, Clone, PartialEq)]
pub enum EditorSubmit {
    Task {
        id: Option<String>,
        title: String,
        description: String,
        priority: Option<u8>,
        status: Option<TaskStatus>,
    },
    Step {
        id: Option<String>,
        name: String,
        description: String,
        details: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    None,
    Cancel,
    Submit,
}

#[derive(Debug, Clone)]
pub struct EditorState {
    kind: EditorKind,
    fields: Vec<EditorField>,
    active: usize,
    confirming: bool,
    error: Option<String>,
    default_priority: Option<u8>,
    record_id: Option<String>,
}

impl EditorState {
    pub fn new_task(default_priority: u8) -> Self {
        Self::build(
            EditorKind::NewTask,
            vec![
                EditorField::new(EditorFieldId::Title, "Title", String::new(), true),
                EditorField::new(EditorFieldId::Description, "Description", String::new(), false),
                EditorField::new(EditorFieldId::Priority, "Priority", String::new(), false),
                EditorField::new(EditorFieldId::Status, "Status", String::new(), false),
            ],
            Some(default_priority),
            None,
        )
    }

    pub fn edit_task(task: &Task) -> Self {
        Self::build(
            EditorKind::EditTask,
            vec![
                EditorField::new(EditorFieldId::Title, "Title", task.title.clone(), true),
                EditorField::new(
                    EditorFieldId::Description,
                    "Description",
                    task.description.clone(),
                    false,
                ),
                EditorField::new(
                    EditorFieldId::Priority,
                    "Priority",
                    task.priority.to_string(),
                    true,
                ),
                EditorField::new(
                    EditorFieldId::Status,
                    "Status",
                    task.status.as_str().to_string(),
                    true,
                ),
            ],
            None,
            Some(task.id.clone()),
        )
    }

    pub fn new_step() -> Self {
        Self::build(
            EditorKind::NewStep,
            vec![
                EditorField::new(EditorFieldId::Name, "Name", String::new(), true),
                EditorField::new(EditorFieldId::Description, "Description", String::new(), false),
                EditorField::new(EditorFieldId::Details, "Details", String::new(), false),
            ],
            None,
            None,
        )
    }

    pub fn edit_step(step: &PlanStep) -> Self {
        Self::build(
            EditorKind::EditStep,
            vec![
                EditorField::new(EditorFieldId::Name, "Name", step.name.clone(), true),
                EditorField::new(
                    EditorFieldId::Description,
                    "Description",
                    step.description.clone(),
                    false,
                ),
                EditorField::new(EditorFieldId::Details, "Details", step.details.clone(), false),
            ],
            None,
            Some(step.id.clone()),
        )
    }

    fn build(
        kind: EditorKind,
        fields: Vec<EditorField>,
        default_priority: Option<u8>,
        record_id: Option<String>,
    ) -> Self {
        Self {
            kind,
            fields,
            active: 0,
            confirming: false,
            error: None,
            default_priority,
            record_id,
        }
    }

    pub fn kind(&self) -> EditorKind {
        self.kind
    }

    pub fn fields(&self) -> &[EditorField] {
        &self.fields
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn confirming(&self) -> bool {
        self.confirming
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn default_priority(&self) -> Option<u8> {
        self.default_priority
    }

    pub fn set_error(&mut self, message: String) {
        self.error = Some(message);
        self.confirming = false;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> EditorAction {
        if self.confirming {
            return self.handle_confirm_key(key);
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('u') {
            if let Some(field) = self.current_field_mut() {
                field.value.clear();
            }
            self.error = None;
            return EditorAction::None;
        }

        match key.code {
            KeyCode::Esc => return EditorAction::Cancel,
            KeyCode::Tab | KeyCode::Down => self.move_active(1),
            KeyCode::BackTab | KeyCode::Up => self.move_active(-1),
            KeyCode::Enter => {
                if self.active + 1 >= self.fields.len() {
                    return self.attempt_confirm();
                }
                self.move_active(1);
            }
            KeyCode::Backspace => {
                if let Some(field) = self.current_field_mut() {
                    field.value.pop();
                }
            }
            KeyCode::Char(ch) => {
                if key.modifiers.contains(KeyModifiers::CONTROL) {
                    return EditorAction::None;
                }
                if !ch.is_control() {
                    if let Some(field) = self.current_field_mut() {
                        field.value.push(ch);
                    }
                }
            }
            _ => {}
        }

        self.error = None;
        EditorAction::None
    }

    pub fn build_submit(&self) -> Result<EditorSubmit, String> {
        self.validate()?;
        let description = self.field_value(EditorFieldId::Description).to_string();
        let id = self.record_id.clone();
        match self.kind {
            EditorKind::NewTask | EditorKind::EditTask => Ok(EditorSubmit::Task {
                id,
                title: self.field_value(EditorFieldId::Title).trim().to_string(),
                description,
                priority: self.parsed_priority()?,
                status: self.parsed_status()?,
            }),
            EditorKind::NewStep | EditorKind::EditStep => Ok(EditorSubmit::Step {
                id,
                name: self.field_value(EditorFieldId::Name).trim().to_string(),
                description,
                details: self.field_value(EditorFieldId::Details).to_string(),
            }),
        }
    }

    fn attempt_confirm(&mut self) -> EditorAction {
        match self.validate() {
            Ok(()) => {
                self.confirming = true;
                self.error = None;
            }
            Err(err) => self.set_error(err),
        }
        EditorAction::None
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> EditorAction {
        match key.code {
            KeyCode::Esc => EditorAction::Cancel,
            KeyCode::Backspace | KeyCode::Char('e') => {
                self.confirming = false;
                self.error = None;
                EditorAction::None
            }
            KeyCode::Char('y') | KeyCode::Enter => EditorAction::Submit,
            _ => EditorAction::None,
        }
    }

    fn validate(&self) -> Result<(), String> {
        for field in &self.fields {
            if field.required && field.value.trim().is_empty() {
                return Err(format!("{} is required", field.label.to_ascii_lowercase()));
            }
        }
        self.parsed_priority()?;
        self.parsed_status()?;
        Ok(())
    }

    fn parsed_priority(&self) -> Result<Option<u8>, String> {
        non_empty(self.field_value(EditorFieldId::Priority))
            .map(|value| task::parse_priority(&value).map_err(|err| err.to_string()))
            .transpose()
    }

    fn parsed_status(&self) -> Result<Option<TaskStatus>, String> {
        non_empty(self.field_value(EditorFieldId::Status))
            .map(|value| value.parse::<TaskStatus>().map_err(|err| err.to_string()))
            .transpose()
    }

    fn move_active(&mut self, delta: isize) {
        let len = self.fields.len() as isize;
        if len == 0 {
            self.active = 0;
            return;
        }
        let next = (self.active as isize + delta).rem_euclid(len);
        self.active = next as usize;
    }

    fn current_field_mut(&mut self) -> Option<&mut EditorField> {
        self.fields.get_mut(self.active)
    }

    fn field_value(&self, id: EditorFieldId) -> &str {
        self.fields
            .iter()
            .find(|field| field.id == id)
            .map(|field| field.value.as_str())
            .unwrap_or("")
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(editor: &mut EditorState, code: KeyCode) -> EditorAction {
        editor.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(editor: &mut EditorState, text: &str) {
        for ch in text.chars() {
            press(editor, KeyCode::Char(ch));
        }
    }

    #[test]
    fn editor_requires_title() {
        let mut editor = EditorState::new_task(1);
        for _ in 0..editor.fields().len() {
            let action = press(&mut editor, KeyCode::Enter);
            assert_eq!(action, EditorAction::None);
        }
        assert_eq!(editor.error(), Some("title is required"));
        assert!(!editor.confirming());
    }

    #[test]
    fn letters_used_for_navigation_elsewhere_are_typed() {
        let mut editor = EditorState::new_step();
        type_text(&mut editor, "jk quick");
        assert_eq!(editor.fields()[0].value, "jk quick");
        assert_eq!(editor.active_index(), 0);
    }

    #[test]
    fn new_task_submits_parsed_values() {
        let mut editor = EditorState::new_task(1);
        type_text(&mut editor, "  Write docs ");
        press(&mut editor, KeyCode::Tab);
        type_text(&mut editor, "for the api");
        press(&mut editor, KeyCode::Tab);
        type_text(&mut editor, "low");
        press(&mut editor, KeyCode::Tab);
        type_text(&mut editor, "in progress");
        press(&mut editor, KeyCode::Enter);
        assert!(editor.confirming());
        assert_eq!(press(&mut editor, KeyCode::Char('y')), EditorAction::Submit);

        assert_eq!(
            editor.build_submit().unwrap(),
            EditorSubmit::Task {
                id: None,
                title: "Write docs".to_string(),
                description: "for the api".to_string(),
                priority: Some(3),
                status: Some(TaskStatus::InProgress),
            }
        );
    }

    #[test]
    fn bad_priority_blocks_confirm() {
        let mut editor = EditorState::new_task(1);
        type_text(&mut editor, "Title");
        press(&mut editor, KeyCode::Tab);
        press(&mut editor, KeyCode::Tab);
        type_text(&mut editor, "9");
        press(&mut editor, KeyCode::Tab);
        press(&mut editor, KeyCode::Enter);
        assert!(!editor.confirming());
        assert!(editor.error().unwrap_or("").contains("priority"));
    }

    #[test]
    fn navigation_wraps_and_confirm_can_be_left() {
        let mut editor = EditorState::new_step();
        press(&mut editor, KeyCode::BackTab);
        assert_eq!(editor.active_index(), editor.fields().len() - 1);

        type_text(&mut editor, "details");
        press(&mut editor, KeyCode::Tab);
        type_text(&mut editor, "Name");
        press(&mut editor, KeyCode::Up);
        press(&mut editor, KeyCode::Enter);
        assert!(editor.confirming());

        press(&mut editor, KeyCode::Backspace);
        assert!(!editor.confirming());
        assert_eq!(press(&mut editor, KeyCode::Esc), EditorAction::Cancel);
    }

    #[test]
    fn ctrl_u_clears_the_active_field() {
        let mut editor = EditorState::new_step();
        type_text(&mut editor, "typo");
        editor.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert_eq!(editor.fields()[0].value, "");
    }
}
