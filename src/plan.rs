//! Project plan: an ordered list of steps.
//!
//! Step `order` values are always dense: after every mutation the steps
//! are numbered `0..count` in list order. The backing vector is kept sorted
//! by `order`, so a step's index and its order agree.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::record::{self, Record, RecordKind};
use crate::store::EntityStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub details: String,
    #[serde(default, deserialize_with = "lenient_order")]
    pub order: usize,
    #[serde(default)]
    pub completed: bool,
    #[serde(default = "record::now", deserialize_with = "record::lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "record::now", deserialize_with = "record::lenient_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Record for PlanStep {
    const KIND: RecordKind = RecordKind::PlanStep;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Validation("plan step id cannot be empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::Validation("name cannot be empty".to_string()));
        }
        record::check_timestamps(Self::KIND, self.created_at, self.updated_at)
    }
}

/// Stored orders are only a sort key: null, negative or non-numeric values
/// sort first, and fractional values are truncated
fn lenient_order<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let order = match raw {
        Some(Value::Number(number)) => number
            .as_u64()
            .and_then(|value| usize::try_from(value).ok())
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|value| value.is_finite() && *value > 0.0)
                    .map(|value| value as usize)
            })
            .unwrap_or(0),
        _ => 0,
    };
    Ok(order)
}

#[derive(Debug, Clone, Default)]
pub struct NewPlanStep {
    pub name: String,
    pub description: String,
    pub details: String,
}

impl NewPlanStep {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update; position changes go through `reorder_plan_step`
#[derive(Debug, Clone, Default)]
pub struct PlanStepUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub completed: Option<bool>,
}

impl PlanStepUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.details.is_none()
            && self.completed.is_none()
    }
}

/// Sort steps by their current `order` (ties keep their sequence) and
/// renumber them `0..count`.
pub fn densify(steps: &mut [PlanStep]) {
    steps.sort_by_key(|step| step.order);
    renumber(steps);
}

/// Load-time cleanup: dense orders and `updated_at >= created_at`
fn normalize_loaded(steps: &mut [PlanStep]) {
    densify(steps);
    for step in steps.iter_mut().filter(|step| step.updated_at < step.created_at) {
        step.updated_at = step.created_at;
    }
}

fn renumber(steps: &mut [PlanStep]) {
    for (index, step) in steps.iter_mut().enumerate() {
        step.order = index;
    }
}

/// Clamp a requested position into `[0, len - 1]`
fn clamp_position(position: i64, len: usize) -> usize {
    if len == 0 || position <= 0 {
        return 0;
    }
    usize::try_from(position).map_or(len - 1, |value| value.min(len - 1))
}

fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("name cannot be empty".to_string()));
    }
    Ok(name.to_string())
}

pub struct PlanManager {
    store: EntityStore<PlanStep>,
}

impl PlanManager {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = EntityStore::open(path);
        store.normalize(|steps| normalize_loaded(steps));
        Self { store }
    }

    pub fn steps(&self) -> &[PlanStep] {
        self.store.records()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Append a step at the end of the plan
    pub fn add_plan_step(&mut self, input: NewPlanStep) -> Result<PlanStep> {
        let step = self.build_step(input)?;
        let step = self.store.add(step)?;
        tracing::info!(id = %step.id, order = step.order, "plan step added");
        Ok(step)
    }

    /// Add a step and move it to `position` in one persisted change
    pub fn insert_plan_step(&mut self, input: NewPlanStep, position: i64) -> Result<PlanStep> {
        let step = self.build_step(input)?;
        step.validate()?;
        let step = self.store.transact(|steps| {
            let to = clamp_position(position, steps.len() + 1);
            steps.insert(to, step);
            renumber(steps);
            Ok(steps[to].clone())
        })?;
        tracing::info!(id = %step.id, order = step.order, "plan step inserted");
        Ok(step)
    }

    pub fn get_plan_step(&self, id: &str) -> Result<PlanStep> {
        self.store.get(id).cloned()
    }

    pub fn update_plan_step(&mut self, id: &str, update: PlanStepUpdate) -> Result<PlanStep> {
        let step = self.store.update(id, |step| {
            if let Some(name) = update.name.as_deref() {
                step.name = normalize_name(name)?;
            }
            if let Some(description) = update.description {
                step.description = description;
            }
            if let Some(details) = update.details {
                step.details = details;
            }
            if let Some(completed) = update.completed {
                step.completed = completed;
            }
            step.updated_at = record::next_timestamp(step.updated_at);
            Ok(())
        })?;
        tracing::info!(id = %step.id, "plan step updated");
        Ok(step)
    }

    /// Move a step to `new_order` (clamped into range); steps in between
    /// shift by one.
    pub fn reorder_plan_step(&mut self, id: &str, new_order: i64) -> Result<PlanStep> {
        let step = self.store.transact(|steps| {
            let from = steps
                .iter()
                .position(|step| step.id == id)
                .ok_or_else(|| Error::not_found(RecordKind::PlanStep, id))?;
            let to = clamp_position(new_order, steps.len());
            if from != to {
                let mut step = steps.remove(from);
                step.updated_at = record::next_timestamp(step.updated_at);
                steps.insert(to, step);
            }
            renumber(steps);
            Ok(steps[to].clone())
        })?;
        tracing::info!(id = %step.id, order = step.order, "plan step reordered");
        Ok(step)
    }

    pub fn toggle_plan_step(&mut self, id: &str) -> Result<PlanStep> {
        let step = self.store.update(id, |step| {
            step.completed = !step.completed;
            step.updated_at = record::next_timestamp(step.updated_at);
            Ok(())
        })?;
        tracing::info!(id = %step.id, completed = step.completed, "plan step toggled");
        Ok(step)
    }

    /// Remove a step; later steps move up by one
    pub fn delete_plan_step(&mut self, id: &str) -> Result<PlanStep> {
        let step = self.store.transact(|steps| {
            let index = steps
                .iter()
                .position(|step| step.id == id)
                .ok_or_else(|| Error::not_found(RecordKind::PlanStep, id))?;
            let removed = steps.remove(index);
            renumber(steps);
            Ok(removed)
        })?;
        tracing::info!(id = %step.id, "plan step deleted");
        Ok(step)
    }

    /// All steps sorted by order
    pub fn list_plan_steps(&self) -> Vec<PlanStep> {
        let mut steps = self.store.records().to_vec();
        steps.sort_by_key(|step| step.order);
        steps
    }

    /// Replace the plan wholesale; orders are re-densified first
    pub fn replace_all(&mut self, mut steps: Vec<PlanStep>) -> Result<()> {
        densify(&mut steps);
        self.store.replace_all(steps)
    }

    pub fn save(&self) -> Result<()> {
        self.store.save()
    }

    pub fn reload(&mut self) {
        self.store.reload();
        self.store.normalize(|steps| normalize_loaded(steps));
    }

    fn build_step(&self, input: NewPlanStep) -> Result<PlanStep> {
        let name = normalize_name(&input.name)?;
        let mut id = record::new_id();
        while self.store.contains(&id) {
            id = record::new_id();
        }
        let now = record::now();
        Ok(PlanStep {
            id,
            name,
            description: input.description,
            details: input.details,
            order: self.store.len(),
            completed: false,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(temp: &TempDir) -> PlanManager {
        PlanManager::open(temp.path().join("plan.json"))
    }

    fn orders(plan: &PlanManager) -> Vec<usize> {
        plan.list_plan_steps().iter().map(|step| step.order).collect()
    }

    fn names(plan: &PlanManager) -> Vec<String> {
        plan.list_plan_steps()
            .into_iter()
            .map(|step| step.name)
            .collect()
    }

    fn seeded(temp: &TempDir, count: usize) -> (PlanManager, Vec<PlanStep>) {
        let mut plan = manager(temp);
        let steps = (0..count)
            .map(|index| {
                plan.add_plan_step(NewPlanStep::named(format!("S{index}")))
                    .unwrap()
            })
            .collect();
        (plan, steps)
    }

    #[test]
    fn add_appends_with_next_order() {
        let temp = TempDir::new().unwrap();
        let (plan, steps) = seeded(&temp, 3);
        assert_eq!(steps[2].order, 2);
        assert!(!steps[2].completed);
        assert_eq!(orders(&plan), vec![0, 1, 2]);
    }

    #[test]
    fn add_requires_name() {
        let temp = TempDir::new().unwrap();
        let mut plan = manager(&temp);
        assert!(matches!(
            plan.add_plan_step(NewPlanStep::named(" ")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn reorder_moves_step_and_shifts_others() {
        let temp = TempDir::new().unwrap();
        let (mut plan, steps) = seeded(&temp, 4);

        let moved = plan.reorder_plan_step(&steps[3].id, 1).unwrap();
        assert_eq!(moved.order, 1);
        assert!(moved.updated_at > steps[3].updated_at);
        assert_eq!(names(&plan), vec!["S0", "S3", "S1", "S2"]);
        assert_eq!(orders(&plan), vec![0, 1, 2, 3]);

        plan.reorder_plan_step(&steps[0].id, 3).unwrap();
        assert_eq!(names(&plan), vec!["S3", "S1", "S2", "S0"]);
    }

    #[test]
    fn reorder_clamps_out_of_range_positions() {
        let temp = TempDir::new().unwrap();
        let (mut plan, steps) = seeded(&temp, 3);

        assert_eq!(plan.reorder_plan_step(&steps[0].id, 99).unwrap().order, 2);
        assert_eq!(plan.reorder_plan_step(&steps[0].id, -5).unwrap().order, 0);
        assert_eq!(orders(&plan), vec![0, 1, 2]);
    }

    #[test]
    fn reorder_to_own_position_changes_nothing_else() {
        let temp = TempDir::new().unwrap();
        let (mut plan, steps) = seeded(&temp, 3);
        let before = plan.list_plan_steps();

        let same = plan.reorder_plan_step(&steps[1].id, 1).unwrap();
        assert_eq!(same, steps[1]);
        assert_eq!(plan.list_plan_steps(), before);
    }

    #[test]
    fn reorder_unknown_id_is_not_found() {
        let temp = TempDir::new().unwrap();
        let (mut plan, _) = seeded(&temp, 2);
        assert!(matches!(
            plan.reorder_plan_step("missing", 0),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn delete_shifts_later_steps_down() {
        let temp = TempDir::new().unwrap();
        let (mut plan, steps) = seeded(&temp, 4);

        let removed = plan.delete_plan_step(&steps[1].id).unwrap();
        assert_eq!(removed.id, steps[1].id);

        let after = plan.list_plan_steps();
        assert_eq!(after[0].id, steps[0].id);
        assert_eq!(after[0].order, 0);
        assert_eq!(after[1].id, steps[2].id);
        assert_eq!(after[1].order, 1);
        assert_eq!(after[2].id, steps[3].id);
        assert_eq!(after[2].order, 2);
    }

    #[test]
    fn insert_places_step_at_position() {
        let temp = TempDir::new().unwrap();
        let (mut plan, _) = seeded(&temp, 3);

        let inserted = plan
            .insert_plan_step(NewPlanStep::named("Middle"), 1)
            .unwrap();
        assert_eq!(inserted.order, 1);
        assert_eq!(names(&plan), vec!["S0", "Middle", "S1", "S2"]);

        let last = plan.insert_plan_step(NewPlanStep::named("End"), 50).unwrap();
        assert_eq!(last.order, 4);
        assert_eq!(orders(&plan), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn toggle_twice_restores_completion() {
        let temp = TempDir::new().unwrap();
        let (mut plan, steps) = seeded(&temp, 1);

        let toggled = plan.toggle_plan_step(&steps[0].id).unwrap();
        assert!(toggled.completed);
        let restored = plan.toggle_plan_step(&steps[0].id).unwrap();
        assert!(!restored.completed);
        assert!(restored.updated_at > toggled.updated_at);
    }

    #[test]
    fn update_merges_fields_without_moving() {
        let temp = TempDir::new().unwrap();
        let (mut plan, steps) = seeded(&temp, 2);

        let update = PlanStepUpdate {
            details: Some("run the migration".to_string()),
            completed: Some(true),
            ..PlanStepUpdate::default()
        };
        let updated = plan.update_plan_step(&steps[1].id, update).unwrap();
        assert_eq!(updated.name, "S1");
        assert_eq!(updated.details, "run the migration");
        assert!(updated.completed);
        assert_eq!(updated.order, 1);
    }

    #[test]
    fn density_holds_across_mixed_operations() {
        let temp = TempDir::new().unwrap();
        let (mut plan, steps) = seeded(&temp, 5);

        plan.delete_plan_step(&steps[0].id).unwrap();
        assert_eq!(orders(&plan), vec![0, 1, 2, 3]);
        plan.reorder_plan_step(&steps[4].id, 0).unwrap();
        assert_eq!(orders(&plan), vec![0, 1, 2, 3]);
        plan.add_plan_step(NewPlanStep::named("S5")).unwrap();
        assert_eq!(orders(&plan), vec![0, 1, 2, 3, 4]);
        plan.delete_plan_step(&steps[4].id).unwrap();
        assert_eq!(orders(&plan), vec![0, 1, 2, 3]);
        plan.insert_plan_step(NewPlanStep::named("S6"), 2).unwrap();
        assert_eq!(orders(&plan), vec![0, 1, 2, 3, 4]);

        let reopened = manager(&temp);
        assert_eq!(reopened.list_plan_steps(), plan.list_plan_steps());
    }

    #[test]
    fn load_densifies_sparse_and_duplicate_orders() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plan.json");
        std::fs::write(
            &path,
            r#"{"steps":[
                {"id":"c","name":"C","order":7},
                {"id":"a","name":"A","order":2},
                {"id":"b","name":"B","order":2},
                {"id":"d","name":"D","order":-1}
            ]}"#,
        )
        .unwrap();

        let plan = PlanManager::open(&path);
        let ids: Vec<String> = plan
            .list_plan_steps()
            .into_iter()
            .map(|step| step.id)
            .collect();
        assert_eq!(ids, vec!["d", "a", "b", "c"]);
        assert_eq!(orders(&plan), vec![0, 1, 2, 3]);
    }

    #[test]
    fn load_accepts_null_and_fractional_orders() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plan.json");
        std::fs::write(
            &path,
            r#"[
                {"id":"c","name":"C","order":3.0},
                {"id":"a","name":"A","order":null},
                {"id":"b","name":"B","order":1.5},
                {"id":"d","name":"D"}
            ]"#,
        )
        .unwrap();

        let plan = PlanManager::open(&path);
        assert_eq!(names(&plan), vec!["A", "D", "B", "C"]);
        assert_eq!(orders(&plan), vec![0, 1, 2, 3]);
    }

    #[test]
    fn updated_before_created_is_invalid_and_repaired_on_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plan.json");
        std::fs::write(
            &path,
            r#"[{"id":"s","name":"S","order":0,
                "created_at":"2025-04-08T10:00:00Z","updated_at":"2025-04-08T09:00:00Z"}]"#,
        )
        .unwrap();

        let raw: PlanStep = serde_json::from_str(
            r#"{"id":"s","name":"S","created_at":"2025-04-08T10:00:00Z","updated_at":"2025-04-08T09:00:00Z"}"#,
        )
        .unwrap();
        assert!(matches!(raw.validate(), Err(Error::Validation(_))));

        let mut plan = PlanManager::open(&path);
        let step = plan.get_plan_step("s").unwrap();
        assert_eq!(step.updated_at, step.created_at);
        assert!(step.validate().is_ok());
        assert!(plan.toggle_plan_step("s").unwrap().completed);
    }
}
