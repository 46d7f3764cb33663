//! Baseline-vs-proposed plan comparison.
//!
//! Tasks are matched by normalized content. Repeated content is matched by occurrence:
//! the n-th "Add tests" on one side pairs with the n-th "Add tests" on the other.
//! Additions and removals are scope changes; completion flips are not.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::core::tasks::Task;

type MatchKey = (String, usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskPair {
    pub old: Task,
    pub new: Task,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanDiff {
    pub added: Vec<Task>,
    pub removed: Vec<Task>,
    pub modified: Vec<TaskPair>,
    pub unchanged: Vec<TaskPair>,
}

impl PlanDiff {
    pub fn is_scope_change(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

fn keyed(tasks: &[Task]) -> Vec<(MatchKey, &Task)> {
    let mut seen: FxHashMap<String, usize> = FxHashMap::default();
    tasks
        .iter()
        .map(|task| {
            let key = task.key();
            let ordinal = seen.entry(key.clone()).or_insert(0);
            let out = ((key, *ordinal), task);
            *ordinal += 1;
            out
        })
        .collect()
}

pub fn diff(approved: &[Task], proposed: &[Task]) -> PlanDiff {
    let approved_keyed = keyed(approved);
    let proposed_keyed = keyed(proposed);

    let approved_map: FxHashMap<&MatchKey, &Task> =
        approved_keyed.iter().map(|(k, t)| (k, *t)).collect();
    let proposed_map: FxHashMap<&MatchKey, &Task> =
        proposed_keyed.iter().map(|(k, t)| (k, *t)).collect();

    let mut out = PlanDiff::default();

    for (key, task) in &approved_keyed {
        if !proposed_map.contains_key(key) {
            out.removed.push((*task).clone());
        }
    }

    for (key, task) in &proposed_keyed {
        match approved_map.get(key) {
            None => out.added.push((*task).clone()),
            Some(old) => {
                let pair = TaskPair {
                    old: (*old).clone(),
                    new: (*task).clone(),
                };
                if old.completed != task.completed {
                    out.modified.push(pair);
                } else {
                    out.unchanged.push(pair);
                }
            }
        }
    }

    out
}

/// Copy completion flags from `proposed` onto the matching baseline tasks.
///
/// Baseline entries are never added, removed or reworded here.
pub fn apply_completion(approved: &[Task], proposed: &[Task]) -> Vec<Task> {
    let proposed_keyed = keyed(proposed);
    let proposed_map: FxHashMap<&MatchKey, &Task> =
        proposed_keyed.iter().map(|(k, t)| (k, *t)).collect();

    keyed(approved)
        .into_iter()
        .map(|(key, task)| {
            let mut next = task.clone();
            if let Some(p) = proposed_map.get(&key) {
                next.completed = p.completed;
            }
            next
        })
        .collect()
}

/// Human-facing explanation for a rejected todo-list update.
pub fn format_violation(work_item_id: &str, diff: &PlanDiff) -> String {
    let mut msg = format!(
        "Plan change blocked: the task list for work item '{work_item_id}' is locked to its approved baseline.\n"
    );
    if !diff.added.is_empty() {
        msg.push_str("\nTasks added (not in the approved plan):\n");
        for task in &diff.added {
            msg.push_str(&format!("  + {}\n", task.content));
        }
    }
    if !diff.removed.is_empty() {
        msg.push_str("\nTasks removed (present in the approved plan):\n");
        for task in &diff.removed {
            msg.push_str(&format!("  - {}\n", task.content));
        }
    }
    msg.push_str(
        "\nMarking approved tasks complete is always allowed. Adding or removing tasks is a scope change.\n\
         Next steps:\n\
         \x20 1. Continue with the approved tasks as planned.\n\
         \x20 2. Ask the user to approve the scope change.\n\
         \x20 3. If approved, the user edits the baseline tasks document and re-starts the work item.\n",
    );
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn t(content: &str, completed: bool) -> Task {
        Task::new(content, completed)
    }

    fn contents(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.content.as_str()).collect()
    }

    #[test]
    fn identical_plans_are_all_unchanged() {
        let plan = vec![t("Create model", false), t("Add tests", true)];
        let d = diff(&plan, &plan);
        assert!(d.added.is_empty());
        assert!(d.removed.is_empty());
        assert!(d.modified.is_empty());
        assert_eq!(d.unchanged.len(), 2);
        assert!(!d.is_scope_change());
    }

    #[test]
    fn addition_is_scope_change() {
        let approved = vec![t("Create model", false), t("Add tests", false)];
        let mut proposed = approved.clone();
        proposed.push(t("Add admin UI", false));
        let d = diff(&approved, &proposed);
        assert_eq!(contents(&d.added), vec!["Add admin UI"]);
        assert!(d.is_scope_change());
    }

    #[test]
    fn removal_is_scope_change() {
        let approved = vec![t("Create model", false), t("Add tests", false)];
        let proposed = vec![t("Create model", false)];
        let d = diff(&approved, &proposed);
        assert_eq!(contents(&d.removed), vec!["Add tests"]);
        assert!(d.is_scope_change());
    }

    #[test]
    fn completion_flip_is_modified_only() {
        let approved = vec![t("Create model", false)];
        let proposed = vec![t("Create model", true)];
        let d = diff(&approved, &proposed);
        assert_eq!(d.modified.len(), 1);
        assert!(!d.modified[0].old.completed);
        assert!(d.modified[0].new.completed);
        assert!(!d.is_scope_change());
    }

    #[test]
    fn matching_ignores_case_and_spacing() {
        let approved = vec![t("Create  Model", false)];
        let proposed = vec![t("create model ", false)];
        let d = diff(&approved, &proposed);
        assert_eq!(d.unchanged.len(), 1);
    }

    #[test]
    fn rewording_counts_as_remove_plus_add() {
        let approved = vec![t("Create model", false)];
        let proposed = vec![t("Create the model", false)];
        let d = diff(&approved, &proposed);
        assert_eq!(d.added.len(), 1);
        assert_eq!(d.removed.len(), 1);
    }

    #[test]
    fn duplicates_match_by_occurrence() {
        let approved = vec![t("Add tests", false), t("Add tests", false)];
        let proposed = vec![t("Add tests", true)];
        let d = diff(&approved, &proposed);
        assert_eq!(d.modified.len(), 1);
        assert_eq!(d.removed.len(), 1);
        assert!(d.added.is_empty());
    }

    fn key_counts<'t>(tasks: impl IntoIterator<Item = &'t Task>) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for task in tasks {
            *counts.entry(task.key()).or_insert(0) += 1;
        }
        counts
    }

    fn partition_cases() -> Vec<(Vec<Task>, Vec<Task>)> {
        vec![
            (vec![], vec![]),
            (vec![t("a", false)], vec![]),
            (vec![], vec![t("a", true)]),
            (
                vec![t("a", false), t("b", false), t("c", true), t("d", false)],
                vec![t("a", false), t("b", true), t("e", false)],
            ),
            (
                vec![t("x", false), t("x", true), t("x", false)],
                vec![t("X", true)],
            ),
            (
                vec![t("x", false)],
                vec![t("x", false), t(" x ", true), t("y", false)],
            ),
            (
                vec![t("dup", false), t("dup", false), t("z", true)],
                vec![t("z", true), t("dup", true), t("dup", false), t("dup", false)],
            ),
        ]
    }

    #[test]
    fn buckets_partition_both_sides_by_key() {
        for (approved, proposed) in partition_cases() {
            let d = diff(&approved, &proposed);
            let in_approved = key_counts(&approved);
            let in_proposed = key_counts(&proposed);
            let removed = key_counts(&d.removed);
            let added = key_counts(&d.added);
            let paired_old = key_counts(d.modified.iter().chain(&d.unchanged).map(|p| &p.old));
            let paired_new = key_counts(d.modified.iter().chain(&d.unchanged).map(|p| &p.new));

            let keys: BTreeSet<&String> = in_approved.keys().chain(in_proposed.keys()).collect();
            for bucket in [&removed, &added, &paired_old, &paired_new] {
                assert!(bucket.keys().all(|k| keys.contains(&k)), "{approved:?} -> {proposed:?}");
            }
            let count = |m: &BTreeMap<String, usize>, key: &String| m.get(key).copied().unwrap_or(0);
            for &key in &keys {
                let (a, b) = (count(&in_approved, key), count(&in_proposed, key));
                assert_eq!(count(&paired_old, key), a.min(b), "paired '{key}'");
                assert_eq!(count(&paired_new, key), a.min(b), "paired '{key}'");
                assert_eq!(count(&removed, key), a.saturating_sub(b), "removed '{key}'");
                assert_eq!(count(&added, key), b.saturating_sub(a), "added '{key}'");
            }

            for pair in &d.modified {
                assert_eq!(pair.old.key(), pair.new.key());
                assert_ne!(pair.old.completed, pair.new.completed);
            }
            for pair in &d.unchanged {
                assert_eq!(pair.old.key(), pair.new.key());
                assert_eq!(pair.old.completed, pair.new.completed);
            }
        }
    }

    #[test]
    fn self_diff_is_unchanged_element_wise() {
        for (plan, _) in partition_cases() {
            let d = diff(&plan, &plan);
            assert!(d.added.is_empty() && d.removed.is_empty() && d.modified.is_empty());
            let olds: Vec<&Task> = d.unchanged.iter().map(|p| &p.old).collect();
            let news: Vec<&Task> = d.unchanged.iter().map(|p| &p.new).collect();
            assert_eq!(olds, plan.iter().collect::<Vec<_>>());
            assert_eq!(news, plan.iter().collect::<Vec<_>>());
        }
    }

    #[test]
    fn apply_completion_only_touches_flags() {
        let approved = vec![t("Create model", false), t("Add tests", false)];
        let proposed = vec![t("create model", true), t("Add tests", false)];
        let synced = apply_completion(&approved, &proposed);
        assert_eq!(synced.len(), 2);
        assert_eq!(synced[0].content, "Create model");
        assert!(synced[0].completed);
        assert!(!synced[1].completed);
    }

    #[test]
    fn violation_message_lists_changes_and_next_steps() {
        let approved = vec![t("Create model", false)];
        let proposed = vec![t("Create model", false), t("Add admin UI", false)];
        let msg = format_violation("user-auth", &diff(&approved, &proposed));
        assert!(msg.contains("user-auth"));
        assert!(msg.contains("+ Add admin UI"));
        assert!(msg.contains("Next steps"));
    }
}
