//! Drag-and-drop reordering.
//!
//! A move is computed against a source list: the dragged task is removed
//! from its position and reinserted at the drop target's index, then each
//! persisted task's `order` becomes its new index. The result carries the
//! point writes needed to bring the remote `order` fields in line; tasks
//! without a remote id are renumbered locally but never written.

use crate::models::{Task, TaskKey};

/// One remote write setting a task's `order`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderWrite {
    pub remote_id: String,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReorderPlan {
    /// The source list in its new order
    pub tasks: Vec<Task>,
    /// Writes for persisted tasks whose order changed
    pub writes: Vec<OrderWrite>,
}

/// Move the element at `from` so that it ends up at index `to`
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from == to || from >= items.len() || to >= items.len() {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

/// Compute the result of dropping `dragged` onto `target` within `list`.
///
/// Returns `None` when the move is a no-op: either key is missing from the
/// list, or the task is dropped onto itself.
pub fn plan_reorder(list: &[Task], dragged: &TaskKey, target: &TaskKey) -> Option<ReorderPlan> {
    if dragged == target {
        return None;
    }
    let from = list.iter().position(|t| &t.key() == dragged)?;
    let to = list.iter().position(|t| &t.key() == target)?;

    let mut tasks = list.to_vec();
    move_item(&mut tasks, from, to);

    let mut writes = Vec::new();
    for (index, task) in tasks.iter_mut().enumerate() {
        let Some(remote_id) = task.remote_id.clone() else {
            continue;
        };
        let order = index as i64;
        if task.order != order {
            task.order = order;
            writes.push(OrderWrite { remote_id, order });
        }
    }

    Some(ReorderPlan { tasks, writes })
}
