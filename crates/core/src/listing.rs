//! Helpers for the in-memory lists backing the listing views.

use crate::models::{CustomerSummary, Operator};

/// Records that carry a server id and a display label.
pub trait Identified {
    /// Server id, absent for records never saved.
    fn id(&self) -> Option<i64>;
    /// Name shown in confirmations and notifications.
    fn label(&self) -> String;
}

impl Identified for CustomerSummary {
    fn id(&self) -> Option<i64> {
        Some(self.id)
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Identified for Operator {
    fn id(&self) -> Option<i64> {
        Some(self.id)
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

/// Drop every record with `id`. Returns whether anything was removed;
/// removing an id that is already gone leaves the list untouched.
pub fn remove_by_id<T: Identified>(list: &mut Vec<T>, id: i64) -> bool {
    let before = list.len();
    list.retain(|record| record.id() != Some(id));
    list.len() != before
}

/// Proof that the operator confirmed a deletion.
///
/// Controllers only delete through a confirmation, so the DELETE can never
/// be issued without passing through the confirmation step first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    id: i64,
    label: String,
}

impl DeleteConfirmation {
    /// Ask to delete `record`; `None` when it was never saved.
    pub fn request<T: Identified>(record: &T) -> Option<Self> {
        record.id().map(|id| Self {
            id,
            label: record.label(),
        })
    }

    /// Id of the record to delete.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Label of the record to delete.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Question shown in the confirmation dialog.
    pub fn prompt(&self) -> String {
        format!("Delete \"{}\"? This cannot be undone.", self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operators() -> Vec<Operator> {
        [(1, "Ana"), (2, "Bia"), (3, "Caio")]
            .into_iter()
            .map(|(id, name)| Operator {
                id,
                name: name.to_string(),
                email: format!("{}@yard.com", name.to_lowercase()),
                is_admin: false,
            })
            .collect()
    }

    #[test]
    fn removal_by_id_is_idempotent() {
        let mut list = operators();
        assert!(remove_by_id(&mut list, 2));
        let after_first = list.clone();
        assert!(!remove_by_id(&mut list, 2));
        assert_eq!(list, after_first);
        assert_eq!(
            list.iter().map(|op| op.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[test]
    fn confirmation_captures_id_and_label() {
        let list = operators();
        let confirmation = DeleteConfirmation::request(&list[2]).expect("saved record");
        assert_eq!(confirmation.id(), 3);
        assert_eq!(confirmation.label(), "Caio");
        assert!(confirmation.prompt().contains("\"Caio\""));
    }
}
