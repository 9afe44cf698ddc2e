//! Organization Directory
//!
//! Read-only lookup lists supplied by the caller for each request:
//! cost centers (people), cards and categories.

use serde::{Deserialize, Serialize};

/// A record that entity resolution can match against
pub trait DirectoryEntry {
    fn entry_id(&self) -> &str;
    fn entry_name(&self) -> &str;
}

/// Person or group that owns expenses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCenter {
    pub id: String,
    pub name: String,
}

/// Payment card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Which transactions a category applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryScope {
    Expense,
    Income,
    #[default]
    Any,
}

/// Expense category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub scope: CategoryScope,
}

impl Category {
    pub fn applies_to_expenses(&self) -> bool {
        self.scope != CategoryScope::Income
    }
}

macro_rules! directory_entry {
    ($ty:ty) => {
        impl DirectoryEntry for $ty {
            fn entry_id(&self) -> &str {
                &self.id
            }

            fn entry_name(&self) -> &str {
                &self.name
            }
        }
    };
}

directory_entry!(CostCenter);
directory_entry!(Card);
directory_entry!(Category);
directory_entry!(DirectoryMatch);

/// Organization-scoped lookup lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgDirectory {
    #[serde(default)]
    pub cost_centers: Vec<CostCenter>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Cost center of the person sending the messages
    #[serde(default)]
    pub requester_cost_center_id: Option<String>,
}

impl OrgDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cost_center(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.cost_centers.push(CostCenter {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    pub fn with_card(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.cards.push(Card {
            id: id.into(),
            name: name.into(),
            is_active: true,
        });
        self
    }

    pub fn with_category(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.categories.push(Category {
            id: id.into(),
            name: name.into(),
            scope: CategoryScope::Any,
        });
        self
    }

    pub fn with_requester(mut self, cost_center_id: impl Into<String>) -> Self {
        self.requester_cost_center_id = Some(cost_center_id.into());
        self
    }

    pub fn active_cards(&self) -> Vec<&Card> {
        self.cards.iter().filter(|c| c.is_active).collect()
    }

    pub fn expense_categories(&self) -> Vec<&Category> {
        self.categories
            .iter()
            .filter(|c| c.applies_to_expenses())
            .collect()
    }

    pub fn cost_center(&self, id: &str) -> Option<&CostCenter> {
        self.cost_centers.iter().find(|c| c.id == id)
    }

    pub fn requester(&self) -> Option<&CostCenter> {
        self.requester_cost_center_id
            .as_deref()
            .and_then(|id| self.cost_center(id))
    }
}

/// A directory record selected by resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryMatch {
    pub id: String,
    pub name: String,
}

impl DirectoryMatch {
    pub fn from_entry<E: DirectoryEntry + ?Sized>(entry: &E) -> Self {
        Self {
            id: entry.entry_id().to_string(),
            name: entry.entry_name().to_string(),
        }
    }
}

/// Outcome of matching a free-text mention against a directory list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionResult {
    Resolved(DirectoryMatch),
    Ambiguous { candidates: Vec<DirectoryMatch> },
    NotFound,
}

impl ResolutionResult {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionResult::Resolved(_))
    }

    pub fn resolved(&self) -> Option<&DirectoryMatch> {
        match self {
            ResolutionResult::Resolved(m) => Some(m),
            _ => None,
        }
    }

    /// Candidate names, verbatim, for a disambiguation question
    pub fn candidate_names(&self) -> Vec<String> {
        match self {
            ResolutionResult::Ambiguous { candidates } => {
                candidates.iter().map(|c| c.name.clone()).collect()
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_deserializes_with_defaults() {
        let json = r#"{
            "cost_centers": [{"id": "cc1", "name": "Ana"}],
            "cards": [{"id": "k1", "name": "Nubank"}],
            "categories": [{"id": "c1", "name": "Outros"}, {"id": "c2", "name": "Salário", "scope": "income"}]
        }"#;
        let directory: OrgDirectory = serde_json::from_str(json).unwrap();

        assert!(directory.cards[0].is_active);
        assert_eq!(directory.categories[0].scope, CategoryScope::Any);
        assert_eq!(directory.expense_categories().len(), 1);
        assert!(directory.requester().is_none());
    }

    #[test]
    fn test_requester_lookup() {
        let directory = OrgDirectory::new()
            .with_cost_center("cc1", "Ana")
            .with_cost_center("cc2", "Bruno")
            .with_requester("cc2");
        assert_eq!(directory.requester().map(|c| c.name.as_str()), Some("Bruno"));
    }

    #[test]
    fn test_inactive_cards_are_hidden() {
        let mut directory = OrgDirectory::new().with_card("k1", "Nubank").with_card("k2", "Inter");
        directory.cards[1].is_active = false;
        let active: Vec<_> = directory.active_cards().iter().map(|c| c.name.clone()).collect();
        assert_eq!(active, vec!["Nubank".to_string()]);
    }
}
