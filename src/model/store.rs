use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::tag::normalize_tags;

pub const PLACEHOLDER_NAME: &str = "store name not set";
pub const PLACEHOLDER_MEMO: &str = "memo not set";
pub const PLACEHOLDER_HOURS: &str = "business hours not set";
pub const PLACEHOLDER_PHONE: &str = "phone number not set";
pub const PLACEHOLDER_ADDRESS: &str = "address not set";

/// Raw values match the persisted integer column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitationStatus {
    #[default]
    Visited = 0,
    Interested = 1,
    None = 2,
}

impl VisitationStatus {
    pub fn raw(self) -> i16 {
        self as i16
    }

    /// Unknown raw values fall back to `None`.
    pub fn from_raw(raw: i16) -> Self {
        match raw {
            0 => Self::Visited,
            1 => Self::Interested,
            _ => Self::None,
        }
    }
}

impl fmt::Display for VisitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Visited => "visited",
            Self::Interested => "interested",
            Self::None => "none",
        };
        f.write_str(label)
    }
}

impl FromStr for VisitationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "visited" => Ok(Self::Visited),
            "interested" => Ok(Self::Interested),
            "none" => Ok(Self::None),
            other => Err(anyhow::anyhow!("unknown visitation status '{}'", other)),
        }
    }
}

/// One restaurant entry, as persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Store {
    pub id: Option<i64>,
    pub name: String,
    pub visitation_status: VisitationStatus,
    pub visit_date: Option<NaiveDate>,
    pub selected_tags: Vec<String>,
    pub memo: Option<String>,
    pub business_hours: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub file_names: Vec<String>,
}

impl Store {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The visit date only carries meaning for visited stores.
    pub fn visited_on(&self) -> Option<NaiveDate> {
        match self.visitation_status {
            VisitationStatus::Visited => self.visit_date,
            _ => None,
        }
    }

    pub fn has_all_tags<S: AsRef<str>>(&self, wanted: &[S]) -> bool {
        wanted
            .iter()
            .all(|tag| self.selected_tags.iter().any(|own| own == tag.as_ref()))
    }

    /// Copies the editable fields of a submitted form into this row. The form
    /// always carries a date; it is only written for visited stores.
    pub fn apply_detail(&mut self, detail: &StoreDetail) {
        self.name = detail.store_name.clone();
        self.visitation_status = detail.visitation_status;
        if detail.visitation_status == VisitationStatus::Visited {
            self.visit_date = Some(detail.visit_date);
        }
        self.selected_tags = normalize_tags(&detail.selected_tags);
        self.memo = non_empty(&detail.memo);
        self.business_hours = non_empty(&detail.business_hours);
        self.phone_number = non_empty(&detail.phone_number);
        self.address = non_empty(&detail.address);
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Form data behind the registration, edit and overview screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDetail {
    pub store_name: String,
    pub visitation_status: VisitationStatus,
    pub visit_date: NaiveDate,
    pub selected_tags: Vec<String>,
    pub memo: String,
    pub business_hours: String,
    pub phone_number: String,
    pub address: String,
}

impl Default for StoreDetail {
    fn default() -> Self {
        Self {
            store_name: String::new(),
            visitation_status: VisitationStatus::Visited,
            visit_date: Local::now().date_naive(),
            selected_tags: Vec::new(),
            memo: String::new(),
            business_hours: String::new(),
            phone_number: String::new(),
            address: String::new(),
        }
    }
}

impl StoreDetail {
    /// Form contents for editing: missing fields stay empty so placeholders
    /// never get written back.
    pub fn for_edit(store: &Store) -> Self {
        Self {
            store_name: store.name.clone(),
            visitation_status: store.visitation_status,
            visit_date: store
                .visit_date
                .unwrap_or_else(|| Local::now().date_naive()),
            selected_tags: store.selected_tags.clone(),
            memo: store.memo.clone().unwrap_or_default(),
            business_hours: store.business_hours.clone().unwrap_or_default(),
            phone_number: store.phone_number.clone().unwrap_or_default(),
            address: store.address.clone().unwrap_or_default(),
        }
    }

    /// Missing fields become placeholder text rather than errors.
    pub fn from_store(store: &Store) -> Self {
        let text = |value: &Option<String>, placeholder: &str| {
            value.clone().unwrap_or_else(|| placeholder.to_string())
        };
        Self {
            store_name: if store.name.is_empty() {
                PLACEHOLDER_NAME.to_string()
            } else {
                store.name.clone()
            },
            visitation_status: store.visitation_status,
            visit_date: store
                .visit_date
                .unwrap_or_else(|| Local::now().date_naive()),
            selected_tags: store.selected_tags.clone(),
            memo: text(&store.memo, PLACEHOLDER_MEMO),
            business_hours: text(&store.business_hours, PLACEHOLDER_HOURS),
            phone_number: text(&store.phone_number, PLACEHOLDER_PHONE),
            address: text(&store.address, PLACEHOLDER_ADDRESS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_raw_values() {
        assert_eq!(VisitationStatus::Visited.raw(), 0);
        assert_eq!(VisitationStatus::from_raw(1), VisitationStatus::Interested);
        assert_eq!(VisitationStatus::from_raw(42), VisitationStatus::None);
        assert_eq!("Interested".parse::<VisitationStatus>().unwrap(), VisitationStatus::Interested);
        assert!("maybe".parse::<VisitationStatus>().is_err());
    }

    #[test]
    fn test_visit_date_only_meaningful_when_visited() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        let mut store = Store::new("Sushi A");
        store.visit_date = Some(date);
        assert_eq!(store.visited_on(), Some(date));

        store.visitation_status = VisitationStatus::Interested;
        assert_eq!(store.visited_on(), None);
        assert_eq!(store.visit_date, Some(date));
    }

    #[test]
    fn test_missing_fields_use_placeholders() {
        let store = Store::default();
        let detail = StoreDetail::from_store(&store);
        assert_eq!(detail.store_name, PLACEHOLDER_NAME);
        assert_eq!(detail.memo, PLACEHOLDER_MEMO);
        assert_eq!(detail.address, PLACEHOLDER_ADDRESS);
    }

    #[test]
    fn test_editing_undated_interested_store_keeps_it_undated() {
        let mut store = Store::new("Later");
        store.visitation_status = VisitationStatus::Interested;

        let detail = StoreDetail::for_edit(&store);
        store.apply_detail(&detail);
        assert_eq!(store.visit_date, None);

        let mut visited = detail.clone();
        visited.visitation_status = VisitationStatus::Visited;
        store.apply_detail(&visited);
        assert_eq!(store.visit_date, Some(visited.visit_date));
    }

    #[test]
    fn test_apply_detail_keeps_identity_and_photos() {
        let mut store = Store::new("Old");
        store.id = Some(7);
        store.file_names = vec!["A.png".into()];

        let detail = StoreDetail {
            store_name: "New".into(),
            selected_tags: vec!["lunch".into()],
            ..Default::default()
        };
        store.apply_detail(&detail);

        assert_eq!(store.id, Some(7));
        assert_eq!(store.name, "New");
        assert_eq!(store.selected_tags, vec!["lunch".to_string()]);
        assert_eq!(store.file_names, vec!["A.png".to_string()]);
        assert_eq!(store.memo, None);
    }
}
