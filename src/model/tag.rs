use serde::{Deserialize, Serialize};

use crate::model::list_field::decode_list;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// A selectable tag in the tag picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagButton {
    pub name: String,
    pub is_selected: bool,
}

/// Builds the picker entries from stored tag rows.
///
/// Older rows may hold several comma-joined names; they are split, empty names
/// dropped and duplicates collapsed to their first occurrence.
pub fn tag_buttons(tags: &[Tag]) -> Vec<TagButton> {
    let mut buttons: Vec<TagButton> = Vec::new();
    for tag in tags {
        for name in decode_list(&tag.name) {
            if name.is_empty() || buttons.iter().any(|b| b.name == name) {
                continue;
            }
            buttons.push(TagButton {
                name,
                is_selected: false,
            });
        }
    }
    buttons
}

/// Case-insensitive name search over the picker. Empty query keeps everything.
pub fn filter_tag_buttons<'a>(buttons: &'a [TagButton], query: &str) -> Vec<&'a TagButton> {
    if query.is_empty() {
        return buttons.iter().collect();
    }
    let needle = query.to_lowercase();
    buttons
        .iter()
        .filter(|b| b.name.to_lowercase().contains(&needle))
        .collect()
}

/// Trims names, drops empty ones and collapses duplicates, keeping first
/// occurrence order.
pub fn normalize_tags<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let name = name.as_ref().trim();
        if !name.is_empty() && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}

pub fn selected_names(buttons: &[TagButton]) -> Vec<String> {
    buttons
        .iter()
        .filter(|b| b.is_selected)
        .map(|b| b.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tags_trims_and_dedups() {
        let tags = normalize_tags(&[" lunch", "cheap ", "", "  ", "lunch"]);
        assert_eq!(tags, vec!["lunch".to_string(), "cheap".to_string()]);
    }

    fn tag(id: i64, name: &str) -> Tag {
        Tag { id, name: name.to_string() }
    }

    #[test]
    fn test_buttons_split_and_dedup() {
        let tags = vec![tag(1, "lunch,cheap"), tag(2, "cheap"), tag(3, ""), tag(4, "Dinner")];
        let names: Vec<_> = tag_buttons(&tags).into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["lunch", "cheap", "Dinner"]);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let buttons = tag_buttons(&[tag(1, "Lunch"), tag(2, "dinner"), tag(3, "brunch")]);
        let hits: Vec<_> = filter_tag_buttons(&buttons, "UNCH").iter().map(|b| b.name.as_str()).collect();
        assert_eq!(hits, vec!["Lunch", "brunch"]);
        assert_eq!(filter_tag_buttons(&buttons, "").len(), 3);
    }

    #[test]
    fn test_selected_names() {
        let mut buttons = tag_buttons(&[tag(1, "a"), tag(2, "b")]);
        buttons[1].is_selected = true;
        assert_eq!(selected_names(&buttons), vec!["b".to_string()]);
    }
}
