use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::{debug, warn};

/// Images attached to a form, kept parallel to the picker entries they came
/// from, plus the indexes the user marked for deletion.
#[derive(Debug, Clone)]
pub struct PhotoSelection<T> {
    pub images: Vec<T>,
    pub picker_items: Vec<PathBuf>,
    pub selected_indexes: BTreeSet<usize>,
}

impl<T> Default for PhotoSelection<T> {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            picker_items: Vec::new(),
            selected_indexes: BTreeSet::new(),
        }
    }
}

impl<T> PhotoSelection<T> {
    pub fn push(&mut self, source: PathBuf, image: T) {
        self.picker_items.push(source);
        self.images.push(image);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn toggle(&mut self, index: usize) {
        if !self.selected_indexes.remove(&index) {
            self.selected_indexes.insert(index);
        }
    }

    /// Removes every selected position from both lists and clears the
    /// selection. Returns the removed images in ascending index order.
    pub fn delete_selected(&mut self) -> Vec<T> {
        let mut removed = Vec::new();
        // Highest index first so earlier removals don't shift later ones.
        for &index in self.selected_indexes.iter().rev() {
            if index >= self.images.len() {
                warn!("Photo index {} out of range ({} photos)", index, self.images.len());
                continue;
            }
            removed.push(self.images.remove(index));
            debug!("Removed photo {}", index);
        }

        let selected = std::mem::take(&mut self.selected_indexes);
        self.picker_items = std::mem::take(&mut self.picker_items)
            .into_iter()
            .enumerate()
            .filter_map(|(i, item)| (!selected.contains(&i)).then_some(item))
            .collect();

        removed.reverse();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(names: &[&'static str]) -> PhotoSelection<&'static str> {
        let mut s = PhotoSelection::default();
        for name in names {
            s.push(PathBuf::from(format!("/picked/{name}.jpg")), *name);
        }
        s
    }

    #[test]
    fn test_delete_first_and_last_keeps_middle() {
        let mut s = selection(&["a", "b", "c"]);
        s.toggle(0);
        s.toggle(2);

        let removed = s.delete_selected();
        assert_eq!(removed, vec!["a", "c"]);
        assert_eq!(s.images, vec!["b"]);
        assert_eq!(s.picker_items, vec![PathBuf::from("/picked/b.jpg")]);
        assert!(s.selected_indexes.is_empty());
    }

    #[test]
    fn test_out_of_range_indexes_are_skipped() {
        let mut s = selection(&["a", "b"]);
        s.selected_indexes.extend([1, 5]);
        let removed = s.delete_selected();
        assert_eq!(removed, vec!["b"]);
        assert_eq!(s.images, vec!["a"]);
        assert_eq!(s.picker_items.len(), 1);
    }

    #[test]
    fn test_toggle_unselects() {
        let mut s = selection(&["a"]);
        s.toggle(0);
        s.toggle(0);
        assert!(s.delete_selected().is_empty());
        assert_eq!(s.len(), 1);
    }
}
