use anyhow::Result;
use crossbeam::channel::Receiver;
use tracing::{info, warn};

use crate::database::StoreRepository;
use crate::filter::StoreFilter;
use crate::model::{Store, VisitationStatus};
use crate::photos::PhotoStore;
use crate::state::{Reducer, StateStore};

/// The store list screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomeState {
    pub status: VisitationStatus,
    pub selected_tags: Vec<String>,
    pub name_query: String,
    /// Result of the last listing query for `status`, visit date descending.
    pub stores: Vec<Store>,
    /// Store awaiting delete confirmation.
    pub pending_delete: Option<i64>,
}

#[derive(Debug, Clone)]
pub enum HomeAction {
    SelectStatus(VisitationStatus),
    SetTags(Vec<String>),
    ToggleTag(String),
    SetNameQuery(String),
    StoresLoaded(Vec<Store>),
    RequestDelete(i64),
    CancelDelete,
    StoreDeleted(i64),
}

impl HomeState {
    pub fn filter(&self) -> StoreFilter {
        StoreFilter::new(self.selected_tags.clone(), self.name_query.clone())
    }

    pub fn visible_stores(&self) -> Vec<&Store> {
        self.filter().apply(&self.stores)
    }
}

impl Reducer for HomeState {
    type Action = HomeAction;

    fn reduce(&mut self, action: HomeAction) -> bool {
        match action {
            HomeAction::SelectStatus(status) => {
                if self.status == status {
                    return false;
                }
                self.status = status;
                self.stores.clear();
            }
            HomeAction::SetTags(tags) => {
                if self.selected_tags == tags {
                    return false;
                }
                self.selected_tags = tags;
            }
            HomeAction::ToggleTag(tag) => {
                if let Some(pos) = self.selected_tags.iter().position(|t| *t == tag) {
                    self.selected_tags.remove(pos);
                } else {
                    self.selected_tags.push(tag);
                }
            }
            HomeAction::SetNameQuery(query) => {
                if self.name_query == query {
                    return false;
                }
                self.name_query = query;
            }
            HomeAction::StoresLoaded(stores) => self.stores = stores,
            HomeAction::RequestDelete(id) => self.pending_delete = Some(id),
            HomeAction::CancelDelete => return self.pending_delete.take().is_some(),
            HomeAction::StoreDeleted(id) => {
                self.pending_delete = None;
                self.stores.retain(|s| s.id != Some(id));
            }
        }
        true
    }
}

/// Binds the home state to the repository: status changes re-run the listing
/// query, confirmed deletes hit the database and the photo directory.
pub struct HomeController<'a> {
    repo: &'a StoreRepository,
    photos: &'a PhotoStore,
    store: StateStore<HomeState>,
}

impl<'a> HomeController<'a> {
    pub fn new(repo: &'a StoreRepository, photos: &'a PhotoStore) -> Result<Self> {
        let mut controller = Self {
            repo,
            photos,
            store: StateStore::new(HomeState::default()),
        };
        controller.reload()?;
        Ok(controller)
    }

    pub fn state(&self) -> &HomeState {
        self.store.state()
    }

    pub fn subscribe(&mut self) -> Receiver<u64> {
        self.store.subscribe()
    }

    pub fn reload(&mut self) -> Result<()> {
        let stores = self.repo.fetch_stores(self.state().status)?;
        self.store.dispatch(HomeAction::StoresLoaded(stores));
        Ok(())
    }

    pub fn select_status(&mut self, status: VisitationStatus) -> Result<()> {
        if self.store.dispatch(HomeAction::SelectStatus(status)) {
            self.reload()?;
        }
        Ok(())
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.store.dispatch(HomeAction::SetTags(tags));
    }

    pub fn toggle_tag(&mut self, tag: impl Into<String>) {
        self.store.dispatch(HomeAction::ToggleTag(tag.into()));
    }

    pub fn set_name_query(&mut self, query: impl Into<String>) {
        self.store.dispatch(HomeAction::SetNameQuery(query.into()));
    }

    pub fn visible_stores(&self) -> Vec<&Store> {
        self.state().visible_stores()
    }

    pub fn request_delete(&mut self, id: i64) {
        self.store.dispatch(HomeAction::RequestDelete(id));
    }

    pub fn cancel_delete(&mut self) {
        self.store.dispatch(HomeAction::CancelDelete);
    }

    /// Deletes the store awaiting confirmation, along with its photo files.
    pub fn confirm_delete(&mut self) -> Result<Option<Store>> {
        let Some(id) = self.state().pending_delete else {
            warn!("Delete confirmed with nothing pending");
            return Ok(None);
        };
        let removed = self.repo.delete_store(id)?;
        if let Some(store) = &removed {
            let files = self.photos.remove(&store.file_names);
            info!("Removed {} photo file(s) of '{}'", files, store.name);
        }
        self.store.dispatch(HomeAction::StoreDeleted(id));
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use image::{DynamicImage, RgbImage};

    fn seed(repo: &StoreRepository, name: &str, status: VisitationStatus, tags: &[&str], day: u32) -> Result<i64> {
        let mut s = Store::new(name);
        s.visitation_status = status;
        s.visit_date = NaiveDate::from_ymd_opt(2024, 5, day);
        s.selected_tags = tags.iter().map(|t| t.to_string()).collect();
        repo.insert_store(&s)
    }

    fn names(stores: Vec<&Store>) -> Vec<String> {
        stores.into_iter().map(|s| s.name.clone()).collect()
    }

    #[test]
    fn test_status_switch_requeries() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let photos = PhotoStore::new(tmp.path())?;
        let repo = StoreRepository::open_in_memory()?;
        seed(&repo, "Sushi A", VisitationStatus::Visited, &["lunch", "cheap"], 1)?;
        seed(&repo, "Ramen B", VisitationStatus::Visited, &["lunch"], 2)?;
        seed(&repo, "Bistro C", VisitationStatus::Interested, &["lunch"], 3)?;

        let mut home = HomeController::new(&repo, &photos)?;
        let changes = home.subscribe();
        assert_eq!(names(home.visible_stores()), vec!["Ramen B", "Sushi A"]);

        home.select_status(VisitationStatus::Interested)?;
        assert_eq!(names(home.visible_stores()), vec!["Bistro C"]);
        assert!(home
            .state()
            .stores
            .iter()
            .all(|s| s.visitation_status == VisitationStatus::Interested));
        assert_eq!(changes.try_iter().count(), 2);
        Ok(())
    }

    #[test]
    fn test_filters_apply_on_top_of_listing() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let photos = PhotoStore::new(tmp.path())?;
        let repo = StoreRepository::open_in_memory()?;
        seed(&repo, "Sushi A", VisitationStatus::Visited, &["lunch", "cheap"], 1)?;
        seed(&repo, "Ramen B", VisitationStatus::Visited, &["lunch"], 2)?;

        let mut home = HomeController::new(&repo, &photos)?;
        home.toggle_tag("lunch");
        assert_eq!(home.visible_stores().len(), 2);
        home.toggle_tag("cheap");
        assert_eq!(names(home.visible_stores()), vec!["Sushi A"]);
        home.toggle_tag("cheap");
        home.set_name_query("RAMEN");
        assert_eq!(names(home.visible_stores()), vec!["Ramen B"]);
        Ok(())
    }

    #[test]
    fn test_delete_needs_confirmation_and_removes_photos() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let photos = PhotoStore::new(tmp.path())?;
        let repo = StoreRepository::open_in_memory()?;

        let mut s = Store::new("Sushi A");
        let file = photos.save(&DynamicImage::ImageRgb8(RgbImage::new(1, 1)))?;
        s.file_names = vec![file.clone()];
        let id = repo.insert_store(&s)?;

        let mut home = HomeController::new(&repo, &photos)?;
        home.request_delete(id);
        home.cancel_delete();
        assert!(home.confirm_delete()?.is_none());
        assert!(repo.fetch_store(id)?.is_some());

        home.request_delete(id);
        let removed = home.confirm_delete()?.unwrap();
        assert_eq!(removed.name, "Sushi A");
        assert!(repo.fetch_store(id)?.is_none());
        assert!(home.state().stores.is_empty());
        assert!(!photos.path_for(&file).exists());
        Ok(())
    }
}
