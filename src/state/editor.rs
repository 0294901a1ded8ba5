use anyhow::{Context, Result};
use image::DynamicImage;
use tracing::{info, warn};

use crate::database::StoreRepository;
use crate::model::{Store, StoreDetail};
use crate::photos::{PhotoSelection, PhotoStore};
use crate::places::{resolve_address, AutocompleteSession, Geocoder, MapState, PlacesProvider, Suggestion};

/// A photo shown in the form: either already on disk or freshly picked.
#[derive(Debug, Clone)]
pub enum EditorPhoto {
    Stored { file_name: String, image: DynamicImage },
    Pending(DynamicImage),
}

/// Registration and edit screens.
pub struct EditorState {
    /// Row being edited; a default row when registering.
    pub store: Store,
    pub detail: StoreDetail,
    pub photos: PhotoSelection<EditorPhoto>,
    pub map: MapState,
    pub search: AutocompleteSession,
    pub confirm_photo_delete: bool,
    removed_files: Vec<String>,
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            store: Store::default(),
            detail: StoreDetail::default(),
            photos: PhotoSelection::default(),
            map: MapState::default(),
            search: AutocompleteSession::default(),
            confirm_photo_delete: false,
            removed_files: Vec::new(),
        }
    }
}

impl EditorState {
    pub fn register() -> Self {
        Self::default()
    }

    /// Opens an existing store, resolving its photo files.
    pub fn edit(store: Store, photo_store: &PhotoStore) -> Self {
        let mut editor = Self {
            detail: StoreDetail::for_edit(&store),
            ..Self::default()
        };
        for loaded in photo_store.load(&store.file_names) {
            let source = photo_store.path_for(&loaded.file_name);
            editor.photos.push(
                source,
                EditorPhoto::Stored {
                    file_name: loaded.file_name,
                    image: loaded.image,
                },
            );
        }
        editor.store = store;
        editor
    }

    pub fn attach(&mut self, picked: PhotoSelection<DynamicImage>) {
        for (source, image) in picked.picker_items.into_iter().zip(picked.images) {
            self.photos.push(source, EditorPhoto::Pending(image));
        }
    }

    /// Asks for confirmation when photos are marked; returns whether it did.
    pub fn request_photo_delete(&mut self) -> bool {
        self.confirm_photo_delete = !self.photos.selected_indexes.is_empty();
        self.confirm_photo_delete
    }

    pub fn cancel_photo_delete(&mut self) {
        self.confirm_photo_delete = false;
        self.photos.selected_indexes.clear();
    }

    pub fn confirm_photo_delete(&mut self) -> usize {
        if !self.confirm_photo_delete {
            return 0;
        }
        self.confirm_photo_delete = false;
        let removed = self.photos.delete_selected();
        for photo in &removed {
            if let EditorPhoto::Stored { file_name, .. } = photo {
                self.removed_files.push(file_name.clone());
            }
        }
        removed.len()
    }

    /// Centers the map on the form's address. Failures keep the old pin.
    pub fn locate(&mut self, geocoder: &dyn Geocoder) -> bool {
        let address = self.detail.address.clone();
        resolve_address(geocoder, &address, &mut self.map)
    }

    pub fn search_places(&mut self, provider: &dyn PlacesProvider, query: &str) -> &[Suggestion] {
        self.search.search(provider, query)
    }

    /// Prefills the form from a picked suggestion, then re-centers the map.
    pub fn pick_place(
        &mut self,
        provider: &dyn PlacesProvider,
        geocoder: &dyn Geocoder,
        suggestion: &Suggestion,
    ) -> bool {
        match self.search.select(provider, suggestion) {
            Ok(details) => {
                details.apply_to(&mut self.detail);
                self.locate(geocoder);
                true
            }
            Err(e) => {
                warn!("Place details failed for '{}': {}", suggestion.full_text, e);
                false
            }
        }
    }

    /// Writes the form back. New photos are saved and appended; photos removed
    /// in the form are dropped from the row and their files deleted.
    pub fn submit(&mut self, repo: &StoreRepository, photo_store: &PhotoStore) -> Result<i64> {
        let name = self.detail.store_name.trim();
        if name.is_empty() {
            anyhow::bail!("Store name must not be empty");
        }

        // Registering under a taken name extends that row, photos included.
        let mut store = match self.store.id {
            Some(_) => self.store.clone(),
            None => repo
                .fetch_by_name(name)?
                .unwrap_or_else(|| self.store.clone()),
        };
        store.apply_detail(&self.detail);
        store.name = name.to_string();
        store.file_names.retain(|f| !self.removed_files.contains(f));

        let pending: Vec<DynamicImage> = self
            .photos
            .images
            .iter()
            .filter_map(|p| match p {
                EditorPhoto::Pending(image) => Some(image.clone()),
                EditorPhoto::Stored { .. } => None,
            })
            .collect();
        let added = photo_store.save_pending(&mut store, &pending);

        let saved = match store.id {
            Some(id) => repo.update_store(&store).map(|_| id),
            None => repo.upsert_by_name(&store),
        };
        let id = match saved {
            Ok(id) => id,
            Err(e) => {
                // The row never references them, so don't leave the files behind.
                photo_store.remove(&added);
                return Err(e).context("Failed to save store");
            }
        };

        if !self.removed_files.is_empty() {
            photo_store.remove(&self.removed_files);
            self.removed_files.clear();
        }

        store.id = Some(id);
        info!("Saved store '{}' ({}, {} photos)", store.name, id, store.file_names.len());
        *self = Self::edit(store, photo_store);
        Ok(id)
    }
}
