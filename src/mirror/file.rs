use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{Mirror, MirrorDocument};
use crate::config::Config;
use crate::error::Result;
use crate::snapshot::TicketSnapshot;
use crate::storage::Storage;

/// Mirror persisted as one JSON document.
///
/// Each mutation locks the file, reads it, applies the change and writes
/// it back atomically, so separate processes can share one mirror.
#[derive(Debug, Clone)]
pub struct FileMirror {
    storage: Storage,
    id_property: String,
}

impl FileMirror {
    pub fn open(path: impl Into<PathBuf>, id_property: impl Into<String>) -> Self {
        Self {
            storage: Storage::new(path),
            id_property: id_property.into(),
        }
    }

    /// Mirror named by `config`, relative paths resolved against `base`.
    pub fn from_config(config: &Config, base: &Path) -> Self {
        Self::open(config.mirror_path(base), config.mirror.id_property.clone())
    }

    pub fn path(&self) -> &Path {
        self.storage.path()
    }

    pub fn document(&self) -> Result<MirrorDocument> {
        self.storage.read()
    }

    /// Replace the persisted name table.
    pub fn replace_names(&self, names: &HashMap<String, String>) -> Result<()> {
        self.storage.update(|document: &mut MirrorDocument| {
            document.names = names
                .iter()
                .map(|(id, name)| (id.clone(), name.clone()))
                .collect();
            Ok(())
        })
    }

    pub fn load_names(&self) -> Result<HashMap<String, String>> {
        Ok(self.document()?.names.into_iter().collect())
    }

    fn update<R>(&self, mutate: impl FnOnce(&mut MirrorDocument) -> Result<R>) -> Result<R> {
        self.storage.update(mutate)
    }
}

impl Mirror for FileMirror {
    fn get_property(&self, location: &str, name: &str) -> Result<Option<String>> {
        Ok(self.document()?.get_property(location, name))
    }

    fn set_property(&self, location: &str, name: &str, value: &str) -> Result<()> {
        self.update(|document| document.set_property(location, name, value))
    }

    fn get_multi(&self, location: &str, name: &str) -> Result<Vec<String>> {
        Ok(self.document()?.get_multi(location, name))
    }

    fn add_to_multi(&self, location: &str, name: &str, value: &str) -> Result<()> {
        self.update(|document| document.add_to_multi(location, name, value))
    }

    fn remove_from_multi(&self, location: &str, name: &str, value: &str) -> Result<()> {
        self.update(|document| document.remove_from_multi(location, name, value))
    }

    fn find_location_by_external_id(&self, id: &str) -> Result<Option<String>> {
        Ok(self.document()?.find_location(&self.id_property, id))
    }

    fn store_snapshot(&self, snapshot: &TicketSnapshot) -> Result<String> {
        self.update(|document| Ok(document.store_snapshot(&self.id_property, snapshot)))
    }
}
