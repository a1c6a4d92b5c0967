#![forbid(unsafe_code)]

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use uuid::Uuid;

use crate::pois::{name_key, PoiCandidate, PointOfInterest};
use crate::utils::errors::PlannerError;

// ***************************************************************************
//                                PoiStore
// ***************************************************************************
/** The POI collection kept in a single JSON file.
 *
 * Every mutation loads the whole file, changes the collection in memory and
 * rewrites the whole file.  Nothing serializes concurrent writers, so two
 * overlapping creates or deletes can lose one of the writes.
 */
#[derive(Debug, Clone)]
pub struct PoiStore {
    path: PathBuf,
}

impl PoiStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {path: path.into()}
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ---------------------------------------------------------------------------
    // load:
    // ---------------------------------------------------------------------------
    /** Read the whole collection.  A file that does not exist yet is an empty
     * collection.  Records are not range checked here, so a hand-edited file
     * with out-of-range coordinates still loads.
     */
    pub fn load(&self) -> Result<Vec<PointOfInterest>, PlannerError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("POI file {} does not exist yet.", self.path.display());
                return Ok(vec!());
            }
            Err(e) => return Err(self.storage_error(e.to_string())),
        };

        serde_json::from_str(&contents).map_err(|e| self.storage_error(e.to_string()))
    }

    // ---------------------------------------------------------------------------
    // save:
    // ---------------------------------------------------------------------------
    /** Replace the file contents with the given collection. */
    pub fn save(&self, pois: &[PointOfInterest]) -> Result<(), PlannerError> {
        let json = serde_json::to_string_pretty(pois).map_err(|e| self.storage_error(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| self.storage_error(e.to_string()))
    }

    // ---------------------------------------------------------------------------
    // list:
    // ---------------------------------------------------------------------------
    pub fn list(&self) -> Result<Vec<PointOfInterest>, PlannerError> {
        self.load()
    }

    // ---------------------------------------------------------------------------
    // create:
    // ---------------------------------------------------------------------------
    /** Append a validated candidate under a fresh id.  Fails if another POI
     * has the same trimmed, case-folded name.
     */
    pub fn create(&self, candidate: PoiCandidate) -> Result<PointOfInterest, PlannerError> {
        let mut pois = self.load()?;

        let key = name_key(candidate.name());
        if pois.iter().any(|p| name_key(&p.name) == key) {
            return Err(PlannerError::DuplicateName(candidate.name().trim().to_string()));
        }

        let poi = PointOfInterest {
            id: Uuid::new_v4().simple().to_string(),
            name: candidate.name().trim().to_string(),
            lat: candidate.lat(),
            lon: candidate.lon(),
            tags: candidate.tags().to_vec(),
        };
        pois.push(poi.clone());
        self.save(&pois)?;

        info!("POI '{}' created with id {} ({} total).", poi.name, poi.id, pois.len());
        Ok(poi)
    }

    // ---------------------------------------------------------------------------
    // delete:
    // ---------------------------------------------------------------------------
    /** Remove the POI whose id matches exactly.  The file is left untouched
     * when nothing matches.
     */
    pub fn delete(&self, id: &str) -> Result<(), PlannerError> {
        let mut pois = self.load()?;
        let before = pois.len();
        pois.retain(|p| p.id != id);
        if pois.len() == before {
            return Err(PlannerError::NotFound(id.to_string()));
        }

        self.save(&pois)?;
        info!("POI {} deleted ({} remaining).", id, pois.len());
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // blocking:
    // ---------------------------------------------------------------------------
    /** Run a store operation on tokio's blocking pool.  The store's file I/O
     * is synchronous and must not occupy an async worker thread.
     */
    pub async fn blocking<T, F>(self: &Arc<Self>, op: F) -> Result<T, PlannerError>
    where
        T: Send + 'static,
        F: FnOnce(&PoiStore) -> Result<T, PlannerError> + Send + 'static,
    {
        let store = Arc::clone(self);
        match tokio::task::spawn_blocking(move || op(&store)).await {
            Ok(result) => result,
            Err(e) => Err(self.storage_error(format!("store task failed: {}", e))),
        }
    }

    fn storage_error(&self, message: String) -> PlannerError {
        PlannerError::Storage {path: self.path.display().to_string(), message}
    }
}
