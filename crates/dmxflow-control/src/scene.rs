//! Named universe snapshots
//!
//! A [`Scene`] is the full 512-slot buffer plus the fixture patch it was
//! captured under. Stores implement [`SceneStore`]; [`JsonSceneStore`]
//! keeps one `<name>.json` file per scene and also reads the older format
//! that was just a JSON array of channel values.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::dmx::{ChannelBuffer, FixtureConfig, UNIVERSE_SIZE};
use crate::{error::ControlError, Result};

const MAX_NAME_LEN: usize = 64;

/// Check a scene name is usable as a key and a file name
pub fn validate_scene_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ControlError::Validation("Scene name is empty".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ControlError::Validation(format!(
            "Scene name exceeds maximum length of {}",
            MAX_NAME_LEN
        )));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(ControlError::Validation(
            "Scene name contains control characters".to_string(),
        ));
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(ControlError::Validation(
            "Scene name contains invalid characters (/, \\, ..)".to_string(),
        ));
    }
    // Dot files are hidden from list()
    if name.starts_with('.') {
        return Err(ControlError::Validation(
            "Scene name must not start with '.'".to_string(),
        ));
    }
    Ok(())
}

/// Immutable universe snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    pub channels: Vec<u8>,
    /// Patch at capture time; `None` for legacy snapshots
    #[serde(default)]
    pub fixture: Option<FixtureConfig>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl Scene {
    /// Capture the live buffer
    pub fn capture(name: &str, buffer: &ChannelBuffer, fixture: FixtureConfig) -> Result<Self> {
        validate_scene_name(name)?;
        Ok(Self {
            name: name.to_string(),
            channels: buffer.as_slice().to_vec(),
            fixture: Some(fixture),
            saved_at: Some(Utc::now()),
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_scene_name(&self.name)?;
        if self.channels.len() > UNIVERSE_SIZE {
            return Err(ControlError::Validation(format!(
                "Scene '{}' has {} channels (max {})",
                self.name,
                self.channels.len(),
                UNIVERSE_SIZE
            )));
        }
        if let Some(fixture) = &self.fixture {
            fixture.validate()?;
        }
        Ok(())
    }

    /// Compute the buffer that loading this scene onto `live` under the
    /// `current` patch produces. Nothing is modified; an incompatible
    /// patch is an error.
    pub fn resolve(&self, live: &ChannelBuffer, current: &FixtureConfig) -> Result<ChannelBuffer> {
        self.validate()?;
        let snapshot = ChannelBuffer::from_slice(&self.channels)?;

        match &self.fixture {
            None => Ok(snapshot),
            Some(captured) if captured == current => Ok(snapshot),
            Some(captured) if current.can_remap_from(captured) => {
                let mut result = live.clone();
                result.copy_block_from(
                    &snapshot,
                    captured.addressed_range(),
                    current.addressed_range().start,
                );
                Ok(result)
            }
            Some(captured) => Err(ControlError::Configuration(format!(
                "Scene '{}' was captured for {} and cannot be loaded onto {}",
                self.name, captured, current
            ))),
        }
    }
}

/// Scene persistence
pub trait SceneStore: Send + Sync {
    /// Insert or atomically replace a scene
    fn put(&self, scene: Scene) -> Result<()>;

    /// Fetch a scene, `NotFound` if absent
    fn get(&self, name: &str) -> Result<Scene>;

    /// Names of all stored scenes, sorted
    fn list(&self) -> Result<Vec<String>>;

    /// Remove a scene, `NotFound` if absent
    fn delete(&self, name: &str) -> Result<()>;
}

fn not_found(name: &str) -> ControlError {
    ControlError::NotFound(format!("scene '{}'", name))
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemorySceneStore {
    scenes: RwLock<BTreeMap<String, Scene>>,
}

impl MemorySceneStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SceneStore for MemorySceneStore {
    fn put(&self, scene: Scene) -> Result<()> {
        scene.validate()?;
        self.scenes.write().insert(scene.name.clone(), scene);
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Scene> {
        self.scenes
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(name))
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.scenes.read().keys().cloned().collect())
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.scenes
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found(name))
    }
}

/// Store that keeps nothing
#[derive(Debug, Default)]
pub struct NullSceneStore;

impl SceneStore for NullSceneStore {
    fn put(&self, scene: Scene) -> Result<()> {
        scene.validate()
    }

    fn get(&self, name: &str) -> Result<Scene> {
        Err(not_found(name))
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn delete(&self, name: &str) -> Result<()> {
        Err(not_found(name))
    }
}

/// On-disk forms a scene file may take
#[derive(Deserialize)]
#[serde(untagged)]
enum SceneFile {
    Scene(Scene),
    /// Bare channel array
    Legacy(Vec<u8>),
}

/// Directory of `<name>.json` scene files
#[derive(Debug, Clone)]
pub struct JsonSceneStore {
    dir: PathBuf,
}

impl JsonSceneStore {
    /// Open (and create if needed) a scene directory
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        tracing::debug!("Scene store at {:?}", dir);
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_scene_name(name)?;
        Ok(self.dir.join(format!("{}.json", name)))
    }
}

impl SceneStore for JsonSceneStore {
    fn put(&self, scene: Scene) -> Result<()> {
        scene.validate()?;
        let path = self.path_for(&scene.name)?;
        let content = serde_json::to_string_pretty(&scene)?;

        // One temp file per write so concurrent saves of a name never collide
        let mut tmp = tempfile::Builder::new()
            .prefix(".scene-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        // persist renames over the old file in one step
        tmp.persist(&path).map_err(|e| ControlError::Io(e.error))?;
        tracing::debug!("Saved scene '{}' to {:?}", scene.name, path);
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Scene> {
        let path = self.path_for(name)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found(name)),
            Err(e) => return Err(e.into()),
        };

        let scene = match serde_json::from_str::<SceneFile>(&content) {
            Ok(SceneFile::Scene(scene)) => scene,
            Ok(SceneFile::Legacy(channels)) => Scene {
                name: name.to_string(),
                channels,
                fixture: None,
                saved_at: None,
            },
            Err(e) => {
                return Err(ControlError::Validation(format!(
                    "Scene file {:?} is malformed: {}",
                    path, e
                )))
            }
        };
        scene.validate()?;
        Ok(scene)
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !stem.starts_with('.') {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(name)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmx::FixtureMode;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn lit_buffer() -> ChannelBuffer {
        let mut buffer = ChannelBuffer::new();
        buffer.fill_range(0..18, 200);
        buffer
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_scene_name("intro").is_ok());
        assert!(validate_scene_name("").is_err());
        assert!(validate_scene_name("../etc/passwd").is_err());
        assert!(validate_scene_name("a/b").is_err());
        assert!(validate_scene_name("bad\nname").is_err());
        assert!(validate_scene_name(&"x".repeat(65)).is_err());
        assert!(validate_scene_name(".intro").is_err());
        assert!(validate_scene_name(".").is_err());
        assert!(validate_scene_name("intro.v2").is_ok());
    }

    #[test]
    fn test_json_store_lists_every_saved_name() {
        let dir = TempDir::new().unwrap();
        let store = JsonSceneStore::new(dir.path()).unwrap();

        for name in ["intro", "intro.v2", "Finale 2", "_b"] {
            store
                .put(Scene::capture(name, &lit_buffer(), FixtureConfig::default()).unwrap())
                .unwrap();
        }
        assert!(Scene::capture(".hidden", &lit_buffer(), FixtureConfig::default()).is_err());

        let listed = store.list().unwrap();
        for name in ["intro", "intro.v2", "Finale 2", "_b"] {
            assert!(listed.contains(&name.to_string()), "{} missing from {:?}", name, listed);
        }
        assert_eq!(listed.len(), 4);
    }

    #[test]
    fn test_json_store_concurrent_saves_of_one_name() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonSceneStore::new(dir.path()).unwrap());

        let handles: Vec<_> = (0..4u8)
            .map(|worker| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let mut buffer = ChannelBuffer::new();
                    buffer.fill_range(0..512, worker);
                    for _ in 0..100 {
                        let scene =
                            Scene::capture("show", &buffer, FixtureConfig::default()).unwrap();
                        store.put(scene).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Whole file from exactly one writer, no stray temp files
        let loaded = store.get("show").unwrap();
        assert!(loaded.channels.iter().all(|&v| v == loaded.channels[0]));
        assert_eq!(store.list().unwrap(), vec!["show".to_string()]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySceneStore::new();
        let scene = Scene::capture("one", &lit_buffer(), FixtureConfig::default()).unwrap();
        store.put(scene.clone()).unwrap();

        assert_eq!(store.get("one").unwrap(), scene);
        assert_eq!(store.list().unwrap(), vec!["one".to_string()]);
        assert!(matches!(store.get("two"), Err(ControlError::NotFound(_))));

        store.delete("one").unwrap();
        assert!(matches!(store.delete("one"), Err(ControlError::NotFound(_))));
    }

    #[test]
    fn test_json_store_roundtrip_and_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = JsonSceneStore::new(dir.path()).unwrap();

        let first = Scene::capture("show", &lit_buffer(), FixtureConfig::default()).unwrap();
        store.put(first).unwrap();

        let second =
            Scene::capture("show", &ChannelBuffer::new(), FixtureConfig::default()).unwrap();
        store.put(second.clone()).unwrap();

        let loaded = store.get("show").unwrap();
        assert_eq!(loaded.channels, second.channels);
        assert_eq!(store.list().unwrap(), vec!["show".to_string()]);
    }

    #[test]
    fn test_json_store_reads_legacy_array() {
        let dir = TempDir::new().unwrap();
        let store = JsonSceneStore::new(dir.path()).unwrap();

        let mut legacy = vec![0u8; 512];
        legacy[0] = 255;
        fs::write(
            dir.path().join("old.json"),
            serde_json::to_string(&legacy).unwrap(),
        )
        .unwrap();

        let scene = store.get("old").unwrap();
        assert_eq!(scene.fixture, None);
        assert_eq!(scene.channels[0], 255);
    }

    #[test]
    fn test_json_store_missing_and_malformed() {
        let dir = TempDir::new().unwrap();
        let store = JsonSceneStore::new(dir.path()).unwrap();

        assert!(matches!(store.get("nope"), Err(ControlError::NotFound(_))));

        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        assert!(matches!(
            store.get("broken"),
            Err(ControlError::Validation(_))
        ));
    }

    #[test]
    fn test_resolve_identical_config_replaces_universe() {
        let config = FixtureConfig::default();
        let scene = Scene::capture("a", &lit_buffer(), config).unwrap();

        let mut live = ChannelBuffer::new();
        live.set(500, 9).unwrap();
        let resolved = scene.resolve(&live, &config).unwrap();
        assert_eq!(resolved, lit_buffer());
    }

    #[test]
    fn test_resolve_remaps_start_address() {
        let captured = FixtureConfig::new(FixtureMode::NineChannel, 1, 2).unwrap();
        let current = FixtureConfig::new(FixtureMode::NineChannel, 101, 2).unwrap();
        let scene = Scene::capture("a", &lit_buffer(), captured).unwrap();

        let mut live = ChannelBuffer::new();
        live.set(0, 7).unwrap();
        let resolved = scene.resolve(&live, &current).unwrap();

        assert_eq!(resolved.get(0), Some(7)); // outside patch: untouched
        assert_eq!(&resolved.as_slice()[100..118], &[200u8; 18][..]);
    }

    #[test]
    fn test_resolve_rejects_incompatible_patch() {
        let captured = FixtureConfig::new(FixtureMode::NineChannel, 1, 2).unwrap();
        let current = FixtureConfig::new(FixtureMode::FourteenChannel, 1, 2).unwrap();
        let scene = Scene::capture("a", &lit_buffer(), captured).unwrap();

        let result = scene.resolve(&ChannelBuffer::new(), &current);
        assert!(matches!(result, Err(ControlError::Configuration(_))));
    }
}
