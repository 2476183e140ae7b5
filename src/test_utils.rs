#[cfg(test)]
pub mod test_helpers {
    use std::path::PathBuf;

    use crate::{
        FeatureHandle, Geometry, InMemoryMap, InMemorySessionCache, InMemoryTable, LayerKind,
        MapSurface, SyncEngine, SyncOutcome,
    };

    /// The engine every unit test drives.
    pub type TestEngine = SyncEngine<InMemoryMap, InMemoryTable, InMemorySessionCache>;

    /// Creates a unique file path based on module and suffix
    pub fn unique_test_path(module: &str, suffix: &str, extension: &str) -> PathBuf {
        use std::process;
        use std::time::{SystemTime, UNIX_EPOCH};
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "test_{}_{}_{}_{}.{}",
            module,
            process::id(),
            timestamp,
            suffix,
            extension
        ))
    }

    /// Creates an engine over empty in-memory surfaces
    pub fn test_engine() -> TestEngine {
        SyncEngine::new(
            InMemoryMap::new(),
            InMemoryTable::new(),
            InMemorySessionCache::new(),
        )
    }

    /// Draws a shape and reports the change, as a finished draw interaction would.
    pub fn draw(engine: &mut TestEngine, layer: LayerKind, geometry: Geometry) -> FeatureHandle {
        let handle = engine.map_mut().add_feature(layer, Some(geometry));
        let outcome = engine.on_layer_changed(layer).unwrap();
        assert!(
            matches!(outcome, SyncOutcome::Added(_)),
            "draw on {} was not adopted: {:?}",
            layer,
            outcome
        );
        handle
    }
}
