//! Map Surface: the drawing canvas the engine mirrors.
//!
//! The engine never draws.  It reads the shapes a layer currently holds, inserts
//! shapes when a snapshot is restored, and replaces result overlays.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ContourOverlay, Extent, FeatureHandle, Geometry, LayerKind};

/// A shape as the map reports it.
///
/// `geometry` is `None` while a draw is still in progress; some surfaces emit a
/// change notification before the new shape is retrievable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapFeature {
    /// Map-assigned identity.
    pub handle: FeatureHandle,
    /// The finished shape, if any.
    pub geometry: Option<Geometry>,
}

/// Narrow interface to the map.
pub trait MapSurface: Send {
    /// Every shape currently on the layer, in handle order.
    fn features(&self, layer: LayerKind) -> Vec<MapFeature>;

    /// Puts a shape on the layer and returns its new handle.
    fn add_feature(&mut self, layer: LayerKind, geometry: Option<Geometry>) -> FeatureHandle;

    /// Takes a shape off the layer.  Returns false when the handle is unknown.
    fn remove_feature(&mut self, layer: LayerKind, handle: FeatureHandle) -> bool;

    /// Removes every shape from the layer.
    fn clear_layer(&mut self, layer: LayerKind);

    /// Sets the stroke color of the layer.
    fn set_layer_style(&mut self, layer: LayerKind, color: &str);

    /// Installs an overlay, dropping any existing overlay with the same title.
    fn replace_overlay(&mut self, overlay: ContourOverlay);

    /// The overlays currently shown.
    fn overlays(&self) -> &[ContourOverlay];

    /// The visible window.
    fn viewport(&self) -> Extent;
}

/// Headless map used by the service, the CLI and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMap {
    next_handle: u64,
    layers: BTreeMap<LayerKind, Vec<MapFeature>>,
    styles: BTreeMap<LayerKind, String>,
    overlays: Vec<ContourOverlay>,
    viewport: Extent,
}

impl InMemoryMap {
    /// Creates an empty map with the default viewport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map showing `viewport`.
    pub fn with_viewport(viewport: Extent) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    /// Moves the visible window.
    pub fn set_viewport(&mut self, viewport: Extent) {
        self.viewport = viewport;
    }

    /// Finishes an in-progress draw.  Returns false when the handle is unknown.
    pub fn complete_feature(
        &mut self,
        layer: LayerKind,
        handle: FeatureHandle,
        geometry: Geometry,
    ) -> bool {
        let Some(features) = self.layers.get_mut(&layer) else {
            return false;
        };
        match features.iter_mut().find(|f| f.handle == handle) {
            Some(feature) => {
                feature.geometry = Some(geometry);
                true
            }
            None => false,
        }
    }

    /// The stroke color last set on the layer.
    pub fn layer_style(&self, layer: LayerKind) -> Option<&str> {
        self.styles.get(&layer).map(String::as_str)
    }
}

impl MapSurface for InMemoryMap {
    fn features(&self, layer: LayerKind) -> Vec<MapFeature> {
        self.layers.get(&layer).cloned().unwrap_or_default()
    }

    fn add_feature(&mut self, layer: LayerKind, geometry: Option<Geometry>) -> FeatureHandle {
        self.next_handle += 1;
        let handle = FeatureHandle(self.next_handle);
        self.layers
            .entry(layer)
            .or_default()
            .push(MapFeature { handle, geometry });
        handle
    }

    fn remove_feature(&mut self, layer: LayerKind, handle: FeatureHandle) -> bool {
        let Some(features) = self.layers.get_mut(&layer) else {
            return false;
        };
        let before = features.len();
        features.retain(|f| f.handle != handle);
        features.len() != before
    }

    fn clear_layer(&mut self, layer: LayerKind) {
        self.layers.remove(&layer);
    }

    fn set_layer_style(&mut self, layer: LayerKind, color: &str) {
        self.styles.insert(layer, color.to_string());
    }

    fn replace_overlay(&mut self, overlay: ContourOverlay) {
        self.overlays.retain(|existing| existing.title != overlay.title);
        self.overlays.push(overlay);
    }

    fn overlays(&self) -> &[ContourOverlay] {
        &self.overlays
    }

    fn viewport(&self) -> Extent {
        self.viewport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_never_reused() {
        let mut map = InMemoryMap::new();
        let first = map.add_feature(LayerKind::Wells, Some(Geometry::Point([0.0, 0.0])));
        assert!(map.remove_feature(LayerKind::Wells, first));
        let second = map.add_feature(LayerKind::Wells, Some(Geometry::Point([0.0, 0.0])));
        assert_ne!(first, second);
        assert!(!map.remove_feature(LayerKind::Wells, first));
    }

    #[test]
    fn pending_draws_complete_later() {
        let mut map = InMemoryMap::new();
        let handle = map.add_feature(LayerKind::LineSinks, None);
        assert_eq!(map.features(LayerKind::LineSinks)[0].geometry, None);
        let line = Geometry::LineString(vec![[0.0, 0.0], [1.0, 1.0]]);
        assert!(map.complete_feature(LayerKind::LineSinks, handle, line.clone()));
        assert_eq!(map.features(LayerKind::LineSinks)[0].geometry, Some(line));
    }

    #[test]
    fn overlays_replace_by_title() {
        let mut map = InMemoryMap::new();
        map.replace_overlay(ContourOverlay::new("Elevation Contours", vec![1.0], vec![]));
        map.replace_overlay(ContourOverlay::new("Elevation Contours", vec![2.0], vec![]));
        map.replace_overlay(ContourOverlay::new("Other", vec![], vec![]));
        assert_eq!(map.overlays().len(), 2);
        assert_eq!(map.overlays()[0].levels, vec![2.0]);
    }

    #[test]
    fn clearing_a_layer_leaves_others() {
        let mut map = InMemoryMap::new();
        map.add_feature(LayerKind::Wells, Some(Geometry::Point([0.0, 0.0])));
        map.add_feature(LayerKind::ConstantModel, Some(Geometry::Point([0.0, 0.0])));
        map.clear_layer(LayerKind::Wells);
        assert!(map.features(LayerKind::Wells).is_empty());
        assert_eq!(map.features(LayerKind::ConstantModel).len(), 1);
    }
}
