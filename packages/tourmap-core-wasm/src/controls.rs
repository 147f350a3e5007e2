use serde::Serialize;

use crate::basemap::BasemapKind;
use crate::layers::LayerId;
use crate::map_controller::MapController;

/// Entry of the basemap picker.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct BasemapOption {
    pub kind: BasemapKind,
    pub name: &'static str,
    pub enabled: bool,
    pub selected: bool,
}

/// Checkbox for an optional overlay.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct LayerToggle {
    pub id: LayerId,
    pub label: &'static str,
    pub visible: bool,
}

/// Everything the control panel draws.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlsView {
    pub layers_open: bool,
    pub layers_button: &'static str,
    pub fullscreen: bool,
    pub fullscreen_button: &'static str,
    pub basemaps: Vec<BasemapOption>,
    pub layers: Vec<LayerToggle>,
}

/// Panel flags. Basemap and visibility state live on the map itself.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControlPanel {
    layers_open: bool,
    fullscreen: bool,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_layers_menu(&mut self) -> bool {
        self.layers_open = !self.layers_open;
        self.layers_open
    }

    pub fn layers_open(&self) -> bool {
        self.layers_open
    }

    /// Mirror of `document.fullscreenElement` after a `fullscreenchange`.
    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn view(&self, map: &MapController) -> ControlsView {
        let current = map.basemap();
        ControlsView {
            layers_open: self.layers_open,
            layers_button: if self.layers_open { "Hide Layers" } else { "Show Layers" },
            fullscreen: self.fullscreen,
            fullscreen_button: if self.fullscreen { "Exit Fullscreen" } else { "Fullscreen" },
            basemaps: BasemapKind::ALL
                .into_iter()
                .map(|kind| BasemapOption {
                    kind,
                    name: kind.display_name(),
                    enabled: kind.is_enabled(),
                    selected: kind == current,
                })
                .collect(),
            // The live location layer has its own start/stop control
            layers: LayerId::STACK
                .into_iter()
                .filter(|id| *id != LayerId::Location)
                .map(|id| LayerToggle {
                    id,
                    label: id.label(),
                    visible: map.is_layer_visible(id),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;

    #[test]
    fn test_labels_follow_state() {
        let map = MapController::new("map", &DashboardConfig::default(), 800.0, 600.0);
        let mut panel = ControlPanel::new();
        let view = panel.view(&map);
        assert_eq!(view.layers_button, "Show Layers");
        assert_eq!(view.fullscreen_button, "Fullscreen");

        assert!(panel.toggle_layers_menu());
        panel.set_fullscreen(true);
        let view = panel.view(&map);
        assert_eq!(view.layers_button, "Hide Layers");
        assert_eq!(view.fullscreen_button, "Exit Fullscreen");
    }

    #[test]
    fn test_options_reflect_map() {
        let mut map = MapController::new("map", &DashboardConfig::default(), 800.0, 600.0);
        map.set_basemap(BasemapKind::Satellite).unwrap();
        map.set_layer_visible(LayerId::Routes, false);
        let view = ControlPanel::new().view(&map);

        let selected: Vec<_> = view.basemaps.iter().filter(|b| b.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].kind, BasemapKind::Satellite);
        let terrain = view.basemaps.iter().find(|b| b.kind == BasemapKind::Terrain).unwrap();
        assert!(!terrain.enabled);

        assert!(view.layers.iter().all(|l| l.id != LayerId::Location));
        let routes = view.layers.iter().find(|l| l.id == LayerId::Routes).unwrap();
        assert!(!routes.visible);
        let recaps = view.layers.iter().find(|l| l.id == LayerId::Recaps).unwrap();
        assert!(!recaps.visible);
    }
}
