//! Keyboard and mouse handling for the live display
//!
//! Key names from the configuration ("P", "Esc", "Space") are parsed into
//! [`Key`]s; [`UiController`] maps display events onto the pipeline toggles
//! and the region drag gesture.

use tracing::{info, warn};

use crate::config::{ConfigError, UiSettings};
use crate::overlay::zone_selection::{DragGesture, RegionDescriptor};
use crate::overlay::UiEvent;
use crate::regions::{Region, RegionModel};
use crate::shared::PipelineState;

/// A key reported by a display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Printable key, stored lowercase
    Char(char),
    Escape,
    Enter,
    Space,
    Tab,
}

/// Parse a key name like "P", "Esc" or "Space"
pub fn parse_key(name: &str) -> Result<Key, ConfigError> {
    let trimmed = name.trim();
    let upper = trimmed.to_uppercase();

    let key = match upper.as_str() {
        "ESC" | "ESCAPE" => Key::Escape,
        "ENTER" | "RETURN" => Key::Enter,
        "SPACE" => Key::Space,
        "TAB" => Key::Tab,
        _ => {
            let mut chars = trimmed.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_graphic() => Key::Char(c.to_ascii_lowercase()),
                _ => return Err(ConfigError::InvalidKey(name.to_string())),
            }
        }
    };

    Ok(key)
}

/// Keys bound to the UI toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    pub pause: Key,
    pub stats: Key,
    pub quit: Key,
}

impl KeyBindings {
    pub fn from_settings(settings: &UiSettings) -> Result<Self, ConfigError> {
        let bindings = Self {
            pause: parse_key(&settings.pause_key)?,
            stats: parse_key(&settings.stats_key)?,
            quit: parse_key(&settings.quit_key)?,
        };

        if bindings.pause == bindings.stats || bindings.pause == bindings.quit || bindings.stats == bindings.quit {
            return Err(ConfigError::InvalidKey(format!(
                "keys must be distinct (pause={}, stats={}, quit={})",
                settings.pause_key, settings.stats_key, settings.quit_key
            )));
        }

        Ok(bindings)
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            pause: Key::Char('p'),
            stats: Key::Char('s'),
            quit: Key::Escape,
        }
    }
}

/// What the coordinator should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    None,
    /// Quit requested; terminal
    Terminate,
    /// A drawn region was added to the active list
    RegionAdded(Region),
    /// A drawn region was logged but not installed
    RegionProposed(RegionDescriptor),
    /// A drawn rectangle had no usable size
    RegionRejected(RegionDescriptor),
}

/// Toggle state machine driven by display events
#[derive(Debug)]
pub struct UiController {
    bindings: KeyBindings,
    gesture: DragGesture,
    install_drawn_regions: bool,
}

impl UiController {
    pub fn new(bindings: KeyBindings, install_drawn_regions: bool) -> Self {
        Self {
            bindings,
            gesture: DragGesture::new(),
            install_drawn_regions,
        }
    }

    /// The drag gesture, for drawing the selection preview
    pub fn gesture(&self) -> &DragGesture {
        &self.gesture
    }

    pub fn handle_event(&mut self, event: UiEvent, state: &PipelineState, regions: &RegionModel) -> UiAction {
        match event {
            UiEvent::None => UiAction::None,
            UiEvent::Key(key) => self.handle_key(key, state),
            UiEvent::MouseDown { x, y } => {
                self.gesture.press(x, y);
                UiAction::None
            }
            UiEvent::MouseMove { x, y } => {
                self.gesture.moved(x, y);
                UiAction::None
            }
            UiEvent::MouseUp { x, y } => match self.gesture.release(x, y) {
                Some(descriptor) => self.finish_drag(descriptor, regions),
                None => UiAction::None,
            },
        }
    }

    fn handle_key(&mut self, key: Key, state: &PipelineState) -> UiAction {
        if key == self.bindings.quit {
            info!("Quit requested");
            return UiAction::Terminate;
        }

        if key == self.bindings.pause {
            if state.toggle_paused() {
                info!("Recognition paused");
            } else {
                info!("Recognition resumed");
            }
        } else if key == self.bindings.stats {
            let hidden = state.toggle_stats_hidden();
            info!("Stats {}", if hidden { "hidden" } else { "shown" });
        }

        UiAction::None
    }

    fn finish_drag(&mut self, descriptor: RegionDescriptor, regions: &RegionModel) -> UiAction {
        info!("Selected region: -r {}", descriptor);

        let result = if self.install_drawn_regions {
            regions.add_region(descriptor.x, descriptor.y, descriptor.width, descriptor.height)
        } else {
            descriptor.to_region()
        };

        match result {
            Ok(region) if self.install_drawn_regions => {
                info!("Added region {} ({} active)", region, regions.len());
                UiAction::RegionAdded(region)
            }
            Ok(_) => UiAction::RegionProposed(descriptor),
            Err(e) => {
                warn!("Ignoring selected region {}: {}", descriptor, e);
                UiAction::RegionRejected(descriptor)
            }
        }
    }
}
