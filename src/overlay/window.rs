//! Desktop window backed by OpenCV `highgui`
//!
//! Frames are shown with `imshow`; `wait_key` pumps the window's event loop,
//! which also runs the mouse callback. Mouse events travel from the callback
//! over a channel and are merged with key presses in arrival order.

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver};
use opencv::core::{Mat, Scalar, CV_8UC3};
use opencv::prelude::*;
use opencv::{highgui, imgproc};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use super::{DisplaySurface, UiEvent};
use crate::capture::frame::CapturedFrame;
use crate::hotkey::Key;

pub struct WindowDisplay {
    title: String,
    quit_key: Key,
    mouse: Receiver<UiEvent>,
    pending: VecDeque<UiEvent>,
    rgb: Mat,
    bgr: Mat,
    closed: bool,
}

impl WindowDisplay {
    pub fn open(title: &str, quit_key: Key) -> Result<Self> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)
            .with_context(|| format!("Failed to open window {:?}", title))?;

        let (sender, mouse) = unbounded();
        highgui::set_mouse_callback(
            title,
            Some(Box::new(move |event: i32, x: i32, y: i32, _flags: i32| {
                if let Some(ui_event) = mouse_event(event, x, y) {
                    let _ = sender.send(ui_event);
                }
            })),
        )
        .context("Failed to install mouse callback")?;

        info!("Opened window {:?}", title);
        Ok(Self {
            title: title.to_string(),
            quit_key,
            mouse,
            pending: VecDeque::new(),
            rgb: Mat::default(),
            bgr: Mat::default(),
            closed: false,
        })
    }

    /// Run the window event loop once and queue what it produced
    fn pump(&mut self) {
        let key = match highgui::wait_key(1) {
            Ok(code) => key_from_code(code),
            Err(e) => {
                warn!("Window event loop failed: {}", e);
                None
            }
        };

        for event in self.mouse.try_iter() {
            push_coalesced(&mut self.pending, event);
        }
        if let Some(key) = key {
            self.pending.push_back(UiEvent::Key(key));
        }

        // Closing the window counts as the quit key
        if !self.closed && !self.is_visible() {
            self.closed = true;
            info!("Window closed");
            self.pending.push_back(UiEvent::Key(self.quit_key));
        }
    }

    fn is_visible(&self) -> bool {
        highgui::get_window_property(&self.title, highgui::WND_PROP_VISIBLE)
            .map(|v| v >= 1.0)
            .unwrap_or(false)
    }
}

impl DisplaySurface for WindowDisplay {
    fn show(&mut self, frame: &CapturedFrame) -> Result<()> {
        let (width, height) = frame.dimensions();
        let rows = i32::try_from(height)?;
        let cols = i32::try_from(width)?;

        if self.rgb.rows() != rows || self.rgb.cols() != cols {
            self.rgb = Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(0.0))?;
        }
        self.rgb.data_bytes_mut()?.copy_from_slice(frame.image.as_raw());
        imgproc::cvt_color(&self.rgb, &mut self.bgr, imgproc::COLOR_RGB2BGR, 0)?;
        highgui::imshow(&self.title, &self.bgr)?;
        Ok(())
    }

    fn poll_event(&mut self) -> UiEvent {
        if self.pending.is_empty() {
            self.pump();
        }
        self.pending.pop_front().unwrap_or(UiEvent::None)
    }
}

impl Drop for WindowDisplay {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_window(&self.title) {
            debug!("Failed to destroy window: {}", e);
        }
    }
}

fn mouse_event(event: i32, x: i32, y: i32) -> Option<UiEvent> {
    match event {
        highgui::EVENT_LBUTTONDOWN => Some(UiEvent::MouseDown { x, y }),
        highgui::EVENT_MOUSEMOVE => Some(UiEvent::MouseMove { x, y }),
        highgui::EVENT_LBUTTONUP => Some(UiEvent::MouseUp { x, y }),
        _ => None,
    }
}

/// Map a `wait_key` code to a key. -1 means no key was pressed.
fn key_from_code(code: i32) -> Option<Key> {
    if code < 0 {
        return None;
    }

    match code & 0xFF {
        27 => Some(Key::Escape),
        10 | 13 => Some(Key::Enter),
        32 => Some(Key::Space),
        9 => Some(Key::Tab),
        c @ 0x21..=0x7E => Some(Key::Char((c as u8 as char).to_ascii_lowercase())),
        _ => None,
    }
}

/// Queue an event, keeping only the latest of consecutive moves
fn push_coalesced(queue: &mut VecDeque<UiEvent>, event: UiEvent) {
    if let (UiEvent::MouseMove { .. }, Some(UiEvent::MouseMove { .. })) = (event, queue.back()) {
        queue.pop_back();
    }
    queue.push_back(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_codes() {
        assert_eq!(key_from_code(-1), None);
        assert_eq!(key_from_code(27), Some(Key::Escape));
        assert_eq!(key_from_code('P' as i32), Some(Key::Char('p')));
        assert_eq!(key_from_code('s' as i32), Some(Key::Char('s')));
        assert_eq!(key_from_code(0x10_0000 | 27), Some(Key::Escape));
    }

    #[test]
    fn test_mouse_events() {
        assert_eq!(
            mouse_event(highgui::EVENT_LBUTTONDOWN, 3, 4),
            Some(UiEvent::MouseDown { x: 3, y: 4 })
        );
        assert_eq!(mouse_event(highgui::EVENT_RBUTTONDOWN, 3, 4), None);
    }

    #[test]
    fn test_moves_are_coalesced() {
        let mut queue = VecDeque::new();
        push_coalesced(&mut queue, UiEvent::MouseDown { x: 0, y: 0 });
        push_coalesced(&mut queue, UiEvent::MouseMove { x: 1, y: 1 });
        push_coalesced(&mut queue, UiEvent::MouseMove { x: 2, y: 2 });
        push_coalesced(&mut queue, UiEvent::MouseUp { x: 2, y: 2 });

        assert_eq!(
            Vec::from(queue),
            vec![
                UiEvent::MouseDown { x: 0, y: 0 },
                UiEvent::MouseMove { x: 2, y: 2 },
                UiEvent::MouseUp { x: 2, y: 2 },
            ]
        );
    }
}
