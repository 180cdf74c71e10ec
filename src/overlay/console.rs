//! Operator commands read from stdin, for runs without a window
//!
//! Each line is either a key name (`p`, `s`, `Esc`) or `region x,y,w,h`,
//! which is replayed as a mouse drag over that rectangle.

use crossbeam_channel::{unbounded, Receiver};
use std::io::{self, BufRead};
use std::thread;
use tracing::{debug, warn};

use super::UiEvent;
use crate::config::ConfigError;
use crate::hotkey::parse_key;
use crate::regions::Region;

/// Turn one command line into display events
pub fn parse_command(line: &str) -> Result<Vec<UiEvent>, ConfigError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }

    if let Some(rest) = line.strip_prefix("region ") {
        let region: Region = rest.parse()?;
        return drag_over(&region);
    }

    Ok(vec![UiEvent::Key(parse_key(line)?)])
}

fn drag_over(region: &Region) -> Result<Vec<UiEvent>, ConfigError> {
    let (x0, y0, x1, y1) = region.bounds();
    let coord = |v: u32| i32::try_from(v).map_err(|_| ConfigError::RegionOutOfRange(v as i64));
    let (x0, y0, x1, y1) = (coord(x0)?, coord(y0)?, coord(x1)?, coord(y1)?);

    Ok(vec![
        UiEvent::MouseDown { x: x0, y: y0 },
        UiEvent::MouseMove { x: x1, y: y1 },
        UiEvent::MouseUp { x: x1, y: y1 },
    ])
}

/// Read commands from `input` until it ends or the receiver goes away
fn forward_commands<R: BufRead>(input: R, events: crossbeam_channel::Sender<UiEvent>) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        match parse_command(&line) {
            Ok(parsed) => {
                for event in parsed {
                    if events.send(event).is_err() {
                        return;
                    }
                }
            }
            Err(e) => warn!("Ignoring command {:?}: {}", line.trim(), e),
        }
    }
    debug!("Console input closed");
}

/// Start a detached thread feeding stdin commands into a channel
pub fn spawn_console_input() -> Receiver<UiEvent> {
    let (sender, receiver) = unbounded();
    thread::spawn(move || forward_commands(io::stdin().lock(), sender));
    receiver
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::Key;
    use std::io::Cursor;

    #[test]
    fn test_key_commands() {
        assert_eq!(parse_command("p").unwrap(), vec![UiEvent::Key(Key::Char('p'))]);
        assert_eq!(parse_command("  Esc ").unwrap(), vec![UiEvent::Key(Key::Escape)]);
        assert!(parse_command("").unwrap().is_empty());
        assert!(parse_command("pause").is_err());
    }

    #[test]
    fn test_region_command_is_a_drag() {
        assert_eq!(
            parse_command("region 10,20,30,40").unwrap(),
            vec![
                UiEvent::MouseDown { x: 10, y: 20 },
                UiEvent::MouseMove { x: 40, y: 60 },
                UiEvent::MouseUp { x: 40, y: 60 },
            ]
        );
        assert!(parse_command("region 10,20,0,40").is_err());
    }

    #[test]
    fn test_forward_skips_bad_lines() {
        let (sender, receiver) = unbounded();
        forward_commands(Cursor::new("s\nbogus command\nregion 0,0,2,2\nq\n"), sender);

        let events: Vec<UiEvent> = receiver.try_iter().collect();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0], UiEvent::Key(Key::Char('s')));
        assert_eq!(events[1], UiEvent::MouseDown { x: 0, y: 0 });
        assert_eq!(events[4], UiEvent::Key(Key::Char('q')));
    }
}
