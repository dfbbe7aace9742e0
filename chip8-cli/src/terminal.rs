//! Terminal device
use std::io::{self, Write};

use chip8::{constants::*, Devices, KeyCode};
use log::{error, info};

/// Devices backed by a text stream.
///
/// Keys can't be read from a plain terminal without raw mode, so a fixed
/// set of keys is held down for the whole run.
pub struct Terminal<W> {
    out: W,
    held_keys: u16,
    print_frames: bool,
}

impl<W: Write> Terminal<W> {
    pub fn new(out: W, held_keys: &[KeyCode], print_frames: bool) -> Self {
        let held_keys = held_keys
            .iter()
            .fold(0u16, |mask, key| mask | (1 << key.as_u8()));

        Self {
            out,
            held_keys,
            print_frames,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Devices for Terminal<W> {
    fn is_pressed(&self, key: KeyCode) -> bool {
        self.held_keys & (1 << key.as_u8()) != 0
    }

    fn draw(&mut self, display: &DisplayBuffer) {
        if self.print_frames {
            if let Err(err) = render(display, &mut self.out) {
                error!("failed to print frame: {err}");
            }
        }
    }

    fn buzz(&mut self) {
        info!("beep");

        // Terminal bell
        if let Err(err) = self.out.write_all(b"\x07").and_then(|_| self.out.flush()) {
            error!("failed to ring bell: {err}");
        }
    }
}

/// Write the display as rows of `#` for lit and `.` for unlit pixels,
/// followed by a blank line.
pub fn render(display: &DisplayBuffer, out: &mut impl Write) -> io::Result<()> {
    let mut line = [0u8; DISPLAY_WIDTH + 1];
    line[DISPLAY_WIDTH] = b'\n';

    for row in display.chunks(DISPLAY_WIDTH) {
        for (c, px) in line.iter_mut().zip(row) {
            *c = if *px != 0 { b'#' } else { b'.' };
        }
        out.write_all(&line)?;
    }
    writeln!(out)?;

    out.flush()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_held_keys() {
        let term = Terminal::new(Vec::new(), &[KeyCode::Key1, KeyCode::KeyC], false);

        assert!(term.is_pressed(KeyCode::Key1));
        assert!(term.is_pressed(KeyCode::KeyC));
        assert!(!term.is_pressed(KeyCode::Key0));
        assert!(!term.is_pressed(KeyCode::KeyF));
    }

    #[test]
    fn test_render() {
        let mut display = [0u8; DISPLAY_BUFFER_SIZE];
        display[0] = 1;
        display[DISPLAY_WIDTH + 1] = 1;

        let mut out = Vec::new();
        render(&display, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let rows: Vec<&str> = text.lines().collect();

        assert_eq!(rows.len(), DISPLAY_HEIGHT + 1);
        assert!(rows[0].starts_with("#."));
        assert!(rows[1].starts_with(".#"));
        assert_eq!(rows[2], ".".repeat(DISPLAY_WIDTH));
        assert_eq!(rows[DISPLAY_HEIGHT], "");
    }

    #[test]
    fn test_frames_only_when_enabled() {
        let display = [1u8; DISPLAY_BUFFER_SIZE];

        let mut quiet = Terminal::new(Vec::new(), &[], false);
        quiet.draw(&display);
        assert!(quiet.into_inner().is_empty());

        let mut loud = Terminal::new(Vec::new(), &[], true);
        loud.draw(&display);
        loud.buzz();
        let out = loud.into_inner();
        assert_eq!(out.len(), (DISPLAY_WIDTH + 1) * DISPLAY_HEIGHT + 2);
        assert_eq!(out.last(), Some(&0x07));
    }
}
