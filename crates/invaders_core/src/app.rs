use invaders_common::app::{App, WindowConfig};
use invaders_common::color::Color;
use invaders_common::key::Key;

use crate::machine::{FramePacer, Machine};
use crate::sound::SoundManager;
use crate::{SCREEN_HEIGHT, SCREEN_SCALE, SCREEN_WIDTH};

/// Frontend-facing wrapper around the cabinet machine.
///
/// Implements the shared `App` trait so the SDL2 frontend can drive the
/// emulator: one video frame per `update`, key events forwarded to the
/// machine, sound edges forwarded to the audio thread.
#[derive(Default)]
pub struct InvadersApp {
    should_exit: bool,
    paused: bool,
    pub machine: Machine,
    sound: Option<SoundManager>,
    pacer: FramePacer,
}

impl App for InvadersApp {
    fn window(&self) -> WindowConfig {
        WindowConfig {
            width: SCREEN_WIDTH as u32,
            height: SCREEN_HEIGHT as u32,
            scale: SCREEN_SCALE,
            title: "Space Invaders".to_string(),
        }
    }

    fn init(&mut self) {
        log::info!("Space Invaders init");
        // Try to bring up audio for the tone gate. If this fails, the
        // game still runs but without sound.
        if self.sound.is_none() {
            self.sound = SoundManager::new();
        }
    }

    fn update(&mut self, screen_state: &mut [u8]) {
        if !self.paused {
            self.machine.step_frame();

            for event in self.machine.take_tone_events() {
                if let Some(sound) = &mut self.sound {
                    sound.handle(event);
                }
            }

            if let Some(fault) = self.machine.fault() {
                log::error!(
                    "machine stopped on opcode {:#04x} at {:#06x}",
                    fault.opcode,
                    fault.pc
                );
                self.should_exit = true;
            }
        }

        render_video(self.machine.video_ram(), screen_state);

        if self.paused {
            overlay_pause_glyph(screen_state);
        }

        self.pacer.pace();
    }

    fn handle_key_event(&mut self, key: Key, is_pressed: bool) {
        if is_pressed {
            match key {
                Key::Escape => {
                    self.should_exit = true;
                    return;
                }
                Key::P => {
                    self.paused = !self.paused;
                    return;
                }
                // Any other key press unpauses.
                _ if self.paused => {
                    self.paused = false;
                }
                _ => {}
            }
        }

        self.machine.handle_key(key, is_pressed);
    }

    fn should_exit(&self) -> bool {
        self.should_exit
    }

    fn exit(&mut self) {
        log::info!("Space Invaders exit");
    }
}

/// Translate the 1-bpp framebuffer into RGB24 pixels.
///
/// Video RAM stores the screen rotated: each byte covers 8 vertical
/// pixels of one of the 224 columns, 32 bytes per column, bit 0 at the
/// bottom of the cabinet's upright display. Un-rotating means walking
/// columns and flipping the bit row into `255 - y`.
fn render_video(vram: &[u8], screen_state: &mut [u8]) {
    let width = SCREEN_WIDTH;
    let height = SCREEN_HEIGHT;

    debug_assert_eq!(vram.len(), width * height / 8);
    debug_assert_eq!(screen_state.len(), width * height * 3);

    let mut i = 0usize;
    for x in 0..width {
        for row in (0..height).step_by(8) {
            let mut byte = vram[i];
            i += 1;
            for bit in 0..8 {
                let pixel_on = (byte & 1) != 0;
                byte >>= 1;

                let screen_y = height - 1 - (row + bit);
                let idx = (screen_y * width + x) * 3;
                let color = if pixel_on { Color::WHITE } else { Color::BLACK };

                screen_state[idx] = color.r;
                screen_state[idx + 1] = color.g;
                screen_state[idx + 2] = color.b;
            }
        }
    }
}

/// Pause glyph geometry: two vertical bars, centered near the top of
/// the screen, in the safe strip above the score line.
const PAUSE_BAR_WIDTH: usize = 6;
const PAUSE_BAR_HEIGHT: usize = 20;
const PAUSE_BAR_GAP: usize = 6;
const PAUSE_TOP_MARGIN: usize = 8;

/// Stamp a "||" glyph over the frozen frame so a paused game is not
/// mistaken for a hang.
fn overlay_pause_glyph(screen_state: &mut [u8]) {
    let left_bar = SCREEN_WIDTH / 2 - PAUSE_BAR_GAP / 2 - PAUSE_BAR_WIDTH;
    let right_bar = left_bar + PAUSE_BAR_WIDTH + PAUSE_BAR_GAP;

    for bar_x in [left_bar, right_bar] {
        for y in PAUSE_TOP_MARGIN..PAUSE_TOP_MARGIN + PAUSE_BAR_HEIGHT {
            let start = (y * SCREEN_WIDTH + bar_x) * 3;
            screen_state[start..start + PAUSE_BAR_WIDTH * 3].fill(Color::WHITE.r);
        }
    }
}
