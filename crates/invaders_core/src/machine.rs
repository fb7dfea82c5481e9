use std::thread;
use std::time::{Duration, Instant};

use invaders_common::key::Key;

use crate::cpu::{Bus8080, Cpu8080, Fault};
use crate::disasm::{self, Tracer};
use crate::io::{Button, DipConfig, IoBus, ToneEvent};
use crate::memory::Memory;

/// 8080 clock and frame timing for Space Invaders.
pub const CPU_CLOCK_HZ: u32 = 2_000_000;
pub const FRAME_RATE_HZ: u32 = 60;
pub const CYCLES_PER_FRAME: u32 = CPU_CLOCK_HZ / FRAME_RATE_HZ;

/// Wall-clock length of one video frame.
pub const FRAME_DURATION: Duration = Duration::from_nanos(1_000_000_000 / FRAME_RATE_HZ as u64);

/// RST 1, raised when the beam reaches mid-screen.
pub const MID_SCREEN_RST: u8 = 0xcf;
/// RST 2, raised at the start of the vertical blanking interval.
pub const VBLANK_RST: u8 = 0xd7;

/// Memory and IO ports glued together behind the CPU's bus trait.
struct CabinetBus {
    memory: Memory,
    io: IoBus,
}

impl Bus8080 for CabinetBus {
    fn mem_read(&mut self, addr: u16) -> u8 {
        self.memory.read8(addr)
    }

    fn mem_write(&mut self, addr: u16, value: u8) {
        self.memory.write8(addr, value);
    }

    fn io_read(&mut self, port: u8) -> u8 {
        self.io.input(port)
    }

    fn io_write(&mut self, port: u8, value: u8) {
        self.io.output(port, value);
    }
}

/// The Space Invaders cabinet: 8080 CPU, mirrored memory map, IO ports
/// with the external shift register, and the two-per-frame interrupt
/// schedule.
pub struct Machine {
    cpu: Cpu8080,
    bus: CabinetBus,
    dip: DipConfig,
    tracer: Option<Box<dyn Tracer>>,
}

impl Machine {
    /// Construct a machine in a powered-up but reset state.
    pub fn new(dip: DipConfig) -> Self {
        Self {
            cpu: Cpu8080::new(),
            bus: CabinetBus {
                memory: Memory::new(),
                io: IoBus::new(dip),
            },
            dip,
            tracer: None,
        }
    }

    /// Install an instruction sink; pass `None` to stop tracing.
    pub fn set_tracer(&mut self, tracer: Option<Box<dyn Tracer>>) {
        self.tracer = tracer;
    }

    /// Install the ROM image (up to 8 KiB) at address 0x0000.
    pub fn load_rom(&mut self, image: &[u8]) {
        self.bus.memory.load_rom(0, image);
        self.cpu.pc = 0x0000;
    }

    /// Reset CPU and IO state, preserving memory contents (ROM included).
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.bus.io = IoBus::new(self.dip);
    }

    /// The latched CPU fault, if the machine has stopped on a bad opcode.
    pub fn fault(&self) -> Option<Fault> {
        self.cpu.fault()
    }

    /// Run one video frame worth of CPU time.
    ///
    /// The cabinet raises RST 1 when the beam reaches mid-screen and
    /// RST 2 at VBLANK; both are latched on the CPU and accepted between
    /// instructions once interrupts are enabled. Returns early if the
    /// CPU faults.
    pub fn step_frame(&mut self) {
        let half_frame = CYCLES_PER_FRAME / 2;
        let mut cycles: u32 = 0;

        while cycles < half_frame {
            let c = self.step_instruction();
            if c == 0 {
                return;
            }
            cycles += u32::from(c);
        }
        self.cpu.request_interrupt(MID_SCREEN_RST);

        while cycles < CYCLES_PER_FRAME {
            let c = self.step_instruction();
            if c == 0 {
                return;
            }
            cycles += u32::from(c);
        }
        self.cpu.request_interrupt(VBLANK_RST);
    }

    fn step_instruction(&mut self) -> u8 {
        if let Some(tracer) = self.tracer.as_deref_mut() {
            if !self.cpu.is_halted() {
                let pc = self.cpu.pc;
                let opcode = self.bus.memory.read8(pc);
                let lo = self.bus.memory.read8(pc.wrapping_add(1));
                let hi = self.bus.memory.read8(pc.wrapping_add(2));
                tracer.instruction(pc, opcode, &disasm::disassemble(opcode, lo, hi));
            }
        }
        self.cpu.step(&mut self.bus)
    }

    /// Handle a logical key event mapped from the frontend.
    ///
    /// Fixed mapping:
    ///
    /// - `C`           → insert coin (port 1, bit 0)
    /// - `Num1`        → start 1 player (port 1, bit 2)
    /// - `Num2`        → start 2 players (port 1, bit 1)
    /// - `A`/`Left`    → player 1 moves left (port 1, bit 5)
    /// - `D`/`Right`   → player 1 moves right (port 1, bit 6)
    /// - `S`/`Space`   → player 1 shoots (port 1, bit 4)
    /// - `J`/`L`/`K`   → player 2 left/right/shoot (port 2, bits 5/6/4)
    /// - `T`           → tilt (port 2, bit 2, latched on press)
    ///
    /// Pause and quit keys are handled in the app layer.
    pub fn handle_key(&mut self, key: Key, pressed: bool) {
        let io = &mut self.bus.io;
        match key {
            Key::C => io.set_button(Button::Coin, pressed),
            Key::Num1 => io.set_button(Button::P1Start, pressed),
            Key::Num2 => io.set_button(Button::P2Start, pressed),
            Key::A | Key::Left => io.set_button(Button::P1Left, pressed),
            Key::D | Key::Right => io.set_button(Button::P1Right, pressed),
            Key::S | Key::Space => io.set_button(Button::P1Shoot, pressed),
            Key::J => io.set_button(Button::P2Left, pressed),
            Key::L => io.set_button(Button::P2Right, pressed),
            Key::K => io.set_button(Button::P2Shoot, pressed),
            // Tilt is only set on key press and stays latched until the
            // game acknowledges it.
            Key::T if pressed => io.set_button(Button::Tilt, true),
            _ => {}
        }
    }

    /// The raw video RAM window used by the renderer.
    pub fn video_ram(&self) -> &[u8] {
        self.bus.memory.video_ram()
    }

    /// Drain the sound edges produced since the last call.
    pub fn take_tone_events(&mut self) -> Vec<ToneEvent> {
        self.bus.io.take_tone_events()
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(DipConfig::default())
    }
}

/// Keeps frame presentation aligned with the wall clock at 60 Hz.
///
/// After each presented frame, `pace` sleeps until the next 1/60 s
/// deadline. If the machine falls more than one frame behind, the
/// deadline is re-anchored instead of trying to catch up.
pub struct FramePacer {
    next_deadline: Instant,
}

impl FramePacer {
    pub fn new() -> Self {
        Self {
            next_deadline: Instant::now() + FRAME_DURATION,
        }
    }

    pub fn pace(&mut self) {
        let now = Instant::now();
        if now < self.next_deadline {
            thread::sleep(self.next_deadline - now);
        }

        let now = Instant::now();
        self.next_deadline = if now > self.next_deadline + FRAME_DURATION {
            now + FRAME_DURATION
        } else {
            self.next_deadline + FRAME_DURATION
        };
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::VRAM_SIZE;

    /// Test ROM: enable interrupts and spin, with RST 1 / RST 2 handlers
    /// that record their visit in work RAM and re-enable interrupts.
    fn spin_rom() -> Vec<u8> {
        let mut rom = vec![0u8; 0x20];
        // 0x0000: EI; JMP $0001 (self-loop)
        rom[0x00] = 0xfb;
        rom[0x01] = 0xc3;
        rom[0x02] = 0x01;
        rom[0x03] = 0x00;
        // 0x0008 (RST 1): MVI A,1; STA $2000; EI; RET
        rom[0x08..0x0f].copy_from_slice(&[0x3e, 0x01, 0x32, 0x00, 0x20, 0xfb, 0xc9]);
        // 0x0010 (RST 2): MVI A,2; STA $2001; EI; RET
        rom[0x10..0x17].copy_from_slice(&[0x3e, 0x02, 0x32, 0x01, 0x20, 0xfb, 0xc9]);
        rom
    }

    #[test]
    fn frame_interrupts_reach_their_handlers() {
        let mut machine = Machine::default();
        machine.load_rom(&spin_rom());
        // The game's stack normally lives at the top of work RAM.
        machine.cpu.sp = 0x2400;

        machine.step_frame();
        // RST 1 fired mid-frame; RST 2 is latched at the frame edge and
        // accepted at the start of the next frame.
        assert_eq!(machine.bus.memory.read8(0x2000), 0x01);
        assert_eq!(machine.bus.memory.read8(0x2001), 0x00);

        machine.step_frame();
        assert_eq!(machine.bus.memory.read8(0x2001), 0x02);
        assert!(machine.fault().is_none());
    }

    #[test]
    fn fault_aborts_the_frame() {
        let mut machine = Machine::default();
        machine.load_rom(&[0x08]);
        machine.step_frame();
        let fault = machine.fault().expect("fault should be latched");
        assert_eq!(fault.pc, 0x0000);
        assert_eq!(fault.opcode, 0x08);

        // Subsequent frames stay parked.
        machine.step_frame();
        assert_eq!(machine.fault(), Some(fault));
    }

    #[test]
    fn video_ram_window_has_the_framebuffer_size() {
        let machine = Machine::default();
        assert_eq!(machine.video_ram().len(), VRAM_SIZE);
    }

    #[test]
    fn tilt_stays_latched_after_release() {
        let mut machine = Machine::default();
        machine.handle_key(Key::T, true);
        machine.handle_key(Key::T, false);
        assert_eq!(machine.bus.io.input(2) & 0x04, 0x04);
    }

    #[test]
    fn coin_follows_key_state() {
        let mut machine = Machine::default();
        machine.handle_key(Key::C, true);
        assert_eq!(machine.bus.io.input(1) & 0x01, 0x01);
        machine.handle_key(Key::C, false);
        assert_eq!(machine.bus.io.input(1) & 0x01, 0x00);
    }

    #[test]
    fn reset_preserves_rom_and_clears_io() {
        let mut machine = Machine::default();
        machine.load_rom(&spin_rom());
        machine.handle_key(Key::C, true);
        machine.reset();
        assert_eq!(machine.bus.memory.read8(0x0000), 0xfb);
        assert_eq!(machine.bus.io.input(1) & 0x01, 0x00);
        assert_eq!(machine.cpu.pc, 0x0000);
    }
}
