//! Disassembly of 8080 opcodes for tracing and diagnostics.

const REG: [&str; 8] = ["B", "C", "D", "E", "H", "L", "M", "A"];
const PAIR: [&str; 4] = ["B", "D", "H", "SP"];
const COND: [&str; 8] = ["NZ", "Z", "NC", "C", "PO", "PE", "P", "M"];
const ALU: [&str; 8] = ["ADD", "ADC", "SUB", "SBB", "ANA", "XRA", "ORA", "CMP"];
const ALU_IMM: [&str; 8] = ["ADI", "ACI", "SUI", "SBI", "ANI", "XRI", "ORI", "CPI"];

/// How many immediate bytes follow the opcode in the instruction stream.
pub fn immediate_len(opcode: u8) -> u16 {
    match opcode {
        // MVI r,d8 and the immediate ALU group.
        0x06 | 0x0e | 0x16 | 0x1e | 0x26 | 0x2e | 0x36 | 0x3e => 1,
        0xc6 | 0xce | 0xd6 | 0xde | 0xe6 | 0xee | 0xf6 | 0xfe => 1,
        // IN / OUT.
        0xdb | 0xd3 => 1,
        // LXI rp,d16 and the direct-address loads/stores.
        0x01 | 0x11 | 0x21 | 0x31 => 2,
        0x22 | 0x2a | 0x32 | 0x3a => 2,
        // JMP/CALL and all their conditional variants.
        0xc3 | 0xcd => 2,
        0xc2 | 0xca | 0xd2 | 0xda | 0xe2 | 0xea | 0xf2 | 0xfa => 2,
        0xc4 | 0xcc | 0xd4 | 0xdc | 0xe4 | 0xec | 0xf4 | 0xfc => 2,
        _ => 0,
    }
}

/// Render one instruction as text. `lo` and `hi` are the bytes following
/// the opcode; they are ignored when the instruction has no immediate.
pub fn disassemble(opcode: u8, lo: u8, hi: u8) -> String {
    let dst = ((opcode >> 3) & 0x07) as usize;
    let src = (opcode & 0x07) as usize;
    let rp = ((opcode >> 4) & 0x03) as usize;

    match opcode {
        0x00 => "NOP".into(),
        0x76 => "HLT".into(),
        0x40..=0x7f => format!("MOV {},{}", REG[dst], REG[src]),
        0x06 | 0x0e | 0x16 | 0x1e | 0x26 | 0x2e | 0x36 | 0x3e => {
            format!("MVI {},#${lo:02x}", REG[dst])
        }
        0x01 | 0x11 | 0x21 | 0x31 => format!("LXI {},#${hi:02x}{lo:02x}", PAIR[rp]),
        0x02 => "STAX B".into(),
        0x12 => "STAX D".into(),
        0x0a => "LDAX B".into(),
        0x1a => "LDAX D".into(),
        0x32 => format!("STA ${hi:02x}{lo:02x}"),
        0x3a => format!("LDA ${hi:02x}{lo:02x}"),
        0x22 => format!("SHLD ${hi:02x}{lo:02x}"),
        0x2a => format!("LHLD ${hi:02x}{lo:02x}"),
        0x03 | 0x13 | 0x23 | 0x33 => format!("INX {}", PAIR[rp]),
        0x0b | 0x1b | 0x2b | 0x3b => format!("DCX {}", PAIR[rp]),
        0x09 | 0x19 | 0x29 | 0x39 => format!("DAD {}", PAIR[rp]),
        0x04 | 0x0c | 0x14 | 0x1c | 0x24 | 0x2c | 0x34 | 0x3c => format!("INR {}", REG[dst]),
        0x05 | 0x0d | 0x15 | 0x1d | 0x25 | 0x2d | 0x35 | 0x3d => format!("DCR {}", REG[dst]),
        0x07 => "RLC".into(),
        0x0f => "RRC".into(),
        0x17 => "RAL".into(),
        0x1f => "RAR".into(),
        0x27 => "DAA".into(),
        0x2f => "CMA".into(),
        0x37 => "STC".into(),
        0x3f => "CMC".into(),
        0x80..=0xbf => format!("{} {}", ALU[dst & 0x07], REG[src]),
        0xc6 | 0xce | 0xd6 | 0xde | 0xe6 | 0xee | 0xf6 | 0xfe => {
            format!("{} #${lo:02x}", ALU_IMM[dst])
        }
        0xc3 => format!("JMP ${hi:02x}{lo:02x}"),
        0xc2 | 0xca | 0xd2 | 0xda | 0xe2 | 0xea | 0xf2 | 0xfa => {
            format!("J{} ${hi:02x}{lo:02x}", COND[dst])
        }
        0xcd => format!("CALL ${hi:02x}{lo:02x}"),
        0xc4 | 0xcc | 0xd4 | 0xdc | 0xe4 | 0xec | 0xf4 | 0xfc => {
            format!("C{} ${hi:02x}{lo:02x}", COND[dst])
        }
        0xc9 => "RET".into(),
        0xc0 | 0xc8 | 0xd0 | 0xd8 | 0xe0 | 0xe8 | 0xf0 | 0xf8 => format!("R{}", COND[dst]),
        0xc7 | 0xcf | 0xd7 | 0xdf | 0xe7 | 0xef | 0xf7 | 0xff => format!("RST {dst}"),
        0xc5 => "PUSH B".into(),
        0xd5 => "PUSH D".into(),
        0xe5 => "PUSH H".into(),
        0xf5 => "PUSH PSW".into(),
        0xc1 => "POP B".into(),
        0xd1 => "POP D".into(),
        0xe1 => "POP H".into(),
        0xf1 => "POP PSW".into(),
        0xdb => format!("IN #${lo:02x}"),
        0xd3 => format!("OUT #${lo:02x}"),
        0xeb => "XCHG".into(),
        0xe3 => "XTHL".into(),
        0xf9 => "SPHL".into(),
        0xe9 => "PCHL".into(),
        0xfb => "EI".into(),
        0xf3 => "DI".into(),
        _ => format!("DB #${opcode:02x}"),
    }
}

/// Optional instruction sink. When installed on the machine it is handed
/// every instruction about to execute.
pub trait Tracer {
    fn instruction(&mut self, pc: u16, opcode: u8, text: &str);
}

/// Tracer that routes instructions to `log::trace!`.
///
/// Enable with e.g. `RUST_LOG=invaders_core=trace` together with the
/// binary's `--trace` flag.
#[derive(Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn instruction(&mut self, pc: u16, _opcode: u8, text: &str) {
        log::trace!("{pc:04x}. {text}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_representative_opcodes() {
        assert_eq!(disassemble(0x00, 0, 0), "NOP");
        assert_eq!(disassemble(0x41, 0, 0), "MOV B,C");
        assert_eq!(disassemble(0x77, 0, 0), "MOV M,A");
        assert_eq!(disassemble(0x3e, 0x42, 0), "MVI A,#$42");
        assert_eq!(disassemble(0x31, 0x00, 0x24), "LXI SP,#$2400");
        assert_eq!(disassemble(0xc3, 0xad, 0xde), "JMP $dead");
        assert_eq!(disassemble(0xca, 0x10, 0x00), "JZ $0010");
        assert_eq!(disassemble(0xcf, 0, 0), "RST 1");
        assert_eq!(disassemble(0xfe, 0x0a, 0), "CPI #$0a");
        assert_eq!(disassemble(0xf5, 0, 0), "PUSH PSW");
        assert_eq!(disassemble(0x27, 0, 0), "DAA");
    }

    #[test]
    fn only_undocumented_opcodes_fall_through() {
        let undocumented = [
            0x08u8, 0x10, 0x18, 0x20, 0x28, 0x30, 0x38, 0xcb, 0xd9, 0xdd, 0xed, 0xfd,
        ];
        for op in 0u16..=0xff {
            let op = op as u8;
            let text = disassemble(op, 0, 0);
            if undocumented.contains(&op) {
                assert!(text.starts_with("DB "), "{op:#04x} -> {text}");
            } else {
                assert!(!text.starts_with("DB "), "{op:#04x} -> {text}");
            }
        }
    }

    #[test]
    fn immediate_lengths_match_the_map() {
        assert_eq!(immediate_len(0x00), 0);
        assert_eq!(immediate_len(0x3e), 1);
        assert_eq!(immediate_len(0xdb), 1);
        assert_eq!(immediate_len(0x31), 2);
        assert_eq!(immediate_len(0xcd), 2);
        assert_eq!(immediate_len(0xeb), 0);
    }
}
