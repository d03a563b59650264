use anyhow::{Context, Result};
use clap::Parser;
use hemu86_core::cpu_8086::{
    ArrayMemory, Cpu8086, HaltReason, AX, BP, BX, CS, CX, DI, DS, DX, ES, SI, SP, SS,
};
use hemu86_core::{EngineConfig, TimingMode};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

const SCREEN_COLS: usize = 80;
const SCREEN_ROWS: usize = 25;

#[derive(Parser)]
#[command(name = "hemu86", about = "Run a raw 8086 binary")]
struct Args {
    /// Raw binary to load
    program: PathBuf,

    /// Code segment to load and start at (hex)
    #[arg(long, default_value = "1000", value_parser = parse_hex16)]
    cs: u16,

    /// Offset within the code segment to load and start at (hex)
    #[arg(long, default_value = "0100", value_parser = parse_hex16)]
    ip: u16,

    /// Engine configuration (JSON); missing file means defaults
    #[arg(long, default_value = "hemu86.json")]
    config: PathBuf,

    /// Count clocks regardless of the configuration
    #[arg(long, default_value_t = false)]
    timing: bool,

    /// Stop after this many instructions
    #[arg(long, default_value_t = 10_000_000)]
    steps: u64,

    /// Print an 80x25 byte-per-cell text buffer at this physical address (hex)
    #[arg(long, value_parser = parse_hex32)]
    screen: Option<u32>,

    /// Dump save-state to this file as JSON
    #[arg(long, default_value = "state.json")]
    save: String,

    /// Suppress the register dump (still writes --save)
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn parse_hex32(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|e| format!("`{}`: {}", s, e))
}

fn parse_hex16(s: &str) -> Result<u16, String> {
    let value = parse_hex32(s)?;
    u16::try_from(value).map_err(|_| format!("`{}` does not fit in 16 bits", s))
}

fn print_registers(cpu: &Cpu8086<ArrayMemory>) {
    let r = &cpu.regs;
    println!(
        "AX={:04X} BX={:04X} CX={:04X} DX={:04X} SP={:04X} BP={:04X} SI={:04X} DI={:04X}",
        r.reg16(AX),
        r.reg16(BX),
        r.reg16(CX),
        r.reg16(DX),
        r.reg16(SP),
        r.reg16(BP),
        r.reg16(SI),
        r.reg16(DI)
    );
    println!(
        "ES={:04X} CS={:04X} SS={:04X} DS={:04X} IP={:04X} FLAGS={:04X}",
        r.seg(ES),
        r.seg(CS),
        r.seg(SS),
        r.seg(DS),
        r.ip,
        r.flags
    );
}

fn print_screen(cpu: &Cpu8086<ArrayMemory>, address: u32) {
    let cells = cpu.memory.slice(address, SCREEN_COLS * SCREEN_ROWS);
    for row in cells.chunks(SCREEN_COLS) {
        let line: String = row
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { ' ' })
            .collect();
        println!("{}", line.trim_end());
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = EngineConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if args.timing {
        config.timing = TimingMode::Cycles;
    }
    config.reset.cs = args.cs;
    config.reset.ip = args.ip;
    config.apply_logging()?;

    let program = fs::read(&args.program)
        .with_context(|| format!("reading {}", args.program.display()))?;
    let load_at = Cpu8086::<ArrayMemory>::physical_address(args.cs, args.ip);
    log::info!(
        "loading {} bytes at {:04X}:{:04X} (physical {:05X})",
        program.len(),
        args.cs,
        args.ip,
        load_at
    );

    let mut cpu = Cpu8086::with_config(ArrayMemory::new(), &config)?;
    cpu.memory.load_program(load_at, &program);

    let steps = cpu.run(args.steps);
    match cpu.halt_reason() {
        Some(HaltReason::Hlt) => log::info!("halted after {} steps", steps),
        Some(HaltReason::Unmapped(op)) => {
            log::warn!("stopped on unmapped opcode {:02X} after {} steps", op, steps)
        }
        None => log::warn!("step limit of {} reached", args.steps),
    }

    if !args.quiet {
        print_registers(&cpu);
        if config.timing == TimingMode::Cycles {
            println!("{} steps, {} clocks", steps, cpu.clocks());
        } else {
            println!("{} steps", steps);
        }
    }
    if let Some(address) = args.screen {
        print_screen(&cpu, address);
    }

    let state = cpu.save_state()?;
    let mut f = File::create(&args.save)?;
    write!(f, "{}", serde_json::to_string_pretty(&state)?)?;
    Ok(())
}
