//! Intcode Emulator - CLI Entry Point
//!
//! Commands:
//! - `intcode-emu run <program>` - Run one machine with console I/O
//! - `intcode-emu chain <program>` - Linear amplifier chain
//! - `intcode-emu ring <program>` - Feedback ring

use clap::{Parser, Subcommand};
use intcode::{
    best_chain_signal, best_ring_signal, load_program, parse_program, run_chain, run_ring,
    ConsoleDevice, PipelineError, Processor, Word,
};

#[derive(Parser)]
#[command(name = "intcode-emu")]
#[command(version = "0.1.0")]
#[command(about = "An Intcode virtual machine with amplifier pipeline orchestration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program with console I/O (one integer per line)
    Run {
        /// Path to the program file (comma-separated integers)
        program: String,
        /// Print every executed instruction
        #[arg(short, long)]
        trace: bool,
    },
    /// Run the linear amplifier chain
    Chain {
        /// Path to the program file
        program: String,
        /// Comma-separated phase sequence; searches all permutations of
        /// 0-4 when omitted
        #[arg(short, long)]
        phases: Option<String>,
        /// Initial input signal for the first stage
        #[arg(short, long, default_value = "0")]
        signal: Word,
    },
    /// Run the feedback ring
    Ring {
        /// Path to the program file
        program: String,
        /// Comma-separated phase sequence; searches all permutations of
        /// 5-9 when omitted
        #[arg(short, long)]
        phases: Option<String>,
        /// Initial input signal seeded into channel 0
        #[arg(short, long, default_value = "0")]
        signal: Word,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { program, trace } => {
            run_console(&program, trace);
        }
        Commands::Chain {
            program,
            phases,
            signal,
        } => {
            run_pipeline(&program, phases.as_deref(), signal, run_chain, best_chain_signal);
        }
        Commands::Ring {
            program,
            phases,
            signal,
        } => {
            run_pipeline(&program, phases.as_deref(), signal, run_ring, best_ring_signal);
        }
    }
}

fn load_or_exit(path: &str) -> Vec<Word> {
    match load_program(path) {
        Ok(image) => {
            println!("📂 Loaded {} words from {}", image.len(), path);
            image
        }
        Err(e) => {
            eprintln!("❌ Failed to load program: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_console(path: &str, trace: bool) {
    let image = load_or_exit(path);
    let mut machine = Processor::with_program(&image, ConsoleDevice);

    println!();
    println!("━━━ Execution ━━━");

    while machine.is_running() {
        let pc = machine.pc();
        match machine.step() {
            Ok(opcode) => {
                if trace {
                    println!("{:05}: {:?}", pc, opcode);
                }
            }
            Err(e) => {
                eprintln!("❌ Machine fault: {}", e);
                std::process::exit(1);
            }
        }
    }

    println!();
    println!("━━━ Result ━━━");
    println!("Cycles: {}", machine.cycles());
    println!("State:  {:?}", machine.state());
}

fn run_pipeline(
    path: &str,
    phases: Option<&str>,
    signal: Word,
    run: fn(&[Word], &[Word], Word) -> Result<Word, PipelineError>,
    search: fn(&[Word]) -> Result<Word, PipelineError>,
) {
    let image = load_or_exit(path);

    let result = match phases {
        Some(text) => {
            let phases = match parse_program(text) {
                Ok(phases) => phases,
                Err(e) => {
                    eprintln!("❌ Bad phase sequence: {}", e);
                    std::process::exit(1);
                }
            };
            println!("🔧 Phases: {:?}, initial signal {}", phases, signal);
            run(&image, &phases, signal)
        }
        None => {
            println!("🔧 Searching all phase permutations");
            search(&image)
        }
    };

    match result {
        Ok(best) => {
            println!();
            println!("Signal: {}", best);
        }
        Err(e) => {
            eprintln!("❌ Pipeline failed: {}", e);
            std::process::exit(1);
        }
    }
}
