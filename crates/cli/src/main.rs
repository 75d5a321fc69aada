//! vulsim CLI.
//!
//! Two modes: 1. **Direct run** — load a flat binary and execute it on the
//! pipeline simulator standalone, printing a stats summary on halt. 2.
//! **Serve** — open an in-memory project and bind the command socket (§6.1)
//! and log socket (§6.2) a front-end talks to.

use std::io::{BufWriter, Write};
use std::net::{TcpListener, TcpStream};
use std::process;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};

use vulsim_engine::operation::{Dispatcher, OperationRegistry};
use vulsim_engine::project::Project;
use vulsim_engine::protocol::{read_frame, write_frame, LogRecord, OperationRequest};
use vulsim_engine::simulation::SimulationManager;
use vulsim_hw::cpu::HaltOnTrap;
use vulsim_hw::{Cpu, SimConfig};

#[derive(Parser, Debug)]
#[command(name = "vulsim", author, version, about = "RISC-V pipeline simulator and hardware-design project engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a bare-metal binary directly on the pipeline simulator.
    Run {
        /// Flat binary image, loaded at the simulator's RAM base.
        #[arg(short, long)]
        file: String,
        /// Upper bound on ticks before giving up.
        #[arg(long, default_value_t = 10_000_000)]
        max_cycles: u64,
    },
    /// Serve the project engine's command and log sockets.
    Serve {
        /// Name of the freshly opened in-memory project.
        #[arg(long, default_value = "untitled")]
        name: String,
        /// Command-socket bind address (§6.1).
        #[arg(long, default_value = "127.0.0.1:9710")]
        command_addr: String,
        /// Log-socket bind address (§6.2).
        #[arg(long, default_value = "127.0.0.1:9711")]
        log_addr: String,
    },
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { file, max_cycles } => cmd_run(&file, max_cycles),
        Commands::Serve { name, command_addr, log_addr } => cmd_serve(name, &command_addr, &log_addr),
    }
}

/// Loads `file` at the simulator's RAM base and ticks until halt, a trap the
/// default hook declines to resume, or `max_cycles` is exhausted.
fn cmd_run(file: &str, max_cycles: u64) {
    let image = std::fs::read(file).unwrap_or_else(|e| {
        eprintln!("error reading '{file}': {e}");
        process::exit(1);
    });

    let sim_config = SimConfig::default();
    let mut cpu = Cpu::new(&sim_config, sim_config.ram_base);
    cpu.load_image(&image);
    let mut hook = HaltOnTrap;

    println!("[*] direct execution: {file}");
    let mut halted = false;
    for _ in 0..max_cycles {
        if cpu.tick(&mut hook) {
            halted = true;
            break;
        }
    }

    println!("{:#?}", cpu.stats);
    if !halted {
        eprintln!("cycle budget exhausted before halt");
        process::exit(1);
    }
}

/// Opens a fresh project and serves the command socket (dispatching
/// operations against it behind a mutex) and the log socket (fanning out
/// the project's simulation log bus to every connected subscriber) until
/// killed.
fn cmd_serve(name: String, command_addr: &str, log_addr: &str) {
    let project = Arc::new(Mutex::new(Project::new(name, Vec::new())));
    let registry = Arc::new(OperationRegistry::with_builtins());
    let simulation = Arc::clone(&project.lock().unwrap_or_else(std::sync::PoisonError::into_inner).simulation);

    let log_subscribers: Arc<Mutex<Vec<TcpStream>>> = Arc::new(Mutex::new(Vec::new()));
    let log_bus_subscribers = Arc::clone(&log_subscribers);
    let _ = std::thread::spawn(move || log_pump(&simulation, &log_bus_subscribers));

    let log_listener = TcpListener::bind(log_addr).unwrap_or_else(|e| {
        eprintln!("failed to bind log socket {log_addr}: {e}");
        process::exit(1);
    });
    let accept_subscribers = Arc::clone(&log_subscribers);
    let _ = std::thread::spawn(move || {
        for stream in log_listener.incoming().filter_map(Result::ok) {
            accept_subscribers.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(stream);
        }
    });

    let command_listener = TcpListener::bind(command_addr).unwrap_or_else(|e| {
        eprintln!("failed to bind command socket {command_addr}: {e}");
        process::exit(1);
    });
    tracing::info!(command_addr, log_addr, "vulsim engine serving");

    for stream in command_listener.incoming().filter_map(Result::ok) {
        let project = Arc::clone(&project);
        let registry = Arc::clone(&registry);
        let _ = std::thread::spawn(move || serve_command_connection(stream, &project, &registry));
    }
}

/// Services one command-socket client until it disconnects, serialising
/// every request through the shared project mutex (§6.1: the command
/// socket runs on its own thread and serialises operations through a mutex
/// guarding the project).
fn serve_command_connection(mut stream: TcpStream, project: &Mutex<Project>, registry: &OperationRegistry) {
    let dispatcher = Dispatcher::new(registry);
    let peer = stream.peer_addr().map(|a| a.to_string()).unwrap_or_default();
    loop {
        let request: OperationRequest = match read_frame(&mut stream) {
            Ok(request) => request,
            Err(_) => break,
        };
        let response = {
            let mut project = project.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            match request.name.as_str() {
                "project.undo" => dispatcher.undo_last(&mut project),
                "project.redo" => dispatcher.redo_last(&mut project),
                _ => dispatcher.do_operation(&mut project, &request),
            }
        };
        if write_frame(&mut stream, &response).is_err() {
            break;
        }
    }
    tracing::debug!(%peer, "command connection closed");
}

/// The log bus's single consumer (§4.8.4): blocks for new records, then
/// fans each one out to every currently-connected log-socket subscriber,
/// dropping any that error on write.
fn log_pump(simulation: &SimulationManager, subscribers: &Mutex<Vec<TcpStream>>) {
    loop {
        let records: Vec<LogRecord> = simulation.log().drain_blocking();
        let mut subs = subscribers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        subs.retain_mut(|stream| {
            let mut writer = BufWriter::new(&mut *stream);
            records.iter().all(|record| write_frame(&mut writer, record).is_ok()) && writer.flush().is_ok()
        });
    }
}
