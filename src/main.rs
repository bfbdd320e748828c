use std::env;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use subleq16::{
    load_image, optimize, raw_program, Memory, Profiler, RunStatus, StatsReport, Stdio, Vm,
    OPCODE_COUNT,
};

#[derive(Debug, Clone, Copy)]
struct VmOptions {
    optimize: bool,
    stats: bool,
    profile: bool,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            stats: false,
            profile: false,
        }
    }
}

fn usage(program: &str) {
    eprintln!("Usage: {} <subleq.dec> [-O] [-s] [-p]", program);
    eprintln!("  -O    Disable optimization");
    eprintln!("  -s    Enable statistics");
    eprintln!("  -p    Enable lightweight profiler");
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("subleq16");

    let mut opts = VmOptions::default();
    let mut image_path: Option<&str> = None;
    for arg in &args[1..] {
        match arg.as_str() {
            "-O" => opts.optimize = false,
            "-s" => opts.stats = true,
            "-p" => opts.profile = true,
            other if image_path.is_none() && !other.starts_with('-') => {
                image_path = Some(other);
            }
            other => eprintln!("Warning: Ignoring extra argument '{}'", other),
        }
    }

    let Some(image_path) = image_path else {
        usage(program);
        return ExitCode::FAILURE;
    };

    let cells = match load_image(Path::new(image_path)) {
        Ok(cells) => cells,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let load_size = cells.len();
    let mem = Memory::from_image(&cells);

    let (insns, matches) = if opts.optimize {
        let result = optimize(&mem, load_size);
        (result.insns, result.matches)
    } else {
        eprintln!("Optimizations disabled. Running as basic interpreter.");
        (raw_program(&mem), [0u64; OPCODE_COUNT])
    };

    let profiler = if opts.profile {
        Profiler::enabled()
    } else {
        Profiler::disabled()
    };
    let mut vm = Vm::new(mem, insns, profiler);
    let mut console = Stdio::new();

    let started = Instant::now();
    let status = vm.run(&mut console);
    let elapsed = started.elapsed().as_secs_f64();

    if opts.stats {
        eprint!("{}", StatsReport::new(&matches, vm.exec_counts(), elapsed));
    }
    if opts.profile {
        let spots = vm.profiler().hot_spots(vm.insns());
        eprint!("{}", vm.profiler().summary(elapsed, &spots));
        let report_path = Path::new("profiler_report.txt");
        match vm
            .profiler()
            .write_report(report_path, elapsed, vm.exec_counts(), &spots)
        {
            Ok(()) => eprintln!(
                "\nDetailed profiler report saved to: {}",
                report_path.display()
            ),
            Err(e) => eprintln!("Warning: {}", e),
        }
    }

    match status {
        RunStatus::Halted | RunStatus::EndOfInput => ExitCode::SUCCESS,
        RunStatus::OutputFailed => {
            eprintln!("Error: output stream failed");
            ExitCode::FAILURE
        }
        // run() only returns once the machine has stopped.
        RunStatus::Running => ExitCode::SUCCESS,
    }
}
