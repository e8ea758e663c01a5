use std::env;
use std::io::{self, Write};
use std::process;

use canary_stack::log::{LogSink, SharedLogSink};
use canary_stack::{stack_dump, stack_init, DumpLevel, DumpOptions, Element, LogConfig, Stack};
use rand::Rng;

const PUSHES: usize = 11;

fn main() {
    let level = match env::args().nth(1).map(|arg| arg.parse::<DumpLevel>()) {
        None => DumpLevel::All,
        Some(Ok(level)) => level,
        Some(Err(err)) => {
            eprintln!("{}", err);
            process::exit(2);
        }
    };
    let options = DumpOptions::with_level(level);

    // Library events, contract violations included, end up in log/log0.txt.
    let log = SharedLogSink::new(LogSink::open(LogConfig::default()));
    tracing_subscriber::fmt()
        .with_writer(log.clone())
        .with_max_level(tracing::Level::TRACE)
        .init();

    if let Err(err) = run(options) {
        eprintln!("example failed: {}", err);
        process::exit(1);
    }
}

fn run(options: DumpOptions) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut rng = rand::thread_rng();

    let mut numbers = Stack::<i32>::new();
    stack_dump!(&numbers, numbers.validate(), &mut out, options)?;

    stack_init!(numbers, 10, i32::copy)?;
    stack_dump!(&numbers, numbers.validate(), &mut out, options)?;

    for _ in 0..PUSHES {
        numbers.push(rng.gen_range(-1_000_000..1_000_000))?;
        stack_dump!(&numbers, numbers.validate(), &mut out, options)?;
    }

    for _ in 0..PUSHES {
        let top = numbers.pop()?;
        writeln!(out, "popped {}", top)?;
        stack_dump!(&numbers, numbers.validate(), &mut out, options)?;
    }

    numbers.destroy();
    stack_dump!(&numbers, numbers.validate(), &mut out, options)?;
    Ok(())
}
