//! # Scull Host Daemon
//!
//! Main entry point for running command scripts against the scull device.

use sculld::{load_config, HostRuntime, HostRuntimeConfig};
use std::env;
use std::fs;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    let (config, show_log) = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(&args[0]);
        process::exit(1);
    });

    let mut runtime = HostRuntime::new(config).unwrap_or_else(|e| {
        eprintln!("Failed to load module: {}", e);
        process::exit(1);
    });

    let reports = match runtime.run() {
        Ok(reports) => reports,
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            process::exit(1);
        }
    };

    for report in &reports {
        println!("{}", report);
    }

    if show_log {
        for entry in runtime.log_entries() {
            let fields: Vec<String> = entry
                .fields
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect();
            eprintln!(
                "[{:?}] {}: {} {}",
                entry.level,
                entry.subsystem,
                entry.message,
                fields.join(" ")
            );
        }
    }
}

fn parse_args(args: &[String]) -> Result<(HostRuntimeConfig, bool), String> {
    let mut config = HostRuntimeConfig::default();
    let mut show_log = false;
    let mut capacity: Option<usize> = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --config".to_string());
                }
                config.scull = load_config(&args[i]).map_err(|e| e.to_string())?;
            }
            "--script" | "-s" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --script".to_string());
                }
                let script_path = &args[i];
                let script_text = fs::read_to_string(script_path)
                    .map_err(|e| format!("Failed to read script file: {}", e))?;
                config.script = Some(script_text);
            }
            "--capacity" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --capacity".to_string());
                }
                capacity = Some(
                    args[i]
                        .parse()
                        .map_err(|_| format!("Invalid capacity value: {}", args[i]))?,
                );
            }
            "--log" => {
                show_log = true;
            }
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other => {
                return Err(format!("Unknown option: {}", other));
            }
        }
        i += 1;
    }

    // Command-line capacity wins over the config file regardless of order
    if let Some(capacity) = capacity {
        config.scull.capacity = capacity;
    }

    Ok((config, show_log))
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>      JSON device configuration");
    eprintln!("  -s, --script <FILE>      Command script to run");
    eprintln!("  --capacity <BYTES>       Store capacity (default 1024)");
    eprintln!("  --log                    Print the device log to stderr");
    eprintln!("  -h, --help               Show this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} --script demos/round_trip.scull", program);
    eprintln!("  {} --capacity 64 --script demos/fill.scull --log", program);
}
