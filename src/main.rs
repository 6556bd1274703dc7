use audioled_lib::cli::Args;
use audioled_lib::control::LoopCommand;
use audioled_lib::state::StopReason;
use audioled_lib::{audio, exit_code, protocol, run_session};
use clap::Parser;
use std::process::ExitCode;
use std::sync::mpsc;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.list {
        return list_devices();
    }

    let config = match args.to_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return ExitCode::from(2);
        }
    };

    let (command_tx, command_rx) = mpsc::channel();

    let interrupt_tx = command_tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Stopping...");
                let _ = interrupt_tx.send(LoopCommand::Stop);
            }
            Err(e) => log::warn!("Interrupt handler unavailable: {}", e),
        }
    });

    // The loop blocks on audio and serial I/O, so it gets its own thread
    let result = tokio::task::spawn_blocking(move || run_session(&config, command_rx)).await;
    drop(command_tx);

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            log::error!("Control loop aborted: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match &result {
        Ok(outcome) => match &outcome.reason {
            StopReason::Interrupted => log::info!("Stopped"),
            StopReason::LinkFailure(e) => log::error!("Lost connection to controller: {}", e),
        },
        Err(e) => log::error!("Startup failed: {}", e),
    }

    ExitCode::from(exit_code(&result))
}

fn list_devices() -> ExitCode {
    match audio::list_sources() {
        Ok(sources) => {
            println!("Capture devices:");
            for source in sources {
                let marker = if source.is_default { " (default)" } else { "" };
                println!("  {}{}", source.name, marker);
            }
        }
        Err(e) => log::warn!("Failed to list capture devices: {}", e),
    }

    match protocol::list_ports() {
        Ok(ports) => {
            println!("Serial ports:");
            for port in ports {
                println!("  {}", port);
            }
        }
        Err(e) => log::warn!("Failed to list serial ports: {}", e),
    }

    ExitCode::SUCCESS
}
