use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;

use ecosim::ecosystem::demo::{DemoConfig, DemoPlugin};
use ecosim::ecosystem::{EcosystemConfigPlugin, EcosystemPlugin};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn setup_file_logging() -> String {
    let log_dir = PathBuf::from("logs");
    if !log_dir.exists() {
        fs::create_dir_all(&log_dir).expect("Failed to create logs directory");
    }

    cleanup_old_logs(&log_dir, 25);

    let now = chrono::Local::now();
    let log_filename = format!("ecosim_{}.log", now.format("%Y%m%d_%H%M%S"));
    let log_path_str = log_dir.join(&log_filename).to_string_lossy().to_string();

    // One file per run
    let file_appender = RollingFileAppender::new(Rotation::NEVER, &log_dir, &log_filename);

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bevy_ecs=info,ecosim=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    log_path_str
}

fn cleanup_old_logs(log_dir: &Path, keep_count: usize) {
    let Ok(entries) = fs::read_dir(log_dir) else {
        return;
    };
    let mut log_files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|s| s.starts_with("ecosim_") && s.ends_with(".log"))
        })
        .collect();

    // Oldest first
    log_files.sort_by_key(|e| e.metadata().ok().and_then(|m| m.modified().ok()));

    if log_files.len() > keep_count {
        for file in log_files.iter().take(log_files.len() - keep_count) {
            let _ = fs::remove_file(file.path());
        }
    }
}

/// `ecosim [run_ticks] [capture_tick]`; missing or unparsable values keep the defaults.
fn demo_config_from_args() -> DemoConfig {
    let mut args = std::env::args().skip(1);
    let mut config = DemoConfig::default();
    if let Some(run_ticks) = args.next().and_then(|a| a.parse().ok()) {
        config.run_ticks = run_ticks;
    }
    config.capture_tick = args.next().and_then(|a| a.parse().ok());
    config
}

fn main() {
    let log_file = setup_file_logging();
    let demo = demo_config_from_args();

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  Ecosim - Logging to file                                ║");
    println!("╠══════════════════════════════════════════════════════════╣");
    println!("║  Log file: {:<45} ║", log_file);
    println!("║  Ticks: {:<48} ║", demo.run_ticks);
    println!("╚══════════════════════════════════════════════════════════╝");

    App::new()
        // No LogPlugin in MinimalPlugins; the subscriber above is the only one.
        .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(1.0 / 240.0))))
        .insert_resource(demo)
        .add_plugins((EcosystemConfigPlugin, EcosystemPlugin, DemoPlugin))
        .run();
}
