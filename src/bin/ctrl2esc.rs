// ctrl2esc CLI
// Supervisor for every keyboard, or a single device session when given a path

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use ctrl2esc_core::settings::default_settings_content;
use ctrl2esc_core::supervisor::{
    list_candidates, DeviceEnumerator, HotplugMonitor, ProcessLauncher, SysfsMonitor,
    SysfsScanner,
};
use ctrl2esc_core::{run_session, EvdevProbe, RemapPolicy, Settings, Supervisor};

/// How long one wait on the udev monitor may block before shutdown is rechecked
#[cfg(feature = "hotplug")]
const UDEV_POLL: Duration = Duration::from_millis(500);

/// Tap Left Ctrl alone for Escape; Escape becomes grave
#[derive(Parser, Debug)]
#[command(name = "ctrl2esc")]
#[command(version)]
#[command(about = "Tap Left Ctrl for Escape on every keyboard", long_about = None)]
struct Args {
    /// Remap only this event node and exit when it goes away
    #[arg(value_name = "DEVICE")]
    device: Option<PathBuf>,

    /// TOML settings file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// List input devices and whether they would be remapped, then exit
    #[arg(long)]
    list_devices: bool,

    /// Validate settings and exit
    #[arg(long)]
    check_config: bool,
}

impl Args {
    /// Arguments forwarded to every worker, ahead of its device path
    fn worker_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(ref config) = self.config {
            args.push(OsString::from("--config"));
            args.push(config.clone().into_os_string());
        }
        if self.verbose {
            args.push(OsString::from("--verbose"));
        }
        args
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

fn load_settings(config: Option<&Path>) -> Result<Settings> {
    match config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Settings::load_default().context("Failed to load default settings"),
    }
}

fn enumerator() -> Box<dyn DeviceEnumerator> {
    #[cfg(feature = "hotplug")]
    {
        Box::new(ctrl2esc_core::supervisor::UdevEnumerator)
    }
    #[cfg(not(feature = "hotplug"))]
    {
        Box::new(SysfsScanner::default())
    }
}

/// Hot-plug source and the longest single wait on it
fn monitor(settings: &Settings) -> Result<(Box<dyn HotplugMonitor>, Duration)> {
    #[cfg(feature = "hotplug")]
    {
        match ctrl2esc_core::supervisor::UdevMonitor::new() {
            Ok(monitor) => return Ok((Box::new(monitor), UDEV_POLL)),
            Err(e) => log::warn!("udev monitor unavailable ({}), polling sysfs instead", e),
        }
    }
    let monitor = SysfsMonitor::new(SysfsScanner::default())
        .context("Failed to scan /sys/class/input")?;
    Ok((Box::new(monitor), settings.rescan_interval()))
}

fn list_devices(settings: &Settings) -> Result<()> {
    let mut enumerator = enumerator();
    let verdicts = list_candidates(
        enumerator.as_mut(),
        &RemapPolicy::CTRL_TO_ESC,
        settings.device_filter(),
        &EvdevProbe,
    )
    .context("Failed to enumerate input devices")?;

    let remapped = verdicts.iter().filter(|(_, remap)| *remap).count();
    println!("Found {} input device(s), {} would be remapped:", verdicts.len(), remapped);
    for (candidate, remap) in &verdicts {
        let node = candidate
            .devnode
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        let mark = if *remap { "remap" } else { "skip " };
        println!("  [{}] {} ({})", mark, node, candidate.syspath.display());
    }
    Ok(())
}

fn check_config(args: &Args) -> Result<()> {
    let settings = load_settings(args.config.as_deref())?;
    match settings.source_path() {
        Some(path) => println!("Settings in {} are valid", path.display()),
        None => {
            println!("No settings file found, using defaults:");
            print!("{}", default_settings_content());
        }
    }
    Ok(())
}

fn supervise(args: &Args, settings: &Settings) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));

    // Set up signal handler for graceful shutdown
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals =
            Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handler")?;
        let shutdown = Arc::clone(&shutdown);
        std::thread::spawn(move || {
            if let Some(signal) = signals.forever().next() {
                log::info!("Received signal {}, shutting down", signal);
                shutdown.store(true, Ordering::SeqCst);
            }
        });
    }

    let launcher = ProcessLauncher::current_exe(args.worker_args())
        .context("Failed to locate the ctrl2esc executable")?;
    let supervisor = Supervisor::new(
        launcher,
        RemapPolicy::CTRL_TO_ESC,
        settings.device_filter().clone(),
        Box::new(EvdevProbe),
    );
    let _reaper = supervisor.spawn_reaper()?;

    // Subscribe before the initial scan so no device slips in between
    let (mut monitor, poll) = monitor(settings)?;

    let mut enumerator = enumerator();
    let launched = supervisor.scan(enumerator.as_mut())?;
    log::info!("Remapping {} keyboard(s)", launched);

    let result = supervisor.run(monitor.as_mut(), &shutdown, poll);

    let stopped = supervisor.shutdown();
    log::debug!("Stopped {} worker(s)", stopped);
    result.map_err(Into::into)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.check_config {
        return check_config(&args);
    }

    let settings = load_settings(args.config.as_deref())?;

    if args.list_devices {
        return list_devices(&settings);
    }

    if let Some(ref device) = args.device {
        let ok = run_session(device, &settings.session_options());
        std::process::exit(if ok { 0 } else { 1 });
    }

    supervise(&args, &settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["ctrl2esc", "--config", "/tmp/test.toml"]);

        assert_eq!(args.config, Some(PathBuf::from("/tmp/test.toml")));
        assert!(args.device.is_none());
        assert!(!args.verbose);
        assert!(!args.check_config);
        assert!(!args.list_devices);
    }

    #[test]
    fn test_args_worker_mode() {
        let args = Args::parse_from(["ctrl2esc", "-v", "/dev/input/event3"]);
        assert_eq!(args.device, Some(PathBuf::from("/dev/input/event3")));
        assert!(args.verbose);
    }

    #[test]
    fn test_worker_args_forward_config_and_verbosity() {
        let args = Args::parse_from(["ctrl2esc", "-c", "/etc/ctrl2esc.toml", "--verbose"]);
        assert_eq!(
            args.worker_args(),
            vec![
                OsString::from("--config"),
                OsString::from("/etc/ctrl2esc.toml"),
                OsString::from("--verbose"),
            ]
        );

        let args = Args::parse_from(["ctrl2esc"]);
        assert!(args.worker_args().is_empty());
    }

    #[test]
    fn test_worker_command_round_trips_through_parser() {
        let args = Args::parse_from(["ctrl2esc", "-c", "/etc/ctrl2esc.toml", "-v"]);
        let launcher = ProcessLauncher::new("ctrl2esc", args.worker_args());
        let line = launcher.command_line(Path::new("/dev/input/event7"));

        let worker = Args::parse_from(line);
        assert_eq!(worker.device, Some(PathBuf::from("/dev/input/event7")));
        assert_eq!(worker.config, args.config);
        assert!(worker.verbose);
    }
}
