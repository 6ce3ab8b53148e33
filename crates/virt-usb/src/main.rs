//! virt-usb
//!
//! Attach host USB devices to libvirt domains from the command line or from
//! a udev rule.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use common::setup_logging;
use hostdev::Operation;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use virt_usb::executor::join_ids;
use virt_usb::{
    AttachmentRequest, Config, ConsolePrompter, DeviceLister, HotplugEvent, HotplugOutcome,
    Hypervisor, IgnoreList, Lsusb, Prompter, Report, connect, inventory, resolve_domain,
    resolve_usb_ids,
};

#[derive(Parser, Debug)]
#[command(name = "virt-usb")]
#[command(
    author,
    version,
    about = "Attach and detach host USB devices to libvirt domains"
)]
#[command(long_about = "
Attach and detach host USB devices to libvirt domains.

EXAMPLES:
    # List defined domains
    virt-usb -l

    # List host USB devices
    virt-usb -u

    # Attach two devices to a domain
    virt-usb -a win10 046d:c52b,1050:0407

    # Pick domain and devices interactively
    virt-usb -a

    # Reattach (detach, then attach) a device
    virt-usb -a -d win10 046d:c52b

    # From a udev rule: attach on add, detach on remove
    virt-usb --udev

CONFIGURATION:
    The tool looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/virt-usb/config.toml
    3. /etc/virt-usb/config.toml
    4. Built-in defaults
")]
struct Args {
    /// List domains - only names for now
    #[arg(short = 'l', long)]
    list_domains: bool,

    /// List USB devices
    #[arg(short = 'u', long)]
    list_usb: bool,

    /// Attach USB device(s)
    #[arg(short = 'a', long)]
    attach_usb: bool,

    /// Detach USB device(s)
    #[arg(short = 'd', long)]
    detach_usb: bool,

    /// Auto attach/detach the device of a udev event (PRODUCT, ACTION)
    #[arg(long)]
    udev: bool,

    /// Target domain ("?" to pick interactively)
    #[arg(value_name = "DOMAIN")]
    domain: Option<String>,

    /// Comma-separated USB ids ("?" to pick interactively)
    #[arg(value_name = "USB_ID1,USB_ID2")]
    usb: Option<String>,

    /// libvirt connection URI
    #[arg(short = 'c', long = "connect", value_name = "URI")]
    uri: Option<String>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

/// What a single invocation does; only the first applicable one runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Hotplug,
    Apply(Operation),
    ListDomains,
    ListUsb,
}

impl Action {
    fn from_args(args: &Args) -> Option<Self> {
        if args.udev {
            return Some(Self::Hotplug);
        }
        if let Some(operation) = Operation::from_flags(args.attach_usb, args.detach_usb) {
            return Some(Self::Apply(operation));
        }
        if args.list_domains {
            return Some(Self::ListDomains);
        }
        if args.list_usb {
            return Some(Self::ListUsb);
        }
        None
    }
}

fn main() -> ExitCode {
    if std::env::args_os().len() <= 1 {
        print_usage();
        return ExitCode::FAILURE;
    }

    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    eprintln!("{}", Args::command().render_help());
}

fn run(args: Args) -> Result<ExitCode> {
    // Handle --save-config flag early (before loading config)
    if args.save_config {
        let path = Config::default_path();
        Config::default()
            .save(&path)
            .context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = if let Some(ref path) = args.config {
        Config::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        Config::load_or_default()
    };

    if let Some(uri) = &args.uri {
        config.connection.uri = uri.clone();
    }

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.general.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    debug!("virt-usb v{}", env!("CARGO_PKG_VERSION"));

    let Some(action) = Action::from_args(&args) else {
        print_usage();
        return Ok(ExitCode::FAILURE);
    };

    let lister = Lsusb::new(&config.usb.list_command);

    match action {
        Action::Hotplug => hotplug_mode(&config, args.domain.as_deref())?,
        Action::Apply(operation) => {
            let session = connect(&config.connection)?;
            let report = apply_mode(
                session.as_ref(),
                &lister,
                &mut ConsolePrompter,
                operation,
                args.domain.as_deref(),
                args.usb.as_deref(),
            )?;
            for line in report.summary() {
                println!("{}", line);
            }
        }
        Action::ListDomains => {
            let session = connect(&config.connection)?;
            list_domains_mode(session.as_ref())?
        }
        Action::ListUsb => list_usb_mode(&lister)?,
    }

    Ok(ExitCode::SUCCESS)
}

/// Print every defined domain, one per line
fn list_domains_mode(session: &dyn Hypervisor) -> Result<()> {
    for domain in inventory::list_domains(session, false)? {
        println!("{}", domain);
    }
    Ok(())
}

/// Print every host USB device as "<tag> (<id>)"
fn list_usb_mode(lister: &dyn DeviceLister) -> Result<()> {
    for device in lister.list_devices()? {
        println!("{}", device);
    }
    Ok(())
}

/// Attach, detach or reattach the selected devices
fn apply_mode(
    session: &dyn Hypervisor,
    lister: &dyn DeviceLister,
    prompter: &mut dyn Prompter,
    operation: Operation,
    domain: Option<&str>,
    usb: Option<&str>,
) -> Result<Report> {
    let domain = resolve_domain(session, domain, prompter)?;
    let devices = lister.list_devices()?;
    let ids = resolve_usb_ids(&devices, usb, prompter)?;

    println!("Domain: {}", domain);
    println!("USB devices: {}", join_ids(&ids));

    let request = AttachmentRequest {
        domain,
        devices: ids,
        operation,
    };
    Ok(virt_usb::apply(session, &request)?)
}

/// Handle the udev event found in the environment
fn hotplug_mode(config: &Config, domain: Option<&str>) -> Result<()> {
    let event = HotplugEvent::from_env()?;
    let ignore_path = config.usb.ignore_list_path();
    let ignore = IgnoreList::load(&ignore_path)
        .with_context(|| format!("Failed to read ignore list: {}", ignore_path.display()))?;

    let session = connect(&config.connection)?;
    let requested = domain.or(config.hotplug.domain.as_deref());

    match virt_usb::hotplug::handle_event(session.as_ref(), &event, requested, &ignore)? {
        HotplugOutcome::Attached { domain, id } => info!("{} attached to {}", id, domain),
        HotplugOutcome::Detached { domain, id } => info!("{} detached from {}", id, domain),
        HotplugOutcome::Ignored(id) => debug!("{} ignored", id),
        HotplugOutcome::Skipped(action) => debug!("action '{}' skipped", action),
    }
    Ok(())
}
