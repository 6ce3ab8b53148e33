//! Domain and device selection
//!
//! Turns what the user asked for (a name, a comma-separated id list, or an
//! interactive pick) into a validated domain name and a non-empty set of USB
//! ids that are present on the host right now.

use crate::inventory;
use crate::session::Hypervisor;
use common::{Error, Result};
use hostdev::{UsbDevice, UsbId};
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Argument value that asks for an interactive pick
pub const PROMPT_SENTINEL: &str = "?";

/// Interactive console capability
pub trait Prompter {
    /// Show `items` as `"<index>. <item>"`, ask `question`, return the answer line
    fn choose(&mut self, items: &[String], question: &str) -> Result<String>;

    /// Non-fatal diagnostic for the user
    fn report(&mut self, message: &str);
}

/// Prompter bound to stdin/stdout, diagnostics on stderr
#[derive(Debug, Default)]
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn choose(&mut self, items: &[String], question: &str) -> Result<String> {
        let mut stdout = io::stdout().lock();
        for (index, item) in items.iter().enumerate() {
            writeln!(stdout, "{}. {}", index, item)?;
        }
        write!(stdout, "{}", question)?;
        stdout.flush()?;

        let mut answer = String::new();
        let read = io::stdin().lock().read_line(&mut answer)?;
        if read == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no selection entered").into());
        }
        Ok(answer.trim_end_matches(['\r', '\n']).to_string())
    }

    fn report(&mut self, message: &str) {
        eprintln!("{}", message);
    }
}

fn wants_prompt(requested: Option<&str>) -> Option<&str> {
    requested
        .map(str::trim)
        .filter(|value| !value.is_empty() && *value != PROMPT_SENTINEL)
}

/// Resolve the target domain
///
/// A named domain must be defined on the hypervisor. Without a name (or with
/// `?`) the user picks by zero-based index or exact name.
pub fn resolve_domain(
    session: &dyn Hypervisor,
    requested: Option<&str>,
    prompter: &mut dyn Prompter,
) -> Result<String> {
    let domains = inventory::list_domains(session, false)?;

    if let Some(name) = wants_prompt(requested) {
        return if domains.iter().any(|d| d == name) {
            Ok(name.to_string())
        } else {
            Err(Error::UnknownDomain(name.to_string()))
        };
    }

    if domains.is_empty() {
        return Err(Error::NoDomains);
    }

    let answer = prompter.choose(&domains, "Pick the desired domain: ")?;
    let answer = answer.trim();

    if is_index(answer) {
        if let Some(domain) = answer.parse::<usize>().ok().and_then(|i| domains.get(i)) {
            return Ok(domain.clone());
        }
    }

    domains
        .into_iter()
        .find(|d| d == answer)
        .ok_or_else(|| Error::UnknownDomain(answer.to_string()))
}

/// Resolve the USB ids to act on
///
/// Every accepted id is present in `devices`. Rejected entries are reported
/// one by one and skipped; an empty result is fatal.
pub fn resolve_usb_ids(
    devices: &[UsbDevice],
    requested: Option<&str>,
    prompter: &mut dyn Prompter,
) -> Result<Vec<UsbId>> {
    let mut selected = Vec::new();

    match wants_prompt(requested) {
        Some(list) => {
            for token in split_list(list) {
                match find_device(devices, token) {
                    Some(id) => push_unique(&mut selected, id),
                    None => prompter.report(&format!("Invalid USB device: {}", token)),
                }
            }
        }
        None => {
            let items: Vec<String> = devices.iter().map(ToString::to_string).collect();
            let answer = prompter.choose(&items, "Pick the desired USB devices: ")?;

            for token in split_list(&answer) {
                if is_index(token) {
                    match token.parse::<usize>().ok().and_then(|i| devices.get(i)) {
                        Some(device) => push_unique(&mut selected, device.id),
                        None => prompter.report(&format!("Invalid option: {}", token)),
                    }
                } else {
                    match find_device(devices, token) {
                        Some(id) => push_unique(&mut selected, id),
                        None => prompter.report(&format!("Invalid USB device: {}", token)),
                    }
                }
            }
        }
    }

    if selected.is_empty() {
        return Err(Error::NoValidDevices);
    }

    debug!("Selected {} device(s)", selected.len());
    Ok(selected)
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|t| !t.is_empty())
}

fn is_index(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

fn find_device(devices: &[UsbDevice], token: &str) -> Option<UsbId> {
    let id: UsbId = token.parse().ok()?;
    devices.iter().any(|d| d.id == id).then_some(id)
}

fn push_unique(selected: &mut Vec<UsbId>, id: UsbId) {
    if !selected.contains(&id) {
        selected.push(id);
    }
}
