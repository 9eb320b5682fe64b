//! Configuration validation

use super::Settings;
use crate::dataplane::AddressBook;
use tracing::{error, warn};

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn print_diagnostics(&self) {
        for warning in &self.warnings {
            warn!("{}", warning);
        }
        for err in &self.errors {
            error!("{}", err);
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate resolved settings and return warnings/errors
pub fn validate(settings: &Settings, book: &AddressBook) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_identities(book, &mut result);
    validate_redirect(settings, book, &mut result);
    validate_timers(settings, &mut result);
    validate_filter(settings, &mut result);

    result
}

fn validate_identities(book: &AddressBook, result: &mut ValidationResult) {
    let remote = book.remote();
    let gateway = book.gateway();
    let virtual_mac = book.virtual_mac();

    if remote.mac == gateway.mac {
        result.warn(format!(
            "remote and gateway share MAC {}; frames cannot be told apart",
            remote.mac
        ));
    }
    if virtual_mac == remote.mac || virtual_mac == gateway.mac {
        result.warn(format!(
            "bridge MAC {} belongs to one of the hosts being bridged",
            virtual_mac
        ));
    }
    if virtual_mac.is_multicast() {
        result.warn(format!(
            "bridge MAC {} is a group address; hosts may ignore it",
            virtual_mac
        ));
    }
    if remote.ip == gateway.ip {
        result.warn(format!("remote and gateway share IP {}", remote.ip));
    }
}

fn validate_redirect(settings: &Settings, book: &AddressBook, result: &mut ValidationResult) {
    if settings.redirect.target(book) == Some(book.virtual_mac()) {
        result.error(format!(
            "redirect target {} is the bridge MAC; redirected frames would loop back",
            book.virtual_mac()
        ));
    }
}

fn validate_timers(settings: &Settings, result: &mut ValidationResult) {
    if settings.timers.announce_interval_secs == 0 {
        result.error("timers.announce_interval_secs: must be at least 1");
    }
    if settings.timers.receive_timeout_secs == 0 {
        result.error("timers.receive_timeout_secs: must be at least 1");
    }
}

fn validate_filter(settings: &Settings, result: &mut ValidationResult) {
    if settings.filter_ports.contains(&0) {
        result.warn("filter port 0 only matches malformed packets");
    }
}
