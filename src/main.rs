use arpbridge::capture::{AfPacketSocket, Capture};
use arpbridge::config::{self, Cli, Settings, SettingsFile};
use arpbridge::dataplane::Bridge;
use arpbridge::telemetry::{init_logging, MetricsRegistry};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

fn main() {
    let cli = Cli::parse();

    let file = match cli.config.as_deref() {
        Some(path) => match config::load(path) {
            Ok(file) => file,
            Err(e) => {
                // Logging is not up yet
                eprintln!("[ERROR] Failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => SettingsFile::default(),
    };

    init_logging(Some(&file.logging));

    let settings = Settings::from_cli(cli, file);

    if let Err(e) = cmd_run(settings) {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

fn cmd_run(settings: Settings) -> Result<(), String> {
    use tokio::runtime::Builder;

    let rt = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to create runtime: {}", e))?;

    rt.block_on(async move {
        info!("Binding to interface {}...", settings.interface);
        let socket = AfPacketSocket::bind(&settings.interface).map_err(|e| {
            format!(
                "Failed to bind to {}: {}. Run with root privileges.",
                settings.interface, e
            )
        })?;

        let interface_mac = socket
            .hardware_addr()
            .map_err(|e| format!("Failed to read MAC of {}: {}", settings.interface, e))?;

        let (book, policy) = settings.resolve(interface_mac);

        let result = config::validate(&settings, &book);
        result.print_diagnostics();
        if result.has_errors() {
            return Err(format!(
                "Configuration has {} error(s)",
                result.errors.len()
            ));
        }

        info!(
            "Interface {} (index {}), MAC {}",
            socket.ifname(),
            socket.ifindex(),
            interface_mac
        );
        info!(
            "Remote  {} at {}",
            book.remote().mac,
            book.remote().ip
        );
        info!(
            "Gateway {} at {}",
            book.gateway().mac,
            book.gateway().ip
        );
        info!("Bridge  {}", book.virtual_mac());
        if policy.filter.is_active() {
            let ports: Vec<u16> = policy.filter.ports().collect();
            info!("Filter ports {:?} ({:?})", ports, policy.filter.polarity());
        }
        if let Some(target) = policy.redirect.target(&book) {
            info!("Redirecting filtered traffic to {}", target);
        }

        if !policy.forwarding_enabled {
            warn!("Not forwarding traffic between entities");
        }
        if policy.own_mac_mode {
            warn!(
                "Bridging with this host's own MAC {}; it will also see the \
                 hosts' traffic addressed to it and may answer on their behalf",
                interface_mac
            );
        }

        let metrics = Arc::new(MetricsRegistry::new());
        let bridge = Bridge::new(socket, book, policy, settings.timers(), metrics);

        let reason = bridge.run().await.map_err(|e| e.to_string())?;
        info!(?reason, "arpbridge exiting");
        Ok(())
    })
}
