//! CLI entry point for the lanreg-discover host discovery tool.

use std::sync::Arc;

use clap::Parser;

use lanreg_core::Target;
use lanreg_registry::{DryRunPublisher, RegistryClient, RegistryPublisher};

use lanreg_discover::config::{self, DiscoverConfig};
use lanreg_discover::fingerprint::NetProber;
use lanreg_discover::liveness::IcmpProber;
use lanreg_discover::logging::{self, LogFormat, LogOutput};
use lanreg_discover::orchestrator::{Discovery, ProbePlan};
use lanreg_discover::pipeline::run_once;
use lanreg_discover::services::ServiceNames;
use lanreg_discover::targets::{dedup_by_address, expand_cidr};
use lanreg_discover::zone::ZoneResolver;

#[derive(Parser)]
#[command(name = "lanreg-discover")]
#[command(about = "Discover LAN hosts and register their checks in Consul")]
struct Cli {
    /// Subnet to sweep (CIDR notation, e.g., 192.168.2.0/24).
    #[arg(short = 'n', long, conflicts_with = "zone", required_unless_present = "zone")]
    subnet: Option<String>,

    /// DNS zone to enumerate via zone transfer (e.g., hm.net).
    #[arg(short, long)]
    zone: Option<String>,

    /// Maximum probes in flight (overrides config).
    #[arg(long, alias = "threads")]
    concurrency: Option<usize>,

    /// Enable debug logging.
    #[arg(short = 'X', long)]
    debug: bool,

    /// Log format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Log destination.
    #[arg(short = 'l', long, value_enum, default_value_t = LogOutput::Stdout)]
    log_output: LogOutput,

    /// Print registrations as JSON lines instead of writing to Consul.
    #[arg(long)]
    dry_run: bool,

    /// Config file prefix (default: lanreg).
    #[arg(short, long, default_value = "lanreg")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.debug, cli.log_format, cli.log_output);

    let (mut discover_config, registry_config) = config::load(&cli.config)?;
    if let Some(concurrency) = cli.concurrency {
        discover_config.concurrency = concurrency;
    }

    // Build the publisher first so a bad registry config fails before probing.
    let publisher: Box<dyn RegistryPublisher> = if cli.dry_run {
        tracing::info!("Dry run: registrations will be printed, not published");
        Box::new(DryRunPublisher::stdout())
    } else {
        Box::new(RegistryClient::new(&registry_config)?)
    };

    let targets = resolve_targets(&cli, &discover_config).await?;

    let services = Arc::new(ServiceNames::load(&discover_config.services_db));
    let liveness = IcmpProber::new(discover_config.ping_count, discover_config.probe_timeout());
    let ports = NetProber::new(discover_config.probe_timeout(), discover_config.scheme, services)?;
    let plan = ProbePlan {
        tcp_ports: discover_config.tcp_ports.clone(),
        http_ports: discover_config.http_ports.clone(),
    };
    let discovery = Discovery::new(liveness, ports, plan, discover_config.concurrency);

    let summary = run_once(&discovery, targets, publisher.as_ref()).await;
    if summary.failed > 0 {
        tracing::warn!(failed = summary.failed, "Run finished with failed registrations");
    }

    Ok(())
}

async fn resolve_targets(cli: &Cli, config: &DiscoverConfig) -> anyhow::Result<Vec<Target>> {
    if let Some(subnet) = cli.subnet.as_deref() {
        let targets = expand_cidr(subnet)?;
        tracing::info!(subnet = %subnet, addresses = targets.len(), "Expanded subnet");
        return Ok(targets);
    }

    let domain = cli
        .zone
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("Specify --subnet or --zone"))?;
    let zone = ZoneResolver::new(&config.zone_tool).resolve(domain).await?;
    let targets = dedup_by_address(&zone);
    tracing::info!(
        domain = %domain,
        records = zone.len(),
        unique_addresses = targets.len(),
        "Deduplicated zone records"
    );
    Ok(targets)
}
