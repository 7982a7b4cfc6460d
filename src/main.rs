use clap::{Arg, ArgAction, ArgMatches, Command};
use paymail_inspector::config::parse_timeout;
use paymail_inspector::resolver::parse_name_server;
use paymail_inspector::{ConfigError, InspectOptions, InspectionReport, Inspector, InspectorConfig};
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Exit status when a check ran and failed
const EXIT_CHECK_FAILED: i32 = 1;
/// Exit status for bad input or configuration
const EXIT_USAGE: i32 = 2;

fn cli() -> Command {
    let target = || {
        Arg::new("target")
            .value_name("DOMAIN|ADDRESS")
            .help("Domain or paymail address (alias@domain.tld)")
            .required(true)
    };

    Command::new("paymail-inspector")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect paymail host discovery (SRV) and DNSSEC for a domain")
        .subcommand_required(true)
        .arg(
            Arg::new("nameserver")
                .short('n')
                .long("nameserver")
                .value_name("IP[:PORT]")
                .help("DNS name server for every lookup (default 8.8.8.8)")
                .global(true),
        )
        .arg(
            Arg::new("network")
                .long("network")
                .value_name("udp|tcp")
                .help("Transport used to reach the name server")
                .global(true),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECONDS")
                .help("Per-query timeout")
                .global(true),
        )
        .arg(
            Arg::new("service")
                .short('s')
                .long("service")
                .value_name("NAME")
                .help("Service name in the SRV record")
                .global(true),
        )
        .arg(
            Arg::new("protocol")
                .long("protocol")
                .value_name("PROTO")
                .help("Protocol in the SRV record")
                .global(true),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Port expected in the SRV record")
                .value_parser(clap::value_parser!(u16))
                .global(true),
        )
        .arg(
            Arg::new("priority")
                .long("priority")
                .value_name("N")
                .help("Priority expected in the SRV record")
                .value_parser(clap::value_parser!(u16))
                .global(true),
        )
        .arg(
            Arg::new("weight")
                .short('w')
                .long("weight")
                .value_name("N")
                .help("Weight expected in the SRV record")
                .value_parser(clap::value_parser!(u16))
                .global(true),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the report as JSON")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("srv")
                .about("Discover and validate the SRV record of a domain")
                .arg(target()),
        )
        .subcommand(
            Command::new("dnssec")
                .about("Check the DS/DNSKEY delegation of a domain")
                .arg(target()),
        )
        .subcommand(
            Command::new("validate")
                .about("Run the SRV check, then DNSSEC and SSL on the SRV target")
                .arg(target())
                .arg(
                    Arg::new("skip-srv")
                        .long("skip-srv")
                        .help("Skip the SRV check of the domain")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("skip-dnssec")
                        .short('d')
                        .long("skip-dnssec")
                        .help("Skip the DNSSEC check of the target domain")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("skip-ssl")
                        .long("skip-ssl")
                        .help("Skip checking SSL of the target domain")
                        .action(ArgAction::SetTrue),
                ),
        )
}

/// Defaults, then `PAYMAIL_*` variables, then flags
fn build_config(matches: &ArgMatches) -> Result<InspectorConfig, ConfigError> {
    apply_flags(InspectorConfig::from_env()?, matches)
}

fn apply_flags(
    mut config: InspectorConfig,
    matches: &ArgMatches,
) -> Result<InspectorConfig, ConfigError> {
    if let Some(name_server) = matches.get_one::<String>("nameserver") {
        config.resolver.name_server = parse_name_server(name_server)?;
    }
    if let Some(network) = matches.get_one::<String>("network") {
        config.resolver.network = network.parse()?;
    }
    if let Some(timeout) = matches.get_one::<String>("timeout") {
        config.resolver.timeout = parse_timeout(timeout)?;
    }
    if let Some(service) = matches.get_one::<String>("service") {
        config.profile.service = service.trim().to_string();
    }
    if let Some(protocol) = matches.get_one::<String>("protocol") {
        config.profile.protocol = protocol.trim().to_lowercase();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        config.profile.port = *port;
    }
    if let Some(priority) = matches.get_one::<u16>("priority") {
        config.profile.priority = *priority;
    }
    if let Some(weight) = matches.get_one::<u16>("weight") {
        config.profile.weight = *weight;
    }

    config.validate()?;
    Ok(config)
}

/// Checks run by a subcommand
fn inspect_options(subcommand: &str, matches: &ArgMatches) -> Option<InspectOptions> {
    match subcommand {
        "srv" => Some(InspectOptions {
            skip_srv: false,
            skip_dnssec: true,
            skip_ssl: true,
        }),
        "dnssec" => Some(InspectOptions {
            skip_srv: true,
            skip_dnssec: false,
            skip_ssl: true,
        }),
        "validate" => Some(InspectOptions {
            skip_srv: matches.get_flag("skip-srv"),
            skip_dnssec: matches.get_flag("skip-dnssec"),
            skip_ssl: matches.get_flag("skip-ssl"),
        }),
        _ => None,
    }
}

fn exit_code(report: &InspectionReport) -> i32 {
    if report.is_success() {
        0
    } else {
        EXIT_CHECK_FAILED
    }
}

fn print_report(report: &InspectionReport, json: bool) -> i32 {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                return EXIT_CHECK_FAILED;
            }
        }
    } else {
        println!("{}", report);
    }

    exit_code(report)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("paymail_inspector=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    // Global flags are read from the subcommand, which sees them wherever
    // they were given on the command line
    let Some((sub, options)) = matches
        .subcommand()
        .and_then(|(name, sub)| inspect_options(name, sub).map(|options| (sub, options)))
    else {
        eprintln!("{}", cli().render_help());
        process::exit(EXIT_USAGE);
    };

    let config = match build_config(sub) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(EXIT_USAGE);
        }
    };
    let json = sub.get_flag("json");
    let inspector = Inspector::new(config);

    let Some(target) = sub.get_one::<String>("target") else {
        eprintln!("A domain or paymail address is required");
        process::exit(EXIT_USAGE);
    };

    let code = match inspector.inspect(target, options).await {
        Ok(report) => print_report(&report, json),
        Err(e) => {
            eprintln!("{}", e);
            EXIT_USAGE
        }
    };
    process::exit(code);
}
