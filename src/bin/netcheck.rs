//! netcheck - installer network test helper CLI
//!
//! Runs the helpers of libnetcheck against a test VM by hand: query and set
//! the installer hostname, check NetworkManager state and profile files, and
//! run the pre-install connection scenario through a WebDriver browser.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libnetcheck::installer::{InstallerStep, WizardInstaller};
use libnetcheck::machine;
use libnetcheck::*;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "netcheck")]
#[command(version)]
#[command(about = "Installer network test helper - check NetworkManager state on a test VM", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host of the machine under test (overrides the configuration)
    #[arg(long)]
    host: Option<String>,

    /// Run commands on this host instead of over ssh
    #[arg(long)]
    local: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Installer hostname over D-Bus
    #[command(subcommand)]
    Hostname(HostnameCommands),

    /// Print the only network interface of the machine
    Iface,

    /// Check a device property (nmcli -g KEY device show IFACE)
    DeviceState {
        iface: String,
        key: String,
        expected: String,
        /// Expected value only has to be contained in the actual one
        #[arg(long)]
        substr: bool,
    },

    /// Check a connection property (nmcli -g KEY connection show NAME)
    ConSetting {
        name: String,
        key: String,
        expected: String,
        #[arg(long)]
        substr: bool,
        /// Check the profiles of this root instead of the live ones
        #[arg(long, conflicts_with = "sysroot")]
        root: Option<String>,
        /// Check the profiles of the installed system
        #[arg(long)]
        sysroot: bool,
    },

    /// Wait for a connection profile file to appear
    WaitProfile {
        name: String,
        /// Look in /run instead of /etc
        #[arg(long)]
        transient: bool,
        #[arg(long, default_value = "")]
        root: String,
    },

    /// Check the number of profile files with id=NAME ("" for any)
    CountProfiles {
        name: String,
        count: usize,
        #[arg(long)]
        transient: bool,
        #[arg(long, default_value = "")]
        root: String,
        /// Only search NAME.nmconnection
        #[arg(long)]
        file_name: Option<String>,
    },

    /// Remove the installer's default connection profiles
    Cleanup,

    /// Run the pre-install connection scenario in a WebDriver browser
    Preinstall {
        con_name: String,
        /// Interface (discovered when omitted)
        #[arg(long)]
        iface: Option<String>,
        /// Wizard step shown when the browser opens the installer
        #[arg(long, default_value = "installation-language")]
        start_step: InstallerStep,
    },
}

#[derive(Subcommand)]
enum HostnameCommands {
    /// Print the hostname property
    Get,
    /// Set the hostname property
    Set { hostname: String },
    /// Clear the hostname property
    Reset,
}

fn init_logging(cli: &Cli) {
    let log_level = if cli.verbose { "debug" } else { &cli.log_level };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("netcheck={},libnetcheck={}", log_level, log_level)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .init();
}

fn match_mode(substr: bool) -> MatchMode {
    if substr {
        MatchMode::Substring
    } else {
        MatchMode::Exact
    }
}

fn location(config: &NetcheckConfig, transient: bool, root: String) -> ProfileLocation {
    let base = if transient {
        ProfileLocation::transient()
    } else {
        ProfileLocation::at(config.paths.nm_connections_dir.as_str())
    };
    base.with_root(root)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => NetcheckConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => NetcheckConfig::default(),
    };
    if let Some(host) = cli.host {
        config.target.host = host;
    }
    if cli.local {
        config.target.local = true;
    }

    let target = machine::from_config(&config.target);

    match cli.command {
        Commands::Hostname(cmd) => {
            let client = HostnameClient::with_bus_address_file(target, &config.paths.bus_address_file)
                .await
                .context("reading installer bus address")?;
            match cmd {
                HostnameCommands::Get => println!("{}", client.get_hostname().await?),
                HostnameCommands::Set { hostname } => client.set_hostname(&hostname).await?,
                HostnameCommands::Reset => client.reset_hostname().await?,
            }
        }
        Commands::Iface => {
            let driver = NetworkUiDriver::from_config((), target, &config);
            println!("{}", driver.discover_interface().await?);
        }
        Commands::DeviceState { iface, key, expected, substr } => {
            let driver = NetworkUiDriver::from_config((), target, &config);
            driver
                .assert_device_state(&iface, &key, &expected, match_mode(substr))
                .await?;
            println!("ok");
        }
        Commands::ConSetting { name, key, expected, substr, root, sysroot } => {
            let driver = NetworkUiDriver::from_config((), target, &config);
            let root = if sysroot { Some(config.paths.sysroot.clone()) } else { root };
            let mut setting = ConnectionSetting::new(name, key, expected);
            setting.mode = match_mode(substr);
            driver
                .assert_connection_settings(&[setting], root.as_deref())
                .await?;
            println!("ok");
        }
        Commands::WaitProfile { name, transient, root } => {
            let driver = NetworkUiDriver::from_config((), target, &config);
            driver
                .wait_for_profile_file(&name, &location(&config, transient, root))
                .await?;
            println!("ok");
        }
        Commands::CountProfiles { name, count, transient, root, file_name } => {
            let driver = NetworkUiDriver::from_config((), target, &config);
            driver
                .count_profile_files(&name, count, &location(&config, transient, root), file_name.as_deref())
                .await?;
            println!("ok");
        }
        Commands::Cleanup => {
            let profiles = location(&config, false, String::new());
            let removed = remove_default_connections_in(&target, &profiles).await?;
            for id in removed {
                println!("{}", id);
            }
        }
        Commands::Preinstall { con_name, iface, start_step } => {
            let browser = WebDriverBrowser::connect(&config.browser, &config.wait)
                .await
                .context("starting WebDriver session")?;
            let result = preinstall(&browser, target, &config, &con_name, iface, start_step).await;
            if let Err(e) = browser.close().await {
                error!("Failed to close WebDriver session: {}", e);
            }
            result?;
            println!("ok");
        }
    }

    Ok(())
}

async fn preinstall(
    browser: &WebDriverBrowser,
    target: Box<dyn Machine>,
    config: &NetcheckConfig,
    con_name: &str,
    iface: Option<String>,
    start_step: InstallerStep,
) -> Result<()> {
    browser.open(&config.browser.base_url).await?;
    browser.wait_visible(&format!("#{}", start_step.id())).await?;

    let driver = NetworkUiDriver::from_config(browser, target, config);
    let iface = match iface {
        Some(iface) => iface,
        None => driver.discover_interface().await?,
    };
    info!("Using interface {}", iface);

    let installer = WizardInstaller::starting_at(browser, start_step);
    driver
        .run_preinstall_connection_scenario(&installer, &iface, con_name)
        .await?;
    Ok(())
}
