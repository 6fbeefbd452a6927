use clap::{Parser, Subcommand, ValueEnum};
use fancontroller::config::{AppConfig, ConfigLoader};
use fancontroller::protocol::{Config, SensorTypes, Status};
use fancontroller::session::{ChannelObserver, Session, SessionEvent, SessionOptions};
use fancontroller::{logging, AppError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;
use tracing::{info, warn};

/// How long `query` and `apply` wait for the controller to answer.
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "fancontroller",
    version,
    about = "Monitor and configure a four-channel fan controller over a serial port.",
    long_about = "Connects to the fan controller board, waits for its first status report and then streams status updates, prints its configuration or applies a new one. PORT defaults to the last port that connected successfully."
)]
struct Args {
    /// Configuration file to use instead of the standard search path.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Raise log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream status and configuration updates until Ctrl+C.
    Monitor {
        /// Serial port, e.g. COM3 or /dev/ttyUSB0.
        port: Option<String>,
    },
    /// Print the controller configuration.
    Query {
        port: Option<String>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Toml)]
        format: OutputFormat,
    },
    /// Send a configuration file (TOML, as printed by `query`) to the controller.
    Apply {
        port: Option<String>,

        #[arg(short, long)]
        file: PathBuf,
    },
    /// Print the configuration file location.
    ConfigPath,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Toml,
    Json,
}

// --- Main Application Entry Point ---
#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut loader = match load_config(args.config.as_deref()) {
        Ok(loader) => loader,
        Err(e) => {
            eprintln!("Warning: Failed to load config, using defaults: {e}");
            ConfigLoader::with_defaults()
        }
    };

    if let Err(e) = logging::init(&loader.config().logging, args.verbose) {
        eprintln!("Warning: Failed to open log file: {e}");
    }

    match run(args.command, &mut loader).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ConfigLoader, AppError> {
    Ok(match path {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    })
}

async fn run(command: Command, loader: &mut ConfigLoader) -> Result<(), AppError> {
    match command {
        Command::ConfigPath => {
            match loader.target_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("(no configuration directory available)"),
            }
            Ok(())
        }
        Command::Monitor { port } => {
            let link = Link::connect(loader, port).await?;
            let outcome = monitor(&link, loader.config()).await;
            link.shutdown().await;
            outcome
        }
        Command::Query { port, format } => {
            let link = Link::connect(loader, port).await?;
            let outcome = query(&link, format).await;
            link.shutdown().await;
            outcome
        }
        Command::Apply { port, file } => {
            let text = std::fs::read_to_string(&file)?;
            let desired: Config = toml::from_str(&text)?;
            let link = Link::connect(loader, port).await?;
            let outcome = apply(&link, desired).await;
            link.shutdown().await;
            outcome
        }
    }
}

/// A connected session plus the receiving end of its notifications.
struct Link {
    port: String,
    session: Arc<Session>,
    events: tokio::sync::Mutex<UnboundedReceiver<SessionEvent>>,
}

impl Link {
    async fn connect(loader: &mut ConfigLoader, port: Option<String>) -> Result<Self, AppError> {
        let port = port
            .or_else(|| loader.config().last_port().map(str::to_string))
            .ok_or(AppError::NoPort)?;

        let (observer, events) = ChannelObserver::channel();
        let options = SessionOptions::from(&loader.config().serial);
        let session = Arc::new(Session::with_system_ports(Arc::new(observer), options));

        let connecting = Arc::clone(&session);
        let target = port.clone();
        blocking(move || connecting.connect(&target)).await??;

        if loader.config_mut().remember_port(&port) {
            match loader.save() {
                Ok(path) => info!("Remembered {} in {}", port, path.display()),
                Err(e) => warn!("Could not save configuration: {}", e),
            }
        }

        Ok(Self {
            port,
            session,
            events: tokio::sync::Mutex::new(events),
        })
    }

    /// Next notification, or an error once `deadline` passes.
    async fn next_event(
        &self,
        deadline: Instant,
        what: &'static str,
    ) -> Result<SessionEvent, AppError> {
        let mut events = self.events.lock().await;
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Some(SessionEvent::ReadError(message))) => Err(AppError::Disconnected(message)),
            Ok(Some(SessionEvent::ConnectionError { message, .. })) => {
                Err(AppError::Disconnected(message))
            }
            Ok(Some(event)) => Ok(event),
            Ok(None) => Err(AppError::Disconnected("session closed".to_string())),
            Err(_) => Err(AppError::Timeout(what)),
        }
    }

    /// Wait for a configuration frame from the device itself, skipping the
    /// placeholder published at connect time.
    async fn next_device_config(&self, deadline: Instant) -> Result<Arc<Config>, AppError> {
        loop {
            if let SessionEvent::ConfigUpdated(config) =
                self.next_event(deadline, "the controller configuration").await?
            {
                if self.is_device_config(&config) {
                    return Ok(config);
                }
            }
        }
    }

    fn is_device_config(&self, config: &Arc<Config>) -> bool {
        self.session
            .config()
            .is_some_and(|stored| Arc::ptr_eq(&stored, config))
    }

    async fn shutdown(self) {
        let session = self.session;
        if blocking(move || session.stop()).await.is_err() {
            warn!("Stopping the session did not complete cleanly");
        }
    }
}

async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Io(std::io::Error::other(e)))
}

async fn monitor(link: &Link, app: &AppConfig) -> Result<(), AppError> {
    println!("Connected to {}. Press Ctrl+C to stop.", link.port);
    let mut sensors: Option<SensorTypes> = None;
    let mut events = link.events.lock().await;

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                println!();
                return Ok(());
            }
            event = events.recv() => match event {
                Some(SessionEvent::StatusUpdated(status)) => {
                    println!("{}", format_status(&status, sensors.as_ref(), app));
                }
                Some(SessionEvent::ConfigUpdated(config)) => {
                    if link.is_device_config(&config) {
                        sensors = Some(config.sensor_types);
                        println!("{}", format_config_summary(&config));
                    }
                }
                Some(SessionEvent::ApplyAccepted) => println!("Config successfully applied"),
                Some(SessionEvent::ApplyRejected(message)) => {
                    eprintln!("Controller error: {message}");
                }
                Some(SessionEvent::ConnectionError { message, .. }) => {
                    eprintln!("Error: {message}");
                }
                Some(SessionEvent::ReadError(message)) => {
                    return Err(AppError::Disconnected(message));
                }
                None => return Ok(()),
            }
        }
    }
}

async fn query(link: &Link, format: OutputFormat) -> Result<(), AppError> {
    let config = link
        .next_device_config(Instant::now() + REPLY_TIMEOUT)
        .await?;
    let text = match format {
        OutputFormat::Toml => toml::to_string_pretty(config.as_ref())
            .map_err(|e| AppError::InvalidInput(e.to_string()))?,
        OutputFormat::Json => serde_json::to_string_pretty(config.as_ref())?,
    };
    println!("{text}");
    Ok(())
}

async fn apply(link: &Link, desired: Config) -> Result<(), AppError> {
    let session = Arc::clone(&link.session);
    blocking(move || session.apply_config(&desired)).await??;

    let deadline = Instant::now() + REPLY_TIMEOUT;
    loop {
        match link.next_event(deadline, "the controller to accept the configuration").await? {
            SessionEvent::ApplyAccepted => break,
            SessionEvent::ApplyRejected(message) => return Err(AppError::Rejected(message)),
            _ => {}
        }
    }
    println!("Config successfully applied");

    let stored = link.next_device_config(Instant::now() + REPLY_TIMEOUT).await?;
    if *stored != desired {
        warn!("Controller stored a configuration that differs from the one sent");
        println!("{}", format_config_summary(&stored));
    }
    Ok(())
}

fn format_status(status: &Status, sensors: Option<&SensorTypes>, app: &AppConfig) -> String {
    let temps = status.temperatures;
    let readings = [
        ('A', temps.sensor_a),
        ('B', temps.sensor_b),
        ('C', temps.sensor_c),
        ('D', temps.sensor_d),
    ];
    let connected = sensors.map(SensorTypes::as_array);

    let mut parts = Vec::new();
    for (index, (label, value)) in readings.into_iter().enumerate() {
        if connected.map_or(true, |types| types[index].is_connected()) {
            parts.push(format!(
                "T{label} {value}°C ({}%)",
                app.temperature_percent(value)
            ));
        }
    }

    let outputs = status.outputs;
    let rpms = status.rpms;
    let fans = [
        (outputs.fan1, rpms.fan1_a, rpms.fan1_b),
        (outputs.fan2, rpms.fan2_a, rpms.fan2_b),
        (outputs.fan3, rpms.fan3_a, rpms.fan3_b),
        (outputs.fan4, rpms.fan4_a, rpms.fan4_b),
    ];
    for (index, (power, rpm_a, rpm_b)) in fans.into_iter().enumerate() {
        parts.push(format!(
            "F{} {}% {}/{} RPM ({}%)",
            index + 1,
            power.clamp(0, 100),
            rpm_a,
            rpm_b,
            app.rpm_percent(rpm_a.max(rpm_b))
        ));
    }

    parts.join(" | ")
}

fn format_config_summary(config: &Config) -> String {
    let mut lines = vec![format!("Sensors: {:?}", config.sensor_types.as_array())];
    for (index, fan) in config.fans.iter().enumerate() {
        lines.push(format!(
            "Fan {}: {:?}, {}..{}°C, min {}%{}, A={:?} B={:?}",
            index + 1,
            fan.sensor_control,
            fan.minimum_temperature,
            fan.maximum_temperature,
            fan.minimum_power,
            if fan.allow_stopped { ", may stop" } else { "" },
            fan.fan_type_a,
            fan.fan_type_b,
        ));
    }
    lines.join("\n")
}
