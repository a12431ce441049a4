use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use attendance_client::{
    api::ApiClient,
    biometric::NoBiometrics,
    config::ClientConfig,
    device::{register_device, HostDevice},
    error::{ClientError, Notice},
    location::{FixedPosition, LocationResolver},
    session::Session,
    state::{
        admin::{record_status, AdminConsole},
        attendance::{checkout_message, SessionTracker},
        auth::AuthFlow,
        profile::{initials, load_profile, update_profile_image},
    },
    utils::{
        storage::FileStorage,
        time::{format_clock_time, format_duration_hours, format_total_hours, now_in_tz},
    },
};

/// Attendance client: sign in, check in and out, and browse admin views.
#[derive(Parser, Debug)]
#[command(name = "attendance", version, about)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). Ignored when RUST_LOG is set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in.
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Clear the stored session.
    Logout,
    /// Register this device and print where the app would open.
    Launch,
    /// Show today's attendance.
    Today,
    /// Check in at the given position.
    CheckIn(PositionArgs),
    /// Check out at the given position.
    CheckOut(PositionArgs),
    /// Follow the elapsed timer of an open session.
    Watch {
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
    /// Show the cached profile and device info.
    Profile,
    /// Upload a JPEG as the profile picture.
    SetAvatar { path: PathBuf },
    /// Re-send this device's descriptors.
    Device,
    /// Biometric login settings.
    #[command(subcommand)]
    Biometric(BiometricCommand),
    /// Admin views.
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(clap::Args, Debug)]
struct PositionArgs {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
    /// Human-readable address; omitted from the request when absent.
    #[arg(long)]
    address: Option<String>,
}

impl PositionArgs {
    fn resolver(&self) -> LocationResolver {
        FixedPosition::new(self.lat, self.lon, self.address.clone()).resolver()
    }
}

#[derive(Subcommand, Debug)]
enum BiometricCommand {
    Status,
    Enable,
    Disable,
    /// Run the unlock gate.
    Unlock,
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    Stats,
    Users,
    User { id: String },
    /// Download the user spreadsheet into a directory.
    Export {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "attendance_client=info",
        1 => "attendance_client=debug",
        _ => "attendance_client=trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ClientConfig::load()?;
    tracing::debug!(
        api_base_url = %config.api_base_url,
        time_zone = %config.time_zone,
        storage_path = %config.storage_path.display(),
        "Loaded configuration from environment/.env"
    );

    let session = Session::new(Arc::new(FileStorage::new(config.storage_path.clone())));
    let api = ApiClient::new(&config, session).context("failed to build HTTP client")?;

    if let Err(err) = run(cli.command, api, &config).await {
        match err.downcast_ref::<ClientError>() {
            Some(client_err) => {
                eprintln!("{}", client_err.notice());
                tracing::debug!(code = client_err.code(), error = ?client_err, "Command failed");
                std::process::exit(1);
            }
            None => return Err(err),
        }
    }
    Ok(())
}

async fn run(command: Commands, api: ApiClient, config: &ClientConfig) -> anyhow::Result<()> {
    let tz = config.time_zone;
    match command {
        Commands::Login { email, password } => {
            let mut flow = AuthFlow::new(api);
            let destination = flow.login(&email, &password).await?;
            println!("{}", Notice::success("Signed in"));
            println!("Open {}", destination.path());
        }
        Commands::Signup {
            username,
            email,
            password,
        } => {
            let mut flow = AuthFlow::new(api);
            let destination = flow.signup(&username, &email, &password).await?;
            println!("{}", Notice::success("Account created"));
            println!("Open {}", destination.path());
        }
        Commands::Logout => {
            let destination = AuthFlow::new(api).logout().await;
            println!("Signed out. Open {}", destination.path());
        }
        Commands::Launch => {
            let destination = AuthFlow::new(api).launch(&HostDevice).await;
            println!("Open {}", destination.path());
        }
        Commands::Today => {
            let mut tracker = SessionTracker::new(api);
            tracker.fetch_today().await?;
            print_today(&tracker, tz);
        }
        Commands::CheckIn(position) => {
            let mut tracker = SessionTracker::new(api);
            tracker.fetch_today().await?;
            let record = tracker.check_in(&position.resolver()).await?;
            println!(
                "{}",
                Notice::success(format!(
                    "Checked in at {}",
                    format_clock_time(Some(record.checkin_time), tz)
                ))
            );
            print_today(&tracker, tz);
        }
        Commands::CheckOut(position) => {
            let mut tracker = SessionTracker::new(api);
            tracker.fetch_today().await?;
            let record = tracker.check_out(&position.resolver()).await?;
            println!("{}", Notice::success(checkout_message(&record)));
            print_today(&tracker, tz);
        }
        Commands::Watch { seconds } => {
            let mut tracker = SessionTracker::new(api);
            tracker.fetch_today().await?;
            let Some(mut elapsed) = tracker.subscribe_elapsed() else {
                println!("{}", tracker.status_line());
                return Ok(());
            };
            println!("{}", elapsed.borrow().as_str());
            let deadline = tokio::time::sleep(Duration::from_secs(seconds));
            tokio::pin!(deadline);
            loop {
                tokio::select! {
                    _ = &mut deadline => break,
                    changed = elapsed.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        println!("{}", elapsed.borrow().as_str());
                    }
                }
            }
            tracker.stop_elapsed();
        }
        Commands::Profile => {
            let profile = load_profile(api.session()).await;
            match &profile.user {
                Some(user) => println!(
                    "[{}] {} <{}> ({})",
                    profile.initials(),
                    user.username,
                    user.email,
                    user.role.as_str()
                ),
                None => println!("Not signed in"),
            }
            if let Some(image) = &profile.profile_image {
                println!("Avatar: {}", truncate(image, 64));
            }
            match &profile.device_info {
                Some(info) => {
                    for (category, entries) in info.categories() {
                        println!("{}", category);
                        for (label, value) in entries {
                            println!("  {}: {}", label, value);
                        }
                    }
                }
                None => println!("No device info recorded"),
            }
        }
        Commands::SetAvatar { path } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let stored = update_profile_image(&api, &bytes).await?;
            println!("{}", Notice::success("Profile picture updated"));
            println!("{}", truncate(&stored, 64));
        }
        Commands::Device => {
            let info = register_device(&api, &HostDevice).await?;
            println!(
                "Registered {} ({})",
                info.device_name.as_deref().unwrap_or("unknown device"),
                info.os_name.as_deref().unwrap_or("unknown OS")
            );
        }
        Commands::Biometric(command) => {
            let mut flow = AuthFlow::new(api);
            match command {
                BiometricCommand::Status => {
                    let enabled = flow.biometric_enabled().await?;
                    println!("Biometric login {}", on_off(enabled));
                }
                BiometricCommand::Enable | BiometricCommand::Disable => {
                    let wanted = matches!(command, BiometricCommand::Enable);
                    let enabled = flow.set_biometric_enabled(wanted).await?;
                    println!("Biometric login {}", on_off(enabled));
                }
                BiometricCommand::Unlock => {
                    let destination = flow.biometric_unlock(&NoBiometrics).await?;
                    println!("Open {}", destination.path());
                }
            }
        }
        Commands::Admin(command) => {
            let console = AdminConsole::open(api).await?;
            match command {
                AdminCommand::Stats => {
                    let stats = console.stats().await?;
                    println!(
                        "Users: {}  Admins: {}",
                        stats.total_users, stats.total_admins
                    );
                    for user in stats.recent_users {
                        println!("  {} <{}>", user.username, user.email);
                    }
                }
                AdminCommand::Users => {
                    for user in console.users().await? {
                        println!(
                            "{:>2}  {:<24} {:<32} {:<6} {}",
                            initials(&user.username),
                            user.username,
                            user.email,
                            user.role,
                            user.id
                        );
                    }
                }
                AdminCommand::User { id } => {
                    let detail = console.user_detail(&id).await?;
                    println!(
                        "{} <{}> ({})",
                        detail.user.username, detail.user.email, detail.user.role
                    );
                    println!(
                        "Last 30 days: {} over {} days; this month: {} days",
                        format_duration_hours(detail.statistics.total_hours_last30_days),
                        detail.statistics.attendance_days_last30_days,
                        detail.statistics.current_month_attendance
                    );
                    for record in &detail.attendance_history {
                        println!(
                            "  {}  {} - {}  {:<9} {}",
                            record
                                .checkin_time
                                .with_timezone(&tz)
                                .format("%Y-%m-%d"),
                            format_clock_time(Some(record.checkin_time), tz),
                            format_clock_time(record.checkout_time, tz),
                            record_status(record),
                            record
                                .total_hours
                                .map(format_duration_hours)
                                .unwrap_or_default()
                        );
                    }
                }
                AdminCommand::Export { dir } => {
                    let path = console.export_to(&dir).await?;
                    println!("{}", Notice::success(format!("Saved {}", path.display())));
                }
            }
        }
    }
    Ok(())
}

fn print_today(tracker: &SessionTracker, tz: chrono_tz::Tz) {
    println!("{}", now_in_tz(tz).format("%A, %B %-d, %Y"));
    println!("{}", tracker.status_line());
    if let Some(record) = &tracker.state().record {
        println!(
            "In: {}  Out: {}",
            format_clock_time(Some(record.checkin_time), tz),
            format_clock_time(record.checkout_time, tz)
        );
        if let Some(hours) = record.total_hours {
            println!("Total: {}h", format_total_hours(hours));
        }
    }
    if let Some(elapsed) = tracker.elapsed() {
        println!("Elapsed: {}", elapsed);
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        format!("{}...", value.chars().take(max).collect::<String>())
    }
}
