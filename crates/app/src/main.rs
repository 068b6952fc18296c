use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dioxus::LaunchBuilder;
use dioxus::desktop::{Config as DesktopConfig, WindowBuilder};
use course_core::model::{CourseCatalog, CourseId};
use services::{
    AppServices, Clock, CourseListingService, PlaybackConfig, ProgressStore, load_catalog,
};
use storage::repository::{Storage, StorageKind};
use tracing_subscriber::EnvFilter;
use ui::{App, UiApp, build_app_context};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidMillis { flag: &'static str, raw: String },
    InvalidCourseId { raw: String },
    MissingCourse,
    NotAllowed { flag: &'static str, command: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidMillis { flag, raw } => {
                write!(f, "invalid {flag} value: {raw} (expected milliseconds)")
            }
            ArgsError::InvalidCourseId { raw } => write!(f, "invalid --course value: {raw:?}"),
            ArgsError::MissingCourse => write!(f, "status requires --course <id>"),
            ArgsError::NotAllowed { flag, command } => {
                write!(f, "{flag} is not supported by `{command}`")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_millis(raw: String, flag: &'static str) -> Result<Duration, ArgsError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .ok_or(ArgsError::InvalidMillis { flag, raw })
}

struct DesktopApp {
    services: AppServices,
}

impl UiApp for DesktopApp {
    fn progress(&self) -> Arc<ProgressStore> {
        self.services.progress()
    }

    fn listings(&self) -> Arc<CourseListingService> {
        self.services.listings()
    }

    fn playback_config(&self) -> PlaybackConfig {
        self.services.config()
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- ui     [options]");
    eprintln!("  cargo run -p app -- status --course <id> [options]");
    eprintln!("  cargo run -p app -- reset  [--course <id>] [--purchases] [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>     default sqlite:courses.sqlite3");
    eprintln!("  --catalog <path>      course catalog JSON (default: built-in demo catalog)");
    eprintln!("  --tick-ms <ms>        playback tick interval (default 1000)");
    eprintln!("  --poll-ms <ms>        course page refresh interval (default 3000)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  COURSE_DB_URL, COURSE_CATALOG, COURSE_TICK_MS, COURSE_POLL_MS, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Ui,
    Status,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "ui" => Some(Self::Ui),
            "status" => Some(Self::Status),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Ui => "ui",
            Self::Status => "status",
            Self::Reset => "reset",
        }
    }
}

struct Args {
    db_url: String,
    catalog: Option<PathBuf>,
    config: PlaybackConfig,
    course: Option<CourseId>,
    purchases: bool,
}

impl Args {
    /// Parses flags on top of the `COURSE_*` variables that `env` resolves.
    fn parse(
        cmd: Command,
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = normalize_sqlite_url(
            env("COURSE_DB_URL").unwrap_or_else(|| "sqlite:courses.sqlite3".into()),
        );
        let mut catalog = env("COURSE_CATALOG").map(PathBuf::from);
        let mut config = PlaybackConfig::default();
        if let Some(raw) = env("COURSE_TICK_MS") {
            config = config.with_tick_interval(parse_millis(raw, "COURSE_TICK_MS")?);
        }
        if let Some(raw) = env("COURSE_POLL_MS") {
            config = config.with_poll_interval(parse_millis(raw, "COURSE_POLL_MS")?);
        }
        let mut course = None;
        let mut purchases = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--catalog" => {
                    catalog = Some(PathBuf::from(require_value(args, "--catalog")?));
                }
                "--tick-ms" => {
                    let value = require_value(args, "--tick-ms")?;
                    config = config.with_tick_interval(parse_millis(value, "--tick-ms")?);
                }
                "--poll-ms" => {
                    let value = require_value(args, "--poll-ms")?;
                    config = config.with_poll_interval(parse_millis(value, "--poll-ms")?);
                }
                "--course" => {
                    if cmd == Command::Ui {
                        return Err(ArgsError::NotAllowed {
                            flag: "--course",
                            command: cmd.name(),
                        });
                    }
                    let value = require_value(args, "--course")?;
                    let parsed = CourseId::new(value.clone())
                        .map_err(|_| ArgsError::InvalidCourseId { raw: value })?;
                    course = Some(parsed);
                }
                "--purchases" => {
                    if cmd != Command::Reset {
                        return Err(ArgsError::NotAllowed {
                            flag: "--purchases",
                            command: cmd.name(),
                        });
                    }
                    purchases = true;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if cmd == Command::Status && course.is_none() {
            return Err(ArgsError::MissingCourse);
        }

        Ok(Self {
            db_url,
            catalog,
            config,
            course,
            purchases,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: launching UI when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Ui,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Ui,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, &mut iter, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let catalog = match parsed.catalog.as_deref() {
        Some(path) => load_catalog(path)?,
        None => CourseCatalog::demo(),
    };

    // Capability check: without a usable database the app still runs, but
    // progress is not persisted.
    let services = match prepare_sqlite_file(&parsed.db_url) {
        Ok(()) => {
            AppServices::sqlite_or_null(&parsed.db_url, catalog, Clock::system(), parsed.config)
                .await
        }
        Err(err) => {
            tracing::warn!(
                db_url = %parsed.db_url,
                error = %err,
                "cannot prepare database file; progress will not be saved"
            );
            AppServices::new(&Storage::null(), catalog, Clock::system(), parsed.config)
        }
    };
    tracing::info!(backend = ?services.storage_kind(), command = cmd.name(), "services ready");

    match cmd {
        Command::Ui => {
            let app: Arc<dyn UiApp> = Arc::new(DesktopApp { services });
            let context = build_app_context(&app);

            // On macOS, Dioxus/tao can default to an always-on-top window in some dev setups.
            let desktop_cfg = DesktopConfig::new().with_window(
                WindowBuilder::new()
                    .with_title("Courses")
                    .with_always_on_top(false),
            );

            LaunchBuilder::desktop()
                .with_cfg(desktop_cfg)
                .with_context(context)
                .launch(App);
            Ok(())
        }
        Command::Status => {
            let Some(course_id) = parsed.course else {
                return Err(ArgsError::MissingCourse.into());
            };
            print_status(&services, &course_id).await;
            Ok(())
        }
        Command::Reset => {
            if services.storage_kind() == StorageKind::Null {
                eprintln!("reset: no persistent storage available; nothing to reset");
                return Ok(());
            }
            let progress = services.progress();
            progress.reset_progress(parsed.course.as_ref()).await;
            if parsed.purchases {
                progress.reset_purchases().await;
            }
            match &parsed.course {
                Some(course_id) => println!("progress reset for {course_id}"),
                None => println!("progress reset for all courses"),
            }
            if parsed.purchases {
                println!("purchases reset");
            }
            Ok(())
        }
    }
}

async fn print_status(services: &AppServices, course_id: &CourseId) {
    let Some(listing) = services.listings().listing(course_id).await else {
        println!("{course_id}: not in catalog");
        return;
    };

    let progress = &listing.progress;
    println!(
        "{} ({}): {}% · {}/{} completed{}",
        listing.title,
        listing.course_id,
        progress.overall_progress,
        progress.videos_completed,
        progress.total_videos,
        if progress.purchased { " · purchased" } else { "" }
    );
    for video in &listing.videos {
        let status = if !video.unlocked {
            "locked".to_string()
        } else if video.completed {
            "completed".to_string()
        } else {
            format!("{}%", video.progress)
        };
        println!("  {}. {} [{status}]", video.index + 1, video.video.title);
    }
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(cmd: Command, raw: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = raw.iter().map(|s| (*s).to_string());
        Args::parse(cmd, &mut iter, |_| None)
    }

    #[test]
    fn environment_is_read_and_flags_override_it() {
        let env = |key: &str| match key {
            "COURSE_DB_URL" => Some("sqlite::memory:".to_string()),
            "COURSE_CATALOG" => Some("/srv/catalog.json".to_string()),
            "COURSE_TICK_MS" => Some("200".to_string()),
            _ => None,
        };
        let mut iter = ["--tick-ms", "700"].iter().map(|s| (*s).to_string());
        let args = Args::parse(Command::Ui, &mut iter, env).unwrap();

        assert_eq!(args.db_url, "sqlite::memory:");
        assert_eq!(args.catalog, Some(PathBuf::from("/srv/catalog.json")));
        assert_eq!(args.config.tick_interval(), Duration::from_millis(700));
        assert_eq!(args.config.poll_interval(), Duration::from_secs(3));
    }

    #[test]
    fn bad_environment_value_is_reported() {
        let env = |key: &str| (key == "COURSE_POLL_MS").then(|| "0".to_string());
        let mut iter = std::iter::empty::<String>();
        assert!(matches!(
            Args::parse(Command::Ui, &mut iter, env),
            Err(ArgsError::InvalidMillis { flag: "COURSE_POLL_MS", .. })
        ));
    }

    #[test]
    fn normalizes_relative_sqlite_paths() {
        let url = normalize_sqlite_url("sqlite:data/courses.sqlite3".into());
        assert!(url.starts_with("sqlite:///"), "{url}");
        assert!(url.ends_with("data/courses.sqlite3"), "{url}");
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }

    #[test]
    fn status_requires_course() {
        assert!(matches!(
            parse(Command::Status, &[]),
            Err(ArgsError::MissingCourse)
        ));
        let args = parse(Command::Status, &["--course", "shopify-starter"]).unwrap();
        assert_eq!(args.course.unwrap().as_str(), "shopify-starter");
    }

    #[test]
    fn purchases_flag_only_for_reset() {
        assert!(parse(Command::Reset, &["--purchases"]).unwrap().purchases);
        assert!(matches!(
            parse(Command::Status, &["--course", "a", "--purchases"]),
            Err(ArgsError::NotAllowed { .. })
        ));
    }

    #[test]
    fn timing_flags_reject_zero_and_garbage() {
        assert!(matches!(
            parse(Command::Ui, &["--tick-ms", "0"]),
            Err(ArgsError::InvalidMillis { .. })
        ));
        assert!(matches!(
            parse(Command::Ui, &["--poll-ms", "soon"]),
            Err(ArgsError::InvalidMillis { .. })
        ));
        let args = parse(Command::Ui, &["--tick-ms", "250", "--poll-ms", "1500"]).unwrap();
        assert_eq!(args.config.tick_interval(), Duration::from_millis(250));
        assert_eq!(args.config.poll_interval(), Duration::from_millis(1500));
    }

    #[test]
    fn empty_db_url_is_not_preparable() {
        assert!(prepare_sqlite_file("sqlite://").is_err());
        assert!(prepare_sqlite_file("postgres://x").is_err());
        assert!(prepare_sqlite_file("sqlite::memory:").is_ok());
    }
}
