//! # JobTrack: job-application tracker with interview reminders
//!
//! Usage:
//!   jobtrack user add alice alice@example.com       # Register a user
//!   jobtrack -u alice app add -c Acme -p Engineer   # Track an application
//!   jobtrack -u alice app list --status offer       # Page through applications
//!   jobtrack -u alice stats --monthly               # Totals and per-month counts
//!   jobtrack remind                                 # Run the reminder loop (Ctrl-C to stop)
//!   jobtrack remind --once                          # One reminder pass and exit

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use jobtrack_core::traits::{Clock, SystemClock};
use jobtrack_core::types::{
    ApplicationFields, ApplicationFilter, NewResume, NewTemplate, NewUser, PageRequest, Priority,
};
use jobtrack_core::JobTrackConfig;
use jobtrack_db::TrackerDb;
use jobtrack_scheduler::{IntervalTicker, ReminderScheduler, dispatcher_from_config};
use jobtrack_tracker::{
    ApplicationManager, ResumeManager, StatisticsAggregator, TemplateManager, UserDirectory,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "jobtrack",
    version,
    about = "📋 JobTrack: track job applications and get interview reminders"
)]
struct Cli {
    /// Config file (default: ~/.jobtrack/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Database path, overrides [database].path
    #[arg(long, global = true)]
    db: Option<String>,

    /// Act as this user (username)
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register users and record logins
    #[command(subcommand)]
    User(UserCommand),
    /// Manage job applications
    #[command(subcommand)]
    App(AppCommand),
    /// Show statistics for the current user
    Stats {
        /// Include per-month counts
        #[arg(long)]
        monthly: bool,
    },
    /// Manage uploaded resumes
    #[command(subcommand)]
    Resume(ResumeCommand),
    /// Manage application templates
    #[command(subcommand)]
    Template(TemplateCommand),
    /// Run the interview reminder scheduler
    Remind {
        /// Run a single pass and exit
        #[arg(long)]
        once: bool,
    },
}

#[derive(Subcommand)]
enum UserCommand {
    Add {
        username: String,
        email: String,
        /// Real name used in reminders
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        target: Option<String>,
    },
    Login { username: String },
}

#[derive(Args)]
struct AppFieldArgs {
    #[arg(short, long)]
    company: Option<String>,
    #[arg(short, long)]
    position: Option<String>,
    /// Apply date, YYYY-MM-DD (default: today)
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long)]
    salary_min: Option<i32>,
    #[arg(long)]
    salary_max: Option<i32>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    channel: Option<String>,
    #[arg(long)]
    referrer: Option<String>,
    /// Interview time, "YYYY-MM-DD HH:MM" local time or RFC 3339
    #[arg(long)]
    interview: Option<String>,
    #[arg(long)]
    website: Option<String>,
    #[arg(long)]
    hr: Option<String>,
    #[arg(long)]
    hr_phone: Option<String>,
    /// HIGH, MEDIUM or LOW
    #[arg(long)]
    priority: Option<String>,
    #[arg(long)]
    star: bool,
    /// Prefill from a template id
    #[arg(long)]
    template: Option<String>,
}

#[derive(Subcommand)]
enum AppCommand {
    Add(AppFieldArgs),
    List {
        #[arg(long)]
        status: Option<String>,
        /// Matches company or position, case-insensitive
        #[arg(short, long)]
        keyword: Option<String>,
        #[arg(long, default_value = "0")]
        page: u32,
        #[arg(long, default_value = "10")]
        size: u32,
        /// Oldest first
        #[arg(long)]
        oldest: bool,
    },
    Show { id: String },
    /// Change only the status of an application
    Status { id: String, status: String },
    /// Set or clear the interview time ("none" clears)
    Interview { id: String, at: String },
    Star { id: String },
    Delete { id: String },
}

#[derive(Subcommand)]
enum ResumeCommand {
    Add {
        name: String,
        file_path: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        file_type: Option<String>,
        #[arg(long)]
        size: Option<i64>,
    },
    List,
    Default { id: String },
    Delete { id: String },
}

#[derive(Subcommand)]
enum TemplateCommand {
    Add {
        name: String,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        channel: Option<String>,
        #[arg(long)]
        salary_min: Option<i32>,
        #[arg(long)]
        salary_max: Option<i32>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    List,
    Delete { id: String },
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").with_context(|| format!("Invalid date '{s}', expected YYYY-MM-DD"))
}

/// Local "YYYY-MM-DD HH:MM" or RFC 3339.
fn parse_interview(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
        .with_context(|| format!("Invalid interview time '{s}', expected \"YYYY-MM-DD HH:MM\""))?;
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => Ok(local.with_timezone(&Utc)),
        None => bail!("Interview time '{s}' does not exist in the local time zone"),
    }
}

struct App {
    users: UserDirectory,
    applications: ApplicationManager,
    stats: StatisticsAggregator,
    resumes: ResumeManager,
    templates: TemplateManager,
}

impl App {
    fn new(db: Arc<TrackerDb>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users: UserDirectory::new(db.clone(), clock.clone()),
            applications: ApplicationManager::new(db.clone(), clock.clone()),
            stats: StatisticsAggregator::new(db.clone()),
            resumes: ResumeManager::new(db.clone(), clock.clone()),
            templates: TemplateManager::new(db, clock),
        }
    }

    /// Resolve `--user` to a user id.
    fn user_id(&self, username: Option<&str>) -> Result<String> {
        let Some(username) = username else {
            bail!("This command needs --user <username>");
        };
        Ok(self.users.find_by_username(username)?.id)
    }

    fn fields(&self, user_id: &str, args: AppFieldArgs) -> Result<ApplicationFields> {
        let apply_date = match args.date.as_deref() {
            Some(d) => parse_date(d)?,
            None => Local::now().date_naive(),
        };
        let mut fields = match args.template.as_deref() {
            Some(id) => self.templates.get(id, user_id)?.to_fields(apply_date),
            None => ApplicationFields { apply_date: Some(apply_date), ..Default::default() },
        };

        if let Some(company) = args.company {
            fields.company_name = company;
        }
        if let Some(position) = args.position {
            fields.position_name = position;
        }
        fields.status = args.status;
        fields.notes = args.notes.or(fields.notes);
        fields.salary_min = args.salary_min.or(fields.salary_min);
        fields.salary_max = args.salary_max.or(fields.salary_max);
        fields.work_location = args.location.or(fields.work_location);
        fields.apply_channel = args.channel.or(fields.apply_channel);
        fields.referrer = args.referrer;
        fields.interview_time = args.interview.as_deref().map(parse_interview).transpose()?;
        fields.company_website = args.website.or(fields.company_website);
        fields.hr_contact = args.hr;
        fields.hr_phone = args.hr_phone;
        fields.priority = args.priority.as_deref().map(str::parse::<Priority>).transpose()?;
        fields.starred = Some(args.star);
        Ok(fields)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "jobtrack=debug,jobtrack_tracker=debug,jobtrack_scheduler=debug,jobtrack_db=debug"
    } else {
        "jobtrack=info,jobtrack_tracker=info,jobtrack_scheduler=info,jobtrack_db=info,jobtrack_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let mut config = match cli.config.as_deref() {
        Some(path) => JobTrackConfig::load_from(Path::new(&expand_path(path)))?,
        None => JobTrackConfig::load()?,
    };
    if let Some(db) = cli.db.as_deref() {
        config.database.path = db.to_string();
    }
    config.validate()?;

    let db_path = config.database.resolved_path();
    let db = Arc::new(
        TrackerDb::open(&db_path).with_context(|| format!("Opening database {}", db_path.display()))?,
    );
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let app = App::new(db.clone(), clock.clone());
    let username = cli.user.as_deref();

    match cli.command {
        Command::User(cmd) => match cmd {
            UserCommand::Add { username, email, name, phone, target } => {
                let user = app.users.register(NewUser {
                    username,
                    email,
                    display_name: name,
                    phone,
                    target_position: target,
                })?;
                print_json(&user)?;
            }
            UserCommand::Login { username } => {
                let user = app.users.find_by_username(&username)?;
                print_json(&app.users.record_login(&user.id)?)?;
            }
        },

        Command::App(cmd) => {
            let user_id = app.user_id(username)?;
            match cmd {
                AppCommand::Add(args) => {
                    let fields = app.fields(&user_id, args)?;
                    print_json(&app.applications.create(&user_id, fields)?)?;
                }
                AppCommand::List { status, keyword, page, size, oldest } => {
                    let filter = ApplicationFilter { status, keyword };
                    let mut request = PageRequest::new(page, size);
                    request.newest_first = !oldest;
                    print_json(&app.applications.list(&user_id, &filter, &request)?)?;
                }
                AppCommand::Show { id } => print_json(&app.applications.get(&id, &user_id)?)?,
                AppCommand::Status { id, status } => {
                    let mut fields = app.applications.get(&id, &user_id)?.fields();
                    fields.status = Some(status);
                    print_json(&app.applications.update(&id, &user_id, fields)?)?;
                }
                AppCommand::Interview { id, at } => {
                    let mut fields = app.applications.get(&id, &user_id)?.fields();
                    fields.interview_time = match at.trim() {
                        "none" | "" => None,
                        other => Some(parse_interview(other)?),
                    };
                    print_json(&app.applications.update(&id, &user_id, fields)?)?;
                }
                AppCommand::Star { id } => print_json(&app.applications.toggle_star(&id, &user_id)?)?,
                AppCommand::Delete { id } => {
                    app.applications.delete(&id, &user_id)?;
                    println!("🗑️ Deleted {id}");
                }
            }
        }

        Command::Stats { monthly } => {
            let user_id = app.user_id(username)?;
            let stats = app.stats.get_statistics(&user_id)?;
            if monthly {
                print_json(&serde_json::json!({
                    "statistics": stats,
                    "monthly": app.stats.monthly_counts(&user_id)?,
                }))?;
            } else {
                print_json(&stats)?;
            }
        }

        Command::Resume(cmd) => {
            let user_id = app.user_id(username)?;
            match cmd {
                ResumeCommand::Add { name, file_path, description, file_type, size } => {
                    let resume = app.resumes.add(
                        &user_id,
                        NewResume {
                            name,
                            description,
                            file_path: expand_path(&file_path),
                            file_type,
                            file_size: size,
                        },
                    )?;
                    print_json(&resume)?;
                }
                ResumeCommand::List => print_json(&app.resumes.list(&user_id)?)?,
                ResumeCommand::Default { id } => print_json(&app.resumes.set_default(&id, &user_id)?)?,
                ResumeCommand::Delete { id } => {
                    app.resumes.delete(&id, &user_id)?;
                    println!("🗑️ Deleted {id}");
                }
            }
        }

        Command::Template(cmd) => {
            let user_id = app.user_id(username)?;
            match cmd {
                TemplateCommand::Add {
                    name,
                    company,
                    position,
                    location,
                    channel,
                    salary_min,
                    salary_max,
                    website,
                    notes,
                } => {
                    let template = app.templates.create(
                        &user_id,
                        NewTemplate {
                            name,
                            company_name: company,
                            position_name: position,
                            work_location: location,
                            apply_channel: channel,
                            salary_min,
                            salary_max,
                            company_website: website,
                            notes,
                        },
                    )?;
                    print_json(&template)?;
                }
                TemplateCommand::List => print_json(&app.templates.list(&user_id)?)?,
                TemplateCommand::Delete { id } => {
                    app.templates.delete(&id, &user_id)?;
                    println!("🗑️ Deleted {id}");
                }
            }
        }

        Command::Remind { once } => {
            let dispatcher = dispatcher_from_config(&config.notify);
            tracing::info!(
                "📣 Notification targets: {} (echo: {})",
                dispatcher.target_names().join(", "),
                dispatcher.echo_names().join(", ")
            );
            let scheduler = Arc::new(
                ReminderScheduler::new(db, Arc::new(dispatcher), clock).with_config(&config.reminder),
            );

            if once {
                print_json(&scheduler.run_pass().await?)?;
                return Ok(());
            }
            if !config.reminder.enabled {
                tracing::warn!("⚠️ Reminders are disabled ([reminder].enabled = false)");
                return Ok(());
            }

            let handle = scheduler.spawn(IntervalTicker::new(config.reminder.poll_interval()));
            tokio::signal::ctrl_c().await?;
            tracing::info!("🛑 Ctrl-C received, waiting for the current pass to finish...");
            let passes = handle.shutdown().await;
            println!("👋 Reminder scheduler stopped after {passes} pass(es)");
        }
    }

    Ok(())
}
