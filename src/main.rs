use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use bolsa::admin::{self, AdminTarget, UserCounts};
use bolsa::api::endpoints;
use bolsa::applications::{self, ApplicationStats};
use bolsa::auth::{self, LoginOutcome};
use bolsa::confirm::Confirmation;
use bolsa::form::FormController;
use bolsa::jobs::{self, JobScope};
use bolsa::list::{EntityList, ListOptions};
use bolsa::models::{Application, ApplicationStatus, JobPosting, Role, Session};
use bolsa::profiles;
use bolsa::router::{Router, Screen, View};
use bolsa::store::Store;
use bolsa::{ApiClient, ApiError, Config, FormError, SessionStore};
use chrono::Datelike;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bolsa")]
#[command(about = "Job board client - browse vacancies, apply, and manage postings")]
struct Cli {
    /// Backend URL (overrides the origin-host rule)
    #[arg(long, env = "BOLSA_API_URL", global = true)]
    api_url: Option<String>,

    /// Host this client runs on; loopback targets localhost
    #[arg(long, env = "BOLSA_ORIGIN_HOST", default_value = "localhost", global = true)]
    origin_host: String,

    /// Request timeout in seconds
    #[arg(long, env = "BOLSA_TIMEOUT_SECS", default_value = "10", global = true)]
    timeout_secs: u64,

    /// Directory for the persisted session and saved jobs
    #[arg(long, env = "BOLSA_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        email: String,

        #[arg(short, long, env = "BOLSA_PASSWORD")]
        password: String,
    },

    /// Finish a sign-in that asked for a verification code
    #[command(name = "verify-2fa")]
    Verify2fa {
        /// Challenge printed by `login`
        challenge: String,

        /// 6-digit code
        code: String,
    },

    /// Create an account
    Register(RegisterArgs),

    /// Sign out (saved jobs are kept)
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List open vacancies
    Jobs {
        /// Search title, company and description
        #[arg(short, long)]
        search: Option<String>,

        /// Contract type (Tiempo Completo, Medio Tiempo, Freelance, ...)
        #[arg(short = 't', long = "type")]
        contract_type: Option<String>,

        /// Location; "Remoto" also matches remote postings
        #[arg(short, long)]
        location: Option<String>,

        /// Presencial, Remoto or Híbrido
        #[arg(short, long)]
        modality: Option<String>,

        /// Experience band (Sin experiencia, 1-2 años, 3-5 años, +5 años)
        #[arg(short, long)]
        experience: Option<String>,

        /// Show one vacancy in full
        #[arg(long)]
        show: Option<i64>,
    },

    /// Save or unsave a vacancy
    Save {
        job_id: i64,
    },

    /// List saved vacancies
    Saved,

    /// Apply to a vacancy
    Apply {
        job_id: i64,
    },

    /// List your applications
    Applications {
        /// Filter by status (Pendiente, En revisión, Aceptado, Rechazado)
        #[arg(short, long)]
        status: Option<String>,

        /// Search vacancy title, company and location
        #[arg(short = 'q', long)]
        search: Option<String>,
    },

    /// Company dashboard
    Company {
        #[command(subcommand)]
        command: CompanyCommands,
    },

    /// Administration
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Check whether a view is available to the current session
    View {
        name: String,
    },
}

#[derive(Args)]
struct RegisterArgs {
    #[arg(long)]
    first_name: String,

    #[arg(long)]
    last_name: String,

    #[arg(long)]
    email: String,

    #[arg(long, env = "BOLSA_PASSWORD")]
    password: String,

    /// Defaults to --password
    #[arg(long)]
    confirm_password: Option<String>,

    #[arg(long)]
    phone: String,

    /// candidate or company
    #[arg(long, default_value = "candidate")]
    role: String,

    /// Company name (company accounts)
    #[arg(long)]
    company: Option<String>,

    #[arg(long)]
    accept_terms: bool,
}

#[derive(Args)]
struct JobArgs {
    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    requirements: Option<String>,

    #[arg(long)]
    location: Option<String>,

    #[arg(long = "type")]
    contract_type: Option<String>,

    #[arg(long)]
    salary: Option<String>,

    #[arg(long)]
    salary_min: Option<String>,

    #[arg(long)]
    salary_max: Option<String>,

    /// Publication date (YYYY-MM-DD)
    #[arg(long)]
    publish: Option<String>,

    /// Closing date (YYYY-MM-DD)
    #[arg(long)]
    closes: Option<String>,

    /// Abierta, Pausada or Cerrada
    #[arg(long)]
    status: Option<String>,
}

impl JobArgs {
    fn fields(&self) -> Vec<(&'static str, String)> {
        [
            ("titulo", &self.title),
            ("descripcion", &self.description),
            ("requisitos", &self.requirements),
            ("ubicacion", &self.location),
            ("tipoContrato", &self.contract_type),
            ("salario", &self.salary),
            ("salarioMin", &self.salary_min),
            ("salarioMax", &self.salary_max),
            ("fechaPublicacion", &self.publish),
            ("fechaCierre", &self.closes),
            ("estado", &self.status),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
        .collect()
    }
}

#[derive(Subcommand)]
enum CompanyCommands {
    /// List your vacancies
    Jobs,

    /// Publish a vacancy
    Add(JobArgs),

    /// Edit a vacancy
    Edit {
        id: i64,

        #[command(flatten)]
        job: JobArgs,
    },

    /// Delete a vacancy
    Delete {
        id: i64,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Applications received
    Applications {
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Move applications to a new status
    Status {
        #[arg(required = true)]
        ids: Vec<i64>,

        #[arg(long)]
        to: String,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Platform totals
    Stats,

    /// All vacancies
    Jobs {
        #[arg(long)]
        include_deleted: bool,

        #[arg(short, long)]
        search: Option<String>,

        /// Abierta/activo, Pausada or Cerrada
        #[arg(long)]
        status: Option<String>,

        #[arg(short = 't', long = "type")]
        contract_type: Option<String>,

        #[arg(short, long)]
        location: Option<String>,
    },

    /// Publish a vacancy for a company
    AddJob {
        #[arg(long)]
        company_id: Option<i64>,

        #[command(flatten)]
        job: JobArgs,
    },

    /// Edit any vacancy
    EditJob {
        id: i64,

        #[command(flatten)]
        job: JobArgs,
    },

    /// All accounts
    Users {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        status: Option<String>,
    },

    /// Move applications to a new status
    Status {
        #[arg(required = true)]
        ids: Vec<i64>,

        #[arg(long)]
        to: String,
    },

    /// Delete a user, candidate, company, vacancy or application
    Delete {
        target: String,

        id: i64,

        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show your profile
    Show,

    /// Change profile fields
    Edit {
        /// field=value, repeatable (e.g. --set ciudad=León)
        #[arg(long = "set", value_parser = parse_key_val, required = true)]
        set: Vec<(String, String)>,
    },

    /// Upload your CV (PDF)
    UploadCv {
        file: PathBuf,
    },

    /// Upload a profile picture
    UploadImage {
        file: PathBuf,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{}'", s))?;
    Ok((key.trim().to_string(), value.to_string()))
}

struct App {
    config: Config,
    client: ApiClient,
    sessions: SessionStore,
    router: Router,
}

impl App {
    fn open(cli: &Cli) -> Result<Self> {
        let config = Config {
            api_url: cli.api_url.clone(),
            origin_host: cli.origin_host.clone(),
            timeout: Duration::from_secs(cli.timeout_secs),
            data_dir: cli.data_dir.clone(),
            ..Default::default()
        };
        let client = ApiClient::new(&config).context("Failed to build HTTP client")?;
        let store = Store::open(config.data_dir.as_deref()).context("Failed to open local state")?;
        let mut sessions = SessionStore::new(store);
        sessions.load();

        Ok(Self {
            config,
            client,
            sessions,
            router: Router::new(),
        })
    }

    fn form(&self, schema: bolsa::form::Schema) -> FormController {
        FormController::new(schema).with_success_ttl(self.config.success_banner)
    }

    /// Navigate and render; fails with the access-denied message.
    fn enter(&mut self, view: View) -> Result<Option<Session>> {
        self.router.navigate(view);
        match self.router.render(self.sessions.current()) {
            Screen::Show(_) => Ok(self.sessions.current().cloned()),
            Screen::AccessDenied { requested } => {
                let who = self
                    .sessions
                    .current()
                    .map(|s| format!("{} accounts", s.role.as_str()))
                    .unwrap_or_else(|| "signed-out users".to_string());
                bail!("Access denied: '{}' is not available to {}.", requested, who)
            }
        }
    }

    fn require(&mut self, view: View) -> Result<Session> {
        self.enter(view)?
            .ok_or_else(|| anyhow!("Sign in first: bolsa login <email>"))
    }
}

fn user_facing(err: ApiError) -> anyhow::Error {
    anyhow!(err.user_message())
}

fn form_failure(err: FormError) -> anyhow::Error {
    match err {
        FormError::Invalid(errors) => {
            let lines: Vec<String> = errors
                .iter()
                .map(|(field, message)| format!("  {}: {}", field, message))
                .collect();
            anyhow!("Please fix the following:\n{}", lines.join("\n"))
        }
        FormError::Api(e) => user_facing(e),
        other => anyhow!(other),
    }
}

fn fill(form: &mut FormController, fields: &[(&str, String)]) -> Result<()> {
    for (name, value) in fields {
        if !form.set_field(name, value.clone()) {
            bail!("Field '{}' cannot be changed here.", name);
        }
    }
    Ok(())
}

fn print_banner(form: &FormController) {
    if let Some(banner) = form.banner() {
        println!("{}", banner.message);
    }
}

fn confirm(action: String, assume_yes: bool) -> Option<Confirmation> {
    Confirmation::ask(action, |prompt| {
        if assume_yes {
            return true;
        }
        print!("{} [y/N] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        io::stdin().read_line(&mut answer).is_ok()
            && matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "s" | "si" | "sí")
    })
}

fn parse_status(s: &str) -> Result<ApplicationStatus> {
    ApplicationStatus::parse(s).ok_or_else(|| {
        let known: Vec<&str> = ApplicationStatus::ALL.iter().map(|s| s.label()).collect();
        anyhow!("Unknown status '{}'. Use one of: {}", s, known.join(", "))
    })
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("Not a file: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut app = App::open(&cli)?;

    match cli.command {
        Commands::Login { email, password } => {
            app.enter(View::Login)?;
            let mut form = app.form(auth::login_schema());
            fill(&mut form, &[("correo", email), ("contrasena", password)])?;

            match auth::login(&app.client, &mut form).await.map_err(form_failure)? {
                LoginOutcome::Authenticated(session) => {
                    let name = session.display_name.clone();
                    auth::sign_in(&mut app.sessions, &mut app.router, session)?;
                    println!("Welcome, {}.", name);
                }
                LoginOutcome::TwoFactor { challenge } => {
                    println!("A verification code was sent to your email.");
                    println!("Finish with: bolsa verify-2fa {} <code>", challenge);
                }
            }
        }

        Commands::Verify2fa { challenge, code } => {
            app.enter(View::Login)?;
            let session = auth::verify_2fa(&app.client, &challenge, &code)
                .await
                .map_err(user_facing)?;
            let name = session.display_name.clone();
            auth::sign_in(&mut app.sessions, &mut app.router, session)?;
            println!("Welcome, {}.", name);
        }

        Commands::Register(args) => {
            app.enter(View::Register)?;
            let mut form = app.form(auth::register_schema());
            let confirm_password = args.confirm_password.unwrap_or_else(|| args.password.clone());
            let mut fields = vec![
                ("nombre", args.first_name),
                ("apellido", args.last_name),
                ("correo", args.email),
                ("contrasena", args.password),
                ("confirmarContrasena", confirm_password),
                ("telefono", args.phone),
                ("tipoUsuario", args.role),
                ("aceptaTerminos", if args.accept_terms { "true" } else { "" }.to_string()),
            ];
            if let Some(company) = args.company {
                fields.push(("empresa", company));
            }
            fill(&mut form, &fields)?;

            let id = auth::register(&app.client, &mut form).await.map_err(form_failure)?;
            app.router.on_register();
            print_banner(&form);
            if let Some(id) = id {
                println!("User #{}", id);
            }
            println!("Next: bolsa login <email>");
        }

        Commands::Logout => {
            auth::sign_out(&mut app.sessions, &mut app.router)?;
            println!("Signed out.");
        }

        Commands::Whoami => match app.sessions.current() {
            Some(session) => {
                println!("User #{}", session.user_id);
                println!("Name: {}", session.display_name);
                println!("Role: {}", session.role.as_str());
                println!(
                    "Image: {}",
                    app.client.user_image_url(session.role, session.avatar_path.as_deref())
                );
            }
            None => println!("Not signed in."),
        },

        Commands::Jobs {
            search,
            contract_type,
            location,
            modality,
            experience,
            show,
        } => {
            app.enter(View::Jobs)?;

            if let Some(id) = show {
                let job = jobs::fetch_job(&app.client, id).await.map_err(user_facing)?;
                print_job(&job, app.sessions.is_saved(id));
                return Ok(());
            }

            let mut list = EntityList::new(jobs::public_filters());
            list.load(&app.client, endpoints::JOBS, ListOptions::default()).await;
            if let Some(err) = list.error() {
                bail!("Failed to load vacancies: {}", err.user_message());
            }
            for (key, value) in [
                ("search", search),
                ("type", contract_type),
                ("location", location),
                ("modality", modality),
                ("experience", experience),
            ] {
                if let Some(value) = value {
                    list.set_filter(key, value)?;
                }
            }

            let view = list.view();
            let saved = app.sessions.saved_jobs();
            if view.is_empty() {
                println!("No vacancies found.");
            } else {
                print_jobs(&view, &saved);
                println!("\n{} of {} vacancies (* = saved, + = featured)", view.len(), list.total());
            }
        }

        Commands::Save { job_id } => {
            app.require(View::SavedJobs)?;
            if app.sessions.toggle_saved(job_id)? {
                println!("Saved vacancy #{}.", job_id);
            } else {
                println!("Removed vacancy #{} from saved.", job_id);
            }
        }

        Commands::Saved => {
            app.require(View::SavedJobs)?;
            let saved = app.sessions.saved_jobs();
            if saved.is_empty() {
                println!("No saved vacancies.");
                return Ok(());
            }

            let mut list = EntityList::new(jobs::public_filters());
            list.load(&app.client, endpoints::JOBS, ListOptions::default()).await;
            if let Some(err) = list.error() {
                bail!("Failed to load vacancies: {}", err.user_message());
            }
            let view = jobs::saved_view(list.items(), &saved);
            print_jobs(&view, &saved);
            let missing = saved.len() - view.len();
            if missing > 0 {
                println!("\n{} saved vacancy(ies) are no longer listed.", missing);
            }
        }

        Commands::Apply { job_id } => {
            let session = app.sessions.current().cloned();
            applications::apply_to_job(&app.client, session.as_ref(), job_id)
                .await
                .map_err(user_facing)?;
            println!("Application sent for vacancy #{}.", job_id);
        }

        Commands::Applications { status, search } => {
            let session = app.require(View::Applications)?;
            let mut list = EntityList::new(applications::candidate_filters());
            list.load(
                &app.client,
                &endpoints::candidate_applications(session.user_id),
                ListOptions::default(),
            )
            .await;
            if let Some(err) = list.error() {
                bail!("Failed to load applications: {}", err.user_message());
            }
            if let Some(status) = status {
                list.set_filter("status", parse_status(&status)?.label())?;
            }
            if let Some(search) = search {
                list.set_filter("search", search)?;
            }

            let stats = ApplicationStats::from_items(list.items());
            print_applications(&list.view(), |a| a.company_name().unwrap_or("-").to_string());
            println!(
                "\nTotal {} | Pending {} | In review {} | Accepted {} | Rejected {}",
                stats.total, stats.pending, stats.in_review, stats.accepted, stats.rejected
            );
        }

        Commands::Company { command } => {
            let session = app.require(View::CompanyDashboard)?;
            let scope = JobScope::Company(session.user_id);
            match command {
                CompanyCommands::Jobs => {
                    list_scoped_jobs(&app, scope, ListOptions::default()).await?;
                }

                CompanyCommands::Add(job) => {
                    app.require(View::AddJob)?;
                    save_job(&app, scope, None, Vec::new(), &job).await?;
                }

                CompanyCommands::Edit { id, job } => {
                    save_job(&app, scope, Some(id), Vec::new(), &job).await?;
                }

                CompanyCommands::Delete { id, yes } => {
                    let Some(token) = confirm(format!("Delete vacancy #{}?", id), yes) else {
                        println!("Cancelled.");
                        return Ok(());
                    };
                    jobs::delete_job(&app.client, scope, id, token)
                        .await
                        .map_err(user_facing)?;
                    println!("Vacancy #{} deleted.", id);
                    list_scoped_jobs(&app, scope, ListOptions::default()).await?;
                }

                CompanyCommands::Applications { status } => {
                    let list = company_applications(&app, session.user_id, status).await?;
                    print_applications(&list.view(), candidate_name);
                }

                CompanyCommands::Status { ids, to } => {
                    let status = parse_status(&to)?;
                    let mut list = company_applications(&app, session.user_id, None).await?;
                    bulk_status(&app, &mut list, &ids, status).await?;
                    list.load(
                        &app.client,
                        &endpoints::company_applications(session.user_id),
                        ListOptions::default(),
                    )
                    .await;
                    print_applications(&list.view(), candidate_name);
                }
            }
        }

        Commands::Admin { command } => {
            app.require(View::Admin)?;
            match command {
                AdminCommands::Stats => {
                    let stats = admin::fetch_stats(&app.client).await.map_err(user_facing)?;
                    println!("Users:        {}", stats.total_usuarios);
                    println!("Candidates:   {}", stats.total_candidatos);
                    println!("Companies:    {}", stats.total_empresas);
                    println!("Vacancies:    {}", stats.total_vacantes);
                    println!("Applications: {}", stats.total_postulaciones);
                }

                AdminCommands::Jobs {
                    include_deleted,
                    search,
                    status,
                    contract_type,
                    location,
                } => {
                    let mut list = EntityList::new(jobs::admin_filters());
                    list.load(&app.client, endpoints::ADMIN_JOBS, ListOptions { include_deleted })
                        .await;
                    if let Some(err) = list.error() {
                        bail!("Failed to load vacancies: {}", err.user_message());
                    }
                    for (key, value) in [
                        ("search", search),
                        ("status", status),
                        ("type", contract_type),
                        ("location", location),
                    ] {
                        if let Some(value) = value {
                            list.set_filter(key, value)?;
                        }
                    }
                    let view = list.view();
                    print_jobs(&view, &BTreeSet::new());
                    let deleted = view.iter().filter(|j| j.deleted).count();
                    println!("\n{} of {} vacancies ({} deleted)", view.len(), list.total(), deleted);
                }

                AdminCommands::AddJob { company_id, job } => {
                    app.require(View::AddJob)?;
                    let extra = company_id
                        .map(|id| vec![("empresaId", id.to_string())])
                        .unwrap_or_default();
                    save_job(&app, JobScope::Admin, None, extra, &job).await?;
                }

                AdminCommands::EditJob { id, job } => {
                    save_job(&app, JobScope::Admin, Some(id), Vec::new(), &job).await?;
                }

                AdminCommands::Users {
                    search,
                    role,
                    status,
                } => {
                    let mut list = EntityList::new(admin::user_filters());
                    list.load(&app.client, endpoints::ADMIN_USERS, ListOptions::default())
                        .await;
                    if let Some(err) = list.error() {
                        bail!("Failed to load users: {}", err.user_message());
                    }
                    for (key, value) in [("search", search), ("role", role), ("status", status)] {
                        if let Some(value) = value {
                            list.set_filter(key, value)?;
                        }
                    }

                    let view = list.view();
                    println!("{:<6} {:<10} {:<28} {:<30} {:<10}", "ID", "ROLE", "NAME", "EMAIL", "STATUS");
                    println!("{}", "-".repeat(88));
                    for user in &view {
                        println!(
                            "{:<6} {:<10} {:<28} {:<30} {:<10}",
                            user.id,
                            user.role.as_str(),
                            truncate(&user.display_name(), 26),
                            truncate(user.email.as_deref().unwrap_or("-"), 28),
                            user.status.as_deref().unwrap_or("-")
                        );
                    }
                    let counts = UserCounts::from_users(view.iter().copied());
                    println!(
                        "\nCandidates {} | Companies {} | Admins {} | Active {}",
                        counts.candidates, counts.companies, counts.admins, counts.active
                    );
                }

                AdminCommands::Status { ids, to } => {
                    let status = parse_status(&to)?;
                    let mut list = EntityList::new(applications::company_filters());
                    list.load(&app.client, endpoints::APPLICATIONS, ListOptions::default())
                        .await;
                    bulk_status(&app, &mut list, &ids, status).await?;
                }

                AdminCommands::Delete { target, id, yes } => {
                    let target = AdminTarget::parse(&target)
                        .ok_or_else(|| anyhow!("Unknown target '{}'", target))?;
                    let Some(token) = confirm(format!("Delete {} #{}?", target.label(), id), yes) else {
                        println!("Cancelled.");
                        return Ok(());
                    };
                    admin::delete(&app.client, target, id, token)
                        .await
                        .map_err(user_facing)?;
                    println!("Deleted {} #{}.", target.label(), id);
                }
            }
        }

        Commands::Profile { command } => {
            let session = app.require(View::Profile)?;
            let year = chrono::Local::now().year();
            match (session.role, command) {
                (Role::Admin, _) => bail!("Administrator accounts have no profile to manage."),

                (Role::Candidate, ProfileCommands::Show) => {
                    let mut detail = profiles::candidate_detail(session.user_id, year);
                    detail.load(&app.client).await.map_err(user_facing)?;
                    if let Some(profile) = detail.entity() {
                        let show = |label: &str, value: &Option<String>| {
                            println!("{:<12} {}", label, value.as_deref().unwrap_or("-"));
                        };
                        show("Phone:", &profile.phone);
                        show("Address:", &profile.address);
                        show("Education:", &profile.education);
                        show("Experience:", &profile.experience);
                        match &profile.cv {
                            Some(cv) if !cv.is_empty() => {
                                println!("{:<12} {}", "CV:", app.client.static_url(cv))
                            }
                            _ => println!("{:<12} -", "CV:"),
                        }
                        let missing = profile.missing_for_application();
                        if !missing.is_empty() {
                            println!("\nTo apply to vacancies, add: {}", missing.join(", "));
                        }
                    }
                }

                (Role::Candidate, ProfileCommands::Edit { set }) => {
                    let mut detail = profiles::candidate_detail(session.user_id, year);
                    detail.load(&app.client).await.map_err(user_facing)?;
                    let seed = detail
                        .entity()
                        .map(profiles::candidate_form_values)
                        .unwrap_or_default();
                    detail.begin_edit_with(seed).map_err(form_failure)?;
                    let fields: Vec<(&str, String)> =
                        set.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
                    fill(detail.form_mut(), &fields)?;
                    detail
                        .save(&app.client, profiles::candidate_payload, "Profile updated")
                        .await
                        .map_err(form_failure)?;
                    print_banner(detail.form());
                }

                (Role::Company, ProfileCommands::Show) => {
                    let mut detail = profiles::company_detail(session.user_id, year);
                    detail.load(&app.client).await.map_err(user_facing)?;
                    if let Some(profile) = detail.entity() {
                        let show = |label: &str, value: Option<String>| {
                            println!("{:<12} {}", label, value.unwrap_or_else(|| "-".into()));
                        };
                        show("Name:", profile.name.clone());
                        show("RFC:", profile.rfc.clone());
                        show("Email:", profile.email.clone());
                        show("Phone:", profile.phone.clone());
                        show("Address:", profile.address.clone());
                        show("Sector:", profile.sector.clone());
                        show("Size:", profile.size.clone());
                        show("Website:", profile.website.clone());
                        show("Founded:", profile.founded.map(|y| y.to_string()));
                        if let Some(description) = &profile.description {
                            println!("\n{}", textwrap::fill(description, 80));
                        }
                    }
                }

                (Role::Company, ProfileCommands::Edit { set }) => {
                    let mut detail = profiles::company_detail(session.user_id, year);
                    detail.load(&app.client).await.map_err(user_facing)?;
                    let seed = detail
                        .entity()
                        .map(profiles::company_form_values)
                        .unwrap_or_default();
                    detail.begin_edit_with(seed).map_err(form_failure)?;
                    let fields: Vec<(&str, String)> =
                        set.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
                    fill(detail.form_mut(), &fields)?;
                    detail
                        .save(&app.client, profiles::company_payload, "Profile updated")
                        .await
                        .map_err(form_failure)?;
                    print_banner(detail.form());
                }

                (_, ProfileCommands::UploadCv { file }) => {
                    if session.role != Role::Candidate {
                        bail!("Only candidates upload a CV.");
                    }
                    let bytes = tokio::fs::read(&file)
                        .await
                        .with_context(|| format!("Failed to read {}", file.display()))?;
                    profiles::upload_cv(&app.client, session.user_id, &file_name(&file)?, bytes)
                        .await
                        .map_err(user_facing)?;
                    println!("CV uploaded.");
                }

                (_, ProfileCommands::UploadImage { file }) => {
                    let bytes = tokio::fs::read(&file)
                        .await
                        .with_context(|| format!("Failed to read {}", file.display()))?;
                    profiles::upload_image(&app.client, session.user_id, &file_name(&file)?, bytes)
                        .await
                        .map_err(user_facing)?;
                    println!("Profile image uploaded.");
                }
            }
        }

        Commands::View { name } => {
            let view = View::parse(&name).ok_or_else(|| {
                let known: Vec<&str> = View::ALL.iter().map(|v| v.as_str()).collect();
                anyhow!("Unknown view '{}'. Known views: {}", name, known.join(", "))
            })?;
            app.router.navigate(view);
            match app.router.render(app.sessions.current()) {
                Screen::Show(view) => println!("{}: available", view),
                Screen::AccessDenied { requested } => println!("{}: access denied", requested),
            }
        }
    }

    Ok(())
}

async fn list_scoped_jobs(app: &App, scope: JobScope, options: ListOptions) -> Result<()> {
    let mut list = EntityList::new(jobs::admin_filters());
    list.load(&app.client, &scope.list_path(), options).await;
    if let Some(err) = list.error() {
        bail!("Failed to load vacancies: {}", err.user_message());
    }
    if list.total() == 0 {
        println!("No vacancies yet.");
    } else {
        print_jobs(&list.view(), &BTreeSet::new());
    }
    Ok(())
}

/// Create or update through the vacancy form, then refresh the listing.
async fn save_job(
    app: &App,
    scope: JobScope,
    editing: Option<i64>,
    extra: Vec<(&'static str, String)>,
    args: &JobArgs,
) -> Result<()> {
    let mut form = app.form(jobs::job_schema(scope));
    if let Some(id) = editing {
        let job = jobs::fetch_job(&app.client, id).await.map_err(user_facing)?;
        form.load_entity(&job)?;
    }
    fill(&mut form, &extra)?;
    fill(&mut form, &args.fields())?;

    let message = if editing.is_some() {
        "Vacancy updated"
    } else {
        "Vacancy created"
    };
    form.submit(&app.client, |v| jobs::save_request(scope, editing, v), message)
        .await
        .map_err(form_failure)?;
    print_banner(&form);

    list_scoped_jobs(app, scope, ListOptions::default()).await
}

async fn company_applications(
    app: &App,
    company_id: i64,
    status: Option<String>,
) -> Result<EntityList<Application>> {
    let mut list = EntityList::new(applications::company_filters());
    list.load(
        &app.client,
        &endpoints::company_applications(company_id),
        ListOptions::default(),
    )
    .await;
    if let Some(err) = list.error() {
        bail!("Failed to load applications: {}", err.user_message());
    }
    if let Some(status) = status {
        list.set_filter("status", parse_status(&status)?.label())?;
    }
    Ok(list)
}

async fn bulk_status(
    app: &App,
    list: &mut EntityList<Application>,
    ids: &[i64],
    status: ApplicationStatus,
) -> Result<()> {
    match applications::bulk_update_status(&app.client, list, ids, status).await {
        Ok(count) => {
            println!("{} application(s) moved to {}.", count, status.label());
            Ok(())
        }
        Err(err) => {
            for (id, e) in &err.failures {
                eprintln!("  #{}: {}", id, e.user_message());
            }
            bail!(
                "{} of {} updates failed; {} application(s) moved to {}.",
                err.failed(),
                err.total(),
                err.succeeded,
                status.label()
            )
        }
    }
}

fn candidate_name(app: &Application) -> String {
    app.candidate
        .as_ref()
        .and_then(|c| c.username.clone().or_else(|| c.email.clone()))
        .unwrap_or_else(|| "-".to_string())
}

fn print_jobs(jobs: &[&JobPosting], saved: &BTreeSet<i64>) {
    println!(
        "{:<7} {:<9} {:<30} {:<20} {:<18} {:>10}",
        "ID", "STATUS", "TITLE", "COMPANY", "LOCATION", "SALARY"
    );
    println!("{}", "-".repeat(99));
    for job in jobs {
        let marker = match (saved.contains(&job.id), job.featured) {
            (true, true) => "*+",
            (true, false) => "*",
            (false, true) => "+",
            (false, false) => "",
        };
        let salary = job
            .salary
            .map(|s| format!("${:.0}", s))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<7} {:<9} {:<30} {:<20} {:<18} {:>10}",
            format!("{}{}", job.id, marker),
            job.status.label(),
            truncate(&job.title, 28),
            truncate(job.company_name.as_deref().unwrap_or("-"), 18),
            truncate(job.location.as_deref().unwrap_or("-"), 16),
            salary
        );
    }
}

fn print_job(job: &JobPosting, saved: bool) {
    println!(
        "Vacancy #{}{}{}",
        job.id,
        if job.featured { " (featured)" } else { "" },
        if saved { " (saved)" } else { "" }
    );
    println!("Title: {}", job.title);
    if let Some(company) = &job.company_name {
        println!("Company: {}", company);
    }
    println!("Status: {}", job.status.label());
    if let Some(location) = &job.location {
        let modality = match (job.remote, job.hybrid) {
            (true, _) => " (remote)",
            (false, true) => " (hybrid)",
            (false, false) => "",
        };
        println!("Location: {}{}", location, modality);
    }
    if let Some(kind) = &job.contract_type {
        println!("Contract: {}", kind);
    }
    if let Some(experience) = &job.experience {
        println!("Experience: {}", experience);
    }
    if let Some(salary) = job.salary {
        println!("Salary: ${:.2} MXN", salary);
    }
    if let Some(published) = &job.published_at {
        println!("Published: {}", truncate(published, 10));
    }
    if let Some(closes) = &job.closes_at {
        println!("Closes: {}", truncate(closes, 10));
    }
    println!("Applications: {}", job.application_count);
    if let Some(description) = &job.description {
        println!("\n--- Description ---\n{}", textwrap::fill(description, 80));
    }
    if let Some(requirements) = &job.requirements {
        println!("\n--- Requirements ---\n{}", textwrap::fill(requirements, 80));
    }
}

fn print_applications(apps: &[&Application], who: impl Fn(&Application) -> String) {
    if apps.is_empty() {
        println!("No applications found.");
        return;
    }
    println!(
        "{:<6} {:<12} {:<30} {:<22} {:<10}",
        "ID", "STATUS", "VACANCY", "WITH", "APPLIED"
    );
    println!("{}", "-".repeat(84));
    for app in apps {
        println!(
            "{:<6} {:<12} {:<30} {:<22} {:<10}",
            app.id,
            app.status.label(),
            truncate(app.job_title().unwrap_or("-"), 28),
            truncate(&who(app), 20),
            truncate(app.applied_at.as_deref().unwrap_or("-"), 10)
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
