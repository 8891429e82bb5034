#![allow(clippy::multiple_crate_versions)]

use agriconfig::{AgriConfig, DisplayConfig, FileTokenStore};
use agridoctor::form::{
    CropForm, DiseaseForm, FertilizerForm, FormController, PredictionForm, SoilInputs,
};
use agridoctor::guard::{guard, GuardDecision, Route};
use agridoctor::present::{present, Present};
use agridoctor::session::AuthSession;
use agridoctor::types::{CropType, Credentials, ImageUpload, Outcome, Registration, SoilField};
use agridoctor::{AgriClient, Error as AgriError};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
mod render;

type Session = AuthSession<FileTokenStore>;

#[derive(Parser)]
#[command(name = "agriline", about = "A CLI for the AgriDoctor prediction service")]
struct Cli {
    /// Log requests and session changes to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Override the configured API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and remember the session
    Login {
        /// Account email (defaults to the configured one)
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account and log in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        full_name: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Show the user and the available services
    Dashboard,
    /// Recommend a crop for the given soil and climate
    #[command(
        long_about = "Recommend a crop for the given soil and climate.\n\nAll seven readings are required.\n\nExample:\n  agriline crop --n 90 --p 42 --k 43 --temperature 20.8 --humidity 82 --ph 6.5 --rainfall 202.9"
    )]
    Crop(SoilArgs),
    /// Recommend a fertilizer for a crop and soil
    Fertilizer {
        #[command(flatten)]
        soil: SoilArgs,
        /// Crop being grown, e.g. rice or "kidney beans"
        #[arg(long)]
        crop_type: Option<String>,
    },
    /// Detect plant disease from a leaf image
    Disease {
        /// Path to a JPEG or PNG image (max 10 MB)
        image: PathBuf,
    },
    /// List recent predictions
    History {
        kind: HistoryKind,
        /// Number of entries to fetch
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Check whether the model backends are up
    Health,
    /// Show what a page would render for the current session
    Open {
        /// Page path, e.g. /dashboard
        path: String,
    },
    /// Generate shell completions
    #[command(hide = true)]
    Completions {
        /// The shell to generate completions for
        shell: Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum HistoryKind {
    Crop,
    Fertilizer,
    Disease,
}

#[derive(Args)]
struct SoilArgs {
    /// Nitrogen (N) in kg/ha
    #[arg(long = "n")]
    nitrogen: Option<String>,
    /// Phosphorus (P) in kg/ha
    #[arg(long = "p")]
    phosphorus: Option<String>,
    /// Potassium (K) in kg/ha
    #[arg(long = "k")]
    potassium: Option<String>,
    /// Temperature in °C
    #[arg(long)]
    temperature: Option<String>,
    /// Relative humidity in %
    #[arg(long)]
    humidity: Option<String>,
    /// Soil pH, 0-14
    #[arg(long)]
    ph: Option<String>,
    /// Rainfall in mm
    #[arg(long)]
    rainfall: Option<String>,
}

impl SoilArgs {
    fn into_inputs(self) -> SoilInputs {
        let mut inputs = SoilInputs::default();
        let values = [
            (SoilField::Nitrogen, self.nitrogen),
            (SoilField::Phosphorus, self.phosphorus),
            (SoilField::Potassium, self.potassium),
            (SoilField::Temperature, self.temperature),
            (SoilField::Humidity, self.humidity),
            (SoilField::Ph, self.ph),
            (SoilField::Rainfall, self.rainfall),
        ];
        for (field, value) in values {
            if let Some(value) = value {
                inputs.set(field, value);
            }
        }
        inputs
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn get_client(config: &AgriConfig) -> Result<AgriClient> {
    let client = AgriClient::new(config.api_url.as_str());
    match config.timeout() {
        Some(timeout) => client
            .with_timeout(timeout)
            .with_context(|| "Failed to build HTTP client"),
        None => Ok(client),
    }
}

fn new_session(config: &AgriConfig) -> Result<Session> {
    let store = FileTokenStore::new().with_context(|| "Failed to locate session file")?;
    debug!(path = %store.path().display(), "session file");
    Ok(AuthSession::new(get_client(config)?, store))
}

/// A session re-hydrated from the stored token.
async fn restored_session(config: &AgriConfig) -> Result<Session> {
    let mut session = new_session(config)?;
    let restored = session.restore().await.map(|_| ());
    if let Err(err) = restored {
        if session.token().is_some() {
            return Err(err).with_context(|| "Failed to verify the stored session");
        }
        warn!(error = %err, "could not restore session");
    }
    Ok(session)
}

/// Enforces the route guard for a protected command.
fn require(route: Route, session: &Session) -> Result<()> {
    match guard(route, session) {
        GuardDecision::Render(_) => Ok(()),
        GuardDecision::Redirect(target) => Err(anyhow::anyhow!(
            "{route} requires a signed-in user (redirected to {target}).\nRun `agriline login` first."
        )),
        GuardDecision::Loading => Err(anyhow::anyhow!("Session is still loading")),
    }
}

/// Submits a form through the session's client and prints the outcome.
/// Returns whether the prediction succeeded.
async fn run_form<F>(
    session: &mut Session,
    mut controller: FormController<F>,
    display: &DisplayConfig,
) -> Result<bool>
where
    F: PredictionForm,
    F::Response: Present,
{
    let Some(request) = controller.begin_submit() else {
        let message = controller.error().unwrap_or("Nothing to submit");
        return Err(anyhow::anyhow!("{}", render::with_field_hint(message)));
    };

    let reply = F::send(session.client(), &request).await;
    if let Err(err) = &reply {
        if session.handle_error(err)? {
            eprintln!("{}", "Session expired; run `agriline login` again.".yellow());
        }
    }
    controller.finish(reply);

    if let Some(outcome) = controller.result() {
        render::result(&present(outcome), display);
    }
    Ok(controller.result().is_some_and(Outcome::is_success))
}

fn read_image(path: &Path) -> Result<ImageUpload> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read image: {}", path.display()))?;
    let file_name = path
        .file_name()
        .map_or_else(|| "image".to_string(), |name| name.to_string_lossy().into_owned());
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    Ok(ImageUpload::new(file_name, mime_type, bytes))
}

fn handle_error(err: &anyhow::Error) -> ! {
    match err.downcast_ref::<AgriError>() {
        Some(AgriError::Server { status, detail }) => {
            eprintln!("{}", render::service_error(*status, detail.as_ref()));
        }
        Some(AgriError::Auth { message, .. }) => {
            eprintln!("{message}");
            eprintln!("Run `agriline login` to sign in.");
        }
        _ => eprintln!("{err:#}"),
    }
    process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => handle_error(&err),
    }

    Ok(())
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<bool> {
    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "agriline", &mut std::io::stdout());
        return Ok(true);
    }

    let mut config = AgriConfig::load().with_context(|| "Failed to load agridoctor config")?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }

    match cli.command {
        Command::Completions { .. } => {}
        Command::Login { email } => {
            let prompted = email.is_none() && config.login.email.is_none();
            let email = match email {
                Some(email) => email,
                None => config.login_email()?,
            };
            let password = config.login_password()?;
            let mut session = new_session(&config)?;
            let user = session.login(&Credentials::new(email.as_str(), password)).await?;
            println!("Logged in as {}", user.username.bold());
            if prompted {
                let saved = AgriConfig::path()
                    .and_then(|path| AgriConfig::remember_email(&path, &email));
                if let Err(err) = saved {
                    warn!(error = %err, "could not remember login email");
                }
            }
        }
        Command::Register {
            email,
            username,
            full_name,
        } => {
            let password = agriconfig::prompt_password("password", "Password")?;
            let confirm = agriconfig::prompt_password("password confirmation", "Confirm password")?;
            let mut registration = Registration::new(email, username, password, confirm);
            if let Some(full_name) = full_name {
                registration = registration.with_full_name(full_name);
            }
            let mut session = new_session(&config)?;
            let user = session.register(&registration).await?;
            println!("Registered and logged in as {}", user.username.bold());
        }
        Command::Logout => {
            let mut session = new_session(&config)?;
            session.logout()?;
            println!("Logged out.");
        }
        Command::Whoami => {
            let session = restored_session(&config).await?;
            match session.current_user() {
                Some(user) => render::user(user),
                None => {
                    println!("Not logged in.");
                    return Ok(false);
                }
            }
        }
        Command::Dashboard => {
            let session = restored_session(&config).await?;
            require(Route::Dashboard, &session)?;
            if let Some(user) = session.current_user() {
                render::user(user);
            }
            println!();
            for (route, command) in [
                (Route::CropRecommendation, "agriline crop"),
                (Route::FertilizerRecommendation, "agriline fertilizer"),
                (Route::DiseaseDetection, "agriline disease <image>"),
            ] {
                println!("  {:<28}{}", route.path(), command.dimmed());
            }
        }
        Command::Crop(soil) => {
            let mut session = restored_session(&config).await?;
            require(Route::CropRecommendation, &session)?;
            let controller = FormController::new(CropForm {
                soil: soil.into_inputs(),
            });
            return run_form(&mut session, controller, &config.display).await;
        }
        Command::Fertilizer { soil, crop_type } => {
            let crop_type = crop_type
                .map(|value| value.parse::<CropType>())
                .transpose()?;
            let mut session = restored_session(&config).await?;
            require(Route::FertilizerRecommendation, &session)?;
            let controller = FormController::new(FertilizerForm {
                soil: soil.into_inputs(),
                crop_type,
            });
            return run_form(&mut session, controller, &config.display).await;
        }
        Command::Disease { image } => {
            let upload = read_image(&image)?;
            let mut session = restored_session(&config).await?;
            require(Route::DiseaseDetection, &session)?;
            let mut controller = FormController::<DiseaseForm>::default();
            if !controller.select_image(upload) {
                let message = controller.error().unwrap_or("Invalid image");
                return Err(anyhow::anyhow!("{message}"));
            }
            return run_form(&mut session, controller, &config.display).await;
        }
        Command::History { kind, limit } => {
            let session = restored_session(&config).await?;
            require(Route::Dashboard, &session)?;
            let limit = Some(limit.unwrap_or(config.display.history_limit));
            let client = session.client();
            let (title, entries) = match kind {
                HistoryKind::Crop => ("crop", client.crop_history(limit).await),
                HistoryKind::Fertilizer => ("fertilizer", client.fertilizer_history(limit).await),
                HistoryKind::Disease => ("disease", client.disease_history(limit).await),
            };
            render::history(title, &entries);
        }
        Command::Health => {
            let client = get_client(&config)?;
            let (prediction, disease) =
                tokio::join!(client.prediction_health(), client.disease_health());
            render::health("crop & fertilizer", &prediction);
            render::health("disease", &disease);
            return Ok(prediction.is_ok() && disease.is_ok());
        }
        Command::Open { path } => {
            let route = path.parse::<Route>()?;
            let mut session = new_session(&config)?;
            let restored = session.restore().await.map(|_| ());
            if let Err(err) = restored {
                warn!(error = %err, "could not verify stored session");
            }
            match guard(route, &session) {
                GuardDecision::Render(route) => println!("render {route}"),
                GuardDecision::Redirect(target) => println!("redirect {target}"),
                GuardDecision::Loading => println!("loading"),
            }
        }
    }

    Ok(true)
}
