use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use ecopoints_portal::clock::SystemClock;
use ecopoints_portal::repositories::media::CloudinaryClient;
use ecopoints_portal::repositories::preferences::PreferenceStore;
use ecopoints_portal::repositories::students::StudentRepository;
use ecopoints_portal::repositories::supabase::SupabaseClient;
use ecopoints_portal::services::auth::{login, LoginError};
use ecopoints_portal::services::portal::{start_portal, Collaborators, PortalOptions};
use ecopoints_portal::services::ServiceError;
use ecopoints_portal::settings::Settings;
use ecopoints_portal::shell::{self, Exit, Input};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    #[arg(long, default_value = "log4rs.yaml")]
    log4rs: String,
    /// Pre-fills the first login prompt.
    #[arg(short, long)]
    student_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let settings = Settings::new(&args.config).context("Failed to load settings.")?;

    init_logging(&args.log4rs)?;
    info!("Starting EcoPoints portal.");

    let supabase = SupabaseClient::new(settings.supabase.url, settings.supabase.anon_key);
    let preferences = PreferenceStore::locate(settings.preferences.dir.as_deref());
    if preferences.is_none() {
        warn!("No config directory found, theme changes will not be saved.");
    }

    let collaborators = Collaborators {
        backend: Arc::new(supabase.clone()),
        auth: Arc::new(supabase.clone()),
        images: Arc::new(CloudinaryClient::new(
            settings.cloudinary.upload_url,
            settings.cloudinary.upload_preset,
        )),
        preferences,
        clock: Arc::new(SystemClock),
    };
    let options = PortalOptions {
        check_in_reward: settings.rewards.check_in_reward,
        qr_url: settings.qr.url,
    };

    let students = StudentRepository::new(collaborators.backend.clone());
    let mut lines = shell::input();
    let mut student_id = args.student_id;

    loop {
        if !sign_in(&students, &supabase, student_id.take(), &mut lines).await? {
            return Ok(());
        }

        let sender = match start_portal(collaborators.clone(), options.clone()).await {
            Ok(sender) => sender,
            Err(ServiceError::Unauthenticated) => continue,
            Err(e) => return Err(e.into()),
        };

        match shell::run(sender, &mut lines).await? {
            Exit::Quit => return Ok(()),
            Exit::SignedOut => info!("Signed out."),
        }
    }
}

/// Prompts until a sign-in succeeds. `false` when stdin closes first.
async fn sign_in(
    students: &StudentRepository,
    auth: &SupabaseClient,
    mut student_id: Option<String>,
    lines: &mut Input,
) -> Result<bool> {
    let mut stdout = tokio::io::stdout();

    loop {
        let id = match student_id.take() {
            Some(id) => id,
            None => match prompt(&mut stdout, lines, "Student ID: ").await? {
                Some(id) => id,
                None => return Ok(false),
            },
        };
        let password = match prompt(&mut stdout, lines, "Password: ").await? {
            Some(password) => password,
            None => return Ok(false),
        };

        match login(students, auth, &id, &password).await {
            Ok(_) => return Ok(true),
            Err(LoginError::Other(message)) => {
                warn!("Login failed: {}", message);
                shell::print(&mut stdout, &message).await?;
            }
            Err(e) => shell::print(&mut stdout, &e.to_string()).await?,
        }
    }
}

async fn prompt(
    stdout: &mut tokio::io::Stdout,
    lines: &mut Input,
    label: &str,
) -> Result<Option<String>> {
    use tokio::io::AsyncWriteExt;

    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    Ok(lines.next_line().await?)
}

fn init_logging(path: &str) -> Result<(), anyhow::Error> {
    if !Path::new("logs").exists() {
        fs::create_dir("logs")?;
    }

    match log4rs::init_file(path, Default::default()) {
        Ok(_) => Ok(()),
        Err(e) => {
            eprintln!("[ERROR] Failed to initialize logging: {}", e);
            Err(anyhow::anyhow!("Could not initialize logging: {}", e))
        }
    }
}
