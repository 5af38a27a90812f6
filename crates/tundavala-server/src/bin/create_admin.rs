//! Seeds an admin account. Admins cannot self-register through the API, so
//! the first one is created out of band with this tool.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::Parser;
use uuid::Uuid;

use tundavala_api::auth::hash_password;
use tundavala_types::models::{Role, User};

#[derive(Debug, Parser)]
#[command(name = "create-admin", about = "Create a Tundavala admin account")]
struct Args {
    /// Admin email; prompted for when omitted.
    #[arg(long)]
    email: Option<String>,

    /// Admin password; prompted for when omitted.
    #[arg(long)]
    password: Option<String>,

    /// Display name; prompted for when omitted.
    #[arg(long)]
    name: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let email = match args.email {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = match args.password {
        Some(password) => password,
        None => prompt("Password: ")?,
    };
    let name = match args.name {
        Some(name) => name,
        None => prompt("Name: ")?,
    };

    if !email.contains('@') {
        bail!("invalid email address");
    }
    if password.len() < 8 {
        bail!("password must be at least 8 characters");
    }
    if name.trim().is_empty() {
        bail!("name is required");
    }

    let db_path = std::env::var("TUNDAVALA_DB_PATH").unwrap_or_else(|_| "tundavala.db".into());
    let db = tundavala_db::Database::open(&PathBuf::from(&db_path))
        .with_context(|| format!("failed to open database at {}", db_path))?;

    if db.get_user_by_email(&email)?.is_some() {
        bail!("a user with email {} already exists", email);
    }

    let password_hash = hash_password(&password)?;
    let user = User {
        id: Uuid::new_v4(),
        email,
        name: name.trim().to_string(),
        role: Role::Admin,
        photo_url: None,
        created_at: Utc::now(),
    };
    db.create_user(&user, &password_hash)?;

    println!("admin {} created with id {}", user.email, user.id);
    Ok(())
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        bail!("no value given");
    }
    Ok(value)
}
