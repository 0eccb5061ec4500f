use dotenv::dotenv;
use nurse_directory::prelude::*;
use std::env;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv().ok();
    pretty_env_logger::init();

    let username = env::var("NURSE_USERNAME").expect("NURSE_USERNAME must be set");
    let password = env::var("NURSE_PASSWORD").expect("NURSE_PASSWORD must be set");

    let mut options = ClientOptions::default();
    if let Ok(url) = env::var("NURSE_DIRECTORY_URL") {
        options = options.with_base_url(&url);
    }
    let session_file = env::var("NURSE_SESSION_FILE").unwrap_or_else(|_| "nurse_prefs.json".to_string());

    let directory = NurseDirectory::new_with_options(options, SessionStore::file(&session_file))?;
    println!("Using directory at {}", directory.options.base_url);

    let auth = directory.auth();
    auth.set_username(&username);
    auth.set_password(&password);
    auth.login().await;

    match auth.login_result() {
        AuthResult::Succeeded(nurse) => {
            println!("Signed in as {} (id {:?})", nurse.username, nurse.id)
        }
        AuthResult::Failed(reason) => {
            println!("Login failed: {}", reason);
            return Ok(());
        }
        other => {
            println!("Unexpected login state: {:?}", other);
            return Ok(());
        }
    }

    let profile = directory.profile().await;
    match profile.record() {
        Some(nurse) => println!(
            "Profile: {} / {}",
            nurse.display_name.as_deref().unwrap_or("-"),
            nurse.role.as_deref().unwrap_or("-")
        ),
        None => println!("Profile unavailable: {:?}", profile.error()),
    }

    let listing = directory.listing().await;
    if let Some(error) = listing.error() {
        println!("Directory unavailable: {}", error);
    }
    for nurse in listing.nurses() {
        println!(
            "{:>4}  {:<16} {}",
            nurse.id.map(|id| id.to_string()).unwrap_or_default(),
            nurse.username,
            nurse.display_name.unwrap_or_default()
        );
    }

    auth.logout();
    println!("Signed out");

    Ok(())
}
