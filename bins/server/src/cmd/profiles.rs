use explorer_api::ConnectionProfile;
use profiles::{FileProfileRepository, ProfileRepository, find_profile};

use crate::config::{ProfilesAction, ProfilesArgs, ServerConfig};
use crate::error::ServerError;

pub async fn run(args: ProfilesArgs) -> Result<(), ServerError> {
    let config = ServerConfig::load(&args.config)?;
    let repo = FileProfileRepository::new(&config.profiles_path);

    match args.action {
        ProfilesAction::List => {
            let profiles = repo.list().await?;
            if profiles.is_empty() {
                println!("no profiles in {}", repo.path().display());
            }
            for p in profiles {
                println!("{}\t{}\t{}", p.id, p.name, p.url);
            }
        }
        ProfilesAction::Add {
            name,
            url,
            client_id,
            username,
            password,
            keepalive,
            clean_start,
        } => {
            mqtt_source::parse_broker_url(&url)?;
            let mut profile = ConnectionProfile::new(name, url);
            profile.client_id = client_id;
            profile.username = username;
            profile.password = password;
            profile.keepalive = keepalive;
            profile.clean_start = clean_start;
            let id = repo.create(profile).await?;
            println!("{id}");
        }
        ProfilesAction::Remove { key } => {
            let profile = find_profile(&repo, &key).await?;
            repo.delete(&profile.id).await?;
            tracing::info!(id = %profile.id, name = %profile.name, "profile removed");
        }
    }
    Ok(())
}
