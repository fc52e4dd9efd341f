use explorer_api::ConnectionProfile;
use profiles::{FileProfileRepository, ProfileError, ProfileRepository, ProfileUpdate};

#[tokio::test]
async fn missing_file_is_an_empty_repository() {
    let dir = tempfile::tempdir().unwrap();
    let repo = FileProfileRepository::new(dir.path().join("profiles.json"));
    assert!(repo.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn mutations_survive_a_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("profiles.json");

    let repo = FileProfileRepository::new(&path);
    let a = repo.create(ConnectionProfile::new("a", "mqtt://a")).await.unwrap();
    let b = repo.create(ConnectionProfile::new("b", "mqtts://b")).await.unwrap();
    repo.update(
        &a,
        ProfileUpdate {
            keepalive: Some(Some(15)),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    repo.delete(&b).await.unwrap();

    let reopened = FileProfileRepository::new(&path);
    let all = reopened.list().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, a);
    assert_eq!(all[0].keepalive, Some(15));

    let mut tmp = path.clone().into_os_string();
    tmp.push(".tmp");
    assert!(!std::path::Path::new(&tmp).exists());
}

#[tokio::test]
async fn optional_fields_are_omitted_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles.json");
    let repo = FileProfileRepository::new(&path);
    repo.create(ConnectionProfile::new("plain", "broker")).await.unwrap();

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let stored = raw[0].as_object().unwrap();
    assert!(stored.contains_key("url"));
    assert!(!stored.contains_key("username"));
}

#[tokio::test]
async fn malformed_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles.json");
    std::fs::write(&path, "{ not an array").unwrap();

    let repo = FileProfileRepository::new(&path);
    assert!(matches!(repo.list().await, Err(ProfileError::Malformed { .. })));
    assert!(matches!(
        repo.create(ConnectionProfile::new("x", "y")).await,
        Err(ProfileError::Malformed { .. })
    ));
}
