use kcdeploy::models::{ClientConfig, ConfigDocument, RealmSettings, TokenLifespans};
use kcdeploy::services::{assemble, to_export_json, write_export, EXPORT_FILE_NAME};

fn sample_client() -> ClientConfig {
    ClientConfig {
        client_id: " portal ".to_string(),
        redirect_uris: vec![
            "https://portal.example.org/*".to_string(),
            " ".to_string(),
            "https://portal.example.org/*".to_string(),
            "http://localhost:3000/*".to_string(),
        ],
        ..ClientConfig::default()
    }
}

#[test]
fn test_assemble_is_idempotent() {
    let realm = RealmSettings::default();
    let client = sample_client();
    let tokens = TokenLifespans::default();

    let first = assemble(&realm, &client, &tokens);
    let second = assemble(&realm, &client, &tokens);

    assert_eq!(first, second);
    assert_eq!(to_export_json(&first).unwrap(), to_export_json(&second).unwrap());
}

#[test]
fn test_assemble_normalizes_client() {
    let doc = assemble(&RealmSettings::default(), &sample_client(), &TokenLifespans::default());
    let client = &doc.clients[0];
    assert_eq!(client.client_id, "portal");
    assert_eq!(client.name, "portal");
    assert_eq!(
        client.redirect_uris,
        vec!["https://portal.example.org/*", "http://localhost:3000/*"]
    );
    assert_eq!(client.root_url, None);
}

#[test]
fn test_default_token_lifespans() {
    let doc = assemble(&RealmSettings::default(), &ClientConfig::default(), &TokenLifespans::default());
    assert_eq!(doc.access_token_lifespan, 300);
    assert_eq!(doc.access_code_lifespan, 60);
    assert_eq!(doc.sso_session_idle_timeout, 1800);
    assert_eq!(doc.sso_session_max_lifespan, 36000);
    assert_eq!(doc.offline_session_idle_timeout, 2_592_000);
}

#[test]
fn test_export_uses_keycloak_field_names() {
    let doc = assemble(&RealmSettings::default(), &ClientConfig::default(), &TokenLifespans::default());
    let value: serde_json::Value = serde_json::from_str(&to_export_json(&doc).unwrap()).unwrap();
    assert_eq!(value["realm"], "keycloak");
    assert_eq!(value["sslRequired"], "external");
    assert_eq!(value["accessTokenLifespan"], 300);
    assert_eq!(value["clients"][0]["clientId"], "console");
    assert!(value.get("displayName").is_none());
}

#[test]
fn test_write_export_into_directory() {
    let dir = tempfile::tempdir().unwrap();
    let doc = assemble(&RealmSettings::default(), &ClientConfig::default(), &TokenLifespans::default());

    let path = write_export(&doc, dir.path()).unwrap();

    assert_eq!(path, dir.path().join(EXPORT_FILE_NAME));
    let written: ConfigDocument = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, doc);
}

#[test]
fn test_write_export_to_named_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("realm.json");
    let doc = assemble(&RealmSettings::default(), &ClientConfig::default(), &TokenLifespans::default());

    let path = write_export(&doc, &target).unwrap();

    assert_eq!(path, target);
    assert!(target.exists());
}
