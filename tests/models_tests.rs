use kcdeploy::models::{AuthToken, Credentials, Flavor, FlavorList, KeycloakUser, KeypairList, NetworkList};
use kcdeploy::wizard::ServerInstanceForm;
use kcdeploy::ApiError;
use serde_json::json;

#[test]
fn test_flavor_summary() {
    let flavor = Flavor {
        id: "2".to_string(),
        name: "m1.medium".to_string(),
        vcpus: 2,
        ram: 4096,
        disk: 40,
    };
    assert_eq!(flavor.summary(), "2vCPU 4GB 40GB");

    let tiny = Flavor { ram: 512, ..flavor };
    assert_eq!(tiny.ram_display(), "512MB");
}

#[test]
fn test_nova_listings_deserialize() {
    let flavors: FlavorList = serde_json::from_value(json!({
        "flavors": [{"id": "1", "name": "m1.small", "vcpus": 1, "ram": 2048, "disk": 20, "links": []}]
    }))
    .unwrap();
    assert_eq!(flavors.flavors[0].name, "m1.small");

    let keypairs: KeypairList = serde_json::from_value(json!({
        "keypairs": [{"keypair": {"name": "k1", "fingerprint": "aa:bb", "public_key": "ssh-rsa AAAA"}}]
    }))
    .unwrap();
    let keypairs = keypairs.into_keypairs();
    assert_eq!(keypairs[0].name, "k1");
    assert_eq!(serde_json::to_value(&keypairs[0]).unwrap()["publicKey"], "ssh-rsa AAAA");

    let networks: NetworkList = serde_json::from_value(json!({
        "networks": [{"id": "n1", "label": "private"}]
    }))
    .unwrap();
    assert_eq!(networks.networks[0].label, "private");
}

#[test]
fn test_blank_token_is_unauthorized() {
    assert!(matches!(AuthToken::parse("   "), Err(ApiError::Unauthorized)));
    assert_eq!(AuthToken::parse(" abc ").unwrap().as_str(), "abc");
}

#[test]
fn test_token_debug_is_masked() {
    let token = AuthToken::parse("gAAAAABsecretvalue").unwrap();
    let shown = format!("{:?}", token);
    assert!(!shown.contains("secretvalue"));
}

#[test]
fn test_credentials_debug_hides_password() {
    let creds: Credentials = serde_json::from_value(json!({"username": "demo", "password": "hunter2"})).unwrap();
    assert_eq!(creds.user_domain, "Default");
    assert!(!format!("{:?}", creds).contains("hunter2"));
}

#[test]
fn test_email_filter_is_case_insensitive() {
    let user = KeycloakUser {
        username: "alice".to_string(),
        email: Some("Alice@Example.org".to_string()),
        ..Default::default()
    };
    assert!(user.email_matches("example.ORG"));
    assert!(user.email_matches(""));
    assert!(!user.email_matches("other"));

    let no_email = KeycloakUser::default();
    assert!(!no_email.email_matches("a"));
}

#[test]
fn test_form_produces_creation_payload() {
    let form = ServerInstanceForm {
        flavor: "1".to_string(),
        keypair: "k1".to_string(),
        network: "n1".to_string(),
        port: "8080".to_string(),
    };
    let request = form.validate().unwrap();
    assert_eq!(
        serde_json::to_value(&request).unwrap(),
        json!({"flavor": "1", "keypair": "k1", "network": "n1", "keycloakPort": "8080"})
    );
}

#[test]
fn test_form_reports_every_empty_field() {
    let form: ServerInstanceForm = serde_json::from_value(json!({"flavor": "1"})).unwrap();
    assert_eq!(form.port, "8080");
    match form.validate() {
        Err(ApiError::ValidationFailed(fields)) => {
            let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
            assert_eq!(names, vec!["keypair", "network"]);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_form_accepts_keycloak_port_alias() {
    let form: ServerInstanceForm = serde_json::from_value(json!({
        "flavor": "1", "keypair": "k1", "network": "n1", "keycloakPort": "8443"
    }))
    .unwrap();
    assert_eq!(form.validate().unwrap().keycloak_port, "8443");
}
