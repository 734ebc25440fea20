/// Show only the first few characters of a token or password.
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        return "****".to_string();
    }
    format!("{}****", visible)
}
