use anyhow::Result;
use mailvault_shared::constants::KEY_ENV_VAR;
use mailvault_shared::generate_key;

pub fn run() -> Result<()> {
    let key_hex = hex::encode(generate_key());
    print!("{}", key_report(&key_hex));
    Ok(())
}

/// The key plus guidance on where to put it.
pub fn key_report(key_hex: &str) -> String {
    let mut out = String::new();
    out.push_str("Generated new encryption key:\n");
    out.push_str("============================\n");
    out.push_str(&format!("Hex format: {key_hex}\n"));
    out.push_str("\nUsage:\n");
    out.push_str("1. Add to the server environment (.env file):\n");
    out.push_str(&format!("   GIT_ENCRYPTION_KEY={key_hex}\n"));
    out.push_str("\n2. Or use with the operator tools:\n");
    out.push_str(&format!("   export {KEY_ENV_VAR}={key_hex}\n"));
    out.push_str("   mailvault list\n");
    out.push_str("\nIMPORTANT: Store this key securely! You cannot decrypt messages without it.\n");
    out
}
