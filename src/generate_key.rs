// generate_key.rs
// Utility to generate a new encryption key for the deployment
#![allow(dead_code)]

#[path = "services/encryption.rs"]
mod encryption;

use encryption::EncryptionService;

fn main() {
    println!("Generating new AES-256 encryption key...\n");

    let key = EncryptionService::generate_key();

    println!("Add this to your .env file:");
    println!("─────────────────────────────────────────────────");
    println!("ENCRYPTION_MASTER_KEY={}", key);
    println!("─────────────────────────────────────────────────");
    println!("\nKeep this key secure and never commit it to version control.");
    println!("If the key changes, previously issued client-facing ids stop resolving.");
}
