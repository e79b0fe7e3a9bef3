//! Prints an argon2 hash for seeding `[[users]]` in the server config.

use std::io::{self, Write};

// The server is a binary crate, so share the hashing code by path.
#[allow(dead_code)]
#[path = "../auth/password.rs"]
mod password;

fn main() -> anyhow::Result<()> {
    eprint!("Enter password: ");
    io::stderr().flush()?;

    let mut password = String::new();
    io::stdin().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']);

    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    println!("{}", password::hash_password(password)?);
    Ok(())
}
