//! Prints an argon2 hash for `ADMIN_PASSCODE_HASH`, so the plaintext
//! passcode never has to live in the environment.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let passcode = match rpassword::prompt_password("Admin passcode: ") {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to read passcode: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let confirm = match rpassword::prompt_password("Repeat passcode: ") {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to read passcode: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if passcode.is_empty() || passcode != confirm {
        eprintln!("Passcodes are empty or do not match");
        return ExitCode::FAILURE;
    }

    let salt = SaltString::generate(&mut OsRng);
    match Argon2::default().hash_password(passcode.as_bytes(), &salt) {
        Ok(hash) => {
            println!("ADMIN_PASSCODE_HASH='{}'", hash);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Password hash error: {}", e);
            ExitCode::FAILURE
        }
    }
}
