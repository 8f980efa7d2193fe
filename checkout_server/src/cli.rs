use std::{env, env::VarError};

/// There's no real CLI for the server. Any argument prints the help text and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Gateway credentials live on organizations, so nothing here is secret. Keep the list explicit anyway.
    const DISPLAY_ENVS: [&str; 14] = [
        "RUST_LOG",
        "CHECKOUT_HOST",
        "CHECKOUT_PORT",
        "CHECKOUT_DATABASE_URL",
        "CHECKOUT_DB_MAX_CONNECTIONS",
        "CHECKOUT_EVENT_BUFFER_SIZE",
        "CHECKOUT_SQLITE_AUTO_MIGRATE",
        "CHECKOUT_STRIPE_API_URL",
        "CHECKOUT_SQUARE_API_URL",
        "CHECKOUT_SQUARE_SANDBOX_URL",
        "CHECKOUT_PAYPAL_API_URL",
        "CHECKOUT_PAYPAL_SANDBOX_URL",
        "CHECKOUT_AUTHORIZENET_API_URL",
        "CHECKOUT_AUTHORIZENET_SANDBOX_URL",
    ];

    println!("Current environment values:");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
