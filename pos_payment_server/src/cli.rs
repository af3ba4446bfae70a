use std::{env, env::VarError};

/// The server is configured entirely through environment variables. Any argument prints the help text.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
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
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 17] = [
        "RUST_LOG",
        "POS_HOST",
        "POS_PORT",
        "POS_DATABASE_URL",
        "POS_GATEWAY_BASE_URL",
        "POS_GATEWAY_POS_ID",
        "POS_GATEWAY_CALLBACK_URL",
        "POS_GATEWAY_TIMEOUT",
        "POS_WEBHOOK_RATE_LIMIT",
        "POS_USE_X_FORWARDED_FOR",
        "POS_USE_FORWARDED",
        "POS_SMTP_HOST",
        "POS_SMTP_PORT",
        "POS_FROM_EMAIL",
        "POS_BRAND_NAME",
        "POS_SWEEP_INTERVAL",
        "POS_SWEEP_WINDOW",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
