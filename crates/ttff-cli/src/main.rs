#![forbid(unsafe_code)]

fn main() {
    ttff_cli::util::init_logging();
    let integration = ttff_cli::util::OutputIntegration::detect();
    if let Err(error) = ttff_cli::run_from_env() {
        tracing::debug!(exit_code = error.exit_code(), "command failed");
        if integration.should_emit_json() {
            eprintln!(
                "{}",
                serde_json::json!({
                    "status": "error",
                    "error": error.to_string(),
                    "exit_code": error.exit_code(),
                    "integration": integration,
                })
            );
        } else {
            eprintln!("{error}");
        }
        std::process::exit(error.exit_code());
    }
}
