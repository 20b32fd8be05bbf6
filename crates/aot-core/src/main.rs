use aot_core::cli::{run, Cli};
use aot_core::exit_codes::ExitCode;
use aot_core::logging::init_logging;
use clap::Parser;
use tracing::error;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.verbose);

    let code = match run(cli) {
        Ok(()) => ExitCode::Clean,
        Err(err) => {
            error!(code = err.code(), error = %err, "command failed");
            eprintln!("error: {err}");
            ExitCode::for_error(&err)
        }
    };
    std::process::exit(code.as_i32());
}
