use std::process::ExitCode;

fn main() -> ExitCode {
    match tidepool::run() {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
