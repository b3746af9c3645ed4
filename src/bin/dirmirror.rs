#![deny(unsafe_code)]

use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    let code = cli::run(env::args_os());
    ExitCode::from(u8::try_from(code.clamp(0, i32::from(u8::MAX))).unwrap_or(u8::MAX))
}
