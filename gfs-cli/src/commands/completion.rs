use std::io::{self, Write};

use clap::CommandFactory;
use clap_complete::{Shell, generate};

const BIN_NAME: &str = "gfs";

/// Prints the completion script for `shell` to stdout.
pub fn generate_completion(shell: Shell) {
    write_completion(shell, &mut io::stdout().lock());
}

fn write_completion(shell: Shell, out: &mut dyn Write) {
    let mut command = crate::Cli::command();
    generate(shell, &mut command, BIN_NAME, out);
}
