//! # Shell Completion Module
//!
//! Completion scripts for the `vgsplay` command, generated by clap_complete.
//!
//! ```bash
//! # Generate bash completions
//! vgsplay completion bash > ~/.local/share/bash-completion/completions/vgsplay
//!
//! # Generate zsh completions
//! vgsplay completion zsh > ~/.config/zsh/completions/_vgsplay
//! ```

use crate::cli::Shell;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::Write;

/// Writes the completion script for `cmd` to `out`.
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command, out: &mut dyn Write) {
    let name = cmd.get_name().to_string();
    generate(gen, cmd, name, out);
}

/// Convert our Shell enum to clap_complete's Shell enum
pub fn shell_to_completion_shell(shell: &Shell) -> CompletionShell {
    match shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    }
}
