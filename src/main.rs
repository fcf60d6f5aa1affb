use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "ogcard",
    version,
    about = "Render social preview card images"
)]
struct Cli {
    /// Title text (read from stdin when neither title nor description is given)
    #[arg(short = 't', long = "title")]
    title: Option<String>,

    /// Description text
    #[arg(short = 'd', long = "description")]
    description: Option<String>,

    /// Read settings from a TOML file (merged over the built-in defaults)
    #[arg(short = 's', long = "settings")]
    settings: Option<PathBuf>,

    /// Font file (overrides [font] path)
    #[arg(long = "font")]
    font: Option<PathBuf>,

    /// Output PNG path
    #[arg(short = 'o', long = "out", default_value = "card.png")]
    out: PathBuf,

    /// Outline text areas and blocks
    #[arg(long = "debug")]
    debug: bool,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    ogcard::logging::init(cli.verbose)?;

    let (title, description) =
        if cli.title.is_none() && cli.description.is_none() && !io::stdin().is_terminal() {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            split_stdin(&buffer)
        } else {
            (cli.title, cli.description)
        };

    let outcome = ogcard::run(ogcard::Config {
        title,
        description,
        settings_path: cli.settings,
        font_path: cli.font,
        out: cli.out.clone(),
        debug: cli.debug,
    })?;

    for (idx, err) in &outcome.overlay_errors {
        eprintln!("overlay #{} skipped: {}", idx + 1, err);
    }
    println!("{}", cli.out.display());
    Ok(())
}

/// First line is the title, the rest is the description.
fn split_stdin(input: &str) -> (Option<String>, Option<String>) {
    let input = input.trim_start_matches(['\r', '\n']);
    match input.split_once('\n') {
        Some((title, rest)) => {
            let rest = rest.trim();
            (
                Some(title.trim_end_matches('\r').to_string()),
                (!rest.is_empty()).then(|| rest.to_string()),
            )
        }
        None => (Some(input.trim_end().to_string()), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdin_splits_title_from_description() {
        assert_eq!(
            split_stdin("Title\r\nFirst line\nSecond line\n"),
            (
                Some("Title".to_string()),
                Some("First line\nSecond line".to_string())
            )
        );
        assert_eq!(split_stdin("\nOnly\n"), (Some("Only".to_string()), None));
    }
}
