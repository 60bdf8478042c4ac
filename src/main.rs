//! md-annotate - command line inspector
//!
//! Renders a Markdown file, restores its saved highlights, optionally adds
//! one, saves, and prints every highlight of the document. `--write-config`
//! writes the effective settings to the config file for editing.
//!
//! ```text
//! md-annotate <file.md> [--add <offset> <length> [color]] [--clear] [--write-config]
//! ```

use log::{error, info, warn};
use md_annotate::annotations::{AnnotationEngine, ColorRef, DocumentKey, PaletteColor};
use md_annotate::config::{load_config, save_config};
use md_annotate::error::{Error, Result};
use md_annotate::tree::render_markdown;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str =
    "usage: md-annotate <file.md> [--add <offset> <length> [color]] [--clear] [--write-config]";

/// A highlight requested on the command line.
#[derive(Debug, PartialEq)]
struct AddRequest {
    offset: usize,
    length: usize,
    color: Option<String>,
}

#[derive(Debug, PartialEq)]
struct CliArgs {
    file: PathBuf,
    add: Option<AddRequest>,
    clear: bool,
    write_config: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let usage = || Error::Application(USAGE.to_string());
    let mut iter = args.iter().peekable();
    let file = iter
        .next()
        .filter(|a| !a.starts_with("--"))
        .map(PathBuf::from)
        .ok_or_else(usage)?;

    let mut add = None;
    let mut clear = false;
    let mut write_config = false;
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--add" => {
                let mut number = || -> Result<usize> {
                    iter.next()
                        .and_then(|v| v.parse().ok())
                        .ok_or_else(usage)
                };
                let offset = number()?;
                let length = number()?;
                let color = iter.next_if(|v| !v.starts_with("--")).cloned();
                add = Some(AddRequest {
                    offset,
                    length,
                    color,
                });
            }
            "--clear" => clear = true,
            "--write-config" => write_config = true,
            _ => return Err(usage()),
        }
    }
    Ok(CliArgs {
        file,
        add,
        clear,
        write_config,
    })
}

/// Palette name, existing custom color name, or a new `rgba(...)`/`#hex` color.
fn resolve_color(engine: &mut AnnotationEngine, name: &str) -> Result<ColorRef> {
    if let Some(color) = PaletteColor::from_name(name) {
        return Ok(ColorRef::Palette(color));
    }
    if let Some(color) = engine.colors().get(name) {
        return Ok(color);
    }
    engine.add_custom_color(name)
}

fn run(args: &[String]) -> Result<()> {
    let cli = parse_args(args)?;
    let settings = load_config();
    if cli.write_config {
        save_config(&settings)?;
    }

    let source = fs::read_to_string(&cli.file)?;
    let tree = render_markdown(&source)?;
    let key = DocumentKey::from_path(&cli.file);

    let mut engine = AnnotationEngine::with_json_storage(settings)?;
    let report = engine.open_document(key, tree);
    if report.dropped() > 0 {
        warn!("{} saved highlight(s) could not be restored", report.dropped());
    }

    if cli.clear {
        let removed = engine.clear_all();
        info!("Cleared {} highlight(s)", removed);
    }

    if let Some(add) = cli.add {
        let color = match add.color.as_deref() {
            Some(name) => Some(resolve_color(&mut engine, name)?),
            None => None,
        };
        match engine.highlight_range(add.offset, add.length, color) {
            Some(id) => info!("Added highlight #{}", id),
            None => warn!(
                "Nothing highlighted at {}+{}",
                add.offset, add.length
            ),
        }
    }

    engine.shutdown()?;

    for span in engine.spans() {
        println!(
            "#{} {} {}+{} {:?}",
            span.id,
            span.color.name(),
            span.start,
            span.len,
            span.text
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_file_only() {
        let cli = parse_args(&args(&["notes.md"])).unwrap();
        assert_eq!(cli.file, PathBuf::from("notes.md"));
        assert!(cli.add.is_none());
        assert!(!cli.clear);
        assert!(!cli.write_config);
    }

    #[test]
    fn test_parse_add_with_color() {
        let cli = parse_args(&args(&["notes.md", "--add", "4", "5", "green", "--clear"])).unwrap();
        assert_eq!(
            cli.add,
            Some(AddRequest {
                offset: 4,
                length: 5,
                color: Some("green".into()),
            })
        );
        assert!(cli.clear);
    }

    #[test]
    fn test_parse_add_without_color() {
        let cli = parse_args(&args(&["notes.md", "--add", "4", "5", "--clear"])).unwrap();
        assert_eq!(cli.add.unwrap().color, None);
        assert!(cli.clear);
    }

    #[test]
    fn test_parse_write_config() {
        let cli = parse_args(&args(&["notes.md", "--write-config"])).unwrap();
        assert!(cli.write_config);
        assert!(cli.add.is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["--clear"])).is_err());
        assert!(parse_args(&args(&["a.md", "--add", "x", "5"])).is_err());
        assert!(parse_args(&args(&["a.md", "--add", "4"])).is_err());
        assert!(parse_args(&args(&["a.md", "--bogus"])).is_err());
    }
}
