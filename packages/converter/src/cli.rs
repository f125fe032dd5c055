//! Command-line interface for the converter.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::compare::{double_convert, parse_exclude_list, Comparator, ComparatorConfig, CompareOptions, ImportanceRules};
use crate::config::DEFAULT_OBJECT_LIMIT;
use crate::convert::{converter_for, Converter, Task, TaskConfig};
use crate::error::{ConvertError, Result};
use crate::report::{Level, RunReport};
use crate::types::{Direction, Document};

/// Dictionary file used when `-d` is not given.
const DEFAULT_DICTIONARY: &str = "dic.txt";

/// REX Converter - convert real-estate listings between REX and partner formats.
#[derive(Parser)]
#[command(name = "rex-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log progress (info level) unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,

    /// Write errors and statistics of the run to this YAML file
    #[arg(long)]
    pub stats: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert REX orders into a partner format.
    Export {
        /// Target format (e.g., winner)
        #[arg(short, long = "to")]
        to: String,

        /// Input file, repeatable (default: standard input)
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Output directory (default: print to standard output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Dictionary file
        #[arg(short, long, default_value = DEFAULT_DICTIONARY)]
        dictionary: PathBuf,
    },

    /// Convert partner listings into REX orders.
    Import {
        /// Source format (e.g., winner)
        #[arg(short, long = "from")]
        from: String,

        /// Input file, repeatable (default: standard input)
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Output file (default: print to standard output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Dictionary file
        #[arg(short, long, default_value = DEFAULT_DICTIONARY)]
        dictionary: PathBuf,

        /// XSD schema the input is validated against, repeatable
        #[arg(long)]
        schema: Vec<PathBuf>,

        /// Convert even if validation fails
        #[arg(long)]
        force: bool,
    },

    /// Export and re-import REX orders, then compare the result with the input.
    Compare {
        /// Converter format (e.g., winner)
        format: String,

        /// REX input file
        input: PathBuf,

        /// Dictionary file
        #[arg(short, long, default_value = DEFAULT_DICTIONARY)]
        dictionary: PathBuf,

        /// File with paths to leave out of the comparison; `/` starts a regex
        #[arg(short = 'x', long)]
        exclude: Option<PathBuf>,

        /// Compare all objects and print per-path statistics
        #[arg(short, long)]
        summary: bool,

        /// Compare all objects and print each one with values
        #[arg(short, long)]
        verbose: bool,

        /// Objects to compare when neither -s nor -v is given
        #[arg(short = 'n', long, default_value_t = DEFAULT_OBJECT_LIMIT)]
        limit: usize,
    },
}

/// Run the CLI with parsed arguments.
///
/// # Errors
/// Any run-level failure of the chosen command.
pub fn run(cli: Cli) -> Result<()> {
    let task = match cli.command {
        Commands::Export {
            to,
            input,
            output,
            dictionary,
        } => export_command(&to, &input, output.as_deref(), dictionary)?,
        Commands::Import {
            from,
            input,
            output,
            dictionary,
            schema,
            force,
        } => import_command(&from, &input, output.as_deref(), dictionary, schema, force)?,
        Commands::Compare {
            format,
            input,
            dictionary,
            exclude,
            summary,
            verbose,
            limit,
        } => {
            let options = CompareOptions {
                summary,
                verbose,
                limit,
            };
            compare_command(&format, &input, dictionary, exclude.as_deref(), options)?
        }
    };

    if let Some(path) = cli.stats {
        let yaml = RunReport::new(&task.errors, &task.stats).to_yaml()?;
        fs::write(&path, yaml)?;
        eprintln!("{} {}", style("Statistics saved to:").green().bold(), path.display());
    }
    Ok(())
}

/// Read the input files, or standard input when there are none.
fn read_input(paths: &[PathBuf]) -> Result<Vec<Document>> {
    if paths.is_empty() {
        let mut contents = String::new();
        io::stdin().read_to_string(&mut contents)?;
        return Ok(vec![Document::new("-", contents)]);
    }
    paths
        .iter()
        .map(|path| {
            let doc = Document::read(path)?;
            eprintln!(
                "Input data length = {} read from {}",
                style(doc.contents.len()).cyan(),
                path.display()
            );
            Ok(doc)
        })
        .collect()
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print the outcome recorded in the task's collectors.
fn print_outcome(task: &Task) {
    eprintln!("---------------------------------------");
    if task.errors.is_empty() {
        eprintln!("{}", style("Conversion OK").green().bold());
    } else {
        eprintln!(
            "{} ({})",
            style("There were errors during conversion").yellow().bold(),
            task.errors.len()
        );
        eprint!("{}", task.errors.render(Some(Level::Warn)));
    }
    eprint!("{}", task.stats);
}

fn export_command(format: &str, input: &[PathBuf], output: Option<&Path>, dictionary: PathBuf) -> Result<Task> {
    let converter = converter_for(format)?;
    if let Some(dir) = output {
        ensure_directory(dir)?;
    }
    let documents = read_input(input)?;
    eprintln!(
        "{} from REX to {}",
        style("Converting").bold(),
        style(format).cyan()
    );

    let mut task = Task::new(format, Direction::Export, TaskConfig::new(dictionary));
    let pb = spinner("Exporting orders...");
    let result = converter.export(&mut task, &documents);
    pb.finish_and_clear();
    let exported = result?;

    print_outcome(&task);
    for doc in &exported {
        match output {
            Some(dir) => {
                let path = dir.join(&doc.name);
                fs::write(&path, &doc.contents)?;
                eprintln!("{} {}", style("Saved to:").green().bold(), path.display());
            }
            None => println!("{}", doc.contents),
        }
    }
    Ok(task)
}

fn import_command(
    format: &str,
    input: &[PathBuf],
    output: Option<&Path>,
    dictionary: PathBuf,
    schemas: Vec<PathBuf>,
    force: bool,
) -> Result<Task> {
    let converter = converter_for(format)?;
    let documents = read_input(input)?;
    eprintln!(
        "{} from {} to REX",
        style("Converting").bold(),
        style(format).cyan()
    );

    let validate = !schemas.is_empty();
    let mut task = Task::new(
        format,
        Direction::Import,
        TaskConfig::new(dictionary).with_schemas(schemas),
    );
    if validate {
        let failed = documents
            .iter()
            .filter(|doc| !converter.validate(&mut task, doc))
            .count();
        if failed > 0 {
            eprintln!("---------------------------------------");
            eprintln!("{}", style("Validation failed").red().bold());
            eprint!("{}", task.errors.render(None));
            if !force {
                return Err(ConvertError::ValidationFailed(failed));
            }
        }
    }

    let pb = spinner("Importing listings...");
    let result = converter.import(&mut task, &documents);
    pb.finish_and_clear();
    let imported = result?;

    print_outcome(&task);
    match output {
        Some(path) => {
            fs::write(path, &imported.contents)?;
            eprintln!("{} {}", style("Saved to:").green().bold(), path.display());
        }
        None => println!("{}", imported.contents),
    }
    Ok(task)
}

fn compare_command(
    format: &str,
    input: &Path,
    dictionary: PathBuf,
    exclude: Option<&Path>,
    options: CompareOptions,
) -> Result<Task> {
    let converter: Box<dyn Converter> = converter_for(format)?;
    let mut rules = ImportanceRules::default();
    if let Some(path) = exclude {
        rules = rules.with_unimportant(parse_exclude_list(&fs::read_to_string(path)?)?);
    }
    let comparator = Comparator::new(ComparatorConfig { rules, options });

    let limit = options.object_limit();
    if let Some(limit) = limit {
        eprintln!(
            "Limiting object count to {}, use -s or -v to process the whole input",
            style(limit).cyan()
        );
    }
    let documents = [Document::read(input)?];
    let mut task = Task::new(format, Direction::Export, TaskConfig::new(dictionary));
    let pb = spinner("Running double conversion...");
    let result = double_convert(converter.as_ref(), &mut task, &documents, limit);
    pb.finish_and_clear();
    let (original, converted) = result?;

    let comparison = comparator.compare(&original, &converted);
    println!("{}", comparator.render(&comparison));
    Ok(task)
}

fn ensure_directory(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Err(ConvertError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Output directory does not exist: {}", dir.display()),
        )));
    }
    if !dir.is_dir() {
        return Err(ConvertError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Output path is not a directory: {}", dir.display()),
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_export() {
        let cli = Cli::parse_from(["rex-cli", "export", "--to", "winner", "-i", "orders.xml", "-o", "out"]);
        assert!(!cli.verbose);
        let Commands::Export {
            to,
            input,
            output,
            dictionary,
        } = cli.command
        else {
            panic!("expected export");
        };
        assert_eq!(to, "winner");
        assert_eq!(input, vec![PathBuf::from("orders.xml")]);
        assert_eq!(output, Some(PathBuf::from("out")));
        assert_eq!(dictionary, PathBuf::from(DEFAULT_DICTIONARY));
    }

    #[test]
    fn test_cli_parse_import_with_schemas() {
        let cli = Cli::parse_from([
            "rex-cli",
            "--stats",
            "run.yaml",
            "import",
            "--from",
            "winner",
            "-i",
            "flats_spb.xml",
            "-i",
            "rent_spb.xml",
            "--schema",
            "flats_spb.xsd",
            "--force",
        ]);
        assert_eq!(cli.stats, Some(PathBuf::from("run.yaml")));
        let Commands::Import {
            input, schema, force, ..
        } = cli.command
        else {
            panic!("expected import");
        };
        assert_eq!(input.len(), 2);
        assert_eq!(schema, vec![PathBuf::from("flats_spb.xsd")]);
        assert!(force);
    }

    #[test]
    fn test_cli_parse_compare() {
        let cli = Cli::parse_from(["rex-cli", "-v", "compare", "winner", "rex.xml", "-x", "skip.txt", "-v"]);
        assert!(cli.verbose);
        let Commands::Compare {
            format,
            exclude,
            summary,
            verbose,
            limit,
            ..
        } = cli.command
        else {
            panic!("expected compare");
        };
        assert_eq!(format, "winner");
        assert_eq!(exclude, Some(PathBuf::from("skip.txt")));
        assert!(!summary);
        assert!(verbose);
        assert_eq!(limit, DEFAULT_OBJECT_LIMIT);
    }

    #[test]
    fn test_ensure_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ensure_directory(dir.path()).is_ok());
        assert!(ensure_directory(&dir.path().join("missing")).is_err());
    }
}
