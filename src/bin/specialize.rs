use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use specialize::{Assignment, Generated, Instantiator, Template, TemplateError, GENERATED_HEADER};
use specialize::error_report::{self, Report};
use specialize::manifest::{LoadTomlError, Manifest};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SPECIALIZE_LOG";
const STDIN_NAME: &str = "stdin";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("usage:\n  specialize gen [--in FILE] [--out FILE] [--pkg NAME] [--tag TAG] [--split] [--no-header] SPEC\n  specialize manifest FILE")]
    Usage,
    #[error("missing argument for {0}")]
    MissingValue(&'static str),
    #[error("unknown option {0}")]
    UnknownOption(String),
    #[error("argument {0:?} is not valid UTF-8")]
    NotUtf8(OsString),
    #[error("--split needs a template file given with --in")]
    SplitWithoutInput,
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error(transparent)]
    Manifest(#[from] LoadTomlError),
    #[error("{0} template(s) failed")]
    Failed(usize),
}

struct GenArgs {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    package: Option<String>,
    tag: Option<String>,
    split: bool,
    header: bool,
    spec: String,
}

impl GenArgs {
    fn parse<I: Iterator<Item=OsString>>(mut args: I) -> Result<Self, CliError> {
        let mut input = None;
        let mut output = None;
        let mut package = None;
        let mut tag = None;
        let mut split = false;
        let mut header = true;
        let mut spec = None;

        while let Some(arg) = args.next() {
            match arg.to_str() {
                Some("--in") => input = Some(PathBuf::from(value(&mut args, "--in")?)),
                Some("--out") => output = Some(PathBuf::from(value(&mut args, "--out")?)),
                Some("--pkg") => package = Some(utf8(value(&mut args, "--pkg")?)?),
                Some("--tag") => tag = Some(utf8(value(&mut args, "--tag")?)?),
                Some("--split") => split = true,
                Some("--no-header") => header = false,
                Some(option) if option.starts_with("--") => return Err(CliError::UnknownOption(option.to_owned())),
                _ => {
                    if spec.is_some() {
                        return Err(CliError::Usage);
                    }
                    spec = Some(utf8(arg)?);
                },
            }
        }

        Ok(GenArgs {
            input,
            output,
            package,
            tag,
            split,
            header,
            spec: spec.ok_or(CliError::Usage)?,
        })
    }
}

fn value<I: Iterator<Item=OsString>>(args: &mut I, option: &'static str) -> Result<OsString, CliError> {
    args.next().ok_or(CliError::MissingValue(option))
}

fn utf8(arg: OsString) -> Result<String, CliError> {
    arg.into_string().map_err(CliError::NotUtf8)
}

fn path_str(path: &Path) -> Result<&str, CliError> {
    path.to_str().ok_or_else(|| CliError::NotUtf8(path.as_os_str().to_owned()))
}

fn configure<'a>(package: Option<&'a str>, tag: Option<&'a str>, header: Option<&'a str>) -> Instantiator<'a> {
    let mut instantiator = Instantiator::new();
    if let Some(package) = package {
        instantiator = instantiator.package(package);
    }
    if let Some(tag) = tag {
        instantiator = instantiator.tag(tag);
    }
    if let Some(header) = header {
        instantiator = instantiator.header(header);
    }
    instantiator
}

/// One merged output, or one output per assignment when splitting.
fn instantiate_all(instantiator: &Instantiator<'_>, template: &Template, assignments: &[Assignment], split: bool) -> Result<Vec<Generated>, TemplateError> {
    if split {
        assignments
            .iter()
            .map(|assignment| instantiator.instantiate(template, std::slice::from_ref(assignment)))
            .collect()
    } else {
        Ok(vec![instantiator.instantiate(template, assignments)?])
    }
}

fn read(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|error| CliError::Read { path: path.to_owned(), error })
}

fn write_file(path: &Path, content: &[u8]) -> Result<(), CliError> {
    let map_err = |error: io::Error| CliError::Write { path: path.to_owned(), error };
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(map_err)?;
    }
    fs::write(path, content).map_err(map_err)?;
    info!(path = %path.display(), "wrote generated file");
    Ok(())
}

/// Moves a path derived next to the template into `out_dir`, keeping the package directory.
fn relocate(path: &Path, template_path: &Path, out_dir: &Path) -> PathBuf {
    let template_dir = template_path.parent().unwrap_or_else(|| Path::new(""));
    match path.strip_prefix(template_dir) {
        Ok(relative) => out_dir.join(relative),
        Err(_) => out_dir.join(path.file_name().unwrap_or_else(|| path.as_os_str())),
    }
}

fn generate(args: GenArgs) -> Result<(), CliError> {
    if args.split && args.input.is_none() {
        return Err(CliError::SplitWithoutInput);
    }

    let assignments = match specialize::expand(&args.spec) {
        Ok(assignments) => assignments,
        Err(error) => error.report("types", &args.spec),
    };

    let (name, source) = match &args.input {
        Some(path) => (path_str(path)?, read(path)?),
        None => {
            let mut source = Vec::new();
            io::Read::read_to_end(&mut io::stdin().lock(), &mut source)
                .map_err(|error| CliError::Read { path: STDIN_NAME.into(), error })?;
            (STDIN_NAME, source)
        },
    };
    let template = match Template::read(name, source.as_slice()) {
        Ok(template) => template,
        Err(error) => error.report(name, String::from_utf8_lossy(&source)),
    };

    let header = if args.header { Some(GENERATED_HEADER) } else { None };
    let mut instantiator = configure(args.package.as_deref(), args.tag.as_deref(), header);
    if let (Some(output), false) = (&args.output, args.split) {
        instantiator = instantiator.output_name(path_str(output)?);
    }

    let outputs = match instantiate_all(&instantiator, &template, &assignments, args.split) {
        Ok(outputs) => outputs,
        Err(error) => error.report(name, template.source()),
    };

    if args.split {
        for generated in outputs {
            let path = match &args.output {
                Some(out_dir) => relocate(&generated.path, Path::new(name), out_dir),
                None => generated.path,
            };
            write_file(&path, &generated.content)?;
        }
        return Ok(());
    }

    for generated in outputs {
        match &args.output {
            Some(path) => write_file(path, &generated.content)?,
            None => {
                let stdout = io::stdout();
                let mut stdout = stdout.lock();
                stdout
                    .write_all(&generated.content)
                    .and_then(|()| stdout.flush())
                    .map_err(|error| CliError::Write { path: "stdout".into(), error })?;
            },
        }
    }
    Ok(())
}

/// Reports a template error, the run carries on with the next template.
fn skip(error: TemplateError, source: &str) {
    let name = error.template().to_owned();
    error_report::emit(error, name, source);
}

fn run_manifest(file: &Path) -> Result<(), CliError> {
    let manifest = Manifest::load(file)?;
    let mut failed = 0;

    for entry in &manifest.templates {
        let name = path_str(&entry.path)?;
        let assignments = match specialize::expand(&entry.types) {
            Ok(assignments) => assignments,
            Err(error) => error.report(format!("{} types", name), &entry.types),
        };

        let source = match fs::read(&entry.path) {
            Ok(source) => source,
            Err(error) => {
                skip(TemplateError::unreadable(name, &error), "");
                failed += 1;
                continue;
            },
        };
        let template = match Template::read(name, source.as_slice()) {
            Ok(template) => template,
            Err(error) => {
                skip(error, &String::from_utf8_lossy(&source));
                failed += 1;
                continue;
            },
        };

        let mut instantiator = configure(entry.package.as_deref(), entry.tag.as_deref(), manifest.header());
        if let (Some(output), false) = (&entry.output, entry.split) {
            instantiator = instantiator.output_name(path_str(output)?);
        }

        match instantiate_all(&instantiator, &template, &assignments, entry.split) {
            Ok(outputs) => {
                for generated in outputs {
                    let path = match (&entry.output, entry.split) {
                        (Some(out_dir), true) => relocate(&generated.path, &entry.path, out_dir),
                        _ => generated.path,
                    };
                    write_file(&path, &generated.content)?;
                }
            },
            Err(error) => {
                skip(error, template.source());
                failed += 1;
            },
        }
    }

    if failed > 0 {
        Err(CliError::Failed(failed))
    } else {
        Ok(())
    }
}

fn run<I: Iterator<Item=OsString>>(mut args: I) -> Result<(), CliError> {
    match args.next().as_ref().and_then(|command| command.to_str()) {
        Some("gen") => generate(GenArgs::parse(args)?),
        Some("manifest") => {
            let file = PathBuf::from(args.next().ok_or(CliError::Usage)?);
            if args.next().is_some() {
                return Err(CliError::Usage);
            }
            run_manifest(&file)
        },
        _ => Err(CliError::Usage),
    }
}

fn main() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if let Err(error) = run(std::env::args_os().skip(1)) {
        error!("{}", error);
        let mut source = std::error::Error::source(&error);
        while let Some(cause) = source {
            error!("caused by: {}", cause);
            source = cause.source();
        }
        std::process::exit(1);
    }
}
