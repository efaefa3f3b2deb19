use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use survey_routing::*;

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::args::Args;
use crate::report::archive::zip_directory;
use crate::report::chart::PlottersChart;
use crate::report::config_reader::{read_schema, validate_schema, ReportConfig};
use crate::report::io_common::{ensure_csv_extension, Column, Table};
use crate::report::mail::{
    read_credentials, read_mail_list, send_report, MailEntry, MailSender, MailSettings,
    SmtpSender,
};
use crate::report::prompt::Prompter;
use crate::report::writer::OutputWriter;

pub mod archive;
pub mod chart;
pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;
pub mod mail;
pub mod prompt;
pub mod writer;

#[derive(Debug, Snafu)]
pub enum ReportError {
    #[snafu(display("Could not find file {path}"))]
    FileNotFound { path: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Could not parse line {lineno} of the CSV file"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet found in {path}"))]
    MissingWorksheet { path: String },
    #[snafu(display("Line {lineno}: could not understand cell {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("The input {path} has no header row"))]
    EmptyInput { path: String },
    #[snafu(display("Line {lineno} has {found} cells, the header has {expected}"))]
    ColumnRowCountMismatch {
        lineno: usize,
        expected: usize,
        found: usize,
    },
    #[snafu(display("Error opening schema file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing schema file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Invalid survey schema: {message}"))]
    InvalidSchema { message: String },
    #[snafu(display("{name:?} cannot be used as the tutor's folder name"))]
    InvalidTutorName { name: String },
    #[snafu(display("Cannot route question: {source}"))]
    MalformedQuestionLabel { source: ClassifyError },
    #[snafu(display("Could not create directory {path}"))]
    DirectoryCreateFailure {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Could not write {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Could not draw chart {path}: {message}"))]
    ChartRender { path: String, message: String },
    #[snafu(display("Could not read directory {path}"))]
    WalkingDirectory {
        source: walkdir::Error,
        path: String,
    },
    #[snafu(display("Could not build archive {path}"))]
    Archive {
        source: zip::result::ZipError,
        path: String,
    },
    #[snafu(display("{path}, line {lineno}: expected 'name,address', found {line:?}"))]
    MalformedMailList {
        path: String,
        lineno: usize,
        line: String,
    },
    #[snafu(display("{path}: expected a single 'address,secret' line"))]
    MalformedCredentials { path: String },
    #[snafu(display("Invalid mail address {address:?}"))]
    MailAddress {
        source: lettre::address::AddressError,
        address: String,
    },
    #[snafu(display("Could not compose the message: {message}"))]
    MailBuild { message: String },
    #[snafu(display("Could not set up the connection to {host}"))]
    SmtpSetup {
        source: lettre::transport::smtp::Error,
        host: String,
    },
    #[snafu(display("Could not send the results to {recipient}: {message}"))]
    MailTransportFailure {
        recipient: String,
        message: String,
        transient: bool,
    },
    #[snafu(display("Could not read the answer"))]
    Prompt { source: std::io::Error },
    #[snafu(display("The input was closed before an answer was given"))]
    PromptClosed {},
    #[snafu(display("{count} question(s) could not be processed"))]
    ColumnsFailed { count: usize },
}

impl ReportError {
    /// Errors that stop the run. The other ones only affect the question being processed.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ReportError::MalformedQuestionLabel { .. }
                | ReportError::ChartRender { .. }
                | ReportError::WritingOutput { .. }
        )
    }

    /// Errors that may go away if the same step is attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReportError::FileNotFound { .. }
                | ReportError::MailTransportFailure {
                    transient: true,
                    ..
                }
        )
    }
}

pub type ReportResult<T> = Result<T, ReportError>;

/// One file written for one question.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Artifact {
    pub index: usize,
    pub recipient: Recipient,
    pub kind: QuestionKind,
    pub path: PathBuf,
}

/// A question that could not be processed. The run continued without it.
#[derive(Debug)]
pub struct ColumnFailure {
    pub index: usize,
    pub label: String,
    pub error: ReportError,
}

#[derive(Debug, Default)]
pub struct ReportSummary {
    pub artifacts: Vec<Artifact>,
    pub failures: Vec<ColumnFailure>,
    pub students: Vec<String>,
    pub archives: Vec<PathBuf>,
    pub mails_sent: Vec<String>,
    pub mails_skipped: Vec<String>,
    pub mails_failed: Vec<(String, ReportError)>,
}

pub fn load_table(path: &Path) -> ReportResult<Table> {
    let p = path.display().to_string();
    ensure!(path.is_file(), FileNotFoundSnafu { path: p.clone() });
    info!("Attempting to read survey file {:?}", p);
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let table = match extension.as_str() {
        "xlsx" | "xlsm" => io_excel::read_excel_table(path, None)?,
        _ => io_csv::read_csv_table(path)?,
    };
    info!(
        "Read {} columns and {} answers per column from {:?}",
        table.columns.len(),
        table.num_rows(),
        p
    );
    Ok(table)
}

fn process_column(
    index: usize,
    column: &Column,
    students: &mut KnownStudents,
    rules: &RoutingRules,
    writer: &mut OutputWriter,
) -> ReportResult<Artifact> {
    let routing = classify_question(index, &column.label, students, rules)
        .context(MalformedQuestionLabelSnafu {})?;
    debug!(
        "process_column: {} -> {:?} ({:?}) {} answers",
        index,
        routing.recipient,
        routing.rule,
        column.answers.len()
    );
    if routing.new_student {
        writer.ensure_folder(&routing.recipient)?;
    }

    let path = match routing.kind {
        QuestionKind::Categorical => {
            let freq = count_answers(&column.answers);
            writer.render_chart(&freq, &column.label, &routing.recipient, index)?
        }
        QuestionKind::FreeText => {
            writer.dump_free_text(&column.answers, &column.label, &routing.recipient, index)?
        }
    };
    Ok(Artifact {
        index,
        recipient: routing.recipient,
        kind: routing.kind,
        path,
    })
}

/// Routes every question of the table and writes its output.
///
/// A question that fails is recorded in the summary and the run goes on, unless the
/// error is fatal (for example the results directory cannot be created).
pub fn process_table(
    table: &Table,
    rules: &RoutingRules,
    writer: &mut OutputWriter,
) -> ReportResult<ReportSummary> {
    let mut summary = ReportSummary::default();
    let mut students = KnownStudents::new();
    let range = question_columns(table.columns.len(), rules);
    info!(
        "Processing columns {}..{} ({} excluded as self-evaluation)",
        range.start,
        range.end,
        table.columns.len() - range.end
    );
    for index in range {
        let column = &table.columns[index];
        info!("Question {}: {}", index, column.label);
        match process_column(index, column, &mut students, rules, writer) {
            Ok(artifact) => {
                info!(
                    "Written: {:?} {:?} -> {}",
                    artifact.recipient,
                    artifact.kind,
                    artifact.path.display()
                );
                summary.artifacts.push(artifact);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Column {} ({:?}) skipped: {}", index, column.label, e);
                summary.failures.push(ColumnFailure {
                    index,
                    label: column.label.clone(),
                    error: e,
                });
            }
        }
    }
    summary.students = students.names().to_vec();
    Ok(summary)
}

pub fn run_report(
    input: &Path,
    rules: &RoutingRules,
    writer: &mut OutputWriter,
) -> ReportResult<ReportSummary> {
    writer.prepare()?;
    let table = load_table(input)?;
    process_table(&table, rules, writer)
}

/// Zips the folders of the tutor, of everybody and of each student.
pub fn archive_all(writer: &OutputWriter, students: &[String]) -> ReportResult<Vec<PathBuf>> {
    let mut recipients = vec![Recipient::Everybody, Recipient::Tutor];
    recipients.extend(students.iter().cloned().map(Recipient::Student));
    let mut res: Vec<PathBuf> = Vec::new();
    for r in recipients.iter() {
        let folder = writer.folder_for(r);
        if folder.is_dir() {
            res.push(zip_directory(&folder, writer.results_dir())?);
        }
    }
    Ok(res)
}

/// Sends to every person of the mail list the everybody archive and their own.
///
/// People without a results folder are skipped. A message that still fails after the
/// retries is recorded and the other people are still served, unless the failure is
/// not transient (bad credentials for instance).
pub fn distribute_reports(
    writer: &OutputWriter,
    entries: &[MailEntry],
    from: &str,
    sender: &dyn MailSender,
    settings: &MailSettings,
    summary: &mut ReportSummary,
) -> ReportResult<()> {
    let everybody_zip = zip_directory(
        &writer.folder_for(&Recipient::Everybody),
        writer.results_dir(),
    )?;
    for entry in entries {
        let folder = writer.results_dir().join(&entry.name);
        if !is_safe_folder_name(&entry.name) || !folder.is_dir() {
            warn!(
                "No results folder for {:?} ({}), skipping",
                entry.name, entry.address
            );
            summary.mails_skipped.push(entry.name.clone());
            continue;
        }
        let own_zip = zip_directory(&folder, writer.results_dir())?;
        match send_report(sender, entry, from, &[everybody_zip.clone(), own_zip], settings) {
            Ok(()) => summary.mails_sent.push(entry.name.clone()),
            Err(e) if e.is_retryable() => {
                warn!("Giving up on {}: {}", entry.address, e);
                summary.mails_failed.push((entry.name.clone(), e));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn resolve_input(args: &Args, prompter: &mut Prompter) -> ReportResult<PathBuf> {
    match &args.input {
        Some(name) => {
            let p = ensure_csv_extension(name);
            ensure!(
                p.is_file(),
                FileNotFoundSnafu {
                    path: p.display().to_string()
                }
            );
            Ok(p)
        }
        None => prompter.ask_existing_file(
            "Insira o nome do arquivo CSV (com ou sem a extensão): ",
            ensure_csv_extension,
        ),
    }
}

fn resolve_file(
    arg: &Option<String>,
    question: &str,
    prompter: &mut Prompter,
) -> ReportResult<PathBuf> {
    match arg {
        Some(name) => {
            let p = PathBuf::from(name);
            ensure!(p.is_file(), FileNotFoundSnafu { path: name.clone() });
            Ok(p)
        }
        None => prompter.ask_existing_file(question, |s: &str| PathBuf::from(s)),
    }
}

/// The tutor's folder sits next to the student folders, so no student tag may use its name.
fn set_tutor(config: &mut ReportConfig, tutor: String) -> ReportResult<()> {
    ensure!(
        is_safe_folder_name(&tutor)
            && tutor.to_lowercase() != config.layout.everybody_dir.to_lowercase(),
        InvalidTutorNameSnafu { name: tutor }
    );
    config.rules.reserved_folders.push(tutor.clone());
    config.layout.tutor_dir = tutor;
    Ok(())
}

/// Runs the whole pipeline as requested on the command line, asking for what is missing.
pub fn run_from_args(args: &Args) -> ReportResult<ReportSummary> {
    let mut config: ReportConfig = match &args.config {
        Some(p) => validate_schema(&read_schema(p)?)?,
        None => ReportConfig::default(),
    };
    if let Some(dir) = &args.results_dir {
        config.layout.results_dir = PathBuf::from(dir);
    }
    info!("config: {:?}", config);

    let mut prompter = Prompter::stdio();

    let tutor = match &args.tutor {
        Some(t) => t.trim().to_string(),
        None => prompter.ask("Insira o nome do(a) tutor(a): ")?,
    };
    set_tutor(&mut config, tutor)?;

    let input = resolve_input(args, &mut prompter)?;

    let chart = PlottersChart::new(config.font_path.as_deref());
    let mut writer = match args.shuffle_seed {
        Some(seed) => OutputWriter::new(
            config.layout.clone(),
            Box::new(chart),
            Box::new(StdRng::seed_from_u64(seed)),
        ),
        None => OutputWriter::with_entropy(config.layout.clone(), Box::new(chart)),
    };

    let mut summary = run_report(&input, &config.rules, &mut writer)?;

    if args.zip {
        summary.archives = archive_all(&writer, &summary.students)?;
    }

    if args.send || args.mail_list.is_some() {
        let mail_list = resolve_file(
            &args.mail_list,
            "Insira o nome do arquivo com a lista de e-mails: ",
            &mut prompter,
        )?;
        let credentials_path = resolve_file(
            &args.credentials,
            "Insira o nome do arquivo com as credenciais do remetente: ",
            &mut prompter,
        )?;
        let entries = read_mail_list(&mail_list)?;
        let credentials = read_credentials(&credentials_path)?;
        let sender = SmtpSender::new(&config.mail, &credentials)?;
        distribute_reports(
            &writer,
            &entries,
            &credentials.address,
            &sender,
            &config.mail,
            &mut summary,
        )?;
    }

    Ok(summary)
}
