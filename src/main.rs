use anyhow::{bail, Result};
use clap::Parser;
use demoloader::{
    cli::HostArgs,
    parse::read_csv,
    remote::XnatClient,
    report, upload,
    vocab::{DEFAULT_SESSION_ATTRIBUTES, DEFAULT_SUBJECT_ATTRIBUTES, REQUIRED_COLUMNS},
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Upload subject/session demographic values from a CSV file onto a
/// research-imaging platform.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// CSV file holding the demographic values
    #[arg(short = 'c', long, required_unless_present = "printformat")]
    csv: Option<PathBuf>,

    /// Field delimiter in the CSV file
    #[arg(short = 'd', long, default_value = ",")]
    delimiter: char,

    /// Header as a comma-separated column list; every file line is then data
    #[arg(long, value_delimiter = ',')]
    format: Option<Vec<String>>,

    /// Extra attribute names to treat as session-level
    #[arg(long, value_delimiter = ',')]
    sessformat: Vec<String>,

    /// Dry run: print the parsed records instead of uploading
    #[arg(long)]
    report: bool,

    /// Print the recognized attribute vocabulary and exit
    #[arg(long)]
    printformat: bool,

    #[command(flatten)]
    host: HostArgs,
}

fn print_format() {
    println!("Required columns : {}", REQUIRED_COLUMNS.join(", "));
    println!("Session column   : session_label (required when any session-level attribute is present)");
    println!("Subject defaults : {}", DEFAULT_SUBJECT_ATTRIBUTES.join(", "));
    println!("Session defaults : {}", DEFAULT_SESSION_ATTRIBUTES.join(", "));
    println!();
    println!("Any other column uploads as a custom field on the subject,");
    println!("or on the session when named via --sessformat.");
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();

    let args = Args::parse();

    if args.printformat {
        print_format();
        return Ok(());
    }

    let Some(csv_path) = args.csv else {
        bail!("no csv file given: pass -c/--csv");
    };
    if !csv_path.exists() {
        bail!("csv file {} does not exist", csv_path.display());
    }
    if !args.delimiter.is_ascii() {
        bail!("delimiter must be a single ascii character");
    }

    let mut parsed = read_csv(
        &csv_path,
        args.delimiter as u8,
        args.format.as_deref(),
        &args.sessformat,
    )?;
    parsed.records.sort_by(|a, b| a.project_id.cmp(&b.project_id));

    if args.report {
        report::print_report(&parsed.records, &parsed.header, args.delimiter);
        return Ok(());
    }

    let (host, username, password) = args.host.resolve()?;
    let client = XnatClient::connect(&host, &username, &password)?;
    let summary = upload::upload_records(&client, &parsed.records)?;
    info!(
        subjects = summary.subjects_updated,
        sessions = summary.sessions_updated,
        skipped = summary.skipped,
        "done"
    );
    Ok(())
}
