use clap::Parser;
use log::{error, info, LevelFilter};
use snafu::ErrorCompat;

mod args;
mod report;

use crate::report::{ReportError, ReportSummary};

fn print_summary(summary: &ReportSummary) {
    println!(
        "{} file(s) written for {} student(s)",
        summary.artifacts.len(),
        summary.students.len()
    );
    for a in summary.archives.iter() {
        println!("Archive: {}", a.display());
    }
    if !summary.mails_sent.is_empty() {
        println!("Sent to: {}", summary.mails_sent.join(", "));
    }
    if !summary.mails_skipped.is_empty() {
        println!("No results for: {}", summary.mails_skipped.join(", "));
    }
    for (name, e) in summary.mails_failed.iter() {
        println!("Could not send to {}: {}", name, e);
    }
    for f in summary.failures.iter() {
        println!("Column {} ({:?}) skipped: {}", f.index, f.label, f.error);
    }
}

fn main() {
    let args = args::Args::parse();

    let default_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    let res = report::run_from_args(&args).and_then(|summary| {
        print_summary(&summary);
        if summary.failures.is_empty() {
            Ok(summary)
        } else {
            Err(ReportError::ColumnsFailed {
                count: summary.failures.len(),
            })
        }
    });

    match res {
        Ok(summary) => {
            info!("Done: {} file(s) written", summary.artifacts.len());
            println!("Tudo feito");
        }
        Err(e) => {
            error!("An error occured: {}", e);
            for (idx, cause) in e.iter_chain().enumerate().skip(1) {
                error!("  caused by ({}): {}", idx, cause);
            }
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
