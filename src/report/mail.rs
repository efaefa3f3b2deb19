// Sending the archives to the people of the mail list.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::Error as SmtpError;
use lettre::{Address, Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};

use crate::report::io_common::simplify_file_name;
use crate::report::*;

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub subject: String,
    pub body: String,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for MailSettings {
    fn default() -> Self {
        MailSettings {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            subject: "Resultados da avaliação".to_string(),
            body: "Olá,\n\nSeguem em anexo os resultados da avaliação.\n".to_string(),
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// One line of the mail list. The name is also the name of the results folder.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MailEntry {
    pub name: String,
    pub address: String,
}

/// Parses `name,address` lines. Blank lines are ignored.
pub fn parse_mail_list(contents: &str, path: &str) -> ReportResult<Vec<MailEntry>> {
    let mut res: Vec<MailEntry> = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim_start_matches('\u{feff}').trim();
        if line.is_empty() {
            continue;
        }
        let entry = match line.split_once(',') {
            Some((name, address)) if !name.trim().is_empty() && address.contains('@') => {
                MailEntry {
                    name: name.trim().to_string(),
                    address: address.trim().to_string(),
                }
            }
            _ => {
                return MalformedMailListSnafu {
                    path,
                    lineno: idx + 1,
                    line,
                }
                .fail()
            }
        };
        res.push(entry);
    }
    Ok(res)
}

pub fn read_mail_list(path: &Path) -> ReportResult<Vec<MailEntry>> {
    let p = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path: p.clone() })?;
    let res = parse_mail_list(&contents, &p)?;
    info!("Read {} recipient(s) from {}", res.len(), simplify_file_name(path));
    Ok(res)
}

/// The account the reports are sent from.
#[derive(Debug, Clone)]
pub struct SenderCredentials {
    pub address: String,
    pub secret: SecretString,
}

/// Parses the single `address,secret` line of the credentials file.
pub fn parse_credentials(contents: &str, path: &str) -> ReportResult<SenderCredentials> {
    let lines: Vec<&str> = contents
        .lines()
        .map(|l| l.trim_start_matches('\u{feff}').trim())
        .filter(|l| !l.is_empty())
        .collect();
    match lines.as_slice() {
        [line] => match line.split_once(',') {
            Some((address, secret)) if address.contains('@') && !secret.trim().is_empty() => {
                Ok(SenderCredentials {
                    address: address.trim().to_string(),
                    secret: SecretString::from(secret.trim().to_string()),
                })
            }
            _ => MalformedCredentialsSnafu { path }.fail(),
        },
        _ => MalformedCredentialsSnafu { path }.fail(),
    }
}

pub fn read_credentials(path: &Path) -> ReportResult<SenderCredentials> {
    let p = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path: p.clone() })?;
    parse_credentials(&contents, &p)
}

#[derive(Debug, Clone)]
pub enum SendFailure {
    /// Worth another attempt (timeout, busy server).
    Transient(String),
    /// Will fail the same way every time (authentication, rejected address).
    Fatal(String),
}

impl SendFailure {
    fn message(&self) -> &str {
        match self {
            SendFailure::Transient(m) | SendFailure::Fatal(m) => m.as_str(),
        }
    }
}

pub trait MailSender {
    fn send(&self, email: &Message) -> Result<(), SendFailure>;
}

/// Sends over SMTP with STARTTLS and the credentials of the sender.
pub struct SmtpSender {
    transport: SmtpTransport,
}

impl SmtpSender {
    pub fn new(
        settings: &MailSettings,
        credentials: &SenderCredentials,
    ) -> ReportResult<SmtpSender> {
        let creds = Credentials::new(
            credentials.address.clone(),
            credentials.secret.expose_secret().to_string(),
        );
        let transport = SmtpTransport::starttls_relay(&settings.smtp_host)
            .context(SmtpSetupSnafu {
                host: settings.smtp_host.clone(),
            })?
            .port(settings.smtp_port)
            .credentials(creds)
            .build();
        Ok(SmtpSender { transport })
    }
}

impl MailSender for SmtpSender {
    fn send(&self, email: &Message) -> Result<(), SendFailure> {
        self.transport.send(email).map(|_| ()).map_err(|e| classify_smtp_error(&e))
    }
}

/// 5xx replies (authentication included) and errors of the client itself are fatal.
/// Everything else (4xx replies, connection, network, timeout, TLS handshake) is
/// attempted again.
pub fn classify_smtp_error(e: &SmtpError) -> SendFailure {
    if e.is_permanent() || e.is_client() {
        SendFailure::Fatal(e.to_string())
    } else {
        SendFailure::Transient(e.to_string())
    }
}

fn mailbox(name: Option<&str>, address: &str) -> ReportResult<Mailbox> {
    let addr: Address = address.parse().context(MailAddressSnafu { address })?;
    Ok(Mailbox::new(name.map(|n| n.to_string()), addr))
}

/// The message for one person: the body text and the zip archives as attachments.
pub fn compose_report(
    entry: &MailEntry,
    from: &str,
    attachments: &[PathBuf],
    settings: &MailSettings,
) -> ReportResult<Message> {
    let zip_type = ContentType::parse("application/zip").map_err(|e| ReportError::MailBuild {
        message: e.to_string(),
    })?;
    let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(settings.body.clone()));
    for p in attachments {
        let bytes = fs::read(p).context(OpeningFileSnafu {
            path: p.display().to_string(),
        })?;
        let attachment = Attachment::new(simplify_file_name(p)).body(bytes, zip_type.clone());
        parts = parts.singlepart(attachment);
    }
    Message::builder()
        .from(mailbox(None, from)?)
        .to(mailbox(Some(&entry.name), &entry.address)?)
        .subject(settings.subject.clone())
        .multipart(parts)
        .map_err(|e| ReportError::MailBuild {
            message: e.to_string(),
        })
}

/// Transient failures are attempted again, up to the configured number of attempts.
pub fn send_with_retry(
    sender: &dyn MailSender,
    email: &Message,
    settings: &MailSettings,
) -> Result<(), SendFailure> {
    let mut attempt = 1;
    loop {
        match sender.send(email) {
            Ok(()) => return Ok(()),
            Err(SendFailure::Transient(m)) if attempt < settings.max_attempts => {
                warn!(
                    "Attempt {}/{} failed: {}, trying again in {:?}",
                    attempt, settings.max_attempts, m, settings.retry_delay
                );
                thread::sleep(settings.retry_delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

pub fn send_report(
    sender: &dyn MailSender,
    entry: &MailEntry,
    from: &str,
    attachments: &[PathBuf],
    settings: &MailSettings,
) -> ReportResult<()> {
    let email = compose_report(entry, from, attachments, settings)?;
    match send_with_retry(sender, &email, settings) {
        Ok(()) => {
            info!("Sent {} attachment(s) to {}", attachments.len(), entry.address);
            Ok(())
        }
        Err(failure) => MailTransportFailureSnafu {
            recipient: entry.address.clone(),
            message: failure.message(),
            transient: matches!(failure, SendFailure::Transient(_)),
        }
        .fail(),
    }
}
