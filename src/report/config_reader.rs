use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::report::mail::MailSettings;
use crate::report::writer::OutputLayout;
use crate::report::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RangeSchema {
    pub start: usize,
    /// Inclusive. Missing means up to the last question.
    pub end: Option<usize>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailSchema {
    #[serde(rename = "smtpHost")]
    pub smtp_host: Option<String>,
    #[serde(rename = "smtpPort")]
    pub smtp_port: Option<u16>,
    pub subject: Option<String>,
    pub body: Option<String>,
    #[serde(rename = "maxAttempts")]
    pub max_attempts: Option<u32>,
    #[serde(rename = "retryDelaySecs")]
    pub retry_delay_secs: Option<u64>,
}

/// The survey schema as written in the JSON file. Every key is optional.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveySchema {
    #[serde(rename = "resultsDirectory")]
    pub results_directory: Option<String>,
    #[serde(rename = "everybodyDirectory")]
    pub everybody_directory: Option<String>,
    #[serde(rename = "firstQuestionColumn")]
    pub first_question_column: Option<usize>,
    #[serde(rename = "selfEvaluationColumns")]
    pub self_evaluation_columns: Option<usize>,
    #[serde(rename = "tutorKeyword")]
    pub tutor_keyword: Option<String>,
    #[serde(rename = "tutorCategoricalRanges")]
    pub tutor_categorical_ranges: Option<Vec<RangeSchema>>,
    #[serde(rename = "everybodyFreeTextRanges")]
    pub everybody_free_text_ranges: Option<Vec<RangeSchema>>,
    #[serde(rename = "strictLabels")]
    pub strict_labels: Option<bool>,
    #[serde(rename = "maxFileStemLength")]
    pub max_file_stem_length: Option<usize>,
    #[serde(rename = "blankAnswerLabel")]
    pub blank_answer_label: Option<String>,
    #[serde(rename = "freeTextHeading")]
    pub free_text_heading: Option<String>,
    #[serde(rename = "fontPath")]
    pub font_path: Option<String>,
    pub mail: Option<MailSchema>,
}

/// Everything a run needs, once the schema has been checked.
#[derive(Debug, Clone, Default)]
pub struct ReportConfig {
    pub rules: RoutingRules,
    pub layout: OutputLayout,
    pub font_path: Option<PathBuf>,
    pub mail: MailSettings,
}

pub fn read_schema(path: &str) -> ReportResult<SurveySchema> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let schema: SurveySchema =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_schema: {:?}", schema);
    Ok(schema)
}

fn validate_ranges(name: &str, ranges: &[RangeSchema]) -> ReportResult<Vec<IndexRange>> {
    let mut res: Vec<IndexRange> = Vec::new();
    for r in ranges {
        match r.end {
            Some(end) if end < r.start => {
                return InvalidSchemaSnafu {
                    message: format!("{}: range {}..{} is reversed", name, r.start, end),
                }
                .fail();
            }
            Some(end) => res.push(IndexRange::between(r.start, end)),
            None => res.push(IndexRange::starting_at(r.start)),
        }
    }
    Ok(res)
}

fn validate_mail(ms: &MailSchema) -> ReportResult<MailSettings> {
    let default = MailSettings::default();
    let max_attempts = ms.max_attempts.unwrap_or(default.max_attempts);
    ensure!(
        max_attempts > 0,
        InvalidSchemaSnafu {
            message: "mail.maxAttempts must be at least 1"
        }
    );
    Ok(MailSettings {
        smtp_host: ms.smtp_host.clone().unwrap_or(default.smtp_host),
        smtp_port: ms.smtp_port.unwrap_or(default.smtp_port),
        subject: ms.subject.clone().unwrap_or(default.subject),
        body: ms.body.clone().unwrap_or(default.body),
        max_attempts,
        retry_delay: ms
            .retry_delay_secs
            .map(Duration::from_secs)
            .unwrap_or(default.retry_delay),
    })
}

/// Fills the missing keys with the defaults and checks the values.
pub fn validate_schema(schema: &SurveySchema) -> ReportResult<ReportConfig> {
    let default_rules = RoutingRules::default();
    let default_layout = OutputLayout::default();

    let tutor_categorical = match &schema.tutor_categorical_ranges {
        Some(rs) => validate_ranges("tutorCategoricalRanges", rs)?,
        None => default_rules.tutor_categorical,
    };
    let everybody_free_text = match &schema.everybody_free_text_ranges {
        Some(rs) => validate_ranges("everybodyFreeTextRanges", rs)?,
        None => default_rules.everybody_free_text,
    };
    let tutor_keyword = schema
        .tutor_keyword
        .clone()
        .unwrap_or(default_rules.tutor_keyword);
    ensure!(
        !tutor_keyword.trim().is_empty(),
        InvalidSchemaSnafu {
            message: "tutorKeyword cannot be empty"
        }
    );
    let everybody_dir = schema
        .everybody_directory
        .clone()
        .unwrap_or(default_layout.everybody_dir);
    ensure!(
        is_safe_folder_name(&everybody_dir),
        InvalidSchemaSnafu {
            message: format!("everybodyDirectory {:?} is not a folder name", everybody_dir)
        }
    );

    let rules = RoutingRules {
        first_question_column: schema
            .first_question_column
            .unwrap_or(default_rules.first_question_column),
        self_evaluation_columns: schema
            .self_evaluation_columns
            .unwrap_or(default_rules.self_evaluation_columns),
        tutor_keyword,
        tutor_categorical,
        everybody_free_text,
        strict_labels: schema.strict_labels.unwrap_or(default_rules.strict_labels),
        reserved_folders: vec![everybody_dir.clone()],
    };

    let max_stem_len = schema
        .max_file_stem_length
        .unwrap_or(default_layout.max_stem_len);
    ensure!(
        max_stem_len > 0,
        InvalidSchemaSnafu {
            message: "maxFileStemLength must be at least 1"
        }
    );
    let layout = OutputLayout {
        results_dir: schema
            .results_directory
            .clone()
            .map(PathBuf::from)
            .unwrap_or(default_layout.results_dir),
        everybody_dir,
        tutor_dir: default_layout.tutor_dir,
        max_stem_len,
        blank_label: schema
            .blank_answer_label
            .clone()
            .unwrap_or(default_layout.blank_label),
        free_text_heading: schema
            .free_text_heading
            .clone()
            .unwrap_or(default_layout.free_text_heading),
    };

    let mail = validate_mail(&schema.mail.clone().unwrap_or_default())?;

    Ok(ReportConfig {
        rules,
        layout,
        font_path: schema.font_path.clone().map(PathBuf::from),
        mail,
    })
}
