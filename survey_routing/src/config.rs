// ********* Routing outcome ***********

use std::error::Error;
use std::fmt::Display;

/// The identity a question's output is filed under.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub enum Recipient {
    /// The tutor of the group. The folder name is provided at run start.
    Tutor,
    /// A student, discovered from a `[Name]` tag in a question label.
    Student(String),
    /// The collective pseudo-recipient.
    Everybody,
}

/// How the answers of a question are presented.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum QuestionKind {
    /// Closed-set answers, counted and drawn as a bar chart.
    Categorical,
    /// Open-ended answers, shuffled and dumped verbatim.
    FreeText,
}

/// Which of the routing rules matched. Rules are tried in this order.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum RoutingRule {
    StudentTag,
    StudentFeedback,
    TutorKeyword,
    Collective,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Routing {
    pub recipient: Recipient,
    pub kind: QuestionKind,
    pub rule: RoutingRule,
    /// True the first time a student tag is seen during a run.
    pub new_student: bool,
}

// ********* Configuration **********

/// An inclusive range of column indexes. An open range has no upper bound.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub struct IndexRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl IndexRange {
    pub fn between(start: usize, end: usize) -> IndexRange {
        IndexRange {
            start,
            end: Some(end),
        }
    }

    pub fn single(index: usize) -> IndexRange {
        IndexRange::between(index, index)
    }

    pub fn starting_at(start: usize) -> IndexRange {
        IndexRange { start, end: None }
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && self.end.map_or(true, |e| index <= e)
    }
}

/// The survey-schema constants that drive the classification.
///
/// The numeric boundaries change between survey revisions. The defaults are the
/// ones of the evaluation form the tool was first written for.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoutingRules {
    /// Position of the first question column. The columns before it hold respondent
    /// metadata (typically the submission timestamp).
    pub first_question_column: usize,
    /// Number of trailing self-evaluation columns, excluded from all routing.
    pub self_evaluation_columns: usize,
    /// Substring marking a question about the tutor. Case-sensitive.
    pub tutor_keyword: String,
    /// Tutor questions inside these ranges are categorical, the others free text.
    pub tutor_categorical: Vec<IndexRange>,
    /// Collective questions inside these ranges are free text, the others categorical.
    pub everybody_free_text: Vec<IndexRange>,
    /// If true, empty labels and labels with unbalanced or empty brackets are
    /// rejected instead of falling through to the collective rule.
    pub strict_labels: bool,
    /// Folders shared with other recipients (everybody, the tutor). A student tag
    /// naming one of them is rejected. Compared without case.
    pub reserved_folders: Vec<String>,
}

impl Default for RoutingRules {
    fn default() -> Self {
        RoutingRules {
            first_question_column: 1,
            self_evaluation_columns: 4,
            tutor_keyword: "tutor".to_string(),
            tutor_categorical: vec![IndexRange::between(172, 174)],
            everybody_free_text: vec![
                IndexRange::between(94, 98),
                IndexRange::single(100),
                IndexRange::single(171),
            ],
            strict_labels: false,
            reserved_folders: vec!["everybody".to_string()],
        }
    }
}

// ********* Run state **********

/// The students seen so far, in discovery order.
///
/// The set only grows during a run. It is threaded explicitly through the
/// classification so that the outcome only depends on its arguments.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct KnownStudents {
    names: Vec<String>,
}

impl KnownStudents {
    pub fn new() -> KnownStudents {
        KnownStudents::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Adds a student. Returns false if the student was already known.
    pub fn register(&mut self, name: &str) -> bool {
        if self.contains(name) {
            false
        } else {
            self.names.push(name.to_string());
            true
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ********* Errors **********

/// Labels that cannot be routed without guessing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ClassifyError {
    /// Only raised with strict labels.
    EmptyLabel { index: usize },
    /// A bracketed tag that is blank once trimmed.
    MalformedTag { index: usize, label: String },
    /// Only raised with strict labels.
    UnbalancedBrackets { index: usize, label: String },
    /// The tag would not stay inside the results directory.
    UnsafeFolderName { index: usize, name: String },
}

impl Error for ClassifyError {}

impl Display for ClassifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifyError::EmptyLabel { index } => write!(f, "column {}: empty label", index),
            ClassifyError::MalformedTag { index, label } => {
                write!(f, "column {}: blank student tag in {:?}", index, label)
            }
            ClassifyError::UnbalancedBrackets { index, label } => {
                write!(f, "column {}: unbalanced brackets in {:?}", index, label)
            }
            ClassifyError::UnsafeFolderName { index, name } => {
                write!(f, "column {}: {:?} cannot be used as a folder name", index, name)
            }
        }
    }
}
