mod aggregate;
mod config;
pub mod manual;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

pub use crate::aggregate::*;
pub use crate::config::*;

// The first well-formed bracketed capture of a label. Google Forms writes the rows
// of a grid question as `Question [Row]`.
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]]+)\]").unwrap());

/// Returns the content of the first `[...]` tag in a label, if any.
pub fn bracket_tag(label: &str) -> Option<&str> {
    TAG_RE
        .captures(label)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

// Brackets left once the well-formed tags are removed: `[]`, `[a`, `a]`, `[[a]`.
fn has_stray_brackets(label: &str) -> bool {
    TAG_RE.replace_all(label, "").contains(&['[', ']'][..])
}

/// True if the name can be used as a single directory component under the
/// results directory.
pub fn is_safe_folder_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(&['/', '\\'][..])
        && !name.chars().any(|c| c.is_control())
}

/// The positions of the columns that should be routed, for a table with the given
/// number of columns.
///
/// The metadata columns at the front and the self-evaluation block at the end are
/// left out.
pub fn question_columns(num_columns: usize, rules: &RoutingRules) -> Range<usize> {
    let end = num_columns.saturating_sub(rules.self_evaluation_columns);
    let start = rules.first_question_column.min(end);
    start..end
}

/// Decides who receives a question and how its answers are presented.
///
/// Arguments:
/// * `index` the position of the column in the table
/// * `label` the question, as written in the header row
/// * `students` the students seen in the previous columns. A new tag is registered in it.
/// * `rules` the schema constants
///
/// The rules are tried in order, and the first one that matches wins:
/// 1. a `[Name]` tag: the question is about the student `Name`, categorical
/// 2. the label is the name of a known student: individual feedback, free text
/// 3. the label contains the tutor keyword: tutor, categorical inside the tutor ranges
/// 4. otherwise: everybody, free text inside the collective ranges
pub fn classify_question(
    index: usize,
    label: &str,
    students: &mut KnownStudents,
    rules: &RoutingRules,
) -> Result<Routing, ClassifyError> {
    if rules.strict_labels && label.trim().is_empty() {
        return Err(ClassifyError::EmptyLabel { index });
    }

    if rules.strict_labels && has_stray_brackets(label) {
        return Err(ClassifyError::UnbalancedBrackets {
            index,
            label: label.to_string(),
        });
    }

    if let Some(tag) = bracket_tag(label) {
        let name = tag.trim();
        if name.is_empty() {
            return Err(ClassifyError::MalformedTag {
                index,
                label: label.to_string(),
            });
        }
        let reserved = rules
            .reserved_folders
            .iter()
            .any(|r| r.to_lowercase() == name.to_lowercase());
        if !is_safe_folder_name(name) || reserved {
            return Err(ClassifyError::UnsafeFolderName {
                index,
                name: name.to_string(),
            });
        }
        let new_student = students.register(name);
        if new_student {
            debug!("classify_question: new student {:?} at column {}", name, index);
        }
        return Ok(Routing {
            recipient: Recipient::Student(name.to_string()),
            kind: QuestionKind::Categorical,
            rule: RoutingRule::StudentTag,
            new_student,
        });
    }

    if students.contains(label) {
        return Ok(Routing {
            recipient: Recipient::Student(label.to_string()),
            kind: QuestionKind::FreeText,
            rule: RoutingRule::StudentFeedback,
            new_student: false,
        });
    }

    if !rules.tutor_keyword.is_empty() && label.contains(rules.tutor_keyword.as_str()) {
        let kind = if rules.tutor_categorical.iter().any(|r| r.contains(index)) {
            QuestionKind::Categorical
        } else {
            QuestionKind::FreeText
        };
        return Ok(Routing {
            recipient: Recipient::Tutor,
            kind,
            rule: RoutingRule::TutorKeyword,
            new_student: false,
        });
    }

    let kind = if rules.everybody_free_text.iter().any(|r| r.contains(index)) {
        QuestionKind::FreeText
    } else {
        QuestionKind::Categorical
    };
    Ok(Routing {
        recipient: Recipient::Everybody,
        kind,
        rule: RoutingRule::Collective,
        new_student: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn classify(index: usize, label: &str, students: &mut KnownStudents) -> Routing {
        classify_question(index, label, students, &RoutingRules::default()).unwrap()
    }

    #[test]
    fn student_tag_is_categorical() {
        init();
        let mut students = KnownStudents::new();
        let r = classify(5, "Quão satisfeito você está com [Maria]?", &mut students);
        assert_eq!(r.recipient, Recipient::Student("Maria".to_string()));
        assert_eq!(r.kind, QuestionKind::Categorical);
        assert_eq!(r.rule, RoutingRule::StudentTag);
        assert!(r.new_student);
        assert_eq!(students.names(), &["Maria".to_string()]);

        let r2 = classify(6, "Pontualidade [Maria]", &mut students);
        assert!(!r2.new_student);
        assert_eq!(students.len(), 1);
    }

    #[test]
    fn first_tag_wins() {
        init();
        let mut students = KnownStudents::new();
        let r = classify(3, "Compare [Ana] com [Bruno]", &mut students);
        assert_eq!(r.recipient, Recipient::Student("Ana".to_string()));
        assert!(!students.contains("Bruno"));
    }

    #[test]
    fn tag_wins_over_tutor_keyword() {
        init();
        let mut students = KnownStudents::new();
        let r = classify(173, "O tutor ajudou [Carlos]?", &mut students);
        assert_eq!(r.recipient, Recipient::Student("Carlos".to_string()));
        assert_eq!(r.kind, QuestionKind::Categorical);
    }

    #[test]
    fn student_feedback_label() {
        init();
        let mut students = KnownStudents::new();
        // Not known yet: falls through to the collective rule.
        let before = classify(10, "Maria", &mut students);
        assert_eq!(before.recipient, Recipient::Everybody);

        classify(11, "Participação [Maria]", &mut students);
        let after = classify(12, "Maria", &mut students);
        assert_eq!(after.recipient, Recipient::Student("Maria".to_string()));
        assert_eq!(after.kind, QuestionKind::FreeText);
        assert_eq!(after.rule, RoutingRule::StudentFeedback);
    }

    #[test]
    fn student_feedback_wins_over_tutor_keyword() {
        init();
        let mut students = KnownStudents::new();
        classify(1, "Nota [tutora Ana]", &mut students);
        let r = classify(173, "tutora Ana", &mut students);
        assert_eq!(r.rule, RoutingRule::StudentFeedback);
    }

    #[test]
    fn tutor_ranges() {
        init();
        let mut students = KnownStudents::new();
        let inside = classify(173, "Comentários sobre o tutor", &mut students);
        assert_eq!(inside.recipient, Recipient::Tutor);
        assert_eq!(inside.kind, QuestionKind::Categorical);

        for idx in [172, 174] {
            let r = classify(idx, "Comentários sobre o tutor", &mut students);
            assert_eq!(r.kind, QuestionKind::Categorical);
        }

        let outside = classify(90, "Comentários sobre o tutor", &mut students);
        assert_eq!(outside.recipient, Recipient::Tutor);
        assert_eq!(outside.kind, QuestionKind::FreeText);

        let after = classify(175, "Comentários sobre o tutor", &mut students);
        assert_eq!(after.kind, QuestionKind::FreeText);
    }

    #[test]
    fn tutor_keyword_is_case_sensitive() {
        init();
        let mut students = KnownStudents::new();
        let r = classify(173, "Avalie o Tutor", &mut students);
        assert_eq!(r.recipient, Recipient::Everybody);
    }

    #[test]
    fn collective_ranges() {
        init();
        let mut students = KnownStudents::new();
        for idx in [94, 96, 98, 100, 171] {
            let r = classify(idx, "Como foi o módulo?", &mut students);
            assert_eq!(r.recipient, Recipient::Everybody);
            assert_eq!(r.kind, QuestionKind::FreeText, "index {}", idx);
        }
        for idx in [1, 93, 99, 101, 170, 172, 200] {
            let r = classify(idx, "Como foi o módulo?", &mut students);
            assert_eq!(r.kind, QuestionKind::Categorical, "index {}", idx);
        }
    }

    #[test]
    fn open_range_in_later_revisions() {
        init();
        let mut rules = RoutingRules::default();
        rules.everybody_free_text.push(IndexRange::starting_at(175));
        let mut students = KnownStudents::new();
        let r = classify_question(300, "Sugestões", &mut students, &rules).unwrap();
        assert_eq!(r.kind, QuestionKind::FreeText);
        let r = classify_question(174, "Sugestões", &mut students, &rules).unwrap();
        assert_eq!(r.kind, QuestionKind::Categorical);
    }

    #[test]
    fn configurable_keyword() {
        init();
        let rules = RoutingRules {
            tutor_keyword: "facilitador".to_string(),
            ..RoutingRules::default()
        };
        let mut students = KnownStudents::new();
        let r = classify_question(173, "Avalie o facilitador", &mut students, &rules).unwrap();
        assert_eq!(r.recipient, Recipient::Tutor);
        let r = classify_question(173, "Avalie o tutor", &mut students, &rules).unwrap();
        assert_eq!(r.recipient, Recipient::Everybody);
    }

    #[test]
    fn empty_label_falls_through_by_default() {
        init();
        let mut students = KnownStudents::new();
        let r = classify(96, "", &mut students);
        assert_eq!(r.recipient, Recipient::Everybody);
        assert_eq!(r.kind, QuestionKind::FreeText);
    }

    #[test]
    fn strict_labels() {
        init();
        let rules = RoutingRules {
            strict_labels: true,
            ..RoutingRules::default()
        };
        let mut students = KnownStudents::new();
        assert_eq!(
            classify_question(7, "  ", &mut students, &rules),
            Err(ClassifyError::EmptyLabel { index: 7 })
        );
        assert!(matches!(
            classify_question(8, "Nota [Maria", &mut students, &rules),
            Err(ClassifyError::UnbalancedBrackets { index: 8, .. })
        ));
        assert!(matches!(
            classify_question(9, "Nota []", &mut students, &rules),
            Err(ClassifyError::UnbalancedBrackets { index: 9, .. })
        ));
        assert!(students.is_empty());
    }

    #[test]
    fn malformed_tags() {
        init();
        let mut students = KnownStudents::new();
        let rules = RoutingRules::default();
        assert!(matches!(
            classify_question(4, "Nota [  ]", &mut students, &rules),
            Err(ClassifyError::MalformedTag { index: 4, .. })
        ));
        assert!(matches!(
            classify_question(4, "Nota [../etc]", &mut students, &rules),
            Err(ClassifyError::UnsafeFolderName { .. })
        ));
        assert!(students.is_empty());
    }

    #[test]
    fn first_well_formed_tag() {
        init();
        let mut students = KnownStudents::new();
        let r = classify(5, "Nota [] [Maria]", &mut students);
        assert_eq!(r.recipient, Recipient::Student("Maria".to_string()));
        assert_eq!(students.names(), &["Maria".to_string()]);

        let strict = RoutingRules {
            strict_labels: true,
            ..RoutingRules::default()
        };
        let mut students = KnownStudents::new();
        assert!(matches!(
            classify_question(5, "Nota [] [Maria]", &mut students, &strict),
            Err(ClassifyError::UnbalancedBrackets { index: 5, .. })
        ));
        assert!(matches!(
            classify_question(6, "Nota [[Maria]", &mut students, &strict),
            Err(ClassifyError::UnbalancedBrackets { index: 6, .. })
        ));
        assert!(students.is_empty());
        assert!(classify_question(7, "Nota [Maria] e [Ana]", &mut students, &strict).is_ok());
    }

    #[test]
    fn shared_folders_are_not_students() {
        init();
        let rules = RoutingRules {
            reserved_folders: vec!["everybody".to_string(), "Paula".to_string()],
            ..RoutingRules::default()
        };
        let mut students = KnownStudents::new();
        for label in ["Nota [everybody]", "Nota [Everybody]", "Nota [paula]"] {
            assert!(matches!(
                classify_question(5, label, &mut students, &rules),
                Err(ClassifyError::UnsafeFolderName { index: 5, .. })
            ));
        }
        assert!(students.is_empty());
    }

    #[test]
    fn tag_is_trimmed() {
        init();
        let mut students = KnownStudents::new();
        let r = classify(2, "Nota [ João ]", &mut students);
        assert_eq!(r.recipient, Recipient::Student("João".to_string()));
    }

    #[test]
    fn deterministic() {
        init();
        let labels = [
            "Nota [Maria]",
            "Maria",
            "Comentários sobre o tutor",
            "Como foi?",
            "",
        ];
        for idx in [5, 96, 173] {
            for label in labels {
                let mut s1 = KnownStudents::new();
                s1.register("Maria");
                let mut s2 = s1.clone();
                let r1 = classify_question(idx, label, &mut s1, &RoutingRules::default());
                let r2 = classify_question(idx, label, &mut s2, &RoutingRules::default());
                assert_eq!(r1, r2);
                assert_eq!(s1, s2);
            }
        }
    }

    #[test]
    fn question_columns_excludes_blocks() {
        let rules = RoutingRules::default();
        assert_eq!(question_columns(10, &rules), 1..6);
        assert_eq!(question_columns(5, &rules), 1..1);
        assert_eq!(question_columns(2, &rules), 0..0);
        assert!(question_columns(0, &rules).is_empty());
    }

    #[test]
    fn safe_folder_names() {
        assert!(is_safe_folder_name("Maria Clara"));
        assert!(!is_safe_folder_name(".."));
        assert!(!is_safe_folder_name("a/b"));
        assert!(!is_safe_folder_name("a\\b"));
        assert!(!is_safe_folder_name(""));
    }
}
