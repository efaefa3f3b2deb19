use std::path::{Path, PathBuf};

use crate::report::*;

/// One question and the answers of all the respondents, in row order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Column {
    pub label: String,
    pub answers: Vec<String>,
}

/// The survey, one column per question, in the order of the header.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    /// Builds the table from the header row and the data rows (with their line numbers).
    /// Every row must have exactly one cell per header cell.
    pub fn from_rows(
        header: Vec<String>,
        rows: Vec<(usize, Vec<String>)>,
    ) -> ReportResult<Table> {
        let expected = header.len();
        let mut columns: Vec<Column> = header
            .into_iter()
            .map(|label| Column {
                label,
                answers: Vec::with_capacity(rows.len()),
            })
            .collect();
        for (lineno, row) in rows {
            ensure!(
                row.len() == expected,
                ColumnRowCountMismatchSnafu {
                    lineno,
                    expected,
                    found: row.len()
                }
            );
            for (col, cell) in columns.iter_mut().zip(row) {
                col.answers.push(cell);
            }
        }
        Ok(Table { columns })
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.answers.len()).unwrap_or(0)
    }
}

pub fn simplify_file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Appends `.csv` to a file name that has no extension.
pub fn ensure_csv_extension(name: &str) -> PathBuf {
    let p = PathBuf::from(name.trim());
    if p.extension().is_none() {
        p.with_extension("csv")
    } else {
        p
    }
}

// Latin letters with diacritics, as found in Portuguese and Spanish forms.
fn fold_char(c: char) -> Option<char> {
    let folded = match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        c if c.is_ascii() => c,
        _ => return None,
    };
    Some(folded)
}

/// A lowercase ASCII version of a title that is safe as a file name: punctuation is
/// dropped, spaces and dashes become `_`, and the result has at most `max_len` chars.
pub fn sanitize_file_stem(title: &str, max_len: usize) -> String {
    let mut res = String::new();
    for c in title.chars().filter_map(fold_char) {
        if c.is_ascii_alphanumeric() {
            res.push(c.to_ascii_lowercase());
        } else if (c.is_whitespace() || c == '-' || c == '_')
            && !res.is_empty()
            && !res.ends_with('_')
        {
            res.push('_');
        }
    }
    res.truncate(max_len);
    res.trim_end_matches('_').to_string()
}

/// The name (without extension) of the output of the question at `index`.
/// The index keeps the names unique when two titles only differ after the cut.
/// The whole stem, index included, has at most `max_len` chars when the index fits.
pub fn artifact_stem(index: usize, title: &str, max_len: usize) -> String {
    let prefix = format!("{:03}", index);
    let s = sanitize_file_stem(title, max_len.saturating_sub(prefix.len() + 1));
    if s.is_empty() {
        prefix
    } else {
        format!("{}_{}", prefix, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_csv_extension() {
        assert_eq!(ensure_csv_extension("respostas"), PathBuf::from("respostas.csv"));
        assert_eq!(ensure_csv_extension("respostas.csv"), PathBuf::from("respostas.csv"));
        assert_eq!(ensure_csv_extension("dados.xlsx"), PathBuf::from("dados.xlsx"));
        assert_eq!(ensure_csv_extension(" turma "), PathBuf::from("turma.csv"));
    }

    #[test]
    fn sanitizes_titles() {
        assert_eq!(
            sanitize_file_stem("Quão satisfeito você está com [Maria]?", 100),
            "quao_satisfeito_voce_esta_com_maria"
        );
        assert_eq!(
            sanitize_file_stem("Comentários sobre o tutor", 30),
            "comentarios_sobre_o_tutor"
        );
        assert_eq!(sanitize_file_stem("  a -- b  ", 30), "a_b");
        assert_eq!(sanitize_file_stem("???", 30), "");
        assert_eq!(sanitize_file_stem("日本語 ok", 30), "ok");
    }

    #[test]
    fn truncates_titles() {
        let s = sanitize_file_stem("Como você avalia a organização geral do módulo?", 20);
        assert!(s.len() <= 20);
        assert_eq!(s, "como_voce_avalia_a_o");
        assert_eq!(sanitize_file_stem("abc def", 4), "abc");
    }

    #[test]
    fn artifact_stems() {
        assert_eq!(artifact_stem(5, "Nota [Maria]", 30), "005_nota_maria");
        assert_eq!(artifact_stem(171, "?!", 30), "171");
        assert_eq!(artifact_stem(7, "Nota", 4), "007");
        let long = "Como você avalia a organização geral do módulo?";
        let stem = artifact_stem(12, long, 30);
        assert_eq!(stem, "012_como_voce_avalia_a_organiz");
        assert_eq!(stem.len(), 30);
        assert_ne!(
            artifact_stem(10, "Uma pergunta muito longa sobre o tema A", 20),
            artifact_stem(11, "Uma pergunta muito longa sobre o tema B", 20)
        );
    }

    #[test]
    fn table_from_rows() {
        let t = Table::from_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![
                (2, vec!["1".to_string(), "2".to_string()]),
                (3, vec!["3".to_string(), "".to_string()]),
            ],
        )
        .unwrap();
        assert_eq!(t.columns.len(), 2);
        assert_eq!(t.num_rows(), 2);
        assert_eq!(t.columns[1].answers, vec!["2".to_string(), "".to_string()]);
    }

    #[test]
    fn ragged_rows() {
        let err = Table::from_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![(2, vec!["1".to_string(), "2".to_string(), "3".to_string()])],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReportError::ColumnRowCountMismatch {
                lineno: 2,
                expected: 2,
                found: 3
            }
        ));
    }
}
