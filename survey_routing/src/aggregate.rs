use std::collections::BTreeMap;

/// The number of occurrences of each distinct answer to a question.
///
/// Answers are compared by exact string equality. A blank answer (empty cell) is
/// counted under the empty string, so that the total always matches the number
/// of respondents.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct AnswerFrequencyMap {
    counts: BTreeMap<String, u64>,
}

impl AnswerFrequencyMap {
    pub const BLANK: &'static str = "";

    pub fn from_answers<I, S>(answers: I) -> AnswerFrequencyMap
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut res = AnswerFrequencyMap::default();
        for a in answers {
            res.add(a.as_ref());
        }
        res
    }

    pub fn add(&mut self, answer: &str) {
        *self.counts.entry(answer.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, answer: &str) -> u64 {
        self.counts.get(answer).cloned().unwrap_or(0)
    }

    pub fn blank_count(&self) -> u64 {
        self.get(AnswerFrequencyMap::BLANK)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Number of distinct answers.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The answers with their counts, sorted by answer.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Counts the answers of one question.
pub fn count_answers<S: AsRef<str>>(answers: &[S]) -> AnswerFrequencyMap {
    AnswerFrequencyMap::from_answers(answers.iter().map(|s| s.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_exact_values() {
        let m = count_answers(&["Bom", "Ótimo", "Bom"]);
        assert_eq!(m.get("Bom"), 2);
        assert_eq!(m.get("Ótimo"), 1);
        assert_eq!(m.len(), 2);
        assert_eq!(m.total(), 3);
    }

    #[test]
    fn blanks_are_a_category() {
        let m = count_answers(&["a", "", "b", "", "a"]);
        assert_eq!(m.blank_count(), 2);
        assert_eq!(m.total(), 5);
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn case_sensitive() {
        let m = count_answers(&["bom", "Bom", "BOM"]);
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn empty_input() {
        let m = count_answers::<&str>(&[]);
        assert!(m.is_empty());
        assert_eq!(m.total(), 0);
    }

    #[test]
    fn sorted_iteration() {
        let m = count_answers(&["c", "a", "d", "b", "a", "b", "b"]);
        let keys: Vec<&str> = m.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "c", "d"]);
        let counts: Vec<u64> = m.iter().map(|(_, c)| c).collect();
        assert_eq!(counts, vec![2, 3, 1, 1]);
    }

    #[test]
    fn total_matches_input_length() {
        let inputs: Vec<Vec<&str>> = vec![
            vec![""],
            vec!["x"; 17],
            vec!["Sim", "Não", "", "Sim", " ", "sim"],
        ];
        for answers in inputs {
            let m = count_answers(&answers);
            assert_eq!(m.total(), answers.len() as u64);
        }
    }
}
