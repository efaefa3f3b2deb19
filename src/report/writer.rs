// Writes the outputs of the questions in the folders of their recipients.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};

use crate::report::chart::{bars_from_frequencies, ChartRenderer};
use crate::report::io_common::artifact_stem;
use crate::report::*;

/// Where and how the outputs are named.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct OutputLayout {
    pub results_dir: PathBuf,
    pub everybody_dir: String,
    pub tutor_dir: String,
    pub max_stem_len: usize,
    pub blank_label: String,
    pub free_text_heading: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        OutputLayout {
            results_dir: PathBuf::from("results"),
            everybody_dir: "everybody".to_string(),
            tutor_dir: "tutor".to_string(),
            max_stem_len: 30,
            blank_label: "(sem resposta)".to_string(),
            free_text_heading: "Avaliação".to_string(),
        }
    }
}

pub struct OutputWriter {
    layout: OutputLayout,
    chart: Box<dyn ChartRenderer>,
    rng: Box<dyn RngCore>,
    created: HashSet<PathBuf>,
}

impl OutputWriter {
    /// The random source drives the order of the free-text answers. Only tests
    /// should pass a seeded one.
    pub fn new(
        layout: OutputLayout,
        chart: Box<dyn ChartRenderer>,
        rng: Box<dyn RngCore>,
    ) -> OutputWriter {
        OutputWriter {
            layout,
            chart,
            rng,
            created: HashSet::new(),
        }
    }

    pub fn with_entropy(layout: OutputLayout, chart: Box<dyn ChartRenderer>) -> OutputWriter {
        OutputWriter::new(layout, chart, Box::new(StdRng::from_entropy()))
    }

    pub fn results_dir(&self) -> &Path {
        &self.layout.results_dir
    }

    pub fn folder_for(&self, recipient: &Recipient) -> PathBuf {
        let name = match recipient {
            Recipient::Tutor => self.layout.tutor_dir.as_str(),
            Recipient::Student(name) => name.as_str(),
            Recipient::Everybody => self.layout.everybody_dir.as_str(),
        };
        self.layout.results_dir.join(name)
    }

    fn create_dir(&mut self, dir: PathBuf) -> ReportResult<PathBuf> {
        if !self.created.contains(&dir) {
            fs::create_dir_all(&dir).context(DirectoryCreateFailureSnafu {
                path: dir.display().to_string(),
            })?;
            debug!("Created directory {}", dir.display());
            self.created.insert(dir.clone());
        }
        Ok(dir)
    }

    /// Creates the folder of the recipient if it does not exist yet. Existing content is kept.
    pub fn ensure_folder(&mut self, recipient: &Recipient) -> ReportResult<PathBuf> {
        let dir = self.folder_for(recipient);
        self.create_dir(dir)
    }

    /// Creates the results directory and the folders that exist in every run.
    pub fn prepare(&mut self) -> ReportResult<()> {
        let root = self.layout.results_dir.clone();
        self.create_dir(root)?;
        self.ensure_folder(&Recipient::Everybody)?;
        self.ensure_folder(&Recipient::Tutor)?;
        Ok(())
    }

    /// Draws the answer counts of a question. An existing chart with the same name is replaced.
    pub fn render_chart(
        &mut self,
        freq: &AnswerFrequencyMap,
        title: &str,
        recipient: &Recipient,
        index: usize,
    ) -> ReportResult<PathBuf> {
        let dir = self.ensure_folder(recipient)?;
        let stem = artifact_stem(index, title, self.layout.max_stem_len);
        let path = dir.join(format!("{}.png", stem));
        let bars = bars_from_frequencies(freq, &self.layout.blank_label);
        debug!("render_chart: {} bars -> {}", bars.len(), path.display());
        self.chart.render(&bars, title, &path)?;
        Ok(path)
    }

    /// Writes all the answers of a question in one text file, in a random order.
    pub fn dump_free_text(
        &mut self,
        answers: &[String],
        label: &str,
        recipient: &Recipient,
        index: usize,
    ) -> ReportResult<PathBuf> {
        let dir = self.ensure_folder(recipient)?;
        let stem = artifact_stem(index, label, self.layout.max_stem_len);
        let path = dir.join(format!("{}.txt", stem));
        let mut shuffled: Vec<&str> = answers.iter().map(|s| s.as_str()).collect();
        shuffled.shuffle(&mut self.rng);
        let contents = format_free_text(&shuffled, &self.layout.free_text_heading);
        debug!("dump_free_text: {} answers -> {}", shuffled.len(), path.display());
        fs::write(&path, contents).context(WritingOutputSnafu {
            path: path.display().to_string(),
        })?;
        Ok(path)
    }
}

/// Numbers the answers from 1, in the order given.
pub fn format_free_text(answers: &[&str], heading: &str) -> String {
    let mut res = String::new();
    for (idx, a) in answers.iter().enumerate() {
        res.push_str(&format!("{} {}\n{}\n\n", heading, idx + 1, a));
    }
    res
}
