// Bar charts of the answer counts.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};

use crate::report::*;

const BAR_COLOR: RGBColor = RGBColor(0x98, 0xff, 0xa9);
const FONT_FAMILY: &str = "sans-serif";
const MAX_CAPTION_CHARS: usize = 80;
const MAX_TICK_CHARS: usize = 18;

// Looked up in order when no font is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static FONT_REGISTERED: OnceCell<bool> = OnceCell::new();

/// One bar of a chart.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Bar {
    pub label: String,
    pub count: u64,
}

/// One bar per distinct answer, sorted by answer. Blank answers get the given label.
pub fn bars_from_frequencies(freq: &AnswerFrequencyMap, blank_label: &str) -> Vec<Bar> {
    freq.iter()
        .map(|(answer, count)| Bar {
            label: if answer == AnswerFrequencyMap::BLANK {
                blank_label.to_string()
            } else {
                answer.to_string()
            },
            count,
        })
        .collect()
}

pub trait ChartRenderer {
    /// Draws the bars in a new image at `path`, replacing any previous file.
    fn render(&self, bars: &[Bar], title: &str, path: &Path) -> ReportResult<()>;
}

/// PNG bar charts drawn with plotters.
pub struct PlottersChart {
    width: u32,
    height: u32,
    with_text: bool,
}

impl PlottersChart {
    /// Text (title, axis labels) needs a TrueType font. Without one the bars are still drawn.
    pub fn new(font_path: Option<&Path>) -> PlottersChart {
        PlottersChart {
            width: 800,
            height: 600,
            with_text: register_chart_font(font_path),
        }
    }

    fn draw(
        &self,
        bars: &[Bar],
        title: &str,
        path: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let n = bars.len().max(1);
        let max_count = bars.iter().map(|b| b.count).max().unwrap_or(0);

        let mut builder = ChartBuilder::on(&root);
        builder.margin(20);
        if self.with_text {
            builder
                .caption(shorten(title, MAX_CAPTION_CHARS), (FONT_FAMILY, 20).into_font())
                .x_label_area_size(60)
                .y_label_area_size(40);
        }
        let mut chart =
            builder.build_cartesian_2d((0..n).into_segmented(), 0u64..max_count + 1)?;

        if self.with_text {
            let labels: Vec<String> = bars
                .iter()
                .map(|b| shorten(&b.label, MAX_TICK_CHARS))
                .collect();
            let formatter = |v: &SegmentValue<usize>| match v {
                SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                    labels.get(*i).cloned().unwrap_or_default()
                }
                SegmentValue::Last => String::new(),
            };
            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(n)
                .x_label_formatter(&formatter)
                .x_label_style((FONT_FAMILY, 12).into_font())
                .draw()?;
        }

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(BAR_COLOR.filled())
                .margin(8)
                .data(bars.iter().enumerate().map(|(i, b)| (i, b.count))),
        )?;

        root.present()?;
        Ok(())
    }
}

impl ChartRenderer for PlottersChart {
    fn render(&self, bars: &[Bar], title: &str, path: &Path) -> ReportResult<()> {
        self.draw(bars, title, path).map_err(|e| ReportError::ChartRender {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

fn shorten(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut res: String = s.chars().take(max_chars - 1).collect();
        res.push('…');
        res
    }
}

// The font is registered once per process, for every chart.
fn register_chart_font(font_path: Option<&Path>) -> bool {
    *FONT_REGISTERED.get_or_init(|| {
        let candidates: Vec<PathBuf> = match font_path {
            Some(p) => vec![p.to_path_buf()],
            None => SYSTEM_FONTS.iter().map(|p| PathBuf::from(*p)).collect(),
        };
        for p in candidates.iter() {
            if let Ok(bytes) = fs::read(p) {
                // plotters keeps a reference to the font data for the whole process.
                let data: &'static [u8] = Box::leak(bytes.into_boxed_slice());
                if register_font(FONT_FAMILY, FontStyle::Normal, data).is_ok() {
                    info!("Using font {} for the charts", p.display());
                    return true;
                }
                warn!("{} is not a usable font", p.display());
            }
        }
        warn!("No font found: the charts will be drawn without title and labels");
        false
    })
}
