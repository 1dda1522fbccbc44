//! CLI output formatting.
//!
//! Each command has a `format_*` function returning lines (pure, testable)
//! and a `print_*` wrapper that writes them to stdout.
//!
//! ## Status
//!
//! ```text
//! General
//!     config-update    false
//!     double-fov       false
//!     ...
//! Parameters
//!     beamline         32-id
//!     presentation-url -
//! ```
//!
//! ## Run
//!
//! ```text
//! Slide 6f1c… in presentation 1AbC…
//!     Title: 8d2e…
//!     Parameters: 93aa…
//!     Image 1: https://…/0.png → 1b7f… (1 attempt)
//!     Image 2: https://…/1.png → not created after 40 attempts: …
//! Created 1 of 2 images
//! ```

use crate::config::TomologConfig;
use crate::report::RunReport;
use crate::slides::ImageInsertOutcome;

const INDENT: &str = "    ";

fn rows(config: &TomologConfig) -> Vec<(&'static str, Vec<(&'static str, String)>)> {
    let g = &config.general;
    let p = &config.parameters;
    let s = &config.slides;
    vec![
        (
            "General",
            vec![
                ("config-update", g.config_update.to_string()),
                ("double-fov", g.double_fov.to_string()),
                ("logs-home", g.logs_home.display().to_string()),
                ("token-home", g.token_home.display().to_string()),
                ("verbose", g.verbose.to_string()),
            ],
        ),
        (
            "File reading",
            vec![(
                "file-name",
                config.file_reading.file_name.display().to_string(),
            )],
        ),
        (
            "Parameters",
            vec![
                ("beamline", p.beamline.to_string()),
                ("idx", p.idx.to_string()),
                ("idy", p.idy.to_string()),
                ("idz", p.idz.to_string()),
                ("max", p.max.to_string()),
                ("min", p.min.to_string()),
                (
                    "presentation-url",
                    p.presentation_url.clone().unwrap_or_else(|| "-".into()),
                ),
                ("pv-prefix", p.pv_prefix.clone()),
                ("rec-type", p.rec_type.to_string()),
            ],
        ),
        (
            "Slides",
            vec![
                ("retry-backoff-max-ms", s.retry_backoff_max_ms.to_string()),
                ("retry-backoff-ms", s.retry_backoff_ms.to_string()),
            ],
        ),
    ]
}

/// Merged configuration grouped by section, keys alphabetical.
pub fn format_status(config: &TomologConfig) -> Vec<String> {
    let mut lines = Vec::new();
    for (section, entries) in rows(config) {
        lines.push(section.to_string());
        for (key, value) in entries {
            lines.push(format!("{INDENT}{key:<16} {value}"));
        }
    }
    lines
}

pub fn print_status(config: &TomologConfig) {
    for line in format_status(config) {
        println!("{line}");
    }
}

fn plural(n: u32, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Created objects of a run, one line per element.
pub fn format_run_summary(report: &RunReport) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Slide {} in presentation {}",
            report.slide_id, report.presentation_id
        ),
        format!("{INDENT}Title: {}", report.title_id),
        format!("{INDENT}Parameters: {}", report.parameters_id),
    ];
    for (i, image) in report.images.iter().enumerate() {
        let result = match &image.outcome {
            ImageInsertOutcome::Created {
                object_id,
                attempts,
            } => format!("{object_id} ({})", plural(*attempts, "attempt")),
            ImageInsertOutcome::NotCreated {
                attempts,
                last_error,
            } => format!(
                "not created after {}: {last_error}",
                plural(*attempts, "attempt")
            ),
        };
        lines.push(format!("{INDENT}Image {}: {} → {result}", i + 1, image.url));
    }
    if !report.images.is_empty() {
        lines.push(format!(
            "Created {} of {} images",
            report.images_created(),
            report.images.len()
        ));
    }
    lines
}

pub fn print_run_summary(report: &RunReport) {
    for line in format_run_summary(report) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ImageReport;
    use crate::slides::SlidesError;

    #[test]
    fn status_groups_by_section() {
        let lines = format_status(&TomologConfig::default());
        assert_eq!(lines[0], "General");
        assert!(lines.contains(&"File reading".to_string()));
        assert!(lines.contains(&"    beamline         32-id".to_string()));
        assert!(lines.contains(&"    presentation-url -".to_string()));
    }

    #[test]
    fn status_shows_configured_url() {
        let mut config = TomologConfig::default();
        config.parameters.presentation_url = Some("1AbC".into());
        let lines = format_status(&config);
        assert!(lines.contains(&"    presentation-url 1AbC".to_string()));
    }

    fn report(images: Vec<ImageReport>) -> RunReport {
        RunReport {
            presentation_id: "deck".into(),
            slide_id: "s".into(),
            title_id: "t".into(),
            parameters_id: "p".into(),
            images,
        }
    }

    #[test]
    fn run_summary_without_images() {
        let lines = format_run_summary(&report(vec![]));
        assert_eq!(
            lines,
            vec![
                "Slide s in presentation deck",
                "    Title: t",
                "    Parameters: p",
            ]
        );
    }

    #[test]
    fn run_summary_reports_each_image() {
        let lines = format_run_summary(&report(vec![
            ImageReport {
                url: "a.png".into(),
                outcome: ImageInsertOutcome::Created {
                    object_id: "i1".into(),
                    attempts: 1,
                },
            },
            ImageReport {
                url: "b.png".into(),
                outcome: ImageInsertOutcome::NotCreated {
                    attempts: 40,
                    last_error: SlidesError::MalformedReply("empty".into()),
                },
            },
        ]));
        assert_eq!(lines[3], "    Image 1: a.png → i1 (1 attempt)");
        assert_eq!(
            lines[4],
            "    Image 2: b.png → not created after 40 attempts: malformed reply: empty"
        );
        assert_eq!(lines[5], "Created 1 of 2 images");
    }
}
