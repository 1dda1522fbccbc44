//! One slide per reconstruction run.
//!
//! [`publish_run`] walks the resolved run parameters and issues one builder
//! call per element, in this order:
//!
//! 1. read the slide count, insert a blank slide
//! 2. title text box (data set name)
//! 3. bulleted parameter text box
//! 4. images, either one at a time through the retrying inserter or all in
//!    one batch
//!
//! Failures in steps 1-3 and in a single-batch image insert propagate and
//! stop the run. A single image that cannot be inserted after the retry
//! budget is recorded as not created and the run continues.
//!
//! ## Layout
//!
//! Coordinates are in points on the default 720 × 405 (16:9) page:
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ title                                      │
//! ├──────────────┬─────────────────────────────┤
//! │ • parameters │  image  image  image ...    │
//! │ • ...        │                             │
//! └──────────────┴─────────────────────────────┘
//! ```

use crate::config::TomologConfig;
use crate::slides::{
    ImageInsertOutcome, Placement, RetryPolicy, SlidesError, SlidesService, build_create_slide,
    build_textbox, extract_created_id, insert_image, insert_images, new_object_id,
};
use tracing::info;

pub const PAGE_WIDTH: f64 = 720.0;
pub const PAGE_HEIGHT: f64 = 405.0;
const MARGIN: f64 = 10.0;
const GAP: f64 = 8.0;
const TITLE_HEIGHT: f64 = 40.0;
const TITLE_FONT_SIZE: f64 = 18.0;
const PARAMETERS_WIDTH: f64 = 240.0;
const PARAMETERS_FONT_SIZE: f64 = 9.0;
/// Smallest image edge, in points.
pub const MIN_IMAGE_SIZE: f64 = 4.0;

/// What happened to one requested image.
#[derive(Debug)]
pub struct ImageReport {
    pub url: String,
    pub outcome: ImageInsertOutcome,
}

/// Objects created for one run.
#[derive(Debug)]
pub struct RunReport {
    pub presentation_id: String,
    pub slide_id: String,
    pub title_id: String,
    pub parameters_id: String,
    pub images: Vec<ImageReport>,
}

impl RunReport {
    pub fn images_created(&self) -> usize {
        self.images
            .iter()
            .filter(|image| image.outcome.object_id().is_some())
            .count()
    }
}

/// Title text: the data set file name, without directories.
pub fn title_text(config: &TomologConfig) -> String {
    let path = &config.file_reading.file_name;
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn slice_label(index: i64) -> String {
    if index < 0 {
        "middle".to_string()
    } else {
        index.to_string()
    }
}

/// One line per bullet describing the run parameters.
pub fn parameters_text(config: &TomologConfig) -> String {
    let p = &config.parameters;
    let threshold = if p.min == 0.0 && p.max == 0.0 {
        "auto".to_string()
    } else {
        format!("{} to {}", p.min, p.max)
    };
    [
        format!("Beamline: {}", p.beamline),
        format!("File: {}", config.file_reading.file_name.display()),
        format!("Reconstruction: {}", p.rec_type),
        format!(
            "Slices: x {}, y {}, z {}",
            slice_label(p.idx),
            slice_label(p.idy),
            slice_label(p.idz)
        ),
        format!("Threshold: {threshold}"),
        format!(
            "Scan range: {}",
            if config.general.double_fov {
                "0-360"
            } else {
                "0-180"
            }
        ),
        format!("Camera PV prefix: {}", p.pv_prefix),
    ]
    .join("\n")
}

/// Lay `count` images out in a grid of square cells right of the parameter
/// box, choosing the column count that gives the largest cells.
///
/// Cells never shrink below [`MIN_IMAGE_SIZE`]; past that point the grid
/// runs off the page instead of producing empty or negative sizes.
pub fn image_placements(count: usize) -> Vec<Placement> {
    if count == 0 {
        return Vec::new();
    }
    let left = MARGIN + PARAMETERS_WIDTH + GAP;
    let top = MARGIN + TITLE_HEIGHT + GAP;
    let area_width = PAGE_WIDTH - MARGIN - left;
    let area_height = PAGE_HEIGHT - MARGIN - top;

    let cell_size = |columns: usize| {
        let rows = count.div_ceil(columns);
        let width = (area_width - GAP * (columns - 1) as f64) / columns as f64;
        let height = (area_height - GAP * (rows - 1) as f64) / rows as f64;
        width.min(height)
    };
    let (columns, side) = (1..=count)
        .map(|columns| (columns, cell_size(columns)))
        .fold((1, f64::MIN), |best, candidate| {
            if candidate.1 > best.1 { candidate } else { best }
        });
    let side = side.max(MIN_IMAGE_SIZE);

    (0..count)
        .map(|i| {
            let (row, column) = (i / columns, i % columns);
            Placement::new(
                side,
                side,
                left + column as f64 * (side + GAP),
                top + row as f64 * (side + GAP),
            )
        })
        .collect()
}

fn insert_images_together(
    service: &dyn SlidesService,
    slide_id: &str,
    urls: &[String],
) -> Result<Vec<ImageReport>, SlidesError> {
    let placements = image_placements(urls.len());
    let widths: Vec<f64> = placements.iter().map(|p| p.width).collect();
    let heights: Vec<f64> = placements.iter().map(|p| p.height).collect();
    let xs: Vec<f64> = placements.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = placements.iter().map(|p| p.y).collect();

    let ids = insert_images(service, slide_id, urls, &widths, &heights, &xs, &ys)?;
    Ok(urls
        .iter()
        .zip(ids)
        .map(|(url, object_id)| ImageReport {
            url: url.clone(),
            outcome: ImageInsertOutcome::Created {
                object_id,
                attempts: 1,
            },
        })
        .collect())
}

/// Create the run's slide and populate it.
///
/// With `single_batch`, all images go in one batch and any failure
/// propagates. Otherwise each image is inserted with `policy`.
pub fn publish_run(
    service: &dyn SlidesService,
    config: &TomologConfig,
    image_urls: &[String],
    policy: &RetryPolicy,
    single_batch: bool,
) -> Result<RunReport, SlidesError> {
    let state = service.fetch_state()?;
    let reply = service.submit(&build_create_slide(&state, &new_object_id()))?;
    let slide_id = extract_created_id(&reply, 0)?;
    info!(%slide_id, "created slide");

    let title = Placement::new(PAGE_WIDTH - 2.0 * MARGIN, TITLE_HEIGHT, MARGIN, MARGIN);
    let reply = service.submit(&build_textbox(
        &slide_id,
        &title_text(config),
        &title,
        TITLE_FONT_SIZE,
        false,
    ))?;
    let title_id = extract_created_id(&reply, 0)?;
    info!(%title_id, "created title");

    let top = MARGIN + TITLE_HEIGHT + GAP;
    let parameters = Placement::new(PARAMETERS_WIDTH, PAGE_HEIGHT - MARGIN - top, MARGIN, top);
    let reply = service.submit(&build_textbox(
        &slide_id,
        &parameters_text(config),
        &parameters,
        PARAMETERS_FONT_SIZE,
        true,
    ))?;
    let parameters_id = extract_created_id(&reply, 0)?;
    info!(%parameters_id, "created parameter list");

    let images = if image_urls.is_empty() {
        Vec::new()
    } else if single_batch {
        insert_images_together(service, &slide_id, image_urls)?
    } else {
        image_urls
            .iter()
            .zip(image_placements(image_urls.len()))
            .map(|(url, placement)| ImageReport {
                url: url.clone(),
                outcome: insert_image(service, &slide_id, url, &placement, policy),
            })
            .collect()
    };

    Ok(RunReport {
        presentation_id: state.presentation_id,
        slide_id,
        title_id,
        parameters_id,
        images,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Beamline, TomologConfig};
    use crate::slides::EditOperation;
    use crate::slides::service::tests::MockSlidesService;
    use std::path::PathBuf;

    fn config() -> TomologConfig {
        let mut config = TomologConfig::default();
        config.file_reading.file_name = PathBuf::from("/data/2024-03/sample_042.h5");
        config.parameters.beamline = Beamline::Bm2;
        config.parameters.idz = 512;
        config
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://example.com/{i}.png")).collect()
    }

    #[test]
    fn title_is_file_name() {
        assert_eq!(title_text(&config()), "sample_042.h5");
    }

    #[test]
    fn parameters_list_run_settings() {
        let text = parameters_text(&config());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Beamline: 2-bm");
        assert!(lines.contains(&"Slices: x middle, y middle, z 512"));
        assert!(lines.contains(&"Threshold: auto"));
        assert!(lines.contains(&"Scan range: 0-180"));
    }

    #[test]
    fn placements_fit_on_page() {
        for count in (1..=6).chain([20, 58, 100, 400]) {
            let placements = image_placements(count);
            assert_eq!(placements.len(), count);
            for p in &placements {
                assert!(p.width >= MIN_IMAGE_SIZE && p.height >= MIN_IMAGE_SIZE);
                assert!(p.x + p.width <= PAGE_WIDTH, "{count} images overflow width");
                assert!(p.y + p.height <= PAGE_HEIGHT, "{count} images overflow height");
            }
            for pair in placements.windows(2) {
                if pair[0].y == pair[1].y {
                    assert!(pair[0].x + pair[0].width <= pair[1].x);
                } else {
                    assert!(pair[0].y + pair[0].height <= pair[1].y);
                }
            }
        }
        assert!(image_placements(0).is_empty());
    }

    #[test]
    fn many_images_wrap_into_rows() {
        let placements = image_placements(58);
        let rows = placements
            .windows(2)
            .filter(|pair| pair[1].y > pair[0].y)
            .count()
            + 1;
        assert!(rows > 1);
        assert!(placements.iter().all(|p| p.width > 0.0));
    }

    #[test]
    fn image_size_never_drops_below_minimum() {
        assert!(
            image_placements(5000)
                .iter()
                .all(|p| p.width == MIN_IMAGE_SIZE && p.height == MIN_IMAGE_SIZE)
        );
    }

    #[test]
    fn publish_run_submits_elements_in_order() {
        let service = MockSlidesService::new(5);
        let report =
            publish_run(&service, &config(), &urls(2), &RetryPolicy::default(), false).unwrap();

        let submissions = service.submissions();
        assert_eq!(submissions.len(), 5);
        match &submissions[0].requests[0] {
            EditOperation::CreateSlide(op) => assert_eq!(op.insertion_index, 4),
            other => panic!("expected CreateSlide, got {other:?}"),
        }
        assert_eq!(submissions[1].len(), 3);
        assert_eq!(submissions[2].len(), 4);
        assert!(
            submissions[3..]
                .iter()
                .all(|b| b.len() == 1 && matches!(b.requests[0], EditOperation::CreateImage(_)))
        );

        assert_eq!(report.slide_id, submissions[0].requests[0].object_id());
        assert_eq!(report.title_id, submissions[1].requests[0].object_id());
        assert_eq!(report.parameters_id, submissions[2].requests[0].object_id());
        assert_eq!(report.images_created(), 2);
    }

    #[test]
    fn elements_are_placed_on_new_slide() {
        let service = MockSlidesService::new(1);
        let report =
            publish_run(&service, &config(), &urls(1), &RetryPolicy::default(), false).unwrap();
        for batch in &service.submissions()[1..] {
            match &batch.requests[0] {
                EditOperation::CreateShape(op) => {
                    assert_eq!(op.element_properties.page_object_id, report.slide_id)
                }
                EditOperation::CreateImage(op) => {
                    assert_eq!(op.element_properties.page_object_id, report.slide_id)
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn single_batch_puts_all_images_in_one_request() {
        let service = MockSlidesService::new(2);
        let report =
            publish_run(&service, &config(), &urls(3), &RetryPolicy::default(), true).unwrap();

        let submissions = service.submissions();
        assert_eq!(submissions.len(), 4);
        assert_eq!(submissions[3].len(), 3);
        assert_eq!(report.images_created(), 3);
        assert_eq!(report.images[2].url, "https://example.com/2.png");
    }

    #[test]
    fn slide_creation_failure_propagates() {
        let service = MockSlidesService::failing_first(1);
        let result = publish_run(&service, &config(), &urls(1), &RetryPolicy::default(), false);
        assert!(matches!(result, Err(SlidesError::RemoteSubmission(_))));
        assert_eq!(service.submissions().len(), 1);
    }

    #[test]
    fn run_without_images_creates_text_only() {
        let service = MockSlidesService::new(1);
        let report =
            publish_run(&service, &config(), &[], &RetryPolicy::default(), false).unwrap();
        assert!(report.images.is_empty());
        assert_eq!(service.submissions().len(), 3);
    }
}
