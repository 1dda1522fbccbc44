//! Batch builders: one high-level intent → an ordered [`Batch`].
//!
//! Builders are pure. They allocate fresh object IDs client-side so later
//! operations in the same batch can reference the element being created,
//! but never touch the network. Submitting is the job of
//! [`SlidesService`](super::service::SlidesService).

use super::requests::{
    Batch, BulletPreset, CreateImage, CreateParagraphBullets, CreateShape, CreateSlide,
    Dimension, EditOperation, ElementProperties, FONT_FAMILY, InsertText, LayoutReference,
    PredefinedLayout, RangeType, ShapeType, Size, TextRange, TextStyle, Transform,
    UpdateTextStyle,
};
use super::service::{PresentationState, SlidesError};
use uuid::Uuid;

/// Where a page element goes and how big it is, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
}

impl Placement {
    pub fn new(width: f64, height: f64, x: f64, y: f64) -> Self {
        Self {
            width,
            height,
            x,
            y,
        }
    }

    fn element_properties(&self, page_id: &str) -> ElementProperties {
        ElementProperties {
            page_object_id: page_id.to_string(),
            size: Size {
                height: Dimension::pt(self.height),
                width: Dimension::pt(self.width),
            },
            transform: Transform::translate(self.x, self.y),
        }
    }
}

/// Generate a fresh client-side object ID.
pub fn new_object_id() -> String {
    Uuid::new_v4().to_string()
}

/// Insert a blank slide.
///
/// The insertion index is `slide_count - 1`: the new slide lands in the
/// second-to-last position, not at the end. Callers that want append
/// semantics must account for this. An empty presentation gets index 0.
pub fn build_create_slide(state: &PresentationState, new_slide_id: &str) -> Batch {
    Batch::new(vec![EditOperation::CreateSlide(CreateSlide {
        object_id: new_slide_id.to_string(),
        insertion_index: state.slide_count.saturating_sub(1),
        slide_layout_reference: LayoutReference {
            predefined_layout: PredefinedLayout::Blank,
        },
    })])
}

/// Create a text box, fill it, and size its font.
///
/// Emits CreateShape, InsertText, UpdateTextStyle and, when `bulleted`,
/// CreateParagraphBullets over the whole text. All operations share one
/// freshly generated element ID.
pub fn build_textbox(
    page_id: &str,
    text: &str,
    placement: &Placement,
    font_size: f64,
    bulleted: bool,
) -> Batch {
    let element_id = new_object_id();
    let mut requests = vec![
        EditOperation::CreateShape(CreateShape {
            object_id: element_id.clone(),
            shape_type: ShapeType::TextBox,
            element_properties: placement.element_properties(page_id),
        }),
        EditOperation::InsertText(InsertText {
            object_id: element_id.clone(),
            insertion_index: 0,
            text: text.to_string(),
        }),
        EditOperation::UpdateTextStyle(UpdateTextStyle {
            object_id: element_id.clone(),
            style: TextStyle {
                font_family: FONT_FAMILY.to_string(),
                font_size: Dimension::pt(font_size),
            },
            // Only the size is applied; the family rides along unused.
            fields: "fontSize".to_string(),
        }),
    ];
    if bulleted {
        requests.push(EditOperation::CreateParagraphBullets(CreateParagraphBullets {
            object_id: element_id,
            text_range: TextRange {
                range_type: RangeType::All,
            },
            bullet_preset: BulletPreset::BulletDiscCircleSquare,
        }));
    }
    Batch::new(requests)
}

fn create_image(page_id: &str, url: &str, placement: &Placement) -> EditOperation {
    EditOperation::CreateImage(CreateImage {
        object_id: new_object_id(),
        url: url.to_string(),
        element_properties: placement.element_properties(page_id),
    })
}

/// Place one image fetched by the service from `url`.
pub fn build_image(page_id: &str, url: &str, placement: &Placement) -> Batch {
    Batch::new(vec![create_image(page_id, url, placement)])
}

/// Place several images in one batch, one CreateImage per index.
///
/// The five sequences are parallel and must have equal length; otherwise
/// this fails with [`SlidesError::LengthMismatch`] before anything is built.
pub fn build_images(
    page_id: &str,
    urls: &[String],
    widths: &[f64],
    heights: &[f64],
    xs: &[f64],
    ys: &[f64],
) -> Result<Batch, SlidesError> {
    let expected = urls.len();
    for (name, len) in [
        ("widths", widths.len()),
        ("heights", heights.len()),
        ("xs", xs.len()),
        ("ys", ys.len()),
    ] {
        if len != expected {
            return Err(SlidesError::LengthMismatch {
                field: name,
                expected,
                actual: len,
            });
        }
    }

    let requests = urls
        .iter()
        .enumerate()
        .map(|(i, url)| {
            let placement = Placement::new(widths[i], heights[i], xs[i], ys[i]);
            create_image(page_id, url, &placement)
        })
        .collect();
    Ok(Batch::new(requests))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn placement() -> Placement {
        Placement::new(200.0, 40.0, 10.0, 5.0)
    }

    fn state(slide_count: usize) -> PresentationState {
        PresentationState {
            presentation_id: "deck".into(),
            slide_count,
        }
    }

    #[test]
    fn create_slide_uses_second_to_last_index() {
        let batch = build_create_slide(&state(7), "slide-1");
        assert_eq!(batch.len(), 1);
        match &batch.requests[0] {
            EditOperation::CreateSlide(op) => {
                assert_eq!(op.object_id, "slide-1");
                assert_eq!(op.insertion_index, 6);
                assert_eq!(
                    op.slide_layout_reference.predefined_layout,
                    PredefinedLayout::Blank
                );
            }
            other => panic!("expected CreateSlide, got {other:?}"),
        }
    }

    #[test]
    fn create_slide_in_empty_presentation_uses_index_zero() {
        let batch = build_create_slide(&state(0), "slide-1");
        assert!(matches!(
            &batch.requests[0],
            EditOperation::CreateSlide(op) if op.insertion_index == 0
        ));
    }

    #[test]
    fn textbox_operations_share_one_id() {
        for bulleted in [false, true] {
            let batch = build_textbox("page", "hello", &placement(), 14.0, bulleted);
            let first = batch.requests[0].object_id();
            assert!(batch.iter().all(|op| op.object_id() == first));
        }
    }

    #[test]
    fn textbox_without_bullets_has_three_operations() {
        let batch = build_textbox("page", "hello", &placement(), 14.0, false);
        assert_eq!(batch.len(), 3);
        assert!(matches!(batch.requests[0], EditOperation::CreateShape(_)));
        assert!(matches!(batch.requests[1], EditOperation::InsertText(_)));
        assert!(matches!(batch.requests[2], EditOperation::UpdateTextStyle(_)));
        assert!(
            !batch
                .iter()
                .any(|op| matches!(op, EditOperation::CreateParagraphBullets(_)))
        );
    }

    #[test]
    fn textbox_with_bullets_ends_in_bullets() {
        let batch = build_textbox("page", "a\nb", &placement(), 14.0, true);
        assert_eq!(batch.len(), 4);
        assert!(matches!(
            batch.requests[3],
            EditOperation::CreateParagraphBullets(_)
        ));
    }

    #[test]
    fn textbox_carries_text_and_font_size() {
        let batch = build_textbox("page", "run 42", &placement(), 11.0, false);
        match (&batch.requests[1], &batch.requests[2]) {
            (EditOperation::InsertText(text), EditOperation::UpdateTextStyle(style)) => {
                assert_eq!(text.insertion_index, 0);
                assert_eq!(text.text, "run 42");
                assert_eq!(style.style.font_family, "Times New Roman");
                assert_eq!(style.style.font_size.magnitude, 11.0);
                assert_eq!(style.fields, "fontSize");
            }
            other => panic!("unexpected operations {other:?}"),
        }
    }

    #[test]
    fn textboxes_get_fresh_ids() {
        let a = build_textbox("page", "a", &placement(), 10.0, false);
        let b = build_textbox("page", "b", &placement(), 10.0, false);
        assert_ne!(a.requests[0].object_id(), b.requests[0].object_id());
    }

    #[test]
    fn image_places_url_on_page() {
        let batch = build_image("page", "https://example.com/x.png", &placement());
        assert_eq!(batch.len(), 1);
        match &batch.requests[0] {
            EditOperation::CreateImage(op) => {
                assert_eq!(op.url, "https://example.com/x.png");
                assert_eq!(op.element_properties.page_object_id, "page");
                assert_eq!(op.element_properties.size.width.magnitude, 200.0);
                assert_eq!(op.element_properties.size.height.magnitude, 40.0);
                assert_eq!(op.element_properties.transform.translate_x, 10.0);
                assert_eq!(op.element_properties.transform.translate_y, 5.0);
            }
            other => panic!("expected CreateImage, got {other:?}"),
        }
    }

    #[test]
    fn images_preserve_order_with_distinct_ids() {
        let urls = vec!["a".to_string(), "b".to_string()];
        let batch =
            build_images("page", &urls, &[10.0, 20.0], &[5.0, 6.0], &[0.0, 1.0], &[0.0, 1.0])
                .unwrap();
        assert_eq!(batch.len(), 2);

        let images: Vec<&CreateImage> = batch
            .iter()
            .map(|op| match op {
                EditOperation::CreateImage(image) => image,
                other => panic!("expected CreateImage, got {other:?}"),
            })
            .collect();
        assert_eq!(images[0].url, "a");
        assert_eq!(images[1].url, "b");
        assert_eq!(images[1].element_properties.size.width.magnitude, 20.0);
        assert_eq!(images[1].element_properties.size.height.magnitude, 6.0);

        let ids: HashSet<&str> = batch.iter().map(|op| op.object_id()).collect();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn images_reject_mismatched_lengths() {
        let urls = vec!["a".to_string(), "b".to_string()];
        let result = build_images("page", &urls, &[10.0, 20.0], &[5.0], &[0.0, 1.0], &[0.0, 1.0]);
        assert!(matches!(
            result,
            Err(SlidesError::LengthMismatch {
                field: "heights",
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn images_accept_empty_input() {
        let batch = build_images("page", &[], &[], &[], &[], &[]).unwrap();
        assert!(batch.is_empty());
    }
}
