//! Edit-operation vocabulary of the Slides `batchUpdate` endpoint.
//!
//! These types serialize to exactly the JSON the remote service expects. A
//! [`Batch`] becomes `{"requests": [...]}` and each [`EditOperation`] becomes
//! a single-key object such as `{"createShape": {...}}`. The reply side
//! ([`BatchReply`]) is index-aligned with the submitted batch.
//!
//! Only the subset of the remote vocabulary tomolog actually emits is modelled.

use serde::{Deserialize, Serialize};

/// Font family applied to every text box.
pub const FONT_FAMILY: &str = "Times New Roman";

/// Length unit. The service accepts `EMU` too, but tomolog only uses points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "PT")]
    Pt,
}

/// A single length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub magnitude: f64,
    pub unit: Unit,
}

impl Dimension {
    pub fn pt(magnitude: f64) -> Self {
        Self {
            magnitude,
            unit: Unit::Pt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub height: Dimension,
    pub width: Dimension,
}

/// Affine transform of a page element. tomolog never scales, only translates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub translate_x: f64,
    pub translate_y: f64,
    pub unit: Unit,
}

impl Transform {
    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            translate_x: x,
            translate_y: y,
            unit: Unit::Pt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementProperties {
    pub page_object_id: String,
    pub size: Size,
    pub transform: Transform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredefinedLayout {
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutReference {
    pub predefined_layout: PredefinedLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShapeType {
    TextBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RangeType {
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    #[serde(rename = "type")]
    pub range_type: RangeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulletPreset {
    BulletDiscCircleSquare,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: Dimension,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSlide {
    pub object_id: String,
    pub insertion_index: usize,
    pub slide_layout_reference: LayoutReference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShape {
    pub object_id: String,
    pub shape_type: ShapeType,
    pub element_properties: ElementProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertText {
    pub object_id: String,
    pub insertion_index: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTextStyle {
    pub object_id: String,
    pub style: TextStyle,
    /// Field mask: only the listed style fields are applied.
    pub fields: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParagraphBullets {
    pub object_id: String,
    pub text_range: TextRange,
    pub bullet_preset: BulletPreset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateImage {
    pub object_id: String,
    pub url: String,
    pub element_properties: ElementProperties,
}

/// One atomic mutation understood by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditOperation {
    CreateSlide(CreateSlide),
    CreateShape(CreateShape),
    InsertText(InsertText),
    UpdateTextStyle(UpdateTextStyle),
    CreateParagraphBullets(CreateParagraphBullets),
    CreateImage(CreateImage),
}

impl EditOperation {
    /// The object this operation creates or targets.
    pub fn object_id(&self) -> &str {
        match self {
            Self::CreateSlide(op) => &op.object_id,
            Self::CreateShape(op) => &op.object_id,
            Self::InsertText(op) => &op.object_id,
            Self::UpdateTextStyle(op) => &op.object_id,
            Self::CreateParagraphBullets(op) => &op.object_id,
            Self::CreateImage(op) => &op.object_id,
        }
    }

    /// Whether this operation introduces a new object.
    pub fn creates_object(&self) -> bool {
        matches!(
            self,
            Self::CreateSlide(_) | Self::CreateShape(_) | Self::CreateImage(_)
        )
    }
}

/// An ordered set of operations applied by the service as one transaction.
///
/// Operations referencing an object created in the same batch must come
/// after the operation that creates it; the builders in
/// [`builder`](super::builder) always emit them in that order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub requests: Vec<EditOperation>,
}

impl Batch {
    pub fn new(requests: Vec<EditOperation>) -> Self {
        Self { requests }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EditOperation> {
        self.requests.iter()
    }
}

/// Identifier payload of a Create* reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedObject {
    pub object_id: String,
}

/// Result of a single operation. Non-creating operations reply with `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_slide: Option<CreatedObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_shape: Option<CreatedObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_image: Option<CreatedObject>,
}

impl OperationResult {
    pub fn created_id(&self) -> Option<&str> {
        self.create_slide
            .as_ref()
            .or(self.create_shape.as_ref())
            .or(self.create_image.as_ref())
            .map(|created| created.object_id.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_id: Option<String>,
    #[serde(default)]
    pub replies: Vec<OperationResult>,
}
