//! Visual representation of PAdES signatures.
//!
//! A visual representation is the stamp rendered on a PDF page: a text block
//! whose placeholders (`{{name}}`, `{{national_id}}`, ...) are filled in by the
//! service from the signer certificate, an optional background image, and a
//! position. Positions are either manual (one fixed rectangle) or automatic
//! (a container in which successive signatures are laid out side by side and
//! wrap to new rows).
//!
//! Everything here is plain data; presets fetched from the service live in
//! [`crate::services::presets`].

use crate::infra::error::{RestPkiError, RestPkiResult};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// Page on which a signature stamp is placed.
///
/// On the wire this is a single integer: positive values are absolute 1-based
/// pages, zero appends a new page, negative values count from the end of the
/// document (`-1` is the last page).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum PageTarget {
    /// Absolute page, 1-based
    Page(NonZeroU32),
    /// A new page appended to the end of the document
    NewPage,
    /// Counted from the end: `FromEnd(1)` is the last existing page
    FromEnd(NonZeroU32),
}

impl PageTarget {
    /// The last existing page of the document
    pub const LAST_PAGE: PageTarget = PageTarget::FromEnd(NonZeroU32::MIN);

    /// Absolute 1-based page; `None` for page 0
    #[must_use]
    pub fn page(number: u32) -> Option<Self> {
        NonZeroU32::new(number).map(PageTarget::Page)
    }

    /// Page counted from the end, 1 being the last; `None` for 0
    #[must_use]
    pub fn from_end(offset: u32) -> Option<Self> {
        NonZeroU32::new(offset).map(PageTarget::FromEnd)
    }
}

impl From<i32> for PageTarget {
    fn from(value: i32) -> Self {
        let Some(magnitude) = NonZeroU32::new(value.unsigned_abs()) else {
            return PageTarget::NewPage;
        };
        if value > 0 {
            PageTarget::Page(magnitude)
        } else {
            PageTarget::FromEnd(magnitude)
        }
    }
}

impl From<PageTarget> for i32 {
    fn from(target: PageTarget) -> Self {
        let clamp = |n: NonZeroU32| i32::try_from(n.get()).unwrap_or(i32::MAX);
        match target {
            PageTarget::NewPage => 0,
            PageTarget::Page(n) => clamp(n),
            PageTarget::FromEnd(n) => -clamp(n),
        }
    }
}

/// Units used by every length in a positioning structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasurementUnits {
    Centimeters,
    PdfPoints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
}

/// Rectangle described by margins and/or sizes.
///
/// Horizontally exactly two of `left`, `right`, `width` must be given, and
/// vertically exactly two of `top`, `bottom`, `height`. Giving `left` and
/// `right` yields a variable-width container; `bottom` and `height` yields a
/// bottom-aligned fixed-height one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl Container {
    /// Container with the same margin on every side
    #[must_use]
    pub fn margins(all: f64) -> Self {
        Self {
            left: Some(all),
            right: Some(all),
            top: Some(all),
            bottom: Some(all),
            ..Self::default()
        }
    }

    /// Check that the given fields determine exactly one rectangle
    pub fn validate(&self) -> RestPkiResult<()> {
        let horizontal = [self.left, self.right, self.width]
            .iter()
            .filter(|v| v.is_some())
            .count();
        let vertical = [self.top, self.bottom, self.height]
            .iter()
            .filter(|v| v.is_some())
            .count();
        if horizontal != 2 {
            return Err(RestPkiError::ValidationError(format!(
                "Container must set exactly two of left/right/width, got {horizontal}"
            )));
        }
        if vertical != 2 {
            return Err(RestPkiError::ValidationError(format!(
                "Container must set exactly two of top/bottom/height, got {vertical}"
            )));
        }
        let negative = [
            self.left,
            self.right,
            self.top,
            self.bottom,
            self.width,
            self.height,
        ]
        .into_iter()
        .flatten()
        .any(|v| v < 0.0 || !v.is_finite());
        if negative {
            return Err(RestPkiError::ValidationError(
                "Container dimensions must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectangleSize {
    pub width: f64,
    pub height: f64,
}

/// One fixed rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManualPositioning {
    pub left: f64,
    pub bottom: f64,
    pub width: f64,
    pub height: f64,
}

/// Signatures laid out one after the other inside `container`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoPositioning {
    pub container: Container,
    pub signature_rectangle_size: RectangleSize,
    /// Vertical distance between rows when signatures wrap
    #[serde(default)]
    pub row_spacing: f64,
}

/// Where the stamp goes. Exactly one of `manual` or `auto` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualPositioning {
    pub page_number: PageTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_units: Option<MeasurementUnits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual: Option<ManualPositioning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto: Option<AutoPositioning>,
}

impl VisualPositioning {
    /// Fixed rectangle on `page`
    #[must_use]
    pub fn manual(page: PageTarget, units: MeasurementUnits, rect: ManualPositioning) -> Self {
        Self {
            page_number: page,
            measurement_units: Some(units),
            manual: Some(rect),
            auto: None,
        }
    }

    /// Automatic layout on `page`; the container is checked here
    pub fn auto(
        page: PageTarget,
        units: MeasurementUnits,
        auto: AutoPositioning,
    ) -> RestPkiResult<Self> {
        auto.container.validate()?;
        Ok(Self {
            page_number: page,
            measurement_units: Some(units),
            manual: None,
            auto: Some(auto),
        })
    }

    /// Parse a preset as returned by the positioning presets endpoint
    pub fn from_preset(preset: &serde_json::Value) -> RestPkiResult<Self> {
        let positioning: Self = serde_json::from_value(preset.clone())?;
        positioning.validate()?;
        Ok(positioning)
    }

    pub fn validate(&self) -> RestPkiResult<()> {
        match (&self.manual, &self.auto) {
            (Some(_), None) => Ok(()),
            (None, Some(auto)) => auto.container.validate(),
            (Some(_), Some(_)) => Err(RestPkiError::ValidationError(
                "Positioning cannot be both manual and auto".to_string(),
            )),
            (None, None) => Err(RestPkiError::ValidationError(
                "Positioning must be either manual or auto".to_string(),
            )),
        }
    }

    /// Mutable access to the auto layout, for customising fetched presets
    pub fn auto_mut(&mut self) -> Option<&mut AutoPositioning> {
        self.auto.as_mut()
    }
}

/// Text block of the stamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualText {
    /// Template; placeholders such as `{{name}}` are filled in by the service
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default)]
    pub include_signing_time: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_align: Option<HorizontalAlign>,
    /// Area of the signature rectangle the text may occupy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Container>,
}

impl VisualText {
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            text: template.into(),
            font_size: None,
            include_signing_time: false,
            horizontal_align: None,
            container: None,
        }
    }

    #[must_use]
    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    #[must_use]
    pub fn with_signing_time(mut self) -> Self {
        self.include_signing_time = true;
        self
    }

    #[must_use]
    pub fn with_horizontal_align(mut self, align: HorizontalAlign) -> Self {
        self.horizontal_align = Some(align);
        self
    }

    #[must_use]
    pub fn with_container(mut self, container: Container) -> Self {
        self.container = Some(container);
        self
    }
}

/// Image content inline (base64) or by URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContentOrReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub mime_type: String,
}

/// Background image of the stamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualImage {
    pub resource: ResourceContentOrReference,
    /// 0 is fully transparent, 100 fully opaque
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_align: Option<HorizontalAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_align: Option<VerticalAlign>,
}

impl VisualImage {
    /// Image embedded in the request
    #[must_use]
    pub fn from_bytes(content: &[u8], mime_type: impl Into<String>) -> Self {
        Self::with_resource(ResourceContentOrReference {
            content: Some(base64::engine::general_purpose::STANDARD.encode(content)),
            url: None,
            mime_type: mime_type.into(),
        })
    }

    /// Image the service downloads itself
    #[must_use]
    pub fn from_url(url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::with_resource(ResourceContentOrReference {
            content: None,
            url: Some(url.into()),
            mime_type: mime_type.into(),
        })
    }

    fn with_resource(resource: ResourceContentOrReference) -> Self {
        Self {
            resource,
            opacity: None,
            horizontal_align: None,
            vertical_align: None,
        }
    }

    /// Set opacity in percent.
    ///
    /// # Errors
    /// Returns a validation error for values above 100.
    pub fn with_opacity(mut self, opacity: u8) -> RestPkiResult<Self> {
        if opacity > 100 {
            return Err(RestPkiError::ValidationError(format!(
                "Opacity must be between 0 and 100, got {opacity}"
            )));
        }
        self.opacity = Some(opacity);
        Ok(self)
    }

    #[must_use]
    pub fn with_alignment(mut self, horizontal: HorizontalAlign, vertical: VerticalAlign) -> Self {
        self.horizontal_align = Some(horizontal);
        self.vertical_align = Some(vertical);
        self
    }
}

/// Complete stamp: text, image and position
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisualRepresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<VisualText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<VisualImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<VisualPositioning>,
}

impl VisualRepresentation {
    #[must_use]
    pub fn new(position: VisualPositioning) -> Self {
        Self {
            text: None,
            image: None,
            position: Some(position),
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: VisualText) -> Self {
        self.text = Some(text);
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: VisualImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn validate(&self) -> RestPkiResult<()> {
        let Some(position) = &self.position else {
            return Err(RestPkiError::ValidationError(
                "The visual representation has no position".to_string(),
            ));
        };
        position.validate()?;
        if let Some(container) = self.text.as_ref().and_then(|t| t.container.as_ref()) {
            container.validate()?;
        }
        if let Some(image) = &self.image {
            if image.resource.content.is_none() && image.resource.url.is_none() {
                return Err(RestPkiError::ValidationError(
                    "The stamp image has neither content nor URL".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_target_wire_values() {
        assert_eq!(i32::from(PageTarget::NewPage), 0);
        assert_eq!(i32::from(PageTarget::LAST_PAGE), -1);
        assert_eq!(i32::from(PageTarget::page(3).unwrap()), 3);
        assert_eq!(PageTarget::from(0), PageTarget::NewPage);
        assert_eq!(PageTarget::from(-2), PageTarget::from_end(2).unwrap());
        assert_eq!(PageTarget::from(7), PageTarget::page(7).unwrap());
        assert_eq!(i32::from(PageTarget::from(i32::MIN)), -i32::MAX);
    }

    #[test]
    fn test_page_zero_cannot_be_targeted() {
        assert_eq!(PageTarget::page(0), None);
        assert_eq!(PageTarget::from_end(0), None);
        assert_eq!(PageTarget::from_end(1), Some(PageTarget::LAST_PAGE));
    }

    #[test]
    fn test_manual_on_new_page_shape() {
        let position = VisualPositioning::manual(
            PageTarget::NewPage,
            MeasurementUnits::Centimeters,
            ManualPositioning {
                left: 2.54,
                bottom: 2.54,
                width: 5.0,
                height: 3.0,
            },
        );
        assert_eq!(
            serde_json::to_value(&position).unwrap(),
            json!({
                "pageNumber": 0,
                "measurementUnits": "Centimeters",
                "manual": { "left": 2.54, "bottom": 2.54, "width": 5.0, "height": 3.0 }
            })
        );
    }

    #[test]
    fn test_auto_on_last_page_shape() {
        let position = VisualPositioning::auto(
            PageTarget::LAST_PAGE,
            MeasurementUnits::Centimeters,
            AutoPositioning {
                container: Container {
                    left: Some(2.54),
                    right: Some(2.54),
                    bottom: Some(2.54),
                    height: Some(12.31),
                    ..Container::default()
                },
                signature_rectangle_size: RectangleSize {
                    width: 5.0,
                    height: 3.0,
                },
                row_spacing: 1.0,
            },
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&position).unwrap(),
            json!({
                "pageNumber": -1,
                "measurementUnits": "Centimeters",
                "auto": {
                    "container": { "left": 2.54, "right": 2.54, "bottom": 2.54, "height": 12.31 },
                    "signatureRectangleSize": { "width": 5.0, "height": 3.0 },
                    "rowSpacing": 1.0
                }
            })
        );
    }

    #[test]
    fn test_absolute_page_shape() {
        let position = VisualPositioning::manual(
            PageTarget::page(2).unwrap(),
            MeasurementUnits::PdfPoints,
            ManualPositioning {
                left: 10.0,
                bottom: 10.0,
                width: 100.0,
                height: 50.0,
            },
        );
        let value = serde_json::to_value(&position).unwrap();
        assert_eq!(value["pageNumber"], json!(2));
        assert_eq!(value["measurementUnits"], json!("PdfPoints"));
        assert!(value.get("auto").is_none());
    }

    #[test]
    fn test_container_must_determine_a_rectangle() {
        let underdetermined = Container {
            left: Some(1.0),
            top: Some(1.0),
            bottom: Some(1.0),
            ..Container::default()
        };
        assert!(matches!(
            underdetermined.validate(),
            Err(RestPkiError::ValidationError(_))
        ));

        let overdetermined = Container {
            left: Some(1.0),
            right: Some(1.0),
            width: Some(3.0),
            top: Some(1.0),
            height: Some(2.0),
            ..Container::default()
        };
        assert!(overdetermined.validate().is_err());
        assert!(Container::margins(0.2).validate().is_ok());
    }

    #[test]
    fn test_preset_is_parsed_and_customised() {
        let preset = json!({
            "pageNumber": -1,
            "measurementUnits": "Centimeters",
            "auto": {
                "container": { "left": 2.54, "right": 2.54, "bottom": 2.54, "height": 2.54 },
                "signatureRectangleSize": { "width": 7.0, "height": 2.54 },
                "rowSpacing": 0.0
            },
            "manual": null
        });
        let mut position = VisualPositioning::from_preset(&preset).unwrap();
        let auto = position.auto_mut().unwrap();
        auto.container.height = Some(4.94);
        auto.signature_rectangle_size.width = 8.0;
        assert!(position.validate().is_ok());
        assert_eq!(position.page_number, PageTarget::LAST_PAGE);
    }

    #[test]
    fn test_image_opacity_bounds() {
        let image = VisualImage::from_bytes(b"png", "image/png");
        assert!(image.clone().with_opacity(100).is_ok());
        assert!(image.with_opacity(101).is_err());
    }

    #[test]
    fn test_representation_serialisation() {
        let representation = VisualRepresentation::new(VisualPositioning::manual(
            PageTarget::page(1).unwrap(),
            MeasurementUnits::Centimeters,
            ManualPositioning {
                left: 1.0,
                bottom: 1.0,
                width: 5.0,
                height: 3.0,
            },
        ))
        .with_text(
            VisualText::new("Signed by {{name}} ({{national_id}})")
                .with_font_size(13.0)
                .with_signing_time()
                .with_horizontal_align(HorizontalAlign::Left)
                .with_container(Container::margins(0.2)),
        )
        .with_image(
            VisualImage::from_bytes(&[1, 2, 3], "image/png")
                .with_opacity(50)
                .unwrap()
                .with_alignment(HorizontalAlign::Right, VerticalAlign::Center),
        );
        assert!(representation.validate().is_ok());

        let value = serde_json::to_value(&representation).unwrap();
        assert_eq!(value["text"]["fontSize"], json!(13.0));
        assert_eq!(value["text"]["includeSigningTime"], json!(true));
        assert_eq!(value["image"]["resource"]["content"], json!("AQID"));
        assert_eq!(value["image"]["resource"]["mimeType"], json!("image/png"));
        assert_eq!(value["image"]["verticalAlign"], json!("Center"));
    }
}
