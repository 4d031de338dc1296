//! Request parameters for the background removal endpoint
//!
//! The image source is a closed sum type, so a [`RemoveBackgroundParams`]
//! always carries exactly one of file, URL or base64 input. The
//! [`RemoveBackgroundParamsBuilder`] mirrors the loose form used by the web
//! API and rejects zero or multiple sources before any request is built.
//!
//! Rendering options are pass-through: the service validates them, this
//! module only encodes them as multipart fields.

use crate::error::{RemoveBgError, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Value sent on the wire
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = RemoveBgError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(RemoveBgError::invalid_request(format!(
                        "Unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

wire_enum! {
    /// Output resolution
    ImageSize {
        Auto => "auto",
        Preview => "preview",
        Small => "small",
        Regular => "regular",
        Medium => "medium",
        Hd => "hd",
        FourK => "4k",
        FiftyMp => "50MP",
    }
}

wire_enum! {
    /// Output encoding
    ImageFormat {
        Auto => "auto",
        Png => "png",
        Jpg => "jpg",
        Webp => "webp",
        Zip => "zip",
    }
}

wire_enum! {
    /// Kind of foreground to detect
    ForegroundType {
        Auto => "auto",
        Person => "person",
        Product => "product",
        Animal => "animal",
        Car => "car",
        Transportation => "transportation",
        Graphic => "graphic",
        Other => "other",
    }
}

wire_enum! {
    /// Classification level reported in `X-Type`
    TypeLevel {
        None => "none",
        Latest => "latest",
        One => "1",
        Two => "2",
    }
}

wire_enum! {
    Channels {
        Rgba => "rgba",
        Alpha => "alpha",
    }
}

wire_enum! {
    ShadowType {
        None => "none",
        Drop => "drop",
        Natural => "natural",
    }
}

impl ImageFormat {
    /// File extension for a result in this format; `auto` resolves to png
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Auto | Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Webp => "webp",
            Self::Zip => "zip",
        }
    }
}

/// Where the input image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Uploaded file contents (`image_file`)
    File { data: Bytes, file_name: String },
    /// Remote image fetched by the service (`image_url`)
    Url(String),
    /// Base64-encoded image (`image_file_b64`)
    Base64(String),
}

impl ImageSource {
    /// Short name used in logs and spans
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Url(_) => "url",
            Self::Base64(_) => "base64",
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::File { data, file_name } => {
                if data.is_empty() {
                    return Err(RemoveBgError::invalid_request(format!(
                        "Image file '{}' is empty",
                        file_name
                    )));
                }
            },
            Self::Url(url) => {
                if url.trim().is_empty() {
                    return Err(RemoveBgError::invalid_request("image_url cannot be empty"));
                }
            },
            Self::Base64(encoded) => {
                if encoded.trim().is_empty() {
                    return Err(RemoveBgError::invalid_request(
                        "image_file_b64 cannot be empty",
                    ));
                }
            },
        }
        Ok(())
    }
}

/// Optional rendering options shared by all source variants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoveBackgroundOptions {
    pub size: Option<ImageSize>,
    pub format: Option<ImageFormat>,
    #[serde(rename = "type")]
    pub foreground_type: Option<ForegroundType>,
    pub type_level: Option<TypeLevel>,
    pub channels: Option<Channels>,
    /// Hex code or color name, e.g. `81d4fa`, `green`, `81d4fa77`
    pub bg_color: Option<String>,
    pub bg_image_url: Option<String>,
    pub crop: Option<bool>,
    /// Margin around the cropped subject, e.g. `10px` or `5%`
    pub crop_margin: Option<String>,
    /// Subject scale relative to the image, e.g. `80%`
    pub scale: Option<String>,
    /// `original`, `center` or `"<h> <v>"`
    pub position: Option<String>,
    /// Region of interest, `"x1 y1 x2 y2"` in px or %
    pub roi: Option<String>,
    pub semitransparency: Option<bool>,
    pub shadow_type: Option<ShadowType>,
    /// 0-100, range checked by the service
    pub shadow_opacity: Option<u8>,
    /// Deprecated by the service in favour of `shadow_type`
    pub add_shadow: Option<bool>,
}

impl RemoveBackgroundOptions {
    fn push_fields(&self, fields: &mut Vec<FormField>) {
        fn text(fields: &mut Vec<FormField>, name: &'static str, value: Option<String>) {
            if let Some(value) = value {
                fields.push(FormField::text(name, value));
            }
        }

        text(fields, "size", self.size.map(|v| v.as_str().to_string()));
        text(fields, "type", self.foreground_type.map(|v| v.as_str().to_string()));
        text(fields, "type_level", self.type_level.map(|v| v.as_str().to_string()));
        text(fields, "format", self.format.map(|v| v.as_str().to_string()));
        text(fields, "roi", self.roi.clone());
        text(fields, "crop", self.crop.map(|v| v.to_string()));
        text(fields, "crop_margin", self.crop_margin.clone());
        text(fields, "scale", self.scale.clone());
        text(fields, "position", self.position.clone());
        text(fields, "channels", self.channels.map(|v| v.as_str().to_string()));
        text(fields, "add_shadow", self.add_shadow.map(|v| v.to_string()));
        text(fields, "semitransparency", self.semitransparency.map(|v| v.to_string()));
        text(fields, "bg_color", self.bg_color.clone());
        text(fields, "bg_image_url", self.bg_image_url.clone());
        text(fields, "shadow_type", self.shadow_type.map(|v| v.as_str().to_string()));
        text(fields, "shadow_opacity", self.shadow_opacity.map(|v| v.to_string()));
    }
}

/// Value of a single multipart field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    File { data: Bytes, file_name: String },
}

/// One multipart form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: &'static str,
    pub value: FieldValue,
}

impl FormField {
    pub fn text<S: Into<String>>(name: &'static str, value: S) -> Self {
        Self {
            name,
            value: FieldValue::Text(value.into()),
        }
    }

    /// Text value, `None` for file parts
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            FieldValue::Text(text) => Some(text),
            FieldValue::File { .. } => None,
        }
    }
}

/// Complete parameters for one background removal call
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveBackgroundParams {
    pub source: ImageSource,
    pub options: RemoveBackgroundOptions,
}

impl RemoveBackgroundParams {
    /// Start a builder
    #[must_use]
    pub fn builder() -> RemoveBackgroundParamsBuilder {
        RemoveBackgroundParamsBuilder::default()
    }

    pub fn from_file<B, S>(data: B, file_name: S) -> Self
    where
        B: Into<Bytes>,
        S: Into<String>,
    {
        Self::with_source(ImageSource::File {
            data: data.into(),
            file_name: file_name.into(),
        })
    }

    pub fn from_url<S: Into<String>>(url: S) -> Self {
        Self::with_source(ImageSource::Url(url.into()))
    }

    pub fn from_base64<S: Into<String>>(encoded: S) -> Self {
        Self::with_source(ImageSource::Base64(encoded.into()))
    }

    /// Read an image file from disk as the upload source
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| RemoveBgError::file_io_error("read image file", path, &e))?;
        let file_name = path
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::from_file(data, file_name))
    }

    #[must_use]
    pub fn with_source(source: ImageSource) -> Self {
        Self {
            source,
            options: RemoveBackgroundOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: RemoveBackgroundOptions) -> Self {
        self.options = options;
        self
    }

    /// Check the source before a request is issued
    pub fn validate(&self) -> Result<()> {
        self.source.validate()
    }

    /// Encode as multipart fields, source first
    #[must_use]
    pub fn to_form_fields(&self) -> Vec<FormField> {
        let mut fields = Vec::with_capacity(4);
        match &self.source {
            ImageSource::File { data, file_name } => fields.push(FormField {
                name: "image_file",
                value: FieldValue::File {
                    data: data.clone(),
                    file_name: file_name.clone(),
                },
            }),
            ImageSource::Url(url) => fields.push(FormField::text("image_url", url.clone())),
            ImageSource::Base64(encoded) => {
                fields.push(FormField::text("image_file_b64", encoded.clone()));
            },
        }
        self.options.push_fields(&mut fields);
        fields
    }
}

/// Builder accepting the three source fields independently, as the web API does
#[derive(Debug, Default)]
pub struct RemoveBackgroundParamsBuilder {
    image_file: Option<(Bytes, String)>,
    image_url: Option<String>,
    image_file_b64: Option<String>,
    options: RemoveBackgroundOptions,
}

impl RemoveBackgroundParamsBuilder {
    #[must_use]
    pub fn image_file<B: Into<Bytes>, S: Into<String>>(mut self, data: B, file_name: S) -> Self {
        self.image_file = Some((data.into(), file_name.into()));
        self
    }

    #[must_use]
    pub fn image_url<S: Into<String>>(mut self, url: S) -> Self {
        self.image_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn image_file_b64<S: Into<String>>(mut self, encoded: S) -> Self {
        self.image_file_b64 = Some(encoded.into());
        self
    }

    #[must_use]
    pub fn options(mut self, options: RemoveBackgroundOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn size(mut self, size: ImageSize) -> Self {
        self.options.size = Some(size);
        self
    }

    #[must_use]
    pub fn format(mut self, format: ImageFormat) -> Self {
        self.options.format = Some(format);
        self
    }

    #[must_use]
    pub fn foreground_type(mut self, foreground_type: ForegroundType) -> Self {
        self.options.foreground_type = Some(foreground_type);
        self
    }

    #[must_use]
    pub fn type_level(mut self, level: TypeLevel) -> Self {
        self.options.type_level = Some(level);
        self
    }

    #[must_use]
    pub fn channels(mut self, channels: Channels) -> Self {
        self.options.channels = Some(channels);
        self
    }

    #[must_use]
    pub fn bg_color<S: Into<String>>(mut self, color: S) -> Self {
        self.options.bg_color = Some(color.into());
        self
    }

    #[must_use]
    pub fn bg_image_url<S: Into<String>>(mut self, url: S) -> Self {
        self.options.bg_image_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn crop(mut self, crop: bool) -> Self {
        self.options.crop = Some(crop);
        self
    }

    #[must_use]
    pub fn crop_margin<S: Into<String>>(mut self, margin: S) -> Self {
        self.options.crop_margin = Some(margin.into());
        self
    }

    #[must_use]
    pub fn scale<S: Into<String>>(mut self, scale: S) -> Self {
        self.options.scale = Some(scale.into());
        self
    }

    #[must_use]
    pub fn position<S: Into<String>>(mut self, position: S) -> Self {
        self.options.position = Some(position.into());
        self
    }

    #[must_use]
    pub fn roi<S: Into<String>>(mut self, roi: S) -> Self {
        self.options.roi = Some(roi.into());
        self
    }

    #[must_use]
    pub fn semitransparency(mut self, enabled: bool) -> Self {
        self.options.semitransparency = Some(enabled);
        self
    }

    #[must_use]
    pub fn shadow_type(mut self, shadow_type: ShadowType) -> Self {
        self.options.shadow_type = Some(shadow_type);
        self
    }

    #[must_use]
    pub fn shadow_opacity(mut self, opacity: u8) -> Self {
        self.options.shadow_opacity = Some(opacity);
        self
    }

    /// Build the parameters, rejecting zero or multiple sources
    pub fn build(self) -> Result<RemoveBackgroundParams> {
        let mut sources = Vec::with_capacity(1);
        if let Some((data, file_name)) = self.image_file {
            sources.push(ImageSource::File { data, file_name });
        }
        if let Some(url) = self.image_url {
            sources.push(ImageSource::Url(url));
        }
        if let Some(encoded) = self.image_file_b64 {
            sources.push(ImageSource::Base64(encoded));
        }

        if sources.len() > 1 {
            let kinds: Vec<&str> = sources.iter().map(ImageSource::kind).collect();
            return Err(RemoveBgError::invalid_request(format!(
                "Exactly one image source is allowed, got {}",
                kinds.join(", ")
            )));
        }
        let source = sources.pop().ok_or_else(|| {
            RemoveBgError::invalid_request(
                "An image source is required: image_file, image_url or image_file_b64",
            )
        })?;

        let params = RemoveBackgroundParams {
            source,
            options: self.options,
        };
        params.validate()?;
        Ok(params)
    }
}
