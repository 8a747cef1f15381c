//! Absolute URL construction for image links.

/// Builds absolute links as `{base_url}{root_path}{path}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBuilder {
    base_url: String,
    root_path: String,
}

impl LinkBuilder {
    pub fn new(base_url: impl Into<String>, root_path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            root_path: normalize_root_path(&root_path.into()),
        }
    }

    /// The route prefix in canonical form: "" or "/segment" with no trailing slash.
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Absolute URL for an application path such as `/download/<id>`.
    pub fn absolute(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}{}", self.base_url, self.root_path, path)
        } else {
            format!("{}{}/{}", self.base_url, self.root_path, path)
        }
    }

    /// Download link for an image, optionally pinning the disposition.
    pub fn download(&self, image_id: &str, host_images: Option<bool>) -> String {
        let url = self.absolute(&format!("/download/{}", image_id));
        match host_images {
            Some(inline) => format!("{}?host_images={}", url, u8::from(inline)),
            None => url,
        }
    }
}

/// Canonicalize a route prefix: "" and "/" mean none, trailing slashes dropped,
/// leading slash ensured.
pub fn normalize_root_path(root_path: &str) -> String {
    let trimmed = root_path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
